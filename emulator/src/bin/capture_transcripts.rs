use std::io;

#[allow(dead_code)]
#[path = "../session.rs"]
mod session;

use session::{Session, TranscriptProfile};

fn main() -> io::Result<()> {
    record_profile(TranscriptProfile::Online)?;
    record_profile(TranscriptProfile::Offline)?;
    record_profile(TranscriptProfile::Flaky)?;
    Ok(())
}

fn record_profile(profile: TranscriptProfile) -> io::Result<()> {
    let mut session = Session::new(profile)?;
    let script: &[&str] = match profile {
        TranscriptProfile::Online => &[
            "step 200",
            "status",
            "run 5",
            "show",
            "run 3",
            "refresh",
            "step 100",
            "status",
        ],
        TranscriptProfile::Offline => &[
            "run 11",
            "status",
            "link up",
            "run 6",
            "status",
            "show",
        ],
        TranscriptProfile::Flaky => &[
            "step 200",
            "run 8",
            "status",
            "weather garbage",
            "refresh",
            "step 200",
            "ntp ok",
            "sync",
            "weather ok",
            "refresh",
            "step 200",
            "link down",
            "step 100",
            "status",
        ],
    };

    for command in script {
        let _ = session.handle_command(command)?;
    }
    Ok(())
}
