mod session;

use std::env;
use std::io::{self, BufRead, Write};
use std::process;

use crossterm::style::Stylize;
use session::{Session, TranscriptProfile};

fn main() -> io::Result<()> {
    let profile = parse_profile().unwrap_or_else(|err| {
        eprintln!("{err}");
        eprintln!(
            "Usage: clock-emulator [--profile <online|offline|flaky>] | clock-emulator <online|offline|flaky>"
        );
        process::exit(2);
    });

    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let stdout = io::stdout();
    let mut writer = stdout.lock();
    let mut session = Session::new(profile)?;
    let mut line = String::new();

    writeln!(
        writer,
        "Weather clock emulator ready. Type `help` for commands or `exit` to quit."
    )?;

    loop {
        line.clear();
        write!(writer, "[{:>8} ms] > ", session.now().as_millis())?;
        writer.flush()?;

        let bytes_read = reader.read_line(&mut line)?;
        if bytes_read == 0 {
            writeln!(writer)?;
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if should_terminate(trimmed) {
            writeln!(
                writer,
                "Session closed after {} commands.",
                session.command_count()
            )?;
            break;
        }

        let responses = session.handle_command(trimmed)?;
        for response in responses {
            write_styled(&mut writer, &response)?;
        }
    }

    Ok(())
}

/// Highlights failures and acknowledgements; transcripts stay plain.
fn write_styled<W: Write>(writer: &mut W, response: &str) -> io::Result<()> {
    if response.starts_with("ERR") || response.contains("-failed") || response.contains("link-lost")
    {
        writeln!(writer, "{}", response.red())
    } else if response.starts_with("OK") || response.contains("-synced") || response.contains("-updated")
    {
        writeln!(writer, "{}", response.green())
    } else if response.contains("rotation-fallback") || response.contains("provisioning-required") {
        writeln!(writer, "{}", response.yellow())
    } else {
        writeln!(writer, "{response}")
    }
}

fn should_terminate(input: &str) -> bool {
    input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit")
}

fn parse_profile() -> Result<TranscriptProfile, String> {
    let mut args = env::args().skip(1);
    if let Some(arg) = args.next() {
        if let Some(value) = arg.strip_prefix("--profile=") {
            TranscriptProfile::from_tag(value)
        } else if arg == "--profile" {
            if let Some(value) = args.next() {
                TranscriptProfile::from_tag(&value)
            } else {
                Err("Expected value after --profile".to_string())
            }
        } else {
            TranscriptProfile::from_tag(&arg)
        }
    } else {
        Ok(TranscriptProfile::Online)
    }
}
