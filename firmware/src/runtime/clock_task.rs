use core::time::Duration;

use clock_core::cycle::NetworkIo;
use embassy_time::Ticker;

use super::{BoardClock, COMMAND_QUEUE};
use crate::commands;
use crate::instant;
use crate::io::{OfflineDatagrams, OfflineHttp, OfflineLink};
use crate::status;
use crate::telemetry::{self, TelemetryMirror};

/// Cycle cadence; fast enough for the 100 ms dissolve pacing.
const CYCLE_PERIOD: Duration = Duration::from_millis(20);

#[embassy_executor::task]
pub async fn run(mut clock: BoardClock) -> ! {
    let mut link = OfflineLink::new();
    let mut datagrams = OfflineDatagrams;
    let mut http = OfflineHttp;
    let receiver = COMMAND_QUEUE.receiver();
    let mut mirror = TelemetryMirror::new();
    let mut ticker = Ticker::every(instant::embassy_duration(CYCLE_PERIOD));

    clock.boot(instant::now(), &mut link);

    loop {
        let now = instant::now();
        commands::drain(&receiver, &mut clock, now, &mut link);

        let mut io = NetworkIo::new(&mut link, &mut datagrams, &mut http);
        let outcome = clock.poll_cycle(now, &mut io);
        if let Some(update) = &outcome.config_update {
            telemetry::log_config_update(update);
        }

        mirror.mirror(clock.telemetry());
        status::publish(&clock.status(now));
        ticker.next().await;
    }
}
