use embassy_stm32::gpio::Input;
use embassy_time::{Duration, Ticker};

use super::COMMAND_QUEUE;
use crate::commands::ClockCommand;
use crate::status;

const SAMPLE_PERIOD: Duration = Duration::from_millis(10);
/// Consecutive low samples that count as a press.
const DEBOUNCE_SAMPLES: u8 = 3;

/// Polls the active-low user button; a press requests a time sync and a
/// weather refresh.
#[embassy_executor::task]
pub async fn run(button: Input<'static>) -> ! {
    let sender = COMMAND_QUEUE.sender();
    let mut ticker = Ticker::every(SAMPLE_PERIOD);
    let mut low_samples: u8 = 0;

    loop {
        ticker.next().await;
        if button.is_high() {
            low_samples = 0;
            continue;
        }
        if low_samples >= DEBOUNCE_SAMPLES {
            continue;
        }
        low_samples += 1;
        if low_samples < DEBOUNCE_SAMPLES {
            continue;
        }

        let summary = status::summary();
        if !summary.online() {
            defmt::info!("button: offline, requests queued for reconnect");
        }
        for command in [ClockCommand::SyncTime, ClockCommand::RefreshWeather] {
            if sender.try_send(command).is_err() {
                defmt::warn!("button: command queue full");
            }
        }
    }
}
