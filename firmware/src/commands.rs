#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Requests queued for the clock task by the button handler.

use clock_core::config::NetworkCredentials;
use clock_core::connectivity::NetworkLink;
use clock_core::cycle::{ClockEvent, WeatherClock};
use clock_core::display::DisplayDriver;
use clock_core::time::Millis;
#[cfg(not(target_os = "none"))]
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
#[cfg(target_os = "none")]
use embassy_sync::blocking_mutex::raw::ThreadModeRawMutex;
use embassy_sync::channel::{Channel, Receiver, Sender};

/// Depth of the command queue shared between producers and the clock task.
pub const COMMAND_QUEUE_DEPTH: usize = 4;

#[cfg(target_os = "none")]
type ClockMutex = ThreadModeRawMutex;
#[cfg(not(target_os = "none"))]
type ClockMutex = NoopRawMutex;

/// Operator request handled between two cycles.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ClockCommand {
    /// Re-run time synchronisation now.
    SyncTime,
    /// Fetch the forecast now.
    RefreshWeather,
    /// Credentials obtained by a provisioning flow.
    Provision(NetworkCredentials),
}

pub type CommandQueue = Channel<ClockMutex, ClockCommand, COMMAND_QUEUE_DEPTH>;
pub type CommandSender<'a> = Sender<'a, ClockMutex, ClockCommand, COMMAND_QUEUE_DEPTH>;
pub type CommandReceiver<'a> = Receiver<'a, ClockMutex, ClockCommand, COMMAND_QUEUE_DEPTH>;

/// Applies one command. Only provisioning produces an immediate event.
pub fn apply<D, L>(
    clock: &mut WeatherClock<D>,
    command: ClockCommand,
    now: Millis,
    link: &mut L,
) -> Option<ClockEvent>
where
    D: DisplayDriver,
    L: NetworkLink,
{
    match command {
        ClockCommand::SyncTime => {
            clock.trigger_time_sync();
            None
        }
        ClockCommand::RefreshWeather => {
            clock.request_weather_refresh();
            None
        }
        ClockCommand::Provision(credentials) => Some(clock.provisioned(now, credentials, link)),
    }
}

/// Applies every queued command without waiting. Returns how many ran.
pub fn drain<D, L>(
    receiver: &CommandReceiver<'_>,
    clock: &mut WeatherClock<D>,
    now: Millis,
    link: &mut L,
) -> usize
where
    D: DisplayDriver,
    L: NetworkLink,
{
    let mut applied = 0;
    while let Ok(command) = receiver.try_receive() {
        apply(clock, command, now, link);
        applied += 1;
    }
    applied
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::OfflineLink;
    use crate::panel::NullPanel;
    use clock_core::config::ClockConfig;
    use clock_core::connectivity::{ConnectivityEvent, ConnectivityState};
    use clock_core::display::BufferedDisplay;

    fn clock() -> WeatherClock<BufferedDisplay<NullPanel>> {
        WeatherClock::new(ClockConfig::default(), BufferedDisplay::new(NullPanel)).unwrap()
    }

    #[test]
    fn drains_everything_queued() {
        let queue = CommandQueue::new();
        let sender: CommandSender<'_> = queue.sender();
        sender.try_send(ClockCommand::SyncTime).unwrap();
        sender.try_send(ClockCommand::RefreshWeather).unwrap();

        let mut clock = clock();
        let mut link = OfflineLink::new();
        assert_eq!(drain(&queue.receiver(), &mut clock, Millis::ZERO, &mut link), 2);
        assert_eq!(drain(&queue.receiver(), &mut clock, Millis::ZERO, &mut link), 0);
    }

    #[test]
    fn provisioning_starts_an_attempt() {
        let mut clock = clock();
        let mut link = OfflineLink::new();
        assert_eq!(clock.connectivity().state(), ConnectivityState::Idle);

        let event = apply(
            &mut clock,
            ClockCommand::Provision(NetworkCredentials::new("desk", "hunter22")),
            Millis::from_millis(10),
            &mut link,
        );
        assert_eq!(
            event,
            Some(ClockEvent::Connectivity(ConnectivityEvent::Connecting {
                attempt: 0
            }))
        );
        assert_eq!(link.begins(), 1);
    }

    #[test]
    fn queue_rejects_overflow() {
        let queue = CommandQueue::new();
        for _ in 0..COMMAND_QUEUE_DEPTH {
            queue.try_send(ClockCommand::SyncTime).unwrap();
        }
        assert!(queue.try_send(ClockCommand::SyncTime).is_err());
    }
}
