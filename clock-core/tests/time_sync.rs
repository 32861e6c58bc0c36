mod common;

use core::time::Duration;

use clock_core::config::TimeConfig;
use clock_core::error::{ClockError, MalformedKind};
use clock_core::time::Millis;
use clock_core::time_sync::{NTP_PORT, TimeSyncEngine, TimeSyncEvent, TimeSyncState, UnixSeconds};

use common::{FRIDAY_MORNING, ScriptedNtp, ms};

fn synced_engine(ntp: &mut ScriptedNtp, config: &TimeConfig, at: Millis) -> TimeSyncEngine {
    let mut engine = TimeSyncEngine::new();
    engine.poll(at, true, config, ntp);
    ntp.reply(FRIDAY_MORNING);
    let event = engine.poll(at.wrapping_add_millis(100), true, config, ntp);
    assert!(matches!(event, Some(TimeSyncEvent::Synced { .. })));
    engine
}

#[test]
fn first_online_poll_sends_and_reply_anchors_clock() {
    let config = TimeConfig::default();
    let mut ntp = ScriptedNtp::default();
    let mut engine = TimeSyncEngine::new();

    assert_eq!(engine.poll(ms(0), false, &config, &mut ntp), None);
    assert!(ntp.sent.is_empty());

    assert_eq!(
        engine.poll(ms(1_000), true, &config, &mut ntp),
        Some(TimeSyncEvent::RequestSent { attempt: 0 })
    );
    assert_eq!(ntp.sent, [("pool.ntp.org".to_owned(), NTP_PORT)]);
    assert_eq!(engine.poll(ms(1_100), true, &config, &mut ntp), None);

    ntp.reply(FRIDAY_MORNING);
    assert_eq!(
        engine.poll(ms(1_200), true, &config, &mut ntp),
        Some(TimeSyncEvent::Synced {
            epoch: UnixSeconds::new(i64::from(FRIDAY_MORNING))
        })
    );
    assert_eq!(engine.state(), TimeSyncState::Success);
    assert_eq!(engine.successes(), 1);
    assert_eq!(
        engine.current_epoch(ms(4_700)),
        Some(UnixSeconds::new(i64::from(FRIDAY_MORNING) + 3))
    );

    assert_eq!(engine.poll(ms(1_300), true, &config, &mut ntp), None);
    assert_eq!(engine.state(), TimeSyncState::Idle);
}

#[test]
fn stale_datagrams_are_drained_before_sending() {
    let config = TimeConfig::default();
    let mut ntp = ScriptedNtp::default();
    ntp.reply(1);
    ntp.reply(2);
    let mut engine = TimeSyncEngine::new();

    engine.poll(ms(0), true, &config, &mut ntp);
    assert!(ntp.inbox.is_empty());
    assert_eq!(engine.poll(ms(50), true, &config, &mut ntp), None);
}

#[test]
fn timeout_is_strictly_after_five_seconds() {
    let config = TimeConfig::default();
    let mut ntp = ScriptedNtp::default();
    let mut engine = TimeSyncEngine::new();
    engine.poll(ms(0), true, &config, &mut ntp);

    assert_eq!(engine.poll(ms(5_000), true, &config, &mut ntp), None);
    assert_eq!(
        engine.poll(ms(5_001), true, &config, &mut ntp),
        Some(TimeSyncEvent::Failed {
            error: ClockError::Timeout,
            retry_in: Some(Duration::from_secs(1)),
        })
    );
    assert_eq!(engine.state(), TimeSyncState::Idle);
    assert_eq!(engine.last_error(), Some(ClockError::Timeout));

    assert_eq!(engine.poll(ms(6_000), true, &config, &mut ntp), None);
    assert_eq!(
        engine.poll(ms(6_001), true, &config, &mut ntp),
        Some(TimeSyncEvent::RequestSent { attempt: 1 })
    );
}

#[test]
fn exhausted_retries_park_until_triggered() {
    let config = TimeConfig::default();
    let mut ntp = ScriptedNtp::default();
    let mut engine = TimeSyncEngine::new();
    let mut now = 0;

    let mut failures = Vec::new();
    for _ in 0..4 {
        let sent = engine.poll(ms(now), true, &config, &mut ntp);
        assert!(matches!(sent, Some(TimeSyncEvent::RequestSent { .. })));
        now += 5_001;
        match engine.poll(ms(now), true, &config, &mut ntp) {
            Some(TimeSyncEvent::Failed { retry_in, .. }) => failures.push(retry_in),
            other => panic!("expected failure, got {other:?}"),
        }
        if let Some(delay) = failures.last().copied().flatten() {
            now += u32::try_from(delay.as_millis()).expect("small");
        }
    }

    assert_eq!(
        failures,
        [
            Some(Duration::from_secs(1)),
            Some(Duration::from_secs(2)),
            Some(Duration::from_secs(4)),
            None,
        ]
    );
    assert_eq!(engine.state(), TimeSyncState::Failed);
    assert_eq!(engine.attempts(), 4);
    assert_eq!(engine.poll(ms(now + 60_000), true, &config, &mut ntp), None);

    engine.trigger();
    assert_eq!(
        engine.poll(ms(now + 61_000), true, &config, &mut ntp),
        Some(TimeSyncEvent::RequestSent { attempt: 0 })
    );
}

#[test]
fn short_reply_is_malformed() {
    let config = TimeConfig::default();
    let mut ntp = ScriptedNtp::default();
    let mut engine = TimeSyncEngine::new();
    engine.poll(ms(0), true, &config, &mut ntp);

    ntp.inbox.push_back(Ok(vec![0x24; 20]));
    assert_eq!(
        engine.poll(ms(10), true, &config, &mut ntp),
        Some(TimeSyncEvent::Failed {
            error: ClockError::MalformedResponse(MalformedKind::ShortPacket),
            retry_in: Some(Duration::from_secs(1)),
        })
    );
    assert!(!engine.clock().is_valid());
}

#[test]
fn unresolvable_server_fails_immediately() {
    let config = TimeConfig::default();
    let mut ntp = ScriptedNtp {
        send_error: Some(ClockError::Resolution),
        ..ScriptedNtp::default()
    };
    let mut engine = TimeSyncEngine::new();

    assert_eq!(
        engine.poll(ms(0), true, &config, &mut ntp),
        Some(TimeSyncEvent::Failed {
            error: ClockError::Resolution,
            retry_in: Some(Duration::from_secs(1)),
        })
    );
}

#[test]
fn dropping_offline_abandons_request() {
    let config = TimeConfig::default();
    let mut ntp = ScriptedNtp::default();
    let mut engine = TimeSyncEngine::new();
    engine.poll(ms(0), true, &config, &mut ntp);

    assert!(matches!(
        engine.poll(ms(100), false, &config, &mut ntp),
        Some(TimeSyncEvent::Failed {
            error: ClockError::LinkLoss,
            ..
        })
    ));
}

#[test]
fn periodic_resync_after_interval() {
    let config = TimeConfig {
        sync_interval: Duration::from_secs(60),
        ..TimeConfig::default()
    };
    let mut ntp = ScriptedNtp::default();
    let mut engine = synced_engine(&mut ntp, &config, ms(0));

    assert_eq!(engine.poll(ms(59_999), true, &config, &mut ntp), None);
    assert_eq!(
        engine.poll(ms(60_000), true, &config, &mut ntp),
        Some(TimeSyncEvent::RequestSent { attempt: 0 })
    );
    assert_eq!(ntp.sent.len(), 2);
}

#[test]
fn clock_stays_monotonic_across_counter_wrap() {
    let config = TimeConfig {
        sync_interval: Duration::from_secs(u64::from(u32::MAX / 1_000)),
        ..TimeConfig::default()
    };
    let mut ntp = ScriptedNtp::default();
    let start = Millis::from_millis(u32::MAX - 10_000);
    let mut engine = synced_engine(&mut ntp, &config, start);
    let anchor = engine.clock().anchor();

    let mut previous = engine.current_epoch(anchor).expect("synced");
    let mut now = anchor;
    for _ in 0..40 {
        now = now.wrapping_add_millis(500);
        engine.poll(now, true, &config, &mut ntp);
        let epoch = engine.current_epoch(now).expect("synced");
        assert!(epoch >= previous, "{epoch} went backwards from {previous}");
        previous = epoch;
    }

    assert!(now.as_millis() < 20_000, "counter should have wrapped");
    assert_eq!(previous, UnixSeconds::new(i64::from(FRIDAY_MORNING) + 20));
}
