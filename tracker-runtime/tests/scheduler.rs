//! Scheduler timing tests
//!
//! Run on tokio's paused clock; the scheduler's wall clock is derived from
//! tokio's virtual time so sleeps advance both together.

use chrono::NaiveDateTime;
use daily_tracker_runtime::{
    ActionError, ActionFailurePolicy, Clock, ConfigError, ConfigSource, Configuration, SchedulerBuilder,
    SchedulerError, SchedulerHandle, SchedulerState,
};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;
use tokio::time::Instant;

fn iso(value: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S").unwrap()
}

/// Wall clock that starts at `base` and follows tokio's virtual time.
struct PausedClock {
    base: NaiveDateTime,
    origin: Instant,
}

impl PausedClock {
    fn starting_at(base: &str) -> Self {
        Self {
            base: iso(base),
            origin: Instant::now(),
        }
    }
}

impl Clock for PausedClock {
    fn now(&self) -> NaiveDateTime {
        let elapsed = Instant::now() - self.origin;
        self.base + chrono::Duration::from_std(elapsed).unwrap()
    }
}

/// Configuration whose interval can be changed while the scheduler runs.
#[derive(Clone)]
struct LiveConfig(Arc<Mutex<Configuration>>);

impl LiveConfig {
    fn new(config: Configuration) -> Self {
        Self(Arc::new(Mutex::new(config)))
    }

    fn set_interval(&self, interval: i64) {
        self.0.lock().unwrap().interval = interval;
    }
}

impl ConfigSource for LiveConfig {
    fn load(&self) -> Result<Configuration, ConfigError> {
        Ok(self.0.lock().unwrap().clone())
    }
}

fn config(interval: i64) -> Configuration {
    Configuration {
        interval,
        ..Configuration::default()
    }
}

type Firings = Arc<Mutex<Vec<NaiveDateTime>>>;

#[tokio::test(start_paused = true)]
async fn test_fires_on_boundaries_regardless_of_action_duration() {
    let scheduler = Arc::new(
        SchedulerBuilder::with_config(config(15))
            .clock(PausedClock::starting_at("2020-01-01 00:00:00"))
            .build(),
    );
    let handle = scheduler.handle();
    let firings: Firings = Arc::default();

    let recorded = firings.clone();
    let stopper = handle.clone();
    let action = move |at: NaiveDateTime, _config: Arc<Configuration>| {
        let recorded = recorded.clone();
        let stopper = stopper.clone();
        async move {
            // The user takes seven minutes to answer
            tokio::time::sleep(Duration::from_secs(7 * 60)).await;
            let mut recorded = recorded.lock().unwrap();
            recorded.push(at);
            if recorded.len() == 2 {
                stopper.stop();
            }
            Ok::<(), ActionError>(())
        }
    };

    scheduler.start(action).await.unwrap();

    assert_eq!(
        *firings.lock().unwrap(),
        vec![iso("2020-01-01 00:15:00"), iso("2020-01-01 00:30:00")]
    );
    assert_eq!(scheduler.state(), SchedulerState::Idle);
    assert_eq!(scheduler.next_firing(), None);
}

#[tokio::test(start_paused = true)]
async fn test_first_firing_is_next_boundary_after_initial_time() {
    let scheduler = Arc::new(
        SchedulerBuilder::with_config(config(10))
            .clock(PausedClock::starting_at("2020-01-01 00:51:00"))
            .build(),
    );

    let runner = {
        let scheduler = scheduler.clone();
        tokio::spawn(async move {
            scheduler
                .start(|_at: NaiveDateTime, _config: Arc<Configuration>| async { Ok::<(), ActionError>(()) })
                .await
        })
    };

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(scheduler.state(), SchedulerState::Armed);
    assert_eq!(scheduler.next_firing(), Some(iso("2020-01-01 01:00:00")));

    scheduler.stop();
    runner.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_interval_change_applies_from_previous_scheduled_time() {
    let live = LiveConfig::new(config(15));
    let scheduler = Arc::new(
        SchedulerBuilder::new(live.clone())
            .clock(PausedClock::starting_at("2020-01-01 00:00:00"))
            .build(),
    );
    let handle = scheduler.handle();
    let firings: Firings = Arc::default();

    let recorded = firings.clone();
    let action = move |at: NaiveDateTime, _config: Arc<Configuration>| {
        let recorded = recorded.clone();
        let live = live.clone();
        let handle = handle.clone();
        async move {
            let mut recorded = recorded.lock().unwrap();
            recorded.push(at);
            match recorded.len() {
                1 => live.set_interval(10),
                3 => handle.stop(),
                _ => {}
            }
            Ok::<(), ActionError>(())
        }
    };

    scheduler.start(action).await.unwrap();

    assert_eq!(
        *firings.lock().unwrap(),
        vec![
            iso("2020-01-01 00:15:00"),
            iso("2020-01-01 00:20:00"),
            iso("2020-01-01 00:30:00"),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_second_start_is_rejected() {
    let scheduler = Arc::new(
        SchedulerBuilder::with_config(config(15))
            .clock(PausedClock::starting_at("2020-01-01 00:00:00"))
            .build(),
    );

    let runner = {
        let scheduler = scheduler.clone();
        tokio::spawn(async move {
            scheduler
                .start(|_at: NaiveDateTime, _config: Arc<Configuration>| async { Ok::<(), ActionError>(()) })
                .await
        })
    };
    tokio::time::sleep(Duration::from_secs(1)).await;

    let second = scheduler
        .start(|_at: NaiveDateTime, _config: Arc<Configuration>| async { Ok::<(), ActionError>(()) })
        .await;
    assert!(matches!(second, Err(SchedulerError::AlreadyRunning)));

    scheduler.stop();
    runner.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_stop_while_waiting_never_fires() {
    let scheduler = Arc::new(
        SchedulerBuilder::with_config(config(15))
            .clock(PausedClock::starting_at("2020-01-01 00:00:00"))
            .build(),
    );
    let firings: Firings = Arc::default();

    let runner = {
        let scheduler = scheduler.clone();
        let recorded = firings.clone();
        tokio::spawn(async move {
            scheduler
                .start(move |at: NaiveDateTime, _config: Arc<Configuration>| {
                    let recorded = recorded.clone();
                    async move {
                        recorded.lock().unwrap().push(at);
                        Ok::<(), ActionError>(())
                    }
                })
                .await
        })
    };

    tokio::time::sleep(Duration::from_secs(5 * 60)).await;
    scheduler.handle().stop();
    // Double stop is not an error
    scheduler.handle().stop();
    runner.await.unwrap().unwrap();

    assert!(firings.lock().unwrap().is_empty());
    assert_eq!(scheduler.state(), SchedulerState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_stop_when_idle_is_a_no_op() {
    let scheduler = SchedulerBuilder::with_config(config(15))
        .clock(PausedClock::starting_at("2020-01-01 00:00:00"))
        .build();

    scheduler.stop();
    assert_eq!(scheduler.state(), SchedulerState::Idle);

    // An earlier stop does not cancel a later start
    let handle = scheduler.handle();
    let action = move |_at: NaiveDateTime, _config: Arc<Configuration>| {
        let handle = handle.clone();
        async move {
            handle.stop();
            Ok::<(), ActionError>(())
        }
    };
    scheduler.start(action).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_rearm_policy_survives_errors_and_panics() {
    let scheduler = Arc::new(
        SchedulerBuilder::with_config(config(15))
            .clock(PausedClock::starting_at("2020-01-01 00:00:00"))
            .build(),
    );
    let handle = scheduler.handle();
    let firings: Firings = Arc::default();

    let recorded = firings.clone();
    let action = move |at: NaiveDateTime, _config: Arc<Configuration>| {
        let recorded = recorded.clone();
        let handle = handle.clone();
        async move {
            let count = {
                let mut recorded = recorded.lock().unwrap();
                recorded.push(at);
                recorded.len()
            };
            match count {
                1 => Err::<(), ActionError>("database locked".into()),
                2 => panic!("form crashed"),
                _ => {
                    handle.stop();
                    Ok(())
                }
            }
        }
    };

    scheduler.start(action).await.unwrap();

    assert_eq!(
        *firings.lock().unwrap(),
        vec![
            iso("2020-01-01 00:15:00"),
            iso("2020-01-01 00:30:00"),
            iso("2020-01-01 00:45:00"),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_abort_policy_returns_action_error() {
    let scheduler = SchedulerBuilder::with_config(Configuration {
        on_action_failure: ActionFailurePolicy::Abort,
        ..config(15)
    })
    .clock(PausedClock::starting_at("2020-01-01 00:00:00"))
    .build();

    let result = scheduler
        .start(|_at: NaiveDateTime, _config: Arc<Configuration>| async {
            Err::<(), ActionError>("form unavailable".into())
        })
        .await;

    match result {
        Err(SchedulerError::Action(e)) => assert_eq!(e.to_string(), "form unavailable"),
        other => panic!("expected action error, got {other:?}"),
    }
    assert_eq!(scheduler.state(), SchedulerState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_invalid_interval_fails_fast() {
    let scheduler = SchedulerBuilder::with_config(config(0))
        .clock(PausedClock::starting_at("2020-01-01 00:00:00"))
        .build();

    let result = scheduler
        .start(|_at: NaiveDateTime, _config: Arc<Configuration>| async { Ok::<(), ActionError>(()) })
        .await;

    assert!(matches!(
        result,
        Err(SchedulerError::Config(ConfigError::InvalidInterval(0)))
    ));
    assert_eq!(scheduler.state(), SchedulerState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_missed_boundaries_fire_back_to_back() {
    let scheduler = Arc::new(
        SchedulerBuilder::with_config(config(15))
            .clock(PausedClock::starting_at("2020-01-01 00:00:00"))
            .build(),
    );
    let handle = scheduler.handle();
    let firings: Firings = Arc::default();

    let recorded = firings.clone();
    let action = move |at: NaiveDateTime, _config: Arc<Configuration>| {
        let recorded = recorded.clone();
        let handle = handle.clone();
        async move {
            let count = {
                let mut recorded = recorded.lock().unwrap();
                recorded.push(at);
                recorded.len()
            };
            if count == 1 {
                // Popup left open across two later boundaries
                tokio::time::sleep(Duration::from_secs(40 * 60)).await;
            } else if count == 3 {
                handle.stop();
            }
            Ok::<(), ActionError>(())
        }
    };

    scheduler.start(action).await.unwrap();

    assert_eq!(
        *firings.lock().unwrap(),
        vec![
            iso("2020-01-01 00:15:00"),
            iso("2020-01-01 00:30:00"),
            iso("2020-01-01 00:45:00"),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_bad_reload_keeps_last_good_config() {
    let live = LiveConfig::new(config(15));
    let scheduler = Arc::new(
        SchedulerBuilder::new(live.clone())
            .clock(PausedClock::starting_at("2020-01-01 00:00:00"))
            .build(),
    );
    let handle = scheduler.handle();
    let firings: Firings = Arc::default();

    let recorded = firings.clone();
    let action = move |at: NaiveDateTime, _config: Arc<Configuration>| {
        let recorded = recorded.clone();
        let live = live.clone();
        let handle = handle.clone();
        async move {
            let mut recorded = recorded.lock().unwrap();
            recorded.push(at);
            match recorded.len() {
                1 => live.set_interval(0),
                // Far beyond any representable date
                2 => live.set_interval(1_000_000_000_000),
                3 => handle.stop(),
                _ => {}
            }
            Ok::<(), ActionError>(())
        }
    };

    scheduler.start(action).await.unwrap();

    assert_eq!(
        *firings.lock().unwrap(),
        vec![
            iso("2020-01-01 00:15:00"),
            iso("2020-01-01 00:30:00"),
            iso("2020-01-01 00:45:00"),
        ]
    );
}

/// Loads once, then fails every re-read.
struct VanishingFile {
    loads: Mutex<usize>,
}

impl ConfigSource for VanishingFile {
    fn load(&self) -> Result<Configuration, ConfigError> {
        let mut loads = self.loads.lock().unwrap();
        *loads += 1;
        if *loads == 1 {
            Ok(config(20))
        } else {
            Err(ConfigError::MissingCredentials("configuration file"))
        }
    }
}

#[tokio::test(start_paused = true)]
async fn test_failed_reload_keeps_firing_on_previous_interval() {
    let scheduler = Arc::new(
        SchedulerBuilder::new(VanishingFile { loads: Mutex::new(0) })
            .clock(PausedClock::starting_at("2020-01-01 00:00:00"))
            .build(),
    );
    let handle = scheduler.handle();
    let firings: Firings = Arc::default();

    let recorded = firings.clone();
    let action = move |at: NaiveDateTime, _config: Arc<Configuration>| {
        let recorded = recorded.clone();
        let handle = handle.clone();
        async move {
            let mut recorded = recorded.lock().unwrap();
            recorded.push(at);
            if recorded.len() == 3 {
                handle.stop();
            }
            Ok::<(), ActionError>(())
        }
    };

    scheduler.start(action).await.unwrap();

    assert_eq!(
        *firings.lock().unwrap(),
        vec![
            iso("2020-01-01 00:20:00"),
            iso("2020-01-01 00:40:00"),
            iso("2020-01-01 01:00:00"),
        ]
    );
}

/// Stops the scheduler from inside its first configuration read.
struct StopOnLoad {
    handle: OnceLock<SchedulerHandle>,
}

impl ConfigSource for StopOnLoad {
    fn load(&self) -> Result<Configuration, ConfigError> {
        if let Some(handle) = self.handle.get() {
            handle.stop();
        }
        Ok(config(15))
    }
}

#[tokio::test(start_paused = true)]
async fn test_stop_during_startup_is_honoured() {
    let source = Arc::new(StopOnLoad { handle: OnceLock::new() });
    let scheduler = SchedulerBuilder::new(SharedSource(source.clone()))
        .clock(PausedClock::starting_at("2020-01-01 00:00:00"))
        .build();
    source.handle.set(scheduler.handle()).ok();

    let firings: Firings = Arc::default();
    let recorded = firings.clone();
    scheduler
        .start(move |at: NaiveDateTime, _config: Arc<Configuration>| {
            let recorded = recorded.clone();
            async move {
                recorded.lock().unwrap().push(at);
                Ok::<(), ActionError>(())
            }
        })
        .await
        .unwrap();

    assert!(firings.lock().unwrap().is_empty());
    assert_eq!(scheduler.state(), SchedulerState::Idle);
}

struct SharedSource<S>(Arc<S>);

impl<S: ConfigSource> ConfigSource for SharedSource<S> {
    fn load(&self) -> Result<Configuration, ConfigError> {
        self.0.load()
    }
}
