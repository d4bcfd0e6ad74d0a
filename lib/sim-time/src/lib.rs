#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![cfg_attr(feature = "fail-on-warnings", deny(clippy::all))]

mod config;

use chrono::{DateTime, Duration, Utc};
pub use config::*;
use std::sync::{
    atomic::{AtomicI64, Ordering},
    Arc,
};

/// Source of "now" for everything the ledger timestamps.
///
/// A realtime handle reads the system clock. An artificial handle only moves when its
/// [`ClockController`] tells it to, which keeps timestamps deterministic in tests.
#[derive(Clone, Debug)]
pub struct ClockHandle {
    inner: ClockInner,
}

#[derive(Clone, Debug)]
enum ClockInner {
    Realtime,
    Artificial(Arc<AtomicI64>),
}

/// Moves an artificial clock.
#[derive(Clone, Debug)]
pub struct ClockController {
    now_ms: Arc<AtomicI64>,
}

impl ClockHandle {
    pub fn realtime() -> Self {
        Self {
            inner: ClockInner::Realtime,
        }
    }

    pub fn artificial(config: ArtificialClockConfig) -> (Self, ClockController) {
        let now_ms = Arc::new(AtomicI64::new(config.start_at.timestamp_millis()));
        (
            Self {
                inner: ClockInner::Artificial(now_ms.clone()),
            },
            ClockController { now_ms },
        )
    }

    pub fn from_config(config: &TimeConfig) -> (Self, Option<ClockController>) {
        if config.realtime {
            (Self::realtime(), None)
        } else {
            let (handle, ctrl) = Self::artificial(ArtificialClockConfig {
                start_at: config.start_at.unwrap_or_else(Utc::now),
            });
            (handle, Some(ctrl))
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        match &self.inner {
            ClockInner::Realtime => Utc::now(),
            ClockInner::Artificial(now_ms) => {
                DateTime::from_timestamp_millis(now_ms.load(Ordering::SeqCst))
                    .unwrap_or(DateTime::<Utc>::MIN_UTC)
            }
        }
    }

    pub fn is_artificial(&self) -> bool {
        matches!(self.inner, ClockInner::Artificial(_))
    }
}

impl Default for ClockHandle {
    fn default() -> Self {
        Self::realtime()
    }
}

impl ClockController {
    pub fn set_time(&self, time: DateTime<Utc>) {
        self.now_ms.store(time.timestamp_millis(), Ordering::SeqCst);
    }

    pub fn advance(&self, duration: Duration) {
        self.now_ms
            .fetch_add(duration.num_milliseconds(), Ordering::SeqCst);
    }
}
