//! Alarm platform backed by tokio timers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Local};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use super::{AlarmPlatform, AlarmPrecision, ScheduledAlarm};
use crate::error::{Error, Result};
use crate::models::NotificationId;

/// Inexact alarms fire on the next multiple of this window.
pub const DEFAULT_INEXACT_WINDOW: Duration = Duration::from_secs(60);

/// Receives alarms as they fire.
pub trait AlarmSink: Send + Sync + 'static {
    fn deliver(&self, alarm: &ScheduledAlarm);
}

struct ArmedTimer {
    generation: u64,
    task: JoinHandle<()>,
}

type TimerMap = Arc<Mutex<HashMap<NotificationId, ArmedTimer>>>;

/// One spawned sleep task per armed id.
///
/// Timers live only as long as the process; call
/// [`AlarmScheduler::restore`](super::AlarmScheduler::restore) after a
/// restart.
pub struct TokioAlarmPlatform<K: AlarmSink> {
    handle: Handle,
    sink: Arc<K>,
    exact_allowed: bool,
    inexact_window: Duration,
    timers: TimerMap,
    generation: AtomicU64,
}

impl<K: AlarmSink> TokioAlarmPlatform<K> {
    /// Must be called from within a tokio runtime.
    pub fn new(sink: K) -> Result<Self> {
        let handle = Handle::try_current().map_err(|error| {
            Error::Config(format!("alarm timers need a running tokio runtime: {error}"))
        })?;
        Ok(Self {
            handle,
            sink: Arc::new(sink),
            exact_allowed: true,
            inexact_window: DEFAULT_INEXACT_WINDOW,
            timers: Arc::default(),
            generation: AtomicU64::new(0),
        })
    }

    #[must_use]
    pub fn with_exact_allowed(mut self, allowed: bool) -> Self {
        self.exact_allowed = allowed;
        self
    }

    #[must_use]
    pub fn with_inexact_window(mut self, window: Duration) -> Self {
        self.inexact_window = window;
        self
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    /// Ids with a pending timer.
    pub fn armed_ids(&self) -> Vec<NotificationId> {
        let mut ids = lock(&self.timers)
            .iter()
            .filter(|(_, timer)| !timer.task.is_finished())
            .map(|(id, _)| *id)
            .collect::<Vec<_>>();
        ids.sort_unstable();
        ids
    }

    fn delay_until(&self, fire_at: DateTime<Local>, precision: AlarmPrecision) -> Duration {
        let delay = (fire_at - Local::now()).to_std().unwrap_or(Duration::ZERO);
        match precision {
            AlarmPrecision::Exact => delay,
            AlarmPrecision::Inexact => round_up_to_window(delay, self.inexact_window),
        }
    }
}

impl<K: AlarmSink> AlarmPlatform for TokioAlarmPlatform<K> {
    fn can_schedule_exact(&self) -> bool {
        self.exact_allowed
    }

    fn arm(
        &self,
        alarm: ScheduledAlarm,
        fire_at: DateTime<Local>,
        precision: AlarmPrecision,
    ) -> Result<()> {
        let id = alarm.id;
        let delay = self.delay_until(fire_at, precision);
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let sink = Arc::clone(&self.sink);
        let timers = Arc::clone(&self.timers);

        let mut armed = lock(&self.timers);
        let task = self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            {
                let mut timers = lock(&timers);
                if timers
                    .get(&id)
                    .is_some_and(|timer| timer.generation == generation)
                {
                    timers.remove(&id);
                }
            }
            tracing::info!(id, "Alarm fired");
            sink.deliver(&alarm);
        });
        if let Some(previous) = armed.insert(id, ArmedTimer { generation, task }) {
            previous.task.abort();
        }
        Ok(())
    }

    fn disarm(&self, id: NotificationId) {
        if let Some(timer) = lock(&self.timers).remove(&id) {
            timer.task.abort();
        }
    }
}

impl<K: AlarmSink> Drop for TokioAlarmPlatform<K> {
    fn drop(&mut self) {
        for (_, timer) in lock(&self.timers).drain() {
            timer.task.abort();
        }
    }
}

fn lock(timers: &TimerMap) -> MutexGuard<'_, HashMap<NotificationId, ArmedTimer>> {
    timers
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

fn round_up_to_window(delay: Duration, window: Duration) -> Duration {
    let window_ms = window.as_millis();
    if window_ms == 0 {
        return delay;
    }
    let delay_ms = delay.as_millis();
    let rounded = delay_ms.div_ceil(window_ms) * window_ms;
    Duration::from_millis(u64::try_from(rounded).unwrap_or(u64::MAX))
}
