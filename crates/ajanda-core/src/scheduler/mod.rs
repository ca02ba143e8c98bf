//! One-shot local alarms keyed by notification record id.
//!
//! [`AlarmScheduler`] decides *whether* and *when* a record gets an alarm;
//! the [`AlarmPlatform`] it wraps owns the actual timers. Scheduling problems
//! are never errors for the caller: they are logged and reported as a
//! [`ScheduleOutcome`].

mod tokio_platform;

#[cfg(test)]
pub(crate) mod recording;

use chrono::{DateTime, Local};

use crate::error::Result;
use crate::models::{to_local_instant, NotificationId, NotificationRecord};
use crate::util::is_blank;

pub use tokio_platform::{AlarmSink, TokioAlarmPlatform, DEFAULT_INEXACT_WINDOW};

pub const ALARM_TITLE: &str = "reminder";

/// Payload handed to the platform and delivered when the alarm fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledAlarm {
    pub id: NotificationId,
    pub title: String,
    pub description: String,
    pub company: String,
    pub name: String,
}

impl ScheduledAlarm {
    #[must_use]
    pub fn from_record(record: &NotificationRecord) -> Self {
        Self {
            id: record.id,
            title: ALARM_TITLE.to_string(),
            description: record.description.clone().unwrap_or_default(),
            company: record.company.clone().unwrap_or_default(),
            name: record.full_name.clone().unwrap_or_default(),
        }
    }

    /// Notification body, one labelled line per non-empty field.
    #[must_use]
    pub fn body(&self) -> String {
        [
            ("Company", &self.company),
            ("Person", &self.name),
            ("Description", &self.description),
        ]
        .iter()
        .filter(|(_, value)| !value.trim().is_empty())
        .map(|(label, value)| format!("{label}: {}", value.trim()))
        .collect::<Vec<_>>()
        .join("\n")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmPrecision {
    Exact,
    /// Best-effort timer the platform may delay.
    Inexact,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    MissingTime,
    UnparseableTime(String),
    NotInFuture,
    PlatformFailure(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleOutcome {
    Armed {
        fire_at: DateTime<Local>,
        precision: AlarmPrecision,
    },
    Skipped(SkipReason),
}

impl ScheduleOutcome {
    #[must_use]
    pub const fn is_armed(&self) -> bool {
        matches!(self, Self::Armed { .. })
    }
}

/// Platform timer facility.
///
/// Arming an id that is already armed replaces the previous timer, so at
/// most one alarm exists per id. Disarming an unknown id is a no-op.
pub trait AlarmPlatform: Send + Sync + 'static {
    /// Whether precise wake-ups are currently permitted.
    fn can_schedule_exact(&self) -> bool;

    fn arm(
        &self,
        alarm: ScheduledAlarm,
        fire_at: DateTime<Local>,
        precision: AlarmPrecision,
    ) -> Result<()>;

    fn disarm(&self, id: NotificationId);
}

pub struct AlarmScheduler<P: AlarmPlatform> {
    platform: P,
}

impl<P: AlarmPlatform> AlarmScheduler<P> {
    pub const fn new(platform: P) -> Self {
        Self { platform }
    }

    pub const fn platform(&self) -> &P {
        &self.platform
    }

    /// Arm an alarm at the record's occurrence time.
    ///
    /// Records without a parseable, strictly future time are skipped. When
    /// exact alarms are not permitted an inexact one is armed instead.
    pub fn schedule(&self, record: &NotificationRecord) -> ScheduleOutcome {
        let outcome = self.try_schedule(record);
        match &outcome {
            ScheduleOutcome::Armed { fire_at, precision } => {
                tracing::info!(
                    id = record.id,
                    fire_at = %fire_at,
                    ?precision,
                    "Alarm scheduled"
                );
            }
            ScheduleOutcome::Skipped(reason) => {
                tracing::warn!(id = record.id, ?reason, "Alarm not scheduled");
            }
        }
        outcome
    }

    fn try_schedule(&self, record: &NotificationRecord) -> ScheduleOutcome {
        let raw = record.occurs_at.as_deref();
        if is_blank(raw) {
            return ScheduleOutcome::Skipped(SkipReason::MissingTime);
        }
        let Some(fire_at) = record.occurs_at_local().and_then(to_local_instant) else {
            return ScheduleOutcome::Skipped(SkipReason::UnparseableTime(
                raw.unwrap_or_default().to_string(),
            ));
        };
        if fire_at <= Local::now() {
            return ScheduleOutcome::Skipped(SkipReason::NotInFuture);
        }

        let precision = if self.platform.can_schedule_exact() {
            AlarmPrecision::Exact
        } else {
            AlarmPrecision::Inexact
        };
        match self
            .platform
            .arm(ScheduledAlarm::from_record(record), fire_at, precision)
        {
            Ok(()) => ScheduleOutcome::Armed { fire_at, precision },
            Err(error) => ScheduleOutcome::Skipped(SkipReason::PlatformFailure(error.to_string())),
        }
    }

    pub fn cancel(&self, id: NotificationId) {
        self.platform.disarm(id);
        tracing::debug!(id, "Alarm cancelled");
    }

    pub fn reschedule(&self, record: &NotificationRecord) -> ScheduleOutcome {
        self.cancel(record.id);
        self.schedule(record)
    }

    /// Re-arm every record with a future occurrence time; returns how many
    /// were armed. Used after a restart, when platform timers are gone.
    pub fn restore<'a>(&self, records: impl IntoIterator<Item = &'a NotificationRecord>) -> usize {
        let armed = records
            .into_iter()
            .filter(|record| self.reschedule(record).is_armed())
            .count();
        tracing::info!(armed, "Alarms restored");
        armed
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::recording::{PlatformCall, RecordingPlatform};
    use super::*;
    use crate::error::Error;

    fn record(id: NotificationId, occurs_at: Option<&str>) -> NotificationRecord {
        NotificationRecord {
            id,
            company: Some("Acme".to_string()),
            full_name: Some("Ada Lovelace".to_string()),
            description: Some("Quarterly review".to_string()),
            occurs_at: occurs_at.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn future_record_arms_exact_alarm() {
        let scheduler = AlarmScheduler::new(RecordingPlatform::default());
        let outcome = scheduler.schedule(&record(7, Some("2099-01-01T10:00:00Z")));

        assert!(matches!(
            outcome,
            ScheduleOutcome::Armed {
                precision: AlarmPrecision::Exact,
                ..
            }
        ));
        let armed = scheduler.platform().armed();
        assert_eq!(armed.len(), 1);
        assert_eq!(armed[0].id, 7);
        assert_eq!(armed[0].title, "reminder");
    }

    #[test]
    fn missing_exact_permission_falls_back_to_inexact() {
        let scheduler = AlarmScheduler::new(RecordingPlatform::without_exact());
        let outcome = scheduler.schedule(&record(7, Some("2099-01-01T10:00:00Z")));
        assert!(matches!(
            outcome,
            ScheduleOutcome::Armed {
                precision: AlarmPrecision::Inexact,
                ..
            }
        ));
        assert_eq!(scheduler.platform().armed().len(), 1);
    }

    #[test]
    fn past_missing_and_garbled_times_never_arm() {
        let scheduler = AlarmScheduler::new(RecordingPlatform::default());
        let cases = [
            (record(1, Some("2000-01-01T10:00:00Z")), SkipReason::NotInFuture),
            (record(2, None), SkipReason::MissingTime),
            (record(3, Some("   ")), SkipReason::MissingTime),
            (
                record(4, Some("01/02/2099 10:00")),
                SkipReason::UnparseableTime("01/02/2099 10:00".to_string()),
            ),
        ];
        for (record, reason) in cases {
            assert_eq!(scheduler.schedule(&record), ScheduleOutcome::Skipped(reason));
        }
        assert!(scheduler.platform().armed().is_empty());
    }

    #[test]
    fn platform_failure_is_reported_not_raised() {
        let platform = RecordingPlatform::default();
        platform.fail_next_arm(Error::Config("no runtime".to_string()));
        let scheduler = AlarmScheduler::new(platform);
        let outcome = scheduler.schedule(&record(7, Some("2099-01-01T10:00:00Z")));
        assert!(matches!(
            outcome,
            ScheduleOutcome::Skipped(SkipReason::PlatformFailure(_))
        ));
    }

    #[test]
    fn reschedule_cancels_before_arming() {
        let scheduler = AlarmScheduler::new(RecordingPlatform::default());
        scheduler.reschedule(&record(7, Some("2099-01-01T10:00:00Z")));
        let calls = scheduler.platform().calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0], PlatformCall::Disarm(7));
        assert!(matches!(calls[1], PlatformCall::Arm(ref alarm) if alarm.id == 7));
    }

    #[test]
    fn cancel_unknown_id_is_a_noop() {
        let scheduler = AlarmScheduler::new(RecordingPlatform::default());
        scheduler.cancel(42);
        scheduler.cancel(42);
        assert!(scheduler.platform().armed().is_empty());
    }

    #[test]
    fn restore_counts_only_future_records() {
        let scheduler = AlarmScheduler::new(RecordingPlatform::default());
        let records = vec![
            record(1, Some("2099-01-01T10:00:00Z")),
            record(2, Some("2000-01-01T10:00:00Z")),
            record(3, Some("2099-06-01T08:30:00")),
        ];
        assert_eq!(scheduler.restore(&records), 2);
        let mut ids = scheduler
            .platform()
            .armed()
            .iter()
            .map(|alarm| alarm.id)
            .collect::<Vec<_>>();
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn body_skips_empty_parts() {
        let alarm = ScheduledAlarm {
            id: 1,
            title: ALARM_TITLE.to_string(),
            description: String::new(),
            company: "Acme".to_string(),
            name: "Ada".to_string(),
        };
        assert_eq!(alarm.body(), "Company: Acme\nPerson: Ada");
    }
}
