//! Platform double that records every call.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Local};

use super::{AlarmPlatform, AlarmPrecision, ScheduledAlarm};
use crate::error::{Error, Result};
use crate::models::NotificationId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformCall {
    Arm(ScheduledAlarm),
    Disarm(NotificationId),
}

#[derive(Clone)]
pub struct RecordingPlatform {
    exact: bool,
    state: Arc<Mutex<RecordingState>>,
}

#[derive(Default)]
struct RecordingState {
    armed: BTreeMap<NotificationId, ScheduledAlarm>,
    calls: Vec<PlatformCall>,
    arm_failures: VecDeque<Error>,
}

impl Default for RecordingPlatform {
    fn default() -> Self {
        Self {
            exact: true,
            state: Arc::default(),
        }
    }
}

impl RecordingPlatform {
    pub fn without_exact() -> Self {
        Self {
            exact: false,
            ..Self::default()
        }
    }

    fn state(&self) -> MutexGuard<'_, RecordingState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    pub fn fail_next_arm(&self, error: Error) {
        self.state().arm_failures.push_back(error);
    }

    pub fn armed(&self) -> Vec<ScheduledAlarm> {
        self.state().armed.values().cloned().collect()
    }

    pub fn is_armed(&self, id: NotificationId) -> bool {
        self.state().armed.contains_key(&id)
    }

    pub fn calls(&self) -> Vec<PlatformCall> {
        self.state().calls.clone()
    }

    pub fn arm_count(&self) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|call| matches!(call, PlatformCall::Arm(_)))
            .count()
    }
}

impl AlarmPlatform for RecordingPlatform {
    fn can_schedule_exact(&self) -> bool {
        self.exact
    }

    fn arm(
        &self,
        alarm: ScheduledAlarm,
        _fire_at: DateTime<Local>,
        _precision: AlarmPrecision,
    ) -> Result<()> {
        let mut state = self.state();
        if let Some(error) = state.arm_failures.pop_front() {
            return Err(error);
        }
        state.calls.push(PlatformCall::Arm(alarm.clone()));
        state.armed.insert(alarm.id, alarm);
        Ok(())
    }

    fn disarm(&self, id: NotificationId) {
        let mut state = self.state();
        state.calls.push(PlatformCall::Disarm(id));
        state.armed.remove(&id);
    }
}
