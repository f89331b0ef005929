//! # Alarm Scheduler
//!
//! One-shot alarms driven by the main loop. Each alarm is either
//! [`AlarmState::Idle`] or [`AlarmState::Armed`]; [`AlarmScheduler::tick`] fires
//! every armed alarm whose deadline has passed and returns it to idle.
//!
//! The scheduler never re-arms on its own. A handler that wants to run
//! periodically answers [`AlarmAction::Reschedule`] from
//! [`AlarmHandler::on_alarm`], which the scheduler applies after the handler
//! returns. Anyone holding the scheduler may also call
//! [`AlarmScheduler::reset`] directly, e.g. to push back a poll that was just
//! performed out of cycle.

use crate::clock::{Clock, SystemClock};
use crate::events::EventError;
use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, trace};

/// Handle to an alarm created by an [`AlarmScheduler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AlarmId(usize);

impl AlarmId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for AlarmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "alarm#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmState {
    Idle,
    Armed,
}

/// What the scheduler should do with an alarm after its handler ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmAction {
    /// Re-arm the alarm to fire again this many seconds from now
    Reschedule(u64),
    /// Leave the alarm idle
    Stop,
}

#[async_trait]
pub trait AlarmHandler: Send + Sync {
    async fn on_alarm(&self, alarm: AlarmId) -> AlarmAction;
    fn handler_name(&self) -> &str;
}

/// Adapter turning an async closure into an [`AlarmHandler`].
pub struct FnAlarmHandler<F> {
    name: String,
    handler: F,
}

impl<F, Fut> FnAlarmHandler<F>
where
    F: Fn(AlarmId) -> Fut + Send + Sync,
    Fut: Future<Output = AlarmAction> + Send + 'static,
{
    pub fn new(name: impl Into<String>, handler: F) -> Self {
        Self {
            name: name.into(),
            handler,
        }
    }
}

#[async_trait]
impl<F, Fut> AlarmHandler for FnAlarmHandler<F>
where
    F: Fn(AlarmId) -> Fut + Send + Sync,
    Fut: Future<Output = AlarmAction> + Send + 'static,
{
    async fn on_alarm(&self, alarm: AlarmId) -> AlarmAction {
        (self.handler)(alarm).await
    }

    fn handler_name(&self) -> &str {
        &self.name
    }
}

struct AlarmSlot {
    handler: Arc<dyn AlarmHandler>,
    deadline: u64,
    state: AlarmState,
}

pub struct AlarmScheduler {
    alarms: Mutex<Vec<AlarmSlot>>,
    clock: Arc<dyn Clock>,
}

impl AlarmScheduler {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            alarms: Mutex::new(Vec::new()),
            clock,
        }
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        self.clock.clone()
    }

    /// Creates a new idle alarm.
    pub async fn create(&self, handler: Arc<dyn AlarmHandler>) -> AlarmId {
        let mut alarms = self.alarms.lock().await;
        let id = AlarmId(alarms.len());
        debug!("⏰ Created {} for {}", id, handler.handler_name());
        alarms.push(AlarmSlot {
            handler,
            deadline: 0,
            state: AlarmState::Idle,
        });
        id
    }

    /// Arms `alarm` to fire `delta_seconds` from now, replacing any pending deadline.
    pub async fn reset(&self, alarm: AlarmId, delta_seconds: u64) -> Result<(), EventError> {
        let deadline = self.clock.now().saturating_add(delta_seconds);
        let mut alarms = self.alarms.lock().await;
        let slot = alarms
            .get_mut(alarm.0)
            .ok_or(EventError::UnknownAlarm(alarm.0))?;
        slot.deadline = deadline;
        slot.state = AlarmState::Armed;
        trace!("{} armed for {}", alarm, deadline);
        Ok(())
    }

    pub async fn state(&self, alarm: AlarmId) -> Option<AlarmState> {
        self.alarms.lock().await.get(alarm.0).map(|slot| slot.state)
    }

    /// Deadline of an armed alarm, `None` when idle or unknown.
    pub async fn deadline(&self, alarm: AlarmId) -> Option<u64> {
        self.alarms
            .lock()
            .await
            .get(alarm.0)
            .filter(|slot| slot.state == AlarmState::Armed)
            .map(|slot| slot.deadline)
    }

    /// Fires every armed alarm whose deadline is at or before `now`.
    ///
    /// Due alarms fire in creation order. Returns how many fired.
    pub async fn tick(&self, now: u64) -> usize {
        let due: Vec<(AlarmId, Arc<dyn AlarmHandler>)> = {
            let mut alarms = self.alarms.lock().await;
            alarms
                .iter_mut()
                .enumerate()
                .filter(|(_, slot)| slot.state == AlarmState::Armed && slot.deadline <= now)
                .map(|(index, slot)| {
                    slot.state = AlarmState::Idle;
                    (AlarmId(index), slot.handler.clone())
                })
                .collect()
        };

        for (id, handler) in &due {
            debug!("⏰ {} fired ({})", id, handler.handler_name());
            match handler.on_alarm(*id).await {
                AlarmAction::Reschedule(seconds) => {
                    // The id came from our own table, so this cannot miss.
                    let _ = self.reset(*id, seconds).await;
                }
                AlarmAction::Stop => {}
            }
        }

        due.len()
    }
}

impl Default for AlarmScheduler {
    fn default() -> Self {
        Self::new()
    }
}
