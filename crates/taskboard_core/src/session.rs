use crate::clock::Clock;
use crate::error::AppError;
use crate::model::{Task, TaskId};
use crate::order::OrderTracker;
use crate::score::{DEFAULT_DECAY_DAYS, ScoreEngine, ScoreTier};
use crate::storage::Storage;
use crate::store::TaskStore;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

pub const TASKS_KEY: &str = "tasks";
pub const SCORE_KEY: &str = "productivityScore";
pub const LAST_RESET_KEY: &str = "lastResetDate";
pub const ORDER_KEY: &str = "taskOrder";
pub const LAST_ISSUED_KEY: &str = "lastIssuedId";

/// Input accepted by [`Session::dispatch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Add { title: String, description: String },
    Toggle { id: TaskId },
    Delete { id: TaskId },
    Reorder { dragged_id: TaskId, target_id: TaskId },
    Tick { now: OffsetDateTime },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    Added(Task),
    Toggled(Task),
    Deleted(Task),
    Reordered { moved: bool },
    Ticked { reset: bool },
    /// The event referenced a task that no longer exists.
    Ignored(AppError),
}

/// Owns the task store, the pending order and the score, and is the only
/// writer to storage. Every mutation takes `&mut self`, so events are applied
/// one at a time.
pub struct Session<S, C> {
    storage: S,
    clock: C,
    store: TaskStore,
    order: OrderTracker,
    score: ScoreEngine,
    last_persistence_error: Option<AppError>,
}

impl<S: Storage, C: Clock> Session<S, C> {
    pub fn open(storage: S, clock: C) -> Result<Self, AppError> {
        Self::open_with_decay_days(storage, clock, DEFAULT_DECAY_DAYS)
    }

    pub fn open_with_decay_days(storage: S, clock: C, decay_days: u32) -> Result<Self, AppError> {
        let now = clock.now();
        let mut read_error = None;
        let mut read = |key: &str| match storage.get(key) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(key, error = %err, "failed to read record, using default");
                read_error = Some(err);
                None
            }
        };

        let tasks = match read(TASKS_KEY) {
            Some(raw) => serde_json::from_str::<Vec<Task>>(&raw)
                .map_err(|err| AppError::invalid_data(format!("{TASKS_KEY}: {err}")))?,
            None => Vec::new(),
        };
        let score = match read(SCORE_KEY) {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map_err(|err| AppError::invalid_data(format!("{SCORE_KEY}: {err}")))?,
            None => 0,
        };
        let last_reset_at = match read(LAST_RESET_KEY) {
            Some(raw) => Some(OffsetDateTime::parse(raw.trim(), &Rfc3339).map_err(|_| {
                AppError::invalid_data(format!("{LAST_RESET_KEY} must be RFC3339"))
            })?),
            None => None,
        };
        let order = match read(ORDER_KEY) {
            Some(raw) => serde_json::from_str::<Vec<TaskId>>(&raw)
                .map_err(|err| AppError::invalid_data(format!("{ORDER_KEY}: {err}")))?,
            None => Vec::new(),
        };
        let last_issued = match read(LAST_ISSUED_KEY) {
            Some(raw) => raw
                .trim()
                .parse::<i128>()
                .map_err(|err| AppError::invalid_data(format!("{LAST_ISSUED_KEY}: {err}")))?,
            None => 0,
        };

        let first_run = last_reset_at.is_none();
        let store = TaskStore::from_tasks(tasks)?.with_last_issued(last_issued);
        let mut order = OrderTracker::from_ids(order);
        order.reconcile(&store.pending_ids());
        let score =
            ScoreEngine::with_decay_days(score, last_reset_at.unwrap_or(now), decay_days);

        let mut session = Self {
            storage,
            clock,
            store,
            order,
            score,
            last_persistence_error: read_error,
        };

        tracing::debug!(
            tasks = session.store.list().len(),
            score = session.score.score(),
            first_run,
            "session opened"
        );

        let reset = session.score.check_decay(now);
        if reset || first_run {
            session.persist();
        }

        Ok(session)
    }

    pub fn add(&mut self, title: &str, description: &str) -> Result<Task, AppError> {
        let task = self.store.add(title, description, self.clock.now())?;
        tracing::info!(id = %task.id, "task added");
        self.commit();
        Ok(task)
    }

    pub fn toggle(&mut self, id: &TaskId) -> Result<Task, AppError> {
        let (task, transition) = self.store.toggle(id)?;
        self.score.on_status_change(transition);
        tracing::info!(
            id = %task.id,
            status = task.status.label(),
            score = self.score.score(),
            "task toggled"
        );
        self.commit();
        Ok(task)
    }

    /// Removes a task. The score keeps any point the task earned.
    pub fn delete(&mut self, id: &TaskId) -> Result<Task, AppError> {
        let task = self.store.delete(id)?;
        tracing::info!(id = %task.id, "task deleted");
        self.commit();
        Ok(task)
    }

    pub fn reorder(&mut self, dragged_id: &TaskId, target_id: &TaskId) -> bool {
        let moved = self.order.reorder(dragged_id, target_id);
        if moved {
            tracing::info!(dragged = %dragged_id, target = %target_id, "pending order changed");
            self.persist();
        } else {
            tracing::debug!(dragged = %dragged_id, target = %target_id, "reorder ignored");
        }
        moved
    }

    /// Re-evaluates the decay window at `now`.
    pub fn tick(&mut self, now: OffsetDateTime) -> bool {
        let reset = self.score.check_decay(now);
        if reset {
            self.persist();
        }
        reset
    }

    pub fn dispatch(&mut self, event: SessionEvent) -> Result<EventOutcome, AppError> {
        let result = match event {
            SessionEvent::Add { title, description } => {
                self.add(&title, &description).map(EventOutcome::Added)
            }
            SessionEvent::Toggle { id } => self.toggle(&id).map(EventOutcome::Toggled),
            SessionEvent::Delete { id } => self.delete(&id).map(EventOutcome::Deleted),
            SessionEvent::Reorder {
                dragged_id,
                target_id,
            } => Ok(EventOutcome::Reordered {
                moved: self.reorder(&dragged_id, &target_id),
            }),
            SessionEvent::Tick { now } => Ok(EventOutcome::Ticked {
                reset: self.tick(now),
            }),
        };

        match result {
            Err(err) if err.is_not_found() => {
                tracing::debug!(error = %err, "event ignored");
                Ok(EventOutcome::Ignored(err))
            }
            other => other,
        }
    }

    pub fn current_tasks(&self) -> &[Task] {
        self.store.list()
    }

    pub fn current_pending_ordered(&self) -> Vec<Task> {
        self.order.ordered_view(self.store.list())
    }

    pub fn current_completed(&self) -> Vec<Task> {
        self.store.completed()
    }

    pub fn current_score(&self) -> u64 {
        self.score.score()
    }

    pub fn score_tier(&self) -> ScoreTier {
        self.score.tier()
    }

    pub fn last_reset_at(&self) -> OffsetDateTime {
        self.score.last_reset_at()
    }

    pub fn decay_days(&self) -> u32 {
        self.score.decay_days()
    }

    pub fn task(&self, id: &TaskId) -> Option<&Task> {
        self.store.get(id)
    }

    /// The most recent storage failure, cleared by the next successful write.
    pub fn last_persistence_error(&self) -> Option<&AppError> {
        self.last_persistence_error.as_ref()
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    fn commit(&mut self) {
        self.order.reconcile(&self.store.pending_ids());
        self.persist();
    }

    // In-memory state stays authoritative when the write fails; the next
    // mutation writes everything again.
    fn persist(&mut self) {
        match self.encode_records() {
            Ok(records) => match self.storage.set_many(&records) {
                Ok(()) => self.last_persistence_error = None,
                Err(err) => {
                    tracing::warn!(error = %err, "failed to persist session state");
                    self.last_persistence_error = Some(err);
                }
            },
            Err(err) => {
                tracing::warn!(error = %err, "failed to encode session state");
                self.last_persistence_error = Some(err);
            }
        }
    }

    fn encode_records(&self) -> Result<Vec<(&'static str, String)>, AppError> {
        let tasks = serde_json::to_string(self.store.list())
            .map_err(|err| AppError::invalid_data(err.to_string()))?;
        let order = serde_json::to_string(self.order.ids())
            .map_err(|err| AppError::invalid_data(err.to_string()))?;
        let last_reset_at = self
            .score
            .last_reset_at()
            .format(&Rfc3339)
            .map_err(|err| AppError::invalid_data(err.to_string()))?;

        Ok(vec![
            (TASKS_KEY, tasks),
            (SCORE_KEY, self.score.score().to_string()),
            (LAST_RESET_KEY, last_reset_at),
            (ORDER_KEY, order),
            (LAST_ISSUED_KEY, self.store.last_issued().to_string()),
        ])
    }
}
