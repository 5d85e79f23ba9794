use crate::error::AppError;
use crate::model::{StatusTransition, Task, TaskId, TaskStatus};
use std::collections::HashSet;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

const ID_PREFIX: &str = "task-";

/// Authoritative task list, kept in insertion order.
#[derive(Debug, Clone, Default)]
pub struct TaskStore {
    tasks: Vec<Task>,
    last_issued: i128,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a store from persisted records. Duplicate ids are corrupt data.
    pub fn from_tasks(tasks: Vec<Task>) -> Result<Self, AppError> {
        let mut seen = HashSet::with_capacity(tasks.len());
        let mut last_issued = 0;
        for task in &tasks {
            if !seen.insert(task.id.clone()) {
                return Err(AppError::invalid_data(format!(
                    "duplicate task id {}",
                    task.id
                )));
            }
            if let Some(sequence) = id_sequence(&task.id) {
                last_issued = last_issued.max(sequence);
            }
        }

        Ok(Self { tasks, last_issued })
    }

    /// Raises the id high-water mark to a persisted value, so ids of tasks
    /// deleted in an earlier session are never issued again.
    pub fn with_last_issued(mut self, last_issued: i128) -> Self {
        self.last_issued = self.last_issued.max(last_issued);
        self
    }

    pub fn last_issued(&self) -> i128 {
        self.last_issued
    }

    pub fn add(
        &mut self,
        title: &str,
        description: &str,
        now: OffsetDateTime,
    ) -> Result<Task, AppError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(AppError::validation("title is required"));
        }
        let description = description.trim();
        if description.is_empty() {
            return Err(AppError::validation("description is required"));
        }

        let created_at = now
            .format(&Rfc3339)
            .map_err(|err| AppError::invalid_data(err.to_string()))?;
        let id = self.next_id(now);

        let task = Task {
            id,
            title: title.to_string(),
            description: description.to_string(),
            status: TaskStatus::Pending,
            created_at,
        };
        self.tasks.push(task.clone());

        Ok(task)
    }

    pub fn toggle(&mut self, id: &TaskId) -> Result<(Task, StatusTransition), AppError> {
        let task = self
            .tasks
            .iter_mut()
            .find(|task| &task.id == id)
            .ok_or_else(|| missing(id))?;

        let from = task.status;
        task.status = from.flipped();
        let transition = StatusTransition {
            from,
            to: task.status,
        };

        Ok((task.clone(), transition))
    }

    pub fn delete(&mut self, id: &TaskId) -> Result<Task, AppError> {
        let index = self
            .tasks
            .iter()
            .position(|task| &task.id == id)
            .ok_or_else(|| missing(id))?;

        Ok(self.tasks.remove(index))
    }

    pub fn list(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| &task.id == id)
    }

    pub fn pending_ids(&self) -> Vec<TaskId> {
        self.tasks
            .iter()
            .filter(|task| task.is_pending())
            .map(|task| task.id.clone())
            .collect()
    }

    pub fn completed(&self) -> Vec<Task> {
        self.tasks
            .iter()
            .filter(|task| task.status == TaskStatus::Completed)
            .cloned()
            .collect()
    }

    // Clock-derived, but strictly increasing so two adds in the same instant
    // still get distinct ids.
    fn next_id(&mut self, now: OffsetDateTime) -> TaskId {
        let mut sequence = now.unix_timestamp_nanos().max(self.last_issued + 1);
        loop {
            let id = TaskId::new(format!("{ID_PREFIX}{sequence}"));
            if self.get(&id).is_none() {
                self.last_issued = sequence;
                return id;
            }
            sequence += 1;
        }
    }
}

fn id_sequence(id: &TaskId) -> Option<i128> {
    id.as_str().strip_prefix(ID_PREFIX)?.parse().ok()
}

fn missing(id: &TaskId) -> AppError {
    AppError::not_found(format!("task {id} not found"))
}
