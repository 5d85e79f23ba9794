use crate::model::{Task, TaskId};
use std::collections::{HashMap, HashSet};

/// User-controlled display order for pending tasks.
///
/// Completed tasks are never tracked here; they show in store order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderTracker {
    order: Vec<TaskId>,
}

impl OrderTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from a persisted sequence. Call [`OrderTracker::reconcile`] before use.
    pub fn from_ids(order: Vec<TaskId>) -> Self {
        Self { order }
    }

    pub fn ids(&self) -> &[TaskId] {
        &self.order
    }

    /// Keeps tracked ids that are still pending in their current relative order,
    /// then appends newly pending ids in the order given (store insertion order).
    pub fn reconcile(&mut self, current_pending_ids: &[TaskId]) {
        let pending: HashSet<&TaskId> = current_pending_ids.iter().collect();
        let mut tracked = HashSet::with_capacity(self.order.len());
        self.order
            .retain(|id| pending.contains(id) && tracked.insert(id.clone()));

        for id in current_pending_ids {
            if !tracked.contains(id) {
                tracked.insert(id.clone());
                self.order.push(id.clone());
            }
        }
    }

    /// Moves `dragged_id` into the slot `target_id` held before the move.
    ///
    /// Returns `false` without touching the order when either id is untracked
    /// or both are the same.
    pub fn reorder(&mut self, dragged_id: &TaskId, target_id: &TaskId) -> bool {
        if dragged_id == target_id {
            return false;
        }
        let Some(dragged_index) = self.position(dragged_id) else {
            return false;
        };
        let Some(target_index) = self.position(target_id) else {
            return false;
        };

        let dragged = self.order.remove(dragged_index);
        self.order.insert(target_index, dragged);
        true
    }

    /// Pending tasks sorted by tracked position. Untracked tasks go last,
    /// keeping their relative input order.
    pub fn ordered_view(&self, tasks: &[Task]) -> Vec<Task> {
        let positions: HashMap<&TaskId, usize> = self
            .order
            .iter()
            .enumerate()
            .map(|(index, id)| (id, index))
            .collect();

        let mut pending: Vec<Task> = tasks
            .iter()
            .filter(|task| task.is_pending())
            .cloned()
            .collect();
        pending.sort_by_key(|task| positions.get(&task.id).copied().unwrap_or(usize::MAX));
        pending
    }

    fn position(&self, id: &TaskId) -> Option<usize> {
        self.order.iter().position(|tracked| tracked == id)
    }
}
