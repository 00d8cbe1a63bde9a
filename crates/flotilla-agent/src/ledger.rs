use std::collections::BTreeMap;

use flotilla_protocol::{AgentId, Task, TaskId};

/// Local, eventually-consistent replica of all known tasks.
///
/// Mutated by gossip (announce/done/assign) and, on the leader, by the
/// allocator. Backed by a `BTreeMap` so allocation passes walk tasks in id
/// order, which keeps seeded simulation runs reproducible.
#[derive(Debug, Default)]
pub struct TaskLedger {
    tasks: BTreeMap<TaskId, Task>,
}

impl TaskLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adopt an announced task verbatim, first writer wins: a re-announce of
    /// a known id never overwrites local state. Returns whether the task was
    /// adopted.
    pub fn announce(&mut self, task: Task) -> bool {
        if self.tasks.contains_key(&task.id) {
            return false;
        }
        tracing::debug!(task_id = %task.id, capability = %task.capability, "Adopted announced task");
        self.tasks.insert(task.id, task);
        true
    }

    /// Mark a known task completed. Idempotent and monotonic; unknown ids
    /// are ignored. Returns true when this call changed the state.
    pub fn complete(&mut self, task_id: TaskId) -> bool {
        match self.tasks.get_mut(&task_id) {
            Some(task) if !task.completed => {
                task.completed = true;
                true
            }
            _ => false,
        }
    }

    /// Adopt a leader-authored assignment addressed to `self_id`. The
    /// message is authoritative for the assignment fields, but a locally
    /// completed task never reverts to incomplete (re-gossiped assignments
    /// race with completion notices). Returns the merged completed state.
    pub fn adopt_assignment(&mut self, task_id: TaskId, mut task: Task, self_id: AgentId) -> bool {
        let already_completed = self
            .tasks
            .get(&task_id)
            .map(|existing| existing.completed)
            .unwrap_or(false);

        task.assigned_to = Some(self_id);
        task.completed = task.completed || already_completed;
        let completed = task.completed;
        self.tasks.insert(task_id, task);
        completed
    }

    pub fn get(&self, task_id: TaskId) -> Option<&Task> {
        self.tasks.get(&task_id)
    }

    pub fn get_mut(&mut self, task_id: TaskId) -> Option<&mut Task> {
        self.tasks.get_mut(&task_id)
    }

    pub fn contains(&self, task_id: TaskId) -> bool {
        self.tasks.contains_key(&task_id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Tasks in ascending id order.
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    pub(crate) fn tasks_mut(&mut self) -> impl Iterator<Item = &mut Task> {
        self.tasks.values_mut()
    }
}
