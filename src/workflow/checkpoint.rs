//! In-memory checkpoint store keyed by task, guarded by a concurrent map
//! (spec.md §5 shared-resource policy: same pattern as the state machine's
//! history table).

use dashmap::DashMap;

use crate::identifiers::TaskId;

use super::types::Checkpoint;

/// Append-only per-task checkpoint history. An executor calls
/// [`CheckpointStore::record`] between stages; [`CheckpointStore::latest`]
/// and [`CheckpointStore::latest_at_or_before`] drive resume.
pub struct CheckpointStore {
    checkpoints: DashMap<TaskId, Vec<Checkpoint>>,
}

impl CheckpointStore {
    #[must_use]
    pub fn new() -> Self {
        Self { checkpoints: DashMap::new() }
    }

    pub fn record(&self, checkpoint: Checkpoint) {
        self.checkpoints.entry(checkpoint.task_id).or_default().push(checkpoint);
    }

    #[must_use]
    pub fn latest(&self, task_id: TaskId) -> Option<Checkpoint> {
        self.checkpoints.get(&task_id).and_then(|entries| entries.last().cloned())
    }

    /// The most recent checkpoint with `stage_index <= checkpoint_id`'s
    /// stage, used by `resume(runtime, checkpoint_id?)` (spec.md §4.8).
    ///
    /// Compares `stage_index` numerically (parsed from the trailing
    /// `-<stage_index>` of `checkpoint_id`) rather than comparing the ids as
    /// strings, since `"{task_id}-9"` sorts after `"{task_id}-10"` under
    /// plain string ordering once a task reaches double-digit stages.
    #[must_use]
    pub fn latest_at_or_before(&self, task_id: TaskId, checkpoint_id: &str) -> Option<Checkpoint> {
        let bound = checkpoint_id.rsplit('-').next().and_then(|s| s.parse::<u32>().ok())?;
        self.checkpoints.get(&task_id).and_then(|entries| {
            entries
                .iter()
                .filter(|c| c.stage_index <= bound)
                .max_by_key(|c| c.stage_index)
                .cloned()
        })
    }

    #[must_use]
    pub fn history(&self, task_id: TaskId) -> Vec<Checkpoint> {
        self.checkpoints.get(&task_id).map(|e| e.clone()).unwrap_or_default()
    }

    pub fn reset(&self) {
        self.checkpoints.clear();
    }
}

impl Default for CheckpointStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn latest_returns_most_recently_recorded_checkpoint() {
        let store = CheckpointStore::new();
        let task_id = TaskId::new();
        store.record(Checkpoint::new(task_id, "stage-0", 0, json!({})));
        store.record(Checkpoint::new(task_id, "stage-1", 1, json!({})));
        assert_eq!(store.latest(task_id).unwrap().stage_index, 1);
    }

    #[test]
    fn unknown_task_has_no_checkpoints() {
        let store = CheckpointStore::new();
        assert!(store.latest(TaskId::new()).is_none());
    }

    #[test]
    fn latest_at_or_before_compares_stage_index_numerically_past_single_digits() {
        let store = CheckpointStore::new();
        let task_id = TaskId::new();
        for stage in 0..=12u32 {
            store.record(Checkpoint::new(task_id, format!("stage-{stage}"), stage, json!({})));
        }
        let bound_checkpoint_id = format!("{task_id}-10");
        let found = store.latest_at_or_before(task_id, &bound_checkpoint_id).unwrap();
        assert_eq!(found.stage_index, 10, "stage 9 must not be preferred over stage 10 as 'at or before'");

        let bound_checkpoint_id = format!("{task_id}-9");
        let found = store.latest_at_or_before(task_id, &bound_checkpoint_id).unwrap();
        assert_eq!(found.stage_index, 9, "stage 10 must be excluded when the bound is stage 9");
    }
}
