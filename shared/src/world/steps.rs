use std::collections::HashMap;

use crate::{Step, StepChange, StepState, Transition};

/// Last known state of a Step (timer)
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StepRecord {
    pub id: String,
    pub running: bool,
    pub state: Option<StepState>,
    pub duration: Option<u64>,
    pub elapsed_seconds: Option<u64>,
    pub remaining_seconds: Option<u64>,
}

/// Step state, buffered and committed alongside the Scope batch.
#[derive(Default)]
pub struct StepStore {
    steps: HashMap<String, StepRecord>,
    updates: Vec<(StepChange, bool)>,
}

impl StepStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply_update(&mut self, change: StepChange, removed: bool) {
        self.updates.push((change, removed));
    }

    pub fn commit(&mut self) {
        for (change, removed) in std::mem::take(&mut self.updates) {
            if removed {
                self.steps.remove(&change.id);
                continue;
            }
            let record = self.record_mut(&change.id);
            record.running = change.running;
            record.elapsed_seconds = change.elapsed_seconds;
            record.remaining_seconds = change.remaining_seconds;
        }
    }

    /// Records a Step returned by a creation call
    pub fn record_step(&mut self, step: &Step) {
        let record = self.record_mut(&step.id);
        record.state = Some(step.state);
        record.duration = Some(step.duration);
        record.running = step.state == StepState::Running;
    }

    pub fn record_transition(&mut self, transition: &Transition) {
        let record = self.record_mut(&transition.step.id);
        record.state = Some(transition.to);
        record.duration = Some(transition.step.duration);
        record.running = transition.to == StepState::Running;
    }

    pub fn get(&self, id: &str) -> Option<&StepRecord> {
        self.steps.get(id)
    }

    pub fn has_pending(&self) -> bool {
        !self.updates.is_empty()
    }

    pub(crate) fn take_pending(&mut self) -> Vec<(StepChange, bool)> {
        std::mem::take(&mut self.updates)
    }

    pub(crate) fn restore_pending(&mut self, updates: Vec<(StepChange, bool)>) {
        self.updates = updates;
    }

    fn record_mut(&mut self, id: &str) -> &mut StepRecord {
        self.steps.entry(id.to_string()).or_insert_with(|| StepRecord {
            id: id.to_string(),
            ..StepRecord::default()
        })
    }
}
