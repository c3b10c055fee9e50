//! Sequential unlock and completion rules over the claim steps.

use crate::{
    error::WorkflowError,
    state::{Step, WorkflowState},
};

pub struct StepGate;

impl StepGate {
    /// A step can be opened once its predecessor is done, and only until it is
    /// done itself.
    pub fn can_activate(state: &WorkflowState, step: Step) -> bool {
        let unlocked = match step.previous() {
            None => true,
            Some(previous) => state.is_completed(previous),
        };
        unlocked && !state.is_completed(step)
    }

    /// Open `step`, or close it if it is already the open one. Locked steps
    /// leave the state untouched.
    pub fn toggle_active(state: &WorkflowState, step: Step) -> WorkflowState {
        if !Self::can_activate(state, step) {
            return state.clone();
        }
        let mut next = state.clone();
        next.active_step = if state.active_step == Some(step) {
            None
        } else {
            Some(step)
        };
        next
    }

    pub fn mark_complete(state: &WorkflowState, step: Step) -> Result<WorkflowState, WorkflowError> {
        if state.is_completed(step) {
            return Err(WorkflowError::InvariantViolation(format!(
                "step {step} is already complete"
            )));
        }
        if let Some(previous) = step.previous() {
            if !state.is_completed(previous) {
                return Err(WorkflowError::InvariantViolation(format!(
                    "step {step} completed before step {previous}"
                )));
            }
        }

        let mut next = state.clone();
        next.completed[step.index() - 1] = true;
        next.active_step = None;
        Ok(next)
    }
}
