use crate::day::DayClass;
use crate::guard::Mutation;
use crate::models::Task;

pub const EVENT_STATE_UPDATED: &str = "state_updated";
pub const EVENT_MUTATION_REJECTED: &str = "mutation_rejected";
pub const EVENT_DAY_COMPLETED: &str = "day_completed";
pub const EVENT_NOTICE: &str = "notice";
/// Lifecycle of an optimistic remote write, payload `remote::WritePhase`.
pub const EVENT_WRITE_PHASE: &str = "write_phase";

/// Feedback the UI plays for a rejected mutation.
pub const SIGNAL_SHAKE: &str = "shake";

#[derive(Debug, Clone, serde::Serialize)]
pub struct StatePayload {
    pub name: String,
    pub tasks: Vec<Task>,
    pub templates: Vec<String>,
}

/// Non-destructive rejection signal: the task is untouched, the UI shakes.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RejectedPayload {
    pub task_id: Option<String>,
    pub mutation: Mutation,
    pub day_class: DayClass,
    pub signal: &'static str,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct NoticePayload {
    pub title: String,
    pub message: String,
}
