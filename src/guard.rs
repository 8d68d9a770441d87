use crate::day::DayClass;

/// A mutation intent collected by the UI, authorized before it touches
/// the task collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mutation {
    ToggleComplete,
    EditDescription,
    Delete,
    Reorder,
    Add,
}

/// A rejected mutation. Non-destructive: the caller surfaces it as a
/// transient signal (shake) and leaves the task untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MutationRejected {
    pub mutation: Mutation,
    pub class: DayClass,
}

impl std::fmt::Display for MutationRejected {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let when = match self.class {
            DayClass::Past => "a past day",
            DayClass::Today => "today",
            DayClass::Future => "a future day",
        };
        match self.mutation {
            Mutation::ToggleComplete => write!(f, "tasks on {when} cannot be toggled"),
            Mutation::Reorder => write!(f, "tasks on {when} cannot be reordered"),
            _ => write!(f, "{:?} is not allowed on {when}", self.mutation),
        }
    }
}

impl std::error::Error for MutationRejected {}

/// Authorizes a mutation against the day classification of its target.
/// Toggling and reordering only make sense on the current day; editing a
/// description, deleting and adding are allowed everywhere.
pub fn authorize(mutation: Mutation, class: DayClass) -> Result<(), MutationRejected> {
    let allowed = match mutation {
        Mutation::ToggleComplete | Mutation::Reorder => class == DayClass::Today,
        Mutation::EditDescription | Mutation::Delete | Mutation::Add => true,
    };
    if allowed {
        Ok(())
    } else {
        Err(MutationRejected { mutation, class })
    }
}
