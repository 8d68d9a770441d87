use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use crate::models::{Profile, Task};

/// In-memory profile shared across the event loop. Mutations here are
/// unconditional; day-based authorization happens in the command layer.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<Mutex<Profile>>,
}

impl AppState {
    pub fn new(profile: Profile) -> Self {
        Self {
            inner: Arc::new(Mutex::new(profile)),
        }
    }

    pub fn profile(&self) -> Profile {
        self.inner.lock().expect("state poisoned").clone()
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.inner.lock().expect("state poisoned").tasks.clone()
    }

    pub fn name(&self) -> String {
        self.inner.lock().expect("state poisoned").name.clone()
    }

    pub fn set_name(&self, name: String) {
        self.inner.lock().expect("state poisoned").name = name;
    }

    /// New tasks go to the front, matching the client's insertion order.
    pub fn add_task_front(&self, task: Task) {
        let mut guard = self.inner.lock().expect("state poisoned");
        guard.tasks.insert(0, task);
    }

    pub fn find_task(&self, task_id: &str) -> Option<Task> {
        let guard = self.inner.lock().expect("state poisoned");
        guard.tasks.iter().find(|t| t.id == task_id).cloned()
    }

    pub fn toggle_task(&self, task_id: &str) -> Option<Task> {
        let mut guard = self.inner.lock().expect("state poisoned");
        let task = guard.tasks.iter_mut().find(|t| t.id == task_id)?;
        task.completed = !task.completed;
        Some(task.clone())
    }

    pub fn update_description(&self, task_id: &str, description: String) -> Option<Task> {
        let mut guard = self.inner.lock().expect("state poisoned");
        let task = guard.tasks.iter_mut().find(|t| t.id == task_id)?;
        task.description = description;
        Some(task.clone())
    }

    pub fn remove_task(&self, task_id: &str) {
        let mut guard = self.inner.lock().expect("state poisoned");
        guard.tasks.retain(|task| task.id != task_id);
    }

    pub fn replace_tasks(&self, tasks: Vec<Task>) {
        self.inner.lock().expect("state poisoned").tasks = tasks;
    }

    pub fn uncomplete_all(&self) {
        let mut guard = self.inner.lock().expect("state poisoned");
        for task in &mut guard.tasks {
            task.completed = false;
        }
    }

    pub fn templates(&self) -> Vec<String> {
        self.inner.lock().expect("state poisoned").templates.clone()
    }

    pub fn set_templates(&self, templates: Vec<String>) {
        self.inner.lock().expect("state poisoned").templates = templates;
    }

    pub fn initialized_days(&self) -> BTreeSet<String> {
        self.inner
            .lock()
            .expect("state poisoned")
            .initialized_days
            .clone()
    }

    pub fn set_initialized_days(&self, days: BTreeSet<String>) {
        self.inner.lock().expect("state poisoned").initialized_days = days;
    }

    /// Destructive overwrite used by import and remote subscription pushes.
    pub fn replace_profile(&self, profile: Profile) {
        *self.inner.lock().expect("state poisoned") = profile;
    }

    pub fn clear(&self) {
        self.replace_profile(Profile::default());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: &str) -> Task {
        Task::new(
            id.to_string(),
            format!("task-{id}"),
            "2024-01-10T00:00:00+00:00".to_string(),
        )
    }

    #[test]
    fn add_task_front_prepends() {
        let state = AppState::new(Profile::default());
        state.add_task_front(task("a"));
        state.add_task_front(task("b"));
        let ids: Vec<String> = state.tasks().into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn toggle_flips_and_reports() {
        let state = AppState::new(Profile::default());
        state.add_task_front(task("a"));

        let toggled = state.toggle_task("a").expect("task exists");
        assert!(toggled.completed);
        let toggled = state.toggle_task("a").expect("task exists");
        assert!(!toggled.completed);
        assert!(state.toggle_task("missing").is_none());
    }

    #[test]
    fn update_description_only_touches_description() {
        let state = AppState::new(Profile::default());
        state.add_task_front(task("a"));
        let updated = state
            .update_description("a", "details".to_string())
            .expect("task exists");
        assert_eq!(updated.description, "details");
        assert!(!updated.completed);
        assert!(state.update_description("missing", String::new()).is_none());
    }

    #[test]
    fn uncomplete_all_resets_every_task() {
        let state = AppState::new(Profile::default());
        state.add_task_front(task("a"));
        state.add_task_front(task("b"));
        state.toggle_task("a");
        state.toggle_task("b");

        state.uncomplete_all();
        assert!(state.tasks().iter().all(|t| !t.completed));
    }

    #[test]
    fn replace_profile_overwrites_everything() {
        let state = AppState::new(Profile::default());
        state.add_task_front(task("a"));
        state.set_name("Old".to_string());

        let mut incoming = Profile::default();
        incoming.name = "Ana".to_string();
        incoming.tasks = vec![task("x")];
        state.replace_profile(incoming.clone());

        assert_eq!(state.profile(), incoming);
        state.clear();
        assert_eq!(state.profile(), Profile::default());
    }
}
