use std::collections::BTreeSet;

use chrono::{Local, NaiveDate, TimeZone, Utc};
use uuid::Uuid;

use crate::day::{classify_day, effective_day, DayClass};
use crate::models::Task;

/// Calendar-day key used by the initialized-days record, e.g. "2024-01-10".
pub fn day_key(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

/// RFC 3339 instant at local midnight of `day`.
pub fn start_of_day(day: NaiveDate) -> String {
    let midnight = day.and_time(chrono::NaiveTime::MIN);
    match Local.from_local_datetime(&midnight).earliest() {
        Some(instant) => instant.to_rfc3339(),
        // Local midnight can not exist across a DST gap; fall back to UTC.
        None => Utc.from_utc_datetime(&midnight).to_rfc3339(),
    }
}

pub fn fresh_task_id() -> String {
    Uuid::new_v4().to_string()
}

#[derive(Debug, Clone, PartialEq)]
pub struct Materialized {
    pub new_tasks: Vec<Task>,
    pub initialized_days: BTreeSet<String>,
}

/// Expands the daily templates into concrete tasks for `day`, at most once
/// per day key. Returns unchanged state (no new tasks) when the day was
/// already initialized, when there is nothing to expand, or when `day`
/// lies in the past: materialization never invents history retroactively.
pub fn materialize(
    day: NaiveDate,
    today: NaiveDate,
    templates: &[String],
    initialized_days: &BTreeSet<String>,
    existing_tasks: &[Task],
) -> Materialized {
    let key = day_key(day);
    let unchanged = || Materialized {
        new_tasks: Vec::new(),
        initialized_days: initialized_days.clone(),
    };

    if templates.is_empty() || initialized_days.contains(&key) {
        return unchanged();
    }
    if classify_day(day, today) == DayClass::Past {
        log::warn!("skipping template materialization for past day {key}");
        return unchanged();
    }

    let created_at = start_of_day(day);
    let new_tasks: Vec<Task> = templates
        .iter()
        .filter(|text| {
            // A matching task already on that day means the initialized flag
            // was lost, not that the template is new; do not duplicate it.
            !existing_tasks
                .iter()
                .any(|task| task.text == **text && effective_day(task, today) == day)
        })
        .map(|text| Task::new(fresh_task_id(), text.clone(), created_at.clone()))
        .collect();

    let mut initialized_days = initialized_days.clone();
    initialized_days.insert(key.clone());
    log::info!(
        "materialized {} template task(s) for day {key}",
        new_tasks.len()
    );
    Materialized {
        new_tasks,
        initialized_days,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::day::created_day;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn materializes_one_task_per_template() {
        let today = date(2024, 1, 10);
        let templates = vec!["Drink water".to_string()];
        let out = materialize(today, today, &templates, &BTreeSet::new(), &[]);

        assert_eq!(out.new_tasks.len(), 1);
        let task = &out.new_tasks[0];
        assert_eq!(task.text, "Drink water");
        assert!(!task.completed);
        assert_eq!(task.description, "");
        assert!(!task.id.is_empty());
        assert_eq!(created_day(task), Some(today));
        assert_eq!(
            out.initialized_days,
            BTreeSet::from(["2024-01-10".to_string()])
        );
    }

    #[test]
    fn materialize_is_idempotent_per_day_key() {
        let today = date(2024, 1, 10);
        let templates = vec!["Drink water".to_string(), "Stretch".to_string()];
        let first = materialize(today, today, &templates, &BTreeSet::new(), &[]);
        assert_eq!(first.new_tasks.len(), 2);

        let mut tasks = first.new_tasks.clone();
        let second = materialize(today, today, &templates, &first.initialized_days, &tasks);
        assert!(second.new_tasks.is_empty());
        assert_eq!(second.initialized_days, first.initialized_days);

        tasks.extend(second.new_tasks);
        assert_eq!(tasks.len(), 2);
    }

    #[test]
    fn past_day_is_never_materialized() {
        let today = date(2024, 1, 10);
        let yesterday = date(2024, 1, 9);
        let templates = vec!["Drink water".to_string()];
        let out = materialize(yesterday, today, &templates, &BTreeSet::new(), &[]);

        assert!(out.new_tasks.is_empty());
        assert!(out.initialized_days.is_empty());
    }

    #[test]
    fn future_day_is_allowed() {
        let today = date(2024, 1, 10);
        let tomorrow = date(2024, 1, 11);
        let templates = vec!["Drink water".to_string()];
        let out = materialize(tomorrow, today, &templates, &BTreeSet::new(), &[]);

        assert_eq!(out.new_tasks.len(), 1);
        assert!(out.initialized_days.contains("2024-01-11"));
    }

    #[test]
    fn existing_same_day_task_is_not_duplicated() {
        let today = date(2024, 1, 10);
        let templates = vec!["Drink water".to_string(), "Stretch".to_string()];
        let existing = vec![Task::new(
            "seed".to_string(),
            "Drink water".to_string(),
            start_of_day(today),
        )];

        // Initialized flag lost, but the task is already there.
        let out = materialize(today, today, &templates, &BTreeSet::new(), &existing);
        let texts: Vec<&str> = out.new_tasks.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["Stretch"]);
    }

    #[test]
    fn empty_templates_change_nothing() {
        let today = date(2024, 1, 10);
        let out = materialize(today, today, &[], &BTreeSet::new(), &[]);
        assert!(out.new_tasks.is_empty());
        assert!(out.initialized_days.is_empty());
    }
}
