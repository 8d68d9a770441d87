use chrono::{DateTime, Duration, Local, NaiveDate};

use crate::models::Task;

/// Classification of a calendar day relative to "today". Exactly one
/// variant holds for any day; comparison is calendar-day equality with
/// time-of-day already truncated away by `NaiveDate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DayClass {
    Past,
    Today,
    Future,
}

pub fn classify_day(day: NaiveDate, today: NaiveDate) -> DayClass {
    if day < today {
        DayClass::Past
    } else if day == today {
        DayClass::Today
    } else {
        DayClass::Future
    }
}

/// The calendar day a task belongs to, in the local zone. `None` means
/// the stored `created_at` is unparsable (MalformedDate).
pub fn created_day(task: &Task) -> Option<NaiveDate> {
    DateTime::parse_from_rfc3339(task.created_at.trim())
        .ok()
        .map(|instant| instant.with_timezone(&Local).date_naive())
}

/// The day used for mutation guards and view membership. A task with an
/// unparsable `created_at` defaults into the today bucket: it stays
/// visible and toggleable instead of silently vanishing from every view.
pub fn effective_day(task: &Task, today: NaiveDate) -> NaiveDate {
    created_day(task).unwrap_or(today)
}

/// Pure filter: membership only, stored relative order preserved.
pub fn tasks_for_day(all: &[Task], day: NaiveDate, today: NaiveDate) -> Vec<Task> {
    all.iter()
        .filter(|task| effective_day(task, today) == day)
        .cloned()
        .collect()
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Partition {
    pub incomplete: Vec<Task>,
    pub completed: Vec<Task>,
}

impl Partition {
    /// Display order for a day view: open tasks first, completed after,
    /// both keeping their stored order.
    pub fn into_display_order(self) -> Vec<Task> {
        let mut tasks = self.incomplete;
        tasks.extend(self.completed);
        tasks
    }
}

/// Stable partition of one day's tasks into incomplete and completed.
pub fn partition(tasks: Vec<Task>) -> Partition {
    let (completed, incomplete) = tasks.into_iter().partition(|task| task.completed);
    Partition {
        incomplete,
        completed,
    }
}

/// Completed tasks across the whole collection, regardless of day.
pub fn total_completed(tasks: &[Task]) -> usize {
    tasks.iter().filter(|task| task.completed).count()
}

/// Completed-task counts for the trailing `window` days ending at
/// `today`, oldest day first. Day attribution follows the same policy as
/// the views: an unparsable `created_at` lands in today's bucket.
pub fn completed_per_day(
    tasks: &[Task],
    today: NaiveDate,
    window: usize,
) -> Vec<(NaiveDate, usize)> {
    (0..window)
        .rev()
        .map(|offset| today - Duration::days(offset as i64))
        .map(|day| {
            let count = tasks
                .iter()
                .filter(|task| task.completed && effective_day(task, today) == day)
                .count();
            (day, count)
        })
        .collect()
}

#[derive(Debug, PartialEq, Eq)]
pub enum ReorderError {
    /// The supplied ordering is not a permutation of the day's incomplete
    /// task ids (missing, duplicated or foreign ids).
    NotPermutation,
}

impl std::fmt::Display for ReorderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReorderError::NotPermutation => {
                write!(f, "new ordering is not a permutation of the day's open tasks")
            }
        }
    }
}

impl std::error::Error for ReorderError {}

/// Applies a user-supplied ordering to the incomplete subset of `day`'s
/// tasks. Tasks outside that day and completed tasks keep their position;
/// the day's open tasks are permuted within the slots they already occupy.
pub fn reorder(
    all: &[Task],
    day: NaiveDate,
    today: NaiveDate,
    new_order: &[String],
) -> Result<Vec<Task>, ReorderError> {
    let subject_ids: Vec<&str> = all
        .iter()
        .filter(|task| !task.completed && effective_day(task, today) == day)
        .map(|task| task.id.as_str())
        .collect();

    let mut expected: Vec<&str> = subject_ids.clone();
    expected.sort_unstable();
    let mut supplied: Vec<&str> = new_order.iter().map(String::as_str).collect();
    supplied.sort_unstable();
    supplied.dedup();
    if expected != supplied || new_order.len() != subject_ids.len() {
        return Err(ReorderError::NotPermutation);
    }

    let mut next = new_order.iter();
    let result = all
        .iter()
        .map(|task| {
            if !task.completed && effective_day(task, today) == day {
                // Both sides enumerate the same slots, so this cannot run dry.
                let id = next.next().map(String::as_str).unwrap_or(task.id.as_str());
                all.iter()
                    .find(|candidate| candidate.id == id)
                    .cloned()
                    .unwrap_or_else(|| task.clone())
            } else {
                task.clone()
            }
        })
        .collect();
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn task_on(id: &str, day: NaiveDate) -> Task {
        let instant = day
            .and_hms_opt(9, 0, 0)
            .unwrap()
            .and_local_timezone(Local)
            .earliest()
            .unwrap();
        Task::new(id.to_string(), format!("task-{id}"), instant.to_rfc3339())
    }

    #[test]
    fn classify_day_is_exhaustive_and_exclusive() {
        let today = date(2024, 1, 10);
        assert_eq!(classify_day(date(2024, 1, 9), today), DayClass::Past);
        assert_eq!(classify_day(today, today), DayClass::Today);
        assert_eq!(classify_day(date(2024, 1, 11), today), DayClass::Future);
        // Month and year boundaries classify the same way.
        assert_eq!(classify_day(date(2023, 12, 31), today), DayClass::Past);
        assert_eq!(classify_day(date(2024, 2, 1), today), DayClass::Future);
    }

    #[test]
    fn tasks_for_day_filters_by_calendar_day() {
        let today = date(2024, 1, 10);
        let tasks = vec![
            task_on("a", date(2024, 1, 9)),
            task_on("b", today),
            task_on("c", date(2024, 1, 11)),
            task_on("d", today),
        ];

        let view = tasks_for_day(&tasks, today, today);
        let ids: Vec<&str> = view.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "d"]);
    }

    #[test]
    fn tasks_for_day_membership_ignores_input_permutation() {
        let today = date(2024, 1, 10);
        let mut tasks = vec![
            task_on("a", today),
            task_on("b", date(2024, 1, 9)),
            task_on("c", today),
        ];

        let before: std::collections::BTreeSet<String> = tasks_for_day(&tasks, today, today)
            .into_iter()
            .map(|t| t.id)
            .collect();
        tasks.reverse();
        let after: std::collections::BTreeSet<String> = tasks_for_day(&tasks, today, today)
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(before, after);
    }

    #[test]
    fn unparsable_created_at_defaults_into_today() {
        let today = date(2024, 1, 10);
        let mut broken = task_on("x", today);
        broken.created_at = "not-a-date".to_string();

        assert_eq!(created_day(&broken), None);
        assert_eq!(effective_day(&broken, today), today);
        let view = tasks_for_day(&[broken.clone()], today, today);
        assert_eq!(view.len(), 1);
        // And it never shows up on other days.
        assert!(tasks_for_day(&[broken], date(2024, 1, 9), today).is_empty());
    }

    #[test]
    fn partition_is_stable_and_orders_completed_last() {
        let today = date(2024, 1, 10);
        let mut a = task_on("a", today);
        a.completed = true;
        let b = task_on("b", today);
        let mut c = task_on("c", today);
        c.completed = true;
        let d = task_on("d", today);

        let split = partition(vec![a, b, c, d]);
        let open: Vec<&str> = split.incomplete.iter().map(|t| t.id.as_str()).collect();
        let done: Vec<&str> = split.completed.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(open, vec!["b", "d"]);
        assert_eq!(done, vec!["a", "c"]);

        let display: Vec<String> = split
            .into_display_order()
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(display, vec!["b", "d", "a", "c"]);
    }

    #[test]
    fn reorder_permutes_only_the_days_open_tasks() {
        let today = date(2024, 1, 10);
        let other = date(2024, 1, 9);
        let mut done = task_on("done", today);
        done.completed = true;
        let tasks = vec![
            task_on("a", today),
            task_on("old", other),
            done,
            task_on("b", today),
            task_on("c", today),
        ];

        let new_order = vec!["c".to_string(), "a".to_string(), "b".to_string()];
        let result = reorder(&tasks, today, today, &new_order).expect("reorder");
        let ids: Vec<&str> = result.iter().map(|t| t.id.as_str()).collect();
        // Open today-tasks land in their original slots, everything else is untouched.
        assert_eq!(ids, vec!["c", "old", "done", "a", "b"]);

        // Permutation law: same id multiset in, same out.
        let mut before: Vec<&str> = tasks.iter().map(|t| t.id.as_str()).collect();
        let mut after: Vec<&str> = result.iter().map(|t| t.id.as_str()).collect();
        before.sort_unstable();
        after.sort_unstable();
        assert_eq!(before, after);
    }

    #[test]
    fn completed_per_day_covers_trailing_window() {
        let today = date(2024, 1, 10);
        let mut done_today = task_on("a", today);
        done_today.completed = true;
        let mut done_two_ago = task_on("b", date(2024, 1, 8));
        done_two_ago.completed = true;
        let mut done_old = task_on("c", date(2024, 1, 1));
        done_old.completed = true;
        let open_today = task_on("d", today);
        let tasks = vec![done_today, done_two_ago, done_old, open_today];

        assert_eq!(total_completed(&tasks), 3);

        let report = completed_per_day(&tasks, today, 7);
        assert_eq!(report.len(), 7);
        // Oldest day first, ending at today.
        assert_eq!(report[0].0, date(2024, 1, 4));
        assert_eq!(report[6].0, today);
        assert_eq!(report[6].1, 1);
        assert_eq!(report[4], (date(2024, 1, 8), 1));
        // Outside the window: counted in the total, absent from the chart.
        assert!(report.iter().all(|(day, _)| *day != date(2024, 1, 1)));
        // Open tasks never count.
        assert_eq!(report.iter().map(|(_, n)| n).sum::<usize>(), 2);
    }

    #[test]
    fn completed_per_day_buckets_unparsable_dates_into_today() {
        let today = date(2024, 1, 10);
        let mut broken = task_on("x", today);
        broken.created_at = "not-a-date".to_string();
        broken.completed = true;

        let report = completed_per_day(&[broken], today, 7);
        assert_eq!(report[6], (today, 1));
        assert_eq!(report.iter().map(|(_, n)| n).sum::<usize>(), 1);
    }

    #[test]
    fn reorder_rejects_non_permutations() {
        let today = date(2024, 1, 10);
        let tasks = vec![task_on("a", today), task_on("b", today)];

        // Foreign id.
        assert_eq!(
            reorder(&tasks, today, today, &["a".to_string(), "x".to_string()]),
            Err(ReorderError::NotPermutation)
        );
        // Missing id.
        assert_eq!(
            reorder(&tasks, today, today, &["a".to_string()]),
            Err(ReorderError::NotPermutation)
        );
        // Duplicate id.
        assert_eq!(
            reorder(&tasks, today, today, &["a".to_string(), "a".to_string()]),
            Err(ReorderError::NotPermutation)
        );
    }
}
