use std::path::PathBuf;

use chrono::NaiveDate;
use url::Url;

use crate::day::{
    classify_day, completed_per_day, effective_day, partition, reorder, tasks_for_day,
    total_completed, Partition, ReorderError,
};
use crate::events::{NoticePayload, RejectedPayload, StatePayload, SIGNAL_SHAKE};
use crate::guard::{authorize, Mutation};
use crate::materialize::{day_key, fresh_task_id, materialize, start_of_day};
use crate::models::Task;
use crate::remote::{create_share, resolve_share, DocumentStore, RemoteError, ShareRecord, WritePhase};
use crate::state::AppState;
use crate::storage::{FileStorage, StorageError};
use crate::store::TaskStore;
use crate::sync::{
    decode, encode, encode_for_qr, parse_scanned_text, payload_url, ImportFlow, ScannedImport,
    SyncSnapshot,
};

#[derive(Debug, serde::Serialize)]
pub struct CommandResult<T> {
    pub ok: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

/// Host surface the commands run against: storage location, a clock and
/// the event sinks the UI subscribes to. Injected so tests can pin
/// "today" and observe emitted events.
pub trait CommandCtx {
    fn data_dir(&self) -> Result<PathBuf, StorageError>;
    fn today(&self) -> NaiveDate;
    /// Current instant as an RFC 3339 string.
    fn now(&self) -> String;
    fn emit_state_updated(&self, payload: StatePayload);
    fn emit_mutation_rejected(&self, payload: RejectedPayload);
    fn emit_day_completed(&self, day: String);
    fn emit_notice(&self, payload: NoticePayload);
    fn emit_write_phase(&self, phase: WritePhase);
}

fn ok<T>(data: T) -> CommandResult<T> {
    CommandResult {
        ok: true,
        data: Some(data),
        error: None,
    }
}

fn err<T>(message: &str) -> CommandResult<T> {
    CommandResult {
        ok: false,
        data: None,
        error: Some(message.to_string()),
    }
}

fn persist(ctx: &impl CommandCtx, state: &AppState) -> Result<(), StorageError> {
    let storage = FileStorage::new(ctx.data_dir()?);
    storage.ensure_dirs()?;
    let store = TaskStore::new(storage);
    let profile = state.profile();
    store.save_profile(&profile)?;
    ctx.emit_state_updated(StatePayload {
        name: profile.name,
        tasks: profile.tasks,
        templates: profile.templates,
    });
    Ok(())
}

/// Loads the persisted profile and materializes today's templates before
/// any view is served. Returns today's partitioned view.
pub fn load_state(ctx: &impl CommandCtx, state: &AppState) -> CommandResult<Partition> {
    let storage = match ctx.data_dir().map(FileStorage::new) {
        Ok(storage) => storage,
        Err(error) => return err(&format!("storage error: {error}")),
    };
    if let Err(error) = storage.ensure_dirs() {
        return err(&format!("storage error: {error}"));
    }
    let store = TaskStore::new(storage);
    let mut profile = store.load_profile();

    let today = ctx.today();
    let expanded = materialize(
        today,
        today,
        &profile.templates,
        &profile.initialized_days,
        &profile.tasks,
    );
    let dirty = !expanded.new_tasks.is_empty()
        || expanded.initialized_days != profile.initialized_days;
    profile.tasks.extend(expanded.new_tasks);
    profile.initialized_days = expanded.initialized_days;
    state.replace_profile(profile.clone());

    if dirty {
        if let Err(error) = persist(ctx, state) {
            return err(&format!("storage error: {error}"));
        }
    }

    ok(partition(tasks_for_day(&profile.tasks, today, today)))
}

/// Pure view query for the day being navigated to.
pub fn view_day(ctx: &impl CommandCtx, state: &AppState, day: NaiveDate) -> Partition {
    partition(tasks_for_day(&state.tasks(), day, ctx.today()))
}

pub fn set_name(ctx: &impl CommandCtx, state: &AppState, name: &str) -> CommandResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return err("name must not be empty");
    }
    state.set_name(name.to_string());
    if let Err(error) = persist(ctx, state) {
        return err(&format!("storage error: {error}"));
    }
    ok(name.to_string())
}

/// Onboarding: one task per non-blank line, created now, and today marked
/// initialized so templates do not pile on top of the fresh list.
pub fn set_initial_tasks(
    ctx: &impl CommandCtx,
    state: &AppState,
    lines: &str,
) -> CommandResult<Vec<Task>> {
    let created_at = ctx.now();
    let tasks: Vec<Task> = lines
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| Task::new(fresh_task_id(), line.to_string(), created_at.clone()))
        .collect();
    if tasks.is_empty() {
        return err("no tasks provided");
    }
    state.replace_tasks(tasks.clone());
    let mut days = state.initialized_days();
    days.insert(day_key(ctx.today()));
    state.set_initialized_days(days);
    if let Err(error) = persist(ctx, state) {
        return err(&format!("storage error: {error}"));
    }
    ok(tasks)
}

/// Adds a task for the currently viewed day. Future days get the day's
/// start-of-day instant; today keeps full precision for tie-breaks.
pub fn add_task(
    ctx: &impl CommandCtx,
    state: &AppState,
    text: &str,
    center_day: NaiveDate,
) -> CommandResult<Task> {
    let text = text.trim();
    if text.is_empty() {
        return err("task text must not be empty");
    }
    let today = ctx.today();
    if let Err(rejection) = authorize(Mutation::Add, classify_day(center_day, today)) {
        return reject(ctx, None, rejection);
    }
    let created_at = if center_day == today {
        ctx.now()
    } else {
        start_of_day(center_day)
    };
    let task = Task::new(fresh_task_id(), text.to_string(), created_at);
    state.add_task_front(task.clone());
    if let Err(error) = persist(ctx, state) {
        return err(&format!("storage error: {error}"));
    }
    ok(task)
}

pub fn toggle_task(ctx: &impl CommandCtx, state: &AppState, task_id: &str) -> CommandResult<Task> {
    let task = match state.find_task(task_id) {
        Some(task) => task,
        None => return err("task not found"),
    };
    let today = ctx.today();
    let class = classify_day(effective_day(&task, today), today);
    if let Err(rejection) = authorize(Mutation::ToggleComplete, class) {
        return reject(ctx, Some(task_id.to_string()), rejection);
    }

    let toggled = match state.toggle_task(task_id) {
        Some(task) => task,
        None => return err("task not found"),
    };

    if toggled.completed {
        let day_tasks = tasks_for_day(&state.tasks(), today, today);
        if !day_tasks.is_empty() && day_tasks.iter().all(|t| t.completed) {
            ctx.emit_day_completed(day_key(today));
        }
    }

    if let Err(error) = persist(ctx, state) {
        return err(&format!("storage error: {error}"));
    }
    ok(toggled)
}

pub fn update_description(
    ctx: &impl CommandCtx,
    state: &AppState,
    task_id: &str,
    description: &str,
) -> CommandResult<Task> {
    let task = match state.find_task(task_id) {
        Some(task) => task,
        None => return err("task not found"),
    };
    let today = ctx.today();
    let class = classify_day(effective_day(&task, today), today);
    if let Err(rejection) = authorize(Mutation::EditDescription, class) {
        return reject(ctx, Some(task_id.to_string()), rejection);
    }
    let updated = match state.update_description(task_id, description.to_string()) {
        Some(task) => task,
        None => return err("task not found"),
    };
    if let Err(error) = persist(ctx, state) {
        return err(&format!("storage error: {error}"));
    }
    ok(updated)
}

pub fn delete_task(ctx: &impl CommandCtx, state: &AppState, task_id: &str) -> CommandResult<bool> {
    let task = match state.find_task(task_id) {
        Some(task) => task,
        None => return err("task not found"),
    };
    let today = ctx.today();
    let class = classify_day(effective_day(&task, today), today);
    if let Err(rejection) = authorize(Mutation::Delete, class) {
        return reject(ctx, Some(task_id.to_string()), rejection);
    }
    state.remove_task(task_id);
    if let Err(error) = persist(ctx, state) {
        return err(&format!("storage error: {error}"));
    }
    ok(true)
}

/// Applies a user-supplied ordering to the incomplete tasks of the viewed
/// day. Only today's list can be reordered.
pub fn reorder_day(
    ctx: &impl CommandCtx,
    state: &AppState,
    day: NaiveDate,
    new_order: &[String],
) -> CommandResult<Partition> {
    let today = ctx.today();
    if let Err(rejection) = authorize(Mutation::Reorder, classify_day(day, today)) {
        return reject(ctx, None, rejection);
    }
    let reordered = match reorder(&state.tasks(), day, today, new_order) {
        Ok(tasks) => tasks,
        Err(ReorderError::NotPermutation) => {
            return err("new ordering does not match the day's open tasks")
        }
    };
    state.replace_tasks(reordered);
    if let Err(error) = persist(ctx, state) {
        return err(&format!("storage error: {error}"));
    }
    ok(partition(tasks_for_day(&state.tasks(), day, today)))
}

/// Days covered by the productivity report chart.
pub const REPORT_WINDOW_DAYS: usize = 7;

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ProductivityReport {
    pub total_completed: usize,
    /// Day key paired with the completed count, oldest day first.
    pub per_day: Vec<(String, usize)>,
}

/// Analytics page data: total completed tasks plus the completed-per-day
/// counts over the trailing week.
pub fn productivity_report(ctx: &impl CommandCtx, state: &AppState) -> ProductivityReport {
    let tasks = state.tasks();
    let per_day = completed_per_day(&tasks, ctx.today(), REPORT_WINDOW_DAYS)
        .into_iter()
        .map(|(day, count)| (day_key(day), count))
        .collect();
    ProductivityReport {
        total_completed: total_completed(&tasks),
        per_day,
    }
}

/// Settings page action: marks every task, across all days, incomplete.
pub fn uncomplete_all(ctx: &impl CommandCtx, state: &AppState) -> CommandResult<bool> {
    state.uncomplete_all();
    if let Err(error) = persist(ctx, state) {
        return err(&format!("storage error: {error}"));
    }
    ok(true)
}

pub fn set_templates(
    ctx: &impl CommandCtx,
    state: &AppState,
    templates: Vec<String>,
) -> CommandResult<Vec<String>> {
    let templates: Vec<String> = templates
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    state.set_templates(templates.clone());
    if let Err(error) = persist(ctx, state) {
        return err(&format!("storage error: {error}"));
    }
    ok(templates)
}

/// Switches this device to a remote sync identity (a visited `/sync/{id}`
/// link): persists the identifier and drops the local name, tasks and
/// initialized-days so the remote profile becomes authoritative. The
/// caller subscribes/pushes with the adopted id afterwards.
pub fn adopt_sync_identity(
    ctx: &impl CommandCtx,
    state: &AppState,
    id: &str,
) -> CommandResult<String> {
    let id = id.trim();
    if id.is_empty() {
        return err("sync identifier must not be empty");
    }
    let storage = match ctx.data_dir().map(FileStorage::new) {
        Ok(storage) => storage,
        Err(error) => return err(&format!("storage error: {error}")),
    };
    if let Err(error) = storage.ensure_dirs() {
        return err(&format!("storage error: {error}"));
    }
    let store = TaskStore::new(storage);
    if let Err(error) = store.adopt_sync_identity(id) {
        return err(&format!("storage error: {error}"));
    }

    let mut profile = state.profile();
    profile.name = String::new();
    profile.tasks = Vec::new();
    profile.initialized_days = std::collections::BTreeSet::new();
    state.replace_profile(profile.clone());
    ctx.emit_state_updated(StatePayload {
        name: profile.name,
        tasks: profile.tasks,
        templates: profile.templates,
    });
    log::info!("adopted sync identity {id}");
    ok(id.to_string())
}

/// Full-account reset: clears every persisted key and the in-memory state.
pub fn logout(ctx: &impl CommandCtx, state: &AppState) -> CommandResult<bool> {
    let storage = match ctx.data_dir().map(FileStorage::new) {
        Ok(storage) => storage,
        Err(error) => return err(&format!("storage error: {error}")),
    };
    let store = TaskStore::new(storage);
    if let Err(error) = store.clear() {
        return err(&format!("storage error: {error}"));
    }
    state.clear();
    let profile = state.profile();
    ctx.emit_state_updated(StatePayload {
        name: profile.name,
        tasks: profile.tasks,
        templates: profile.templates,
    });
    ok(true)
}

fn snapshot_of(state: &AppState) -> SyncSnapshot {
    SyncSnapshot {
        name: state.name(),
        tasks: state.tasks(),
    }
}

/// Builds the payload-bearing share link.
pub fn share_link(state: &AppState, base: &Url) -> CommandResult<String> {
    match encode(&snapshot_of(state)) {
        Ok(payload) => ok(payload_url(base, &payload).to_string()),
        Err(error) => err(&error.to_string()),
    }
}

/// Encodes the profile for a QR symbol; oversize payloads get the
/// dedicated "use a link" error instead of an unscannable code.
pub fn qr_payload(ctx: &impl CommandCtx, state: &AppState) -> CommandResult<String> {
    let payload = match encode(&snapshot_of(state)) {
        Ok(payload) => payload,
        Err(error) => return err(&error.to_string()),
    };
    match encode_for_qr(&payload) {
        Ok(payload) => ok(payload.to_string()),
        Err(size) => {
            ctx.emit_notice(NoticePayload {
                title: "List too large for QR".to_string(),
                message: size.to_string(),
            });
            err(&size.to_string())
        }
    }
}

/// Stores the snapshot remotely and returns the minted share id. The
/// write is fire-and-forget for local state: a failure only notifies.
pub fn create_remote_share(
    ctx: &impl CommandCtx,
    state: &AppState,
    store: &impl DocumentStore,
) -> CommandResult<String> {
    match create_share(store, &state.name(), &state.tasks(), ctx.now()) {
        Ok(id) => ok(id),
        Err(error) => {
            ctx.emit_notice(NoticePayload {
                title: "Share failed".to_string(),
                message: error.to_string(),
            });
            err(&error.to_string())
        }
    }
}

/// What the confirmation dialog shows before a destructive import.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ImportPrompt {
    pub name: String,
    pub task_count: usize,
}

fn offer(flow: &mut ImportFlow, snapshot: SyncSnapshot) -> CommandResult<ImportPrompt> {
    let prompt = ImportPrompt {
        name: snapshot.name.clone(),
        task_count: snapshot.tasks.len(),
    };
    flow.offer(snapshot);
    ok(prompt)
}

/// Starts the import flow from a raw base64 payload.
pub fn offer_import_payload(
    ctx: &impl CommandCtx,
    flow: &mut ImportFlow,
    raw: &str,
) -> CommandResult<ImportPrompt> {
    match decode(raw) {
        Ok(snapshot) => offer(flow, snapshot),
        Err(error) => {
            flow.cancel();
            ctx.emit_notice(NoticePayload {
                title: "Import failed".to_string(),
                message: error.to_string(),
            });
            err(&error.to_string())
        }
    }
}

/// Starts the import flow from scanned text: either an embedded payload
/// or a share id that resolves through the document store.
pub fn scan_import(
    ctx: &impl CommandCtx,
    flow: &mut ImportFlow,
    store: &impl DocumentStore,
    text: &str,
) -> CommandResult<ImportPrompt> {
    match parse_scanned_text(text) {
        Ok(ScannedImport::Snapshot(snapshot)) => offer(flow, snapshot),
        Ok(ScannedImport::ShareId(id)) => match resolve_share(store, &id) {
            Ok(ShareRecord { name, tasks, .. }) => offer(flow, SyncSnapshot { name, tasks }),
            Err(error @ RemoteError::NotFound) => {
                flow.cancel();
                ctx.emit_notice(NoticePayload {
                    title: "Link not found".to_string(),
                    message: error.to_string(),
                });
                err(&error.to_string())
            }
            Err(error) => {
                flow.cancel();
                err(&error.to_string())
            }
        },
        Err(error) => {
            flow.cancel();
            ctx.emit_notice(NoticePayload {
                title: "Import failed".to_string(),
                message: error.to_string(),
            });
            err(&error.to_string())
        }
    }
}

/// Applies the pending snapshot: destructive overwrite of name and tasks.
/// Today is marked initialized so templates do not immediately stack on
/// top of the imported list.
pub fn confirm_import(ctx: &impl CommandCtx, state: &AppState, flow: &mut ImportFlow) -> CommandResult<bool> {
    let snapshot = match flow.confirm() {
        Some(snapshot) => snapshot,
        None => return err("no import pending"),
    };
    let mut profile = state.profile();
    profile.name = snapshot.name.clone();
    profile.tasks = snapshot.tasks;
    profile.initialized_days = std::collections::BTreeSet::from([day_key(ctx.today())]);
    state.replace_profile(profile);
    if let Err(error) = persist(ctx, state) {
        return err(&format!("storage error: {error}"));
    }
    ctx.emit_notice(NoticePayload {
        title: "Import successful".to_string(),
        message: format!("Tasks for \"{}\" have been added to this device.", snapshot.name),
    });
    ok(true)
}

pub fn cancel_import(flow: &mut ImportFlow) -> CommandResult<bool> {
    flow.cancel();
    ok(true)
}

/// Pushes the current profile to the remote store. The in-memory value is
/// already the optimistic one; failure keeps it and only notifies.
pub fn push_remote(
    ctx: &impl CommandCtx,
    state: &AppState,
    store: &impl DocumentStore,
    user_id: &str,
) -> CommandResult<WritePhase> {
    let record = ShareRecord {
        name: state.name(),
        tasks: state.tasks(),
        created_at: ctx.now(),
    };
    ctx.emit_write_phase(WritePhase::Optimistic);
    match store.set_document(user_id, &record) {
        Ok(()) => {
            ctx.emit_write_phase(WritePhase::Confirmed);
            ok(WritePhase::Confirmed)
        }
        Err(error) => {
            ctx.emit_notice(NoticePayload {
                title: "Sync failed".to_string(),
                message: error.to_string(),
            });
            err(&error.to_string())
        }
    }
}

/// A subscription push: the incoming record replaces name and tasks
/// wholesale (last-writer-wins at whole-profile granularity).
pub fn apply_remote_snapshot(
    ctx: &impl CommandCtx,
    state: &AppState,
    record: ShareRecord,
) -> CommandResult<WritePhase> {
    let mut profile = state.profile();
    profile.name = record.name;
    profile.tasks = record.tasks;
    state.replace_profile(profile);
    if let Err(error) = persist(ctx, state) {
        return err(&format!("storage error: {error}"));
    }
    ctx.emit_write_phase(WritePhase::Reverted);
    ok(WritePhase::Reverted)
}

fn reject<T>(
    ctx: &impl CommandCtx,
    task_id: Option<String>,
    rejection: crate::guard::MutationRejected,
) -> CommandResult<T> {
    log::debug!("mutation rejected: {rejection}");
    ctx.emit_mutation_rejected(RejectedPayload {
        task_id,
        mutation: rejection.mutation,
        day_class: rejection.class,
        signal: SIGNAL_SHAKE,
    });
    err(&rejection.to_string())
}
