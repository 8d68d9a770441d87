pub mod commands;
pub mod day;
pub mod events;
pub mod guard;
pub mod logging;
pub mod materialize;
pub mod models;
pub mod remote;
pub mod state;
pub mod storage;
pub mod store;
pub mod sync;

pub use commands::{CommandCtx, CommandResult};
pub use day::{
    classify_day, completed_per_day, partition, tasks_for_day, total_completed, DayClass,
    Partition,
};
pub use guard::{authorize, Mutation, MutationRejected};
pub use materialize::{day_key, materialize, Materialized};
pub use models::{Profile, Task};
pub use remote::{DocumentStore, RemoteError, ShareRecord, Subscription, WritePhase};
pub use state::AppState;
pub use storage::{FileStorage, KeyValueStorage, StorageError};
pub use store::TaskStore;
pub use sync::{
    decode, encode, encode_for_qr, parse_scanned_text, DecodeError, EncodeError, ImportFlow,
    ScannedImport, SizeError, SyncSnapshot, QR_PAYLOAD_LIMIT,
};
