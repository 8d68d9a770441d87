use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::models::Task;

/// Query parameter carrying an embedded snapshot payload in a share link.
pub const PAYLOAD_PARAM: &str = "data";
/// Path segments whose following segment is a server-minted share id.
pub const SHARE_SEGMENT: &str = "share";
pub const SYNC_SEGMENT: &str = "sync";
/// Practical capacity ceiling of a scannable QR symbol for this payload's
/// error-correction level.
pub const QR_PAYLOAD_LIMIT: usize = 2000;

/// Portable `{name, tasks}` bundle for cross-device transfer. Wire-only:
/// consumed into a profile on import or discarded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncSnapshot {
    pub name: String,
    pub tasks: Vec<Task>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum EncodeError {
    /// Nothing to share: the profile has no name yet.
    MissingName,
}

impl std::fmt::Display for EncodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EncodeError::MissingName => write!(f, "profile has no name to share"),
        }
    }
}

impl std::error::Error for EncodeError {}

/// Payload exceeds what a QR symbol can reliably carry; share the link
/// instead.
#[derive(Debug, PartialEq, Eq)]
pub struct SizeError {
    pub len: usize,
}

impl std::fmt::Display for SizeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "payload of {} characters exceeds the QR limit of {QR_PAYLOAD_LIMIT}, use a link instead",
            self.len
        )
    }
}

impl std::error::Error for SizeError {}

#[derive(Debug)]
pub enum DecodeError {
    Base64(base64::DecodeError),
    Json(serde_json::Error),
    /// Structurally valid but the name is missing or blank.
    MissingName,
    /// The scanned text is not a URL or carries no payload/identifier.
    NoPayload,
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::Base64(err) => write!(f, "payload is not valid base64: {err}"),
            DecodeError::Json(err) => write!(f, "payload is not a valid snapshot: {err}"),
            DecodeError::MissingName => write!(f, "snapshot has no name"),
            DecodeError::NoPayload => write!(f, "no share payload or identifier found"),
        }
    }
}

impl std::error::Error for DecodeError {}

impl From<base64::DecodeError> for DecodeError {
    fn from(value: base64::DecodeError) -> Self {
        DecodeError::Base64(value)
    }
}

impl From<serde_json::Error> for DecodeError {
    fn from(value: serde_json::Error) -> Self {
        DecodeError::Json(value)
    }
}

/// Serializes a snapshot to a compact string suitable for a URL query
/// parameter or a QR symbol: base64 over the JSON form.
pub fn encode(snapshot: &SyncSnapshot) -> Result<String, EncodeError> {
    if snapshot.name.trim().is_empty() {
        return Err(EncodeError::MissingName);
    }
    // Serialization of plain strings and bools cannot fail.
    let json = serde_json::to_vec(snapshot).unwrap_or_default();
    Ok(B64.encode(json))
}

/// Checks an already-encoded payload against the QR capacity ceiling.
pub fn encode_for_qr(payload: &str) -> Result<&str, SizeError> {
    if payload.len() > QR_PAYLOAD_LIMIT {
        return Err(SizeError { len: payload.len() });
    }
    Ok(payload)
}

/// Reverses `encode`. Any structural mismatch yields `DecodeError`; a
/// partially-populated snapshot is never produced.
pub fn decode(raw: &str) -> Result<SyncSnapshot, DecodeError> {
    let bytes = B64.decode(raw.trim().as_bytes())?;
    let snapshot: SyncSnapshot = serde_json::from_slice(&bytes)?;
    if snapshot.name.trim().is_empty() {
        return Err(DecodeError::MissingName);
    }
    Ok(snapshot)
}

/// What a scanned link resolves to locally.
#[derive(Debug, Clone, PartialEq)]
pub enum ScannedImport {
    /// The link embedded a full snapshot; no server round trip needed.
    Snapshot(SyncSnapshot),
    /// The link carries a server-minted share id to resolve remotely.
    ShareId(String),
}

/// Parses a scanned string as a URL and extracts either the embedded
/// payload (query parameter) or the share identifier (path segment).
pub fn parse_scanned_text(text: &str) -> Result<ScannedImport, DecodeError> {
    let url = Url::parse(text.trim()).map_err(|_| DecodeError::NoPayload)?;

    if let Some((_, payload)) = url.query_pairs().find(|(key, _)| key == PAYLOAD_PARAM) {
        return decode(&payload).map(ScannedImport::Snapshot);
    }

    if let Some(segments) = url.path_segments() {
        let parts: Vec<&str> = segments.collect();
        for pair in parts.windows(2) {
            if (pair[0] == SHARE_SEGMENT || pair[0] == SYNC_SEGMENT) && !pair[1].is_empty() {
                return Ok(ScannedImport::ShareId(pair[1].to_string()));
            }
        }
    }

    Err(DecodeError::NoPayload)
}

/// Builds a link embedding the payload in the `data` query parameter.
pub fn payload_url(base: &Url, payload: &str) -> Url {
    let mut url = base.clone();
    url.query_pairs_mut().append_pair(PAYLOAD_PARAM, payload);
    url
}

/// Builds a `/share/{id}` link for a server-minted identifier.
pub fn share_url(base: &Url, id: &str) -> Url {
    let mut url = base.clone();
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.pop_if_empty().push(SHARE_SEGMENT).push(id);
    }
    url
}

/// Removes the sensitive payload parameter from a visited URL so it does
/// not linger in the address bar or history.
pub fn strip_payload_param(url: &Url) -> Url {
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != PAYLOAD_PARAM)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    let mut scrubbed = url.clone();
    scrubbed.set_query(None);
    if !kept.is_empty() {
        let mut pairs = scrubbed.query_pairs_mut();
        for (key, value) in &kept {
            pairs.append_pair(key, value);
        }
    }
    scrubbed
}

/// Import flow: a valid decode parks the snapshot until the user confirms
/// the overwrite; decode failures never leave `Idle`.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ImportFlow {
    #[default]
    Idle,
    PendingConfirmation(SyncSnapshot),
}

impl ImportFlow {
    /// Moves to `PendingConfirmation` with the decoded snapshot.
    pub fn offer(&mut self, snapshot: SyncSnapshot) {
        *self = ImportFlow::PendingConfirmation(snapshot);
    }

    /// Consumes the pending snapshot for application; `None` when nothing
    /// was pending.
    pub fn confirm(&mut self) -> Option<SyncSnapshot> {
        match std::mem::take(self) {
            ImportFlow::PendingConfirmation(snapshot) => Some(snapshot),
            ImportFlow::Idle => None,
        }
    }

    pub fn cancel(&mut self) {
        *self = ImportFlow::Idle;
    }

    pub fn pending(&self) -> Option<&SyncSnapshot> {
        match self {
            ImportFlow::PendingConfirmation(snapshot) => Some(snapshot),
            ImportFlow::Idle => None,
        }
    }
}
