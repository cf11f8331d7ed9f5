use axum::http::StatusCode;
use serde::Serialize;

use glowdesk_auth::{CommandAuthorization, Permission};
use glowdesk_infra::event_store::StoredEvent;

/// Small helper wrapper to associate required permissions with a command.
pub struct CmdAuth<C> {
    pub inner: C,
    pub required: Vec<Permission>,
}

impl<C> CommandAuthorization for CmdAuth<C> {
    fn required_permissions(&self) -> &[Permission] {
        &self.required
    }
}

/// Body returned by every command endpoint.
#[derive(Debug, Serialize)]
pub struct CommandAccepted {
    pub id: String,
    pub events_committed: usize,
    pub stream_version: u64,
}

impl CommandAccepted {
    pub fn new(id: impl ToString, committed: &[StoredEvent]) -> Self {
        Self {
            id: id.to_string(),
            events_committed: committed.len(),
            stream_version: committed.last().map(|e| e.sequence_number).unwrap_or(0),
        }
    }
}

pub fn created_or_ok(created: bool) -> StatusCode {
    if created { StatusCode::CREATED } else { StatusCode::OK }
}
