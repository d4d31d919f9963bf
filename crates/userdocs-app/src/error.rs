// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::MutationKind;

/// Failures reported by the remote record service.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    /// Transport failure, timeout, or a 5xx from the service.
    #[error("network error: {0}")]
    Network(String),

    /// The token was rejected (HTTP 401/403).
    #[error("session rejected ({status}) -- log in again")]
    Auth { status: u16 },

    /// HTTP success, but the body carried a non-zero error code.
    #[error("server error code {code}: {message}")]
    Application { code: i64, message: String },

    /// The record id is unknown to the service.
    #[error("record {id} not found")]
    NotFound { id: String },

    /// The service refused the submitted fields (other 4xx).
    #[error("submission rejected ({status}): {message}")]
    Validation { status: u16, message: String },

    /// The response body could not be interpreted.
    #[error("unexpected response: {0}")]
    Protocol(String),
}

/// Local rule violations. These never reach the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PreconditionError {
    #[error("select a record first")]
    NoSelection,

    #[error("{0} already in progress -- wait for it to finish")]
    MutationInFlight(MutationKind),

    #[error("no delete awaiting confirmation")]
    NoPendingDelete,

    /// The selection moved off the record the confirmation was opened for.
    #[error("selection changed since delete was requested -- run delete again")]
    SelectionChanged,

    #[error("{0} form is open -- finish or cancel it first")]
    FormOpen(MutationKind),
}
