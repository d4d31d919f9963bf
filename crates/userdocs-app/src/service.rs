// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{AuthToken, Record, RecordFields, RecordId, RemoteError, Ticket};

/// The remote documents resource. Implementations are fire-once: no retries.
pub trait RecordService {
    fn list(&self, token: &AuthToken) -> Result<Vec<Record>, RemoteError>;
    fn create(&self, token: &AuthToken, fields: &RecordFields) -> Result<(), RemoteError>;
    fn update(
        &self,
        token: &AuthToken,
        id: &RecordId,
        fields: &RecordFields,
    ) -> Result<(), RemoteError>;
    fn delete(&self, token: &AuthToken, id: &RecordId) -> Result<(), RemoteError>;
}

/// Network work the engine wants performed. The caller owns the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    List {
        ticket: Ticket,
    },
    Create {
        ticket: Ticket,
        fields: RecordFields,
    },
    Update {
        ticket: Ticket,
        id: RecordId,
        fields: RecordFields,
    },
    Delete {
        ticket: Ticket,
        id: RecordId,
    },
}

impl Request {
    pub const fn ticket(&self) -> Ticket {
        match self {
            Self::List { ticket }
            | Self::Create { ticket, .. }
            | Self::Update { ticket, .. }
            | Self::Delete { ticket, .. } => *ticket,
        }
    }

    /// Runs the request against `service` with the caller's token.
    pub fn execute<S: RecordService + ?Sized>(self, service: &S, token: &AuthToken) -> Settlement {
        match self {
            Self::List { ticket } => Settlement::Listed {
                ticket,
                result: service.list(token),
            },
            Self::Create { ticket, fields } => Settlement::Mutated {
                ticket,
                result: service.create(token, &fields),
            },
            Self::Update { ticket, id, fields } => Settlement::Mutated {
                ticket,
                result: service.update(token, &id, &fields),
            },
            Self::Delete { ticket, id } => Settlement::Mutated {
                ticket,
                result: service.delete(token, &id),
            },
        }
    }
}

/// The outcome of one request, fed back into the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settlement {
    Listed {
        ticket: Ticket,
        result: Result<Vec<Record>, RemoteError>,
    },
    Mutated {
        ticket: Ticket,
        result: Result<(), RemoteError>,
    },
}

impl Settlement {
    pub const fn ticket(&self) -> Ticket {
        match self {
            Self::Listed { ticket, .. } | Self::Mutated { ticket, .. } => *ticket,
        }
    }
}
