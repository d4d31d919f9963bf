// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::{Record, RemoteError, Snapshot, Ticket};

/// What a consumer should show for the record list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreStatus<'a> {
    NotLoaded,
    Loading,
    Ready,
    /// The last refresh failed; the previous snapshot is still valid.
    Stale(&'a RemoteError),
    /// No snapshot was ever loaded and the last refresh failed.
    Broken(&'a RemoteError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshStart {
    Issue(Ticket),
    Coalesced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshCompletion {
    pub replaced: bool,
    /// A refresh was requested while this one was in flight.
    pub follow_up: bool,
}

#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    snapshot: Snapshot,
    in_flight: Option<Ticket>,
    queued: bool,
    error: Option<RemoteError>,
    loaded_once: bool,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn loading(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn error(&self) -> Option<&RemoteError> {
        self.error.as_ref()
    }

    pub fn refresh_queued(&self) -> bool {
        self.queued
    }

    pub fn status(&self) -> StoreStatus<'_> {
        if self.loading() {
            return StoreStatus::Loading;
        }
        match (&self.error, self.loaded_once) {
            (Some(error), true) => StoreStatus::Stale(error),
            (Some(error), false) => StoreStatus::Broken(error),
            (None, true) => StoreStatus::Ready,
            (None, false) => StoreStatus::NotLoaded,
        }
    }

    pub(crate) fn is_in_flight(&self, ticket: Ticket) -> bool {
        self.in_flight == Some(ticket)
    }

    /// Starts a list call, or folds the request into the one already running.
    pub(crate) fn begin_refresh(&mut self, next_ticket: impl FnOnce() -> Ticket) -> RefreshStart {
        if let Some(running) = self.in_flight {
            debug!(%running, "refresh coalesced into pending follow-up");
            self.queued = true;
            return RefreshStart::Coalesced;
        }
        let ticket = next_ticket();
        self.in_flight = Some(ticket);
        self.queued = false;
        debug!(%ticket, "refresh issued");
        RefreshStart::Issue(ticket)
    }

    /// Remembers a refresh to run once the store may issue one again.
    pub(crate) fn queue_refresh(&mut self) {
        self.queued = true;
    }

    pub(crate) fn take_queued(&mut self) -> bool {
        std::mem::take(&mut self.queued)
    }

    pub(crate) fn complete_refresh(
        &mut self,
        ticket: Ticket,
        result: Result<Vec<Record>, RemoteError>,
    ) -> RefreshCompletion {
        if !self.is_in_flight(ticket) {
            debug!(%ticket, "ignoring stale list settlement");
            return RefreshCompletion {
                replaced: false,
                follow_up: false,
            };
        }
        self.in_flight = None;

        let replaced = match result.and_then(check_unique_ids) {
            Ok(records) => {
                let generation = self.snapshot.generation() + 1;
                info!(%ticket, rows = records.len(), generation, "snapshot replaced");
                self.snapshot = Snapshot::new(records, generation);
                self.error = None;
                self.loaded_once = true;
                true
            }
            Err(error) => {
                warn!(%ticket, %error, "refresh failed; keeping previous snapshot");
                self.error = Some(error);
                false
            }
        };

        RefreshCompletion {
            replaced,
            follow_up: self.take_queued(),
        }
    }
}

fn check_unique_ids(records: Vec<Record>) -> Result<Vec<Record>, RemoteError> {
    let mut seen = HashSet::with_capacity(records.len());
    for record in &records {
        if !seen.insert(&record.id) {
            return Err(RemoteError::Protocol(format!(
                "duplicate record id {} in list response",
                record.id
            )));
        }
    }
    Ok(records)
}
