// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use tracing::debug;

use crate::{
    Affordance, Direction, FieldEdits, InteractionTarget, MutationCoordinator, MutationKind,
    MutationOutcome, Notification, Phase, PointerSelect, PreconditionError, Record, RecordFields,
    RecordId, RecordStore, RefreshStart, Request, Selection, SelectionController, Settlement,
    Snapshot, Ticket,
};

/// Receives one notification per settled mutation. Rendering is up to the
/// implementor.
pub trait NotificationSink {
    fn push(&mut self, notification: Notification);
}

impl NotificationSink for Vec<Notification> {
    fn push(&mut self, notification: Notification) {
        Vec::push(self, notification);
    }
}

impl<S: NotificationSink + ?Sized> NotificationSink for &mut S {
    fn push(&mut self, notification: Notification) {
        (**self).push(notification);
    }
}

/// Which action-bar controls presentation should enable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Controls {
    pub add: bool,
    pub edit: bool,
    pub delete: bool,
    pub refresh: bool,
}

#[derive(Debug, Clone, Default)]
struct TicketCounter {
    last: u64,
}

impl TicketCounter {
    fn next(&mut self) -> Ticket {
        self.last = self.last.saturating_add(1);
        Ticket::new(self.last)
    }
}

/// The record synchronization and selection engine.
///
/// Entry points never perform I/O. They return the [`Request`]s to run; the
/// caller executes each one and hands the [`Settlement`] back to
/// [`Engine::settle`], which may ask for further requests.
#[derive(Debug)]
pub struct Engine<S> {
    store: RecordStore,
    selection: SelectionController,
    coordinator: MutationCoordinator,
    tickets: TicketCounter,
    sink: S,
}

impl<S: NotificationSink> Engine<S> {
    pub fn new(sink: S) -> Self {
        Self {
            store: RecordStore::new(),
            selection: SelectionController::new(),
            coordinator: MutationCoordinator::new(),
            tickets: TicketCounter::default(),
            sink,
        }
    }

    pub fn snapshot(&self) -> &Snapshot {
        self.store.snapshot()
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.selected(self.store.snapshot())
    }

    pub fn selected_record(&self) -> Option<&Record> {
        self.selection.selected_record(self.store.snapshot())
    }

    pub fn affordance(&self) -> &Affordance {
        self.coordinator.affordance()
    }

    pub fn phase(&self) -> &Phase {
        self.coordinator.phase()
    }

    /// True while a list call or a mutation is outstanding.
    pub fn busy(&self) -> bool {
        self.store.loading() || self.coordinator.is_submitting()
    }

    pub fn controls(&self) -> Controls {
        let idle = !self.coordinator.is_submitting();
        let selected = self.selection().is_some();
        Controls {
            add: idle,
            edit: idle && selected,
            delete: idle && selected,
            refresh: true,
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Requests a fresh list. Deferred while a mutation is submitting and
    /// coalesced while another list call is running.
    pub fn refresh(&mut self) -> Option<Request> {
        if self.coordinator.is_submitting() {
            debug!("refresh queued behind in-flight mutation");
            self.store.queue_refresh();
            return None;
        }
        match self.store.begin_refresh(|| self.tickets.next()) {
            RefreshStart::Issue(ticket) => Some(Request::List { ticket }),
            RefreshStart::Coalesced => None,
        }
    }

    pub fn open_add(&mut self) -> Result<(), PreconditionError> {
        self.coordinator.open_add()
    }

    pub fn add(&mut self, fields: RecordFields) -> Result<Request, PreconditionError> {
        self.coordinator.ensure_available(MutationKind::Add, None)?;
        let ticket = self.tickets.next();
        self.coordinator.submit_add(ticket, fields.clone())?;
        Ok(Request::Create { ticket, fields })
    }

    pub fn open_edit(&mut self) -> Result<(), PreconditionError> {
        let target = self
            .selected_record()
            .cloned()
            .ok_or(PreconditionError::NoSelection)?;
        self.coordinator.open_edit(&target)
    }

    /// Submits the selected record with `edits` applied. Fields not named in
    /// `edits` are sent with their current values.
    pub fn edit(&mut self, edits: &FieldEdits) -> Result<Request, PreconditionError> {
        let target = self
            .selected_record()
            .cloned()
            .ok_or(PreconditionError::NoSelection)?;
        self.coordinator
            .ensure_available(MutationKind::Edit, Some(&target.id))?;
        let fields = edits.apply_to(&self.coordinator.edit_base(&target));
        let ticket = self.tickets.next();
        self.coordinator
            .submit_edit(ticket, &target, fields.clone())?;
        Ok(Request::Update {
            ticket,
            id: target.id,
            fields,
        })
    }

    pub fn close_affordance(&mut self) -> Result<(), PreconditionError> {
        self.coordinator.close()
    }

    /// Opens the delete confirmation for the selected record.
    pub fn request_delete(&mut self) -> Result<(), PreconditionError> {
        let target = self
            .selected_record()
            .cloned()
            .ok_or(PreconditionError::NoSelection)?;
        self.coordinator.open_delete(&target)
    }

    /// Sends the pending delete. The confirmed record must still be the
    /// selected one; otherwise the confirmation is dropped.
    pub fn confirm_delete(&mut self) -> Result<Request, PreconditionError> {
        self.coordinator.ensure_idle()?;
        if let Some(target) = self.coordinator.pending_delete() {
            let selected = self.selection().map(|selection| &selection.id);
            if selected != Some(&target.id) {
                debug!(id = %target.id, "dropping delete confirmation for unselected record");
                self.coordinator.cancel_delete();
                return Err(PreconditionError::SelectionChanged);
            }
        }
        let (ticket, id) = self.coordinator.submit_delete(|| self.tickets.next())?;
        Ok(Request::Delete { ticket, id })
    }

    /// Dismisses the delete confirmation. The selection is left alone.
    pub fn cancel_delete(&mut self) -> bool {
        self.coordinator.cancel_delete()
    }

    pub fn select_by_pointer(&mut self, id: &RecordId, index: usize) -> PointerSelect {
        self.selection
            .select_by_pointer(self.store.snapshot(), id, index)
    }

    pub fn move_by_keyboard(&mut self, direction: Direction) {
        self.selection
            .move_by_keyboard(self.store.snapshot(), direction);
    }

    /// Unsets the selection. A delete confirmation goes with it.
    pub fn clear(&mut self) {
        self.drop_selection();
    }

    pub fn deselect_on_outside_interaction(&mut self, target: InteractionTarget) -> bool {
        let cleared = self.selection.deselect_on_outside_interaction(target);
        if cleared {
            self.drop_selection();
        }
        cleared
    }

    fn drop_selection(&mut self) {
        self.selection.clear();
        if self.coordinator.cancel_delete() {
            debug!("delete confirmation closed with the selection");
        }
    }

    /// Applies a finished request and returns any follow-up requests.
    pub fn settle(&mut self, settlement: Settlement) -> Vec<Request> {
        match settlement {
            Settlement::Listed { ticket, result } => {
                if !self.store.is_in_flight(ticket) {
                    debug!(%ticket, "ignoring list settlement that is not in flight");
                    return Vec::new();
                }
                let completion = self.store.complete_refresh(ticket, result);
                self.drop_selection();
                if completion.follow_up {
                    return self.refresh().into_iter().collect();
                }
                Vec::new()
            }
            Settlement::Mutated { ticket, result } => {
                let Some(outcome) = self.coordinator.settle(ticket, result) else {
                    return Vec::new();
                };
                self.sink.push(notification_for(&outcome));
                let wants_refresh = if outcome.succeeded() {
                    self.selection.clear();
                    self.store.take_queued();
                    true
                } else {
                    self.store.take_queued()
                };
                if wants_refresh {
                    return self.refresh().into_iter().collect();
                }
                Vec::new()
            }
        }
    }
}

fn notification_for(outcome: &MutationOutcome) -> Notification {
    match &outcome.result {
        Ok(()) => Notification::success(format!("record {}", outcome.kind.past_tense())),
        Err(error) => {
            let hint = match outcome.kind {
                MutationKind::Add | MutationKind::Edit => "; your changes are kept -- retry",
                MutationKind::Delete => "; confirm again to retry",
            };
            Notification::failure(format!("{} failed: {error}{hint}", outcome.kind.label()))
        }
    }
}
