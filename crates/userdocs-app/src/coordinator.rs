// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use tracing::{debug, info, warn};

use crate::{
    MutationKind, PreconditionError, Record, RecordFields, RecordId, RemoteError, Ticket,
};

/// The dialog-like surface a mutation flow currently has open.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Affordance {
    #[default]
    Closed,
    Add {
        draft: RecordFields,
    },
    Edit {
        target: Record,
        draft: RecordFields,
    },
    ConfirmDelete {
        target: Record,
    },
}

impl Affordance {
    pub const fn is_open(&self) -> bool {
        !matches!(self, Self::Closed)
    }

    /// The flow this surface belongs to. `None` when closed.
    pub const fn kind(&self) -> Option<MutationKind> {
        match self {
            Self::Closed => None,
            Self::Add { .. } => Some(MutationKind::Add),
            Self::Edit { .. } => Some(MutationKind::Edit),
            Self::ConfirmDelete { .. } => Some(MutationKind::Delete),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMutation {
    pub ticket: Ticket,
    pub kind: MutationKind,
    pub target: Option<RecordId>,
    pub fields: Option<RecordFields>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationOutcome {
    pub kind: MutationKind,
    pub target: Option<RecordId>,
    pub result: Result<(), RemoteError>,
}

impl MutationOutcome {
    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Submitting(PendingMutation),
    Settled(MutationOutcome),
}

/// Owns the add/edit/delete flows. Never touches the snapshot.
#[derive(Debug, Clone, Default)]
pub struct MutationCoordinator {
    affordance: Affordance,
    phase: Phase,
}

impl MutationCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn affordance(&self) -> &Affordance {
        &self.affordance
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn in_flight(&self) -> Option<&PendingMutation> {
        match &self.phase {
            Phase::Submitting(pending) => Some(pending),
            Phase::Idle | Phase::Settled(_) => None,
        }
    }

    pub fn is_submitting(&self) -> bool {
        self.in_flight().is_some()
    }

    pub fn ensure_idle(&self) -> Result<(), PreconditionError> {
        match self.in_flight() {
            Some(pending) => Err(PreconditionError::MutationInFlight(pending.kind)),
            None => Ok(()),
        }
    }

    /// Forms are modal: a `kind` flow may start only when nothing else is open.
    /// An edit form only admits further edits of its own target; a delete
    /// confirmation holds no draft and may be re-aimed.
    pub fn ensure_available(
        &self,
        kind: MutationKind,
        target: Option<&RecordId>,
    ) -> Result<(), PreconditionError> {
        self.ensure_idle()?;
        let admitted = match (&self.affordance, kind) {
            (Affordance::Closed, _)
            | (Affordance::Add { .. }, MutationKind::Add)
            | (Affordance::ConfirmDelete { .. }, MutationKind::Delete) => true,
            (Affordance::Edit { target: open, .. }, MutationKind::Edit) => {
                target == Some(&open.id)
            }
            _ => false,
        };
        match self.affordance.kind() {
            Some(open) if !admitted => Err(PreconditionError::FormOpen(open)),
            _ => Ok(()),
        }
    }

    /// Target of the delete awaiting confirmation.
    pub fn pending_delete(&self) -> Option<&Record> {
        match &self.affordance {
            Affordance::ConfirmDelete { target } => Some(target),
            _ => None,
        }
    }

    pub fn open_add(&mut self) -> Result<(), PreconditionError> {
        self.ensure_available(MutationKind::Add, None)?;
        if !matches!(self.affordance, Affordance::Add { .. }) {
            self.affordance = Affordance::Add {
                draft: RecordFields::default(),
            };
        }
        Ok(())
    }

    pub fn open_edit(&mut self, target: &Record) -> Result<(), PreconditionError> {
        self.ensure_available(MutationKind::Edit, Some(&target.id))?;
        let already_open = matches!(
            &self.affordance,
            Affordance::Edit { target: open, .. } if open.id == target.id
        );
        if !already_open {
            self.affordance = Affordance::Edit {
                target: target.clone(),
                draft: target.fields.clone(),
            };
        }
        Ok(())
    }

    /// Draft an edit of `target` starts from: the retained attempt if its
    /// dialog is still open, otherwise the record itself.
    pub fn edit_base(&self, target: &Record) -> RecordFields {
        match &self.affordance {
            Affordance::Edit {
                target: open,
                draft,
            } if open.id == target.id => draft.clone(),
            _ => target.fields.clone(),
        }
    }

    pub fn open_delete(&mut self, target: &Record) -> Result<(), PreconditionError> {
        self.ensure_available(MutationKind::Delete, Some(&target.id))?;
        self.affordance = Affordance::ConfirmDelete {
            target: target.clone(),
        };
        Ok(())
    }

    pub fn cancel_delete(&mut self) -> bool {
        if self.is_submitting() || !matches!(self.affordance, Affordance::ConfirmDelete { .. }) {
            return false;
        }
        self.affordance = Affordance::Closed;
        true
    }

    pub fn close(&mut self) -> Result<(), PreconditionError> {
        self.ensure_idle()?;
        self.affordance = Affordance::Closed;
        Ok(())
    }

    pub fn submit_add(
        &mut self,
        ticket: Ticket,
        fields: RecordFields,
    ) -> Result<(), PreconditionError> {
        self.ensure_available(MutationKind::Add, None)?;
        self.affordance = Affordance::Add {
            draft: fields.clone(),
        };
        self.begin(PendingMutation {
            ticket,
            kind: MutationKind::Add,
            target: None,
            fields: Some(fields),
        });
        Ok(())
    }

    pub fn submit_edit(
        &mut self,
        ticket: Ticket,
        target: &Record,
        fields: RecordFields,
    ) -> Result<(), PreconditionError> {
        self.ensure_available(MutationKind::Edit, Some(&target.id))?;
        self.affordance = Affordance::Edit {
            target: target.clone(),
            draft: fields.clone(),
        };
        self.begin(PendingMutation {
            ticket,
            kind: MutationKind::Edit,
            target: Some(target.id.clone()),
            fields: Some(fields),
        });
        Ok(())
    }

    /// Sends the delete awaiting confirmation. Returns the target id.
    pub fn submit_delete(
        &mut self,
        next_ticket: impl FnOnce() -> Ticket,
    ) -> Result<(Ticket, RecordId), PreconditionError> {
        self.ensure_idle()?;
        let Affordance::ConfirmDelete { target } = &self.affordance else {
            return Err(PreconditionError::NoPendingDelete);
        };
        let id = target.id.clone();
        let ticket = next_ticket();
        self.begin(PendingMutation {
            ticket,
            kind: MutationKind::Delete,
            target: Some(id.clone()),
            fields: None,
        });
        Ok((ticket, id))
    }

    /// Records the remote outcome. `None` when `ticket` is not in flight.
    pub fn settle(
        &mut self,
        ticket: Ticket,
        result: Result<(), RemoteError>,
    ) -> Option<MutationOutcome> {
        let pending = match &self.phase {
            Phase::Submitting(pending) if pending.ticket == ticket => pending.clone(),
            _ => {
                debug!(%ticket, "ignoring settlement for unknown mutation");
                return None;
            }
        };

        match &result {
            Ok(()) => {
                info!(%ticket, kind = pending.kind.label(), "mutation succeeded");
                self.affordance = Affordance::Closed;
            }
            Err(error) => {
                warn!(%ticket, kind = pending.kind.label(), %error, "mutation failed");
            }
        }

        let outcome = MutationOutcome {
            kind: pending.kind,
            target: pending.target,
            result,
        };
        self.phase = Phase::Settled(outcome.clone());
        Some(outcome)
    }

    fn begin(&mut self, pending: PendingMutation) {
        debug!(
            ticket = %pending.ticket,
            kind = pending.kind.label(),
            "mutation submitting"
        );
        self.phase = Phase::Submitting(pending);
    }
}

#[cfg(test)]
mod tests {
    use super::{Affordance, MutationCoordinator, Phase};
    use crate::{
        FieldName, MutationKind, PreconditionError, Record, RecordFields, RemoteError, Ticket,
    };

    fn record(id: &str, name: &str) -> Record {
        Record::new(
            id,
            RecordFields::default().with(FieldName::DocumentName, name),
        )
    }

    #[test]
    fn second_submission_is_rejected_while_one_is_in_flight() {
        let mut coordinator = MutationCoordinator::new();
        coordinator
            .submit_add(Ticket::new(1), RecordFields::default())
            .expect("first add accepted");

        let target = record("1", "A");
        assert_eq!(
            coordinator.submit_edit(Ticket::new(2), &target, target.fields.clone()),
            Err(PreconditionError::MutationInFlight(MutationKind::Add))
        );
        assert_eq!(
            coordinator.open_delete(&target),
            Err(PreconditionError::MutationInFlight(MutationKind::Add))
        );
    }

    #[test]
    fn failed_add_keeps_draft_and_affordance() {
        let mut coordinator = MutationCoordinator::new();
        let draft = RecordFields::default().with(FieldName::DocumentName, "Draft");
        coordinator
            .submit_add(Ticket::new(1), draft.clone())
            .expect("add accepted");

        let outcome = coordinator
            .settle(
                Ticket::new(1),
                Err(RemoteError::Application {
                    code: 1,
                    message: "bad".to_owned(),
                }),
            )
            .expect("outcome for in-flight ticket");
        assert!(!outcome.succeeded());
        assert_eq!(coordinator.affordance(), &Affordance::Add { draft });
        assert!(matches!(coordinator.phase(), Phase::Settled(_)));
        assert!(coordinator.ensure_idle().is_ok());
    }

    #[test]
    fn successful_edit_closes_affordance() {
        let mut coordinator = MutationCoordinator::new();
        let target = record("1", "A");
        coordinator.open_edit(&target).expect("open edit");
        coordinator
            .submit_edit(Ticket::new(4), &target, target.fields.clone())
            .expect("edit accepted");

        let outcome = coordinator
            .settle(Ticket::new(4), Ok(()))
            .expect("outcome for in-flight ticket");
        assert!(outcome.succeeded());
        assert_eq!(outcome.target, Some(target.id));
        assert_eq!(coordinator.affordance(), &Affordance::Closed);
    }

    #[test]
    fn confirm_without_request_is_rejected() {
        let mut coordinator = MutationCoordinator::new();
        assert_eq!(
            coordinator.submit_delete(|| Ticket::new(1)),
            Err(PreconditionError::NoPendingDelete)
        );
    }

    #[test]
    fn edit_base_prefers_retained_attempt_for_same_target() {
        let mut coordinator = MutationCoordinator::new();
        let target = record("1", "Original");
        let attempted = target
            .fields
            .clone()
            .with(FieldName::DocumentName, "Attempted");
        coordinator
            .submit_edit(Ticket::new(1), &target, attempted.clone())
            .expect("edit accepted");
        coordinator.settle(Ticket::new(1), Err(RemoteError::Network("down".to_owned())));

        assert_eq!(coordinator.edit_base(&target), attempted);
        assert_eq!(
            coordinator.edit_base(&record("2", "Other")).document_name,
            "Other"
        );
    }

    #[test]
    fn failed_add_draft_blocks_other_forms() {
        let mut coordinator = MutationCoordinator::new();
        let draft = RecordFields::default().with(FieldName::DocumentName, "Draft");
        coordinator
            .submit_add(Ticket::new(1), draft.clone())
            .expect("add accepted");
        coordinator.settle(Ticket::new(1), Err(RemoteError::Network("down".to_owned())));

        let target = record("1", "A");
        let blocked = Err(PreconditionError::FormOpen(MutationKind::Add));
        assert_eq!(coordinator.open_delete(&target), blocked);
        assert_eq!(coordinator.open_edit(&target), blocked);
        assert_eq!(
            coordinator.submit_edit(Ticket::new(2), &target, target.fields.clone()),
            blocked
        );
        assert_eq!(coordinator.affordance(), &Affordance::Add { draft });

        coordinator.close().expect("close while idle");
        assert!(coordinator.open_delete(&target).is_ok());
    }

    #[test]
    fn edit_form_only_admits_its_own_target() {
        let mut coordinator = MutationCoordinator::new();
        let first = record("1", "A");
        coordinator.open_edit(&first).expect("open edit");

        assert!(coordinator.open_edit(&first).is_ok());
        assert_eq!(
            coordinator.open_edit(&record("2", "B")),
            Err(PreconditionError::FormOpen(MutationKind::Edit))
        );
        assert_eq!(
            coordinator.open_add(),
            Err(PreconditionError::FormOpen(MutationKind::Edit))
        );
    }

    #[test]
    fn delete_confirmation_can_be_reaimed() {
        let mut coordinator = MutationCoordinator::new();
        coordinator.open_delete(&record("1", "A")).expect("open delete");
        coordinator.open_delete(&record("2", "B")).expect("re-aim delete");
        assert_eq!(
            coordinator.pending_delete().map(|target| target.id.as_str()),
            Some("2")
        );
        assert_eq!(
            coordinator.open_add(),
            Err(PreconditionError::FormOpen(MutationKind::Delete))
        );
    }

    #[test]
    fn unknown_ticket_does_not_settle() {
        let mut coordinator = MutationCoordinator::new();
        coordinator
            .submit_add(Ticket::new(1), RecordFields::default())
            .expect("add accepted");
        assert!(coordinator.settle(Ticket::new(2), Ok(())).is_none());
        assert!(coordinator.is_submitting());
    }
}
