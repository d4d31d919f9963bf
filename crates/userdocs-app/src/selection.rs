// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use tracing::debug;

use crate::{Direction, InteractionTarget, Record, RecordId, Snapshot};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub id: RecordId,
    pub index: usize,
    generation: u64,
}

/// Result of a pointer selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerSelect {
    Selected(usize),
    /// The index did not hold the record; it was located elsewhere.
    Rederived(usize),
    /// The record is not in the current snapshot.
    Missing,
}

/// Single source of truth for the highlighted row.
#[derive(Debug, Clone, Default)]
pub struct SelectionController {
    current: Option<Selection>,
}

impl SelectionController {
    pub fn new() -> Self {
        Self::default()
    }

    /// The selection, if it still belongs to `snapshot`.
    pub fn selected(&self, snapshot: &Snapshot) -> Option<&Selection> {
        self.current
            .as_ref()
            .filter(|selection| selection.generation == snapshot.generation())
            .filter(|selection| {
                snapshot
                    .get(selection.index)
                    .is_some_and(|record| record.id == selection.id)
            })
    }

    pub fn selected_record<'a>(&self, snapshot: &'a Snapshot) -> Option<&'a Record> {
        self.selected(snapshot)
            .and_then(|selection| snapshot.get(selection.index))
    }

    pub fn select_by_pointer(
        &mut self,
        snapshot: &Snapshot,
        id: &RecordId,
        index: usize,
    ) -> PointerSelect {
        if snapshot.get(index).is_some_and(|record| &record.id == id) {
            self.set(snapshot, index);
            return PointerSelect::Selected(index);
        }
        match snapshot.position(id) {
            Some(actual) => {
                debug!(%id, index, actual, "pointer index re-derived from id");
                self.set(snapshot, actual);
                PointerSelect::Rederived(actual)
            }
            None => {
                debug!(%id, "pointer selection ignored: id not in snapshot");
                PointerSelect::Missing
            }
        }
    }

    pub fn move_by_keyboard(&mut self, snapshot: &Snapshot, direction: Direction) {
        let len = snapshot.len();
        if len == 0 {
            self.clear();
            return;
        }
        let next = match (self.selected(snapshot).map(|s| s.index), direction) {
            (None, Direction::Next) => 0,
            (None, Direction::Prev) => return,
            (Some(index), Direction::Next) => (index + 1).min(len - 1),
            (Some(index), Direction::Prev) => index.saturating_sub(1).min(len - 1),
        };
        self.set(snapshot, next);
    }

    pub fn clear(&mut self) {
        self.current = None;
    }

    pub fn deselect_on_outside_interaction(&mut self, target: InteractionTarget) -> bool {
        match target {
            InteractionTarget::Outside => {
                let had = self.current.is_some();
                self.clear();
                had
            }
            InteractionTarget::RecordList
            | InteractionTarget::ActionBar(_)
            | InteractionTarget::Affordance => false,
        }
    }

    fn set(&mut self, snapshot: &Snapshot, index: usize) {
        if let Some(record) = snapshot.get(index) {
            self.current = Some(Selection {
                id: record.id.clone(),
                index,
                generation: snapshot.generation(),
            });
        }
    }
}
