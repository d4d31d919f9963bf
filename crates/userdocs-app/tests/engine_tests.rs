// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use userdocs_app::{
    ActionControl, Affordance, Direction, FieldEdits, FieldName, InteractionTarget, MutationKind,
    NotificationKind, PreconditionError, RecordFields, RecordId, RemoteError, Request, StoreStatus,
};
use userdocs_testkit::{
    Call, DocFaker, FakeService, Operation, drive, fixture_token, loaded_engine, named_record,
};

fn two_rows() -> FakeService {
    FakeService::with_records(vec![named_record("1", "A"), named_record("2", "B")])
}

#[test]
fn pointer_then_keyboard_moves_to_first_row() {
    let service = two_rows();
    let mut engine = loaded_engine(&service);

    engine.select_by_pointer(&RecordId::from("2"), 1);
    engine.move_by_keyboard(Direction::Prev);

    let selection = engine.selection().expect("selection after keyboard move");
    assert_eq!(selection.index, 0);
    assert_eq!(selection.id.as_str(), "1");
}

#[test]
fn successful_add_grows_snapshot_and_clears_selection() -> Result<()> {
    let service = two_rows();
    let mut engine = loaded_engine(&service);
    engine.move_by_keyboard(Direction::Next);
    engine.open_add()?;

    let fields = RecordFields::default().with(FieldName::DocumentName, "C");
    let request = engine.add(fields)?;
    let executed = drive(&mut engine, &service, &fixture_token(), [request]);

    assert_eq!(executed, 2, "create followed by exactly one list");
    assert_eq!(engine.snapshot().len(), 3);
    assert!(engine.selection().is_none());
    assert_eq!(engine.affordance(), &Affordance::Closed);
    assert_eq!(engine.sink().len(), 1);
    assert_eq!(engine.sink()[0].kind, NotificationKind::Success);
    assert_eq!(engine.sink()[0].message, "record added");
    Ok(())
}

#[test]
fn failed_add_keeps_draft_open_and_snapshot_untouched() -> Result<()> {
    let service = two_rows();
    let mut engine = loaded_engine(&service);
    let generation = engine.snapshot().generation();
    service.fail_next(
        Operation::Create,
        RemoteError::Application {
            code: 2,
            message: "documentName is required".to_owned(),
        },
    );

    engine.open_add()?;
    let draft = RecordFields::default().with(FieldName::EmployeeNumber, "42");
    let request = engine.add(draft.clone())?;
    let executed = drive(&mut engine, &service, &fixture_token(), [request]);

    assert_eq!(executed, 1, "no refresh after a failed add");
    assert_eq!(engine.affordance(), &Affordance::Add { draft });
    assert_eq!(engine.snapshot().generation(), generation);
    assert_eq!(engine.snapshot().len(), 2);
    assert_eq!(engine.sink().len(), 1);
    let note = &engine.sink()[0];
    assert_eq!(note.kind, NotificationKind::Failure);
    assert!(note.message.contains("documentName is required"));
    Ok(())
}

#[test]
fn confirmed_delete_removes_row_and_clears_selection() -> Result<()> {
    let service = two_rows();
    let mut engine = loaded_engine(&service);

    engine.select_by_pointer(&RecordId::from("2"), 1);
    engine.request_delete()?;
    assert!(matches!(engine.affordance(), Affordance::ConfirmDelete { .. }));
    assert_eq!(service.call_count(Operation::Delete), 0);

    let request = engine.confirm_delete()?;
    drive(&mut engine, &service, &fixture_token(), [request]);

    let ids: Vec<&str> = engine
        .snapshot()
        .records()
        .iter()
        .map(|record| record.id.as_str())
        .collect();
    assert_eq!(ids, vec!["1"]);
    assert!(engine.selection().is_none());
    assert_eq!(engine.sink().len(), 1);
    assert_eq!(engine.sink()[0].message, "record deleted");
    Ok(())
}

#[test]
fn successful_edit_keeps_length_and_applies_change() -> Result<()> {
    let service = two_rows();
    let mut engine = loaded_engine(&service);

    engine.select_by_pointer(&RecordId::from("1"), 0);
    engine.open_edit()?;
    let request = engine.edit(&FieldEdits::new().set(FieldName::DocumentStatus, "signed"))?;
    drive(&mut engine, &service, &fixture_token(), [request]);

    assert_eq!(engine.snapshot().len(), 2);
    let first = engine.snapshot().get(0).expect("first row");
    assert_eq!(first.fields.document_name, "A");
    assert_eq!(first.fields.document_status, "signed");
    assert!(engine.selection().is_none());
    assert_eq!(engine.sink()[0].message, "record updated");
    Ok(())
}

#[test]
fn mutations_without_selection_never_reach_the_network() {
    let service = two_rows();
    let mut engine = loaded_engine(&service);

    assert_eq!(
        engine.edit(&FieldEdits::new().set(FieldName::DocumentName, "x")),
        Err(PreconditionError::NoSelection)
    );
    assert_eq!(engine.request_delete(), Err(PreconditionError::NoSelection));
    assert_eq!(engine.open_edit(), Err(PreconditionError::NoSelection));
    assert_eq!(
        engine.confirm_delete(),
        Err(PreconditionError::NoPendingDelete)
    );

    assert_eq!(service.calls(), vec![Call::List]);
    let controls = engine.controls();
    assert!(!controls.edit && !controls.delete);
}

#[test]
fn second_mutation_is_rejected_while_first_is_submitting() -> Result<()> {
    let service = two_rows();
    let mut engine = loaded_engine(&service);
    engine.select_by_pointer(&RecordId::from("1"), 0);

    let first = engine.add(RecordFields::default().with(FieldName::DocumentName, "C"))?;
    let in_flight = Err(PreconditionError::MutationInFlight(MutationKind::Add));
    assert_eq!(engine.add(RecordFields::default()).map(|_| ()), in_flight);
    assert_eq!(engine.edit(&FieldEdits::new()).map(|_| ()), in_flight);
    assert_eq!(engine.request_delete(), in_flight);

    drive(&mut engine, &service, &fixture_token(), [first]);
    assert_eq!(service.call_count(Operation::Create), 1);
    assert_eq!(service.call_count(Operation::Update), 0);
    assert!(engine.add(RecordFields::default()).is_ok());
    Ok(())
}

#[test]
fn cancel_delete_preserves_selection_without_calls() -> Result<()> {
    let service = two_rows();
    let mut engine = loaded_engine(&service);
    engine.select_by_pointer(&RecordId::from("2"), 1);

    engine.request_delete()?;
    assert!(engine.cancel_delete());
    assert!(!engine.cancel_delete(), "nothing left to cancel");

    assert_eq!(service.calls(), vec![Call::List]);
    assert_eq!(engine.affordance(), &Affordance::Closed);
    let selection = engine.selection().expect("selection survives cancel");
    assert_eq!(selection.id.as_str(), "2");
    Ok(())
}

#[test]
fn unmodified_edit_resubmits_every_field_unchanged() -> Result<()> {
    let records = DocFaker::new(11).records(4);
    let service = FakeService::with_records(records.clone());
    let mut engine = loaded_engine(&service);

    engine.select_by_pointer(&records[2].id, 2);
    let request = engine.edit(&FieldEdits::new())?;
    let Request::Update { id, fields, .. } = &request else {
        panic!("expected an update request, got {request:?}");
    };
    assert_eq!(id, &records[2].id);
    assert_eq!(fields, &records[2].fields);

    drive(&mut engine, &service, &fixture_token(), [request]);
    assert_eq!(
        service.calls().last(),
        Some(&Call::List),
        "edit settles into a refresh"
    );
    assert_eq!(service.records(), records);
    Ok(())
}

#[test]
fn failed_edit_retry_builds_on_attempted_values() -> Result<()> {
    let service = two_rows();
    let mut engine = loaded_engine(&service);
    service.fail_next(Operation::Update, RemoteError::Network("timed out".to_owned()));

    engine.select_by_pointer(&RecordId::from("1"), 0);
    let attempt = engine.edit(&FieldEdits::new().set(FieldName::DocumentName, "Renamed"))?;
    drive(&mut engine, &service, &fixture_token(), [attempt]);
    assert!(matches!(engine.affordance(), Affordance::Edit { .. }));
    assert!(engine.selection().is_some(), "failure keeps the selection");

    let retry = engine.edit(&FieldEdits::new().set(FieldName::DocumentType, "memo"))?;
    drive(&mut engine, &service, &fixture_token(), [retry]);

    let first = engine.snapshot().get(0).expect("first row");
    assert_eq!(first.fields.document_name, "Renamed");
    assert_eq!(first.fields.document_type, "memo");
    assert_eq!(engine.sink().len(), 2);
    assert_eq!(engine.sink()[0].kind, NotificationKind::Failure);
    assert_eq!(engine.sink()[1].kind, NotificationKind::Success);
    Ok(())
}

#[test]
fn failed_delete_keeps_confirmation_for_retry() -> Result<()> {
    let service = two_rows();
    let mut engine = loaded_engine(&service);
    service.fail_next(Operation::Delete, RemoteError::Network("reset".to_owned()));

    engine.select_by_pointer(&RecordId::from("1"), 0);
    engine.request_delete()?;
    let first = engine.confirm_delete()?;
    drive(&mut engine, &service, &fixture_token(), [first]);
    assert!(matches!(engine.affordance(), Affordance::ConfirmDelete { .. }));
    assert!(engine.sink()[0].message.contains("confirm again"));

    let second = engine.confirm_delete()?;
    drive(&mut engine, &service, &fixture_token(), [second]);
    assert_eq!(engine.snapshot().len(), 1);
    assert_eq!(service.call_count(Operation::Delete), 2);
    Ok(())
}

#[test]
fn overlapping_refreshes_coalesce_into_one_follow_up() {
    let service = two_rows();
    let mut engine = loaded_engine(&service);

    let first = engine.refresh().expect("first refresh issues a list call");
    assert!(engine.refresh().is_none());
    assert!(engine.refresh().is_none());
    assert!(engine.store().refresh_queued());
    assert_eq!(engine.store().status(), StoreStatus::Loading);

    let executed = drive(&mut engine, &service, &fixture_token(), [first]);
    assert_eq!(executed, 2);
    assert_eq!(service.call_count(Operation::List), 3);
    assert!(!engine.busy());
}

#[test]
fn refresh_during_mutation_runs_once_after_it_settles() -> Result<()> {
    let service = two_rows();
    let mut engine = loaded_engine(&service);

    let add = engine.add(RecordFields::default().with(FieldName::DocumentName, "C"))?;
    assert!(engine.refresh().is_none());
    assert_eq!(service.call_count(Operation::List), 1);

    let executed = drive(&mut engine, &service, &fixture_token(), [add]);
    assert_eq!(executed, 2);
    assert_eq!(service.call_count(Operation::List), 2);
    assert_eq!(engine.snapshot().len(), 3);
    Ok(())
}

#[test]
fn refresh_picks_up_external_changes_and_clears_selection() {
    let service = two_rows();
    let mut engine = loaded_engine(&service);
    engine.select_by_pointer(&RecordId::from("2"), 1);

    service.replace_records(vec![named_record("2", "B"), named_record("3", "C")]);
    let request = engine.refresh();
    drive(&mut engine, &service, &fixture_token(), request);

    assert!(engine.selection().is_none());
    assert_eq!(engine.snapshot().position(&RecordId::from("3")), Some(1));
}

#[test]
fn failed_refresh_keeps_previous_rows_as_stale() {
    let service = two_rows();
    let mut engine = loaded_engine(&service);
    engine.move_by_keyboard(Direction::Next);
    let failure = RemoteError::Network("connection refused".to_owned());
    service.fail_next(Operation::List, failure.clone());

    let request = engine.refresh();
    drive(&mut engine, &service, &fixture_token(), request);

    assert_eq!(engine.snapshot().len(), 2);
    assert_eq!(engine.store().status(), StoreStatus::Stale(&failure));
    assert!(engine.selection().is_none());
    assert!(engine.sink().is_empty(), "read failures are not notifications");
}

#[test]
fn failed_first_load_is_broken_not_empty() {
    let service = two_rows();
    let mut engine = userdocs_app::Engine::new(Vec::new());
    assert_eq!(engine.store().status(), StoreStatus::NotLoaded);

    let request = engine.refresh();
    drive(
        &mut engine,
        &service,
        &userdocs_app::AuthToken::new("expired"),
        request,
    );

    assert!(engine.snapshot().is_empty());
    assert_eq!(
        engine.store().status(),
        StoreStatus::Broken(&RemoteError::Auth { status: 403 })
    );
}

#[test]
fn keyboard_tracks_shrinking_list_after_delete() -> Result<()> {
    let service = FakeService::with_records(DocFaker::new(3).records(3));
    let mut engine = loaded_engine(&service);

    for _ in 0..5 {
        engine.move_by_keyboard(Direction::Next);
    }
    assert_eq!(engine.selection().map(|s| s.index), Some(2));

    engine.request_delete()?;
    let request = engine.confirm_delete()?;
    drive(&mut engine, &service, &fixture_token(), [request]);
    assert_eq!(engine.snapshot().len(), 2);

    for _ in 0..5 {
        engine.move_by_keyboard(Direction::Next);
    }
    assert_eq!(engine.selection().map(|s| s.index), Some(1));
    Ok(())
}

#[test]
fn action_bar_clicks_keep_selection_outside_clicks_clear_it() {
    let service = two_rows();
    let mut engine = loaded_engine(&service);
    engine.select_by_pointer(&RecordId::from("1"), 0);

    assert!(!engine.deselect_on_outside_interaction(InteractionTarget::ActionBar(
        ActionControl::Delete
    )));
    assert!(!engine.deselect_on_outside_interaction(InteractionTarget::Affordance));
    assert!(engine.selection().is_some());

    assert!(engine.deselect_on_outside_interaction(InteractionTarget::Outside));
    assert!(engine.selection().is_none());
}

#[test]
fn confirm_after_escape_is_rejected_without_calls() -> Result<()> {
    let service = two_rows();
    let mut engine = loaded_engine(&service);
    engine.select_by_pointer(&RecordId::from("2"), 1);
    engine.request_delete()?;

    engine.clear();
    assert_eq!(engine.affordance(), &Affordance::Closed);
    assert_eq!(
        engine.confirm_delete(),
        Err(PreconditionError::NoPendingDelete)
    );

    assert_eq!(service.call_count(Operation::Delete), 0);
    assert_eq!(engine.snapshot().len(), 2);
    Ok(())
}

#[test]
fn refresh_closes_pending_delete_confirmation() -> Result<()> {
    let service = two_rows();
    let mut engine = loaded_engine(&service);
    engine.move_by_keyboard(Direction::Next);
    engine.request_delete()?;

    let request = engine.refresh();
    drive(&mut engine, &service, &fixture_token(), request);
    assert!(engine.selection().is_none());
    assert!(!engine.controls().delete);
    assert_eq!(engine.affordance(), &Affordance::Closed);
    assert_eq!(
        engine.confirm_delete(),
        Err(PreconditionError::NoPendingDelete)
    );

    assert_eq!(service.call_count(Operation::Delete), 0);
    assert_eq!(engine.snapshot().len(), 2);
    Ok(())
}

#[test]
fn outside_click_closes_pending_delete_confirmation() -> Result<()> {
    let service = two_rows();
    let mut engine = loaded_engine(&service);
    engine.select_by_pointer(&RecordId::from("1"), 0);
    engine.request_delete()?;

    assert!(engine.deselect_on_outside_interaction(InteractionTarget::Outside));
    assert_eq!(engine.affordance(), &Affordance::Closed);
    assert!(engine.confirm_delete().is_err());
    assert_eq!(service.call_count(Operation::Delete), 0);
    Ok(())
}

#[test]
fn confirm_after_selecting_another_row_deletes_nothing() -> Result<()> {
    let service = two_rows();
    let mut engine = loaded_engine(&service);
    engine.select_by_pointer(&RecordId::from("1"), 0);
    engine.request_delete()?;

    engine.select_by_pointer(&RecordId::from("2"), 1);
    assert_eq!(
        engine.confirm_delete(),
        Err(PreconditionError::SelectionChanged)
    );
    assert_eq!(engine.affordance(), &Affordance::Closed);
    assert_eq!(service.call_count(Operation::Delete), 0);

    engine.request_delete()?;
    let request = engine.confirm_delete()?;
    assert_eq!(
        request,
        Request::Delete {
            ticket: request.ticket(),
            id: RecordId::from("2")
        }
    );
    Ok(())
}

#[test]
fn failed_add_draft_survives_a_delete_request() -> Result<()> {
    let service = two_rows();
    let mut engine = loaded_engine(&service);
    service.fail_next(Operation::Create, RemoteError::Network("reset".to_owned()));

    let draft = RecordFields::default().with(FieldName::DocumentName, "Memo");
    let request = engine.add(draft.clone())?;
    drive(&mut engine, &service, &fixture_token(), [request]);

    engine.select_by_pointer(&RecordId::from("1"), 0);
    assert_eq!(
        engine.request_delete(),
        Err(PreconditionError::FormOpen(MutationKind::Add))
    );
    assert_eq!(
        engine.edit(&FieldEdits::new()).map(|_| ()),
        Err(PreconditionError::FormOpen(MutationKind::Add))
    );
    assert_eq!(service.calls(), vec![Call::List, Call::Create(draft.clone())]);
    assert_eq!(engine.affordance(), &Affordance::Add { draft });
    Ok(())
}
