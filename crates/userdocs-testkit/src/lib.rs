// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use time::format_description::well_known::Rfc3339;
use time::{Duration, OffsetDateTime};
use userdocs_app::{
    AuthToken, Engine, FieldName, NotificationSink, Record, RecordFields, RecordId, RecordService,
    RemoteError, Request,
};

const DOCUMENT_NAMES: [&str; 10] = [
    "Employment contract",
    "Vacation request",
    "NDA",
    "Equipment handover",
    "Salary amendment",
    "Remote work policy",
    "Travel order",
    "Training agreement",
    "Termination notice",
    "Bonus letter",
];

const DOCUMENT_TYPES: [&str; 5] = ["contract", "request", "order", "policy", "letter"];
const DOCUMENT_STATUSES: [&str; 4] = ["draft", "pending", "signed", "archived"];

const FIRST_NAMES: [&str; 12] = [
    "Avery", "Jordan", "Taylor", "Riley", "Morgan", "Casey", "Alex", "Quinn", "Parker", "Drew",
    "Kai", "Elliot",
];
const LAST_NAMES: [&str; 12] = [
    "Walker", "Martin", "Hill", "Evans", "Lopez", "Gray", "Ward", "Young", "Diaz", "Reed",
    "Turner", "Brooks",
];

pub const FIXTURE_TOKEN: &str = "fixture-token";

pub fn fixture_token() -> AuthToken {
    AuthToken::new(FIXTURE_TOKEN)
}

pub fn reference_now() -> OffsetDateTime {
    OffsetDateTime::UNIX_EPOCH + Duration::days(19_000)
}

/// A record whose only populated field is its document name.
pub fn named_record(id: &str, document_name: &str) -> Record {
    Record::new(
        id,
        RecordFields::default().with(FieldName::DocumentName, document_name),
    )
}

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }
}

/// Deterministic generator of plausible document records.
#[derive(Debug, Clone)]
pub struct DocFaker {
    rng: DeterministicRng,
}

impl DocFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
        }
    }

    pub fn fields(&mut self) -> RecordFields {
        let company_signed = self.timestamp_within_days(365);
        let employee_signed = self.timestamp_within_days(365);
        RecordFields {
            company_sig_date: company_signed,
            company_signature_name: format!("{}.sig", self.person()),
            document_name: self.pick(&DOCUMENT_NAMES).to_owned(),
            document_status: self.pick(&DOCUMENT_STATUSES).to_owned(),
            document_type: self.pick(&DOCUMENT_TYPES).to_owned(),
            employee_number: format!("{:04}", 1000 + self.rng.int_n(9000)),
            employee_sig_date: employee_signed,
            employee_signature_name: format!("{}.sig", self.person()),
        }
    }

    pub fn records(&mut self, count: usize) -> Vec<Record> {
        (1..=count)
            .map(|index| Record::new(index.to_string(), self.fields()))
            .collect()
    }

    fn person(&mut self) -> String {
        format!(
            "{} {}",
            self.pick(&FIRST_NAMES),
            self.pick(&LAST_NAMES)
        )
    }

    fn timestamp_within_days(&mut self, days: usize) -> String {
        let offset = Duration::days(self.rng.int_n(days) as i64);
        (reference_now() - offset)
            .format(&Rfc3339)
            .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_owned())
    }

    fn pick<'a>(&mut self, values: &'a [&'a str]) -> &'a str {
        values[self.rng.int_n(values.len())]
    }
}

/// Operations a failure can be scripted for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    List,
    Create,
    Update,
    Delete,
}

/// One call observed by [`FakeService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    List,
    Create(RecordFields),
    Update(RecordId, RecordFields),
    Delete(RecordId),
}

impl Call {
    pub const fn operation(&self) -> Operation {
        match self {
            Self::List => Operation::List,
            Self::Create(_) => Operation::Create,
            Self::Update(..) => Operation::Update,
            Self::Delete(_) => Operation::Delete,
        }
    }
}

#[derive(Debug, Default)]
struct FakeState {
    records: Vec<Record>,
    next_id: u64,
    calls: Vec<Call>,
    failures: VecDeque<(Operation, RemoteError)>,
}

/// In-memory documents resource with a call log and scripted failures.
#[derive(Debug)]
pub struct FakeService {
    token: AuthToken,
    state: Mutex<FakeState>,
}

impl Default for FakeService {
    fn default() -> Self {
        Self::with_records(Vec::new())
    }
}

impl FakeService {
    pub fn with_records(records: Vec<Record>) -> Self {
        let next_id = records.len() as u64 + 100;
        Self {
            token: fixture_token(),
            state: Mutex::new(FakeState {
                records,
                next_id,
                ..FakeState::default()
            }),
        }
    }

    /// The next call of kind `operation` fails with `error` instead of running.
    pub fn fail_next(&self, operation: Operation, error: RemoteError) {
        self.lock().failures.push_back((operation, error));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub fn call_count(&self, operation: Operation) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|call| call.operation() == operation)
            .count()
    }

    pub fn records(&self) -> Vec<Record> {
        self.lock().records.clone()
    }

    /// Changes the server-side list without going through the engine.
    pub fn replace_records(&self, records: Vec<Record>) {
        self.lock().records = records;
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn admit(&self, token: &AuthToken, call: Call) -> Result<MutexGuard<'_, FakeState>, RemoteError> {
        let mut state = self.lock();
        let operation = call.operation();
        state.calls.push(call);
        if token != &self.token {
            return Err(RemoteError::Auth { status: 403 });
        }
        let scripted = state
            .failures
            .iter()
            .position(|(failing, _)| *failing == operation);
        if let Some(position) = scripted
            && let Some((_, error)) = state.failures.remove(position)
        {
            return Err(error);
        }
        Ok(state)
    }
}

impl RecordService for FakeService {
    fn list(&self, token: &AuthToken) -> Result<Vec<Record>, RemoteError> {
        let state = self.admit(token, Call::List)?;
        Ok(state.records.clone())
    }

    fn create(&self, token: &AuthToken, fields: &RecordFields) -> Result<(), RemoteError> {
        let mut state = self.admit(token, Call::Create(fields.clone()))?;
        state.next_id += 1;
        let id = state.next_id.to_string();
        state.records.push(Record::new(id, fields.clone()));
        Ok(())
    }

    fn update(
        &self,
        token: &AuthToken,
        id: &RecordId,
        fields: &RecordFields,
    ) -> Result<(), RemoteError> {
        let mut state = self.admit(token, Call::Update(id.clone(), fields.clone()))?;
        let record = state
            .records
            .iter_mut()
            .find(|record| &record.id == id)
            .ok_or_else(|| RemoteError::NotFound {
                id: id.to_string(),
            })?;
        record.fields = fields.clone();
        Ok(())
    }

    fn delete(&self, token: &AuthToken, id: &RecordId) -> Result<(), RemoteError> {
        let mut state = self.admit(token, Call::Delete(id.clone()))?;
        let before = state.records.len();
        state.records.retain(|record| &record.id != id);
        if state.records.len() == before {
            return Err(RemoteError::NotFound {
                id: id.to_string(),
            });
        }
        Ok(())
    }
}

/// Executes `requests` and every follow-up the engine asks for, in order,
/// until the engine is quiet. Returns how many requests ran.
pub fn drive<S, R>(
    engine: &mut Engine<S>,
    service: &R,
    token: &AuthToken,
    requests: impl IntoIterator<Item = Request>,
) -> usize
where
    S: NotificationSink,
    R: RecordService + ?Sized,
{
    let mut queue: VecDeque<Request> = requests.into_iter().collect();
    let mut executed = 0;
    while let Some(request) = queue.pop_front() {
        let settlement = request.execute(service, token);
        executed += 1;
        queue.extend(engine.settle(settlement));
    }
    executed
}

/// An engine whose first refresh against `service` has completed.
pub fn loaded_engine<R>(service: &R) -> Engine<Vec<userdocs_app::Notification>>
where
    R: RecordService + ?Sized,
{
    let mut engine = Engine::new(Vec::new());
    let initial = engine.refresh();
    drive(&mut engine, service, &fixture_token(), initial);
    engine
}
