// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow, bail};
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use tracing::debug;
use userdocs_app::{
    ActionControl, Affordance, AuthToken, Direction, Engine, FieldEdits, FieldName,
    InteractionTarget, MutationKind, Notification, NotificationKind, PointerSelect, PreconditionError,
    RecordFields, RecordService, Request, Settlement, Snapshot, StoreStatus,
};

#[cfg(test)]
const IDLE_WAIT: Duration = Duration::from_secs(10);

#[derive(Debug)]
pub enum InternalEvent {
    Input(String),
    InputClosed,
    Settled(Settlement),
    ClearStatus { token: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    List,
    Refresh,
    /// Zero-based row.
    Click(usize),
    Next,
    Prev,
    Escape,
    Outside,
    Add(FieldEdits),
    Edit(FieldEdits),
    Delete,
    Confirm,
    Cancel,
    Status,
    Whoami,
    Logout,
    Help,
    Quit,
}

impl Command {
    /// Parses one input line. Blank lines yield `None`.
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            return Ok(None);
        };
        let rest: Vec<&str> = words.collect();
        let head = head.to_ascii_lowercase();

        let command = match head.as_str() {
            "click" => {
                let [raw] = rest.as_slice() else {
                    bail!("usage: click <row>");
                };
                let row: usize = raw
                    .parse()
                    .map_err(|_| anyhow!("row must be a number, got {raw:?}"))?;
                if row == 0 {
                    bail!("rows are numbered from 1");
                }
                return Ok(Some(Self::Click(row - 1)));
            }
            "add" => {
                return Ok(Some(Self::Add(FieldEdits::parse_assignments(
                    group_assignments(&rest),
                )?)));
            }
            "edit" => {
                return Ok(Some(Self::Edit(FieldEdits::parse_assignments(
                    group_assignments(&rest),
                )?)));
            }
            "list" | "ls" => Self::List,
            "refresh" | "r" => Self::Refresh,
            "next" | "j" | "down" => Self::Next,
            "prev" | "k" | "up" => Self::Prev,
            "esc" | "escape" => Self::Escape,
            "outside" => Self::Outside,
            "delete" | "rm" => Self::Delete,
            "confirm" | "y" => Self::Confirm,
            "cancel" | "n" => Self::Cancel,
            "status" => Self::Status,
            "whoami" => Self::Whoami,
            "logout" => Self::Logout,
            "help" | "?" => Self::Help,
            "quit" | "exit" | "q" => Self::Quit,
            unknown => bail!("unknown command {unknown:?}; type `help` for the command list"),
        };
        if !rest.is_empty() {
            bail!("`{head}` takes no arguments");
        }
        Ok(Some(command))
    }

    /// Where this command lands when treated as a pointer interaction.
    pub const fn target(&self) -> Option<InteractionTarget> {
        match self {
            Self::Click(_) => Some(InteractionTarget::RecordList),
            Self::Refresh => Some(InteractionTarget::ActionBar(ActionControl::Refresh)),
            Self::Add(_) => Some(InteractionTarget::ActionBar(ActionControl::Add)),
            Self::Edit(_) => Some(InteractionTarget::ActionBar(ActionControl::Edit)),
            Self::Delete => Some(InteractionTarget::ActionBar(ActionControl::Delete)),
            Self::Confirm | Self::Cancel => Some(InteractionTarget::Affordance),
            Self::Outside => Some(InteractionTarget::Outside),
            Self::List
            | Self::Next
            | Self::Prev
            | Self::Escape
            | Self::Status
            | Self::Whoami
            | Self::Logout
            | Self::Help
            | Self::Quit => None,
        }
    }
}

/// Rejoins values that contained spaces: words without `=` belong to the
/// preceding assignment.
fn group_assignments(words: &[&str]) -> Vec<String> {
    let mut grouped: Vec<String> = Vec::new();
    for word in words {
        match grouped.last_mut() {
            Some(last) if !word.contains('=') => {
                last.push(' ');
                last.push_str(word);
            }
            _ => grouped.push((*word).to_owned()),
        }
    }
    grouped
}

/// Drives one engine from line commands. Requests run on their own threads and
/// come back as [`InternalEvent::Settled`].
pub struct Session<S: ?Sized, W> {
    engine: Engine<Vec<Notification>>,
    service: Arc<S>,
    token: AuthToken,
    user: Option<String>,
    logout_pending: bool,
    tx: Sender<InternalEvent>,
    out: W,
    notification_ttl: Duration,
    status: Option<Notification>,
    status_token: u64,
    in_flight: usize,
}

impl<S, W> Session<S, W>
where
    S: RecordService + Send + Sync + ?Sized + 'static,
    W: Write,
{
    /// `user` is the name the token was issued to, when known.
    pub fn new(
        service: Arc<S>,
        token: AuthToken,
        user: Option<String>,
        notification_ttl: Duration,
        out: W,
    ) -> (Self, Receiver<InternalEvent>) {
        let (tx, rx) = mpsc::channel();
        let session = Self {
            engine: Engine::new(Vec::new()),
            service,
            token,
            user,
            logout_pending: false,
            tx,
            out,
            notification_ttl,
            status: None,
            status_token: 0,
            in_flight: 0,
        };
        (session, rx)
    }

    pub fn sender(&self) -> Sender<InternalEvent> {
        self.tx.clone()
    }

    #[cfg(test)]
    fn engine(&self) -> &Engine<Vec<Notification>> {
        &self.engine
    }

    #[cfg(test)]
    fn output(&self) -> &W {
        &self.out
    }

    #[cfg(test)]
    fn notice(&self) -> Option<&Notification> {
        self.status.as_ref()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn start(&mut self) -> Result<()> {
        let request = self.engine.refresh();
        self.dispatch_all(request);
        self.render_busy()
    }

    pub fn handle(&mut self, event: InternalEvent) -> Result<Flow> {
        match event {
            InternalEvent::Input(line) => self.handle_line(&line),
            InternalEvent::InputClosed => Ok(Flow::Quit),
            InternalEvent::Settled(settlement) => {
                self.on_settled(settlement)?;
                Ok(Flow::Continue)
            }
            InternalEvent::ClearStatus { token } => {
                if token == self.status_token {
                    self.status = None;
                }
                Ok(Flow::Continue)
            }
        }
    }

    pub fn handle_line(&mut self, line: &str) -> Result<Flow> {
        let command = match Command::parse(line) {
            Ok(Some(command)) => command,
            Ok(None) => return Ok(Flow::Continue),
            Err(error) => {
                writeln!(self.out, "error: {error:#}")?;
                return Ok(Flow::Continue);
            }
        };

        if std::mem::take(&mut self.logout_pending) {
            match command {
                Command::Confirm => {
                    writeln!(self.out, "logged out")?;
                    return Ok(Flow::Quit);
                }
                Command::Cancel => {
                    writeln!(self.out, "logout canceled")?;
                    return Ok(Flow::Continue);
                }
                _ => writeln!(self.out, "logout canceled")?,
            }
        }

        if let Some(target) = command.target()
            && self.engine.deselect_on_outside_interaction(target)
        {
            writeln!(self.out, "selection cleared")?;
        }

        match command {
            Command::List => self.render_list()?,
            Command::Refresh => {
                let request = self.engine.refresh();
                if request.is_none() {
                    writeln!(self.out, "refresh queued")?;
                }
                self.dispatch_all(request);
                self.render_busy()?;
            }
            Command::Click(index) => {
                let id = self.engine.snapshot().get(index).map(|record| record.id.clone());
                match id {
                    Some(id) => {
                        if self.engine.select_by_pointer(&id, index) == PointerSelect::Missing {
                            writeln!(self.out, "row {} is gone; run list", index + 1)?;
                        }
                        self.render_selection()?;
                    }
                    None => writeln!(self.out, "no row {}", index + 1)?,
                }
            }
            Command::Next => {
                self.engine.move_by_keyboard(Direction::Next);
                self.render_selection()?;
            }
            Command::Prev => {
                self.engine.move_by_keyboard(Direction::Prev);
                self.render_selection()?;
            }
            Command::Escape => {
                let confirming = self.engine.affordance().kind() == Some(MutationKind::Delete);
                self.engine.clear();
                if confirming {
                    writeln!(self.out, "delete canceled")?;
                }
                self.render_selection()?;
            }
            Command::Outside => {}
            Command::Add(edits) => {
                let submitted = self.engine.open_add().and_then(|()| {
                    let base = match self.engine.affordance() {
                        Affordance::Add { draft } => draft.clone(),
                        _ => RecordFields::default(),
                    };
                    self.engine.add(edits.apply_to(&base))
                });
                self.submitted(submitted, "adding record")?;
            }
            Command::Edit(edits) => {
                let submitted = self
                    .engine
                    .open_edit()
                    .and_then(|()| self.engine.edit(&edits));
                self.submitted(submitted, "saving record")?;
            }
            Command::Delete => match self.engine.request_delete() {
                Ok(()) => {
                    if let Affordance::ConfirmDelete { target } = self.engine.affordance() {
                        writeln!(
                            self.out,
                            "delete {} ({})? type `confirm` or `cancel`",
                            target.id, target.fields.document_name
                        )?;
                    }
                }
                Err(error) => self.unavailable(error)?,
            },
            Command::Confirm => {
                let submitted = self.engine.confirm_delete();
                self.submitted(submitted, "deleting record")?;
            }
            Command::Cancel => {
                if self.engine.cancel_delete() {
                    writeln!(self.out, "delete canceled")?;
                } else if self.engine.affordance().is_open() {
                    match self.engine.close_affordance() {
                        Ok(()) => writeln!(self.out, "form closed; draft discarded")?,
                        Err(error) => self.unavailable(error)?,
                    }
                } else {
                    writeln!(self.out, "nothing to cancel")?;
                }
            }
            Command::Status => {
                let rendered = self.render_status();
                write!(self.out, "{rendered}")?;
            }
            Command::Whoami => match &self.user {
                Some(user) => writeln!(self.out, "signed in as {user}")?,
                None => writeln!(self.out, "signed in with a preissued token")?,
            },
            Command::Logout => {
                let who = self.user.as_deref().unwrap_or("this session");
                writeln!(self.out, "log out of {who}? type `confirm` or `cancel`")?;
                self.logout_pending = true;
            }
            Command::Help => write!(self.out, "{}", help_text())?,
            Command::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    /// Processes events until nothing is in flight.
    #[cfg(test)]
    fn wait_idle(&mut self, rx: &Receiver<InternalEvent>) -> Result<()> {
        while self.in_flight > 0 {
            let event = rx
                .recv_timeout(IDLE_WAIT)
                .map_err(|error| anyhow!("waiting for the server: {error}"))?;
            self.handle(event)?;
        }
        Ok(())
    }

    fn submitted(
        &mut self,
        submitted: Result<Request, PreconditionError>,
        progress: &str,
    ) -> Result<()> {
        match submitted {
            Ok(request) => {
                self.dispatch(request);
                writeln!(self.out, "{progress}...")?;
                self.render_busy()
            }
            Err(error) => self.unavailable(error),
        }
    }

    fn unavailable(&mut self, error: PreconditionError) -> Result<()> {
        writeln!(self.out, "unavailable: {error}")?;
        Ok(())
    }

    fn on_settled(&mut self, settlement: Settlement) -> Result<()> {
        self.in_flight = self.in_flight.saturating_sub(1);
        let listed = matches!(settlement, Settlement::Listed { .. });
        let follow_up = self.engine.settle(settlement);
        for notification in std::mem::take(self.engine.sink_mut()) {
            self.emit_status(notification)?;
        }
        self.dispatch_all(follow_up);
        if listed && !self.engine.store().loading() {
            self.render_list()?;
        }
        Ok(())
    }

    fn dispatch_all(&mut self, requests: impl IntoIterator<Item = Request>) {
        for request in requests {
            self.dispatch(request);
        }
    }

    fn dispatch(&mut self, request: Request) {
        debug!(ticket = %request.ticket(), "dispatching request");
        self.in_flight += 1;
        let service = Arc::clone(&self.service);
        let token = self.token.clone();
        let tx = self.tx.clone();
        thread::spawn(move || {
            let settlement = request.execute(service.as_ref(), &token);
            let _ = tx.send(InternalEvent::Settled(settlement));
        });
    }

    fn emit_status(&mut self, notification: Notification) -> Result<()> {
        let marker = match notification.kind {
            NotificationKind::Success => "[ok]",
            NotificationKind::Failure => "[error]",
        };
        writeln!(self.out, "{marker} {}", notification.message)?;
        self.status = Some(notification);
        self.status_token = self.status_token.saturating_add(1);
        schedule_status_clear(&self.tx, self.status_token, self.notification_ttl);
        Ok(())
    }

    fn render_busy(&mut self) -> Result<()> {
        if self.engine.store().loading() {
            writeln!(self.out, "loading records...")?;
        }
        Ok(())
    }

    fn render_list(&mut self) -> Result<()> {
        match self.engine.store().status() {
            StoreStatus::Loading => writeln!(self.out, "loading records...")?,
            StoreStatus::Broken(error) => {
                writeln!(self.out, "records unavailable: {error} -- run `refresh`")?;
            }
            StoreStatus::Stale(error) => {
                writeln!(self.out, "refresh failed: {error}; showing previous rows")?;
                let table = render_table(self.engine.snapshot(), self.selected_index());
                write!(self.out, "{table}")?;
            }
            StoreStatus::NotLoaded | StoreStatus::Ready => {
                let table = render_table(self.engine.snapshot(), self.selected_index());
                write!(self.out, "{table}")?;
            }
        }
        Ok(())
    }

    fn render_selection(&mut self) -> Result<()> {
        match self.engine.selected_record() {
            Some(record) => {
                let row = self.selected_index().map_or(0, |index| index + 1);
                writeln!(
                    self.out,
                    "selected row {row}: {} ({})",
                    record.id, record.fields.document_name
                )?;
            }
            None => writeln!(self.out, "no selection")?,
        }
        Ok(())
    }

    fn selected_index(&self) -> Option<usize> {
        self.engine.selection().map(|selection| selection.index)
    }

    fn render_status(&self) -> String {
        let store = self.engine.store();
        let mut lines = Vec::new();
        lines.push(match store.status() {
            StoreStatus::NotLoaded => "records: not loaded".to_owned(),
            StoreStatus::Loading => "records: loading".to_owned(),
            StoreStatus::Ready => format!("records: {} rows", self.engine.snapshot().len()),
            StoreStatus::Stale(error) => format!(
                "records: {} rows (stale: {error})",
                self.engine.snapshot().len()
            ),
            StoreStatus::Broken(error) => format!("records: unavailable ({error})"),
        });
        lines.push(match self.engine.selected_record() {
            Some(record) => format!(
                "selection: row {} ({})",
                self.selected_index().map_or(0, |index| index + 1),
                record.id
            ),
            None => "selection: none".to_owned(),
        });
        lines.push(match self.engine.affordance() {
            Affordance::Closed => "form: none".to_owned(),
            Affordance::Add { .. } => "form: add".to_owned(),
            Affordance::Edit { target, .. } => format!("form: edit {}", target.id),
            Affordance::ConfirmDelete { target } => format!("form: confirm delete {}", target.id),
        });
        if self.engine.busy() {
            lines.push("busy: waiting for the server".to_owned());
        }
        let controls = self.engine.controls();
        let enabled = [
            ("add", controls.add),
            ("edit", controls.edit),
            ("delete", controls.delete),
            ("refresh", controls.refresh),
        ]
        .into_iter()
        .filter(|(_, on)| *on)
        .map(|(name, _)| name)
        .collect::<Vec<_>>();
        lines.push(format!("actions: {}", enabled.join(" ")));
        if let Some(notice) = &self.status {
            lines.push(format!("notice: {}", notice.message));
        }
        let mut rendered = lines.join("\n");
        rendered.push('\n');
        rendered
    }
}

/// Reads stdin on a background thread until EOF.
pub fn run<S>(
    service: Arc<S>,
    token: AuthToken,
    user: Option<String>,
    notification_ttl: Duration,
) -> Result<()>
where
    S: RecordService + Send + Sync + ?Sized + 'static,
{
    let (mut session, rx) = Session::new(
        service,
        token,
        user,
        notification_ttl,
        io::stdout().lock(),
    );
    spawn_input_reader(session.sender());
    session.start()?;

    let mut quitting = false;
    while let Ok(event) = rx.recv() {
        if quitting && matches!(event, InternalEvent::Input(_)) {
            continue;
        }
        if session.handle(event)? == Flow::Quit {
            quitting = true;
        }
        if quitting && session.in_flight() == 0 {
            break;
        }
        session.out.flush()?;
    }
    session.out.flush()?;
    Ok(())
}

fn spawn_input_reader(tx: Sender<InternalEvent>) {
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else {
                break;
            };
            if tx.send(InternalEvent::Input(line)).is_err() {
                return;
            }
        }
        let _ = tx.send(InternalEvent::InputClosed);
    });
}

fn schedule_status_clear(tx: &Sender<InternalEvent>, token: u64, ttl: Duration) {
    let sender = tx.clone();
    thread::spawn(move || {
        thread::sleep(ttl);
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

/// `YYYY-MM-DD` for RFC 3339 timestamps; anything else is shown as-is.
pub fn short_date(raw: &str) -> String {
    OffsetDateTime::parse(raw, &Rfc3339)
        .ok()
        .and_then(|moment| moment.format(format_description!("[year]-[month]-[day]")).ok())
        .unwrap_or_else(|| raw.to_owned())
}

pub fn render_table(snapshot: &Snapshot, selected: Option<usize>) -> String {
    if snapshot.is_empty() {
        return "no records\n".to_owned();
    }

    let mut rows: Vec<Vec<String>> = Vec::with_capacity(snapshot.len() + 1);
    let mut header = vec![String::new(), "#".to_owned(), "id".to_owned()];
    header.extend(FieldName::ALL.iter().map(|field| field.label().to_owned()));
    rows.push(header);

    for (index, record) in snapshot.records().iter().enumerate() {
        let marker = if selected == Some(index) { ">" } else { "" };
        let mut row = vec![
            marker.to_owned(),
            (index + 1).to_string(),
            record.id.to_string(),
        ];
        row.extend(FieldName::ALL.iter().map(|field| {
            let value = record.fields.get(*field);
            if field.is_date_time() {
                short_date(value)
            } else {
                value.to_owned()
            }
        }));
        rows.push(row);
    }

    let columns = rows[0].len();
    let widths: Vec<usize> = (0..columns)
        .map(|column| {
            rows.iter()
                .map(|row| row[column].chars().count())
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut rendered = String::new();
    for row in rows {
        let line = row
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join("  ");
        rendered.push_str(line.trim_end());
        rendered.push('\n');
    }
    rendered
}

fn help_text() -> &'static str {
    concat!(
        "commands:\n",
        "  list                      show the records\n",
        "  refresh                   reload from the server\n",
        "  click <row>               select a row (numbered from 1)\n",
        "  next | j, prev | k        move the selection\n",
        "  esc                       clear the selection\n",
        "  outside                   click outside the list\n",
        "  add field=value ...       create a record\n",
        "  edit field=value ...      change the selected record\n",
        "  delete                    ask to delete the selected record\n",
        "  confirm | cancel          answer the open prompt\n",
        "  status                    show loading, selection, and form state\n",
        "  whoami                    show the signed-in user\n",
        "  logout                    end the session (asks to confirm)\n",
        "  quit\n",
        "fields: companySigDate companySignatureName documentName documentStatus\n",
        "        documentType employeeNumber employeeSigDate employeeSignatureName\n",
    )
}
