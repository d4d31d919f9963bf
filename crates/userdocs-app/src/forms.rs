// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow, bail};
use std::collections::BTreeMap;

use crate::{FieldName, RecordFields};

const MIN_PASSWORD_LEN: usize = 6;

/// The fields a user changed in an edit form. Everything else is carried over
/// from the record being edited.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FieldEdits {
    changed: BTreeMap<FieldName, String>,
}

impl FieldEdits {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, field: FieldName, value: impl Into<String>) -> Self {
        self.changed.insert(field, value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.changed.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changed.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FieldName, &str)> {
        self.changed
            .iter()
            .map(|(field, value)| (*field, value.as_str()))
    }

    /// Full field set to submit: `base` with the changed fields applied.
    pub fn apply_to(&self, base: &RecordFields) -> RecordFields {
        let mut merged = base.clone();
        for (field, value) in &self.changed {
            merged.set(*field, value.clone());
        }
        merged
    }

    /// Parses `field=value` words. Values may be empty; field names use the
    /// wire spelling, case-insensitively.
    pub fn parse_assignments<I, S>(words: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut edits = Self::new();
        for word in words {
            let (field, value) = parse_assignment(word.as_ref())?;
            edits.changed.insert(field, value);
        }
        Ok(edits)
    }
}

fn parse_assignment(word: &str) -> Result<(FieldName, String)> {
    let (name, value) = word
        .split_once('=')
        .ok_or_else(|| anyhow!("expected field=value, got {word:?}"))?;
    let field = FieldName::parse(name.trim()).ok_or_else(|| {
        let known = FieldName::ALL
            .iter()
            .map(|field| field.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        anyhow!("unknown field {name:?} -- use one of: {known}")
    })?;
    Ok((field, value.to_owned()))
}

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    pub fn validate(&self) -> Result<()> {
        let digits = self.username.strip_prefix("user").unwrap_or_default();
        if digits.is_empty() || !digits.chars().all(|ch| ch.is_ascii_digit()) {
            bail!(
                "username must look like user<N> (for example user1), got {:?}",
                self.username
            );
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            bail!("password must be at least {MIN_PASSWORD_LEN} characters");
        }
        Ok(())
    }
}
