// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Deserializer, Serialize};
use std::sync::Arc;

use crate::ids::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FieldName {
    CompanySigDate,
    CompanySignatureName,
    DocumentName,
    DocumentStatus,
    DocumentType,
    EmployeeNumber,
    EmployeeSigDate,
    EmployeeSignatureName,
}

impl FieldName {
    pub const ALL: [Self; 8] = [
        Self::CompanySigDate,
        Self::CompanySignatureName,
        Self::DocumentName,
        Self::DocumentStatus,
        Self::DocumentType,
        Self::EmployeeNumber,
        Self::EmployeeSigDate,
        Self::EmployeeSignatureName,
    ];

    /// Wire name used by the remote service.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CompanySigDate => "companySigDate",
            Self::CompanySignatureName => "companySignatureName",
            Self::DocumentName => "documentName",
            Self::DocumentStatus => "documentStatus",
            Self::DocumentType => "documentType",
            Self::EmployeeNumber => "employeeNumber",
            Self::EmployeeSigDate => "employeeSigDate",
            Self::EmployeeSignatureName => "employeeSignatureName",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|field| field.as_str().eq_ignore_ascii_case(value))
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::CompanySigDate => "company sig date",
            Self::CompanySignatureName => "company signature",
            Self::DocumentName => "document",
            Self::DocumentStatus => "status",
            Self::DocumentType => "type",
            Self::EmployeeNumber => "employee #",
            Self::EmployeeSigDate => "employee sig date",
            Self::EmployeeSignatureName => "employee signature",
        }
    }

    pub const fn is_date_time(self) -> bool {
        matches!(self, Self::CompanySigDate | Self::EmployeeSigDate)
    }
}

/// The full scalar field set of a record, minus its id.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecordFields {
    #[serde(deserialize_with = "nullable_string")]
    pub company_sig_date: String,
    #[serde(deserialize_with = "nullable_string")]
    pub company_signature_name: String,
    #[serde(deserialize_with = "nullable_string")]
    pub document_name: String,
    #[serde(deserialize_with = "nullable_string")]
    pub document_status: String,
    #[serde(deserialize_with = "nullable_string")]
    pub document_type: String,
    #[serde(deserialize_with = "nullable_string")]
    pub employee_number: String,
    #[serde(deserialize_with = "nullable_string")]
    pub employee_sig_date: String,
    #[serde(deserialize_with = "nullable_string")]
    pub employee_signature_name: String,
}

impl RecordFields {
    pub fn get(&self, field: FieldName) -> &str {
        match field {
            FieldName::CompanySigDate => &self.company_sig_date,
            FieldName::CompanySignatureName => &self.company_signature_name,
            FieldName::DocumentName => &self.document_name,
            FieldName::DocumentStatus => &self.document_status,
            FieldName::DocumentType => &self.document_type,
            FieldName::EmployeeNumber => &self.employee_number,
            FieldName::EmployeeSigDate => &self.employee_sig_date,
            FieldName::EmployeeSignatureName => &self.employee_signature_name,
        }
    }

    pub fn set(&mut self, field: FieldName, value: impl Into<String>) {
        let slot = match field {
            FieldName::CompanySigDate => &mut self.company_sig_date,
            FieldName::CompanySignatureName => &mut self.company_signature_name,
            FieldName::DocumentName => &mut self.document_name,
            FieldName::DocumentStatus => &mut self.document_status,
            FieldName::DocumentType => &mut self.document_type,
            FieldName::EmployeeNumber => &mut self.employee_number,
            FieldName::EmployeeSigDate => &mut self.employee_sig_date,
            FieldName::EmployeeSignatureName => &mut self.employee_signature_name,
        };
        *slot = value.into();
    }

    pub fn with(mut self, field: FieldName, value: impl Into<String>) -> Self {
        self.set(field, value);
        self
    }
}

fn nullable_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    #[serde(flatten)]
    pub fields: RecordFields,
}

impl Record {
    pub fn new(id: impl Into<RecordId>, fields: RecordFields) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }
}

/// One immutable, fully-loaded record list. Cloning shares the rows.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Snapshot {
    records: Arc<[Record]>,
    generation: u64,
}

impl Snapshot {
    pub(crate) fn new(records: Vec<Record>, generation: u64) -> Self {
        Self {
            records: records.into(),
            generation,
        }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Record> {
        self.records.get(index)
    }

    pub fn position(&self, id: &RecordId) -> Option<usize> {
        self.records.iter().position(|record| &record.id == id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MutationKind {
    Add,
    Edit,
    Delete,
}

impl MutationKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Edit => "edit",
            Self::Delete => "delete",
        }
    }

    pub const fn past_tense(self) -> &'static str {
        match self {
            Self::Add => "added",
            Self::Edit => "updated",
            Self::Delete => "deleted",
        }
    }
}

impl std::fmt::Display for MutationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationKind {
    Success,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub message: String,
    pub kind: NotificationKind,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: NotificationKind::Success,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: NotificationKind::Failure,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Prev,
}

/// Controls on the record list's own action bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionControl {
    Add,
    Edit,
    Delete,
    Refresh,
}

/// Where a pointer interaction landed, as reported by presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionTarget {
    RecordList,
    ActionBar(ActionControl),
    Affordance,
    Outside,
}
