//! JSON-file persistence of records.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::model::{self, ModelKind, Record};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown record kind: {tag}")]
    UnknownKind { tag: String },
    #[error("bad timestamp {field}: {value}")]
    InvalidTimestamp { field: String, value: String },
}

/// Wire form of one record in the backing file: the kind tag, identity
/// columns and all remaining fields flattened beside them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreRecord {
    #[serde(rename = "__class__")]
    pub class: String,
    pub id: String,
    pub created_at: String,
    pub updated_at: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl StoreRecord {
    pub fn from_record(record: &Record) -> StoreRecord {
        StoreRecord {
            class: record.kind.tag().to_string(),
            id: record.id.clone(),
            created_at: model::format_timestamp(record.created_at),
            updated_at: model::format_timestamp(record.updated_at),
            fields: record
                .fields
                .iter()
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect(),
        }
    }

    /// Rebuilds a live record: schema defaults first, stored fields on top.
    pub fn hydrate(&self) -> Result<Record, StoreError> {
        let kind = ModelKind::from_tag(&self.class).ok_or_else(|| StoreError::UnknownKind {
            tag: self.class.clone(),
        })?;
        let mut fields: BTreeMap<String, Value> = kind
            .default_fields()
            .into_iter()
            .map(|(name, value)| (name.to_string(), value))
            .collect();
        for (name, value) in &self.fields {
            fields.insert(name.clone(), value.clone());
        }
        Ok(Record {
            kind,
            id: self.id.clone(),
            created_at: parse_stamp("created_at", &self.created_at)?,
            updated_at: parse_stamp("updated_at", &self.updated_at)?,
            fields,
        })
    }
}

fn parse_stamp(field: &str, value: &str) -> Result<NaiveDateTime, StoreError> {
    model::parse_timestamp(value).ok_or_else(|| StoreError::InvalidTimestamp {
        field: field.to_string(),
        value: value.to_string(),
    })
}

/// File-backed store of records, keyed `<Kind>.<id>`.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    objects: BTreeMap<String, StoreRecord>,
}

impl FileStore {
    /// Creates a store over `path` without touching the file system.
    pub fn new(path: impl Into<PathBuf>) -> FileStore {
        FileStore {
            path: path.into(),
            objects: BTreeMap::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The raw store records, in key order.
    pub fn records(&self) -> &BTreeMap<String, StoreRecord> {
        &self.objects
    }

    /// Puts the record in the store under its key. Nothing reaches the
    /// file until [`FileStore::persist`] runs.
    pub fn register(&mut self, record: &Record) {
        self.objects
            .insert(record.key(), StoreRecord::from_record(record));
    }

    /// Removes the record under `key`; returns whether it was present.
    pub fn delete(&mut self, key: &str) -> bool {
        self.objects.remove(key).is_some()
    }

    /// Serializes every store record to the backing file. The JSON goes
    /// to a sibling temporary file first and is moved over the target, so
    /// readers never observe a half-written store.
    pub fn persist(&self) -> Result<(), StoreError> {
        let serialized = serde_json::to_string_pretty(&self.objects)?;
        let staging = self.path.with_extension("tmp");
        fs::write(&staging, serialized)?;
        fs::rename(&staging, &self.path)?;
        debug!(path = %self.path.display(), records = self.objects.len(), "store persisted");
        Ok(())
    }

    /// Replaces the in-memory records with the backing file's content.
    /// A missing file leaves the store unchanged.
    pub fn reload(&mut self) -> Result<(), StoreError> {
        if !self.path.exists() {
            return Ok(());
        }
        let serialized = fs::read_to_string(&self.path)?;
        self.objects = serde_json::from_str(&serialized)?;
        Ok(())
    }

    /// Reloads, then rebuilds a live record from every store record.
    pub fn all(&mut self) -> Result<BTreeMap<String, Record>, StoreError> {
        self.reload()?;
        let mut records = BTreeMap::new();
        for (key, stored) in &self.objects {
            records.insert(key.clone(), stored.hydrate()?);
        }
        Ok(records)
    }
}
