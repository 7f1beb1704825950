//! The enrollment store: identities and their templates, loaded once.
//!
//! The store is a JSON array of `{name, template}` records on disk. It is
//! read exactly once at process start and the resulting [`EnrollmentSet`]
//! is immutable for its lifetime — the matcher borrows it, nothing mutates
//! it, and no session can add or remove an identity. Enrollment itself
//! (capturing templates) is a separate offline process.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::template::Template;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors loading or validating the enrollment store.
#[derive(Debug, Error)]
pub enum EnrollmentError {
    /// The store file could not be read.
    #[error("failed to read enrollment store: {0}")]
    Io(#[from] std::io::Error),

    /// The store file is not valid JSON of the expected shape. This covers
    /// wrong-length templates too — the `Template` deserializer enforces
    /// the dimensionality.
    #[error("failed to parse enrollment store: {0}")]
    Parse(#[from] serde_json::Error),

    /// Two records share a name. Identities must be unique or a match
    /// result would be meaningless.
    #[error("duplicate enrollment name: {0}")]
    DuplicateName(String),

    /// A record has an empty name.
    #[error("enrollment record with empty name")]
    EmptyName,
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One enrolled identity: a name and its template. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrollmentRecord {
    /// Identity label, unique within the set.
    pub name: String,
    /// The identity's feature vector.
    pub template: Template,
}

/// The full set of enrolled identities.
///
/// Owned exclusively by whoever constructed it (in practice, the process
/// context) and handed to the matcher by shared reference. There is no
/// mutating API on purpose — invariant (iv): the enrollment set is
/// read-only during matching.
#[derive(Debug, Clone)]
pub struct EnrollmentSet {
    records: Vec<EnrollmentRecord>,
}

impl EnrollmentSet {
    /// Builds a set from records, validating name uniqueness.
    pub fn new(records: Vec<EnrollmentRecord>) -> Result<Self, EnrollmentError> {
        let mut seen = HashSet::new();
        for record in &records {
            if record.name.is_empty() {
                return Err(EnrollmentError::EmptyName);
            }
            if !seen.insert(record.name.clone()) {
                return Err(EnrollmentError::DuplicateName(record.name.clone()));
            }
        }
        Ok(Self { records })
    }

    /// Loads the set from a JSON store file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, EnrollmentError> {
        let raw = std::fs::read_to_string(path)?;
        let records: Vec<EnrollmentRecord> = serde_json::from_str(&raw)?;
        let set = Self::new(records)?;
        tracing::info!(identities = set.len(), "enrollment store loaded");
        Ok(set)
    }

    /// The enrolled records, in store order.
    pub fn records(&self) -> &[EnrollmentRecord] {
        &self.records
    }

    /// Number of enrolled identities.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// `true` if nobody is enrolled. A legal (if useless) state: every
    /// match attempt against an empty set is a no-match.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
