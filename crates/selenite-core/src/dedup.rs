//! Duplicate-elimination sessions for save runs.
//!
//! A session remembers every value saved while it is active. When a later
//! save presents a structurally-equal value of the same runtime type, the
//! saver skips the handler entirely and clones the earlier directory
//! instead. Detection insertion order makes hits deterministic: the first
//! recorded equal value always wins.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use selenite_types::Value;

use crate::error::CoreResult;
use crate::fsutil::absolutize;

/// One deduplication scope, shared across the save calls of a batch.
///
/// Values are bucketed by runtime type tag so equality checks only ever run
/// within a type. Recorded paths are absolutized at record time, which keeps
/// them valid if the working directory changes mid-batch.
#[derive(Default)]
pub struct DedupSession {
    buckets: HashMap<String, Vec<(Value, PathBuf)>>,
}

impl DedupSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// A session behind the shared handle save options expect.
    pub fn shared() -> Arc<Mutex<DedupSession>> {
        Arc::new(Mutex::new(Self::new()))
    }

    /// The directory of the first recorded value structurally equal to
    /// `value`, if any.
    pub fn check(&self, value: &Value) -> Option<&Path> {
        self.buckets
            .get(value.type_tag())?
            .iter()
            .find(|(candidate, _)| candidate == value)
            .map(|(_, path)| path.as_path())
    }

    /// Record a freshly saved value and where it went.
    pub fn record(&mut self, value: &Value, path: &Path) -> CoreResult<()> {
        let absolute = absolutize(path)?;
        self.buckets
            .entry(value.type_tag().to_string())
            .or_default()
            .push((value.clone(), absolute));
        Ok(())
    }

    /// Total values recorded so far.
    pub fn candidate_count(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}
