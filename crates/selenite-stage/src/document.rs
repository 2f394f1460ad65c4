//! Legacy metadata documents.
//!
//! Every legacy object is described by a JSON document stored at
//! `<path>.json` under the staging root, where `path` is the document's own
//! `path` field. Three fields are required on every document: `$schema`,
//! `path`, and `is_child`. Parents reference nested children through
//! `resource.path` fields anywhere inside the document body.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value as Json;

use crate::error::{StageError, StageResult};

/// Schema prefix marking alias documents.
pub const REDIRECTION_PREFIX: &str = "redirection/";

/// A parsed legacy metadata document plus where it came from.
#[derive(Clone, Debug)]
pub struct MetadataDocument {
    file: PathBuf,
    body: Json,
}

impl MetadataDocument {
    /// Parse a document body, checking the required fields.
    ///
    /// `file` is the document's on-disk location, kept for error messages
    /// and write-back.
    pub fn parse(file: &Path, body: Json) -> StageResult<Self> {
        let doc = Self {
            file: file.to_path_buf(),
            body,
        };
        if !doc.body.is_object() {
            return Err(doc.bad("document body is not a JSON object"));
        }
        if doc.body.get("$schema").and_then(Json::as_str).is_none() {
            return Err(doc.bad("missing or non-string '$schema'"));
        }
        let Some(path) = doc.body.get("path").and_then(Json::as_str) else {
            return Err(doc.bad("missing or non-string 'path'"));
        };
        if path.contains('\\') {
            return Err(doc.bad("'path' uses Windows-style separators"));
        }
        if doc.body.get("is_child").and_then(Json::as_bool).is_none() {
            return Err(doc.bad("missing or non-boolean 'is_child'"));
        }
        for child in doc.child_references() {
            if child.contains('\\') {
                return Err(doc.bad(format!(
                    "'resource.path' value '{child}' uses Windows-style separators"
                )));
            }
        }
        Ok(doc)
    }

    /// Load and parse the document at `file`.
    pub fn from_file(file: &Path) -> StageResult<Self> {
        let raw = fs::read_to_string(file)?;
        let body: Json = serde_json::from_str(&raw)?;
        Self::parse(file, body)
    }

    /// Write the document back to its file, pretty-printed.
    pub fn write(&self) -> StageResult<()> {
        fs::write(&self.file, serde_json::to_string_pretty(&self.body)?)?;
        Ok(())
    }

    fn bad(&self, reason: impl Into<String>) -> StageError {
        StageError::BadDocument {
            path: self.file.clone(),
            reason: reason.into(),
        }
    }

    /// The document's on-disk location.
    pub fn file(&self) -> &Path {
        &self.file
    }

    /// The full JSON body.
    pub fn body(&self) -> &Json {
        &self.body
    }

    pub fn schema(&self) -> &str {
        self.body
            .get("$schema")
            .and_then(Json::as_str)
            .unwrap_or_default()
    }

    /// The logical path this document describes, relative to the staging
    /// root.
    pub fn path(&self) -> &str {
        self.body
            .get("path")
            .and_then(Json::as_str)
            .unwrap_or_default()
    }

    pub fn is_child(&self) -> bool {
        self.body
            .get("is_child")
            .and_then(Json::as_bool)
            .unwrap_or(false)
    }

    pub fn is_redirection(&self) -> bool {
        self.schema().starts_with(REDIRECTION_PREFIX)
    }

    /// Target locations of a redirection document, in declared order.
    ///
    /// Only `local` targets are supported; anything else is a bad document.
    pub fn redirection_targets(&self) -> StageResult<Vec<String>> {
        let Some(targets) = self.body.get("targets").and_then(Json::as_array) else {
            return Err(self.bad("redirection without a 'targets' array"));
        };
        let mut out = Vec::with_capacity(targets.len());
        for target in targets {
            let kind = target.get("type").and_then(Json::as_str);
            if kind != Some("local") {
                return Err(self.bad(format!(
                    "unsupported redirection target type {:?}",
                    kind.unwrap_or("<missing>")
                )));
            }
            let Some(location) = target.get("location").and_then(Json::as_str) else {
                return Err(self.bad("redirection target without a 'location'"));
            };
            out.push(location.to_string());
        }
        Ok(out)
    }

    /// Every nested `resource.path` reference, in document order.
    pub fn child_references(&self) -> Vec<String> {
        let mut out = Vec::new();
        collect_refs(&self.body, &mut out);
        out
    }

    /// Rewrite the document's `path` and every nested `resource.path` whose
    /// value falls under `from`, replacing that prefix with `to`. Returns
    /// whether anything changed.
    pub fn rewrite_path_prefix(&mut self, from: &str, to: &str) -> bool {
        let mut changed = false;
        if let Some(Json::String(path)) = self.body.get_mut("path") {
            if let Some(rewritten) = swap_prefix(path, from, to) {
                *path = rewritten;
                changed = true;
            }
        }
        changed |= rewrite_refs(&mut self.body, from, to);
        changed
    }

    /// Point the document at a new file location (used after a rename).
    pub fn set_file(&mut self, file: PathBuf) {
        self.file = file;
    }

    /// Replace the document's own `path` field.
    pub fn set_path(&mut self, path: &str) {
        if let Some(map) = self.body.as_object_mut() {
            map.insert("path".to_string(), Json::String(path.to_string()));
        }
    }

    /// Replace a redirection target location where it falls under `from`.
    /// Returns whether anything changed.
    pub fn retarget_redirection(&mut self, from: &str, to: &str) -> bool {
        let Some(targets) = self.body.get_mut("targets").and_then(Json::as_array_mut) else {
            return false;
        };
        let mut changed = false;
        for target in targets {
            if let Some(Json::String(location)) = target.get_mut("location") {
                if let Some(rewritten) = swap_prefix(location, from, to) {
                    *location = rewritten;
                    changed = true;
                }
            }
        }
        changed
    }

    /// Drop redirection targets falling under `prefix`; returns how many
    /// targets survive.
    pub fn prune_redirection_targets(&mut self, prefix: &str) -> usize {
        let Some(targets) = self.body.get_mut("targets").and_then(Json::as_array_mut) else {
            return 0;
        };
        targets.retain(|target| {
            let location = target.get("location").and_then(Json::as_str).unwrap_or("");
            swap_prefix(location, prefix, "").is_none()
        });
        targets.len()
    }
}

/// `Some(rewritten)` when `path` equals `from` or sits beneath it.
pub(crate) fn swap_prefix(path: &str, from: &str, to: &str) -> Option<String> {
    if path == from {
        return Some(to.to_string());
    }
    let rest = path.strip_prefix(from)?;
    let rest = rest.strip_prefix('/')?;
    Some(format!("{to}/{rest}"))
}

fn collect_refs(value: &Json, out: &mut Vec<String>) {
    match value {
        Json::Object(map) => {
            if let Some(path) = map
                .get("resource")
                .and_then(|r| r.get("path"))
                .and_then(Json::as_str)
            {
                out.push(path.to_string());
            }
            for nested in map.values() {
                collect_refs(nested, out);
            }
        }
        Json::Array(items) => {
            for item in items {
                collect_refs(item, out);
            }
        }
        _ => {}
    }
}

fn rewrite_refs(value: &mut Json, from: &str, to: &str) -> bool {
    let mut changed = false;
    match value {
        Json::Object(map) => {
            if let Some(Json::String(path)) = map
                .get_mut("resource")
                .and_then(|r| r.get_mut("path"))
            {
                if let Some(rewritten) = swap_prefix(path, from, to) {
                    *path = rewritten;
                    changed = true;
                }
            }
            for nested in map.values_mut() {
                changed |= rewrite_refs(nested, from, to);
            }
        }
        Json::Array(items) => {
            for item in items {
                changed |= rewrite_refs(item, from, to);
            }
        }
        _ => {}
    }
    changed
}
