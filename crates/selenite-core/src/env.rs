//! Provenance snapshots written beside top-level objects.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CoreResult;

/// Schema version of the snapshot file.
pub const SNAPSHOT_VERSION: u32 = 1;

/// A record of who wrote an object tree and where.
///
/// Written as `_environment.json` in the top-level object directory only;
/// nested children share the parent's provenance. The file is informational
/// and never consulted when reading values back.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentSnapshot {
    pub version: u32,
    /// Writing library name.
    pub writer: String,
    /// Writing library version.
    pub writer_version: String,
    /// Operating system family, e.g. `linux`.
    pub os: String,
    /// CPU architecture, e.g. `x86_64`.
    pub arch: String,
    /// RFC3339 capture time, UTC.
    pub captured_at: String,
}

impl EnvironmentSnapshot {
    /// Capture the current process environment.
    pub fn capture() -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            writer: "selenite".to_string(),
            writer_version: env!("CARGO_PKG_VERSION").to_string(),
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            captured_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Write the snapshot as pretty-printed JSON.
    pub fn write(&self, path: &Path) -> CoreResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Read a snapshot back.
    pub fn read(path: &Path) -> CoreResult<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}
