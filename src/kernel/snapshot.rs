//! KB snapshots for save/load.
//!
//! A snapshot lists every entry after the built-ins in arena order, so
//! replaying it into a fresh kernel reproduces the same references.

use std::io::{Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::{KernelFault, KernelResult};
use super::{Axiom, Construct};
use crate::config::PropertyNames;
use crate::entity::EntityKind;

const FORMAT_VERSION: u32 = 1;

/// On-disk encoding of a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotFormat {
    /// Pretty-printed JSON, editable by hand.
    Json,
    /// Compact bincode.
    Binary,
}

impl SnapshotFormat {
    /// JSON for `.json` paths, binary otherwise.
    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Binary,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum SnapshotEntry {
    Named { kind: EntityKind, name: String },
    Construct(Construct),
    Axiom(Axiom),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct Snapshot {
    pub format_version: u32,
    pub property_names: PropertyNames,
    pub entries: Vec<SnapshotEntry>,
}

impl Snapshot {
    pub fn new(property_names: PropertyNames, entries: Vec<SnapshotEntry>) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            property_names,
            entries,
        }
    }

    pub fn check_version(&self) -> KernelResult<()> {
        if self.format_version != FORMAT_VERSION {
            return Err(KernelFault::SaveLoad {
                message: format!(
                    "unsupported snapshot format version {} (expected {FORMAT_VERSION})",
                    self.format_version
                ),
            });
        }
        Ok(())
    }
}

pub(crate) fn write(out: &mut dyn Write, format: SnapshotFormat, snapshot: &Snapshot) -> KernelResult<()> {
    let result = match format {
        SnapshotFormat::Json => serde_json::to_writer_pretty(&mut *out, snapshot).map_err(|e| e.to_string()),
        SnapshotFormat::Binary => bincode::serialize_into(&mut *out, snapshot).map_err(|e| e.to_string()),
    };
    result
        .and_then(|()| out.flush().map_err(|e| e.to_string()))
        .map_err(|message| KernelFault::SaveLoad { message })
}

pub(crate) fn read(input: &mut dyn Read, format: SnapshotFormat) -> KernelResult<Snapshot> {
    let result = match format {
        SnapshotFormat::Json => serde_json::from_reader(input).map_err(|e| e.to_string()),
        SnapshotFormat::Binary => bincode::deserialize_from(input).map_err(|e| e.to_string()),
    };
    result.map_err(|message| KernelFault::SaveLoad { message })
}
