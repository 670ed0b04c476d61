//! Payload classification and archive unpacking.
//!
//! A payload is either a bare GTFS-RT protobuf or a ZIP bundle holding one
//! buffer per sub-feed. Which archive members count as feed buffers is decided
//! by an [`EntryFilter`], since publishers name their members differently.

use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;

use bytes::Bytes;
use tracing::{debug, info};

use crate::error::{PipelineError, Result};

/// Local-file-header signature that opens every ZIP archive.
pub const ZIP_MAGIC: [u8; 4] = [0x50, 0x4B, 0x03, 0x04];

/// Name given to a payload that is not an archive.
pub const SINGLE_FEED_NAME: &str = "feed.pb";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    Feed,
    Archive,
}

/// Classifies a payload from its leading bytes.
pub fn classify(magic: &[u8]) -> PayloadKind {
    if magic.len() >= ZIP_MAGIC.len() && magic[..ZIP_MAGIC.len()] == ZIP_MAGIC {
        PayloadKind::Archive
    } else {
        PayloadKind::Feed
    }
}

/// A decoded-to-be buffer and the name it was found under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedBuffer {
    pub name: String,
    pub bytes: Bytes,
}

/// Decides whether an archive member holds a feed.
pub trait EntryFilter {
    fn accepts(&self, name: &str) -> bool;
}

impl<F> EntryFilter for F
where
    F: Fn(&str) -> bool,
{
    fn accepts(&self, name: &str) -> bool {
        self(name)
    }
}

/// Matches member names by suffix or by keyword, case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamePatterns {
    pub extensions: Vec<String>,
    pub keywords: Vec<String>,
}

impl Default for NamePatterns {
    fn default() -> Self {
        Self {
            extensions: vec![".pb".into(), ".bin".into(), ".protobuf".into()],
            keywords: vec!["gtfsrt".into()],
        }
    }
}

impl EntryFilter for NamePatterns {
    fn accepts(&self, name: &str) -> bool {
        let lower = name.to_lowercase();
        self.extensions
            .iter()
            .any(|ext| lower.ends_with(&ext.to_lowercase()))
            || self
                .keywords
                .iter()
                .any(|kw| lower.contains(&kw.to_lowercase()))
    }
}

/// Reads up to the first four bytes of the file at `path`.
pub fn read_magic(path: &Path) -> Result<Vec<u8>> {
    let file = File::open(path)?;
    let mut magic = Vec::with_capacity(ZIP_MAGIC.len());
    file.take(ZIP_MAGIC.len() as u64).read_to_end(&mut magic)?;
    Ok(magic)
}

/// Turns the payload stored at `path` into the list of feed buffers.
///
/// Archives are unpacked through `filter`; any other payload becomes a single
/// buffer named [`SINGLE_FEED_NAME`].
pub fn unpack_payload<F>(path: &Path, filter: &F, max_uncompressed: u64) -> Result<Vec<NamedBuffer>>
where
    F: EntryFilter + ?Sized,
{
    match classify(&read_magic(path)?) {
        PayloadKind::Archive => {
            info!("Extracting ZIP");
            unpack_archive(File::open(path)?, filter, max_uncompressed)
        }
        PayloadKind::Feed => {
            let bytes = std::fs::read(path)?;
            debug!(bytes = bytes.len(), "Payload is a bare feed");
            Ok(vec![NamedBuffer {
                name: SINGLE_FEED_NAME.to_string(),
                bytes: Bytes::from(bytes),
            }])
        }
    }
}

/// Selects and reads the feed members of a ZIP archive, in archive order.
///
/// # Errors
///
/// [`PipelineError::ArchiveFormat`] if the archive is unreadable, holds no
/// member accepted by `filter`, or the selected members would inflate past
/// `max_uncompressed` bytes.
pub fn unpack_archive<R, F>(reader: R, filter: &F, max_uncompressed: u64) -> Result<Vec<NamedBuffer>>
where
    R: Read + Seek,
    F: EntryFilter + ?Sized,
{
    let mut archive = zip::ZipArchive::new(reader)?;

    let mut selected = Vec::new();
    let mut total_uncompressed: u64 = 0;
    for i in 0..archive.len() {
        let entry = archive.by_index(i)?;
        if entry.is_dir() {
            continue;
        }
        if !filter.accepts(entry.name()) {
            debug!(entry = entry.name(), "Skipping archive member");
            continue;
        }
        total_uncompressed = total_uncompressed.saturating_add(entry.size());
        selected.push(i);
    }

    if selected.is_empty() {
        return Err(PipelineError::ArchiveFormat(
            "ZIP missing expected .pb files".into(),
        ));
    }

    if total_uncompressed > max_uncompressed {
        return Err(PipelineError::ArchiveFormat(format!(
            "selected members inflate to {total_uncompressed} bytes (max {max_uncompressed} bytes)"
        )));
    }

    let mut buffers = Vec::with_capacity(selected.len());
    for i in selected {
        let mut entry = archive.by_index(i)?;
        let mut bytes = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut bytes)?;
        debug!(entry = entry.name(), bytes = bytes.len(), "Read archive member");
        buffers.push(NamedBuffer {
            name: entry.name().to_string(),
            bytes: Bytes::from(bytes),
        });
    }

    Ok(buffers)
}

/// Guesses which sub-feed an archive member carries from its name.
pub fn feed_label(name: &str) -> &'static str {
    let lower = name.to_lowercase();
    if lower.contains("trip") || lower.contains("tu") {
        "tripUpdates"
    } else if lower.contains("vehicle") || lower.contains("vp") {
        "vehiclePositions"
    } else if lower.contains("alert") || lower.contains("sa") {
        "serviceAlerts"
    } else {
        "unknown"
    }
}
