//! Output projection and persistence.
//!
//! Per-stop bundles are written concurrently into a staging directory and
//! moved into place once every write has succeeded. Single-feed documents go
//! through a temporary sibling file that is persisted over the target.

use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::ser::{Serialize, Serializer};
use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::error::{PipelineError, Result};
use crate::filter::per_stop::StopBundles;
use crate::filter::prune::FilteredFeed;
use crate::model::{FeedEntity, FeedHeader};
use crate::parser::encode_feed;
use crate::stats::RunSummary;

/// One pruned archive member, named after the buffer it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct SubFeed {
    pub name: String,
    pub filtered: FilteredFeed,
}

/// Turns a stop id into a file name that cannot escape the output directory.
pub fn stop_file_name(stop_id: &str) -> String {
    let mut safe: String = stop_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if safe.is_empty() || safe.starts_with('.') {
        safe.replace_range(..safe.chars().next().map_or(0, char::len_utf8), "_");
    }
    format!("{safe}.json")
}

/// Gives every bundle a distinct file name, suffixing ids that sanitize to
/// the same name.
fn unique_file_names<'a>(stop_ids: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut used = HashSet::new();
    stop_ids
        .map(|id| {
            let base = stop_file_name(id);
            let mut name = base.clone();
            let mut n = 2;
            while !used.insert(name.clone()) {
                name = format!("{}_{n}.json", base.trim_end_matches(".json"));
                n += 1;
            }
            name
        })
        .collect()
}

/// Writes one `<stopId>.json` per bundle into `out_dir`.
///
/// Either every file lands or none do: files are staged in a hidden
/// directory inside `out_dir` and renamed into place after all writes
/// complete. Returns the final paths in stop-id order.
#[tracing::instrument(skip(bundles), fields(out_dir = %out_dir.display(), stops = bundles.len()))]
pub async fn write_stop_bundles(bundles: &StopBundles, out_dir: &Path) -> Result<Vec<PathBuf>> {
    tokio::fs::create_dir_all(out_dir).await?;
    let staging = tempfile::Builder::new()
        .prefix(".staging-")
        .tempdir_in(out_dir)?;

    let names = unique_file_names(bundles.iter().map(|b| b.stop_id.as_str()));

    let mut writes = JoinSet::new();
    for (bundle, name) in bundles.iter().zip(&names) {
        let body = serde_json::to_vec_pretty(bundle)?;
        let path = staging.path().join(name);
        writes.spawn(async move { tokio::fs::write(&path, body).await });
    }
    while let Some(joined) = writes.join_next().await {
        joined??;
    }
    debug!(files = names.len(), "All stop files staged");

    let mut written = Vec::with_capacity(names.len());
    for name in &names {
        let dest = out_dir.join(name);
        tokio::fs::rename(staging.path().join(name), &dest).await?;
        written.push(dest);
    }

    info!(files = written.len(), "Stop files written");
    Ok(written)
}

/// `{header, entities, summary}` for one sub-feed.
#[derive(serde::Serialize)]
struct SingleFeedDocument<'a> {
    header: &'a FeedHeader,
    entities: &'a [FeedEntity],
    summary: &'a RunSummary,
}

/// `{feeds: {name: {header, entities}}, summary}` for several sub-feeds.
#[derive(serde::Serialize)]
struct MultiFeedDocument<'a> {
    feeds: FeedsByName<'a>,
    summary: &'a RunSummary,
}

// Keeps archive order instead of sorting by name.
struct FeedsByName<'a>(&'a [SubFeed]);

impl Serialize for FeedsByName<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|sub| (&sub.name, &sub.filtered)))
    }
}

/// Renders the single-feed JSON document.
pub fn render_filtered_json(sub_feeds: &[SubFeed], summary: &RunSummary) -> Result<Vec<u8>> {
    let rendered = match sub_feeds {
        [only] => serde_json::to_vec_pretty(&SingleFeedDocument {
            header: &only.filtered.header,
            entities: &only.filtered.entities,
            summary,
        })?,
        _ => serde_json::to_vec_pretty(&MultiFeedDocument {
            feeds: FeedsByName(sub_feeds),
            summary,
        })?,
    };
    Ok(rendered)
}

/// Re-encodes the pruned feed as GTFS-RT protobuf.
///
/// # Errors
///
/// [`PipelineError::UnsupportedOutput`] unless there is exactly one sub-feed;
/// the wire format has no container for several feeds.
pub fn encode_filtered_binary(sub_feeds: &[SubFeed]) -> Result<Vec<u8>> {
    match sub_feeds {
        [only] => Ok(encode_feed(&only.filtered.to_message())),
        _ => Err(PipelineError::UnsupportedOutput(format!(
            "binary output needs exactly one feed, the payload held {}",
            sub_feeds.len()
        ))),
    }
}

/// Replaces `path` with `bytes` without ever exposing a partial file.
pub fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;

    debug!(path = %path.display(), bytes = bytes.len(), "Output persisted");
    Ok(())
}

/// Logs run totals using Rust's debug pretty-print format and as JSON.
pub fn log_summary(summary: &RunSummary) -> Result<()> {
    debug!("{:#?}", summary);
    info!("{}", serde_json::to_string_pretty(summary)?);
    Ok(())
}
