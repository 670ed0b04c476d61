//! One end-to-end run: acquire, unpack, decode, filter, merge, write.

use std::collections::HashSet;
use std::path::PathBuf;

use chrono::Utc;
use tokio::task::{JoinHandle, spawn_blocking};
use tracing::{debug, info, warn};

use crate::archive::{NamedBuffer, feed_label, unpack_payload};
use crate::config::{OutputFormat, OutputTarget, RunConfig};
use crate::error::Result;
use crate::fetch::{BasicClient, HttpClient, ScratchPayload, acquire, authenticated_client};
use crate::filter::StopPrefix;
use crate::filter::per_stop::{BundleStamp, StopBundles};
use crate::filter::prune::prune_feed;
use crate::output::{
    SubFeed, encode_filtered_binary, log_summary, render_filtered_json, write_atomically,
    write_stop_bundles,
};
use crate::parser::decode_buffer;
use crate::redact::redact_url;
use crate::stats::{FilterSummary, RunSummary};

/// What a successful run produced.
///
/// `matched` is false when nothing in the payload matched the prefix; the
/// run still succeeds and a warning is logged.
#[derive(Debug, Clone, PartialEq)]
pub enum RunReport {
    PerStop {
        files: Vec<PathBuf>,
        fragments: usize,
        matched: bool,
    },
    SingleFeed {
        path: PathBuf,
        summary: RunSummary,
        matched: bool,
    },
}

impl RunReport {
    pub fn matched(&self) -> bool {
        match self {
            RunReport::PerStop { matched, .. } | RunReport::SingleFeed { matched, .. } => *matched,
        }
    }
}

/// Runs the pipeline against the configured source with a default HTTP
/// client, attaching the api key as configured.
pub async fn run(config: &RunConfig) -> Result<RunReport> {
    config.validate()?;
    let client = authenticated_client(
        BasicClient::new(),
        &config.source,
        config.api_key.as_ref(),
        &config.credential,
    )?;
    run_with_client(client.as_ref(), config).await
}

/// Runs the pipeline with `client` issuing the request as is.
#[tracing::instrument(
    skip_all,
    fields(prefix = %config.prefix, source = %redact_url(&config.source))
)]
pub async fn run_with_client<C>(client: &C, config: &RunConfig) -> Result<RunReport>
where
    C: HttpClient + ?Sized,
{
    config.validate()?;
    let run_start = std::time::Instant::now();

    let payload = acquire(client, &config.source, config.limits.max_download_bytes).await?;
    let buffers = unpack(payload, config).await?;
    info!(buffers = buffers.len(), "Payload unpacked");

    let prefix = StopPrefix::new(config.prefix.as_str());
    let report = match &config.target {
        OutputTarget::PerStop { dir } => {
            let stamp = BundleStamp::new(Utc::now(), &config.source);
            let bundles = fan_out(buffers, &prefix, &stamp).await?;
            let matched = !bundles.is_empty();
            if !matched {
                warn!(prefix = %prefix.as_str(), "No stop ids matched the prefix");
            }
            let files = write_stop_bundles(&bundles, dir).await?;
            RunReport::PerStop {
                files,
                fragments: bundles.fragment_count(),
                matched,
            }
        }
        OutputTarget::SingleFeed { path, format } => {
            let sub_feeds = prune_all(buffers, &prefix).await?;
            let totals: FilterSummary = sub_feeds.iter().map(|s| s.filtered.summary).sum();
            let matched = totals.kept_entities > 0;
            if !matched {
                warn!(prefix = %prefix.as_str(), "No entities matched the prefix");
            }
            let summary = RunSummary::new(totals, prefix.as_str(), &config.source, Utc::now());

            let bytes = match format {
                OutputFormat::Json => render_filtered_json(&sub_feeds, &summary)?,
                OutputFormat::Binary => encode_filtered_binary(&sub_feeds)?,
            };
            let dest = path.clone();
            spawn_blocking(move || write_atomically(&dest, &bytes)).await??;

            log_summary(&summary)?;
            RunReport::SingleFeed {
                path: path.clone(),
                summary,
                matched,
            }
        }
    };

    info!(
        elapsed_ms = run_start.elapsed().as_millis() as u64,
        "Run complete"
    );
    Ok(report)
}

/// Unpacks on the blocking pool; the scratch file is removed once done.
async fn unpack(payload: ScratchPayload, config: &RunConfig) -> Result<Vec<NamedBuffer>> {
    let filter = config.archive_entries.clone();
    let max = config.limits.max_uncompressed_bytes;
    spawn_blocking(move || {
        let buffers = unpack_payload(payload.path(), &filter, max);
        drop(payload);
        buffers
    })
    .await?
}

/// Decodes and buckets every buffer in parallel, merging in buffer order.
async fn fan_out(
    buffers: Vec<NamedBuffer>,
    prefix: &StopPrefix,
    stamp: &BundleStamp,
) -> Result<StopBundles> {
    let handles: Vec<JoinHandle<Result<StopBundles>>> = buffers
        .into_iter()
        .map(|buffer| {
            let prefix = prefix.clone();
            let stamp = stamp.clone();
            spawn_blocking(move || {
                let feed = decode_buffer(&buffer)?;
                let bundles = StopBundles::collect(&feed, &prefix, &stamp);
                debug!(
                    buffer = %buffer.name,
                    feed = feed_label(&buffer.name),
                    stops = bundles.len(),
                    "Buffer bucketed"
                );
                Ok(bundles)
            })
        })
        .collect();

    let mut merged = StopBundles::default();
    for handle in handles {
        merged.merge(handle.await??);
    }
    info!(
        stops = merged.len(),
        fragments = merged.fragment_count(),
        "Per-stop bundles merged"
    );
    Ok(merged)
}

/// Decodes and prunes every buffer in parallel, keeping buffer order.
async fn prune_all(buffers: Vec<NamedBuffer>, prefix: &StopPrefix) -> Result<Vec<SubFeed>> {
    let names = unique_names(buffers.iter().map(|b| feed_label(&b.name)));

    let handles: Vec<JoinHandle<Result<SubFeed>>> = buffers
        .into_iter()
        .zip(names)
        .map(|(buffer, name)| {
            let prefix = prefix.clone();
            spawn_blocking(move || {
                let feed = decode_buffer(&buffer)?;
                let filtered = prune_feed(feed, &prefix);
                debug!(
                    buffer = %buffer.name,
                    feed = %name,
                    kept = filtered.summary.kept_entities,
                    total = filtered.summary.total_entities,
                    "Buffer pruned"
                );
                Ok(SubFeed { name, filtered })
            })
        })
        .collect();

    let mut sub_feeds = Vec::with_capacity(handles.len());
    for handle in handles {
        sub_feeds.push(handle.await??);
    }
    Ok(sub_feeds)
}

/// Suffixes repeated sub-feed labels with `_<n>` so each keeps its own key.
fn unique_names<'a>(names: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    names
        .map(|name| {
            let mut candidate = name.to_string();
            let mut n = 2;
            while !seen.insert(candidate.clone()) {
                candidate = format!("{name}_{n}");
                n += 1;
            }
            candidate
        })
        .collect()
}
