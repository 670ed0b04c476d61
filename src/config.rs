//! Resolved run configuration handed to the pipeline.
//!
//! Argument parsing and environment lookup live in the binary; by the time a
//! [`RunConfig`] exists every value is final.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::archive::NamePatterns;
use crate::error::{PipelineError, Result};

pub const DEFAULT_SOURCE: &str = "https://data.bus-data.dft.gov.uk/api/v1/gtfsrtdatafeed/";
pub const DEFAULT_PREFIX: &str = "370";
/// Query parameter BODS reads the api key from.
pub const DEFAULT_CREDENTIAL_PARAM: &str = "api_key";

/// Largest payload the acquirer will write to its scratch file (256 MiB).
pub const DEFAULT_MAX_DOWNLOAD_BYTES: u64 = 256 * 1024 * 1024;
/// Largest total uncompressed size of the selected archive entries (1 GiB).
pub const DEFAULT_MAX_UNCOMPRESSED_BYTES: u64 = 1024 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Binary,
}

impl FromStr for OutputFormat {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "binary" | "pb" => Ok(OutputFormat::Binary),
            other => Err(PipelineError::Config(format!(
                "unknown output format '{other}' (expected json or binary)"
            ))),
        }
    }
}

/// Where and how the run writes its result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    /// One JSON file per matching stop, written into `dir`.
    PerStop { dir: PathBuf },
    /// One filtered feed written to `path`.
    SingleFeed { path: PathBuf, format: OutputFormat },
}

impl OutputTarget {
    /// Per-stop output only has a JSON representation.
    pub fn per_stop(dir: impl Into<PathBuf>, format: OutputFormat) -> Result<Self> {
        if format == OutputFormat::Binary {
            return Err(PipelineError::UnsupportedOutput(
                "binary output is only available for the single filtered feed".into(),
            ));
        }
        Ok(OutputTarget::PerStop { dir: dir.into() })
    }

    pub fn single_feed(path: impl Into<PathBuf>, format: OutputFormat) -> Self {
        OutputTarget::SingleFeed {
            path: path.into(),
            format,
        }
    }
}

/// How the api key travels with the request. Exactly one placement is used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialPlacement {
    Header { name: String },
    QueryParam { name: String },
}

impl Default for CredentialPlacement {
    fn default() -> Self {
        CredentialPlacement::QueryParam {
            name: DEFAULT_CREDENTIAL_PARAM.to_string(),
        }
    }
}

impl FromStr for CredentialPlacement {
    type Err = PipelineError;

    /// Parses `header:<name>` or `query:<name>`.
    fn from_str(s: &str) -> Result<Self> {
        let (kind, name) = s.split_once(':').ok_or_else(|| {
            PipelineError::Config(format!(
                "credential placement '{s}' must look like header:<name> or query:<name>"
            ))
        })?;
        if name.is_empty() {
            return Err(PipelineError::Config(format!(
                "credential placement '{s}' is missing a name"
            )));
        }
        match kind {
            "header" => Ok(CredentialPlacement::Header { name: name.into() }),
            "query" => Ok(CredentialPlacement::QueryParam { name: name.into() }),
            other => Err(PipelineError::Config(format!(
                "unknown credential placement '{other}'"
            ))),
        }
    }
}

/// An api key that never shows up in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKeySecret(String);

impl ApiKeySecret {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKeySecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKeySecret(REDACTED)")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_download_bytes: u64,
    pub max_uncompressed_bytes: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_download_bytes: DEFAULT_MAX_DOWNLOAD_BYTES,
            max_uncompressed_bytes: DEFAULT_MAX_UNCOMPRESSED_BYTES,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub prefix: String,
    /// Feed URL, or a local file path for replaying a captured payload.
    pub source: String,
    pub api_key: Option<ApiKeySecret>,
    pub credential: CredentialPlacement,
    pub target: OutputTarget,
    pub archive_entries: NamePatterns,
    pub limits: Limits,
}

impl RunConfig {
    pub fn new(prefix: impl Into<String>, source: impl Into<String>, target: OutputTarget) -> Self {
        Self {
            prefix: prefix.into(),
            source: source.into(),
            api_key: None,
            credential: CredentialPlacement::default(),
            target,
            archive_entries: NamePatterns::default(),
            limits: Limits::default(),
        }
    }

    pub fn with_api_key(mut self, key: Option<String>) -> Self {
        self.api_key = key.filter(|k| !k.is_empty()).map(ApiKeySecret::new);
        self
    }

    pub fn with_credential(mut self, credential: CredentialPlacement) -> Self {
        self.credential = credential;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.source.trim().is_empty() {
            return Err(PipelineError::Config("no source URL provided".into()));
        }
        if let OutputTarget::PerStop { dir } = &self.target {
            if dir.as_os_str().is_empty() {
                return Err(PipelineError::Config("output directory is empty".into()));
            }
        }
        if let OutputTarget::SingleFeed { path, .. } = &self.target {
            if path.as_os_str().is_empty() {
                return Err(PipelineError::Config("output path is empty".into()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_stop_rejects_binary() {
        let err = OutputTarget::per_stop("./stops", OutputFormat::Binary).unwrap_err();
        assert!(matches!(err, PipelineError::UnsupportedOutput(_)));
    }

    #[test]
    fn test_output_format_parsing() {
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("pb".parse::<OutputFormat>().unwrap(), OutputFormat::Binary);
        assert_eq!("BINARY".parse::<OutputFormat>().unwrap(), OutputFormat::Binary);
        assert!("xml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_credential_placement_parsing() {
        assert_eq!(
            "header:x-api-key".parse::<CredentialPlacement>().unwrap(),
            CredentialPlacement::Header {
                name: "x-api-key".into()
            }
        );
        assert_eq!(
            "query:api_key".parse::<CredentialPlacement>().unwrap(),
            CredentialPlacement::default()
        );
        assert!("cookie:session".parse::<CredentialPlacement>().is_err());
        assert!("header:".parse::<CredentialPlacement>().is_err());
        assert!("api_key".parse::<CredentialPlacement>().is_err());
    }

    #[test]
    fn test_api_key_hidden_from_debug() {
        let config = RunConfig::new(
            DEFAULT_PREFIX,
            DEFAULT_SOURCE,
            OutputTarget::single_feed("out.json", OutputFormat::Json),
        )
        .with_api_key(Some("s3cret".into()));
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("s3cret"));
        assert_eq!(config.api_key.unwrap().expose(), "s3cret");
    }

    #[test]
    fn test_empty_api_key_is_ignored() {
        let config = RunConfig::new(
            DEFAULT_PREFIX,
            DEFAULT_SOURCE,
            OutputTarget::single_feed("out.json", OutputFormat::Json),
        )
        .with_api_key(Some(String::new()));
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_validate_rejects_empty_source() {
        let config = RunConfig::new(
            DEFAULT_PREFIX,
            "  ",
            OutputTarget::single_feed("out.json", OutputFormat::Json),
        );
        assert!(matches!(config.validate(), Err(PipelineError::Config(_))));
    }
}
