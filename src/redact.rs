//! Credential redaction for URLs that end up in logs or output files.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

pub const REDACTED: &str = "REDACTED";

/// Query parameter names treated as credentials (compared case-insensitively).
const CREDENTIAL_PARAMS: &[&str] = &[
    "api_key",
    "apikey",
    "api-key",
    "key",
    "token",
    "access_token",
    "subscription-key",
];

static CREDENTIAL_PAIR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)([?&](?:api_key|apikey|api-key|key|token|access_token|subscription-key))=[^&#]*")
        .expect("credential pattern is valid")
});

fn is_credential_param(name: &str) -> bool {
    CREDENTIAL_PARAMS
        .iter()
        .any(|param| param.eq_ignore_ascii_case(name))
}

/// Returns `true` if `url` carries the query parameter `name`
/// (compared case-insensitively).
pub fn has_query_param(url: &str, name: &str) -> bool {
    match Url::parse(url) {
        Ok(parsed) => parsed.query_pairs().any(|(k, _)| k.eq_ignore_ascii_case(name)),
        Err(_) => {
            let lower = url.to_ascii_lowercase();
            let name = name.to_ascii_lowercase();
            lower.contains(&format!("?{name}=")) || lower.contains(&format!("&{name}="))
        }
    }
}

/// Replaces the value of every api-key style query parameter with [`REDACTED`].
///
/// Strings that do not parse as URLs are redacted textually.
pub fn redact_url(url: &str) -> String {
    let Ok(mut parsed) = Url::parse(url) else {
        return CREDENTIAL_PAIR
            .replace_all(url, format!("${{1}}={REDACTED}"))
            .into_owned();
    };

    if !parsed.query_pairs().any(|(k, _)| is_credential_param(&k)) {
        return parsed.to_string();
    }

    let pairs: Vec<(String, String)> = parsed
        .query_pairs()
        .map(|(k, v)| {
            let value = if is_credential_param(&k) {
                REDACTED.to_string()
            } else {
                v.into_owned()
            };
            (k.into_owned(), value)
        })
        .collect();

    parsed.query_pairs_mut().clear().extend_pairs(pairs);
    parsed.to_string()
}
