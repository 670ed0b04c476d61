//! Credential-injecting [`HttpClient`](super::HttpClient) wrappers.
//!
//! A request carries its api key either as a header ([`ApiKey`]) or as a
//! query parameter ([`UrlParam`]), never both.

mod api_key;
mod url_param;

pub use api_key::ApiKey;
pub use url_param::UrlParam;
