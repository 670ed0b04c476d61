use crate::config::ApiKeySecret;
use crate::fetch::client::HttpClient;
use async_trait::async_trait;

/// An [`HttpClient`] wrapper that carries the api key as a query parameter.
///
/// An existing parameter with the same name is replaced, so the key appears
/// in the URL exactly once.
pub struct UrlParam<C> {
    pub inner: C,
    param_name: String,
    key: ApiKeySecret,
}

impl<C> UrlParam<C> {
    pub fn new(inner: C, param_name: impl Into<String>, key: ApiKeySecret) -> Self {
        Self {
            inner,
            param_name: param_name.into(),
            key,
        }
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for UrlParam<C> {
    async fn execute(&self, mut req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        let url = req.url_mut();
        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(name, _)| name != self.param_name.as_str())
            .map(|(name, value)| (name.into_owned(), value.into_owned()))
            .collect();
        url.query_pairs_mut()
            .clear()
            .extend_pairs(kept)
            .append_pair(&self.param_name, self.key.expose());
        self.inner.execute(req).await
    }
}
