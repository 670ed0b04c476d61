use async_trait::async_trait;
use reqwest::{Request, Response};

/// The transport seam of the acquirer. Credential wrappers decorate it.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}

