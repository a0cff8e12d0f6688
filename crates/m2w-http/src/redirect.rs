use std::time::Duration;

use async_trait::async_trait;
use m2w_core::{errors::Error, ports::RedirectClient, Result};
use reqwest::redirect::Policy;
use tracing::debug;

use crate::map_reqwest;

const MAX_REDIRECTS: usize = 10;

/// Follows the redirect chain of a short link with a browser user agent.
#[derive(Clone, Debug)]
pub struct ReqwestRedirectClient {
    http: reqwest::Client,
}

impl ReqwestRedirectClient {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .redirect(Policy::limited(MAX_REDIRECTS))
            .timeout(timeout)
            .connect_timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| Error::Config(format!("redirect client build failed: {e}")))?;
        Ok(Self { http })
    }
}

#[async_trait]
impl RedirectClient for ReqwestRedirectClient {
    async fn final_url(&self, url: &str) -> Result<String> {
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| map_reqwest("redirect request", e))?;

        // The landing page's status does not matter, only where we ended up.
        debug!("redirect chain ended with {} at {}", resp.status(), resp.url());
        Ok(resp.url().to_string())
    }
}
