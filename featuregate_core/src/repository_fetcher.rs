//! An HTTP client that fetches toggle/segment snapshots from the server.
use std::time::Duration;

use reqwest::StatusCode;
use url::Url;

use crate::{toggle::Repository, Error, Result};

pub struct RepositoryFetcherConfig {
    /// Full URL of the toggles endpoint.
    pub toggles_url: Url,
    /// Server SDK key, sent as the `Authorization` header.
    pub server_sdk_key: String,
    /// `User-Agent` identifying SDK name and version.
    pub user_agent: String,
    /// Bound on each fetch request so an overrun cannot starve the next scheduled cycle.
    pub timeout: Duration,
}

/// A client that fetches the toggle snapshot from the server.
pub struct RepositoryFetcher {
    // Client holds a connection pool internally, so we're reusing the client between requests.
    client: reqwest::Client,
    config: RepositoryFetcherConfig,
    /// If we receive a 401 Unauthorized error during a request, it means the SDK key is not
    /// valid. We cache this error so we don't issue additional requests to the server.
    unauthorized: bool,
}

impl RepositoryFetcher {
    pub fn new(config: RepositoryFetcherConfig) -> RepositoryFetcher {
        let client = reqwest::Client::new();

        RepositoryFetcher {
            client,
            config,
            unauthorized: false,
        }
    }

    /// Fetch the current snapshot. The response body is the snapshot document, deserialized
    /// directly into [`Repository`].
    pub async fn fetch_repository(&mut self) -> Result<Repository> {
        if self.unauthorized {
            return Err(Error::Unauthorized);
        }

        log::debug!(target: "featuregate", "fetching toggle snapshot");
        let response = self
            .client
            .get(self.config.toggles_url.clone())
            .header(reqwest::header::AUTHORIZATION, self.config.server_sdk_key.as_str())
            .header(reqwest::header::USER_AGENT, self.config.user_agent.as_str())
            .timeout(self.config.timeout)
            .send()
            .await?;

        let response = response.error_for_status().map_err(|err| {
            if err.status() == Some(StatusCode::UNAUTHORIZED) {
                log::warn!(target: "featuregate", "client is not authorized. Check your server SDK key");
                self.unauthorized = true;
                Error::Unauthorized
            } else {
                log::warn!(target: "featuregate", "received non-200 response while fetching snapshot: {:?}", err);
                Error::from(err)
            }
        })?;

        let repository = response.json().await?;

        log::debug!(target: "featuregate", "successfully fetched toggle snapshot");

        Ok(repository)
    }
}
