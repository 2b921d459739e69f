use std::time::Duration;

use url::Url;

use featuregate_core::{Error, Result};

#[cfg(doc)]
use crate::Client;

/// Configuration for [`Client`].
///
/// # Examples
/// ```no_run
/// # use featuregate::{Client, ClientConfig};
/// let config = ClientConfig::new("https://featuregate.example.com/", "server-sdk-key")
///     .refresh_interval(std::time::Duration::from_millis(5000));
/// let client = Client::new(config).expect("config should be valid");
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub(crate) remote_url: String,
    pub(crate) server_sdk_key: String,
    pub(crate) toggles_uri: String,
    pub(crate) events_uri: String,
    pub(crate) refresh_interval: Duration,
    pub(crate) wait_first_response: bool,
}

impl ClientConfig {
    /// Default path of the toggles endpoint, relative to the remote URL.
    pub const DEFAULT_TOGGLES_URI: &'static str = "api/server-sdk/toggles";
    /// Default path of the events collector endpoint, relative to the remote URL.
    pub const DEFAULT_EVENTS_URI: &'static str = "api/events";
    /// Default refresh/flush interval. Also bounds every outbound network call.
    pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_millis(2000);

    /// Create a default configuration using the specified remote URL and server SDK key.
    ///
    /// ```
    /// # use featuregate::ClientConfig;
    /// ClientConfig::new("https://featuregate.example.com/", "server-sdk-key");
    /// ```
    pub fn new(remote_url: impl Into<String>, server_sdk_key: impl Into<String>) -> ClientConfig {
        ClientConfig {
            remote_url: remote_url.into(),
            server_sdk_key: server_sdk_key.into(),
            toggles_uri: ClientConfig::DEFAULT_TOGGLES_URI.to_owned(),
            events_uri: ClientConfig::DEFAULT_EVENTS_URI.to_owned(),
            refresh_interval: ClientConfig::DEFAULT_REFRESH_INTERVAL,
            wait_first_response: true,
        }
    }

    /// Override the toggles endpoint path, relative to the remote URL. Clients should use the
    /// default setting in most cases.
    pub fn toggles_uri(mut self, uri: impl Into<String>) -> ClientConfig {
        self.toggles_uri = uri.into();
        self
    }

    /// Override the events collector endpoint path, relative to the remote URL. Clients should
    /// use the default setting in most cases.
    pub fn events_uri(mut self, uri: impl Into<String>) -> ClientConfig {
        self.events_uri = uri.into();
        self
    }

    /// Set the snapshot refresh / event flush interval. The same duration bounds every outbound
    /// network call and the wait for the first snapshot.
    pub fn refresh_interval(mut self, interval: Duration) -> ClientConfig {
        self.refresh_interval = interval;
        self
    }

    /// Whether [`Client::new`] blocks (bounded by the refresh interval) until the first snapshot
    /// arrives. Defaults to `true`. When disabled, or when the wait times out, the client serves
    /// caller defaults until data lands.
    pub fn wait_first_response(mut self, wait: bool) -> ClientConfig {
        self.wait_first_response = wait;
        self
    }

    pub(crate) fn toggles_url(&self) -> Result<Url> {
        self.join(&self.toggles_uri)
    }

    pub(crate) fn events_url(&self) -> Result<Url> {
        self.join(&self.events_uri)
    }

    fn join(&self, uri: &str) -> Result<Url> {
        let mut base = self.remote_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base = Url::parse(&base).map_err(Error::InvalidBaseUrl)?;
        base.join(uri).map_err(Error::InvalidBaseUrl)
    }
}
