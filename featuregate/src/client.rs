use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;

use featuregate_core::{
    events::{AccessEvent, EventRecorder, EventRecorderConfig},
    repository_fetcher::{RepositoryFetcher, RepositoryFetcherConfig},
    repository_store::RepositoryStore,
    synchronizer::{Synchronizer, SynchronizerConfig},
    toggle::{Repository, Serve, Toggle, Variant},
    FPUser, Result,
};

use crate::ClientConfig;

/// Sent in the `User-Agent` header of every outbound request.
const USER_AGENT: &str = concat!("Rust/", env!("CARGO_PKG_VERSION"));

/// A client for the FeatureGate API.
///
/// The client keeps a local snapshot of toggle and segment definitions, refreshed in the
/// background by a synchronizer thread, and evaluates every request against that snapshot, so no
/// evaluation ever performs network I/O. Each evaluation is also recorded as an access event and
/// shipped to the collector asynchronously.
///
/// In order to create a client instance, first create a [`ClientConfig`].
///
/// # Examples
/// ```no_run
/// # use featuregate::{Client, ClientConfig, FPUser};
/// let client = Client::new(ClientConfig::new("https://featuregate.example.com/", "server-sdk-key"))
///     .expect("config should be valid");
/// let user = FPUser::new().with("city", "paris");
/// if client.bool_value("new_checkout", &user, false) {
///     // roll out the new checkout
/// }
/// ```
pub struct Client {
    repository_store: Arc<RepositoryStore>,
    synchronizer: Option<Synchronizer>,
    recorder: Option<EventRecorder>,
}

/// The value served for one evaluation call plus how the decision was reached.
///
/// `rule_index` and `version` are absent when no toggle was found or no rule matched; the reason
/// string is always present.
#[derive(Debug, Clone, PartialEq)]
pub struct Detail<T> {
    /// The served value.
    pub value: T,
    /// Index of the matching rule, if one matched.
    pub rule_index: Option<usize>,
    /// Version of the evaluated toggle, if it existed.
    pub version: Option<u64>,
    /// Human-readable explanation of the decision.
    pub reason: String,
}

/// Outcome of the generic dispatch backing every typed accessor: the served value (already
/// defaulted when the engine degraded) plus decision metadata.
struct GenericDetail {
    value: Variant,
    variation_index: Option<usize>,
    rule_index: Option<usize>,
    version: Option<u64>,
    reason: String,
}

impl GenericDetail {
    fn absent(toggle: &str, default: Variant) -> GenericDetail {
        GenericDetail {
            value: default,
            variation_index: None,
            rule_index: None,
            version: None,
            reason: format!("toggle [{toggle}] not exist"),
        }
    }
}

impl Client {
    /// Create a new `Client` using the specified configuration, starting the background
    /// synchronizer and event recorder.
    ///
    /// With `wait_first_response` enabled (the default), this call blocks (bounded by the refresh
    /// interval) until the first snapshot arrives; on timeout it logs a warning and returns a
    /// working client that serves caller defaults until data lands.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidBaseUrl`](featuregate_core::Error::InvalidBaseUrl) if the remote URL or
    ///   a path override cannot be resolved into an endpoint URL.
    /// - [`Error::Io`](featuregate_core::Error::Io) if a background thread failed to start.
    pub fn new(config: ClientConfig) -> Result<Client> {
        let toggles_url = config.toggles_url()?;
        let events_url = config.events_url()?;

        let repository_store = Arc::new(RepositoryStore::new());

        let recorder = EventRecorder::new(EventRecorderConfig {
            events_url,
            server_sdk_key: config.server_sdk_key.clone(),
            user_agent: USER_AGENT.to_owned(),
            flush_interval: config.refresh_interval,
        });
        recorder.start()?;

        let fetcher = RepositoryFetcher::new(RepositoryFetcherConfig {
            toggles_url,
            server_sdk_key: config.server_sdk_key.clone(),
            user_agent: USER_AGENT.to_owned(),
            timeout: config.refresh_interval,
        });
        let synchronizer = Synchronizer::start_with_config(
            fetcher,
            Arc::clone(&repository_store),
            SynchronizerConfig::new()
                .with_interval(config.refresh_interval)
                .with_jitter(config.refresh_interval / 10),
        )?;

        if config.wait_first_response {
            if let Err(err) = synchronizer.wait_for_initialization(config.refresh_interval) {
                log::warn!(target: "featuregate", "serving caller defaults until the first snapshot arrives: {err}");
            }
        }

        Ok(Client {
            repository_store,
            synchronizer: Some(synchronizer),
            recorder: Some(recorder),
        })
    }

    /// Build an offline client for unit-testing caller code: each entry of `toggles` is served
    /// as the single variation of an always-enabled toggle. No synchronizer or recorder is
    /// started and no network I/O ever happens.
    ///
    /// ```
    /// # use std::collections::HashMap;
    /// # use featuregate::{Client, FPUser, Variant};
    /// let client = Client::new_for_test(HashMap::from([
    ///     ("dark_mode".to_owned(), Variant::Boolean(true)),
    /// ]));
    /// assert!(client.bool_value("dark_mode", &FPUser::new(), false));
    /// ```
    pub fn new_for_test(toggles: HashMap<String, Variant>) -> Client {
        let mut repository = Repository::default();
        for (key, value) in toggles {
            let toggle = Toggle {
                key: key.clone(),
                enabled: true,
                version: 0,
                disabled_serve: Serve::select(0),
                default_serve: Serve::select(0),
                rules: vec![],
                variations: vec![value],
            };
            repository.toggles.insert(key, toggle);
        }
        Client::with_repository(repository)
    }

    fn with_repository(repository: Repository) -> Client {
        let repository_store = Arc::new(RepositoryStore::new());
        repository_store.set_repository(Arc::new(repository));
        Client {
            repository_store,
            synchronizer: None,
            recorder: None,
        }
    }

    /// Evaluate a boolean toggle, falling back to `default`.
    pub fn bool_value(&self, toggle: &str, user: &FPUser, default: bool) -> bool {
        self.bool_detail(toggle, user, default).value
    }

    /// Evaluate a boolean toggle with decision details.
    pub fn bool_detail(&self, toggle: &str, user: &FPUser, default: bool) -> Detail<bool> {
        let detail = self.generic_detail(toggle, user, Variant::from(default));
        let (value, reason) = match detail.value.as_boolean() {
            Some(value) => (value, detail.reason),
            None => (default, "value type mismatch".to_owned()),
        };
        Detail {
            value,
            rule_index: detail.rule_index,
            version: detail.version,
            reason,
        }
    }

    /// Evaluate a string toggle, falling back to `default`.
    pub fn string_value(&self, toggle: &str, user: &FPUser, default: impl Into<String>) -> String {
        self.string_detail(toggle, user, default).value
    }

    /// Evaluate a string toggle with decision details.
    pub fn string_detail(
        &self,
        toggle: &str,
        user: &FPUser,
        default: impl Into<String>,
    ) -> Detail<String> {
        let default = default.into();
        let detail = self.generic_detail(toggle, user, Variant::from(default.clone()));
        let (value, reason) = match detail.value.as_str() {
            Some(value) => (value.to_owned(), detail.reason),
            None => (default, "value type mismatch".to_owned()),
        };
        Detail {
            value,
            rule_index: detail.rule_index,
            version: detail.version,
            reason,
        }
    }

    /// Evaluate a numeric toggle, falling back to `default`.
    pub fn number_value(&self, toggle: &str, user: &FPUser, default: f64) -> f64 {
        self.number_detail(toggle, user, default).value
    }

    /// Evaluate a numeric toggle with decision details.
    pub fn number_detail(&self, toggle: &str, user: &FPUser, default: f64) -> Detail<f64> {
        let detail = self.generic_detail(toggle, user, Variant::from(default));
        let (value, reason) = match detail.value.as_number() {
            Some(value) => (value, detail.reason),
            None => (default, "value type mismatch".to_owned()),
        };
        Detail {
            value,
            rule_index: detail.rule_index,
            version: detail.version,
            reason,
        }
    }

    /// Evaluate a JSON toggle, falling back to `default`. The JSON accessor accepts variations
    /// of every kind, so it never reports a type mismatch.
    pub fn json_value(
        &self,
        toggle: &str,
        user: &FPUser,
        default: serde_json::Value,
    ) -> serde_json::Value {
        self.json_detail(toggle, user, default).value
    }

    /// Evaluate a JSON toggle with decision details.
    pub fn json_detail(
        &self,
        toggle: &str,
        user: &FPUser,
        default: serde_json::Value,
    ) -> Detail<serde_json::Value> {
        let detail = self.generic_detail(toggle, user, Variant::from(default));
        Detail {
            value: detail.value.to_json(),
            rule_index: detail.rule_index,
            version: detail.version,
            reason: detail.reason,
        }
    }

    /// The single dispatch point behind every accessor: look up the toggle in the current
    /// snapshot, run the evaluation engine, substitute `default` when the engine degraded, and
    /// record exactly one access event, regardless of outcome.
    fn generic_detail(&self, toggle: &str, user: &FPUser, default: Variant) -> GenericDetail {
        let repository = self.repository_store.get_repository();

        let detail = match &repository {
            Some(repository) => match repository.toggles.get(toggle) {
                Some(definition) => {
                    let eval = definition.eval_detail(user, &repository.segments);
                    GenericDetail {
                        value: eval.value.unwrap_or(default),
                        variation_index: eval.variation_index,
                        rule_index: eval.rule_index,
                        version: eval.version,
                        reason: eval.reason,
                    }
                }
                None => GenericDetail::absent(toggle, default),
            },
            None => GenericDetail::absent(toggle, default),
        };

        log::trace!(target: "featuregate",
            toggle_key = toggle,
            user_key = user.key(),
            value:serde = detail.value;
            "evaluated a toggle");

        if let Some(recorder) = &self.recorder {
            recorder.record(AccessEvent {
                time: Utc::now().timestamp_millis(),
                key: toggle.to_owned(),
                value: detail.value.clone(),
                index: detail.variation_index,
                version: detail.version,
                reason: detail.reason.clone(),
            });
        }

        detail
    }

    /// Shut down the client: stop the synchronizer, clear the repository (so later reads cannot
    /// return stale data), and stop the event recorder, which performs one final flush of
    /// whatever is pending. Idempotent.
    pub fn close(&self) {
        if let Some(synchronizer) = &self.synchronizer {
            synchronizer.stop();
        }
        self.repository_store.clear();
        if let Some(recorder) = &self.recorder {
            recorder.stop();
        }
    }
}
