//! A background recorder that aggregates access events and periodically delivers them to the
//! collector.
use std::{
    sync::{
        mpsc::{RecvTimeoutError, SyncSender},
        Arc, Mutex,
    },
    thread::JoinHandle,
    time::Duration,
};

use url::Url;

use crate::events::{event::PackedData, AccessEvent};

/// Configuration for [`EventRecorder`].
#[derive(Debug, Clone)]
pub struct EventRecorderConfig {
    /// Full URL of the events collector endpoint.
    pub events_url: Url,
    /// Server SDK key, sent as the `Authorization` header.
    pub server_sdk_key: String,
    /// `User-Agent` identifying SDK name and version.
    pub user_agent: String,
    /// Period between flushes. Also bounds each delivery request so an overrun cannot starve the
    /// next scheduled flush.
    pub flush_interval: Duration,
}

/// Collects access events into a pending list and flushes them on a fixed interval as compact
/// aggregated batches. Delivery is fire-and-forget: a failed batch is logged and dropped, never
/// retried. Telemetry loss under transient failure is the accepted trade-off for never blocking
/// evaluation and never growing unbounded memory.
pub struct EventRecorder {
    inner: Arc<RecorderInner>,
    state: Mutex<LifecycleState>,
}

/// Lifecycle of the flush thread. Transitions are one-way (Created → Running → Stopped) and
/// guarded by the state mutex, which makes `start` and `stop` idempotent.
enum LifecycleState {
    Created,
    Running {
        stop_sender: SyncSender<()>,
        join_handle: JoinHandle<()>,
    },
    Stopped,
}

struct RecorderInner {
    config: EventRecorderConfig,
    pending: Mutex<Vec<AccessEvent>>,
}

impl EventRecorder {
    pub fn new(config: EventRecorderConfig) -> EventRecorder {
        EventRecorder {
            inner: Arc::new(RecorderInner {
                config,
                pending: Mutex::new(Vec::new()),
            }),
            state: Mutex::new(LifecycleState::Created),
        }
    }

    /// Enqueue one decision. O(1); holds the pending-list lock only long enough to append and
    /// never touches the network, so it is safe to call on hot evaluation paths.
    pub fn record(&self, event: AccessEvent) {
        let mut pending = self
            .inner
            .pending
            .lock()
            .expect("thread holding pending-events lock should not panic");
        pending.push(event);
    }

    /// Launch the background flush loop. Idempotent: the first call spawns exactly one flush
    /// thread, later calls are no-ops.
    ///
    /// # Errors
    ///
    /// Returns an IO Error if the flush thread failed to start.
    pub fn start(&self) -> std::io::Result<()> {
        let mut state = self
            .state
            .lock()
            .expect("thread holding recorder state lock should not panic");
        if !matches!(*state, LifecycleState::Created) {
            return Ok(());
        }

        let (stop_sender, stop_receiver) = std::sync::mpsc::sync_channel::<()>(1);
        let inner = Arc::clone(&self.inner);

        let join_handle = std::thread::Builder::new()
            .name("featuregate-events".to_owned())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(runtime) => runtime,
                    Err(err) => {
                        log::warn!(target: "featuregate", "failed to build event flush runtime: {err}");
                        return;
                    }
                };
                let client = reqwest::Client::new();

                loop {
                    match stop_receiver.recv_timeout(inner.config.flush_interval) {
                        Err(RecvTimeoutError::Timeout) => inner.flush(&runtime, &client),
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                            // Exactly one final flush of whatever is pending, then exit.
                            inner.flush(&runtime, &client);
                            return;
                        }
                    }
                }
            })?;

        *state = LifecycleState::Running {
            stop_sender,
            join_handle,
        };
        Ok(())
    }

    /// Stop the flush loop. Idempotent. Blocks until the final flush attempt has completed or
    /// timed out; events recorded after this point are dropped with the instance.
    pub fn stop(&self) {
        let mut state = self
            .state
            .lock()
            .expect("thread holding recorder state lock should not panic");
        match std::mem::replace(&mut *state, LifecycleState::Stopped) {
            LifecycleState::Running {
                stop_sender,
                join_handle,
            } => {
                // Full buffer means a stop command is already in flight; ignore.
                let _ = stop_sender.try_send(());
                if join_handle.join().is_err() {
                    log::warn!(target: "featuregate", "event flush thread panicked during shutdown");
                }
            }
            LifecycleState::Created | LifecycleState::Stopped => {}
        }
    }
}

impl RecorderInner {
    /// Swap the pending list for an empty one. Writers never see a half-drained list.
    fn take_batch(&self) -> Vec<AccessEvent> {
        let mut pending = self
            .pending
            .lock()
            .expect("thread holding pending-events lock should not panic");
        std::mem::take(&mut *pending)
    }

    /// Drain, aggregate and deliver one batch. An empty swap produces no network call. The
    /// pending-list lock is not held during delivery.
    fn flush(&self, runtime: &tokio::runtime::Runtime, client: &reqwest::Client) {
        let Some(packed) = PackedData::build(self.take_batch()) else {
            return;
        };

        let request = client
            .post(self.config.events_url.clone())
            .header(reqwest::header::AUTHORIZATION, self.config.server_sdk_key.as_str())
            .header(reqwest::header::USER_AGENT, self.config.user_agent.as_str())
            .json(&[packed])
            .send();

        let result = runtime
            .block_on(async { tokio::time::timeout(self.config.flush_interval, request).await });

        match result {
            Ok(Ok(response)) => {
                if let Err(err) = response.error_for_status() {
                    log::warn!(target: "featuregate", "event delivery rejected: {err}");
                }
            }
            Ok(Err(err)) => {
                log::warn!(target: "featuregate", "failed to deliver events: {err}");
            }
            Err(_elapsed) => {
                log::warn!(target: "featuregate", "event delivery timed out");
            }
        }
    }
}
