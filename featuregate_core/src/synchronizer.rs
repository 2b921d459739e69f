//! A background thread that periodically fetches the toggle snapshot from the server and
//! publishes it into a repository store.
use std::{
    sync::{mpsc::RecvTimeoutError, Arc, Condvar, Mutex},
    time::{Duration, Instant},
};

use rand::{thread_rng, Rng};

use crate::repository_fetcher::RepositoryFetcher;
use crate::repository_store::RepositoryStore;
use crate::{Error, Result};

/// Configuration for [`Synchronizer`].
// Not implementing `Copy` as we may add non-copyable fields in the future.
#[derive(Debug, Clone)]
pub struct SynchronizerConfig {
    /// Interval to wait between requests for a fresh snapshot.
    ///
    /// Defaults to [`SynchronizerConfig::DEFAULT_REFRESH_INTERVAL`].
    pub interval: Duration,
    /// Jitter applies a randomized duration to wait between requests. This helps to avoid
    /// multiple server instances synchronizing and producing spiky network load.
    pub jitter: Duration,
}

impl SynchronizerConfig {
    /// Default value for [`SynchronizerConfig::interval`].
    pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_millis(2000);

    /// Create a new `SynchronizerConfig` using default configuration.
    pub fn new() -> SynchronizerConfig {
        SynchronizerConfig::default()
    }

    /// Update refresh interval with `interval`.
    pub fn with_interval(mut self, interval: Duration) -> SynchronizerConfig {
        self.interval = interval;
        self
    }

    /// Update refresh interval jitter with `jitter`.
    pub fn with_jitter(mut self, jitter: Duration) -> SynchronizerConfig {
        self.jitter = jitter;
        self
    }
}

impl Default for SynchronizerConfig {
    fn default() -> SynchronizerConfig {
        SynchronizerConfig {
            interval: SynchronizerConfig::DEFAULT_REFRESH_INTERVAL,
            jitter: SynchronizerConfig::DEFAULT_REFRESH_INTERVAL / 10,
        }
    }
}

/// A snapshot synchronizer thread.
///
/// The synchronizer polls the server periodically to fetch the latest snapshot using
/// [`RepositoryFetcher`] and publishes it into [`RepositoryStore`] via an atomic replace, so
/// concurrent evaluation never observes a partially updated snapshot.
pub struct Synchronizer {
    join_handle: std::thread::JoinHandle<()>,

    /// Used to send a stop command to the synchronizer thread.
    stop_sender: std::sync::mpsc::SyncSender<()>,

    /// Holds `None` if a snapshot hasn't been fetched yet. Holds `Some(Ok(()))` once a snapshot
    /// has been fetched successfully. Holds `Some(Err(...))` if fetching failed terminally.
    first_fetch: Arc<(Mutex<Option<Result<()>>>, Condvar)>,
}

impl Synchronizer {
    /// Starts the synchronizer thread with default configuration.
    ///
    /// # Errors
    ///
    /// Returns an IO Error if the synchronizer thread failed to start.
    pub fn start(
        fetcher: RepositoryFetcher,
        store: Arc<RepositoryStore>,
    ) -> std::io::Result<Synchronizer> {
        Synchronizer::start_with_config(fetcher, store, SynchronizerConfig::default())
    }

    /// Starts the synchronizer thread with the provided configuration.
    ///
    /// # Errors
    ///
    /// Returns an IO Error if the synchronizer thread failed to start.
    pub fn start_with_config(
        mut fetcher: RepositoryFetcher,
        store: Arc<RepositoryStore>,
        config: SynchronizerConfig,
    ) -> std::io::Result<Synchronizer> {
        // Using `sync_channel` here as it makes `stop_sender` `Sync` (shareable between
        // threads). Buffer size of 1 should be enough for our use case as we're sending a stop
        // command, and we can simply `try_send()` and ignore if the buffer is full (another
        // thread has sent a stop command already).
        let (stop_sender, stop_receiver) = std::sync::mpsc::sync_channel::<()>(1);

        let first_fetch = Arc::new((Mutex::new(None), Condvar::new()));

        let join_handle = {
            // Cloning Arc for move into thread
            let first_fetch = Arc::clone(&first_fetch);
            let update_result = move |value| {
                *first_fetch.0.lock().unwrap() = Some(value);
                first_fetch.1.notify_all();
            };

            std::thread::Builder::new()
                .name("featuregate-sync".to_owned())
                .spawn(move || {
                    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                        let runtime = match tokio::runtime::Builder::new_current_thread()
                            .enable_all()
                            .build()
                        {
                            Ok(runtime) => runtime,
                            Err(err) => {
                                update_result(Err(Error::from(err)));
                                return;
                            }
                        };

                        loop {
                            let result = runtime.block_on(fetcher.fetch_repository());
                            match result {
                                Ok(repository) => {
                                    store.set_repository(Arc::new(repository));
                                    update_result(Ok(()));
                                }
                                Err(err @ Error::Unauthorized) => {
                                    // Unrecoverable: the server will keep rejecting this key.
                                    update_result(Err(err));
                                    return;
                                }
                                Err(err) => {
                                    // Other errors are retried on the next cycle; the last
                                    // successfully published snapshot stays authoritative.
                                    log::warn!(target: "featuregate", "failed to fetch snapshot: {err}");
                                }
                            };

                            let timeout = jitter(config.interval, config.jitter);
                            match stop_receiver.recv_timeout(timeout) {
                                Err(RecvTimeoutError::Timeout) => {
                                    // Timed out. Loop back to fetch a fresh snapshot.
                                }
                                Ok(()) => {
                                    log::debug!(target: "featuregate", "synchronizer received stop command");
                                    return;
                                }
                                Err(RecvTimeoutError::Disconnected) => {
                                    // When the other end of channel disconnects, calls to
                                    // .recv_timeout() return immediately. Stop the thread.
                                    log::debug!(target: "featuregate", "synchronizer stop channel disconnected");
                                    return;
                                }
                            }
                        }
                    }));

                    // If catch_unwind returns Err, it means a panic occurred.
                    if result.is_err() {
                        update_result(Err(Error::SyncThreadPanicked));
                    }
                })?
        };

        Ok(Synchronizer {
            join_handle,
            stop_sender,
            first_fetch,
        })
    }

    /// Readiness gate: block until the first fetch lands (successfully or terminally) or
    /// `timeout` elapses.
    ///
    /// # Errors
    ///
    /// - [`Error::InitializationTimeout`] if no fetch completed within `timeout`.
    /// - [`Error::Unauthorized`] if the server rejected the SDK key.
    /// - [`Error::SyncThreadPanicked`] if the synchronizer thread panicked.
    pub fn wait_for_initialization(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        let mut lock = self
            .first_fetch
            .0
            .lock()
            .map_err(|_| Error::SyncThreadPanicked)?;
        loop {
            match &*lock {
                Some(result) => {
                    // The synchronizer has already fetched a snapshot. Return Ok(()) or a
                    // possible error.
                    return result.clone();
                }
                None => {
                    let remaining = match deadline.checked_duration_since(Instant::now()) {
                        Some(remaining) if !remaining.is_zero() => remaining,
                        _ => return Err(Error::InitializationTimeout),
                    };
                    // Block waiting for the snapshot to get fetched.
                    let (guard, _timed_out) = self
                        .first_fetch
                        .1
                        .wait_timeout(lock, remaining)
                        .map_err(|_| Error::SyncThreadPanicked)?;
                    lock = guard;
                }
            }
        }
    }

    /// Stop the synchronizer thread, cancelling any future polling.
    ///
    /// This function does not wait for the thread to actually stop.
    pub fn stop(&self) {
        // Error means that the receiver was dropped (thread exited) or the channel buffer is
        // full. First case can be ignored as there's nothing useful we can do—thread is already
        // stopped. Second case can be ignored as it indicates that another thread already sent a
        // stop command and the thread will stop anyway.
        let _ = self.stop_sender.try_send(());
    }

    /// Stop the synchronizer thread and block waiting for it to exit.
    ///
    /// If you don't need to wait for the thread to exit, use [`Synchronizer::stop`] instead.
    ///
    /// # Errors
    ///
    /// - [`Error::SyncThreadPanicked`] if the thread has panicked.
    pub fn shutdown(self) -> Result<()> {
        // Send stop signal in case it wasn't sent before.
        self.stop();

        // Error means that the thread has panicked and there's nothing useful we can do in that
        // case.
        self.join_handle
            .join()
            .map_err(|_| Error::SyncThreadPanicked)?;

        Ok(())
    }
}

/// Apply randomized `jitter` to `interval`.
fn jitter(interval: Duration, jitter: Duration) -> Duration {
    Duration::saturating_sub(interval, thread_rng().gen_range(Duration::ZERO..=jitter))
}
