//! `featuregate_core` is the building-block library behind the FeatureGate SDK. If you're a
//! FeatureGate user, you probably want the [`featuregate`](https://crates.io/crates/featuregate)
//! crate instead.
//!
//! # Overview
//!
//! [`Repository`](toggle::Repository) is the heart of the SDK: an immutable snapshot of every
//! toggle and segment definition the server knows about. A repository is never mutated in
//! place; whenever new data arrives, the whole snapshot is replaced.
//!
//! [`RepositoryStore`](repository_store::RepositoryStore) is a thread-safe holder for the
//! currently active [`Repository`](toggle::Repository). Readers receive a snapshot that is not
//! affected by later writes, so a single evaluation always sees a consistent view.
//!
//! [`RepositoryFetcher`](repository_fetcher::RepositoryFetcher) is an HTTP client that knows how
//! to download a snapshot from the server. It's best to save and reuse the same instance, so it
//! can reuse the connection.
//!
//! [`Synchronizer`](synchronizer::Synchronizer) launches a background thread that periodically
//! fetches a fresh snapshot (using `RepositoryFetcher`) and publishes it into the
//! `RepositoryStore`. It exposes a readiness gate for callers that want to wait for the first
//! snapshot.
//!
//! [`toggle`] contains the data model and the evaluation engine.
//! [`Toggle::eval_detail`](toggle::Toggle::eval_detail) is a pure function: it performs no I/O,
//! takes no locks, and never fails. Abnormal inputs degrade to an outcome the caller resolves
//! with its own default value.
//!
//! [`EventRecorder`](events::EventRecorder) aggregates per-evaluation
//! [`AccessEvent`](events::AccessEvent)s into compact usage counters and ships them to the
//! collector on a fixed interval, off the evaluation path.
//!
//! An SDK facade is built from a `RepositoryStore`, a `Synchronizer`, and an `EventRecorder`.
//!
//! # Versioning
//!
//! This library follows semver. However, it is considered an internal library, so expect frequent
//! breaking changes and major version bumps.

#![warn(rustdoc::missing_crate_level_docs)]

pub mod events;
pub mod repository_fetcher;
pub mod repository_store;
pub mod sharder;
pub mod synchronizer;
pub mod toggle;

mod error;
mod user;

pub use error::{Error, Result};
pub use user::FPUser;
