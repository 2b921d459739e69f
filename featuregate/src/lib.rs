//! The Rust server-side SDK for FeatureGate, a feature-toggle management platform.
//!
//! # Overview
//!
//! The SDK revolves around a [`Client`] that evaluates toggle values for users, where each
//! [`FPUser`] has an identity key and key-value attributes associated with it. The client keeps a
//! local snapshot of toggle definitions fresh with a background synchronizer, so evaluation is a
//! pure in-memory computation that never waits on the network.
//!
//! # Typed accessors
//!
//! Every toggle serves values of one kind (boolean, string, number, or JSON) and should be read
//! through the matching accessor:
//! - [`Client::bool_value()`] / [`Client::bool_detail()`]
//! - [`Client::string_value()`] / [`Client::string_detail()`]
//! - [`Client::number_value()`] / [`Client::number_detail()`]
//! - [`Client::json_value()`] / [`Client::json_detail()`]
//!
//! Accessors never return an error: every unresolved case (unknown toggle, no snapshot yet, a
//! variation kind that doesn't match the accessor, malformed serve configuration) degrades to the
//! caller-supplied default value, and the `*_detail` variants report the reason. This lets
//! callers embed evaluation on hot paths without error-handling branches.
//!
//! # Usage telemetry
//!
//! Every evaluation call is recorded and aggregated into compact usage counters, delivered to the
//! collector in the background. Delivery is best-effort and never blocks evaluation.
//!
//! # Logging
//!
//! The package uses the [`log`](https://docs.rs/log/latest/log/) crate for logging messages under
//! the `featuregate` target. Consider integrating a `log`-compatible logger implementation for
//! better visibility into SDK operations.

#![warn(rustdoc::missing_crate_level_docs)]
#![warn(missing_docs)]

mod client;
mod config;

#[doc(inline)]
pub use featuregate_core::{
    toggle::{EvalDetail, Repository, Segment, Toggle, Variant},
    Error, FPUser, Result,
};

pub use client::{Client, Detail};
pub use config::ClientConfig;
