//! Subgrab Core Library
//!
//! This library provides the subtitle resolution engine behind the `subgrab`
//! tool: it derives catalog identifiers from video file names, scrapes a
//! subtitle catalog for the best English match and saves it beside the video.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`identifier`] - Catalog code extraction from file names
//! - [`provider`] - Catalog providers, safe-fetch and the fallback chain
//! - [`resolution`] - Per-run cache and outbound concurrency gate
//! - [`batch`] - Worker pool and shared progress counters
//! - [`retry`] - Retry policy shared by requests and protocol stages
//! - [`scan`] - Directory enumeration
//! - [`video`] - Video descriptors and subtitle naming
//! - [`trace`] - Per-video human-readable trace log

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod batch;
pub mod identifier;
pub mod provider;
pub mod resolution;
pub mod retry;
pub mod scan;
pub mod trace;
mod user_agent;
pub mod video;

// Re-export commonly used types
pub use batch::{BatchError, BatchOptions, BatchOrchestrator, BatchSnapshot, BatchStatus, VideoError};
pub use provider::{
    Provider, ProviderChain, ProviderError, ProviderPriority, ProviderSettings, ResolveError,
    SubtitleCatProvider, SubtitleResult, build_default_provider_chain,
};
pub use resolution::{ConcurrencyGate, ResolutionCache, ResolutionContext, resolve_cached};
pub use retry::{Backoff, FailureType, RetryDecision, RetryPolicy};
pub use scan::{ScanError, scan_videos};
pub use trace::TraceLog;
pub use video::{SubtitleNaming, VideoDescriptor, VideoStatus};
