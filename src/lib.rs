//! mediadetect - removable media detection daemon.
//!
//! Watches the disk-management bus for inserted media, classifies each
//! medium with a configurable chain of testers (audio CD, video DVD,
//! file trees by suffix) and hands the matching action keys to a sink.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::{path::Path, sync::Arc};
//!
//! use mediadetect::{
//!     detector::{DetectorSettings, MediaDetector},
//!     services::UDisksEventSource,
//! };
//!
//! # async fn run() -> mediadetect::Result<()> {
//! let source = Arc::new(UDisksEventSource::connect().await?);
//! let mut detector = MediaDetector::initialize(
//!     source,
//!     Path::new("/etc/mediadetect.conf"),
//!     DetectorSettings::default(),
//! )
//! .await?;
//!
//! while let Some(detection) = detector.detect().await {
//!     println!("{}: {:?}", detection.description, detection.keys);
//! }
//! # Ok(())
//! # }
//! ```

/// Daemon settings file and paths.
pub mod config;

/// Core error types and result aliases.
pub mod core;

/// Device event loop, media testers and their registry.
pub mod detector;

/// Delivery of detections to an action sink.
pub mod dispatch;

/// Parser for the media rules file.
pub mod rules;

/// System services feeding the detector.
pub mod services;

/// Logging setup.
pub mod tracing_config;

/// Re-exported core types for convenience.
pub use core::{MediaDetectError, Result};
