//! # Energy Statusline
//!
//! A statusline utility for Claude Code sessions that accumulates token usage
//! per day and turns it into an order-of-magnitude energy estimate.
//!
//! ## Overview
//!
//! Each invocation reads one usage snapshot from stdin, decides whether a new
//! API call started since the session's previous snapshot, folds the deltas
//! into a per-day state file exactly once per call, and prints:
//! - Model and context window utilization
//! - 5-hour and 7-day quota percentages (when available)
//! - Day, week and month token totals with energy estimates
//!
//! Many processes run this concurrently, so every update to the day file
//! happens under an exclusive file lock and is written atomically.
//!
//! ## Features
//!
//! - `colors` (default): Enables colored percentages via owo-colors

/// Week and month totals over the history archive plus today
pub mod aggregate;

/// New-call detection from cumulative counters and cache fields
pub mod boundary;

/// Command-line argument parsing and configuration
pub mod cli;

/// Status line and report formatting
pub mod display;

/// Atomic file replacement and append-only writes
pub mod durable;

/// Energy constants, estimates and snapped display
pub mod energy;

/// Append-only archive of completed days
pub mod history;

/// Tracing subscriber setup
pub mod logging;

/// Data models for snapshots and persisted state
pub mod models;

/// Per-session delta accumulation
pub mod session;

/// Locked, crash-safe daily state store
pub mod store;

/// Online quota percentages from the Claude OAuth API
pub mod usage_api;

/// Utility functions for paths and formatting
pub mod utils;
