//! Augur - organization forecasting with AI-assisted forecast authoring.
//!
//! Members of an organization predict the outcome of binary, continuous and
//! categorical forecasts, either individually or on behalf of their group.
//! Once a forecast's actual value is known every prediction is scored and the
//! results roll up into user, group and category leaderboards. Organization
//! admins can draft new forecasts through a streamed chat with a hosted model
//! that calls forecast tools.
//!
//! # Architecture
//!
//! - [`domain`] - Storage-agnostic types and rules: submission exclusivity,
//!   scoring, leaderboard projections, transcripts
//! - [`port`] - Traits the application needs from the outside world
//! - [`application`] - Use cases run against an explicit request context
//! - [`adapter`] - SQLite store, OpenAI client, AES-GCM cipher, HTTP and CLI
//! - [`infrastructure`] - Configuration and runtime wiring
//! - [`error`] - Crate-wide error types

pub mod adapter;
pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod port;
