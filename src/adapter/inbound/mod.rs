//! Inbound adapters: the HTTP server and the command line.

pub mod cli;
pub mod http;
