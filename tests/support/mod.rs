//! Shared test support for integration tests.

#![allow(dead_code)]

pub mod fixtures;
pub mod scripted_model;
pub mod temp_db;
