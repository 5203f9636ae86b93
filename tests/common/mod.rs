//! Shared fixtures for the integration tests: scripted metric backends, a
//! recording action executor and configuration builders.

#![allow(dead_code)]

pub mod builders;
pub mod mocks;

pub use builders::{process_table, TestConfigBuilder};
pub use mocks::{RecordingExecutor, ScriptedBackend};
