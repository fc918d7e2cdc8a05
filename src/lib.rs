//! Discprobe - media inspection service for video files, BDMV folders and ISOs
//!
//! This library crate exposes the core functionality for integration testing.

pub mod archive;
pub mod command;
pub mod config;
pub mod error;
pub mod mount;
pub mod paths;
pub mod report;
pub mod server;
pub mod shots;
pub mod source;
pub mod tools;
