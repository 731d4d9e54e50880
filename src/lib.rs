//! cms-sync - Pull and push the full content graph of a headless CMS instance
//!
//! This crate provides the core functionality for the `cms-sync` CLI tool.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface using clap
//! - [`model`] - Data types for the seven entity kinds
//! - [`store`] - Local Store (JSON documents on disk)
//! - [`remote`] - Management API client
//! - [`mapper`] - Source ↔ target Reference Mapper
//! - [`sync`] - Pull and push orchestration
//! - [`progress`] - Typed progress events
//! - [`log`] - Run logger and its sinks
//! - [`config`] - Configuration management
//! - [`error`] - Error types and handling

#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod error;
pub mod log;
pub mod mapper;
pub mod model;
pub mod progress;
pub mod remote;
pub mod store;
pub mod sync;
pub mod validate;

pub use error::{Error, Result};
