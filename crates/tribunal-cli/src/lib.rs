//! # tribunal-cli — command implementations
//!
//! Subcommand handlers for the `tribunal` binary:
//!
//! - [`config`]: load and validate the YAML application config
//! - [`serve`]: run the API server
//! - [`spec`]: dump the OpenAPI specification

pub mod config;
pub mod serve;
pub mod spec;
