//! # memberof-core
//!
//! Core types and utilities for querying a directory service for group membership.
//!
//! This crate provides the error taxonomy, the run configuration and the credential
//! collaborator contract shared by the directory-access layer and the command-line tools.
//!
//! ## Modules
//!
//! - [`error`] - Error taxonomy and machine-readable error codes
//! - [`config`] - Directory configuration loaded once at startup
//! - [`credentials`] - Bind credentials and the credential-prompt contract

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod credentials;
pub mod error;

// Re-export commonly used types
pub use config::DirectoryConfig;
pub use credentials::{BindCredentials, CredentialPrompt, FixedCredentials};
pub use error::{Error, Result};
