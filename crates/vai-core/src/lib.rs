//! Core domain + application logic for the virtual-assistant insights toolkit.
//!
//! This crate is transport-agnostic. The internal REST API lives behind the
//! [`ports::MessagesApi`] port, implemented in adapter crates (`vai-api`).

pub mod config;
pub mod domain;
pub mod errors;
pub mod feed;
pub mod fetch;
pub mod logging;
pub mod message;
pub mod ports;
pub mod range;
pub mod sessions;
pub mod utils;
pub mod views;

pub use errors::{Error, Result};
