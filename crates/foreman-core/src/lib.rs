//! `foreman-core` — shared error taxonomy and the resolved-configuration
//! provider.
//!
//! Everything that can go wrong while building a schedule is a
//! [`SetupError`]: raised during load, fatal to startup, and carrying a
//! human-readable [`hint`](SetupError::hint). Runtime worker failures are a
//! different animal — they are captured on the execution context and never
//! surface as errors at all.

pub mod config;
pub mod error;

pub use config::{Document, Environment, ExtNames};
pub use error::{ConversionError, Result, SetupError};
