//! `foreman-registry` — the slave tree and the argument-conversion pipeline.
//!
//! A [`Slave`] is a named invocable unit with declared parameters; a slave
//! with children is a group, and the registry is simply the unnamed root
//! group. Jobs resolve slaves by dotted path at load time and hold them via
//! `Arc` for the life of the process.
//!
//! Arguments from the task definition are coerced to each parameter's
//! declared [`ParamType`] by the [`ConverterRegistry`] — once, at load —
//! and invocations read the converted values from their [`Context`].

pub mod context;
pub mod convert;
pub mod extension;
pub mod slave;

pub use context::Context;
pub use convert::{ConvertFn, ConverterRegistry, ParamType};
pub use extension::Extension;
pub use slave::{Param, RegistryError, Slave, SlaveCallback};
