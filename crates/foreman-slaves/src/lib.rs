//! `foreman-slaves` — the built-in extensions.
//!
//! Each extension implements [`Extension`](foreman_registry::Extension) and
//! registers a group of slaves when the definition's `ext` list names it.

pub mod network;
pub mod shell;

use foreman_registry::Extension;

pub use network::NetworkExt;
pub use shell::ShellExt;

/// Every extension that ships with the binary. The host hands this to the
/// scheduler; the definition's `ext` list picks from it by name.
pub fn builtin_extensions() -> Vec<Box<dyn Extension>> {
    vec![Box::new(NetworkExt), Box::new(ShellExt)]
}
