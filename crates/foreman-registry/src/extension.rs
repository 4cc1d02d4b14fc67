use foreman_core::Result;

use crate::slave::Slave;

/// A loadable unit that populates the registry tree.
///
/// Extensions are handed the registry root explicitly during load — before
/// any task is constructed, since jobs resolve their slaves at load time.
/// There is no discovery step: the host assembles the available extensions
/// and the `ext` list of the definition picks from them by name.
pub trait Extension: Send + Sync {
    /// Name the `ext` list refers to this extension by.
    fn name(&self) -> &str;

    /// Register this extension's slaves and groups. Any error is a Setup
    /// failure and aborts startup.
    fn setup(&self, registry: &mut Slave) -> Result<()>;
}
