use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use foreman_core::SetupError;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::context::Context;
use crate::convert::ParamType;

/// Errors raised while building or resolving the slave tree.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A path segment named nothing at its level.
    #[error("No slave registered at \"{path}\" (nothing named \"{segment}\")")]
    NotFound { path: String, segment: String },

    /// The path resolved, but to a namespace with no callback.
    #[error("\"{path}\" is a group without a callback")]
    NotInvocable { path: String },

    /// Two slaves were registered under one name at the same level.
    #[error("\"{parent}\" already has a slave \"{name}\"")]
    Duplicate { parent: String, name: String },
}

impl From<RegistryError> for SetupError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound { path, .. } => SetupError::SlaveNotFound { path },
            RegistryError::NotInvocable { path } => SetupError::NotInvocable { path },
            RegistryError::Duplicate { parent, name } => {
                SetupError::DuplicateSlave { parent, name }
            }
        }
    }
}

/// A declared parameter of a slave: its name, expected type, and whether the
/// job table must provide it.
#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub ty: ParamType,
    pub required: bool,
    pub default: Option<Value>,
}

impl Param {
    pub fn required(name: impl Into<String>, ty: ParamType) -> Self {
        Self {
            name: name.into(),
            ty,
            required: true,
            default: None,
        }
    }

    pub fn optional(name: impl Into<String>, ty: ParamType, default: Value) -> Self {
        Self {
            name: name.into(),
            ty,
            required: false,
            default: Some(default),
        }
    }
}

/// The invocable side of a slave.
///
/// Implementations read their converted arguments from [`Context::kwargs`]
/// and return a JSON value; any error they raise is captured on the context
/// at the job boundary, never propagated into the scheduler.
#[async_trait]
pub trait SlaveCallback: Send + Sync {
    async fn call(&self, ctx: &Context) -> anyhow::Result<Value>;
}

/// A named unit of work in the registry tree.
///
/// A slave with children is a group (namespace); a group may itself carry a
/// callback and be invocable. The tree is built during load — extensions
/// get `&mut` access to the root — and is immutable afterwards, shared via
/// `Arc` with every job that resolved into it.
pub struct Slave {
    name: String,
    /// Qualified dotted path, assigned when the slave is added to a parent.
    path: String,
    description: String,
    params: Vec<Param>,
    callback: Option<Arc<dyn SlaveCallback>>,
    children: BTreeMap<String, Arc<Slave>>,
}

impl Slave {
    /// An invocable leaf.
    pub fn new(name: impl Into<String>, callback: impl SlaveCallback + 'static) -> Self {
        let name = name.into();
        Self {
            path: name.clone(),
            name,
            description: String::new(),
            params: Vec::new(),
            callback: Some(Arc::new(callback)),
            children: BTreeMap::new(),
        }
    }

    /// A pure namespace.
    pub fn group(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            path: name.clone(),
            name,
            description: String::new(),
            params: Vec::new(),
            callback: None,
            children: BTreeMap::new(),
        }
    }

    /// The unnamed root of a registry tree.
    pub fn root() -> Self {
        Self::group("")
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Qualified dotted path from the registry root.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn is_invocable(&self) -> bool {
        self.callback.is_some()
    }

    pub fn is_group(&self) -> bool {
        !self.children.is_empty()
    }

    /// Register a child, assigning its qualified path. Fails if the name is
    /// already taken at this level.
    pub fn add_slave(&mut self, mut slave: Slave) -> Result<(), RegistryError> {
        if self.children.contains_key(&slave.name) {
            return Err(RegistryError::Duplicate {
                parent: self.display_path().to_string(),
                name: slave.name.clone(),
            });
        }

        slave.set_path_prefix(&self.path);
        debug!(slave = %slave.path, "slave registered");
        self.children.insert(slave.name.clone(), Arc::new(slave));
        Ok(())
    }

    fn set_path_prefix(&mut self, prefix: &str) {
        self.path = if prefix.is_empty() {
            self.name.clone()
        } else {
            format!("{prefix}.{}", self.name)
        };
        // Re-key grandchildren that were added before this slave was parented.
        let children = std::mem::take(&mut self.children);
        for (key, child) in children {
            let mut child = Arc::try_unwrap(child).unwrap_or_else(|arc| (*arc).clone_node());
            child.set_path_prefix(&self.path);
            self.children.insert(key, Arc::new(child));
        }
    }

    fn clone_node(&self) -> Slave {
        Slave {
            name: self.name.clone(),
            path: self.path.clone(),
            description: self.description.clone(),
            params: self.params.clone(),
            callback: self.callback.clone(),
            children: self.children.clone(),
        }
    }

    fn display_path(&self) -> &str {
        if self.path.is_empty() {
            "<root>"
        } else {
            &self.path
        }
    }

    /// Resolve a dotted path through nested groups to an invocable slave.
    pub fn get_slave(&self, path: &str) -> Result<Arc<Slave>, RegistryError> {
        let mut node: Option<&Arc<Slave>> = None;
        let mut children = &self.children;

        for segment in path.split('.') {
            let next = children
                .get(segment)
                .ok_or_else(|| RegistryError::NotFound {
                    path: path.to_string(),
                    segment: segment.to_string(),
                })?;
            children = &next.children;
            node = Some(next);
        }

        match node {
            Some(slave) if slave.is_invocable() => Ok(Arc::clone(slave)),
            _ => Err(RegistryError::NotInvocable {
                path: path.to_string(),
            }),
        }
    }

    /// Every invocable slave below this node, in path order.
    pub fn walk(&self) -> Vec<Arc<Slave>> {
        let mut out = Vec::new();
        for child in self.children.values() {
            if child.is_invocable() {
                out.push(Arc::clone(child));
            }
            out.extend(child.walk());
        }
        out
    }

    /// Invoke the callback. Only called on slaves that resolved through
    /// [`Slave::get_slave`], which guarantees one exists.
    pub async fn invoke(&self, ctx: &Context) -> anyhow::Result<Value> {
        match &self.callback {
            Some(callback) => callback.call(ctx).await,
            None => anyhow::bail!("slave \"{}\" has no callback", self.display_path()),
        }
    }
}

impl fmt::Debug for Slave {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Slave")
            .field("path", &self.path)
            .field("invocable", &self.is_invocable())
            .field("children", &self.children.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Echo;

    #[async_trait]
    impl SlaveCallback for Echo {
        async fn call(&self, ctx: &Context) -> anyhow::Result<Value> {
            Ok(Value::Object(ctx.kwargs.clone()))
        }
    }

    fn tree() -> Slave {
        let mut root = Slave::root();
        let mut group = Slave::group("group");
        let mut sub = Slave::group("sub");
        sub.add_slave(Slave::new("worker", Echo)).unwrap();
        group.add_slave(sub).unwrap();
        root.add_slave(group).unwrap();
        root
    }

    #[test]
    fn resolves_through_nested_groups() {
        let root = tree();
        let slave = root.get_slave("group.sub.worker").unwrap();
        assert_eq!(slave.path(), "group.sub.worker");
        assert!(slave.is_invocable());
    }

    #[test]
    fn path_ending_at_namespace_is_not_invocable() {
        let root = tree();
        let err = root.get_slave("group.sub").unwrap_err();
        assert!(matches!(err, RegistryError::NotInvocable { ref path } if path == "group.sub"));
    }

    #[test]
    fn missing_segment_is_named() {
        let root = tree();
        let err = root.get_slave("group.nope.worker").unwrap_err();
        assert!(matches!(err, RegistryError::NotFound { ref segment, .. } if segment == "nope"));
    }

    #[test]
    fn duplicate_registration_fails() {
        let mut root = Slave::root();
        root.add_slave(Slave::new("w", Echo)).unwrap();
        let err = root.add_slave(Slave::new("w", Echo)).unwrap_err();
        assert!(matches!(err, RegistryError::Duplicate { ref name, .. } if name == "w"));
    }

    #[test]
    fn walk_lists_invocable_slaves_in_path_order() {
        let mut root = tree();
        root.add_slave(Slave::new("alpha", Echo)).unwrap();
        let paths: Vec<String> = root.walk().iter().map(|s| s.path().to_string()).collect();
        assert_eq!(paths, vec!["alpha", "group.sub.worker"]);
    }

    #[tokio::test]
    async fn invoke_passes_kwargs_through() {
        let root = tree();
        let slave = root.get_slave("group.sub.worker").unwrap();
        let mut ctx = Context::new();
        ctx.kwargs.insert("x".to_string(), json!(1));
        assert_eq!(slave.invoke(&ctx).await.unwrap(), json!({"x": 1}));
    }
}
