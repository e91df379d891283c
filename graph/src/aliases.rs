//! Symbolic names for live nodes.

use std::collections::BTreeMap;

use reach_types::{Missing, NodeId, ReachError};

/// `name -> node` bindings. Names are unique; liveness of the bound node is
/// maintained by the owning [`Graph`](crate::Graph).
#[derive(Debug, Clone, Default)]
pub struct AliasRegistry {
    by_name: BTreeMap<String, NodeId>,
}

impl AliasRegistry {
    /// Names may not be empty or contain `@`, `#`, or whitespace; those
    /// characters are reserved by node references (`@name`, `#init`).
    pub fn validate_name(name: &str) -> Result<(), ReachError> {
        if name.is_empty() {
            return Err(ReachError::InvalidArgument("alias name is empty".into()));
        }
        if let Some(bad) = name
            .chars()
            .find(|c| *c == '@' || *c == '#' || c.is_whitespace())
        {
            return Err(ReachError::InvalidArgument(format!(
                "alias `{name}` may not contain {bad:?}"
            )));
        }
        Ok(())
    }

    pub fn bind(&mut self, name: &str, node: NodeId) -> Result<(), ReachError> {
        Self::validate_name(name)?;
        if let Some(existing) = self.by_name.get(name) {
            return Err(ReachError::AliasExists {
                name: name.to_string(),
                node: *existing,
            });
        }
        self.by_name.insert(name.to_string(), node);
        Ok(())
    }

    pub fn unbind(&mut self, name: &str) -> Result<NodeId, ReachError> {
        self.by_name
            .remove(name)
            .ok_or_else(|| ReachError::NotFound(Missing::Alias(name.to_string())))
    }

    pub fn resolve(&self, name: &str) -> Result<NodeId, ReachError> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| ReachError::NotFound(Missing::Alias(name.to_string())))
    }

    #[must_use]
    pub fn names_for(&self, node: NodeId) -> Vec<&str> {
        self.by_name
            .iter()
            .filter(|(_, bound)| **bound == node)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Drop every alias bound to `node`, returning the removed names.
    pub fn release_node(&mut self, node: NodeId) -> Vec<String> {
        let names: Vec<String> = self
            .names_for(node)
            .into_iter()
            .map(str::to_string)
            .collect();
        for name in &names {
            self.by_name.remove(name);
        }
        names
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, NodeId)> {
        self.by_name.iter().map(|(name, id)| (name.as_str(), *id))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}
