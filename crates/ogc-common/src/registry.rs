//! Insertion-ordered registry of served layers.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{OgcError, OgcResult};
use crate::layer::Layer;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RegistryError {
    #[error("Layer '{0}' is already registered")]
    DuplicateLayer(String),
}

/// Layers by name, in registration order.
///
/// Populated once at startup, then shared read-only.
#[derive(Debug, Default)]
pub struct LayerRegistry {
    layers: Vec<Arc<Layer>>,
    index: HashMap<String, usize>,
}

impl LayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a layer. Names are unique.
    pub fn register(&mut self, layer: Layer) -> Result<(), RegistryError> {
        if self.index.contains_key(layer.name()) {
            return Err(RegistryError::DuplicateLayer(layer.name().to_string()));
        }
        self.index.insert(layer.name().to_string(), self.layers.len());
        self.layers.push(Arc::new(layer));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Layer>> {
        self.index.get(name).map(|&i| &self.layers[i])
    }

    /// Look up a layer, failing with `LayerNotDefined`.
    pub fn require(&self, name: &str) -> OgcResult<&Arc<Layer>> {
        self.get(name)
            .ok_or_else(|| OgcError::LayerNotDefined(name.to_string()))
    }

    /// Layers in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Layer>> {
        self.layers.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.layers.iter().map(|l| l.name())
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

impl<'a> IntoIterator for &'a LayerRegistry {
    type Item = &'a Arc<Layer>;
    type IntoIter = std::slice::Iter<'a, Arc<Layer>>;

    fn into_iter(self) -> Self::IntoIter {
        self.layers.iter()
    }
}
