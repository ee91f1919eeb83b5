//! Category discovery for host machines.
//!
//! Host machines do not share a common "recipe table" accessor. Each
//! [`CategoryProbe`] knows one way of asking; [`CategoryDiscovery`] tries them in
//! a fixed priority order and stops at the first answer. "Unsupported" is
//! `None`, never an error.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::RecipeCatalog;

/// What the host exposes about a machine.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineDescriptor {
    pub kind: String,
    /// Category the machine declares through a typed accessor, if it has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub declared_category: Option<String>,
    /// Loosely-typed properties (e.g. read from the host's block data).
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl MachineDescriptor {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ..Self::default()
        }
    }

    pub fn declaring(mut self, category: impl Into<String>) -> Self {
        self.declared_category = Some(category.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

pub trait CategoryProbe: Send + Sync {
    fn name(&self) -> &'static str;

    fn probe(&self, machine: &MachineDescriptor) -> Option<String>;
}

/// Uses the machine's typed category accessor.
#[derive(Clone, Copy, Debug, Default)]
pub struct DeclaredCategoryProbe;

impl CategoryProbe for DeclaredCategoryProbe {
    fn name(&self) -> &'static str {
        "declared"
    }

    fn probe(&self, machine: &MachineDescriptor) -> Option<String> {
        machine
            .declared_category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
    }
}

/// Looks the category up in the machine's attributes, first key wins.
#[derive(Clone, Debug)]
pub struct AttributeCategoryProbe {
    keys: Vec<String>,
}

impl AttributeCategoryProbe {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }
}

impl Default for AttributeCategoryProbe {
    fn default() -> Self {
        Self::new(["recipe_map", "recipeMap", "category"])
    }
}

impl CategoryProbe for AttributeCategoryProbe {
    fn name(&self) -> &'static str {
        "attribute"
    }

    fn probe(&self, machine: &MachineDescriptor) -> Option<String> {
        self.keys
            .iter()
            .filter_map(|k| machine.attributes.get(k))
            .map(|v| v.trim())
            .find(|v| !v.is_empty())
            .map(str::to_string)
    }
}

/// Ordered probe list.
pub struct CategoryDiscovery {
    probes: Vec<Box<dyn CategoryProbe>>,
}

impl CategoryDiscovery {
    pub fn empty() -> Self {
        Self { probes: Vec::new() }
    }

    /// Declared accessor first, attributes second.
    pub fn standard() -> Self {
        Self::empty()
            .with(DeclaredCategoryProbe)
            .with(AttributeCategoryProbe::default())
    }

    pub fn with(mut self, probe: impl CategoryProbe + 'static) -> Self {
        self.probes.push(Box::new(probe));
        self
    }

    pub fn probe_names(&self) -> Vec<&'static str> {
        self.probes.iter().map(|p| p.name()).collect()
    }

    pub fn discover(&self, machine: &MachineDescriptor) -> Option<String> {
        for p in &self.probes {
            if let Some(found) = p.probe(machine) {
                tracing::debug!(machine = %machine.kind, probe = p.name(), category = %found, "category discovered");
                return Some(found);
            }
        }
        None
    }

    /// Like [`Self::discover`], but a probe's answer only counts if the catalog
    /// knows that category; otherwise the next probe is tried.
    pub fn discover_known(
        &self,
        machine: &MachineDescriptor,
        catalog: &dyn RecipeCatalog,
    ) -> Option<String> {
        let known = catalog.list_categories();
        self.probes
            .iter()
            .filter_map(|p| p.probe(machine))
            .find(|c| known.iter().any(|k| &k.id == c))
    }
}

impl Default for CategoryDiscovery {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{InMemoryCatalog, StoredRecipe};

    #[test]
    fn declared_probe_has_priority() {
        let m = MachineDescriptor::new("gt_mixer")
            .declaring("gt.recipe.mixer")
            .with_attribute("recipe_map", "gt.recipe.other");
        let d = CategoryDiscovery::standard();
        assert_eq!(d.discover(&m).as_deref(), Some("gt.recipe.mixer"));
        assert_eq!(d.probe_names(), vec!["declared", "attribute"]);
    }

    #[test]
    fn falls_through_to_attributes_then_none() {
        let d = CategoryDiscovery::standard();
        let m = MachineDescriptor::new("x")
            .declaring("  ")
            .with_attribute("recipeMap", "gt.recipe.blender");
        assert_eq!(d.discover(&m).as_deref(), Some("gt.recipe.blender"));

        let bare = MachineDescriptor::new("chest");
        assert_eq!(d.discover(&bare), None);
        assert_eq!(CategoryDiscovery::empty().discover(&m), None);
    }

    #[test]
    fn discover_known_skips_unknown_answers() {
        let mut catalog = InMemoryCatalog::new();
        catalog.add_category("gt.recipe.blender", "Blender", Vec::<StoredRecipe>::new());
        let m = MachineDescriptor::new("x")
            .declaring("gt.recipe.unknown")
            .with_attribute("category", "gt.recipe.blender");
        let d = CategoryDiscovery::standard();
        assert_eq!(
            d.discover_known(&m, &catalog).as_deref(),
            Some("gt.recipe.blender")
        );
    }
}
