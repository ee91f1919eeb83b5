use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use pgen_schemas::{ItemStack, RecipeEntry};

use crate::{
    match_categories, CategoryDiscovery, CategoryInfo, MachineDescriptor, RecipeCatalog, TagIndex,
};

// ---------------------------------------------------------------------------
// File format
// ---------------------------------------------------------------------------

/// JSON dump of a recipe catalog.
///
/// ```json
/// { "categories": [ { "id": "gt.recipe.mixer", "display_name": "Mixer",
///                     "recipes": [ { "inputs": [...], "outputs": [...], "enabled": true } ] } ],
///   "tags": { "dustIron": [ { "id": "gregtech:gt.metaitem.01", "variant": 2032, "amount": 1 } ] },
///   "machines": [ { "kind": "gt_mixer_lv", "attributes": { "recipe_map": "gt.recipe.mixer" } } ] }
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CatalogFile {
    #[serde(default)]
    pub categories: Vec<CategoryRecord>,
    /// Explicit tag registrations. Take precedence over tags discovered on recipe items.
    #[serde(default)]
    pub tags: BTreeMap<String, Vec<ItemStack>>,
    /// Machines a requester can point at instead of naming a category.
    #[serde(default)]
    pub machines: Vec<MachineDescriptor>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CategoryRecord {
    pub id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub recipes: Vec<StoredRecipe>,
}

/// A catalog recipe plus its host-side enabled flag.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoredRecipe {
    #[serde(flatten)]
    pub recipe: RecipeEntry,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

impl From<RecipeEntry> for StoredRecipe {
    fn from(recipe: RecipeEntry) -> Self {
        Self {
            recipe,
            enabled: true,
        }
    }
}

// ---------------------------------------------------------------------------
// InMemoryCatalog
// ---------------------------------------------------------------------------

/// Catalog held entirely in memory. Categories keep registration order.
#[derive(Clone, Debug, Default)]
pub struct InMemoryCatalog {
    categories: Vec<CategoryRecord>,
    tags: BTreeMap<String, Vec<ItemStack>>,
    machines: Vec<MachineDescriptor>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or extend) a category.
    ///
    /// Recipes with a blank `category` inherit `id`. Item tags seen on the
    /// recipes are added to the tag index after any explicit registrations.
    pub fn add_category<I>(&mut self, id: &str, display_name: &str, recipes: I)
    where
        I: IntoIterator<Item = StoredRecipe>,
    {
        let idx = match self.categories.iter().position(|c| c.id == id) {
            Some(i) => i,
            None => {
                self.categories.push(CategoryRecord {
                    id: id.to_string(),
                    display_name: display_name.to_string(),
                    recipes: Vec::new(),
                });
                self.categories.len() - 1
            }
        };

        for mut stored in recipes {
            if stored.recipe.category.trim().is_empty() {
                stored.recipe.category = id.to_string();
            }
            for item in stored.recipe.inputs.iter().chain(&stored.recipe.outputs) {
                for tag in &item.tags {
                    self.register_tag(tag, item.clone());
                }
            }
            self.categories[idx].recipes.push(stored);
        }
    }

    /// Add `item` as a member of `tag` (appended after existing members).
    pub fn register_tag(&mut self, tag: &str, item: ItemStack) {
        let members = self.tags.entry(tag.to_string()).or_default();
        if !members.iter().any(|m| m.key() == item.key()) {
            members.push(item);
        }
    }

    /// Register a machine; a later descriptor of the same kind replaces the earlier one.
    pub fn add_machine(&mut self, machine: MachineDescriptor) {
        match self.machines.iter_mut().find(|m| m.kind == machine.kind) {
            Some(existing) => *existing = machine,
            None => self.machines.push(machine),
        }
    }

    pub fn machines(&self) -> &[MachineDescriptor] {
        &self.machines
    }

    pub fn machine(&self, kind: &str) -> Option<&MachineDescriptor> {
        self.machines.iter().find(|m| m.kind == kind)
    }

    /// Category of machine `kind`, if it is registered and a probe names a
    /// category this catalog holds.
    pub fn category_for_machine(&self, kind: &str, discovery: &CategoryDiscovery) -> Option<String> {
        let machine = self.machine(kind)?;
        discovery.discover_known(machine, self)
    }

    pub fn from_file_contents(file: CatalogFile) -> Result<Self> {
        let mut catalog = Self::new();
        for (tag, members) in file.tags {
            for item in members {
                catalog.register_tag(&tag, item);
            }
        }
        for record in file.categories {
            if record.id.trim().is_empty() {
                bail!("catalog category with empty id");
            }
            let name = if record.display_name.trim().is_empty() {
                record.id.clone()
            } else {
                record.display_name.clone()
            };
            catalog.add_category(&record.id, &name, record.recipes);
        }
        for machine in file.machines {
            if machine.kind.trim().is_empty() {
                bail!("catalog machine with empty kind");
            }
            catalog.add_machine(machine);
        }
        Ok(catalog)
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        let file: CatalogFile = serde_json::from_str(s).context("parse catalog json failed")?;
        Self::from_file_contents(file)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let s = fs::read_to_string(path)
            .with_context(|| format!("read catalog failed: {}", path.display()))?;
        let catalog = Self::from_json_str(&s)
            .with_context(|| format!("load catalog failed: {}", path.display()))?;
        tracing::debug!(
            path = %path.display(),
            categories = catalog.categories.len(),
            recipes = catalog.recipe_count(),
            machines = catalog.machines.len(),
            "catalog loaded"
        );
        Ok(catalog)
    }

    pub fn recipe_count(&self) -> usize {
        self.categories.iter().map(|c| c.recipes.len()).sum()
    }
}

impl RecipeCatalog for InMemoryCatalog {
    fn list_categories(&self) -> Vec<CategoryInfo> {
        self.categories
            .iter()
            .map(|c| CategoryInfo {
                id: c.id.clone(),
                display_name: c.display_name.clone(),
            })
            .collect()
    }

    fn find_matching_categories(&self, keyword: &str) -> Vec<String> {
        match_categories(self.categories.iter().map(|c| c.id.as_str()), keyword)
    }

    fn recipes_in(&self, category: &str) -> Vec<RecipeEntry> {
        self.categories
            .iter()
            .filter(|c| c.id == category)
            .flat_map(|c| c.recipes.iter())
            .filter(|r| r.enabled)
            .map(|r| r.recipe.clone())
            .collect()
    }
}

impl TagIndex for InMemoryCatalog {
    fn first_member(&self, tag: &str) -> Option<ItemStack> {
        self.tags.get(tag).and_then(|m| m.first()).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recipe(out: &str) -> StoredRecipe {
        RecipeEntry {
            inputs: vec![ItemStack::new("in", 0, 1).tagged(["ingotIron"])],
            outputs: vec![ItemStack::new(out, 0, 1)],
            ..RecipeEntry::default()
        }
        .into()
    }

    #[test]
    fn collect_unions_matching_categories() {
        let mut c = InMemoryCatalog::new();
        c.add_category("gt.recipe.metablender", "Meta Blender", [recipe("a"), recipe("b")]);
        c.add_category("gt.recipe.blender", "Blender", [recipe("c")]);
        c.add_category("gt.recipe.mixer", "Mixer", [recipe("d")]);

        let got = c.collect_recipes("blend");
        let outs: Vec<_> = got.iter().map(|r| r.outputs[0].id.as_str()).collect();
        assert_eq!(outs, vec!["a", "b", "c"]);
        assert_eq!(got[2].category, "gt.recipe.blender");

        // exact id only returns that category
        assert_eq!(c.collect_recipes("gt.recipe.blender").len(), 1);
    }

    #[test]
    fn disabled_recipes_are_skipped() {
        let mut c = InMemoryCatalog::new();
        let mut off = recipe("x");
        off.enabled = false;
        c.add_category("m", "M", [off, recipe("y")]);
        assert_eq!(c.recipes_in("m").len(), 1);
        assert_eq!(c.recipe_count(), 2);
    }

    #[test]
    fn json_round_trip_with_explicit_tags_first() {
        let json = r#"{
            "categories": [
                { "id": "gt.recipe.mixer", "recipes": [
                    { "inputs": [ { "id": "gt:ingot", "variant": 1, "amount": 2, "tags": ["ingotIron"] } ],
                      "outputs": [ { "id": "gt:dust", "amount": 1 } ],
                      "rate": 30, "duration": 40 },
                    { "outputs": [ { "id": "gt:dust", "amount": 2 } ], "enabled": false }
                ] }
            ],
            "tags": { "ingotIron": [ { "id": "minecraft:iron_ingot", "amount": 1 } ] }
        }"#;
        let c = InMemoryCatalog::from_json_str(json).unwrap();
        let cats = c.list_categories();
        assert_eq!(cats[0].display_name, "gt.recipe.mixer");
        assert_eq!(c.recipes_in("gt.recipe.mixer").len(), 1);
        assert_eq!(
            c.first_member("ingotIron").map(|s| s.id),
            Some("minecraft:iron_ingot".to_string())
        );
        assert!(c.first_member("dustGold").is_none());
    }

    #[test]
    fn machines_resolve_to_catalog_categories() {
        let json = r#"{
            "categories": [ { "id": "gt.recipe.mixer", "display_name": "Mixer" } ],
            "machines": [
                { "kind": "gt_mixer_lv", "attributes": { "recipe_map": "gt.recipe.mixer" } },
                { "kind": "gt_mixer_hv", "declared_category": "gt.recipe.gone",
                  "attributes": { "category": "gt.recipe.mixer" } },
                { "kind": "chest" }
            ]
        }"#;
        let c = InMemoryCatalog::from_json_str(json).unwrap();
        let d = CategoryDiscovery::standard();
        assert_eq!(c.machines().len(), 3);
        assert_eq!(c.category_for_machine("gt_mixer_lv", &d).as_deref(), Some("gt.recipe.mixer"));
        assert_eq!(c.category_for_machine("gt_mixer_hv", &d).as_deref(), Some("gt.recipe.mixer"));
        assert_eq!(c.category_for_machine("chest", &d), None);
        assert_eq!(c.category_for_machine("furnace", &d), None);
    }

    #[test]
    fn blank_machine_kind_is_rejected() {
        let err = InMemoryCatalog::from_json_str(r#"{ "machines": [ { "kind": " " } ] }"#).unwrap_err();
        assert!(err.to_string().contains("machine"));
    }

    #[test]
    fn load_reports_path_on_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("catalog.json");
        std::fs::write(&p, "{ not json").unwrap();
        let err = InMemoryCatalog::load(&p).unwrap_err();
        assert!(format!("{err:#}").contains("catalog.json"));
    }
}
