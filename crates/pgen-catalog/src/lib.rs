//! pgen-catalog
//!
//! Read-only recipe catalog boundary.
//!
//! # Purpose
//! The generator never talks to the host's recipe tables directly. It sees:
//! - [`RecipeCatalog`]: categories, fuzzy category lookup, recipe collection
//! - [`TagIndex`]: "first item registered under tag X", used by tag replacement
//! - [`CategoryDiscovery`]: ordered probes that work out which category a
//!   machine belongs to, each answering found/absent. Catalog files list the
//!   machines; [`InMemoryCatalog::category_for_machine`] runs the probes.
//!
//! [`InMemoryCatalog`] is the concrete implementation used by the CLI (loaded
//! from a JSON dump) and by tests.

mod discovery;
mod memory;

pub use discovery::{
    AttributeCategoryProbe, CategoryDiscovery, CategoryProbe, DeclaredCategoryProbe,
    MachineDescriptor,
};
pub use memory::{CatalogFile, CategoryRecord, InMemoryCatalog, StoredRecipe};

use pgen_schemas::{ItemStack, RecipeEntry};

// ---------------------------------------------------------------------------
// Catalog contract
// ---------------------------------------------------------------------------

/// One category as listed to the requester.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CategoryInfo {
    pub id: String,
    pub display_name: String,
}

/// Read-only recipe lookup.
///
/// Object-safe and `Send + Sync` so the service can hold an `Arc<dyn RecipeCatalog>`.
pub trait RecipeCatalog: Send + Sync {
    /// All categories in registration order.
    fn list_categories(&self) -> Vec<CategoryInfo>;

    /// Category ids matching `keyword`.
    ///
    /// An exact id match wins outright. Otherwise every id containing the
    /// keyword (case-insensitive) is returned, in registration order.
    fn find_matching_categories(&self, keyword: &str) -> Vec<String>;

    /// Enabled recipes of a single category, in catalog order.
    fn recipes_in(&self, category: &str) -> Vec<RecipeEntry>;

    /// Union of [`Self::recipes_in`] across every matching category.
    ///
    /// Overlapping matches can return the same recipe twice; callers dedupe.
    fn collect_recipes(&self, keyword: &str) -> Vec<RecipeEntry> {
        self.find_matching_categories(keyword)
            .iter()
            .flat_map(|id| self.recipes_in(id))
            .collect()
    }
}

/// Exact-then-substring category matching shared by catalog implementations.
pub fn match_categories<'a, I>(ids: I, keyword: &str) -> Vec<String>
where
    I: IntoIterator<Item = &'a str> + Clone,
{
    if ids.clone().into_iter().any(|id| id == keyword) {
        return vec![keyword.to_string()];
    }
    let needle = keyword.to_lowercase();
    ids.into_iter()
        .filter(|id| id.to_lowercase().contains(&needle))
        .map(str::to_string)
        .collect()
}

// ---------------------------------------------------------------------------
// Tag lookup
// ---------------------------------------------------------------------------

/// Tag (ore-dictionary style) registry lookup.
pub trait TagIndex: Send + Sync {
    /// First item registered under `tag`, if the tag has any member.
    fn first_member(&self, tag: &str) -> Option<ItemStack>;
}

#[cfg(test)]
mod tests {
    use super::*;

    const IDS: [&str; 4] = [
        "gt.recipe.metablender",
        "gt.recipe.blender",
        "gt.recipe.mixer",
        "gt.recipe.assembler",
    ];

    #[test]
    fn exact_match_wins_outright() {
        let got = match_categories(IDS.iter().copied(), "gt.recipe.blender");
        assert_eq!(got, vec!["gt.recipe.blender"]);
    }

    #[test]
    fn substring_match_is_case_insensitive_and_ordered() {
        let got = match_categories(IDS.iter().copied(), "BLENDER");
        assert_eq!(got, vec!["gt.recipe.metablender", "gt.recipe.blender"]);
    }

    #[test]
    fn no_match_is_empty() {
        assert!(match_categories(IDS.iter().copied(), "centrifuge").is_empty());
    }
}
