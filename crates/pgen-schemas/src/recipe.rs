use serde::{Deserialize, Serialize};

use crate::stack::{FluidStack, ItemStack};

/// One crafting/processing recipe as read from the catalog.
///
/// Immutable once built by the catalog; discarded when the generation request
/// that collected it completes.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeEntry {
    /// Origin of the recipe (e.g. `"gt"`).
    #[serde(default)]
    pub source: String,
    /// Category (machine / process) id the recipe belongs to.
    #[serde(default)]
    pub category: String,
    /// Human-readable machine name.
    #[serde(default)]
    pub display_name: String,
    /// Consumable requirements, in catalog order. `amount == 0` = not consumed.
    #[serde(default)]
    pub inputs: Vec<ItemStack>,
    #[serde(default)]
    pub outputs: Vec<ItemStack>,
    #[serde(default)]
    pub fluid_inputs: Vec<FluidStack>,
    #[serde(default)]
    pub fluid_outputs: Vec<FluidStack>,
    /// Items that must be present but are never consumed.
    #[serde(default)]
    pub catalysts: Vec<ItemStack>,
    /// Processing duration in ticks.
    #[serde(default)]
    pub duration: u32,
    /// Processing rate (energy per tick). Tier is derived from this.
    #[serde(default)]
    pub rate: u32,
}

impl RecipeEntry {
    /// First non-empty item output, if any.
    pub fn primary_item_output(&self) -> Option<&ItemStack> {
        self.outputs.iter().find(|s| s.amount > 0)
    }

    /// First non-empty fluid output, if any.
    pub fn primary_fluid_output(&self) -> Option<&FluidStack> {
        self.fluid_outputs.iter().find(|f| f.volume > 0)
    }

    /// Identity of the first non-empty output: item first, else fluid.
    ///
    /// `None` for a recipe that produces nothing.
    pub fn primary_output_key(&self) -> Option<String> {
        if let Some(item) = self.primary_item_output() {
            return Some(format!("item:{}", item.identifier()));
        }
        self.primary_fluid_output()
            .map(|fluid| format!("fluid:{}", fluid.id))
    }

    /// Display label of the primary output (used as the conflict-group label).
    pub fn primary_output_label(&self) -> Option<String> {
        if let Some(item) = self.primary_item_output() {
            return Some(item.label().to_string());
        }
        self.primary_fluid_output().map(|f| f.label().to_string())
    }

    pub fn has_output(&self) -> bool {
        self.primary_output_key().is_some()
    }

    /// Consumable-side items with a non-zero amount.
    pub fn consumed_inputs(&self) -> impl Iterator<Item = &ItemStack> {
        self.inputs.iter().filter(|s| !s.is_catalytic_marker())
    }

    /// Catalytic items plus zero-amount consumable-side entries.
    pub fn non_consumed_items(&self) -> impl Iterator<Item = &ItemStack> {
        self.catalysts
            .iter()
            .chain(self.inputs.iter().filter(|s| s.is_catalytic_marker()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> RecipeEntry {
        RecipeEntry {
            source: "gt".into(),
            category: "gt.recipe.mixer".into(),
            display_name: "Mixer".into(),
            inputs: vec![],
            outputs: vec![],
            fluid_inputs: vec![],
            fluid_outputs: vec![],
            catalysts: vec![],
            duration: 100,
            rate: 30,
        }
    }

    #[test]
    fn primary_key_prefers_items_over_fluids() {
        let mut r = base();
        r.outputs.push(ItemStack::new("mod:dust", 0, 2));
        r.fluid_outputs.push(FluidStack::new("water", 1000));
        assert_eq!(r.primary_output_key().as_deref(), Some("item:mod:dust"));
    }

    #[test]
    fn primary_key_skips_empty_item_outputs() {
        let mut r = base();
        r.outputs.push(ItemStack::new("mod:nothing", 0, 0));
        r.fluid_outputs.push(FluidStack::new("steam", 500));
        assert_eq!(r.primary_output_key().as_deref(), Some("fluid:steam"));
    }

    #[test]
    fn outputless_recipe_has_no_key() {
        let r = base();
        assert!(r.primary_output_key().is_none());
        assert!(!r.has_output());
    }

    #[test]
    fn non_consumed_items_include_zero_amount_inputs() {
        let mut r = base();
        r.inputs.push(ItemStack::new("mod:circuit", 3, 0));
        r.inputs.push(ItemStack::new("mod:dust", 0, 1));
        r.catalysts.push(ItemStack::new("mod:mold", 0, 1));
        let ids: Vec<String> = r.non_consumed_items().map(|s| s.identifier()).collect();
        assert_eq!(ids, vec!["mod:mold".to_string(), "mod:circuit:3".to_string()]);
        assert_eq!(r.consumed_inputs().count(), 1);
    }
}
