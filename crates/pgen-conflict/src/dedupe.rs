use std::collections::HashSet;

use pgen_schemas::{FluidStack, ItemStack, RecipeEntry};

/// Order-insensitive structural identity of a recipe.
///
/// Each side is sorted independently so `[a, b] -> c` and `[b, a] -> c` collide,
/// while moving an item from the consumable list to the catalyst list, or
/// between inputs and outputs, does not. Category and display name are ignored.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct StructuralKey {
    duration: u32,
    rate: u32,
    inputs: Vec<(String, u32, u32)>,
    outputs: Vec<(String, u32, u32)>,
    catalysts: Vec<(String, u32, u32)>,
    fluid_inputs: Vec<(String, u32)>,
    fluid_outputs: Vec<(String, u32)>,
}

fn items(stacks: &[ItemStack]) -> Vec<(String, u32, u32)> {
    let mut v: Vec<_> = stacks
        .iter()
        .map(|s| (s.id.clone(), s.variant, s.amount))
        .collect();
    v.sort();
    v
}

fn fluids(stacks: &[FluidStack]) -> Vec<(String, u32)> {
    let mut v: Vec<_> = stacks.iter().map(|f| (f.id.clone(), f.volume)).collect();
    v.sort();
    v
}

pub fn structural_key(r: &RecipeEntry) -> StructuralKey {
    StructuralKey {
        duration: r.duration,
        rate: r.rate,
        inputs: items(&r.inputs),
        outputs: items(&r.outputs),
        catalysts: items(&r.catalysts),
        fluid_inputs: fluids(&r.fluid_inputs),
        fluid_outputs: fluids(&r.fluid_outputs),
    }
}

/// Remove structural duplicates, preserving first-seen order.
pub fn dedupe(recipes: Vec<RecipeEntry>) -> Vec<RecipeEntry> {
    let mut seen = HashSet::with_capacity(recipes.len());
    recipes
        .into_iter()
        .filter(|r| seen.insert(structural_key(r)))
        .collect()
}
