//! pgen-testkit
//!
//! Fixture builders and a fully wired in-process service for scenario tests.
//! Nothing here touches the filesystem.

mod harness;

pub use harness::{FixtureCatalog, Harness};

use pgen_schemas::{FluidStack, ItemStack, RecipeEntry};

/// Named item stack; the name doubles as the display label.
pub fn item(id: &str, amount: u32) -> ItemStack {
    ItemStack::new(id, 0, amount).named(display(id))
}

pub fn fluid(id: &str, volume: u32) -> FluidStack {
    FluidStack::new(id, volume)
}

// "gregtech:steel_dust" -> "steel_dust"
fn display(id: &str) -> String {
    id.rsplit(':').next().unwrap_or(id).to_string()
}

/// Fluent recipe construction for tests.
#[derive(Clone, Debug, Default)]
pub struct RecipeBuilder {
    entry: RecipeEntry,
}

impl RecipeBuilder {
    pub fn new() -> Self {
        Self {
            entry: RecipeEntry {
                duration: 100,
                rate: 30,
                ..RecipeEntry::default()
            },
        }
    }

    pub fn category(mut self, category: &str) -> Self {
        self.entry.category = category.to_string();
        self
    }

    pub fn input(mut self, stack: ItemStack) -> Self {
        self.entry.inputs.push(stack);
        self
    }

    pub fn output(mut self, stack: ItemStack) -> Self {
        self.entry.outputs.push(stack);
        self
    }

    pub fn fluid_input(mut self, f: FluidStack) -> Self {
        self.entry.fluid_inputs.push(f);
        self
    }

    pub fn fluid_output(mut self, f: FluidStack) -> Self {
        self.entry.fluid_outputs.push(f);
        self
    }

    pub fn catalyst(mut self, stack: ItemStack) -> Self {
        self.entry.catalysts.push(stack);
        self
    }

    pub fn duration(mut self, ticks: u32) -> Self {
        self.entry.duration = ticks;
        self
    }

    pub fn rate(mut self, rate: u32) -> Self {
        self.entry.rate = rate;
        self
    }

    pub fn build(self) -> RecipeEntry {
        self.entry
    }
}

/// `n` structurally distinct recipes, each with its own output.
pub fn distinct_recipes(prefix: &str, n: usize) -> Vec<RecipeEntry> {
    (0..n)
        .map(|i| {
            RecipeBuilder::new()
                .input(item(&format!("{prefix}:in_{i}"), 1))
                .output(item(&format!("{prefix}:out_{i}"), 1))
                .build()
        })
        .collect()
}

/// `candidates` recipes that all produce `output` from different inputs.
pub fn colliding_recipes(output: &str, candidates: usize) -> Vec<RecipeEntry> {
    (0..candidates)
        .map(|i| {
            RecipeBuilder::new()
                .input(item(&format!("{output}_src_{i}"), (i + 1) as u32))
                .output(item(output, 1))
                .build()
        })
        .collect()
}
