use std::sync::Arc;

use pgen_catalog::TagIndex;
use pgen_schemas::{EncodedStack, GeneratedArtifact, ItemStack, RecipeEntry};

use crate::codec::{PlainCodec, StackCodec};
use crate::replace::TagReplacer;

/// Result of encoding a batch of recipes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EncodeReport {
    pub artifacts: Vec<GeneratedArtifact>,
    /// Recipes that produced no artifact (no effective input or output).
    pub skipped: usize,
    /// Fluid entries dropped because the codec could not convert them.
    pub fluids_dropped: usize,
}

pub struct Encoder {
    codec: Arc<dyn StackCodec>,
    replacement: Option<(TagReplacer, Arc<dyn TagIndex>)>,
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new(Arc::new(PlainCodec))
    }
}

impl Encoder {
    pub fn new(codec: Arc<dyn StackCodec>) -> Self {
        Self {
            codec,
            replacement: None,
        }
    }

    /// Apply `replacer` to every item before encoding. Empty rule sets are ignored.
    pub fn with_replacements(mut self, replacer: TagReplacer, index: Arc<dyn TagIndex>) -> Self {
        if replacer.has_rules() {
            self.replacement = Some((replacer, index));
        }
        self
    }

    fn item(&self, stack: &ItemStack) -> EncodedStack {
        let replaced = match &self.replacement {
            Some((replacer, index)) => replacer.apply(stack, index.as_ref()),
            None => stack.clone(),
        };
        EncodedStack::from_stack(&self.codec.copy_item(&replaced))
    }

    /// Encode one recipe. `None` when the result would lack an input or an output.
    pub fn encode(&self, recipe: &RecipeEntry) -> Option<GeneratedArtifact> {
        self.encode_counting(recipe).0
    }

    fn encode_counting(&self, recipe: &RecipeEntry) -> (Option<GeneratedArtifact>, usize) {
        let mut dropped = 0usize;

        let mut inputs: Vec<EncodedStack> =
            recipe.consumed_inputs().map(|s| self.item(s)).collect();
        let mut outputs: Vec<EncodedStack> = recipe
            .outputs
            .iter()
            .filter(|s| s.amount > 0)
            .map(|s| self.item(s))
            .collect();

        for (fluids, side) in [
            (&recipe.fluid_inputs, &mut inputs),
            (&recipe.fluid_outputs, &mut outputs),
        ] {
            for f in fluids.iter().filter(|f| f.volume > 0) {
                match self.codec.fluid_to_item(f) {
                    Some(item) => side.push(EncodedStack::from_stack(&self.codec.copy_item(&item))),
                    None => dropped += 1,
                }
            }
        }

        if dropped > 0 {
            tracing::debug!(category = %recipe.category, dropped, "fluid conversion unavailable; fluids skipped");
        }
        if inputs.is_empty() || outputs.is_empty() {
            return (None, dropped);
        }
        let artifact = GeneratedArtifact {
            inputs,
            outputs,
            crafting: false,
            substitute: false,
            category: recipe.category.clone(),
        };
        (Some(artifact), dropped)
    }

    /// Encode every recipe, in order, skipping the ones that cannot be encoded.
    pub fn encode_batch(&self, recipes: &[RecipeEntry]) -> EncodeReport {
        let mut report = EncodeReport::default();
        for r in recipes {
            let (artifact, dropped) = self.encode_counting(r);
            report.fluids_dropped += dropped;
            match artifact {
                Some(a) => report.artifacts.push(a),
                None => report.skipped += 1,
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::FluidDropCodec;
    use pgen_schemas::{FluidStack, NATIVE_STACK_LIMIT};

    fn recipe() -> RecipeEntry {
        RecipeEntry {
            category: "gt.recipe.mixer".into(),
            inputs: vec![
                ItemStack::new("gt:dust", 1, 200).named("Iron Dust"),
                ItemStack::new("gt:circuit", 2, 0).named("Circuit"),
            ],
            outputs: vec![ItemStack::new("gt:mix", 0, 3).named("Mix")],
            ..RecipeEntry::default()
        }
    }

    #[test]
    fn excludes_catalytic_inputs_and_widens_large_counts() {
        let a = Encoder::default().encode(&recipe()).unwrap();
        assert_eq!(a.inputs.len(), 1);
        assert_eq!(a.inputs[0].count, 200);
        assert_eq!(a.inputs[0].wide_count, Some(200));
        assert!(a.inputs[0].count > NATIVE_STACK_LIMIT);
        assert!(!a.crafting && !a.substitute);
        assert_eq!(a.category, "gt.recipe.mixer");
    }

    #[test]
    fn only_catalytic_inputs_is_dropped() {
        let mut r = recipe();
        r.inputs.remove(0);
        r.catalysts = vec![ItemStack::new("gt:mold", 0, 1)];
        assert!(Encoder::default().encode(&r).is_none());
    }

    #[test]
    fn fluids_degrade_without_codec_support() {
        let mut r = recipe();
        r.inputs.clear();
        r.fluid_inputs = vec![FluidStack::new("water", 1000)];

        let plain = Encoder::default().encode_batch(std::slice::from_ref(&r));
        assert_eq!((plain.artifacts.len(), plain.skipped, plain.fluids_dropped), (0, 1, 1));

        let drops = Encoder::new(Arc::new(FluidDropCodec::new("ae2fc:fluid_drop")));
        let a = drops.encode(&r).unwrap();
        assert_eq!(a.inputs[0].id, "ae2fc:fluid_drop");
        assert_eq!(a.inputs[0].wide_count, Some(1000));
    }

    #[test]
    fn batch_counts_skips() {
        let mut empty = recipe();
        empty.outputs[0].amount = 0;
        let report = Encoder::default().encode_batch(&[recipe(), empty, recipe()]);
        assert_eq!(report.artifacts.len(), 2);
        assert_eq!(report.skipped, 1);
    }
}
