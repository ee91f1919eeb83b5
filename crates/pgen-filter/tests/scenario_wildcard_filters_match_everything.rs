use pgen_filter::{BlacklistSides, Filter, FilterChain, TierSelector};
use pgen_schemas::{FluidStack, ItemStack, RecipeEntry};
use proptest::prelude::*;

fn stack() -> impl Strategy<Value = ItemStack> {
    (
        "[a-z]{1,6}:[a-z_.]{1,10}",
        0u32..32,
        0u32..200,
        "[A-Za-z ]{0,12}",
        prop::collection::vec("[a-zA-Z]{1,10}", 0..3),
    )
        .prop_map(|(id, variant, amount, name, tags)| {
            ItemStack::new(id, variant, amount).named(name).tagged(tags)
        })
}

fn recipe() -> impl Strategy<Value = RecipeEntry> {
    (
        "[a-z.]{1,12}",
        prop::collection::vec(stack(), 0..4),
        prop::collection::vec(stack(), 0..3),
        prop::collection::vec(stack(), 0..2),
        prop::collection::vec(("[a-z]{1,8}", 1u32..4000), 0..2),
        any::<u32>(),
        0u32..10_000,
    )
        .prop_map(
            |(category, inputs, outputs, catalysts, fluids, rate, duration)| RecipeEntry {
                source: "prop".into(),
                category,
                inputs,
                outputs,
                catalysts,
                fluid_inputs: fluids
                    .into_iter()
                    .map(|(id, v)| FluidStack::new(id, v))
                    .collect(),
                rate,
                duration,
                ..RecipeEntry::default()
            },
        )
}

fn wildcard_filters() -> Vec<Filter> {
    let mut out = Vec::new();
    for p in ["", "*", "  "] {
        out.push(Filter::output_tag(p));
        out.push(Filter::input_tag(p));
        out.push(Filter::non_consumed(p));
        out.push(Filter::blacklist(p, BlacklistSides::BOTH));
        out.push(Filter::category(p));
    }
    out.push(Filter::Tier {
        selector: TierSelector::Any,
    });
    out
}

proptest! {
    #[test]
    fn every_wildcard_filter_matches_every_recipe(r in recipe()) {
        for f in wildcard_filters() {
            prop_assert!(f.is_noop(), "{f} should be a no-op");
            let chain = FilterChain::new().with(f.clone());
            prop_assert!(chain.matches(&r), "{f} rejected a recipe");
        }
    }

    #[test]
    fn combined_wildcard_chain_matches_every_recipe(r in recipe()) {
        let mut chain = FilterChain::new();
        for f in wildcard_filters() {
            chain.push(f);
        }
        prop_assert!(chain.matches(&r));
    }
}
