use serde::{Deserialize, Serialize};

use pgen_schemas::RecipeEntry;

use crate::filter::{BlacklistSides, CompiledFilter, Filter, TierSelector};
use crate::matcher::is_wildcard;

/// Conjunction of filters. Empty chain matches everything.
#[derive(Clone, Debug, Default)]
pub struct FilterChain {
    filters: Vec<Filter>,
    compiled: Vec<CompiledFilter>,
}

impl FilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, filter: Filter) -> Self {
        self.push(filter);
        self
    }

    pub fn push(&mut self, filter: Filter) {
        self.compiled.push(CompiledFilter::compile(&filter));
        self.filters.push(filter);
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn matches(&self, recipe: &RecipeEntry) -> bool {
        self.compiled.iter().all(|f| f.matches(recipe))
    }

    /// Keep only matching recipes, preserving order.
    pub fn apply(&self, recipes: Vec<RecipeEntry>) -> Vec<RecipeEntry> {
        if self.compiled.is_empty() {
            return recipes;
        }
        recipes.into_iter().filter(|r| self.matches(r)).collect()
    }

    /// Build the chain a generation request describes. Wildcard fields add nothing.
    pub fn from_spec(spec: &FilterSpec) -> Self {
        let mut chain = Self::new();
        if let Some(id) = spec.category.as_deref().filter(|c| !c.trim().is_empty()) {
            chain.push(Filter::category(id));
        }
        if !is_wildcard(&spec.output_tag) {
            chain.push(Filter::output_tag(spec.output_tag.clone()));
        }
        if !is_wildcard(&spec.input_tag) {
            chain.push(Filter::input_tag(spec.input_tag.clone()));
        }
        if !is_wildcard(&spec.non_consumed) {
            chain.push(Filter::non_consumed(spec.non_consumed.clone()));
        }
        if !is_wildcard(&spec.blacklist_input) {
            chain.push(Filter::blacklist(
                spec.blacklist_input.clone(),
                BlacklistSides::INPUTS,
            ));
        }
        if !is_wildcard(&spec.blacklist_output) {
            chain.push(Filter::blacklist(
                spec.blacklist_output.clone(),
                BlacklistSides::OUTPUTS,
            ));
        }
        if let TierSelector::Exact(t) = spec.tier {
            chain.push(Filter::tier(t));
        }
        chain
    }

    /// Human-readable summary, e.g. for logs and reports.
    pub fn describe(&self) -> String {
        if self.filters.is_empty() {
            return "no filters".to_string();
        }
        self.filters
            .iter()
            .map(|f| f.to_string())
            .collect::<Vec<_>>()
            .join(" AND ")
    }
}

/// Flat, form-shaped description of a request's filters.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSpec {
    pub output_tag: String,
    pub input_tag: String,
    pub non_consumed: String,
    pub blacklist_input: String,
    pub blacklist_output: String,
    pub tier: TierSelector,
    pub category: Option<String>,
}
