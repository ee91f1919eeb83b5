use std::sync::Arc;

use anyhow::{Context, Result};
use pgen_catalog::{InMemoryCatalog, StoredRecipe};
use pgen_config::GeneratorConfig;
use pgen_ledger::{MemorySupply, ResourceLedger};
use pgen_runtime::{ExchangeOutcome, GenerationOutcome, GenerationRequest, GenerationService};
use pgen_filter::FilterSpec;
use pgen_schemas::{ItemStack, RecipeEntry, RequesterId, WindowSelection};
use pgen_store::MemoryBackend;

/// Catalog builder; categories keep insertion order.
#[derive(Default)]
pub struct FixtureCatalog {
    inner: InMemoryCatalog,
}

impl FixtureCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn category(mut self, id: &str, recipes: Vec<RecipeEntry>) -> Self {
        self.inner
            .add_category(id, id, recipes.into_iter().map(StoredRecipe::from));
        self
    }

    /// Recipes present in the catalog but switched off.
    pub fn disabled(mut self, id: &str, recipes: Vec<RecipeEntry>) -> Self {
        self.inner.add_category(
            id,
            id,
            recipes.into_iter().map(|r| StoredRecipe {
                recipe: r,
                enabled: false,
            }),
        );
        self
    }

    pub fn tag(mut self, tag: &str, member: ItemStack) -> Self {
        self.inner.register_tag(tag, member);
        self
    }

    pub fn build(self) -> InMemoryCatalog {
        self.inner
    }
}

/// A service over in-memory supplies and a memory store backend.
///
/// Ledger order: `network` pool first, then `inventory`.
pub struct Harness {
    pub service: GenerationService,
    pub inventory: Arc<MemorySupply>,
    pub network: Arc<MemorySupply>,
    pub backend: Arc<MemoryBackend>,
    pub requester: RequesterId,
}

impl Harness {
    pub fn new(catalog: FixtureCatalog) -> Self {
        Self::with_config(catalog, &GeneratorConfig::default())
    }

    pub fn with_config(catalog: FixtureCatalog, config: &GeneratorConfig) -> Self {
        let inventory = Arc::new(MemorySupply::new("inventory"));
        let network = Arc::new(MemorySupply::new("network"));
        let backend = Arc::new(MemoryBackend::new());
        let ledger = ResourceLedger::new()
            .with_source(network.clone())
            .with_source(inventory.clone());
        let service =
            GenerationService::from_config(config, Arc::new(catalog.build()), ledger, backend.clone());
        Self {
            service,
            inventory,
            network,
            backend,
            requester: RequesterId::from_name("harness"),
        }
    }

    pub fn credit_inventory(&self, blanks: u64) {
        self.inventory
            .credit(&self.requester, self.service.blank_unit(), blanks);
    }

    pub fn credit_network(&self, blanks: u64) {
        self.network
            .credit(&self.requester, self.service.blank_unit(), blanks);
    }

    pub fn inventory_balance(&self) -> u64 {
        self.inventory
            .balance(&self.requester, self.service.blank_unit())
    }

    pub fn network_balance(&self) -> u64 {
        self.network.balance(&self.requester, self.service.blank_unit())
    }

    pub fn request(&self, keyword: &str) -> Result<GenerationOutcome> {
        self.request_filtered(keyword, FilterSpec::default())
    }

    pub fn request_filtered(&self, keyword: &str, filters: FilterSpec) -> Result<GenerationOutcome> {
        self.service.request_generation(
            &self.requester,
            &GenerationRequest::new(keyword).with_filters(filters),
        )
    }

    /// Answer the live window with `choices`, using its current token.
    pub fn select(&self, choices: &[i64]) -> Result<ExchangeOutcome> {
        let window = self
            .service
            .current_window(&self.requester)
            .context("no live conflict window")?;
        self.service.submit_selection(
            &self.requester,
            &WindowSelection::choose(window.start_index, choices.to_vec()),
        )
    }

    pub fn cancel(&self) -> Result<ExchangeOutcome> {
        let window = self
            .service
            .current_window(&self.requester)
            .context("no live conflict window")?;
        self.service
            .submit_selection(&self.requester, &WindowSelection::cancel(window.start_index))
    }

    /// Answer every remaining window by picking candidate `pick` in each group.
    pub fn resolve_all(&self, pick: i64) -> Result<ExchangeOutcome> {
        loop {
            let window = self
                .service
                .current_window(&self.requester)
                .context("no live conflict window")?;
            let choices = vec![pick; window.groups.len()];
            let out = self.service.submit_selection(
                &self.requester,
                &WindowSelection::choose(window.start_index, choices),
            )?;
            match out {
                ExchangeOutcome::Window(_) => continue,
                other => return Ok(other),
            }
        }
    }

    pub fn stored_count(&self) -> Result<usize> {
        Ok(self.service.stored(&self.requester)?.len())
    }
}
