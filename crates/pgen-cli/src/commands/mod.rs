//! Command handlers for the `pgen` binary.
//!
//! Shared wiring (config, catalog, service) lives here; the interactive
//! generation loop and storage commands live in the submodules.

pub mod generate;
pub mod storage;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use pgen_catalog::{CategoryDiscovery, InMemoryCatalog};
use pgen_config::{
    load_layered_yaml, report_unused_keys, GeneratorConfig, LoadedConfig, UnusedKeyPolicy,
};
use pgen_encoder::load_rules_file;
use pgen_filter::FilterSpec;
use pgen_ledger::ResourceLedger;
use pgen_runtime::GenerationService;
use pgen_schemas::RequesterId;
use pgen_store::FileBackend;

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

/// Everything a command needs, resolved once from flags and config.
pub struct Context {
    pub loaded: Option<LoadedConfig>,
    pub config: GeneratorConfig,
    pub catalog_path: Option<PathBuf>,
    pub requester: RequesterId,
}

impl Context {
    pub fn load(
        config_paths: &[String],
        catalog_flag: Option<&str>,
        requester: &str,
        strict: bool,
    ) -> Result<Self> {
        let (loaded, config) = if config_paths.is_empty() {
            (None, GeneratorConfig::default())
        } else {
            let loaded = load_layered_yaml(config_paths)?;
            let policy = if strict {
                UnusedKeyPolicy::Fail
            } else {
                UnusedKeyPolicy::Warn
            };
            let report = report_unused_keys(&loaded.config_json, policy)?;
            for pointer in &report.unused_leaf_pointers {
                tracing::warn!(pointer = %pointer, "config key is not read by anything");
            }
            let mut config = GeneratorConfig::from_loaded(&loaded)?;
            merge_rules_file(&mut config)?;
            (Some(loaded), config)
        };

        let catalog_path = catalog_flag
            .map(PathBuf::from)
            .or_else(|| config.catalog_path.clone());

        Ok(Self {
            loaded,
            config,
            catalog_path,
            requester: parse_requester(requester),
        })
    }

    pub fn catalog(&self) -> Result<Arc<InMemoryCatalog>> {
        let path = self
            .catalog_path
            .as_ref()
            .context("no recipe catalog: pass --catalog <file> or set catalog.path")?;
        Ok(Arc::new(InMemoryCatalog::load(path)?))
    }

    pub fn service(&self, catalog: Arc<InMemoryCatalog>, ledger: ResourceLedger) -> GenerationService {
        let backend = Arc::new(FileBackend::new(self.config.storage_dir.clone()));
        GenerationService::from_config(&self.config, catalog, ledger, backend)
    }

    /// Service for storage-only commands: no catalog lookups, no debits.
    pub fn storage_service(&self) -> GenerationService {
        self.service(Arc::new(InMemoryCatalog::new()), ResourceLedger::new())
    }
}

/// What a generation draws recipes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Target {
    Keyword(String),
    /// A catalog machine kind; its category is found by discovery.
    Machine(String),
}

impl Target {
    /// A machine wins when both are given; clap rejects that combination anyway.
    pub fn from_args(keyword: Option<String>, machine: Option<String>) -> Self {
        match (keyword, machine) {
            (_, Some(kind)) => Target::Machine(kind),
            (keyword, None) => Target::Keyword(keyword.unwrap_or_default()),
        }
    }

    /// The category keyword to hand to the service.
    pub fn resolve(&self, catalog: &InMemoryCatalog) -> Result<String> {
        match self {
            Target::Keyword(k) => Ok(k.clone()),
            Target::Machine(kind) => {
                if catalog.machine(kind).is_none() {
                    anyhow::bail!("no machine '{kind}' in the catalog");
                }
                let category = catalog
                    .category_for_machine(kind, &CategoryDiscovery::standard())
                    .with_context(|| format!("machine '{kind}' has no known recipe category"))?;
                tracing::info!(machine = %kind, category = %category, "machine category resolved");
                Ok(category)
            }
        }
    }
}

/// Put the rules file ahead of the inline rules so inline ones override it.
fn merge_rules_file(config: &mut GeneratorConfig) -> Result<()> {
    let Some(path) = &config.replacements_file else {
        return Ok(());
    };
    let from_file = load_rules_file(path)?;
    tracing::info!(path = %path.display(), rules = from_file.rules().len(), "replacement rules file loaded");
    let inline = std::mem::take(&mut config.replacements);
    config.replacements = from_file
        .rules()
        .iter()
        .map(|r| format!("{}={}", r.source, r.target))
        .chain(inline)
        .collect();
    Ok(())
}

/// A UUID is taken as-is; anything else names a stable derived id.
pub fn parse_requester(raw: &str) -> RequesterId {
    raw.parse::<RequesterId>()
        .unwrap_or_else(|_| RequesterId::from_name(raw.trim()))
}

// ---------------------------------------------------------------------------
// Simple commands
// ---------------------------------------------------------------------------

pub fn print_config_hash(ctx: &Context) -> Result<()> {
    match &ctx.loaded {
        Some(loaded) => {
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }
        None => println!("config_hash=none (built-in defaults)"),
    }
    Ok(())
}

pub fn list_categories(ctx: &Context) -> Result<()> {
    let catalog = ctx.catalog()?;
    let svc = ctx.service(catalog, ResourceLedger::new());
    for c in svc.categories() {
        println!("{}\t{}", c.id, c.display_name);
    }
    Ok(())
}

pub fn list_machines(ctx: &Context) -> Result<()> {
    let catalog = ctx.catalog()?;
    let discovery = CategoryDiscovery::standard();
    for m in catalog.machines() {
        let category = catalog.category_for_machine(&m.kind, &discovery);
        println!("{}\t{}", m.kind, category.as_deref().unwrap_or("-"));
    }
    Ok(())
}

pub fn count(ctx: &Context, target: &Target, filters: &FilterSpec) -> Result<()> {
    let catalog = ctx.catalog()?;
    let keyword = target.resolve(&catalog)?;
    let svc = ctx.service(catalog, ResourceLedger::new());
    let report = match svc.preview(&keyword, filters) {
        Ok(r) => r,
        Err(rejection) => anyhow::bail!("{rejection}"),
    };
    let s = &report.stats;
    println!("categories={}", s.categories.join(","));
    println!("filters={}", report.filters);
    println!("collected={}", s.collected);
    println!("after_filter={}", s.after_filter);
    println!("unique={}", s.unique);
    println!("unambiguous={}", s.unambiguous);
    println!("conflict_groups={}", s.conflict_groups);
    Ok(())
}
