use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use pgen_catalog::{CategoryInfo, RecipeCatalog, TagIndex};
use pgen_config::GeneratorConfig;
use pgen_conflict::{
    dedupe, group, BatchProtocol, ConflictSession, Exchange, Grouping, ProtocolStep,
    SessionRegistry,
};
use pgen_encoder::{Encoder, FluidDropCodec, PlainCodec, StackCodec, TagReplacer};
use pgen_filter::{FilterChain, FilterSpec};
use pgen_ledger::{DebitError, ResourceLedger};
use pgen_schemas::{
    ArtifactDetail, ConflictWindow, GeneratedArtifact, ItemKey, RecipeEntry, RequesterId,
    WindowSelection,
};
use pgen_store::{OutputStore, StorageSummary, StoragePage, StoreBackend};

use crate::outcome::{
    ExchangeOutcome, GenerationOutcome, GenerationRejection, GenerationReport, PipelineStats,
    PreviewReport,
};

/// One "generate from these categories" request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GenerationRequest {
    /// Category keyword: exact id, or a case-insensitive substring.
    pub keyword: String,
    pub filters: FilterSpec,
}

impl GenerationRequest {
    pub fn new(keyword: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            filters: FilterSpec::default(),
        }
    }

    pub fn with_filters(mut self, filters: FilterSpec) -> Self {
        self.filters = filters;
        self
    }
}

// ---------------------------------------------------------------------------
// Internal pipeline result
// ---------------------------------------------------------------------------

struct Collected {
    stats: PipelineStats,
    grouping: Grouping,
}

enum FinalizeError {
    Rejected(GenerationRejection),
    Persistence(anyhow::Error),
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// Per-process generation service. Shareable across threads; all mutable
/// state sits behind the registry's and store's per-requester locks.
pub struct GenerationService {
    catalog: Arc<dyn RecipeCatalog>,
    encoder: Encoder,
    ledger: ResourceLedger,
    store: OutputStore,
    sessions: SessionRegistry,
    protocol: BatchProtocol,
    blank_unit: ItemKey,
    page_size: usize,
}

impl GenerationService {
    pub fn new(
        catalog: Arc<dyn RecipeCatalog>,
        encoder: Encoder,
        ledger: ResourceLedger,
        store: OutputStore,
    ) -> Self {
        let defaults = GeneratorConfig::default();
        Self {
            catalog,
            encoder,
            ledger,
            store,
            sessions: SessionRegistry::with_idle_ttl(defaults.idle_timeout),
            protocol: BatchProtocol::new(defaults.window_capacity),
            blank_unit: ItemKey::new(defaults.blank_unit.id, defaults.blank_unit.variant),
            page_size: defaults.page_size,
        }
    }

    /// Wire a service from a validated config. The catalog doubles as the
    /// tag index for replacement rules.
    pub fn from_config<C>(
        config: &GeneratorConfig,
        catalog: Arc<C>,
        ledger: ResourceLedger,
        backend: Arc<dyn StoreBackend>,
    ) -> Self
    where
        C: RecipeCatalog + TagIndex + 'static,
    {
        let codec: Arc<dyn StackCodec> = match &config.fluid_drop_item {
            Some(drop_item) => Arc::new(FluidDropCodec::new(drop_item.clone())),
            None => Arc::new(PlainCodec),
        };
        let mut encoder = Encoder::new(codec);
        let replacer = TagReplacer::from_rules(config.replacements.iter());
        if replacer.has_rules() {
            tracing::info!(rules = %replacer.to_rule_string(), "tag replacement enabled");
            let index: Arc<dyn TagIndex> = catalog.clone();
            encoder = encoder.with_replacements(replacer, index);
        }

        Self {
            catalog,
            encoder,
            ledger,
            store: OutputStore::new(backend),
            sessions: SessionRegistry::with_idle_ttl(config.idle_timeout),
            protocol: BatchProtocol::new(config.window_capacity),
            blank_unit: ItemKey::new(config.blank_unit.id.clone(), config.blank_unit.variant),
            page_size: config.page_size,
        }
    }

    pub fn with_protocol(mut self, protocol: BatchProtocol) -> Self {
        self.protocol = protocol;
        self
    }

    pub fn with_sessions(mut self, sessions: SessionRegistry) -> Self {
        self.sessions = sessions;
        self
    }

    pub fn with_blank_unit(mut self, unit: ItemKey) -> Self {
        self.blank_unit = unit;
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn blank_unit(&self) -> &ItemKey {
        &self.blank_unit
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn window_capacity(&self) -> usize {
        self.protocol.window_capacity()
    }

    pub fn categories(&self) -> Vec<CategoryInfo> {
        self.catalog.list_categories()
    }

    // -----------------------------------------------------------------------
    // Collect -> filter -> dedupe -> group
    // -----------------------------------------------------------------------

    fn collect(&self, keyword: &str, filters: &FilterSpec) -> Result<Collected, GenerationRejection> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Err(GenerationRejection::EmptyKeyword);
        }

        let categories = self.catalog.find_matching_categories(keyword);
        if categories.is_empty() {
            return Err(GenerationRejection::NoCategory {
                keyword: keyword.to_string(),
            });
        }

        let collected: Vec<RecipeEntry> = categories
            .iter()
            .flat_map(|id| self.catalog.recipes_in(id))
            .collect();
        if collected.is_empty() {
            return Err(GenerationRejection::NoRecipes {
                keyword: keyword.to_string(),
                categories,
            });
        }
        let collected_count = collected.len();

        let chain = FilterChain::from_spec(filters);
        let filtered = chain.apply(collected);
        if filtered.is_empty() {
            return Err(GenerationRejection::NothingMatched {
                collected: collected_count,
                filters: chain.describe(),
            });
        }
        let after_filter = filtered.len();

        let unique = dedupe(filtered);
        let unique_count = unique.len();
        let grouping = group(unique);

        let stats = PipelineStats {
            categories,
            collected: collected_count,
            after_filter,
            unique: unique_count,
            dropped_outputless: grouping.dropped_outputless,
            unambiguous: grouping.unambiguous.len(),
            conflict_groups: grouping.conflicts.len(),
        };
        tracing::debug!(
            keyword,
            collected = stats.collected,
            after_filter = stats.after_filter,
            unique = stats.unique,
            groups = stats.conflict_groups,
            "recipes collected"
        );
        Ok(Collected { stats, grouping })
    }

    /// Run the pipeline up to grouping without opening a session, debiting
    /// or writing anything.
    pub fn preview(&self, keyword: &str, filters: &FilterSpec) -> Result<PreviewReport, GenerationRejection> {
        let collected = self.collect(keyword, filters)?;
        Ok(PreviewReport {
            keyword: keyword.trim().to_string(),
            filters: FilterChain::from_spec(filters).describe(),
            stats: collected.stats,
        })
    }

    // -----------------------------------------------------------------------
    // Generation
    // -----------------------------------------------------------------------

    /// Start a generation. Finalizes immediately when nothing conflicts,
    /// otherwise opens a session and returns its first window.
    ///
    /// `Err` only for storage failures.
    pub fn request_generation(
        &self,
        requester: &RequesterId,
        request: &GenerationRequest,
    ) -> Result<GenerationOutcome> {
        if self.sessions.contains(requester) {
            return Ok(GenerationOutcome::Rejected(GenerationRejection::SessionActive));
        }
        let stored = self.store.count(requester)?;
        if stored > 0 {
            tracing::info!(requester = %requester, stored, "generation refused: unconsumed batch");
            return Ok(GenerationOutcome::Rejected(
                GenerationRejection::UnconsumedBatch { count: stored },
            ));
        }

        let Collected { stats, grouping } = match self.collect(&request.keyword, &request.filters) {
            Ok(c) => c,
            Err(rejection) => {
                tracing::info!(requester = %requester, %rejection, "generation rejected");
                return Ok(GenerationOutcome::Rejected(rejection));
            }
        };
        let source = request.keyword.trim().to_string();

        if !grouping.has_conflicts() {
            return match self.finalize(requester, &source, &grouping.unambiguous) {
                Ok(report) => Ok(GenerationOutcome::Generated { stats, report }),
                Err(FinalizeError::Rejected(rejection)) => Ok(GenerationOutcome::Rejected(rejection)),
                Err(FinalizeError::Persistence(e)) => Err(e),
            };
        }

        let session = ConflictSession::new(*requester, source, grouping.unambiguous, grouping.conflicts);
        let window = self.protocol.window(&session);
        if self.sessions.create(session).is_err() {
            // Lost a race with another request for the same requester.
            return Ok(GenerationOutcome::Rejected(GenerationRejection::SessionActive));
        }
        tracing::info!(
            requester = %requester,
            groups = window.total_groups,
            unambiguous = stats.unambiguous,
            "conflict session opened"
        );
        Ok(GenerationOutcome::NeedsSelection { stats, window })
    }

    /// Current window of the requester's session, if one is live.
    pub fn current_window(&self, requester: &RequesterId) -> Option<ConflictWindow> {
        self.sessions.window(&self.protocol, requester)
    }

    pub fn has_session(&self, requester: &RequesterId) -> bool {
        self.sessions.contains(requester)
    }

    /// Route a selection reply. On completion the batch is finalized exactly
    /// once; the session is already gone by then.
    pub fn submit_selection(
        &self,
        requester: &RequesterId,
        selection: &WindowSelection,
    ) -> Result<ExchangeOutcome> {
        let step = match self.sessions.submit(&self.protocol, requester, selection, Instant::now()) {
            Exchange::NoSession => return Ok(ExchangeOutcome::NoSession),
            Exchange::Step(step) => step,
        };

        Ok(match step {
            ProtocolStep::Window(window) => ExchangeOutcome::Window(window),
            ProtocolStep::Resend { reason, window } => ExchangeOutcome::Resend { reason, window },
            ProtocolStep::IgnoredStale => ExchangeOutcome::IgnoredStale,
            ProtocolStep::Cancelled => {
                tracing::info!(requester = %requester, "generation cancelled");
                ExchangeOutcome::Cancelled
            }
            ProtocolStep::Abort(fault) => ExchangeOutcome::Aborted(fault),
            ProtocolStep::Complete { source, recipes } => {
                match self.finalize(requester, &source, &recipes) {
                    Ok(report) => ExchangeOutcome::Generated(report),
                    Err(FinalizeError::Rejected(rejection)) => ExchangeOutcome::Rejected(rejection),
                    Err(FinalizeError::Persistence(e)) => return Err(e),
                }
            }
        })
    }

    /// Encode, debit, persist. A refused debit leaves the store untouched; a
    /// failed write after a debit is reported, never swallowed.
    fn finalize(
        &self,
        requester: &RequesterId,
        source: &str,
        recipes: &[RecipeEntry],
    ) -> Result<GenerationReport, FinalizeError> {
        let encoded = self.encoder.encode_batch(recipes);
        if encoded.artifacts.is_empty() {
            tracing::info!(requester = %requester, recipes = recipes.len(), "nothing encodable");
            return Err(FinalizeError::Rejected(GenerationRejection::NothingEncoded {
                recipes: recipes.len(),
            }));
        }

        let required = encoded.artifacts.len() as u64;
        let receipt = match self.ledger.debit(requester, &self.blank_unit, required) {
            Ok(receipt) => receipt,
            Err(DebitError::Insufficient {
                required,
                available,
            }) => {
                tracing::info!(requester = %requester, required, available, "generation refused: insufficient blanks");
                return Err(FinalizeError::Rejected(GenerationRejection::Insufficient {
                    required,
                    available,
                }));
            }
        };

        let count = encoded.artifacts.len();
        if let Err(e) = self.store.save(requester, encoded.artifacts, source) {
            tracing::error!(
                requester = %requester,
                debited = receipt.quantity,
                error = %e,
                "batch debited but not persisted"
            );
            return Err(FinalizeError::Persistence(e));
        }

        tracing::info!(
            requester = %requester,
            source,
            encoded = count,
            skipped = encoded.skipped,
            fluids_dropped = encoded.fluids_dropped,
            "batch generated"
        );
        Ok(GenerationReport {
            source: source.to_string(),
            recipes: recipes.len(),
            encoded: count,
            skipped: encoded.skipped,
            fluids_dropped: encoded.fluids_dropped,
            debited_from: receipt.source,
        })
    }

    // -----------------------------------------------------------------------
    // Session lifecycle
    // -----------------------------------------------------------------------

    /// Requester went away: drop any live session. Stored output stays.
    pub fn disconnect(&self, requester: &RequesterId) -> bool {
        let removed = self.sessions.remove(requester);
        if removed {
            tracing::info!(requester = %requester, "session dropped on disconnect");
        }
        removed
    }

    /// Expire idle sessions. No-op unless an idle timeout is configured.
    pub fn sweep_idle(&self) -> Vec<RequesterId> {
        self.sessions.sweep_idle(Instant::now())
    }

    // -----------------------------------------------------------------------
    // Storage
    // -----------------------------------------------------------------------

    pub fn storage_summary(&self, requester: &RequesterId) -> Result<StorageSummary> {
        self.store.summary(requester)
    }

    /// Zero-based page at the configured page size.
    pub fn storage_page(&self, requester: &RequesterId, page: usize) -> Result<StoragePage> {
        self.store.page(requester, page, self.page_size)
    }

    pub fn storage_detail(&self, requester: &RequesterId, index: usize) -> Result<Option<ArtifactDetail>> {
        self.store.detail(requester, index)
    }

    pub fn stored(&self, requester: &RequesterId) -> Result<Vec<GeneratedArtifact>> {
        self.store.load(requester)
    }

    pub fn extract(&self, requester: &RequesterId, max: usize) -> Result<Vec<GeneratedArtifact>> {
        self.store.extract(requester, max)
    }

    pub fn delete_artifact(&self, requester: &RequesterId, index: usize) -> Result<Option<GeneratedArtifact>> {
        self.store.delete(requester, index)
    }

    pub fn clear_storage(&self, requester: &RequesterId) -> Result<()> {
        self.store.clear(requester)
    }
}
