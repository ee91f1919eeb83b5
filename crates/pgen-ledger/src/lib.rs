//! pgen-ledger
//!
//! Blank-resource debit across ordered supply sources.
//!
//! # Invariants
//! - A debit is all-or-nothing: either one source pays the full quantity or
//!   nothing is deducted anywhere.
//! - Sources are tried in order (network pool first, local inventory second).
//!   The first one that can cover the full quantity pays; there is no split.
//! - An unreachable source, or one whose commit fails after a successful
//!   simulate, is skipped with a warning. Only a confirmed shortfall is an error.

mod memory;

pub use memory::MemorySupply;

use std::fmt;
use std::sync::Arc;

use pgen_schemas::{ItemKey, RequesterId};

// ---------------------------------------------------------------------------
// Supply source contract
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SupplyError {
    /// The source cannot be reached right now (e.g. network pool offline).
    Unavailable { source: String, reason: String },
    /// The source refused a debit it had just simulated as possible.
    CommitFailed { source: String, reason: String },
}

impl fmt::Display for SupplyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SupplyError::Unavailable { source, reason } => {
                write!(f, "supply '{source}' unavailable: {reason}")
            }
            SupplyError::CommitFailed { source, reason } => {
                write!(f, "supply '{source}' commit failed: {reason}")
            }
        }
    }
}

impl std::error::Error for SupplyError {}

/// One place blank resources can be taken from.
pub trait SupplySource: Send + Sync {
    fn name(&self) -> &str;

    /// How many `unit`s the requester could pay from this source right now.
    /// Does not deduct anything.
    fn simulate_debit(
        &self,
        requester: &RequesterId,
        unit: &ItemKey,
        quantity: u64,
    ) -> Result<u64, SupplyError>;

    /// Deduct exactly `quantity`. Must deduct nothing on error.
    fn commit_debit(
        &self,
        requester: &RequesterId,
        unit: &ItemKey,
        quantity: u64,
    ) -> Result<(), SupplyError>;
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DebitError {
    /// No single source could cover `required`. `available` is the largest
    /// amount any one source offered.
    Insufficient { required: u64, available: u64 },
}

impl DebitError {
    pub fn shortfall(&self) -> u64 {
        match self {
            DebitError::Insufficient {
                required,
                available,
            } => required.saturating_sub(*available),
        }
    }
}

impl fmt::Display for DebitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DebitError::Insufficient {
                required,
                available,
            } => write!(
                f,
                "insufficient blank resources: need {required}, have {available}"
            ),
        }
    }
}

impl std::error::Error for DebitError {}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DebitReceipt {
    /// Source that paid. `None` for a zero-quantity debit.
    pub source: Option<String>,
    pub quantity: u64,
}

#[derive(Clone, Default)]
pub struct ResourceLedger {
    sources: Vec<Arc<dyn SupplySource>>,
}

impl fmt::Debug for ResourceLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceLedger")
            .field("sources", &self.source_names())
            .finish()
    }
}

impl ResourceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a source; earlier sources have priority.
    pub fn with_source(mut self, source: Arc<dyn SupplySource>) -> Self {
        self.sources.push(source);
        self
    }

    pub fn source_names(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.name().to_string()).collect()
    }

    /// Take `quantity` units from the first source that can pay all of it.
    pub fn debit(
        &self,
        requester: &RequesterId,
        unit: &ItemKey,
        quantity: u64,
    ) -> Result<DebitReceipt, DebitError> {
        if quantity == 0 {
            return Ok(DebitReceipt {
                source: None,
                quantity: 0,
            });
        }

        let mut best = 0u64;
        for source in &self.sources {
            let available = match source.simulate_debit(requester, unit, quantity) {
                Ok(n) => n,
                Err(e) => {
                    tracing::warn!(requester = %requester, error = %e, "supply source skipped");
                    continue;
                }
            };
            best = best.max(available);
            if available < quantity {
                tracing::debug!(requester = %requester, source = source.name(), available, required = quantity, "supply source cannot cover debit");
                continue;
            }
            match source.commit_debit(requester, unit, quantity) {
                Ok(()) => {
                    tracing::info!(requester = %requester, source = source.name(), %unit, quantity, "blank resources debited");
                    return Ok(DebitReceipt {
                        source: Some(source.name().to_string()),
                        quantity,
                    });
                }
                Err(e) => {
                    tracing::warn!(requester = %requester, error = %e, "commit failed after simulate; trying next source");
                }
            }
        }

        tracing::info!(requester = %requester, required = quantity, available = best, "debit refused");
        Err(DebitError::Insufficient {
            required: quantity,
            available: best,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit() -> ItemKey {
        ItemKey::new("appliedenergistics2:item.ItemMultiMaterial", 52)
    }

    fn who() -> RequesterId {
        RequesterId::from_name("alex")
    }

    #[test]
    fn exact_balance_succeeds_and_empties() {
        let inv = Arc::new(MemorySupply::new("inventory"));
        inv.credit(&who(), &unit(), 6);
        let ledger = ResourceLedger::new().with_source(inv.clone());
        let r = ledger.debit(&who(), &unit(), 6).unwrap();
        assert_eq!(r.source.as_deref(), Some("inventory"));
        assert_eq!(inv.balance(&who(), &unit()), 0);
    }

    #[test]
    fn one_short_deducts_nothing() {
        let inv = Arc::new(MemorySupply::new("inventory"));
        inv.credit(&who(), &unit(), 5);
        let ledger = ResourceLedger::new().with_source(inv.clone());
        let err = ledger.debit(&who(), &unit(), 6).unwrap_err();
        assert_eq!(
            err,
            DebitError::Insufficient {
                required: 6,
                available: 5
            }
        );
        assert_eq!(err.shortfall(), 1);
        assert_eq!(err.to_string(), "insufficient blank resources: need 6, have 5");
        assert_eq!(inv.balance(&who(), &unit()), 5);
    }

    #[test]
    fn never_splits_across_sources() {
        let net = Arc::new(MemorySupply::new("network"));
        let inv = Arc::new(MemorySupply::new("inventory"));
        net.credit(&who(), &unit(), 3);
        inv.credit(&who(), &unit(), 4);
        let ledger = ResourceLedger::new()
            .with_source(net.clone())
            .with_source(inv.clone());
        let err = ledger.debit(&who(), &unit(), 5).unwrap_err();
        assert_eq!(
            err,
            DebitError::Insufficient {
                required: 5,
                available: 4
            }
        );
        assert_eq!(net.balance(&who(), &unit()), 3);
        assert_eq!(inv.balance(&who(), &unit()), 4);
    }

    #[test]
    fn offline_and_failing_sources_fall_through() {
        let net = Arc::new(MemorySupply::new("network"));
        net.credit(&who(), &unit(), 100);
        net.set_online(false);
        let flaky = Arc::new(MemorySupply::new("flaky"));
        flaky.credit(&who(), &unit(), 100);
        flaky.fail_commits(true);
        let inv = Arc::new(MemorySupply::new("inventory"));
        inv.credit(&who(), &unit(), 10);

        let ledger = ResourceLedger::new()
            .with_source(net.clone())
            .with_source(flaky.clone())
            .with_source(inv.clone());
        let r = ledger.debit(&who(), &unit(), 10).unwrap();
        assert_eq!(r.source.as_deref(), Some("inventory"));
        assert_eq!(net.balance(&who(), &unit()), 100);
        assert_eq!(flaky.balance(&who(), &unit()), 100);
        assert_eq!(inv.balance(&who(), &unit()), 0);
    }

    #[test]
    fn zero_quantity_is_free() {
        let ledger = ResourceLedger::new();
        let r = ledger.debit(&who(), &unit(), 0).unwrap();
        assert_eq!(r, DebitReceipt { source: None, quantity: 0 });
        assert!(ledger.debit(&who(), &unit(), 1).is_err());
    }
}
