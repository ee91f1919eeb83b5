//! pgen-filter
//!
//! Recipe filter chain.
//! - Filters are a closed set of tagged variants ([`Filter`])
//! - A chain is the conjunction of its filters; an empty chain matches everything
//! - A blank or `*` criterion is a no-op
//! - Bad regex text degrades to a case-insensitive literal match, never an error
//!
//! Pure predicates: no IO, no side effects.

mod chain;
mod filter;
mod matcher;
mod tier;

pub use chain::{FilterChain, FilterSpec};
pub use filter::{BlacklistSides, Filter, TierSelector};
pub use matcher::{is_wildcard, TextMatcher};
pub use tier::{tier_of, TIER_BASE, TIER_DIVISOR};
