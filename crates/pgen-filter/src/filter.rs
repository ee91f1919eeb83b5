use std::fmt;

use serde::{Deserialize, Serialize};

use pgen_schemas::{ItemStack, RecipeEntry};

use crate::matcher::{is_wildcard, TextMatcher};
use crate::tier::tier_of;

/// Tier criterion. `Any` is the "don't care" sentinel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "tier", rename_all = "snake_case")]
pub enum TierSelector {
    #[default]
    Any,
    Exact(u8),
}

/// Which side(s) of a recipe a blacklist inspects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlacklistSides {
    pub inputs: bool,
    pub outputs: bool,
}

impl BlacklistSides {
    pub const INPUTS: Self = Self {
        inputs: true,
        outputs: false,
    };
    pub const OUTPUTS: Self = Self {
        inputs: false,
        outputs: true,
    };
    pub const BOTH: Self = Self {
        inputs: true,
        outputs: true,
    };
}

/// One filter criterion. The serialized form is the declarative description;
/// [`crate::FilterChain`] compiles patterns once before evaluating recipes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Filter {
    /// Any output item carries a tag matching `pattern`.
    OutputTag { pattern: String },
    /// Any input item carries a tag matching `pattern`.
    InputTag { pattern: String },
    /// Any catalyst or zero-quantity input matches `pattern`
    /// (exact `id[:variant]`, else textual).
    NonConsumed { pattern: String },
    /// Recipe tier equals the selector.
    Tier { selector: TierSelector },
    /// Rejects recipes where a name or tag on a selected side matches `pattern`.
    Blacklist { pattern: String, sides: BlacklistSides },
    /// Exact category id.
    Category { id: String },
}

impl Filter {
    pub fn output_tag(pattern: impl Into<String>) -> Self {
        Self::OutputTag {
            pattern: pattern.into(),
        }
    }

    pub fn input_tag(pattern: impl Into<String>) -> Self {
        Self::InputTag {
            pattern: pattern.into(),
        }
    }

    pub fn non_consumed(pattern: impl Into<String>) -> Self {
        Self::NonConsumed {
            pattern: pattern.into(),
        }
    }

    pub fn tier(tier: u8) -> Self {
        Self::Tier {
            selector: TierSelector::Exact(tier),
        }
    }

    pub fn blacklist(pattern: impl Into<String>, sides: BlacklistSides) -> Self {
        Self::Blacklist {
            pattern: pattern.into(),
            sides,
        }
    }

    pub fn category(id: impl Into<String>) -> Self {
        Self::Category { id: id.into() }
    }

    /// `true` when the criterion matches every recipe.
    pub fn is_noop(&self) -> bool {
        match self {
            Filter::OutputTag { pattern }
            | Filter::InputTag { pattern }
            | Filter::NonConsumed { pattern }
            | Filter::Blacklist { pattern, .. } => is_wildcard(pattern),
            Filter::Tier { selector } => *selector == TierSelector::Any,
            Filter::Category { id } => id.trim().is_empty(),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::OutputTag { pattern } => write!(f, "output tag ~ {pattern}"),
            Filter::InputTag { pattern } => write!(f, "input tag ~ {pattern}"),
            Filter::NonConsumed { pattern } => write!(f, "non-consumed ~ {pattern}"),
            Filter::Tier { selector } => match selector {
                TierSelector::Any => write!(f, "tier any"),
                TierSelector::Exact(t) => write!(f, "tier {t}"),
            },
            Filter::Blacklist { pattern, sides } => {
                let side = match (sides.inputs, sides.outputs) {
                    (true, true) => "inputs+outputs",
                    (true, false) => "inputs",
                    (false, true) => "outputs",
                    (false, false) => "none",
                };
                write!(f, "blacklist {side} ~ {pattern}")
            }
            Filter::Category { id } => write!(f, "category = {id}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Compiled form
// ---------------------------------------------------------------------------

/// `id` or `id:variant` parsed from a non-consumed pattern.
#[derive(Clone, Debug)]
struct IdentityPattern {
    id: String,
    variant: Option<u32>,
}

impl IdentityPattern {
    fn parse(pattern: &str) -> Option<Self> {
        let p = pattern.trim();
        if p.is_empty() {
            return None;
        }
        if let Some((head, tail)) = p.rsplit_once(':') {
            if let Ok(variant) = tail.parse::<u32>() {
                if head.is_empty() {
                    return None;
                }
                return Some(Self {
                    id: head.to_string(),
                    variant: Some(variant),
                });
            }
        }
        Some(Self {
            id: p.to_string(),
            variant: None,
        })
    }

    fn matches(&self, stack: &ItemStack) -> bool {
        stack.id.eq_ignore_ascii_case(&self.id)
            && self.variant.map_or(true, |v| v == stack.variant)
    }
}

#[derive(Clone, Debug)]
pub(crate) enum CompiledFilter {
    Pass,
    OutputTag(TextMatcher),
    InputTag(TextMatcher),
    NonConsumed {
        identity: Option<IdentityPattern>,
        text: TextMatcher,
    },
    Tier(u8),
    Blacklist {
        text: TextMatcher,
        sides: BlacklistSides,
    },
    Category(String),
}

impl CompiledFilter {
    pub(crate) fn compile(filter: &Filter) -> Self {
        if filter.is_noop() {
            return CompiledFilter::Pass;
        }
        match filter {
            Filter::OutputTag { pattern } => CompiledFilter::OutputTag(TextMatcher::new(pattern)),
            Filter::InputTag { pattern } => CompiledFilter::InputTag(TextMatcher::new(pattern)),
            Filter::NonConsumed { pattern } => CompiledFilter::NonConsumed {
                identity: IdentityPattern::parse(pattern),
                text: TextMatcher::new(pattern),
            },
            Filter::Tier { selector } => match selector {
                TierSelector::Any => CompiledFilter::Pass,
                TierSelector::Exact(t) => CompiledFilter::Tier(*t),
            },
            Filter::Blacklist { pattern, sides } => CompiledFilter::Blacklist {
                text: TextMatcher::new(pattern),
                sides: *sides,
            },
            Filter::Category { id } => CompiledFilter::Category(id.trim().to_string()),
        }
    }

    pub(crate) fn matches(&self, recipe: &RecipeEntry) -> bool {
        match self {
            CompiledFilter::Pass => true,
            CompiledFilter::OutputTag(m) => any_tag(&recipe.outputs, m),
            CompiledFilter::InputTag(m) => any_tag(&recipe.inputs, m),
            CompiledFilter::NonConsumed { identity, text } => {
                let mut candidates = recipe.non_consumed_items();
                candidates.any(|s| {
                    identity.as_ref().is_some_and(|id| id.matches(s))
                        || text.is_match(&s.identifier())
                        || text.is_match(s.label())
                })
            }
            CompiledFilter::Tier(t) => tier_of(recipe.rate) == *t,
            CompiledFilter::Blacklist { text, sides } => {
                let hit_in = sides.inputs && any_name_or_tag(&recipe.inputs, text);
                let hit_out = sides.outputs && any_name_or_tag(&recipe.outputs, text);
                !(hit_in || hit_out)
            }
            CompiledFilter::Category(id) => recipe.category == *id,
        }
    }
}

fn any_tag(stacks: &[ItemStack], m: &TextMatcher) -> bool {
    stacks.iter().any(|s| s.tags.iter().any(|t| m.is_match(t)))
}

fn any_name_or_tag(stacks: &[ItemStack], m: &TextMatcher) -> bool {
    stacks
        .iter()
        .any(|s| m.is_match(s.label()) || s.tags.iter().any(|t| m.is_match(t)))
}
