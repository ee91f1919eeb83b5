//! Conflict-resolution wire messages.
//!
//! Transport-agnostic: the session holder sends [`ConflictWindow`], the
//! requester answers with [`WindowSelection`]. Both are plain serde types.

use serde::{Deserialize, Serialize};

use crate::recipe::RecipeEntry;
use crate::stack::{FluidStack, ItemStack};

/// One displayable line of a candidate recipe.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryLine {
    pub name: String,
    pub amount: u64,
}

impl SummaryLine {
    fn item(s: &ItemStack) -> Self {
        Self {
            name: s.label().to_string(),
            amount: u64::from(s.amount),
        }
    }

    fn fluid(f: &FluidStack) -> Self {
        Self {
            name: f.label().to_string(),
            amount: u64::from(f.volume),
        }
    }
}

/// What the requester sees of one candidate recipe.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateSummary {
    pub category: String,
    pub inputs: Vec<SummaryLine>,
    pub outputs: Vec<SummaryLine>,
    pub fluid_inputs: Vec<SummaryLine>,
    pub fluid_outputs: Vec<SummaryLine>,
    /// Catalytic items and zero-amount inputs.
    pub non_consumed: Vec<SummaryLine>,
    pub duration: u32,
    pub rate: u32,
}

impl CandidateSummary {
    pub fn from_recipe(r: &RecipeEntry) -> Self {
        Self {
            category: r.category.clone(),
            inputs: r.consumed_inputs().map(SummaryLine::item).collect(),
            outputs: r.outputs.iter().map(SummaryLine::item).collect(),
            fluid_inputs: r.fluid_inputs.iter().map(SummaryLine::fluid).collect(),
            fluid_outputs: r.fluid_outputs.iter().map(SummaryLine::fluid).collect(),
            non_consumed: r.non_consumed_items().map(SummaryLine::item).collect(),
            duration: r.duration,
            rate: r.rate,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowGroup {
    pub label: String,
    pub candidates: Vec<CandidateSummary>,
}

/// Session holder → requester: a bounded slice of unresolved conflict groups.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictWindow {
    /// 1-based resolution index of the first group in this window. Doubles as
    /// the staleness token the requester must echo back.
    pub start_index: u32,
    pub total_groups: u32,
    /// Size of the largest group in the whole session, not just this window.
    pub max_candidates_in_any_group: u32,
    pub groups: Vec<WindowGroup>,
}

impl ConflictWindow {
    /// 1-based index of the last group in this window (inclusive).
    pub fn end_index(&self) -> u32 {
        self.start_index + self.groups.len() as u32 - 1
    }
}

/// Requester → session holder: choices for the window starting at
/// `expected_start_index`, or a cancel.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSelection {
    pub expected_start_index: u32,
    #[serde(default)]
    pub cancel: bool,
    /// Chosen candidate index per group, in window order. Signed so that a
    /// malformed negative index survives decoding and is rejected by the session.
    #[serde(default)]
    pub choices: Vec<i64>,
}

impl WindowSelection {
    pub fn choose(expected_start_index: u32, choices: Vec<i64>) -> Self {
        Self {
            expected_start_index,
            cancel: false,
            choices,
        }
    }

    pub fn cancel(expected_start_index: u32) -> Self {
        Self {
            expected_start_index,
            cancel: true,
            choices: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_round_trips_through_json() {
        let sel = WindowSelection::choose(7, vec![0, 2, -1]);
        let json = serde_json::to_string(&sel).unwrap();
        let back: WindowSelection = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sel);
    }

    #[test]
    fn cancel_defaults_when_absent() {
        let sel: WindowSelection =
            serde_json::from_str(r#"{"expected_start_index":1,"choices":[0]}"#).unwrap();
        assert!(!sel.cancel);
    }

    #[test]
    fn summary_separates_consumed_and_catalytic_inputs() {
        let r = RecipeEntry {
            source: "gt".into(),
            category: "cat".into(),
            display_name: String::new(),
            inputs: vec![ItemStack::new("a", 0, 2), ItemStack::new("circuit", 1, 0)],
            outputs: vec![ItemStack::new("b", 0, 1)],
            fluid_inputs: vec![],
            fluid_outputs: vec![],
            catalysts: vec![],
            duration: 20,
            rate: 8,
        };
        let s = CandidateSummary::from_recipe(&r);
        assert_eq!(s.inputs.len(), 1);
        assert_eq!(s.non_consumed.len(), 1);
        assert_eq!(s.non_consumed[0].name, "circuit");
    }
}
