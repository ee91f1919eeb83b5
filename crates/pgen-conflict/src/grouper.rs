use std::collections::HashMap;

use pgen_schemas::RecipeEntry;

/// Two or more recipes sharing a primary output. Never holds fewer than 2.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConflictGroup {
    /// Primary output identity, e.g. `item:gregtech:gt.metaitem.01:2032`.
    pub key: String,
    /// Primary output display label shown to the requester.
    pub label: String,
    pub candidates: Vec<RecipeEntry>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Grouping {
    pub unambiguous: Vec<RecipeEntry>,
    /// In first-occurrence order; this is the resolution order.
    pub conflicts: Vec<ConflictGroup>,
    /// Recipes with no output at all, excluded before grouping.
    pub dropped_outputless: usize,
}

impl Grouping {
    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }

    /// Recipes that took part in grouping (input size minus outputless drops).
    pub fn total_recipes(&self) -> usize {
        self.unambiguous.len()
            + self
                .conflicts
                .iter()
                .map(|g| g.candidates.len())
                .sum::<usize>()
    }
}

/// Partition recipes by primary output key.
pub fn group(recipes: Vec<RecipeEntry>) -> Grouping {
    let mut order: Vec<(String, String, Vec<RecipeEntry>)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut dropped = 0usize;

    for r in recipes {
        let Some(key) = r.primary_output_key() else {
            dropped += 1;
            continue;
        };
        match index.get(&key) {
            Some(&i) => order[i].2.push(r),
            None => {
                let label = r.primary_output_label().unwrap_or_else(|| key.clone());
                index.insert(key.clone(), order.len());
                order.push((key, label, vec![r]));
            }
        }
    }

    let mut out = Grouping {
        dropped_outputless: dropped,
        ..Grouping::default()
    };
    for (key, label, mut candidates) in order {
        if candidates.len() == 1 {
            out.unambiguous.append(&mut candidates);
        } else {
            out.conflicts.push(ConflictGroup {
                key,
                label,
                candidates,
            });
        }
    }
    out
}
