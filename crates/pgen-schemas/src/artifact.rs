//! Encoded pattern artifacts.
//!
//! An artifact is opaque to everything downstream of the encoder except for its
//! input/output lists, which the store uses for previews and detail views.
//!
//! # Counts
//! The host's native stack field is small. Quantities above
//! [`NATIVE_STACK_LIMIT`] additionally carry a wide counter. When both fields are
//! present they hold the same value, except that the native field saturates at
//! `u32::MAX` and the wide counter keeps the full quantity.

use serde::{Deserialize, Serialize};

use crate::stack::ItemStack;

/// Largest quantity the host's native stack-size field is trusted to carry.
pub const NATIVE_STACK_LIMIT: u32 = 127;

// ---------------------------------------------------------------------------
// EncodedStack
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedStack {
    pub id: String,
    #[serde(default)]
    pub variant: u32,
    #[serde(default)]
    pub display_name: String,
    /// Native-width count.
    pub count: u32,
    /// Wide counter, present whenever the quantity exceeds the native limit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wide_count: Option<u64>,
}

impl EncodedStack {
    /// Encode an item stack, adding the wide counter when required.
    pub fn from_stack(stack: &ItemStack) -> Self {
        let wide_count = if stack.amount > NATIVE_STACK_LIMIT {
            Some(u64::from(stack.amount))
        } else {
            None
        };
        Self {
            id: stack.id.clone(),
            variant: stack.variant,
            display_name: stack.label().to_string(),
            count: stack.amount,
            wide_count,
        }
    }

    /// Quantity as a reader should interpret it: wide value when positive,
    /// otherwise the native count, never less than 1.
    pub fn effective_count(&self) -> u64 {
        let raw = match self.wide_count {
            Some(w) if w > 0 => w,
            _ => u64::from(self.count),
        };
        raw.max(1)
    }

    /// Repair a stack whose fields are zero or disagree.
    ///
    /// The wide counter is authoritative and is never narrowed. Returns `true`
    /// if anything changed.
    pub fn normalize(&mut self) -> bool {
        let target = self.effective_count();
        let native = u32::try_from(target).unwrap_or(u32::MAX);

        let wants_wide = self.wide_count.is_some() || target > u64::from(NATIVE_STACK_LIMIT);
        let wide_target = wants_wide.then_some(target);

        let changed = self.count != native || self.wide_count != wide_target;
        self.count = native;
        self.wide_count = wide_target;
        changed
    }

    /// `true` when both count fields are present and agree, or only the native
    /// field is present and within the limit. A wide value beyond `u32::MAX`
    /// agrees with a saturated native field.
    pub fn counts_consistent(&self) -> bool {
        match self.wide_count {
            Some(w) => match u32::try_from(w) {
                Ok(n) => n == self.count,
                Err(_) => self.count == u32::MAX,
            },
            None => self.count <= NATIVE_STACK_LIMIT,
        }
    }

    fn label(&self) -> &str {
        if self.display_name.trim().is_empty() {
            &self.id
        } else {
            &self.display_name
        }
    }

    /// `"name xN"` (always includes the count).
    pub fn detail_line(&self) -> String {
        format!("{} x{}", self.label(), self.effective_count())
    }
}

// ---------------------------------------------------------------------------
// GeneratedArtifact
// ---------------------------------------------------------------------------

/// A processing pattern produced from one recipe.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedArtifact {
    pub inputs: Vec<EncodedStack>,
    pub outputs: Vec<EncodedStack>,
    /// Always `false`: generated patterns are processing patterns.
    #[serde(default)]
    pub crafting: bool,
    #[serde(default)]
    pub substitute: bool,
    /// Category of the recipe this artifact was encoded from.
    #[serde(default)]
    pub category: String,
}

/// Input/output lines of one stored artifact.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactDetail {
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
}

impl GeneratedArtifact {
    /// Outputs joined by `", "`; a count suffix only appears when it exceeds 1.
    pub fn output_summary(&self) -> String {
        let parts: Vec<String> = self
            .outputs
            .iter()
            .map(|s| {
                let n = s.effective_count();
                if n > 1 {
                    format!("{} x{}", s.label(), n)
                } else {
                    s.label().to_string()
                }
            })
            .collect();
        if parts.is_empty() {
            "?".to_string()
        } else {
            parts.join(", ")
        }
    }

    pub fn detail(&self) -> ArtifactDetail {
        ArtifactDetail {
            inputs: self.inputs.iter().map(EncodedStack::detail_line).collect(),
            outputs: self.outputs.iter().map(EncodedStack::detail_line).collect(),
        }
    }

    /// Normalize every stack on both sides. Returns `true` if any changed.
    pub fn normalize_counts(&mut self) -> bool {
        let mut changed = false;
        for s in self.inputs.iter_mut().chain(self.outputs.iter_mut()) {
            changed |= s.normalize();
        }
        changed
    }
}
