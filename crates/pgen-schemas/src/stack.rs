use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// ItemKey
// ---------------------------------------------------------------------------

/// Registry identity of an item: `(id, variant)`.
///
/// `variant` is the host's damage/meta value; `0` is the base item.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemKey {
    pub id: String,
    #[serde(default)]
    pub variant: u32,
}

impl ItemKey {
    pub fn new(id: impl Into<String>, variant: u32) -> Self {
        Self {
            id: id.into(),
            variant,
        }
    }
}

impl fmt::Display for ItemKey {
    /// `id` for the base variant, `id:variant` otherwise.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.variant == 0 {
            write!(f, "{}", self.id)
        } else {
            write!(f, "{}:{}", self.id, self.variant)
        }
    }
}

// ---------------------------------------------------------------------------
// ItemStack
// ---------------------------------------------------------------------------

/// An item requirement or product inside a recipe.
///
/// On the consumable side an `amount` of `0` means "required but not consumed"
/// (a catalytic marker).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    pub id: String,
    #[serde(default)]
    pub variant: u32,
    pub amount: u32,
    #[serde(default)]
    pub display_name: String,
    /// Tag (ore-dictionary style) names this item is registered under.
    #[serde(default)]
    pub tags: Vec<String>,
}

impl ItemStack {
    pub fn new(id: impl Into<String>, variant: u32, amount: u32) -> Self {
        let id = id.into();
        Self {
            display_name: id.clone(),
            id,
            variant,
            amount,
            tags: Vec::new(),
        }
    }

    pub fn named(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    pub fn tagged<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn key(&self) -> ItemKey {
        ItemKey::new(self.id.clone(), self.variant)
    }

    /// Textual identity, `id` or `id:variant`.
    pub fn identifier(&self) -> String {
        self.key().to_string()
    }

    /// `true` when this entry sits on the consumable side but is not consumed.
    pub fn is_catalytic_marker(&self) -> bool {
        self.amount == 0
    }

    /// Display name, falling back to the identifier when the host gave none.
    pub fn label(&self) -> &str {
        if self.display_name.trim().is_empty() {
            &self.id
        } else {
            &self.display_name
        }
    }
}

// ---------------------------------------------------------------------------
// FluidStack
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FluidStack {
    pub id: String,
    /// Volume in host units (millibuckets).
    pub volume: u32,
    #[serde(default)]
    pub display_name: String,
}

impl FluidStack {
    pub fn new(id: impl Into<String>, volume: u32) -> Self {
        let id = id.into();
        Self {
            display_name: id.clone(),
            id,
            volume,
        }
    }

    pub fn label(&self) -> &str {
        if self.display_name.trim().is_empty() {
            &self.id
        } else {
            &self.display_name
        }
    }
}
