//! Tag replacement rules applied before encoding.
//!
//! A rule `src=dst` swaps any item registered under tag `src` for the first
//! item registered under `dst`, keeping the quantity. Rule text is either
//! `;`-separated (`"ingotCopper=dustCopper;ingotTin=dustTin"`) or one rule per
//! line with `#` comments. Malformed rules are skipped.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use pgen_catalog::TagIndex;
use pgen_schemas::ItemStack;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagRule {
    pub source: String,
    pub target: String,
}

impl TagRule {
    fn parse(rule: &str) -> Option<Self> {
        let (src, dst) = rule.trim().split_once('=')?;
        let (src, dst) = (src.trim(), dst.trim());
        if src.is_empty() || dst.is_empty() {
            return None;
        }
        Some(Self {
            source: src.to_string(),
            target: dst.to_string(),
        })
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TagReplacer {
    rules: Vec<TagRule>,
}

impl TagReplacer {
    /// Parse `;`-separated rules. A later rule for the same source replaces the earlier one.
    pub fn parse(rules: &str) -> Self {
        Self::from_rules(rules.split(';'))
    }

    /// Parse one rule per entry; blank entries and `#` comments are ignored.
    pub fn from_rules<I, S>(rules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out = Self::default();
        for line in rules {
            let line = line.as_ref().trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match TagRule::parse(line) {
                Some(rule) => match out.rules.iter_mut().find(|r| r.source == rule.source) {
                    Some(existing) => existing.target = rule.target,
                    None => out.rules.push(rule),
                },
                None => tracing::debug!(rule = line, "malformed tag replacement rule skipped"),
            }
        }
        out
    }

    pub fn rules(&self) -> &[TagRule] {
        &self.rules
    }

    pub fn has_rules(&self) -> bool {
        !self.rules.is_empty()
    }

    /// `;`-joined form, suitable for [`TagReplacer::parse`].
    pub fn to_rule_string(&self) -> String {
        self.rules
            .iter()
            .map(|r| format!("{}={}", r.source, r.target))
            .collect::<Vec<_>>()
            .join(";")
    }

    /// Replacement for `stack`, or the stack itself when no rule applies or the
    /// target tag has no members. Tags are checked in the item's own order.
    pub fn apply(&self, stack: &ItemStack, index: &dyn TagIndex) -> ItemStack {
        if !self.has_rules() {
            return stack.clone();
        }
        for tag in &stack.tags {
            let Some(rule) = self.rules.iter().find(|r| &r.source == tag) else {
                continue;
            };
            if let Some(mut replacement) = index.first_member(&rule.target) {
                replacement.amount = stack.amount;
                return replacement;
            }
        }
        stack.clone()
    }
}

/// Read a rules file (one rule per line, `#` comments). A missing file means no rules.
pub fn load_rules_file(path: &Path) -> Result<TagReplacer> {
    if !path.exists() {
        return Ok(TagReplacer::default());
    }
    let text = fs::read_to_string(path)
        .with_context(|| format!("read replacement rules failed: {}", path.display()))?;
    Ok(TagReplacer::from_rules(text.lines()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    struct Tags(BTreeMap<&'static str, ItemStack>);

    impl TagIndex for Tags {
        fn first_member(&self, tag: &str) -> Option<ItemStack> {
            self.0.get(tag).cloned()
        }
    }

    fn index() -> Tags {
        let mut m = BTreeMap::new();
        m.insert("dustCopper", ItemStack::new("gt:dust", 35, 1).named("Copper Dust"));
        Tags(m)
    }

    #[test]
    fn parse_skips_malformed_and_keeps_last_duplicate() {
        let r = TagReplacer::parse(" ingotCopper = dustTin ; =x; y=; junk ;ingotCopper=dustCopper;");
        assert_eq!(
            r.rules(),
            &[TagRule {
                source: "ingotCopper".into(),
                target: "dustCopper".into()
            }]
        );
        assert_eq!(r.to_rule_string(), "ingotCopper=dustCopper");
    }

    #[test]
    fn replaces_with_first_member_keeping_amount() {
        let r = TagReplacer::parse("ingotCopper=dustCopper;ingotTin=dustTin");
        let copper = ItemStack::new("gt:ingot", 35, 9).tagged(["ingotCopper"]);
        let out = r.apply(&copper, &index());
        assert_eq!((out.id.as_str(), out.variant, out.amount), ("gt:dust", 35, 9));

        // target tag without members keeps the original
        let tin = ItemStack::new("gt:ingot", 57, 3).tagged(["ingotTin"]);
        assert_eq!(r.apply(&tin, &index()), tin);
    }

    #[test]
    fn rules_file_comments_and_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!load_rules_file(&dir.path().join("none.cfg")).unwrap().has_rules());

        let p = dir.path().join("rules.cfg");
        std::fs::write(&p, "# header\n\ningotCopper=dustCopper\n  # another\nplateIron=plateSteel\n").unwrap();
        let r = load_rules_file(&p).unwrap();
        assert_eq!(r.rules().len(), 2);
    }
}
