//! TOML-backed entitlement policy: bonus tables, join gates, host gates.
//! A plain mapping independent of any platform SDK type.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::types::{EntitlementId, EventKind};

/// One bonus-table row: holding entitlement `id` grants `bonus` extra
/// entries (giveaways) or tickets (lottery first purchase).
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct BonusRule {
    pub id: EntitlementId,
    pub bonus: i64,
}

/// The full entitlement policy for one community.
///
/// Empty `allowed_join` means anyone may join; empty `hosts` means anyone
/// may host. `blacklist` always wins over `allowed_join`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntitlementPolicy {
    #[serde(default)]
    pub giveaway_bonus: Vec<BonusRule>,
    #[serde(default)]
    pub lottery_bonus: Vec<BonusRule>,
    #[serde(default)]
    pub blacklist: Vec<EntitlementId>,
    #[serde(default)]
    pub allowed_join: Vec<EntitlementId>,
    #[serde(default)]
    pub hosts: Vec<EntitlementId>,
}

impl EntitlementPolicy {
    /// Load and parse a TOML policy file.
    pub fn load(path: &Path) -> Result<EntitlementPolicy> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read policy file: {}", path.display()))?;
        let policy: EntitlementPolicy = toml::from_str(&content)
            .with_context(|| format!("Failed to parse policy file: {}", path.display()))?;
        Ok(policy)
    }

    /// The bonus table for one event kind, as a lookup map.
    pub fn bonus_table(&self, kind: EventKind) -> HashMap<EntitlementId, i64> {
        let rules = match kind {
            EventKind::Giveaway => &self.giveaway_bonus,
            EventKind::Lottery => &self.lottery_bonus,
        };
        rules.iter().map(|r| (r.id, r.bonus)).collect()
    }

    pub fn blacklist_set(&self) -> HashSet<EntitlementId> {
        self.blacklist.iter().copied().collect()
    }

    pub fn allowed_join_set(&self) -> HashSet<EntitlementId> {
        self.allowed_join.iter().copied().collect()
    }

    pub fn may_host(&self, held: &HashSet<EntitlementId>) -> bool {
        self.hosts.is_empty() || self.hosts.iter().any(|id| held.contains(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_policy_toml() {
        let policy: EntitlementPolicy = toml::from_str(
            r#"
            blacklist = [900]
            allowed_join = [100]
            hosts = [500]

            [[giveaway_bonus]]
            id = 200
            bonus = 1

            [[lottery_bonus]]
            id = 201
            bonus = 5
            "#,
        )
        .unwrap();

        assert_eq!(policy.bonus_table(EventKind::Giveaway).get(&200), Some(&1));
        assert_eq!(policy.bonus_table(EventKind::Lottery).get(&201), Some(&5));
        assert!(policy.blacklist_set().contains(&900));
        assert!(policy.may_host(&HashSet::from([500])));
        assert!(!policy.may_host(&HashSet::from([42])));
    }

    #[test]
    fn empty_policy_gates_nothing() {
        let policy = EntitlementPolicy::default();
        assert!(policy.may_host(&HashSet::new()));
        assert!(policy.allowed_join_set().is_empty());
        assert!(policy.bonus_table(EventKind::Giveaway).is_empty());
    }
}
