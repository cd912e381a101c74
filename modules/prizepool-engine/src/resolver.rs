//! Entitlement resolution: maps a participant's current entitlement set to
//! an entry weight, and gates joining and hosting.
//!
//! Weight is resolved at join time and never recomputed wholesale — only
//! delta-adjusted by the entitlement-change hooks.

use std::collections::{HashMap, HashSet};

use prizepool_common::policy::EntitlementPolicy;
use prizepool_common::types::{EntitlementId, EventKind};
use prizepool_common::{PrizepoolError, Result};

pub struct EntitlementResolver {
    giveaway_bonus: HashMap<EntitlementId, i64>,
    lottery_bonus: HashMap<EntitlementId, i64>,
    blacklist: HashSet<EntitlementId>,
    allowed_join: HashSet<EntitlementId>,
    policy: EntitlementPolicy,
}

impl EntitlementResolver {
    pub fn new(policy: EntitlementPolicy) -> Self {
        Self {
            giveaway_bonus: policy.bonus_table(EventKind::Giveaway),
            lottery_bonus: policy.bonus_table(EventKind::Lottery),
            blacklist: policy.blacklist_set(),
            allowed_join: policy.allowed_join_set(),
            policy,
        }
    }

    fn table(&self, kind: EventKind) -> &HashMap<EntitlementId, i64> {
        match kind {
            EventKind::Giveaway => &self.giveaway_bonus,
            EventKind::Lottery => &self.lottery_bonus,
        }
    }

    /// Bonus entries/tickets for the held entitlements. Unknown ids are
    /// ignored, not errors.
    pub fn bonus(&self, kind: EventKind, held: &HashSet<EntitlementId>) -> i64 {
        self.table(kind)
            .iter()
            .filter(|(id, _)| held.contains(*id))
            .map(|(_, b)| b)
            .sum()
    }

    /// Giveaway join weight: 1 base + bonuses.
    pub fn weight(&self, kind: EventKind, held: &HashSet<EntitlementId>) -> i64 {
        1 + self.bonus(kind, held)
    }

    /// May this participant enter events at all?
    pub fn check_join(&self, held: &HashSet<EntitlementId>) -> Result<()> {
        if held.iter().any(|id| self.blacklist.contains(id)) {
            return Err(PrizepoolError::Validation(
                "You are not allowed to enter this event".to_string(),
            ));
        }
        if !self.allowed_join.is_empty() && !held.iter().any(|id| self.allowed_join.contains(id)) {
            return Err(PrizepoolError::Validation(
                "You are missing the membership required to enter this event".to_string(),
            ));
        }
        Ok(())
    }

    /// May this participant host events?
    pub fn check_host(&self, held: &HashSet<EntitlementId>) -> Result<()> {
        if !self.policy.may_host(held) {
            return Err(PrizepoolError::Validation(
                "You do not have permission to host events".to_string(),
            ));
        }
        Ok(())
    }

    pub fn is_blacklisted(&self, entitlement: EntitlementId) -> bool {
        self.blacklist.contains(&entitlement)
    }

    /// True when losing this entitlement revokes the right to stay entered.
    pub fn is_join_requirement(&self, entitlement: EntitlementId) -> bool {
        self.allowed_join.contains(&entitlement)
    }

    /// The giveaway bonus attached to a single entitlement, if any.
    pub fn giveaway_bonus_of(&self, entitlement: EntitlementId) -> Option<i64> {
        self.giveaway_bonus.get(&entitlement).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prizepool_common::policy::BonusRule;

    fn resolver() -> EntitlementResolver {
        EntitlementResolver::new(EntitlementPolicy {
            giveaway_bonus: vec![
                BonusRule { id: 10, bonus: 1 },
                BonusRule { id: 11, bonus: 2 },
            ],
            lottery_bonus: vec![BonusRule { id: 20, bonus: 5 }],
            blacklist: vec![90],
            allowed_join: vec![1],
            hosts: vec![50],
        })
    }

    #[test]
    fn base_weight_is_one() {
        let r = resolver();
        assert_eq!(r.weight(EventKind::Giveaway, &HashSet::from([1])), 1);
    }

    #[test]
    fn bonuses_stack_and_unknown_ids_are_ignored() {
        let r = resolver();
        let held = HashSet::from([1, 10, 11, 999]);
        assert_eq!(r.weight(EventKind::Giveaway, &held), 4);
        // Lottery table is independent of the giveaway table.
        assert_eq!(r.bonus(EventKind::Lottery, &held), 0);
        assert_eq!(r.bonus(EventKind::Lottery, &HashSet::from([20])), 5);
    }

    #[test]
    fn blacklist_wins_over_membership() {
        let r = resolver();
        assert!(r.check_join(&HashSet::from([1, 90])).is_err());
        assert!(r.check_join(&HashSet::from([1])).is_ok());
    }

    #[test]
    fn membership_gate_applies_when_configured() {
        let r = resolver();
        assert!(r.check_join(&HashSet::from([2])).is_err());
    }

    #[test]
    fn host_gate() {
        let r = resolver();
        assert!(r.check_host(&HashSet::from([50])).is_ok());
        assert!(r.check_host(&HashSet::from([1])).is_err());
    }
}
