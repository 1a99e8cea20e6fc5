//! Active validator set maintained from genesis and end-block updates.

use std::collections::BTreeMap;

use abci_types::{PublicKey, ValidatorUpdate};

/// Validators keyed by public key, with their voting power.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidatorSet {
    members: BTreeMap<PublicKey, u64>,
}

impl ValidatorSet {
    /// Builds an empty set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            members: BTreeMap::new(),
        }
    }

    /// Builds a set from genesis updates. Zero-power entries are skipped.
    #[must_use]
    pub fn from_updates(updates: &[ValidatorUpdate]) -> Self {
        let mut set = Self::new();
        set.apply(updates);
        set
    }

    /// Applies updates in order; a power of zero removes the validator.
    pub fn apply(&mut self, updates: &[ValidatorUpdate]) {
        for update in updates {
            if update.is_removal() {
                self.members.remove(&update.public_key);
            } else {
                self.members.insert(update.public_key.clone(), update.power);
            }
        }
    }

    /// Voting power of `key`, if it is an active validator.
    #[must_use]
    pub fn power_of(&self, key: &PublicKey) -> Option<u64> {
        self.members.get(key).copied()
    }

    /// Returns `true` when `key` is an active validator.
    #[must_use]
    pub fn contains(&self, key: &PublicKey) -> bool {
        self.members.contains_key(key)
    }

    /// Number of active validators.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Returns `true` when no validator is active.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Sum of all voting power, saturating at `u64::MAX`.
    #[must_use]
    pub fn total_power(&self) -> u64 {
        self.members
            .values()
            .fold(0_u64, |total, power| total.saturating_add(*power))
    }

    /// The set as updates, ordered by key.
    #[must_use]
    pub fn to_updates(&self) -> Vec<ValidatorUpdate> {
        self.members
            .iter()
            .map(|(key, power)| ValidatorUpdate::new(key.clone(), *power))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(byte: u8) -> PublicKey {
        PublicKey::ed25519(vec![byte; 4])
    }

    #[test]
    fn genesis_skips_zero_power() {
        let set = ValidatorSet::from_updates(&[
            ValidatorUpdate::new(key(1), 10),
            ValidatorUpdate::new(key(2), 0),
        ]);
        assert_eq!(set.len(), 1);
        assert!(!set.contains(&key(2)));
    }

    #[test]
    fn updates_replace_power_and_remove() {
        let mut set = ValidatorSet::from_updates(&[
            ValidatorUpdate::new(key(1), 10),
            ValidatorUpdate::new(key(2), 5),
        ]);
        set.apply(&[
            ValidatorUpdate::new(key(1), 0),
            ValidatorUpdate::new(key(2), 7),
            ValidatorUpdate::new(key(3), 1),
        ]);
        assert!(!set.contains(&key(1)));
        assert_eq!(set.power_of(&key(2)), Some(7));
        assert_eq!(set.total_power(), 8);
    }
}
