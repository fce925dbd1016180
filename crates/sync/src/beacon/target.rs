use ethereum_core::Header;
use ethereum_types::{H256, U256};
use parking_lot::RwLock;

struct TargetState {
    cons_head: Header,
    final_hash: H256,
    final_number: u64,
    locked: bool,
    changed: bool,
}

/// A read-mostly snapshot of the current sync target, safe to clone out of
/// the lock.
#[derive(Debug, Clone)]
pub struct TargetSnapshot {
    pub cons_head: Header,
    pub final_hash: H256,
    pub final_number: u64,
}

/// The consensus layer's published sync target: `{consHead, finalHash,
/// final, locked, changed}`. `changed` signals a fresh target to the
/// controller; `locked` prevents concurrent target updates while a header
/// is being fetched for validation.
pub struct Target {
    state: RwLock<TargetState>,
}

impl Target {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(TargetState {
                cons_head: Header::new(),
                final_hash: H256::zero(),
                final_number: 0,
                locked: false,
                changed: false,
            }),
        }
    }

    /// Attempts to acquire the validation lock; returns `false` if already
    /// held.
    pub fn try_lock(&self) -> bool {
        let mut state = self.state.write();
        if state.locked {
            return false;
        }
        state.locked = true;
        true
    }

    pub fn unlock(&self) {
        self.state.write().locked = false;
    }

    pub fn is_locked(&self) -> bool {
        self.state.read().locked
    }

    /// Reads and clears the `changed` flag in one step.
    pub fn take_changed(&self) -> bool {
        let mut state = self.state.write();
        std::mem::take(&mut state.changed)
    }

    pub fn snapshot(&self) -> TargetSnapshot {
        let state = self.state.read();
        TargetSnapshot {
            cons_head: state.cons_head.clone(),
            final_hash: state.final_hash,
            final_number: state.final_number,
        }
    }

    pub fn final_number(&self) -> u64 {
        self.state.read().final_number
    }

    /// RPC ingress callback: stores `(cons_head, final_hash)` and sets
    /// `changed`, but only if `cons_head` is strictly above both
    /// `current_head_number` (the FC-known latest) and the already-stored
    /// target head. Returns whether the target was updated.
    pub fn update_beacon_header_cb(
        &self,
        cons_head: Header,
        final_hash: H256,
        current_head_number: u64,
    ) -> bool {
        let incoming = cons_head.number;
        let mut state = self.state.write();
        if incoming <= U256::from(current_head_number) || incoming <= state.cons_head.number {
            return false;
        }
        state.cons_head = cons_head;
        state.final_hash = final_hash;
        state.changed = true;
        true
    }

    /// Accepts a finalised-block update if `finalised >= base_number`,
    /// otherwise drops it. Returns whether it was accepted.
    pub fn update_final_block_header(&self, finalised: u64, final_hash: H256, base_number: u64) -> bool {
        if finalised < base_number {
            return false;
        }
        let mut state = self.state.write();
        state.final_number = finalised;
        state.final_hash = final_hash;
        true
    }
}

impl Default for Target {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_at(number: u64) -> Header {
        let mut h = Header::new();
        h.number = U256::from(number);
        h
    }

    #[test]
    fn update_beacon_header_rejects_non_advancing_head() {
        let target = Target::new();
        assert!(target.update_beacon_header_cb(header_at(100), H256::zero(), 50));
        assert!(!target.update_beacon_header_cb(header_at(100), H256::zero(), 50));
        assert!(!target.update_beacon_header_cb(header_at(90), H256::zero(), 95));
    }

    #[test]
    fn update_beacon_header_sets_changed_flag() {
        let target = Target::new();
        assert!(!target.take_changed());
        target.update_beacon_header_cb(header_at(10), H256::zero(), 0);
        assert!(target.take_changed());
        assert!(!target.take_changed());
    }

    #[test]
    fn update_final_block_header_drops_below_base() {
        let target = Target::new();
        assert!(!target.update_final_block_header(5, H256::zero(), 10));
        assert_eq!(target.final_number(), 0);
        assert!(target.update_final_block_header(15, H256::zero(), 10));
        assert_eq!(target.final_number(), 15);
    }

    #[test]
    fn lock_is_exclusive() {
        let target = Target::new();
        assert!(target.try_lock());
        assert!(!target.try_lock());
        target.unlock();
        assert!(target.try_lock());
    }
}
