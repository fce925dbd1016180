use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::RwLock;

/// Lifecycle of a peer from the engine's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerCtrl {
    Running,
    Stopped,
    /// Banished from immediate reconnection due to error rate or slowness.
    Zombie,
}

/// Per-peer error counters and control state: `{nHdrRespErrors,
/// nHdrProcErrors, nBdyRespErrors, nBdyProcErrors, ctrl}`.
pub struct PeerState {
    ctrl: RwLock<PeerCtrl>,
    n_hdr_resp_errors: AtomicU32,
    n_hdr_proc_errors: AtomicU32,
    n_bdy_resp_errors: AtomicU32,
    n_bdy_proc_errors: AtomicU32,
}

impl PeerState {
    pub fn new() -> Self {
        Self {
            ctrl: RwLock::new(PeerCtrl::Running),
            n_hdr_resp_errors: AtomicU32::new(0),
            n_hdr_proc_errors: AtomicU32::new(0),
            n_bdy_resp_errors: AtomicU32::new(0),
            n_bdy_proc_errors: AtomicU32::new(0),
        }
    }

    pub fn ctrl(&self) -> PeerCtrl {
        *self.ctrl.read()
    }

    pub fn is_stopped(&self) -> bool {
        matches!(self.ctrl(), PeerCtrl::Stopped | PeerCtrl::Zombie)
    }

    pub fn is_zombie(&self) -> bool {
        self.ctrl() == PeerCtrl::Zombie
    }

    pub fn request_stop(&self) {
        let mut ctrl = self.ctrl.write();
        if *ctrl == PeerCtrl::Running {
            *ctrl = PeerCtrl::Stopped;
        }
    }

    /// Banishes the peer from immediate reconnection. Sticky: never
    /// reverts to `Running`/`Stopped`.
    pub fn mark_zombie(&self) {
        *self.ctrl.write() = PeerCtrl::Zombie;
    }

    pub fn inc_header_resp_errors(&self) -> u32 {
        self.n_hdr_resp_errors.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn inc_header_proc_errors(&self) -> u32 {
        self.n_hdr_proc_errors.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn inc_body_resp_errors(&self) -> u32 {
        self.n_bdy_resp_errors.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn inc_body_proc_errors(&self) -> u32 {
        self.n_bdy_proc_errors.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Stops and zombifies the peer once `count` crosses `threshold`, per
    /// the zombification rule in the header/body fetch loops' total-failure
    /// branch: a peer that keeps producing bad batches is banished rather
    /// than retried forever.
    pub fn zombify_if_over_threshold(&self, count: u32, threshold: u32) {
        if count > threshold {
            self.request_stop();
            self.mark_zombie();
        }
    }
}

impl Default for PeerState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zombify_stops_and_zombifies_once_over_threshold() {
        let peer = PeerState::new();

        let count = peer.inc_header_proc_errors();
        peer.zombify_if_over_threshold(count, 10);
        assert_eq!(peer.ctrl(), PeerCtrl::Running, "under threshold, must not zombify");

        for _ in 0..9 {
            let count = peer.inc_header_proc_errors();
            peer.zombify_if_over_threshold(count, 10);
        }
        assert_eq!(peer.ctrl(), PeerCtrl::Running, "still at threshold, must not zombify");

        let count = peer.inc_header_proc_errors();
        peer.zombify_if_over_threshold(count, 10);
        assert!(peer.is_zombie(), "over threshold, must stop and zombify in one call");
    }

    #[test]
    fn zombie_is_sticky() {
        let peer = PeerState::new();
        peer.mark_zombie();
        peer.request_stop();
        assert!(peer.is_zombie());
    }
}
