use std::time::Duration;

/// Tunables for the beacon sync engine, grouped the way
/// `ethereum_sync::SyncConfig` groups the legacy sync modes' knobs.
#[derive(Debug, Clone)]
pub struct BeaconSyncConfig {
    /// Headers a single peer worker reserves from the unprocessed range
    /// before splitting it into wire-sized requests.
    pub n_fetch_headers_batch: u64,
    /// Maximum headers requested in a single wire round-trip.
    pub n_fetch_headers_request: u64,
    pub n_fetch_bodies_batch: u64,
    pub n_fetch_bodies_request: u64,

    pub fetch_headers_req_err_threshold: u32,
    pub fetch_headers_process_err_threshold: u32,
    pub fetch_bodies_req_err_threshold: u32,
    pub fetch_bodies_process_err_threshold: u32,

    pub headers_staged_queue_length_lwm: usize,
    pub headers_staged_queue_length_hwm: usize,

    /// Call `forkChoice` at most this many imported blocks apart.
    pub finaliser_chain_length_max: u64,
    /// Cooperative back-off slept after a failed batch before retrying.
    pub async_thread_switch_time_slot: Duration,
}

impl Default for BeaconSyncConfig {
    fn default() -> Self {
        Self {
            n_fetch_headers_batch: 192,
            n_fetch_headers_request: 64,
            n_fetch_bodies_batch: 128,
            n_fetch_bodies_request: 32,
            fetch_headers_req_err_threshold: 5,
            fetch_headers_process_err_threshold: 3,
            fetch_bodies_req_err_threshold: 5,
            fetch_bodies_process_err_threshold: 3,
            headers_staged_queue_length_lwm: 8,
            headers_staged_queue_length_hwm: 32,
            finaliser_chain_length_max: 32,
            async_thread_switch_time_slot: Duration::from_millis(100),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_sane() {
        let config = BeaconSyncConfig::default();
        assert!(config.n_fetch_headers_request <= config.n_fetch_headers_batch);
        assert!(config.n_fetch_bodies_request <= config.n_fetch_bodies_batch);
        assert!(config.headers_staged_queue_length_lwm < config.headers_staged_queue_length_hwm);
    }
}
