use ethereum_types::H256;
use tracing::warn;

use super::error::LayoutError;

/// The sync state machine's four phases, a pure function of
/// `(B, L, C, D, H)` per `compute_state`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    CollectingHeaders,
    FinishedHeaders,
    ProcessingBlocks,
}

impl SyncState {
    fn to_u8(self) -> u8 {
        match self {
            SyncState::Idle => 0,
            SyncState::CollectingHeaders => 1,
            SyncState::FinishedHeaders => 2,
            SyncState::ProcessingBlocks => 3,
        }
    }

    fn from_u8(byte: u8) -> Result<Self, LayoutError> {
        match byte {
            0 => Ok(SyncState::Idle),
            1 => Ok(SyncState::CollectingHeaders),
            2 => Ok(SyncState::FinishedHeaders),
            3 => Ok(SyncState::ProcessingBlocks),
            other => Err(LayoutError::UnknownState(other)),
        }
    }
}

/// Computes the sync state as a pure function of the five anchors. `B` and
/// `L` are supplied live by the Forkchoice module; `C`, `D`, `H` come from
/// the persisted layout.
pub fn compute_state(b: u64, l: u64, c: u64, d: u64, h: u64) -> SyncState {
    if h <= c || h <= l {
        return SyncState::Idle;
    }
    if c <= b && c + 1 < d {
        return SyncState::CollectingHeaders;
    }
    if c <= b && c + 1 == d {
        return SyncState::FinishedHeaders;
    }
    if c == d {
        return SyncState::ProcessingBlocks;
    }
    warn!(b, l, c, d, h, "inconsistent sync state anchors, falling back to idle");
    SyncState::Idle
}

pub const LAYOUT_KEY: &[u8] = b"\xBE\x00";
const ENCODED_LEN: usize = 8 + 32 + 8 + 32 + 8 + 32 + 8 + 32 + 1;

/// The persisted record `{coupler C, dangling D, final F, finalHash, head
/// H, lastState}`. `couplerHash` and `danglingParent` anchor the linkage
/// and chain-extension checks at `C` and `D` respectively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncStateLayout {
    pub coupler: u64,
    pub coupler_hash: H256,
    pub dangling: u64,
    pub dangling_parent: H256,
    pub final_number: u64,
    pub final_hash: H256,
    pub head: u64,
    pub head_hash: H256,
    pub last_state: SyncState,
}

impl SyncStateLayout {
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(ENCODED_LEN);
        out.extend_from_slice(&self.coupler.to_be_bytes());
        out.extend_from_slice(self.coupler_hash.as_bytes());
        out.extend_from_slice(&self.dangling.to_be_bytes());
        out.extend_from_slice(self.dangling_parent.as_bytes());
        out.extend_from_slice(&self.final_number.to_be_bytes());
        out.extend_from_slice(self.final_hash.as_bytes());
        out.extend_from_slice(&self.head.to_be_bytes());
        out.extend_from_slice(self.head_hash.as_bytes());
        out.push(self.last_state.to_u8());
        out
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, LayoutError> {
        if bytes.len() != ENCODED_LEN {
            return Err(LayoutError::WrongLength {
                expected: ENCODED_LEN,
                actual: bytes.len(),
            });
        }

        let mut cursor = 0usize;
        let mut take = |n: usize| {
            let slice = &bytes[cursor..cursor + n];
            cursor += n;
            slice
        };

        let coupler = u64::from_be_bytes(take(8).try_into().unwrap());
        let coupler_hash = H256::from_slice(take(32));
        let dangling = u64::from_be_bytes(take(8).try_into().unwrap());
        let dangling_parent = H256::from_slice(take(32));
        let final_number = u64::from_be_bytes(take(8).try_into().unwrap());
        let final_hash = H256::from_slice(take(32));
        let head = u64::from_be_bytes(take(8).try_into().unwrap());
        let head_hash = H256::from_slice(take(32));
        let last_state = SyncState::from_u8(take(1)[0])?;

        Ok(Self {
            coupler,
            coupler_hash,
            dangling,
            dangling_parent,
            final_number,
            final_hash,
            head,
            head_hash,
            last_state,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_round_trip() {
        let layout = SyncStateLayout {
            coupler: 100,
            coupler_hash: H256::from_low_u64_be(1),
            dangling: 150,
            dangling_parent: H256::from_low_u64_be(2),
            final_number: 900,
            final_hash: H256::from_low_u64_be(3),
            head: 1000,
            head_hash: H256::from_low_u64_be(4),
            last_state: SyncState::CollectingHeaders,
        };

        let bytes = layout.encode();
        assert_eq!(bytes.len(), ENCODED_LEN);
        let decoded = SyncStateLayout::decode(&bytes).unwrap();
        assert_eq!(decoded, layout);
    }

    #[test]
    fn decode_rejects_wrong_length() {
        assert!(SyncStateLayout::decode(&[0u8; 10]).is_err());
    }

    #[test]
    fn decode_rejects_unknown_state_tag() {
        let mut bytes = vec![0u8; ENCODED_LEN];
        bytes[ENCODED_LEN - 1] = 99;
        assert!(matches!(
            SyncStateLayout::decode(&bytes),
            Err(LayoutError::UnknownState(99))
        ));
    }

    #[test]
    fn idle_when_head_not_above_coupler_or_latest() {
        assert_eq!(compute_state(0, 0, 10, 20, 10), SyncState::Idle);
        assert_eq!(compute_state(0, 20, 5, 20, 30), SyncState::Idle);
    }

    #[test]
    fn collecting_headers_while_gap_remains() {
        assert_eq!(compute_state(0, 0, 0, 500, 1000), SyncState::CollectingHeaders);
    }

    #[test]
    fn finished_headers_when_gap_closes_to_one() {
        assert_eq!(compute_state(0, 0, 499, 500, 1000), SyncState::FinishedHeaders);
    }

    #[test]
    fn processing_blocks_when_coupler_meets_dangling() {
        assert_eq!(compute_state(0, 0, 500, 500, 1000), SyncState::ProcessingBlocks);
    }

    #[test]
    fn idle_on_inconsistent_anchors() {
        assert_eq!(compute_state(100, 0, 10, 200, 1000), SyncState::Idle);
    }
}
