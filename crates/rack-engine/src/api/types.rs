/// Identifier of a ball on the table.
/// `0` is the cue ball; object balls are numbered 1..=15 in spawn order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BallId(pub u8);

impl BallId {
    pub const CUE: BallId = BallId(0);

    /// Highest object-ball id in a full rack.
    pub const MAX_OBJECT: u8 = 15;

    pub fn is_cue(self) -> bool {
        self == Self::CUE
    }

    /// Slot in the id arena (ids are dense and small).
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Pocket index: 0..=3 are the corners, 4 and 5 the middle of the long rails.
pub type PocketIndex = u8;

/// Number of pockets on the table.
pub const POCKET_COUNT: usize = 6;

/// Role of a collider, stored in Rapier's `user_data` so contact callbacks
/// can classify fixtures without access to game state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixtureTag {
    Untagged,
    Rail,
    Pocket(PocketIndex),
    Ball(BallId),
}

const KIND_RAIL: u128 = 1;
const KIND_POCKET: u128 = 2;
const KIND_BALL: u128 = 3;

impl FixtureTag {
    /// Pack into a collider `user_data` value: kind in the low byte, payload in the next.
    pub fn to_user_data(self) -> u128 {
        match self {
            FixtureTag::Untagged => 0,
            FixtureTag::Rail => KIND_RAIL,
            FixtureTag::Pocket(index) => KIND_POCKET | (index as u128) << 8,
            FixtureTag::Ball(id) => KIND_BALL | (id.0 as u128) << 8,
        }
    }

    pub fn from_user_data(data: u128) -> Self {
        let payload = ((data >> 8) & 0xFF) as u8;
        match data & 0xFF {
            KIND_RAIL => FixtureTag::Rail,
            KIND_POCKET => FixtureTag::Pocket(payload),
            KIND_BALL => FixtureTag::Ball(BallId(payload)),
            _ => FixtureTag::Untagged,
        }
    }

    pub fn pocket(self) -> Option<PocketIndex> {
        match self {
            FixtureTag::Pocket(index) => Some(index),
            _ => None,
        }
    }

    pub fn ball(self) -> Option<BallId> {
        match self {
            FixtureTag::Ball(id) => Some(id),
            _ => None,
        }
    }
}
