//! Client-side ids for optimistic records.
//!
//! A provisional id is built from the millisecond timestamp it was minted at
//! plus a wrapping counter, with the top bit set so it can never collide with
//! an id handed out by the server.

use crate::model::Id;
use time::OffsetDateTime;

pub const PROVISIONAL_FLAG: u64 = 1 << 63;

pub const TIMESTAMP_OFFSET: u64 = 12;
pub const TIMESTAMP_LENGTH: u64 = 51;
pub const TIMESTAMP_BITMASK: u64 = ((1 << TIMESTAMP_LENGTH) - 1) << TIMESTAMP_OFFSET;

pub const COUNTER_BITMASK: u64 = 0xFFF;
pub const COUNTER_LENGTH: u64 = 12;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct ProvisionalIdGenerator {
    next_counter: u16,
}

impl ProvisionalIdGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn generate_at_millis(&mut self, unix_millis: u64) -> u64 {
        let counter = self.next_counter;
        self.next_counter = (counter + 1) % (1 << COUNTER_LENGTH);

        PROVISIONAL_FLAG
            | ((unix_millis << TIMESTAMP_OFFSET) & TIMESTAMP_BITMASK)
            | u64::from(counter)
    }

    #[must_use]
    pub fn generate<Marker>(&mut self) -> Id<Marker> {
        let millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
        let millis = u64::try_from(millis).unwrap_or_default();
        Id::new(self.generate_at_millis(millis))
    }
}

/// The millisecond timestamp a provisional id was minted at.
#[must_use]
pub fn minted_at_millis(id: u64) -> Option<u64> {
    (id & PROVISIONAL_FLAG != 0).then_some((id & TIMESTAMP_BITMASK) >> TIMESTAMP_OFFSET)
}
