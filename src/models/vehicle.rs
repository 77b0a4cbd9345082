use bincode::{Decode, Encode};
use std::fmt;
use std::num::NonZeroU64;
use std::time::{Duration, SystemTime};

/// Stable identifier minted when a vehicle is registered (monotonic counter)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Encode, Decode)]
pub struct VehicleId(pub u64);

impl fmt::Display for VehicleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Rate card: every started block of `block_seconds` costs `block_fee`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BillingPolicy {
    block_seconds: NonZeroU64,
    block_fee: u64,
}

impl BillingPolicy {
    pub const DEFAULT_BLOCK_SECONDS: u64 = 5;
    pub const DEFAULT_BLOCK_FEE: u64 = 50;

    const DEFAULT_BLOCK: NonZeroU64 = NonZeroU64::new(Self::DEFAULT_BLOCK_SECONDS).unwrap();

    /// Build a policy, rejecting zero-length blocks
    pub fn new(block_seconds: u64, block_fee: u64) -> Option<Self> {
        NonZeroU64::new(block_seconds).map(|block_seconds| BillingPolicy {
            block_seconds,
            block_fee,
        })
    }

    pub fn block_seconds(&self) -> u64 {
        self.block_seconds.get()
    }

    pub fn block_fee(&self) -> u64 {
        self.block_fee
    }

    /// Fee for a stay of the given length
    /// Partial blocks round up, so any stay longer than zero costs at least one block
    pub fn fee_for(&self, elapsed: Duration) -> u64 {
        let block = Duration::from_secs(self.block_seconds.get()).as_nanos();
        let blocks = elapsed.as_nanos().div_ceil(block);
        u64::try_from(blocks)
            .unwrap_or(u64::MAX)
            .saturating_mul(self.block_fee)
    }
}

impl Default for BillingPolicy {
    fn default() -> Self {
        BillingPolicy {
            block_seconds: Self::DEFAULT_BLOCK,
            block_fee: Self::DEFAULT_BLOCK_FEE,
        }
    }
}

/// Display duration of a stay, floored to whole seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Elapsed {
    pub minutes: u64,
    /// Seconds within the current minute (0-59)
    pub seconds: u8,
}

impl Elapsed {
    pub fn from_duration(duration: Duration) -> Self {
        let total = duration.as_secs();
        Elapsed {
            minutes: total / 60,
            seconds: (total % 60) as u8,
        }
    }
}

impl fmt::Display for Elapsed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}m {}s", self.minutes, self.seconds)
    }
}

/// A vehicle currently parked in the lot
/// Identity and entry time are fixed at registration and never change
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct Vehicle {
    id: VehicleId,
    plate: String,
    brand: String,
    model: String,
    color: String,
    entry_time: SystemTime,
}

impl Vehicle {
    pub(crate) fn new(
        id: VehicleId,
        plate: String,
        brand: String,
        model: String,
        color: String,
        entry_time: SystemTime,
    ) -> Self {
        Vehicle {
            id,
            plate,
            brand,
            model,
            color,
            entry_time,
        }
    }

    pub fn id(&self) -> VehicleId {
        self.id
    }

    pub fn plate(&self) -> &str {
        &self.plate
    }

    pub fn brand(&self) -> &str {
        &self.brand
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn color(&self) -> &str {
        &self.color
    }

    pub fn entry_time(&self) -> SystemTime {
        self.entry_time
    }

    /// Time parked as of `now`, clamped to zero when `now` precedes entry
    pub fn stay(&self, now: SystemTime) -> Duration {
        now.duration_since(self.entry_time).unwrap_or(Duration::ZERO)
    }

    /// Fee as of `now` under the default rate card
    pub fn calculate_cost(&self, now: SystemTime) -> u64 {
        self.cost_with(&BillingPolicy::default(), now)
    }

    /// Fee as of `now` under an explicit rate card
    pub fn cost_with(&self, policy: &BillingPolicy, now: SystemTime) -> u64 {
        policy.fee_for(self.stay(now))
    }

    /// Elapsed minutes and seconds as of `now`
    pub fn elapsed(&self, now: SystemTime) -> Elapsed {
        Elapsed::from_duration(self.stay(now))
    }
}
