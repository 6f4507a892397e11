//! Xorshift32 sequence used for per-slot obstacle placement.
//!
//! Algorithm: x ^= x << 13; x ^= x >> 17; x ^= x << 5;
//! Every client reproduces this exactly, so only the seed ever crosses the wire.

const ZERO_SEED_REPLACEMENT: u32 = 0xDEAD_BEEF;

#[derive(Debug, Clone)]
pub struct SlotRng {
    state: u32,
}

impl SlotRng {
    pub fn new(seed: u32) -> Self {
        // Xorshift is stuck at zero forever.
        let state = if seed == 0 {
            ZERO_SEED_REPLACEMENT
        } else {
            seed
        };
        Self { state }
    }

    /// Builds the generator for one obstacle slot.
    ///
    /// The sub-seed is derived from the slot position alone, never from a running state, so
    /// any slot can be recomputed independently of the order slots were requested in.
    /// Consecutive sub-seeds are close together, so one output is discarded to decorrelate them.
    pub fn for_slot(seed: u32, slot: u64, spacing: u32) -> Self {
        let sub_seed = seed.wrapping_add((slot as u32).wrapping_mul(spacing));
        let mut rng = Self::new(sub_seed);
        rng.next_u32();
        rng
    }

    pub fn next_u32(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        x
    }

    /// Scales the next output onto `0..span` without floating point.
    pub fn next_below(&mut self, span: u32) -> u32 {
        ((u64::from(self.next_u32()) * u64::from(span)) >> 32) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xorshift32_known_sequence() {
        let mut rng = SlotRng::new(0xDEAD_BEEF);
        assert_eq!(rng.next_u32(), 1199382711);
        assert_eq!(rng.next_u32(), 2384302402);
        assert_eq!(rng.next_u32(), 3129746520);
    }

    #[test]
    fn zero_seed_is_replaced() {
        let mut zero = SlotRng::new(0);
        let mut replaced = SlotRng::new(ZERO_SEED_REPLACEMENT);
        assert_eq!(zero.next_u32(), replaced.next_u32());
    }

    #[test]
    fn slot_generator_skips_warm_up_output() {
        // seed 42, slot 0 -> sub-seed 42; second output of the raw sequence.
        let mut rng = SlotRng::for_slot(42, 0, 300);
        assert_eq!(rng.next_u32(), 2836018348);
    }

    #[test]
    fn next_below_stays_in_range() {
        let mut rng = SlotRng::new(7);
        for _ in 0..1000 {
            assert!(rng.next_below(180) < 180);
        }
    }
}
