use parley_protocol::PlayerId;

/// Deterministic PRNG shared by every copy of the simulation.
///
/// This is `xoshiro256**` seeded via SplitMix64. Negotiation streams are keyed
/// by `(game seed, turn, party pair)` so each participant derives the same
/// sequence without exchanging state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TurnRng {
    state: [u64; 4],
}

impl TurnRng {
    pub fn seed_from_u64(seed: u64) -> Self {
        let mut sm = SplitMix64 { state: seed };
        Self {
            state: [sm.next(), sm.next(), sm.next(), sm.next()],
        }
    }

    /// Stream for one negotiation between `a` and `b` on `turn`.
    ///
    /// The pair is ordered, so `(a, b)` and `(b, a)` draw different streams.
    pub fn keyed(game_seed: u64, turn: u32, a: PlayerId, b: PlayerId) -> Self {
        let mut sm = SplitMix64 { state: game_seed };
        let salt = sm.next();
        let key = salt
            ^ (u64::from(turn) << 16)
            ^ (u64::from(a.0) << 8)
            ^ u64::from(b.0);
        Self::seed_from_u64(key)
    }

    pub fn next_u64(&mut self) -> u64 {
        let result = self.state[1].wrapping_mul(5).rotate_left(7).wrapping_mul(9);

        let t = self.state[1] << 17;

        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];

        self.state[2] ^= t;

        self.state[3] = self.state[3].rotate_left(45);

        result
    }

    pub fn next_u32(&mut self) -> u32 {
        (self.next_u64() >> 32) as u32
    }

    /// Uniform index in `0..len`. `len` must be non-zero.
    pub fn pick_index(&mut self, len: usize) -> usize {
        debug_assert!(len > 0, "empty range");
        let span = len.clamp(1, u32::MAX as usize) as u32;
        let threshold = u32::MAX - (u32::MAX % span);
        loop {
            let x = self.next_u32();
            if x < threshold {
                return (x % span) as usize;
            }
        }
    }
}

struct SplitMix64 {
    state: u64,
}

impl SplitMix64 {
    fn next(&mut self) -> u64 {
        let mut z = self.state.wrapping_add(0x9e37_79b9_7f4a_7c15);
        self.state = z;
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
        z ^ (z >> 31)
    }
}

/// How equally good candidates are ordered during balancing.
///
/// Previews and any evaluation an observer may run without committing must
/// use [`TieBreak::Stable`]; only the authoritative negotiation draws from the
/// shared stream.
#[derive(Debug)]
pub enum TieBreak<'a> {
    /// First candidate in inventory order wins.
    Stable,
    /// Uniform choice among tied candidates from the shared turn-keyed stream.
    Shared(&'a mut TurnRng),
}

impl TieBreak<'_> {
    /// Index into `tied`, which must not be empty.
    pub fn choose(&mut self, tied: usize) -> usize {
        match self {
            TieBreak::Stable => 0,
            TieBreak::Shared(_) if tied <= 1 => 0,
            TieBreak::Shared(rng) => rng.pick_index(tied),
        }
    }

    pub fn is_stable(&self) -> bool {
        matches!(self, TieBreak::Stable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyed_streams_are_reproducible() {
        let mut a = TurnRng::keyed(42, 7, PlayerId(1), PlayerId(2));
        let mut b = TurnRng::keyed(42, 7, PlayerId(1), PlayerId(2));
        for _ in 0..16 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
    }

    #[test]
    fn keys_separate_turns_and_directions() {
        let base = TurnRng::keyed(42, 7, PlayerId(1), PlayerId(2));
        assert_ne!(base, TurnRng::keyed(42, 8, PlayerId(1), PlayerId(2)));
        assert_ne!(base, TurnRng::keyed(42, 7, PlayerId(2), PlayerId(1)));
        assert_ne!(base, TurnRng::keyed(43, 7, PlayerId(1), PlayerId(2)));
    }

    #[test]
    fn pick_index_stays_in_range() {
        let mut rng = TurnRng::seed_from_u64(9);
        for len in 1..20 {
            assert!(rng.pick_index(len) < len);
        }
    }

    #[test]
    fn stable_tie_break_takes_the_first() {
        let mut tie = TieBreak::Stable;
        assert_eq!(tie.choose(5), 0);
        let mut rng = TurnRng::seed_from_u64(1);
        let mut shared = TieBreak::Shared(&mut rng);
        assert_eq!(shared.choose(1), 0);
        assert!(shared.choose(3) < 3);
    }
}
