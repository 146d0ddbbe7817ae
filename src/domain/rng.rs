/// Random sources for monster AI.
///
/// Only two decisions are random: how far a blocked walker turns, and
/// which way a blob goes. Both are drawn lazily by the AI, so the number
/// of draws per tick depends on the board and any replacement generator
/// must be consulted at exactly the same points.

pub trait Randomness {
    /// Number of right turns (0..=3) for a walker whose way is blocked.
    fn walker_turn(&mut self) -> u8;

    /// Clockwise index (0..=3, starting north) for a blob's next move.
    fn blob_turn(&mut self) -> u8;

    /// Called when a level attempt starts.
    fn restart(&mut self) {}
}

/// Bit-exact reproduction of the Lynx generators recorded solutions rely on.
///
/// Walkers use the 16-bit shift-register generator, reset on every
/// restart. Blobs use a 31-bit linear congruential generator whose seed
/// comes from the solution file and survives restarts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LegacyRng {
    seed: u32,
    lynx: [u8; 2],
}

impl LegacyRng {
    pub fn new(seed: u32) -> Self {
        LegacyRng { seed: seed & 0x7fff_ffff, lynx: [0, 0] }
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    pub fn set_seed(&mut self, seed: u32) {
        self.seed = seed & 0x7fff_ffff;
    }

    fn next_lynx(&mut self) -> u8 {
        let [v1, v2] = self.lynx;
        let mut n = (v1 >> 2).wrapping_sub(v1);
        if v1 & 0x02 == 0 {
            n = n.wrapping_sub(1);
        }
        let v1 = (v1 >> 1) | (v2 & 0x80);
        let v2 = (v2 << 1) | (n & 0x01);
        self.lynx = [v1, v2];
        v1 ^ v2
    }

    fn next_tw(&mut self) -> u32 {
        self.seed = self.seed.wrapping_mul(1_103_515_245).wrapping_add(12_345) & 0x7fff_ffff;
        self.seed
    }
}

impl Default for LegacyRng {
    fn default() -> Self {
        LegacyRng::new(0)
    }
}

impl Randomness for LegacyRng {
    fn walker_turn(&mut self) -> u8 {
        self.next_lynx() & 0x3
    }

    fn blob_turn(&mut self) -> u8 {
        (self.next_tw() >> 29) as u8
    }

    fn restart(&mut self) {
        self.lynx = [0, 0];
    }
}

/// General-purpose generator for play that does not need to match replays.
#[cfg(feature = "system-rng")]
pub struct SystemRng {
    rng: rand::rngs::StdRng,
}

#[cfg(feature = "system-rng")]
impl SystemRng {
    pub fn seeded(seed: u64) -> Self {
        use rand::SeedableRng;
        SystemRng { rng: rand::rngs::StdRng::seed_from_u64(seed) }
    }

    pub fn from_os() -> Self {
        use rand::SeedableRng;
        SystemRng { rng: rand::rngs::StdRng::from_os_rng() }
    }
}

#[cfg(feature = "system-rng")]
impl Randomness for SystemRng {
    fn walker_turn(&mut self) -> u8 {
        use rand::Rng;
        self.rng.random_range(0..4)
    }

    fn blob_turn(&mut self) -> u8 {
        use rand::Rng;
        self.rng.random_range(0..4)
    }
}

impl<R: Randomness + ?Sized> Randomness for Box<R> {
    fn walker_turn(&mut self) -> u8 {
        (**self).walker_turn()
    }

    fn blob_turn(&mut self) -> u8 {
        (**self).blob_turn()
    }

    fn restart(&mut self) {
        (**self).restart()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lynx_sequence_from_reset() {
        let mut rng = LegacyRng::new(0);
        // first draws of the shift register from its all-zero state
        let mut got = Vec::new();
        for _ in 0..6 {
            got.push(rng.next_lynx());
        }
        assert_eq!(got, vec![0x01, 0x03, 0x07, 0x0f, 0x1f, 0x3f]);
    }

    #[test]
    fn lynx_restarts_but_seed_carries_over() {
        let mut rng = LegacyRng::new(1234);
        let first: Vec<u8> = (0..8).map(|_| rng.walker_turn()).collect();
        rng.blob_turn();
        let seed = rng.seed();
        rng.restart();
        let again: Vec<u8> = (0..8).map(|_| rng.walker_turn()).collect();
        assert_eq!(first, again);
        assert_eq!(rng.seed(), seed);
    }

    #[test]
    fn tw_sequence_is_31_bit_lcg() {
        let mut rng = LegacyRng::new(1);
        assert_eq!(rng.next_tw(), (1_103_515_245u64 + 12_345) as u32 & 0x7fff_ffff);
        let mut rng = LegacyRng::new(0);
        assert_eq!(rng.next_tw(), 12_345);
        assert_eq!(rng.next_tw(), (12_345u64 * 1_103_515_245 + 12_345) as u32 & 0x7fff_ffff);
    }

    #[test]
    fn turns_stay_in_range() {
        let mut rng = LegacyRng::new(99);
        for _ in 0..1000 {
            assert!(rng.walker_turn() < 4);
            assert!(rng.blob_turn() < 4);
        }
    }

    #[cfg(feature = "system-rng")]
    #[test]
    fn system_rng_is_reproducible_when_seeded() {
        let mut a = SystemRng::seeded(7);
        let mut b = SystemRng::seeded(7);
        for _ in 0..32 {
            let t = a.walker_turn();
            assert!(t < 4);
            assert_eq!(t, b.walker_turn());
            assert_eq!(a.blob_turn(), b.blob_turn());
        }
    }
}
