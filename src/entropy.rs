//! Sources of random values for the cloud generator.
//!
//! Every source hands out a 16 bit value on demand and never fails.
//! The interrupt-fed sources keep their accumulator in an atomic, so the
//! harvesting handler (the only writer) and the cloud generator (the only
//! reader) never need a lock. If nothing was harvested since the last read,
//! the reader simply gets the last mixed value again.

use {
    rand::{RngCore as _, SeedableRng as _},
    rand_chacha::ChaCha8Rng,
    std::sync::atomic::{AtomicU8, AtomicU16, Ordering},
};

/// Something that can produce random values uniformly distributed over the `u16` range
pub trait EntropySource {
    /// Get the next value
    fn next(&mut self) -> u16;
}

impl<E: EntropySource + ?Sized> EntropySource for &mut E {
    fn next(&mut self) -> u16 {
        (**self).next()
    }
}

/// Map an entropy sample linearly onto `[lo, hi]`
#[must_use]
pub fn lerp_sample(lo: f64, hi: f64, sample: u16) -> f64 {
    lo + f64::from(sample) * (hi - lo) / f64::from(u16::MAX)
}

/// Seed used on every power-up by [`SeededEntropy`]
pub const DEFAULT_SEED: u64 = 0x4444_8888;

/// Deterministic pseudo-random source.
///
/// Uses the same seed on every power-up, so two runs produce the same cloud.
/// Good for bench testing, useless where unpredictability matters.
pub struct SeededEntropy {
    rng: ChaCha8Rng,
}

impl Default for SeededEntropy {
    fn default() -> Self {
        Self::new(DEFAULT_SEED)
    }
}

impl SeededEntropy {
    /// Create a source with an explicit seed
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl EntropySource for SeededEntropy {
    fn next(&mut self) -> u16 {
        // High half of the word
        let [hi, lo, ..] = self.rng.next_u32().to_be_bytes();
        u16::from_be_bytes([hi, lo])
    }
}

/// Fold one fast-counter reading into the accumulator.
///
/// The accumulator is rotated left by the low nibble of the counter, then the
/// counter is xored in.
#[must_use]
pub const fn mix_skew(acc: u16, counter: u8) -> u16 {
    acc.rotate_left((counter & 0x0F) as u32) ^ counter as u16
}

/// Harvests the relative drift between two independently clocked oscillators.
///
/// On every pulse of the slow oscillator (~16 ms), the handler reads a free
/// running fast counter and calls [`ClockSkewMixer::harvest`] with it.
#[derive(Default)]
pub struct ClockSkewMixer {
    acc: AtomicU16,
}

impl ClockSkewMixer {
    /// A mixer with an all-zero accumulator
    #[must_use]
    pub const fn new() -> Self {
        Self {
            acc: AtomicU16::new(0),
        }
    }
    /// Mix in one counter reading. Call this from the oscillator pulse handler only.
    pub fn harvest(&self, counter: u8) {
        let acc = self.acc.load(Ordering::Relaxed);
        self.acc.store(mix_skew(acc, counter), Ordering::Relaxed);
    }
    /// The last mixed value
    #[must_use]
    pub fn snapshot(&self) -> u16 {
        self.acc.load(Ordering::Relaxed)
    }
}

impl EntropySource for ClockSkewMixer {
    fn next(&mut self) -> u16 {
        self.snapshot()
    }
}

impl EntropySource for &ClockSkewMixer {
    fn next(&mut self) -> u16 {
        self.snapshot()
    }
}

/// Extracts one bit per sample from a floating differential analog input.
///
/// Each sample is thresholded at the midpoint of the converter range, and the
/// resulting bit is xored (not written) into the accumulator at a cursor that
/// walks from bit 0 to bit 15 and wraps around.
pub struct NoiseBitExtractor {
    acc: AtomicU16,
    cursor: AtomicU8,
    midpoint: u16,
}

impl NoiseBitExtractor {
    /// Create an extractor for a converter with the given resolution (1 to 16 bits)
    #[must_use]
    pub const fn new(resolution_bits: u8) -> Self {
        let bits = if resolution_bits == 0 {
            1
        } else if resolution_bits > 16 {
            16
        } else {
            resolution_bits
        };
        Self {
            acc: AtomicU16::new(0),
            cursor: AtomicU8::new(0),
            midpoint: 1 << (bits - 1),
        }
    }
    /// Mix in one sample. Call this from the sample-ready handler only.
    pub fn harvest(&self, sample: u16) {
        let cursor = self.cursor.load(Ordering::Relaxed) & 0x0F;
        let bit = u16::from(sample >= self.midpoint);
        let acc = self.acc.load(Ordering::Relaxed);
        self.acc.store(acc ^ (bit << cursor), Ordering::Relaxed);
        self.cursor.store((cursor + 1) & 0x0F, Ordering::Relaxed);
    }
    /// The last mixed value
    #[must_use]
    pub fn snapshot(&self) -> u16 {
        self.acc.load(Ordering::Relaxed)
    }
}

impl EntropySource for NoiseBitExtractor {
    fn next(&mut self) -> u16 {
        self.snapshot()
    }
}

impl EntropySource for &NoiseBitExtractor {
    fn next(&mut self) -> u16 {
        self.snapshot()
    }
}

/// Replays a fixed list of values in a loop.
///
/// Lets the cloud generator be driven deterministically.
pub struct FixedSequence<'a> {
    values: &'a [u16],
    pos: usize,
}

impl<'a> FixedSequence<'a> {
    /// Replay `values`. An empty slice yields zeroes.
    #[must_use]
    pub const fn new(values: &'a [u16]) -> Self {
        Self { values, pos: 0 }
    }
}

impl EntropySource for FixedSequence<'_> {
    fn next(&mut self) -> u16 {
        let Some(&v) = self.values.get(self.pos) else {
            return 0;
        };
        self.pos = (self.pos + 1) % self.values.len();
        v
    }
}

#[test]
fn test_skew_zero_shift_is_xor_only() {
    assert_eq!(mix_skew(0xABCD, 0x10), 0xABCD ^ 0x10);
    assert_eq!(mix_skew(0x0000, 0x00), 0);
}

#[test]
fn test_skew_rotates_vacated_bits_back_in() {
    // Counter 0x0F: rotate by 15, then xor 0x0F
    assert_eq!(mix_skew(0x8001, 0x0F), 0xC000 ^ 0x000F);
    assert_eq!(mix_skew(0x8000, 0x01), 0x0001 ^ 0x0001);
}

#[test]
fn test_clock_skew_mixer_snapshot() {
    let mixer = ClockSkewMixer::new();
    mixer.harvest(0x23);
    mixer.harvest(0x45);
    let expected = mix_skew(mix_skew(0, 0x23), 0x45);
    let mut src = &mixer;
    assert_eq!(src.next(), expected);
    // Nothing harvested in between: same value again
    assert_eq!(src.next(), expected);
}

#[test]
fn test_noise_bits_wrap_and_xor() {
    let ext = NoiseBitExtractor::new(10);
    // 16 high samples set every bit
    for _ in 0..16 {
        ext.harvest(1000);
    }
    assert_eq!(ext.snapshot(), 0xFFFF);
    // Cursor is back at bit 0, a high sample flips it off again
    ext.harvest(600);
    assert_eq!(ext.snapshot(), 0xFFFE);
    // Low samples leave bits alone
    ext.harvest(3);
    assert_eq!(ext.snapshot(), 0xFFFE);
}

#[test]
fn test_seeded_is_reproducible() {
    let mut a = SeededEntropy::default();
    let mut b = SeededEntropy::default();
    let xs: Vec<u16> = (0..32).map(|_| a.next()).collect();
    let ys: Vec<u16> = (0..32).map(|_| b.next()).collect();
    assert_eq!(xs, ys);
    assert!(xs.iter().any(|&x| x != xs[0]));
}

#[test]
fn test_fixed_sequence_loops() {
    let mut seq = FixedSequence::new(&[1, 2, 3]);
    let got: Vec<u16> = (0..5).map(|_| seq.next()).collect();
    assert_eq!(got, [1, 2, 3, 1, 2]);
    assert_eq!(FixedSequence::new(&[]).next(), 0);
}

#[test]
fn test_lerp_sample_bounds() {
    assert!((lerp_sample(0.5, 1.0, 0) - 0.5).abs() < 1e-12);
    assert!((lerp_sample(0.5, 1.0, u16::MAX) - 1.0).abs() < 1e-12);
}
