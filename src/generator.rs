use crate::models::NoiseVariant;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// --- Brown noise integrator ---
// Step size per sample. Small enough that the walk stays in the audible low end.
const BROWN_STEP: f32 = 0.02;
// Make-up gain for the walk's naturally low amplitude.
const BROWN_GAIN: f32 = 3.5;

// --- Voss-McCartney pink noise ---
pub const PINK_TAPS: usize = 16;

/// Per-variant generator state. Only ever touched while holding the engine guard.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorState {
    /// Brown noise accumulator, always within [-1, 1]
    pub last_output: f32,
    /// Pink noise sub-generators
    pub taps: [f32; PINK_TAPS],
    /// Wraps on overflow; its trailing zero count picks the tap to refresh
    pub sample_counter: u32,
}

impl Default for GeneratorState {
    fn default() -> Self {
        Self {
            last_output: 0.0,
            taps: [0.0; PINK_TAPS],
            sample_counter: 0,
        }
    }
}

/// Index of the pink tap refreshed for this counter value, if any.
///
/// Tap 0 is refreshed on every odd counter, tap 1 on every second even one and
/// so on; counters divisible by 2^16 refresh nothing.
#[inline]
pub fn pink_tap_index(counter: u32) -> Option<usize> {
    let k = counter.trailing_zeros() as usize;
    (k < PINK_TAPS).then_some(k)
}

/// Sample source for all three variants. Allocation free once constructed.
pub struct NoiseGenerator {
    state: GeneratorState,
    rng: StdRng,
}

impl NoiseGenerator {
    pub fn new() -> Self {
        Self {
            state: GeneratorState::default(),
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic stream for tests and offline rendering.
    pub fn seeded(seed: u64) -> Self {
        Self {
            state: GeneratorState::default(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn state(&self) -> &GeneratorState {
        &self.state
    }

    pub fn reset(&mut self) {
        self.state = GeneratorState::default();
    }

    /// Next pre-gain sample for `variant`.
    #[inline]
    pub fn next_sample(&mut self, variant: NoiseVariant) -> f32 {
        match variant {
            NoiseVariant::White => self.white(),
            NoiseVariant::Brown => {
                let white = self.uniform();
                self.brown_step(white)
            }
            NoiseVariant::Pink => self.pink(),
        }
    }

    #[inline]
    fn uniform(&mut self) -> f32 {
        self.rng.gen_range(-1.0f32..=1.0)
    }

    #[inline]
    fn white(&mut self) -> f32 {
        self.uniform()
    }

    /// Integrate one white sample into the walk: integrate, clamp, then scale.
    #[inline]
    pub fn brown_step(&mut self, white: f32) -> f32 {
        let st = &mut self.state;
        st.last_output += white * BROWN_STEP;
        st.last_output = st.last_output.clamp(-1.0, 1.0);
        st.last_output * BROWN_GAIN
    }

    #[inline]
    fn pink(&mut self) -> f32 {
        self.state.sample_counter = self.state.sample_counter.wrapping_add(1);
        if let Some(k) = pink_tap_index(self.state.sample_counter) {
            self.state.taps[k] = self.uniform();
        }
        let sum: f32 = self.state.taps.iter().sum();
        sum / PINK_TAPS as f32
    }
}

impl Default for NoiseGenerator {
    fn default() -> Self {
        Self::new()
    }
}
