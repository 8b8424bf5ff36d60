//! Atmospheric cloud attenuation.
//!
//! A slowly varying attenuation factor is produced by evaluating a Catmull-Rom
//! spline through 4 control points. Whenever the spline parameter runs past the
//! end of the current segment, the oldest control point is replaced by a new
//! random one, and the segment window shifts by one point.

use crate::entropy::{EntropySource, lerp_sample};

/// How new control points (and segment periods) are generated
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CloudPolicy {
    /// New point is a heavily weighted blend of the surviving points and one
    /// random intensity. Each segment gets a random duration.
    WeightedBlend {
        /// Shortest segment duration (seconds)
        min_period: f64,
        /// Longest segment duration (seconds)
        max_period: f64,
    },
    /// New point is the newest point plus a uniform step in `[-velocity, velocity]`,
    /// mirrored back into range at the intensity bounds. Segment duration is fixed.
    ReflectedWalk {
        /// Segment duration (seconds)
        period: f64,
        /// Largest step between two consecutive points
        velocity: f64,
    },
}

impl Default for CloudPolicy {
    fn default() -> Self {
        Self::WeightedBlend {
            min_period: 0.0,
            max_period: 0.0,
        }
    }
}

/// Cloud configuration supplied by a profile
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CloudParams {
    /// Whether clouds are simulated at all.
    ///
    /// When off, the attenuation factor is always `1.0`.
    pub enabled: bool,
    /// Point and period generation policy
    pub policy: CloudPolicy,
    /// Lowest possible attenuation
    pub min_intensity: f64,
    /// Highest possible attenuation
    pub max_intensity: f64,
    /// All control points start out at this value
    pub initial_intensity: f64,
}

/// Number of spline control points
pub const CONTROL_POINTS: usize = 4;

/// Fixed ring of [`CONTROL_POINTS`] control points, ordered oldest to newest from `start`
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ControlRing {
    points: [f64; CONTROL_POINTS],
    start: usize,
}

impl ControlRing {
    /// A ring with every point set to `value`
    #[must_use]
    pub const fn filled(value: f64) -> Self {
        Self {
            points: [value; CONTROL_POINTS],
            start: 0,
        }
    }
    /// The `k`th point counting from the oldest (`0`) to the newest (`3`)
    #[must_use]
    pub const fn get(&self, k: usize) -> f64 {
        self.points[(self.start + k) % CONTROL_POINTS]
    }
    /// The newest point
    #[must_use]
    pub const fn newest(&self) -> f64 {
        self.get(CONTROL_POINTS - 1)
    }
    /// Index of the oldest point in the underlying storage
    #[must_use]
    pub const fn start(&self) -> usize {
        self.start
    }
    /// Overwrite the oldest point with `value`, which becomes the newest
    pub const fn push(&mut self, value: f64) {
        self.points[self.start] = value;
        self.start = (self.start + 1) % CONTROL_POINTS;
    }
    /// Points in oldest to newest order
    #[must_use]
    pub const fn ordered(&self) -> [f64; CONTROL_POINTS] {
        [self.get(0), self.get(1), self.get(2), self.get(3)]
    }
}

/// Evaluate the Catmull-Rom segment between `p1` and `p2` at `t` in `[0, 1]`
#[must_use]
pub fn catmull_rom([p0, p1, p2, p3]: [f64; CONTROL_POINTS], t: f64) -> f64 {
    p1 + 0.5
        * t
        * ((p2 - p0)
            + t * ((2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3) + t * (3.0 * p1 - 3.0 * p2 + p3 - p0)))
}

/// Mirror `value` back into `[lo, hi]` if it stepped out of it.
///
/// Stays in range as long as the overshoot is at most `hi - lo`.
#[must_use]
pub fn reflect(value: f64, lo: f64, hi: f64) -> f64 {
    if value > hi {
        2.0 * hi - value
    } else if value < lo {
        2.0 * lo - value
    } else {
        value
    }
}

/// Cloud attenuation generator state
#[derive(Clone, Debug, Default)]
pub struct CloudGen {
    /// Configuration this generator was reset with
    pub params: CloudParams,
    accumulated: f64,
    period: f64,
    ring: ControlRing,
}

impl CloudGen {
    /// Start over with new parameters. Every control point is set to the initial intensity.
    pub fn reset(&mut self, params: CloudParams) {
        self.params = params;
        self.accumulated = 0.0;
        self.ring = ControlRing::filled(params.initial_intensity);
        // A zero period makes the first step generate a point and draw a real period
        self.period = match params.policy {
            CloudPolicy::WeightedBlend { .. } => 0.0,
            CloudPolicy::ReflectedWalk { period, .. } => period,
        };
    }
    /// Time spent in the current segment (seconds)
    #[must_use]
    pub const fn accumulated(&self) -> f64 {
        self.accumulated
    }
    /// Duration of the current segment (seconds)
    #[must_use]
    pub const fn period(&self) -> f64 {
        self.period
    }
    /// The control points
    #[must_use]
    pub const fn ring(&self) -> &ControlRing {
        &self.ring
    }
    /// Advance by `dt` seconds and return the attenuation factor.
    ///
    /// At most one control point is generated per step. If `dt` is longer than
    /// a whole segment, the surplus time is folded back into the new segment.
    pub fn step<E: EntropySource + ?Sized>(&mut self, dt: f64, entropy: &mut E) -> f64 {
        if !self.params.enabled {
            return 1.0;
        }
        self.accumulated += dt;
        if self.accumulated >= self.period {
            self.regenerate(entropy);
        }
        let p = &self.params;
        let t = self.accumulated / self.period;
        catmull_rom(self.ring.ordered(), t).clamp(p.min_intensity, p.max_intensity)
    }

    fn regenerate<E: EntropySource + ?Sized>(&mut self, entropy: &mut E) {
        let p = self.params;
        let ring = &mut self.ring;
        let next = match p.policy {
            CloudPolicy::WeightedBlend { .. } => {
                let fresh = lerp_sample(p.min_intensity, p.max_intensity, entropy.next());
                (2.0 * ring.get(1) + 2.0 * ring.get(2) + 2.0 * ring.get(3) + fresh) / 7.0
            }
            CloudPolicy::ReflectedWalk { velocity, .. } => {
                let delta = lerp_sample(-velocity, velocity, entropy.next());
                reflect(ring.newest() + delta, p.min_intensity, p.max_intensity)
            }
        };
        ring.push(next);
        self.accumulated -= self.period;
        if let CloudPolicy::WeightedBlend {
            min_period,
            max_period,
        } = p.policy
        {
            self.period = lerp_sample(min_period, max_period, entropy.next());
        }
        if self.accumulated >= self.period {
            self.accumulated %= self.period;
        }
        tracing::trace!(
            point = next,
            start = ring.start(),
            period = self.period,
            "new cloud control point"
        );
    }
}
