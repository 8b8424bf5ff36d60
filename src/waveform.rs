use {
    crate::result::{ProfileError, ProfileResult},
    arrayvec::ArrayVec,
    std::f64::consts::TAU,
};

/// Maximum number of sinusoid modes or gaussian peaks per channel
pub const MAX_MODES: usize = 20;

/// One sinusoidal pulsation mode
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Mode {
    /// Frequency (Hz)
    pub freq: f64,
    /// Amplitude in parts per thousand of the base intensity
    pub mma: f64,
    /// Phase in cycles, `[0, 1)`
    pub phase: f64,
}

impl Mode {
    /// Create a mode
    #[must_use]
    pub const fn new(freq: f64, mma: f64, phase: f64) -> Self {
        Self { freq, mma, phase }
    }
}

/// One gaussian peak of a periodic pulse profile
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Peak {
    /// Peak height
    pub amplitude: f64,
    /// Position of the peak within the period, in `[0, 1)`
    pub offset: f64,
    /// Width of the peak, as a fraction of the period
    pub width: f64,
}

impl Peak {
    /// Create a peak
    #[must_use]
    pub const fn new(amplitude: f64, offset: f64, width: f64) -> Self {
        Self {
            amplitude,
            offset,
            width,
        }
    }
}

/// Modes of a [`Waveform::Sinusoidal`]
pub type Modes = ArrayVec<Mode, MAX_MODES>;
/// Peaks of a [`Waveform::Gaussian`]
pub type Peaks = ArrayVec<Peak, MAX_MODES>;

/// How the intensity of a channel varies over time
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Waveform {
    /// Steady output
    #[default]
    Constant,
    /// Superposition of sinusoids (beating, multi-periodic pulsators)
    Sinusoidal {
        /// The pulsation modes
        modes: Modes,
    },
    /// Periodic pulse profile made of gaussian peaks (pulsar light curves)
    Gaussian {
        /// Pulse period (seconds)
        period: f64,
        /// Time into the current period (seconds)
        accumulated: f64,
        /// The peaks
        peaks: Peaks,
    },
    /// Linear 0 to 1 sweep, repeating every period
    Ramp {
        /// Sweep period (seconds)
        period: f64,
        /// Time into the current period (seconds)
        accumulated: f64,
    },
}

impl Waveform {
    /// Sinusoidal waveform from a list of at most [`MAX_MODES`] modes
    pub fn sinusoidal(modes: &[Mode]) -> ProfileResult<Self> {
        Ok(Self::Sinusoidal {
            modes: Modes::try_from(modes).map_err(|_| ProfileError::TooManyModes(modes.len()))?,
        })
    }
    /// Gaussian waveform from a period and a list of at most [`MAX_MODES`] peaks
    pub fn gaussian(period: f64, peaks: &[Peak]) -> ProfileResult<Self> {
        Ok(Self::Gaussian {
            period,
            accumulated: 0.0,
            peaks: Peaks::try_from(peaks).map_err(|_| ProfileError::TooManyModes(peaks.len()))?,
        })
    }
    /// Ramp waveform with the given period
    #[must_use]
    pub const fn ramp(period: f64) -> Self {
        Self::Ramp {
            period,
            accumulated: 0.0,
        }
    }
    /// The period, for waveforms that have one
    #[must_use]
    pub const fn period(&self) -> Option<f64> {
        match self {
            Self::Gaussian { period, .. } | Self::Ramp { period, .. } => Some(*period),
            Self::Constant | Self::Sinusoidal { .. } => None,
        }
    }
    /// Advance by `dt` seconds and return the intensity multiplier
    pub fn step(&mut self, dt: f64) -> f64 {
        match self {
            Self::Constant => 1.0,
            Self::Sinusoidal { modes } => {
                let mut mma = 0.0;
                for m in modes {
                    m.phase = (m.phase + m.freq * dt).rem_euclid(1.0);
                    mma += m.mma * (TAU * m.phase).sin();
                }
                1.0 + mma / 1000.0
            }
            Self::Gaussian {
                period,
                accumulated,
                peaks,
            } => {
                *accumulated = wrap(*accumulated + dt, *period);
                let phase = *accumulated / *period;
                peaks
                    .iter()
                    .map(|p| {
                        let x = (phase - p.offset) / p.width;
                        p.amplitude * (-x * x).exp()
                    })
                    .sum()
            }
            Self::Ramp {
                period,
                accumulated,
            } => {
                *accumulated = wrap(*accumulated + dt, *period);
                *accumulated / *period
            }
        }
    }
}

/// Bring `t` back into `[0, period)`.
///
/// A tick is expected to cross at most one period boundary. Anything past that
/// is reduced modulo the period.
fn wrap(t: f64, period: f64) -> f64 {
    let mut t = t - if t >= period { period } else { 0.0 };
    if t >= period {
        t %= period;
    }
    t
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f64 = 0.01632;

    #[test]
    fn constant_is_one() {
        let mut w = Waveform::Constant;
        for _ in 0..10 {
            assert_eq!(w.step(DT), 1.0);
        }
        assert_eq!(w, Waveform::Constant);
    }

    #[test]
    fn sinusoid_phase_returns_after_one_period() {
        // 0.25 Hz, dt chosen so 1000 ticks make exactly one period
        let dt = 4.0 / 1000.0;
        let mut w = Waveform::sinusoidal(&[Mode::new(0.25, 100.0, 0.3)]).unwrap();
        for _ in 0..1000 {
            w.step(dt);
        }
        let Waveform::Sinusoidal { modes } = &w else {
            unreachable!()
        };
        let phase = modes[0].phase;
        let diff = (phase - 0.3).abs();
        assert!(diff < 1e-9 || (1.0 - diff) < 1e-9, "phase drifted to {phase}");
    }

    #[test]
    fn sinusoid_phase_stays_normalized() {
        let mut w =
            Waveform::sinusoidal(&[Mode::new(3.0, 50.0, 0.9), Mode::new(0.7, 20.0, 0.0)]).unwrap();
        for _ in 0..5000 {
            let v = w.step(DT);
            assert!((0.93..=1.07).contains(&v));
            let Waveform::Sinusoidal { modes } = &w else {
                unreachable!()
            };
            assert!(modes.iter().all(|m| (0.0..1.0).contains(&m.phase)));
        }
    }

    #[test]
    fn sinusoid_amplitude_is_permille() {
        // A quarter cycle in one step lands on the sine peak
        let mut w = Waveform::sinusoidal(&[Mode::new(0.25, 100.0, 0.0)]).unwrap();
        let v = w.step(1.0);
        assert!((v - 1.1).abs() < 1e-12);
    }

    #[test]
    fn gaussian_peaks_at_offset() {
        let mut w = Waveform::gaussian(2.0, &[Peak::new(1.5, 0.5, 0.1)]).unwrap();
        let v = w.step(1.0);
        assert!((v - 1.5).abs() < 1e-12);
        let v = w.step(0.5);
        assert!(v < 0.01);
    }

    #[test]
    fn gaussian_wraps_into_period() {
        let mut w = Waveform::gaussian(3.3689, &[Peak::new(1.038, 0.2438, 0.07566)]).unwrap();
        for _ in 0..10_000 {
            w.step(DT);
            let Waveform::Gaussian {
                period,
                accumulated,
                ..
            } = w
            else {
                unreachable!()
            };
            assert!((0.0..period).contains(&accumulated));
        }
    }

    #[test]
    fn too_many_modes_are_refused() {
        let modes = [Mode::new(0.1, 1.0, 0.0); MAX_MODES + 5];
        assert_eq!(
            Waveform::sinusoidal(&modes),
            Err(ProfileError::TooManyModes(MAX_MODES + 5))
        );
        let peaks = [Peak::new(1.0, 0.5, 0.1); MAX_MODES + 1];
        assert_eq!(
            Waveform::gaussian(1.0, &peaks),
            Err(ProfileError::TooManyModes(MAX_MODES + 1))
        );
        let Ok(Waveform::Sinusoidal { modes }) = Waveform::sinusoidal(&modes[..MAX_MODES]) else {
            unreachable!()
        };
        assert_eq!(modes.len(), MAX_MODES);
    }

    #[test]
    fn wrap_handles_oversized_steps() {
        assert!((wrap(17.005, 17.0) - 0.005).abs() < 1e-9);
        assert!((wrap(40.0, 17.0) - 6.0).abs() < 1e-9);
        assert_eq!(wrap(16.0, 17.0), 16.0);
        assert_eq!(wrap(17.0, 17.0), 0.0);
    }
}
