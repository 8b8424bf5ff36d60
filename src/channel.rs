use crate::waveform::Waveform;

/// Number of output channels
pub const CHANNEL_COUNT: usize = 4;

bitflags::bitflags! {
    /// Current source selection of a channel.
    ///
    /// Each level drives its own line, so this is a 4 bit mask rather than an ordinal.
    /// An empty mask disables the channel.
    #[derive(Clone, Copy, Default, PartialEq, Eq, Debug)]
    pub struct CurrentLevel: u8 {
        /// 5 µA
        const UA5   = 0b0001;
        /// 50 µA
        const UA50  = 0b0010;
        /// 500 µA
        const UA500 = 0b0100;
        /// 5 mA
        const MA5   = 0b1000;
    }
}

impl CurrentLevel {
    /// Channel switched off
    pub const DISABLED: Self = Self::empty();
}

/// Channel index
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub struct ChannelIdx(pub u8);

impl ChannelIdx {
    /// Get the index as a usize
    #[must_use]
    pub fn usize(self) -> usize {
        usize::from(self.0)
    }
    /// All channel indices, in order
    pub fn all() -> impl Iterator<Item = Self> {
        (0..).take(CHANNEL_COUNT).map(Self)
    }
}

/// Simulation state of one output channel
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Channel {
    /// Current source level, applied once on profile selection
    pub current: CurrentLevel,
    /// Duty cycle the waveform intensity is scaled by
    pub duty: f64,
    /// Whether the cloud attenuation applies to this channel
    pub cloudy: bool,
    /// Intensity variation over time
    pub wave: Waveform,
}

impl Channel {
    /// Advance the waveform by `dt` and compose the output duty cycle.
    ///
    /// The result is not clamped. Keeping it in `[0, 1]` is up to the profile.
    pub fn tick(&mut self, dt: f64, cloud: f64) -> f64 {
        let mut intensity = self.wave.step(dt);
        if self.cloudy {
            intensity *= cloud;
        }
        intensity * self.duty
    }
}

#[test]
fn test_cloud_only_applies_to_cloudy_channels() {
    let mut clear = Channel {
        current: CurrentLevel::UA50,
        duty: 0.8,
        cloudy: false,
        wave: Waveform::Constant,
    };
    let mut cloudy = Channel {
        cloudy: true,
        ..clear.clone()
    };
    assert!((clear.tick(0.016, 0.5) - 0.8).abs() < 1e-12);
    assert!((cloudy.tick(0.016, 0.5) - 0.4).abs() < 1e-12);
}

#[test]
fn test_current_levels_are_single_bits() {
    for level in [
        CurrentLevel::UA5,
        CurrentLevel::UA50,
        CurrentLevel::UA500,
        CurrentLevel::MA5,
    ] {
        assert_eq!(level.bits().count_ones(), 1);
    }
    assert_eq!(CurrentLevel::DISABLED.bits(), 0);
}
