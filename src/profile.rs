use crate::{
    channel::{CHANNEL_COUNT, Channel},
    cloud::{CloudParams, CloudPolicy},
    link::{MAX_DESC_LEN, MAX_NAME_LEN},
    result::{ProfileError, ProfileResult},
    waveform::Waveform,
};

/// Everything a profile initializes: cloud parameters and all channels
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Scene {
    /// Cloud generator configuration
    pub cloud: CloudParams,
    /// Output channels
    pub channels: [Channel; CHANNEL_COUNT],
}

impl Scene {
    /// Check that nothing in the scene can divide by zero or leave its range mid-tick
    pub fn validate(&self) -> ProfileResult {
        for (i, ch) in self.channels.iter().enumerate() {
            #[expect(clippy::cast_possible_truncation)]
            let channel = i as u8;
            if let Some(period) = ch.wave.period()
                && !(period > 0.0)
            {
                return Err(ProfileError::WavePeriod { channel, period });
            }
            if let Waveform::Gaussian { peaks, .. } = &ch.wave
                && let Some(peak) = peaks.iter().position(|p| p.width == 0.0)
            {
                return Err(ProfileError::PeakWidth { channel, peak });
            }
        }
        let c = &self.cloud;
        if !c.enabled {
            return Ok(());
        }
        if !(0.0 <= c.min_intensity && c.min_intensity <= c.max_intensity && c.max_intensity <= 1.0)
        {
            return Err(ProfileError::CloudRange {
                min: c.min_intensity,
                max: c.max_intensity,
            });
        }
        if !(c.min_intensity..=c.max_intensity).contains(&c.initial_intensity) {
            return Err(ProfileError::CloudInitial(c.initial_intensity));
        }
        match c.policy {
            CloudPolicy::WeightedBlend {
                min_period,
                max_period,
            } => {
                if !(min_period > 0.0 && min_period <= max_period) {
                    return Err(ProfileError::CloudPeriod {
                        min: min_period,
                        max: max_period,
                    });
                }
            }
            CloudPolicy::ReflectedWalk { period, velocity } => {
                if !(period > 0.0) {
                    return Err(ProfileError::CloudPeriod {
                        min: period,
                        max: period,
                    });
                }
                let span = c.max_intensity - c.min_intensity;
                if !(0.0..=span).contains(&velocity) {
                    return Err(ProfileError::WalkVelocity { velocity, span });
                }
            }
        }
        Ok(())
    }
}

/// A named simulation
#[derive(Clone, Copy, Debug)]
pub struct Profile {
    /// Short display name (at most 40 bytes)
    pub name: &'static str,
    /// Longer description (at most 150 bytes)
    pub desc: &'static str,
    /// Recommended exposure time, in milliseconds
    pub exptime_ms: u16,
    /// Fills in a blank [`Scene`]
    pub init: fn(&mut Scene) -> ProfileResult,
}

impl Profile {
    /// Build the scene this profile describes
    pub fn scene(&self) -> ProfileResult<Scene> {
        let mut scene = Scene::default();
        (self.init)(&mut scene)?;
        Ok(scene)
    }
    /// Check the profile's strings and scene
    pub fn validate(&self) -> ProfileResult {
        if self.name.len() > MAX_NAME_LEN {
            return Err(ProfileError::NameTooLong(self.name.len()));
        }
        if self.desc.len() > MAX_DESC_LEN {
            return Err(ProfileError::DescTooLong(self.desc.len()));
        }
        self.scene()?.validate()
    }
}

/// Which profile is active, and how many there are
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Status {
    /// 1-based index of the active profile, or 0 if none was selected yet
    pub active: u8,
    /// Number of registered profiles
    pub count: u8,
}

/// Ordered list of validated profiles
#[derive(Clone, Debug)]
pub struct Registry {
    profiles: Vec<Profile>,
    active: u8,
}

impl Registry {
    /// Create a registry. At least one profile is required.
    pub fn new(profiles: impl IntoIterator<Item = Profile>) -> ProfileResult<Self> {
        let mut this = Self {
            profiles: Vec::new(),
            active: 0,
        };
        for profile in profiles {
            this.register(profile)?;
        }
        if this.profiles.is_empty() {
            return Err(ProfileError::Empty);
        }
        Ok(this)
    }
    /// Validate and append a profile, returning its 1-based index
    pub fn register(&mut self, profile: Profile) -> ProfileResult<u8> {
        if self.profiles.len() >= usize::from(u8::MAX) {
            return Err(ProfileError::TooMany);
        }
        profile.validate()?;
        self.profiles.push(profile);
        tracing::debug!(name = profile.name, index = self.count(), "registered profile");
        Ok(self.count())
    }
    /// Number of profiles
    #[must_use]
    #[expect(clippy::cast_possible_truncation)]
    pub const fn count(&self) -> u8 {
        self.profiles.len() as u8
    }
    /// Profile at a 1-based index
    #[must_use]
    pub fn get(&self, index: u8) -> Option<&Profile> {
        self.profiles.get(usize::from(index).checked_sub(1)?)
    }
    /// All profiles, paired with their 1-based indices
    pub fn iter(&self) -> impl Iterator<Item = (u8, &Profile)> {
        (1..=u8::MAX).zip(&self.profiles)
    }
    /// Map an index to a valid one. Anything out of range becomes 1.
    #[must_use]
    pub const fn resolve(&self, index: u8) -> u8 {
        if index == 0 || index > self.count() {
            1
        } else {
            index
        }
    }
    /// Snapshot of the active index and profile count
    #[must_use]
    pub const fn status(&self) -> Status {
        Status {
            active: self.active,
            count: self.count(),
        }
    }
    pub(crate) const fn set_active(&mut self, index: u8) {
        self.active = index;
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::waveform::{Mode, Peak},
    };

    #[allow(clippy::unnecessary_wraps, reason = "shared initializer signature")]
    fn ramp_scene(scene: &mut Scene) -> ProfileResult {
        scene.channels[0].wave = Waveform::ramp(0.0);
        Ok(())
    }

    fn flat_peak(scene: &mut Scene) -> ProfileResult {
        scene.channels[2].wave = Waveform::gaussian(1.0, &[Peak::new(1.0, 0.5, 0.0)])?;
        Ok(())
    }

    fn crowded(scene: &mut Scene) -> ProfileResult {
        scene.channels[1].wave = Waveform::sinusoidal(&[Mode::new(0.1, 1.0, 0.0); 25])?;
        Ok(())
    }

    #[allow(clippy::unnecessary_wraps, reason = "shared initializer signature")]
    fn wild_walk(scene: &mut Scene) -> ProfileResult {
        scene.cloud = CloudParams {
            enabled: true,
            policy: CloudPolicy::ReflectedWalk {
                period: 10.0,
                velocity: 0.6,
            },
            min_intensity: 0.5,
            max_intensity: 1.0,
            initial_intensity: 0.75,
        };
        Ok(())
    }

    fn beating(scene: &mut Scene) -> ProfileResult {
        scene.channels[1].duty = 0.5;
        scene.channels[1].wave =
            Waveform::sinusoidal(&[Mode::new(0.05, 100.0, 0.0), Mode::new(0.04, 50.0, 0.5)])?;
        Ok(())
    }

    const fn profile(init: fn(&mut Scene) -> ProfileResult) -> Profile {
        Profile {
            name: "Test",
            desc: "Test profile",
            exptime_ms: 100,
            init,
        }
    }

    #[test]
    fn zero_period_is_rejected() {
        assert_eq!(
            profile(ramp_scene).validate(),
            Err(ProfileError::WavePeriod {
                channel: 0,
                period: 0.0
            })
        );
    }

    #[test]
    fn zero_width_is_rejected() {
        assert_eq!(
            profile(flat_peak).validate(),
            Err(ProfileError::PeakWidth {
                channel: 2,
                peak: 0
            })
        );
    }

    #[test]
    fn too_many_modes_are_rejected() {
        let mut reg = Registry::new([profile(beating)]).unwrap();
        assert_eq!(
            reg.register(profile(crowded)),
            Err(ProfileError::TooManyModes(25))
        );
        assert_eq!(reg.count(), 1);
    }

    #[test]
    fn walk_faster_than_range_is_rejected() {
        assert!(matches!(
            profile(wild_walk).validate(),
            Err(ProfileError::WalkVelocity { .. })
        ));
    }

    #[test]
    fn long_name_is_rejected() {
        let p = Profile {
            name: "A name that is far too long to fit the descriptor",
            ..profile(beating)
        };
        assert_eq!(p.validate(), Err(ProfileError::NameTooLong(p.name.len())));
    }

    #[test]
    fn empty_registry_is_rejected() {
        assert_eq!(Registry::new([]).err(), Some(ProfileError::Empty));
    }

    #[test]
    fn resolve_falls_back_to_first() {
        let reg = Registry::new([profile(beating), profile(beating)]).unwrap();
        assert_eq!(reg.count(), 2);
        assert_eq!(reg.resolve(0), 1);
        assert_eq!(reg.resolve(2), 2);
        assert_eq!(reg.resolve(3), 1);
        assert!(reg.get(0).is_none());
        assert!(reg.get(2).is_some());
        assert_eq!(reg.status(), Status { active: 0, count: 2 });
    }
}
