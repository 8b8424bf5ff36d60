//! Built-in simulation profiles.

use crate::{
    channel::{Channel, CurrentLevel},
    cloud::{CloudParams, CloudPolicy},
    profile::{Profile, Registry, Scene},
    result::ProfileResult,
    waveform::{Mode, Peak, Waveform},
};

/// Pulsation modes of the white dwarf EC20058, with frequencies scaled by `speedup`
fn ec20058_modes(speedup: f64) -> ProfileResult<Waveform> {
    let modes = [
        Mode::new(1903.50e-6, 1.57, 0.95),
        Mode::new(2998.70e-6, 2.72, 0.97),
        Mode::new(3489.00e-6, 1.32, 0.15),
        Mode::new(3559.00e-6, 7.24, 0.99),
        Mode::new(3893.20e-6, 6.40, 0.34),
        Mode::new(4887.80e-6, 2.13, 0.44),
        Mode::new(4902.20e-6, 1.80, 0.19),
        Mode::new(5128.60e-6, 2.44, 0.99),
        Mode::new(7452.20e-6, 1.22, 0.17),
    ]
    .map(|m| Mode {
        freq: m.freq * speedup,
        ..m
    });
    Waveform::sinusoidal(&modes)
}

fn crab_pulse() -> ProfileResult<Waveform> {
    Waveform::gaussian(
        3.3689,
        &[Peak::new(1.038, 0.2438, 0.07566), Peak::new(0.3866, 0.6668, 0.1018)],
    )
}

fn beating_modes() -> ProfileResult<Waveform> {
    Waveform::sinusoidal(&[Mode::new(0.05, 100.0, 0.0), Mode::new(0.04, 50.0, 0.5)])
}

/// Clouds drifting between half and full transmission
const fn blend_clouds(min_period: f64, max_period: f64) -> CloudParams {
    CloudParams {
        enabled: true,
        policy: CloudPolicy::WeightedBlend {
            min_period,
            max_period,
        },
        min_intensity: 0.5,
        max_intensity: 1.0,
        initial_intensity: 0.75,
    }
}

fn beating(scene: &mut Scene) -> ProfileResult {
    scene.channels[2] = Channel {
        current: CurrentLevel::UA50,
        duty: 0.5,
        cloudy: false,
        wave: beating_modes()?,
    };
    Ok(())
}

fn ec20058(scene: &mut Scene, current: CurrentLevel, speedup: f64) -> ProfileResult {
    scene.channels[2] = Channel {
        current,
        duty: 0.5,
        cloudy: true,
        wave: ec20058_modes(speedup)?,
    };
    Ok(())
}

/// Adds a steady comparison star next to the target, under the same clouds
fn comparison(scene: &mut Scene, current: CurrentLevel) {
    scene.channels[3] = Channel {
        current,
        duty: 0.8,
        cloudy: true,
        wave: Waveform::Constant,
    };
}

fn ec20058_realtime(scene: &mut Scene) -> ProfileResult {
    ec20058(scene, CurrentLevel::UA5, 1.0)
}

fn ec20058_realtime_cloud(scene: &mut Scene) -> ProfileResult {
    scene.cloud = blend_clouds(30.0, 300.0);
    comparison(scene, CurrentLevel::UA5);
    ec20058(scene, CurrentLevel::UA5, 1.0)
}

fn ec20058_fast(scene: &mut Scene) -> ProfileResult {
    ec20058(scene, CurrentLevel::UA50, 10.0)
}

fn ec20058_fast_cloud(scene: &mut Scene) -> ProfileResult {
    scene.cloud = blend_clouds(3.0, 30.0);
    comparison(scene, CurrentLevel::UA50);
    ec20058(scene, CurrentLevel::UA50, 10.0)
}

fn crab_pulsar_slow(scene: &mut Scene) -> ProfileResult {
    scene.channels[2] = Channel {
        current: CurrentLevel::UA50,
        duty: 0.9,
        cloudy: false,
        wave: crab_pulse()?,
    };
    Ok(())
}

#[allow(clippy::unnecessary_wraps, reason = "shared initializer signature")]
fn test_ramp(scene: &mut Scene) -> ProfileResult {
    for ch in &mut scene.channels {
        *ch = Channel {
            current: CurrentLevel::UA50,
            duty: 1.0,
            cloudy: false,
            wave: Waveform::ramp(17.0),
        };
    }
    Ok(())
}

/// Undergraduate photometry lab: one target per channel, two of them under a random-walk sky
fn photometry_lab(scene: &mut Scene) -> ProfileResult {
    scene.cloud = CloudParams {
        enabled: true,
        policy: CloudPolicy::ReflectedWalk {
            period: 300.0,
            velocity: 0.05,
        },
        min_intensity: 0.5,
        max_intensity: 1.0,
        initial_intensity: 0.75,
    };
    scene.channels = [
        Channel {
            current: CurrentLevel::UA50,
            duty: 0.5,
            cloudy: false,
            wave: crab_pulse()?,
        },
        Channel {
            current: CurrentLevel::UA50,
            duty: 0.5,
            cloudy: false,
            wave: beating_modes()?,
        },
        Channel {
            current: CurrentLevel::UA5,
            duty: 0.8,
            cloudy: true,
            wave: Waveform::Constant,
        },
        Channel {
            current: CurrentLevel::UA5,
            duty: 0.5,
            cloudy: true,
            wave: ec20058_modes(1.0)?,
        },
    ];
    Ok(())
}

/// Every built-in profile, in registration order
pub const PROFILES: [Profile; 8] = [
    Profile {
        name: "Beating test signal.",
        desc: "Two sinusoids, with periods of 20 and 25 seconds.",
        exptime_ms: 1000,
        init: beating,
    },
    Profile {
        name: "EC20058 simulation (real-time).",
        desc: "Simulation of the white dwarf EC20058.",
        exptime_ms: 20000,
        init: ec20058_realtime,
    },
    Profile {
        name: "EC20058 simulation (cloudy; real-time).",
        desc: "EC20058 and a constant comparison star on a cloudy night.",
        exptime_ms: 20000,
        init: ec20058_realtime_cloud,
    },
    Profile {
        name: "EC20058 simulation (10x faster).",
        desc: "Simulation of the white dwarf EC20058 with accelerated time.",
        exptime_ms: 2000,
        init: ec20058_fast,
    },
    Profile {
        name: "EC20058 simulation (cloudy; 10x faster).",
        desc: "EC20058 and a constant comparison star on a cloudy night.",
        exptime_ms: 2000,
        init: ec20058_fast_cloud,
    },
    Profile {
        name: "Crab pulsar simulation (100x slower).",
        desc: "Simulation of the Crab pulsar, slowed to ~3s period.",
        exptime_ms: 100,
        init: crab_pulsar_slow,
    },
    Profile {
        name: "Ramp test signal.",
        desc: "Ramps output channels from 0 to max over 17 seconds.",
        exptime_ms: 100,
        init: test_ramp,
    },
    Profile {
        name: "Photometry lab.",
        desc: "Crab pulsar, beating pair, comparison star and EC20058 under drifting cloud.",
        exptime_ms: 1000,
        init: photometry_lab,
    },
];

impl Registry {
    /// Registry holding all of [`PROFILES`]
    pub fn builtin() -> ProfileResult<Self> {
        Self::new(PROFILES)
    }
}

#[test]
fn test_builtin_profiles_validate() {
    let reg = Registry::builtin().unwrap();
    assert_eq!(usize::from(reg.count()), PROFILES.len());
}

#[test]
fn test_ramp_profile_uses_all_channels() {
    let scene = PROFILES[6].scene().unwrap();
    assert!(
        scene
            .channels
            .iter()
            .all(|ch| ch.wave.period() == Some(17.0) && ch.duty == 1.0)
    );
    assert!(!scene.cloud.enabled);
}
