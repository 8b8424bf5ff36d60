use {
    proptest::prelude::*,
    varistar::{
        CHANNEL_COUNT, ChannelIdx, CurrentLevel, Lightbox, PROFILES, Registry, Simulation,
        TICK_SECONDS, Waveform,
        entropy::{ClockSkewMixer, SeededEntropy},
        hw::{MemoryStore, OutputHw, PwmBoard},
    },
};

/// Remembers the last duty and current written to each channel
#[derive(Default, Clone, Debug, PartialEq)]
struct Recorder {
    duty: [f64; CHANNEL_COUNT],
    current: [CurrentLevel; CHANNEL_COUNT],
    writes: usize,
}

impl OutputHw for Recorder {
    fn set_duty(&mut self, ch: ChannelIdx, duty: f64) {
        self.duty[ch.usize()] = duty;
        self.writes += 1;
    }

    fn set_current(&mut self, ch: ChannelIdx, level: CurrentLevel) {
        self.current[ch.usize()] = level;
    }
}

fn index_of(name_prefix: &str) -> u8 {
    let pos = PROFILES
        .iter()
        .position(|p| p.name.starts_with(name_prefix))
        .expect("no such profile");
    u8::try_from(pos + 1).unwrap()
}

fn device() -> Lightbox<SeededEntropy, Recorder, MemoryStore> {
    Lightbox::new(
        Registry::builtin().unwrap(),
        SeededEntropy::default(),
        Recorder::default(),
        MemoryStore::default(),
    )
}

#[test]
fn ramp_sweeps_and_wraps() {
    let mut dev = device();
    dev.select(index_of("Ramp"));
    let mut prev = 0.0;
    for tick in 1..=1000 {
        dev.tick();
        let duty = dev.hw.duty[0];
        assert!(duty > prev, "not increasing at tick {tick}");
        assert!(duty < 1.0);
        prev = duty;
    }
    assert!((prev - 0.96).abs() < 1e-3, "ended at {prev}");
    for _ in 1001..=1041 {
        dev.tick();
        assert!(dev.hw.duty[0] > prev);
        prev = dev.hw.duty[0];
    }
    dev.tick();
    dev.tick();
    assert!(dev.hw.duty[0] < 0.01, "did not wrap: {}", dev.hw.duty[0]);
    // All 4 ramp channels move in lockstep
    assert!(dev.hw.duty.iter().all(|&d| d == dev.hw.duty[0]));
}

#[test]
fn selection_resets_state() {
    let mut dev = device();
    let cloudy = index_of("EC20058 simulation (cloudy; 10x");
    dev.select(cloudy);
    for _ in 0..20_000 {
        dev.tick();
    }
    assert_ne!(dev.sim().cloud().ring().ordered(), [0.75; 4]);
    for k in 1..=dev.status().count {
        dev.select(cloudy);
        for _ in 0..500 {
            dev.tick();
        }
        dev.select(k);
        let profile = dev.registry().get(k).unwrap();
        let scene = profile.scene().unwrap();
        let sim = dev.sim();
        if scene.cloud.enabled {
            assert_eq!(sim.cloud().ring().ordered(), [scene.cloud.initial_intensity; 4]);
        }
        assert_eq!(sim.cloud().accumulated(), 0.0);
        assert_eq!(sim.channels(), &scene.channels);
        for ch in sim.channels() {
            match ch.wave {
                Waveform::Gaussian { accumulated, .. } | Waveform::Ramp { accumulated, .. } => {
                    assert_eq!(accumulated, 0.0);
                }
                Waveform::Constant | Waveform::Sinusoidal { .. } => {}
            }
        }
    }
}

#[test]
fn selection_pushes_initial_outputs_and_persists() {
    let mut dev = device();
    let crab = index_of("Crab");
    assert_eq!(dev.select(crab), crab);
    assert_eq!(dev.hw.current[2], CurrentLevel::UA50);
    assert_eq!(dev.hw.current[0], CurrentLevel::DISABLED);
    assert!((dev.hw.duty[2] - 0.9).abs() < 1e-12);
    assert_eq!(dev.store.byte, crab);
    assert_eq!(dev.status().active, crab);
}

#[test]
fn out_of_range_selects_first() {
    let snapshot = |index: u8| {
        let mut dev = device();
        let selected = dev.select(index);
        for _ in 0..100 {
            dev.tick();
        }
        (selected, dev.hw.clone(), dev.store.byte, dev.sim().channels().clone())
    };
    let first = snapshot(1);
    let count = u8::try_from(PROFILES.len()).unwrap();
    assert_eq!(snapshot(0), first);
    assert_eq!(snapshot(count + 1), first);
    assert_eq!(snapshot(u8::MAX), first);
}

#[test]
fn boot_uses_stored_index() {
    for (stored, expected) in [(0, 1), (3, 3), (200, 1)] {
        let mut dev = Lightbox::new(
            Registry::builtin().unwrap(),
            SeededEntropy::default(),
            Recorder::default(),
            MemoryStore { byte: stored },
        );
        assert_eq!(dev.boot(), expected);
        assert_eq!(dev.store.byte, expected);
    }
}

#[test]
fn cloud_only_dims_cloudy_channels() {
    let mut dev = device();
    dev.select(index_of("EC20058 simulation (cloudy; 10x"));
    let mut seen_dimmed = false;
    for _ in 0..(120.0 / TICK_SECONDS) as usize {
        dev.tick();
        let comparison = dev.hw.duty[3];
        assert!((0.4..=0.8).contains(&comparison), "comparison at {comparison}");
        seen_dimmed |= comparison < 0.79;
        // Unused channels stay dark
        assert_eq!(dev.hw.duty[0], 0.0);
    }
    assert!(seen_dimmed);
}

#[test]
fn every_tick_writes_every_channel() {
    let mut dev = device();
    dev.select(1);
    let before = dev.hw.writes;
    for _ in 0..10 {
        dev.tick();
    }
    assert_eq!(dev.hw.writes - before, 10 * CHANNEL_COUNT);
}

#[test]
fn pwm_board_receives_compare_values() {
    let mut dev = Lightbox::new(
        Registry::builtin().unwrap(),
        SeededEntropy::default(),
        PwmBoard::default(),
        MemoryStore::default(),
    );
    dev.select(index_of("Ramp"));
    assert_eq!(dev.hw.compare, [1023; CHANNEL_COUNT]);
    assert_eq!(dev.hw.ports, [0x22, 0x22]);
    dev.tick();
    assert_eq!(dev.hw.compare, [0; CHANNEL_COUNT]);
    for _ in 0..520 {
        dev.tick();
    }
    // 521 ticks is half of the 17 s period
    assert!(dev.hw.compare.iter().all(|&c| (505..=515).contains(&c)));
}

#[test]
fn interrupt_fed_entropy_drives_clouds() {
    static MIXER: ClockSkewMixer = ClockSkewMixer::new();
    let mut dev = Lightbox::new(
        Registry::builtin().unwrap(),
        &MIXER,
        Recorder::default(),
        MemoryStore::default(),
    );
    dev.select(index_of("EC20058 simulation (cloudy; 10x"));
    for i in 0..50_000u32 {
        MIXER.harvest(i.wrapping_mul(2_654_435_761).to_le_bytes()[3]);
        dev.tick();
        let p = dev.sim().cloud().ring().ordered();
        assert!(p.iter().all(|v| (0.5..=1.0).contains(v)));
    }
}

#[test]
fn sim_is_usable_without_device() {
    let registry = Registry::builtin().unwrap();
    let mut sim = Simulation::default();
    sim.load(registry.get(1).unwrap().scene().unwrap());
    let mut hw = Recorder::default();
    let mut rng = SeededEntropy::default();
    sim.on_tick(TICK_SECONDS, &mut rng, &mut hw);
    assert!(hw.duty[2] > 0.0);
}

proptest! {
    #[test]
    fn any_index_selects_something_valid(index in any::<u8>()) {
        let mut dev = device();
        let selected = dev.select(index);
        prop_assert!((1..=dev.status().count).contains(&selected));
        if index == 0 || usize::from(index) > PROFILES.len() {
            prop_assert_eq!(selected, 1);
        } else {
            prop_assert_eq!(selected, index);
        }
    }
}
