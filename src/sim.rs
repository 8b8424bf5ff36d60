use {
    crate::{
        channel::{CHANNEL_COUNT, Channel, ChannelIdx},
        cloud::CloudGen,
        entropy::EntropySource,
        hw::{IndexStore, OutputHw},
        profile::{Registry, Scene},
    },
    std::iter::zip,
};

/// Period of the output update tick (seconds)
pub const TICK_SECONDS: f64 = 0.01632;

/// All state the periodic tick works on.
///
/// Ticking and selecting both need `&mut self`, so they can never overlap.
/// On a target where the tick runs in an interrupt, selection has to happen
/// with that interrupt masked, or from inside it.
#[derive(Clone, Debug, Default)]
pub struct Simulation {
    cloud: CloudGen,
    channels: [Channel; CHANNEL_COUNT],
}

impl Simulation {
    /// The cloud generator
    #[must_use]
    pub const fn cloud(&self) -> &CloudGen {
        &self.cloud
    }
    /// The output channels
    #[must_use]
    pub const fn channels(&self) -> &[Channel; CHANNEL_COUNT] {
        &self.channels
    }
    /// Replace all state with a freshly initialized scene
    pub fn load(&mut self, scene: Scene) {
        let Scene { cloud, channels } = scene;
        self.cloud.reset(cloud);
        self.channels = channels;
    }
    /// Advance everything by `dt` seconds and write the new duty cycles.
    ///
    /// The cloud is stepped once, then every channel is stepped and composited.
    pub fn on_tick<E, H>(&mut self, dt: f64, entropy: &mut E, hw: &mut H)
    where
        E: EntropySource + ?Sized,
        H: OutputHw + ?Sized,
    {
        let cloud = self.cloud.step(dt, entropy);
        for (idx, ch) in zip(ChannelIdx::all(), &mut self.channels) {
            hw.set_duty(idx, ch.tick(dt, cloud));
        }
    }
    /// Switch to the profile at 1-based `index`, falling back to profile 1 if it's out of range.
    ///
    /// Resets every channel and the cloud, pushes the initial current levels and
    /// duty cycles to the hardware, and persists the index.
    /// Returns the index that was actually selected.
    pub fn select<H, S>(&mut self, registry: &mut Registry, index: u8, hw: &mut H, store: &mut S) -> u8
    where
        H: OutputHw + ?Sized,
        S: IndexStore + ?Sized,
    {
        let resolved = registry.resolve(index);
        if resolved != index {
            tracing::warn!(requested = index, "no such profile, selecting profile 1");
        }
        let Some(&profile) = registry.get(resolved) else {
            // `Registry` is never empty, so profile 1 always exists
            return registry.status().active;
        };
        let scene = match profile.scene() {
            Ok(scene) => scene,
            Err(e) => {
                // Only reachable if an initializer is not deterministic
                tracing::error!(index = resolved, error = %e, "profile failed to build");
                return registry.status().active;
            }
        };
        self.load(scene);
        for (idx, ch) in zip(ChannelIdx::all(), &self.channels) {
            hw.set_current(idx, ch.current);
            hw.set_duty(idx, ch.duty);
        }
        store.store(resolved);
        tracing::info!(index = resolved, name = profile.name, "selected profile");
        registry.set_active(resolved);
        resolved
    }
}
