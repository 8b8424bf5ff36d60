use crate::{
    entropy::EntropySource,
    hw::{IndexStore, OutputHw},
    link::{self, Frame, FrameParser, PacketKind},
    profile::{Registry, Status},
    sim::{Simulation, TICK_SECONDS},
};

/// The whole device: profiles, simulation state, and its collaborators.
///
/// `E` is the entropy source chosen for the build, `H` the output hardware and
/// `S` the storage for the active profile index.
pub struct Lightbox<E, H, S> {
    registry: Registry,
    sim: Simulation,
    /// Entropy source feeding the cloud generator
    pub entropy: E,
    /// Output hardware
    pub hw: H,
    /// Active profile storage
    pub store: S,
    parser: FrameParser,
    outbox: Vec<u8>,
}

impl<E: EntropySource, H: OutputHw, S: IndexStore> Lightbox<E, H, S> {
    /// Put the device together. Nothing is selected until [`Lightbox::boot`].
    pub fn new(registry: Registry, entropy: E, hw: H, store: S) -> Self {
        Self {
            registry,
            sim: Simulation::default(),
            entropy,
            hw,
            store,
            parser: FrameParser::default(),
            outbox: Vec::new(),
        }
    }
    /// Select the profile stored in persistent storage
    pub fn boot(&mut self) -> u8 {
        let stored = self.store.load();
        self.select(stored)
    }
    /// Run one tick of [`TICK_SECONDS`]
    pub fn tick(&mut self) {
        self.on_tick(TICK_SECONDS);
    }
    /// Run one tick of `dt` seconds
    pub fn on_tick(&mut self, dt: f64) {
        self.sim.on_tick(dt, &mut self.entropy, &mut self.hw);
    }
    /// Select a profile (1-based; out of range selects profile 1), and notify the host
    pub fn select(&mut self, index: u8) -> u8 {
        let selected = self
            .sim
            .select(&mut self.registry, index, &mut self.hw, &mut self.store);
        link::encode_select(selected, &mut self.outbox);
        selected
    }
    /// Active profile and profile count
    #[must_use]
    pub const fn status(&self) -> Status {
        self.registry.status()
    }
    /// The registered profiles
    #[must_use]
    pub const fn registry(&self) -> &Registry {
        &self.registry
    }
    /// The simulation state
    #[must_use]
    pub const fn sim(&self) -> &Simulation {
        &self.sim
    }
    /// Handle bytes received from the host
    pub fn receive(&mut self, bytes: &[u8]) {
        for &b in bytes {
            match self.parser.push(b) {
                Some(Ok(frame)) => self.handle(&frame),
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "bad frame from host");
                    link::encode_message(&e.to_string(), &mut self.outbox);
                }
                None => {}
            }
        }
    }
    /// Take everything queued for sending to the host
    pub fn take_output(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.outbox)
    }

    fn handle(&mut self, frame: &Frame) {
        let kind = char::from(frame.kind);
        tracing::debug!(%kind, len = frame.payload.len(), "frame from host");
        link::encode_message(&format!("Got packet type '{kind}'"), &mut self.outbox);
        match PacketKind::from_byte(frame.kind) {
            Some(PacketKind::RequestProfiles) => {
                link::encode_count(self.status(), &mut self.outbox);
                for (id, profile) in self.registry.iter() {
                    link::encode_descriptor(id, profile, &mut self.outbox);
                }
            }
            Some(PacketKind::SetProfile) => {
                // A missing id byte reads as 0, which selects profile 1
                let id = frame.payload.first().copied().unwrap_or(0);
                self.select(id);
            }
            _ => {
                link::encode_message(
                    &format!("Unknown packet type '{kind}' - ignoring"),
                    &mut self.outbox,
                );
            }
        }
    }
}
