#![doc = include_str!("../README.md")]
// When we return an error type, the possible errors are encoded within it.
#![allow(clippy::missing_errors_doc)]

mod catalogue;
mod channel;
mod cloud;
pub mod entropy;
pub mod hw;
mod lightbox;
pub mod link;
mod profile;
mod result;
mod sim;
mod waveform;

pub use {
    catalogue::PROFILES,
    channel::{CHANNEL_COUNT, Channel, ChannelIdx, CurrentLevel},
    cloud::{CONTROL_POINTS, CloudGen, CloudParams, CloudPolicy, ControlRing, catmull_rom, reflect},
    lightbox::Lightbox,
    profile::{Profile, Registry, Scene, Status},
    result::{LinkError, LinkResult, ProfileError, ProfileResult},
    sim::{Simulation, TICK_SECONDS},
    waveform::{MAX_MODES, Mode, Modes, Peak, Peaks, Waveform},
};
