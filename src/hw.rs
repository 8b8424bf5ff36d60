//! Hardware and persistence boundaries.

use crate::channel::{CHANNEL_COUNT, ChannelIdx, CurrentLevel};

/// Largest compare value of the 10 bit PWM timers
pub const PWM_TOP: u16 = 0x03FF;

/// Where the simulation writes its output
pub trait OutputHw {
    /// Set the PWM duty cycle of a channel. `duty` is nominally in `[0, 1]`.
    fn set_duty(&mut self, ch: ChannelIdx, duty: f64);
    /// Select the current source of a channel
    fn set_current(&mut self, ch: ChannelIdx, level: CurrentLevel);
}

/// Persistent storage for the active profile index
pub trait IndexStore {
    /// Read the stored 1-based index. Anything out of range is treated as profile 1 by the caller.
    fn load(&self) -> u8;
    /// Store a new 1-based index
    fn store(&mut self, index: u8);
}

/// Convert a duty cycle to a 10 bit compare value (rounded down).
///
/// Values outside `[0, 1]` saturate at the ends of the PWM range.
#[must_use]
#[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn duty_to_compare(duty: f64) -> u16 {
    ((f64::from(PWM_TOP) * duty) as u16).min(PWM_TOP)
}

/// Which output port a channel's current mask lives on
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Port {
    /// Port A
    A = 0,
    /// Port D
    D = 1,
}

/// Half of a port that holds a channel's current mask
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Nibble {
    /// Bits 0..4
    Low,
    /// Bits 4..8
    High,
}

impl Nibble {
    const fn mask(self) -> u8 {
        match self {
            Self::Low => 0x0F,
            Self::High => 0xF0,
        }
    }
    const fn shift(self) -> u8 {
        match self {
            Self::Low => 0,
            Self::High => 4,
        }
    }
}

/// Wiring of a single channel
#[derive(Clone, Copy, Debug)]
pub struct Wiring {
    /// Port holding the current mask
    pub port: Port,
    /// Nibble of that port
    pub nibble: Nibble,
}

/// Channel wiring of the reference board.
///
/// Channels 0 and 1 share port A, channels 2 and 3 share port D.
pub const BOARD_WIRING: [Wiring; CHANNEL_COUNT] = [
    Wiring {
        port: Port::A,
        nibble: Nibble::Low,
    },
    Wiring {
        port: Port::A,
        nibble: Nibble::High,
    },
    Wiring {
        port: Port::D,
        nibble: Nibble::High,
    },
    Wiring {
        port: Port::D,
        nibble: Nibble::Low,
    },
];

/// Register level model of the output board.
///
/// Holds the 4 PWM compare registers and the 2 current-select ports.
#[derive(Clone, Debug)]
pub struct PwmBoard {
    /// PWM compare values, one per channel
    pub compare: [u16; CHANNEL_COUNT],
    /// Current-select port values, indexed by [`Port`]
    pub ports: [u8; 2],
    wiring: [Wiring; CHANNEL_COUNT],
}

impl Default for PwmBoard {
    fn default() -> Self {
        Self::new(BOARD_WIRING)
    }
}

impl PwmBoard {
    /// Board with custom wiring and all registers cleared
    #[must_use]
    pub const fn new(wiring: [Wiring; CHANNEL_COUNT]) -> Self {
        Self {
            compare: [0; CHANNEL_COUNT],
            ports: [0; 2],
            wiring,
        }
    }
    /// Current level a channel is set to, as read back from its port
    #[must_use]
    pub fn current(&self, ch: ChannelIdx) -> CurrentLevel {
        let w = self.wiring[ch.usize()];
        let bits = (self.ports[w.port as usize] & w.nibble.mask()) >> w.nibble.shift();
        CurrentLevel::from_bits_retain(bits)
    }
}

impl OutputHw for PwmBoard {
    fn set_duty(&mut self, ch: ChannelIdx, duty: f64) {
        self.compare[ch.usize()] = duty_to_compare(duty);
    }

    fn set_current(&mut self, ch: ChannelIdx, level: CurrentLevel) {
        let w = self.wiring[ch.usize()];
        let port = &mut self.ports[w.port as usize];
        *port &= !w.nibble.mask();
        *port |= (level.bits() & 0x0F) << w.nibble.shift();
    }
}

/// Index store kept in memory, standing in for a single EEPROM byte
#[derive(Clone, Copy, Debug, Default)]
pub struct MemoryStore {
    /// The stored byte
    pub byte: u8,
}

impl IndexStore for MemoryStore {
    fn load(&self) -> u8 {
        self.byte
    }

    fn store(&mut self, index: u8) {
        self.byte = index;
    }
}

#[test]
fn test_duty_rounds_down_to_10_bits() {
    assert_eq!(duty_to_compare(0.0), 0);
    assert_eq!(duty_to_compare(0.5), 511);
    assert_eq!(duty_to_compare(1.0), 1023);
    assert_eq!(duty_to_compare(1.3), 1023);
    assert_eq!(duty_to_compare(-0.2), 0);
}

#[test]
fn test_shared_port_nibbles_are_independent() {
    let mut board = PwmBoard::default();
    board.set_current(ChannelIdx(0), CurrentLevel::UA50);
    board.set_current(ChannelIdx(1), CurrentLevel::MA5);
    assert_eq!(board.ports[Port::A as usize], 0x82);
    board.set_current(ChannelIdx(0), CurrentLevel::DISABLED);
    assert_eq!(board.ports[Port::A as usize], 0x80);
    assert_eq!(board.current(ChannelIdx(1)), CurrentLevel::MA5);

    board.set_current(ChannelIdx(2), CurrentLevel::UA5);
    board.set_current(ChannelIdx(3), CurrentLevel::UA500);
    assert_eq!(board.ports[Port::D as usize], 0x14);
}
