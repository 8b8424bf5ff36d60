use thiserror::Error;

/// Reasons a profile is refused at registration
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ProfileError {
    /// A registry needs at least one profile to fall back to
    #[error("No profiles registered")]
    Empty,
    /// Profile indices are a single byte
    #[error("Too many profiles (at most 255 can be registered)")]
    TooMany,
    /// Name does not fit into a profile descriptor
    #[error("Profile name is {0} bytes long (max 40)")]
    NameTooLong(usize),
    /// Description does not fit into a profile descriptor
    #[error("Profile description is {0} bytes long (max 150)")]
    DescTooLong(usize),
    /// A waveform holds at most [`crate::MAX_MODES`] modes or peaks
    #[error("Waveform has {0} modes or peaks (max 20)")]
    TooManyModes(usize),
    /// Gaussian and ramp waveforms divide by their period every tick
    #[error("Channel {channel}: waveform period must be positive (got {period})")]
    WavePeriod {
        /// Offending channel
        channel: u8,
        /// The period
        period: f64,
    },
    /// Gaussian peaks divide by their width
    #[error("Channel {channel}: gaussian peak {peak} has zero width")]
    PeakWidth {
        /// Offending channel
        channel: u8,
        /// Index of the peak
        peak: usize,
    },
    /// Cloud segment durations must be positive and ordered
    #[error("Cloud period range {min}..{max} is invalid")]
    CloudPeriod {
        /// Shortest period
        min: f64,
        /// Longest period
        max: f64,
    },
    /// Cloud intensity bounds must be ordered and within `[0, 1]`
    #[error("Cloud intensity range {min}..{max} is invalid")]
    CloudRange {
        /// Lower bound
        min: f64,
        /// Upper bound
        max: f64,
    },
    /// Initial intensity must lie in the intensity range
    #[error("Initial cloud intensity {0} is outside the intensity range")]
    CloudInitial(f64),
    /// A walk step larger than the range could be reflected out of it
    #[error("Cloud walk velocity {velocity} exceeds the intensity span {span}")]
    WalkVelocity {
        /// Step bound
        velocity: f64,
        /// `max_intensity - min_intensity`
        span: f64,
    },
}

/// Errors that can happen while decoding link frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LinkError {
    /// Declared payload length is over the limit
    #[error("Ignoring long packet: {} (length {len})", type_char(.kind))]
    TooLong {
        /// Packet type byte
        kind: u8,
        /// Declared length
        len: u8,
    },
    /// Xor of the payload did not match
    #[error("Packet checksum failed. Got 0x{got:02x}, expected 0x{expected:02x}")]
    Checksum {
        /// Checksum byte received
        got: u8,
        /// Checksum computed over the payload
        expected: u8,
    },
    /// Frame was not terminated by `\r\n`
    #[error("Invalid packet end byte. Got 0x{got:02x}, expected 0x{expected:02x}")]
    Footer {
        /// Byte received
        got: u8,
        /// Byte expected
        expected: u8,
    },
    /// Payload too short for its packet type
    #[error("Packet {} payload too short ({len} bytes)", type_char(.kind))]
    Short {
        /// Packet type byte
        kind: u8,
        /// Actual length
        len: usize,
    },
}

fn type_char(kind: &u8) -> char {
    char::from(*kind)
}

/// Result of validating or registering a profile
pub type ProfileResult<T = ()> = Result<T, ProfileError>;

/// Result of a link operation
pub type LinkResult<T = ()> = Result<T, LinkError>;
