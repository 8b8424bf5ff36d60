//! Framed command/telemetry protocol spoken over the serial link.
//!
//! A frame looks like this:
//!
//! ```text
//! '$' '$' type len payload[len] checksum '\r' '\n'
//! ```
//!
//! where `checksum` is the xor of all payload bytes.

use {
    crate::{
        profile::{Profile, Status},
        result::{LinkError, LinkResult},
    },
    arrayvec::ArrayVec,
    std::iter,
};

/// Largest payload a frame can carry.
///
/// Frames declaring a longer payload are refused with [`LinkError::TooLong`],
/// before any payload byte is read.
pub const MAX_PAYLOAD: usize = 200;
/// Largest profile name that fits into a descriptor
pub const MAX_NAME_LEN: usize = 40;
/// Largest profile description that fits into a descriptor
pub const MAX_DESC_LEN: usize = 150;

const HEADER: u8 = b'$';
const FOOTER: [u8; 2] = *b"\r\n";

/// Known packet types
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum PacketKind {
    /// Host asks for the profile list
    RequestProfiles = b'A',
    /// Host selects a profile; device confirms a changed selection
    SetProfile = b'B',
    /// Free-text log message
    Message = b'C',
    /// Description of one profile
    Descriptor = b'D',
    /// Profile count and active profile
    Count = b'E',
}

impl PacketKind {
    /// Packet kind of a type byte, if it's a known one
    #[must_use]
    pub const fn from_byte(b: u8) -> Option<Self> {
        Some(match b {
            b'A' => Self::RequestProfiles,
            b'B' => Self::SetProfile,
            b'C' => Self::Message,
            b'D' => Self::Descriptor,
            b'E' => Self::Count,
            _ => return None,
        })
    }
}

/// Payload of a [`PacketKind::Count`] packet
#[derive(Clone, Copy, PartialEq, Eq, Debug, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct CountPayload {
    /// Number of profiles
    pub total: u8,
    /// 1-based active profile
    pub active: u8,
}

/// Payload of a [`PacketKind::SetProfile`] packet
#[derive(Clone, Copy, PartialEq, Eq, Debug, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct SelectPayload {
    /// 1-based profile index
    pub id: u8,
}

/// A decoded frame
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    /// Raw type byte, see [`PacketKind`]
    pub kind: u8,
    /// Payload bytes
    pub payload: ArrayVec<u8, MAX_PAYLOAD>,
}

/// Append a frame to `out`.
///
/// Payloads longer than [`MAX_PAYLOAD`] are truncated.
pub fn encode_frame(kind: PacketKind, payload: &[u8], out: &mut Vec<u8>) {
    let payload = &payload[..payload.len().min(MAX_PAYLOAD)];
    out.extend_from_slice(&[HEADER, HEADER, kind as u8]);
    #[expect(clippy::cast_possible_truncation)]
    out.push(payload.len() as u8);
    out.extend_from_slice(payload);
    out.push(payload.iter().fold(0, |acc, b| acc ^ b));
    out.extend_from_slice(&FOOTER);
}

/// Append a free-text message frame. Text is cut at `MAX_PAYLOAD - 1` bytes.
pub fn encode_message(text: &str, out: &mut Vec<u8>) {
    let text = &text.as_bytes()[..text.len().min(MAX_PAYLOAD - 1)];
    #[expect(clippy::cast_possible_truncation)]
    let len = text.len() as u8;
    let payload: ArrayVec<u8, MAX_PAYLOAD> =
        iter::once(len).chain(text.iter().copied()).collect();
    encode_frame(PacketKind::Message, &payload, out);
}

/// Append a profile count frame
pub fn encode_count(status: Status, out: &mut Vec<u8>) {
    let payload = CountPayload {
        total: status.count,
        active: status.active,
    };
    encode_frame(PacketKind::Count, bytemuck::bytes_of(&payload), out);
}

/// Append a profile selection frame
pub fn encode_select(id: u8, out: &mut Vec<u8>) {
    encode_frame(PacketKind::SetProfile, bytemuck::bytes_of(&SelectPayload { id }), out);
}

/// Append a profile descriptor frame.
///
/// Layout: id, exposure time (u16 LE), name (41 bytes, NUL padded), name length,
/// description (151 bytes, NUL padded), description length.
pub fn encode_descriptor(id: u8, profile: &Profile, out: &mut Vec<u8>) {
    let mut payload = Vec::with_capacity(DESCRIPTOR_LEN);
    payload.push(id);
    payload.extend_from_slice(&profile.exptime_ms.to_le_bytes());
    push_padded(&mut payload, profile.name, MAX_NAME_LEN);
    push_padded(&mut payload, profile.desc, MAX_DESC_LEN);
    encode_frame(PacketKind::Descriptor, &payload, out);
}

const DESCRIPTOR_LEN: usize = 1 + 2 + (MAX_NAME_LEN + 2) + (MAX_DESC_LEN + 2);

/// Writes `max + 1` bytes of NUL padded text followed by its length
fn push_padded(out: &mut Vec<u8>, text: &str, max: usize) {
    let bytes = &text.as_bytes()[..text.len().min(max)];
    out.extend_from_slice(bytes);
    out.resize(out.len() + (max + 1 - bytes.len()), 0);
    #[expect(clippy::cast_possible_truncation)]
    out.push(bytes.len() as u8);
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
enum ParseState {
    #[default]
    HeaderA,
    HeaderB,
    Type,
    Length,
    Data,
    Checksum,
    FooterA,
    FooterB,
}

/// Byte-at-a-time frame decoder
#[derive(Default, Debug)]
pub struct FrameParser {
    state: ParseState,
    kind: u8,
    len: u8,
    checksum: u8,
    payload: ArrayVec<u8, MAX_PAYLOAD>,
}

impl FrameParser {
    /// Feed one byte.
    ///
    /// Returns a frame once its footer arrives, or an error when the frame is
    /// malformed. Either way the parser then resynchronizes on the next header.
    pub fn push(&mut self, b: u8) -> Option<LinkResult<Frame>> {
        match self.state {
            ParseState::HeaderA | ParseState::HeaderB => {
                self.state = match (self.state, b == HEADER) {
                    (ParseState::HeaderA, true) => ParseState::HeaderB,
                    (_, true) => ParseState::Type,
                    (_, false) => ParseState::HeaderA,
                };
            }
            ParseState::Type => {
                self.kind = b;
                self.state = ParseState::Length;
            }
            ParseState::Length => {
                self.len = b;
                self.checksum = 0;
                self.payload.clear();
                if b == 0 {
                    self.state = ParseState::Checksum;
                } else if usize::from(b) <= MAX_PAYLOAD {
                    self.state = ParseState::Data;
                } else {
                    self.state = ParseState::HeaderA;
                    return Some(Err(LinkError::TooLong {
                        kind: self.kind,
                        len: b,
                    }));
                }
            }
            ParseState::Data => {
                self.checksum ^= b;
                self.payload.push(b);
                if self.payload.len() == usize::from(self.len) {
                    self.state = ParseState::Checksum;
                }
            }
            ParseState::Checksum => {
                if b == self.checksum {
                    self.state = ParseState::FooterA;
                } else {
                    self.state = ParseState::HeaderA;
                    return Some(Err(LinkError::Checksum {
                        got: b,
                        expected: self.checksum,
                    }));
                }
            }
            ParseState::FooterA => {
                if b == FOOTER[0] {
                    self.state = ParseState::FooterB;
                } else {
                    self.state = ParseState::HeaderA;
                    return Some(Err(LinkError::Footer {
                        got: b,
                        expected: FOOTER[0],
                    }));
                }
            }
            ParseState::FooterB => {
                self.state = ParseState::HeaderA;
                if b != FOOTER[1] {
                    return Some(Err(LinkError::Footer {
                        got: b,
                        expected: FOOTER[1],
                    }));
                }
                return Some(Ok(Frame {
                    kind: self.kind,
                    payload: std::mem::take(&mut self.payload),
                }));
            }
        }
        None
    }
}

/// Description of a profile, as reported by the device
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Descriptor {
    /// 1-based profile index
    pub id: u8,
    /// Recommended exposure time (ms)
    pub exptime_ms: u16,
    /// Profile name
    pub name: String,
    /// Profile description
    pub desc: String,
}

/// A frame, interpreted according to its type
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reply {
    /// Profile list request
    RequestProfiles,
    /// Profile selection (request or confirmation)
    Selected(u8),
    /// Log message
    Message(String),
    /// Profile description
    Descriptor(Descriptor),
    /// Profile count and active profile
    Count(CountPayload),
    /// Packet type we don't know about
    Unknown(u8),
}

impl Frame {
    /// Interpret the payload according to the packet type
    pub fn decode(&self) -> LinkResult<Reply> {
        let p = &self.payload[..];
        let short = || LinkError::Short {
            kind: self.kind,
            len: p.len(),
        };
        let Some(kind) = PacketKind::from_byte(self.kind) else {
            return Ok(Reply::Unknown(self.kind));
        };
        Ok(match kind {
            PacketKind::RequestProfiles => Reply::RequestProfiles,
            PacketKind::SetProfile => {
                let sel: SelectPayload = bytemuck::pod_read_unaligned(p.get(..1).ok_or_else(short)?);
                Reply::Selected(sel.id)
            }
            PacketKind::Message => {
                let (&len, text) = p.split_first().ok_or_else(short)?;
                let text = text.get(..usize::from(len)).ok_or_else(short)?;
                Reply::Message(String::from_utf8_lossy(text).into_owned())
            }
            PacketKind::Count => Reply::Count(bytemuck::pod_read_unaligned(
                p.get(..2).ok_or_else(short)?,
            )),
            PacketKind::Descriptor => {
                if p.len() < DESCRIPTOR_LEN {
                    return Err(short());
                }
                let (name, rest) = read_padded(&p[3..], MAX_NAME_LEN);
                let (desc, _) = read_padded(rest, MAX_DESC_LEN);
                Reply::Descriptor(Descriptor {
                    id: p[0],
                    exptime_ms: u16::from_le_bytes([p[1], p[2]]),
                    name,
                    desc,
                })
            }
        })
    }
}

/// Read text written by [`push_padded`], returning it and the remaining bytes
fn read_padded(buf: &[u8], max: usize) -> (String, &[u8]) {
    let (text, rest) = buf.split_at(max + 1);
    let len = usize::from(rest[0]).min(max);
    (String::from_utf8_lossy(&text[..len]).into_owned(), &rest[1..])
}
