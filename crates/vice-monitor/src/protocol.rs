//! Wire format of the binary monitor, API version 2.
//!
//! Request:  `STX | API | body_len:u32 | request_id:u32 | command:u8 | body`
//! Response: `STX | API | body_len:u32 | type:u8 | error:u8 | request_id:u32 | body`
//!
//! All multi-byte fields are little-endian.

use crate::error::MonitorError;

/// Start-of-frame marker.
pub const STX: u8 = 0x02;

/// Protocol version spoken by this client.
pub const API_VERSION: u8 = 0x02;

pub const REQUEST_HEADER_LEN: usize = 11;
pub const RESPONSE_HEADER_LEN: usize = 12;

/// Request id VICE uses for events nobody asked for.
pub const UNSOLICITED_ID: u32 = 0xFFFF_FFFF;

/// Main CPU memory space.
pub const MAIN_MEMSPACE: u8 = 0x00;

/// Sanity bound on response bodies. A full 64K memory dump is well inside.
pub const MAX_BODY_LEN: u32 = 0x0010_0000;

/// Monitor command codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Command {
    MemoryGet = 0x01,
    MemorySet = 0x02,
    RegistersGet = 0x31,
    RegistersSet = 0x32,
    AdvanceInstructions = 0x71,
    BanksAvailable = 0x82,
    RegistersAvailable = 0x83,
    Exit = 0xAA,
    Reset = 0xCC,
}

impl Command {
    /// Response type VICE answers this command with.
    #[must_use]
    pub const fn response_type(self) -> u8 {
        match self {
            // Setting registers replies with the full register dump
            Self::RegistersSet => Self::RegistersGet as u8,
            other => other as u8,
        }
    }
}

impl TryFrom<u8> for Command {
    type Error = u8;

    fn try_from(code: u8) -> Result<Self, u8> {
        match code {
            0x01 => Ok(Self::MemoryGet),
            0x02 => Ok(Self::MemorySet),
            0x31 => Ok(Self::RegistersGet),
            0x32 => Ok(Self::RegistersSet),
            0x71 => Ok(Self::AdvanceInstructions),
            0x82 => Ok(Self::BanksAvailable),
            0x83 => Ok(Self::RegistersAvailable),
            0xAA => Ok(Self::Exit),
            0xCC => Ok(Self::Reset),
            other => Err(other),
        }
    }
}

/// Build a complete request frame.
#[must_use]
pub fn encode_request(request_id: u32, command: Command, body: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(REQUEST_HEADER_LEN + body.len());
    frame.push(STX);
    frame.push(API_VERSION);
    frame.extend_from_slice(&(body.len() as u32).to_le_bytes());
    frame.extend_from_slice(&request_id.to_le_bytes());
    frame.push(command as u8);
    frame.extend_from_slice(body);
    frame
}

/// Decoded request header: `(body_len, request_id, command code)`.
///
/// Returns `None` if the start marker or version is wrong.
#[must_use]
pub fn decode_request_header(header: &[u8; REQUEST_HEADER_LEN]) -> Option<(u32, u32, u8)> {
    if header[0] != STX || header[1] != API_VERSION {
        return None;
    }
    let body_len = u32::from_le_bytes([header[2], header[3], header[4], header[5]]);
    let request_id = u32::from_le_bytes([header[6], header[7], header[8], header[9]]);
    Some((body_len, request_id, header[10]))
}

/// Fixed part of a response frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseHeader {
    pub body_len: u32,
    pub response_type: u8,
    pub error: u8,
    pub request_id: u32,
}

impl ResponseHeader {
    pub fn parse(bytes: &[u8; RESPONSE_HEADER_LEN]) -> Result<Self, MonitorError> {
        if bytes[0] != STX || bytes[1] != API_VERSION {
            return Err(MonitorError::BadHeader {
                stx: bytes[0],
                api: bytes[1],
            });
        }
        let body_len = u32::from_le_bytes([bytes[2], bytes[3], bytes[4], bytes[5]]);
        if body_len > MAX_BODY_LEN {
            return Err(MonitorError::BodyTooLarge(body_len));
        }
        Ok(Self {
            body_len,
            response_type: bytes[6],
            error: bytes[7],
            request_id: u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]),
        })
    }

    #[must_use]
    pub fn encode(&self) -> [u8; RESPONSE_HEADER_LEN] {
        let mut out = [0u8; RESPONSE_HEADER_LEN];
        out[0] = STX;
        out[1] = API_VERSION;
        out[2..6].copy_from_slice(&self.body_len.to_le_bytes());
        out[6] = self.response_type;
        out[7] = self.error;
        out[8..12].copy_from_slice(&self.request_id.to_le_bytes());
        out
    }
}

/// Little-endian reader over a response body.
///
/// Running off the end reports the response as malformed.
pub(crate) struct BodyReader<'a> {
    command: Command,
    data: &'a [u8],
    pos: usize,
}

impl<'a> BodyReader<'a> {
    pub(crate) fn new(command: Command, data: &'a [u8]) -> Self {
        Self {
            command,
            data,
            pos: 0,
        }
    }

    pub(crate) fn malformed(&self, reason: &'static str) -> MonitorError {
        MonitorError::Malformed {
            command: self.command,
            reason,
        }
    }

    pub(crate) fn bytes(&mut self, len: usize) -> Result<&'a [u8], MonitorError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| self.malformed("truncated body"))?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    pub(crate) fn u8(&mut self) -> Result<u8, MonitorError> {
        Ok(self.bytes(1)?[0])
    }

    pub(crate) fn u16(&mut self) -> Result<u16, MonitorError> {
        let b = self.bytes(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    /// Start of a length-prefixed item: its size byte, and a reader
    /// confined to the `size` bytes that follow.
    pub(crate) fn item(&mut self) -> Result<BodyReader<'a>, MonitorError> {
        let size = usize::from(self.u8()?);
        let data = self.bytes(size)?;
        Ok(BodyReader::new(self.command, data))
    }

    pub(crate) fn remaining(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_frame_layout() {
        let frame = encode_request(0x1234_5678, Command::MemoryGet, &[0xAA, 0xBB]);
        assert_eq!(
            frame,
            vec![
                0x02, 0x02, 0x02, 0x00, 0x00, 0x00, 0x78, 0x56, 0x34, 0x12, 0x01, 0xAA, 0xBB
            ]
        );
    }

    #[test]
    fn request_header_decodes() {
        let frame = encode_request(7, Command::Exit, &[]);
        let mut header = [0u8; REQUEST_HEADER_LEN];
        header.copy_from_slice(&frame[..REQUEST_HEADER_LEN]);
        assert_eq!(decode_request_header(&header), Some((0, 7, 0xAA)));
        header[1] = 0x01;
        assert_eq!(decode_request_header(&header), None);
    }

    #[test]
    fn response_header_round_trip() {
        let header = ResponseHeader {
            body_len: 5,
            response_type: 0x31,
            error: 0,
            request_id: UNSOLICITED_ID,
        };
        assert_eq!(ResponseHeader::parse(&header.encode()).ok(), Some(header));
    }

    #[test]
    fn response_header_rejects_bad_marker() {
        let mut bytes = ResponseHeader {
            body_len: 0,
            response_type: 0xAA,
            error: 0,
            request_id: 1,
        }
        .encode();
        bytes[0] = 0x03;
        assert!(matches!(
            ResponseHeader::parse(&bytes),
            Err(MonitorError::BadHeader { stx: 0x03, .. })
        ));
    }

    #[test]
    fn response_header_rejects_huge_body() {
        let bytes = ResponseHeader {
            body_len: MAX_BODY_LEN + 1,
            response_type: 0x01,
            error: 0,
            request_id: 1,
        }
        .encode();
        assert!(matches!(
            ResponseHeader::parse(&bytes),
            Err(MonitorError::BodyTooLarge(_))
        ));
    }

    #[test]
    fn set_registers_answered_by_register_dump() {
        assert_eq!(Command::RegistersSet.response_type(), 0x31);
        assert_eq!(Command::Reset.response_type(), 0xCC);
    }

    #[test]
    fn body_reader_items() {
        // Two items: [size=2: 0x10 0x20] [size=1: 0x30]
        let body = [0x02, 0x10, 0x20, 0x01, 0x30];
        let mut reader = BodyReader::new(Command::RegistersGet, &body);
        let mut first = reader.item().expect("item");
        assert_eq!(first.u16().ok(), Some(0x2010));
        let mut second = reader.item().expect("item");
        assert_eq!(second.u8().ok(), Some(0x30));
        assert!(second.u8().is_err());
        assert!(reader.remaining().is_empty());
    }

    #[test]
    fn body_reader_truncation() {
        let body = [0x05, 0x00];
        let mut reader = BodyReader::new(Command::BanksAvailable, &body);
        assert!(matches!(
            reader.item(),
            Err(MonitorError::Malformed { reason: "truncated body", .. })
        ));
    }
}
