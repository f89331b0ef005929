//! RCON packet framing.
//!
//! Every packet on the wire is little-endian:
//!
//! ```text
//! size:i32 | id:i32 | type:i32 | body bytes | 0x00 | 0x00
//! ```
//!
//! `size` counts every byte after itself, so the smallest legal value is 10
//! (empty body).

use crate::error::RconError;

/// Client → server: authenticate with the RCON password.
pub const SERVERDATA_AUTH: i32 = 3;
/// Server → client: result of an auth request.
pub const SERVERDATA_AUTH_RESPONSE: i32 = 2;
/// Client → server: run a console command. Shares its value with AUTH_RESPONSE.
pub const SERVERDATA_EXECCOMMAND: i32 = 2;
/// Server → client: (part of) a command's output.
pub const SERVERDATA_RESPONSE_VALUE: i32 = 0;

/// id + type + two terminating nulls
const MIN_PACKET_SIZE: usize = 10;
/// Sanity bound for a single frame; anything larger means we lost framing.
pub const MAX_PACKET_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub id: i32,
    pub kind: i32,
    pub body: String,
}

impl Packet {
    pub fn new(id: i32, kind: i32, body: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            body: body.into(),
        }
    }

    pub fn auth(id: i32, password: &str) -> Self {
        Self::new(id, SERVERDATA_AUTH, password)
    }

    pub fn exec(id: i32, command: &str) -> Self {
        Self::new(id, SERVERDATA_EXECCOMMAND, command)
    }

    /// Serializes the packet including its leading size field.
    pub fn encode(&self) -> Vec<u8> {
        let body = self.body.as_bytes();
        let size = (MIN_PACKET_SIZE + body.len()) as i32;

        let mut out = Vec::with_capacity(4 + size as usize);
        out.extend_from_slice(&size.to_le_bytes());
        out.extend_from_slice(&self.id.to_le_bytes());
        out.extend_from_slice(&self.kind.to_le_bytes());
        out.extend_from_slice(body);
        out.extend_from_slice(&[0, 0]);
        out
    }

    /// Removes one complete frame from the front of `buf`.
    ///
    /// Returns `Ok(None)` while the buffer holds only part of a frame. Player
    /// names are not guaranteed to be UTF-8, so the body is decoded lossily.
    pub fn try_parse(buf: &mut Vec<u8>) -> Result<Option<Packet>, RconError> {
        if buf.len() < 4 {
            return Ok(None);
        }

        let size = i32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
        if size < MIN_PACKET_SIZE as i32 || size as usize > MAX_PACKET_SIZE {
            return Err(RconError::Protocol(format!("invalid packet size {size}")));
        }
        let size = size as usize;
        if buf.len() < 4 + size {
            return Ok(None);
        }

        let frame: Vec<u8> = buf.drain(..4 + size).skip(4).collect();
        let id = i32::from_le_bytes([frame[0], frame[1], frame[2], frame[3]]);
        let kind = i32::from_le_bytes([frame[4], frame[5], frame[6], frame[7]]);

        // Body ends at the first of the two terminators; some servers pad
        // multi-packet replies, so trailing nulls are not trusted.
        let body_bytes = &frame[8..size - 2];
        let end = body_bytes
            .iter()
            .position(|b| *b == 0)
            .unwrap_or(body_bytes.len());
        let body = String::from_utf8_lossy(&body_bytes[..end]).into_owned();

        Ok(Some(Packet { id, kind, body }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_layout() {
        let bytes = Packet::exec(7, "listplayers").encode();
        assert_eq!(&bytes[0..4], &(10 + 11i32).to_le_bytes());
        assert_eq!(&bytes[4..8], &7i32.to_le_bytes());
        assert_eq!(&bytes[8..12], &SERVERDATA_EXECCOMMAND.to_le_bytes());
        assert_eq!(&bytes[12..23], b"listplayers");
        assert_eq!(&bytes[23..], &[0, 0]);
    }

    #[test]
    fn test_partial_frames_wait_for_more_bytes() {
        let bytes = Packet::new(3, SERVERDATA_RESPONSE_VALUE, "hello").encode();
        let mut buf = bytes[..6].to_vec();
        assert_eq!(Packet::try_parse(&mut buf).unwrap(), None);
        assert_eq!(buf.len(), 6);

        buf.extend_from_slice(&bytes[6..]);
        let packet = Packet::try_parse(&mut buf).unwrap().unwrap();
        assert_eq!(packet.body, "hello");
        assert!(buf.is_empty());
    }

    #[test]
    fn test_back_to_back_frames() {
        let mut buf = Packet::new(1, SERVERDATA_RESPONSE_VALUE, "").encode();
        buf.extend(Packet::new(1, SERVERDATA_AUTH_RESPONSE, "").encode());

        let first = Packet::try_parse(&mut buf).unwrap().unwrap();
        let second = Packet::try_parse(&mut buf).unwrap().unwrap();
        assert_eq!(first.kind, SERVERDATA_RESPONSE_VALUE);
        assert_eq!(second.kind, SERVERDATA_AUTH_RESPONSE);
        assert_eq!(Packet::try_parse(&mut buf).unwrap(), None);
    }

    #[test]
    fn test_invalid_size_is_protocol_error() {
        let mut buf = 3i32.to_le_bytes().to_vec();
        buf.extend_from_slice(&[0; 8]);
        assert!(matches!(Packet::try_parse(&mut buf), Err(RconError::Protocol(_))));

        let mut huge = (MAX_PACKET_SIZE as i32 + 1).to_le_bytes().to_vec();
        assert!(Packet::try_parse(&mut huge).is_err());
    }

    #[test]
    fn test_non_utf8_body_is_lossy() {
        let mut bytes = Packet::new(2, SERVERDATA_RESPONSE_VALUE, "ab").encode();
        bytes[12] = 0xff;
        let packet = Packet::try_parse(&mut bytes).unwrap().unwrap();
        assert_eq!(packet.body, "\u{fffd}b");
    }
}
