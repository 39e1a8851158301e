//! U-Blox MGA (Multiple GNSS Assistance) packet framing.
//!
//! An AssistNow download is a plain concatenation of UBX frames:
//!
//! ```text
//! | 0xB5 | 0x62 | class | id | len (LE u16) | payload (len bytes) | ck_a | ck_b |
//! ```
//!
//! Only the MGA class is expected from this data source.

mod packet;
mod symbol;

pub use packet::{DecodingError, ErrorKind, Header, Packet, checksum, decode_batch};
pub use symbol::mga_symbol;

/// First sync byte
pub const SYNC1: u8 = 0xB5;

/// Second sync byte
pub const SYNC2: u8 = 0x62;

/// MGA message class
pub const MGA_CLASS: u8 = 0x13;

/// Sync bytes, class, id and length
pub const HEADER_SIZE: usize = 6;

/// Checksum trailer size
pub const TRAILER_SIZE: usize = 2;

/// Frames `payload` as a complete UBX record with a valid trailer.
#[cfg(test)]
pub(crate) fn frame(class: u8, id: u8, payload: &[u8]) -> Vec<u8> {
    let len = payload.len() as u16;

    let mut bytes = vec![SYNC1, SYNC2, class, id];
    bytes.extend_from_slice(&len.to_le_bytes());
    bytes.extend_from_slice(payload);

    let ck = checksum(&bytes[2..]);
    bytes.push((ck & 0xff) as u8);
    bytes.push((ck >> 8) as u8);
    bytes
}
