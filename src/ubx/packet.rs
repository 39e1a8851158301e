use gnss::prelude::Constellation;
use thiserror::Error;

use crate::{
    ubx::{HEADER_SIZE, MGA_CLASS, SYNC1, SYNC2, TRAILER_SIZE, mga_symbol},
    utils::to_constellation,
};

/// Reason a record was rejected
#[derive(Debug, Copy, Clone, PartialEq, Eq, Error)]
pub enum ErrorKind {
    #[error("checksum failed")]
    ChecksumMismatch,

    #[error("header not B562")]
    BadSync,

    #[error("not an MGA packet")]
    WrongClass,

    #[error("framing error")]
    Truncated,
}

/// Batch decoding failure, `offset` is the byte offset of the
/// first byte of the rejected record.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Error)]
#[error("packet integrity error on byte offset {offset} ({kind:?}: {kind})")]
pub struct DecodingError {
    pub kind: ErrorKind,
    pub offset: usize,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Header {
    pub sync1: u8,
    pub sync2: u8,
    pub class: u8,
    pub id: u8,
    /// Payload length
    pub length: u16,
}

impl Header {
    fn parse(bytes: &[u8]) -> Self {
        Self {
            sync1: bytes[0],
            sync2: bytes[1],
            class: bytes[2],
            id: bytes[3],
            length: u16::from_le_bytes([bytes[4], bytes[5]]),
        }
    }
}

/// One validated UBX record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub header: Header,
    pub payload: Vec<u8>,
    pub checksum: u16,
}

/// Running 8-bit sums over `bytes` (`a += byte; b += a`),
/// returned as `(b << 8) | a`.
pub fn checksum(bytes: &[u8]) -> u16 {
    let (a, b) = bytes.iter().fold((0u8, 0u8), |(a, b), byte| {
        let a = a.wrapping_add(*byte);
        (a, b.wrapping_add(a))
    });
    ((b as u16) << 8) | a as u16
}

impl Packet {
    /// Total size on the wire
    pub fn size(&self) -> usize {
        HEADER_SIZE + self.payload.len() + TRAILER_SIZE
    }

    /// Diagnostic name, see [mga_symbol]
    pub fn symbol(&self) -> &'static str {
        mga_symbol(&self.header)
    }

    /// Constellation addressed by this MGA message, if any
    pub fn constellation(&self) -> Option<Constellation> {
        to_constellation(self.header.id)
    }

    /// Decodes the record found at the start of `bytes`.
    /// Bytes past the record are ignored.
    pub fn decode(bytes: &[u8]) -> Result<Self, ErrorKind> {
        if bytes.len() < HEADER_SIZE + TRAILER_SIZE {
            return Err(ErrorKind::Truncated);
        }

        let header = Header::parse(bytes);
        let end = HEADER_SIZE + header.length as usize;

        if bytes.len() < end + TRAILER_SIZE {
            return Err(ErrorKind::Truncated);
        }

        let trailer = u16::from_le_bytes([bytes[end], bytes[end + 1]]);

        // any nonzero difference is a failure
        if trailer.wrapping_sub(checksum(&bytes[2..end])) != 0 {
            return Err(ErrorKind::ChecksumMismatch);
        }

        if header.sync1 != SYNC1 || header.sync2 != SYNC2 {
            return Err(ErrorKind::BadSync);
        }

        if header.class != MGA_CLASS {
            return Err(ErrorKind::WrongClass);
        }

        Ok(Self {
            header,
            payload: bytes[HEADER_SIZE..end].to_vec(),
            checksum: trailer,
        })
    }
}

/// Decodes an entire download. The batch is all or nothing:
/// the first rejected record discards everything decoded so far.
pub fn decode_batch(bytes: &[u8]) -> Result<Vec<Packet>, DecodingError> {
    let mut packets = Vec::new();
    let mut offset = 0;

    while offset < bytes.len() {
        let packet =
            Packet::decode(&bytes[offset..]).map_err(|kind| DecodingError { kind, offset })?;

        offset += packet.size();
        packets.push(packet);
    }

    Ok(packets)
}
