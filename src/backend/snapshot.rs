use hifitime::prelude::{Duration, Epoch};

use crate::ubx::Packet;

/// Latest validated AssistNow batch. Replaced wholesale, never modified.
#[derive(Debug, Default, Clone)]
pub struct Snapshot {
    packets: Vec<Packet>,
    raw: Vec<u8>,
    captured_at: Option<Epoch>,
}

impl Snapshot {
    pub fn new(packets: Vec<Packet>, raw: Vec<u8>, captured_at: Epoch) -> Self {
        Self {
            packets,
            raw,
            captured_at: Some(captured_at),
        }
    }

    pub fn packets(&self) -> &[Packet] {
        &self.packets
    }

    /// Downloaded bytes, as received
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// Capture [Epoch], None until first successful download
    pub fn captured_at(&self) -> Option<Epoch> {
        self.captured_at
    }

    pub fn len(&self) -> usize {
        self.packets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    /// Age at `now`. An empty snapshot or a capture
    /// time in the future have null age.
    pub fn age(&self, now: Epoch) -> Duration {
        match self.captured_at {
            Some(t) if t < now => now - t,
            _ => Duration::ZERO,
        }
    }
}
