use crate::ubx::{Header, MGA_CLASS};

/// (class, id, payload length) => name
const SYMBOLS: [((u8, u8, u16), &str); 23] = [
    ((MGA_CLASS, 0x40, 24), "mga-ini-time"),
    ((MGA_CLASS, 0x40, 20), "mga-ini-pos"),
    ((MGA_CLASS, 0x40, 72), "mga-ini-eop"),
    ((MGA_CLASS, 0x00, 68), "mga-gps-eph"),
    ((MGA_CLASS, 0x00, 36), "mga-gps-alm"),
    ((MGA_CLASS, 0x00, 40), "mga-gps-health"),
    ((MGA_CLASS, 0x00, 20), "mga-gps-utc"),
    ((MGA_CLASS, 0x00, 16), "mga-gps-iono"),
    ((MGA_CLASS, 0x02, 76), "mga-gal-eph"),
    ((MGA_CLASS, 0x02, 32), "mga-gal-alm"),
    ((MGA_CLASS, 0x02, 12), "mga-gal-timeoffset"),
    ((MGA_CLASS, 0x02, 20), "mga-gal-utc"),
    ((MGA_CLASS, 0x03, 88), "mga-bds-eph"),
    ((MGA_CLASS, 0x03, 40), "mga-bds-alm"),
    ((MGA_CLASS, 0x03, 68), "mga-bds-health"),
    ((MGA_CLASS, 0x03, 16), "mga-bds-iono"),
    ((MGA_CLASS, 0x03, 20), "mga-bds-utc"),
    ((MGA_CLASS, 0x05, 68), "mga-qzss-eph"),
    ((MGA_CLASS, 0x05, 36), "mga-qzss-alm"),
    ((MGA_CLASS, 0x05, 12), "mga-qzss-health"),
    ((MGA_CLASS, 0x06, 48), "mga-glo-eph"),
    ((MGA_CLASS, 0x06, 36), "mga-glo-alm"),
    ((MGA_CLASS, 0x06, 20), "mga-glo-timeoffset"),
];

/// Human readable name of an MGA message, "mga-unknown" when
/// the exact (class, id, length) triplet is not referenced.
pub fn mga_symbol(header: &Header) -> &'static str {
    let needle = (header.class, header.id, header.length);

    SYMBOLS
        .iter()
        .find(|(key, _)| *key == needle)
        .map(|(_, symbol)| *symbol)
        .unwrap_or("mga-unknown")
}
