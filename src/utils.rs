use gnss::prelude::Constellation;
use hifitime::prelude::{Duration, Epoch, TimeScale};
use itertools::Itertools;

use crate::error::Error;

/// Current [Epoch] in [TimeScale::UTC]
pub fn now() -> Result<Epoch, Error> {
    Ok(Epoch::now()?.to_time_scale(TimeScale::UTC))
}

/// Rounds an [Epoch] for log messages
pub fn log_time(t: Epoch) -> Epoch {
    t.round(Duration::from_seconds(1.0))
}

/// Converts U-Blox GNSS id (also used as MGA message id)
pub fn to_constellation(id: u8) -> Option<Constellation> {
    match id {
        0 => Some(Constellation::GPS),
        1 => Some(Constellation::SBAS),
        2 => Some(Constellation::Galileo),
        3 => Some(Constellation::BeiDou),
        5 => Some(Constellation::QZSS),
        6 => Some(Constellation::Glonass),
        _ => None,
    }
}

/// Parses one AssistNow `gnss=` token
pub fn from_gnss_token(token: &str) -> Option<Constellation> {
    match token.trim().to_lowercase().as_str() {
        "gps" => Some(Constellation::GPS),
        "glo" => Some(Constellation::Glonass),
        "gal" => Some(Constellation::Galileo),
        "bds" => Some(Constellation::BeiDou),
        "qzss" => Some(Constellation::QZSS),
        _ => None,
    }
}

/// AssistNow `gnss=` token
pub fn to_gnss_token(constellation: Constellation) -> Option<&'static str> {
    match constellation {
        Constellation::GPS => Some("gps"),
        Constellation::Glonass => Some("glo"),
        Constellation::Galileo => Some("gal"),
        Constellation::BeiDou => Some("bds"),
        Constellation::QZSS => Some("qzss"),
        _ => None,
    }
}

/// Uppercase hex string, no separator
pub fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|byte| format!("{:02X}", byte)).join("")
}
