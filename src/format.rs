use std::{fmt::Display, str::FromStr};

use itertools::Itertools;
use serde::Serialize;

use crate::{backend::snapshot::Snapshot, error::Error, utils::hex};

/// Bytes per line, in default format
const DEFAULT_LINE_WIDTH: usize = 16;

/// Snapshot output format
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum Format {
    /// Symbol line, then hex payload
    #[default]
    Default,
    Json,
    /// Same as [Format::Json]: payloads are always hex encoded
    JsonHex,
    /// One BinTex line per packet
    Bintex,
    /// Raw downloaded buffer
    Hex,
}

/// Known formats, as they are named on the command line
pub const FORMATS: [&str; 5] = ["default", "json", "jsonhex", "bintex", "hex"];

impl FromStr for Format {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "default" => Ok(Self::Default),
            "json" => Ok(Self::Json),
            "jsonhex" => Ok(Self::JsonHex),
            "bintex" => Ok(Self::Bintex),
            "hex" => Ok(Self::Hex),
            _ => Err(Error::UnknownFormat(s.to_string())),
        }
    }
}

impl Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Default => write!(f, "default"),
            Self::Json => write!(f, "json"),
            Self::JsonHex => write!(f, "jsonhex"),
            Self::Bintex => write!(f, "bintex"),
            Self::Hex => write!(f, "hex"),
        }
    }
}

#[derive(Serialize)]
struct JsonPacket<'a> {
    #[serde(rename = "type")]
    symbol: &'a str,
    size: usize,
    dat: String,
}

#[derive(Serialize)]
struct JsonBatch<'a> {
    timestamp: u64,
    pkt: Vec<JsonPacket<'a>>,
}

#[derive(Serialize)]
struct JsonDocument<'a> {
    ubx_anow: JsonBatch<'a>,
}

impl Format {
    /// Renders the whole [Snapshot]. Every line is terminated.
    pub fn render(&self, snapshot: &Snapshot) -> Result<String, Error> {
        match self {
            Self::Default => Ok(snapshot
                .packets()
                .iter()
                .map(|pkt| {
                    let lines = pkt
                        .payload
                        .chunks(DEFAULT_LINE_WIDTH)
                        .map(|chunk| format!("{}\n", hex(chunk)))
                        .join("");
                    format!("ubx {}\n{}", pkt.symbol(), lines)
                })
                .join("")),
            Self::Json | Self::JsonHex => {
                let timestamp = snapshot
                    .captured_at()
                    .map(|t| t.to_unix_seconds().floor() as u64)
                    .unwrap_or_default();

                let document = JsonDocument {
                    ubx_anow: JsonBatch {
                        timestamp,
                        pkt: snapshot
                            .packets()
                            .iter()
                            .map(|pkt| JsonPacket {
                                symbol: pkt.symbol(),
                                size: pkt.payload.len(),
                                dat: hex(&pkt.payload),
                            })
                            .collect(),
                    },
                };

                Ok(format!("{}\n", serde_json::to_string(&document)?))
            },
            Self::Bintex => Ok(snapshot
                .packets()
                .iter()
                .map(|pkt| format!("\"ubx {}\" [{}]\n", pkt.symbol(), hex(&pkt.payload)))
                .join("")),
            Self::Hex => Ok(format!("{}\n", hex(snapshot.raw()))),
        }
    }
}
