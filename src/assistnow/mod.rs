//! U-Blox AssistNow online service
use gnss::prelude::Constellation;
use itertools::Itertools;

use crate::{
    error::Error,
    utils::{from_gnss_token, to_gnss_token},
};

mod download;

pub use download::{Downloader, HttpDownloader};

pub const DEFAULT_URI: &str = "https://online-live1.services.u-blox.com/GetOnlineData.ashx";

/// Runtime variables, in display order
pub const VARIABLES: [&str; 11] = [
    "ubx_key",
    "ubx_uri",
    "ubx_datatype",
    "ubx_format",
    "ubx_gnss",
    "lat",
    "lon",
    "alt",
    "pacc",
    "tacc",
    "latency",
];

/// AssistNow request options. These are the daemon variables
/// and may be modified at runtime.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// API token
    pub key: Option<String>,

    /// Service endpoint
    pub uri: String,

    /// Requested data types, like "eph,alm,aux"
    pub datatype: String,

    /// Data format, "mga" is the only one we can decode
    pub format: String,

    /// Requested constellations
    pub constellations: Vec<Constellation>,

    /// Approximate position (ddeg)
    pub latitude: f64,
    pub longitude: f64,

    /// Approximate altitude (m)
    pub altitude: i32,

    /// Position accuracy (km)
    pub pacc: u32,

    /// Time accuracy (s)
    pub tacc: u32,

    /// Expected latency (s)
    pub latency: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            key: None,
            uri: DEFAULT_URI.to_string(),
            datatype: "eph,alm,aux".to_string(),
            format: "mga".to_string(),
            constellations: vec![Constellation::GPS],
            latitude: 37.7769487,
            longitude: -122.3978603,
            altitude: 17,
            pacc: 20,
            tacc: 10,
            latency: 600,
        }
    }
}

/// Parses a comma separated constellation list
pub fn parse_constellations(list: &str) -> Result<Vec<Constellation>, Error> {
    let constellations = list
        .split(',')
        .filter(|token| !token.trim().is_empty())
        .map(|token| {
            from_gnss_token(token).ok_or_else(|| Error::InvalidValue {
                name: "ubx_gnss".to_string(),
                reason: format!("unknown constellation \"{}\"", token.trim()),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    if constellations.is_empty() {
        return Err(Error::InvalidValue {
            name: "ubx_gnss".to_string(),
            reason: "at least one constellation is required".to_string(),
        });
    }

    Ok(constellations.into_iter().unique().collect())
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, Error>
where
    T::Err: std::fmt::Display,
{
    value.trim().parse::<T>().map_err(|e| Error::InvalidValue {
        name: name.to_string(),
        reason: e.to_string(),
    })
}

impl Settings {
    fn gnss(&self) -> String {
        self.constellations
            .iter()
            .filter_map(|c| to_gnss_token(*c))
            .join(",")
    }

    /// Builds the request URL. Fails when no API key is defined.
    pub fn url(&self) -> Result<String, Error> {
        let key = match &self.key {
            Some(key) if !key.is_empty() => key,
            _ => return Err(Error::MissingApiKey),
        };

        Ok(format!(
            "{}?token={};datatype={};format={};gnss={};lat={};lon={};alt={};pacc={};tacc={};latency={};filteronpos;",
            self.uri,
            key,
            self.datatype,
            self.format,
            self.gnss(),
            self.latitude,
            self.longitude,
            self.altitude,
            self.pacc,
            self.tacc,
            self.latency,
        ))
    }

    /// Returns variable value by name
    pub fn get(&self, name: &str) -> Result<String, Error> {
        match name {
            "ubx_key" => Ok(self.key.clone().unwrap_or_default()),
            "ubx_uri" => Ok(self.uri.clone()),
            "ubx_datatype" => Ok(self.datatype.clone()),
            "ubx_format" => Ok(self.format.clone()),
            "ubx_gnss" => Ok(self.gnss()),
            "lat" => Ok(self.latitude.to_string()),
            "lon" => Ok(self.longitude.to_string()),
            "alt" => Ok(self.altitude.to_string()),
            "pacc" => Ok(self.pacc.to_string()),
            "tacc" => Ok(self.tacc.to_string()),
            "latency" => Ok(self.latency.to_string()),
            _ => Err(Error::UnknownVariable(name.to_string())),
        }
    }

    /// Modifies a variable. Self is left untouched on error.
    pub fn set(&mut self, name: &str, value: &str) -> Result<(), Error> {
        match name {
            "ubx_key" => {
                let value = value.trim();
                self.key = if value.is_empty() {
                    None
                } else {
                    Some(value.to_string())
                };
            },
            "ubx_uri" => self.uri = value.trim().to_string(),
            "ubx_datatype" => self.datatype = value.trim().to_string(),
            "ubx_format" => self.format = value.trim().to_string(),
            "ubx_gnss" => self.constellations = parse_constellations(value)?,
            "lat" => {
                let lat = parse_number::<f64>(name, value)?;
                if !(-90.0..=90.0).contains(&lat) {
                    return Err(Error::InvalidValue {
                        name: name.to_string(),
                        reason: "latitude out of range".to_string(),
                    });
                }
                self.latitude = lat;
            },
            "lon" => {
                let lon = parse_number::<f64>(name, value)?;
                if !(-180.0..=180.0).contains(&lon) {
                    return Err(Error::InvalidValue {
                        name: name.to_string(),
                        reason: "longitude out of range".to_string(),
                    });
                }
                self.longitude = lon;
            },
            "alt" => self.altitude = parse_number(name, value)?,
            "pacc" => self.pacc = parse_number(name, value)?,
            "tacc" => self.tacc = parse_number(name, value)?,
            "latency" => self.latency = parse_number(name, value)?,
            _ => return Err(Error::UnknownVariable(name.to_string())),
        }
        Ok(())
    }
}
