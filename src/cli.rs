use clap::{Arg, ArgAction, ArgMatches, ColorChoice, Command, builder::PossibleValuesParser};
use log::LevelFilter;

use std::path::PathBuf;

use crate::{
    assistnow::{DEFAULT_URI, Settings},
    backend::schedule::DEFAULT_CRON,
    error::Error,
    format::{FORMATS, Format},
    interface::Interface,
};

/// Default download size limit
const DEFAULT_MAX_SIZE: usize = 65536;

/// (option, runtime variable) pairs
const SETTINGS: [(&str, &str); 9] = [
    ("uri", "ubx_uri"),
    ("datatype", "ubx_datatype"),
    ("gnss", "ubx_gnss"),
    ("lat", "lat"),
    ("lon", "lon"),
    ("alt", "alt"),
    ("pacc", "pacc"),
    ("tacc", "tacc"),
    ("latency", "latency"),
];

pub struct Cli {
    /// Arguments passed by user
    matches: ArgMatches,
}

impl Cli {
    /// Build new command line interface
    pub fn new() -> Self {
        Self {
            matches: Self::command().get_matches(),
        }
    }

    fn command() -> Command {
        Command::new("agnssmon")
            .version(env!("CARGO_PKG_VERSION"))
            .about("U-Blox AssistNow (AGNSS) monitor")
            .color(ColorChoice::Always)
            .next_help_heading("Scheduling")
            .arg(
                Arg::new("cron")
                    .short('C')
                    .long("cron")
                    .value_name("EXPRESSION")
                    .help(format!(
                        "Download schedule, as a cron expression with seconds field.
Default is \"{}\" (every hour, on the hour)",
                        DEFAULT_CRON
                    )),
            )
            .arg(
                Arg::new("max-size")
                    .long("max-size")
                    .value_name("BYTES")
                    .value_parser(clap::value_parser!(usize))
                    .help(format!(
                        "Maximal size of one AssistNow download. Default is {} bytes",
                        DEFAULT_MAX_SIZE
                    )),
            )
            .next_help_heading("U-Blox AssistNow")
            .arg(
                Arg::new("ubxkey")
                    .short('U')
                    .long("ubxkey")
                    .value_name("TOKEN")
                    .env("AGNSSMON_UBXKEY")
                    .hide_env_values(true)
                    .help("AssistNow API token. Required to download anything"),
            )
            .arg(
                Arg::new("uri")
                    .long("uri")
                    .value_name("URI")
                    .help(format!("AssistNow service. Default is {}", DEFAULT_URI)),
            )
            .arg(
                Arg::new("datatype")
                    .long("datatype")
                    .value_name("LIST")
                    .help("Requested data types. Default is \"eph,alm,aux\""),
            )
            .arg(
                Arg::new("gnss")
                    .long("gnss")
                    .value_name("LIST")
                    .help("Requested constellations, among gps,glo,gal,bds,qzss. Default is \"gps\""),
            )
            .arg(
                Arg::new("lat")
                    .long("lat")
                    .value_name("DDEG")
                    .allow_hyphen_values(true)
                    .help("Approximate latitude of the receiver"),
            )
            .arg(
                Arg::new("lon")
                    .long("lon")
                    .value_name("DDEG")
                    .allow_hyphen_values(true)
                    .help("Approximate longitude of the receiver"),
            )
            .arg(
                Arg::new("alt")
                    .long("alt")
                    .value_name("METERS")
                    .allow_hyphen_values(true)
                    .help("Approximate altitude of the receiver"),
            )
            .arg(
                Arg::new("pacc")
                    .long("pacc")
                    .value_name("KM")
                    .help("Accuracy of the approximate position"),
            )
            .arg(
                Arg::new("tacc")
                    .long("tacc")
                    .value_name("SECONDS")
                    .help("Accuracy of the receiver clock"),
            )
            .arg(
                Arg::new("latency")
                    .long("latency")
                    .value_name("SECONDS")
                    .help("Expected latency between download and use"),
            )
            .next_help_heading("Client interface")
            .arg(
                Arg::new("fmt")
                    .short('f')
                    .long("fmt")
                    .value_name("FORMAT")
                    .value_parser(PossibleValuesParser::new(FORMATS))
                    .help("Default output format. Default is \"default\""),
            )
            .arg(
                Arg::new("socket")
                    .short('S')
                    .long("socket")
                    .value_name("PATH")
                    .value_parser(clap::value_parser!(PathBuf))
                    .help("Serve clients on this Unix socket, instead of standard I/O"),
            )
            .arg(
                Arg::new("init")
                    .short('I')
                    .long("init")
                    .value_name("FILE")
                    .value_parser(clap::value_parser!(PathBuf))
                    .help("Commands to run at startup, one per line"),
            )
            .next_help_heading("Logs")
            .arg(
                Arg::new("quiet")
                    .short('q')
                    .long("quiet")
                    .action(ArgAction::SetTrue)
                    .conflicts_with("verbose")
                    .help("Only report errors"),
            )
            .arg(
                Arg::new("verbose")
                    .short('v')
                    .long("verbose")
                    .action(ArgAction::SetTrue)
                    .help("Debug traces"),
            )
    }

    /// Default logger filter, may be overridden with RUST_LOG
    pub fn log_level(&self) -> LevelFilter {
        if self.matches.get_flag("quiet") {
            LevelFilter::Error
        } else if self.matches.get_flag("verbose") {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        }
    }

    pub fn cron(&self) -> &str {
        self.matches
            .get_one::<String>("cron")
            .map(|s| s.as_str())
            .unwrap_or(DEFAULT_CRON)
    }

    pub fn max_size(&self) -> usize {
        self.matches
            .get_one::<usize>("max-size")
            .copied()
            .unwrap_or(DEFAULT_MAX_SIZE)
    }

    pub fn format(&self) -> Result<Format, Error> {
        match self.matches.get_one::<String>("fmt") {
            Some(fmt) => fmt.parse::<Format>(),
            None => Ok(Format::default()),
        }
    }

    pub fn interface(&self) -> Interface {
        match self.matches.get_one::<PathBuf>("socket") {
            Some(path) => Interface::Socket(path.clone()),
            None => Interface::Pipe,
        }
    }

    pub fn init_file(&self) -> Option<&PathBuf> {
        self.matches.get_one::<PathBuf>("init")
    }

    /// AssistNow settings, command line options applied over the defaults
    pub fn settings(&self) -> Result<Settings, Error> {
        let mut settings = Settings::default();

        if let Some(key) = self.matches.get_one::<String>("ubxkey") {
            settings.set("ubx_key", key)?;
        }

        for (option, name) in SETTINGS {
            if let Some(value) = self.matches.get_one::<String>(option) {
                settings.set(name, value)?;
            }
        }

        Ok(settings)
    }
}
