//! Client commands
use std::{path::Path, sync::Arc};

use clap::{Arg, ArgAction, ArgMatches, ColorChoice, Command, builder::PossibleValuesParser};
use hifitime::prelude::Duration;
use log::{debug, error, info};

use crate::{
    assistnow::VARIABLES,
    backend::Backend,
    error::Error,
    format::{FORMATS, Format},
};

/// Splits a command line on white spaces. Double quotes group words.
fn tokenize(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut token = String::new();
    let mut quoted = false;
    let mut pending = false;

    for c in line.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                pending = true;
            },
            c if c.is_whitespace() && !quoted => {
                if pending {
                    tokens.push(std::mem::take(&mut token));
                    pending = false;
                }
            },
            c => {
                token.push(c);
                pending = true;
            },
        }
    }

    if pending {
        tokens.push(token);
    }

    tokens
}

fn commands() -> Command {
    Command::new("agnssmon")
        .multicall(true)
        .color(ColorChoice::Never)
        .subcommand_required(true)
        .subcommand(
            Command::new("getanow")
                .about("Returns the latest AssistNow data")
                .arg(
                    Arg::new("age")
                        .short('a')
                        .long("age")
                        .value_name("SECONDS")
                        .value_parser(clap::value_parser!(u64))
                        .help("Maximal age of the returned data. Forces a download when older.
Not limited by default"),
                )
                .arg(
                    Arg::new("format")
                        .short('f')
                        .long("format")
                        .value_name("FORMAT")
                        .value_parser(PossibleValuesParser::new(FORMATS))
                        .help("Output format, overrides the daemon setting"),
                ),
        )
        .subcommand(
            Command::new("schedule")
                .about("Shows or replaces the download schedule")
                .arg(
                    Arg::new("now")
                        .short('n')
                        .long("now")
                        .action(ArgAction::SetTrue)
                        .help("Download now, in addition to scheduled runs"),
                )
                .arg(
                    Arg::new("cron")
                        .value_name("CRON")
                        .num_args(1..)
                        .help("Cron expression, including the seconds field"),
                ),
        )
        .subcommand(
            Command::new("set")
                .about("Modifies a daemon variable")
                .arg(Arg::new("name").value_name("NAME").required(true))
                .arg(
                    Arg::new("value")
                        .value_name("VALUE")
                        .required(true)
                        .num_args(1..)
                        .trailing_var_arg(true)
                        .allow_hyphen_values(true),
                ),
        )
        .subcommand(
            Command::new("get")
                .about("Prints a daemon variable")
                .arg(Arg::new("name").value_name("NAME").required(true)),
        )
        .subcommand(Command::new("vars").about("Lists all daemon variables"))
}

fn joined(matches: &ArgMatches, id: &str) -> Option<String> {
    matches
        .get_many::<String>(id)
        .map(|values| values.map(|s| s.as_str()).collect::<Vec<_>>().join(" "))
}

/// Executes client commands against the [Backend]
#[derive(Clone)]
pub struct Dispatcher {
    backend: Arc<Backend>,
    /// Default output format
    format: Format,
}

impl Dispatcher {
    pub fn new(backend: Arc<Backend>, format: Format) -> Self {
        Self { backend, format }
    }

    /// Executes one command line and returns its response
    pub async fn execute(&self, line: &str) -> Result<String, Error> {
        let tokens = tokenize(line);
        if tokens.is_empty() {
            return Ok(String::new());
        }

        let matches = match commands().try_get_matches_from(tokens) {
            Ok(matches) => matches,
            Err(e) => match e.kind() {
                clap::error::ErrorKind::DisplayHelp
                | clap::error::ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                    return Ok(e.to_string());
                },
                _ => return Err(Error::Command(e)),
            },
        };

        match matches.subcommand() {
            Some(("getanow", args)) => self.getanow(args).await,
            Some(("schedule", args)) => self.schedule(args).await,
            Some(("set", args)) => {
                let name = args.get_one::<String>("name").cloned().unwrap_or_default();
                let value = joined(args, "value").unwrap_or_default();

                self.backend.lock().await.settings.set(&name, &value)?;
                debug!("{} = {}", name, value);
                Ok(String::new())
            },
            Some(("get", args)) => {
                let name = args.get_one::<String>("name").cloned().unwrap_or_default();
                let value = self.backend.lock().await.settings.get(&name)?;
                Ok(format!("{}\n", value))
            },
            Some(("vars", _)) => {
                let data = self.backend.lock().await;
                let mut text = String::new();

                for name in VARIABLES {
                    text.push_str(&format!("{} = {}\n", name, data.settings.get(name)?));
                }

                Ok(text)
            },
            _ => Ok(String::new()),
        }
    }

    async fn getanow(&self, args: &ArgMatches) -> Result<String, Error> {
        let format = match args.get_one::<String>("format") {
            Some(format) => format.parse::<Format>()?,
            None => self.format,
        };

        if let Some(age) = args.get_one::<u64>("age") {
            self.backend
                .ensure_fresh(Duration::from_seconds(*age as f64))
                .await?;
        }

        let data = self.backend.lock().await;
        format.render(&data.snapshot)
    }

    async fn schedule(&self, args: &ArgMatches) -> Result<String, Error> {
        let replaced = match joined(args, "cron") {
            Some(expression) => Some(self.backend.replace_schedule(&expression).await),
            None => None,
        };

        if args.get_flag("now") {
            self.backend.run_now();
        }

        match replaced {
            Some(ret) => {
                ret?;
                let data = self.backend.lock().await;
                info!("new cron schedule: \"{}\"", data.schedule.expression());
                Ok(String::new())
            },
            None => {
                let data = self.backend.lock().await;
                Ok(format!("{}\n", data.schedule.expression()))
            },
        }
    }

    /// Executes a command file, line by line. Empty lines
    /// and lines starting with '#' are ignored.
    pub async fn run_file(&self, path: &Path) -> Result<(), Error> {
        let content = tokio::fs::read_to_string(path).await?;

        for line in content.lines().map(|line| line.trim()) {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            match self.execute(line).await {
                Ok(_) => debug!("{}: \"{}\"", path.display(), line),
                Err(e) => error!("{}: \"{}\" - {}", path.display(), line, e),
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::{Dispatcher, tokenize};
    use crate::{
        assistnow::{Settings, VARIABLES},
        backend::{
            Backend,
            schedule::{DEFAULT_CRON, Schedule},
            snapshot::Snapshot,
            wake::Wake,
        },
        error::Error,
        format::Format,
        ubx::{MGA_CLASS, decode_batch, frame},
        utils::now,
    };
    use hifitime::prelude::Duration;
    use std::{sync::Arc, time::Duration as StdDuration};
    use tokio::time::timeout;

    fn dispatcher() -> (Arc<Backend>, Dispatcher) {
        let t = now().unwrap();
        let backend = Backend::new(Schedule::new(DEFAULT_CRON, t), Settings::default(), 65536);
        let dispatcher = Dispatcher::new(Arc::clone(&backend), Format::Default);
        (backend, dispatcher)
    }

    #[test]
    fn test_tokenize() {
        assert_eq!(tokenize("  get   lat "), vec!["get", "lat"]);
        assert_eq!(
            tokenize("schedule \"0 0 * * * *\" -n"),
            vec!["schedule", "0 0 * * * *", "-n"]
        );
        assert_eq!(tokenize("set ubx_key \"\""), vec!["set", "ubx_key", ""]);
        assert!(tokenize("").is_empty());
    }

    #[tokio::test]
    async fn test_variables() {
        let (backend, dispatcher) = dispatcher();

        assert_eq!(dispatcher.execute("get lat").await.unwrap(), "37.7769487\n");

        dispatcher.execute("set lat -12.5").await.unwrap();
        assert_eq!(backend.lock().await.settings.latitude, -12.5);

        dispatcher.execute("set ubx_gnss gps,gal").await.unwrap();
        assert_eq!(dispatcher.execute("get ubx_gnss").await.unwrap(), "gps,gal\n");

        assert!(matches!(
            dispatcher.execute("set lat 120").await,
            Err(Error::InvalidValue { .. })
        ));
        assert_eq!(backend.lock().await.settings.latitude, -12.5);

        assert!(matches!(
            dispatcher.execute("get altitude").await,
            Err(Error::UnknownVariable(_))
        ));

        let vars = dispatcher.execute("vars").await.unwrap();
        assert_eq!(vars.lines().count(), VARIABLES.len());
        assert!(vars.contains("lat = -12.5\n"));
    }

    #[tokio::test]
    async fn test_schedule() {
        let (backend, dispatcher) = dispatcher();

        assert_eq!(
            dispatcher.execute("schedule").await.unwrap(),
            format!("{}\n", DEFAULT_CRON)
        );
        assert_eq!(backend.wake.pending(), None);

        dispatcher.execute("schedule 0 30 * * * *").await.unwrap();
        assert_eq!(dispatcher.execute("schedule").await.unwrap(), "0 30 * * * *\n");
        assert_eq!(backend.wake.pending(), Some(Wake::Resync));

        dispatcher.execute("schedule --now").await.unwrap();
        assert_eq!(backend.wake.pending(), Some(Wake::RunNow));
    }

    #[tokio::test]
    async fn test_schedule_then_flag() {
        for line in [
            "schedule \"0 30 * * * *\" -n",
            "schedule 0 30 * * * * --now",
        ] {
            let (backend, dispatcher) = dispatcher();

            dispatcher.execute(line).await.unwrap();

            let data = backend.lock().await;
            assert!(data.schedule.is_valid(), "{}", line);
            assert_eq!(data.schedule.expression(), "0 30 * * * *");
            assert_eq!(backend.wake.pending(), Some(Wake::RunNow));
        }
    }

    #[tokio::test]
    async fn test_invalid_schedule() {
        let (backend, dispatcher) = dispatcher();

        match dispatcher.execute("schedule every hour").await {
            Err(Error::Schedule { expression, .. }) => assert_eq!(expression, "every hour"),
            other => panic!("unexpected result: {:?}", other),
        }

        let data = backend.lock().await;
        assert!(!data.schedule.is_valid());
        assert_eq!(backend.wake.pending(), Some(Wake::Resync));
    }

    #[tokio::test]
    async fn test_getanow() {
        let (backend, dispatcher) = dispatcher();

        assert_eq!(dispatcher.execute("getanow").await.unwrap(), "");
        assert_eq!(
            dispatcher.execute("getanow -f json").await.unwrap(),
            "{\"ubx_anow\":{\"timestamp\":0,\"pkt\":[]}}\n"
        );

        assert!(matches!(
            dispatcher.execute("getanow --format xml").await,
            Err(Error::Command(_))
        ));

        let raw = frame(MGA_CLASS, 0x00, &[0x11; 20]);
        let packets = decode_batch(&raw).unwrap();
        backend.lock().await.snapshot = Snapshot::new(packets, raw, now().unwrap());

        assert_eq!(
            dispatcher.execute("getanow --age 60").await.unwrap(),
            "ubx mga-gps-utc\n11111111111111111111111111111111\n11111111\n"
        );
    }

    #[tokio::test]
    async fn test_getanow_stale() {
        let (backend, dispatcher) = dispatcher();
        let t = now().unwrap() - Duration::from_hours(2.0);
        backend.lock().await.snapshot = Snapshot::new(vec![], vec![], t);

        // stands for the worker
        let worker = Arc::clone(&backend);
        tokio::spawn(async move {
            while worker.completion.state().waiters == 0 {
                tokio::time::sleep(StdDuration::from_millis(1)).await;
            }

            let raw = frame(MGA_CLASS, 0x02, &[0x22; 12]);
            let packets = decode_batch(&raw).unwrap();
            worker.lock().await.snapshot = Snapshot::new(packets, raw, now().unwrap());
            worker.completion.complete();
        });

        let text = timeout(
            StdDuration::from_secs(5),
            dispatcher.execute("getanow -a 3600 -f bintex"),
        )
        .await
        .unwrap()
        .unwrap();

        assert_eq!(text, "\"ubx mga-gal-timeoffset\" [222222222222222222222222]\n");
    }

    #[tokio::test]
    async fn test_help_and_errors() {
        let (_, dispatcher) = dispatcher();

        let help = dispatcher.execute("help").await.unwrap();
        assert!(help.contains("getanow"));
        assert!(help.contains("schedule"));

        let help = dispatcher.execute("getanow --help").await.unwrap();
        assert!(help.contains("--age"));

        assert!(matches!(
            dispatcher.execute("reboot").await,
            Err(Error::Command(_))
        ));
        assert_eq!(dispatcher.execute("   ").await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_init_file() {
        let (backend, dispatcher) = dispatcher();

        let path = std::env::temp_dir().join(format!("agnssmon-init-{}.txt", std::process::id()));
        std::fs::write(
            &path,
            "# startup\n\nset lat 45.5\nbogus command\nset ubx_datatype eph\n",
        )
        .unwrap();

        dispatcher.run_file(&path).await.unwrap();
        std::fs::remove_file(&path).unwrap();

        let data = backend.lock().await;
        assert_eq!(data.settings.latitude, 45.5);
        assert_eq!(data.settings.datatype, "eph");

        drop(data);
        assert!(matches!(
            dispatcher.run_file(&path).await,
            Err(Error::Io(_))
        ));
    }
}
