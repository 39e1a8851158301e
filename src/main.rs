#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]

/*
 * AGNSSMON: U-Blox AssistNow monitor.
 * Authors: agnssmon contributors
 * This program is shipped under Mozilla Public V2 license.
 */

extern crate gnss_rs as gnss;

use env_logger::{Builder, Target};

use log::{error, info, warn};

use tokio::signal;

use std::{path::Path, process::ExitCode, sync::Arc};

mod assistnow;
mod backend;
mod cli;
mod command;
mod error;
mod format;
mod interface;
mod ubx;
mod utils;

use crate::{
    assistnow::HttpDownloader,
    backend::{
        Backend,
        schedule::{DEFAULT_CRON, Schedule},
        scheduler::Scheduler,
    },
    cli::Cli,
    command::Dispatcher,
    error::Error,
    interface::Interface,
    utils::{log_time, now},
};

/// Logs share standard output with socket clients only
fn log_target(interface: &Interface) -> Target {
    match interface {
        Interface::Pipe => Target::Stderr,
        Interface::Socket(_) => Target::Stdout,
    }
}

/// Runs the init file, if any. A missing API key is not fatal:
/// it may be defined later on, every cycle reports it until then.
async fn init(
    dispatcher: &Dispatcher,
    backend: &Backend,
    path: Option<&Path>,
) -> Result<(), Error> {
    if let Some(path) = path {
        info!("running {}", path.display());
        dispatcher.run_file(path).await?;
    }

    if backend.lock().await.settings.key.is_none() {
        warn!("{} - use \"set ubx_key\" to define it", Error::MissingApiKey);
    }

    Ok(())
}

async fn run(cli: Cli) -> Result<(), Error> {
    let t_utc = now()?;

    let settings = cli.settings()?;

    let format = cli.format()?;

    // an invalid schedule is not fatal: the worker waits for a new one
    let mut schedule = Schedule::new(DEFAULT_CRON, t_utc);
    if let Err(e) = schedule.replace(cli.cron()) {
        warn!("{}", e);
    }

    info!(
        "{} - agnssmon v{} - schedule: \"{}\"",
        log_time(t_utc),
        env!("CARGO_PKG_VERSION"),
        schedule.expression()
    );

    let backend = Backend::new(schedule, settings, cli.max_size());

    let downloader = HttpDownloader::new()?;
    let worker = tokio::spawn(Scheduler::new(Arc::clone(&backend), downloader).run());

    let dispatcher = Dispatcher::new(Arc::clone(&backend), format);

    init(&dispatcher, &backend, cli.init_file().map(|p| p.as_path())).await?;

    let interface = cli.interface();

    tokio::select! {
        ret = interface.serve(dispatcher) => {
            ret?;
            info!("end of input");
        },
        ret = worker => {
            ret?;
        },
        ret = signal::ctrl_c() => {
            ret?;
            info!("shutting down");
        },
    }

    if let Interface::Socket(path) = &interface {
        let _ = std::fs::remove_file(path);
    }

    Ok(())
}

#[tokio::main]
pub async fn main() -> ExitCode {
    // cli
    let cli = Cli::new();

    let mut builder = Builder::new();

    builder
        .filter_level(cli.log_level())
        .parse_default_env()
        .target(log_target(&cli.interface()))
        .format_timestamp_secs()
        .format_module_path(false)
        .init();

    match run(cli).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        },
    }
}

#[cfg(test)]
mod test {
    use super::{init, log_target};
    use crate::{
        assistnow::Settings,
        backend::{
            Backend,
            schedule::{DEFAULT_CRON, Schedule},
        },
        command::Dispatcher,
        format::Format,
        interface::Interface,
        utils::now,
    };
    use env_logger::Target;
    use std::{path::PathBuf, sync::Arc};

    fn backend() -> Arc<Backend> {
        let t = now().unwrap();
        Backend::new(Schedule::new(DEFAULT_CRON, t), Settings::default(), 65536)
    }

    #[test]
    fn test_log_target() {
        assert!(matches!(log_target(&Interface::Pipe), Target::Stderr));
        assert!(matches!(
            log_target(&Interface::Socket(PathBuf::from("/tmp/agnssmon.sock"))),
            Target::Stdout
        ));
    }

    #[tokio::test]
    async fn test_key_from_init_file() {
        let backend = backend();
        let dispatcher = Dispatcher::new(Arc::clone(&backend), Format::Default);

        let path = std::env::temp_dir().join(format!("agnssmon-key-{}.cmd", std::process::id()));
        std::fs::write(&path, "set ubx_key TOKEN\n").unwrap();

        init(&dispatcher, &backend, Some(path.as_path())).await.unwrap();
        std::fs::remove_file(&path).unwrap();

        let data = backend.lock().await;
        assert_eq!(data.settings.key.as_deref(), Some("TOKEN"));
        assert!(data.settings.url().is_ok());
    }

    #[tokio::test]
    async fn test_missing_key_not_fatal() {
        let backend = backend();
        let dispatcher = Dispatcher::new(Arc::clone(&backend), Format::Default);

        init(&dispatcher, &backend, None).await.unwrap();
        assert!(backend.lock().await.settings.key.is_none());
    }
}
