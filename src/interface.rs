//! Client interfaces: standard I/O or Unix socket
use std::path::PathBuf;

use log::{debug, info, warn};
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader},
    net::{UnixListener, UnixStream},
};

use crate::{command::Dispatcher, error::Error};

/// Client interface
#[derive(Debug, Clone, PartialEq)]
pub enum Interface {
    /// Standard input and output
    Pipe,
    /// Unix socket, one session per connection
    Socket(PathBuf),
}

/// Terminates a session
fn is_quit(line: &str) -> bool {
    matches!(line, "quit" | "exit")
}

/// Formats a response. Each response is terminated by an empty line.
fn response(ret: Result<String, Error>) -> String {
    let mut text = match ret {
        Ok(text) => text,
        // rendered by the parser
        Err(Error::Command(e)) => e.to_string(),
        Err(e) => format!("error: {}\n", e),
    };

    if !text.is_empty() && !text.ends_with('\n') {
        text.push('\n');
    }

    text.push('\n');
    text
}

/// Serves one client until it quits or closes its input
pub async fn session<R, W>(dispatcher: &Dispatcher, reader: R, mut writer: W) -> Result<(), Error>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();

        if is_quit(line) {
            break;
        }

        if line.is_empty() {
            continue;
        }

        debug!("request: \"{}\"", line);

        let text = response(dispatcher.execute(line).await);
        writer.write_all(text.as_bytes()).await?;
        writer.flush().await?;
    }

    Ok(())
}

fn spawn_session(stream: UnixStream, dispatcher: &Dispatcher) {
    let dispatcher = dispatcher.clone();

    tokio::spawn(async move {
        let (reader, writer) = stream.into_split();

        match session(&dispatcher, BufReader::new(reader), writer).await {
            Ok(_) => debug!("client disconnected"),
            Err(e) => warn!("client session closed with error: {}", e),
        }
    });
}

impl Interface {
    /// Serves clients. Pipe mode returns once the input is closed,
    /// socket mode runs until a failure.
    pub async fn serve(&self, dispatcher: Dispatcher) -> Result<(), Error> {
        match self {
            Self::Pipe => {
                session(
                    &dispatcher,
                    BufReader::new(tokio::io::stdin()),
                    tokio::io::stdout(),
                )
                .await
            },
            Self::Socket(path) => {
                if path.exists() {
                    debug!("removing stale socket {}", path.display());
                    std::fs::remove_file(path)?;
                }

                let listener = UnixListener::bind(path)?;
                info!("listening on {}", path.display());

                loop {
                    match listener.accept().await {
                        Ok((stream, _)) => spawn_session(stream, &dispatcher),
                        Err(e) => warn!("failed to accept connection: {}", e),
                    }
                }
            },
        }
    }
}
