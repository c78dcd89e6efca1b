use std::io;
use std::result;

/// Outcome of a remote call that did not succeed.
///
/// `Connect` and `Transport` both mean the master node could not be reached or the
/// call broke in flight. `Application` means the master answered and reported a
/// failure in the response's error field.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("failed to connect to {host}: {reason}")]
    Connect { host: String, reason: String },
    #[error("{}", status_message(.0))]
    Transport(#[from] tonic::Status),
    #[error("{0}")]
    Application(String),
}

impl Error {
    pub fn is_connection(&self) -> bool {
        matches!(self, Error::Connect { .. } | Error::Transport(_))
    }
}

fn status_message(status: &tonic::Status) -> String {
    if status.message().is_empty() {
        format!("transport error: {:?}", status.code())
    } else {
        status.message().to_string()
    }
}

pub type Result<T> = result::Result<T, Error>;

/// Failures that abort the process instead of mapping to an exit status.
#[derive(thiserror::Error, Debug)]
pub enum FatalError {
    #[error("log stream terminated: {0}")]
    StreamTerminated(#[source] io::Error),
    #[error("failed to write output: {0}")]
    Output(#[source] io::Error),
}
