use crate::arg_parser::{normalize_flags, ArgParser, SubCommand, Target};
use crate::client_cli::RemoteJobClient;
use crate::connection::Connector;
use crate::error::{Error, FatalError};
use clap::Parser;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Process exit status for a finished invocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExitStatus {
    Success,
    /// no or unknown sub-command, help requested, or a required flag missing
    Usage,
    /// the remote call failed, either in transport or on the master node
    RemoteFailure,
}

impl ExitStatus {
    pub fn code(self) -> i32 {
        match self {
            ExitStatus::Success => 0,
            ExitStatus::Usage => 1,
            ExitStatus::RemoteFailure => 3,
        }
    }
}

/// Parses one command line, runs it against the master node and reports the
/// outcome on the injected output sinks.
pub struct CommandDispatcher<F, O, E> {
    client: RemoteJobClient<F>,
    out: O,
    err: E,
}

impl<F, O, E> CommandDispatcher<F, O, E>
where
    F: Connector,
    O: Write,
    E: Write,
{
    pub fn new(client: RemoteJobClient<F>, out: O, err: E) -> Self {
        Self { client, out, err }
    }

    /// Run the command in `args` (program name first).
    ///
    /// Usage problems and failed remote calls are reported and mapped to an
    /// [`ExitStatus`]. A log stream that breaks mid-way, or a sink that cannot be
    /// written to, is returned as a [`FatalError`].
    pub async fn dispatch<I>(&mut self, args: I) -> Result<ExitStatus, FatalError>
    where
        I: IntoIterator<Item = String>,
    {
        let parsed = match ArgParser::try_parse_from(normalize_flags(args)) {
            Ok(parsed) => parsed,
            Err(usage) => {
                tracing::debug!(kind = ?usage.kind(), "rejected command line");
                write!(self.err, "{}", usage).map_err(FatalError::Output)?;
                return Ok(ExitStatus::Usage);
            }
        };
        self.client.set_deadline(parsed.timeout);

        match parsed.sub_command {
            SubCommand::Start {
                image,
                name,
                target: Target { host },
            } => match self.client.start(&image, &name, &host).await {
                Ok(()) => self.confirm("job started"),
                Err(err) => self.remote_failure(err),
            },
            SubCommand::Stop {
                name,
                target: Target { host },
            } => match self.client.stop(&name, &host).await {
                Ok(()) => self.confirm("job stopped"),
                Err(err) => self.remote_failure(err),
            },
            SubCommand::Query {
                name,
                target: Target { host },
            } => match self.client.query(&name, &host).await {
                Ok(status) => self.confirm(&format!("job status: {}", status)),
                Err(err) => self.remote_failure(err),
            },
            SubCommand::Log {
                name,
                target: Target { host },
            } => self.stream_log(&name, &host).await,
        }
    }

    /// Print the job's log line by line until the stream ends.
    async fn stream_log(&mut self, name: &str, host: &str) -> Result<ExitStatus, FatalError> {
        let decoder = match self.client.stream_log(name, host).await {
            Ok(decoder) => decoder,
            Err(err) => return self.remote_failure(err),
        };
        let mut reader = BufReader::new(decoder);
        let mut line = Vec::new();
        loop {
            line.clear();
            let n = reader
                .read_until(b'\n', &mut line)
                .await
                .map_err(FatalError::StreamTerminated)?;
            if n == 0 {
                break;
            }
            // line keeps its trailing newline
            self.out.write_all(&line).map_err(FatalError::Output)?;
            self.out.flush().map_err(FatalError::Output)?;
        }
        reader.into_inner().close();
        Ok(ExitStatus::Success)
    }

    fn confirm(&mut self, message: &str) -> Result<ExitStatus, FatalError> {
        writeln!(self.out, "{}", message).map_err(FatalError::Output)?;
        Ok(ExitStatus::Success)
    }

    fn remote_failure(&mut self, err: Error) -> Result<ExitStatus, FatalError> {
        tracing::debug!(connection = err.is_connection(), "remote call failed");
        writeln!(self.err, "{}", err).map_err(FatalError::Output)?;
        Ok(ExitStatus::RemoteFailure)
    }
}
