//! Command-line client for a remote job scheduler.
//!
//! [`CommandDispatcher`] turns a command line into one call on [`RemoteJobClient`],
//! which talks to the master node through an injected [`Connector`]. Log output
//! arrives through a [`StreamDecoder`].

pub mod arg_parser;
pub mod client_cli;
pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod logging;
pub mod status;
pub mod stream_decoder;

#[cfg(test)]
mod mock;

pub use client_cli::RemoteJobClient;
pub use connection::{Connector, GrpcConnector, MasterConnection, Session};
pub use dispatcher::{CommandDispatcher, ExitStatus};
pub use error::{Error, FatalError};
pub use status::{Status, UnknownStatus};
pub use stream_decoder::{RemoteLogError, StreamDecoder};
