use crate::error::{Error, Result};
use futures::Stream;
use scheduler_proto::master_client::MasterClient;
use scheduler_proto::{
    LogRequest, LogResponse, QueryRequest, QueryResponse, StartRequest, StartResponse,
    StopRequest, StopResponse,
};
use std::error;
use std::ops::{Deref, DerefMut};
use std::pin::Pin;
use tonic::transport::{Channel, Endpoint};
use tonic::{Request, Status};

/// Port the master node listens on when the host does not name one.
pub const DEFAULT_PORT: u16 = 50051;

pub type LogStream = Pin<Box<dyn Stream<Item = std::result::Result<LogResponse, Status>> + Send>>;

/// A live connection to one master node.
///
/// Errors returned here are transport failures only; the application-level error
/// fields of the responses are left for the caller to inspect.
#[tonic::async_trait]
pub trait MasterConnection: Send {
    async fn start(&mut self, request: StartRequest) -> std::result::Result<StartResponse, Status>;
    async fn stop(&mut self, request: StopRequest) -> std::result::Result<StopResponse, Status>;
    async fn query(&mut self, request: QueryRequest) -> std::result::Result<QueryResponse, Status>;
    async fn log(&mut self, request: LogRequest) -> std::result::Result<LogStream, Status>;

    /// Release the connection. Called once, by the owning [`Session`].
    fn close(&mut self);
}

/// Opens connections to master nodes by hostname.
#[tonic::async_trait]
pub trait Connector: Send + Sync {
    type Connection: MasterConnection + 'static;

    async fn connect(&self, host: &str) -> Result<Self::Connection>;
}

/// Scoped owner of a connection. The connection is closed exactly once: by
/// [`Session::close`], or when the session is dropped.
pub struct Session<C: MasterConnection> {
    connection: C,
    open: bool,
}

impl<C: MasterConnection> Session<C> {
    pub fn new(connection: C) -> Self {
        Self {
            connection,
            open: true,
        }
    }

    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if self.open {
            self.open = false;
            tracing::debug!("closing session");
            self.connection.close();
        }
    }
}

impl<C: MasterConnection> Deref for Session<C> {
    type Target = C;

    fn deref(&self) -> &C {
        &self.connection
    }
}

impl<C: MasterConnection> DerefMut for Session<C> {
    fn deref_mut(&mut self) -> &mut C {
        &mut self.connection
    }
}

impl<C: MasterConnection> Drop for Session<C> {
    fn drop(&mut self) {
        self.release();
    }
}

/// Connects to master nodes over plaintext HTTP/2.
#[derive(Clone, Debug)]
pub struct GrpcConnector {
    default_port: u16,
}

impl GrpcConnector {
    pub fn new(default_port: u16) -> Self {
        Self { default_port }
    }
}

impl Default for GrpcConnector {
    fn default() -> Self {
        Self::new(DEFAULT_PORT)
    }
}

#[tonic::async_trait]
impl Connector for GrpcConnector {
    type Connection = GrpcConnection;

    async fn connect(&self, host: &str) -> Result<GrpcConnection> {
        let uri = endpoint_uri(host, self.default_port);
        tracing::debug!(%uri, "connecting to master");
        let connect_error = |err: &dyn error::Error| Error::Connect {
            host: host.to_string(),
            reason: describe(err),
        };
        let endpoint = Endpoint::from_shared(uri).map_err(|err| connect_error(&err))?;
        let channel = endpoint.connect().await.map_err(|err| connect_error(&err))?;
        Ok(GrpcConnection {
            client: Some(MasterClient::new(channel)),
        })
    }
}

pub struct GrpcConnection {
    client: Option<MasterClient<Channel>>,
}

impl GrpcConnection {
    fn client(&mut self) -> std::result::Result<&mut MasterClient<Channel>, Status> {
        self.client
            .as_mut()
            .ok_or_else(|| Status::unavailable("session already closed"))
    }
}

#[tonic::async_trait]
impl MasterConnection for GrpcConnection {
    async fn start(&mut self, request: StartRequest) -> std::result::Result<StartResponse, Status> {
        let response = self.client()?.start(Request::new(request)).await?;
        Ok(response.into_inner())
    }

    async fn stop(&mut self, request: StopRequest) -> std::result::Result<StopResponse, Status> {
        let response = self.client()?.stop(Request::new(request)).await?;
        Ok(response.into_inner())
    }

    async fn query(&mut self, request: QueryRequest) -> std::result::Result<QueryResponse, Status> {
        let response = self.client()?.query(Request::new(request)).await?;
        Ok(response.into_inner())
    }

    async fn log(&mut self, request: LogRequest) -> std::result::Result<LogStream, Status> {
        let response = self.client()?.log(Request::new(request)).await?;
        Ok(Box::pin(response.into_inner()))
    }

    fn close(&mut self) {
        // dropping the last handle tears down the channel
        self.client = None;
    }
}

/// Build the endpoint URI for `host`.
///
/// A bare host gets the default port, `host:port` keeps its own, and anything that
/// already carries a scheme is passed through untouched.
pub fn endpoint_uri(host: &str, default_port: u16) -> String {
    if host.contains("://") {
        return host.to_string();
    }
    match host.matches(':').count() {
        0 => format!("http://{}:{}", host, default_port),
        1 => format!("http://{}", host),
        // bracketed ipv6, with or without a port
        _ if host.starts_with('[') => {
            if host.ends_with(']') {
                format!("http://{}:{}", host, default_port)
            } else {
                format!("http://{}", host)
            }
        }
        // bare ipv6
        _ => format!("http://[{}]:{}", host, default_port),
    }
}

/// Flatten an error and its sources into one line.
fn describe(err: &dyn error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
