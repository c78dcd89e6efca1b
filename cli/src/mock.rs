//! Scripted `Connector` for unit tests.

use crate::connection::{Connector, LogStream, MasterConnection};
use crate::error::{Error, Result};
use futures::StreamExt;
use scheduler_proto::{
    LogRequest, LogResponse, QueryRequest, QueryResponse, StartRequest, StartResponse,
    StopRequest, StopResponse,
};
use std::sync::{Arc, Mutex};
use tonic::Status;

/// What a scripted call answers with.
#[derive(Clone, Debug)]
pub enum Reply<T> {
    Ok(T),
    Transport(String),
    /// never answers
    Hang,
}

impl<T: Default> Default for Reply<T> {
    fn default() -> Self {
        Reply::Ok(T::default())
    }
}

impl<T> Reply<T> {
    async fn answer(self) -> std::result::Result<T, Status> {
        match self {
            Reply::Ok(value) => Ok(value),
            Reply::Transport(message) => Err(Status::unavailable(message)),
            Reply::Hang => futures::future::pending().await,
        }
    }
}

/// One element of a scripted log stream.
#[derive(Clone, Debug)]
pub enum LogItem {
    Message(LogResponse),
    Transport(String),
}

pub fn log_text(text: &str) -> LogItem {
    LogItem::Message(LogResponse {
        error: String::new(),
        log_messages: text.into(),
    })
}

pub fn log_error(message: &str) -> LogItem {
    LogItem::Message(LogResponse {
        error: message.into(),
        log_messages: String::new(),
    })
}

pub fn log_stream(items: Vec<LogItem>) -> LogStream {
    futures::stream::iter(items.into_iter().map(|item| match item {
        LogItem::Message(message) => Ok(message),
        LogItem::Transport(message) => Err(Status::unavailable(message)),
    }))
    .boxed()
}

#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    Start(StartRequest),
    Stop(StopRequest),
    Query(QueryRequest),
    Log(LogRequest),
}

#[derive(Default)]
struct State {
    connect_error: Option<String>,
    start: Reply<StartResponse>,
    stop: Reply<StopResponse>,
    query: Reply<QueryResponse>,
    log: Reply<Vec<LogItem>>,
    hosts: Vec<String>,
    calls: Vec<Call>,
    closes: usize,
}

#[derive(Clone, Default)]
pub struct MockConnector {
    state: Arc<Mutex<State>>,
}

impl MockConnector {
    pub fn failing_connect(message: &str) -> Self {
        let connector = Self::default();
        connector.state.lock().unwrap().connect_error = Some(message.into());
        connector
    }

    pub fn with_start(self, reply: Reply<StartResponse>) -> Self {
        self.state.lock().unwrap().start = reply;
        self
    }

    pub fn with_stop(self, reply: Reply<StopResponse>) -> Self {
        self.state.lock().unwrap().stop = reply;
        self
    }

    pub fn with_query(self, reply: Reply<QueryResponse>) -> Self {
        self.state.lock().unwrap().query = reply;
        self
    }

    pub fn with_log(self, reply: Reply<Vec<LogItem>>) -> Self {
        self.state.lock().unwrap().log = reply;
        self
    }

    /// Hosts passed to `connect`, in order.
    pub fn hosts(&self) -> Vec<String> {
        self.state.lock().unwrap().hosts.clone()
    }

    pub fn connects(&self) -> usize {
        self.state.lock().unwrap().hosts.len()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn closes(&self) -> usize {
        self.state.lock().unwrap().closes
    }
}

#[tonic::async_trait]
impl Connector for MockConnector {
    type Connection = MockConnection;

    async fn connect(&self, host: &str) -> Result<MockConnection> {
        let mut state = self.state.lock().unwrap();
        state.hosts.push(host.into());
        if let Some(reason) = state.connect_error.clone() {
            return Err(Error::Connect {
                host: host.into(),
                reason,
            });
        }
        Ok(MockConnection {
            state: self.state.clone(),
            closed: false,
        })
    }
}

pub struct MockConnection {
    state: Arc<Mutex<State>>,
    closed: bool,
}

impl MockConnection {
    fn record(&self, call: Call) -> std::sync::MutexGuard<'_, State> {
        assert!(!self.closed, "session used after release");
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        state
    }
}

#[tonic::async_trait]
impl MasterConnection for MockConnection {
    async fn start(&mut self, request: StartRequest) -> std::result::Result<StartResponse, Status> {
        let reply = self.record(Call::Start(request)).start.clone();
        reply.answer().await
    }

    async fn stop(&mut self, request: StopRequest) -> std::result::Result<StopResponse, Status> {
        let reply = self.record(Call::Stop(request)).stop.clone();
        reply.answer().await
    }

    async fn query(&mut self, request: QueryRequest) -> std::result::Result<QueryResponse, Status> {
        let reply = self.record(Call::Query(request)).query.clone();
        reply.answer().await
    }

    async fn log(&mut self, request: LogRequest) -> std::result::Result<LogStream, Status> {
        let reply = self.record(Call::Log(request)).log.clone();
        Ok(log_stream(reply.answer().await?))
    }

    fn close(&mut self) {
        assert!(!self.closed, "session released twice");
        self.closed = true;
        self.state.lock().unwrap().closes += 1;
    }
}
