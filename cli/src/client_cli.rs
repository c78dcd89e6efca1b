use crate::connection::{Connector, MasterConnection, Session};
use crate::error::{Error, Result};
use crate::status::Status;
use crate::stream_decoder::StreamDecoder;
use futures::TryFutureExt;
use scheduler_proto::{LogRequest, QueryRequest, StartRequest, StopRequest};
use std::future::Future;
use std::time::Duration;

/// Issues one remote call per sub-command against the master node at `host`.
///
/// Every call opens its own session and releases it before returning, on success
/// and failure alike. The one exception is [`RemoteJobClient::stream_log`], which
/// hands its session to the returned [`StreamDecoder`].
pub struct RemoteJobClient<F> {
    connector: F,
    deadline: Option<Duration>,
}

impl<F: Connector> RemoteJobClient<F> {
    pub fn new(connector: F) -> Self {
        Self {
            connector,
            deadline: None,
        }
    }

    /// Bound connects, unary calls and log receives by `deadline`. `None` (the
    /// default) waits indefinitely.
    pub fn set_deadline(&mut self, deadline: Option<Duration>) {
        self.deadline = deadline;
    }

    /// start a job from `image` under the name `job_name`.
    #[tracing::instrument(skip(self))]
    pub async fn start(&self, image: &str, job_name: &str, host: &str) -> Result<()> {
        let mut session = self.open(host).await?;
        let request = StartRequest {
            docker_image: image.into(),
            job_name: job_name.into(),
        };
        let response = self
            .bounded(session.start(request).map_err(Error::from))
            .await?;
        application_result(response.error)
    }

    #[tracing::instrument(skip(self))]
    pub async fn stop(&self, job_name: &str, host: &str) -> Result<()> {
        let mut session = self.open(host).await?;
        let request = StopRequest {
            job_name: job_name.into(),
        };
        let response = self
            .bounded(session.stop(request).map_err(Error::from))
            .await?;
        application_result(response.error)
    }

    #[tracing::instrument(skip(self))]
    pub async fn query(&self, job_name: &str, host: &str) -> Result<Status> {
        let mut session = self.open(host).await?;
        let request = QueryRequest {
            job_name: job_name.into(),
        };
        let response = self
            .bounded(session.query(request).map_err(Error::from))
            .await?;
        application_result(response.error)?;
        let status = response
            .status
            .parse::<Status>()
            .unwrap_or_else(|err| panic!("master responded with an invalid job status: {}", err));
        Ok(status)
    }

    /// Open the job's log stream. The session stays open until the returned
    /// decoder is closed or dropped.
    #[tracing::instrument(skip(self))]
    pub async fn stream_log(
        &self,
        job_name: &str,
        host: &str,
    ) -> Result<StreamDecoder<F::Connection>> {
        let mut session = self.open(host).await?;
        let request = LogRequest {
            job_name: job_name.into(),
        };
        let stream = self
            .bounded(session.log(request).map_err(Error::from))
            .await?;
        Ok(StreamDecoder::new(stream, session).with_receive_timeout(self.deadline))
    }

    async fn open(&self, host: &str) -> Result<Session<F::Connection>> {
        let connection = self.bounded(self.connector.connect(host)).await?;
        Ok(Session::new(connection))
    }

    async fn bounded<T>(&self, call: impl Future<Output = Result<T>>) -> Result<T> {
        let deadline = match self.deadline {
            Some(deadline) => deadline,
            None => return call.await,
        };
        tokio::time::timeout(deadline, call)
            .await
            .unwrap_or_else(|_| {
                Err(Error::Transport(tonic::Status::deadline_exceeded(format!(
                    "no response within {}",
                    humantime::format_duration(deadline)
                ))))
            })
    }
}

/// An empty error field means success.
fn application_result(error: String) -> Result<()> {
    if error.is_empty() {
        Ok(())
    } else {
        Err(Error::Application(error))
    }
}
