use crate::connection::{LogStream, MasterConnection, Session};
use bytes::{Buf, BytesMut};
use scheduler_proto::LogResponse;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::io::{AsyncRead, ReadBuf};
use tokio::time::Sleep;

/// A failure the master node reported inside an otherwise well-formed log message.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct RemoteLogError(pub String);

/// Presents a server-streaming `Log` call as a plain byte stream.
///
/// Message boundaries have nothing to do with line boundaries or with the size of
/// the caller's buffer, so each received message is parked in `pending` and handed
/// out across as many reads as it takes. A new message is only received once
/// `pending` is drained.
///
/// End of the remote stream is reported as end of file. A transport failure is
/// reported as an [`io::ErrorKind::Other`] error wrapping the [`tonic::Status`],
/// and a message with a populated error field as one wrapping [`RemoteLogError`].
///
/// The decoder owns the session the stream runs on; [`StreamDecoder::close`] (or
/// dropping the decoder) releases it.
pub struct StreamDecoder<C: MasterConnection> {
    stream: LogStream,
    session: Session<C>,
    pending: BytesMut,
    receive_timeout: Option<Duration>,
    deadline: Option<Pin<Box<Sleep>>>,
}

// nothing in the decoder is structurally pinned
impl<C: MasterConnection> Unpin for StreamDecoder<C> {}

impl<C: MasterConnection> StreamDecoder<C> {
    pub fn new(stream: LogStream, session: Session<C>) -> Self {
        Self {
            stream,
            session,
            pending: BytesMut::new(),
            receive_timeout: None,
            deadline: None,
        }
    }

    /// Fail a read with [`io::ErrorKind::TimedOut`] when no message arrives within
    /// `timeout`. `None` waits forever.
    pub fn with_receive_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.receive_timeout = timeout;
        self.deadline = None;
        self
    }

    /// Release the underlying session.
    pub fn close(self) {
        let Self { session, .. } = self;
        session.close();
    }

    fn poll_receive(&mut self, cx: &mut Context<'_>) -> Poll<io::Result<Option<String>>> {
        match self.stream.as_mut().poll_next(cx) {
            Poll::Ready(None) => Poll::Ready(Ok(None)),
            Poll::Ready(Some(Err(status))) => {
                Poll::Ready(Err(io::Error::new(io::ErrorKind::Other, status)))
            }
            Poll::Ready(Some(Ok(LogResponse {
                error,
                log_messages,
            }))) => {
                self.deadline = None;
                tracing::debug!(bytes = log_messages.len(), "log message received");
                if !error.is_empty() {
                    return Poll::Ready(Err(io::Error::new(
                        io::ErrorKind::Other,
                        RemoteLogError(error),
                    )));
                }
                Poll::Ready(Ok(Some(log_messages)))
            }
            Poll::Pending => self.poll_deadline(cx),
        }
    }

    fn poll_deadline(&mut self, cx: &mut Context<'_>) -> Poll<io::Result<Option<String>>> {
        let timeout = match self.receive_timeout {
            Some(timeout) => timeout,
            None => return Poll::Pending,
        };
        let deadline = self
            .deadline
            .get_or_insert_with(|| Box::pin(tokio::time::sleep(timeout)));
        match deadline.as_mut().poll(cx) {
            Poll::Ready(()) => {
                self.deadline = None;
                Poll::Ready(Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!(
                        "no log message received within {}",
                        humantime::format_duration(timeout)
                    ),
                )))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<C: MasterConnection> AsyncRead for StreamDecoder<C> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if buf.remaining() == 0 {
            return Poll::Ready(Ok(()));
        }
        // empty messages carry nothing, keep receiving
        while this.pending.is_empty() {
            match this.poll_receive(cx) {
                Poll::Ready(Ok(Some(text))) => this.pending.extend_from_slice(text.as_bytes()),
                Poll::Ready(Ok(None)) => return Poll::Ready(Ok(())),
                Poll::Ready(Err(err)) => return Poll::Ready(Err(err)),
                Poll::Pending => return Poll::Pending,
            }
        }
        let n = buf.remaining().min(this.pending.len());
        buf.put_slice(&this.pending[..n]);
        this.pending.advance(n);
        Poll::Ready(Ok(()))
    }
}
