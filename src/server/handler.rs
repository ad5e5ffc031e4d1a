use crate::{
    common::data::MockResponse,
    server::state::{Assignment, DispatchPolicy, MockServerState},
};
use async_trait::async_trait;
use http::{HeaderName, HeaderValue, StatusCode};
use hyper::{body::Bytes, Request, Response};
use std::{net::SocketAddr, str::FromStr, sync::Arc};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid status code: {0}")]
    InvalidStatusCode(#[from] http::status::InvalidStatusCode),
    #[error("invalid header: {0}")]
    InvalidHeader(String),
    #[error("cannot create response: {0}")]
    ResponseConstructionError(#[from] http::Error),
}

/// Produces a response for a fully buffered request. The listener calls this once for every
/// request it accepts.
#[async_trait]
pub(crate) trait RequestHandler {
    async fn handle(
        &self,
        req: Request<Bytes>,
        remote_addr: SocketAddr,
    ) -> Result<Response<Bytes>, Error>;

    /// Called once the listener stopped accepting connections.
    fn on_shutdown(&self) {}
}

/// Serves the n-th request with the n-th enqueued handler.
pub(crate) struct Dispatcher {
    state: Arc<MockServerState>,
    policy: DispatchPolicy,
    print_access_log: bool,
}

impl Dispatcher {
    pub fn new(
        state: Arc<MockServerState>,
        policy: DispatchPolicy,
        print_access_log: bool,
    ) -> Self {
        Self {
            state,
            policy,
            print_access_log,
        }
    }
}

#[async_trait]
impl RequestHandler for Dispatcher {
    async fn handle(
        &self,
        req: Request<Bytes>,
        remote_addr: SocketAddr,
    ) -> Result<Response<Bytes>, Error> {
        let (recorded, assignment) = self.state.record(&req, Some(remote_addr), self.policy);

        let handler = match assignment {
            Assignment::Handler(handler) => Some(handler),
            Assignment::Default => None,
            Assignment::Waiting(slot) => {
                tracing::debug!(
                    "No handler queued for request #{}, waiting for one",
                    recorded.index()
                );
                match slot.handler().await {
                    Some(handler) => Some(handler),
                    None => return unavailable(),
                }
            }
            Assignment::Released => return unavailable(),
        };

        let mock_response = match handler {
            Some(handler) => {
                tracing::debug!("Serving request #{} with queued handler", recorded.index());
                handler.handle(&recorded)
            }
            None => {
                tracing::debug!(
                    "No handler queued for request #{}, responding with default response",
                    recorded.index()
                );
                MockResponse::new()
            }
        };

        if let Some(delay) = mock_response.delay {
            tokio::time::sleep(delay).await;
        }

        if self.print_access_log {
            tracing::info!(
                "{} {} {} -> {}",
                remote_addr,
                recorded.method(),
                recorded.uri(),
                mock_response.status
            );
        }

        to_http_response(mock_response)
    }

    fn on_shutdown(&self) {
        self.state.release_waiters();
    }
}

fn unavailable() -> Result<Response<Bytes>, Error> {
    tracing::debug!("Server is shutting down, no handler will arrive for waiting request");
    Ok(Response::builder()
        .status(StatusCode::SERVICE_UNAVAILABLE)
        .body(Bytes::new())?)
}

pub(crate) fn to_http_response(res: MockResponse) -> Result<Response<Bytes>, Error> {
    let mut builder = Response::builder().status(StatusCode::from_u16(res.status)?);

    for (key, value) in res.headers {
        let name = HeaderName::from_str(&key)
            .map_err(|err| Error::InvalidHeader(format!("{}: {}", key, err)))?;
        let value = HeaderValue::from_str(&value)
            .map_err(|err| Error::InvalidHeader(format!("{}: {}", key, err)))?;
        builder = builder.header(name, value);
    }

    Ok(builder.body(res.body)?)
}
