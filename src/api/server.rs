use crate::{
    api::handler::Handler,
    common::{
        data::{MockResponse, RecordedRequest},
        util::Join,
    },
    server::{
        self,
        builder::{MockServerBuilder, MockServerSettings},
        handler::Dispatcher,
        start_server,
        state::{DispatchPolicy, MockServerState},
        RunningServer, ServerConfig,
    },
};
use std::{
    mem,
    net::SocketAddr,
    sync::{Arc, Mutex},
    time::Duration,
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("the mock server has already been started")]
    AlreadyStarted,
    #[error("the mock server has been stopped and cannot be started again")]
    Stopped,
    #[error("mock server error: {0}")]
    Server(#[from] server::Error),
}

enum Lifecycle {
    NotStarted,
    Starting,
    Running(RunningServer),
    Stopped,
}

/// A scriptable mock server for testing HTTP clients.
///
/// Queue the responses you want the server to give with [enqueue](MockServer::enqueue), point
/// your client at the URL returned by [start](MockServer::start), and inspect what the client
/// sent with [take_request](MockServer::take_request). The n-th request is answered by the n-th
/// enqueued handler, no matter which path or method it has.
///
/// **Example**:
/// ```
/// use mockwebserver::{MockResponse, MockServer};
///
/// let server = MockServer::new();
/// let url = server.start().unwrap();
///
/// server.enqueue(|_| MockResponse::new().body("Hello World!"));
///
/// let body = reqwest::blocking::get(&url).unwrap().text().unwrap();
/// assert_eq!(body, "Hello World!");
///
/// let req = server.take_request();
/// assert_eq!(req.method(), "GET");
/// assert_eq!(req.path(), "/");
/// ```
pub struct MockServer {
    state: Arc<MockServerState>,
    settings: MockServerSettings,
    lifecycle: Mutex<Lifecycle>,
}

impl MockServer {
    /// Creates a mock server with empty queues and the default settings. Use
    /// [builder](MockServer::builder) to change them.
    pub fn new() -> Self {
        Self::with_settings(MockServerSettings::default())
    }

    /// Returns a [MockServerBuilder] to configure a mock server.
    pub fn builder() -> MockServerBuilder {
        MockServerBuilder::new()
    }

    pub(crate) fn with_settings(settings: MockServerSettings) -> Self {
        MockServer {
            state: Arc::new(MockServerState::new()),
            settings,
            lifecycle: Mutex::new(Lifecycle::NotStarted),
        }
    }

    /// Starts the server and returns its base URL, e.g. `http://127.0.0.1:53417`.
    ///
    /// A server can only be started once. Starting it again returns
    /// [Error::AlreadyStarted], starting it after [stop](MockServer::stop) returns
    /// [Error::Stopped].
    pub fn start(&self) -> Result<String, Error> {
        self.start_async().join()
    }

    /// Starts the server asynchronously and returns its base URL.
    pub async fn start_async(&self) -> Result<String, Error> {
        {
            let mut lifecycle = self.lifecycle.lock().unwrap();
            match *lifecycle {
                Lifecycle::NotStarted => *lifecycle = Lifecycle::Starting,
                Lifecycle::Starting | Lifecycle::Running(_) => return Err(Error::AlreadyStarted),
                Lifecycle::Stopped => return Err(Error::Stopped),
            }
        }

        let dispatcher = Dispatcher::new(
            self.state.clone(),
            self.settings.dispatch_policy,
            self.settings.print_access_log,
        );
        let config = ServerConfig {
            static_port: self.settings.port,
            expose: self.settings.expose,
        };

        let result = start_server(dispatcher, config, self.settings.worker_threads).await;

        let mut lifecycle = self.lifecycle.lock().unwrap();
        match result {
            Ok(running) => {
                let base_url = format!("http://{}", running.address());
                *lifecycle = Lifecycle::Running(running);
                Ok(base_url)
            }
            Err(err) => {
                *lifecycle = Lifecycle::NotStarted;
                Err(err.into())
            }
        }
    }

    /// Stops the server. Blocks until all requests that were accepted before have been
    /// answered; requests arriving afterwards are refused.
    ///
    /// Under [DispatchPolicy::Rendezvous], requests still waiting for a handler are answered
    /// with `503 Service Unavailable`.
    ///
    /// Stopping is idempotent: calling this on a server that is stopped or was never started
    /// does nothing. The server is also stopped when it is dropped.
    pub fn stop(&self) -> Result<(), Error> {
        let running = {
            let mut lifecycle = self.lifecycle.lock().unwrap();
            match mem::replace(&mut *lifecycle, Lifecycle::Stopped) {
                Lifecycle::Running(running) => running,
                other => {
                    *lifecycle = other;
                    return Ok(());
                }
            }
        };

        running.stop()?;
        Ok(())
    }

    /// Returns true between a successful [start](MockServer::start) and
    /// [stop](MockServer::stop).
    pub fn is_running(&self) -> bool {
        matches!(*self.lifecycle.lock().unwrap(), Lifecycle::Running(_))
    }

    /// The address the server listens on, if it is running.
    pub fn address(&self) -> Option<SocketAddr> {
        match &*self.lifecycle.lock().unwrap() {
            Lifecycle::Running(running) => Some(running.address()),
            _ => None,
        }
    }

    /// The hostname of the `MockServer`. By default, this is `127.0.0.1`.
    ///
    /// # Panics
    /// Panics if the server is not running.
    pub fn host(&self) -> String {
        self.running_address().ip().to_string()
    }

    /// The TCP port that the mock server is listening on.
    ///
    /// # Panics
    /// Panics if the server is not running.
    pub fn port(&self) -> u16 {
        self.running_address().port()
    }

    /// Builds the URL for a specific path on the mock server.
    ///
    /// # Panics
    /// Panics if the server is not running.
    ///
    /// **Example**:
    /// ```
    /// let server = mockwebserver::MockServer::new();
    /// server.start().unwrap();
    ///
    /// let expected_url = format!("http://127.0.0.1:{}/hello", server.port());
    /// assert_eq!(expected_url, server.url("/hello"));
    /// ```
    pub fn url<S: Into<String>>(&self, path: S) -> String {
        format!("http://{}{}", self.running_address(), path.into())
    }

    /// Builds the base URL for the mock server.
    ///
    /// # Panics
    /// Panics if the server is not running.
    pub fn base_url(&self) -> String {
        self.url("")
    }

    fn running_address(&self) -> SocketAddr {
        self.address().expect("the mock server is not running")
    }

    /// Queues a closure that produces the response for one request. The first request is
    /// served by the first enqueued handler, the second request by the second one, and so on.
    ///
    /// Can be called at any time, also while requests are being served.
    pub fn enqueue<F>(&self, handler: F)
    where
        F: FnOnce(&RecordedRequest) -> MockResponse + Send + 'static,
    {
        self.enqueue_handler(handler);
    }

    /// Queues a [Handler]. See [enqueue](MockServer::enqueue).
    pub fn enqueue_handler<H: Handler>(&self, handler: H) {
        self.state.enqueue(Box::new(handler));
    }

    /// Queues a fixed response for one request.
    pub fn enqueue_response(&self, response: MockResponse) {
        self.enqueue(move |_| response);
    }

    /// Removes and returns the oldest request that was not taken yet. This method blocks until
    /// a request is available, possibly forever.
    pub fn take_request(&self) -> RecordedRequest {
        self.take_request_async().join()
    }

    /// Removes and returns the oldest request that was not taken yet, waiting for one as long
    /// as necessary.
    pub async fn take_request_async(&self) -> RecordedRequest {
        self.state.take_request().await
    }

    /// Removes and returns the oldest request that was not taken yet. Returns `None` right away
    /// if there is none.
    pub fn try_take_request(&self) -> Option<RecordedRequest> {
        self.state.try_take_request()
    }

    /// Removes and returns the oldest request that was not taken yet, waiting up to `timeout`
    /// for one to arrive. Returns `None` if the time elapsed.
    pub fn take_request_with_timeout(&self, timeout: Duration) -> Option<RecordedRequest> {
        self.take_request_with_timeout_async(timeout).join()
    }

    /// Async version of [take_request_with_timeout](MockServer::take_request_with_timeout).
    pub async fn take_request_with_timeout_async(
        &self,
        timeout: Duration,
    ) -> Option<RecordedRequest> {
        self.state.take_request_with_timeout(timeout).await
    }

    /// The number of handlers that are queued and have not served a request yet.
    pub fn pending_handlers(&self) -> usize {
        self.state.pending_handlers()
    }

    /// The number of recorded requests that were not taken yet.
    pub fn unread_requests(&self) -> usize {
        self.state.unread_requests()
    }

    /// The number of requests the server received since it was created. Taking requests does
    /// not change this number.
    pub fn received_requests(&self) -> usize {
        self.state.received_requests()
    }

    /// Discards all queued handlers and all requests that were not taken yet.
    pub fn reset(&self) {
        self.state.reset()
    }

    pub fn dispatch_policy(&self) -> DispatchPolicy {
        self.settings.dispatch_policy
    }
}

impl Default for MockServer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        if let Err(err) = self.stop() {
            tracing::warn!("cannot stop mock server: {}", err);
        }
    }
}
