use crate::{api::server::MockServer, server::state::DispatchPolicy};

const DEFAULT_WORKER_THREADS: usize = 2;

/// Settings of a [MockServer] that are fixed once it has been built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MockServerSettings {
    pub dispatch_policy: DispatchPolicy,
    pub port: Option<u16>,
    pub expose: bool,
    pub print_access_log: bool,
    pub worker_threads: usize,
}

impl Default for MockServerSettings {
    fn default() -> Self {
        MockServerSettings {
            dispatch_policy: DispatchPolicy::default(),
            port: None,
            expose: false,
            print_access_log: false,
            worker_threads: DEFAULT_WORKER_THREADS,
        }
    }
}

/// The `MockServerBuilder` struct is used to configure a [MockServer] before it is started.
/// Every setting has a default, so `MockServerBuilder::new().build()` is the same as
/// [MockServer::new].
///
/// ```
/// use mockwebserver::{DispatchPolicy, MockServerBuilder};
///
/// let server = MockServerBuilder::new()
///     .dispatch_policy(DispatchPolicy::Rendezvous)
///     .print_access_log(true)
///     .build();
///
/// assert_eq!(server.dispatch_policy(), DispatchPolicy::Rendezvous);
/// ```
#[derive(Debug, Default)]
pub struct MockServerBuilder {
    dispatch_policy: Option<DispatchPolicy>,
    port: Option<u16>,
    expose: Option<bool>,
    print_access_log: Option<bool>,
    worker_threads: Option<usize>,
}

impl MockServerBuilder {
    /// Creates a new instance of `MockServerBuilder` with default settings.
    pub fn new() -> Self {
        MockServerBuilder::default()
    }

    /// Sets what happens to requests that arrive while no handler is queued.
    ///
    /// # Parameters
    /// - `policy`: The policy, [DispatchPolicy::BestEffort] by default.
    ///
    /// # Returns
    /// A modified `MockServerBuilder` instance for method chaining.
    pub fn dispatch_policy(mut self, policy: DispatchPolicy) -> Self {
        self.dispatch_policy = Some(policy);
        self
    }

    /// Sets a static port instead of letting the operating system choose a free one.
    ///
    /// # Parameters
    /// - `port`: The port number.
    ///
    /// # Returns
    /// A modified `MockServerBuilder` instance for method chaining.
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Sets the port for the mock server as an optional value. `None` lets the operating
    /// system choose.
    pub fn port_option(mut self, port: Option<u16>) -> Self {
        self.port = port;
        self
    }

    /// Sets whether the server listens on all interfaces (`0.0.0.0`) instead of only on the
    /// loopback interface.
    ///
    /// # Parameters
    /// - `expose`: A boolean indicating whether to expose the server.
    ///
    /// # Returns
    /// A modified `MockServerBuilder` instance for method chaining.
    pub fn expose(mut self, expose: bool) -> Self {
        self.expose = Some(expose);
        self
    }

    /// Sets whether the server should be exposed as an optional value.
    pub fn expose_option(mut self, expose: Option<bool>) -> Self {
        self.expose = expose;
        self
    }

    /// Sets whether to log one line per served request at `info` level.
    ///
    /// # Parameters
    /// - `enabled`: A boolean indicating whether to print access logs.
    ///
    /// # Returns
    /// A modified `MockServerBuilder` instance for method chaining.
    pub fn print_access_log(mut self, enabled: bool) -> Self {
        self.print_access_log = Some(enabled);
        self
    }

    /// Sets whether to print access logs as an optional value.
    pub fn print_access_log_option(mut self, enabled: Option<bool>) -> Self {
        self.print_access_log = enabled;
        self
    }

    /// Sets the number of runtime threads that serve connections.
    ///
    /// # Panics
    /// Panics if `threads` is zero.
    pub fn worker_threads(mut self, threads: usize) -> Self {
        assert!(threads > 0, "a mock server needs at least one worker thread");
        self.worker_threads = Some(threads);
        self
    }

    /// Builds the `MockServer` with the current settings. The server is not started yet.
    pub fn build(self) -> MockServer {
        MockServer::with_settings(self.settings())
    }

    pub(crate) fn settings(self) -> MockServerSettings {
        let defaults = MockServerSettings::default();
        MockServerSettings {
            dispatch_policy: self.dispatch_policy.unwrap_or(defaults.dispatch_policy),
            port: self.port.or(defaults.port),
            expose: self.expose.unwrap_or(defaults.expose),
            print_access_log: self.print_access_log.unwrap_or(defaults.print_access_log),
            worker_threads: self.worker_threads.unwrap_or(defaults.worker_threads),
        }
    }
}
