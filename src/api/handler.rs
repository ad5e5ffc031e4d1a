use crate::common::data::{MockResponse, RecordedRequest};

/// Produces the response for exactly one request.
///
/// Handlers are queued on a [MockServer](crate::MockServer) with
/// [enqueue](crate::MockServer::enqueue). The n-th request that reaches the server is served by
/// the n-th enqueued handler, regardless of its method or path. A handler is consumed when it is
/// invoked and never reused.
///
/// Any closure `FnOnce(&RecordedRequest) -> MockResponse` is a handler:
///
/// ```
/// use mockwebserver::{MockResponse, MockServer, RecordedRequest};
///
/// let server = MockServer::new();
/// server.enqueue(|req: &RecordedRequest| {
///     MockResponse::new().body(format!("you asked for {}", req.path()))
/// });
/// assert_eq!(server.pending_handlers(), 1);
/// ```
pub trait Handler: Send + 'static {
    fn handle(self: Box<Self>, req: &RecordedRequest) -> MockResponse;
}

impl<F> Handler for F
where
    F: FnOnce(&RecordedRequest) -> MockResponse + Send + 'static,
{
    fn handle(self: Box<Self>, req: &RecordedRequest) -> MockResponse {
        (*self)(req)
    }
}
