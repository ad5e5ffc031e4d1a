//! `mockwebserver` is a scriptable web server for testing HTTP clients.
//!
//! A test queues the responses it wants the server to give, points the client under test at
//! the server and afterwards checks which requests the client sent. The server is a real HTTP
//! server that listens on an ephemeral local port, so any HTTP client can talk to it.
//!
//! # Getting Started
//! ```rust
//! use mockwebserver::prelude::*;
//! use std::time::Duration;
//!
//! // Start the server.
//! let server = MockServer::new();
//! let url = server.start().unwrap();
//!
//! // Queue two responses. They are given in this order, regardless of the request path.
//! server.enqueue(|_| MockResponse::new().status(500).body("err"));
//! server.enqueue(|_| MockResponse::new().body("ok\n"));
//!
//! // Exercise your HTTP code.
//! let first = reqwest::blocking::get(&url).unwrap();
//! assert_eq!(first.status(), 500);
//! assert_eq!(first.text().unwrap(), "err");
//!
//! let second = reqwest::blocking::get(format!("{}/foo", url)).unwrap();
//! assert_eq!(second.status(), 200);
//! assert_eq!(second.text().unwrap(), "ok\n");
//!
//! // Inspect the requests.
//! assert_eq!(server.take_request().path(), "/");
//! let req = server.take_request_with_timeout(Duration::from_secs(1)).unwrap();
//! assert_eq!(req.path(), "/foo");
//!
//! server.stop().unwrap();
//! ```
//!
//! # Matching requests to handlers
//! Handlers are not matched by path or method. The n-th request that reaches the server is
//! answered by the n-th handler that was enqueued. What happens to a request that arrives while
//! no handler is queued is decided by the server's [DispatchPolicy]:
//!
//! * [DispatchPolicy::BestEffort] (the default) answers it with `200 OK` and an empty body.
//! * [DispatchPolicy::Rendezvous] lets it wait until the next handler is enqueued.
//!
//! # Retrieving requests
//! Every request is recorded before it is answered. [MockServer::take_request] blocks until a
//! request is available, [MockServer::take_request_with_timeout] gives up after a timeout and
//! [MockServer::try_take_request] never blocks. Each call removes the request it returns. The
//! async variants work with any executor.
//!
//! # Debugging
//! `mockwebserver` logs against the `tracing` crate, with its `log` compatibility enabled. For
//! example, if you use the `env_logger` logging backend, you can activate debug logging by
//! setting the `RUST_LOG` environment variable to `mockwebserver=debug` and then calling
//! `env_logger::try_init()`. Enable
//! [print_access_log](MockServerBuilder::print_access_log) to get one line per served request.

mod api;
mod common;
mod server;

pub use api::{
    handler::Handler,
    server::{Error, MockServer},
};
pub use common::data::{MockResponse, RecordedRequest};
pub use server::{builder::MockServerBuilder, state::DispatchPolicy, Error as ServerError};

/// Imports the most commonly used types.
pub mod prelude {
    #[doc(no_inline)]
    pub use crate::{
        DispatchPolicy, Handler, MockResponse, MockServer, MockServerBuilder, RecordedRequest,
    };
}
