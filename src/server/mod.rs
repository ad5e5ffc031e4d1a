use crate::common::runtime;
use futures_util::FutureExt;
use std::{
    net::SocketAddr,
    thread::{self, JoinHandle},
};
use tokio::sync::oneshot;

pub mod builder;
pub(crate) mod handler;
#[allow(clippy::module_inception)]
pub(crate) mod server;
pub(crate) mod state;

pub use server::Error;
pub(crate) use server::{HttpServer, ServerConfig};

use handler::RequestHandler;

/// A listener running on its own thread and runtime.
pub(crate) struct RunningServer {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    thread: Option<JoinHandle<Result<(), Error>>>,
}

impl RunningServer {
    pub fn address(&self) -> SocketAddr {
        self.addr
    }

    /// Stops accepting connections and blocks until every accepted request was answered.
    pub fn stop(mut self) -> Result<(), Error> {
        self.shutdown_and_join()
    }

    fn shutdown_and_join(&mut self) -> Result<(), Error> {
        if let Some(shutdown) = self.shutdown.take() {
            // The server may be gone already, there is nothing to signal then.
            let _ = shutdown.send(());
        }

        match self.thread.take() {
            Some(thread) => thread.join().map_err(|_| Error::ServerThreadPanicked)?,
            None => Ok(()),
        }
    }
}

impl Drop for RunningServer {
    fn drop(&mut self) {
        if let Err(err) = self.shutdown_and_join() {
            tracing::warn!("mock server did not shut down cleanly: {}", err);
        }
    }
}

/// Starts `handler` behind a new listener on a dedicated thread and resolves once the listener
/// is bound.
pub(crate) async fn start_server<H>(
    handler: H,
    config: ServerConfig,
    worker_threads: usize,
) -> Result<RunningServer, Error>
where
    H: RequestHandler + Send + Sync + 'static,
{
    let (addr_sender, addr_receiver) = oneshot::channel::<SocketAddr>();
    let (shutdown_sender, shutdown_receiver) = oneshot::channel::<()>();
    let server = HttpServer::new(handler, config);

    let thread = thread::Builder::new()
        .name("mockwebserver".to_string())
        .spawn(move || {
            let runtime = runtime::new(worker_threads).map_err(Error::RuntimeError)?;
            // Dropping the sender without sending also counts as a shutdown signal.
            let shutdown = shutdown_receiver.map(|_| ());
            runtime.block_on(server.start_with_signals(Some(addr_sender), shutdown))
        })
        .map_err(Error::RuntimeError)?;

    match addr_receiver.await {
        Ok(addr) => Ok(RunningServer {
            addr,
            shutdown: Some(shutdown_sender),
            thread: Some(thread),
        }),
        // The thread ended before the listener was bound, so it has an error to report.
        Err(_) => match thread.join() {
            Ok(Err(err)) => Err(err),
            Ok(Ok(())) => Err(Error::ServerConnectionError(
                "server stopped before it was bound".into(),
            )),
            Err(_) => Err(Error::ServerThreadPanicked),
        },
    }
}
