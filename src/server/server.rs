use futures_util::{
    future::{BoxFuture, Shared},
    pin_mut, FutureExt,
};
use http::{Request, StatusCode};
use http_body_util::{combinators::BoxBody, BodyExt, Full};
use hyper::{
    body::{Bytes, Incoming},
    service::service_fn,
    Response,
};
use hyper_util::{
    rt::{TokioExecutor, TokioIo},
    server::conn::auto::Builder as ServerBuilder,
};
use std::{future::Future, io, net::SocketAddr, sync::Arc};
use thiserror::Error;
use tokio::{
    net::{TcpListener, TcpStream},
    sync::oneshot::Sender,
    task::{JoinError, JoinSet},
};

use crate::server::{
    handler,
    handler::RequestHandler,
    server::Error::{
        BufferError, LocalSocketAddrError, PublishSocketAddrError, RouterError,
        ServerConnectionError, SocketBindError,
    },
};

#[derive(Error, Debug)]
pub enum Error {
    #[error("cannot bind to socket addr {0}: {1}")]
    SocketBindError(SocketAddr, io::Error),
    #[error("cannot parse socket address: {0}")]
    SocketAddrParseError(#[from] std::net::AddrParseError),
    #[error("cannot obtain local address: {0}")]
    LocalSocketAddrError(io::Error),
    #[error("cannot send reserved TCP address to test thread {0}")]
    PublishSocketAddrError(SocketAddr),
    #[error("cannot start server runtime: {0}")]
    RuntimeError(io::Error),
    #[error("the server thread panicked")]
    ServerThreadPanicked,
    #[error("buffering error: {0}")]
    BufferError(hyper::Error),
    #[error("HTTP error: {0}")]
    HTTPError(#[from] http::Error),
    #[error("cannot process request: {0}")]
    RouterError(#[from] handler::Error),
    #[error("Server error: {0}")]
    ServerConnectionError(Box<dyn std::error::Error + Send + Sync>),
}

type ShutdownSignal = Shared<BoxFuture<'static, ()>>;

pub(crate) struct ServerConfig {
    pub static_port: Option<u16>,
    pub expose: bool,
}

/// Serves HTTP on a TCP listener and passes every request to a [RequestHandler].
pub(crate) struct HttpServer<H>
where
    H: RequestHandler + Send + Sync + 'static,
{
    handler: H,
    config: ServerConfig,
}

impl<H> HttpServer<H>
where
    H: RequestHandler + Send + Sync + 'static,
{
    pub fn new(handler: H, config: ServerConfig) -> Self {
        HttpServer { handler, config }
    }

    /// Binds the listener, publishes its address through `socket_addr_sender` and serves
    /// requests until `shutdown` resolves. Returns after all connections were drained.
    pub async fn start_with_signals<F>(
        self,
        socket_addr_sender: Option<Sender<SocketAddr>>,
        shutdown: F,
    ) -> Result<(), Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let host = if self.config.expose {
            "0.0.0.0"
        } else {
            "127.0.0.1"
        };
        let addr: SocketAddr =
            format!("{}:{}", host, self.config.static_port.unwrap_or(0)).parse()?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| SocketBindError(addr, e))?;
        let addr = listener.local_addr().map_err(LocalSocketAddrError)?;

        if let Some(sender) = socket_addr_sender {
            sender.send(addr).map_err(PublishSocketAddrError)?;
        }

        tracing::info!("Listening on {}", addr);
        self.run_accept_loop(listener, shutdown.boxed().shared())
            .await
    }

    async fn run_accept_loop(
        self,
        listener: TcpListener,
        shutdown: ShutdownSignal,
    ) -> Result<(), Error> {
        let server = Arc::new(self);
        let mut connections = JoinSet::new();

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    match accepted {
                        Ok((tcp_stream, remote_address)) => {
                            let server = server.clone();
                            let shutdown = shutdown.clone();
                            connections.spawn(async move {
                                if let Err(err) = serve_connection(server, tcp_stream, remote_address, shutdown).await {
                                    tracing::warn!("{:?}", err);
                                }
                            });
                        },
                        Err(err) => {
                            tracing::error!("TCP error: {:?}", err);
                        },
                    };
                }
                Some(finished) = connections.join_next(), if !connections.is_empty() => {
                    log_finished_connection(finished);
                }
                _ = shutdown.clone() => {
                    break;
                }
            }
        }

        drop(listener);
        server.handler.on_shutdown();

        tracing::debug!(
            "Stopped accepting connections, waiting for {} open connection(s)",
            connections.len()
        );
        while let Some(finished) = connections.join_next().await {
            log_finished_connection(finished);
        }

        tracing::info!("Server stopped");
        Ok(())
    }

    async fn service(
        self: Arc<Self>,
        req: Request<Incoming>,
        remote_address: SocketAddr,
    ) -> Result<Response<BoxBody<Bytes, hyper::Error>>, Error> {
        tracing::trace!("New HTTP request received: {} {}", req.method(), req.uri());

        let req = match buffer_request(req).await {
            Ok(req) => req,
            Err(err) => {
                return error_response(StatusCode::INTERNAL_SERVER_ERROR, BufferError(err));
            }
        };

        match self.handler.handle(req, remote_address).await {
            Ok(response) => to_service_response(response),
            Err(err) => error_response(StatusCode::INTERNAL_SERVER_ERROR, RouterError(err)),
        }
    }
}

/// Serves one connection until the client closes it. When `shutdown` resolves, the request in
/// flight is completed and the connection is closed afterwards.
async fn serve_connection<H>(
    server: Arc<HttpServer<H>>,
    tcp_stream: TcpStream,
    remote_address: SocketAddr,
    shutdown: ShutdownSignal,
) -> Result<(), Error>
where
    H: RequestHandler + Send + Sync + 'static,
{
    tracing::trace!("new TCP connection incoming from {}", remote_address);

    let mut server_builder = ServerBuilder::new(TokioExecutor::new());
    server_builder.http1().keep_alive(true);

    let connection = server_builder.serve_connection(
        TokioIo::new(tcp_stream),
        service_fn(move |req| server.clone().service(req, remote_address)),
    );
    pin_mut!(connection);

    tokio::select! {
        result = connection.as_mut() => result.map_err(ServerConnectionError),
        _ = shutdown => {
            connection.as_mut().graceful_shutdown();
            connection.await.map_err(ServerConnectionError)
        }
    }
}

fn log_finished_connection(finished: Result<(), JoinError>) {
    if let Err(err) = finished {
        if err.is_panic() {
            tracing::error!("connection task panicked while serving a request: {}", err);
        } else {
            tracing::warn!("connection task was cancelled: {}", err);
        }
    }
}

async fn buffer_request(req: Request<Incoming>) -> Result<Request<Bytes>, hyper::Error> {
    let (parts, body) = req.into_parts();
    let body = body.collect().await?.to_bytes();
    Ok(Request::from_parts(parts, body))
}

fn full<T: Into<Bytes>>(chunk: T) -> BoxBody<Bytes, hyper::Error> {
    Full::new(chunk.into())
        .map_err(|never| match never {})
        .boxed()
}

fn error_response(
    code: StatusCode,
    err: Error,
) -> Result<Response<BoxBody<Bytes, hyper::Error>>, Error> {
    tracing::error!("failed to process request: {}", err.to_string());
    Ok(Response::builder()
        .status(code)
        .body(full(err.to_string()))?)
}

fn to_service_response(
    response: Response<Bytes>,
) -> Result<Response<BoxBody<Bytes, hyper::Error>>, Error> {
    let (parts, body) = response.into_parts();
    Ok(Response::from_parts(parts, full(body)))
}
