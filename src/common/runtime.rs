use tokio::runtime::Runtime;

/// Builds the multi-threaded runtime that drives a mock server's listener and its connections.
pub(crate) fn new(worker_threads: usize) -> std::io::Result<Runtime> {
    assert!(
        worker_threads > 0,
        "Parameter worker_threads must be larger than 0"
    );

    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(worker_threads)
        .thread_name("mockwebserver-worker")
        .enable_all()
        .build()
}
