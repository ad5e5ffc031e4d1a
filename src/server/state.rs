use crate::{
    api::handler::Handler,
    common::data::RecordedRequest,
};
use bytes::Bytes;
use futures_timer::Delay;
use futures_util::{
    future::{select, Either},
    pin_mut,
};
use http::Request;
use std::{
    collections::VecDeque,
    net::SocketAddr,
    sync::{Arc, Mutex},
    time::Duration,
};
use tokio::sync::{oneshot, Notify};

/// Decides what happens to a request that arrives while no handler is queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DispatchPolicy {
    /// The request is answered right away with `200 OK` and an empty body. It never waits for
    /// a handler that is enqueued later.
    #[default]
    BestEffort,
    /// The request waits, without a timeout, until a handler is enqueued. Waiting requests are
    /// paired with handlers in arrival order.
    Rendezvous,
}

/// What the dispatcher has to do with a freshly recorded request.
pub(crate) enum Assignment {
    /// Serve the request with this handler.
    Handler(Box<dyn Handler>),
    /// Answer with the default response.
    Default,
    /// Wait for the next enqueued handler.
    Waiting(WaitingSlot),
    /// The server is shutting down and no handler will ever arrive.
    Released,
}

struct Queues {
    handlers: VecDeque<Box<dyn Handler>>,
    waiters: VecDeque<oneshot::Sender<Box<dyn Handler>>>,
    requests: VecDeque<RecordedRequest>,
    received: usize,
    released: bool,
}

/// The state shared between the test thread and the connection tasks of one mock server: the
/// handler queue, the log of received requests and the requests waiting for a handler.
pub(crate) struct MockServerState {
    queues: Mutex<Queues>,
    request_recorded: Notify,
}

impl MockServerState {
    pub fn new() -> Self {
        MockServerState {
            queues: Mutex::new(Queues {
                handlers: VecDeque::new(),
                waiters: VecDeque::new(),
                requests: VecDeque::new(),
                received: 0,
                released: false,
            }),
            request_recorded: Notify::new(),
        }
    }

    /// Appends a handler. A request waiting for a handler takes it right away.
    pub fn enqueue(&self, handler: Box<dyn Handler>) {
        let mut queues = self.queues.lock().unwrap();
        if let Some(handler) = hand_to_waiter(&mut queues, handler) {
            queues.handlers.push_back(handler);
        }
    }

    /// Puts back a handler that was handed to a request which went away before using it. It
    /// keeps its position ahead of all handlers enqueued after it.
    fn give_back(&self, handler: Box<dyn Handler>) {
        let mut queues = self.queues.lock().unwrap();
        if let Some(handler) = hand_to_waiter(&mut queues, handler) {
            queues.handlers.push_front(handler);
        }
        tracing::debug!("Returned unused handler to the handler queue");
    }

    /// Records the request and takes the handler that is going to serve it. Both happen in the
    /// same critical section, so the n-th recorded request always gets the n-th handler.
    pub fn record(
        self: &Arc<Self>,
        req: &Request<Bytes>,
        remote_addr: Option<SocketAddr>,
        policy: DispatchPolicy,
    ) -> (RecordedRequest, Assignment) {
        let (recorded, assignment) = {
            let mut queues = self.queues.lock().unwrap();

            let recorded = RecordedRequest::from_request(queues.received, req, remote_addr);
            queues.received += 1;
            queues.requests.push_back(recorded.clone());

            // Waiting requests are ahead of this one, it must not overtake them.
            let handler = if queues.waiters.is_empty() {
                queues.handlers.pop_front()
            } else {
                None
            };

            let assignment = match (handler, policy) {
                (Some(handler), _) => Assignment::Handler(handler),
                (None, DispatchPolicy::BestEffort) => Assignment::Default,
                (None, DispatchPolicy::Rendezvous) if queues.released => Assignment::Released,
                (None, DispatchPolicy::Rendezvous) => {
                    let (sender, receiver) = oneshot::channel();
                    queues.waiters.push_back(sender);
                    Assignment::Waiting(WaitingSlot {
                        receiver: Some(receiver),
                        state: self.clone(),
                    })
                }
            };

            (recorded, assignment)
        };

        self.request_recorded.notify_waiters();
        (recorded, assignment)
    }

    /// Lets every request that waits for a handler go and stops new requests from waiting.
    pub fn release_waiters(&self) {
        let mut queues = self.queues.lock().unwrap();
        queues.released = true;
        let count = queues.waiters.len();
        queues.waiters.clear();
        if count > 0 {
            tracing::debug!("Released {} request(s) still waiting for a handler", count);
        }
    }

    pub fn try_take_request(&self) -> Option<RecordedRequest> {
        self.queues.lock().unwrap().requests.pop_front()
    }

    pub async fn take_request(&self) -> RecordedRequest {
        loop {
            // Created before checking the queue so that a request recorded in between is not
            // missed.
            let notified = self.request_recorded.notified();
            if let Some(req) = self.try_take_request() {
                return req;
            }
            notified.await;
        }
    }

    pub async fn take_request_with_timeout(&self, timeout: Duration) -> Option<RecordedRequest> {
        let take = self.take_request();
        pin_mut!(take);

        match select(take, Delay::new(timeout)).await {
            Either::Left((req, _)) => Some(req),
            Either::Right(_) => None,
        }
    }

    pub fn pending_handlers(&self) -> usize {
        self.queues.lock().unwrap().handlers.len()
    }

    pub fn unread_requests(&self) -> usize {
        self.queues.lock().unwrap().requests.len()
    }

    pub fn received_requests(&self) -> usize {
        self.queues.lock().unwrap().received
    }

    /// Drops all queued handlers and all requests that were not taken yet.
    pub fn reset(&self) {
        let mut queues = self.queues.lock().unwrap();
        queues.handlers.clear();
        queues.requests.clear();
        tracing::trace!("Deleted queued handlers and request log");
    }
}

fn hand_to_waiter(queues: &mut Queues, handler: Box<dyn Handler>) -> Option<Box<dyn Handler>> {
    let mut handler = handler;
    while let Some(waiter) = queues.waiters.pop_front() {
        match waiter.send(handler) {
            Ok(()) => return None,
            // The waiting request is gone, try the next one.
            Err(returned) => handler = returned,
        }
    }
    Some(handler)
}

/// A request's place in the line of requests waiting for a handler.
///
/// If the slot is dropped after a handler was handed to it but before it was received, the
/// handler goes back to the queue.
pub(crate) struct WaitingSlot {
    receiver: Option<oneshot::Receiver<Box<dyn Handler>>>,
    state: Arc<MockServerState>,
}

impl WaitingSlot {
    /// Waits for the handler. Returns `None` if the server released the slot.
    pub async fn handler(mut self) -> Option<Box<dyn Handler>> {
        let receiver = self.receiver.as_mut()?;
        let result = receiver.await.ok();
        self.receiver = None;
        result
    }
}

impl Drop for WaitingSlot {
    fn drop(&mut self) {
        if let Some(mut receiver) = self.receiver.take() {
            receiver.close();
            if let Ok(handler) = receiver.try_recv() {
                self.state.give_back(handler);
            }
        }
    }
}
