// Deferred completion of command requests

use nvp_core::{PlayerError, Response, Result, SeekToken};
use parking_lot::{Condvar, Mutex};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};
use std::time::{Duration, Instant};

/// Resolves one command request. Called at most once, on the engine thread.
/// Dropping it uncalled resolves the request as `Disposed`.
pub type Responder = Box<dyn FnOnce(Result<Response>) + Send>;

#[derive(Debug, Default)]
struct Slot {
    resolved: bool,
    result: Option<Result<Response>>,
    waker: Option<Waker>,
}

impl Slot {
    /// Hand out the result once; later takers see `Disposed`.
    fn take(&mut self) -> Result<Response> {
        self.result.take().unwrap_or(Err(PlayerError::Disposed))
    }
}

#[derive(Debug, Default)]
struct Shared {
    slot: Mutex<Slot>,
    signal: Condvar,
}

impl Shared {
    fn resolve(&self, result: Result<Response>) {
        let mut slot = self.slot.lock();
        if slot.resolved {
            return;
        }
        slot.resolved = true;
        slot.result = Some(result);
        let waker = slot.waker.take();
        drop(slot);

        self.signal.notify_all();
        if let Some(waker) = waker {
            waker.wake();
        }
    }
}

/// Sending half. Resolves as `Disposed` if dropped without a result,
/// e.g. when the engine thread exits with the request still queued.
struct ReplySender {
    shared: Option<Arc<Shared>>,
}

impl ReplySender {
    fn send(mut self, result: Result<Response>) {
        if let Some(shared) = self.shared.take() {
            shared.resolve(result);
        }
    }
}

impl Drop for ReplySender {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.take() {
            shared.resolve(Err(PlayerError::Disposed));
        }
    }
}

/// Receiving half of one request. Blocking waits park on a condvar, so
/// they are safe from any thread, async runtime workers included.
#[derive(Debug)]
pub(crate) struct PendingReply {
    shared: Arc<Shared>,
}

impl PendingReply {
    pub fn wait(&self) -> Result<Response> {
        let mut slot = self.shared.slot.lock();
        while !slot.resolved {
            self.shared.signal.wait(&mut slot);
        }
        slot.take()
    }

    pub fn wait_timeout(&self, timeout: Duration) -> Option<Result<Response>> {
        let deadline = Instant::now() + timeout;
        let mut slot = self.shared.slot.lock();
        while !slot.resolved {
            if self.shared.signal.wait_until(&mut slot, deadline).timed_out() && !slot.resolved {
                return None;
            }
        }
        Some(slot.take())
    }

    pub fn try_take(&self) -> Option<Result<Response>> {
        let mut slot = self.shared.slot.lock();
        if slot.resolved {
            Some(slot.take())
        } else {
            None
        }
    }

    fn poll_take(&self, cx: &mut Context<'_>) -> Poll<Result<Response>> {
        let mut slot = self.shared.slot.lock();
        if slot.resolved {
            return Poll::Ready(slot.take());
        }
        match &slot.waker {
            Some(waker) if waker.will_wake(cx.waker()) => {}
            _ => slot.waker = Some(cx.waker().clone()),
        }
        Poll::Pending
    }
}

/// Pairs a responder with the handle its result arrives on.
pub(crate) fn response_channel() -> (Responder, PendingReply) {
    let shared = Arc::new(Shared::default());
    let sender = ReplySender {
        shared: Some(shared.clone()),
    };
    let responder: Responder = Box::new(move |result| sender.send(result));
    (responder, PendingReply { shared })
}

/// Handle on a stop or seek that finishes when the backend acknowledges it.
///
/// Block on it with [`Completion::wait`] or `.await` it.
#[derive(Debug)]
pub struct Completion {
    reply: PendingReply,
}

impl Completion {
    pub(crate) fn new(reply: PendingReply) -> Self {
        Self { reply }
    }

    /// Block the current thread until the request resolves.
    pub fn wait(self) -> Result<()> {
        self.reply.wait().map(|_| ())
    }

    /// Non-blocking check. Returns the outcome once, then reports
    /// `Disposed` on later calls.
    pub fn try_wait(&mut self) -> Option<Result<()>> {
        self.reply.try_take().map(|result| result.map(|_| ()))
    }

    /// Block for at most `timeout`. `None` means still pending.
    pub fn wait_timeout(&mut self, timeout: Duration) -> Option<Result<()>> {
        self.reply
            .wait_timeout(timeout)
            .map(|result| result.map(|_| ()))
    }
}

impl Future for Completion {
    type Output = Result<()>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.reply.poll_take(cx).map(|result| result.map(|_| ()))
    }
}

struct PendingSeek {
    token: SeekToken,
    responder: Option<Responder>,
}

struct QueuedSeek {
    position_ms: i64,
    responder: Option<Responder>,
}

/// Outcome of submitting a seek
pub(crate) enum Submitted {
    /// Nothing outstanding; send this seek to the backend now
    Dispatch { token: SeekToken, position_ms: i64 },
    /// Waiting behind an outstanding seek. The listed requests were
    /// overtaken and should be resolved as done.
    Queued { superseded: Vec<Responder> },
}

/// Outcome of a matching acknowledgement
pub(crate) struct Acknowledged {
    pub responder: Option<Responder>,
    /// Queued seek that must now be sent to the backend
    pub next: Option<(SeekToken, i64)>,
}

/// Tracks the single seek outstanding at the backend and at most one
/// queued behind it.
pub(crate) struct SeekTracker {
    next_token: u64,
    in_flight: Option<PendingSeek>,
    queued: Option<QueuedSeek>,
}

impl SeekTracker {
    pub fn new() -> Self {
        Self {
            next_token: 1,
            in_flight: None,
            queued: None,
        }
    }

    fn allocate(&mut self) -> SeekToken {
        let token = SeekToken::new(self.next_token);
        self.next_token += 1;
        token
    }

    #[cfg(test)]
    pub fn has_outstanding(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn submit(&mut self, position_ms: i64, responder: Option<Responder>) -> Submitted {
        if self.in_flight.is_none() {
            let token = self.allocate();
            self.in_flight = Some(PendingSeek { token, responder });
            return Submitted::Dispatch { token, position_ms };
        }

        let mut superseded = Vec::new();
        if let Some(responder) = self.in_flight.as_mut().and_then(|p| p.responder.take()) {
            superseded.push(responder);
        }
        if let Some(responder) = self.queued.take().and_then(|q| q.responder) {
            superseded.push(responder);
        }
        self.queued = Some(QueuedSeek {
            position_ms,
            responder,
        });
        Submitted::Queued { superseded }
    }

    /// Match a backend acknowledgement. `None` means the token is stale.
    pub fn acknowledge(&mut self, token: SeekToken) -> Option<Acknowledged> {
        if self.in_flight.as_ref().map(|p| p.token) != Some(token) {
            return None;
        }
        let finished = self.in_flight.take()?;

        let next = match self.queued.take() {
            Some(queued) => {
                let next_token = self.allocate();
                self.in_flight = Some(PendingSeek {
                    token: next_token,
                    responder: queued.responder,
                });
                Some((next_token, queued.position_ms))
            }
            None => None,
        };

        Some(Acknowledged {
            responder: finished.responder,
            next,
        })
    }

    /// Forget everything outstanding and hand back the waiting requests.
    pub fn drain(&mut self) -> Vec<Responder> {
        let mut waiting = Vec::new();
        if let Some(responder) = self.in_flight.take().and_then(|p| p.responder) {
            waiting.push(responder);
        }
        if let Some(responder) = self.queued.take().and_then(|q| q.responder) {
            waiting.push(responder);
        }
        waiting
    }
}
