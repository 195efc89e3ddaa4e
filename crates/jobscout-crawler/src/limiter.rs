use std::num::NonZeroUsize;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::stream::{Fuse, FusedStream, FuturesUnordered};
use futures::{Future, Stream, StreamExt};
use pin_project_lite::pin_project;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;

/// Hands out at most `per_second` permits every second.
///
/// Permits are consumed, not returned, so the refill task is what paces the
/// downloads. Must be created from within a tokio runtime.
#[derive(Debug)]
pub struct RateLimiter {
    permits: Arc<Semaphore>,
    refill: JoinHandle<()>,
}

impl RateLimiter {
    pub fn new(per_second: NonZeroUsize) -> Self {
        let per_second = per_second.get();
        let permits = Arc::new(Semaphore::new(per_second));

        let permits_c = permits.clone();
        let refill = tokio::spawn(async move {
            let mut ticks = tokio::time::interval(Duration::from_secs(1));
            ticks.tick().await;
            loop {
                ticks.tick().await;
                let available = permits_c.available_permits();
                permits_c.add_permits(per_second.saturating_sub(available));
            }
        });

        Self { permits, refill }
    }

    fn try_acquire(&self) -> Option<OwnedSemaphorePermit> {
        self.permits.clone().try_acquire_owned().ok()
    }
}

impl Drop for RateLimiter {
    fn drop(&mut self) {
        self.refill.abort();
    }
}

pin_project! {
    struct Permitted<F> {
        #[pin]
        fut: F,
        permit: Option<OwnedSemaphorePermit>,
    }

    impl<F> PinnedDrop for Permitted<F> {
        fn drop(this: Pin<&mut Self>) {
            let this = this.project();
            if let Some(p) = this.permit.take() { p.forget() }
        }
    }
}

impl<F: Future> Future for Permitted<F> {
    type Output = F::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut Context) -> Poll<Self::Output> {
        self.project().fut.poll(cx)
    }
}

pin_project! {
    /// Stream adaptor running the futures of `stream` as permits allow.
    pub struct RateLimited<St>
    where
        St: Stream,
    {
        #[pin]
        stream: Fuse<St>,
        in_flight: FuturesUnordered<Permitted<St::Item>>,
        limiter: RateLimiter,
    }
}

impl<St> RateLimited<St>
where
    St: Stream,
    St::Item: Future,
{
    pub fn new(stream: St, limiter: RateLimiter) -> Self {
        Self {
            stream: stream.fuse(),
            in_flight: FuturesUnordered::new(),
            limiter,
        }
    }
}

impl<St> Stream for RateLimited<St>
where
    St: Stream,
    St::Item: Future,
{
    type Item = <St::Item as Future>::Output;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        let mut starved = true;
        while let Some(permit) = this.limiter.try_acquire() {
            match this.stream.as_mut().poll_next(cx) {
                Poll::Ready(Some(fut)) => this.in_flight.push(Permitted {
                    fut,
                    permit: Some(permit),
                }),
                // Unused permit goes back to the semaphore
                Poll::Ready(None) | Poll::Pending => {
                    starved = false;
                    break;
                }
            }
        }

        match this.in_flight.poll_next_unpin(cx) {
            x @ Poll::Pending | x @ Poll::Ready(Some(_)) => return x,
            Poll::Ready(None) => {}
        }

        if this.stream.is_done() {
            Poll::Ready(None)
        } else {
            if starved {
                // Nothing registered a waker, poll again around the next refill.
                let waker = cx.waker().clone();
                tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    waker.wake();
                });
            }
            Poll::Pending
        }
    }
}

impl<St> FusedStream for RateLimited<St>
where
    St: Stream,
    St::Item: Future,
{
    fn is_terminated(&self) -> bool {
        self.in_flight.is_terminated() && self.stream.is_terminated()
    }
}

pub trait RateLimitedExt: Stream {
    fn rate_limited(self, limiter: RateLimiter) -> RateLimited<Self>
    where
        Self::Item: Future,
        Self: Sized,
    {
        RateLimited::new(self, limiter)
    }
}

impl<T: ?Sized> RateLimitedExt for T where T: Stream {}
