use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

pub trait Scrapable {
    type Config: Clone + Send + 'static;

    /// State carried with every scheduled request, handed back with its page.
    type Context: Send + 'static;

    fn new(config: &Self::Config) -> anyhow::Result<Self>
    where
        Self: Sized;

    fn init(&mut self, _tx_req: CountedTx<Self::Context>) {}

    fn seed(&self) -> Vec<Request<Self::Context>>;

    fn scrap(&mut self, page: String, ctx: ScrapingContext<Self::Context>) -> anyhow::Result<()>;

    fn finalizer(&mut self) {}
}

/// A page to download, owning the context its continuation will receive.
#[derive(Debug, Clone)]
pub struct Request<C> {
    pub url: String,
    pub context: C,
}

impl<C> Request<C> {
    pub fn new(url: impl Into<String>, context: C) -> Self {
        Self {
            url: url.into(),
            context,
        }
    }
}

/// Where a scraped page was downloaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageLocation {
    Url(String),
}

impl fmt::Display for PageLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url(url) => write!(f, "{url}"),
        }
    }
}

#[derive(Debug)]
pub struct ScrapingContext<C> {
    location: PageLocation,
    context: C,
}

impl<C> ScrapingContext<C> {
    pub fn new(location: PageLocation, context: C) -> Self {
        Self { location, context }
    }

    pub fn location(&self) -> &PageLocation {
        &self.location
    }

    pub fn context(&self) -> &C {
        &self.context
    }

    pub fn into_parts(self) -> (PageLocation, C) {
        (self.location, self.context)
    }
}

#[derive(Debug)]
pub struct CountedTx<C> {
    tx: mpsc::UnboundedSender<Request<C>>,
    counter: Arc<AtomicUsize>,
}

impl<C> Clone for CountedTx<C> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            counter: self.counter.clone(),
        }
    }
}

impl<C> CountedTx<C> {
    pub fn new(tx: mpsc::UnboundedSender<Request<C>>, counter: Arc<AtomicUsize>) -> Self {
        Self { tx, counter }
    }

    pub fn send(&self, req: Request<C>) {
        // Count first: a failed download decrements, possibly before send returns.
        self.counter.fetch_add(1, Ordering::SeqCst);
        if let Err(e) = self.tx.send(req) {
            self.counter.fetch_sub(1, Ordering::SeqCst);
            log::error!("Couldn't send request for {}", e.0.url);
        }
    }
}
