use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Error, Result};
use futures::stream::LocalBoxStream;
use futures::{future, try_join, StreamExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::config::{CrawlerConfig, OnError, Throttle};
use crate::fetcher::{Fetcher, HttpFetcher};
use crate::limiter::{RateLimitedExt, RateLimiter};
use crate::scrapable::{CountedTx, PageLocation, Request, Scrapable, ScrapingContext};

const POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug)]
struct Page<C> {
    page: String,
    location: PageLocation,
    context: C,
}

fn until_err<T, E>(
    err: &mut &mut Result<(), E>,
    item: Result<T, E>,
) -> impl Future<Output = Option<T>> {
    match item {
        Ok(item) => future::ready(Some(item)),
        Err(e) => {
            **err = Err(e);
            future::ready(None)
        }
    }
}

/// Crawls with the default HTTP fetcher.
pub async fn crawl_site<T>(crawler_conf: &CrawlerConfig, scraper_conf: &T::Config) -> Result<()>
where
    T: Scrapable,
{
    let fetcher = HttpFetcher::new(crawler_conf)?;
    crawl_with::<T, _>(crawler_conf, scraper_conf, &fetcher).await
}

/// Runs the crawl until every scheduled request has been scraped or dropped.
///
/// Downloads happen on the async side, bounded by the configured throttle.
/// Pages are scraped on `num_workers` dedicated threads, each owning its own
/// scraper built from `scraper_conf`; scrapers schedule follow-up requests
/// through the [`CountedTx`] given to [`Scrapable::init`].
pub async fn crawl_with<T, F>(
    crawler_conf: &CrawlerConfig,
    scraper_conf: &T::Config,
    fetcher: &F,
) -> Result<()>
where
    T: Scrapable,
    F: Fetcher,
{
    let pages_in = Arc::new(AtomicUsize::new(0));
    let pages_out = Arc::new(AtomicUsize::new(0));

    let (tx_stop, rx_stop) = crossbeam_channel::unbounded::<()>();
    let (tx_req, rx_req) = mpsc::unbounded_channel::<Request<T::Context>>();
    let (tx_page, rx_page) =
        crossbeam_channel::bounded::<Page<T::Context>>(crawler_conf.page_buffer);

    let tx_req = CountedTx::new(tx_req, pages_in.clone());

    // Workers

    let stop = Arc::new(AtomicBool::new(false));
    let num_workers = crawler_conf.num_workers.max(1);
    let mut workers = vec![];
    for id in 0..num_workers {
        let rx_stop = rx_stop.clone();
        let rx_page = rx_page.clone();
        let tx_req = tx_req.clone();
        let pages_out = pages_out.clone();
        let scraper_conf = scraper_conf.clone();
        let on_scrap_error = crawler_conf.on_scrap_error;
        let stop = stop.clone();
        let worker = thread::Builder::new()
            .name(format!("{id}"))
            .spawn(move || {
                let mut scraper = <T as Scrapable>::new(&scraper_conf)?;
                scraper.init(tx_req);
                loop {
                    crossbeam_channel::select! {
                        recv(rx_page) -> page => {
                            let Ok(Page { page, location, context }) = page else { break };
                            let ctx = ScrapingContext::new(location.clone(), context);
                            let res = scraper.scrap(page, ctx);
                            pages_out.fetch_add(1, Ordering::SeqCst);
                            if let Err(e) = res {
                                match on_scrap_error {
                                    OnError::SkipAndLog => {
                                        log::error!("Skipping scrap for page {location} got: {e}");
                                    }
                                    OnError::Fail => {
                                        stop.store(true, Ordering::SeqCst);
                                        return Err(e);
                                    }
                                }
                            }
                        },
                        recv(rx_stop) -> _ => break
                    }
                }
                Ok::<(), Error>(())
            })?;
        workers.push(worker);
    }
    drop(rx_page);
    let workers = async move {
        tokio::task::spawn_blocking(|| {
            for w in workers {
                w.join().map_err(|_| anyhow!("Worker thread panicked"))??;
            }
            Ok::<(), Error>(())
        })
        .await?
    };

    // Downloader

    let pages_in_c = pages_in.clone();
    let downloader = async move {
        let downloads = UnboundedReceiverStream::new(rx_req).map(move |req| {
            let pages_in = pages_in_c.clone();
            async move {
                let Request { url, context } = req;
                match fetcher.fetch(&url).await {
                    Ok(page) => Ok(Page {
                        page,
                        location: PageLocation::Url(url),
                        context,
                    }),
                    Err(e) => {
                        pages_in.fetch_sub(1, Ordering::SeqCst);
                        Err(anyhow!("Couldn't download {url} got: {e}"))
                    }
                }
            }
        });

        let stream: LocalBoxStream<'_, Result<Page<T::Context>>> = match crawler_conf.throttle {
            None => downloads
                .buffer_unordered(crawler_conf.concurrent_downloads.max(1))
                .boxed_local(),
            Some(Throttle::Concurrent(n)) => downloads.buffer_unordered(n.get()).boxed_local(),
            Some(Throttle::PerSecond(n)) => downloads
                .rate_limited(RateLimiter::new(n))
                .boxed_local(),
            Some(Throttle::Delay(secs)) => {
                let delay = Duration::from_secs_f32(secs.max(0.0));
                downloads
                    .then(move |dl| async move {
                        let page = dl.await;
                        tokio::time::sleep(delay).await;
                        page
                    })
                    .boxed_local()
            }
        };

        match crawler_conf.on_dl_error {
            OnError::Fail => {
                let mut err = Ok::<(), Error>(());
                stream
                    .scan(&mut err, until_err)
                    .map(|page| tx_page.send(page).ok())
                    .collect::<Vec<_>>()
                    .await;
                err
            }
            OnError::SkipAndLog => {
                stream
                    .filter_map(|dl| async move { dl.map_err(|e| log::warn!("Skipping URL: {e}")).ok() })
                    .map(|page| tx_page.send(page).ok())
                    .collect::<Vec<_>>()
                    .await;
                Ok(())
            }
        }
    };

    // Seeds

    let mut scraper = <T as Scrapable>::new(scraper_conf)?;
    let seeds = scraper.seed();
    log::info!("Crawling from {} seed(s)", seeds.len());
    seeds.into_iter().for_each(|req| tx_req.send(req));
    drop(tx_req);

    // Run all tasks

    let handle_sigint = crawler_conf.handle_sigint;
    let done = async move {
        loop {
            if handle_sigint {
                if tokio::time::timeout(POLL_INTERVAL, tokio::signal::ctrl_c())
                    .await
                    .is_ok()
                {
                    return Err(anyhow!("Interrupted"));
                }
            } else {
                tokio::time::sleep(POLL_INTERVAL).await;
            }
            // A failed worker reports its own error once joined
            if stop.load(Ordering::SeqCst)
                || pages_out.load(Ordering::SeqCst) == pages_in.load(Ordering::SeqCst)
            {
                for _ in 0..num_workers {
                    tx_stop.send(()).ok();
                }
                return Ok(());
            }
        }
    };

    let res = try_join!(workers, downloader, done);
    scraper.finalizer();
    res?;

    Ok(())
}
