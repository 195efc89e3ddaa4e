use std::num::NonZeroUsize;

use crossbeam_channel::{unbounded, Receiver, Sender};
use jobscout_crawler::{
    crawl_with, CountedTx, CrawlerConfig, OnError, PageLocation, Request, Scrapable,
    ScrapingContext, StaticFetcher, Throttle,
};

/// Follows `<next>` markers up to a depth and reports what it saw.
struct ChainScraper {
    seed: Vec<String>,
    tx_seen: Sender<(String, usize)>,
    tx_req: Option<CountedTx<usize>>,
}

#[derive(Clone)]
struct ChainConfig {
    seed: Vec<String>,
    tx_seen: Sender<(String, usize)>,
}

impl Scrapable for ChainScraper {
    type Config = ChainConfig;
    type Context = usize;

    fn new(config: &ChainConfig) -> anyhow::Result<Self> {
        Ok(Self {
            seed: config.seed.clone(),
            tx_seen: config.tx_seen.clone(),
            tx_req: None,
        })
    }

    fn init(&mut self, tx_req: CountedTx<usize>) {
        self.tx_req = Some(tx_req);
    }

    fn seed(&self) -> Vec<Request<usize>> {
        self.seed.iter().map(|url| Request::new(url, 0)).collect()
    }

    fn scrap(&mut self, page: String, ctx: ScrapingContext<usize>) -> anyhow::Result<()> {
        let (location, depth) = ctx.into_parts();
        let PageLocation::Url(url) = location;
        if page.contains("boom") {
            anyhow::bail!("Bad page {url}");
        }
        self.tx_seen.send((url, depth)).ok();
        if let Some(next) = page.strip_prefix("next:") {
            if let Some(tx) = &self.tx_req {
                tx.send(Request::new(next.trim(), depth + 1));
            }
        }
        Ok(())
    }
}

fn setup(seed: &[&str]) -> (ChainConfig, Receiver<(String, usize)>) {
    let (tx_seen, rx_seen) = unbounded();
    let conf = ChainConfig {
        seed: seed.iter().map(|s| s.to_string()).collect(),
        tx_seen,
    };
    (conf, rx_seen)
}

fn crawler_conf() -> CrawlerConfig {
    CrawlerConfig {
        num_workers: 2,
        handle_sigint: false,
        ..Default::default()
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn follows_requests_and_carries_context() {
    let fetcher = StaticFetcher::new()
        .with_page("https://a.test/0", "next: https://a.test/1")
        .with_page("https://a.test/1", "next: https://a.test/2")
        .with_page("https://a.test/2", "end");
    let (conf, rx_seen) = setup(&["https://a.test/0"]);

    crawl_with::<ChainScraper, _>(&crawler_conf(), &conf, &fetcher)
        .await
        .unwrap();
    drop(conf);

    let mut seen = rx_seen.iter().collect::<Vec<_>>();
    seen.sort();
    assert_eq!(
        seen,
        vec![
            ("https://a.test/0".to_string(), 0),
            ("https://a.test/1".to_string(), 1),
            ("https://a.test/2".to_string(), 2),
        ]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_download_is_skipped() {
    let fetcher = StaticFetcher::new()
        .with_page("https://a.test/0", "next: https://a.test/missing")
        .with_page("https://b.test/0", "end");
    let (conf, rx_seen) = setup(&["https://a.test/0", "https://b.test/0"]);

    crawl_with::<ChainScraper, _>(&crawler_conf(), &conf, &fetcher)
        .await
        .unwrap();
    drop(conf);

    assert_eq!(rx_seen.iter().count(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_download_aborts_when_configured() {
    let fetcher = StaticFetcher::new();
    let (conf, _rx_seen) = setup(&["https://a.test/missing"]);
    let crawler_conf = CrawlerConfig {
        on_dl_error: OnError::Fail,
        ..crawler_conf()
    };

    let res = crawl_with::<ChainScraper, _>(&crawler_conf, &conf, &fetcher).await;
    assert!(res.is_err());
}

#[tokio::test(flavor = "multi_thread")]
async fn scrap_error_aborts_when_configured() {
    let fetcher = StaticFetcher::new().with_page("https://a.test/0", "boom");
    let (conf, _rx_seen) = setup(&["https://a.test/0"]);
    let crawler_conf = CrawlerConfig {
        on_scrap_error: OnError::Fail,
        ..crawler_conf()
    };

    let err = crawl_with::<ChainScraper, _>(&crawler_conf, &conf, &fetcher)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Bad page"));
}

#[tokio::test(flavor = "multi_thread")]
async fn empty_seed_terminates() {
    let fetcher = StaticFetcher::new();
    let (conf, rx_seen) = setup(&[]);

    crawl_with::<ChainScraper, _>(&crawler_conf(), &conf, &fetcher)
        .await
        .unwrap();
    drop(conf);

    assert_eq!(rx_seen.iter().count(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn throttled_crawl_visits_every_page() {
    let fetcher = StaticFetcher::new()
        .with_page("https://a.test/0", "next: https://a.test/1")
        .with_page("https://a.test/1", "end")
        .with_page("https://b.test/0", "end");
    let (conf, rx_seen) = setup(&["https://a.test/0", "https://b.test/0"]);

    for throttle in [
        Throttle::Concurrent(NonZeroUsize::new(1).unwrap()),
        Throttle::PerSecond(NonZeroUsize::new(10).unwrap()),
        Throttle::Delay(0.01),
    ] {
        let crawler_conf = CrawlerConfig {
            throttle: Some(throttle),
            ..crawler_conf()
        };
        crawl_with::<ChainScraper, _>(&crawler_conf, &conf, &fetcher)
            .await
            .unwrap();
    }
    drop(conf);

    assert_eq!(rx_seen.iter().count(), 9);
}
