mod config;
mod crawler;
mod fetcher;
mod limiter;
mod scrapable;

pub use config::{CrawlerConfig, OnError, Throttle};
pub use crawler::{crawl_site, crawl_with};
pub use fetcher::{Fetcher, HttpFetcher, StaticFetcher};
pub use limiter::{RateLimited, RateLimitedExt, RateLimiter};
pub use scrapable::{CountedTx, PageLocation, Request, Scrapable, ScrapingContext};

pub use anyhow;
