use std::collections::HashMap;
use std::io::prelude::*;

use anyhow::{anyhow, Result};
use flate2::read::GzDecoder;
use futures::future::{self, BoxFuture};
use futures::FutureExt;
use reqwest::header::CONTENT_TYPE;

use crate::config::CrawlerConfig;

/// Downloads a page body. Retries and rate limits live behind this seam.
pub trait Fetcher: Send + Sync {
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<String>>;
}

#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(config: &CrawlerConfig) -> Result<Self> {
        let mut builder = reqwest::ClientBuilder::new()
            .gzip(true)
            .deflate(true)
            .user_agent(&config.user_agent)
            .danger_accept_invalid_certs(config.accept_invalid_certs);
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }

    async fn download(&self, url: &str) -> Result<String> {
        let resp = self.client.get(url).send().await?.error_for_status()?;

        let page = match resp.headers().get(CONTENT_TYPE) {
            Some(c) if c == "application/x-gzip" || c == "application/gzip" => {
                let compressed = resp.bytes().await?;
                let mut gz = GzDecoder::new(&compressed[..]);
                let mut page = String::new();
                gz.read_to_string(&mut page)?;
                page
            }
            _ => resp.text().await?,
        };

        Ok(page)
    }
}

impl Fetcher for HttpFetcher {
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<String>> {
        self.download(url).boxed()
    }
}

/// Serves pages from memory, unknown URLs fail like a network error.
#[derive(Debug, Clone, Default)]
pub struct StaticFetcher {
    pages: HashMap<String, String>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.pages.insert(url.into(), body.into());
        self
    }
}

impl Fetcher for StaticFetcher {
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<String>> {
        let page = self
            .pages
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow!("No page at {url}"));
        future::ready(page).boxed()
    }
}
