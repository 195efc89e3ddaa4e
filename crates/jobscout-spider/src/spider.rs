use anyhow::{anyhow, Result};
use crossbeam_channel::Sender;
use jobscout_crawler::{
    crawl_site, crawl_with, CountedTx, CrawlerConfig, Fetcher, PageLocation, Request, Scrapable,
    ScrapingContext,
};
use jobscout_extract::{
    CandidateDiscoverer, Discovery, ExtractConfig, JobCandidate, ResolutionChain, Url,
};

use crate::seeds::SeedEntry;
use crate::writer::{OutputConfig, WriterThread};

/// What a scheduled page is expected to be.
#[derive(Debug, Clone, PartialEq)]
pub enum Visit {
    /// A careers page listing postings
    Listing { company: String },
    /// The page of a discovered posting
    Posting(JobCandidate),
}

#[derive(Debug, Clone)]
pub struct JobSpiderConfig {
    pub seeds: Vec<SeedEntry>,
    pub extract: ExtractConfig,
    pub tx_record: Sender<JobCandidate>,
}

/// Listing pages yield candidates, candidate pages yield resolved records.
pub struct JobSpider {
    seeds: Vec<SeedEntry>,
    discoverer: CandidateDiscoverer,
    chain: ResolutionChain,
    tx_req: Option<CountedTx<Visit>>,
    tx_record: Sender<JobCandidate>,
}

impl JobSpider {
    fn follow(&self, candidate: JobCandidate) -> Result<()> {
        let tx_req = self
            .tx_req
            .as_ref()
            .ok_or_else(|| anyhow!("Spider not initialized, can't follow candidates"))?;
        if let Some(href) = candidate.href().map(Url::to_string) {
            log::debug!("Following {} ({})", href, candidate.title().unwrap_or_default());
            tx_req.send(Request::new(href, Visit::Posting(candidate)));
        }
        Ok(())
    }

    fn emit(&self, record: JobCandidate) {
        log::debug!(
            "Resolved {} via {}",
            record.href().map_or(record.source_url().as_str(), Url::as_str),
            record.resolved_via().map_or("-", |v| v.as_str()),
        );
        if let Err(e) = self.tx_record.send(record) {
            log::error!("Couldn't emit record: {e}");
        }
    }
}

impl Scrapable for JobSpider {
    type Config = JobSpiderConfig;
    type Context = Visit;

    fn new(config: &JobSpiderConfig) -> Result<Self> {
        Ok(Self {
            seeds: config.seeds.clone(),
            discoverer: CandidateDiscoverer::new(&config.extract)?,
            chain: ResolutionChain::new(&config.extract)?,
            tx_req: None,
            tx_record: config.tx_record.clone(),
        })
    }

    fn init(&mut self, tx_req: CountedTx<Visit>) {
        self.tx_req = Some(tx_req);
    }

    fn seed(&self) -> Vec<Request<Visit>> {
        self.seeds
            .iter()
            .map(|seed| {
                Request::new(
                    seed.careers_url.as_str(),
                    Visit::Listing {
                        company: seed.company.clone(),
                    },
                )
            })
            .collect()
    }

    fn scrap(&mut self, page: String, ctx: ScrapingContext<Visit>) -> Result<()> {
        let (location, visit) = ctx.into_parts();

        match visit {
            Visit::Listing { company } => {
                let page_url = page_url(&location)?;
                let found = self.discoverer.scan_listing_page(&page, &page_url, &company);
                log::info!("{page_url}: {} candidates", found.len());
                for discovery in found {
                    match discovery {
                        Discovery::Follow(candidate) => self.follow(candidate)?,
                        Discovery::Inline(record) => self.emit(record),
                    }
                }
            }
            Visit::Posting(candidate) => {
                self.emit(self.chain.resolve_candidate(candidate, &page));
            }
        }

        Ok(())
    }
}

fn page_url(location: &PageLocation) -> Result<Url> {
    let PageLocation::Url(url) = location;
    Ok(Url::parse(url)?)
}

/// Crawls the seeds with the default HTTP fetcher, records go to `output`.
///
/// Returns the number of written records.
pub async fn crawl_careers(
    crawler_conf: &CrawlerConfig,
    seeds: Vec<SeedEntry>,
    extract: ExtractConfig,
    output: &OutputConfig,
) -> Result<usize> {
    let (spider_conf, writer) = start(seeds, extract, output)?;
    let crawled = crawl_site::<JobSpider>(crawler_conf, &spider_conf).await;
    finish(spider_conf, writer, crawled).await
}

pub async fn crawl_careers_with<F: Fetcher>(
    crawler_conf: &CrawlerConfig,
    seeds: Vec<SeedEntry>,
    extract: ExtractConfig,
    output: &OutputConfig,
    fetcher: &F,
) -> Result<usize> {
    let (spider_conf, writer) = start(seeds, extract, output)?;
    let crawled = crawl_with::<JobSpider, F>(crawler_conf, &spider_conf, fetcher).await;
    finish(spider_conf, writer, crawled).await
}

fn start(
    seeds: Vec<SeedEntry>,
    extract: ExtractConfig,
    output: &OutputConfig,
) -> Result<(JobSpiderConfig, WriterThread)> {
    let (tx_record, writer) = WriterThread::spawn(output)?;
    let spider_conf = JobSpiderConfig {
        seeds,
        extract,
        tx_record,
    };
    Ok((spider_conf, writer))
}

async fn finish(
    spider_conf: JobSpiderConfig,
    writer: WriterThread,
    crawled: Result<()>,
) -> Result<usize> {
    // The writer stops once the last record sender is gone
    drop(spider_conf);
    let written = tokio::task::spawn_blocking(move || writer.join()).await??;
    crawled?;
    log::info!("{written} records written");
    Ok(written)
}

/// Runs the listing stage on a single page.
pub fn discover_page(
    extract: &ExtractConfig,
    page: &str,
    page_url: &Url,
    company: &str,
) -> Result<Vec<JobCandidate>> {
    let discoverer = CandidateDiscoverer::new(extract)?;
    let found = discoverer
        .scan_listing_page(page, page_url, company)
        .into_iter()
        .map(|discovery| match discovery {
            Discovery::Follow(candidate) | Discovery::Inline(candidate) => candidate,
        })
        .collect();
    Ok(found)
}

/// Runs the resolution chain on a single job page.
pub fn resolve_page(extract: &ExtractConfig, page: &str, page_url: &Url) -> Result<JobCandidate> {
    let chain = ResolutionChain::new(extract)?;
    let candidate = JobCandidate::discovered("", None, Some(page_url.clone()), page_url.clone());
    Ok(chain.resolve_candidate(candidate, page))
}
