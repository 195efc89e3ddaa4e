mod seeds;
mod spider;
pub mod writer;

pub use seeds::{load_seeds, read_seeds, SeedEntry};
pub use spider::{
    crawl_careers, crawl_careers_with, discover_page, resolve_page, JobSpider, JobSpiderConfig,
    Visit,
};

pub use anyhow;
pub use jobscout_crawler;
pub use jobscout_extract;
