//! Discovery of job postings on careers pages and resolution of their
//! descriptions.
//!
//! Everything here is synchronous and works on already fetched pages.

mod config;
mod discover;
pub mod dom;
mod heuristic;
mod link;
mod model;
mod relevance;
mod resolve;
pub mod structured;
pub mod text;

pub use config::ExtractConfig;
pub use discover::{CandidateDiscoverer, Discovery};
pub use heuristic::HtmlExtractor;
pub use link::{company_from_url, resolve_link};
pub use model::{Extraction, JobCandidate, ResolvedVia};
pub use relevance::{RelevanceFilter, Verdict};
pub use resolve::{EmbeddedScript, HtmlHeuristic, JsonLd, ResolutionChain, Strategy};

pub use sws_scraper::Html;
pub use url::Url;
