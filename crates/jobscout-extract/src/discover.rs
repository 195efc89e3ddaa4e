use std::collections::HashSet;

use anyhow::Result;
use lazy_static::lazy_static;
use sws_scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::config::ExtractConfig;
use crate::dom::{attr, flat_text, is_tag};
use crate::link::resolve_link;
use crate::model::JobCandidate;
use crate::relevance::RelevanceFilter;
use crate::structured::{positions, ScriptVariable};
use crate::text::normalize;

lazy_static! {
    static ref CANDIDATES: Selector =
        Selector::parse("a[href], button, div, li, h1, h2, h3, h4, h5, h6, span").unwrap();
}

/// A posting found on a listing page.
#[derive(Debug, Clone, PartialEq)]
pub enum Discovery {
    /// Has a page of its own to resolve
    Follow(JobCandidate),
    /// Complete as found, no page to fetch
    Inline(JobCandidate),
}

impl Discovery {
    pub fn candidate(&self) -> &JobCandidate {
        match self {
            Self::Follow(c) | Self::Inline(c) => c,
        }
    }
}

type HrefLocator = fn(&ElementRef) -> Option<String>;

/// Where the link of a title element may be, in the order tried.
const LOCATORS: [HrefLocator; 4] = [own_href, ancestor_href, prev_sibling_href, next_sibling_href];

fn anchor_href(element: &ElementRef) -> Option<String> {
    if is_tag(element, "a") {
        attr(element, "href")
    } else {
        None
    }
}

fn own_href(element: &ElementRef) -> Option<String> {
    anchor_href(element)
}

fn ancestor_href(element: &ElementRef) -> Option<String> {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|e| is_tag(e, "a"))
        .and_then(|a| attr(&a, "href"))
}

// Only the nearest sibling anchor counts, even without an href
fn prev_sibling_href(element: &ElementRef) -> Option<String> {
    element
        .prev_siblings()
        .filter_map(ElementRef::wrap)
        .find(|e| is_tag(e, "a"))
        .and_then(|a| anchor_href(&a))
}

fn next_sibling_href(element: &ElementRef) -> Option<String> {
    element
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .find(|e| is_tag(e, "a"))
        .and_then(|a| anchor_href(&a))
}

/// Finds job postings on a careers listing page.
#[derive(Debug, Clone)]
pub struct CandidateDiscoverer {
    filter: RelevanceFilter,
    positions: ScriptVariable,
}

impl CandidateDiscoverer {
    pub fn new(config: &ExtractConfig) -> Result<Self> {
        Ok(Self {
            filter: RelevanceFilter::new(config)?,
            positions: ScriptVariable::new(&config.listing_marker)?,
        })
    }

    /// Script-embedded positions when the page has any, element discovery
    /// otherwise.
    pub fn scan_listing(&self, document: &Html, page_url: &Url, company: &str) -> Vec<Discovery> {
        match self.embedded(document, page_url, company) {
            Some(found) => {
                log::debug!("{}: {} embedded positions", page_url, found.len());
                found
            }
            None => self
                .discover(document, page_url, company)
                .into_iter()
                .map(Discovery::Follow)
                .collect(),
        }
    }

    pub fn scan_listing_page(&self, page: &str, page_url: &Url, company: &str) -> Vec<Discovery> {
        self.scan_listing(&Html::parse_document(page), page_url, company)
    }

    /// Relevant positions of the script-embedded list, `None` when the page
    /// has no such list.
    ///
    /// Positions with a usable URL are to be followed. Positions without a URL
    /// are inline postings, carrying whatever description the list embeds. A
    /// URL leading back to the page or outside http is dropped.
    pub fn embedded(&self, document: &Html, page_url: &Url, company: &str) -> Option<Vec<Discovery>> {
        let value = self.positions.find(document)?;
        let found = positions(&value);
        if found.is_empty() {
            return None;
        }

        let mut seen = HashSet::new();
        let discoveries = found
            .into_iter()
            .filter_map(|position| {
                let title = self.filter.accept(&normalize(position.title.as_deref()?))?.to_string();
                let href = match position.url.as_deref() {
                    Some(url) => Some(resolve_link(Some(url), page_url)?),
                    None => None,
                };
                if let Some(href) = &href {
                    if !seen.insert(href.clone()) {
                        return None;
                    }
                }
                let candidate =
                    JobCandidate::discovered(company, Some(title), href, page_url.clone());
                Some(if candidate.href().is_some() {
                    Discovery::Follow(candidate)
                } else {
                    Discovery::Inline(candidate.into_inline(position.description))
                })
            })
            .collect();

        Some(discoveries)
    }

    /// Candidates from the page elements: a relevant visible text, and a link
    /// near it that does not lead back to the page. Each href is kept once,
    /// for the first element in document order.
    pub fn discover(&self, document: &Html, page_url: &Url, company: &str) -> Vec<JobCandidate> {
        let mut seen = HashSet::new();

        document
            .select(CANDIDATES.clone())
            .filter_map(|element| {
                let text = flat_text(&element);
                let title = self.filter.accept(&text)?;
                let href = LOCATORS
                    .iter()
                    .find_map(|locate| resolve_link(locate(&element).as_deref(), page_url))?;
                seen.insert(href.clone()).then(|| {
                    JobCandidate::discovered(company, Some(title.to_string()), Some(href), page_url.clone())
                })
            })
            .collect()
    }
}

impl Default for CandidateDiscoverer {
    fn default() -> Self {
        Self::new(&ExtractConfig::default()).expect("default config is valid")
    }
}
