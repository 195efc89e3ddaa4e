use anyhow::Result;
use sws_scraper::Html;

use crate::config::ExtractConfig;
use crate::heuristic::HtmlExtractor;
use crate::model::{Extraction, JobCandidate, ResolvedVia};
use crate::structured::{detail_description, detail_title, json_ld_posting, ScriptVariable};

/// One way of recovering a job description from a fetched page.
///
/// Strategies never fail: malformed data is "nothing found".
pub trait Strategy {
    fn via(&self) -> ResolvedVia;

    fn extract(&self, document: &Html) -> Option<Extraction>;
}

/// Position detail assigned to a script variable.
pub struct EmbeddedScript(ScriptVariable);

impl Strategy for EmbeddedScript {
    fn via(&self) -> ResolvedVia {
        ResolvedVia::Js
    }

    fn extract(&self, document: &Html) -> Option<Extraction> {
        let position = self.0.find(document)?;
        Some(Extraction {
            description: detail_description(&position),
            title: detail_title(&position),
        })
    }
}

/// Schema.org `JobPosting` data.
pub struct JsonLd;

impl Strategy for JsonLd {
    fn via(&self) -> ResolvedVia {
        ResolvedVia::JsonLd
    }

    fn extract(&self, document: &Html) -> Option<Extraction> {
        json_ld_posting(document)
    }
}

pub struct HtmlHeuristic(HtmlExtractor);

impl Strategy for HtmlHeuristic {
    fn via(&self) -> ResolvedVia {
        ResolvedVia::HtmlExtract
    }

    fn extract(&self, document: &Html) -> Option<Extraction> {
        Some(self.0.extract(document))
    }
}

/// Strategies tried in a fixed order on a job page, first success wins.
pub struct ResolutionChain {
    strategies: Vec<Box<dyn Strategy>>,
}

impl ResolutionChain {
    pub fn new(config: &ExtractConfig) -> Result<Self> {
        Ok(Self::with_strategies(vec![
            Box::new(EmbeddedScript(ScriptVariable::new(&config.detail_marker)?)),
            Box::new(JsonLd),
            Box::new(HtmlHeuristic(HtmlExtractor::new(config)?)),
        ]))
    }

    pub fn with_strategies(strategies: Vec<Box<dyn Strategy>>) -> Self {
        Self { strategies }
    }

    /// A strategy succeeds with a non-empty description. Without any success
    /// the last strategy tried is reported, with whatever title it found.
    pub fn resolve(&self, document: &Html) -> (ResolvedVia, Extraction) {
        let mut last = (ResolvedVia::HtmlExtract, Extraction::default());

        for strategy in &self.strategies {
            let extraction = strategy.extract(document).unwrap_or_default();
            log::trace!("{} found description: {}", strategy.via(), extraction.is_found());
            if extraction.is_found() {
                return (strategy.via(), extraction);
            }
            last = (strategy.via(), Extraction {
                description: None,
                title: extraction.title.or(last.1.title),
            });
        }

        last
    }

    pub fn resolve_page(&self, page: &str) -> (ResolvedVia, Extraction) {
        self.resolve(&Html::parse_document(page))
    }

    /// Moves a discovered candidate to its resolved stage.
    pub fn resolve_candidate(&self, candidate: JobCandidate, page: &str) -> JobCandidate {
        let (via, extraction) = self.resolve_page(page);
        candidate.resolve(via, extraction)
    }
}

impl Default for ResolutionChain {
    fn default() -> Self {
        Self::new(&ExtractConfig::default()).expect("default config is valid")
    }
}
