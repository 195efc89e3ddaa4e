use anyhow::{anyhow, Result};
use lazy_static::lazy_static;
use regex::{Regex, RegexBuilder};
use sws_scraper::{Html, Selector};

use crate::config::ExtractConfig;
use crate::dom::{flat_text, remove_all};
use crate::model::Extraction;

lazy_static! {
    static ref NOT_TEXT: Selector = Selector::parse("script, style").unwrap();
    static ref BLOCKS: Selector =
        Selector::parse("div, section, article, main, p, ul, ol").unwrap();
    static ref HEADING: Selector = Selector::parse("h1").unwrap();
}

/// Main-content extraction for pages without structured data.
#[derive(Debug, Clone)]
pub struct HtmlExtractor {
    containers: Vec<Selector>,
    min_len: usize,
    markers: Option<Regex>,
}

impl HtmlExtractor {
    pub fn new(config: &ExtractConfig) -> Result<Self> {
        let containers = config
            .content_selectors
            .iter()
            .map(|css| {
                Selector::parse(css).map_err(|e| anyhow!("Invalid content selector {css}: {e:?}"))
            })
            .collect::<Result<Vec<_>>>()?;

        let markers = config
            .section_markers
            .iter()
            .map(|m| regex::escape(m.trim()))
            .filter(|m| !m.is_empty())
            .collect::<Vec<_>>();
        let markers = if markers.is_empty() {
            None
        } else {
            Some(
                RegexBuilder::new(&markers.join("|"))
                    .case_insensitive(true)
                    .build()?,
            )
        };

        Ok(Self {
            containers,
            min_len: config.min_description_len,
            markers,
        })
    }

    /// Strips scripts and styles from `document`, then looks for its content.
    ///
    /// The first content selector with a match gives the candidate text. When
    /// none matches, or its text is too short to be a job description, the
    /// last block mentioning a section marker is taken instead.
    pub fn extract(&self, document: &Html) -> Extraction {
        remove_all(document, &NOT_TEXT);

        let content = self.containers.iter().find_map(|selector| {
            document
                .select(selector.clone())
                .next()
                .map(|container| flat_text(&container))
        });

        let description = match content {
            Some(text) if text.chars().count() >= self.min_len => Some(text),
            short => self.marked_section(document).or(short),
        }
        .filter(|text| !text.is_empty());

        let title = document
            .select(HEADING.clone())
            .map(|h1| flat_text(&h1))
            .find(|t| !t.is_empty());

        Extraction { description, title }
    }

    fn marked_section(&self, document: &Html) -> Option<String> {
        let markers = self.markers.as_ref()?;
        document
            .select(BLOCKS.clone())
            .map(|block| flat_text(&block))
            .filter(|text| markers.is_match(text))
            .last()
    }
}

impl Default for HtmlExtractor {
    fn default() -> Self {
        Self::new(&ExtractConfig::default()).expect("default config is valid")
    }
}
