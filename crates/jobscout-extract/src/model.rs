use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

/// Which technique produced a record's description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResolvedVia {
    #[serde(rename = "js")]
    Js,
    #[serde(rename = "json-ld")]
    JsonLd,
    #[serde(rename = "html_extract")]
    HtmlExtract,
    #[serde(rename = "inline")]
    Inline,
}

impl ResolvedVia {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Js => "js",
            Self::JsonLd => "json-ld",
            Self::HtmlExtract => "html_extract",
            Self::Inline => "inline",
        }
    }
}

impl fmt::Display for ResolvedVia {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a strategy recovered from a page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub description: Option<String>,
    pub title: Option<String>,
}

impl Extraction {
    pub fn description(description: impl Into<String>) -> Self {
        Self {
            description: Some(description.into()),
            title: None,
        }
    }

    pub fn with_title(mut self, title: Option<String>) -> Self {
        self.title = title;
        self
    }

    /// A strategy only succeeds with a non-empty description.
    pub fn is_found(&self) -> bool {
        self.description.as_deref().map_or(false, |d| !d.is_empty())
    }
}

/// A job posting, first *discovered* on a listing page then *resolved*.
///
/// The record is moved from stage to stage, never shared: `resolve` and
/// `into_inline` consume the discovered candidate and return the terminal one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobCandidate {
    company: String,
    title: Option<String>,
    href: Option<Url>,
    source_url: Url,
    description: Option<String>,
    resolved_via: Option<ResolvedVia>,
}

impl JobCandidate {
    pub fn discovered(
        company: impl Into<String>,
        title: Option<String>,
        href: Option<Url>,
        source_url: Url,
    ) -> Self {
        let company = company.into();
        let company = if company.trim().is_empty() {
            crate::link::company_from_url(&source_url)
        } else {
            company
        };
        Self {
            company,
            title,
            href,
            source_url,
            description: None,
            resolved_via: None,
        }
    }

    pub fn company(&self) -> &str {
        &self.company
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn href(&self) -> Option<&Url> {
        self.href.as_ref()
    }

    pub fn source_url(&self) -> &Url {
        &self.source_url
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn resolved_via(&self) -> Option<ResolvedVia> {
        self.resolved_via
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved_via.is_some()
    }

    /// Terminal state after a page fetch. A title found in structured data
    /// only fills a missing one.
    pub fn resolve(mut self, via: ResolvedVia, extraction: Extraction) -> Self {
        self.description = extraction.description.filter(|d| !d.is_empty());
        if self.title.is_none() {
            self.title = extraction.title;
        }
        self.resolved_via = Some(via);
        self
    }

    /// Terminal state for postings without a page of their own.
    pub fn into_inline(mut self, description: Option<String>) -> Self {
        self.description = description.filter(|d| !d.is_empty());
        self.resolved_via = Some(ResolvedVia::Inline);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> Url {
        Url::parse("https://acme.example/careers").unwrap()
    }

    #[test]
    fn company_falls_back_to_host() {
        let job = JobCandidate::discovered(" ", None, None, source());
        assert_eq!(job.company(), "acme.example");
        let job = JobCandidate::discovered("Acme", None, None, source());
        assert_eq!(job.company(), "Acme");
    }

    #[test]
    fn discovered_then_resolved() {
        let href = Url::parse("https://acme.example/jobs/1").unwrap();
        let job = JobCandidate::discovered("Acme", Some("SRE II".into()), Some(href), source());
        assert!(!job.is_resolved());
        assert_eq!(job.description(), None);

        let job = job.resolve(
            ResolvedVia::JsonLd,
            Extraction::description("Build infra").with_title(Some("Ignored".into())),
        );
        assert_eq!(job.resolved_via(), Some(ResolvedVia::JsonLd));
        assert_eq!(job.description(), Some("Build infra"));
        assert_eq!(job.title(), Some("SRE II"));
        assert_eq!(job.source_url(), &source());
    }

    #[test]
    fn resolution_fills_missing_title_and_drops_empty_description() {
        let job = JobCandidate::discovered("Acme", None, None, source()).resolve(
            ResolvedVia::HtmlExtract,
            Extraction {
                description: Some(String::new()),
                title: Some("Staff SRE".into()),
            },
        );
        assert_eq!(job.title(), Some("Staff SRE"));
        assert_eq!(job.description(), None);
        assert_eq!(job.resolved_via(), Some(ResolvedVia::HtmlExtract));
    }

    #[test]
    fn inline_records() {
        let job = JobCandidate::discovered("Acme", Some("SRE Lead".into()), None, source())
            .into_inline(Some("On call".into()));
        assert_eq!(job.resolved_via(), Some(ResolvedVia::Inline));
        assert_eq!(job.href(), None);
        assert_eq!(job.description(), Some("On call"));
    }

    #[test]
    fn provenance_tags() {
        assert_eq!(serde_json::to_string(&ResolvedVia::JsonLd).unwrap(), "\"json-ld\"");
        assert_eq!(ResolvedVia::HtmlExtract.to_string(), "html_extract");
        assert_eq!(ResolvedVia::Js.as_str(), "js");
    }
}
