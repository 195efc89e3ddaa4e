use anyhow::Result;
use regex::{Regex, RegexBuilder};

use crate::config::ExtractConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    TooShort,
    TooLong,
    Noise,
    NotARole,
}

/// Precision-biased test for "this text names a relevant role".
///
/// Rules apply in order and the first failing one rejects: length within
/// `[min, max]` characters, no noise keyword, at least one role phrase.
#[derive(Debug, Clone)]
pub struct RelevanceFilter {
    min_len: usize,
    max_len: usize,
    noise: Option<Regex>,
    role: Option<Regex>,
}

impl RelevanceFilter {
    pub fn new(config: &ExtractConfig) -> Result<Self> {
        let noise = alternation(config.noise_keywords.iter().map(|k| regex::escape(k.trim())))
            .map(|pattern| RegexBuilder::new(&pattern).case_insensitive(true).build())
            .transpose()?;

        let role = alternation(config.role_keywords.iter().map(|k| phrase(k)))
            .map(|pattern| {
                RegexBuilder::new(&format!(r"\b(?:{pattern})\b"))
                    .case_insensitive(true)
                    .build()
            })
            .transpose()?;

        Ok(Self {
            min_len: config.min_title_len,
            max_len: config.max_title_len,
            noise,
            role,
        })
    }

    pub fn verdict(&self, text: &str) -> Verdict {
        let len = text.chars().count();
        if len < self.min_len {
            return Verdict::TooShort;
        }
        if len > self.max_len {
            return Verdict::TooLong;
        }
        if self.noise.as_ref().map_or(false, |re| re.is_match(text)) {
            return Verdict::Noise;
        }
        if !self.role.as_ref().map_or(false, |re| re.is_match(text)) {
            return Verdict::NotARole;
        }
        Verdict::Accept
    }

    pub fn accept<'a>(&self, text: &'a str) -> Option<&'a str> {
        (self.verdict(text) == Verdict::Accept).then_some(text)
    }
}

impl Default for RelevanceFilter {
    fn default() -> Self {
        Self::new(&ExtractConfig::default()).expect("default config is valid")
    }
}

/// `devops  engineer` → `devops\s+engineer`
fn phrase(keyword: &str) -> String {
    keyword
        .split_whitespace()
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(r"\s+")
}

fn alternation(parts: impl Iterator<Item = String>) -> Option<String> {
    let parts = parts.filter(|p| !p.is_empty()).collect::<Vec<_>>();
    (!parts.is_empty()).then(|| parts.join("|"))
}
