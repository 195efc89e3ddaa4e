use serde::{Deserialize, Serialize};

/// Tunables of the discovery and resolution heuristics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtractConfig {
    /// Shortest accepted candidate title, in characters
    pub min_title_len: usize,
    /// Longest accepted candidate title, in characters
    pub max_title_len: usize,
    /// Case-insensitive substrings marking navigation or legal noise
    pub noise_keywords: Vec<String>,
    /// Role phrases, matched case-insensitively on word boundaries
    pub role_keywords: Vec<String>,
    /// Script variable holding the positions list of a listing page
    pub listing_marker: String,
    /// Script variable holding the position detail of a job page
    pub detail_marker: String,
    /// Main content containers, most specific first
    pub content_selectors: Vec<String>,
    /// Below this many characters the main content is not trusted
    pub min_description_len: usize,
    /// Words announcing a job description section
    pub section_markers: Vec<String>,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            min_title_len: 5,
            max_title_len: 80,
            noise_keywords: strings(&["privacy", "terms", "about", "contact", "blog", "login"]),
            role_keywords: strings(&["sre", "devops engineer", "mlops engineer"]),
            listing_marker: String::from("positions"),
            detail_marker: String::from("position"),
            content_selectors: strings(&[
                ".job-content",
                ".page-content",
                "main",
                "article",
                ".job-description",
                ".description",
            ]),
            min_description_len: 150,
            section_markers: strings(&[
                "Requirements",
                "Responsibilities",
                "Qualifications",
                "About the role",
            ]),
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
