use std::fs::File;
use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use jobscout_extract::{company_from_url, Url};
use serde::Deserialize;

/// A careers page to start from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedEntry {
    pub company: String,
    pub careers_url: Url,
}

impl SeedEntry {
    pub fn new(company: &str, careers_url: Url) -> Self {
        let company = match company.trim() {
            "" => company_from_url(&careers_url),
            name => name.to_string(),
        };
        Self {
            company,
            careers_url,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SeedRow {
    #[serde(default)]
    company: Option<String>,
    careers_url: String,
}

/// Seeds from a CSV file with a `company,careers_url` header.
pub fn load_seeds(path: impl AsRef<Path>) -> Result<Vec<SeedEntry>> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("Couldn't open seeds {}", path.display()))?;
    read_seeds(file)
}

/// Rows with an invalid URL are skipped.
pub fn read_seeds<R: io::Read>(rdr: R) -> Result<Vec<SeedEntry>> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(rdr);

    let mut seeds = vec![];
    for (line, row) in rdr.deserialize::<SeedRow>().enumerate() {
        let row = row?;
        match Url::parse(&row.careers_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {
                seeds.push(SeedEntry::new(row.company.as_deref().unwrap_or(""), url))
            }
            Ok(url) => log::warn!("Skipping seed row {}: unsupported URL {url}", line + 1),
            Err(e) => log::warn!("Skipping seed row {}: {e} ({})", line + 1, row.careers_url),
        }
    }

    Ok(seeds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_rows() {
        let csv = "company,careers_url\n\
                   Acme, https://acme.example/careers \n\
                   ,https://www.dreamgroup.com/careers/\n\
                   Broken,not a url\n\
                   Mail,mailto:jobs@acme.example\n";
        let seeds = read_seeds(csv.as_bytes()).unwrap();
        assert_eq!(
            seeds,
            vec![
                SeedEntry {
                    company: "Acme".into(),
                    careers_url: Url::parse("https://acme.example/careers").unwrap(),
                },
                SeedEntry {
                    company: "dreamgroup.com".into(),
                    careers_url: Url::parse("https://www.dreamgroup.com/careers/").unwrap(),
                },
            ]
        );
    }

    #[test]
    fn missing_column_is_an_error() {
        assert!(read_seeds("company\nAcme\n".as_bytes()).is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(load_seeds("/definitely/not/here.csv").is_err());
    }
}
