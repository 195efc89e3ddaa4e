use std::io::{self, Write};
use std::path::PathBuf;
use std::{fs, thread};

use anyhow::{Context, Result};
use crossbeam_channel::{unbounded, Sender};
use jobscout_extract::JobCandidate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "clap", derive(clap::ArgEnum))]
pub enum OutputFormat {
    Csv,
    Jsonl,
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::Csv
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileMode {
    Create,
    Append,
}

impl Default for FileMode {
    fn default() -> Self {
        Self::Create
    }
}

impl From<FileMode> for fs::OpenOptions {
    fn from(mode: FileMode) -> Self {
        let mut opts = fs::OpenOptions::new();
        match mode {
            FileMode::Create => opts.write(true).create(true).truncate(true),
            FileMode::Append => opts.append(true).create(true),
        };
        opts
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OutputConfig {
    /// Records go to stdout without a file
    pub file: Option<PathBuf>,
    pub format: OutputFormat,
    pub file_mode: FileMode,
    pub csv: CsvWriterConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CsvWriterConfig {
    #[serde(default = "default_csv_delimiter")]
    pub delimiter: char,
    #[serde(default)]
    pub escape: Option<char>,
    #[serde(default = "default_csv_terminator")]
    pub terminator: CsvTerminator,
}

impl Default for CsvWriterConfig {
    fn default() -> Self {
        Self {
            delimiter: ',',
            escape: None,
            terminator: CsvTerminator::Any('\n'),
        }
    }
}

fn default_csv_delimiter() -> char {
    CsvWriterConfig::default().delimiter
}

fn default_csv_terminator() -> CsvTerminator {
    CsvWriterConfig::default().terminator
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum CsvTerminator {
    CRLF,
    Any(char),
}

impl From<CsvTerminator> for csv::Terminator {
    fn from(source: CsvTerminator) -> Self {
        match source {
            CsvTerminator::CRLF => Self::CRLF,
            CsvTerminator::Any(c) => Self::Any(c as u8),
        }
    }
}

impl From<&CsvWriterConfig> for csv::WriterBuilder {
    fn from(c: &CsvWriterConfig) -> Self {
        let mut builder = csv::WriterBuilder::new();
        builder.delimiter(c.delimiter as u8);
        builder.terminator(c.terminator.into());
        if let Some(escape) = c.escape {
            builder.double_quote(false);
            builder.escape(escape as u8);
        } else {
            builder.double_quote(true);
        }
        builder
    }
}

pub enum Output {
    File(fs::File),
    Stdout(io::Stdout),
}

impl Write for Output {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::File(f) => f.write(buf),
            Self::Stdout(s) => s.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::File(f) => f.flush(),
            Self::Stdout(s) => s.flush(),
        }
    }
}

/// Serializes resolved records, one row or line each.
pub enum RecordWriter {
    Csv(csv::Writer<Output>),
    Jsonl(io::BufWriter<Output>),
}

impl RecordWriter {
    pub fn new(config: &OutputConfig) -> Result<Self> {
        let (output, has_content) = match &config.file {
            Some(path) => {
                let opts: fs::OpenOptions = config.file_mode.into();
                let file = opts
                    .open(path)
                    .with_context(|| format!("Couldn't open output {}", path.display()))?;
                let has_content = file.metadata()?.len() > 0;
                (Output::File(file), has_content)
            }
            None => (Output::Stdout(io::stdout()), false),
        };

        let wtr = match config.format {
            OutputFormat::Csv => {
                let mut builder = csv::WriterBuilder::from(&config.csv);
                // Appending under an existing header
                builder.has_headers(!has_content);
                Self::Csv(builder.from_writer(output))
            }
            OutputFormat::Jsonl => Self::Jsonl(io::BufWriter::new(output)),
        };

        Ok(wtr)
    }

    pub fn stdout(format: OutputFormat) -> Result<Self> {
        Self::new(&OutputConfig {
            format,
            ..Default::default()
        })
    }

    pub fn write_record(&mut self, record: &JobCandidate) -> Result<()> {
        match self {
            Self::Csv(wtr) => wtr.serialize(record)?,
            Self::Jsonl(wtr) => {
                serde_json::to_writer(&mut *wtr, record)?;
                wtr.write_all(b"\n")?;
            }
        }
        Ok(())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Csv(wtr) => wtr.flush(),
            Self::Jsonl(wtr) => wtr.flush(),
        }
    }
}

/// Handle on the thread writing records.
pub struct WriterThread {
    handle: thread::JoinHandle<usize>,
}

impl WriterThread {
    /// Opens the output, then writes every record received until all senders
    /// are dropped.
    pub fn spawn(config: &OutputConfig) -> Result<(Sender<JobCandidate>, Self)> {
        let mut wtr = RecordWriter::new(config)?;
        let (tx_record, rx_record) = unbounded::<JobCandidate>();

        let handle = thread::Builder::new()
            .name("writer".into())
            .spawn(move || {
                let mut written = 0;
                for record in rx_record {
                    match wtr.write_record(&record) {
                        Ok(()) => written += 1,
                        Err(e) => log::error!("Couldn't write record: {e}"),
                    }
                }
                if let Err(e) = wtr.flush() {
                    log::error!("Couldn't flush records: {e}");
                }
                written
            })?;

        Ok((tx_record, Self { handle }))
    }

    /// Waits for the record senders to be gone, returns the written count.
    pub fn join(self) -> Result<usize> {
        self.handle
            .join()
            .map_err(|_| anyhow::anyhow!("Record writer panicked"))
    }
}

#[cfg(test)]
mod tests {
    use jobscout_extract::{Extraction, ResolvedVia, Url};

    use super::*;

    fn record(n: usize) -> JobCandidate {
        let source = Url::parse("https://acme.example/careers").unwrap();
        JobCandidate::discovered(
            "Acme",
            Some(format!("SRE {n}")),
            source.join(&format!("/jobs/{n}")).ok(),
            source,
        )
        .resolve(ResolvedVia::JsonLd, Extraction::description("Build, infra"))
    }

    #[test]
    fn writes_csv_with_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jobs.csv");
        let config = OutputConfig {
            file: Some(path.clone()),
            ..Default::default()
        };

        let (tx, writer) = WriterThread::spawn(&config).unwrap();
        tx.send(record(1)).unwrap();
        tx.send(record(2)).unwrap();
        drop(tx);
        assert_eq!(writer.join().unwrap(), 2);

        let out = fs::read_to_string(&path).unwrap();
        let lines = out.lines().collect::<Vec<_>>();
        assert_eq!(
            lines,
            vec![
                "company,title,href,source_url,description,resolved_via",
                "Acme,SRE 1,https://acme.example/jobs/1,https://acme.example/careers,\"Build, infra\",json-ld",
                "Acme,SRE 2,https://acme.example/jobs/2,https://acme.example/careers,\"Build, infra\",json-ld",
            ]
        );
    }

    #[test]
    fn appends_without_repeating_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jobs.csv");
        let mut config = OutputConfig {
            file: Some(path.clone()),
            ..Default::default()
        };

        for mode in [FileMode::Create, FileMode::Append] {
            config.file_mode = mode;
            let mut wtr = RecordWriter::new(&config).unwrap();
            wtr.write_record(&record(1)).unwrap();
            wtr.flush().unwrap();
        }

        let out = fs::read_to_string(&path).unwrap();
        assert_eq!(out.lines().count(), 3);
        assert_eq!(out.matches("company,title").count(), 1);
    }

    #[test]
    fn writes_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jobs.jsonl");
        let config = OutputConfig {
            file: Some(path.clone()),
            format: OutputFormat::Jsonl,
            ..Default::default()
        };

        let mut wtr = RecordWriter::new(&config).unwrap();
        wtr.write_record(&record(3)).unwrap();
        wtr.flush().unwrap();
        drop(wtr);

        let out = fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(out.trim()).unwrap();
        assert_eq!(value["resolved_via"], "json-ld");
        assert_eq!(value["href"], "https://acme.example/jobs/3");
        assert_eq!(value["description"], "Build, infra");
    }

    #[test]
    fn output_config_from_yaml() {
        let config: OutputConfig =
            serde_yaml::from_str("file: out.jsonl\nformat: jsonl\nfileMode: append\n").unwrap();
        assert_eq!(config.format, OutputFormat::Jsonl);
        assert_eq!(config.file_mode, FileMode::Append);
        assert_eq!(config.csv.delimiter, ',');
    }
}
