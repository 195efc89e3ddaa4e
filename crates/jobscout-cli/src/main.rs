use std::fs::{self, File};
use std::io;
use std::path::PathBuf;

use anyhow::Context;
use clap::{CommandFactory, Parser};
use clap_complete::{generate, Shell};
use jobscout_crawler::{CrawlerConfig, OnError};
use jobscout_extract::{ExtractConfig, JobCandidate, Url};
use jobscout_spider::writer::{OutputConfig, OutputFormat, RecordWriter};
use jobscout_spider::{crawl_careers, discover_page, load_seeds, resolve_page};
use serde::Deserialize;
use tokio::runtime;

const DEFAULT_LOG: &str = "jobscout_crawler=warn,jobscout_spider=info";

/// Job postings finder for careers pages
#[derive(Debug, Parser)]
#[clap(version)]
pub struct Args {
    #[clap(subcommand)]
    pub cmd: SubCommand,
}

#[derive(Debug, clap::Subcommand)]
pub enum SubCommand {
    #[clap(name = "crawl")]
    Crawl(CrawlArgs),
    #[clap(name = "discover")]
    Discover(PageArgs),
    #[clap(name = "resolve")]
    Resolve(PageArgs),
    #[clap(hide = true)]
    Completion,
}

/// Settings file, every section is optional
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub crawler: CrawlerConfig,
    pub extract: ExtractConfig,
    pub output: OutputConfig,
}

impl Settings {
    pub fn load(path: Option<&PathBuf>) -> anyhow::Result<Self> {
        match path {
            Some(path) => {
                let file = File::open(path)
                    .with_context(|| format!("Couldn't open config {}", path.display()))?;
                Ok(serde_yaml::from_reader(file)?)
            }
            None => Ok(Self::default()),
        }
    }
}

/// Crawl careers pages and resolve every relevant job posting
#[derive(Debug, clap::Args)]
pub struct CrawlArgs {
    /// CSV file of seeds with a `company,careers_url` header
    #[clap(parse(from_os_str), long, short)]
    pub seeds: PathBuf,
    /// Output file of resolved postings, stdout when missing
    #[clap(parse(from_os_str), long, short)]
    pub output_file: Option<PathBuf>,
    /// Override output format
    #[clap(arg_enum, long)]
    pub format: Option<OutputFormat>,
    /// Optional yaml configuration file
    #[clap(env = "JOBSCOUT_CONFIG", parse(from_os_str), long)]
    pub config: Option<PathBuf>,
    /// Override crawler's user agent
    #[clap(long)]
    pub user_agent: Option<String>,
    /// Override crawler's page buffer size
    #[clap(long)]
    pub page_buffer: Option<usize>,
    /// Override crawler's maximum concurrent page downloads
    #[clap(long)]
    pub concurrent_downloads: Option<usize>,
    /// Override crawler's number of CPU workers used to parse pages
    #[clap(long)]
    pub num_workers: Option<usize>,
    /// No SIGINT handling, the crawl runs until done
    #[clap(long)]
    pub no_sigint: bool,
    /// Override crawler's download error handling strategy
    #[clap(arg_enum, long)]
    pub on_dl_error: Option<OnError>,
    /// Override crawler's scrap error handling strategy
    #[clap(arg_enum, long)]
    pub on_scrap_error: Option<OnError>,
    /// When quiet no logs are outputted
    #[clap(long, short)]
    pub quiet: bool,
}

impl TryFrom<&CrawlArgs> for Settings {
    type Error = anyhow::Error;

    fn try_from(args: &CrawlArgs) -> Result<Self, Self::Error> {
        let mut settings = Settings::load(args.config.as_ref())?;
        let conf = &mut settings.crawler;
        if let Some(user_agent) = &args.user_agent {
            conf.user_agent = user_agent.to_string();
        }
        if let Some(page_buffer) = args.page_buffer {
            conf.page_buffer = page_buffer;
        }
        if let Some(concurrent_downloads) = args.concurrent_downloads {
            conf.concurrent_downloads = concurrent_downloads;
        }
        if let Some(num_workers) = args.num_workers {
            conf.num_workers = num_workers;
        }
        if let Some(on_dl_error) = args.on_dl_error {
            conf.on_dl_error = on_dl_error;
        }
        if let Some(on_scrap_error) = args.on_scrap_error {
            conf.on_scrap_error = on_scrap_error;
        }
        if args.no_sigint {
            conf.handle_sigint = false;
        }
        if let Some(output_file) = &args.output_file {
            settings.output.file = Some(output_file.clone());
        }
        if let Some(format) = args.format {
            settings.output.format = format;
        }
        Ok(settings)
    }
}

pub fn crawl(args: CrawlArgs) -> anyhow::Result<()> {
    let settings: Settings = (&args).try_into()?;
    let seeds = load_seeds(&args.seeds)?;
    if seeds.is_empty() {
        log::warn!("No valid seed in {}", args.seeds.display());
    }
    let rt = runtime::Builder::new_multi_thread().enable_all().build()?;
    rt.block_on(crawl_careers(
        &settings.crawler,
        seeds,
        settings.extract,
        &settings.output,
    ))?;
    Ok(())
}

/// Run a single stage on one page and print its records as JSON lines
#[derive(Debug, clap::Args)]
#[clap(group = clap::ArgGroup::new("page").required(true))]
pub struct PageArgs {
    /// A distant html page
    #[clap(group = "page", long)]
    pub url: Option<String>,
    /// A local html page
    #[clap(group = "page", parse(from_os_str), long)]
    pub file: Option<PathBuf>,
    /// URL the local page was saved from, relative links resolve against it
    #[clap(long, requires = "file")]
    pub page_url: Option<String>,
    /// Company of the postings, derived from the page URL when missing
    #[clap(long, default_value = "")]
    pub company: String,
    /// Custom user agent to download the page
    #[clap(long, conflicts_with = "file")]
    pub ua: Option<String>,
    /// Optional yaml configuration file
    #[clap(env = "JOBSCOUT_CONFIG", parse(from_os_str), long)]
    pub config: Option<PathBuf>,
}

impl PageArgs {
    fn page(&self) -> anyhow::Result<(String, Url)> {
        if let Some(url) = &self.url {
            let mut builder = reqwest::blocking::ClientBuilder::new();
            if let Some(ua) = &self.ua {
                builder = builder.user_agent(ua);
            }
            let client = builder.build()?;
            let page = client.get(url).send()?.error_for_status()?.text()?;
            Ok((page, Url::parse(url)?))
        } else if let Some(path) = &self.file {
            let page = fs::read_to_string(path)
                .with_context(|| format!("Couldn't read {}", path.display()))?;
            let page_url = match &self.page_url {
                Some(url) => Url::parse(url)?,
                None => Url::from_file_path(fs::canonicalize(path)?)
                    .map_err(|_| anyhow::anyhow!("Invalid page path {}", path.display()))?,
            };
            Ok((page, page_url))
        } else {
            anyhow::bail!("Missing `url` or `file`");
        }
    }
}

fn print_records(records: &[JobCandidate]) -> anyhow::Result<()> {
    let mut wtr = RecordWriter::stdout(OutputFormat::Jsonl)?;
    for record in records {
        wtr.write_record(record)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn discover(args: PageArgs) -> anyhow::Result<()> {
    let settings = Settings::load(args.config.as_ref())?;
    let (page, page_url) = args.page()?;
    let found = discover_page(&settings.extract, &page, &page_url, &args.company)?;
    log::info!("{page_url}: {} candidates", found.len());
    print_records(&found)
}

pub fn resolve(args: PageArgs) -> anyhow::Result<()> {
    let settings = Settings::load(args.config.as_ref())?;
    let (page, page_url) = args.page()?;
    let record = resolve_page(&settings.extract, &page, &page_url)?;
    print_records(&[record])
}

fn init_logger(filters: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filters)).init();
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    match args.cmd {
        SubCommand::Crawl(args) => {
            if !args.quiet {
                init_logger(DEFAULT_LOG);
            }
            crawl(args)
        }
        SubCommand::Discover(args) => {
            init_logger("jobscout_spider=info");
            discover(args)
        }
        SubCommand::Resolve(args) => {
            init_logger("jobscout_spider=warn");
            resolve(args)
        }
        SubCommand::Completion => {
            generate(Shell::Bash, &mut Args::command(), "jobscout", &mut io::stdout());
            Ok(())
        }
    }
}
