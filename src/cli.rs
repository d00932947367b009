use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    Harvest(HarvestArgs),
    Criteria(CriteriaArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Csv,
    Tsv,
    Jsonl,
}

#[derive(Debug, Args)]
pub struct HarvestArgs {
    /// YAML config (catalog url, user agent, languages, classifications).
    #[arg(long)]
    pub config: Option<String>,

    /// Output file for the harvested records.
    #[arg(long)]
    pub out: String,

    #[arg(long, value_enum, default_value_t = OutputFormat::Csv)]
    pub format: OutputFormat,

    /// Client identity sent as `User-Agent` (overrides the config file).
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Catalog search endpoint (overrides the config file).
    #[arg(long)]
    pub base_url: Option<String>,

    /// Delay between requests (politeness; overrides the config file).
    #[arg(long)]
    pub delay_ms: Option<u64>,

    /// Extra attempts per failed request (overrides the config file).
    #[arg(long)]
    pub retries: Option<usize>,

    /// Only harvest these classification codes (repeatable).
    #[arg(long = "classification")]
    pub classifications: Vec<String>,

    /// Only harvest these languages (repeatable).
    #[arg(long = "language")]
    pub languages: Vec<String>,

    /// Write a JSON run summary to this path.
    #[arg(long)]
    pub summary: Option<String>,

    /// Overwrite existing output files.
    #[arg(long, default_value_t = false)]
    pub force: bool,
}

#[derive(Debug, Args)]
pub struct CriteriaArgs {
    /// YAML config (defaults to the built-in language and code lists).
    #[arg(long)]
    pub config: Option<String>,

    /// Output CSV path (default: stdout).
    #[arg(long)]
    pub out: Option<String>,

    /// Overwrite an existing output file.
    #[arg(long, default_value_t = false)]
    pub force: bool,
}
