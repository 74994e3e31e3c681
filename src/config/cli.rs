use crate::domain::model::Target;
use clap::Parser;

#[derive(Debug, Clone, Default, Parser)]
#[command(name = "chaos")]
#[command(about = "Bulk-download Chaos subdomain archives and search them")]
pub struct CliConfig {
    /// Refresh the cached index.json
    #[arg(long)]
    pub refresh: bool,

    /// Download subdomains for a specific program (or 'all')
    #[arg(long = "dl", value_name = "PROGRAM")]
    pub download: Option<String>,

    /// Query for a domain across all downloaded data
    #[arg(short = 'q', long = "query", value_name = "DOMAIN")]
    pub query: Option<String>,

    /// List all available programs
    #[arg(long)]
    pub list: bool,

    /// Number of concurrent workers (default: 2 x CPUs)
    #[arg(short = 'w', long)]
    pub workers: Option<usize>,

    /// Corpus root directory
    #[arg(long)]
    pub root: Option<String>,

    /// Where the index is cached
    #[arg(long)]
    pub index_cache: Option<String>,

    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Per-archive download timeout in seconds (off by default)
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Log CPU and memory usage after each run")]
    pub monitor: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub log_json: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    List,
    Download(Target),
    Query(String),
}

impl CliConfig {
    /// 多個動作同時指定時，依 list → dl → q 的順序取第一個
    pub fn action(&self) -> Option<Action> {
        if self.list {
            Some(Action::List)
        } else if let Some(target) = self.download.as_deref().filter(|t| !t.is_empty()) {
            Some(Action::Download(Target::from_arg(target)))
        } else {
            self.query
                .as_deref()
                .filter(|q| !q.is_empty())
                .map(|q| Action::Query(q.to_string()))
        }
    }
}
