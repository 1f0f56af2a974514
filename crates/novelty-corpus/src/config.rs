//! Configuration for the corpus builder.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// API configuration constants.
pub mod api {
    use std::time::Duration;

    /// Base URL for the OpenAlex API.
    pub const BASE_URL: &str = "https://api.openalex.org";

    /// Request timeout.
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

    /// Connection timeout.
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Delay between requests without a mailto/api key (100ms = 10 req/s).
    pub const RATE_LIMIT_DELAY: Duration = Duration::from_millis(100);

    /// Delay between requests in the polite pool.
    pub const RATE_LIMIT_DELAY_POLITE: Duration = Duration::from_millis(20);

    /// Cache TTL (1 hour). Nested expansion revisits the same works many times.
    pub const CACHE_TTL: Duration = Duration::from_secs(3600);

    /// Maximum cache size.
    pub const CACHE_MAX_SIZE: u64 = 10_000;

    /// Maximum keepalive connections.
    pub const MAX_KEEPALIVE: usize = 10;

    /// Keepalive expiry.
    pub const KEEPALIVE_EXPIRY: Duration = Duration::from_secs(30);
}

/// Corpus and run constants.
pub mod corpus {
    /// Root directory of the year-partitioned corpus.
    pub const ROOT: &str = "Data/docs/papers";

    /// Collection name handed to the novelty engine.
    pub const COLLECTION: &str = "papers";

    /// Snapshot of the selected sample.
    pub const SAMPLE_SNAPSHOT: &str = "Data/sample.json";

    /// Root directory where the novelty engine writes indicator results.
    pub const RESULTS_ROOT: &str = "Result";

    /// Trailing window length, in years.
    pub const LOOKBACK: i32 = 10;

    /// 1-indexed ranks picked from the citation-ordered candidate pool.
    pub const SAMPLE_RANKS: [usize; 6] = [1, 2, 100, 101, 199, 200];

    /// Default search text.
    pub const SEARCH_QUERY: &str = "Citizen science in water research";

    /// Default type filter.
    pub const SEARCH_FILTER: &str = "type:article";

    /// Default page size (the API maximum).
    pub const PER_PAGE: u32 = 200;
}

/// How the mean percentile is normalized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum MeanDivisor {
    /// Divide by the number of references that carry a percentile.
    #[default]
    Scored,
    /// Divide by the reference count advertised by the focal paper.
    Advertised,
}

/// How the minimum percentile treats unscored references.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum MinPolicy {
    /// Minimum is the last scored reference; unscored ones never affect it.
    #[default]
    ScoredTail,
    /// Minimum is the tail of the full ranked list, so any unscored reference
    /// pulls it down to the sentinel.
    RankedTail,
}

/// Novelty indicator computed by the external engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorKind {
    /// Atypical combinations (novelty and conventionality z-scores).
    #[default]
    Uzzi,
    /// Community-crossing novelty.
    Foster,
}

impl IndicatorKind {
    /// Name used on the engine command line and in result paths.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Uzzi => "uzzi",
            Self::Foster => "foster",
        }
    }

    /// Whether the indicator reports a conventionality score.
    #[must_use]
    pub const fn has_conventionality(self) -> bool {
        matches!(self, Self::Uzzi)
    }
}

impl std::fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Item that co-occurs within a paper when the engine builds its network.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum CooccurrenceUnit {
    /// Referenced work ids.
    #[default]
    References,
    /// Topic labels.
    Topics,
}

impl CooccurrenceUnit {
    /// Record field holding the list of units.
    #[must_use]
    pub const fn variable(self) -> &'static str {
        match self {
            Self::References => "referenced_works",
            Self::Topics => "topics",
        }
    }

    /// Field inside each list item that identifies the unit.
    #[must_use]
    pub const fn sub_variable(self) -> &'static str {
        match self {
            Self::References => "id",
            Self::Topics => "display_name",
        }
    }
}

/// Aggregation policy for the citation scorer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringPolicy {
    /// Mean divisor.
    pub mean_divisor: MeanDivisor,
    /// Minimum policy.
    pub min_policy: MinPolicy,
    /// Value reported for min/max when no percentile is available.
    pub missing_sentinel: f64,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            mean_divisor: MeanDivisor::Scored,
            min_policy: MinPolicy::ScoredTail,
            missing_sentinel: 0.0,
        }
    }
}

/// Candidate search parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchParams {
    /// Full-text search.
    pub query: String,
    /// OpenAlex filter expression.
    pub filter: String,
    /// Page size.
    pub per_page: u32,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            query: corpus::SEARCH_QUERY.to_string(),
            filter: corpus::SEARCH_FILTER.to_string(),
            per_page: corpus::PER_PAGE,
        }
    }
}

/// Runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// OpenAlex API key (optional).
    pub api_key: Option<String>,

    /// Contact address for the OpenAlex polite pool (optional).
    pub mailto: Option<String>,

    /// Base URL for the API (for testing with mock servers).
    pub api_url: String,

    /// Request timeout.
    pub request_timeout: Duration,

    /// Connection timeout.
    pub connect_timeout: Duration,

    /// Delay between requests.
    pub rate_limit_delay: Duration,

    /// Cache TTL.
    pub cache_ttl: Duration,

    /// Maximum cache size.
    pub cache_max_size: u64,

    /// Candidate search parameters.
    pub search: SearchParams,

    /// Root of the year-partitioned corpus.
    pub corpus_root: PathBuf,

    /// Where the sample snapshot is written.
    pub sample_snapshot: PathBuf,

    /// Root of the engine's indicator results.
    pub results_root: PathBuf,

    /// Trailing window length.
    pub lookback: i32,

    /// In-flight reference fetches per paper (1 = sequential).
    pub concurrency: usize,

    /// Scorer aggregation policy.
    pub scoring: ScoringPolicy,

    /// Indicator requested from the novelty engine.
    pub indicator: IndicatorKind,

    /// Co-occurrence unit handed to the novelty engine.
    pub cooccurrence_unit: CooccurrenceUnit,

    /// External novelty engine command; the window phase is skipped without one.
    pub engine_command: Option<PathBuf>,
}

impl Config {
    /// Create a new configuration.
    ///
    /// Requests are spaced more tightly when a mailto or key places the client
    /// in the polite pool.
    #[must_use]
    pub fn new(api_key: Option<String>, mailto: Option<String>) -> Self {
        let polite = api_key.is_some() || mailto.is_some();
        Self {
            api_key,
            mailto,
            api_url: api::BASE_URL.to_string(),
            request_timeout: api::REQUEST_TIMEOUT,
            connect_timeout: api::CONNECT_TIMEOUT,
            rate_limit_delay: if polite {
                api::RATE_LIMIT_DELAY_POLITE
            } else {
                api::RATE_LIMIT_DELAY
            },
            cache_ttl: api::CACHE_TTL,
            cache_max_size: api::CACHE_MAX_SIZE,
            search: SearchParams::default(),
            corpus_root: PathBuf::from(corpus::ROOT),
            sample_snapshot: PathBuf::from(corpus::SAMPLE_SNAPSHOT),
            results_root: PathBuf::from(corpus::RESULTS_ROOT),
            lookback: corpus::LOOKBACK,
            concurrency: 1,
            scoring: ScoringPolicy::default(),
            indicator: IndicatorKind::default(),
            cooccurrence_unit: CooccurrenceUnit::default(),
            engine_command: None,
        }
    }

    /// Create a test configuration pointing at a mock server.
    #[must_use]
    pub fn for_testing(base_url: &str) -> Self {
        Self {
            api_url: base_url.trim_end_matches('/').to_string(),
            request_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(2),
            rate_limit_delay: Duration::from_millis(0), // No delay in tests
            cache_ttl: Duration::from_secs(0),          // No caching in tests
            cache_max_size: 0,
            ..Self::new(None, None)
        }
    }

    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns error if environment variables are invalid.
    pub fn from_env() -> anyhow::Result<Self> {
        let api_key = std::env::var("OPENALEX_API_KEY").ok();
        let mailto = std::env::var("OPENALEX_MAILTO").ok();
        let mut config = Self::new(api_key, mailto);

        if let Ok(root) = std::env::var("CORPUS_ROOT") {
            config.corpus_root = PathBuf::from(root);
        }
        if let Ok(cmd) = std::env::var("NOVELTY_ENGINE_CMD") {
            config.engine_command = Some(PathBuf::from(cmd));
        }
        if let Ok(lookback) = std::env::var("NOVELTY_LOOKBACK") {
            config.lookback = lookback.parse()?;
            anyhow::ensure!(config.lookback > 0, "NOVELTY_LOOKBACK must be positive");
        }

        Ok(config)
    }

    /// Check if an API key is configured.
    #[must_use]
    pub const fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Works endpoint URL.
    #[must_use]
    pub fn works_url(&self) -> String {
        format!("{}/works", self.api_url)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(None, None)
    }
}
