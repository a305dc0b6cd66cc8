use crate::page::Depth;
use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Clamber
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub store: StoreConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub query: QueryConfig,
}

impl Config {
    /// Database file of the work queue; the graph store's unless overridden
    pub fn queue_database_path(&self) -> &str {
        self.queue
            .database_path
            .as_deref()
            .unwrap_or(&self.store.database_path)
    }
}

/// How crawl work is dispatched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DispatchMode {
    /// Children are crawled as tasks of the resolving process
    #[default]
    InProcess,
    /// Children are published to the work queue for workers to pick up
    Queue,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Where child hops run
    #[serde(default)]
    pub dispatch: DispatchMode,

    /// Whether `resolve` waits for the crawl or answers "pending" at once
    #[serde(rename = "wait-crawl", default = "default_wait_crawl")]
    pub wait_crawl: bool,

    /// Extra hops crawled in the background past the display depth
    /// (-1 unbounded, 0 disabled)
    #[serde(rename = "background-depth", default)]
    pub background_depth: i64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            dispatch: DispatchMode::default(),
            wait_crawl: default_wait_crawl(),
            background_depth: 0,
        }
    }
}

impl CrawlerConfig {
    pub fn background_depth(&self) -> Depth {
        Depth::from(self.background_depth)
    }
}

/// HTTP fetch configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Retries after the first attempt when a server answers 5xx
    #[serde(rename = "retry-attempts", default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Fixed pause between attempts (milliseconds)
    #[serde(rename = "back-off-ms", default = "default_back_off_ms")]
    pub back_off_ms: u64,

    /// Per-request timeout (seconds)
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            retry_attempts: default_retry_attempts(),
            back_off_ms: default_back_off_ms(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl HttpConfig {
    /// Total attempts per fetch, the first one included
    pub fn max_attempts(&self) -> u32 {
        self.retry_attempts.saturating_add(1)
    }

    pub fn back_off(&self) -> Duration {
        Duration::from_millis(self.back_off_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

/// Graph store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// How long a writer waits on a locked database before the transaction
    /// counts as a conflict (milliseconds)
    #[serde(rename = "busy-timeout-ms", default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl StoreConfig {
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

/// Work queue configuration
#[derive(Debug, Clone, Deserialize)]
pub struct QueueConfig {
    /// Path to the queue database; defaults to the store's
    #[serde(rename = "database-path", default)]
    pub database_path: Option<String>,

    /// How long a published message stays invisible (milliseconds)
    #[serde(rename = "publish-delay-ms", default = "default_publish_delay_ms")]
    pub publish_delay_ms: u64,

    /// Long-poll wait per receive (seconds)
    #[serde(rename = "wait-time-secs", default = "default_wait_time_secs")]
    pub wait_time_secs: u64,

    /// How often a long poll checks for visible messages (milliseconds)
    #[serde(rename = "poll-interval-ms", default = "default_queue_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Largest batch claimed per receive
    #[serde(rename = "max-receive", default = "default_max_receive")]
    pub max_receive: usize,

    /// Number of consumer loops per worker
    #[serde(default = "default_consumers")]
    pub consumers: usize,

    /// Crawl scopes unused for this long are forgotten (seconds)
    #[serde(rename = "scope-idle-secs", default = "default_scope_idle_secs")]
    pub scope_idle_secs: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            publish_delay_ms: default_publish_delay_ms(),
            wait_time_secs: default_wait_time_secs(),
            poll_interval_ms: default_queue_poll_interval_ms(),
            max_receive: default_max_receive(),
            consumers: default_consumers(),
            scope_idle_secs: default_scope_idle_secs(),
        }
    }
}

impl QueueConfig {
    pub fn publish_delay(&self) -> Duration {
        Duration::from_millis(self.publish_delay_ms)
    }

    pub fn wait_time(&self) -> Duration {
        Duration::from_secs(self.wait_time_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn scope_idle(&self) -> Duration {
        Duration::from_secs(self.scope_idle_secs)
    }
}

/// Query layer configuration
#[derive(Debug, Clone, Deserialize)]
pub struct QueryConfig {
    /// Display depth used when a request does not name one
    #[serde(rename = "default-display-depth", default = "default_display_depth")]
    pub default_display_depth: u32,

    /// How often a waiting resolve re-reads the store (milliseconds)
    #[serde(rename = "poll-interval-ms", default = "default_query_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// How long a result must stay unchanged to count as final (milliseconds)
    #[serde(rename = "settle-window-ms", default = "default_settle_window_ms")]
    pub settle_window_ms: u64,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_display_depth: default_display_depth(),
            poll_interval_ms: default_query_poll_interval_ms(),
            settle_window_ms: default_settle_window_ms(),
        }
    }
}

impl QueryConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn settle_window(&self) -> Duration {
        Duration::from_millis(self.settle_window_ms)
    }
}

fn default_wait_crawl() -> bool {
    true
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_back_off_ms() -> u64 {
    1000
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_busy_timeout_ms() -> u64 {
    250
}

fn default_publish_delay_ms() -> u64 {
    1000
}

fn default_wait_time_secs() -> u64 {
    20
}

fn default_queue_poll_interval_ms() -> u64 {
    200
}

fn default_max_receive() -> usize {
    10
}

fn default_consumers() -> usize {
    4
}

fn default_scope_idle_secs() -> u64 {
    600
}

fn default_display_depth() -> u32 {
    10
}

fn default_query_poll_interval_ms() -> u64 {
    100
}

fn default_settle_window_ms() -> u64 {
    3000
}
