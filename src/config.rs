use std::path::PathBuf;

pub const DEFAULT_BASE_URL: &str = "http://10.100.40.2:8080";
pub const DEFAULT_OUTPUT_PATH: &str = "output.csv";
pub const DEFAULT_MAX_SUB_INTERVAL_MS: i64 = 100_000_000;
pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const DEFAULT_TIMESERIES_LIMIT: u64 = 100_000_000;

/// Settings for one export run.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportConfig {
    /// Platform REST API root, without a trailing `/api`.
    pub base_url: String,
    /// When non-empty the username prompt is skipped.
    pub default_username: String,
    /// Overwritten on every successful run.
    pub output_path: PathBuf,
    /// Longest time slice requested in a single values/timeseries call.
    pub max_sub_interval_ms: i64,
    /// Devices requested per page while listing the tenant's devices.
    pub page_size: u32,
    /// Result ceiling sent with every values/timeseries call.
    pub timeseries_limit: u64,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            default_username: String::new(),
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
            max_sub_interval_ms: DEFAULT_MAX_SUB_INTERVAL_MS,
            page_size: DEFAULT_PAGE_SIZE,
            timeseries_limit: DEFAULT_TIMESERIES_LIMIT,
        }
    }
}

impl ExportConfig {
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.to_string();
        self
    }

    pub fn with_output_path(mut self, output_path: impl Into<PathBuf>) -> Self {
        self.output_path = output_path.into();
        self
    }
}
