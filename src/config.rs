use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

use crate::loader;
use crate::query::{builtin_views, Dashboard, DEFAULT_BREAK_EVEN};

/// Where the data lives and how the views are configured.
#[derive(Debug, Clone, Args)]
pub struct AppConfig {
    /// Enrollment dataset (JSON array of records)
    #[arg(long = "data", env = "DASHBOARD_DATA_PATH")]
    pub data_path: PathBuf,
    /// Unconfirmed class list (JSON array of {curso, turno, campus})
    #[arg(long = "exclusions", env = "DASHBOARD_EXCLUSIONS_PATH")]
    pub exclusions_path: Option<PathBuf>,
    /// Course allow-list (JSON array of names) enabling the focused view
    #[arg(long = "allowlist", env = "DASHBOARD_COURSE_ALLOWLIST")]
    pub allowlist_path: Option<PathBuf>,
    /// Break-even enrollment target attached to each class
    #[arg(long, env = "DASHBOARD_BREAK_EVEN", default_value_t = DEFAULT_BREAK_EVEN)]
    pub break_even: u32,
    /// Emit logs as JSON lines
    #[arg(long, env = "DASHBOARD_LOG_JSON")]
    pub log_json: bool,
}

impl AppConfig {
    /// Loads everything once. The dataset and allow-list are required to
    /// parse; the exclusion list is allowed to be missing.
    pub fn load_dashboard(&self) -> anyhow::Result<Dashboard> {
        let store = loader::load_records(&self.data_path).context("failed to load dataset")?;
        let exclusions = loader::load_exclusions(self.exclusions_path.as_deref());
        let allowlist = self
            .allowlist_path
            .as_deref()
            .map(loader::load_course_allowlist)
            .transpose()
            .context("failed to load course allow-list")?;
        Ok(Dashboard::new(
            store,
            exclusions,
            builtin_views(self.break_even, allowlist),
        ))
    }
}
