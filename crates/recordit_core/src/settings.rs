//! Tunables the service reads at runtime. The server fills these from its
//! environment-driven config.

use std::path::PathBuf;

pub const DEFAULT_ADMIN_NUMBER: &str = "007";

#[derive(Debug, Clone)]
pub struct ServiceSettings {
    /// Number that is always created as, and treated as, the administrator.
    pub admin_number: String,
    pub users_per_page: i64,
    pub courses_per_page: i64,
    pub reports_per_page: i64,
    pub records_per_page: i64,
    pub feed_per_page: i64,
    pub score_lower: i32,
    pub score_upper: i32,
    pub locales: Vec<String>,
    /// Directory zipped by the system-log download.
    pub log_dir: PathBuf,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            admin_number: DEFAULT_ADMIN_NUMBER.into(),
            users_per_page: 20,
            courses_per_page: 20,
            reports_per_page: 20,
            records_per_page: 20,
            feed_per_page: 12,
            score_lower: 0,
            score_upper: 100,
            locales: vec!["zh_Hans_CN".into(), "en_US".into()],
            log_dir: PathBuf::from("./logs"),
        }
    }
}

impl ServiceSettings {
    pub fn score_in_range(&self, score: i32) -> bool {
        (self.score_lower..=self.score_upper).contains(&score)
    }

    pub fn supports_locale(&self, locale: &str) -> bool {
        self.locales.iter().any(|l| l == locale)
    }
}
