use std::path::PathBuf;

use tether::supabase::SupabaseConfig;

pub const DEFAULT_DATA_DIR: &str = ".pmf-data";
pub const DEFAULT_STORAGE_KEY: &str = "pmf-dashboard-state";

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardConfig {
    /// Where snapshots are written.
    pub data_dir: PathBuf,
    pub storage_key: String,
    /// `None` runs the dashboard offline.
    pub supabase: Option<SupabaseConfig>,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("{set} is set but {missing} is not; set both to sync or neither to stay offline")]
    PartialSupabase {
        set: &'static str,
        missing: &'static str,
    },
    #[error("SUPABASE_URL must be an http(s) URL, got `{0}`")]
    InvalidUrl(String),
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            supabase: None,
        }
    }
}

impl DashboardConfig {
    /// Read the configuration from the environment, after loading `.env` if there is one.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let supabase = match (get("SUPABASE_URL"), get("SUPABASE_ANON_KEY")) {
            (Some(supabase_url), Some(supabase_anon_key)) => {
                if !(supabase_url.starts_with("https://") || supabase_url.starts_with("http://")) {
                    return Err(ConfigError::InvalidUrl(supabase_url));
                }
                Some(SupabaseConfig {
                    supabase_url,
                    supabase_anon_key,
                })
            }
            (Some(_), None) => {
                return Err(ConfigError::PartialSupabase {
                    set: "SUPABASE_URL",
                    missing: "SUPABASE_ANON_KEY",
                });
            }
            (None, Some(_)) => {
                return Err(ConfigError::PartialSupabase {
                    set: "SUPABASE_ANON_KEY",
                    missing: "SUPABASE_URL",
                });
            }
            (None, None) => None,
        };

        Ok(Self {
            data_dir: get("PMF_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
            storage_key: get("PMF_STORAGE_KEY").unwrap_or_else(|| DEFAULT_STORAGE_KEY.to_string()),
            supabase,
        })
    }

    pub fn is_online(&self) -> bool {
        self.supabase.is_some()
    }
}
