use serde::{Deserialize, Serialize};

/// Tunables for the history view.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistorySettings {
    /// Oldest visit, in days, included in a snapshot.
    #[serde(default = "default_max_age_days")]
    pub max_age_days: u32,
    /// Maximum number of visits in a snapshot.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    /// Maximum number of search results.
    #[serde(default = "default_search_results_limit")]
    pub search_results_limit: usize,
}

fn default_max_age_days() -> u32 {
    60
}

fn default_history_limit() -> usize {
    2000
}

fn default_search_results_limit() -> usize {
    300
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            max_age_days: default_max_age_days(),
            history_limit: default_history_limit(),
            search_results_limit: default_search_results_limit(),
        }
    }
}
