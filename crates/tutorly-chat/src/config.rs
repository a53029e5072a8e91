use serde::{Deserialize, Serialize};

use crate::pagination::DEFAULT_PAGE_SIZE;

/// Engine tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Messages requested per history page
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ChatConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page_size(mut self, size: usize) -> Self {
        self.page_size = size;
        self
    }
}
