use serde::{Deserialize, Serialize};

const MAX_PAGE_SIZE: u64 = 100;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Pagination {
    #[serde(default = "default_index")]
    pub index: u64,
    #[serde(default = "default_size")]
    pub size: u64,
}

fn default_index() -> u64 {
    1
}

fn default_size() -> u64 {
    10
}

impl Default for Pagination {
    fn default() -> Self {
        Self { index: 1, size: 10 }
    }
}

impl Pagination {
    pub fn offset(&self) -> u64 {
        (self.index - 1) * self.size
    }

    pub fn limit(&self) -> u64 {
        self.size
    }

    pub fn check(&self) -> Self {
        if self.index < 1 || self.size < 1 {
            return Self::default();
        }
        if self.size > MAX_PAGE_SIZE {
            return Self {
                index: self.index,
                size: MAX_PAGE_SIZE,
            };
        }
        self.clone()
    }
}
