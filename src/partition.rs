//! Splits an ordered article list into the three display columns.

use serde::{Deserialize, Serialize};

use crate::article::Article;

/// Column sizes. Whatever is left after `important` and `latest` is popular.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct BucketLayout {
    #[serde(default = "default_important")]
    pub important: usize,
    #[serde(default = "default_latest")]
    pub latest: usize,
}

fn default_important() -> usize {
    3
}

fn default_latest() -> usize {
    4
}

impl Default for BucketLayout {
    fn default() -> Self {
        Self {
            important: default_important(),
            latest: default_latest(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Buckets<'a> {
    pub important: &'a [Article],
    pub latest: &'a [Article],
    pub popular: &'a [Article],
}

impl BucketLayout {
    pub fn partition<'a>(&self, articles: &'a [Article]) -> Buckets<'a> {
        let important_end = self.important.min(articles.len());
        let latest_end = important_end.saturating_add(self.latest).min(articles.len());

        Buckets {
            important: &articles[..important_end],
            latest: &articles[important_end..latest_end],
            popular: &articles[latest_end..],
        }
    }
}

/// Partition with the default 3 / 4 / rest layout.
pub fn partition(articles: &[Article]) -> Buckets<'_> {
    BucketLayout::default().partition(articles)
}
