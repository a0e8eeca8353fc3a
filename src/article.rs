use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CategoryError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleSource {
    pub name: String,
    pub url: Option<String>,
}

/// A single headline as delivered by the provider. Identified by `url`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub description: String,
    pub url: String,
    pub image_url: Option<String>,
    pub published_at: DateTime<Utc>,
    pub content: Option<String>,
    pub source: Option<ArticleSource>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[default]
    General,
    Business,
    Technology,
    Sports,
    Science,
    Health,
    Entertainment,
    World,
    Nation,
    Environment,
}

impl Category {
    pub const ALL: [Category; 10] = [
        Category::General,
        Category::Business,
        Category::Technology,
        Category::Sports,
        Category::Science,
        Category::Health,
        Category::Entertainment,
        Category::World,
        Category::Nation,
        Category::Environment,
    ];

    /// The provider's query value for this category.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::General => "general",
            Category::Business => "business",
            Category::Technology => "technology",
            Category::Sports => "sports",
            Category::Science => "science",
            Category::Health => "health",
            Category::Entertainment => "entertainment",
            Category::World => "world",
            Category::Nation => "nation",
            Category::Environment => "environment",
        }
    }

    /// Display label with the first letter capitalized, e.g. "Technology".
    pub fn label(&self) -> String {
        let name = self.as_str();
        let mut chars = name.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = CategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| CategoryError::UnknownCategory(s.to_string()))
    }
}

/// The cached outcome of fetching one category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedResult {
    pub category: Category,
    pub articles: Vec<Article>,
    pub fetched_at: DateTime<Utc>,
    pub stale: bool,
}

impl FeedResult {
    pub fn new(category: Category, articles: Vec<Article>) -> Self {
        Self {
            category,
            articles,
            fetched_at: Utc::now(),
            stale: false,
        }
    }

    /// Copy of this result flagged as stale, keeping the original fetch time.
    pub fn marked_stale(&self) -> Self {
        Self {
            stale: true,
            ..self.clone()
        }
    }
}
