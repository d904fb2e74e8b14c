use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Magazine categories known to the search service. Declaration order is the
/// order categories are serialized in.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Category {
    Fashion,
    Technology,
    Science,
    Travel,
    Sports,
    Food,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Fashion,
        Category::Technology,
        Category::Science,
        Category::Travel,
        Category::Sports,
        Category::Food,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Fashion => "FASHION",
            Category::Technology => "TECHNOLOGY",
            Category::Science => "SCIENCE",
            Category::Travel => "TRAVEL",
            Category::Sports => "SPORTS",
            Category::Food => "FOOD",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown category: {0}")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownCategory(wanted.to_string()))
    }
}

/// Structured search criteria. An empty string or `None` means the
/// dimension is unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    pub title: String,
    pub author: String,
    pub min_date: Option<NaiveDate>,
    pub max_date: Option<NaiveDate>,
    categories: BTreeSet<Category>,
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes the category if selected, selects it otherwise. Returns whether
    /// it is selected afterwards.
    pub fn toggle_category(&mut self, category: Category) -> bool {
        if self.categories.remove(&category) {
            false
        } else {
            self.categories.insert(category);
            true
        }
    }

    pub fn select_all_categories(&mut self) {
        self.categories = Category::ALL.into_iter().collect();
    }

    pub fn deselect_all_categories(&mut self) {
        self.categories.clear();
    }

    pub fn is_selected(&self, category: Category) -> bool {
        self.categories.contains(&category)
    }

    /// Selected categories in declaration order.
    pub fn selected_categories(&self) -> impl Iterator<Item = Category> + '_ {
        self.categories.iter().copied()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_empty()
            && self.author.is_empty()
            && self.min_date.is_none()
            && self.max_date.is_none()
            && self.categories.is_empty()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ResultMetadata {
    pub title: String,
    pub author: String,
    pub publication_date: String,
    pub category: Category,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ResultItem {
    pub title: String,
    pub content: String,
    pub metadata: ResultMetadata,
}

/// One page of results. `total` counts every match, not just `contents`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SearchResponse {
    pub total: u64,
    pub contents: Vec<ResultItem>,
}

#[test]
fn test_toggle_category() {
    let mut filters = FilterState::new();
    assert!(filters.toggle_category(Category::Science));
    assert!(filters.is_selected(Category::Science));
    assert!(!filters.toggle_category(Category::Science));
    assert!(!filters.is_selected(Category::Science));
    assert!(filters.is_empty());
}

#[test]
fn test_select_and_deselect_all() {
    let mut filters = FilterState::new();
    filters.toggle_category(Category::Food);
    filters.select_all_categories();
    assert_eq!(
        filters.selected_categories().collect::<Vec<_>>(),
        Category::ALL.to_vec()
    );

    filters.deselect_all_categories();
    assert_eq!(filters.selected_categories().count(), 0);
}

#[test]
fn test_selected_categories_follow_declaration_order() {
    let mut filters = FilterState::new();
    filters.toggle_category(Category::Travel);
    filters.toggle_category(Category::Fashion);
    filters.toggle_category(Category::Science);
    assert_eq!(
        filters.selected_categories().collect::<Vec<_>>(),
        vec![Category::Fashion, Category::Science, Category::Travel]
    );
}

#[test]
fn test_category_parsing() {
    assert_eq!("science".parse::<Category>(), Ok(Category::Science));
    assert_eq!(" TRAVEL ".parse::<Category>(), Ok(Category::Travel));
    assert_eq!(
        "gardening".parse::<Category>(),
        Err(UnknownCategory("gardening".to_string()))
    );
}

#[test]
fn test_response_deserializes_service_payload() {
    let payload = r#"{
        "total": 42,
        "contents": [{
            "title": "Warming oceans",
            "content": "line one\nline two",
            "metadata": {
                "title": "Nature Weekly",
                "author": "A. Writer",
                "publication_date": "2021-03-04",
                "category": "SCIENCE"
            }
        }]
    }"#;
    let response: SearchResponse = serde_json::from_str(payload).unwrap();
    assert_eq!(response.total, 42);
    assert_eq!(response.contents[0].content, "line one\nline two");
    assert_eq!(response.contents[0].metadata.category, Category::Science);
}

#[test]
fn test_response_without_total_is_rejected() {
    let payload = r#"{"contents": []}"#;
    assert!(serde_json::from_str::<SearchResponse>(payload).is_err());
}
