use reqwest::Url;

use crate::data_models::FilterState;

/// Parameter names understood by the search service.
pub mod params {
    pub const KEYWORD: &str = "keyword";
    pub const OFFSET: &str = "offset";
    pub const LIMIT: &str = "limit";
    pub const TITLE: &str = "filters.title";
    pub const AUTHOR: &str = "filters.author";
    pub const MIN_DATE: &str = "filters.min_date";
    pub const MAX_DATE: &str = "filters.max_date";
    pub const CATEGORY: &str = "filters.category";
}

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Ordered `(name, value)` pairs. Keys may repeat (`filters.category`).
pub type QueryParams = Vec<(&'static str, String)>;

/// Turns search criteria into the service's query parameters.
///
/// `keyword`, `offset` and `limit` are always present. Unset filters are left
/// out entirely rather than sent blank, and every selected category becomes
/// its own `filters.category` entry.
pub fn serialize_query(
    keyword: &str,
    filters: &FilterState,
    offset: u64,
    limit: u64,
) -> QueryParams {
    let mut out: QueryParams = vec![
        (params::KEYWORD, keyword.to_string()),
        (params::OFFSET, offset.to_string()),
        (params::LIMIT, limit.to_string()),
    ];

    if !filters.title.is_empty() {
        out.push((params::TITLE, filters.title.clone()));
    }
    if !filters.author.is_empty() {
        out.push((params::AUTHOR, filters.author.clone()));
    }
    if let Some(date) = filters.min_date {
        out.push((params::MIN_DATE, date.format(DATE_FORMAT).to_string()));
    }
    if let Some(date) = filters.max_date {
        out.push((params::MAX_DATE, date.format(DATE_FORMAT).to_string()));
    }
    for category in filters.selected_categories() {
        out.push((params::CATEGORY, category.as_str().to_string()));
    }

    out
}

/// Builds the request URL: `endpoint` replaces whatever path `server` has, and
/// the parameters are appended in order.
pub fn build_url(server: &Url, endpoint: &str, query: &[(&'static str, String)]) -> Url {
    let mut url = server.clone();
    url.set_path(endpoint);
    url.set_query(None);
    {
        let mut pairs = url.query_pairs_mut();
        for (name, value) in query {
            pairs.append_pair(name, value);
        }
    }
    url
}

#[cfg(test)]
fn find_all<'a>(query: &'a QueryParams, name: &str) -> Vec<&'a str> {
    query
        .iter()
        .filter(|(n, _)| *n == name)
        .map(|(_, v)| v.as_str())
        .collect()
}

#[test]
fn test_serialize_query_without_filters() {
    let query = serialize_query("", &FilterState::new(), 0, 10);
    assert_eq!(
        query,
        vec![
            ("keyword", "".to_string()),
            ("offset", "0".to_string()),
            ("limit", "10".to_string()),
        ]
    );
}

#[test]
fn test_serialize_query_omits_empty_filters() {
    use chrono::NaiveDate;

    let mut filters = FilterState::new();
    filters.author = "Jane Doe".to_string();
    filters.max_date = NaiveDate::from_ymd_opt(2022, 12, 31);

    let query = serialize_query("ocean", &filters, 20, 10);
    assert!(find_all(&query, params::TITLE).is_empty());
    assert!(find_all(&query, params::MIN_DATE).is_empty());
    assert_eq!(find_all(&query, params::AUTHOR), vec!["Jane Doe"]);
    assert_eq!(find_all(&query, params::MAX_DATE), vec!["2022-12-31"]);
    assert_eq!(find_all(&query, params::OFFSET), vec!["20"]);
}

#[test]
fn test_serialize_query_fans_out_categories() {
    use crate::data_models::Category;

    let mut filters = FilterState::new();
    filters.toggle_category(Category::Travel);
    filters.toggle_category(Category::Science);

    let query = serialize_query("", &filters, 0, 10);
    let mut categories = find_all(&query, params::CATEGORY);
    categories.sort();
    assert_eq!(categories, vec!["SCIENCE", "TRAVEL"]);
}

#[test]
fn test_serialize_query_is_deterministic() {
    use crate::data_models::Category;
    use chrono::NaiveDate;

    let mut filters = FilterState::new();
    filters.title = "Wired".to_string();
    filters.min_date = NaiveDate::from_ymd_opt(2019, 1, 1);
    filters.select_all_categories();

    let mut same = FilterState::new();
    same.title = "Wired".to_string();
    same.min_date = NaiveDate::from_ymd_opt(2019, 1, 1);
    for category in Category::ALL.into_iter().rev() {
        same.toggle_category(category);
    }

    assert_eq!(
        serialize_query("ai", &filters, 30, 10),
        serialize_query("ai", &same, 30, 10)
    );
}

#[test]
fn test_build_url_replaces_path_and_encodes() {
    let server = Url::parse("http://localhost:8000/ignored?stale=1").unwrap();
    let query = vec![
        (params::KEYWORD, "climate change & you".to_string()),
        (params::CATEGORY, "SCIENCE".to_string()),
        (params::CATEGORY, "TRAVEL".to_string()),
    ];

    let url = build_url(&server, "/hybrid_search", &query);
    assert_eq!(url.path(), "/hybrid_search");
    assert_eq!(
        url.query(),
        Some("keyword=climate+change+%26+you&filters.category=SCIENCE&filters.category=TRAVEL")
    );
}
