//! Pure builders for the two fixed search request shapes.

use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::reindex::{DOC_TYPE, INDEX_NAME};

/// Weight applied to the seeder function: score factor is
/// `ln(2 + seeders) * 0.5`.
const SEEDER_WEIGHT: f64 = 0.5;

/// Cap on the score multiplier so seeder count never dominates relevance.
const MAX_BOOST: f64 = 2.5;

/// Absolute score floor; anything boosted below this is noise and dropped.
const MIN_SCORE: f64 = 0.5;

/// Errors that can occur while building a search request
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("Query string must not be empty")]
    EmptyQuery,
}

/// A fully-addressed search request, ready for the cluster client.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub index: &'static str,
    pub doc_type: &'static str,
    pub body: Value,
}

/// Build a plain search: the caller's query string as a literal
/// query-string query, ranked by the engine's default scoring.
///
/// Caller options are extended with the fixed target, never replaced; the
/// `query` key is the one key the builder owns.
pub fn search_request(
    query: &str,
    options: Map<String, Value>,
) -> Result<SearchRequest, QueryError> {
    let query = non_empty(query)?;

    let mut body = options;
    body.insert(
        "query".to_string(),
        json!({ "query_string": { "query": query } }),
    );

    Ok(SearchRequest {
        index: INDEX_NAME,
        doc_type: DOC_TYPE,
        body: Value::Object(body),
    })
}

/// Build a seeder-boosted search.
///
/// The query string matches `title` (boosted 4x) and `nfo`; the text score
/// is multiplied by `ln(2 + seeders) * 0.5`, capped at 2.5, and results
/// below an absolute score of 0.5 are excluded. Well-seeded torrents rank
/// above poorly-seeded ones without seeder count alone dominating.
pub fn full_search_request(
    query: &str,
    options: Map<String, Value>,
) -> Result<SearchRequest, QueryError> {
    let query = non_empty(query)?;

    let mut body = options;
    body.insert(
        "query".to_string(),
        json!({
            "function_score": {
                "query": {
                    "query_string": {
                        "query": query,
                        "fields": ["title^4", "nfo"],
                    }
                },
                "functions": [
                    {
                        "field_value_factor": {
                            "field": "seeders",
                            "modifier": "ln2p",
                            "factor": 1.0,
                        },
                        "weight": SEEDER_WEIGHT,
                    }
                ],
                "boost_mode": "multiply",
                "max_boost": MAX_BOOST,
                "min_score": MIN_SCORE,
            }
        }),
    );

    Ok(SearchRequest {
        index: INDEX_NAME,
        doc_type: DOC_TYPE,
        body: Value::Object(body),
    })
}

fn non_empty(query: &str) -> Result<&str, QueryError> {
    if query.trim().is_empty() {
        Err(QueryError::EmptyQuery)
    } else {
        Ok(query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options_with_size(size: u64) -> Map<String, Value> {
        let mut options = Map::new();
        options.insert("size".to_string(), json!(size));
        options
    }

    #[test]
    fn plain_search_targets_torrents_index() {
        let request = search_request("pirate bay", options_with_size(10)).unwrap();
        assert_eq!(request.index, "torrents");
        assert_eq!(request.doc_type, "torrent");
    }

    #[test]
    fn plain_search_carries_literal_query_and_preserves_options() {
        let request = search_request("pirate bay", options_with_size(10)).unwrap();
        assert_eq!(request.body["size"], json!(10));
        assert_eq!(
            request.body["query"]["query_string"]["query"],
            json!("pirate bay")
        );
    }

    #[test]
    fn plain_search_extends_rather_than_replaces_options() {
        let mut options = options_with_size(25);
        options.insert("from".to_string(), json!(50));

        let request = search_request("ubuntu iso", options).unwrap();
        assert_eq!(request.body["size"], json!(25));
        assert_eq!(request.body["from"], json!(50));
    }

    #[test]
    fn scored_search_boosts_title_over_nfo() {
        let request = full_search_request("pirate bay", Map::new()).unwrap();
        let fields = &request.body["query"]["function_score"]["query"]["query_string"]["fields"];
        assert_eq!(fields, &json!(["title^4", "nfo"]));
    }

    #[test]
    fn scored_search_applies_seeder_function() {
        let request = full_search_request("pirate bay", Map::new()).unwrap();
        let score = &request.body["query"]["function_score"];

        let function = &score["functions"][0];
        assert_eq!(function["field_value_factor"]["field"], json!("seeders"));
        assert_eq!(function["field_value_factor"]["modifier"], json!("ln2p"));
        assert_eq!(function["weight"], json!(0.5));

        assert_eq!(score["boost_mode"], json!("multiply"));
        assert_eq!(score["max_boost"], json!(2.5));
        assert_eq!(score["min_score"], json!(0.5));
    }

    #[test]
    fn scored_search_preserves_caller_options() {
        let request = full_search_request("pirate bay", options_with_size(10)).unwrap();
        assert_eq!(request.body["size"], json!(10));
    }

    #[test]
    fn empty_query_is_rejected() {
        assert_eq!(
            search_request("", Map::new()).unwrap_err(),
            QueryError::EmptyQuery
        );
        assert_eq!(
            full_search_request("   ", Map::new()).unwrap_err(),
            QueryError::EmptyQuery
        );
    }

    #[test]
    fn builders_are_pure() {
        let a = full_search_request("debian", options_with_size(5)).unwrap();
        let b = full_search_request("debian", options_with_size(5)).unwrap();
        assert_eq!(a, b);
    }
}
