//! Fixed index schema and import-connector definitions.

use serde_json::{json, Value};

use crate::config::SourceConfig;

/// Target index for torrent documents.
pub const INDEX_NAME: &str = "torrents";

/// Document type inside the index.
pub const DOC_TYPE: &str = "torrent";

/// Name of the import-connector job.
pub const CONNECTOR_NAME: &str = "torrents";

/// Row query the connector runs against the relational source.
pub const SOURCE_QUERY: &str = "select * from torrents";

const SHARDS: u32 = 5;
const REPLICAS: u32 = 1;

/// Fixed mapping for the `torrent` document type. Never changes at runtime.
///
/// `hash` doubles as the document id, so re-imported rows overwrite
/// themselves instead of accumulating duplicates.
pub fn torrent_mapping() -> Value {
    json!({
        DOC_TYPE: {
            "_id": { "path": "hash" },
            "properties": {
                "hash":     { "type": "string", "index": "not_analyzed" },
                "uploaded": { "type": "date" },
                "size":     { "type": "long" },
                "title":    { "type": "string", "analyzer": "english" },
                "source":   { "type": "string", "analyzer": "english" },
                "nfo":      { "type": "string", "analyzer": "english" },
                "seeders":  { "type": "integer" },
                "leechers": { "type": "integer" }
            }
        }
    })
}

/// Full import-connector definition, rebuilt on every reindex cycle.
///
/// The source credentials pass through opaquely; the connector connects to
/// the relational source itself.
pub fn connector_definition(source: &SourceConfig) -> Value {
    json!({
        "type": "jdbc",
        "jdbc": {
            "url": source.url,
            "user": source.user,
            "password": source.password,
            "sql": SOURCE_QUERY,
        },
        "index": {
            "index": INDEX_NAME,
            "type": DOC_TYPE,
            "index_settings": {
                "number_of_shards": SHARDS,
                "number_of_replicas": REPLICAS,
            },
            "type_mapping": torrent_mapping(),
        }
    })
}
