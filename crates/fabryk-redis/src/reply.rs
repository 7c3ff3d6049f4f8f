//! `FT.SEARCH` reply decoding.
//!
//! RESP2 replies are a flat array:
//!
//! ```text
//! [total, key1, [field, value, ...], key2, [field, value, ...], ...]
//! ```
//!
//! RESP3 replies are a map with `total_results` and a `results` list whose
//! entries carry `id` and `extra_attributes`. Both decode to the same
//! [`SearchResults`].

use crate::document::Document;
use crate::error::{Error, Result};
use crate::executor::Reply;
use crate::metadata::{Metadata, MetadataValue};
use crate::schema::{FieldKind, IndexSchema};

/// Reserved metadata keys a store reads and writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservedKeys {
    /// Field holding the page content.
    pub content: String,
    /// Field holding the embedding.
    pub vector: String,
    /// Alias of the computed distance.
    pub distance: String,
}

impl Default for ReservedKeys {
    fn default() -> Self {
        Self {
            content: "content".to_string(),
            vector: "content_vector".to_string(),
            distance: "distance".to_string(),
        }
    }
}

/// Decoded search reply.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResults {
    /// Total matches reported by the engine (may exceed `documents.len()`).
    pub total: i64,
    /// Returned documents, in reply order.
    pub documents: Vec<Document>,
}

/// Type a raw field value through the schema.
///
/// Numeric fields become `Integer`/`Float`, tag fields lists split on the
/// tag separator, everything else a `String`.
pub fn decode_field(name: &str, raw: &str, schema: Option<&IndexSchema>) -> MetadataValue {
    let kind = schema.and_then(|s| s.field_kind(name));
    let separator = match kind {
        Some(FieldKind::Tag) => schema
            .and_then(|s| s.tag_field(name))
            .map(|f| f.separator()),
        _ => None,
    };
    MetadataValue::from_field(raw, kind, separator)
}

/// Decode a whole `FT.SEARCH` reply.
pub fn decode_search_reply(
    reply: Reply,
    keys: &ReservedKeys,
    schema: Option<&IndexSchema>,
) -> Result<SearchResults> {
    match reply {
        Reply::Array(items) => decode_resp2(items, keys, schema),
        Reply::Map(pairs) => decode_resp3(pairs, keys, schema),
        other => Err(Error::invalid_data(format!(
            "unexpected FT.SEARCH reply: {other:?}"
        ))),
    }
}

fn decode_resp2(
    items: Vec<Reply>,
    keys: &ReservedKeys,
    schema: Option<&IndexSchema>,
) -> Result<SearchResults> {
    let mut items = items.into_iter();
    let total = items
        .next()
        .and_then(|r| r.as_int())
        .ok_or_else(|| Error::invalid_data("FT.SEARCH reply is missing the total count"))?;

    let mut documents = Vec::new();
    while let Some(key) = items.next() {
        let key = key
            .as_string()
            .ok_or_else(|| Error::invalid_data("FT.SEARCH reply has a non-string record key"))?;
        let fields = match items.next() {
            Some(Reply::Array(fields)) => pairs_from_flat(fields)?,
            Some(Reply::Map(pairs)) => pairs,
            // NOCONTENT replies carry keys only.
            Some(Reply::Nil) | None => Vec::new(),
            Some(other) => {
                return Err(Error::invalid_data(format!(
                    "FT.SEARCH record {key} has unexpected fields: {other:?}"
                )));
            }
        };
        documents.push(build_document(&key, fields, keys, schema));
    }

    Ok(SearchResults { total, documents })
}

fn decode_resp3(
    pairs: Vec<(Reply, Reply)>,
    keys: &ReservedKeys,
    schema: Option<&IndexSchema>,
) -> Result<SearchResults> {
    let mut total = 0;
    let mut documents = Vec::new();

    for (name, value) in pairs {
        match name.as_string().as_deref() {
            Some("total_results") => total = value.as_int().unwrap_or_default(),
            Some("results") => {
                let Reply::Array(results) = value else {
                    return Err(Error::invalid_data("FT.SEARCH results is not a list"));
                };
                for result in results {
                    let Reply::Map(entry) = result else {
                        return Err(Error::invalid_data("FT.SEARCH result is not a map"));
                    };
                    let mut key = String::new();
                    let mut fields = Vec::new();
                    for (k, v) in entry {
                        match k.as_string().as_deref() {
                            Some("id") => key = v.as_string().unwrap_or_default(),
                            Some("extra_attributes") => match v {
                                Reply::Map(attrs) => fields = attrs,
                                Reply::Array(flat) => fields = pairs_from_flat(flat)?,
                                _ => {}
                            },
                            _ => {}
                        }
                    }
                    documents.push(build_document(&key, fields, keys, schema));
                }
            }
            _ => {}
        }
    }

    Ok(SearchResults { total, documents })
}

fn pairs_from_flat(fields: Vec<Reply>) -> Result<Vec<(Reply, Reply)>> {
    if fields.len() % 2 != 0 {
        return Err(Error::invalid_data(format!(
            "FT.SEARCH record has an odd number of field tokens ({})",
            fields.len()
        )));
    }
    let mut iter = fields.into_iter();
    let mut pairs = Vec::new();
    while let (Some(k), Some(v)) = (iter.next(), iter.next()) {
        pairs.push((k, v));
    }
    Ok(pairs)
}

fn build_document(
    key: &str,
    fields: Vec<(Reply, Reply)>,
    keys: &ReservedKeys,
    schema: Option<&IndexSchema>,
) -> Document {
    let mut doc = Document::default();
    let mut metadata = Metadata::new();

    for (name, value) in fields {
        let Some(name) = name.as_string() else {
            continue;
        };
        if name == keys.vector {
            continue;
        }
        let raw = value.as_string().unwrap_or_default();
        if name == keys.content {
            doc.page_content = raw;
        } else if name == keys.distance {
            doc.score = raw.parse().unwrap_or_else(|_| {
                log::debug!("Unparseable distance '{raw}' for {key}, using 0");
                0.0
            });
        } else {
            let value = decode_field(&name, &raw, schema);
            metadata.insert(name, value);
        }
    }

    metadata
        .entry("id".to_string())
        .or_insert_with(|| MetadataValue::String(key.to_string()));
    doc.metadata = metadata;
    doc
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::schema::{NumericField, TagField, TextField};

    fn record(fields: &[(&str, &str)]) -> Reply {
        Reply::Array(
            fields
                .iter()
                .flat_map(|(k, v)| [Reply::bulk(*k), Reply::bulk(*v)])
                .collect(),
        )
    }

    fn schema() -> IndexSchema {
        IndexSchema::new()
            .with_text(TextField::new("user"))
            .with_numeric(NumericField::new("age"))
            .with_tag(TagField::new("roles").with_separator("|"))
    }

    #[test]
    fn test_decode_resp2_reply() {
        let reply = Reply::Array(vec![
            Reply::Int(7),
            Reply::bulk("doc:users:1"),
            record(&[
                ("content", "foo"),
                ("distance", "0.25"),
                ("user", "john"),
                ("age", "18"),
                ("roles", "admin|dev"),
                ("content_vector", "\u{1}\u{2}"),
            ]),
            Reply::bulk("doc:users:2"),
            record(&[("content", "bar"), ("distance", "0.5"), ("id", "custom")]),
        ]);

        let results = decode_search_reply(reply, &ReservedKeys::default(), Some(&schema())).unwrap();
        assert_eq!(results.total, 7);
        assert_eq!(results.documents.len(), 2);

        let first = &results.documents[0];
        assert_eq!(first.page_content, "foo");
        assert_eq!(first.score, 0.25);
        assert_eq!(first.get("user"), Some(&MetadataValue::String("john".into())));
        assert_eq!(first.get("age"), Some(&MetadataValue::Integer(18)));
        assert_eq!(
            first.get("roles"),
            Some(&MetadataValue::List(vec!["admin".into(), "dev".into()]))
        );
        assert_eq!(first.get("id"), Some(&MetadataValue::String("doc:users:1".into())));
        assert!(first.get("content_vector").is_none());
        assert!(first.get("content").is_none());
        assert!(first.get("distance").is_none());

        let second = &results.documents[1];
        assert_eq!(second.get("id"), Some(&MetadataValue::String("custom".into())));
    }

    #[test]
    fn test_decode_without_schema_keeps_strings() {
        let reply = Reply::Array(vec![
            Reply::Int(1),
            Reply::bulk("k"),
            record(&[("age", "18"), ("distance", "oops")]),
        ]);
        let results = decode_search_reply(reply, &ReservedKeys::default(), None).unwrap();
        let doc = &results.documents[0];
        assert_eq!(doc.get("age"), Some(&MetadataValue::String("18".into())));
        assert_eq!(doc.score, 0.0);
    }

    #[test]
    fn test_decode_empty_result() {
        let results =
            decode_search_reply(Reply::Array(vec![Reply::Int(0)]), &ReservedKeys::default(), None)
                .unwrap();
        assert_eq!(results, SearchResults::default());
    }

    #[test]
    fn test_decode_resp3_reply() {
        let reply = Reply::Map(vec![
            (Reply::bulk("total_results"), Reply::Int(1)),
            (
                Reply::bulk("results"),
                Reply::Array(vec![Reply::Map(vec![
                    (Reply::bulk("id"), Reply::bulk("doc:x:1")),
                    (
                        Reply::bulk("extra_attributes"),
                        Reply::Map(vec![
                            (Reply::bulk("content"), Reply::bulk("hello")),
                            (Reply::bulk("distance"), Reply::bulk("0.1")),
                        ]),
                    ),
                ])]),
            ),
        ]);
        let results = decode_search_reply(reply, &ReservedKeys::default(), None).unwrap();
        assert_eq!(results.total, 1);
        assert_eq!(results.documents[0].page_content, "hello");
        assert_eq!(
            results.documents[0].get("id"),
            Some(&MetadataValue::String("doc:x:1".into()))
        );
    }

    #[test]
    fn test_custom_reserved_keys() {
        let keys = ReservedKeys {
            content: "body".into(),
            vector: "embedding".into(),
            distance: "score".into(),
        };
        let reply = Reply::Array(vec![
            Reply::Int(1),
            Reply::bulk("k"),
            record(&[("body", "text"), ("score", "0.75"), ("embedding", "xx"), ("content", "meta")]),
        ]);
        let doc = &decode_search_reply(reply, &keys, None).unwrap().documents[0];
        assert_eq!(doc.page_content, "text");
        assert_eq!(doc.score, 0.75);
        assert!(doc.get("embedding").is_none());
        assert_eq!(doc.get("content"), Some(&MetadataValue::String("meta".into())));
    }

    #[test]
    fn test_malformed_replies() {
        let keys = ReservedKeys::default();
        assert!(decode_search_reply(Reply::Okay, &keys, None).is_err());
        assert!(decode_search_reply(Reply::Array(vec![]), &keys, None).is_err());
        let odd = Reply::Array(vec![
            Reply::Int(1),
            Reply::bulk("k"),
            Reply::Array(vec![Reply::bulk("lonely")]),
        ]);
        assert!(matches!(
            decode_search_reply(odd, &keys, None),
            Err(Error::InvalidData(_))
        ));
    }

    #[test]
    fn test_decode_field_typing() {
        let schema = schema();
        assert_eq!(decode_field("age", "3.5", Some(&schema)), MetadataValue::Float(3.5));
        assert_eq!(decode_field("user", "42", Some(&schema)), MetadataValue::String("42".into()));
        assert_eq!(decode_field("unknown", "42", Some(&schema)), MetadataValue::String("42".into()));
    }
}
