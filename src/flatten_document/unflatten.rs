use {
    super::{DEFAULT_SEP, Document, FlatRecord},
    serde_json::{Map, Value},
    tap::Tap,
    tracing::{instrument, trace},
};

fn split_key<'k>(key: &'k str, sep: &str) -> Vec<&'k str> {
    match sep {
        "" => vec![key],
        sep => key.split(sep).collect(),
    }
}

/// Walks `parts` from `root`, turning every slot on the way into a document, and writes `value`
/// at the last part. A scalar standing where a document is needed gets replaced, and so does a
/// document standing where the value lands.
fn insert_path(root: &mut Document, parts: &[&str], value: Value) {
    let Some((last, intermediate)) = parts.split_last() else {
        return;
    };
    let cursor = intermediate.iter().fold(root, |cursor: &mut Document, part| {
        let slot = cursor.entry(*part).or_insert(Value::Null);
        if !slot.is_object() {
            if !slot.is_null() {
                trace!(%part, replaced = %slot, "replacing value with a document");
            }
            *slot = Value::Object(Map::new());
        }
        slot.as_object_mut().expect("replaced with a document above")
    });
    cursor.insert(last.to_string(), value);
}

/// Rebuilds a document from a flat record by splitting every key on `sep`.
///
/// Keys are applied in record order and the later key wins on a collision: `{"a": 1, "a.b": 2}`
/// gives `{"a": {"b": 2}}` while `{"a.b": 2, "a": 1}` gives `{"a": 1}`. List suffixes are not
/// interpreted, `a[0].x` lands under the literal field `a[0]`; see
/// [`super::lossless::unflattened_lossless`] for a version that rebuilds lists.
#[instrument(skip(record), fields(keys = record.len()))]
pub fn unflattened_with(record: FlatRecord, sep: &str) -> Document {
    Document::new().tap_mut(|out| {
        record
            .into_iter()
            .for_each(|(key, value)| insert_path(out, &split_key(&key, sep), value))
    })
}

pub fn unflattened(record: FlatRecord) -> Document {
    unflattened_with(record, DEFAULT_SEP)
}

#[cfg(test)]
pub mod test {
    use {
        super::*,
        crate::flatten_document::flatten::flattened,
        anyhow::Context,
        serde_json::json,
        tap::Pipe,
    };

    fn record(value: Value) -> FlatRecord {
        match value {
            Value::Object(map) => map,
            other => panic!("not a record: {other}"),
        }
    }

    #[test]
    fn test_unflatten_nested() {
        assert_eq!(
            unflattened(record(json!({"a.b": 1, "a.c": 2}))).pipe(Value::Object),
            json!({"a": {"b": 1, "c": 2}})
        );
    }

    #[test]
    fn test_unflatten_keeps_index_suffix_as_literal_field() {
        assert_eq!(
            unflattened(record(json!({"a[0].x": 1, "a[1].x": 2}))).pipe(Value::Object),
            json!({"a[0]": {"x": 1}, "a[1]": {"x": 2}})
        );
    }

    #[test]
    fn test_unflatten_scalar_then_nested_key() {
        assert_eq!(
            unflattened(record(json!({"a": 1, "a.b": 2}))).pipe(Value::Object),
            json!({"a": {"b": 2}})
        );
    }

    #[test]
    fn test_unflatten_nested_then_scalar_key() {
        assert_eq!(
            unflattened(record(json!({"a.b": 2, "a": 1}))).pipe(Value::Object),
            json!({"a": 1})
        );
    }

    #[test]
    fn test_unflatten_collision_deep_in_the_path() {
        assert_eq!(
            unflattened(record(json!({"a.b": "leaf", "a.b.c.d": true, "a.e": null}))).pipe(Value::Object),
            json!({"a": {"b": {"c": {"d": true}}, "e": null}})
        );
    }

    #[test]
    fn test_unflatten_empty_key_is_a_single_empty_field() {
        assert_eq!(unflattened(record(json!({"": 5}))).pipe(Value::Object), json!({"": 5}));
    }

    #[test]
    fn test_unflatten_custom_separator() {
        assert_eq!(
            unflattened_with(record(json!({"a/b": 1, "c.d": 2})), "/").pipe(Value::Object),
            json!({"a": {"b": 1}, "c.d": 2})
        );
    }

    #[test]
    fn test_unflatten_keeps_first_seen_field_order() {
        let out = unflattened(record(json!({"z.a": 1, "b": 2, "z.c": 3})));
        assert_eq!(out.keys().collect::<Vec<_>>(), ["z", "b"]);
    }

    #[test]
    fn test_example_1() -> anyhow::Result<()> {
        json!({
            "user": {
                "name": "John",
                "address": {
                    "city": "NYC",
                    "zip": "10001"
                }
            },
            "active": true,
            "tags": "not a list",
            "score": 4.5,
            "deleted_at": null
        })
        .pipe(|expected| {
            expected
                .as_object()
                .cloned()
                .context("fixture is a document")
                .map(flattened)
                .map(super::unflattened)
                .map(Value::Object)
                .and_then(|got| {
                    anyhow::ensure!(expected == got, "expected:\n{expected}\n\ngot:\n{got}");
                    Ok(())
                })
        })
    }

    #[test]
    fn test_list_of_documents_does_not_round_trip() {
        let original = json!({"a": [{"x": 1}, {"x": 2}]});
        let got = original
            .as_object()
            .cloned()
            .map(flattened)
            .map(super::unflattened)
            .map(Value::Object);
        assert_ne!(got, Some(original));
    }
}
