use {
    super::{DEFAULT_SEP, Document, FieldPath, FlatRecord, Segment, boxed_iter, render_list},
    serde_json::{Map, Value},
    std::iter::once,
    tap::Pipe,
    tracing::{instrument, trace},
};

pub fn assert_document(value: Value) -> Result<Document, Value> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(other),
    }
}

/// Splits a list into its documents when every element is one. Empty lists stay lists.
pub fn assert_document_list(values: Vec<Value>) -> Result<Vec<Document>, Vec<Value>> {
    match !values.is_empty() && values.iter().all(Value::is_object) {
        true => values
            .into_iter()
            .filter_map(|value| match value {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect::<Vec<_>>()
            .pipe(Ok),
        false => Err(values),
    }
}

fn document_leaves(prefix: FieldPath<'static>, document: Document) -> Box<dyn Iterator<Item = (FieldPath<'static>, Value)>> {
    document
        .into_iter()
        .flat_map(move |(key, value)| flattened_iter(prefix.join(Segment::field(key)), value))
        .pipe(boxed_iter)
}

/// Yields every leaf of `value` under `prefix`. Documents recurse, lists made only of
/// documents recurse positionally, any other list becomes one rendered string leaf.
pub fn flattened_iter(prefix: FieldPath<'static>, value: Value) -> impl Iterator<Item = (FieldPath<'static>, Value)> {
    match value {
        Value::Object(map) => document_leaves(prefix, map),
        Value::Array(values) => match assert_document_list(values) {
            Ok(documents) => documents
                .into_iter()
                .enumerate()
                .flat_map(move |(idx, document)| document_leaves(prefix.join(Segment::Idx(idx)), document))
                .pipe(boxed_iter),
            Err(values) => {
                trace!(len = values.len(), "keeping list as a single cell");
                once((prefix, Value::String(render_list(&values)))).pipe(boxed_iter)
            }
        },
        primitive @ (Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_)) => once((prefix, primitive)).pipe(boxed_iter),
    }
}

/// Flattens `document` with every key prefixed by `parent` (unless empty), joining fields with `sep`.
/// Later leaves overwrite earlier ones rendering to the same key.
#[instrument(skip(document), fields(fields = document.len()))]
pub fn flattened_with(document: Document, parent: &str, sep: &str) -> FlatRecord {
    let prefix = match parent {
        "" => FieldPath::default(),
        parent => FieldPath(vec![Segment::field(parent.to_string())]),
    };
    document_leaves(prefix, document)
        .map(|(path, value)| (path.render(sep), value))
        .collect::<Map<_, _>>()
}

pub fn flattened(document: Document) -> FlatRecord {
    flattened_with(document, "", DEFAULT_SEP)
}
