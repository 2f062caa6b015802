//! Opt-in unflattening that also rebuilds lists.
//!
//! [`super::unflatten::unflattened_with`] keeps `field[idx]` as a literal field name and leaves
//! stringified lists as strings. This variant reads `[idx]` suffixes back into list positions and
//! parses cells holding a rendered list back into a list, so documents with lists survive a
//! flatten/unflatten round trip. [`unflattened_paths_with`] does the first half only, for
//! records whose string cells must stay strings even when they look like a JSON list.

use {
    super::{DEFAULT_SEP, Document, FieldPath, FlatRecord, Segment},
    serde_json::{Map, Value},
    tap::Pipe,
    tracing::{instrument, trace},
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("key '{key}' uses index {index}, but the list at that position only holds {len} element(s)")]
    IndexGap { key: String, index: usize, len: usize },
}

type Result<T> = std::result::Result<T, self::Error>;

#[extension_traits::extension(trait VecGetOrPushExt)]
impl<T> Vec<T> {
    /// Returns the element at `index`, pushing a new one when `index` is exactly the length.
    /// Any index further out is reported back together with the length.
    fn get_mut_or_push_with(&mut self, index: usize, or_insert_with: impl FnOnce() -> T) -> std::result::Result<&mut T, (usize, usize)> {
        if index == self.len() {
            self.push(or_insert_with());
        }
        let len = self.len();
        self.get_mut(index).ok_or((index, len))
    }
}

struct ValueBuilder<'a>(&'a mut Value);

impl<'a> ValueBuilder<'a> {
    fn make_array(self) -> &'a mut Vec<Value> {
        let ValueBuilder(value) = self;
        if !value.is_array() {
            *value = Value::Array(Vec::new());
        }
        value.as_array_mut().expect("replaced with an array above")
    }

    fn make_object(self) -> &'a mut Map<String, Value> {
        let ValueBuilder(value) = self;
        if !value.is_object() {
            *value = Value::Object(Map::new());
        }
        value.as_object_mut().expect("replaced with a document above")
    }

    fn apply(self, path: FieldPath<'_>, value: Value) -> std::result::Result<(), (usize, usize)> {
        match path.pop_start() {
            Some((Segment::Idx(idx), rest)) => self
                .make_array()
                .get_mut_or_push_with(idx, || Value::Null)
                .and_then(|slot| ValueBuilder(slot).apply(rest, value)),
            Some((Segment::Field(key), rest)) => {
                let slot = self.make_object().entry(key.into_owned()).or_insert(Value::Null);
                ValueBuilder(slot).apply(rest, value)
            }
            None => {
                *self.0 = value;
                Ok(())
            }
        }
    }
}

/// Parses a cell produced by list rendering back into a list.
pub fn revive_list(value: Value) -> Value {
    match value {
        Value::String(text) if text.starts_with('[') => match serde_json::from_str::<Vec<Value>>(&text) {
            Ok(values) => {
                trace!(len = values.len(), "parsed rendered list");
                Value::Array(values)
            }
            Err(_) => Value::String(text),
        },
        other => other,
    }
}

/// Rebuilds lists from `[idx]` suffixes, keeping every cell value as it is.
#[instrument(skip(record), fields(keys = record.len()))]
pub fn unflattened_paths_with(record: FlatRecord, sep: &str) -> Result<Document> {
    let mut out = Document::new();
    record.into_iter().try_for_each(|(key, value)| {
        let path = FieldPath::parse(&key, sep);
        match path.pop_start() {
            Some((first, rest)) => {
                let slot = out.entry(first.to_string()).or_insert(Value::Null);
                ValueBuilder(slot)
                    .apply(rest, value)
                    .map_err(|(index, len)| self::Error::IndexGap { key: key.clone(), index, len })
            }
            None => Ok(()),
        }
    })?;
    Ok(out)
}

pub fn unflattened_paths(record: FlatRecord) -> Result<Document> {
    unflattened_paths_with(record, DEFAULT_SEP)
}

/// Rebuilds lists from `[idx]` suffixes and from cells holding a rendered list. A string cell
/// that merely looks like a JSON list is parsed too.
pub fn unflattened_lossless_with(record: FlatRecord, sep: &str) -> Result<Document> {
    record
        .into_iter()
        .map(|(key, value)| (key, revive_list(value)))
        .collect::<FlatRecord>()
        .pipe(|record| unflattened_paths_with(record, sep))
}

pub fn unflattened_lossless(record: FlatRecord) -> Result<Document> {
    unflattened_lossless_with(record, DEFAULT_SEP)
}
