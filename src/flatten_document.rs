use {
    itertools::Itertools,
    serde_json::{Map, Value},
    std::{borrow::Cow, fmt},
    tap::{Pipe, Tap},
};

/// Separator placed between field names of a path key.
pub const DEFAULT_SEP: &str = ".";

/// A nested, insertion-ordered, string keyed record as it lives in a store.
pub type Document = Map<String, Value>;

/// Single level mapping from path key to a primitive value. One row of the editable table.
pub type FlatRecord = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Segment<'a> {
    Idx(usize),
    Field(Cow<'a, str>),
}

impl fmt::Display for Segment<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Idx(idx) => write!(f, "[{idx}]"),
            Segment::Field(field) => f.write_str(field),
        }
    }
}

impl<'a> Segment<'a> {
    pub fn field(name: impl Into<Cow<'a, str>>) -> Self {
        Segment::Field(name.into())
    }
}

/// Parses a trailing `[<digits>]` off `part`.
fn strip_index(part: &str) -> Option<(&str, usize)> {
    part.strip_suffix(']')
        .and_then(|rest| rest.rsplit_once('['))
        .filter(|(_, digits)| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|(head, digits)| digits.parse::<usize>().ok().map(|idx| (head, idx)))
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct FieldPath<'a>(pub(crate) Vec<Segment<'a>>);

impl<'a> FieldPath<'a> {
    pub fn pop_start(mut self) -> Option<(Segment<'a>, Self)> {
        match self.0.len() {
            0 => None,
            _ => Some((self.0.remove(0), self)),
        }
    }

    pub fn join(&self, segment: Segment<'a>) -> Self {
        self.clone().tap_mut(|p| p.0.push(segment))
    }

    /// Renders the path as a key: fields joined by `sep`, list indices glued to the
    /// preceding field as `[idx]`. An empty leading field adds no separator.
    pub fn render(&self, sep: &str) -> String {
        String::new().tap_mut(|out| {
            self.0.iter().for_each(|segment| match segment {
                Segment::Idx(idx) => out.push_str(&format!("[{idx}]")),
                Segment::Field(field) => {
                    if !out.is_empty() {
                        out.push_str(sep);
                    }
                    out.push_str(field);
                }
            })
        })
    }

    /// Inverse of [`FieldPath::render`]. A `[idx]` suffix is only read as an index when a
    /// field name precedes it, so the first segment is always a field.
    pub fn parse(key: &'a str, sep: &str) -> FieldPath<'a> {
        let parts = match sep {
            "" => vec![key],
            sep => key.split(sep).collect(),
        };
        parts
            .into_iter()
            .flat_map(|part| {
                let mut head = part;
                let mut indices = Vec::new();
                while let Some((rest, idx)) = strip_index(head).filter(|(rest, _)| !rest.is_empty()) {
                    indices.push(idx);
                    head = rest;
                }
                std::iter::once(Segment::field(head)).chain(indices.into_iter().rev().map(Segment::Idx))
            })
            .collect::<Vec<_>>()
            .pipe(FieldPath)
    }
}

pub fn boxed_iter<'a, T, I>(iter: I) -> Box<dyn Iterator<Item = T> + 'a>
where
    T: 'a,
    I: Iterator<Item = T> + 'a,
{
    Box::new(iter)
}

/// JSON text with `", "` between items and `": "` after keys, e.g. `[1, "a", {"x": null}]`.
#[derive(Debug, Clone, Copy)]
pub struct Rendered<'a>(pub &'a Value);

impl fmt::Display for Rendered<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Value::Array(values) => write!(f, "[{}]", values.iter().map(Rendered).format(", ")),
            Value::Object(map) => write!(
                f,
                "{{{}}}",
                map.iter().format_with(", ", |(key, value), g| {
                    g(&format_args!("{}: {}", Value::from(key.as_str()), Rendered(value)))
                })
            ),
            scalar => write!(f, "{scalar}"),
        }
    }
}

/// The cell text stored for a list that is not expanded positionally.
pub fn render_list(values: &[Value]) -> String {
    format!("[{}]", values.iter().map(Rendered).format(", "))
}

#[extension_traits::extension(pub trait DocumentFlattenExt)]
impl Map<String, Value> {
    fn flattened(self) -> FlatRecord {
        flatten::flattened(self)
    }

    fn unflattened(self) -> Document {
        unflatten::unflattened(self)
    }
}

pub mod flatten;
pub mod lossless;
pub mod unflatten;

#[cfg(test)]
mod tests {
    use {super::*, serde_json::json};

    #[test]
    fn test_render_nested_path() {
        let path = FieldPath::default()
            .join(Segment::field("items"))
            .join(Segment::Idx(2))
            .join(Segment::field("sku"));
        assert_eq!(path.render("."), "items[2].sku");
        assert_eq!(path.render("/"), "items[2]/sku");
    }

    #[test]
    fn test_render_skips_separator_after_empty_leading_field() {
        let path = FieldPath::default().join(Segment::field("")).join(Segment::field("b"));
        assert_eq!(path.render("."), "b");
    }

    #[test]
    fn test_parse_index_suffixes() {
        assert_eq!(
            FieldPath::parse("items[2].sku", "."),
            FieldPath(vec![Segment::field("items"), Segment::Idx(2), Segment::field("sku")])
        );
        assert_eq!(
            FieldPath::parse("grid[1][3]", "."),
            FieldPath(vec![Segment::field("grid"), Segment::Idx(1), Segment::Idx(3)])
        );
    }

    #[test]
    fn test_parse_keeps_malformed_suffixes_as_fields() {
        assert_eq!(FieldPath::parse("[0]", "."), FieldPath(vec![Segment::field("[0]")]));
        assert_eq!(FieldPath::parse("a[+1]", "."), FieldPath(vec![Segment::field("a[+1]")]));
        assert_eq!(FieldPath::parse("a[]", "."), FieldPath(vec![Segment::field("a[]")]));
        assert_eq!(FieldPath::parse("", "."), FieldPath(vec![Segment::field("")]));
    }

    #[test]
    fn test_parse_with_empty_separator_does_not_split() {
        assert_eq!(FieldPath::parse("a.b", ""), FieldPath(vec![Segment::field("a.b")]));
    }

    #[test]
    fn test_render_list() {
        assert_eq!(render_list(&[json!(1), json!(2), json!(3)]), "[1, 2, 3]");
        assert_eq!(render_list(&[]), "[]");
        assert_eq!(
            render_list(&[json!("a\"b"), json!(null), json!(true), json!(1.5)]),
            r#"["a\"b", null, true, 1.5]"#
        );
        assert_eq!(
            render_list(&[json!(1), json!({"x": [2, 3], "y": {}})]),
            r#"[1, {"x": [2, 3], "y": {}}]"#
        );
    }

    #[test]
    fn test_rendered_list_parses_back_as_json() {
        let values = vec![json!("a"), json!({"k": [1, null]}), json!(false)];
        let parsed: Vec<Value> = serde_json::from_str(&render_list(&values)).unwrap();
        assert_eq!(parsed, values);
    }
}
