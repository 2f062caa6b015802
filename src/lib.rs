pub mod flatten_document;
pub mod grid;
pub mod session;
pub mod store;

/// Serializes the wrapped value as a flat record and deserializes it back from one.
///
/// Deserializing first rebuilds the value from `[idx]` keys alone, so a `String` field holding
/// `"[1]"` stays a string. Only when that does not fit `T` are cells holding a rendered list
/// parsed back into lists. A type with a `Vec` of scalars next to a `String` field holding
/// list-like text therefore gets that text parsed as well, and fails to deserialize.
#[derive(Debug)]
pub struct Flattened<T>(pub T);

#[derive(Debug)]
pub struct FlattenedRef<'a, T>(pub &'a T);

impl<T> Flattened<T> {
    pub fn as_ref(&self) -> FlattenedRef<'_, T> {
        FlattenedRef(&self.0)
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}

mod serde;
