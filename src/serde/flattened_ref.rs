use {
    crate::{
        FlattenedRef,
        flatten_document::flatten::{assert_document, flattened},
    },
    serde::Serialize,
};

impl<T> Serialize for FlattenedRef<'_, T>
where
    T: Serialize,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serde_json::to_value(self.0)
            .map_err(serde::ser::Error::custom)
            .and_then(|value| {
                assert_document(value).map_err(|other| {
                    serde::ser::Error::custom(format!("only documents can be flattened, found {other}"))
                })
            })
            .map(flattened)
            .and_then(|record| serializer.collect_map(record))
    }
}
