use {
    crate::{
        Flattened,
        flatten_document::{
            Document, FlatRecord,
            lossless::{self, unflattened_lossless, unflattened_paths},
        },
    },
    serde::{Deserialize, Serialize, de::DeserializeOwned},
    tracing::{debug, instrument},
};

impl<T> Serialize for Flattened<T>
where
    T: Serialize,
{
    #[instrument(skip_all)]
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.as_ref().serialize(serializer)
    }
}

fn typed<T, E>(document: Result<Document, lossless::Error>) -> Result<T, E>
where
    T: DeserializeOwned,
    E: serde::de::Error,
{
    document
        .map_err(E::custom)
        .and_then(|document| serde_json::from_value::<T>(serde_json::Value::Object(document)).map_err(E::custom))
}

impl<'de, T> Deserialize<'de> for Flattened<T>
where
    T: DeserializeOwned,
{
    #[instrument(skip(deserializer))]
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let record = FlatRecord::deserialize(deserializer)?;
        typed::<T, D::Error>(unflattened_paths(record.clone()))
            .or_else(|error| {
                debug!(%error, "retrying with rendered lists parsed");
                typed(unflattened_lossless(record))
            })
            .map(Self)
    }
}
