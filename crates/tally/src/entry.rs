//! Entry payloads exchanged with callers

use serde::{Deserialize, Serialize};

/// One element of a write batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryInput {
    pub id: String,
    #[serde(default)]
    pub score: f64,
    #[serde(default, with = "info_bytes", skip_serializing_if = "Option::is_none")]
    pub info: Option<Vec<u8>>,
}

impl EntryInput {
    pub fn new(id: impl Into<String>, score: f64) -> Self {
        Self {
            id: id.into(),
            score,
            info: None,
        }
    }

    pub fn with_info(mut self, info: impl Into<Vec<u8>>) -> Self {
        self.info = Some(info.into());
        self
    }

    /// Info bytes when present and non-empty
    pub(crate) fn nonempty_info(&self) -> Option<&[u8]> {
        self.info.as_deref().filter(|info| !info.is_empty())
    }
}

/// A ranked member as returned by reads
///
/// `rank` counts from the highest score, starting at 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub id: String,
    pub rank: usize,
    pub score: f64,
    #[serde(default, with = "info_bytes", skip_serializing_if = "Option::is_none")]
    pub info: Option<Vec<u8>>,
}

impl Entry {
    /// Info as text, when it is valid UTF-8
    pub fn info_str(&self) -> Option<&str> {
        self.info
            .as_deref()
            .and_then(|info| std::str::from_utf8(info).ok())
    }
}

/// Info is opaque bytes, written as a string when it is UTF-8
mod info_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(info: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match info.as_deref() {
            None => serializer.serialize_none(),
            Some(bytes) => match std::str::from_utf8(bytes) {
                Ok(text) => serializer.serialize_str(text),
                Err(_) => serializer.serialize_bytes(bytes),
            },
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Text(String),
        Raw(Vec<u8>),
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<Repr>::deserialize(deserializer)?.map(|repr| match repr {
            Repr::Text(text) => text.into_bytes(),
            Repr::Raw(bytes) => bytes,
        }))
    }
}
