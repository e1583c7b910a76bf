//! Serde helper for 128-bit ids and balances.
//!
//! Values are written as decimal strings so JSON consumers that parse
//! numbers as doubles never lose precision. Both strings and plain JSON
//! numbers are accepted on input.

use serde::de::Error;
use serde::{Deserialize, Deserializer, Serializer};

pub fn serialize<S>(value: &u128, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&value.to_string())
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<u128, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum U128Input {
        String(String),
        Number(u64),
    }

    match U128Input::deserialize(deserializer)? {
        U128Input::String(raw) => raw.parse::<u128>().map_err(D::Error::custom),
        U128Input::Number(value) => Ok(u128::from(value)),
    }
}

/// Same encoding for `Vec<u128>`.
pub mod vec {
    use serde::ser::SerializeSeq;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(values: &[u128], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(values.len()))?;
        for v in values {
            seq.serialize_element(&v.to_string())?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u128>, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Wrapped(#[serde(with = "super")] u128);

        let items = Vec::<Wrapped>::deserialize(deserializer)?;
        Ok(items.into_iter().map(|w| w.0).collect())
    }
}

/// Same encoding for signed values such as production rates.
pub mod signed {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &i128, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<i128, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum I128Input {
            String(String),
            Number(i64),
        }

        match I128Input::deserialize(deserializer)? {
            I128Input::String(raw) => raw.parse::<i128>().map_err(D::Error::custom),
            I128Input::Number(value) => Ok(i128::from(value)),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
    struct Wrapper {
        #[serde(with = "super")]
        id: u128,
        #[serde(with = "super::vec")]
        ids: Vec<u128>,
    }

    #[test]
    fn serializes_as_string() {
        let w = Wrapper { id: u128::MAX, ids: vec![1, 2] };
        let json = serde_json::to_string(&w).expect("serialize");
        assert_eq!(
            json,
            format!(r#"{{"id":"{}","ids":["1","2"]}}"#, u128::MAX)
        );
    }

    #[test]
    fn deserialize_accepts_string_and_number() {
        let parsed: Wrapper =
            serde_json::from_str(r#"{"id":"340282366920938463463374607431768211455","ids":[7,"8"]}"#)
                .expect("mixed input");
        assert_eq!(parsed.id, u128::MAX);
        assert_eq!(parsed.ids, vec![7, 8]);
    }
}
