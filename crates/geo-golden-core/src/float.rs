//! Lenient serde helpers for floating point values.
//!
//! JSON has no encoding for NaN or infinities, yet no-data values and pixel
//! samples routinely hold them. Non-finite values are written as the strings
//! `"NaN"`, `"Infinity"` and `"-Infinity"`; `null` is read back as NaN.

use serde::{Deserialize, Deserializer, Serializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum FloatRepr {
    Number(f64),
    Text(String),
    Null(()),
}

fn from_repr<E: serde::de::Error>(repr: FloatRepr) -> Result<f64, E> {
    match repr {
        FloatRepr::Number(v) => Ok(v),
        FloatRepr::Null(()) => Ok(f64::NAN),
        FloatRepr::Text(text) => match text.trim() {
            "NaN" | "nan" => Ok(f64::NAN),
            "Infinity" | "inf" | "+Infinity" => Ok(f64::INFINITY),
            "-Infinity" | "-inf" => Ok(f64::NEG_INFINITY),
            other => other
                .parse::<f64>()
                .map_err(|_| E::custom(format!("invalid floating point value '{other}'"))),
        },
    }
}

/// Serialize an `f64`, writing non-finite values as strings.
pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.is_nan() {
        serializer.serialize_str("NaN")
    } else if value.is_infinite() {
        serializer.serialize_str(if *value > 0.0 { "Infinity" } else { "-Infinity" })
    } else {
        serializer.serialize_f64(*value)
    }
}

/// Deserialize an `f64` from a number, a non-finite marker string or `null`.
pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    from_repr(FloatRepr::deserialize(deserializer)?)
}

/// Same encoding for optional values; an absent field stays `None`.
pub mod option {
    use super::*;

    /// Serialize an optional `f64`.
    pub fn serialize<S: Serializer>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => super::serialize(v, serializer),
            None => serializer.serialize_none(),
        }
    }

    /// Deserialize an optional `f64`.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
        Option::<FloatRepr>::deserialize(deserializer)?
            .map(from_repr)
            .transpose()
    }
}
