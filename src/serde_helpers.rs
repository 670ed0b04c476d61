use std::fmt::Display;

use serde::ser::Serializer;

/// Serializes 64-bit integers as strings so JSON consumers never lose
/// precision on them.
pub fn serialize_option_int_as_string<T, S>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
where
    T: Display,
    S: Serializer,
{
    match value {
        None => serializer.serialize_none(),
        Some(v) => serializer.collect_str(v),
    }
}
