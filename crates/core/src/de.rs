//! Serde helpers for the loosely typed wire contract.
//!
//! The upstream service reports numeric fields inconsistently: sometimes as
//! JSON numbers, sometimes as numeric strings, sometimes not at all. These
//! helpers coerce whatever arrives into `Option<f64>` so the rest of the
//! crate can work with honest optional numbers.

use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer};

/// Deserialize a number, a numeric string, null, or anything else into
/// `Option<f64>`. Non-numeric and non-finite values become `None`.
///
/// # Errors
///
/// Never fails on value shape; only propagates deserializer-level errors.
pub fn option_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Loose {
        Num(f64),
        Text(String),
        Other(IgnoredAny),
    }

    let raw = Option::<Loose>::deserialize(deserializer)?;
    Ok(match raw {
        Some(Loose::Num(n)) if n.is_finite() => Some(n),
        Some(Loose::Text(s)) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    })
}
