// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Lenient deserializers for request bodies.
//!
//! Agents and forms send numbers as numbers, as strings, or as empty
//! strings. These helpers turn anything that is not a usable value into
//! `None` so optional fields stay unset instead of becoming 0.
//!
//! The `patch_*` variants wrap the result in an outer `Some` so a PATCH
//! handler can tell "field sent as null" from "field not sent". Use them
//! together with `#[serde(default)]`.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

fn value_to_f64(value: Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    n.filter(|v| v.is_finite())
}

fn value_to_bool(value: Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(b),
        Value::Number(n) => n.as_f64().map(|v| v != 0.0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "y" => Some(true),
            "false" | "0" | "no" | "n" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn value_to_string(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

pub fn f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(value_to_f64)
}

/// Whole numbers; fractional input is truncated.
pub fn i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(|v| value_to_f64(v).map(|n| n.trunc() as i64))
}

pub fn bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(value_to_bool)
}

/// Strings, with scalars stringified.
pub fn string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(value_to_string)
}

pub fn patch_f64<'de, D>(deserializer: D) -> Result<Option<Option<f64>>, D::Error>
where
    D: Deserializer<'de>,
{
    f64(deserializer).map(Some)
}

pub fn patch_bool<'de, D>(deserializer: D) -> Result<Option<Option<bool>>, D::Error>
where
    D: Deserializer<'de>,
{
    bool(deserializer).map(Some)
}

pub fn patch_string<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    string(deserializer).map(Some)
}
