//! Typed get/set built atop [`Document`]'s string accessors.
//!
//! One generic accessor per access pattern instead of a method per
//! scalar type: anything `FromStr + Display` works (bool, the integer
//! and float types, strings, and user types alike).

use std::fmt::Display;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;

use crate::document::Document;

/// A stored value that cannot be parsed as the requested type.
///
/// Only the eager `get_or_set*` accessors surface this: once a
/// malformed value is already on disk there is no sensible default to
/// fall back to. The optional accessors report the same situation as
/// absent.
#[derive(Debug, thiserror::Error)]
#[error("value {value:?} at {path:?} does not parse as {wanted}")]
pub struct ValueError {
    pub path: Vec<String>,
    pub value: String,
    pub wanted: &'static str,
}

impl ValueError {
    fn new<T>(path: &[&str], value: &str) -> Self {
        Self {
            path: path.iter().map(|s| s.to_string()).collect(),
            value: value.to_string(),
            wanted: std::any::type_name::<T>(),
        }
    }
}

impl Document {
    /// The value at `path`, parsed as `T` after trimming. Absent when
    /// the section is missing or its value fails to parse.
    pub fn get_parsed<T: FromStr>(&self, path: &[&str]) -> Option<T> {
        self.get_str(path)?.trim().parse().ok()
    }

    /// Set the value at `path` from any displayable type, creating the
    /// section if necessary.
    pub fn set_display<T: Display>(&mut self, value: T, path: &[&str]) {
        self.set(&value.to_string(), path);
    }

    /// The value at `path` parsed as `T`, storing and returning
    /// `default` when the section is absent. A present but malformed
    /// value is a loud [`ValueError`].
    pub fn get_or_set<T>(&mut self, default: T, path: &[&str]) -> Result<T, ValueError>
    where
        T: FromStr + Display,
    {
        self.get_or_set_with(|| default, path)
    }

    /// Like [`Document::get_or_set`], but the default is only computed
    /// when actually needed.
    pub fn get_or_set_with<T, F>(&mut self, default: F, path: &[&str]) -> Result<T, ValueError>
    where
        T: FromStr + Display,
        F: FnOnce() -> T,
    {
        let id = match self.get(path) {
            Some(id) => id,
            None => {
                let value = default().to_string();
                self.get_or_create(path, &value)
            }
        };
        let raw = self.tree().value(id).trim();
        raw.parse().map_err(|_| ValueError::new::<T>(path, raw))
    }

    /// The value at `path`, decoded as an array of `T`. Absent when the
    /// section is missing or any element fails to parse.
    pub fn get_parsed_array<T: FromStr>(&self, path: &[&str]) -> Option<Vec<T>> {
        let raw = self.get_str(path)?;
        split_array(raw.trim())
            .into_iter()
            .map(|element| element.parse().ok())
            .collect()
    }

    /// Set the value at `path` to the `[a, b, c]` encoding of `values`.
    pub fn set_array<T: Display>(&mut self, values: &[T], path: &[&str]) {
        self.set(&join_array(values), path);
    }

    /// The array at `path`, storing and returning `default` when the
    /// section is absent. A present value with a malformed element is a
    /// loud [`ValueError`].
    pub fn get_or_set_array<T>(&mut self, default: &[T], path: &[&str]) -> Result<Vec<T>, ValueError>
    where
        T: FromStr + Display,
    {
        self.get_or_set_array_encoded(|| join_array(default), path)
    }

    /// Like [`Document::get_or_set_array`], with a lazily computed
    /// default.
    pub fn get_or_set_array_with<T, F>(
        &mut self,
        default: F,
        path: &[&str],
    ) -> Result<Vec<T>, ValueError>
    where
        T: FromStr + Display,
        F: FnOnce() -> Vec<T>,
    {
        self.get_or_set_array_encoded(|| join_array(&default()), path)
    }

    fn get_or_set_array_encoded<T, F>(&mut self, encode: F, path: &[&str]) -> Result<Vec<T>, ValueError>
    where
        T: FromStr,
        F: FnOnce() -> String,
    {
        let id = match self.get(path) {
            Some(id) => id,
            None => {
                let encoded = encode();
                self.get_or_create(path, &encoded)
            }
        };
        let raw = self.tree().value(id).trim().to_string();
        split_array(&raw)
            .into_iter()
            .map(|element| {
                element
                    .parse()
                    .map_err(|_| ValueError::new::<T>(path, &raw))
            })
            .collect()
    }
}

/// Split an array-encoded value into element strings.
///
/// A value wrapped in `[` `]` splits on comma plus one optional
/// whitespace; anything else, including malformed bracket syntax,
/// falls back to splitting on runs of whitespace, never an error.
fn split_array(value: &str) -> Vec<&str> {
    static ELEMENT_SPLIT: OnceLock<Regex> = OnceLock::new();
    if let Some(inner) = value.strip_prefix('[').and_then(|v| v.strip_suffix(']')) {
        let re = ELEMENT_SPLIT
            .get_or_init(|| Regex::new(r",\s?").expect("invalid array element regex"));
        re.split(inner).collect()
    } else {
        value.split_whitespace().collect()
    }
}

/// The `[a, b, c]` text encoding written by the array setters.
fn join_array<T: Display>(values: &[T]) -> String {
    let elements: Vec<String> = values.iter().map(|v| v.to_string()).collect();
    format!("[{}]", elements.join(", "))
}
