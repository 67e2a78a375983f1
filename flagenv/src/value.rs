//! Flag value types
//!
//! Every flag stores its current value behind the [`Value`] trait. The flag
//! set only ever talks to values through text: `set` parses a string into the
//! underlying type and `render` turns it back into a string for help output.
//!
//! The built-in implementations share their storage with a [`Var`] handle
//! returned to the caller at declaration time, so the parsed value can be
//! read after [`FlagSet::parse`](crate::FlagSet::parse) without going back
//! through the flag set.

use crate::error::BoxError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Display;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Capability of parsing a string into a typed value and storing it.
///
/// Implement this for custom flag types and declare them with
/// [`FlagSet::var`](crate::FlagSet::var).
///
/// # Example
///
/// ```rust
/// use flagenv::{BoxError, ErrorHandling, FlagSet, Value};
///
/// struct Level(u8);
///
/// impl Value for Level {
///     fn set(&mut self, s: &str) -> Result<(), BoxError> {
///         self.0 = match s {
///             "low" => 1,
///             "high" => 9,
///             other => return Err(format!("unknown level {other:?}").into()),
///         };
///         Ok(())
///     }
///
///     fn render(&self) -> String {
///         self.0.to_string()
///     }
/// }
///
/// let mut fs = FlagSet::new("app", ErrorHandling::ContinueOnError);
/// fs.var(Level(1), "level", "log `level` (low or high)");
/// fs.parse(["-level", "high"]).unwrap();
/// assert_eq!(fs.lookup("level").unwrap().value().render(), "9");
/// ```
pub trait Value: Send {
    /// Parse `s` and store the result.
    fn set(&mut self, s: &str) -> Result<(), BoxError>;

    /// Current value as text.
    fn render(&self) -> String;

    /// Placeholder shown after the flag name in help output.
    fn type_name(&self) -> &str {
        "value"
    }

    /// Boolean flags may appear without a value (`-verbose`).
    fn is_bool_flag(&self) -> bool {
        false
    }

    /// Whether `text` is what this type renders for its zero value.
    ///
    /// Zero defaults are omitted from help output.
    fn is_zero(&self, text: &str) -> bool {
        matches!(text, "" | "0" | "false")
    }
}

/// Shared handle to a flag's storage.
///
/// Cloning the handle shares the same value.
#[derive(Debug, Default)]
pub struct Var<T>(Arc<Mutex<T>>);

impl<T> Clone for Var<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T> Var<T> {
    /// Create a handle holding `value`.
    pub fn new(value: T) -> Self {
        Self(Arc::new(Mutex::new(value)))
    }

    /// Lock the value for inspection or in-place mutation.
    pub fn lock(&self) -> MutexGuard<'_, T> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the value, returning the previous one.
    pub fn replace(&self, value: T) -> T {
        std::mem::replace(&mut *self.lock(), value)
    }
}

impl<T: Clone> Var<T> {
    /// Copy of the current value.
    pub fn get(&self) -> T {
        self.lock().clone()
    }
}

/// Parse a boolean the way command-line tools traditionally accept it.
pub(crate) fn parse_bool(s: &str) -> Result<bool, BoxError> {
    match s {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(false),
        _ => Err("parse error".into()),
    }
}

/// Boolean flag value.
pub struct BoolValue(pub(crate) Var<bool>);

impl Value for BoolValue {
    fn set(&mut self, s: &str) -> Result<(), BoxError> {
        *self.0.lock() = parse_bool(s)?;
        Ok(())
    }

    fn render(&self) -> String {
        self.0.get().to_string()
    }

    fn type_name(&self) -> &str {
        "bool"
    }

    fn is_bool_flag(&self) -> bool {
        true
    }
}

/// Any `FromStr` type, rendered with `Display`.
pub struct ParseValue<T> {
    var: Var<T>,
    type_name: &'static str,
}

impl<T> ParseValue<T> {
    pub(crate) fn new(var: Var<T>, type_name: &'static str) -> Self {
        Self { var, type_name }
    }
}

impl<T> Value for ParseValue<T>
where
    T: FromStr + Display + Send,
    T::Err: Display,
{
    fn set(&mut self, s: &str) -> Result<(), BoxError> {
        let parsed = s.parse::<T>().map_err(|e| e.to_string())?;
        *self.var.lock() = parsed;
        Ok(())
    }

    fn render(&self) -> String {
        self.var.lock().to_string()
    }

    fn type_name(&self) -> &str {
        self.type_name
    }
}

/// Duration flag value in humantime syntax (`1h 30m`, `250ms`).
pub struct DurationValue(pub(crate) Var<Duration>);

impl Value for DurationValue {
    fn set(&mut self, s: &str) -> Result<(), BoxError> {
        *self.0.lock() = humantime::parse_duration(s)?;
        Ok(())
    }

    fn render(&self) -> String {
        humantime::format_duration(self.0.get()).to_string()
    }

    fn type_name(&self) -> &str {
        "duration"
    }

    fn is_zero(&self, text: &str) -> bool {
        text == "0s"
    }
}

/// Repeatable flag collecting every occurrence.
///
/// Each `set` splits its input on commas, so `-tag a,b -tag c` and
/// `TAG=a,b,c` produce the same list.
pub struct ListValue(pub(crate) Var<Vec<String>>);

impl Value for ListValue {
    fn set(&mut self, s: &str) -> Result<(), BoxError> {
        self.0
            .lock()
            .extend(s.split(',').map(str::trim).filter(|s| !s.is_empty()).map(String::from));
        Ok(())
    }

    fn render(&self) -> String {
        self.0.lock().join(",")
    }

    fn type_name(&self) -> &str {
        "list"
    }
}

/// Structured flag value encoded as JSON.
pub struct JsonValue<T> {
    var: Var<T>,
}

impl<T> JsonValue<T> {
    pub(crate) fn new(var: Var<T>) -> Self {
        Self { var }
    }
}

impl<T> Value for JsonValue<T>
where
    T: Serialize + DeserializeOwned + Send,
{
    fn set(&mut self, s: &str) -> Result<(), BoxError> {
        *self.var.lock() = serde_json::from_str(s)?;
        Ok(())
    }

    fn render(&self) -> String {
        serde_json::to_string(&*self.var.lock()).unwrap_or_default()
    }

    fn type_name(&self) -> &str {
        "json"
    }

    fn is_zero(&self, text: &str) -> bool {
        matches!(text, "" | "null" | "[]" | "{}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool_accepts_traditional_spellings() {
        for s in ["1", "t", "T", "TRUE", "true", "True"] {
            assert!(parse_bool(s).unwrap(), "{s}");
        }
        for s in ["0", "f", "F", "FALSE", "false", "False"] {
            assert!(!parse_bool(s).unwrap(), "{s}");
        }
        assert!(parse_bool("yes").is_err());
        assert!(parse_bool("").is_err());
    }

    #[test]
    fn test_var_handles_share_storage() {
        let a = Var::new(1_i64);
        let b = a.clone();
        b.replace(7);
        assert_eq!(a.get(), 7);
    }

    #[test]
    fn test_parse_value_keeps_old_value_on_error() {
        let var = Var::new(15_i64);
        let mut value = ParseValue::new(var.clone(), "int");
        assert!(value.set("asdf").is_err());
        assert_eq!(var.get(), 15);
        value.set("-3").unwrap();
        assert_eq!(value.render(), "-3");
    }

    #[test]
    fn test_duration_value() {
        let var = Var::new(Duration::ZERO);
        let mut value = DurationValue(var.clone());
        assert!(value.is_zero(&value.render()));
        value.set("1m 30s").unwrap();
        assert_eq!(var.get(), Duration::from_secs(90));
        assert_eq!(value.render(), "1m 30s");
        assert!(value.set("soon").is_err());
    }

    #[test]
    fn test_list_value_accumulates() {
        let var = Var::new(Vec::new());
        let mut value = ListValue(var.clone());
        value.set("a,b").unwrap();
        value.set(" c ").unwrap();
        assert_eq!(var.get(), vec!["a", "b", "c"]);
        assert_eq!(value.render(), "a,b,c");
    }

    #[test]
    fn test_json_value() {
        let var: Var<Vec<u16>> = Var::new(Vec::new());
        let mut value = JsonValue::new(var.clone());
        assert!(value.is_zero(&value.render()));
        value.set("[80, 443]").unwrap();
        assert_eq!(var.get(), vec![80, 443]);
        assert!(value.set("{").is_err());
        assert_eq!(var.get(), vec![80, 443]);
    }
}
