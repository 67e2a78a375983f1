//! Single-dash command-line flag sets
//!
//! A [`FlagSet`] owns a collection of named [`Flag`]s and parses `-name value`
//! style arguments into them. Flags are kept in lexicographic order, which is
//! also the order used by [`FlagSet::visit_all`] and the help output.

use crate::error::FlagError;
use crate::value::{
    BoolValue, DurationValue, JsonValue, ListValue, ParseValue, Value, Var,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Display;
use std::io::{self, Write};
use std::str::FromStr;
use std::sync::{LazyLock, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Exit status used for invalid arguments under [`ErrorHandling::ExitOnError`].
pub const EXIT_USAGE: i32 = 2;

/// What [`FlagSet::parse`] does when parsing fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorHandling {
    /// Return the error to the caller.
    #[default]
    ContinueOnError,
    /// Exit the process with status 2 (0 for `-help`).
    ExitOnError,
    /// Panic with the error message.
    PanicOnError,
}

/// Destination for diagnostics and help text.
#[derive(Default)]
pub enum Output {
    /// Standard error of the process.
    #[default]
    Stderr,
    /// Any caller-supplied writer.
    Writer(Box<dyn Write + Send>),
}

impl Write for Output {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Stderr => io::stderr().write(buf),
            Self::Writer(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Stderr => io::stderr().flush(),
            Self::Writer(w) => w.flush(),
        }
    }
}

static COMMAND_LINE: LazyLock<Mutex<FlagSet>> = LazyLock::new(|| {
    let program = std::env::args_os()
        .next()
        .map(|arg| arg.to_string_lossy().into_owned())
        .unwrap_or_default();
    Mutex::new(FlagSet::new(program, ErrorHandling::ExitOnError))
});

/// The process-wide flag set, named after `argv[0]` and exiting on error.
///
/// Declare flags on it and resolve them with [`parse`](crate::parse). The
/// returned guard locks the flag set; drop it before calling `parse`.
pub fn command_line() -> MutexGuard<'static, FlagSet> {
    COMMAND_LINE.lock().unwrap_or_else(PoisonError::into_inner)
}

type UsageFn = Box<dyn Fn(&FlagSet, &mut dyn Write) + Send>;

/// A single declared flag.
pub struct Flag {
    name: String,
    usage: String,
    default: String,
    pub(crate) value: Box<dyn Value>,
}

impl Flag {
    /// Name as used on the command line, without the leading dash.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Help text.
    pub fn usage(&self) -> &str {
        &self.usage
    }

    /// Default value as text, captured at declaration time.
    pub fn default_value(&self) -> &str {
        &self.default
    }

    /// Current value.
    pub fn value(&self) -> &dyn Value {
        self.value.as_ref()
    }

    pub(crate) fn set_usage(&mut self, usage: String) {
        self.usage = usage;
    }

    /// Split a back-quoted placeholder out of the usage text.
    ///
    /// The usage ``read from `file` `` yields `("file", "read from file")`. Without
    /// back quotes the placeholder is the value's type name, or empty for
    /// boolean flags.
    pub fn unquote_usage(&self) -> (String, String) {
        if let Some(start) = self.usage.find('`') {
            if let Some(len) = self.usage[start + 1..].find('`') {
                let end = start + 1 + len;
                let name = self.usage[start + 1..end].to_string();
                let usage = format!(
                    "{}{}{}",
                    &self.usage[..start],
                    name,
                    &self.usage[end + 1..]
                );
                return (name, usage);
            }
        }
        let name = if self.value.is_bool_flag() {
            String::new()
        } else {
            self.value.type_name().to_string()
        };
        (name, self.usage.clone())
    }
}

impl std::fmt::Debug for Flag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Flag")
            .field("name", &self.name)
            .field("usage", &self.usage)
            .field("default", &self.default)
            .field("value", &self.value.render())
            .finish()
    }
}

/// A set of flags parsed together.
///
/// # Example
///
/// ```rust
/// use flagenv::{ErrorHandling, FlagSet};
///
/// let mut fs = FlagSet::new("server", ErrorHandling::ContinueOnError);
/// let port = fs.int("port", 8080, "listen `port`");
/// let verbose = fs.bool("v", false, "verbose output");
///
/// fs.parse(["-port=9090", "-v", "serve"]).unwrap();
/// assert_eq!(port.get(), 9090);
/// assert!(verbose.get());
/// assert_eq!(fs.args(), ["serve"]);
/// ```
pub struct FlagSet {
    name: String,
    error_handling: ErrorHandling,
    parsed: bool,
    formal: BTreeMap<String, Flag>,
    actual: BTreeSet<String>,
    args: Vec<String>,
    output: Output,
    usage: Option<UsageFn>,
}

impl std::fmt::Debug for FlagSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlagSet")
            .field("name", &self.name)
            .field("error_handling", &self.error_handling)
            .field("parsed", &self.parsed)
            .field("formal", &self.formal)
            .field("actual", &self.actual)
            .field("args", &self.args)
            .finish_non_exhaustive()
    }
}

impl FlagSet {
    /// Create an empty flag set.
    pub fn new(name: impl Into<String>, error_handling: ErrorHandling) -> Self {
        Self {
            name: name.into(),
            error_handling,
            parsed: false,
            formal: BTreeMap::new(),
            actual: BTreeSet::new(),
            args: Vec::new(),
            output: Output::Stderr,
            usage: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn error_handling(&self) -> ErrorHandling {
        self.error_handling
    }

    /// Whether [`parse`](Self::parse) has been called.
    pub fn parsed(&self) -> bool {
        self.parsed
    }

    /// Arguments remaining after flag parsing stopped.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// The `i`th remaining argument.
    pub fn arg(&self, i: usize) -> Option<&str> {
        self.args.get(i).map(String::as_str)
    }

    /// Number of remaining arguments.
    pub fn narg(&self) -> usize {
        self.args.len()
    }

    /// Number of flags set on the command line or with [`set`](Self::set).
    pub fn nflag(&self) -> usize {
        self.actual.len()
    }

    /// Redirect diagnostics and help text.
    pub fn set_output(&mut self, writer: impl Write + Send + 'static) {
        self.output = Output::Writer(Box::new(writer));
    }

    /// Replace the default usage message printed on errors and `-help`.
    pub fn set_usage(&mut self, usage: impl Fn(&FlagSet, &mut dyn Write) + Send + 'static) {
        self.usage = Some(Box::new(usage));
    }

    /// Declare a flag backed by a custom [`Value`].
    ///
    /// The value's current rendering becomes the flag's default.
    ///
    /// # Panics
    ///
    /// Panics if a flag with the same name is already declared.
    pub fn var(&mut self, value: impl Value + 'static, name: &str, usage: &str) {
        if name.starts_with('-') {
            panic!("flag {name:?} begins with -");
        }
        if name.contains('=') {
            panic!("flag {name:?} contains =");
        }
        if self.formal.contains_key(name) {
            panic!("flag redefined: {name}");
        }
        let flag = Flag {
            name: name.to_string(),
            usage: usage.to_string(),
            default: value.render(),
            value: Box::new(value),
        };
        self.formal.insert(name.to_string(), flag);
    }

    pub fn bool(&mut self, name: &str, default: bool, usage: &str) -> Var<bool> {
        let var = Var::new(default);
        self.var(BoolValue(var.clone()), name, usage);
        var
    }

    pub fn int(&mut self, name: &str, default: i64, usage: &str) -> Var<i64> {
        self.parse_var(name, default, usage, "int")
    }

    pub fn uint(&mut self, name: &str, default: u64, usage: &str) -> Var<u64> {
        self.parse_var(name, default, usage, "uint")
    }

    pub fn float(&mut self, name: &str, default: f64, usage: &str) -> Var<f64> {
        self.parse_var(name, default, usage, "float")
    }

    pub fn string(&mut self, name: &str, default: &str, usage: &str) -> Var<String> {
        self.parse_var(name, default.to_string(), usage, "string")
    }

    /// Duration flag in humantime syntax, e.g. `-timeout 1m30s`.
    pub fn duration(&mut self, name: &str, default: Duration, usage: &str) -> Var<Duration> {
        let var = Var::new(default);
        self.var(DurationValue(var.clone()), name, usage);
        var
    }

    /// Repeatable flag; every occurrence appends comma-separated items.
    pub fn list(&mut self, name: &str, usage: &str) -> Var<Vec<String>> {
        let var = Var::new(Vec::new());
        self.var(ListValue(var.clone()), name, usage);
        var
    }

    /// Flag holding any `FromStr` type.
    pub fn var_from_str<T>(&mut self, name: &str, default: T, usage: &str) -> Var<T>
    where
        T: FromStr + Display + Send + 'static,
        T::Err: Display,
    {
        self.parse_var(name, default, usage, "value")
    }

    /// Flag whose value is JSON text deserialized into `T`.
    pub fn json<T>(&mut self, name: &str, default: T, usage: &str) -> Var<T>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
    {
        let var = Var::new(default);
        self.var(JsonValue::new(var.clone()), name, usage);
        var
    }

    fn parse_var<T>(&mut self, name: &str, default: T, usage: &str, type_name: &'static str) -> Var<T>
    where
        T: FromStr + Display + Send + 'static,
        T::Err: Display,
    {
        let var = Var::new(default);
        self.var(ParseValue::new(var.clone(), type_name), name, usage);
        var
    }

    /// Look up a declared flag.
    pub fn lookup(&self, name: &str) -> Option<&Flag> {
        self.formal.get(name)
    }

    /// Whether `name` was set on the command line or with [`set`](Self::set).
    pub fn is_set(&self, name: &str) -> bool {
        self.actual.contains(name)
    }

    /// Set a flag's value programmatically, marking it as set.
    pub fn set(&mut self, name: &str, value: &str) -> Result<(), FlagError> {
        let flag = self
            .formal
            .get_mut(name)
            .ok_or_else(|| FlagError::NoSuchFlag(name.to_string()))?;
        flag.value
            .set(value)
            .map_err(|e| FlagError::invalid_value(name, value, e))?;
        self.actual.insert(name.to_string());
        Ok(())
    }

    /// Visit the flags that have been set, in lexicographic order.
    pub fn visit(&self, mut f: impl FnMut(&Flag)) {
        for name in &self.actual {
            if let Some(flag) = self.formal.get(name) {
                f(flag);
            }
        }
    }

    /// Visit every declared flag, in lexicographic order.
    pub fn visit_all(&self, f: impl FnMut(&Flag)) {
        self.formal.values().for_each(f);
    }

    pub(crate) fn visit_all_mut(&mut self, f: impl FnMut(&mut Flag)) {
        self.formal.values_mut().for_each(f);
    }

    pub(crate) fn lookup_mut(&mut self, name: &str) -> Option<&mut Flag> {
        self.formal.get_mut(name)
    }

    /// Write the default help for every flag to `w`.
    pub fn write_defaults(&self, w: &mut dyn Write) -> io::Result<()> {
        for flag in self.formal.values() {
            let mut line = format!("  -{}", flag.name);
            let (name, usage) = flag.unquote_usage();
            if !name.is_empty() {
                line.push(' ');
                line.push_str(&name);
            }
            // Single-letter boolean flags fit on one line with their usage.
            if line.len() <= 4 {
                line.push('\t');
            } else {
                line.push_str("\n    \t");
            }
            line.push_str(&usage.replace('\n', "\n    \t"));
            if !flag.value.is_zero(&flag.default) {
                if flag.value.type_name() == "string" {
                    line.push_str(&format!(" (default {:?})", flag.default));
                } else {
                    line.push_str(&format!(" (default {})", flag.default));
                }
            }
            writeln!(w, "{line}")?;
        }
        Ok(())
    }

    /// Print the default help for every flag to the configured output.
    pub fn print_defaults(&mut self) {
        self.with_output(|fs, out| {
            let _ = fs.write_defaults(out);
        });
    }

    /// Print the usage message: the custom one if set, otherwise a header
    /// followed by [`print_defaults`](Self::print_defaults).
    pub fn print_usage(&mut self) {
        self.with_output(|fs, out| fs.write_usage(out));
    }

    fn write_usage(&self, out: &mut dyn Write) {
        if let Some(usage) = &self.usage {
            usage(self, out);
            return;
        }
        let _ = if self.name.is_empty() {
            writeln!(out, "Usage:")
        } else {
            writeln!(out, "Usage of {}:", self.name)
        };
        let _ = self.write_defaults(out);
    }

    fn with_output<R>(&mut self, f: impl FnOnce(&FlagSet, &mut dyn Write) -> R) -> R {
        let mut out = std::mem::take(&mut self.output);
        let result = f(&*self, &mut out);
        self.output = out;
        result
    }

    /// Print `err` followed by the usage message, then hand `err` back.
    pub(crate) fn fail(&mut self, err: FlagError) -> FlagError {
        self.with_output(|fs, out| {
            let _ = writeln!(out, "{err}");
            fs.write_usage(out);
        });
        err
    }

    /// Route an error through the configured [`ErrorHandling`].
    pub(crate) fn handle_error(&self, err: FlagError) -> FlagError {
        match self.error_handling {
            ErrorHandling::ContinueOnError => err,
            ErrorHandling::ExitOnError if err.is_help() => std::process::exit(0),
            ErrorHandling::ExitOnError => std::process::exit(EXIT_USAGE),
            ErrorHandling::PanicOnError => panic!("{err}"),
        }
    }

    /// Parse flags from `args`, which must not include the program name.
    ///
    /// Parsing stops at the first non-flag argument, a lone `-`, or after
    /// `--`. Errors are printed to the output with the usage text and then
    /// routed through the flag set's [`ErrorHandling`].
    pub fn parse<I>(&mut self, args: I) -> Result<(), FlagError>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.parsed = true;
        self.args = args.into_iter().map(Into::into).collect();
        loop {
            match self.parse_one() {
                Ok(true) => continue,
                Ok(false) => return Ok(()),
                Err(err) => return Err(self.handle_error(err)),
            }
        }
    }

    /// Parse a single flag from the front of `self.args`.
    ///
    /// Returns `Ok(false)` when there are no more flags.
    fn parse_one(&mut self) -> Result<bool, FlagError> {
        let Some(s) = self.args.first().cloned() else {
            return Ok(false);
        };
        if s.len() < 2 || !s.starts_with('-') {
            return Ok(false);
        }
        let mut minuses = 1;
        if s.as_bytes()[1] == b'-' {
            minuses += 1;
            if s.len() == 2 {
                self.args.remove(0);
                return Ok(false);
            }
        }
        let name = &s[minuses..];
        if name.is_empty() || name.starts_with('-') || name.starts_with('=') {
            return Err(self.fail(FlagError::BadSyntax(s.clone())));
        }
        self.args.remove(0);

        let (name, inline_value) = match name.split_once('=') {
            Some((name, value)) => (name.to_string(), Some(value.to_string())),
            None => (name.to_string(), None),
        };

        let Some(is_bool) = self.lookup(&name).map(|flag| flag.value.is_bool_flag()) else {
            if name == "help" || name == "h" {
                self.print_usage();
                return Err(FlagError::Help);
            }
            return Err(self.fail(FlagError::NotDefined(name)));
        };

        if is_bool {
            let outcome = match inline_value {
                Some(value) => self.set_value(&name, &value).map_err(|e| FlagError::InvalidBool {
                    name: name.clone(),
                    value: value.clone(),
                    message: e.to_string(),
                }),
                None => self.set_value(&name, "true").map_err(|e| FlagError::InvalidBoolFlag {
                    name: name.clone(),
                    message: e.to_string(),
                }),
            };
            if let Err(err) = outcome {
                return Err(self.fail(err));
            }
        } else {
            let value = match inline_value {
                Some(value) => value,
                None if !self.args.is_empty() => self.args.remove(0),
                None => return Err(self.fail(FlagError::MissingArgument(name))),
            };
            if let Err(e) = self.set_value(&name, &value) {
                return Err(self.fail(FlagError::invalid_value(name, value, e)));
            }
        }
        tracing::trace!(flag = %name, "flag set from command line");
        self.actual.insert(name);
        Ok(true)
    }

    fn set_value(&mut self, name: &str, text: &str) -> Result<(), crate::BoxError> {
        match self.formal.get_mut(name) {
            Some(flag) => flag.value.set(text),
            None => Err(format!("flag -{name} disappeared").into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::NamedTempFile;

    fn flag_set() -> FlagSet {
        let mut fs = FlagSet::new("test", ErrorHandling::ContinueOnError);
        fs.set_output(io::sink());
        fs
    }

    #[test]
    fn test_parse_value_forms() {
        let mut fs = flag_set();
        let a = fs.int("a", 1, "");
        let b = fs.string("b", "x", "");
        let c = fs.float("c", 0.0, "");
        fs.parse(["-a", "5", "--b=hello", "-c=2.5"]).unwrap();
        assert_eq!(a.get(), 5);
        assert_eq!(b.get(), "hello");
        assert_eq!(c.get(), 2.5);
        assert!(fs.parsed());
        assert_eq!(fs.nflag(), 3);
    }

    #[test]
    fn test_parse_bool_forms() {
        let mut fs = flag_set();
        let on = fs.bool("on", false, "");
        let off = fs.bool("off", true, "");
        fs.parse(["-on", "-off=false"]).unwrap();
        assert!(on.get());
        assert!(!off.get());
    }

    #[test]
    fn test_parse_stops_at_terminators() {
        let mut fs = flag_set();
        let v = fs.bool("v", false, "");
        fs.parse(["-v", "--", "-x"]).unwrap();
        assert!(v.get());
        assert_eq!(fs.args(), ["-x"]);

        let mut fs = flag_set();
        fs.bool("v", false, "");
        fs.parse(["file", "-v"]).unwrap();
        assert_eq!(fs.args(), ["file", "-v"]);
        assert_eq!(fs.narg(), 2);
        assert_eq!(fs.arg(0), Some("file"));
        assert!(!fs.is_set("v"));

        let mut fs = flag_set();
        fs.parse(["-", "rest"]).unwrap();
        assert_eq!(fs.args(), ["-", "rest"]);
    }

    #[test]
    fn test_parse_errors() {
        let cases: Vec<(Vec<&str>, &str)> = vec![
            (vec!["---n"], "bad flag syntax: ---n"),
            (vec!["-=n"], "bad flag syntax: -=n"),
            (vec!["-nope"], "flag provided but not defined: -nope"),
            (vec!["-n"], "flag needs an argument: -n"),
            (vec!["-n", "x"], r#"invalid value "x" for flag -n: invalid digit found in string"#),
            (vec!["-b=maybe"], r#"invalid boolean value "maybe" for -b: parse error"#),
        ];
        for (args, want) in cases {
            let mut fs = flag_set();
            fs.int("n", 0, "");
            fs.bool("b", false, "");
            let err = fs.parse(args.clone()).unwrap_err();
            assert_eq!(err.to_string(), want, "{args:?}");
        }
    }

    #[test]
    fn test_help_requested() {
        let mut fs = flag_set();
        let err = fs.parse(["-help"]).unwrap_err();
        assert!(err.is_help());

        let mut fs = flag_set();
        let h = fs.bool("h", false, "declared help flag");
        fs.parse(["-h"]).unwrap();
        assert!(h.get());
    }

    #[test]
    #[should_panic(expected = "flag redefined: n")]
    fn test_redefined_flag_panics() {
        let mut fs = flag_set();
        fs.int("n", 0, "");
        fs.int("n", 1, "");
    }

    #[test]
    #[should_panic(expected = "invalid value \"x\" for flag -n")]
    fn test_panic_on_error() {
        let mut fs = FlagSet::new("test", ErrorHandling::PanicOnError);
        fs.set_output(io::sink());
        fs.int("n", 0, "");
        let _ = fs.parse(["-n", "x"]);
    }

    #[test]
    fn test_set_marks_flag_actual() {
        let mut fs = flag_set();
        let n = fs.int("n", 0, "");
        fs.set("n", "3").unwrap();
        assert_eq!(n.get(), 3);
        assert!(fs.is_set("n"));
        assert!(matches!(fs.set("m", "1"), Err(FlagError::NoSuchFlag(_))));
        assert!(matches!(fs.set("n", "z"), Err(FlagError::InvalidValue { .. })));
    }

    #[test]
    fn test_visit_only_reports_set_flags() {
        let mut fs = flag_set();
        fs.int("a", 0, "");
        fs.int("b", 0, "");
        fs.int("c", 0, "");
        fs.parse(["-c", "1", "-a", "2"]).unwrap();

        let mut set = Vec::new();
        fs.visit(|f| set.push(f.name().to_string()));
        assert_eq!(set, ["a", "c"]);

        let mut all = Vec::new();
        fs.visit_all(|f| all.push(f.name().to_string()));
        assert_eq!(all, ["a", "b", "c"]);
    }

    #[test]
    fn test_list_flag_repeats() {
        let mut fs = flag_set();
        let tags = fs.list("tag", "");
        fs.parse(["-tag", "a,b", "-tag=c"]).unwrap();
        assert_eq!(tags.get(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_unquote_usage() {
        let mut fs = flag_set();
        fs.string("in", "", "read from `file`");
        fs.int("n", 0, "count");
        fs.bool("v", false, "verbose");

        let (name, usage) = fs.lookup("in").unwrap().unquote_usage();
        assert_eq!((name.as_str(), usage.as_str()), ("file", "read from file"));
        assert_eq!(fs.lookup("n").unwrap().unquote_usage().0, "int");
        assert_eq!(fs.lookup("v").unwrap().unquote_usage().0, "");
    }

    #[test]
    fn test_write_defaults_format() {
        let mut fs = flag_set();
        fs.bool("v", false, "verbose");
        fs.int("count", 15, "how many");
        fs.string("name", "bob", "who to greet");
        fs.duration("wait", Duration::ZERO, "pause");

        let mut out = Vec::new();
        fs.write_defaults(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "  -count int\n    \thow many (default 15)\n\
             \x20 -name string\n    \twho to greet (default \"bob\")\n\
             \x20 -v\tverbose\n\
             \x20 -wait duration\n    \tpause\n"
        );
    }

    #[test]
    fn test_errors_are_printed_with_usage() {
        let mut file = NamedTempFile::new().unwrap();
        let mut fs = FlagSet::new("prog", ErrorHandling::ContinueOnError);
        fs.set_output(file.reopen().unwrap());
        fs.int("n", 0, "number");
        assert!(fs.parse(["-x"]).is_err());

        let mut text = String::new();
        file.read_to_string(&mut text).unwrap();
        assert!(text.starts_with("flag provided but not defined: -x\nUsage of prog:\n"));
        assert!(text.contains("  -n int\n    \tnumber\n"));
    }

    #[test]
    fn test_custom_usage() {
        let mut file = NamedTempFile::new().unwrap();
        let mut fs = FlagSet::new("prog", ErrorHandling::ContinueOnError);
        fs.set_output(file.reopen().unwrap());
        fs.set_usage(|fs, out| {
            let _ = writeln!(out, "custom usage for {}", fs.name());
        });
        let _ = fs.parse(["-help"]);

        let mut text = String::new();
        file.read_to_string(&mut text).unwrap();
        assert_eq!(text, "custom usage for prog\n");
    }
}
