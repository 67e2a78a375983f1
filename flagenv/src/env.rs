//! Environment variable fallback for flag sets
//!
//! [`parse_with_env`] parses command-line arguments into a [`FlagSet`] and
//! then fills every flag that was not given on the command line from its
//! environment variable. Precedence is command line, then environment, then
//! the declared default.

use crate::error::FlagError;
use crate::flag::{command_line, FlagSet};
use crate::mapping::{default_map, MapName};
use std::collections::{BTreeMap, HashMap};
use std::env;

/// Resolution options for [`parse_with_env`] and [`parse`].
///
/// ```rust
/// use flagenv::Options;
///
/// let options = Options::new()
///     .with_map(|name: &str| format!("APP_{}", name.to_uppercase()))
///     .with_lookup(|key: &str| (key == "APP_PORT").then(|| "9090".to_string()));
/// # let _ = options;
/// ```
pub struct Options<'a> {
    mapping: Box<dyn MapName + 'a>,
    lookup: Box<dyn Fn(&str) -> Option<String> + 'a>,
}

impl Default for Options<'_> {
    fn default() -> Self {
        Self {
            mapping: Box::new(default_map),
            lookup: Box::new(lookup_env),
        }
    }
}

impl<'a> Options<'a> {
    /// Default mapping ([`default_map`]) and the process environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the flag name to environment variable name mapping.
    pub fn with_map(mut self, mapping: impl MapName + 'a) -> Self {
        self.mapping = Box::new(mapping);
        self
    }

    /// Replace how environment variables are read.
    ///
    /// `None` means the variable is not set.
    pub fn with_lookup(mut self, lookup: impl Fn(&str) -> Option<String> + 'a) -> Self {
        self.lookup = Box::new(lookup);
        self
    }
}

/// Read `key` from the process environment.
///
/// Values that are not valid UTF-8 are converted lossily.
pub fn lookup_env(key: &str) -> Option<String> {
    env::var_os(key).map(|value| value.to_string_lossy().into_owned())
}

/// Parse `args` into `fs`, then apply environment variables to every flag
/// that was not set on the command line.
///
/// Each mapped flag's usage text gains a ` [$NAME]` suffix before parsing, so
/// help output lists the variable. Empty environment values are treated as
/// unset. A value that fails to parse is reported like a command-line error
/// (printed with the usage text, then routed through the flag set's
/// [`ErrorHandling`](crate::ErrorHandling)) with the variable name added.
///
/// Variables applied from the environment do not count as set: they are not
/// reported by [`FlagSet::visit`] or [`FlagSet::is_set`].
///
/// # Panics
///
/// Panics if `fs` is already parsed, or if two flags map to the same
/// environment variable name.
///
/// # Example
///
/// ```rust
/// use flagenv::{parse_with_env, ErrorHandling, FlagSet, Options};
///
/// let mut fs = FlagSet::new("app", ErrorHandling::ContinueOnError);
/// let port = fs.int("port", 8080, "listen port");
///
/// let env = |key: &str| (key == "PORT").then(|| "9090".to_string());
/// parse_with_env(&mut fs, Vec::<String>::new(), Options::new().with_lookup(env))?;
///
/// assert_eq!(port.get(), 9090);
/// assert_eq!(fs.lookup("port").unwrap().usage(), "listen port [$PORT]");
/// # Ok::<(), flagenv::FlagError>(())
/// ```
pub fn parse_with_env<I>(fs: &mut FlagSet, args: I, options: Options<'_>) -> Result<(), FlagError>
where
    I: IntoIterator,
    I::Item: Into<String>,
{
    if fs.parsed() {
        panic!("already parsed");
    }

    // flag name -> environment name, for flags that take part in lookup
    let mut env_names: BTreeMap<String, String> = BTreeMap::new();
    let mut owners: HashMap<String, String> = HashMap::new();
    fs.visit_all(|flag| {
        let env_name = options.mapping.map_name(flag.name());
        if env_name.is_empty() {
            return;
        }
        if let Some(existing) = owners.get(&env_name) {
            panic!(
                "conflicting {env_name:?} environment variable for -{existing} and -{} flags",
                flag.name()
            );
        }
        owners.insert(env_name.clone(), flag.name().to_string());
        env_names.insert(flag.name().to_string(), env_name);
    });

    fs.visit_all_mut(|flag| {
        if let Some(env_name) = env_names.get(flag.name()) {
            let usage = format!("{} [${}]", flag.usage(), env_name);
            flag.set_usage(usage);
        }
    });

    fs.parse(args)?;

    fs.visit(|flag| {
        env_names.remove(flag.name());
    });

    for (name, env_name) in env_names {
        let value = match (options.lookup)(&env_name) {
            Some(value) if !value.is_empty() => value,
            _ => {
                tracing::trace!(flag = %name, env = %env_name, "no environment value");
                continue;
            }
        };
        let Some(flag) = fs.lookup_mut(&name) else {
            continue;
        };
        if let Err(e) = flag.value.set(&value) {
            let err = fs.fail(FlagError::invalid_env_value(&name, &env_name, &value, e));
            return Err(fs.handle_error(err));
        }
        tracing::debug!(flag = %name, env = %env_name, "flag set from environment");
    }
    Ok(())
}

/// Parse the process arguments into [`command_line`], with environment
/// variable fallback.
///
/// Use in place of [`FlagSet::parse`] on the default flag set. The default
/// flag set exits the process on error, so nothing is returned. Do not hold
/// the guard from [`command_line`] while calling this.
pub fn parse(options: Options<'_>) {
    let args = env::args_os()
        .skip(1)
        .map(|arg| arg.to_string_lossy().into_owned());
    let mut fs = command_line();
    // Errors already terminated the process unless the caller swapped the
    // error handling, in which case they were printed.
    let _ = parse_with_env(&mut fs, args, options);
}
