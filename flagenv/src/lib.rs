//! Command-line flags with environment variable fallback
//!
//! `flagenv` lets every command-line flag also be supplied through an
//! environment variable, without declaring anything twice. Flags are declared
//! once on a [`FlagSet`]; [`parse_with_env`] parses the arguments and then
//! fills the remaining flags from the environment.
//!
//! # Features
//!
//! - **Fixed precedence**: command line, then environment, then default
//! - **Zero configuration**: `connect-timeout` is read from `CONNECT_TIMEOUT`
//! - **Self-documenting**: help output shows `[$CONNECT_TIMEOUT]` next to each flag
//! - **Custom naming**: prefixes, shared names, or opting single flags out
//! - **Testable**: environment access is injectable
//!
//! # Example
//!
//! ```rust
//! use flagenv::{parse_with_env, ErrorHandling, FlagSet, Options};
//!
//! let mut fs = FlagSet::new("server", ErrorHandling::ContinueOnError);
//! let host = fs.string("host", "127.0.0.1", "listen address");
//! let port = fs.int("port", 8080, "listen port");
//!
//! # std::env::set_var("HOST", "0.0.0.0");
//! # std::env::set_var("PORT", "3000");
//! // HOST=0.0.0.0 PORT=3000 server -port 9090
//! parse_with_env(&mut fs, ["-port", "9090"], Options::new())?;
//!
//! assert_eq!(host.get(), "0.0.0.0");
//! assert_eq!(port.get(), 9090);
//! # Ok::<(), flagenv::FlagError>(())
//! ```
//!
//! # Naming
//!
//! [`default_map`] replaces every character outside `[A-Za-z0-9_]` with `_`
//! and upper-cases the result. Pass another mapping with
//! [`Options::with_map`]; returning an empty string excludes a flag from
//! environment lookup.
//!
//! ```rust
//! use flagenv::{parse_with_env, prefixed, ErrorHandling, FlagSet, Options};
//!
//! let mut fs = FlagSet::new("app", ErrorHandling::ContinueOnError);
//! fs.int("max-conns", 10, "connection limit");
//!
//! parse_with_env(&mut fs, Vec::<String>::new(), Options::new().with_map(prefixed("MYAPP_")))?;
//! assert_eq!(
//!     fs.lookup("max-conns").unwrap().usage(),
//!     "connection limit [$MYAPP_MAX_CONNS]"
//! );
//! # Ok::<(), flagenv::FlagError>(())
//! ```
//!
//! # Empty values
//!
//! An environment variable set to the empty string is treated as unset and
//! the flag keeps its default.
//!
//! # Errors
//!
//! Values from the environment that fail to parse are reported like
//! command-line errors, with the variable name added:
//!
//! ```text
//! invalid value "asdf" for flag -int [$INT]: invalid digit found in string
//! ```
//!
//! Two flags mapping to the same variable, or parsing a flag set twice, are
//! programming errors and panic.

mod env;
mod error;
mod flag;
mod mapping;
mod value;

pub use env::{lookup_env, parse, parse_with_env, Options};
pub use error::{BoxError, FlagError};
pub use flag::{command_line, ErrorHandling, Flag, FlagSet, Output, EXIT_USAGE};
pub use mapping::{default_map, prefixed, MapName};
pub use value::{BoolValue, DurationValue, JsonValue, ListValue, ParseValue, Value, Var};
