//! Error types for flag parsing and environment variable resolution

/// Boxed error returned by [`Value::set`](crate::Value::set).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while parsing flags from arguments or the environment.
///
/// Command-line errors carry the same wording as the classic single-dash
/// flag parsers so that existing scripts and docs keep matching. Environment
/// errors additionally name the variable the value came from.
#[derive(Debug, thiserror::Error)]
pub enum FlagError {
    /// An argument starting with `-` that is not a valid flag token (`---x`, `-=x`).
    #[error("bad flag syntax: {0}")]
    BadSyntax(String),

    /// A flag that was never declared on the flag set.
    #[error("flag provided but not defined: -{0}")]
    NotDefined(String),

    /// A non-boolean flag appeared last with no value after it.
    #[error("flag needs an argument: -{0}")]
    MissingArgument(String),

    /// `-name=value` on a boolean flag where `value` is not a boolean.
    #[error("invalid boolean value {value:?} for -{name}: {message}")]
    InvalidBool {
        /// Flag name as declared
        name: String,
        /// Raw text supplied on the command line
        value: String,
        /// Error message from the value parser
        message: String,
    },

    /// Bare `-name` on a boolean flag whose value rejected `"true"`.
    #[error("invalid boolean flag {name}: {message}")]
    InvalidBoolFlag {
        /// Flag name as declared
        name: String,
        /// Error message from the value parser
        message: String,
    },

    /// A command-line value that the flag's value type could not parse.
    #[error("invalid value {value:?} for flag -{name}: {message}")]
    InvalidValue {
        /// Flag name as declared
        name: String,
        /// Raw text supplied on the command line
        value: String,
        /// Error message from the value parser
        message: String,
    },

    /// An environment value that the flag's value type could not parse.
    #[error("invalid value {value:?} for flag -{name} [${env}]: {message}")]
    InvalidEnvValue {
        /// Flag name as declared
        name: String,
        /// Environment variable the value was read from
        env: String,
        /// Raw text read from the environment
        value: String,
        /// Error message from the value parser
        message: String,
    },

    /// [`FlagSet::set`](crate::FlagSet::set) was called with an unknown name.
    #[error("no such flag -{0}")]
    NoSuchFlag(String),

    /// `-h` or `-help` was given and no such flag is declared.
    #[error("flag: help requested")]
    Help,
}

impl FlagError {
    /// Create an invalid value error for a command-line argument.
    pub(crate) fn invalid_value(
        name: impl Into<String>,
        value: impl Into<String>,
        cause: impl std::fmt::Display,
    ) -> Self {
        Self::InvalidValue {
            name: name.into(),
            value: value.into(),
            message: cause.to_string(),
        }
    }

    /// Create an invalid value error for an environment variable.
    pub(crate) fn invalid_env_value(
        name: impl Into<String>,
        env: impl Into<String>,
        value: impl Into<String>,
        cause: impl std::fmt::Display,
    ) -> Self {
        Self::InvalidEnvValue {
            name: name.into(),
            env: env.into(),
            value: value.into(),
            message: cause.to_string(),
        }
    }

    /// Whether this error is a request for help rather than a failure.
    pub fn is_help(&self) -> bool {
        matches!(self, Self::Help)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_env_value_message() {
        let err = FlagError::invalid_env_value("int", "INT", "asdf", "invalid digit found in string");
        assert_eq!(
            err.to_string(),
            r#"invalid value "asdf" for flag -int [$INT]: invalid digit found in string"#
        );
    }

    #[test]
    fn test_invalid_value_quotes_raw_text() {
        let err = FlagError::invalid_value("name", "a\"b", "nope");
        assert_eq!(err.to_string(), r#"invalid value "a\"b" for flag -name: nope"#);
    }

    #[test]
    fn test_help_is_not_a_failure() {
        assert!(FlagError::Help.is_help());
        assert!(!FlagError::NotDefined("x".to_string()).is_help());
    }
}
