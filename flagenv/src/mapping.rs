//! Flag name to environment variable name mapping

/// Maps a flag name to the environment variable consulted for it.
///
/// Returning an empty string opts the flag out of environment lookup.
/// Implemented for every `Fn(&str) -> String`, so closures and plain
/// functions can be passed to [`Options::with_map`](crate::Options::with_map).
pub trait MapName {
    fn map_name(&self, flag: &str) -> String;
}

impl<F> MapName for F
where
    F: Fn(&str) -> String,
{
    fn map_name(&self, flag: &str) -> String {
        self(flag)
    }
}

/// Default mapping: characters outside `[A-Za-z0-9_]` become `_`, then the
/// result is upper-cased.
///
/// ```rust
/// assert_eq!(flagenv::default_map("connect-timeout"), "CONNECT_TIMEOUT");
/// assert_eq!(flagenv::default_map("db.url"), "DB_URL");
/// ```
pub fn default_map(flag: &str) -> String {
    flag.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}

/// Default mapping with a fixed prefix, e.g. `prefixed("MYAPP_")` maps
/// `port` to `MYAPP_PORT`.
pub fn prefixed(prefix: impl Into<String>) -> impl Fn(&str) -> String {
    let prefix = prefix.into();
    move |flag: &str| format!("{}{}", prefix, default_map(flag))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_map() {
        assert_eq!(default_map("int"), "INT");
        assert_eq!(default_map("connect-timeout"), "CONNECT_TIMEOUT");
        assert_eq!(default_map("already_SNAKE_9"), "ALREADY_SNAKE_9");
        assert_eq!(default_map("a.b/c d"), "A_B_C_D");
        assert_eq!(default_map(""), "");
    }

    #[test]
    fn test_default_map_replaces_each_non_ascii_char() {
        assert_eq!(default_map("café"), "CAF_");
        assert_eq!(default_map("日本"), "__");
    }

    #[test]
    fn test_default_map_is_deterministic() {
        for name in ["d", "D", "x-y", "ümlaut"] {
            assert_eq!(default_map(name), default_map(name));
            assert_eq!(default_map(&default_map(name)), default_map(name));
        }
    }

    #[test]
    fn test_default_map_merges_case() {
        assert_eq!(default_map("d"), default_map("D"));
    }

    #[test]
    fn test_prefixed() {
        let map = prefixed("MYAPP_");
        assert_eq!(map.map_name("max-conns"), "MYAPP_MAX_CONNS");
    }

    #[test]
    fn test_closure_implements_map_name() {
        let ignore_all = |_: &str| String::new();
        assert_eq!(ignore_all.map_name("int"), "");
    }
}
