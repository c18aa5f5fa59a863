//! Action arguments handed to commands and modules

use std::collections::BTreeMap;

/// Action used when none is given
pub const DEFAULT_ACTION: &str = "summary";

/// An action name, its positional arguments and its `--flags`.
///
/// `qualis coverage src/lib.rs --list` becomes action `coverage`, positional
/// `["src/lib.rs"]` and flag `list`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Args {
    action: Option<String>,
    positional: Vec<String>,
    options: BTreeMap<String, Option<String>>,
}

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    /// Split raw tokens: the first positional token is the action
    pub fn parse<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut args = Self::new();
        let mut only_positional = false;

        for token in tokens {
            let token: String = token.into();
            if only_positional {
                args.push_positional(token);
                continue;
            }

            if token == "--" {
                only_positional = true;
            } else if let Some(long) = token.strip_prefix("--") {
                match long.split_once('=') {
                    Some((name, value)) => {
                        args.options.insert(name.to_string(), Some(value.to_string()));
                    }
                    None => {
                        args.options.insert(long.to_string(), None);
                    }
                }
            } else if token.len() > 1 && token.starts_with('-') {
                for c in token[1..].chars() {
                    args.options.insert(c.to_string(), None);
                }
            } else {
                args.push_positional(token);
            }
        }

        args
    }

    fn push_positional(&mut self, token: String) {
        if self.action.is_none() {
            self.action = Some(token);
        } else {
            self.positional.push(token);
        }
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.positional.push(arg.into());
        self
    }

    pub fn with_flag(mut self, name: impl Into<String>) -> Self {
        self.options.insert(name.into(), None);
        self
    }

    /// The requested action, defaulting to [`DEFAULT_ACTION`] when blank
    pub fn action(&self) -> &str {
        self.explicit_action().unwrap_or(DEFAULT_ACTION)
    }

    /// The action as typed, `None` when it was left out or blank
    pub fn explicit_action(&self) -> Option<&str> {
        self.action
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
    }

    /// Positional argument after the action, zero-based
    pub fn arg(&self, index: usize) -> Option<&str> {
        self.positional.get(index).map(String::as_str)
    }

    pub fn positional(&self) -> &[String] {
        &self.positional
    }

    pub fn flag(&self, name: &str) -> bool {
        self.options.contains_key(name)
    }

    pub fn option(&self, name: &str) -> Option<&str> {
        self.options.get(name).and_then(|v| v.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_action_args_and_flags() {
        let args = Args::parse(["summary", "--short", "coverage", "--format=plain", "-q"]);
        assert_eq!(args.action(), "summary");
        assert_eq!(args.arg(0), Some("coverage"));
        assert_eq!(args.arg(1), None);
        assert!(args.flag("short"));
        assert!(args.flag("q"));
        assert_eq!(args.option("format"), Some("plain"));
        assert!(!args.flag("no-color"));
    }

    #[test]
    fn test_default_action() {
        let empty: [&str; 0] = [];
        assert_eq!(Args::parse(empty).action(), "summary");
        assert_eq!(Args::new().with_action("  ").action(), "summary");
    }

    #[test]
    fn test_double_dash_ends_flags() {
        let args = Args::parse(["test", "--", "--not-a-flag"]);
        assert_eq!(args.action(), "test");
        assert_eq!(args.arg(0), Some("--not-a-flag"));
        assert!(!args.flag("not-a-flag"));
    }
}
