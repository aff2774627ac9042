//! Command tree data model.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::tokenize::{Parsed, TokenizeOptions};
use crate::value::{FlagKind, Value};

type HandlerFn = dyn Fn(&[Option<Value>], &Parsed) -> anyhow::Result<()> + Send + Sync;

/// A command's action.
///
/// Receives the bound positionals (required first, then optional; `None` for
/// an optional slot that was not supplied) and the flag map with any leftover
/// positionals.
#[derive(Clone)]
pub struct Handler(Arc<HandlerFn>);

impl Handler {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&[Option<Value>], &Parsed) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn call(&self, args: &[Option<Value>], options: &Parsed) -> anyhow::Result<()> {
        (self.0)(args, options)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Handler(..)")
    }
}

/// A declared flag, kept for help rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct OptionSpec {
    pub name: String,
    pub alias: Option<String>,
    pub description: String,
    pub default: Option<Value>,
}

impl OptionSpec {
    /// `-a, --name` or `--name`.
    pub fn label(&self) -> String {
        match &self.alias {
            Some(alias) => format!("-{alias}, --{}", self.name),
            None => format!("--{}", self.name),
        }
    }

    pub fn kind(&self) -> FlagKind {
        FlagKind::of(self.default.as_ref())
    }
}

/// Flag metadata attached to a command, or to the whole program.
#[derive(Debug, Clone, Default)]
pub struct OptionScope {
    /// Alias name -> canonical flag names.
    pub alias: IndexMap<String, Vec<String>>,
    /// Flag name -> default. `None` registers the flag without a value.
    pub default: IndexMap<String, Option<Value>>,
    /// Declaration order, for help.
    pub options: Vec<OptionSpec>,
}

impl OptionScope {
    pub fn declare(&mut self, spec: OptionSpec) {
        if let Some(alias) = &spec.alias {
            self.alias
                .entry(alias.clone())
                .or_default()
                .push(spec.name.clone());
        }
        match &spec.default {
            Some(value) => {
                self.default.insert(spec.name.clone(), Some(value.clone()));
            }
            None if spec.alias.is_none() => {
                self.default.insert(spec.name.clone(), None);
            }
            None => {}
        }
        self.options.push(spec);
    }

    /// Tokenizer config for a parse. Precedence: `overrides` > `command` >
    /// `global`; a later scope replaces an earlier one key by key.
    pub fn merge(global: &Self, command: &Self, overrides: &TokenizeOptions) -> TokenizeOptions {
        let mut merged = overrides.clone();

        let mut alias = global.alias.clone();
        alias.extend(command.alias.clone());
        alias.extend(overrides.alias.clone());
        merged.alias = alias;

        let mut default = global.default.clone();
        default.extend(command.default.clone());
        default.extend(overrides.default.clone());
        merged.default = default;

        merged
    }
}

/// One `<required>` or `[optional]` slot in a usage pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder<'a> {
    Required(&'a str),
    Optional(&'a str),
}

impl<'a> Placeholder<'a> {
    pub fn parse(segment: &'a str) -> Option<Self> {
        if segment.starts_with('<') {
            Some(Self::Required(segment))
        } else if segment.starts_with('[') {
            Some(Self::Optional(segment))
        } else {
            None
        }
    }
}

/// A registered command.
#[derive(Debug, Clone, Default)]
pub struct CommandEntry {
    pub(crate) usage: String,
    pub(crate) description: Vec<String>,
    pub(crate) scope: OptionScope,
    pub(crate) aliases: Vec<String>,
    pub(crate) examples: Vec<String>,
    pub(crate) handler: Option<Handler>,
}

impl CommandEntry {
    pub(crate) fn new(usage: String) -> Self {
        Self {
            usage,
            ..Default::default()
        }
    }

    /// Name words followed by placeholders, e.g. `remote add <name> <url>`.
    pub fn usage(&self) -> &str {
        &self.usage
    }

    pub fn description(&self) -> &[String] {
        &self.description
    }

    pub fn options(&self) -> &[OptionSpec] {
        &self.scope.options
    }

    pub fn scope(&self) -> &OptionScope {
        &self.scope
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    pub fn examples(&self) -> &[String] {
        &self.examples
    }

    pub fn handler(&self) -> Option<&Handler> {
        self.handler.as_ref()
    }

    pub fn placeholders(&self) -> impl Iterator<Item = Placeholder<'_>> {
        self.usage.split_whitespace().filter_map(Placeholder::parse)
    }

    /// Number of `<required>` placeholders.
    pub fn arity(&self) -> usize {
        self.placeholders()
            .filter(|p| matches!(p, Placeholder::Required(_)))
            .count()
    }

    pub fn optional_count(&self) -> usize {
        self.placeholders()
            .filter(|p| matches!(p, Placeholder::Optional(_)))
            .count()
    }
}

/// A tree slot: a real command, or an alias naming the canonical command.
#[derive(Debug, Clone)]
pub enum Node {
    Alias(String),
    Command(CommandEntry),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(name: &str, alias: Option<&str>, default: Option<Value>) -> OptionSpec {
        OptionSpec {
            name: name.to_string(),
            alias: alias.map(str::to_string),
            description: String::new(),
            default,
        }
    }

    #[test]
    fn declare_records_alias_default_and_order() {
        let mut scope = OptionScope::default();
        scope.declare(spec("global", Some("g"), None));
        scope.declare(spec("flag1", None, None));
        scope.declare(spec("jobs", Some("j"), Some(Value::Number(4.0))));

        assert_eq!(scope.alias.get("g"), Some(&vec!["global".to_string()]));
        assert_eq!(scope.alias.get("j"), Some(&vec!["jobs".to_string()]));
        assert!(!scope.default.contains_key("global"));
        assert_eq!(scope.default.get("flag1"), Some(&None));
        assert_eq!(scope.default.get("jobs"), Some(&Some(Value::Number(4.0))));
        let labels: Vec<String> = scope.options.iter().map(OptionSpec::label).collect();
        assert_eq!(labels, ["-g, --global", "--flag1", "-j, --jobs"]);
        assert_eq!(scope.options[2].kind(), FlagKind::Number);
    }

    #[test]
    fn merge_prefers_overrides_then_command_then_global() {
        let mut global = OptionScope::default();
        global.declare(spec("color", Some("c"), Some(Value::Bool(true))));
        global.declare(spec("jobs", None, Some(Value::Number(1.0))));

        let mut command = OptionScope::default();
        command.declare(spec("config", Some("c"), None));
        command.declare(spec("jobs", None, Some(Value::Number(2.0))));

        let overrides = TokenizeOptions::new().default_value("jobs", 8);
        let merged = OptionScope::merge(&global, &command, &overrides);

        assert_eq!(merged.alias.get("c"), Some(&vec!["config".to_string()]));
        assert_eq!(merged.default.get("color"), Some(&Some(Value::Bool(true))));
        assert_eq!(merged.default.get("jobs"), Some(&Some(Value::Number(8.0))));
        // Insertion order follows the first scope that declared the key.
        let keys: Vec<&str> = merged.default.keys().map(String::as_str).collect();
        assert_eq!(keys, ["color", "jobs"]);
    }

    #[test]
    fn placeholders_split_required_and_optional() {
        let entry = CommandEntry::new("remote add <name> <url> [branch]".to_string());
        assert_eq!(entry.arity(), 2);
        assert_eq!(entry.optional_count(), 1);
        let slots: Vec<Placeholder<'_>> = entry.placeholders().collect();
        assert_eq!(
            slots,
            [
                Placeholder::Required("<name>"),
                Placeholder::Required("<url>"),
                Placeholder::Optional("[branch]"),
            ]
        );
    }
}
