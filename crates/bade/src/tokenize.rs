//! Flag tokenizer.
//!
//! Turns a flat argument list into leftover positionals plus a map of flag
//! values. It knows nothing about commands; the resolver runs it twice per
//! parse (once to find the command words, once with the merged option config).
//!
//! Rules, in order:
//! - `--` stops flag parsing; everything after it is positional, verbatim.
//! - a token without a leading dash is positional.
//! - `--no-name` sets `name` to `false`.
//! - `--name=value` / `--name value` / `--name` (value-less is `true`; the next
//!   token is only consumed when it does not start with `-`).
//! - `-abc` is a cluster: `a` and `b` are `true`, `c` receives the value.
//! - repeated flags collect into a list.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::Serialize;
use thiserror::Error;

use crate::value::{FlagKind, Value};

/// Strict-mode callback: receives the offending token (with its dashes) and
/// returns the message to report, or `None` for the stock message.
pub type UnknownFn = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Tokenizer configuration.
#[derive(Clone)]
pub struct TokenizeOptions {
    /// Flag name -> alias names. Closed over in both directions at parse time.
    pub alias: IndexMap<String, Vec<String>>,
    /// Flags that never take a value from the next token's text.
    pub boolean: Vec<String>,
    /// Flags that are never numeric-coerced.
    pub string: Vec<String>,
    /// Defaults. The value's type also types the flag; `None` only registers
    /// the name as known.
    pub default: IndexMap<String, Option<Value>>,
    /// Enables strict mode when set.
    pub unknown: Option<UnknownFn>,
    /// When a boolean flag is given a non-boolean value, also record that
    /// value as a positional.
    pub leak_boolean_values: bool,
}

impl Default for TokenizeOptions {
    fn default() -> Self {
        Self {
            alias: IndexMap::new(),
            boolean: Vec::new(),
            string: Vec::new(),
            default: IndexMap::new(),
            unknown: None,
            leak_boolean_values: true,
        }
    }
}

impl fmt::Debug for TokenizeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenizeOptions")
            .field("alias", &self.alias)
            .field("boolean", &self.boolean)
            .field("string", &self.string)
            .field("default", &self.default)
            .field("strict", &self.unknown.is_some())
            .field("leak_boolean_values", &self.leak_boolean_values)
            .finish()
    }
}

impl TokenizeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add aliases for `name`.
    pub fn alias<I, S>(mut self, name: impl Into<String>, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.alias
            .entry(name.into())
            .or_default()
            .extend(aliases.into_iter().map(Into::into));
        self
    }

    pub fn boolean(mut self, name: impl Into<String>) -> Self {
        self.boolean.push(name.into());
        self
    }

    pub fn string(mut self, name: impl Into<String>) -> Self {
        self.string.push(name.into());
        self
    }

    pub fn default_value(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.default.insert(name.into(), Some(value.into()));
        self
    }

    /// Reject any flag not declared through `alias` or `default`.
    pub fn unknown<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.unknown = Some(Arc::new(f));
        self
    }

    pub fn leak_boolean_values(mut self, enabled: bool) -> Self {
        self.leak_boolean_values = enabled;
        self
    }
}

/// Result of a tokenizer pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Parsed {
    /// Leftover positionals.
    #[serde(rename = "_")]
    pub positionals: Vec<Value>,
    #[serde(flatten)]
    pub flags: IndexMap<String, Value>,
}

impl Parsed {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.flags.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(Value::as_bool)
    }

    pub fn get_f64(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(Value::as_f64)
    }

    /// Whether `name` holds a truthy value.
    pub fn is_set(&self, name: &str) -> bool {
        self.get(name).is_some_and(Value::is_truthy)
    }
}

/// Strict mode rejected a flag.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", self.message.as_deref().unwrap_or(UNKNOWN_FLAG_MESSAGE))]
pub struct UnknownFlag {
    /// The token as typed, e.g. `--nope` or `-x` (one letter of a cluster).
    pub token: String,
    /// Whatever the `unknown` callback returned.
    pub message: Option<String>,
}

const UNKNOWN_FLAG_MESSAGE: &str = "Parsed unknown option flag(s)!";

/// Split `args` into positionals and flag values.
///
/// Only fails in strict mode, on the first flag whose name was never declared.
///
/// A dash run with no name after it (a bare `-` or `---`) is dropped and never
/// takes the following token as its value.
pub fn tokenize<S: AsRef<str>>(args: &[S], options: &TokenizeOptions) -> Result<Parsed, UnknownFlag> {
    tokenize_with_origins(args, options).map(|(parsed, _)| parsed)
}

/// [`tokenize`], also reporting for each positional the index in `args` it
/// was read from. Values leaked by boolean flags have no origin.
pub(crate) fn tokenize_with_origins<S: AsRef<str>>(
    args: &[S],
    options: &TokenizeOptions,
) -> Result<(Parsed, Vec<Option<usize>>), UnknownFlag> {
    let spec = FlagSpec::compile(options);
    let mut out = Parsed::default();
    let mut origins: Vec<Option<usize>> = Vec::new();

    let mut i = 0usize;
    while i < args.len() {
        let arg = args[i].as_ref();

        if arg == "--" {
            out.positionals.extend(
                args[i + 1..]
                    .iter()
                    .map(|a| Value::String(a.as_ref().to_string())),
            );
            origins.extend((i + 1..args.len()).map(Some));
            break;
        }

        let dashes = arg.bytes().take_while(|b| *b == b'-').count();
        if dashes == 0 {
            out.positionals.push(Value::String(arg.to_string()));
            origins.push(Some(i));
            i += 1;
            continue;
        }

        let body = &arg[dashes..];
        if let Some(name) = body.strip_prefix("no-") {
            spec.check(name, || arg.to_string())?;
            out.flags.insert(name.to_string(), Value::Bool(false));
            i += 1;
            continue;
        }

        let (name, inline) = split_inline(body);

        // Exactly two dashes name one long flag; anything else is a cluster.
        let names: Vec<String> = if dashes == 2 {
            vec![name.to_string()]
        } else {
            name.chars().map(String::from).collect()
        };
        if names.is_empty() {
            // A bare `-` (or `---`) names nothing.
            i += 1;
            continue;
        }

        let value = match inline {
            Some(v) if !v.is_empty() => Raw::Text(v.to_string()),
            _ => match args.get(i + 1).map(|next| next.as_ref()) {
                Some(next) if !next.starts_with('-') => {
                    i += 1;
                    Raw::Text(next.to_string())
                }
                _ => Raw::Present,
            },
        };

        let last = names.len().saturating_sub(1);
        for (idx, flag) in names.iter().enumerate() {
            spec.check(flag, || format!("{}{flag}", "-".repeat(dashes)))?;
            let raw = if idx < last { Raw::Present } else { value.clone() };
            if spec.assign(&mut out, flag, raw) {
                origins.push(None);
            }
        }
        i += 1;
    }

    for (name, value) in &options.default {
        if let Some(value) = value
            && !out.flags.contains_key(name)
        {
            out.flags.insert(name.clone(), value.clone());
        }
    }

    spec.mirror_aliases(&mut out);

    tracing::trace!(
        positionals = out.positionals.len(),
        flags = out.flags.len(),
        "tokenized arguments"
    );
    Ok((out, origins))
}

/// Split `name=value`. The first character after the dashes is never treated
/// as the separator.
fn split_inline(body: &str) -> (&str, Option<&str>) {
    let first = body.chars().next().map_or(0, char::len_utf8);
    match body[first..].find('=') {
        Some(pos) => {
            let at = first + pos;
            (&body[..at], Some(&body[at + 1..]))
        }
        None => (body, None),
    }
}

#[derive(Debug, Clone)]
enum Raw {
    /// Flag given without a value.
    Present,
    Text(String),
}

/// `TokenizeOptions` with the alias closure and type sets computed.
struct FlagSpec<'o> {
    alias: IndexMap<String, Vec<String>>,
    boolean: HashSet<String>,
    string: HashSet<String>,
    known: Option<HashSet<String>>,
    options: &'o TokenizeOptions,
}

impl<'o> FlagSpec<'o> {
    fn compile(options: &'o TokenizeOptions) -> Self {
        let mut alias = options.alias.clone();

        // Every alias maps back to its key plus its siblings. Later groups
        // overwrite earlier entries for the same name.
        let keys: Vec<String> = alias.keys().cloned().collect();
        for key in keys {
            let group = alias.get(&key).cloned().unwrap_or_default();
            for (idx, name) in group.iter().enumerate() {
                let mut back: Vec<String> = group
                    .iter()
                    .enumerate()
                    .filter(|(other, _)| *other != idx)
                    .map(|(_, s)| s.clone())
                    .collect();
                back.push(key.clone());
                alias.insert(name.clone(), back);
            }
        }

        let mut boolean: HashSet<String> = HashSet::new();
        for name in &options.boolean {
            boolean.insert(name.clone());
            boolean.extend(alias.get(name).into_iter().flatten().cloned());
        }
        let mut string: HashSet<String> = HashSet::new();
        for name in &options.string {
            string.insert(name.clone());
            string.extend(alias.get(name).into_iter().flatten().cloned());
        }

        for (name, value) in &options.default {
            let group = alias.entry(name.clone()).or_default().clone();
            let target = match FlagKind::of(value.as_ref()) {
                FlagKind::Boolean => &mut boolean,
                FlagKind::String => &mut string,
                FlagKind::Number | FlagKind::Unset => continue,
            };
            target.insert(name.clone());
            target.extend(group);
        }

        let known = options
            .unknown
            .as_ref()
            .map(|_| alias.keys().cloned().collect());

        Self {
            alias,
            boolean,
            string,
            known,
            options,
        }
    }

    fn check(&self, name: &str, token: impl FnOnce() -> String) -> Result<(), UnknownFlag> {
        let (Some(known), Some(unknown)) = (&self.known, &self.options.unknown) else {
            return Ok(());
        };
        if known.contains(name) {
            return Ok(());
        }
        let token = token();
        let message = unknown(&token);
        tracing::debug!(%token, "rejected unknown flag");
        Err(UnknownFlag { token, message })
    }

    /// Store one occurrence of `name`. Returns whether a value leaked into
    /// the positionals.
    fn assign(&self, out: &mut Parsed, name: &str, raw: Raw) -> bool {
        let mut leaked = false;
        let next = if self.string.contains(name) {
            match raw {
                Raw::Present => Value::String(String::new()),
                Raw::Text(text) => Value::String(text),
            }
        } else {
            match raw {
                Raw::Present => Value::Bool(true),
                Raw::Text(text) if self.boolean.contains(name) => match text.as_str() {
                    "true" => Value::Bool(true),
                    "false" => Value::Bool(false),
                    _ => {
                        if self.options.leak_boolean_values {
                            out.positionals.push(Value::coerce(&text));
                            leaked = true;
                        }
                        Value::Bool(!text.is_empty())
                    }
                },
                Raw::Text(text) => Value::coerce(&text),
            }
        };

        match out.flags.get_mut(name) {
            None => {
                out.flags.insert(name.to_string(), next);
            }
            Some(Value::List(items)) => items.push(next),
            Some(slot) => {
                let first = std::mem::replace(slot, Value::Bool(false));
                *slot = Value::List(vec![first, next]);
            }
        }
        leaked
    }

    /// Copy each flag's value onto its aliases. Within a group the first flag
    /// to appear in the output wins.
    fn mirror_aliases(&self, out: &mut Parsed) {
        let mut pending = self.alias.clone();
        let present: Vec<String> = out.flags.keys().cloned().collect();
        for name in present {
            let Some(aliases) = pending.get_mut(&name).map(std::mem::take) else {
                continue;
            };
            let Some(value) = out.flags.get(&name).cloned() else {
                continue;
            };
            for alias in aliases {
                out.flags.insert(alias, value.clone());
            }
        }
    }
}
