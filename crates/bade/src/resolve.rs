//! Matching argv against the command tree and dispatching to handlers.

use std::collections::HashSet;

use serde::Serialize;

use crate::builder::Program;
use crate::error::ParseError;
use crate::help::render_error;
use crate::host::Host;
use crate::tokenize::{Parsed, TokenizeOptions, tokenize, tokenize_with_origins};
use crate::tree::{CommandEntry, Handler, Node, OptionScope};
use crate::value::Value;

/// Per-parse settings: tokenizer overrides plus dispatch mode.
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// Merged over the program's global and command options; wins on conflict.
    pub tokenize: TokenizeOptions,
    /// Return the matched command instead of running its handler.
    pub lazy: bool,
}

impl ParseOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lazy(mut self) -> Self {
        self.lazy = true;
        self
    }

    pub fn alias<I, S>(mut self, name: impl Into<String>, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tokenize = self.tokenize.alias(name, aliases);
        self
    }

    pub fn boolean(mut self, name: impl Into<String>) -> Self {
        self.tokenize = self.tokenize.boolean(name);
        self
    }

    pub fn string(mut self, name: impl Into<String>) -> Self {
        self.tokenize = self.tokenize.string(name);
        self
    }

    pub fn default_value(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.tokenize = self.tokenize.default_value(name, value);
        self
    }

    /// Reject undeclared flags; `f` gets the offending token.
    pub fn unknown<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.tokenize = self.tokenize.unknown(f);
        self
    }

    pub fn leak_boolean_values(mut self, enabled: bool) -> Self {
        self.tokenize = self.tokenize.leak_boolean_values(enabled);
        self
    }
}

/// A matched command with its bound arguments.
#[derive(Debug, Clone, Serialize)]
pub struct Dispatch {
    /// Canonical command name; empty in single-command mode.
    #[serde(rename = "command")]
    pub name: String,
    /// One slot per placeholder: required first, then optional.
    pub args: Vec<Option<Value>>,
    /// Flags plus positionals left over after binding.
    pub options: Parsed,
    #[serde(skip)]
    handler: Option<Handler>,
}

impl Dispatch {
    pub fn handler(&self) -> Option<&Handler> {
        self.handler.as_ref()
    }

    pub fn run(&self) -> anyhow::Result<()> {
        let Some(handler) = &self.handler else {
            anyhow::bail!("no action registered for command `{}`", self.name);
        };
        tracing::debug!(command = %self.name, args = self.args.len(), "dispatching");
        handler.call(&self.args, &self.options)
    }
}

/// Outcome of [`Program::resolve`].
#[derive(Debug, Clone)]
pub enum Resolution {
    Help(String),
    Version(String),
    Dispatch(Dispatch),
}

impl Program {
    /// Resolve `argv` to a command without printing or exiting.
    pub fn resolve<I, T>(&self, argv: I, options: &ParseOptions) -> Result<Resolution, ParseError>
    where
        I: IntoIterator<Item = T>,
        T: ToString,
    {
        let mut args: Vec<String> = argv.into_iter().map(|a| a.to_string()).collect();

        let probe = TokenizeOptions::new()
            .alias("h", ["help"])
            .alias("v", ["version"]);
        let (preliminary, origins) = tokenize_with_origins(&args, &probe)?;

        let matched = if self.single {
            Matched::root()
        } else {
            let words: Vec<Word> = preliminary
                .positionals
                .iter()
                .zip(origins)
                .map(|(value, origin)| Word {
                    text: value.to_string(),
                    origin,
                })
                .collect();
            self.match_command(words)?
        };

        if preliminary.is_set("help") {
            let target = (!self.single && !matched.fallback)
                .then_some(matched.name.as_str())
                .filter(|name| !name.is_empty());
            return self.help(target).map(Resolution::Help);
        }
        if preliminary.is_set("version") {
            return Ok(Resolution::Version(self.version_line()));
        }

        let entry = if self.single {
            &self.root
        } else {
            self.entry(&matched.name)
                .ok_or(ParseError::NoCommandSpecified)?
        };

        if !self.single && !matched.fallback {
            remove_indices(&mut args, &matched.consumed);
        }

        let merged = OptionScope::merge(&self.global, entry.scope(), &options.tokenize);
        let mut parsed = tokenize(&args, &merged)?;
        let bound = bind_positionals(entry, &mut parsed).ok_or_else(|| {
            ParseError::InsufficientArguments {
                command: matched.name.clone(),
            }
        })?;

        tracing::debug!(command = %matched.name, args = bound.len(), "resolved command");
        Ok(Resolution::Dispatch(Dispatch {
            name: matched.name,
            args: bound,
            options: parsed,
            handler: entry.handler.clone(),
        }))
    }

    /// Resolve `argv` and act on it: print help or version, report errors
    /// through `host` (then exit with `1`), or run the matched handler.
    ///
    /// Returns the dispatch instead of running it when `options.lazy` is set.
    pub fn parse<H, I, T>(
        &self,
        host: &H,
        argv: I,
        options: &ParseOptions,
    ) -> anyhow::Result<Option<Dispatch>>
    where
        H: Host + ?Sized,
        I: IntoIterator<Item = T>,
        T: ToString,
    {
        match self.resolve(argv, options) {
            Ok(Resolution::Help(text) | Resolution::Version(text)) => {
                host.print(&text);
                Ok(None)
            }
            Ok(Resolution::Dispatch(dispatch)) if options.lazy => Ok(Some(dispatch)),
            Ok(Resolution::Dispatch(dispatch)) => {
                dispatch.run()?;
                Ok(None)
            }
            Err(err) => {
                tracing::debug!(error = %err, "argument error");
                host.print_error(&render_error(&err.help_target(&self.bin), &err.to_string()));
                host.exit(1);
                Ok(None)
            }
        }
    }

    /// Find the longest run of leading positionals naming a command.
    ///
    /// An alias rewrites the words it spans into its command's words, and
    /// matching carries on over the rewritten list. Stops at the first miss
    /// once something has matched.
    fn match_command(&self, mut words: Vec<Word>) -> Result<Matched, ParseError> {
        let mut name = String::new();
        let mut tried = String::new();
        // Argument indices of words swallowed by alias rewrites.
        let mut rewritten: Vec<usize> = Vec::new();
        let mut expanded: HashSet<String> = HashSet::new();

        let mut i = 1;
        while i <= words.len() {
            tried = join_words(&words[..i]);
            match self.tree.get(&tried) {
                Some(Node::Alias(target)) => {
                    if !expanded.insert(tried.clone()) {
                        break;
                    }
                    tracing::debug!(alias = %tried, command = %target, "expanded command alias");
                    let canonical = target.split(' ').map(|text| Word {
                        text: text.to_string(),
                        origin: None,
                    });
                    rewritten.extend(words.splice(..i, canonical).filter_map(|w| w.origin));
                    name = target.clone();
                    i = target.split(' ').count();
                }
                Some(Node::Command(_)) => name = tried.clone(),
                None if !name.is_empty() => break,
                None => {}
            }
            i += 1;
        }

        if self.entry(&name).is_some() {
            let span = name.split(' ').count();
            let mut consumed = rewritten;
            consumed.extend(words.iter().take(span).filter_map(|w| w.origin));
            return Ok(Matched {
                name,
                consumed,
                fallback: false,
            });
        }
        if let Some(default) = &self.default_command {
            tracing::debug!(command = %default, "falling back to default command");
            return Ok(Matched {
                name: default.clone(),
                consumed: Vec::new(),
                fallback: true,
            });
        }
        if !tried.is_empty() {
            return Err(ParseError::InvalidCommand(tried));
        }
        // Nothing typed. Help and version still get a chance to run.
        Ok(Matched::root())
    }
}

/// A leading positional and the argument index it was read from.
struct Word {
    text: String,
    origin: Option<usize>,
}

fn join_words(words: &[Word]) -> String {
    words
        .iter()
        .map(|w| w.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

struct Matched {
    name: String,
    /// Argument indices holding the command's words.
    consumed: Vec<usize>,
    fallback: bool,
}

impl Matched {
    fn root() -> Self {
        Self {
            name: String::new(),
            consumed: Vec::new(),
            fallback: false,
        }
    }
}

/// Drop the arguments at `indices`, leaving everything between them in place.
fn remove_indices(args: &mut Vec<String>, indices: &[usize]) {
    let skip: HashSet<usize> = indices.iter().copied().collect();
    let mut idx = 0;
    args.retain(|_| {
        let keep = !skip.contains(&idx);
        idx += 1;
        keep
    });
}

/// Take one positional per required slot, then one (or `None`) per optional
/// slot. `None` when there are too few positionals for the required slots.
fn bind_positionals(entry: &CommandEntry, parsed: &mut Parsed) -> Option<Vec<Option<Value>>> {
    let required = entry.arity();
    if parsed.positionals.len() < required {
        return None;
    }
    let mut bound: Vec<Option<Value>> = parsed.positionals.drain(..required).map(Some).collect();
    for _ in 0..entry.optional_count() {
        let next = (!parsed.positionals.is_empty()).then(|| parsed.positionals.remove(0));
        bound.push(next);
    }
    Some(bound)
}
