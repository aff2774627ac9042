//! Declaring a program's commands.

use indexmap::IndexMap;

use crate::error::BuildError;
use crate::tokenize::Parsed;
use crate::tree::{CommandEntry, Handler, Node, OptionScope, OptionSpec, Placeholder};
use crate::value::Value;

/// Extra settings for [`Program::command_with`].
#[derive(Debug, Clone, Default)]
pub struct CommandOptions {
    pub aliases: Vec<String>,
    /// Run this command when no command word matches.
    pub default: bool,
}

impl CommandOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn as_default(mut self) -> Self {
        self.default = true;
        self
    }
}

/// A command-line program: its command tree plus the builder cursor.
///
/// ```rust,ignore
/// let program = Program::new("git")
///     .version("1.0.0")
///     .option("-q, --quiet", "Suppress output")
///     .command("remote add <name> <url>")?
///     .describe("Add a remote.")
///     .action(|args, opts| { /* ... */ Ok(()) });
/// ```
#[derive(Debug, Clone)]
pub struct Program {
    pub(crate) bin: String,
    pub(crate) version: String,
    pub(crate) single: bool,
    /// The program-level entry: root usage, description and examples, plus
    /// the handler in single-command mode.
    pub(crate) root: CommandEntry,
    /// Options declared before any command. They apply to every command.
    pub(crate) global: OptionScope,
    pub(crate) tree: IndexMap<String, Node>,
    pub(crate) default_command: Option<String>,
    pub(crate) current: Option<String>,
}

impl Program {
    /// Create a program. A name carrying placeholders, such as
    /// `"bin <type> [dir]"`, makes a single-command program.
    pub fn new(name: &str) -> Self {
        Self::build(name, false)
    }

    /// Create a single-command program: no command words are matched and the
    /// root usage pattern binds the positionals.
    pub fn new_single(name: &str) -> Self {
        Self::build(name, true)
    }

    fn build(name: &str, force_single: bool) -> Self {
        let mut words = name.split_whitespace();
        let bin = words
            .next()
            .map(str::to_string)
            .unwrap_or_else(default_bin_name);
        let rest: Vec<&str> = words.collect();
        let single = force_single || !rest.is_empty();
        let usage = if single {
            rest.join(" ")
        } else {
            "<command>".to_string()
        };

        Self {
            bin,
            version: "0.0.0".to_string(),
            single,
            root: CommandEntry::new(usage),
            global: OptionScope::default(),
            tree: IndexMap::new(),
            default_command: None,
            current: None,
        }
    }

    /// Register a command from its usage pattern, e.g. `remote add <name> [url]`.
    pub fn command(self, usage: &str) -> Result<Self, BuildError> {
        self.command_with(usage, "", CommandOptions::default())
    }

    /// Register a command with a description, aliases, and default flag.
    pub fn command_with(
        mut self,
        usage: &str,
        description: &str,
        options: CommandOptions,
    ) -> Result<Self, BuildError> {
        if self.single {
            return Err(BuildError::CommandInSingleMode);
        }

        let (words, slots): (Vec<&str>, Vec<&str>) = usage
            .split_whitespace()
            .partition(|segment| Placeholder::parse(segment).is_none());
        let name = words.join(" ");

        if self.tree.contains_key(&name) {
            return Err(BuildError::DuplicateCommand(name));
        }

        let usage = std::iter::once(name.as_str())
            .chain(slots)
            .collect::<Vec<_>>()
            .join(" ");

        tracing::debug!(command = %name, %usage, "registered command");
        self.tree
            .insert(name.clone(), Node::Command(CommandEntry::new(usage)));
        if options.default {
            self.default_command = Some(name.clone());
        }
        self.current = Some(name);

        if !options.aliases.is_empty() {
            self = self.alias(options.aliases)?;
        }
        if !description.is_empty() {
            self = self.describe(description);
        }
        Ok(self)
    }

    /// Set the current command's description, split into sentences.
    pub fn describe(self, text: &str) -> Self {
        self.describe_lines(sentences(text))
    }

    /// Set the current command's description as given.
    pub fn describe_lines<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cursor_entry().description = lines.into_iter().map(Into::into).collect();
        self
    }

    /// Add alternative names for the current command. Aliases may span
    /// several words (`"remote rm"`).
    ///
    /// Alias names are not checked against existing commands; an alias that
    /// reuses a command's name replaces that command.
    pub fn alias<I, S>(mut self, names: I) -> Result<Self, BuildError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if self.single {
            return Err(BuildError::AliasInSingleMode);
        }
        let Some(current) = self.current.clone() else {
            return Err(BuildError::AliasWithoutCommand);
        };

        let names: Vec<String> = names
            .into_iter()
            .map(Into::into)
            .filter(|name: &String| *name != current)
            .collect();
        if let Some(Node::Command(entry)) = self.tree.get_mut(&current) {
            entry.aliases.extend(names.iter().cloned());
        }
        for name in names {
            if let Some(Node::Command(_)) = self.tree.get(&name) {
                tracing::warn!(alias = %name, command = %current, "alias replaces an existing command");
            }
            self.tree.insert(name, Node::Alias(current.clone()));
        }
        Ok(self)
    }

    /// Declare a flag on the current command, or globally before any command.
    ///
    /// `flags` holds a long name and optionally a one-letter alias, separated
    /// by commas or spaces: `"-o, --output"`, `"--output -o"`, `"--verbose"`.
    pub fn option(self, flags: &str, description: &str) -> Self {
        self.declare_option(flags, description, None)
    }

    /// Like [`Program::option`], with a default. The default's type also
    /// decides how the flag's value is cast.
    pub fn option_with_default(
        self,
        flags: &str,
        description: &str,
        default: impl Into<Value>,
    ) -> Self {
        self.declare_option(flags, description, Some(default.into()))
    }

    fn declare_option(mut self, flags: &str, description: &str, default: Option<Value>) -> Self {
        let (name, alias) = parse_flag_spec(flags);
        let spec = OptionSpec {
            name,
            alias,
            description: description.to_string(),
            default,
        };
        self.option_scope().declare(spec);
        self
    }

    /// Attach the action for the current command (the root command before
    /// any command is declared, or in single-command mode).
    pub fn action<F>(mut self, handler: F) -> Self
    where
        F: Fn(&[Option<Value>], &Parsed) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.cursor_entry().handler = Some(Handler::new(handler));
        self
    }

    /// Add an example for the current command. It is shown prefixed with
    /// `$ <bin>`.
    pub fn example(mut self, text: impl Into<String>) -> Self {
        self.cursor_entry().examples.push(text.into());
        self
    }

    /// The version printed by `-v/--version`.
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.bin
    }

    pub fn version_str(&self) -> &str {
        &self.version
    }

    pub fn is_single(&self) -> bool {
        self.single
    }

    pub fn default_command(&self) -> Option<&str> {
        self.default_command.as_deref()
    }

    pub fn root(&self) -> &CommandEntry {
        &self.root
    }

    pub fn global_options(&self) -> &OptionScope {
        &self.global
    }

    /// Look up a command by name or alias.
    pub fn find(&self, name: &str) -> Option<(&str, &CommandEntry)> {
        match self.tree.get_key_value(name)? {
            (key, Node::Command(entry)) => Some((key.as_str(), entry)),
            (_, Node::Alias(target)) => match self.tree.get_key_value(target.as_str())? {
                (key, Node::Command(entry)) => Some((key.as_str(), entry)),
                (_, Node::Alias(_)) => None,
            },
        }
    }

    /// Registered commands in declaration order, aliases excluded.
    pub fn commands(&self) -> impl Iterator<Item = (&str, &CommandEntry)> {
        self.tree.iter().filter_map(|(name, node)| match node {
            Node::Command(entry) => Some((name.as_str(), entry)),
            Node::Alias(_) => None,
        })
    }

    pub(crate) fn entry(&self, name: &str) -> Option<&CommandEntry> {
        match self.tree.get(name)? {
            Node::Command(entry) => Some(entry),
            Node::Alias(_) => None,
        }
    }

    /// The entry the builder cursor points at, falling back to the root.
    fn cursor_entry(&mut self) -> &mut CommandEntry {
        let Some(current) = self.current.as_deref() else {
            return &mut self.root;
        };
        match self.tree.get_mut(current) {
            Some(Node::Command(entry)) => entry,
            _ => &mut self.root,
        }
    }

    fn option_scope(&mut self) -> &mut OptionScope {
        let Some(current) = self.current.as_deref() else {
            return &mut self.global;
        };
        match self.tree.get_mut(current) {
            Some(Node::Command(entry)) => &mut entry.scope,
            _ => &mut self.global,
        }
    }
}

fn default_bin_name() -> String {
    std::env::current_exe()
        .ok()
        .and_then(|path| path.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "program".to_string())
}

/// `"-o, --output"` -> (`output`, `Some("o")`).
///
/// The second name becomes the canonical one when it is longer than a single
/// character, so the short form always ends up as the alias.
fn parse_flag_spec(flags: &str) -> (String, Option<String>) {
    let mut names = flags
        .split(|c: char| c == ',' || c.is_whitespace())
        .map(strip_dashes)
        .filter(|s| !s.is_empty());
    let first = names.next().unwrap_or_default().to_string();
    let second = names.next().map(str::to_string);

    match second {
        Some(second) if second.chars().count() > 1 => (second, Some(first)),
        Some(second) => (first, Some(second)),
        None => (first, None),
    }
}

fn strip_dashes(name: &str) -> &str {
    let name = name.strip_prefix('-').unwrap_or(name);
    name.strip_prefix('-').unwrap_or(name)
}

/// Split prose into sentences: a break follows `.`, `?` or `!` when the next
/// non-space character is an uppercase letter.
pub(crate) fn sentences(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut out = Vec::new();
    let mut current = String::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        current.push(c);
        i += 1;
        if matches!(c, '.' | '?' | '!') {
            let mut j = i;
            while j < chars.len() && chars[j].is_whitespace() {
                j += 1;
            }
            if j < chars.len() && chars[j].is_ascii_uppercase() {
                out.push(std::mem::take(&mut current));
                i = j;
            }
        }
    }
    out.push(current);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_spec_puts_the_short_name_in_alias() {
        assert_eq!(
            parse_flag_spec("-g, --global"),
            ("global".to_string(), Some("g".to_string()))
        );
        assert_eq!(
            parse_flag_spec("--global -g"),
            ("global".to_string(), Some("g".to_string()))
        );
        assert_eq!(parse_flag_spec("-c --config"), ("config".to_string(), Some("c".to_string())));
        assert_eq!(parse_flag_spec("--bool"), ("bool".to_string(), None));
    }

    #[test]
    fn sentences_break_before_capitals() {
        assert_eq!(
            sentences("Compile the project. Output goes to dist! Really?Yes."),
            ["Compile the project.", "Output goes to dist!", "Really?", "Yes."]
        );
        assert_eq!(sentences("see v1.2 docs. then stop"), ["see v1.2 docs. then stop"]);
        assert_eq!(sentences(""), [""]);
    }

    #[test]
    fn command_splits_name_from_placeholders() {
        let program = Program::new("bin")
            .command("remote add <name> [url]")
            .unwrap();
        let (name, entry) = program.find("remote add").unwrap();
        assert_eq!(name, "remote add");
        assert_eq!(entry.usage(), "remote add <name> [url]");
        assert_eq!(entry.arity(), 1);
    }

    #[test]
    fn duplicate_command_is_rejected_regardless_of_description() {
        let err = Program::new("bin")
            .command_with("foo", "first", CommandOptions::new())
            .unwrap()
            .command_with("foo", "duplicate", CommandOptions::new())
            .unwrap_err();
        assert_eq!(err, BuildError::DuplicateCommand("foo".to_string()));
        assert_eq!(err.to_string(), "Command already exists: foo");
    }

    #[test]
    fn alias_needs_a_command_and_multi_mode() {
        let err = Program::new("bin").alias(["f"]).unwrap_err();
        assert_eq!(err, BuildError::AliasWithoutCommand);

        let err = Program::new_single("bin").alias(["f"]).unwrap_err();
        assert_eq!(err, BuildError::AliasInSingleMode);

        let err = Program::new("bin <type>").command("foo").unwrap_err();
        assert_eq!(err, BuildError::CommandInSingleMode);
    }

    #[test]
    fn aliases_point_at_the_canonical_name() {
        let program = Program::new("bin")
            .command_with("foo <dir>", "", CommandOptions::new().alias("f"))
            .unwrap()
            .alias(["fo"])
            .unwrap();
        assert!(matches!(program.tree.get("f"), Some(Node::Alias(target)) if target == "foo"));
        assert!(matches!(program.tree.get("fo"), Some(Node::Alias(target)) if target == "foo"));
        let (name, entry) = program.find("fo").unwrap();
        assert_eq!(name, "foo");
        assert_eq!(entry.aliases(), ["f", "fo"]);
        assert_eq!(program.commands().count(), 1);
    }

    #[test]
    fn alias_reusing_a_command_name_replaces_it() {
        let program = Program::new("bin")
            .command("foo")
            .unwrap()
            .command("bar")
            .unwrap()
            .alias(["foo"])
            .unwrap();
        assert!(matches!(program.tree.get("foo"), Some(Node::Alias(target)) if target == "bar"));
        assert_eq!(program.find("foo").map(|(name, _)| name), Some("bar"));
    }

    #[test]
    fn options_before_any_command_are_global() {
        let program = Program::new("bin")
            .option("-g, --global", "global flag")
            .command("foo")
            .unwrap()
            .option_with_default("-l, --local", "command flag", 3);

        assert_eq!(program.global_options().options.len(), 1);
        let (_, foo) = program.find("foo").unwrap();
        assert_eq!(foo.options()[0].label(), "-l, --local");
        assert_eq!(foo.scope().default.get("local"), Some(&Some(Value::Number(3.0))));
    }

    #[test]
    fn name_with_placeholders_is_single_command() {
        let program = Program::new("bin <type> [dir]")
            .describe("hello description")
            .option("-g, --global", "flag 1");
        assert!(program.is_single());
        assert_eq!(program.name(), "bin");
        assert_eq!(program.root().usage(), "<type> [dir]");
        assert_eq!(program.root().description(), ["hello description"]);
        assert_eq!(program.root().arity(), 1);

        let multi = Program::new("bin");
        assert!(!multi.is_single());
        assert_eq!(multi.root().usage(), "<command>");
    }

    #[test]
    fn default_command_is_recorded() {
        let program = Program::new("bin")
            .command_with("foo [dir]", "", CommandOptions::new().alias("f").as_default())
            .unwrap()
            .command("bar")
            .unwrap();
        assert_eq!(program.default_command(), Some("foo"));
    }
}
