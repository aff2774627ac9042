//! Subcommand-aware argument parsing.
//!
//! A [`Program`] is declared with a chain of builder calls: commands with
//! usage patterns (`remote add <name> [url]`), aliases, flags with defaults,
//! examples and actions. [`Program::parse`] then matches argv against the
//! command tree, binds positionals to the usage placeholders, and either runs
//! the action or hands the result back (lazy mode). `-h/--help` and
//! `-v/--version` are built in.
//!
//! The flag tokenizer is usable on its own through [`tokenize()`].

mod builder;
mod error;
mod help;
mod host;
mod resolve;
mod tokenize;
mod tree;
mod value;

pub use builder::{CommandOptions, Program};
pub use error::{BuildError, ParseError};
pub use help::render_error;
pub use host::{Host, StdHost};
pub use resolve::{Dispatch, ParseOptions, Resolution};
pub use tokenize::{Parsed, TokenizeOptions, UnknownFlag, UnknownFn, tokenize};
pub use tree::{CommandEntry, Handler, Node, OptionScope, OptionSpec, Placeholder};
pub use value::{FlagKind, Value};
