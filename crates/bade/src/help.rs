//! Help and error text.

use crate::builder::Program;
use crate::error::ParseError;
use crate::value::Value;

const INDENT: &str = "  ";
/// Spaces between the widest label and its description.
const GAP: usize = 4;

impl Program {
    /// Help text for the whole program (`None`) or for one command. Command
    /// aliases resolve to the command they name.
    pub fn help(&self, command: Option<&str>) -> Result<String, ParseError> {
        let (key, entry) = match command {
            None => (None, &self.root),
            Some(name) => match self.find(name) {
                Some((key, entry)) => (Some(key), entry),
                None => return Err(ParseError::InvalidCommand(name.to_string())),
            },
        };

        let mut rows: Vec<Row> = entry
            .options()
            .iter()
            .chain(&self.global.options)
            .map(|spec| Row {
                label: spec.label(),
                description: spec.description.clone(),
                default: spec.default.clone(),
            })
            .collect();
        if key.is_none() {
            rows.push(Row::plain("-v, --version", "Displays current version"));
        }
        rows.push(Row::plain("-h, --help", "Displays this message"));

        let mut out = String::new();
        out += &section("Description", entry.description());
        out += &section("Usage", &[self.prefixed(&format!("{} [options]", entry.usage()))]);

        if !self.single {
            match key {
                None => {
                    let commands: Vec<Row> = self
                        .commands()
                        .map(|(name, entry)| {
                            Row::plain(name, entry.description().first().map_or("", String::as_str))
                        })
                        .collect();
                    out += &section("Available Commands", &format_rows(&commands));
                    out += &format!("\n{INDENT}For more info, run any command with the `--help` flag");
                    for row in commands.iter().take(2) {
                        out += &format!(
                            "\n{INDENT}{INDENT}{}",
                            self.prefixed(&format!("{} --help", row.label))
                        );
                    }
                    out.push('\n');
                }
                Some(_) => {
                    let aliases: Vec<String> =
                        entry.aliases().iter().map(|a| self.prefixed(a)).collect();
                    out += &section("Aliases", &aliases);
                }
            }
        }

        out += &section("Options", &format_rows(&rows));
        let examples: Vec<String> = entry.examples().iter().map(|e| self.prefixed(e)).collect();
        out += &section("Examples", &examples);

        Ok(out)
    }

    /// `<bin>, <version>`.
    pub fn version_line(&self) -> String {
        format!("{}, {}", self.bin, self.version)
    }

    /// `$ <bin> <text>`, with whitespace runs collapsed.
    fn prefixed(&self, text: &str) -> String {
        collapse_whitespace(&format!("$ {} {text}", self.bin))
    }
}

/// The block printed for a parse error. `target` is what the user should run
/// `--help` on.
pub fn render_error(target: &str, message: &str) -> String {
    let mut out = section("ERROR", &[message]);
    out += &format!("\n{INDENT}Run `$ {target} --help` for more info.\n");
    out
}

struct Row {
    label: String,
    description: String,
    default: Option<Value>,
}

impl Row {
    fn plain(label: &str, description: &str) -> Self {
        Self {
            label: label.to_string(),
            description: description.to_string(),
            default: None,
        }
    }
}

/// Titled, indented block. Renders nothing for no lines.
fn section<S: AsRef<str>>(title: &str, lines: &[S]) -> String {
    if lines.is_empty() {
        return String::new();
    }
    let mut out = format!("\n{INDENT}{title}");
    for line in lines {
        out += &format!("\n{INDENT}{INDENT}{}", line.as_ref());
    }
    out.push('\n');
    out
}

/// Two columns; descriptions start `GAP` spaces past the widest label.
fn format_rows(rows: &[Row]) -> Vec<String> {
    let width = rows
        .iter()
        .map(|row| row.label.chars().count())
        .max()
        .unwrap_or(0)
        + GAP;
    rows.iter()
        .map(|row| {
            let pad = width - row.label.chars().count();
            let mut line = format!("{}{}{}", row.label, " ".repeat(pad), row.description);
            if let Some(default) = &row.default {
                line += &format!("  (default {default})");
            }
            line
        })
        .collect()
}

fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_space = false;
    for c in text.chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out
}
