use anyhow::Result;
use bade::{CommandOptions, ParseOptions, Parsed, Program, StdHost, Value};
use serde_json::json;
use tracing_subscriber::{EnvFilter, fmt};

const STRICT_ENV: &str = "BADE_DEMO_STRICT";

fn main() -> Result<()> {
    init_tracing();
    let program = program()?;

    let mut options = ParseOptions::new();
    if strict_mode() {
        tracing::debug!("strict flag checking enabled");
        options = options.unknown(|flag| Some(format!("Unknown option: {flag}")));
    }

    program.parse(&StdHost, std::env::args().skip(1), &options)?;
    Ok(())
}

fn program() -> Result<Program> {
    let program = Program::new("bade-demo")
        .version(env!("CARGO_PKG_VERSION"))
        .option("-q, --quiet", "Suppress command output")
        .option_with_default("--color", "Colorize output", true)
        .command_with(
            "build [src]",
            "Compile the project. Output lands in the output directory.",
            CommandOptions::new().alias("b").as_default(),
        )?
        .option_with_default("-o, --output", "Output directory", "dist")
        .option_with_default("-j, --jobs", "Parallel jobs", 4)
        .option("-w, --watch", "Rebuild on change")
        .example("build src --jobs 8")
        .action(report("build"))
        .command_with(
            "new <name> [template]",
            "Create a project from a template.",
            CommandOptions::new().alias("n"),
        )?
        .option_with_default("-t, --template-dir", "Where templates live", "templates")
        .example("new my-app minimal")
        .action(report("new"))
        .command("remote add <name> <url>")?
        .describe("Register a remote.")
        .action(report("remote add"))
        .command("remote remove <name>")?
        .describe("Forget a remote.")
        .alias(["remote rm", "rr"])?
        .action(report("remote remove"));
    Ok(program)
}

/// Handler that prints what was dispatched as one JSON line.
fn report(
    command: &'static str,
) -> impl Fn(&[Option<Value>], &Parsed) -> Result<()> + Send + Sync + 'static {
    move |args: &[Option<Value>], options: &Parsed| {
        if options.is_set("quiet") {
            return Ok(());
        }
        let out = json!({
            "command": command,
            "args": args,
            "options": options,
        });
        println!("{}", serde_json::to_string(&out)?);
        Ok(())
    }
}

fn strict_mode() -> bool {
    std::env::var(STRICT_ENV)
        .map(|v| !matches!(v.trim(), "" | "0" | "false"))
        .unwrap_or(false)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
