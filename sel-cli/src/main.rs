use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process;

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use log::debug;
use sel_engine::{App, AppOptions, Error, Registry, Span};
use sel_support::{io_error, script_error, wrap_words};

const DOC_WIDTH: usize = 76;

#[derive(Parser)]
#[command(
    name = "sel",
    version,
    about = "Stream text through a pipeline of small functions.",
    long_about = "Build an application from a sel script and run it from stdin to stdout. \
                  Elements are separated by ',' and each one is applied to the result of the previous."
)]
struct Cli {
    /// Read the script from a file ('-' for stdin) instead of the command line.
    #[arg(short, long, value_name = "PATH")]
    file: Option<PathBuf>,

    /// Print the type and doc of builtins (all of them when no name is given), then exit.
    #[arg(short, long, value_name = "NAME", num_args = 0..)]
    lookup: Option<Vec<String>>,

    /// Print the type of the application instead of running it.
    #[arg(short, long = "type")]
    ty: bool,

    /// Print the debug representation of the application instead of running it.
    #[arg(short = 'D', long)]
    debug: bool,

    /// Only build the application.
    #[arg(short, long)]
    no_run: bool,

    /// Require the application to accept the input text as is.
    #[arg(short, long)]
    strict: bool,

    /// Allow the script to be a plain value, streamed as is.
    #[arg(long)]
    not_fun: bool,

    /// Log what the engine does (overridden by RUST_LOG).
    #[arg(short, long)]
    verbose: bool,

    /// The script, its words joined with spaces.
    #[arg(value_name = "SCRIPT", trailing_var_arg = true, allow_hyphen_values = true, num_args = 0..)]
    script: Vec<String>,
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if let Err(err) = run(cli) {
        eprintln!("error: {err:#}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let registry = Registry::with_builtins().context("invalid builtin catalogue")?;

    if let Some(names) = &cli.lookup {
        return lookup(&registry, names);
    }

    let source = read_script(&cli)?;
    let mut app = App::new(
        registry,
        AppOptions {
            strict_type: cli.strict,
            not_fun: cli.not_fun,
        },
    );
    if let Err(err) = app.build(&source) {
        return Err(match err.span() {
            Some(span) => anyhow!("{err}\n{}", excerpt(&source, span)),
            None => anyhow!(err),
        });
    }

    if cli.ty {
        println!("{}", app.ty()?);
    }
    if cli.debug {
        println!("{}", app.repr(false)?);
    }
    if cli.ty || cli.debug || cli.no_run {
        return Ok(());
    }

    debug!("running application");
    let mut stdout = io::stdout().lock();
    app.run(io::stdin().lock(), &mut stdout).map_err(|err| match err {
        Error::Io(err) => anyhow!(io_error("stream", err)),
        other => anyhow!(other),
    })
}

fn read_script(cli: &Cli) -> Result<String> {
    match &cli.file {
        Some(path) if path.as_os_str() == "-" => {
            let mut source = String::new();
            io::stdin()
                .read_to_string(&mut source)
                .with_context(|| script_error("read", "-"))?;
            Ok(source)
        }
        Some(path) => {
            fs::read_to_string(path)
                .with_context(|| script_error("read", &path.display().to_string()))
        }
        None if cli.script.is_empty() => bail!("no script given (see --help)"),
        None => Ok(cli.script.join(" ")),
    }
}

fn lookup(registry: &Registry, names: &[String]) -> Result<()> {
    if names.is_empty() {
        for name in registry.list_names() {
            if let Some(ty) = registry.lookup_type(name) {
                println!("{name} :: {ty}");
            }
        }
        return Ok(());
    }

    for name in names {
        let (Some(ty), Some(doc)) = (registry.lookup_type(name), registry.lookup_doc(name)) else {
            bail!("unknown name '{name}'");
        };
        println!("{name} :: {ty}");
        for line in wrap_words(doc, DOC_WIDTH) {
            println!("    {line}");
        }
        println!();
    }
    Ok(())
}

/// The line holding `span`, with carets underneath.
fn excerpt(source: &str, span: Span) -> String {
    let (line, column) = span.line_column(source);
    let text = source.lines().nth(line - 1).unwrap_or_default();
    let width = source
        .get(span.offset..span.offset + span.len)
        .map(|it| it.chars().count())
        .unwrap_or(1)
        .max(1);

    format!(
        "   | {text}\n   | {}{}",
        " ".repeat(column - 1),
        "^".repeat(width)
    )
}
