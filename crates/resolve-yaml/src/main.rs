//! Resolve a run-configuration document and print the result as plain YAML.
//!
//! Reads from a file or stdin, runs the full load pipeline (tag resolvers,
//! substitution, arithmetic, choose blocks, fence expansion) and emits the
//! fully resolved document.

use anyhow::{Context, Result};
use clap::Parser;
use simcfg_config::{LoadOptions, ShellOptions};
use std::io::Read;
use std::time::Duration;
use yaml_rust2::YamlEmitter;

#[derive(Parser, Debug)]
#[command(name = "resolve-yaml")]
#[command(about = "Resolve tags, variables and fences in a run-configuration document")]
struct Args {
    /// Input file, or "-" for stdin
    #[arg(short = 'i', long = "input", default_value = "-")]
    input: String,

    /// Output file (stdout when omitted)
    #[arg(short = 'o', long = "output")]
    output: Option<String>,

    /// Kill !SHELL subprocesses after this many seconds
    #[arg(long = "timeout", value_name = "SECONDS")]
    timeout: Option<u64>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(error) = run(Args::parse()) {
        eprintln!("Error: {error:#}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let (content, name) = read_input(&args.input)?;
    tracing::debug!(input = %name, "loading document");

    let options = LoadOptions {
        shell: ShellOptions {
            timeout: args.timeout.map(Duration::from_secs),
        },
        ..LoadOptions::default()
    };
    let tree = simcfg_config::load_with_options(&content, Some(&name), &options)
        .with_context(|| format!("failed to resolve {name}"))?;

    let mut rendered = String::new();
    YamlEmitter::new(&mut rendered)
        .dump(&tree.to_yaml())
        .context("failed to emit resolved document")?;
    rendered.push('\n');

    match args.output {
        Some(path) => {
            std::fs::write(&path, rendered).with_context(|| format!("failed to write {path}"))?;
        }
        None => print!("{rendered}"),
    }
    Ok(())
}

fn read_input(input: &str) -> Result<(String, String)> {
    if input == "-" {
        let mut content = String::new();
        std::io::stdin()
            .read_to_string(&mut content)
            .context("failed to read stdin")?;
        Ok((content, "<stdin>".to_string()))
    } else {
        let content =
            std::fs::read_to_string(input).with_context(|| format!("failed to read {input}"))?;
        Ok((content, input.to_string()))
    }
}
