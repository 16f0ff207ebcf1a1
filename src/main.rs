use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use dbsketch::{SourceFormat, parse_source, serializer};

#[derive(Parser)]
#[command(name = "dbsketch", about = "Schema DSL and SQL DDL to entity-relationship model")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a schema file and print its model as JSON
    Parse {
        input: PathBuf,
        /// Input format: auto, dbml or sql (default: from extension, then content)
        #[arg(long, value_parser = parse_format)]
        format: Option<SourceFormat>,
        /// Fail if any construct was dropped
        #[arg(long)]
        strict: bool,
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Convert a schema file to DSL source
    Convert {
        input: PathBuf,
        #[arg(long, value_parser = parse_format)]
        format: Option<SourceFormat>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List the constructs a parse would drop
    Check {
        input: PathBuf,
        #[arg(long, value_parser = parse_format)]
        format: Option<SourceFormat>,
    },
}

fn main() -> Result<ExitCode> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Parse {
            input,
            format,
            strict,
            output,
        } => cmd_parse(&input, format, strict, output.as_deref()),
        Commands::Convert {
            input,
            format,
            output,
        } => cmd_convert(&input, format, output.as_deref()),
        Commands::Check { input, format } => cmd_check(&input, format),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn parse_format(s: &str) -> std::result::Result<SourceFormat, String> {
    SourceFormat::from_str(s).ok_or_else(|| format!("unknown format `{s}` (expected auto, dbml or sql)"))
}

fn read_parsed(input: &Path, format: Option<SourceFormat>) -> Result<dbsketch::Parsed> {
    let text = fs::read_to_string(input)
        .with_context(|| format!("failed to read {}", input.display()))?;
    let format = format.unwrap_or_else(|| SourceFormat::from_path(input));
    Ok(parse_source(&text, format))
}

fn write_output(output: Option<&Path>, text: &str) -> Result<()> {
    match output {
        Some(path) => fs::write(path, text)
            .with_context(|| format!("failed to write {}", path.display())),
        None => {
            print!("{text}");
            Ok(())
        }
    }
}

fn cmd_parse(
    input: &Path,
    format: Option<SourceFormat>,
    strict: bool,
    output: Option<&Path>,
) -> Result<ExitCode> {
    let parsed = read_parsed(input, format)?;
    for diagnostic in &parsed.diagnostics {
        tracing::warn!(%diagnostic, "dropped");
    }
    let schema = if strict {
        parsed
            .into_strict()
            .with_context(|| format!("strict parse of {} failed", input.display()))?
    } else {
        parsed.schema
    };

    let mut json = serde_json::to_string_pretty(&schema)?;
    json.push('\n');
    write_output(output, &json)?;
    Ok(ExitCode::SUCCESS)
}

fn cmd_convert(input: &Path, format: Option<SourceFormat>, output: Option<&Path>) -> Result<ExitCode> {
    let parsed = read_parsed(input, format)?;
    if parsed.schema.tables.is_empty() && parsed.schema.relationships.is_empty() {
        bail!("no tables or relationships found in {}", input.display());
    }
    write_output(output, &serializer::to_source(&parsed.schema))?;
    Ok(ExitCode::SUCCESS)
}

fn cmd_check(input: &Path, format: Option<SourceFormat>) -> Result<ExitCode> {
    let parsed = read_parsed(input, format)?;
    for diagnostic in &parsed.diagnostics {
        println!("{}: {diagnostic}", input.display());
    }
    if parsed.is_clean() {
        println!(
            "OK: {} tables, {} relationships, {} enums",
            parsed.schema.tables.len(),
            parsed.schema.relationships.len(),
            parsed.schema.enums.len()
        );
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
