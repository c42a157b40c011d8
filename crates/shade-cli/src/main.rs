use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use miette::{Context, IntoDiagnostic};

use shade_validate::Capabilities;

/// Shade — IR module inspector
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Input module file (binary-encoded)
    input: PathBuf,

    /// Capabilities to validate with (repeatable), e.g. --allow overrides
    #[arg(long = "allow", value_parser = parse_capability)]
    allow: Vec<Capabilities>,

    /// Skip validation
    #[arg(long)]
    no_validate: bool,

    /// Skip printing the module disassembly
    #[arg(long)]
    no_dump: bool,

    /// Re-encode the module to this path after validation
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn parse_capability(s: &str) -> Result<Capabilities, String> {
    Capabilities::from_name(s).ok_or_else(|| format!("unknown capability '{s}'"))
}

fn main() -> ExitCode {
    env_logger::init();
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> miette::Result<()> {
    let cli = Cli::parse();

    // 1. Read and decode the module.
    let bytes = std::fs::read(&cli.input)
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to read {}", cli.input.display()))?;
    let module = shade_binary::decode(&bytes)
        .map_err(|e| miette::miette!("{e}"))
        .wrap_err("module decode failed")?;

    // 2. Validate.
    if !cli.no_validate {
        let mut caps = Capabilities::NONE;
        for cap in &cli.allow {
            caps |= *cap;
        }
        shade_validate::validate(&module, caps)
            .map_err(|e| miette::miette!("{e}"))
            .wrap_err("module validation failed")?;
    }

    // 3. Dump.
    if !cli.no_dump {
        print!("{}", shade_ir::dump_module(&module));
    }

    // 4. Optionally re-encode.
    if let Some(output) = &cli.output {
        let bytes = shade_binary::encode(&module).map_err(|e| miette::miette!("{e}"))?;
        std::fs::write(output, bytes)
            .into_diagnostic()
            .wrap_err_with(|| format!("failed to write {}", output.display()))?;
    }

    Ok(())
}
