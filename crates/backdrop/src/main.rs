mod cli;
mod paths;
mod run;

use anyhow::{Context, Result};
use renderer::{probe, render_fallback};

use crate::cli::{Command, FallbackArgs, RunArgs};

fn main() -> Result<()> {
    let cli = cli::parse();
    run::initialise_tracing(cli.run.verbose);

    match cli.command {
        None | Some(Command::Run) => run::run(&cli.run),
        Some(Command::Fallback(args)) => write_fallback(&cli.run, &args),
        Some(Command::Probe) => print_probe(&cli.run),
        Some(Command::Config) => print_config(&cli.run),
    }
}

fn write_fallback(run_args: &RunArgs, args: &FallbackArgs) -> Result<()> {
    let resolved = run::load(run_args)?;
    let size = resolved.surface_size();
    let image = render_fallback(size);
    image
        .save(&args.output)
        .with_context(|| format!("failed to write {}", args.output.display()))?;
    tracing::info!(path = %args.output.display(), %size, "wrote fallback background");
    Ok(())
}

fn print_probe(run_args: &RunArgs) -> Result<()> {
    let resolved = run::load(run_args)?;
    let report = probe(resolved.renderer.backend, resolved.renderer.gpu_enabled);

    println!("capability: {}", report.capability);
    if report.adapters.is_empty() {
        println!("adapters: none");
    } else {
        println!("adapters:");
        for adapter in &report.adapters {
            let note = if adapter.is_software() { " [software]" } else { "" };
            println!("  - {adapter}{note}");
        }
    }
    Ok(())
}

fn print_config(run_args: &RunArgs) -> Result<()> {
    let resolved = run::load(run_args)?;
    print!("{}", run::render_effective_config(&resolved)?);
    Ok(())
}
