use std::fs;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;

use webp_convert::cli::{Cli, Command, Settings};
use webp_convert::io::{collect_files, plan_outputs, resolve_output};
use webp_convert::report::{FileResult, Report};
use webp_convert_core::{ConvertConfig, Dispatcher};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Init logging
    let log_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    match &cli.command {
        Command::Convert {
            input,
            output,
            recursive,
            settings,
        } => handle_convert(input, output.as_deref(), *recursive, settings.to_config()?),
        Command::Converters { settings } => handle_converters(settings),
    }
}

fn handle_convert(
    input: &Path,
    output: Option<&Path>,
    recursive: bool,
    config: ConvertConfig,
) -> Result<()> {
    let dispatcher = Dispatcher::new(config);

    if input.is_file() {
        let output_path = resolve_output(input, input, output);
        let request = dispatcher.request(input, &output_path);
        let report = dispatcher
            .convert(&request)
            .with_context(|| format!("Failed to convert {}", input.display()))?;
        println!(
            "✓ {} → {} ({})",
            input.display(),
            output_path.display(),
            report.converter
        );
        return Ok(());
    }

    let files = collect_files(input, recursive).context("Failed to collect input files")?;

    if files.is_empty() {
        println!("No JPEG or PNG files found.");
        return Ok(());
    }

    println!("Converting {} file(s) to WebP...", files.len());

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .context("Invalid progress bar template")?
            .progress_chars("█▓░"),
    );

    let report = Mutex::new(Report::new());

    // Colliding outputs were turned into errors, so every conversion that runs
    // has a destination of its own.
    let plan = plan_outputs(&files, input, output);

    plan.par_iter().for_each(|(input_path, planned)| {
        let result = (|| -> Result<FileResult> {
            let output_path = planned.as_ref().map_err(|e| anyhow::anyhow!("{e}"))?;
            let original_size = fs::metadata(input_path)
                .with_context(|| format!("Failed to read {}", input_path.display()))?
                .len();

            let request = dispatcher.request(input_path.as_path(), output_path);
            let conversion = dispatcher.convert(&request)?;
            let converted_size = fs::metadata(output_path).map(|m| m.len()).unwrap_or(0);

            Ok(FileResult {
                path: input_path.clone(),
                converter: Some(conversion.converter),
                original_size,
                converted_size,
                error: None,
            })
        })();

        let file_name = input_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let file_result = match result {
            Ok(file_result) => {
                pb.set_message(format!(
                    "{} ({:.1}%)",
                    file_name,
                    file_result.savings_pct()
                ));
                file_result
            }
            Err(e) => {
                log::error!("Error converting {}: {:#}", input_path.display(), e);
                FileResult::failed(input_path.clone(), format!("{e:#}"))
            }
        };
        report
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .add(file_result);

        pb.inc(1);
    });

    pb.finish_with_message("Done!");
    let report = report.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner());
    report.print_summary();

    if report.error_count() > 0 && report.success_count() == 0 {
        anyhow::bail!("No file could be converted");
    }

    Ok(())
}

fn handle_converters(settings: &Settings) -> Result<()> {
    let dispatcher = Dispatcher::new(settings.to_config()?);
    let order = dispatcher.converter_order();

    let descriptors = dispatcher.registry().descriptors();

    println!("Converters, in the order they are tried:");
    for (i, name) in order.iter().enumerate() {
        let available = descriptors
            .iter()
            .find(|d| &d.name == name)
            .map(|d| d.available)
            .unwrap_or(false);
        let status = if available { "available" } else { "unavailable" };
        println!("  {}. {} ({})", i + 1, name, status);
    }

    let excluded: Vec<&str> = dispatcher
        .registry()
        .names()
        .into_iter()
        .filter(|name| !order.iter().any(|o| o == *name))
        .collect();
    if !excluded.is_empty() {
        println!("Excluded: {}", excluded.join(", "));
    }

    Ok(())
}
