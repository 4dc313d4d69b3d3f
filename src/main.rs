mod cli;

use webpify::{
    config,
    conversion::{ConversionPipeline, Converter, NativeCodec},
    output::MemoryBlobStore,
    quality::QualitySetting,
    state::{format_size, FileRegistry, JobStatus, RegistryStats, SourceFile},
};
use webpify_common::paths;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "webpify=trace,webpify_common=debug".to_string()
        } else {
            "webpify=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Convert {
            files,
            quality,
            output,
            overwrite,
        } => convert_files(&files, quality, output, overwrite, cli.config.as_deref()),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("webpify {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn convert_files(
    files: &[PathBuf],
    quality: Option<u8>,
    output: Option<PathBuf>,
    overwrite: bool,
    config_path: Option<&Path>,
) -> Result<()> {
    let mut config = config::load_config_or_default(config_path)?;

    // CLI flags win over the config file
    if let Some(quality) = quality {
        config.conversion.quality = quality;
    }
    if let Some(dir) = output {
        config.output.dir = dir;
    }
    config.output.overwrite |= overwrite;
    config::validate_config(&config)?;

    let mut sources = Vec::with_capacity(files.len());
    let mut unreadable = 0;
    for path in files {
        match SourceFile::from_path(path) {
            Ok(source) => sources.push(source),
            Err(e) => {
                tracing::warn!("Failed to read {:?}: {}", path, e);
                println!("✗ {}: {}", path.display(), e);
                unreadable += 1;
            }
        }
    }

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let failed = rt.block_on(convert_batch(sources, &config))? + unreadable;

    if failed > 0 {
        anyhow::bail!("{} of {} files could not be converted", failed, files.len());
    }
    Ok(())
}

/// Convert one batch and write every result. Returns the number of failures.
async fn convert_batch(sources: Vec<SourceFile>, config: &config::Config) -> Result<usize> {
    let converter = Converter::new(Arc::new(NativeCodec), Arc::new(MemoryBlobStore::new()))
        .with_max_input_bytes(config.conversion.max_input_bytes);
    let quality = Arc::new(QualitySetting::new(config.conversion.quality()));
    let pipeline = ConversionPipeline::new(FileRegistry::new(), quality.clone(), converter);

    let current = quality.get();
    println!("Quality: {} ({})", current, current.tier());

    let batch = pipeline.accept(sources);
    for name in &batch.rejected {
        println!("- {}: skipped, not an image", name);
    }
    if batch.is_empty() {
        anyhow::bail!("No image files to convert");
    }
    batch.wait().await;

    std::fs::create_dir_all(&config.output.dir)
        .with_context(|| format!("Failed to create output dir: {:?}", config.output.dir))?;

    let registry = pipeline.registry();
    let mut taken = HashSet::new();
    let mut failed = 0;
    // Tallies what reached disk, not what converted.
    let mut written = RegistryStats::default();
    for job in registry.snapshot() {
        match job.status {
            JobStatus::Converted => {
                let download = registry
                    .download(job.id)
                    .context("Converted job has no output")?;
                let file_name = claim_file_name(&download.file_name, &mut taken);
                let target = config.output.dir.join(&file_name);

                if target.exists() && !config.output.overwrite {
                    println!(
                        "✗ {}: {} already exists (use --overwrite)",
                        job.file_name,
                        target.display()
                    );
                    failed += 1;
                    continue;
                }

                if let Err(e) = std::fs::write(&target, &download.bytes) {
                    tracing::warn!("Failed to write {:?}: {}", target, e);
                    println!("✗ {}: failed to write {}: {}", job.file_name, target.display(), e);
                    failed += 1;
                    continue;
                }

                let output_size = job.output_size.unwrap_or(0);
                written.converted += 1;
                written.input_bytes += job.original_size;
                written.output_bytes += output_size;
                println!(
                    "✓ {} -> {} ({} -> {})",
                    job.file_name,
                    target.display(),
                    format_size(job.original_size),
                    format_size(output_size)
                );
            }
            JobStatus::Failed => {
                failed += 1;
                println!(
                    "✗ {}: {}",
                    job.file_name,
                    job.failure.as_deref().unwrap_or("unknown error")
                );
            }
            JobStatus::Converting => {
                failed += 1;
                println!("✗ {}: did not finish", job.file_name);
            }
        }
    }

    written.failed = failed;
    if written.converted > 0 {
        println!(
            "\nWrote {} of {} ({} -> {}, {:.1}% smaller)",
            written.converted,
            written.total(),
            format_size(written.input_bytes),
            format_size(written.output_bytes),
            written.savings_ratio() * 100.0
        );
    }

    let released = registry.clear();
    tracing::debug!(released, "Released conversion outputs");

    Ok(failed)
}

/// Reserve an output name for this batch, numbering repeats of a base name.
fn claim_file_name(file_name: &str, taken: &mut HashSet<String>) -> String {
    let mut candidate = file_name.to_string();
    let mut n = 0;
    while !taken.insert(candidate.clone()) {
        n += 1;
        candidate = paths::numbered_file_name(file_name, n);
    }
    candidate
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            config
        }
        None => {
            println!("No config file specified, using defaults");
            config::Config::default()
        }
    };

    let quality = config.conversion.quality();
    println!("  Quality: {} ({})", quality, quality.tier());
    println!(
        "  Max input size: {}",
        format_size(config.conversion.max_input_bytes)
    );
    println!("  Output dir: {}", config.output.dir.display());
    println!("  Overwrite: {}", config.output.overwrite);

    Ok(())
}
