mod cli;

use qtfaststart::{
    config,
    driver::{self, FileOptions},
};
use qtfaststart_media::ProcessingStatus;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use std::path::Path;
use std::time::Instant;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "qtfaststart=debug,qtfaststart_media=trace".to_string()
        } else {
            "qtfaststart=warn,qtfaststart_media=warn".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run {
            input,
            output,
            to_end,
            no_cleanup,
            limit,
        } => {
            let mut config = config::load_config_or_default(cli.config.as_deref())?;

            // Flags override the config file
            if to_end {
                config.faststart.to_end = true;
            }
            if no_cleanup {
                config.faststart.cleanup = false;
            }
            if limit.is_some() {
                config.faststart.limit = limit;
            }

            let opts = FileOptions {
                options: config.faststart.options(),
                copy_permissions: config.faststart.copy_permissions,
            };
            run_file(&input, &output, &opts)
        }
        Commands::List { file, json } => list_file(&file, json),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("qtfaststart {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn run_file(input: &Path, output: &Path, opts: &FileOptions) -> Result<()> {
    if !input.exists() {
        anyhow::bail!("Input file does not exist: {:?}", input);
    }

    tracing::info!("Processing file: {:?}", input);

    let start = Instant::now();
    let status = driver::process_file(input, output, opts)?;

    match status {
        ProcessingStatus::Success => {
            println!("Wrote {}", output.display());
        }
        ProcessingStatus::AlreadyConverted => {
            println!("This file appears to already be setup!");
        }
        ProcessingStatus::InvalidFormat => {
            anyhow::bail!(
                "{}: moov or mdat atom not found, is this a valid MOV/MP4 file?",
                input.display()
            );
        }
        ProcessingStatus::FileIsCompressed => {
            anyhow::bail!(
                "{}: movies with compressed headers are not supported",
                input.display()
            );
        }
        ProcessingStatus::Error => {
            anyhow::bail!("{}: processing failed", input.display());
        }
    }

    println!(
        "Processed video in: {:.3} seconds",
        start.elapsed().as_secs_f64()
    );

    Ok(())
}

fn list_file(file: &Path, json: bool) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {:?}", file);
    }

    let atoms = driver::list_atoms(file)?;

    if json {
        let json_str = serde_json::to_string_pretty(&atoms)?;
        println!("{}", json_str);
    } else {
        for atom in &atoms {
            println!(
                "{} (position: {}, size: {})",
                atom.atom_type, atom.position, atom.size
            );
        }
    }

    Ok(())
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

    let faststart = &config.faststart;
    println!("  Cleanup: {}", faststart.cleanup);
    println!("  Moov to end: {}", faststart.to_end);
    match faststart.limit {
        Some(limit) if limit > 0 => println!("  Limit: {} bytes per atom", limit),
        _ => println!("  Limit: none"),
    }
    println!("  Chunk size: {}", faststart.chunk_size);
    println!("  Copy permissions: {}", faststart.copy_permissions);

    Ok(())
}
