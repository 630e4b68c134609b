use framecmp::cli::Args;
use framecmp::config::{self, Settings};
use framecmp::core::presets::FRAME_SIZE_PRESETS;
use framecmp::decoder::ImageSequence;
use framecmp::runner::{self, CompareOptions};

use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info};

fn init_logger(args: &Args, paths: &config::PathConfig) -> Result<()> {
    // 0 (default) = warn, 1 (-v) = info, 2 (-vv) = debug, 3+ (-vvv) = trace
    let log_level = match args.verbosity {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    if let Some(log_path_opt) = &args.log_file {
        let log_path = log_path_opt
            .clone()
            .unwrap_or_else(|| paths.config_file(config::LOG_FILE));
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let file = std::fs::File::create(&log_path)
            .with_context(|| format!("Failed to create log file: {}", log_path.display()))?;

        env_logger::Builder::new()
            .filter_level(log_level)
            .format_timestamp_millis()
            .target(env_logger::Target::Pipe(Box::new(file)))
            .init();

        info!("Logging to file: {} (level: {:?})", log_path.display(), log_level);
    } else {
        // Respects RUST_LOG if set
        env_logger::Builder::from_env(
            env_logger::Env::default().default_filter_or(log_level.as_str().to_lowercase()),
        )
        .format_timestamp_millis()
        .init();
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    let paths = config::PathConfig::from_env_and_cli(args.config_dir.clone());
    init_logger(&args, &paths)?;
    debug!("Command-line args: {:?}", args);

    if args.list_sizes {
        for name in FRAME_SIZE_PRESETS.names_formatted().iter().skip(1) {
            println!("{}", name);
        }
        return Ok(());
    }

    let settings = Settings::load(&paths.settings_file())?;
    let options = CompareOptions::from_args(&args, &settings);

    let (Some(pattern_a), Some(pattern_b)) = (&args.sequence_a, &args.sequence_b) else {
        anyhow::bail!("Two sequences are required");
    };
    let seq_a = ImageSequence::from_glob(pattern_a)?;
    let seq_b = ImageSequence::from_glob(pattern_b)?;

    let reports = runner::compare_sequences(seq_a, seq_b, &options, &settings)?;
    for report in &reports {
        println!("Frame {}", report.index);
        match &report.error {
            Some(err) => println!("  error: {}", err),
            None => {
                for (name, value) in &report.info {
                    println!("  {}: {}", name, value);
                }
            }
        }
    }

    let failed = reports.iter().filter(|r| r.error.is_some()).count();
    info!("Compared {} frames, {} failed", reports.len(), failed);
    Ok(())
}
