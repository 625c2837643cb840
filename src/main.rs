use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt};

use rs_bag2image::cli::{Cli, Commands};
use rs_bag2image::{formats, realsense_io, validate, ExtractOptions};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Commands::Extract {
            bag,
            scaling,
            quality,
            display,
            rrd,
            out_dir,
            no_progress,
            sync_window_ms,
        } => {
            let options = ExtractOptions {
                bag_path: bag,
                scaling,
                quality,
                display,
                rrd_path: rrd,
                out_dir,
                show_progress: !no_progress,
                sync_window_ms,
            };
            let summary = rs_bag2image::extract_bag(&options)?;
            summary.print();
            Ok(())
        }
        Commands::Inspect { bag, json } => realsense_io::inspect_bag(&bag, json),
        Commands::Formats {} => formats::print_formats(),
        Commands::Validate { dir } => validate::validate_export_dir(&dir),
    }
}
