//! FrameBatch CLI: plan chunked exports and drive an external exporter.
//!
//! Usage:
//!   framebatch plan --start S --end E       Print the chunk plan
//!   framebatch name <SOURCE>                Resolve an output file name
//!   framebatch single --start S --end E     Export the whole range once
//!   framebatch manual --start S --end E     Export one chunk per Enter press
//!   framebatch auto --start S --end E       Export every chunk unattended
//!   framebatch config                       Show or write the configuration

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use framebatch_common::config::AppConfig;

mod commands;

use commands::{BatchArgs, ExporterArgs, OutputArgs, PlanSource, RangeArgs};

#[derive(Parser)]
#[command(
    name = "framebatch",
    about = "Split long frame ranges into chunked exports",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file to use instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the chunks a range splits into
    Plan {
        #[command(flatten)]
        range: RangeArgs,

        #[command(flatten)]
        output: OutputArgs,

        #[command(flatten)]
        batch: BatchArgs,

        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },

    /// Resolve an output file name
    Name {
        /// Source path the name falls back to
        source: String,

        /// Explicit base name (wins over the source path)
        #[arg(short, long, default_value = "")]
        base: String,

        /// First frame of the range to encode
        #[arg(long, requires = "end")]
        start: Option<i64>,

        /// Last frame of the range to encode
        #[arg(long, requires = "start")]
        end: Option<i64>,

        /// Name a batch chunk (adds `_F_<start>`)
        #[arg(long, requires = "start")]
        chunk: bool,

        /// Append `_frame_<start>_<end>`
        #[arg(long, requires = "start")]
        append_range: bool,
    },

    /// Export the whole range to one file
    Single {
        #[command(flatten)]
        range: RangeArgs,

        #[command(flatten)]
        output: OutputArgs,

        #[command(flatten)]
        exporter: ExporterArgs,
    },

    /// Export one chunk per Enter press
    Manual {
        #[command(flatten)]
        range: RangeArgs,

        #[command(flatten)]
        output: OutputArgs,

        #[command(flatten)]
        batch: BatchArgs,

        #[command(flatten)]
        source: PlanSource,

        #[command(flatten)]
        exporter: ExporterArgs,
    },

    /// Export every chunk, waiting for each output file to settle
    Auto {
        #[command(flatten)]
        range: RangeArgs,

        #[command(flatten)]
        output: OutputArgs,

        #[command(flatten)]
        batch: BatchArgs,

        #[command(flatten)]
        source: PlanSource,

        #[command(flatten)]
        exporter: ExporterArgs,
    },

    /// Show the effective configuration
    Config {
        /// Write the effective configuration back to the config file
        #[arg(long)]
        write: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(framebatch_common::config::config_file_path);
    let config = AppConfig::load_or_default(&config_path);

    let mut logging = config.logging.clone();
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    framebatch_common::logging::init_logging(&logging);

    match cli.command {
        Commands::Plan {
            range,
            output,
            batch,
            json,
        } => commands::plan::run(&config, range, output, batch, json),
        Commands::Name {
            source,
            base,
            start,
            end,
            chunk,
            append_range,
        } => commands::name::run(&source, &base, start.zip(end), chunk, append_range),
        Commands::Single {
            range,
            output,
            exporter,
        } => commands::single::run(&config, range, output, exporter),
        Commands::Manual {
            range,
            output,
            batch,
            source,
            exporter,
        } => commands::manual::run(&config, range, output, batch, source, exporter),
        Commands::Auto {
            range,
            output,
            batch,
            source,
            exporter,
        } => commands::auto::run(&config, range, output, batch, source, exporter).await,
        Commands::Config { write } => commands::config::run(&config, &config_path, write),
    }
}
