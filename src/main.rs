use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use facematch::{config, pipeline, Dataset};
use log::info;

#[derive(Parser)]
#[command(name = "facematch")]
#[command(
    version,
    about = "Match extracted face features into genuine and impostor score lists"
)]
struct Cli {
    /// Config file (defaults to facematch.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Match a probe feature list against a gallery list, or against itself
    Match {
        /// Probe feature list
        #[arg(short, long)]
        probe: PathBuf,
        /// Gallery feature list (probe is matched to itself when omitted)
        #[arg(short, long)]
        gallery: Option<PathBuf>,
        /// Output folder
        #[arg(short, long)]
        output: PathBuf,
        /// Dataset naming convention, e.g. default, agedb, vggface2, prefix:8
        #[arg(short, long)]
        dataset: Option<String>,
        /// Group name used as output file prefix, e.g. AA
        #[arg(long, visible_alias = "gr")]
        group: String,
        /// Feature loader threads
        #[arg(short, long)]
        workers: Option<usize>,
        /// Score list encoding
        #[arg(long, value_enum)]
        format: Option<config::OutputFormat>,
        /// Decimal digits kept in scores, at most 15
        #[arg(long)]
        precision: Option<u32>,
        /// Refuse matrices with more cells than this
        #[arg(long)]
        max_cells: Option<u64>,
        /// Keep file lists in their given order
        #[arg(long)]
        no_sort: bool,
    },
    /// Print the subject id and feature label of each path
    Resolve {
        #[arg(short, long)]
        dataset: Option<String>,
        paths: Vec<PathBuf>,
    },
}

fn main() -> Result<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .format_target(false)
        .format_timestamp(None)
        .parse_default_env()
        .init();

    let cli = Cli::parse();
    let mut cfg = config::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Match {
            probe,
            gallery,
            output,
            dataset,
            group,
            workers,
            format,
            precision,
            max_cells,
            no_sort,
        } => {
            if let Some(name) = dataset {
                cfg.dataset = parse_dataset(&name)?;
            }
            if workers.is_some() {
                cfg.workers = workers;
            }
            if let Some(format) = format {
                cfg.format = format;
            }
            if let Some(precision) = precision {
                cfg.precision = precision;
            }
            if let Some(max_cells) = max_cells {
                cfg.max_cells = max_cells;
            }
            if no_sort {
                cfg.sort_inputs = false;
            }

            let opts = pipeline::RunOptions {
                probe_list: probe,
                gallery_list: gallery,
                output,
                group,
                config: cfg,
            };
            let summary = pipeline::run(&opts)?;
            info!(
                "✓ {} genuine / {} impostor pairs written to {}",
                summary.genuine,
                summary.impostor,
                opts.output.display()
            );
            Ok(())
        }
        Commands::Resolve { dataset, paths } => {
            if let Some(name) = dataset {
                cfg.dataset = parse_dataset(&name)?;
            }
            for path in paths {
                let id = cfg.dataset.resolve(&path);
                println!("{} {}", id.subject_id, id.feature_label);
            }
            Ok(())
        }
    }
}

fn parse_dataset(name: &str) -> Result<Dataset> {
    name.parse::<Dataset>().with_context(|| format!("invalid --dataset {name}"))
}
