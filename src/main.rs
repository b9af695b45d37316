use anyhow::Result;
use clap::Parser;
use hier_subclusters::cluster::LabelPropagationHierarchy;
use hier_subclusters::config::{Config, DEFAULT_SEED};
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser, Debug)]
#[clap(
    name = "hier-subclusters",
    about = "Run hierarchical clustering separately on each top-level cluster of a network"
)]
struct Cli {
    /// Pajek (.net) file for the full network
    pjk_file: PathBuf,

    /// Tree file with the top-level clustering
    tree_fname: PathBuf,

    /// Output directory for the tab-separated gzip shards (must not exist)
    #[clap(short, long)]
    out: PathBuf,

    /// Ignore clusters smaller than this size
    #[clap(long, default_value = "10")]
    min_size: usize,

    /// Ignore clusters larger than this size
    #[clap(long)]
    max_size: Option<usize>,

    /// Number of output shard files
    #[clap(long, default_value = "1")]
    shards: usize,

    /// Seed for the clustering routine
    #[clap(long, default_value_t = DEFAULT_SEED)]
    seed: u64,

    /// Number of worker threads (0 = use all available cores)
    #[clap(long, default_value = "0")]
    threads: usize,

    /// Output debugging info
    #[clap(long)]
    debug: bool,
}

fn main() -> Result<()> {
    let total_start = Instant::now();
    let args = Cli::parse();

    let log_level = if args.debug {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp_millis()
        .init();

    log::info!("{}", std::env::args().collect::<Vec<_>>().join(" "));
    log::debug!("debug mode is on");

    let num_threads = if args.threads > 0 {
        args.threads
    } else {
        num_cpus::get()
    };

    log::info!("Using {} worker threads", num_threads);
    rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build_global()?;

    let config = Config::new(&args.pjk_file, &args.tree_fname, &args.out)
        .with_min_size(args.min_size)
        .with_max_size(args.max_size)
        .with_shards(args.shards)
        .with_seed(args.seed);

    let clusterer = LabelPropagationHierarchy::new(config.seed);
    let summary = hier_subclusters::run(&config, &clusterer)?;

    log::info!(
        "Wrote {} rows for {} clusters ({} failed) to {}",
        summary.clustering.rows,
        summary.clustering.groups,
        summary.clustering.failed_groups,
        config.output_dir.display()
    );
    log::info!("all finished. total time: {:.2?}", total_start.elapsed());

    Ok(())
}
