use anyhow::Context;
use clap::{CommandFactory, Parser};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;

use sharpgraph_core::{open_store, Config, InputResolver, Pipeline, RunSummary};

/// Exit status for invalid batch input.
const EXIT_BAD_INPUT: i32 = 2;

#[derive(Parser)]
#[command(name = "sharpgraph")]
#[command(about = "Build a property graph of C# sources and report unresolved external dependencies", long_about = None)]
struct Cli {
    /// Directory receiving the graph database and reports
    #[arg(short = 's', long = "save-path", required = true)]
    save_path: PathBuf,

    /// Solutions, projects, source files or directories to analyze
    #[arg(short = 'f', long = "files", required = true, num_args = 1..)]
    files: Vec<PathBuf>,

    /// Config file (default: ./sharpgraph.toml, then the user config)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Graph database directory
    #[arg(long)]
    db: Option<PathBuf>,

    /// Keep the graph in memory only
    #[arg(long)]
    memory: bool,

    /// Keep existing graph contents
    #[arg(long)]
    no_purge: bool,

    /// Print the run summary as JSON
    #[arg(long)]
    json: bool,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .target(env_logger::Target::Stderr)
        .init();
}

fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("  {spinner:.cyan} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

fn print_summary(summary: &RunSummary) {
    let elapsed = summary.finished_at - summary.started_at;
    println!(
        "Analyzed {} files ({} skipped) in {:.1}s",
        summary.files_parsed,
        summary.files_failed,
        elapsed.num_milliseconds() as f64 / 1000.0
    );
    println!(
        "  Elements: {} ({} partial fragments merged)",
        summary.elements, summary.fragments_merged
    );
    println!(
        "  Graph:    {} nodes, {} edges",
        summary.store.nodes, summary.store.edges
    );
    println!(
        "  Edges:    {} written, {} dangling, {} failed",
        summary.persist.edges_written, summary.persist.edges_dangling, summary.persist.edge_failures
    );
    println!(
        "  Unresolved external names: {} (see {})",
        summary.unresolved,
        summary.report_path.display()
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::load().context("Failed to load config")?,
    };
    if let Some(db) = &cli.db {
        config.store.path = Some(db.to_string_lossy().into_owned());
    }
    if cli.no_purge {
        config.store.purge_on_start = false;
    }
    log::debug!("Effective config: {:?}", config);

    let files = match InputResolver::new(&config.input).resolve(&cli.files) {
        Ok(files) => files,
        Err(e) => {
            eprintln!("error: {}\n", e);
            eprintln!("{}", Cli::command().render_usage());
            std::process::exit(EXIT_BAD_INPUT);
        }
    };

    let store = open_store(&config, &cli.save_path, cli.memory)
        .await
        .context("Failed to open graph store")?;

    let spinner = create_spinner("Starting");
    let progress = spinner.clone();
    let pipeline =
        Pipeline::new(config, store).with_progress(move |phase| progress.set_message(phase.to_string()));

    let result = pipeline.run_files(&cli.save_path, &files).await;
    spinner.finish_and_clear();

    let summary = result.context("Analysis failed")?;
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }
    Ok(())
}
