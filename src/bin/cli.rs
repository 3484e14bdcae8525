use anyhow::anyhow;
use clap::{Args, Parser, Subcommand};
use cpsc::cookbook;
use cpsc::prelude::*;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cpscli")]
#[command(about = "CPSC Enrollment CLI - Process and track CMS Medicare Advantage enrollment data", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process an enrollment CSV into the JSON artifacts
    Process(ProcessArgs),
    /// Show summary statistics for an enrollment CSV
    Stats(StatsArgs),
    /// Download the monthly CPSC data from CMS (if enabled)
    #[cfg(feature = "download")]
    Fetch(FetchArgs),
}

#[derive(Args)]
struct ProcessArgs {
    /// Input CSV file (default: most recent in the data directory)
    csv_file: Option<PathBuf>,
    /// Directory holding the raw monthly CSVs
    #[arg(short, long)]
    data_dir: Option<PathBuf>,
    /// Output directory for the JSON artifacts
    #[arg(short, long)]
    output_dir: Option<PathBuf>,
    /// Contract info CSV (default: auto-discovered next to the input)
    #[arg(long)]
    contract_info: Option<PathBuf>,
    /// Freeze this run as the comparison baseline
    #[arg(long)]
    save_baseline: bool,
    /// Skip malformed CSV rows instead of failing
    #[arg(long)]
    skip_invalid: bool,
}

#[derive(Args)]
struct StatsArgs {
    /// Input CSV file (default: most recent in the data directory)
    csv_file: Option<PathBuf>,
    /// Directory holding the raw monthly CSVs
    #[arg(short, long)]
    data_dir: Option<PathBuf>,
    /// Number of counties to list
    #[arg(long, default_value_t = 10)]
    top: usize,
}

#[cfg(feature = "download")]
#[derive(Args)]
struct FetchArgs {
    /// Data year (default: auto-detect)
    #[arg(long)]
    year: Option<i32>,
    /// Data month 1-12 (default: auto-detect)
    #[arg(long)]
    month: Option<u32>,
    /// Output directory for the extracted CSVs
    #[arg(short, long)]
    out_dir: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Process(args) => cmd_process(args),
        Commands::Stats(args) => cmd_stats(args),
        #[cfg(feature = "download")]
        Commands::Fetch(args) => cmd_fetch(args),
    }
}

fn friendly(e: CpscError) -> anyhow::Error {
    anyhow!("{}", e.user_message())
}

fn load_dataset(
    csv_file: Option<PathBuf>,
    data_dir: Option<PathBuf>,
    contract_info: Option<PathBuf>,
    skip_invalid: bool,
    config: &CpscConfig,
) -> anyhow::Result<EnrollmentDataset> {
    match csv_file {
        Some(path) => {
            let mut builder = EnrollmentDatasetBuilder::new()
                .enrollment_data(path)
                .skip_invalid_records(skip_invalid || config.skip_invalid_records);
            if let Some(ci) = contract_info {
                builder = builder.contract_info(ci);
            }
            #[cfg(feature = "progress")]
            let builder = builder.show_progress(config.enable_progress_bar);
            builder.build().map_err(friendly)
        }
        None => {
            let data_dir = data_dir
                .or_else(|| config.data_dir.clone())
                .unwrap_or_else(|| PathBuf::from("data/raw"));
            EnrollmentDataset::load_latest(&data_dir).map_err(friendly)
        }
    }
}

fn cmd_process(args: ProcessArgs) -> anyhow::Result<()> {
    let config = CpscConfig::load();
    let output_dir = args
        .output_dir
        .or_else(|| config.output_dir.clone())
        .unwrap_or_else(|| PathBuf::from("data/processed"));

    let dataset = load_dataset(
        args.csv_file,
        args.data_dir,
        args.contract_info,
        args.skip_invalid,
        &config,
    )?;
    let snapshot = dataset.snapshot();

    let store = SnapshotStore::new(&output_dir);
    let current_path = store.save_current(&snapshot).map_err(friendly)?;
    println!("Saved: {}", current_path.display());

    if args.save_baseline {
        let baseline_path = store.save_baseline(&snapshot).map_err(friendly)?;
        println!("Saved as baseline: {}", baseline_path.display());
    }

    if let Some(baseline) = store.load_baseline().map_err(friendly)? {
        let changes = cpsc::delta::diff(&snapshot, &baseline);
        let changes_path = store.save_changes(&changes).map_err(friendly)?;
        println!("Saved: {}", changes_path.display());
    }

    let contracts_path = store.save_contracts(&snapshot).map_err(friendly)?;
    println!("Saved: {}", contracts_path.display());

    println!("\nProcessing complete!");
    println!("  Total records: {}", snapshot.metadata.record_count);
    println!("  Total enrollment: {}", snapshot.metadata.total_enrollment);
    println!("  Counties: {}", snapshot.counties.len());
    println!("  Organizations: {}", snapshot.by_org.len());

    Ok(())
}

fn cmd_stats(args: StatsArgs) -> anyhow::Result<()> {
    let config = CpscConfig::load();
    let dataset = load_dataset(args.csv_file, args.data_dir, None, true, &config)?;
    let snapshot = dataset.snapshot();

    println!("Records: {}", snapshot.metadata.record_count);
    println!("Total enrollment: {}", snapshot.metadata.total_enrollment);
    println!("States: {}", snapshot.by_state.len());
    println!("Counties: {}", snapshot.counties.len());
    println!("Contracts: {}", snapshot.contracts.len());

    println!("\nEnrollment by plan type:");
    for (plan_type, count) in &snapshot.by_plan_type {
        println!("  {:<8} {}", plan_type, count);
    }

    println!("\nTop organizations by market share:");
    for (org, share) in cookbook::org_market_share(&snapshot).into_iter().take(args.top) {
        println!("  {:<40} {:.1}%", org, share * 100.0);
    }

    println!("\nTop counties by enrollment:");
    for (key, total) in cookbook::top_counties_by_enrollment(&snapshot, args.top) {
        println!("  {:<30} {}", key, total);
    }

    Ok(())
}

#[cfg(feature = "download")]
fn cmd_fetch(args: FetchArgs) -> anyhow::Result<()> {
    use cpsc::download::{current_data_month, CpscDownloader, DownloadConfig};
    use tokio::runtime::Runtime;

    let (year, month) = match (args.year, args.month) {
        (Some(year), Some(month)) => (year, month),
        _ => {
            let (year, month) = current_data_month();
            println!("Auto-detected data month: {}-{:02}", year, month);
            (year, month)
        }
    };

    let download_config = DownloadConfig {
        download_dir: args.out_dir.or_else(|| Some(PathBuf::from("data/raw"))),
        keep_files: false,
        ..Default::default()
    };
    let mut downloader = CpscDownloader::with_config(download_config);

    let rt = Runtime::new()?;
    let files = rt
        .block_on(downloader.download_month(year, month))
        .map_err(friendly)?;

    println!("Download and extraction complete: {}", files.summary());
    if let Some(path) = &files.enrollment_file {
        println!("Enrollment CSV: {}", path.display());
    }
    if let Some(path) = &files.contract_info_file {
        println!("Contract info CSV: {}", path.display());
    }

    Ok(())
}
