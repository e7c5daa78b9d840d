//! memsim
//!
//! Interactive memory manager simulator reading commands from stdin

use anyhow::Context;
use clap::Parser;
use memsim_rs::shell::{Reply, Shell};
use memsim_rs::{AllocationPolicy, FsSource, ManagerConfig, MemoryManager, ReplacementPolicy};
use std::io::{BufRead, IsTerminal, Write};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "memsim")]
#[command(about = "Paged memory manager simulator with best/worst fit, FIFO/LRU and compaction")]
struct Args {
    /// TOML configuration file; flags below override its values
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Address space size in bytes
    #[arg(short = 't', long)]
    total_size: Option<u64>,

    /// Page size in bytes
    #[arg(short = 'p', long)]
    page_size: Option<u64>,

    /// Placement policy (best-fit, worst-fit) [default: best-fit]
    #[arg(short = 'a', long)]
    allocation: Option<AllocationPolicy>,

    /// Replacement policy (none, fifo, lru) [default: none]
    #[arg(short = 'r', long)]
    replacement: Option<ReplacementPolicy>,

    /// Occupancy ratio above which the layout is compacted
    #[arg(long)]
    threshold: Option<f64>,

    /// Directory that load-text/load-bin read from
    #[arg(short = 'd', long, default_value = ".")]
    base_dir: PathBuf,
}

impl Args {
    fn manager_config(&self) -> anyhow::Result<ManagerConfig> {
        let mut config = match &self.config {
            Some(path) => ManagerConfig::load(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => ManagerConfig::default(),
        };

        if let Some(total_size) = self.total_size {
            config.total_size = total_size;
        }
        if let Some(page_size) = self.page_size {
            config.page_size = page_size;
        }
        if let Some(allocation) = self.allocation {
            config.allocation = allocation;
        }
        if let Some(replacement) = self.replacement {
            config.replacement = replacement;
        }
        if let Some(threshold) = self.threshold {
            config.compaction_threshold = threshold;
        }

        config.validate()?;
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so command output stays clean on stdout
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = args.manager_config()?;

    info!(
        "Starting memsim: {} bytes, {} byte pages, {}, replacement {}",
        config.total_size, config.page_size, config.allocation, config.replacement
    );

    let manager = MemoryManager::new(config)?;
    let mut shell = Shell::new(manager, FsSource::new(&args.base_dir));

    let stdin = std::io::stdin();
    let interactive = stdin.is_terminal();
    let mut stdout = std::io::stdout().lock();
    let mut lines = stdin.lock().lines();

    loop {
        if interactive {
            write!(stdout, "memsim> ")?;
            stdout.flush()?;
        }

        let Some(line) = lines.next() else {
            break;
        };

        match shell.run_line(&line?) {
            Reply::Output(text) if text.is_empty() => {}
            Reply::Output(text) => writeln!(stdout, "{}", text)?,
            Reply::Exit => break,
        }
    }

    Ok(())
}
