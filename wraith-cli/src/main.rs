//! WRAITH CLI
//!
//! Command-line interface for the WRAITH stealth address protocol.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use rand::rngs::OsRng;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use wraith_core::traits::AnnouncementLog;
use wraith_core::types::{AnnouncementStats, MetaAddress};
use wraith_crypto::ViewTagHistogram;
use wraith_registry::{FileLog, MemoryLog};
use wraith_scanner::{dedup_by_address, LogScanner, ProgressCallback, ScanSummary, ScannerConfig};
use wraith_stealth::discovery::{PaymentScanner, ScanCheckpoint};
use wraith_stealth::{
    create_stealth_payment, StealthWallet, ViewingKeyExport, WalletConfig, WalletKeyFile,
};

/// WRAITH - Dual-Key Stealth Address Protocol
#[derive(Parser)]
#[command(name = "wraith")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate new stealth keys
    Keygen {
        /// Output file for keys (JSON)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Wallet label
        #[arg(short, long)]
        label: Option<String>,
        /// Derive keys from a hex seed instead of the OS RNG
        #[arg(long)]
        seed: Option<String>,
    },

    /// Export the viewing key for delegated scanning
    ExportViewingKey {
        /// Path to keys file
        #[arg(short, long, env = "WRAITH_KEYS")]
        keys: PathBuf,
    },

    /// Create a stealth payment and publish its announcement
    Send {
        /// Recipient's meta-address (st:eth:0x...)
        recipient: String,
        /// Announcement log file
        #[arg(long, env = "WRAITH_LOG")]
        log: PathBuf,
        /// Opaque payload (hex)
        #[arg(long, default_value = "")]
        payload: String,
    },

    /// Scan announcements for payments
    Scan {
        /// Path to keys file
        #[arg(short, long, env = "WRAITH_KEYS", conflicts_with = "viewing_key")]
        keys: Option<PathBuf>,
        /// Path to an exported viewing key (detect only)
        #[arg(long)]
        viewing_key: Option<PathBuf>,
        /// Announcement log file
        #[arg(long, env = "WRAITH_LOG")]
        log: PathBuf,
        /// Checkpoint file, read before and written after the scan
        #[arg(long)]
        checkpoint: Option<PathBuf>,
        /// Start at this sequence index (overrides the checkpoint file)
        #[arg(long)]
        from: Option<u64>,
        /// Parallel workers
        #[arg(short, long, default_value = "1")]
        workers: usize,
        /// Stop after this many records
        #[arg(long)]
        max_records: Option<u64>,
        /// Stop at the first payment
        #[arg(long)]
        stop_on_first: bool,
        /// Give up after this many seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
        /// Print stealth private keys of owned payments
        #[arg(long)]
        show_keys: bool,
    },

    /// Summarize an announcement log
    Inspect {
        /// Announcement log file
        #[arg(long, env = "WRAITH_LOG")]
        log: PathBuf,
    },

    /// Run benchmarks
    Bench {
        /// Number of announcements to generate
        #[arg(short, long, default_value = "10000")]
        count: usize,
        /// Parallel workers
        #[arg(short, long, default_value = "1")]
        workers: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "wraith=debug,info"
    } else {
        "wraith=info,warn"
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Keygen { output, label, seed } => cmd_keygen(output, label, seed),
        Commands::ExportViewingKey { keys } => cmd_export_viewing_key(&keys),
        Commands::Send {
            recipient,
            log,
            payload,
        } => cmd_send(&recipient, &log, &payload).await,
        Commands::Scan {
            keys,
            viewing_key,
            log,
            checkpoint,
            from,
            workers,
            max_records,
            stop_on_first,
            timeout_secs,
            show_keys,
        } => {
            let mut config = ScannerConfig::new().workers(workers);
            if let Some(max) = max_records {
                config = config.max_records(max);
            }
            if stop_on_first {
                config = config.stop_on_first();
            }
            if let Some(secs) = timeout_secs {
                config = config.timeout(Duration::from_secs(secs));
            }
            let opts = ScanArgs {
                keys,
                viewing_key,
                log,
                checkpoint,
                from,
                show_keys,
            };
            cmd_scan(opts, config).await
        }
        Commands::Inspect { log } => cmd_inspect(&log).await,
        Commands::Bench { count, workers } => cmd_bench(count, workers).await,
    }
}

fn load_wallet(path: &Path) -> Result<StealthWallet> {
    let file: WalletKeyFile = serde_json::from_reader(
        std::fs::File::open(path).context("Failed to open keys file")?,
    )
    .context("Keys file is not valid JSON")?;
    StealthWallet::from_key_file(&file).context("Keys file holds invalid keys")
}

/// Generate new keys
fn cmd_keygen(output: Option<PathBuf>, label: Option<String>, seed: Option<String>) -> Result<()> {
    println!("{}", "🔑 Generating WRAITH keys...".cyan().bold());

    let mut config = WalletConfig::default();
    if let Some(label) = label {
        config = config.with_label(label);
    }

    let wallet = match seed {
        Some(seed) => {
            let seed = hex::decode(seed.trim_start_matches("0x")).context("Seed is not hex")?;
            StealthWallet::from_seed(&seed, config)?
        }
        None => StealthWallet::generate_with_rng(&mut OsRng, config)?,
    };

    let key_file = serde_json::to_string_pretty(&wallet.to_key_file())?;

    println!("\n{} {}", "Meta-address:".yellow().bold(), wallet.meta_address());

    if let Some(path) = output {
        std::fs::write(&path, key_file)?;
        println!("{} {}", "✅ Keys saved to:".green(), path.display());
    } else {
        println!("\n{}", "Keys (JSON):".yellow().bold());
        println!("{key_file}");
    }

    println!("\n{}", "⚠️  IMPORTANT: Keep your secret keys safe!".red().bold());
    println!("   The spending key controls funds; the viewing key reveals them.");

    Ok(())
}

/// Export the viewing key
fn cmd_export_viewing_key(keys: &Path) -> Result<()> {
    let wallet = load_wallet(keys)?;
    let export = wallet.export_viewing_key();
    println!("{}", serde_json::to_string_pretty(&export)?);
    eprintln!(
        "{}",
        "⚠️  Anyone holding this key can see your incoming payments.".yellow()
    );
    Ok(())
}

/// Create stealth payment
async fn cmd_send(recipient: &str, log_path: &Path, payload: &str) -> Result<()> {
    println!("{} {}", "💸 Creating stealth payment to:".cyan().bold(), recipient);

    let meta: MetaAddress = recipient.parse().context("Invalid meta-address")?;
    let payload = hex::decode(payload.trim_start_matches("0x")).context("Payload is not hex")?;

    let payment = create_stealth_payment(&meta, payload, &mut OsRng)
        .context("Failed to create stealth payment")?;

    let log = FileLog::open(log_path)
        .await
        .context("Failed to open announcement log")?;
    let index = log
        .append(payment.announcement.clone())
        .await
        .context("Failed to publish announcement")?;

    println!("\n{}", "✅ Stealth payment created:".green().bold());
    println!("   {} {}", "Address:".yellow(), payment.stealth_address.to_checksum_string());
    println!("   {} {}", "View tag:".dimmed(), payment.announcement.view_tag());
    println!(
        "   {} {}",
        "Ephemeral key:".dimmed(),
        payment.announcement.ephemeral_public_key()
    );
    println!("   {} #{} in {}", "Announcement:".dimmed(), index, log_path.display());

    println!("\n{}", "ℹ️  Next step:".cyan());
    println!("   Send funds to the stealth address above");

    Ok(())
}

struct ScanArgs {
    keys: Option<PathBuf>,
    viewing_key: Option<PathBuf>,
    log: PathBuf,
    checkpoint: Option<PathBuf>,
    from: Option<u64>,
    show_keys: bool,
}

fn load_checkpoint(args: &ScanArgs) -> Result<ScanCheckpoint> {
    if let Some(from) = args.from {
        return Ok(ScanCheckpoint::at(from));
    }
    match &args.checkpoint {
        Some(path) if path.exists() => {
            let data = std::fs::read_to_string(path).context("Failed to read checkpoint")?;
            serde_json::from_str(&data).context("Checkpoint file is corrupt")
        }
        _ => Ok(ScanCheckpoint::start()),
    }
}

/// Scan for payments
async fn cmd_scan(args: ScanArgs, config: ScannerConfig) -> Result<()> {
    println!("{}", "🔎 Scanning for payments...".cyan().bold());

    let scanner = match (&args.keys, &args.viewing_key) {
        (Some(keys), _) => LogScanner::from_wallet(&load_wallet(keys)?)?,
        (None, Some(path)) => {
            let export: ViewingKeyExport = serde_json::from_reader(
                std::fs::File::open(path).context("Failed to open viewing key")?,
            )?;
            let key = export.to_viewing_key().context("Invalid viewing key")?;
            println!("   {}", "View-only: payments are detected, not spendable".dimmed());
            LogScanner::new(PaymentScanner::view_only(&key)?)
        }
        (None, None) => bail!("either --keys or --viewing-key is required"),
    };

    let log = FileLog::open(&args.log)
        .await
        .context("Failed to open announcement log")?;
    let checkpoint = load_checkpoint(&args)?;
    let total = log.len().await?.saturating_sub(checkpoint.next_index());
    debug!(from_index = checkpoint.next_index(), total, "Loaded log");

    if total == 0 {
        println!("\n{}", "⚠️  No new announcements to scan.".yellow());
        return Ok(());
    }

    let report = if config.workers > 1 {
        scanner.scan_parallel(&log, checkpoint, config).await?
    } else {
        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
                .progress_chars("#>-"),
        );
        let bar = pb.clone();
        let callback: ProgressCallback = Box::new(move |progress| bar.set_position(progress.scanned));
        let report = scanner
            .scan_with_progress(&log, checkpoint, config, callback)
            .await?;
        pb.finish_and_clear();
        report
    };

    for anomaly in &report.anomalies {
        println!(
            "   {} record {:?}: {}",
            "skipped".yellow(),
            anomaly.sequence_index,
            anomaly.reason
        );
    }

    let mut summary = ScanSummary::from(&report);
    let owned = dedup_by_address(report.owned);
    let detected = dedup_by_address(report.detected);

    if owned.is_empty() && detected.is_empty() {
        println!("\n{}", "No payments found.".yellow());
    } else {
        println!(
            "\n{} {} payment(s) found:",
            "✅".green(),
            owned.len() + detected.len()
        );
        for payment in &owned {
            println!(
                "   {} {}",
                "Address:".green(),
                payment.stealth_address().to_checksum_string()
            );
            println!("      Announcement #{}", payment.sequence_index());
            if args.show_keys {
                println!(
                    "      Private key: 0x{}",
                    hex::encode(payment.stealth_private_key().as_bytes())
                );
            }
        }
        for payment in &detected {
            println!(
                "   {} {}",
                "Address:".green(),
                payment.stealth_address.to_checksum_string()
            );
            println!("      Announcement #{}", payment.sequence_index());
        }
    }

    summary.discoveries = (owned.len() + detected.len()) as u64;
    print_summary(&summary);

    if let Some(path) = &args.checkpoint {
        std::fs::write(path, serde_json::to_string(&report.checkpoint)?)
            .context("Failed to write checkpoint")?;
        println!("   {} {}", "Checkpoint saved:".dimmed(), path.display());
    }

    Ok(())
}

fn print_summary(summary: &ScanSummary) {
    println!("\n{}", "📈 Summary:".green().bold());
    println!("   Scanned: {}", summary.total_scanned);
    println!("   View tag matches: {}", summary.view_tag_matches);
    println!("   Filter efficiency: {:.2}%", summary.filter_efficiency);
    println!("   Rate: {:.0} announcements/sec", summary.rate);
    println!("   Next index: {}", summary.next_index);
    if summary.completion.is_partial() {
        println!("   {} {:?}", "Stopped early:".yellow(), summary.completion);
    }
}

/// Summarize a log
async fn cmd_inspect(log_path: &Path) -> Result<()> {
    let log = FileLog::open(log_path)
        .await
        .context("Failed to open announcement log")?;

    let mut stats = AnnouncementStats::new();
    let mut malformed = 0u64;
    let mut records = log.read(0).await?;
    while let Some(record) = records.next().await {
        match record {
            Ok(record) => stats.add(&record),
            Err(e) if e.is_per_record() => malformed += 1,
            Err(e) => return Err(e.into()),
        }
    }

    println!("{} {}", "📒 Log:".cyan().bold(), log_path.display());
    println!("   Records: {}", stats.total_count);
    println!("   Malformed: {malformed}");
    println!("   Distinct view tags: {}/256", stats.distinct_view_tags());

    let histogram = ViewTagHistogram::from_counts(&stats.view_tag_distribution);
    if let Some((tag, count)) = histogram.busiest() {
        println!("   Busiest view tag: 0x{tag:02x} ({count} records)");
    }
    println!(
        "   Expected collisions per scan: {:.1}",
        histogram.expected_collisions()
    );
    match histogram.is_uniform() {
        Some(true) => println!("   View tags: {} (χ² = {:.1})", "uniform".green(), histogram.chi_squared()),
        Some(false) => println!(
            "   View tags: {} (χ² = {:.1}), check the senders",
            "skewed".red().bold(),
            histogram.chi_squared()
        ),
        None => println!("   View tags: {}", "too few records to judge uniformity".dimmed()),
    }

    Ok(())
}

/// Run benchmarks
async fn cmd_bench(count: usize, workers: usize) -> Result<()> {
    println!("{} {} announcements", "📊 Benchmarking with".cyan().bold(), count);

    // Generate keys
    println!("\n{}", "1. Generating keys...".dimmed());
    let start = std::time::Instant::now();
    let recipient = StealthWallet::generate()?;
    let stranger = StealthWallet::generate()?;
    println!("   ✓ Key generation: {:?}", start.elapsed());

    // Create announcements
    println!("\n{}", "2. Creating announcements...".dimmed());
    let log = MemoryLog::with_capacity(count);

    let pb = ProgressBar::new(count as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("   [{bar:40.cyan/blue}] {pos}/{len}")?
            .progress_chars("#>-"),
    );

    let start = std::time::Instant::now();
    for i in 0..count {
        // One in a hundred pays the recipient
        let meta = if i % 100 == 0 {
            recipient.meta_address()
        } else {
            stranger.meta_address()
        };
        let payment = create_stealth_payment(meta, Vec::new(), &mut OsRng)?;
        log.append(payment.announcement).await?;
        pb.inc(1);
    }
    pb.finish();
    println!("   ✓ Created {} announcements: {:?}", count, start.elapsed());

    // Scan
    println!("\n{}", "3. Scanning...".dimmed());
    let scanner = LogScanner::from_wallet(&recipient)?;
    let config = ScannerConfig::new().workers(workers);
    let start = std::time::Instant::now();
    let report = scanner
        .scan_parallel(&log, ScanCheckpoint::start(), config)
        .await?;
    let scan_time = start.elapsed();

    let rate = count as f64 / scan_time.as_secs_f64();

    println!("   ✓ Scanned {} announcements: {:?}", count, scan_time);
    println!("   ✓ Found {} payments", report.owned.len());
    println!("\n{}", "📈 Results:".green().bold());
    println!("   Scan rate: {:.0} announcements/sec", rate);
    println!(
        "   Time per announcement: {:.2}µs",
        scan_time.as_micros() as f64 / count.max(1) as f64
    );
    println!(
        "   View tag collisions: {} ({:.3}%)",
        report.stats.collisions,
        report.stats.false_positive_rate() * 100.0
    );

    let expected = count.div_ceil(100);
    if report.owned.len() == expected {
        println!("   {} All expected payments found!", "✅".green());
    } else {
        println!("   {} Expected {}, found {}", "❌".red(), expected, report.owned.len());
    }

    Ok(())
}
