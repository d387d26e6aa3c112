//! VPK CLI - Command-line tool for Valve VPK archives.
//!
//! This is the main entry point for the `vpk` command-line application.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use glob::{MatchOptions, Pattern};
use indicatif::{ProgressBar, ProgressStyle};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

use vpk::prelude::*;

/// Files expected to differ between addons.
const COLLISION_WHITELIST: &[&str] = &["addonimage.jpg", "addoninfo.txt"];

/// VPK - Valve pack file tool
#[derive(Parser)]
#[command(name = "vpk")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log debug output (overrides RUST_LOG)
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List contents of a VPK archive
    List {
        /// Path to the VPK file (`*_dir.vpk` for multi-part archives)
        #[arg(short, long, env = "VPK_INPUT")]
        input: PathBuf,

        /// Filter pattern (glob-style)
        #[arg(short, long)]
        filter: Option<String>,

        /// Show size, CRC and payload location
        #[arg(short, long)]
        detailed: bool,
    },

    /// Extract files from a VPK archive
    Extract {
        /// Path to the VPK file (`*_dir.vpk` for multi-part archives)
        #[arg(short, long, env = "VPK_INPUT")]
        input: PathBuf,

        /// Output directory
        #[arg(short, long, env = "VPK_OUTPUT")]
        output: PathBuf,

        /// Filter pattern (glob-style)
        #[arg(short, long)]
        filter: Option<String>,
    },

    /// Check the CRC of every file in one or more archives
    Verify {
        /// Print the names of files even if they are valid
        #[arg(short, long)]
        verbose: bool,

        /// VPK files to check
        #[arg(required = true)]
        archives: Vec<PathBuf>,
    },

    /// Create an archive from files and directories
    Create {
        /// Max size for multi-part archives (the last file can continue
        /// past this size)
        #[arg(short = 'M', long)]
        max_size: Option<u64>,

        /// Archive name: the file for single-part archives, the prefix (or
        /// `*_dir.vpk` name) for multi-part archives
        name: PathBuf,

        /// Files and directories to add, stored under the paths given
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Report files that appear in more than one archive
    Collision {
        /// Don't report the exact same file being in multiple archives
        #[arg(long)]
        skip_same: bool,

        /// VPK files to compare
        #[arg(required = true)]
        archives: Vec<PathBuf>,
    },
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let ok = match cli.command {
        Commands::List {
            input,
            filter,
            detailed,
        } => cmd_list(&input, filter.as_deref(), detailed)?,
        Commands::Extract {
            input,
            output,
            filter,
        } => cmd_extract(&input, &output, filter.as_deref())?,
        Commands::Verify { verbose, archives } => cmd_verify(&archives, verbose)?,
        Commands::Create {
            max_size,
            name,
            paths,
        } => cmd_create(&name, &paths, max_size)?,
        Commands::Collision {
            skip_same,
            archives,
        } => cmd_collision(&archives, skip_same)?,
    };

    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn open(path: &Path) -> Result<Vpk<FsOpener>> {
    Vpk::open_path(path).with_context(|| format!("Failed to open VPK archive {}", path.display()))
}

fn compile_filter(filter: Option<&str>) -> Result<Option<Pattern>> {
    filter
        .map(|pattern| Pattern::new(pattern).context("Invalid filter pattern"))
        .transpose()
}

fn matches(filter: Option<&Pattern>, path: &str) -> bool {
    let options = MatchOptions {
        case_sensitive: false,
        ..MatchOptions::new()
    };
    filter.map_or(true, |pattern| pattern.matches_with(path, options))
}

fn cmd_list(input: &Path, filter: Option<&str>, detailed: bool) -> Result<bool> {
    let archive = open(input)?;
    let filter = compile_filter(filter)?;

    let mut count = 0;
    for entry in archive.iter() {
        let path = entry.path();
        if !matches(filter.as_ref(), &path) {
            continue;
        }

        if detailed {
            let location = match entry.location() {
                PayloadLocation::Directory { offset } => format!("dir+{offset}"),
                PayloadLocation::Archive { index, offset } => format!("{index:03}+{offset}"),
            };
            println!(
                "{:>12} {:08x} {:>16} {}",
                entry.size(),
                entry.crc(),
                location,
                path
            );
        } else {
            println!("{path}");
        }
        count += 1;
    }

    println!("\nTotal: {count} entries");

    Ok(true)
}

fn cmd_extract(input: &Path, output: &Path, filter: Option<&str>) -> Result<bool> {
    println!("Opening VPK archive: {}", input.display());

    let start = Instant::now();
    let archive = open(input)?;
    let filter = compile_filter(filter)?;

    println!("Loaded {} entries in {:?}", archive.len(), start.elapsed());

    let entries: Vec<_> = archive
        .iter()
        .filter(|e| matches(filter.as_ref(), &e.path()))
        .collect();

    println!("Extracting {} entries...", entries.len());

    let pb = ProgressBar::new(entries.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("#>-"),
    );

    fs::create_dir_all(output)?;

    let start = Instant::now();
    for entry in &entries {
        let path = entry.path();
        if Path::new(&path)
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            warn!(path = %path, "skipping entry that escapes the output directory");
            pb.inc(1);
            continue;
        }

        let output_path = output.join(&path);
        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let data = entry
            .read()
            .with_context(|| format!("Failed to read {path}"))?;
        fs::write(&output_path, data)
            .with_context(|| format!("Failed to write {}", output_path.display()))?;

        pb.inc(1);
    }

    pb.finish_with_message("Done");
    println!("Extraction completed in {:?}", start.elapsed());

    Ok(true)
}

fn cmd_verify(archives: &[PathBuf], verbose: bool) -> Result<bool> {
    let mut ok = true;

    for name in archives {
        let archive = match Vpk::open_path(name) {
            Ok(archive) => archive,
            Err(e) => {
                eprintln!("{}: {}", name.display(), e);
                ok = false;
                continue;
            }
        };

        let start = Instant::now();
        let results = archive.verify_parallel();
        debug!(
            archive = %name.display(),
            entries = results.len(),
            elapsed = ?start.elapsed(),
            "verified archive"
        );

        for (path, result) in results {
            match result {
                Ok(()) if verbose => println!("{}: {} is valid", name.display(), path),
                Ok(()) => {}
                Err(e) => {
                    println!("{}: {}: {}", name.display(), path, e);
                    ok = false;
                }
            }
        }
    }

    Ok(ok)
}

fn cmd_create(name: &Path, paths: &[PathBuf], max_size: Option<u64>) -> Result<bool> {
    let mut sources = Vec::new();
    for root in paths {
        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry.with_context(|| format!("Failed to walk {}", root.display()))?;
            if !entry.file_type().is_dir() {
                sources.push(FileSource::from_path(entry.path()));
            }
        }
    }

    let creator = match max_size {
        Some(_) => FsCreator::multi(name),
        None => FsCreator::Single(name.to_path_buf()),
    };

    println!(
        "Creating {} from {} files...",
        creator.main_path().display(),
        sources.len()
    );

    let start = Instant::now();
    create(&creator, &sources, max_size).context("Failed to create VPK archive")?;

    println!("Archive created in {:?}", start.elapsed());

    Ok(true)
}

fn cmd_collision(archives: &[PathBuf], skip_same: bool) -> Result<bool> {
    let opened = archives
        .iter()
        .map(|name| open(name))
        .collect::<Result<Vec<_>>>()?;

    let mut files: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (index, archive) in opened.iter().enumerate() {
        for path in archive.paths() {
            files.entry(path).or_default().push(index);
        }
    }

    let mut ok = true;
    for (path, owners) in &files {
        if owners.len() < 2 || COLLISION_WHITELIST.contains(&path.as_str()) {
            continue;
        }

        let hashes = owners
            .iter()
            .map(|&i| {
                hash_entry(&opened[i], path).with_context(|| {
                    format!("{}: {}", archives[i].display(), path)
                })
            })
            .collect::<Result<Vec<_>>>()?;

        if skip_same && hashes.iter().all(|h| *h == hashes[0]) {
            continue;
        }

        println!("{path}:");
        for (&i, hash) in owners.iter().zip(&hashes) {
            println!("{}: {}", archives[i].display(), hash);
        }
        println!();
        ok = false;
    }

    Ok(ok)
}

/// SHA-256 of a verified entry, hex encoded.
fn hash_entry(archive: &Vpk<FsOpener>, path: &str) -> Result<String> {
    let entry = archive
        .entry(path)
        .with_context(|| format!("Entry {path} disappeared"))?;

    let mut reader = entry.open()?;
    let mut hasher = Sha256::new();
    io::copy(&mut reader, &mut hasher)?;
    reader.finish()?;

    Ok(hex::encode(hasher.finalize()))
}
