//! tobi - split and merge talking-book projects

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use log::LevelFilter;
use serde::Serialize;

use tobi::split_merge::count_parts;
use tobi::{
    CancellationToken, Document, Marked, NodeId, Outcome, ProgressLog, SplitMergeOptions,
    SplitRole, document_role, merge_document, open_document, split_document,
};

#[derive(Parser)]
#[command(name = "tobi")]
#[command(version, about = "Split and merge talking-book projects", long_about = None)]
#[command(after_help = "EXAMPLES:
    tobi info book.xuk                             Show document summary
    tobi split book.xuk                            Split at marked nodes into _SPLIT/
    tobi merge _SPLIT/book__MASTER/master.xuk      Merge parts into _MERGE/")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Show split role, size, marks and audio of a document
    Info {
        #[arg(value_name = "DOCUMENT")]
        path: PathBuf,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Split a document at its marked nodes
    Split {
        #[arg(value_name = "DOCUMENT")]
        path: PathBuf,

        /// Replace an existing split directory
        #[arg(long)]
        overwrite: bool,

        /// Write documents without indentation
        #[arg(long)]
        compact: bool,
    },
    /// Merge a split project back into one document
    Merge {
        #[arg(value_name = "MASTER")]
        path: PathBuf,

        /// Replace an existing merged document
        #[arg(long)]
        overwrite: bool,

        /// Write documents without indentation
        #[arg(long)]
        compact: bool,
    },
}

#[derive(Serialize)]
struct Summary {
    file: String,
    role: String,
    nodes: usize,
    parts: usize,
    audio_nodes: usize,
    outline: String,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Command::Info { path, json } => show_info(&path, json),
        Command::Split {
            path,
            overwrite,
            compact,
        } => split(&path, options(overwrite, compact)),
        Command::Merge {
            path,
            overwrite,
            compact,
        } => merge(&path, options(overwrite, compact)),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn options(overwrite: bool, compact: bool) -> SplitMergeOptions {
    SplitMergeOptions {
        overwrite,
        pretty: !compact,
        ..SplitMergeOptions::default()
    }
}

fn summarize(path: &Path, doc: &Document) -> Summary {
    let role = match document_role(doc) {
        SplitRole::Plain => "plain".to_string(),
        SplitRole::Master => "master".to_string(),
        SplitRole::Sub(i) => format!("part {i}"),
    };
    let parts = match document_role(doc) {
        SplitRole::Plain => count_parts(doc, &Marked),
        _ => 0,
    };
    let audio_nodes = std::iter::once(NodeId::ROOT)
        .chain(doc.descendants(NodeId::ROOT))
        .filter(|&n| doc.has_direct_audio(n))
        .count();
    Summary {
        file: path.display().to_string(),
        role,
        nodes: doc.len(),
        parts,
        audio_nodes,
        outline: doc.outline(),
    }
}

fn show_info(path: &Path, json: bool) -> Result<(), String> {
    let doc = open_document(path).map_err(|e| e.to_string())?;
    let summary = summarize(path, &doc);

    if json {
        let out = serde_json::to_string_pretty(&summary).map_err(|e| e.to_string())?;
        println!("{out}");
        return Ok(());
    }

    println!("File: {}", summary.file);
    println!("Role: {}", summary.role);
    println!("Nodes: {}", summary.nodes);
    if summary.parts > 0 {
        println!("Parts: {}", summary.parts);
    }
    println!("Audio nodes: {}", summary.audio_nodes);
    print!("{}", summary.outline);
    Ok(())
}

fn split(path: &Path, options: SplitMergeOptions) -> Result<(), String> {
    let reporter = ProgressLog::new("split", CancellationToken::new());
    let report = split_document(path, &options, &reporter).map_err(|e| e.to_string())?;
    if report.outcome == Outcome::Completed {
        println!(
            "Split {} into {} parts under {}",
            path.display(),
            report.total,
            report.layout.split_dir.display()
        );
        println!("Master: {}", report.layout.master_path().display());
    }
    Ok(())
}

fn merge(path: &Path, options: SplitMergeOptions) -> Result<(), String> {
    let reporter = ProgressLog::new("merge", CancellationToken::new());
    let report = merge_document(path, &options, &reporter).map_err(|e| e.to_string())?;
    if let Some(merged) = report.merged_path {
        println!("Merged {} parts into {}", report.total, merged.display());
    }
    Ok(())
}
