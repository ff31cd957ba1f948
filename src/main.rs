// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! tamis-index: build a `.tamis` membership index from a document corpus.
//!
//! ```bash
//! # Corpus is a JSON array of document strings
//! tamis-index --input corpus.json --output-file ./search/index.tamis
//!
//! # Or pipe the corpus through stdin
//! cat corpus.json | tamis-index --output-file index.tamis --language english
//! ```
//!
//! Exit code 0 on success; any failure prints a single-line diagnostic on
//! stderr and exits non-zero.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};

use tamis::{IndexOptions, TextIndex};

#[derive(Parser)]
#[command(
    name = "tamis-index",
    about = "Build a layered membership index for in-browser full-text search",
    version
)]
struct Cli {
    /// Where to write the serialized index
    #[arg(long)]
    output_file: PathBuf,

    /// Corpus file: a JSON array of document strings (stdin when omitted)
    #[arg(long)]
    input: Option<PathBuf>,

    /// Snowball stemmer language; must match at query time
    #[arg(long, default_value = "german")]
    language: String,

    /// Estimated total key count across the corpus (division balancing)
    #[arg(long, default_value = "100")]
    estimated_keys: u64,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(doc_count) => {
            println!(
                "indexed {} document(s) into {}",
                doc_count,
                cli.output_file.display()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("tamis-index: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<usize, String> {
    let corpus = read_corpus(cli.input.as_deref())?;

    let options = IndexOptions {
        estimated_keys: cli.estimated_keys,
        language: cli.language.clone(),
        ..IndexOptions::default()
    };
    let mut index =
        TextIndex::<u8>::new(&options).map_err(|e| format!("cannot create index: {e}"))?;

    let pb = ProgressBar::new(corpus.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{prefix:>8} [{bar:40}] {pos}/{len}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    pb.set_prefix("Insert");
    for text in &corpus {
        index.insert(text);
        pb.inc(1);
    }
    pb.finish_and_clear();

    index
        .index()
        .map_err(|e| format!("index construction failed: {e}"))?;

    let dir = cli
        .output_file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let filename = cli
        .output_file
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| format!("invalid output path: {}", cli.output_file.display()))?;

    fs::create_dir_all(dir).map_err(|e| format!("cannot create {}: {e}", dir.display()))?;
    index
        .save(dir, filename)
        .map_err(|e| format!("cannot write {}: {e}", cli.output_file.display()))?;

    Ok(corpus.len())
}

/// Read the corpus: a JSON array of document strings, from a file or stdin.
fn read_corpus(input: Option<&Path>) -> Result<Vec<String>, String> {
    let raw = match input {
        Some(path) => {
            fs::read_to_string(path).map_err(|e| format!("cannot read {}: {e}", path.display()))?
        }
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .map_err(|e| format!("cannot read stdin: {e}"))?;
            buf
        }
    };

    serde_json::from_str(&raw).map_err(|e| format!("corpus is not a JSON array of strings: {e}"))
}
