use std::path::{Path, PathBuf};

use anyhow::{bail, Context as _};
use clap::Parser;

mod cli;
mod config;
mod context;
mod semantic;
mod service;
#[cfg(test)]
mod tests;
mod transcript;

use config::Config;
use semantic::{build_index, EmbeddingModel, IndexStorage};
use service::{ArchiveService, ContextBackend, SearchResultItem};
use transcript::{artifact, chunker, parser, provenance};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = cli::Args::parse();
    let config = Config::load_with(&args.data_dir);

    match args.command {
        cli::Command::Chunk {
            path,
            window,
            flat,
            output,
        } => run_chunk(&config, path, window, flat, output),

        cli::Command::Index {
            chunks,
            model,
            output,
        } => run_index(&config, chunks, model, output),

        cli::Command::Search {
            query,
            top_k,
            json,
            context,
        } => {
            let service = ArchiveService::open(config)?;
            match query {
                Some(query) => run_search(&service, &query, top_k, json, context),
                None => run_interactive(&service, top_k),
            }
        }

        cli::Command::Context {
            source_file,
            line,
            width,
            segments,
        } => {
            let service = ArchiveService::open(config)?;
            let backend = if segments {
                ContextBackend::Segments
            } else {
                ContextBackend::RawFile
            };
            let window = service.context(&source_file, line, width, backend)?;
            if window.is_empty() {
                println!("No message at {source_file}:{line}");
            } else {
                print_context(&window);
            }
            Ok(())
        }
    }
}

/// Chunk every .txt transcript under the exports directory. Failures are
/// reported per file; the rest of the batch still runs.
fn run_chunk(
    config: &Config,
    path: Option<String>,
    window: Option<i64>,
    flat: bool,
    output: Option<String>,
) -> anyhow::Result<()> {
    let exports = path.map(PathBuf::from).unwrap_or_else(|| config.exports_path());
    let out_dir = output.map(PathBuf::from).unwrap_or_else(|| config.chunks_path());
    let window = chrono::Duration::minutes(window.unwrap_or(config.chunking.window_minutes));
    let group = config.chunking.group && !flat;

    let mut transcripts = Vec::new();
    collect_transcripts(&exports, &mut transcripts)
        .with_context(|| format!("cannot read exports directory {}", exports.display()))?;
    transcripts.sort();

    if transcripts.is_empty() {
        bail!("No .txt transcripts found in {}", exports.display());
    }
    println!("Found {} transcripts to process", transcripts.len());

    for transcript_path in transcripts {
        match chunk_one(&transcript_path, &out_dir, window, group) {
            Ok((count, artifact_path)) => {
                println!(
                    "  {}: {} messages -> {}",
                    transcript_path.display(),
                    count,
                    artifact_path.display()
                );
            }
            Err(err) => {
                log::error!("{}: {err:#}", transcript_path.display());
                eprintln!("Error processing {}: {err:#}", transcript_path.display());
            }
        }
    }

    Ok(())
}

/// Walk the exports tree; transcripts live in per-guild subdirectories.
fn collect_transcripts(dir: &Path, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_transcripts(&path, out)?;
        } else if path.extension().and_then(|e| e.to_str()) == Some("txt") {
            out.push(path);
        }
    }
    Ok(())
}

fn chunk_one(
    transcript_path: &Path,
    out_dir: &Path,
    window: chrono::Duration,
    group: bool,
) -> anyhow::Result<(usize, PathBuf)> {
    let name = transcript_path
        .file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.to_string())
        .context("transcript has no file name")?;
    let stem = transcript_path
        .file_stem()
        .and_then(|s| s.to_str())
        .map(|s| s.to_string())
        .context("transcript has no file stem")?;

    let text = std::fs::read_to_string(transcript_path)
        .with_context(|| format!("cannot read {}", transcript_path.display()))?;

    let mut messages = parser::parse_transcript(&text, &name);

    let sidecar = provenance::load_sidecar(transcript_path);
    if !sidecar.is_empty() {
        for message in &mut messages {
            message.discord = sidecar.get(&message.line_number).copied();
        }
    }

    let count = messages.len();
    let artifact_path = if group {
        let segments = chunker::chunk_messages(messages, window);
        artifact::write_segments(out_dir, &stem, &segments)?
    } else {
        artifact::write_messages(out_dir, &stem, &messages)?
    };

    Ok((count, artifact_path))
}

/// Build the vector index from chunked artifacts in one batch.
fn run_index(
    config: &Config,
    chunks: Option<String>,
    model: Option<String>,
    output: Option<String>,
) -> anyhow::Result<()> {
    let chunks_dir = chunks.map(PathBuf::from).unwrap_or_else(|| config.chunks_path());
    let model_name = model.unwrap_or_else(|| config.embedding.model.clone());
    let index_path = output.map(PathBuf::from).unwrap_or_else(|| config.index_path());

    let segments = artifact::load_dir(&chunks_dir)?;
    let total: usize = segments.iter().map(|s| s.messages.len()).sum();
    if total == 0 {
        println!("No messages found to vectorize.");
        return Ok(());
    }
    println!("Loaded {total} messages from {} segments", segments.len());

    let model = EmbeddingModel::new(&model_name, config.cache_path())?;
    println!("Vectorizing {total} messages with {model_name}...");

    let index = build_index(&segments, &model)?;
    if index.is_empty() {
        println!("No content to vectorize; index not written.");
        return Ok(());
    }

    IndexStorage::new(index_path.clone()).save(&index)?;
    println!(
        "Indexed {} messages into {}",
        index.len(),
        index_path.display()
    );

    Ok(())
}

fn run_search(
    service: &ArchiveService,
    query: &str,
    top_k: Option<usize>,
    json: bool,
    context_width: Option<u32>,
) -> anyhow::Result<()> {
    let results = service.search(query, top_k)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    print_results(&results);

    if let Some(width) = context_width {
        for result in &results {
            println!(
                "\nContext for {}:{}:",
                result.source_file, result.line_number
            );
            match service.context(
                &result.source_file,
                result.line_number,
                Some(width),
                ContextBackend::RawFile,
            ) {
                Ok(window) => print_context(&window),
                Err(err) => eprintln!("  {err}"),
            }
        }
    }

    Ok(())
}

/// Prompt-driven search session, ended with Esc, an interrupt, or
/// "quit".
fn run_interactive(service: &ArchiveService, top_k: Option<usize>) -> anyhow::Result<()> {
    println!(
        "Semantic archive search over {} indexed messages. Type 'quit' to exit.",
        service.index().len()
    );

    loop {
        let query = match inquire::Text::new("Search query:").prompt() {
            Ok(query) => query,
            Err(inquire::InquireError::OperationCanceled)
            | Err(inquire::InquireError::OperationInterrupted) => break,
            Err(err) => return Err(err.into()),
        };

        let query = query.trim();
        if query.is_empty() {
            continue;
        }
        if matches!(query.to_lowercase().as_str(), "quit" | "exit" | "q") {
            break;
        }

        let results = service.search(query, top_k)?;
        print_results(&results);

        if results.is_empty() {
            continue;
        }

        let show = inquire::Confirm::new("Show surrounding context for a result?")
            .with_default(false)
            .prompt()
            .unwrap_or(false);
        if !show {
            continue;
        }

        let options: Vec<String> = results
            .iter()
            .enumerate()
            .map(|(i, r)| format!("{}. [{:.4}] {}", i + 1, r.score, r.content))
            .collect();
        let picked = match inquire::Select::new("Result:", options.clone()).prompt() {
            Ok(picked) => picked,
            Err(_) => continue,
        };
        let Some(idx) = options.iter().position(|o| *o == picked) else {
            continue;
        };

        let result = &results[idx];
        match service.context(
            &result.source_file,
            result.line_number,
            None,
            ContextBackend::RawFile,
        ) {
            Ok(window) => {
                println!(
                    "\nSurrounding context for line {} in {}:",
                    result.line_number, result.source_file
                );
                println!("{}", "-".repeat(80));
                print_context(&window);
            }
            Err(err) => eprintln!("{err}"),
        }
    }

    Ok(())
}

fn print_results(results: &[SearchResultItem]) {
    if results.is_empty() {
        println!("No results found.");
        return;
    }

    println!("\nFound {} results:", results.len());
    println!("{}", "-".repeat(80));

    for (i, result) in results.iter().enumerate() {
        println!("\n{}. Score: {:.4}", i + 1, result.score);
        println!("   Content: {}", result.content);
        if let Some(username) = &result.username {
            println!("   Username: {username}");
        }
        if let Some(timestamp) = &result.timestamp {
            println!("   Timestamp: {timestamp}");
        }
        println!(
            "   Source: {}, line {}",
            result.source_file, result.line_number
        );
        if let Some(link) = &result.deep_link {
            println!("   Link: {link}");
        }
    }
}

fn print_context(window: &[context::ContextLine]) {
    for line in window {
        let marker = if line.is_target { ">>> " } else { "    " };
        println!("{:4}: {marker}{}", line.line_number, line.content);
    }
}
