//! Command-line interface for legalens.
//!
//! Provides commands for uploading documents, watching their analysis,
//! listing the session's documents, simplifying free-standing text, and
//! running the inbox auto-uploader.

use std::collections::HashSet;
use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};

use crate::adapters::{PortalApi, PortalClient};
use crate::config;
use crate::core::{DashboardStats, PortalSession, Settlement};
use crate::domain::{AnalysisResult, Document, DocumentId, DocumentStatus};
use crate::ingest::{InboxConfig, InboxWatcher};

/// legalens - client for the LegaLens document-analysis service
#[derive(Parser, Debug)]
#[command(name = "legalens")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Upload a PDF for analysis
    Upload {
        /// Path to the PDF (max 10 MiB)
        file: PathBuf,

        /// Keep polling until the analysis settles
        #[arg(short, long)]
        watch: bool,
    },

    /// List the session's documents
    Documents {
        /// Maximum number of documents to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Show the current snapshot of one document
    Status {
        /// Document ID
        id: String,
    },

    /// Poll a processing document until it settles
    Watch {
        /// Document ID
        id: String,
    },

    /// Simplify legal text (reads stdin if no input file given)
    Simplify {
        /// Input file
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Show the signed-in profile
    Profile,

    /// Show dashboard counters
    Stats,

    /// Watch a directory and upload every new PDF dropped into it
    Inbox {
        /// Directory to watch (defaults to the configured inbox)
        dir: Option<PathBuf>,

        /// Also upload PDFs already present in the directory
        #[arg(long)]
        existing: bool,
    },

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Upload { file, watch } => upload(file, watch).await,
            Commands::Documents { limit } => list_documents(limit).await,
            Commands::Status { id } => show_status(&id).await,
            Commands::Watch { id } => watch_document(&id).await,
            Commands::Simplify { input } => simplify(input).await,
            Commands::Profile => show_profile().await,
            Commands::Stats => show_stats().await,
            Commands::Inbox { dir, existing } => run_inbox(dir, existing).await,
            Commands::Config => show_config(),
        }
    }
}

/// Build an authenticated client from the resolved configuration
fn client() -> Result<Arc<PortalClient>> {
    let config = config::config()?;
    let token = config.require_token()?;
    Ok(Arc::new(PortalClient::new(&config.base_url, token)))
}

/// Open a session (profile + document list) with the configured cadence
async fn open_session() -> Result<PortalSession> {
    let config = config::config()?;
    let api = client()?;
    PortalSession::open_with_config(api, config.poller)
        .await
        .context("could not open a session with the analysis service")
}

/// Upload a PDF, optionally staying around until the analysis settles
async fn upload(file: PathBuf, watch: bool) -> Result<()> {
    let mut session = open_session().await?;

    let document = session.upload(&file).await?;
    println!("Uploaded {} ({})", document.file_name, document.id);
    println!("Status: {}", document.status);

    if document.status == DocumentStatus::Processing && watch {
        wait_for_settlement(&mut session, &document.id).await?;
    } else if document.is_settled() {
        print_document(&document);
    }

    session.close().await;
    Ok(())
}

/// List the session's documents, newest first
async fn list_documents(limit: usize) -> Result<()> {
    let session = open_session().await?;
    let documents = session.documents();

    if documents.is_empty() {
        println!("No documents uploaded yet");
        session.close().await;
        return Ok(());
    }

    println!("{:<26} {:<14} {:<17} FILE", "ID", "STATUS", "UPLOADED");
    println!("{}", "-".repeat(75));

    for doc in documents.iter().take(limit) {
        println!(
            "{:<26} {:<14} {:<17} {}",
            doc.id,
            doc.status.label(),
            doc.upload_date
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M"),
            doc.file_name
        );
    }

    session.close().await;
    Ok(())
}

/// Show one document's current snapshot
async fn show_status(id: &str) -> Result<()> {
    let api = client()?;
    let document = api.fetch_document(&DocumentId::from(id)).await?;
    print_document(&document);
    Ok(())
}

/// Poll a processing document until it settles or the budget runs out
async fn watch_document(id: &str) -> Result<()> {
    let mut session = open_session().await?;
    let id = DocumentId::from(id);

    let document = match session.document(&id) {
        Some(document) => document.clone(),
        None => {
            session.close().await;
            anyhow::bail!("no document with id {}", id);
        }
    };

    if document.is_settled() {
        print_document(&document);
        session.close().await;
        return Ok(());
    }

    if document.status == DocumentStatus::Uploaded {
        println!("{} is not being processed yet; try again shortly", id);
        session.close().await;
        return Ok(());
    }

    // The session already polls every processing document
    wait_for_settlement(&mut session, &id).await?;
    session.close().await;
    Ok(())
}

/// Wait for the given document to settle, reporting other settlements
/// as they arrive
async fn wait_for_settlement(session: &mut PortalSession, id: &DocumentId) -> Result<()> {
    let poller = config::config()?.poller;
    let budget = poller.budget + poller.interval;

    println!("Waiting for analysis...");

    loop {
        match tokio::time::timeout(budget, session.next_settlement()).await {
            Ok(Some(settlement)) => {
                report_settlement(&settlement);
                if settlement.id() == id {
                    if settlement.is_success() {
                        print_document(&settlement.document);
                    }
                    return Ok(());
                }
            }
            Ok(None) => return Ok(()),
            Err(_) => {
                println!("Still processing after the polling budget; check again later");
                return Ok(());
            }
        }
    }
}

fn report_settlement(settlement: &Settlement) {
    if settlement.is_success() {
        println!("Analysis complete for {}", settlement.document.file_name);
    } else {
        eprintln!("Analysis failed for {}", settlement.document.file_name);
    }
}

/// Simplify legal text from a file or stdin
async fn simplify(input: Option<PathBuf>) -> Result<()> {
    let text = if let Some(path) = input {
        std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read input file: {}", path.display()))?
    } else {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read from stdin")?;
        buffer
    };

    if text.trim().is_empty() {
        anyhow::bail!("no text to analyze");
    }

    let api = client()?;
    let analysis = api.simplify_text(&text).await?;

    if let Err(problem) = analysis.consistency() {
        tracing::warn!(%problem, "service returned an inconsistent analysis");
    }

    print_analysis(&analysis);
    Ok(())
}

/// Show the signed-in profile
async fn show_profile() -> Result<()> {
    let api = client()?;
    let profile = api.fetch_profile().await?;

    println!("Name:  {}", profile.full_name());
    println!("Email: {}", profile.email);
    Ok(())
}

/// Show dashboard counters over the current document list
async fn show_stats() -> Result<()> {
    let api = client()?;
    let documents = api.fetch_documents().await?;
    let stats = DashboardStats::compute(&documents, Local::now());

    println!("Total Documents: {}", stats.total);
    println!("This Month:      {}", stats.this_month);
    println!("Analyzed:        {}", stats.analyzed);
    println!("Processing:      {}", stats.processing);
    Ok(())
}

/// Watch the inbox directory and upload every new PDF
async fn run_inbox(dir: Option<PathBuf>, existing: bool) -> Result<()> {
    let config = config::config()?;
    let mut session = open_session().await?;

    let inbox_config = InboxConfig {
        watch_path: dir.unwrap_or_else(|| config.inbox_path.clone()),
        stability_delay_secs: config.inbox_stability_delay_secs,
    };
    let watch_path = inbox_config.watch_path.clone();
    let watcher = InboxWatcher::with_config(inbox_config);

    let mut seen = HashSet::new();
    let initial = watcher.scan_once(&mut seen).await?;
    if existing {
        for event in initial {
            upload_from_inbox(&mut session, &event.path).await;
        }
    }

    let (mut events, handle) = watcher.watch(seen)?;
    println!("Watching {} (ctrl-c to stop)", watch_path.display());

    loop {
        tokio::select! {
            maybe_event = events.recv() => {
                match maybe_event {
                    Some(event) => upload_from_inbox(&mut session, &event.path).await,
                    None => break,
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!("\nStopping inbox watcher");
                break;
            }
            _ = tokio::time::sleep(Duration::from_millis(500)) => {}
        }

        for settlement in session.apply_settlements() {
            report_settlement(&settlement);
        }
    }

    handle.stop().await?;
    session.close().await;
    Ok(())
}

async fn upload_from_inbox(session: &mut PortalSession, path: &std::path::Path) {
    match session.upload(path).await {
        Ok(document) => {
            println!("Uploaded {} ({})", document.file_name, document.id);
        }
        Err(err) => {
            eprintln!("Skipping {}: {}", path.display(), err);
        }
    }
}

/// Show resolved configuration
fn show_config() -> Result<()> {
    let config = config::config()?;

    println!("Service URL: {}", config.base_url);
    println!(
        "Credential:  {}",
        if config.token.is_some() {
            "configured"
        } else {
            "not set"
        }
    );
    println!("Polling:     every {:?}, budget {:?}", config.poller.interval, config.poller.budget);
    println!("Inbox:       {}", config.inbox_path.display());
    match &config.config_file {
        Some(path) => println!("Config file: {}", path.display()),
        None => println!("Config file: none (defaults + environment)"),
    }

    Ok(())
}

/// Print one document in full
fn print_document(doc: &Document) {
    println!();
    println!("File:       {}", doc.file_name);
    println!("ID:         {}", doc.id);
    println!("Status:     {}", doc.status.label());
    println!(
        "Uploaded:   {}",
        doc.upload_date.with_timezone(&Local).format("%Y-%m-%d %H:%M")
    );

    if let Some(ref classification) = doc.classification {
        match doc.confidence_percent() {
            Some(pct) => println!("Type:       {} ({}% confidence)", classification, pct),
            None => println!("Type:       {}", classification),
        }
    }

    if let Some(ref summary) = doc.summary {
        println!("Summary:    {}", summary);
    }

    if let Some(ref terms) = doc.key_terms {
        if !terms.is_empty() {
            println!("Key terms:");
            for term in terms {
                println!("  - {}", term);
            }
        }
    }

    if let Some(ref dates) = doc.important_dates {
        if !dates.is_empty() {
            println!("Important dates:");
            for date in dates {
                println!("  - {}: {}", date.kind, date.date);
            }
        }
    }

    if let Some(ref parties) = doc.parties_involved {
        if !parties.is_empty() {
            println!("Parties:");
            for party in parties {
                println!("  - {}", party);
            }
        }
    }

    match doc.jargon_analysis {
        Some(ref analysis) => print_analysis(analysis),
        None if doc.status == DocumentStatus::Analyzed => {
            println!("Jargon analysis not available for this document");
        }
        None => {}
    }
}

/// Print a jargon analysis
fn print_analysis(analysis: &AnalysisResult) {
    println!();
    if let Some(ref complexity) = analysis.complexity_analysis {
        println!(
            "Complexity: {} [{}], jargon density {}%, {} words",
            complexity.complexity,
            complexity.severity().label(),
            complexity.score,
            complexity.total_words
        );
    }

    if analysis.total_jargons == 0 {
        println!("This text contains minimal legal jargon");
        return;
    }

    println!("Legal terms found ({}):", analysis.total_jargons);
    let mut terms: Vec<_> = analysis.jargons_found.iter().collect();
    terms.sort_by(|a, b| a.0.cmp(b.0));
    for (term, info) in terms {
        println!("  {} ({}x): {}", term, info.occurrences, info.meaning);
    }

    if let Some(ref summary) = analysis.jargon_summary {
        println!();
        println!("Summary:");
        println!("{}", summary);
    }

    if let Some(ref simplified) = analysis.simplified_text {
        println!();
        println!("Simplified text:");
        println!("{}", simplified);
    }
}
