//! `sonda` command line: validate CNPJs, resolve companies through the
//! registry chain, browse the question catalog, and dry-run the
//! auto-save engine against a store.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sonda_core::{AnswerValue, Catalog, Cnpj, Question, QuestionKind};
use sonda_registry::{BrasilApi, ReceitaWs, RegistryClient, StaticFallback};
use sonda_store::{MemoryStore, RestStore, SessionStore};
use sonda_sync::{SessionSync, SyncConfig};

mod display;

#[derive(Parser)]
#[command(name = "sonda", version, about = "Business discovery questionnaire toolkit")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate a CNPJ and print its canonical forms.
    Validate {
        /// CNPJ, punctuated or bare.
        cnpj: String,
    },
    /// Resolve a CNPJ through the registry provider chain.
    Lookup {
        /// CNPJ, punctuated or bare.
        cnpj: String,
        /// Deadline for the whole chain, in seconds. 0 disables it.
        #[arg(long, default_value_t = 10)]
        timeout_secs: u64,
        /// Skip the registries and use the synthetic fallback only.
        #[arg(long)]
        offline: bool,
        /// Query the registries only; fail instead of fabricating data.
        #[arg(long, conflicts_with = "offline")]
        no_fallback: bool,
    },
    /// Show the built-in question catalog.
    Catalog {
        /// Expand one section into its full question list.
        #[arg(long)]
        section: Option<u32>,
    },
    /// Dry-run the auto-save engine: seed a session, answer questions,
    /// wait out the debounce window, complete, and dump the store.
    Simulate {
        /// CNPJ the session is seeded with.
        #[arg(long, default_value = "11.222.333/0001-81")]
        cnpj: String,
        /// How many catalog questions to answer.
        #[arg(long, default_value_t = 8)]
        answers: usize,
        /// Debounce window in milliseconds.
        #[arg(long, default_value_t = 500)]
        debounce_ms: u64,
        /// PostgREST base URL; omit to run against the in-memory store.
        #[arg(long, env = "SONDA_STORE_URL")]
        store_url: Option<String>,
        /// API key sent with every store request.
        #[arg(long, env = "SONDA_STORE_KEY")]
        store_key: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "sonda starting");
    match Cli::parse().command {
        Command::Validate { cnpj } => validate(&cnpj),
        Command::Lookup {
            cnpj,
            timeout_secs,
            offline,
            no_fallback,
        } => lookup(&cnpj, timeout_secs, offline, no_fallback).await,
        Command::Catalog { section } => catalog(section),
        Command::Simulate {
            cnpj,
            answers,
            debounce_ms,
            store_url,
            store_key,
        } => simulate(&cnpj, answers, debounce_ms, store_url, store_key).await,
    }
}

fn validate(input: &str) -> anyhow::Result<()> {
    let cnpj = Cnpj::parse(input)?;
    println!("valid");
    println!("  {:<20} {}", "canonical", cnpj.as_str());
    println!("  {:<20} {}", "display", cnpj.formatted());
    Ok(())
}

async fn lookup(
    input: &str,
    timeout_secs: u64,
    offline: bool,
    no_fallback: bool,
) -> anyhow::Result<()> {
    let client = if offline {
        RegistryClient::with_providers(vec![Box::new(StaticFallback::new())])
    } else if no_fallback {
        RegistryClient::with_providers(vec![
            Box::new(ReceitaWs::new()),
            Box::new(BrasilApi::new()),
        ])
    } else {
        RegistryClient::default_chain()
    };
    let deadline = (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs));
    let record = client.with_deadline(deadline).lookup(input).await?;
    display::print_company_card(&record);
    Ok(())
}

fn catalog(section: Option<u32>) -> anyhow::Result<()> {
    let catalog = Catalog::builtin();
    match section {
        Some(id) => {
            let section = catalog
                .section(id)
                .with_context(|| format!("no section {id} in the catalog"))?;
            let questions: Vec<&Question> = catalog.questions_in_section(id).collect();
            display::print_section(section, &questions);
        }
        None => display::print_catalog_summary(catalog),
    }
    Ok(())
}

async fn simulate(
    input: &str,
    answers: usize,
    debounce_ms: u64,
    store_url: Option<String>,
    store_key: Option<String>,
) -> anyhow::Result<()> {
    let store: Arc<dyn SessionStore> = match store_url {
        Some(url) => {
            let key =
                store_key.context("--store-key (or SONDA_STORE_KEY) is required with --store-url")?;
            println!("store: {url}");
            Arc::new(RestStore::new(url, key))
        }
        None => {
            println!("store: in-memory");
            Arc::new(MemoryStore::new())
        }
    };

    // Seeded from the fallback provider so a dry run never needs network.
    let registry = RegistryClient::with_providers(vec![Box::new(StaticFallback::with_delay(
        Duration::ZERO,
    ))]);
    let company = registry.lookup(input).await?;
    println!(
        "company: {} ({})",
        company.display_name(),
        company.cnpj.formatted()
    );

    // A bare supplied id is replaced with a fresh UUID, so every dry run
    // writes its own session.
    let sync = SessionSync::new(
        store.clone(),
        Catalog::builtin().clone(),
        "dryrun",
        &company,
        SyncConfig {
            debounce: Duration::from_millis(debounce_ms),
        },
    );
    println!("session: {}", sync.session_id());
    println!();

    sync.start().await;
    sync.load_existing().await;

    let catalog = Catalog::builtin();
    let count = answers.min(catalog.total_questions());
    for question in catalog.questions().iter().take(count) {
        sync.set_section(question.section).await;
        sync.set_answer(question.id, scripted_value(question)).await;
    }
    if let Some(first) = catalog.questions().first() {
        sync.set_observations(first.id, "filled in by the dry run").await;
    }

    println!("answered {count} questions, waiting out the debounce window");
    tokio::time::sleep(Duration::from_millis(debounce_ms + 300)).await;

    let status = sync.status().await;
    println!();
    println!("=== engine status ===");
    println!("  {:<20} {}", "answers held", status.answer_count);
    println!("  {:<20} {}%", "completion", status.completion_percent);
    println!("  {:<20} {}", "current section", status.current_section);
    println!(
        "  {:<20} {}",
        "last saved",
        status
            .last_saved
            .map_or_else(|| "never".to_string(), |t| t.to_rfc3339())
    );

    sync.complete().await.context("completing the session")?;

    let session = store
        .get_session(sync.session_id())
        .await?
        .context("session row missing after completion")?;
    let rows = store.list_answers(sync.session_id()).await?;

    println!();
    println!("=== stored session ===");
    println!("  {:<20} {}", "company", session.company_name);
    println!(
        "  {:<20} {}",
        "completed",
        if session.is_completed { "yes" } else { "no" }
    );
    println!("  {:<20} {}%", "completion", session.completion_percentage);
    println!("  {:<20} {}", "answer rows", rows.len());
    for row in &rows {
        println!(
            "    q{:<4} s{:<3} {}",
            row.question_id,
            row.section_id,
            serde_json::to_string(&row.value)?
        );
    }
    Ok(())
}

/// A deterministic, fully-formed value for each question kind.
fn scripted_value(question: &Question) -> AnswerValue {
    match question.kind {
        QuestionKind::SingleChoice => {
            AnswerValue::Text(question.options.first().cloned().unwrap_or_default())
        }
        QuestionKind::MultiChoice => {
            AnswerValue::Selection(question.options.iter().take(2).cloned().collect())
        }
        QuestionKind::Scale => AnswerValue::Number(7.0),
        QuestionKind::FreeText | QuestionKind::LongText => {
            AnswerValue::Text(format!("Dry-run answer for question {}.", question.id))
        }
        QuestionKind::PercentSplit => {
            // Integral even split; the last option absorbs the remainder
            // so the total is exactly 100.
            let n = question.options.len().max(1);
            let each = (100 / n) as f64;
            let mut map: BTreeMap<String, f64> = question
                .options
                .iter()
                .map(|opt| (opt.clone(), each))
                .collect();
            if let Some(last) = question.options.last() {
                map.insert(last.clone(), each + (100 % n) as f64);
            }
            AnswerValue::Split(map)
        }
        QuestionKind::Ranking => AnswerValue::Split(
            question
                .options
                .iter()
                .enumerate()
                .map(|(i, opt)| (opt.clone(), (i + 1) as f64))
                .collect(),
        ),
    }
}
