//! SiteJail CLI
//!
//! Operator tool for inspecting the shipped domain list and dry-running
//! containment decisions against the in-memory host.

use clap::{Parser, Subcommand};

use sj_core::{url, ContextId, DomainSet, RequestEvent, JAILED_DOMAINS};
use sj_engine::host::memory::MemoryHost;
use sj_engine::host::TabStatus;
use sj_engine::subresource;
use sj_engine::{Engine, EngineConfig};

#[derive(Parser)]
#[command(name = "sj-cli")]
#[command(about = "SiteJail containment engine tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the shipped jailed-domain list
    Domains,

    /// Evaluate a URL against the matcher, optionally as a sub-resource
    Check {
        /// URL to evaluate
        url: String,

        /// Treat the URL as a sub-resource loaded from this origin
        #[arg(short, long)]
        origin: Option<String>,

        /// Hosts to treat as user-trusted
        #[arg(short, long)]
        trusted: Vec<String>,
    },

    /// Dry-run a navigation containment decision against the in-memory host
    Decide {
        /// Navigation target URL
        url: String,

        /// Evaluate as if the tab already lives in the jail container
        #[arg(long)]
        from_jail: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Domains => cmd_domains(),
        Commands::Check {
            url,
            origin,
            trusted,
        } => cmd_check(&url, origin.as_deref(), &trusted),
        Commands::Decide { url, from_jail } => cmd_decide(&url, from_jail).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn cmd_domains() -> Result<(), String> {
    for domain in JAILED_DOMAINS {
        println!("{domain}");
    }
    println!("({} domains)", JAILED_DOMAINS.len());
    Ok(())
}

fn cmd_check(target: &str, origin: Option<&str>, trusted: &[String]) -> Result<(), String> {
    let jailed = DomainSet::jailed();
    let host = url::host(target).map_err(|e| e.to_string())?;
    let listed = jailed.contains_host(host);

    println!("{target}");
    println!("  host:   {host}");
    println!("  listed: {}", if listed { "yes" } else { "no" });

    if let Some(origin) = origin {
        let outcome = subresource::classify(target, origin, &jailed, trusted);
        println!("  as sub-resource of {origin}: {outcome:?}");
    }

    Ok(())
}

async fn cmd_decide(target: &str, from_jail: bool) -> Result<(), String> {
    let mem = MemoryHost::new();
    let engine = Engine::start(mem.host(), EngineConfig::default())
        .await
        .map_err(|e| e.to_string())?;

    let context = if from_jail {
        engine.jail_context().clone()
    } else {
        ContextId::default_store()
    };
    let tab = mem.add_tab("https://start.example/", context, TabStatus::Complete);

    let request = RequestEvent::navigation(tab.id, "cli-request", target);
    let verdict = engine.on_navigation_request(&request).await;

    if let Some(redirect) = &verdict.redirect_url {
        println!("redirect (tracking parameter stripped): {redirect}");
    } else if verdict.cancel {
        let reopened = mem
            .created_tabs()
            .into_iter()
            .next_back()
            .ok_or_else(|| "cancelled without a replacement tab".to_string())?;
        let where_to = if &reopened.context_id == engine.jail_context() {
            "the jail container".to_string()
        } else {
            format!("context {}", reopened.context_id)
        };
        println!("reopen under {where_to}");
    } else {
        println!("no action");
    }

    Ok(())
}
