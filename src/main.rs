//! commitcraft - CLI entry point.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use dialoguer::{Confirm, Select};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use commitcraft::ai::CliProvider;
use commitcraft::{
    CommitAssistant, CommitMessageVariant, GitRepository, Suggestions, load_config,
};

/// Suggest conventional commit messages for the staged changes.
#[derive(Parser, Debug)]
#[command(name = "commitcraft")]
#[command(about = "Suggest conventional commit messages for the staged changes")]
#[command(version)]
struct Cli {
    /// Run as if started in this directory
    #[arg(short = 'C', long = "repo", default_value = ".")]
    repo: PathBuf,

    /// Configuration file (skips discovery)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print suggestions as JSON
    #[arg(long)]
    json: bool,

    /// Show how the type, scope and breaking flag were decided
    #[arg(long)]
    explain: bool,

    /// Skip the AI suggestion even when enabled in config
    #[arg(long)]
    no_ai: bool,

    /// Variant number to use with --commit
    #[arg(long, value_name = "N")]
    pick: Option<usize>,

    /// Commit with the chosen variant
    #[arg(long)]
    commit: bool,

    /// Commit with the first variant without prompting
    #[arg(short = 'y', long)]
    yes: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let repo = GitRepository::discover(&cli.repo)
        .context("Not a git repository. Run commitcraft from within a git repository.")?;
    let config = load_config(&repo.root(), cli.config.as_deref());
    let assistant = CommitAssistant::new(repo, config);

    let provider = if assistant.config().ai.enabled && !cli.no_ai {
        CliProvider::from_settings(&assistant.config().ai)
            .map_err(|e| warn!("AI suggestion unavailable: {}", e))
            .ok()
    } else {
        None
    };
    let result = match &provider {
        Some(provider) => assistant.suggest_with_ai(provider).await,
        None => assistant.analyze(),
    };
    let suggestions = result.context("Failed to read staged changes")?;

    if suggestions.classification.files_by_status.paths().is_empty() {
        eprintln!("No staged changes. Stage files with `git add` first.");
    }

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&suggestions).context("Failed to serialize suggestions")?
        );
    } else {
        if cli.explain {
            print_explanation(&suggestions);
        }
        print_variants(&suggestions.variants);
    }

    if !cli.commit {
        return Ok(());
    }
    if suggestions.classification.files_by_status.paths().is_empty() {
        bail!("Nothing staged to commit");
    }

    let chosen = choose_variant(&suggestions.variants, cli.pick, cli.yes)?;
    let oid = assistant
        .commit(&chosen.full)
        .context("Failed to create commit")?;
    println!("✓ Committed {} ({})", short_id(&oid.to_string()), chosen.label);

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "commitcraft=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn print_explanation(suggestions: &Suggestions) {
    let c = &suggestions.classification;
    println!("Type:        {} (rule: {})", c.commit_type, c.rule);
    println!("Scope:       {}", c.scope.as_deref().unwrap_or("(none)"));
    println!("Large:       {}", if c.is_large_change { "yes" } else { "no" });
    if c.is_breaking_change {
        println!("Breaking:    yes");
        for reason in &c.breaking_reasons {
            println!("  - {}", reason);
        }
    } else {
        println!("Breaking:    no");
    }
    if let Some(ticket) = &suggestions.ticket {
        println!("Ticket:      {}", ticket.id);
    }
    println!();
}

fn print_variants(variants: &[CommitMessageVariant]) {
    for v in variants {
        println!("[{}] {}", v.id, v.label);
        for line in v.full.lines() {
            println!("    {}", line);
        }
        println!();
    }
}

fn choose_variant(
    variants: &[CommitMessageVariant],
    pick: Option<usize>,
    yes: bool,
) -> Result<&CommitMessageVariant> {
    if let Some(n) = pick {
        return variants
            .iter()
            .find(|v| v.id == n)
            .with_context(|| format!("No variant {} (choose 1-{})", n, variants.len()));
    }
    if yes {
        return variants.first().context("No suggestions available");
    }

    let items: Vec<String> = variants
        .iter()
        .map(|v| format!("{}: {}", v.label, v.full.lines().next().unwrap_or("")))
        .collect();
    let index = Select::new()
        .with_prompt("Commit with")
        .items(&items)
        .default(0)
        .interact()
        .context("Selection cancelled")?;
    let chosen = variants.get(index).context("No suggestions available")?;

    println!("\n{}\n", chosen.full);
    let confirmed = Confirm::new()
        .with_prompt("Create this commit?")
        .default(true)
        .interact()
        .context("Confirmation cancelled")?;
    if !confirmed {
        bail!("Commit aborted");
    }
    Ok(chosen)
}

fn short_id(id: &str) -> &str {
    id.get(..7).unwrap_or(id)
}
