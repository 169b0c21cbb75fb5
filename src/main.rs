//! llm-tools - Main CLI Entry Point

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use llm_tools::{
    chain::StepContext,
    cli::{Args, Commands, Verbosity},
    config::Config,
    integration::Toolkit,
    prompt::PromptEngine,
    rag::{sample_documents, Document},
};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::load(args.config.clone()).context("Failed to load configuration")?;
    args.apply_overrides(&mut config);
    init_tracing(args.verbosity(), &config.logging.level);

    match &args.command {
        Commands::Ask {
            query,
            template,
            vars,
            chain,
            rag,
            limit,
            samples,
            docs,
        } => {
            let toolkit = Toolkit::from_config(&config)?;
            load_documents(&toolkit, *samples, docs).await?;
            let variables: HashMap<String, String> = vars.iter().cloned().collect();

            if *chain {
                run_chain_mode(&args, &config, &toolkit, query, template, &variables, *limit)
                    .await?;
            } else {
                run_simple_mode(&args, &toolkit, query, template, &variables, *rag, *limit).await?;
            }
        }
        Commands::Render { template, vars } => {
            let engine = PromptEngine::with_defaults();
            let variables: HashMap<String, String> = vars.iter().cloned().collect();
            println!("{}", engine.render_with_variables(template, &variables)?);
        }
        Commands::Templates { name } => {
            show_templates(&config, name.as_deref()).await?;
        }
        Commands::Rag {
            query,
            docs,
            no_samples,
            limit,
        } => {
            let toolkit = Toolkit::from_config(&config)?;
            load_documents(&toolkit, !*no_samples, docs).await?;

            let result = toolkit.rag_query(query, *limit).await?;
            println!(
                "{} {}",
                "Documents retrieved:".bold(),
                result.documents_retrieved()
            );
            for id in &result.context.document_ids {
                println!("  • {}", id.cyan());
            }
            println!();
            println!("{}", result.augmented_prompt);
        }
        Commands::Config => {
            show_config(&args, &config)?;
        }
    }

    Ok(())
}

/// Initialise tracing on stderr; RUST_LOG wins at normal verbosity
fn init_tracing(verbosity: Verbosity, configured: &str) {
    let filter = match verbosity {
        Verbosity::Normal => {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(configured))
        }
        other => EnvFilter::new(other.log_level(configured)),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn load_documents(
    toolkit: &Toolkit,
    samples: bool,
    docs: &[(String, String)],
) -> Result<()> {
    if samples {
        for doc in sample_documents() {
            toolkit.add_document(doc).await?;
        }
    }
    for (id, content) in docs {
        toolkit
            .add_document(Document::new(id.clone(), content.clone()).with_metadata("source", "cli"))
            .await?;
    }
    Ok(())
}

async fn run_simple_mode(
    args: &Args,
    toolkit: &Toolkit,
    query: &str,
    template: &str,
    variables: &HashMap<String, String>,
    rag: bool,
    limit: usize,
) -> Result<()> {
    let answer = if rag {
        toolkit.ask_with_context(query, template, variables, limit).await?
    } else {
        toolkit.ask(query, template, variables).await?
    };

    println!("{} {}", "Query:".bold(), query);
    println!("{} {}", "Answer:".bold().green(), answer.text);

    if args.verbosity().show_details() {
        println!();
        println!("{} {}", "Template:".dimmed(), answer.template);
        println!("{} {}", "Model:".dimmed(), answer.model);
        println!("{} {}", "Usage:".dimmed(), answer.usage);
    }

    Ok(())
}

async fn run_chain_mode(
    args: &Args,
    config: &Config,
    toolkit: &Toolkit,
    query: &str,
    template: &str,
    variables: &HashMap<String, String>,
    limit: usize,
) -> Result<()> {
    let token = CancellationToken::new();
    let ctx = StepContext::new()
        .with_cancellation(token.clone())
        .with_timeout(std::time::Duration::from_secs(config.backend.timeout_secs));

    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    });

    let result = toolkit
        .ask_chained(&ctx, query, template, variables, limit)
        .await;
    ctrl_c.abort();
    let answer = result.context("Chain execution failed")?;

    println!("{} {}", "Query:".bold(), query);
    println!("{} {}", "Result:".bold().green(), answer);

    if args.verbosity().show_details() {
        let stats = toolkit.telemetry().get_stats();
        println!();
        println!(
            "{} {} steps in {:?}",
            "Chain:".dimmed(),
            stats.steps_succeeded,
            toolkit.telemetry().elapsed()
        );
        println!(
            "{} {} documents",
            "Retrieved:".dimmed(),
            stats.documents_retrieved
        );
        println!("{} {}", "Usage:".dimmed(), stats.usage);
    }

    Ok(())
}

async fn show_templates(config: &Config, name: Option<&str>) -> Result<()> {
    let toolkit = Toolkit::from_config(config)?;

    match name {
        None => {
            println!("{}", "Templates:".bold());
            for name in toolkit.list_templates().await {
                let template = toolkit.describe_template(&name).await?;
                println!(
                    "  • {} {}",
                    name.cyan(),
                    format!("({})", template.variables.join(", ")).dimmed()
                );
            }
        }
        Some(name) => {
            let template = toolkit.describe_template(name).await?;
            println!("{} {}", "Name:".bold(), template.name);
            println!("{} {}", "Version:".bold(), template.version);
            println!("{} {}", "Variables:".bold(), template.variables.join(", "));
            let mut metadata: Vec<_> = template.metadata.iter().collect();
            metadata.sort();
            for (key, value) in metadata {
                println!("{} {} = {}", "Metadata:".bold(), key, value);
            }
            println!();
            println!("{}", template.content);
        }
    }

    Ok(())
}

fn show_config(args: &Args, config: &Config) -> Result<()> {
    println!("{}", "llm-tools Configuration".bold());
    println!("─────────────────────────────────────");

    let source = args
        .config
        .clone()
        .or_else(Config::default_path)
        .filter(|path| path.exists());
    match source {
        Some(path) => println!("File:      {}", path.display()),
        None => println!("File:      {}", "(built-in defaults)".dimmed()),
    }
    println!("Verbosity: {}", args.verbosity().as_str());
    println!("Version:   {}", llm_tools::VERSION);
    println!();
    println!("{}", config.to_redacted_toml()?);

    Ok(())
}
