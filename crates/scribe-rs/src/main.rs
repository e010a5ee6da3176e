//! Command-line entry point: run one Scribe turn against an OpenAI backend.

use anyhow::{Context, bail};
use autoagents_llm::LLMProvider;
use autoagents_llm::backends::openai::OpenAI;
use autoagents_llm::builder::LLMBuilder;
use clap::Parser;
use futures_util::StreamExt;
use log::{debug, info, warn};
use scribe_rs_config::ScribeConfig;
use scribe_rs_core::{Orchestrator, RunResult};
use scribe_rs_protocol::{EventPayload, Message};
use scribe_rs_tools::{ToolContext, ToolDispatcher, ToolServices, builtin_tool_registry};
use scribe_rs_vault::VaultStore;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

/// Command-line options.
#[derive(Parser)]
#[command(name = "scribe", version)]
struct Cli {
    /// Optional path to a scribe.json5 config file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Vault directory, overriding the config
    #[arg(long)]
    vault: Option<PathBuf>,
    /// OpenAI model name
    #[arg(long)]
    model: Option<String>,
    /// Print tokens and tool events as they arrive
    #[arg(long)]
    stream: bool,
    /// What to ask
    #[arg(required = true, num_args = 1..)]
    prompt: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = env_logger::builder()
        .format_timestamp_millis()
        .parse_default_env()
        .try_init();

    let cli = Cli::parse();
    let cwd = std::env::current_dir().context("cwd")?;
    let config = if let Some(path) = cli.config.as_ref() {
        info!("loading config from path: {}", path.display());
        ScribeConfig::load_from_path(path).context("failed to load config")?
    } else {
        info!("loading layered config from cwd: {}", cwd.display());
        let layered = ScribeConfig::load_layered(&cwd).context("failed to load layered config")?;
        debug!("layered config loaded (layers={})", layered.layers.len());
        layered.config
    };
    config.validate().context("invalid config")?;

    let vault_root = match cli.vault.as_ref() {
        Some(path) => path.clone(),
        None => config.resolve_vault_root(&cwd),
    };
    let store = VaultStore::open(&vault_root)
        .with_context(|| format!("failed to open vault at {}", vault_root.display()))?;

    // No embedding service ships with the CLI, so context is keyword search.
    let services = ToolServices::from_config(store, &config, None);
    let context = services.context.clone();
    let dispatcher = ToolDispatcher::from_config(
        builtin_tool_registry(),
        ToolContext::new(services),
        &config.tools,
    )
    .context("failed to build tool dispatcher")?;

    let model_name = cli
        .model
        .clone()
        .or_else(|| std::env::var("OPENAI_MODEL").ok())
        .unwrap_or_else(|| "gpt-4o-mini".to_string());
    let Ok(api_key) = std::env::var("OPENAI_API_KEY") else {
        bail!("OPENAI_API_KEY is required");
    };
    info!("building LLM provider (model={})", model_name);
    let llm: Arc<dyn LLMProvider> = LLMBuilder::<OpenAI>::new()
        .api_key(api_key)
        .model(model_name)
        .build()
        .context("failed to build OpenAI LLM provider")?;

    let context_provider = (config.orchestrator.context_limit > 0).then_some(context);
    let orchestrator = Orchestrator::new(
        llm,
        dispatcher,
        context_provider,
        config.orchestrator.clone(),
    );
    let conversation = vec![Message::user(cli.prompt.join(" "))];

    let result = if cli.stream {
        run_streaming(&orchestrator, conversation).await?
    } else {
        let result = orchestrator.run(conversation).await?;
        println!("{}", result.text);
        result
    };
    print_audit(&result);
    Ok(())
}

async fn run_streaming(
    orchestrator: &Orchestrator,
    conversation: Vec<Message>,
) -> anyhow::Result<RunResult> {
    let mut stream = orchestrator.run_stream(conversation);
    let mut stdout = std::io::stdout();
    while let Some(event) = stream.events.next().await {
        let event = match event {
            Ok(event) => event,
            Err(err) => {
                warn!("event stream lagged: {}", err);
                continue;
            }
        };
        match &event.payload {
            EventPayload::Token { text } => {
                print!("{text}");
                stdout.flush()?;
            }
            EventPayload::ToolStart { name, input } => {
                eprintln!("\n> {name} {input}");
            }
            EventPayload::ToolDone { name, success, .. } => {
                let status = if *success { "ok" } else { "failed" };
                eprintln!("< {name} {status}");
            }
            EventPayload::Summary { .. } | EventPayload::Error { .. } => {}
        }
        if event.payload.is_terminal() {
            break;
        }
    }
    println!();
    Ok(stream.finish().await?)
}

fn print_audit(result: &RunResult) {
    if result.tool_results.is_empty() {
        return;
    }
    eprintln!(
        "\n{} tool call(s) in {} round(s){}:",
        result.tool_results.len(),
        result.rounds,
        if result.ceiling_hit {
            ", round limit reached"
        } else {
            ""
        }
    );
    for (idx, entry) in result.tool_results.iter().enumerate() {
        let status = if entry.success { "ok" } else { "FAILED" };
        let first_line = entry.result_text.lines().next().unwrap_or_default();
        eprintln!("  {}. {} [{}] {}", idx + 1, entry.tool_name, status, first_line);
    }
}
