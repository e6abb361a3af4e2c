use std::sync::Arc;

use futures::StreamExt;

use chat_assist::config::{AgentConfig, AgentIdentity, MessagePolicy, TemplateOverrides};
use chat_assist::pipeline::MessageManager;
use chat_assist::runtime::{
    AgentRuntime, LibSqlMemoryStore, LlmBackend, LlmConfig, NoActions, NoEvaluation,
    RecentMessagesComposer, RigGenerator, VisionDescriber,
};
use chat_assist::transport::{ChatTransport, TelegramTransport};

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

fn read_template(env_name: &str) -> Option<String> {
    let path = std::env::var(env_name).ok()?;
    match std::fs::read_to_string(&path) {
        Ok(template) => Some(template),
        Err(e) => {
            eprintln!("Warning: could not read template {path}: {e}");
            None
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let bot_token = std::env::var("TELEGRAM_BOT_TOKEN").unwrap_or_else(|_| {
        eprintln!("Error: TELEGRAM_BOT_TOKEN not set");
        std::process::exit(1);
    });

    // ── Generation backend ───────────────────────────────────────────────
    let backend = match std::env::var("CHAT_ASSIST_BACKEND").as_deref() {
        Ok("openai") => LlmBackend::OpenAi,
        _ => LlmBackend::Anthropic,
    };
    let key_var = match backend {
        LlmBackend::Anthropic => "ANTHROPIC_API_KEY",
        LlmBackend::OpenAi => "OPENAI_API_KEY",
    };
    let api_key = std::env::var(key_var).unwrap_or_else(|_| {
        eprintln!("Error: {key_var} not set");
        std::process::exit(1);
    });

    let (default_fast, default_quality) = match backend {
        LlmBackend::Anthropic => ("claude-3-5-haiku-latest", "claude-sonnet-4-20250514"),
        LlmBackend::OpenAi => ("gpt-4o-mini", "gpt-4o"),
    };
    let llm_config = LlmConfig {
        backend,
        api_key: secrecy::SecretString::from(api_key.clone()),
        fast_model: std::env::var("CHAT_ASSIST_FAST_MODEL")
            .unwrap_or_else(|_| default_fast.to_string()),
        quality_model: std::env::var("CHAT_ASSIST_MODEL")
            .unwrap_or_else(|_| default_quality.to_string()),
    };
    let generation = Arc::new(RigGenerator::from_config(&llm_config)?);

    // ── Vision ───────────────────────────────────────────────────────────
    let vision_base = std::env::var("CHAT_ASSIST_VISION_BASE_URL")
        .unwrap_or_else(|_| "https://api.openai.com/v1".to_string());
    let vision_model =
        std::env::var("CHAT_ASSIST_VISION_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());
    let vision_key = std::env::var("OPENAI_API_KEY").unwrap_or(api_key);
    let vision = Arc::new(VisionDescriber::new(
        vision_base,
        secrecy::SecretString::from(vision_key),
        vision_model,
    ));

    // ── Transport + identity ─────────────────────────────────────────────
    let transport = Arc::new(TelegramTransport::new(bot_token));
    let (account_id, handle) = transport.identify().await?;
    let agent_name =
        std::env::var("CHAT_ASSIST_NAME").unwrap_or_else(|_| "Assistant".to_string());
    let identity = AgentIdentity::from_account(account_id, agent_name.clone(), handle.clone());

    let policy = MessagePolicy {
        ignore_bot_messages: env_flag("CHAT_ASSIST_IGNORE_BOTS"),
        ignore_direct_messages: env_flag("CHAT_ASSIST_IGNORE_DMS"),
    };
    let templates = TemplateOverrides {
        decision: read_template("CHAT_ASSIST_DECISION_TEMPLATE"),
        reply: read_template("CHAT_ASSIST_REPLY_TEMPLATE"),
    };
    let config = AgentConfig::new(identity)
        .with_policy(policy)
        .with_templates(templates);

    // ── Store ────────────────────────────────────────────────────────────
    let db_path = std::env::var("CHAT_ASSIST_DB_PATH")
        .unwrap_or_else(|_| "./data/chat-assist.db".to_string());
    let store = Arc::new(LibSqlMemoryStore::new_local(std::path::Path::new(&db_path)).await?);

    eprintln!("🤖 chat-assist v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Agent: {agent_name} (@{handle})");
    eprintln!("   Model: {} / {}", llm_config.fast_model, llm_config.quality_model);
    eprintln!("   Database: {db_path}\n");

    // ── Runtime ──────────────────────────────────────────────────────────
    let state = Arc::new(RecentMessagesComposer::new(
        Arc::clone(&store) as Arc<dyn chat_assist::runtime::MemoryStore>,
        agent_name,
    ));
    let runtime = Arc::new(AgentRuntime {
        config,
        generation,
        state,
        store,
        vision,
        actions: Arc::new(NoActions),
        evaluator: Arc::new(NoEvaluation),
    });

    // ── Event loop ───────────────────────────────────────────────────────
    let manager = MessageManager::new(runtime, Arc::clone(&transport) as Arc<dyn ChatTransport>);
    let mut events = transport.start().await?;

    // Events are handled serially: each pipeline runs to completion (or is
    // dropped) before the next event is taken off the stream.
    while let Some(event) = events.next().await {
        manager.handle_event(event).await;
    }

    Ok(())
}
