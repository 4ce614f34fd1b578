//! Oracle Agent - 链上预言机任务的 LLM 应答代理
//!
//! 启动流程:
//! - 解析命令行，加载配置（命令行 > 环境变量 > 配置文件 > 默认值）
//! - 初始化日志
//! - 按子命令装配适配器并执行

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;

use oracle_agent::application::ports::{
    ChainError, ChainReaderPort, LlmClientPort, MarketResolverPort, RegistryPort, SearchPort,
};
use oracle_agent::cli::{init_workspace, Cli, Command};
use oracle_agent::config::{load_config, print_config, AgentConfig, LogConfig};
use oracle_agent::domain::{build_prompt, Decision};
use oracle_agent::infrastructure::adapters::{
    AlloyMarketResolver, AlloyOracleReader, AlloyRegistryClient, AlloyResponseSubmitter,
    ChainConnection, OpenRouterClient, OpenRouterClientConfig, SubmissionTarget, TavilyClient,
    TavilyClientConfig, TxSettings,
};
use oracle_agent::infrastructure::worker::{PollWorker, PollWorkerConfig};

/// `search` 子命令输出中每条结果的预览长度
const SEARCH_PREVIEW_CHARS: usize = 150;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let command = cli.command();

    // init 不依赖配置
    if let Command::Init = command {
        let cwd = std::env::current_dir()?;
        for path in init_workspace(&cwd)? {
            println!("Created {}", path.display());
        }
        println!("Initialization complete. Edit the config files to add your contract addresses and API keys.");
        return Ok(());
    }

    let config = load_config(cli.config.as_deref(), &cli.overrides())
        .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    init_logging(&config.log);
    tracing::info!("Oracle Agent v{}", env!("CARGO_PKG_VERSION"));
    print_config(&config);

    match command {
        Command::Run => run_agent(&config).await,
        Command::CreateTask { name } => create_task(&config, &name).await,
        Command::ListAgents => list_agents(&config).await,
        Command::ListModels => list_models(&config).await,
        Command::Search { query } => search(&config, &query).await,
        Command::ResolveMarket {
            market_id,
            decision,
        } => resolve_market(&config, market_id, decision).await,
        Command::Init => Ok(()),
    }
}

/// RUST_LOG 优先于配置中的日志级别
fn init_logging(log: &LogConfig) {
    let default_filter = format!("{},oracle_agent={}", log.level, log.level);
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&default_filter));

    if log.json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn tx_settings(config: &AgentConfig) -> TxSettings {
    TxSettings {
        confirmations: config.submission.confirmations,
        receipt_timeout: std::time::Duration::from_secs(config.submission.receipt_timeout_secs),
        gas_limit: config.submission.gas_limit,
    }
}

/// 带签名者的链连接
fn signing_connection(config: &AgentConfig) -> anyhow::Result<ChainConnection> {
    let signer = config.require_signer()?;
    tracing::info!(account = %signer.address(), "Using signer account");
    let connection = ChainConnection::connect(
        config.rpc_endpoint(),
        Some(signer),
        tx_settings(config),
        config.retry.policy(),
    )?;
    Ok(connection)
}

fn openrouter_client(config: &AgentConfig) -> anyhow::Result<OpenRouterClient> {
    let api_key = config.require_api_key()?;
    let client_config = OpenRouterClientConfig {
        base_url: config.llm.base_url.clone(),
        api_key: api_key.to_string(),
        timeout_secs: config.llm.timeout_secs,
        referer: config.llm.referer.clone(),
        title: config.llm.title.clone(),
    };
    Ok(OpenRouterClient::new(client_config, config.retry.policy())?)
}

fn tavily_client(config: &AgentConfig) -> anyhow::Result<TavilyClient> {
    let api_key = config.require_tavily_api_key()?;
    let client_config = TavilyClientConfig {
        base_url: config.search.base_url.clone(),
        api_key: api_key.to_string(),
        max_results: config.search.max_results,
        timeout_secs: config.search.timeout_secs,
    };
    Ok(TavilyClient::new(client_config)?)
}

async fn run_agent(config: &AgentConfig) -> anyhow::Result<()> {
    let oracle_address = config.require_oracle_address()?;
    let connection = signing_connection(config)?;

    // 地址上无合约代码为致命错误；节点暂不可达只告警
    let reader = AlloyOracleReader::new(connection.clone(), oracle_address, config.from_block);
    match reader.verify_contract().await {
        Ok(()) => tracing::info!(oracle = %oracle_address, "Oracle contract verified"),
        Err(ChainError::Connection(e)) => {
            tracing::warn!(error = %e, "Could not reach RPC node to verify oracle contract")
        }
        Err(e) => return Err(e).context("Oracle contract verification failed"),
    }

    let target = match config.agent_address()? {
        Some(agent) => SubmissionTarget::Agent(agent),
        None => SubmissionTarget::Oracle,
    };
    tracing::info!(submission_target = ?target, "Answer submission target");
    let submitter = AlloyResponseSubmitter::new(connection.clone(), oracle_address, target);

    let llm = openrouter_client(config)?;

    let shutdown = CancellationToken::new();
    let worker_config = PollWorkerConfig {
        interval: config.polling_interval(),
        run_once: config.run_once,
        model: config.model.clone(),
        market_tasks_only: config.market_tasks_only,
    };
    let mut worker = PollWorker::new(
        worker_config,
        Arc::new(reader),
        Arc::new(llm),
        Arc::new(submitter),
        shutdown.clone(),
    );

    if config.enable_search {
        let search: Arc<dyn SearchPort> = Arc::new(tavily_client(config)?);
        worker = worker.with_search(search);
    }

    if let Some(registry_address) = config.registry_address()? {
        let agent = match (config.agent_address()?, connection.account()) {
            (Some(agent), _) => agent,
            (None, Some(account)) => account,
            (None, None) => anyhow::bail!("No agent identity available for registration"),
        };
        let registry: Arc<dyn RegistryPort> =
            Arc::new(AlloyRegistryClient::new(connection.clone(), registry_address));
        worker = worker.with_registry(registry, agent);
    }

    tokio::spawn(shutdown_signal(shutdown));

    let summary = worker.run().await;
    tracing::info!(
        passes = summary.passes,
        submitted = summary.submitted,
        failed = summary.failed,
        "Agent shutdown complete"
    );

    Ok(())
}

async fn create_task(config: &AgentConfig, name: &str) -> anyhow::Result<()> {
    let oracle_address = config.require_oracle_address()?;
    let connection = signing_connection(config)?;
    let submitter = AlloyResponseSubmitter::new(connection, oracle_address, SubmissionTarget::Oracle);

    let (receipt, task_id) = submitter
        .create_task(name)
        .await
        .context("Failed to create task")?;

    match task_id {
        Some(id) => println!("Task created: index={}, tx_hash={}", id, receipt.tx_hash),
        None => println!("Task created: index=unknown, tx_hash={}", receipt.tx_hash),
    }
    Ok(())
}

async fn list_agents(config: &AgentConfig) -> anyhow::Result<()> {
    let registry_address = config.require_registry_address()?;
    let connection = ChainConnection::connect(
        config.rpc_endpoint(),
        None,
        tx_settings(config),
        config.retry.policy(),
    )?;
    let registry = AlloyRegistryClient::new(connection, registry_address);

    let agents = registry.list_agents().await.context("Failed to list agents")?;
    println!("Found {} registered agents:", agents.len());
    for (i, agent) in agents.iter().enumerate() {
        match registry.agent_details(*agent).await {
            Ok(details) => {
                println!("{}. {}", i + 1, agent);
                println!("   Model: {} {}", details.model_type, details.model_version);
                println!("   Tasks: {}", details.tasks_completed);
                println!("   Consensus participations: {}", details.consensus_participations);
                println!("   Rewards: {}", details.rewards_earned);
            }
            Err(e) => println!("{}. {} (Error fetching details: {})", i + 1, agent, e),
        }
    }
    Ok(())
}

async fn list_models(config: &AgentConfig) -> anyhow::Result<()> {
    let llm = openrouter_client(config)?;
    let models = llm.list_models().await.context("Failed to fetch models")?;

    println!("Available models on OpenRouter ({}):", models.len());
    for model in models {
        println!("- {}", model);
    }
    Ok(())
}

async fn search(config: &AgentConfig, query: &str) -> anyhow::Result<()> {
    let llm = openrouter_client(config)?;
    let search = tavily_client(config)?;

    println!("Searching for: {}", query);
    let results = search.search(query).await.context("Search failed")?;
    println!("Found {} results:", results.len());
    for (i, result) in results.iter().enumerate() {
        let preview: String = result.content.chars().take(SEARCH_PREVIEW_CHARS).collect();
        println!("\n{}. {}", i + 1, result.title);
        println!("   {}...", preview);
        println!("   Source: {}", result.url);
    }

    println!("\nGenerating response with search results...");
    let prompt = build_prompt(query, Some(&results));
    let response = llm
        .generate(&prompt, &config.model)
        .await
        .context("Generation failed")?;
    println!("\nAI Response:\n{}", response);
    println!("\nDecision: {}", Decision::extract(&response));
    Ok(())
}

async fn resolve_market(
    config: &AgentConfig,
    market_id: alloy::primitives::B256,
    decision: Decision,
) -> anyhow::Result<()> {
    let market_address = config.require_market_address()?;
    let connection = signing_connection(config)?;
    let resolver = AlloyMarketResolver::new(connection, market_address);

    let receipt = resolver
        .resolve_market(market_id, decision)
        .await
        .context("Failed to resolve market")?;
    println!(
        "Market {} resolved {}: tx_hash={}",
        market_id, decision, receipt.tx_hash
    );
    Ok(())
}

/// 等待 Ctrl-C 或 SIGTERM，然后取消 token
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    tracing::info!("Received shutdown signal, stopping after current step");
    token.cancel();
}
