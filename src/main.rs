mod cli;

use reelgate::{
    catalog::{Catalog, JsonCatalog},
    config::{self, Config},
    pool::CredentialPool,
    restart::{self, RestartInfo},
    server::{self, AppContext},
    store::BotApiClient,
};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::sync::Arc;

/// One credential per configured bot token.
fn build_pool(config: &Config) -> CredentialPool {
    let pool = CredentialPool::new();
    let request_timeout = config.stream.settings().chunk_timeout;
    for token in &config.telegram.tokens {
        let bot_id = token.split(':').next().unwrap_or_default();
        let client = BotApiClient::new(
            &config.telegram.api_url,
            token,
            config.telegram.bin_chat(),
            request_timeout,
        );
        pool.register(format!("bot{bot_id}"), Arc::new(client));
    }
    pool
}

fn restart_info(config: &Config) -> RestartInfo {
    RestartInfo {
        base_url: config.server.base_url(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        branch: config.restart.upstream_branch.clone(),
        upstream_repo: config.restart.upstream_repo.clone(),
    }
}

async fn start_server(
    host: Option<String>,
    port: Option<u16>,
    config_path: Option<&std::path::Path>,
) -> Result<()> {
    // Load config
    let mut config = config::load_config_or_default(config_path)?;

    // Override host/port from CLI if specified
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    config::validate_config(&config)?;

    tracing::info!("Starting Reelgate server");
    tracing::info!(
        "Server will listen on {}:{}",
        config.server.host,
        config.server.port
    );

    let catalog: Option<Arc<dyn Catalog>> = match &config.catalog.path {
        Some(path) => {
            let catalog = JsonCatalog::load(path)
                .with_context(|| format!("Failed to load catalog: {:?}", path))?;
            Some(Arc::new(catalog))
        }
        None => None,
    };

    let pool = build_pool(&config);
    tracing::info!("Credential pool ready with {} credentials", pool.len());

    // Confirm a pending restart without holding up startup
    let marker_path = config.restart.marker_path.clone();
    let info = restart_info(&config);
    let recovery_pool = pool.clone();
    tokio::spawn(async move {
        let outcome = restart::recover(&marker_path, &recovery_pool, &info).await;
        tracing::debug!(?outcome, "Restart recovery finished");
    });

    let ctx = AppContext::new(config, pool, catalog);
    server::start_server(ctx).await
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            // Verbose mode: trace for reelgate, debug for HTTP
            "reelgate=trace,reelgate_fileid=trace,reelgate_common=debug,reelgate_parser=debug,tower_http=debug".to_string()
        } else {
            // Normal mode: debug for reelgate crates, info for HTTP requests
            "reelgate=debug,reelgate_fileid=debug,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    match cli.command {
        Commands::Start { host, port } => {
            // Create tokio runtime
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_server(host, port, cli.config.as_deref()))
        }
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("reelgate {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn validate_config(path: Option<&std::path::Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            println!("  Server: {}:{}", config.server.host, config.server.port);
            println!("  Base URL: {}", config.server.base_url());
            println!("  API key set: {}", config.server.api_key.is_some());
            println!("  Credentials: {}", config.telegram.tokens.len());
            println!(
                "  Chunk size: {} ({} prefetched)",
                reelgate_parser::format_size(config.stream.chunk_size),
                config.stream.prefetch_chunks
            );
            println!("  Restart marker: {:?}", config.restart.marker_path);
            if let Some(catalog) = &config.catalog.path {
                println!("  Catalog: {:?}", catalog);
            }
        }
        None => {
            println!("No config file specified, using defaults");
            let config = Config::default();
            println!("Default config:");
            println!("  Server: {}:{}", config.server.host, config.server.port);
        }
    }

    Ok(())
}
