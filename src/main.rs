mod cli;

use discprobe::{config, report, tools};

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use std::path::Path;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "discprobe=trace,tower_http=debug".to_string()
        } else {
            "discprobe=debug,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    match cli.command {
        Commands::Start { host, port } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_server(host, port, cli.config.as_deref()))
        }
        Commands::Info { input } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(info_report(&input, cli.config.as_deref()))
        }
        Commands::Shots { input, out } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(capture_shots(&input, &out, cli.config.as_deref()))
        }
        Commands::CheckTools => check_tools(cli.config.as_deref()),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("discprobe {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

async fn start_server(host: Option<String>, port: Option<u16>, config_path: Option<&Path>) -> Result<()> {
    let mut config = config::load_config_or_default(config_path)?;

    // Override host/port from CLI if specified
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    tracing::info!(
        "Starting discprobe server on {}:{}",
        config.server.host,
        config.server.port
    );

    discprobe::server::start_server(config).await
}

async fn info_report(input: &Path, config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let registry = tools::ToolRegistry::discover(&config.tools);

    let output = report::mediainfo_report(
        &registry,
        input,
        config.limits.candidate_limit,
        config.limits.request_timeout(),
    )
    .await?;

    println!("{}", output);
    Ok(())
}

async fn capture_shots(input: &Path, out: &Path, config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let registry = tools::ToolRegistry::discover(&config.tools);

    tokio::fs::create_dir_all(out).await?;
    let files = report::capture_set(&registry, input, out, config.limits.request_timeout()).await?;

    for file in &files {
        println!("{}", file.display());
    }
    println!("\nCaptured {} screenshots into {:?}", files.len(), out);
    Ok(())
}

fn check_tools(config_path: Option<&Path>) -> Result<()> {
    println!("Checking external tools...\n");

    let config = config::load_config_or_default(config_path)?;
    let registry = tools::ToolRegistry::discover(&config.tools);

    let infos = registry.check_all();
    let mut all_ok = true;

    for tool in &infos {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({})", version);
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
        Ok(())
    } else {
        anyhow::bail!("some required tools are missing")
    }
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            println!("  Server: {}:{}", config.server.host, config.server.port);
            println!("  Auth enabled: {}", config.server.password.is_some());
            println!("  Media root: {:?}", config.media.root);
            println!("  Request timeout: {}s", config.limits.request_timeout_secs);
            println!("  Candidate limit: {}", config.limits.candidate_limit);
        }
        None => {
            println!("No config file specified, using defaults");
            let config = config::Config::default();
            println!("Default config:");
            println!("  Server: {}:{}", config.server.host, config.server.port);
            println!("  Media root: {:?}", config.media.root);
        }
    }

    Ok(())
}
