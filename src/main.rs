mod cli;

use streamgate::{
    config::{self, Config},
    server,
    streaming::{RegistryOptions, StreamRegistry},
};
use streamgate_av::{check_tools, resolve_ffmpeg, FfmpegLauncher};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::path::Path;
use std::sync::Arc;

/// Resolve the effective configuration: file, then environment, then CLI.
fn effective_config(
    config_path: Option<&Path>,
    host: Option<String>,
    port: Option<u16>,
) -> Result<Config> {
    let mut config = config::load_config_or_default(config_path)?;
    config::apply_env_overrides(&mut config);

    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    config::validate_config(&config)?;
    Ok(config)
}

async fn start_server(
    host: Option<String>,
    port: Option<u16>,
    config_path: Option<&Path>,
) -> Result<()> {
    let config = effective_config(config_path, host, port)?;

    tracing::info!("Starting Streamgate server");
    tracing::info!(
        "Server will listen on {}:{}",
        config.server.host,
        config.server.port
    );

    std::fs::create_dir_all(&config.streams.dir).with_context(|| {
        format!(
            "Failed to create stream directory: {:?}",
            config.streams.dir
        )
    })?;
    tracing::info!("Writing streams to {:?}", config.streams.dir);

    let ffmpeg = resolve_ffmpeg(config.tools.ffmpeg_path.as_deref());
    if ffmpeg.as_os_str() == "ffmpeg" {
        tracing::warn!("ffmpeg not found; stream starts will fail until it is installed");
    }

    let launcher = FfmpegLauncher::new(
        ffmpeg,
        (&config.hls).into(),
        &config.streams.public_path,
    );
    let registry = StreamRegistry::new(Arc::new(launcher), RegistryOptions::from(&config));

    let result = server::start_server(config, registry).await;
    tracing::info!("Shutting down...");
    result
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "streamgate=trace,streamgate_av=trace,streamgate_common=debug,tower_http=debug"
                .to_string()
        } else {
            "streamgate=debug,streamgate_av=debug,tower_http=info".to_string()
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
        Commands::CheckTools => check_tools_cmd(cli.config.as_deref()),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("streamgate {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn check_tools_cmd(config_path: Option<&Path>) -> Result<()> {
    println!("Checking external tools...\n");

    let config = config::load_config_or_default(config_path)?;
    let tools = check_tools(config.tools.ffmpeg_path.as_deref());
    let mut all_ok = true;

    for tool in &tools {
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
    } else {
        println!("ffmpeg is missing. Install it before starting streams.");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    match path {
        Some(p) => println!("Validating config: {:?}", p),
        None => println!("No config file specified, checking default locations"),
    }

    let config = effective_config(path, None, None)?;

    println!("✓ Configuration is valid");
    println!("  Server: {}:{}", config.server.host, config.server.port);
    println!("  CORS: {}", config.server.cors);
    println!(
        "  Streams: {:?} served at {}",
        config.streams.dir, config.streams.public_path
    );
    println!(
        "  Idle timeout: {}s (sweep every {}s)",
        config.streams.idle_timeout_secs, config.streams.sweep_interval_secs
    );
    println!(
        "  HLS: {}s segments, {} in playlist, {} / {}",
        config.hls.segment_time, config.hls.list_size, config.hls.video_codec, config.hls.preset
    );

    Ok(())
}
