use clap::{Parser, Subcommand};
use radius_bridge::{
    AuditLogger, Bridge, Config, ConfigError, ConfigOverrides, HookServer, RadiusHook, Rcode,
    ServerConfig,
};
use radius_proto::AttributeList;
use std::net::SocketAddr;
use std::process;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// FreeRADIUS identity bridge - rlm_rest hook backed by an HTTP identity service
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "radius-bridge")]
struct Cli {
    /// Path to configuration file
    #[arg(value_name = "CONFIG", default_value = "config.json", env = "RADIUS_BRIDGE_CONFIG")]
    config_path: String,

    /// Validate configuration and exit (doesn't start server)
    #[arg(long)]
    validate: bool,

    /// Identity backend base URL (overrides backend.url)
    #[arg(long, env = "RADIUS_BRIDGE_BACKEND_URL")]
    backend_url: Option<String>,

    /// Identity backend bearer token (overrides backend.token)
    #[arg(long, env = "RADIUS_BRIDGE_BACKEND_TOKEN", hide_env_values = true)]
    backend_token: Option<String>,

    /// Hook listen address, e.g. 127.0.0.1:8180
    #[arg(long, env = "RADIUS_BRIDGE_LISTEN")]
    listen: Option<SocketAddr>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one PAP authentication through the bridge and print the result
    ///
    /// Exit status: 0 accept, 1 reject, 2 backend failure.
    Check {
        #[arg(long)]
        username: String,
        /// Password to check; prefer the environment variable, argv is
        /// visible to other local users
        #[arg(long, env = "RADIUS_BRIDGE_CHECK_PASSWORD", hide_env_values = true)]
        password: String,
    },
}

fn init_tracing(default_level: &str) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let overrides = ConfigOverrides {
        backend_url: cli.backend_url.clone(),
        backend_token: cli.backend_token.clone(),
        listen: cli.listen,
    };

    // Load configuration before logging is set up; its log level decides the filter
    let mut config = match Config::from_file(&cli.config_path) {
        Ok(cfg) => cfg,
        Err(ConfigError::Io(ref e))
            if e.kind() == std::io::ErrorKind::NotFound && overrides.backend_url.is_some() =>
        {
            Config::default()
        }
        Err(e) => {
            init_tracing("info");

            if cli.validate {
                eprintln!("Configuration validation failed!");
                eprintln!("   Error: {}", e);
                process::exit(1);
            }

            match e {
                ConfigError::Io(ref io) if io.kind() == std::io::ErrorKind::NotFound => {
                    warn!("Could not load config file from: {}", cli.config_path);
                    info!("Creating example configuration at: {}", cli.config_path);

                    if let Err(e) = Config::example().to_file(&cli.config_path) {
                        error!("Error creating example config: {}", e);
                        process::exit(1);
                    }

                    info!("Please edit {} and restart the bridge", cli.config_path);
                    process::exit(0);
                }
                e => {
                    error!("Invalid configuration {}: {}", cli.config_path, e);
                    process::exit(1);
                }
            }
        }
    };

    config.apply_overrides(overrides);
    if let Err(e) = config.validate() {
        init_tracing("info");
        if cli.validate {
            eprintln!("Configuration validation failed!");
            eprintln!("   Error: {}", e);
        } else {
            error!("Invalid configuration: {}", e);
        }
        process::exit(1);
    }

    if cli.validate {
        print_summary(&cli.config_path, &config);
        process::exit(0);
    }

    init_tracing(config.log_level.as_deref().unwrap_or("info"));

    if let Some(Command::Check { username, password }) = cli.command {
        process::exit(run_check(&config, &username, &password).await);
    }

    info!("radius-bridge v{}", env!("CARGO_PKG_VERSION"));
    info!("Loaded configuration from: {}", cli.config_path);
    info!("Identity backend: {:?} at {}", config.backend.kind, config.backend.url);

    if config.allowed_clients.is_empty() {
        warn!("No allowed_clients configured, the hook accepts calls from ANY address");
    }
    if let Some(ref path) = config.audit_log_path {
        info!("Audit logging enabled: {}", path);
    }

    let server_config = match ServerConfig::from_config(&config) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            process::exit(1);
        }
    };

    let server = match HookServer::new(server_config).await {
        Ok(srv) => srv,
        Err(e) => {
            error!("Failed to start hook server: {}", e);
            process::exit(1);
        }
    };

    info!("Press Ctrl+C to stop");

    if let Err(e) = server.run().await {
        error!("Server error: {}", e);
        process::exit(1);
    }
}

fn print_summary(path: &str, config: &Config) {
    println!("Configuration validated successfully: {}", path);
    println!();
    println!("Configuration summary:");
    println!("  Listen: {}:{}", config.listen_address, config.listen_port);
    println!("  Backend: {:?} at {}", config.backend.kind, config.backend.url);
    println!(
        "  Backend timeout: {}ms, retries: {}",
        config.backend.timeout_ms, config.backend.max_retries
    );
    println!("  Backend token: {}", if config.backend.token.is_some() { "set" } else { "not set" });
    println!("  Auth-Type: {}", config.auth_type);
    println!("  Log level: {}", config.log_level.as_deref().unwrap_or("info"));
    if let Some(ref path) = config.audit_log_path {
        println!("  Audit log: {}", path);
    }
    if !config.required_groups.is_empty() {
        println!("  Required groups: {}", config.required_groups.join(", "));
    }
    println!();

    if config.allowed_clients.is_empty() {
        println!("WARNING: No allowed_clients configured!");
    } else {
        println!("Allowed clients:");
        for client in &config.allowed_clients {
            println!("  {}", client);
        }
    }
}

async fn run_check(config: &Config, username: &str, password: &str) -> i32 {
    let bridge = match Bridge::from_config(config, Arc::new(AuditLogger::disabled())) {
        Ok(bridge) => bridge,
        Err(e) => {
            error!("Failed to set up identity backend: {}", e);
            return 2;
        }
    };

    let mut request = AttributeList::new();
    request.push("User-Name", username);
    request.push("User-Password", password);

    let response = bridge.authenticate(&request).await;
    let (decision, code) = match response.rcode {
        Rcode::Ok | Rcode::Updated => ("Access-Accept", 0),
        Rcode::Reject | Rcode::NotFound => ("Access-Reject", 1),
        Rcode::Fail | Rcode::Noop => ("Access-Reject (backend failure)", 2),
    };

    println!("{}", decision);
    for pair in &response.reply {
        println!("  {} = {}", pair.name, pair.value);
    }
    code
}
