use anyhow::Result;
use clap::{Parser, Subcommand};
use registry_authorizer::{AuthDecision, Credentials, Whitelist, create_authorizer, load_config};
use std::path::PathBuf;
use tracing::{Level, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "registry-authorizer")]
#[command(about = "OAuth2 bearer token authorizer for a package registry")]
struct Cli {
    /// Path to the JSON config file (defaults to $AUTHORIZER_CONFIG or ./authorizer.json)
    #[arg(long, global = true, env = "AUTHORIZER_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve authorization decisions over HTTP
    Serve {
        /// Bind address, e.g. 0.0.0.0:8090
        #[arg(long, default_value = "127.0.0.1:8090")]
        bind: String,
    },
    /// Print the loaded user whitelist
    Whitelist {
        /// Override the configured whitelist path
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Run a single authorization decision for a session token
    Authorize {
        #[arg(long)]
        token: String,
        /// Skip the whitelist gate (handshake identity lookup)
        #[arg(long, default_value_t = false)]
        identify: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("registry_authorizer=info".parse()?)
                .add_directive("fred=warn".parse()?),
        )
        .with_max_level(Level::INFO)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config)?;

    match cli.command {
        Commands::Serve { bind } => {
            let authorizer = create_authorizer(&config).await?;
            let app = registry_authorizer::api::create_router(authorizer.clone());

            let listener = tokio::net::TcpListener::bind(&bind).await?;
            info!("Authorizer listening on http://{}", bind);

            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = tokio::signal::ctrl_c().await;
                    info!("Shutdown signal received, draining");
                })
                .await?;

            authorizer.shutdown().await;
        }
        Commands::Whitelist { path } => {
            let path = path.unwrap_or(config.user_whitelist_path);
            let whitelist = Whitelist::try_load(&path)?;

            println!("{} ({} entries)", path.display(), whitelist.len());
            for entry in whitelist.entries() {
                println!("  {}", entry);
            }
        }
        Commands::Authorize { token, identify } => {
            let authorizer = create_authorizer(&config).await?;
            let credentials = Credentials::with_authorization(format!("Bearer {}", token));

            let result = if identify {
                authorizer.identify(&credentials).await
            } else {
                authorizer.authorize(&credentials).await
            };
            authorizer.shutdown().await;

            match result {
                Ok(AuthDecision::Allowed(user)) => {
                    println!("allowed: {}", user.email);
                }
                Ok(AuthDecision::Redirect(url)) => {
                    println!("re-authenticate at: {}", url);
                }
                Err(e) => {
                    println!("denied ({}): {}", e.status_code(), e);
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}
