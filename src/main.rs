use std::net::SocketAddr;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use spark_workbench::api::AppState;
use spark_workbench::config::{ContextDefaults, JobServerConfig, WorkbenchConfig};
use spark_workbench::design::MemoryDesignStore;
use spark_workbench::jobserver::{JobServerApi, JobServerClient};
use spark_workbench::server::run_server;
use spark_workbench::shutdown::install_shutdown_handler;

#[derive(Parser, Debug)]
#[command(name = "spark-workbench")]
#[command(version)]
#[command(about = "Spark editor API backed by a Spark job server")]
#[command(propagate_version = true)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Start the editor API server
    Serve(ServeArgs),

    /// List application jars known to the job server
    Jars(ClientArgs),

    /// List running contexts
    Contexts(ClientArgs),
}

// =============================================================================
// Server Arguments
// =============================================================================

#[derive(Parser, Debug)]
struct ServeArgs {
    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(long, default_value = "8000")]
    port: u16,

    #[command(flatten)]
    job_server: JobServerArgs,

    /// Memory per node for contexts created without an explicit value
    #[arg(long, default_value = "512m")]
    default_mem_per_node: String,

    /// CPU cores for contexts created without an explicit value
    #[arg(long, default_value = "1")]
    default_num_cores: String,

    /// User assumed for requests without an X-Remote-User header.
    /// Without it such requests are rejected.
    #[arg(long)]
    default_user: Option<String>,
}

// =============================================================================
// Job Server Arguments (shared by all commands)
// =============================================================================

#[derive(Parser, Debug)]
struct JobServerArgs {
    /// Job server base URL
    #[arg(long, default_value = "http://localhost:8090")]
    job_server_url: String,

    /// Timeout for job server requests, in milliseconds
    #[arg(long, default_value = "30000")]
    timeout_ms: u64,

    /// Send the requesting user to the job server as `doAs`
    #[arg(long)]
    impersonate: bool,
}

impl JobServerArgs {
    fn to_config(&self) -> JobServerConfig {
        JobServerConfig {
            url: self.job_server_url.clone(),
            request_timeout_ms: self.timeout_ms,
            impersonation: self.impersonate,
        }
    }
}

#[derive(Parser, Debug)]
struct ClientArgs {
    #[command(flatten)]
    job_server: JobServerArgs,

    /// Act as this user (only sent with --impersonate)
    #[arg(long, short = 'u')]
    user: Option<String>,

    /// Output format
    #[arg(long, short = 'o', default_value = "table")]
    output: OutputFormat,
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Serialize)]
struct NameListOutput<'a> {
    kind: &'a str,
    names: &'a [String],
}

// =============================================================================
// Server Implementation
// =============================================================================

async fn serve(args: ServeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let listen_addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;

    let config = WorkbenchConfig {
        listen_addr,
        job_server: args.job_server.to_config(),
        contexts: ContextDefaults {
            mem_per_node: args.default_mem_per_node,
            num_cores: args.default_num_cores,
        },
        default_user: args.default_user,
    };

    let client = JobServerClient::new(&config.job_server)?;

    tracing::info!(
        listen_addr = %config.listen_addr,
        job_server = %client.base_url(),
        impersonation = config.job_server.impersonation,
        default_user = ?config.default_user,
        "Starting spark-workbench"
    );

    let state = AppState::new(Arc::new(client), Arc::new(MemoryDesignStore::new()))
        .with_context_defaults(config.contexts.clone())
        .with_default_user(config.default_user.clone());

    let shutdown = install_shutdown_handler();
    run_server(config.listen_addr, state, shutdown).await?;
    Ok(())
}

// =============================================================================
// Client Command Handlers
// =============================================================================

fn client_for(args: &ClientArgs) -> Result<JobServerClient, Box<dyn std::error::Error>> {
    let client = JobServerClient::new(&args.job_server.to_config())?;
    Ok(match &args.user {
        Some(user) => client.for_user(user),
        None => client,
    })
}

fn print_names(
    kind: &str,
    names: &[String],
    output: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    match output {
        OutputFormat::Json => {
            let out = NameListOutput { kind, names };
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        OutputFormat::Table => {
            if names.is_empty() {
                println!("No {} found.", kind);
            } else {
                println!("{}", kind.to_uppercase());
                println!("{}", "-".repeat(40));
                for name in names {
                    println!("{}", name);
                }
            }
        }
    }
    Ok(())
}

async fn handle_jars(args: ClientArgs) -> Result<(), Box<dyn std::error::Error>> {
    let client = client_for(&args)?;
    let jars = client.jars().await?;
    print_names("jars", &jars, &args.output)
}

async fn handle_contexts(args: ClientArgs) -> Result<(), Box<dyn std::error::Error>> {
    let client = client_for(&args)?;
    let contexts = client.contexts().await?;
    print_names("contexts", &contexts, &args.output)
}

// =============================================================================
// Main Entry Point
// =============================================================================

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    match args.command {
        Commands::Serve(serve_args) => serve(serve_args).await?,
        Commands::Jars(client_args) => handle_jars(client_args).await?,
        Commands::Contexts(client_args) => handle_contexts(client_args).await?,
    }

    Ok(())
}
