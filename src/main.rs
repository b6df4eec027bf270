//! web-dispatch
//!
//! Inspects and exercises the embedded web server dispatcher offline.
//!
//! ```text
//! web-dispatch --config web.toml routes
//! web-dispatch --config web.toml replay request.http --client 127.0.0.1:50000
//! ```
//!
//! `routes` prints every configured plugin and the patterns it serves.
//! `replay` feeds a captured request (plus any pipelined tail) through one
//! connection handler and writes the queued response bytes to stdout.

use std::io::Write;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use web_dispatch::config::{load_config, WebServerConfig};
use web_dispatch::http::{HttpParser, RequestDisposition};
use web_dispatch::net::{ClientConnection, ConnectionId, UpstreamPool};
use web_dispatch::observability::logging::init_logging;
use web_dispatch::observability::EventQueue;
use web_dispatch::plugin::builtin_catalog;
use web_dispatch::routing::ProtocolKind;
use web_dispatch::{HttpWebServer, PluginContext};

#[derive(Parser)]
#[command(name = "web-dispatch")]
#[command(about = "Embedded web server dispatcher", long_about = None)]
struct Cli {
    /// TOML configuration file; defaults apply when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print configured plugins and their routes
    Routes,
    /// Dispatch a captured raw request and print the response
    Replay {
        /// File holding the raw request bytes
        request: PathBuf,
        /// Client address reported in the access log
        #[arg(long)]
        client: Option<SocketAddr>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => WebServerConfig::default(),
    };
    init_logging(&config.logging)?;

    tracing::info!(
        plugins = ?config.plugins,
        static_server = config.static_server.enabled,
        encryption = config.encryption_enabled(),
        "Configuration loaded"
    );

    let config = Arc::new(config);
    match cli.command {
        Commands::Routes => print_routes(config)?,
        Commands::Replay { request, client } => replay(config, &request, client).await?,
    }
    Ok(())
}

fn context(
    config: Arc<WebServerConfig>,
    client: ClientConnection,
    events: Option<EventQueue>,
) -> PluginContext {
    PluginContext {
        uid: ConnectionId::new(),
        config,
        client,
        event_queue: events,
        upstream_pool: Some(UpstreamPool::default()),
    }
}

fn print_routes(config: Arc<WebServerConfig>) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = builtin_catalog();
    let server = HttpWebServer::new(&catalog, context(config, ClientConnection::new(None), None))?;

    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "available plugins: {}", catalog.names().join(", "))?;
    for name in server.plugins().names() {
        writeln!(stdout, "{name}")?;
    }
    for kind in [ProtocolKind::PlainHttp, ProtocolKind::EncryptedHttp, ProtocolKind::WebSocket] {
        for route in server.routes().routes(kind) {
            let owner = server.plugins().instance(route.plugin).name();
            writeln!(
                stdout,
                "  {:<9} {:<30} -> {owner}",
                kind.to_string(),
                route.pattern.as_str()
            )?;
        }
    }
    Ok(())
}

async fn replay(
    config: Arc<WebServerConfig>,
    request: &std::path::Path,
    addr: Option<SocketAddr>,
) -> Result<(), Box<dyn std::error::Error>> {
    let raw = std::fs::read(request)?;
    let (events, mut receiver) = EventQueue::channel();
    let client = ClientConnection::new(addr);
    let mut server = HttpWebServer::new(
        &builtin_catalog(),
        context(config, client.clone(), Some(events)),
    )?;

    let mut parser = HttpParser::new();
    let tail = parser.parse(&raw)?;
    let Some(first) = parser.into_request() else {
        return Err("request file holds an incomplete request".into());
    };

    let disposition = server.on_request_complete(first)?;
    if disposition == RequestDisposition::KeepOpen && !tail.is_empty() {
        if let Err(e) = server.on_client_data(tail) {
            tracing::warn!(error = %e, "Connection would be torn down");
        }
    }

    let response = server.on_response_chunk(client.take_buffer());
    let mut stdout = std::io::stdout().lock();
    for chunk in &response {
        stdout.write_all(chunk)?;
    }
    stdout.flush()?;

    if let Some(line) = server.on_client_connection_close() {
        eprintln!("{line}");
    }

    // Drop the handler so the queue closes once drained.
    drop(server);
    while let Some(event) = receiver.recv().await {
        eprintln!("{}", serde_json::to_string(&event)?);
    }
    Ok(())
}
