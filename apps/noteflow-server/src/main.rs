//! noteflow server
//!
//! Backend of the document-workflow portal. Exposes REST endpoints over the
//! core flows:
//!
//! - Session issuance against the workflow engine (with TTL caching)
//! - Document republish (checkout/checkin with annotation preservation)
//! - PDF note creation (render + publish + View hyperlink annotations)
//! - Annotation listing
//!
//! Everything stateful lives upstream in the document store and workflow
//! engine; this process only caches sessions.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use clap::Parser;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use docstore_client::{
    DocStoreConfig, HttpDocumentStore, HttpWorkflowEngine, SessionCache, WorkflowConfig,
};
use noteflow_core::{NoteBuilder, NoteBuilderConfig, Orchestrator};

mod api;
mod error;

use api::{
    handle_create_note, handle_get_annotations, handle_health, handle_login, handle_logout,
    handle_republish,
};

/// Command-line arguments for the noteflow server
#[derive(Parser, Debug)]
#[command(name = "noteflow-server")]
#[command(about = "Document-workflow portal backend")]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Document store execute-API endpoint
    #[arg(long, default_value = "http://localhost:8601/docstore/executeApi")]
    docstore_url: String,

    /// Document store download endpoint
    #[arg(long, default_value = "http://localhost:8601/docstore/getDocumentStream")]
    document_url: String,

    /// Workflow engine base URL
    #[arg(long, default_value = "http://localhost:8602/workflow")]
    workflow_url: String,

    /// Cabinet (tenant) name
    #[arg(long, default_value = "mainline")]
    cabinet: String,

    /// Directory for rendered notes and annotation backups
    #[arg(long, default_value = "./tmp/noteflow")]
    scratch_dir: PathBuf,

    /// Base URL generated View hyperlinks point at
    #[arg(long, default_value = "http://localhost:8080/docs/viewer")]
    viewer_base_url: String,

    /// Upstream connect timeout in seconds
    #[arg(long, default_value = "10")]
    connect_timeout_secs: u64,

    /// Upstream read timeout in seconds
    #[arg(long, default_value = "30")]
    read_timeout_secs: u64,

    /// Note render timeout in milliseconds
    #[arg(long, default_value = "30000")]
    render_timeout_ms: u64,

    /// Session cache TTL in minutes
    #[arg(long, default_value = "25")]
    session_ttl_minutes: i64,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Everything the handlers share.
pub struct ServerContext {
    pub store: HttpDocumentStore,
    pub engine: HttpWorkflowEngine,
    pub sessions: SessionCache<HttpWorkflowEngine>,
    pub orchestrator: Orchestrator,
    pub builder: NoteBuilder,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub inner: Arc<ServerContext>,
}

fn workflow_config(args: &Args) -> WorkflowConfig {
    WorkflowConfig {
        connect_url: format!("{}/connect", args.workflow_url),
        disconnect_url: format!("{}/disconnect", args.workflow_url),
        attributes_url: format!("{}/fetchWorkItemAttributes", args.workflow_url),
        engine: args.cabinet.clone(),
        connect_timeout: Duration::from_secs(args.connect_timeout_secs),
        read_timeout: Duration::from_secs(args.read_timeout_secs),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting noteflow server on {}:{}", args.host, args.port);

    let store_config = DocStoreConfig {
        api_url: args.docstore_url.clone(),
        checkin_url: None,
        document_url: args.document_url.clone(),
        cabinet: args.cabinet.clone(),
        connect_timeout: Duration::from_secs(args.connect_timeout_secs),
        read_timeout: Duration::from_secs(args.read_timeout_secs),
        ..DocStoreConfig::default()
    };

    let store = HttpDocumentStore::new(store_config)?;
    let engine = HttpWorkflowEngine::new(workflow_config(&args))?;
    let sessions = SessionCache::new(
        HttpWorkflowEngine::new(workflow_config(&args))?,
        chrono::Duration::minutes(args.session_ttl_minutes),
    );

    let orchestrator = Orchestrator::new(args.scratch_dir.join("annotations"));
    let builder = NoteBuilder::new(NoteBuilderConfig {
        scratch_dir: args.scratch_dir.join("notes"),
        viewer_base_url: args.viewer_base_url.clone(),
        render_timeout_ms: args.render_timeout_ms,
        ..NoteBuilderConfig::default()
    });

    let state = AppState {
        inner: Arc::new(ServerContext {
            store,
            engine,
            sessions,
            orchestrator,
            builder,
        }),
    };

    // Configure CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build router
    let app = router(state).layer(cors);

    // Start server
    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("Server listening on http://{}", addr);
    info!("Document store: {}", args.docstore_url);
    info!("Workflow engine: {}", args.workflow_url);

    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handle_health))
        // API endpoints
        .route("/api/login", post(handle_login))
        .route("/api/logout", post(handle_logout))
        .route("/api/notes", post(handle_create_note))
        .route("/api/documents/:id/republish", post(handle_republish))
        .route("/api/documents/:id/annotations", get(handle_get_annotations))
        .with_state(state)
}
