use anyhow::Context;
use axum::{
    routing::{get, post},
    Json, Router,
};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use gardem_api::auth::{Capability, Claims};
use gardem_api::database::Db;
use gardem_api::middleware::auth::jwt_auth;
use gardem_api::{auth, broker, config, handlers};

#[derive(Parser)]
#[command(name = "gardem-api", version, about = "Management backend for a gardem of productive plants")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve {
        /// Port to listen on, overriding GARDEM_API_PORT/PORT
        #[arg(short, long)]
        port: Option<u16>,
        /// Address to bind
        #[arg(long)]
        bind: Option<String>,
    },
    /// Mint a JWT for a principal with the given capability grants
    Token {
        #[arg(long)]
        user: String,
        /// Capability token, e.g. farm:create (repeatable)
        #[arg(long = "grant")]
        grants: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command.unwrap_or(Command::Serve {
        port: None,
        bind: None,
    }) {
        Command::Serve { port, bind } => serve(port, bind).await,
        Command::Token { user, grants } => mint_token(user, grants),
    }
}

async fn serve(port: Option<u16>, bind: Option<String>) -> anyhow::Result<()> {
    let config = config::config();
    tracing::info!("starting gardem-api in {:?} mode", config.environment);

    broker::setup();

    let db = Db::connect()?;
    if let Err(e) = db.migrate().await {
        tracing::warn!(
            "schema setup failed: {}; store operations will fail until the database is reachable",
            e
        );
    }

    let port = port.unwrap_or(config.api.port);
    let bind = bind.unwrap_or_else(|| config.api.bind.clone());
    let bind_addr = format!("{}:{}", bind, port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("gardem-api listening on http://{}", bind_addr);

    axum::serve(listener, app(db)).await.context("server")?;
    Ok(())
}

fn app(db: Db) -> Router {
    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(handlers::probe::health))
        // Everything under /v1 requires a resolved principal
        .nest("/v1", v1_routes())
        // Global middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(db)
}

fn v1_routes() -> Router<Db> {
    use handlers::{auth as auth_handlers, farm_notes, farms, gardens, seeds};

    Router::new()
        .route("/auth/who-are-you", get(auth_handlers::who_are_you))
        .route("/gardens", post(gardens::create).get(gardens::list))
        .route(
            "/gardens/:id",
            get(gardens::retrieve)
                .patch(gardens::partial_update)
                .put(gardens::upsert)
                .delete(gardens::delete),
        )
        .route("/seeds", post(seeds::create).get(seeds::list))
        .route(
            "/seeds/:id",
            get(seeds::retrieve)
                .patch(seeds::partial_update)
                .put(seeds::upsert)
                .delete(seeds::delete),
        )
        .route("/farms", post(farms::create).get(farms::list))
        .route(
            "/farms/:farm_id",
            get(farms::retrieve)
                .patch(farms::partial_update)
                .put(farms::upsert)
                .delete(farms::delete),
        )
        .route(
            "/farms/:farm_id/notes",
            post(farm_notes::create).get(farm_notes::list),
        )
        .route(
            "/farms/:farm_id/notes/:id",
            get(farm_notes::retrieve)
                .patch(farm_notes::partial_update)
                .put(farm_notes::upsert)
                .delete(farm_notes::delete),
        )
        .route_layer(axum::middleware::from_fn(jwt_auth))
}

async fn root() -> Json<Value> {
    Json(json!({
        "name": "Gardem API",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "management backend for a gardem of productive plants",
        "endpoints": {
            "probe": "/health (public)",
            "auth": "/v1/auth/who-are-you",
            "gardens": "/v1/gardens[/:id]",
            "seeds": "/v1/seeds[/:id]",
            "farms": "/v1/farms[/:id]",
            "notes": "/v1/farms/:farm_id/notes[/:id]",
        }
    }))
}

fn mint_token(user: String, grants: Vec<String>) -> anyhow::Result<()> {
    let capabilities = grants
        .iter()
        .map(|grant| grant.parse::<Capability>())
        .collect::<Result<Vec<_>, _>>()?;

    let claims = Claims::new(user, Uuid::new_v4(), &capabilities);
    let token = auth::issue_token(&claims).context("JWT_SECRET must be set to mint tokens")?;
    println!("{}", token);
    Ok(())
}
