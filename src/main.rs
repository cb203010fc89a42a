use axum::{routing::get, Router};
use boardb::{CaptureOptions, Monitor, MonitorConfig, MonitorError};
use clap::Parser;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod handlers;

use handlers::AppState;

/// Sample API instrumented with boardb, plus the metrics dashboard.
#[derive(Parser, Debug)]
#[command(name = "boardb-demo")]
struct Args {
    /// Interface both servers bind to.
    #[arg(long, env = "BOARDB_HOST", default_value = "127.0.0.1")]
    host: IpAddr,

    /// Port of the sample API.
    #[arg(long, env = "BOARDB_PORT", default_value_t = 3000)]
    port: u16,

    /// Port of the metrics dashboard.
    #[arg(long, env = "BOARDB_DASHBOARD_PORT", default_value_t = boardb::config::DEFAULT_DASHBOARD_PORT)]
    dashboard_port: u16,

    /// Number of request events kept in memory (minimum 100).
    #[arg(long, env = "BOARDB_CAPACITY", default_value_t = 1000)]
    capacity: usize,

    /// Path prefix that is not recorded. Repeatable.
    #[arg(long = "exclude", default_values_t = CaptureOptions::default().exclude_paths)]
    exclude_paths: Vec<String>,

    /// Record request bodies.
    #[arg(long)]
    include_body: bool,

    /// Record request headers.
    #[arg(long)]
    include_headers: bool,

    /// Directory served as the dashboard frontend.
    #[arg(long, env = "BOARDB_STATIC_DIR")]
    static_dir: Option<PathBuf>,

    /// Answer immediately instead of simulating handler latency.
    #[arg(long)]
    no_latency: bool,
}

fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::system::health))
        // ── Users ───────────────────────────────────────────────
        .route(
            "/api/users",
            get(handlers::users::list_users).post(handlers::users::create_user),
        )
        .route(
            "/api/users/:id",
            get(handlers::users::get_user)
                .put(handlers::users::update_user)
                .delete(handlers::users::delete_user),
        )
        // ── Posts ───────────────────────────────────────────────
        .route(
            "/api/posts",
            get(handlers::posts::list_posts).post(handlers::posts::create_post),
        )
        .route("/api/posts/:id", get(handlers::posts::get_post))
        // ── Diagnostics ─────────────────────────────────────────
        .route("/api/error", get(handlers::system::error))
        .route("/api/slow", get(handlers::system::slow))
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<(), MonitorError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    // ── 1. Monitor + dashboard ───────────────────────────────────
    let monitor = Monitor::new(MonitorConfig {
        capacity: args.capacity,
        dashboard_addr: SocketAddr::new(args.host, args.dashboard_port),
        static_dir: args.static_dir,
    });
    let dashboard_addr = monitor.start_dashboard().await?;

    // ── 2. Instrumented sample API ───────────────────────────────
    let state = Arc::new(AppState::seeded(!args.no_latency));
    let api = monitor.instrument(
        app(state),
        CaptureOptions {
            exclude_paths: args.exclude_paths,
            include_body: args.include_body,
            include_headers: args.include_headers,
        },
    );

    // ── 3. Bind & serve ──────────────────────────────────────────
    let listener = tokio::net::TcpListener::bind(SocketAddr::new(args.host, args.port)).await?;
    let api_addr = listener.local_addr()?;

    println!();
    println!("Sample API      → http://{api_addr}");
    println!("Dashboard       → http://{dashboard_addr}");
    println!("Summary JSON    → http://{dashboard_addr}/api/metrics/summary");
    println!("Metrics SSE     → http://{dashboard_addr}/api/metrics/stream");
    println!();
    println!("Try: GET /api/users, GET /api/users/:id, POST /api/users,");
    println!("     GET /api/posts, GET /api/error, GET /api/slow");
    println!();

    axum::serve(
        listener,
        api.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("cannot listen for ctrl-c: {e}");
        }
    })
    .await?;

    tracing::info!(
        captured = monitor.metrics().count(),
        "shutting down"
    );
    monitor.stop().await
}
