//! # Stratflow server binary
//!
//! ## Environment Variables
//!
//! | Variable                 | Default          | Description                         |
//! |--------------------------|------------------|-------------------------------------|
//! | `BIND_ADDR`              | `0.0.0.0:3000`   | Address Axum listens on             |
//! | `APP_ENV`                | `development`    | `production` disables mock fallbacks|
//! | `SUPABASE_URL`           | —                | Supabase project URL                |
//! | `SUPABASE_ANON_KEY`      | —                | Supabase anon key                   |
//! | `REGISTRATION_API_URL`   | —                | Registration service base URL       |
//! | `REGISTRATION_CLIENT_ID` | —                | Sent as `x-client-id`               |
//! | `HISTORY_LIMIT`          | `100`            | Undo steps kept per editor          |
//! | `RUST_LOG`               | `stratflow=debug`| Tracing filter                      |

use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use stratflow::{build_router, config::AppConfig, state::build_state};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Load .env ──────────────────────────────────────────────────────────
    dotenvy::dotenv().ok();

    // ── 2. Structured logging ─────────────────────────────────────────────────
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::from_default_env()
                .add_directive("stratflow=debug".parse()?)
                .add_directive("tower_http=info".parse()?),
        )
        .init();

    info!(r#"

  ╔═══════════════════════════════════════════════════════╗
  ║           STRATFLOW — Strategy Editor Backend         ║
  ║  Graph · History · Strategies · Auth · Live events    ║
  ╚═══════════════════════════════════════════════════════╝"#);

    // ── 3. Config & shared state ──────────────────────────────────────────────
    let config = AppConfig::from_env()?;
    let addr = config.bind_addr;
    info!(
        environment = %config.environment,
        supabase    = config.supabase.is_some(),
        history     = config.editor.history_limit,
        "⚙️ configuration loaded"
    );
    let state = build_state(config);
    info!(store = state.store.backend_name(), "💾 strategy store ready");

    // ── 4. Router ─────────────────────────────────────────────────────────────
    let app = build_router(state);

    // ── 5. Bind & Serve ───────────────────────────────────────────────────────
    info!(?addr, "🚀 Stratflow server starting");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
