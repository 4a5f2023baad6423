use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use triage_core::config::{
    back_policy_from_env_value, max_sessions_from_env_value, path_from_env_value,
    resolve_question_graph, resolve_scoring_rules, seed_from_env_value,
    session_ttl_from_env_value,
};
use triage_core::{CoreConfig, SessionLimits};

/// Main entry point for the triage service
///
/// Serves the questionnaire REST API, with Swagger UI at `/swagger-ui`.
///
/// # Environment Variables
/// - `TRIAGE_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `TRIAGE_QUESTION_GRAPH`: question graph YAML replacing the built-in catalog
/// - `TRIAGE_SCORING_RULES`: scoring rules YAML replacing the built-in rules
/// - `TRIAGE_BACK_POLICY`: `keep` (default) or `retract`
/// - `TRIAGE_SEED`: fixed scoring seed for every session; random per session if unset
/// - `TRIAGE_MAX_SESSIONS`: sessions hosted at once (default: 10000)
/// - `TRIAGE_SESSION_TTL_SECS`: idle seconds before a session is discarded (default: 3600)
///
/// Configuration is resolved once here; invalid values stop startup.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive("triage=info".parse()?))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var("TRIAGE_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    let graph = resolve_question_graph(path_from_env_value(
        std::env::var("TRIAGE_QUESTION_GRAPH").ok(),
    ))?;
    let rules = resolve_scoring_rules(path_from_env_value(
        std::env::var("TRIAGE_SCORING_RULES").ok(),
    ))?;
    let back_policy = back_policy_from_env_value(std::env::var("TRIAGE_BACK_POLICY").ok())?;
    let seed = seed_from_env_value(std::env::var("TRIAGE_SEED").ok())?;

    let session_limits = SessionLimits {
        max_sessions: max_sessions_from_env_value(std::env::var("TRIAGE_MAX_SESSIONS").ok())?,
        idle_ttl: session_ttl_from_env_value(std::env::var("TRIAGE_SESSION_TTL_SECS").ok())?,
    };

    let cfg = CoreConfig::new(graph, rules, back_policy, seed)?.with_session_limits(session_limits);
    tracing::info!(
        questions = cfg.question_graph().len(),
        ?back_policy,
        fixed_seed = seed.is_some(),
        max_sessions = session_limits.max_sessions,
        idle_ttl_secs = session_limits.idle_ttl.as_secs(),
        "configuration loaded"
    );

    tracing::info!("++ Starting triage REST on {}", rest_addr);

    let app = api_rest::router(api_rest::AppState::new(cfg));
    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("shutting down");
        })
        .await?;

    Ok(())
}
