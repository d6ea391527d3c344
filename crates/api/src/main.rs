use stockroom_api::app::services::AppServices;
use stockroom_infra::RetryPolicy;
use stockroom_reporting::ReportClock;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    stockroom_observability::init();

    let clock = match std::env::var("REPORT_UTC_OFFSET") {
        Ok(raw) => ReportClock::parse(&raw).unwrap_or_else(|| {
            tracing::warn!(offset = %raw, "unparsable REPORT_UTC_OFFSET; using +07:00");
            ReportClock::default()
        }),
        Err(_) => ReportClock::default(),
    };

    let mut retry = RetryPolicy::default();
    if let Ok(raw) = std::env::var("PLACEMENT_RETRY_MAX") {
        match raw.parse::<u32>() {
            Ok(max_attempts) if max_attempts >= 1 => retry.max_attempts = max_attempts,
            _ => tracing::warn!(value = %raw, "ignoring invalid PLACEMENT_RETRY_MAX"),
        }
    }

    let services = match std::env::var("DATABASE_URL") {
        Ok(url) => {
            let pool = sqlx::PgPool::connect(&url).await?;
            AppServices::postgres(pool, clock, retry).await?
        }
        Err(_) => {
            tracing::warn!("DATABASE_URL not set; using volatile in-memory store");
            AppServices::in_memory(clock, retry)
        }
    };

    let app = stockroom_api::app::build_router(services);

    let bind_addr =
        std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
