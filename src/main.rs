use axum::{
    routing::{get, post},
    Router,
};
use assessment_backend::{
    config::{get_config, init_config},
    database::pool::create_pool,
    middleware::{auth::require_bearer_auth, rate_limit},
    routes, AppState,
};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    init_config()?;
    let config = get_config();

    let pool = create_pool().await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let app_state = AppState::new(pool);

    // Bulk expiry sweep; the on-access lazy check still guards every read.
    {
        let state = app_state.clone();
        let sweep_every = Duration::from_secs(config.expiry_sweep_seconds);
        tokio::spawn(async move {
            loop {
                match state.attempt_service.sweep_expired(100).await {
                    Ok(0) => {}
                    Ok(n) => info!(transitioned = n, "expired attempts auto-submitted"),
                    Err(e) => tracing::error!(error = ?e, "expiry sweep error"),
                }
                tokio::time::sleep(sweep_every).await;
            }
        });
    }

    let base_routes = Router::new().route("/health", get(routes::health::health));

    let admin_api = Router::new()
        .route(
            "/api/questions",
            get(routes::question_routes::list_questions)
                .post(routes::question_routes::create_question),
        )
        .route(
            "/api/questions/:id",
            get(routes::question_routes::get_question)
                .patch(routes::question_routes::update_question)
                .delete(routes::question_routes::delete_question),
        )
        .route(
            "/api/tests",
            get(routes::test_routes::list_tests).post(routes::test_routes::create_test),
        )
        .route(
            "/api/tests/:id",
            get(routes::test_routes::get_test)
                .patch(routes::test_routes::update_test)
                .delete(routes::test_routes::delete_test),
        )
        .route(
            "/api/groups",
            get(routes::group_routes::list_groups).post(routes::group_routes::create_group),
        )
        .route(
            "/api/groups/:id",
            get(routes::group_routes::get_group)
                .patch(routes::group_routes::update_group)
                .delete(routes::group_routes::delete_group),
        )
        .route(
            "/api/groups/:id/members",
            post(routes::group_routes::add_member),
        )
        .route(
            "/api/groups/:id/members/:user_id",
            axum::routing::delete(routes::group_routes::remove_member),
        )
        .route(
            "/api/assignments",
            get(routes::assignment_routes::list_assignments)
                .post(routes::assignment_routes::create_assignment),
        )
        .route(
            "/api/assignments/:id",
            get(routes::assignment_routes::get_assignment)
                .patch(routes::assignment_routes::update_assignment)
                .delete(routes::assignment_routes::delete_assignment),
        )
        .layer(axum::middleware::from_fn(require_bearer_auth))
        .layer(axum::middleware::from_fn_with_state(
            rate_limit::RequestBudget::new(config.api_rps),
            rate_limit::throttle_middleware,
        ));

    let take_api = Router::new()
        .route(
            "/api/assignments/eligible",
            get(routes::assignment_routes::list_eligible),
        )
        .route("/api/attempts/start", post(routes::attempt_routes::start_attempt))
        .route("/api/attempts/mine", get(routes::attempt_routes::my_attempts))
        .route("/api/attempts/:id", get(routes::attempt_routes::get_attempt))
        .route(
            "/api/attempts/:id/submit",
            post(routes::attempt_routes::submit_attempt),
        )
        .route(
            "/api/attempts/:id/violations",
            post(routes::attempt_routes::report_violation),
        )
        .layer(axum::middleware::from_fn(require_bearer_auth))
        .layer(axum::middleware::from_fn_with_state(
            rate_limit::RequestBudget::new(config.take_rps),
            rate_limit::throttle_middleware,
        ));

    let review_api = Router::new()
        .route(
            "/api/evaluation/pending",
            get(routes::evaluation_routes::pending_evaluation),
        )
        .route(
            "/api/evaluation/attempts/:id",
            get(routes::evaluation_routes::get_attempt_for_evaluation)
                .post(routes::evaluation_routes::evaluate_attempt),
        )
        .route(
            "/api/reports/tests/:id/attempts",
            get(routes::evaluation_routes::test_report),
        )
        .route(
            "/api/audit/:entity_type/:entity_id",
            get(routes::audit_routes::entity_audit_trail),
        )
        .layer(axum::middleware::from_fn(require_bearer_auth))
        .layer(axum::middleware::from_fn_with_state(
            rate_limit::RequestBudget::new(config.api_rps),
            rate_limit::throttle_middleware,
        ));

    let app = base_routes
        .merge(admin_api)
        .merge(take_api)
        .merge(review_api)
        .with_state(app_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
