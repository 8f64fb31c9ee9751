// src/routes.rs

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{delete, get, post, put},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::{
    config::MAX_MEDIA_BYTES,
    handlers::{admin, assessment, auth, media, quiz, session},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, quizzes, sessions, admin).
/// * Serves uploaded media from `config.media_dir` under `/media`.
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (stores, identity provider, config).
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin([
            HeaderValue::from_static("http://localhost:3000"),
            HeaderValue::from_static("http://127.0.0.1:3000"),
            HeaderValue::from_static("http://localhost:8081"),
        ])
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let require_auth = middleware::from_fn_with_state(state.clone(), auth_middleware);

    let auth_routes = Router::new().route("/login", post(auth::login)).merge(
        Router::new()
            .route("/logout", post(auth::logout))
            .route_layer(require_auth.clone()),
    );

    let me_routes = Router::new()
        .route("/", get(auth::get_me))
        .route("/preferences", put(auth::update_preferences))
        .route("/stream", get(auth::stream_me))
        .route_layer(require_auth.clone());

    let quiz_routes = Router::new()
        .route("/", get(quiz::list_quizzes))
        .route("/stream", get(quiz::stream_quizzes))
        .route("/{id}", get(quiz::get_quiz))
        // Protected quiz routes
        .merge(
            Router::new()
                .route("/{id}/attempts", post(quiz::submit_attempt))
                .route_layer(require_auth.clone()),
        );

    let learner_routes = Router::new()
        .route("/attempts", get(quiz::list_my_attempts))
        .route("/assessments", get(assessment::get_pre_assessment_status))
        .route("/topics/{topic}/unlock", get(assessment::get_topic_unlock))
        .route("/certificate", get(assessment::get_certificate))
        .route(
            "/sessions/{topic}",
            get(session::get_active_session).post(session::create_session),
        )
        .route("/sessions/{topic}/advance", post(session::advance_session))
        .route("/sessions/{topic}/restart", post(session::restart_session))
        .route("/sessions/{topic}/history", get(session::get_session_history))
        .route_layer(require_auth.clone());

    let admin_routes = Router::new()
        .route("/quizzes", post(admin::create_quiz))
        .route("/topics/{topic}/quizzes", put(admin::assign_topic_quizzes))
        .route(
            "/media",
            post(media::upload_media).layer(DefaultBodyLimit::max(MAX_MEDIA_BYTES)),
        )
        .route("/media/{name}", delete(media::delete_media))
        // Double middleware protection: Auth first, then Admin check
        .route_layer(middleware::from_fn(admin_middleware))
        .route_layer(require_auth);

    let media_files = ServeDir::new(&state.config.media_dir);

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/me", me_routes)
        .nest("/api/quizzes", quiz_routes)
        .nest("/api/admin", admin_routes)
        .nest("/api", learner_routes)
        .nest_service("/media", media_files)
        // Global Middleware (applied from outside in)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
