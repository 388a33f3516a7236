use axum::{
    http::{header, Method},
    middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod metrics;
pub mod middlewares;
pub mod models;
pub mod repository;
pub mod services;
pub mod store;
pub mod utils;

pub use config::Config;
pub use services::AppState;

use handlers::crud;
use models::{badge::Badge, module::Module, progress_log::ProgressLog, quest::Quest, quiz::Quiz};

pub fn create_router(app_state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_origin(tower_http::cors::Any);

    Router::new()
        // Public endpoints (no auth required)
        .route("/health", get(handlers::health_check))
        .route(
            "/metrics",
            get(handlers::metrics_handler).layer(middleware::from_fn_with_state(
                app_state.clone(),
                handlers::metrics_auth_middleware,
            )),
        )
        .route("/auth/login", post(handlers::auth::login))
        .route("/user", post(handlers::users::create_user))
        .route("/user/leaderboard", get(handlers::users::leaderboard))
        // Protected endpoints (require a verified bearer token)
        .merge(protected_routes(app_state.clone()))
        // Catalog writes (require an admin token)
        .merge(admin_routes(app_state.clone()))
        .with_state(app_state)
        .layer(cors)
        .layer(middleware::from_fn(
            middlewares::metrics::metrics_middleware,
        ))
        .layer(middleware::from_fn(middlewares::trace::request_id_middleware))
        .layer(TraceLayer::new_for_http())
}

fn protected_routes(app_state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .merge(user_routes())
        .merge(module_routes())
        .merge(quiz_routes())
        .merge(badge_routes())
        .merge(quest_routes())
        .merge(progress_routes())
        .route_layer(middleware::from_fn_with_state(
            app_state,
            middlewares::auth::auth_middleware,
        ))
}

fn user_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/user/profile/{id}",
            get(handlers::users::get_profile).put(handlers::users::update_profile),
        )
        .route("/user/progress/{id}", get(handlers::users::get_progress))
        .route("/user/badges", get(handlers::users::my_badges))
        .route("/user/quiz-scores", get(handlers::users::my_quiz_scores))
        .route("/users/all", get(handlers::users::list_users))
        .route("/users/profile", get(handlers::users::my_profile))
}

fn module_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/modules", get(handlers::modules::list_modules))
        .route("/modules/{id}", get(crud::get::<Module>))
        .route(
            "/modules/progress/{user_id}",
            get(handlers::modules::module_progress),
        )
}

fn quiz_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/quizzes", get(handlers::quizzes::list_quizzes))
        .route("/quizzes/{id}", get(handlers::quizzes::get_quiz))
        .route(
            "/quizzes/module/{module_id}",
            get(handlers::quizzes::get_quiz_for_module),
        )
        .route(
            "/quizzes/by-quizid/{quiz_id}",
            get(handlers::quizzes::get_quiz_by_quiz_id),
        )
        .route(
            "/quizzes/submit/{quiz_id}",
            post(handlers::quizzes::submit_quiz),
        )
}

fn badge_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/badges", get(crud::list::<Badge>))
        .route("/badges/{id}", get(crud::get::<Badge>))
}

fn quest_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/quests", get(handlers::quests::list_quests))
        .route("/quests/{id}", get(crud::get::<Quest>))
}

fn progress_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/user-progress", post(handlers::progress::create_entry))
        .route("/user-progress/{id}", get(crud::get::<ProgressLog>))
        .route(
            "/user-progress/user/{user_id}",
            get(handlers::progress::list_for_user),
        )
}

/// Writes to the shared catalog and to other users' activity logs.
fn admin_routes(app_state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/modules", post(crud::create::<Module>))
        .route(
            "/modules/{id}",
            put(crud::update::<Module>).delete(crud::delete::<Module>),
        )
        .route("/quizzes", post(crud::create::<Quiz>))
        .route(
            "/quizzes/{id}",
            put(crud::update::<Quiz>).delete(crud::delete::<Quiz>),
        )
        .route("/badges", post(crud::create::<Badge>))
        .route(
            "/badges/{id}",
            put(crud::update::<Badge>).delete(crud::delete::<Badge>),
        )
        .route("/quests", post(crud::create::<Quest>))
        .route(
            "/quests/{id}",
            put(crud::update::<Quest>).delete(crud::delete::<Quest>),
        )
        .route("/quests/{id}/status", put(handlers::quests::set_quest_status))
        .route(
            "/user-progress/{id}",
            put(crud::update::<ProgressLog>).delete(crud::delete::<ProgressLog>),
        )
        .route_layer(middleware::from_fn(
            middlewares::auth::admin_guard_middleware,
        ))
        .route_layer(middleware::from_fn_with_state(
            app_state,
            middlewares::auth::auth_middleware,
        ))
}
