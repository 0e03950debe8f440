//! Router construction for the recordit server.

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_mw,
    routing::{get, post},
    Extension, Router,
};
use recordit_core::service::RecordService;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers::{self, admin};
use crate::middleware::jwt::{jwt_auth, require_staff, JwtConfig};

/// Build the full axum router with all routes and middleware.
pub fn build_router(
    service: Arc<RecordService>,
    jwt_config: JwtConfig,
    max_content_length: usize,
) -> Router {
    // Teacher / Administrator area, fresh logins only
    let admin = Router::new()
        .route("/admin", get(admin::dashboard))
        // Users
        .route("/admin/manage/user", get(admin::users::list))
        .route(
            "/admin/manage/user/:id/delete",
            post(admin::users::delete),
        )
        .route(
            "/admin/manage/user/:id/edit-profile",
            get(admin::users::get_profile).post(admin::users::edit_profile),
        )
        .route(
            "/admin/manage/user/:id/change-password",
            post(admin::users::change_password),
        )
        .route(
            "/admin/manage/user/register/batch",
            post(admin::users::register_batch),
        )
        .route(
            "/admin/manage/user/register/:role",
            post(admin::users::register),
        )
        // Courses
        .route("/admin/manage/course", get(admin::courses::list))
        .route(
            "/admin/manage/course/add",
            get(admin::courses::add_form).post(admin::courses::add),
        )
        .route(
            "/admin/manage/course/:id/switch-state",
            post(admin::courses::switch_state),
        )
        // Reports (`:id` is a course for listing/adding, a report otherwise)
        .route("/admin/manage/report/:id", get(admin::reports::list))
        .route(
            "/admin/manage/report/:id/download",
            get(admin::reports::download),
        )
        .route("/admin/manage/report/:id/add", post(admin::reports::add))
        .route(
            "/admin/manage/report/:id/batch",
            post(admin::reports::batch),
        )
        .route(
            "/admin/manage/report/:id/switch-state",
            post(admin::reports::switch_state),
        )
        .route(
            "/admin/manage/report/:id/delete",
            post(admin::reports::delete),
        )
        // Records
        .route(
            "/admin/manage/record-table/file/:file",
            get(admin::records::attachment),
        )
        .route(
            "/admin/manage/record-table/:id",
            get(admin::records::list),
        )
        .route(
            "/admin/manage/record-table/:id/download",
            get(admin::records::download),
        )
        .route(
            "/admin/manage/record-table/:id/delete",
            post(admin::records::delete),
        )
        // Logs
        .route("/admin/manage/logs/system", get(admin::logs::system))
        .route("/admin/manage/logs/user", get(admin::logs::user))
        .layer(axum_mw::from_fn(require_staff));

    // Routes that require JWT authentication
    let protected = Router::new()
        .route(
            "/auth/re-authenticate",
            post(handlers::auth::re_authenticate),
        )
        .route("/auth/logout", post(handlers::auth::logout))
        .route("/user", get(handlers::user::feed))
        .route(
            "/user/review/:id",
            get(handlers::user::get_review).post(handlers::user::review),
        )
        .route("/user/review/:id/file", post(handlers::user::upload))
        .route(
            "/user/settings/profile",
            get(handlers::user::profile).post(handlers::user::edit_profile),
        )
        .route(
            "/user/settings/change-password",
            post(handlers::user::change_password),
        )
        .merge(admin)
        .layer(axum_mw::from_fn(jwt_auth));

    // Public routes (no auth)
    let public = Router::new()
        .route("/health", get(handlers::front::health))
        .route("/", get(handlers::front::index))
        .route("/about", get(handlers::front::about))
        .route("/auth/login", post(handlers::auth::login));

    // Combine and add shared state
    public
        .merge(protected)
        .layer(Extension(service))
        .layer(Extension(jwt_config))
        .layer(DefaultBodyLimit::max(max_content_length))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}
