/// HTTP surface
///
/// Thin axum handlers over the shared resources, the JSend response
/// envelopes, and the error-to-response mapping. All routes live under
/// `/api/v1`.

mod envelope;
mod error;
mod handlers;

pub use error::AppError;

use axum::{Router, routing::get};
use std::sync::Arc;

use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    let tours = Router::new()
        .route("/", get(handlers::list_tours).post(handlers::create_tour))
        .route("/top-5-cheap", get(handlers::top_five_tours))
        .route("/stats", get(handlers::tour_stats))
        .route(
            "/{id}",
            get(handlers::get_tour)
                .patch(handlers::update_tour)
                .delete(handlers::delete_tour),
        )
        .route(
            "/{id}/reviews",
            get(handlers::list_tour_reviews).post(handlers::create_tour_review),
        );

    let reviews = Router::new()
        .route(
            "/",
            get(handlers::list_reviews).post(handlers::create_review),
        )
        .route(
            "/{id}",
            get(handlers::get_review)
                .patch(handlers::update_review)
                .delete(handlers::delete_review),
        );

    let users = Router::new()
        .route("/", get(handlers::list_users).post(handlers::create_user))
        .route(
            "/{id}",
            get(handlers::get_user)
                .patch(handlers::update_user)
                .delete(handlers::delete_user),
        );

    Router::new()
        .nest("/api/v1/tours", tours)
        .nest("/api/v1/reviews", reviews)
        .nest("/api/v1/users", users)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_router_builds() {
        let _router = router(AppState::new());
    }
}
