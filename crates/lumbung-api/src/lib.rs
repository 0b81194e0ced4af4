//! JSON REST API for the Lumbung assistance core.
//!
//! Exposes an axum [`Router`] backed by any
//! [`lumbung_core::store::AssistanceStore`]. Auth, TLS, and transport
//! concerns are the caller's responsibility; the acting administrator's id
//! is read from the `x-actor-id` header on every mutating route.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", lumbung_api::api_router(store.clone()))
//! ```

pub mod catalog;
pub mod error;
pub mod programs;
pub mod recipients;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post, put},
};
use lumbung_core::store::AssistanceStore;

pub use error::ApiError;

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: AssistanceStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  Router::new()
    // Catalog
    .route("/items", get(catalog::list::<S>).post(catalog::create::<S>))
    .route(
      "/items/{id}",
      put(catalog::update::<S>).delete(catalog::remove::<S>),
    )
    // Programs
    .route(
      "/programs",
      get(programs::list::<S>).post(programs::create::<S>),
    )
    .route(
      "/programs/{id}",
      get(programs::get_one::<S>)
        .put(programs::update::<S>)
        .delete(programs::remove::<S>),
    )
    .route("/programs/{id}/complete", post(programs::complete::<S>))
    // Program-item ledger
    .route(
      "/programs/{id}/items",
      get(programs::list_items::<S>).post(programs::attach::<S>),
    )
    .route(
      "/program-items/{id}",
      put(programs::update_quantity::<S>).delete(programs::detach::<S>),
    )
    // Recipient ledger
    .route(
      "/programs/{id}/recipients",
      get(recipients::list::<S>).post(recipients::enroll::<S>),
    )
    .route(
      "/programs/{id}/recipients/batch",
      post(recipients::enroll_batch::<S>),
    )
    .route(
      "/programs/{id}/available-beneficiaries",
      get(recipients::available::<S>),
    )
    .route(
      "/recipients/{id}",
      get(recipients::get_one::<S>).delete(recipients::unenroll::<S>),
    )
    .route(
      "/recipients/{id}/distribution",
      post(recipients::update_distribution::<S>),
    )
    .with_state(store)
}
