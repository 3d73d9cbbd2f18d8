//! Static asset collaborators.
//!
//! Thin wrappers over `tower-http`'s file services: a directory mount under
//! `/static` plus the configured page routes. Not relay traffic; the
//! dispatcher's PassThrough class lands here.

use std::path::PathBuf;

use axum::Router;
use tower_http::services::{ServeDir, ServeFile};

use crate::config::RelayConfig;
use crate::http::server::AppState;

/// Build the static-file routes. The `/static` mount is always present; the
/// page routes only when `routes` is enabled.
pub fn router(config: &RelayConfig) -> Router<AppState> {
    let dir = PathBuf::from(&config.static_dir);

    let mut router = Router::new().nest_service("/static", ServeDir::new(&dir));

    if config.routes {
        for page in &config.pages {
            router = router.route_service(&page.path, ServeFile::new(dir.join(&page.file)));
        }
    }

    router
}
