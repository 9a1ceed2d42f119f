//! HTTP and WebSocket routing configuration.

use actix_web::{HttpResponse, web};
use serde_json::json;

use crate::server::connection::session::ws_game;
use crate::server::state::AppState;

/// Liveness check with a few gauges.
pub async fn health(data: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "healthy",
        "activeGames": data.router.sessions().active_count(),
        "connections": data.router.registry().len(),
    }))
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/ws").route(web::get().to(ws_game)))
        .service(web::resource("/health").route(web::get().to(health)));
}
