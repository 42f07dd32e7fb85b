mod new;
mod ws;

pub mod actor;
pub mod history;
pub mod id;
pub mod registry;
pub mod wire;

use axum::{
    routing::{any, post},
    Router,
};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/room", post(new::create_room))
        .route("/api/room/{*route}", any(ws::room_ws))
}
