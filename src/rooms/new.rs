use axum::{debug_handler, http::StatusCode, response::IntoResponse};

use crate::rooms::id::RoomId;

/// `POST /api/room`: mint a fresh room address. No actor state is allocated
/// until someone connects.
#[debug_handler]
pub(crate) async fn create_room() -> impl IntoResponse {
    let room_id = RoomId::generate();
    tracing::info!(room = %room_id, "created room");
    (StatusCode::CREATED, room_id.to_string())
}
