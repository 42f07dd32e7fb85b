pub mod db;
pub mod rooms;

use axum::{extract::FromRef, http::StatusCode, response::{IntoResponse, Response}};

use crate::rooms::registry::RoomRegistry;

#[derive(Clone, FromRef)]
pub struct AppState {
    pub rooms: RoomRegistry,
}

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub enum AppError {
    /// Room name longer than 32 chars and not a canonical identifier.
    NameTooLong,
    /// A room endpoint was hit without a websocket upgrade.
    UpgradeExpected,
    Internal(anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::NameTooLong => {
                (StatusCode::BAD_REQUEST, "Name too long").into_response()
            }
            AppError::UpgradeExpected => {
                (StatusCode::UPGRADE_REQUIRED, "Expected WebSocket").into_response()
            }
            AppError::Internal(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("{}\n\n{}", err, err.backtrace()),
            )
                .into_response(),
        }
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::Internal(err.into())
    }
}
