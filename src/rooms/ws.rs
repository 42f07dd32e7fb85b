use axum::{
    debug_handler,
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::rooms::id::RoomId;
use crate::rooms::registry::{RoomHandle, RoomRegistry};
use crate::{AppError, AppResult};

/// `/api/room/{name}[/...]`: the first segment of the tail names the room,
/// the rest is the actor's websocket entry point and carries no routing
/// information of its own.
#[debug_handler(state = crate::AppState)]
pub(crate) async fn room_ws(
    Path(route): Path<String>,
    State(rooms): State<RoomRegistry>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> AppResult<Response> {
    let name = route.split('/').next().unwrap_or(&route);
    let room_id = RoomId::resolve(name)?;

    let Ok(ws) = ws else {
        return Err(AppError::UpgradeExpected);
    };

    let room = rooms.room(&room_id);
    Ok(ws.on_upgrade(move |socket| client_session(socket, room)))
}

async fn client_session(socket: WebSocket, room: RoomHandle) {
    let (mut sink, mut stream) = socket.split();
    let (sender, mut outbound) = mpsc::unbounded_channel();

    let Some(client_id) = room.join(sender).await else {
        return;
    };

    // writer drains the actor's frames onto the socket
    let writer = tokio::spawn(async move {
        while let Some(message) = outbound.recv().await {
            let closing = matches!(message, Message::Close(_));
            if sink.send(message).await.is_err() || closing {
                break;
            }
        }
    });

    while let Some(Ok(message)) = stream.next().await {
        match message {
            Message::Text(_) | Message::Binary(_) => room.frame(client_id, message.into_data()),
            Message::Close(_) => break,
            _ => {}
        }
    }

    room.disconnect(client_id);
    writer.abort();
}
