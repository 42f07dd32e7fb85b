use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

pub const SERVER_SENDER: &str = "server";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameKind {
    Message,
    Leave,
    Heartbeat,
    Error,
}

/// One JSON frame on the wire, both directions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireMessage {
    #[serde(rename = "type")]
    pub kind: FrameKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub data: String,
    #[serde(rename = "clientId")]
    pub client_id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl WireMessage {
    pub fn chat(
        client_id: Uuid,
        sender: Option<String>,
        avatar: Option<String>,
        data: String,
    ) -> Self {
        Self {
            kind: FrameKind::Message,
            sender,
            avatar,
            data,
            client_id: client_id.to_string(),
            timestamp: OffsetDateTime::now_utc(),
        }
    }

    /// Synthetic departure notice, attributed to the server.
    pub fn leave_notice(client_id: Uuid, data: String) -> Self {
        Self {
            kind: FrameKind::Leave,
            sender: Some(SERVER_SENDER.to_owned()),
            avatar: None,
            data,
            client_id: client_id.to_string(),
            timestamp: OffsetDateTime::now_utc(),
        }
    }

    pub fn heartbeat() -> Self {
        Self {
            kind: FrameKind::Heartbeat,
            sender: Some(SERVER_SENDER.to_owned()),
            avatar: None,
            data: String::new(),
            client_id: SERVER_SENDER.to_owned(),
            timestamp: OffsetDateTime::now_utc(),
        }
    }

    /// Error reply, sent to one client only.
    pub fn error(client_id: Uuid, data: String) -> Self {
        Self {
            kind: FrameKind::Error,
            sender: Some(SERVER_SENDER.to_owned()),
            avatar: None,
            data,
            client_id: client_id.to_string(),
            timestamp: OffsetDateTime::now_utc(),
        }
    }
}

/// Inbound frame as the client sends it. The connection-scoped identity and
/// the timestamp are stamped server-side, so only the tag and the display
/// fields are trusted from the payload.
#[derive(Debug, Deserialize)]
pub struct ClientFrame {
    #[serde(rename = "type")]
    pub kind: FrameKind,
    pub sender: Option<String>,
    pub avatar: Option<String>,
    #[serde(default)]
    pub data: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_message_uses_the_documented_field_names() {
        let msg = WireMessage::chat(Uuid::now_v7(), Some("ann".into()), None, "hi".into());
        let json: serde_json::Value = serde_json::from_str(&serde_json::to_string(&msg).unwrap()).unwrap();

        assert_eq!(json["type"], "message");
        assert_eq!(json["sender"], "ann");
        assert_eq!(json["data"], "hi");
        assert!(json["clientId"].is_string());
        // RFC 3339 timestamps parse back
        let ts = json["timestamp"].as_str().unwrap();
        OffsetDateTime::parse(ts, &time::format_description::well_known::Rfc3339).unwrap();
        // absent optionals are omitted, not null
        assert!(json.get("avatar").is_none());
    }

    #[test]
    fn client_frame_ignores_untrusted_fields() {
        let frame: ClientFrame = serde_json::from_str(
            r#"{"type":"message","data":"yo","clientId":"spoofed","timestamp":"2020-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(frame.kind, FrameKind::Message);
        assert_eq!(frame.data, "yo");
        assert!(frame.sender.is_none());
    }

    #[test]
    fn untagged_or_unknown_frames_fail_to_parse() {
        assert!(serde_json::from_str::<ClientFrame>(r#"{"data":"hi"}"#).is_err());
        assert!(serde_json::from_str::<ClientFrame>(r#"{"type":"shout","data":"hi"}"#).is_err());
        assert!(serde_json::from_str::<ClientFrame>("not json").is_err());
    }

    #[test]
    fn leave_notice_references_the_departed_client() {
        let id = Uuid::now_v7();
        let notice = WireMessage::leave_notice(id, format!("client {id} left the chat"));
        assert_eq!(notice.kind, FrameKind::Leave);
        assert_eq!(notice.client_id, id.to_string());
        assert_eq!(notice.sender.as_deref(), Some(SERVER_SENDER));
    }
}
