//! `/ws-execute` (§6): the interactive streaming channel. Bridges a
//! client's WebSocket frames to a session's container stdio, per the
//! Interactive Session Coordinator (§4.4).

use std::collections::HashMap;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::state::SharedState;

#[derive(Deserialize)]
#[serde(tag = "type")]
enum ClientMessage {
    #[serde(rename = "startSession")]
    StartSession { #[serde(rename = "sessionId")] session_id: Uuid },
    #[serde(rename = "upsertFiles")]
    UpsertFiles { files: HashMap<String, String>, #[serde(rename = "isJava")] is_java: bool },
    #[serde(rename = "startProgram")]
    StartProgram {
        #[allow(dead_code)]
        language: String,
        #[serde(rename = "mainClassName")]
        main_class_name: Option<String>,
    },
    #[serde(rename = "sendInput")]
    SendInput { text: String },
    #[serde(rename = "disconnect")]
    Disconnect,
}

#[derive(Serialize)]
#[serde(tag = "type")]
enum ServerMessage {
    #[serde(rename = "output")]
    Output { text: String },
    #[serde(rename = "programStarted")]
    ProgramStarted { text: String },
    #[serde(rename = "filesUpdated")]
    FilesUpdated { text: String },
    #[serde(rename = "error")]
    Error { text: String },
}

impl ServerMessage {
    fn into_ws_message(self) -> Message {
        Message::Text(serde_json::to_string(&self).expect("ServerMessage always serializes"))
    }
}

pub async fn upgrade(ws: WebSocketUpgrade, State(state): State<SharedState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// One WebSocket connection's lifetime: reads client frames sequentially,
/// spawning a single background task (once `startSession` names a
/// session) that drains the container's attach stream and forwards it as
/// `output` frames. `disconnect`, or the client closing the socket, tears
/// both down.
async fn handle_socket(socket: WebSocket, state: SharedState) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();

    let writer = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sink.send(msg.into_ws_message()).await.is_err() {
                break;
            }
        }
    });

    let mut bound_session: Option<Uuid> = None;
    let mut forward_task: Option<tokio::task::JoinHandle<()>> = None;

    while let Some(Ok(msg)) = stream.next().await {
        let Message::Text(text) = msg else {
            if matches!(msg, Message::Close(_)) {
                break;
            }
            continue;
        };

        let parsed: Result<ClientMessage, _> = serde_json::from_str(&text);
        let Ok(client_msg) = parsed else {
            let _ = tx.send(ServerMessage::Error { text: format!("malformed message: {text}") });
            continue;
        };

        match client_msg {
            ClientMessage::StartSession { session_id } => match state.session_registry.attach(session_id).await {
                Ok(attach) => {
                    bound_session = Some(session_id);
                    let tx = tx.clone();
                    forward_task = Some(tokio::spawn(forward_output(attach.output, tx)));
                }
                Err(e) => {
                    let _ = tx.send(ServerMessage::Error { text: e.to_string() });
                }
            },
            ClientMessage::UpsertFiles { files, is_java } => {
                let Some(session_id) = bound_session else {
                    let _ = tx.send(ServerMessage::Error { text: "no session bound; send startSession first".into() });
                    continue;
                };
                match state.session_registry.upsert_files(session_id, files, is_java).await {
                    Ok(()) => {
                        let _ = tx.send(ServerMessage::FilesUpdated { text: "ok".into() });
                    }
                    Err(e) => {
                        let _ = tx.send(ServerMessage::Error { text: e.to_string() });
                    }
                }
            }
            ClientMessage::StartProgram { main_class_name, .. } => {
                let Some(session_id) = bound_session else {
                    let _ = tx.send(ServerMessage::Error { text: "no session bound; send startSession first".into() });
                    continue;
                };
                match state.session_registry.start_program(session_id, main_class_name.as_deref()).await {
                    Ok(()) => {
                        let _ = tx.send(ServerMessage::ProgramStarted { text: "ok".into() });
                    }
                    Err(e) => {
                        let _ = tx.send(ServerMessage::Error { text: e.to_string() });
                    }
                }
            }
            ClientMessage::SendInput { text } => {
                let Some(session_id) = bound_session else {
                    let _ = tx.send(ServerMessage::Error { text: "no session bound; send startSession first".into() });
                    continue;
                };
                if let Err(e) = state.session_registry.send_input(session_id, &text).await {
                    let _ = tx.send(ServerMessage::Error { text: e.to_string() });
                }
            }
            ClientMessage::Disconnect => {
                break;
            }
        }
    }

    if let Some(task) = forward_task.take() {
        task.abort();
    }
    if let Some(session_id) = bound_session {
        if let Err(e) = state.session_registry.disconnect(session_id).await {
            warn!("session {session_id} disconnect cleanup failed: {e}");
        }
    }
    drop(tx);
    let _ = writer.await;
    debug!("websocket session torn down");
}

/// Drains the container's attach output stream, stripping ANSI CSI
/// sequences before forwarding each chunk as an `output` frame (§4.4).
async fn forward_output(mut output: sbx_container::ByteStream, tx: mpsc::UnboundedSender<ServerMessage>) {
    while let Some(chunk) = output.next().await {
        match chunk {
            Ok(bytes) => {
                let text = String::from_utf8_lossy(&bytes);
                let stripped = sbx_interactive::registry::forward_text(&text);
                if !stripped.is_empty() && tx.send(ServerMessage::Output { text: stripped }).is_err() {
                    break;
                }
            }
            Err(_) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_session_parses_the_wire_shape() {
        let id = Uuid::new_v4();
        let json = format!(r#"{{"type":"startSession","sessionId":"{id}"}}"#);
        let msg: ClientMessage = serde_json::from_str(&json).unwrap();
        assert!(matches!(msg, ClientMessage::StartSession { session_id } if session_id == id));
    }

    #[test]
    fn upsert_files_parses_map_and_flag() {
        let json = r#"{"type":"upsertFiles","files":{"main.py":"cHJpbnQoMSk="},"isJava":false}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        match msg {
            ClientMessage::UpsertFiles { files, is_java } => {
                assert_eq!(files.get("main.py").unwrap(), "cHJpbnQoMSk=");
                assert!(!is_java);
            }
            _ => panic!("expected UpsertFiles"),
        }
    }

    #[test]
    fn java_start_program_requires_no_wire_change_when_class_name_present() {
        let json = r#"{"type":"startProgram","language":"java","mainClassName":"Main"}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        match msg {
            ClientMessage::StartProgram { main_class_name, .. } => assert_eq!(main_class_name.as_deref(), Some("Main")),
            _ => panic!("expected StartProgram"),
        }
    }

    #[test]
    fn disconnect_has_no_payload() {
        let msg: ClientMessage = serde_json::from_str(r#"{"type":"disconnect"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Disconnect));
    }

    #[test]
    fn server_messages_serialize_with_tagged_type() {
        let output = ServerMessage::Output { text: "hi".into() };
        let json = serde_json::to_string(&output).unwrap();
        assert_eq!(json, r#"{"type":"output","text":"hi"}"#);

        let error = ServerMessage::Error { text: "boom".into() };
        assert_eq!(serde_json::to_string(&error).unwrap(), r#"{"type":"error","text":"boom"}"#);
    }
}
