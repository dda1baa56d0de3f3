use tokio::net::{TcpListener, TcpStream};
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;
use serde::{Deserialize, Serialize};
use tracing::{error, info, info_span, warn, Instrument};
use anyhow::Result;
use crate::character::PlayerClass;
use crate::content::ContentRepository;
use crate::database::{SaveStore, SlotSummary};
use crate::error::GameError;
use crate::game::{TurnEngine, TurnResponse};

/// One JSON object per line from the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// The identity established by the authentication layer in front of us.
    Identify { user: String },
    Slots,
    NewGame { slot: u8, name: String, class: PlayerClass },
    Resume { slot: u8 },
    Action { slot: u8, action: String },
    Quit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Welcome { session: Uuid },
    Identified { user: String },
    Slots { slots: Vec<SlotSummary> },
    Turn { turn: TurnResponse },
    Goodbye,
    Error { message: String },
}

impl ServerMessage {
    fn error(message: impl ToString) -> Self {
        ServerMessage::Error { message: message.to_string() }
    }
}

#[derive(Debug, Clone)]
pub struct GameSession {
    pub id: Uuid,
    pub user: Option<String>,
}

impl GameSession {
    pub fn new() -> Self {
        Self { id: Uuid::new_v4(), user: None }
    }
}

impl Default for GameSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies one client message to the engine on behalf of `session`.
pub fn handle_message<S, C>(
    engine: &mut TurnEngine<S, C>,
    session: &mut GameSession,
    message: ClientMessage,
) -> ServerMessage
where
    S: SaveStore,
    C: ContentRepository,
{
    if let ClientMessage::Identify { user } = &message {
        let user = user.trim();
        if user.is_empty() {
            return ServerMessage::error("user must not be empty");
        }
        session.user = Some(user.to_string());
        return ServerMessage::Identified { user: user.to_string() };
    }
    if message == ClientMessage::Quit {
        return ServerMessage::Goodbye;
    }

    let Some(user) = session.user.clone() else {
        return ServerMessage::error("identify before playing");
    };

    let result = match message {
        ClientMessage::Slots => {
            return match engine.list_slots(&user) {
                Ok(slots) => ServerMessage::Slots { slots },
                Err(e) => ServerMessage::error(e),
            };
        }
        ClientMessage::NewGame { slot, name, class } => {
            if name.trim().is_empty() {
                return ServerMessage::error("name must not be empty");
            }
            engine.new_game(&user, slot, &name, class)
        }
        ClientMessage::Resume { slot } => engine.resume(&user, slot),
        ClientMessage::Action { slot, action } => engine.act(&user, slot, &action),
        ClientMessage::Identify { .. } | ClientMessage::Quit => return ServerMessage::error("unexpected message"),
    };

    turn_reply(result)
}

fn turn_reply(result: Result<TurnResponse, GameError>) -> ServerMessage {
    match result {
        Ok(turn) => ServerMessage::Turn { turn },
        Err(e @ GameError::Store(_)) => {
            error!(error = %e, "turn failed in the save store");
            ServerMessage::error(e)
        }
        Err(e) => ServerMessage::error(e),
    }
}

pub struct GameServer<S, C> {
    engine: Arc<Mutex<TurnEngine<S, C>>>,
}

impl<S, C> GameServer<S, C>
where
    S: SaveStore + Send + 'static,
    C: ContentRepository + Send + 'static,
{
    pub fn new(engine: TurnEngine<S, C>) -> Self {
        Self {
            engine: Arc::new(Mutex::new(engine)),
        }
    }

    pub async fn start(&self, port: u16) -> Result<()> {
        let listener = TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
        info!(port, "descent server listening");
        self.serve(listener).await
    }

    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        loop {
            let (stream, addr) = listener.accept().await?;
            let engine = Arc::clone(&self.engine);
            let session = GameSession::new();
            let span = info_span!("session", id = %session.id, peer = %addr);

            tokio::spawn(
                async move {
                    info!("client connected");
                    if let Err(e) = Self::handle_client(stream, engine, session).await {
                        warn!(error = %e, "client connection failed");
                    }
                    info!("client disconnected");
                }
                .instrument(span),
            );
        }
    }

    async fn handle_client(
        stream: TcpStream,
        engine: Arc<Mutex<TurnEngine<S, C>>>,
        mut session: GameSession,
    ) -> Result<()> {
        let (read_half, mut write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);

        Self::send(&mut write_half, &ServerMessage::Welcome { session: session.id }).await?;

        let mut line = String::new();
        loop {
            line.clear();
            if reader.read_line(&mut line).await? == 0 {
                break;
            }
            let input = line.trim();
            if input.is_empty() {
                continue;
            }

            let reply = match serde_json::from_str::<ClientMessage>(input) {
                Ok(message) => {
                    let mut engine = engine.lock().await;
                    handle_message(&mut *engine, &mut session, message)
                }
                Err(e) => ServerMessage::error(format!("invalid message: {}", e)),
            };

            Self::send(&mut write_half, &reply).await?;
            if reply == ServerMessage::Goodbye {
                break;
            }
        }

        Ok(())
    }

    async fn send<W: AsyncWrite + Unpin>(writer: &mut W, message: &ServerMessage) -> Result<()> {
        let mut line = serde_json::to_string(message)?;
        line.push('\n');
        writer.write_all(line.as_bytes()).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_messages_use_a_type_tag() {
        let message: ClientMessage =
            serde_json::from_str(r#"{"type": "new_game", "slot": 1, "name": "Ayla", "class": "rogue"}"#).unwrap();
        assert_eq!(
            message,
            ClientMessage::NewGame { slot: 1, name: "Ayla".to_string(), class: PlayerClass::Rogue }
        );

        let action: ClientMessage =
            serde_json::from_str(r#"{"type": "action", "slot": 2, "action": "move:north"}"#).unwrap();
        assert_eq!(action, ClientMessage::Action { slot: 2, action: "move:north".to_string() });
        assert_eq!(serde_json::from_str::<ClientMessage>(r#"{"type": "quit"}"#).unwrap(), ClientMessage::Quit);
    }

    #[test]
    fn server_errors_serialize_flat() {
        let json = serde_json::to_value(ServerMessage::error("nope")).unwrap();
        assert_eq!(json, serde_json::json!({"type": "error", "message": "nope"}));
    }
}
