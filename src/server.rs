//! HTTP and WebSocket server setup.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    http::Request,
    response::Response,
    routing::{get, post},
};
use futures::{SinkExt, StreamExt};
use tower::ServiceBuilder;
use tracing::{debug, error, info, instrument, warn};

use crate::events::{ClientEvent, ServerEvent};
use crate::handlers;
use crate::profile_service::ProfileService;
use crate::rooms::{ConnectionId, RoomRegistry};
use crate::session::{SessionCoordinator, SessionError};
use crate::store::GameStore;

/// Shared state behind every route.
#[derive(Debug, Clone)]
pub struct GameServer {
    sessions: SessionCoordinator,
    profiles: ProfileService,
}

impl GameServer {
    /// Creates a server over the given store with a fresh room registry.
    #[instrument(skip(store))]
    pub fn new(store: Arc<dyn GameStore>) -> Self {
        info!("Creating game server");
        let sessions = SessionCoordinator::new(Arc::clone(&store), RoomRegistry::new());
        let profiles = ProfileService::new(store);
        Self { sessions, profiles }
    }

    /// Session coordinator.
    pub fn sessions(&self) -> &SessionCoordinator {
        &self.sessions
    }

    /// Profile service.
    pub fn profiles(&self) -> &ProfileService {
        &self.profiles
    }

    /// Builds the router with request logging.
    pub fn router(self) -> Router {
        Router::new()
            .route("/ws", get(ws_handler))
            .route("/health", get(handlers::health))
            .route("/users", post(handlers::create_user))
            .route("/users/{username}/stats", get(handlers::user_stats))
            .route("/games", get(handlers::list_games).post(handlers::create_game))
            .route("/games/{room}", get(handlers::get_game))
            .route("/games/{room}/join", post(handlers::join_game))
            .route("/messages", post(handlers::create_message))
            .layer(ServiceBuilder::new().map_request(|req: Request<Body>| {
                info!(method = %req.method(), uri = %req.uri(), "Incoming HTTP request");
                req
            }))
            .with_state(self)
    }

    /// Handles one decoded frame from a connection.
    ///
    /// Failures go back to the sender as an `error` frame and never reach
    /// other connections.
    #[instrument(skip(self, event))]
    pub async fn dispatch(&self, connection: ConnectionId, event: ClientEvent) {
        if let Err(e) = self.handle_event(connection, event).await {
            if e.is_internal() {
                error!(error = %e, "Event failed");
            } else {
                debug!(error = %e, "Event rejected");
            }
            self.sessions
                .rooms()
                .send_to(connection, ServerEvent::error(e.public_message()));
        }
    }

    async fn handle_event(
        &self,
        connection: ConnectionId,
        event: ClientEvent,
    ) -> Result<(), SessionError> {
        match event {
            ClientEvent::Hello => {
                let messages = self.sessions.chat_history().await?;
                self.sessions
                    .rooms()
                    .send_to(connection, ServerEvent::Hello { messages });
            }
            ClientEvent::Message(payload) => {
                self.sessions.relay_chat(payload);
            }
            ClientEvent::CreateRoom(room) | ClientEvent::JoinRoom(room) => {
                self.sessions.join_room(connection, &room).await?;
            }
            ClientEvent::LeaveRoom(room) => {
                self.sessions.leave_room(connection, &room);
            }
            ClientEvent::GetRooms => {
                let games = self.sessions.waiting_rooms().await?;
                self.sessions
                    .rooms()
                    .send_to(connection, ServerEvent::RoomsList(games));
            }
            ClientEvent::PlayerMove(mv) => {
                self.sessions.apply_move(connection, mv).await?;
            }
        }
        Ok(())
    }

    /// Reads frames until the client goes away.
    ///
    /// Room membership changes run in order on the read loop; every other
    /// event gets its own task.
    #[instrument(skip(self, socket))]
    async fn handle_socket(self, socket: WebSocket) {
        let (connection, mut outbound) = self.sessions.rooms().register();
        let (mut sink, mut stream) = socket.split();

        let writer = tokio::spawn(async move {
            while let Some(event) = outbound.recv().await {
                let text = match serde_json::to_string(&event) {
                    Ok(text) => text,
                    Err(e) => {
                        error!(error = %e, event = event.name(), "Failed to encode frame");
                        continue;
                    }
                };
                if sink.send(Message::Text(text.into())).await.is_err() {
                    debug!("Socket closed while sending");
                    break;
                }
            }
        });

        while let Some(frame) = stream.next().await {
            let text = match frame {
                Ok(Message::Text(text)) => text,
                Ok(Message::Close(_)) => break,
                Ok(_) => continue,
                Err(e) => {
                    warn!(error = %e, "Socket read failed");
                    break;
                }
            };

            let event = match serde_json::from_str::<ClientEvent>(text.as_str()) {
                Ok(event) => event,
                Err(e) => {
                    debug!(error = %e, "Unparseable frame");
                    self.sessions
                        .rooms()
                        .send_to(connection, ServerEvent::error(format!("Bad frame: {}", e)));
                    continue;
                }
            };

            match event {
                ClientEvent::CreateRoom(_) | ClientEvent::JoinRoom(_) | ClientEvent::LeaveRoom(_) => {
                    self.dispatch(connection, event).await;
                }
                event => {
                    let server = self.clone();
                    tokio::spawn(async move { server.dispatch(connection, event).await });
                }
            }
        }

        self.sessions.rooms().unregister(connection);
        if let Err(e) = writer.await {
            warn!(error = %e, "Socket writer ended abnormally");
        }
        info!("Connection closed");
    }
}

async fn ws_handler(ws: WebSocketUpgrade, State(server): State<GameServer>) -> Response {
    ws.on_upgrade(move |socket| server.handle_socket(socket))
}
