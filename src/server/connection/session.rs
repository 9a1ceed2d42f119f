/// WebSocket actor for one authenticated player connection.
///
/// The actor registers its own mailbox as the connection's outbox when it
/// starts, hands every text frame to the protocol router, and tears the
/// connection down through the router when it stops. Its mailbox is the only
/// path to the socket, so frames are never interleaved.
use std::sync::Arc;

use actix::prelude::*;
use actix_web::{Error, HttpRequest, HttpResponse, http::StatusCode, web};
use actix_web_actors::ws;
use log::{error, info, warn};

use crate::server::auth::authenticate_request;
use crate::server::protocol::ProtocolRouter;
use crate::server::protocol::messages::ServerMessage;
use crate::server::state::AppState;
use crate::server::types::{ConnectionId, Principal};
use crate::server::ws_error::http_error_response;

pub struct PlayerConnection {
    pub handle: ConnectionId,
    pub principal: Principal,
    pub router: Arc<ProtocolRouter>,
}

impl Actor for PlayerConnection {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        self.router.registry().register(
            self.handle,
            self.principal.clone(),
            ctx.address().recipient(),
        );
        info!(
            "[Connection] {} opened for {}",
            self.handle, self.principal.display_name
        );
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        self.router.disconnect(self.handle);
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for PlayerConnection {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Text(text)) => self.router.dispatch(self.handle, &text),
            Ok(ws::Message::Ping(msg)) => ctx.pong(&msg),
            Ok(ws::Message::Close(reason)) => {
                ctx.close(reason);
                ctx.stop();
            }
            Ok(ws::Message::Binary(_)) => {
                warn!("[Connection] {} sent a binary frame, ignored", self.handle);
            }
            Ok(_) => (),
            Err(e) => {
                warn!("[Connection] {} protocol error: {}", self.handle, e);
                ctx.stop();
            }
        }
    }
}

impl Handler<ServerMessage> for PlayerConnection {
    type Result = ();

    fn handle(&mut self, msg: ServerMessage, ctx: &mut Self::Context) {
        match msg.to_json() {
            Ok(text) => ctx.text(text),
            Err(e) => {
                error!("[Connection] {} failed to serialize message: {}", self.handle, e);
                ctx.close(Some(ws::CloseReason {
                    code: ws::CloseCode::Error,
                    description: Some("Internal server error".into()),
                }));
                ctx.stop();
            }
        }
    }
}

/// WebSocket endpoint. The credential is checked before the upgrade; a
/// missing or unknown token gets a 401 and no socket.
pub async fn ws_game(
    req: HttpRequest,
    stream: web::Payload,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let authenticated = match authenticate_request(&req, data.authenticator.as_ref()) {
        Ok(authenticated) => authenticated,
        Err(e) => {
            warn!("[Connection] Rejected upgrade from {:?}: {}", req.peer_addr(), e);
            return Ok(http_error_response(
                "UNAUTHORIZED",
                &e.to_string(),
                StatusCode::UNAUTHORIZED,
            ));
        }
    };

    let actor = PlayerConnection {
        handle: data.router.registry().allocate(),
        principal: authenticated.principal,
        router: data.router.clone(),
    };
    match authenticated.subprotocol.as_deref() {
        // Browsers drop the socket unless the offered subprotocol comes back.
        Some(subprotocol) => {
            let protocols = [subprotocol];
            ws::WsResponseBuilder::new(actor, &req, stream)
                .protocols(&protocols)
                .start()
        }
        None => ws::start(actor, &req, stream),
    }
}
