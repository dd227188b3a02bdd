use std::time::{Duration, Instant};

use actix::{Actor, ActorContext, AsyncContext, StreamHandler};
use actix_web::{web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use log::{debug, info, warn};

use crate::auth;
use crate::error::AppError;
use crate::game::{ClientEvent, GameSession, ServerEvent};
use crate::store::{Identity, Stores};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Heartbeat {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for Heartbeat {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            timeout: Duration::from_secs(10),
        }
    }
}

pub async fn ws_index(
    req: HttpRequest,
    stream: web::Payload,
    stores: web::Data<Stores>,
    heartbeat: web::Data<Heartbeat>,
) -> Result<HttpResponse, Error> {
    let token = auth::request_token(&req);
    let accounts = stores.accounts.clone();
    let identity = web::block(move || accounts.identify(token.as_deref()))
        .await?
        .map_err(AppError::from)?;

    info!(
        "websocket connection from {:?} as {}",
        req.peer_addr(),
        identity
    );
    let socket = GameSocket::new(stores.get_ref().clone(), identity, *heartbeat.get_ref());
    ws::start(socket, &req, stream)
}

/// One actor per connection; everything it sends goes to its own peer.
pub struct GameSocket {
    hb: Instant,
    heartbeat: Heartbeat,
    session: GameSession,
}

impl Actor for GameSocket {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        self.hb(ctx);
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        debug!("websocket for {} closed", self.session.identity());
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for GameSocket {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => {
                self.hb = Instant::now();
                ctx.pong(&msg);
            }
            Ok(ws::Message::Pong(_)) => {
                self.hb = Instant::now();
            }
            Ok(ws::Message::Text(text)) => {
                let reply = match ClientEvent::decode(&text) {
                    Ok(event) => self.session.handle(event),
                    Err(err) => {
                        warn!("rejected frame from {}: {}", self.session.identity(), err);
                        ServerEvent::error(err.to_string())
                    }
                };
                self.push(&reply, ctx);
            }
            Ok(ws::Message::Binary(_)) => {
                self.push(&ServerEvent::error("binary messages are not supported"), ctx);
            }
            Ok(ws::Message::Close(reason)) => {
                ctx.close(reason);
                ctx.stop();
            }
            Ok(ws::Message::Continuation(_)) | Ok(ws::Message::Nop) => {}
            Err(err) => {
                warn!("websocket protocol error: {}", err);
                ctx.stop();
            }
        }
    }
}

impl GameSocket {
    pub fn new(stores: Stores, identity: Identity, heartbeat: Heartbeat) -> Self {
        Self {
            hb: Instant::now(),
            heartbeat,
            session: GameSession::new(stores, identity),
        }
    }

    fn push(&self, event: &ServerEvent, ctx: &mut <Self as Actor>::Context) {
        match serde_json::to_string(event) {
            Ok(text) => ctx.text(text),
            Err(err) => warn!("could not encode {:?}: {}", event, err),
        }
    }

    fn hb(&self, ctx: &mut <Self as Actor>::Context) {
        ctx.run_interval(self.heartbeat.interval, |act, ctx| {
            if Instant::now().duration_since(act.hb) > act.heartbeat.timeout {
                info!(
                    "websocket heartbeat failed for {}, disconnecting",
                    act.session.identity()
                );
                ctx.stop();
                return;
            }

            ctx.ping(b"");
        });
    }
}
