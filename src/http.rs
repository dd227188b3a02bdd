//! Request/response surface of the game, mounted next to the websocket.

use actix_web::{web, HttpRequest, HttpResponse};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::auth;
use crate::error::AppError;
use crate::game::phrase::{random_phrase, FALLBACK_DIFFICULTY, FALLBACK_PHRASE};
use crate::game::protocol::GameReport;
use crate::store::{
    Account, GameResult, Identity, NewGameResult, NewPhrase, PerformanceRecord, Role, Stores,
};
use crate::ws;

const DEFAULT_HISTORY: i64 = 20;
const MAX_HISTORY: i64 = 100;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/ws/").route(web::get().to(ws::ws_index)))
        .service(web::resource("/save_results").route(web::post().to(save_results)))
        .service(
            web::resource("/get_random_phrase/{difficulty}")
                .route(web::get().to(get_random_phrase)),
        )
        .service(web::resource("/ranking").route(web::get().to(ranking)))
        .service(web::resource("/history").route(web::get().to(history)))
        .service(
            web::resource("/phrases")
                .route(web::get().to(list_phrases))
                .route(web::post().to(create_phrase)),
        )
        .service(web::resource("/phrases/{id}").route(web::delete().to(delete_phrase)));
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct SaveReply {
    pub success: bool,
    pub message: String,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct PhraseReply {
    pub texto: String,
    pub dificuldade: i32,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct PhraseForm {
    pub texto: String,
    pub nivel: i32,
}

#[derive(Deserialize)]
pub struct HistoryQuery {
    limit: Option<i64>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct HistoryReply {
    pub performances: Vec<PerformanceRecord>,
    pub games: Vec<GameResult>,
}

fn require_account(identity: &Identity) -> Result<&Account, AppError> {
    identity.account().ok_or(AppError::Unauthenticated)
}

fn require_teacher(identity: &Identity) -> Result<&Account, AppError> {
    let account = require_account(identity)?;
    if account.role != Role::Teacher {
        return Err(AppError::Forbidden);
    }
    Ok(account)
}

fn identify(stores: &Stores, token: Option<&str>) -> Result<Identity, AppError> {
    Ok(stores.accounts.identify(token)?)
}

/// Always answers 200; failures are reported in the body.
async fn save_results(req: HttpRequest, stores: web::Data<Stores>, body: web::Bytes) -> HttpResponse {
    let token = auth::request_token(&req);
    let stores = stores.get_ref().clone();

    let outcome = web::block(move || -> Result<GameResult, AppError> {
        let identity = identify(&stores, token.as_deref())?;
        let account = require_account(&identity)?;
        let report: GameReport = serde_json::from_slice(&body)?;
        report.validate()?;
        let (game, _) = stores.performance.save_game(NewGameResult::new(account.id, &report))?;
        Ok(game)
    })
    .await
    .map_err(AppError::from)
    .and_then(|res| res);

    let reply = match outcome {
        Ok(game) => {
            info!("saved game #{} for player #{}", game.id, game.player_id);
            SaveReply {
                success: true,
                message: "results saved".to_owned(),
            }
        }
        Err(AppError::Store(e)) => {
            warn!("could not save results: {}", e);
            SaveReply {
                success: false,
                message: "could not save results".to_owned(),
            }
        }
        Err(e) => SaveReply {
            success: false,
            message: e.to_string(),
        },
    };
    HttpResponse::Ok().json(reply)
}

async fn get_random_phrase(
    stores: web::Data<Stores>,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let difficulty = path.into_inner();
    let phrases = stores.phrases.clone();

    let phrase = web::block(move || random_phrase(phrases.as_ref(), difficulty, &mut rand::thread_rng()))
        .await??;

    let reply = match phrase {
        Some(p) => PhraseReply {
            texto: p.text,
            dificuldade: p.difficulty,
        },
        None => PhraseReply {
            texto: FALLBACK_PHRASE.to_owned(),
            dificuldade: FALLBACK_DIFFICULTY,
        },
    };
    Ok(HttpResponse::Ok().json(reply))
}

async fn ranking(req: HttpRequest, stores: web::Data<Stores>) -> Result<HttpResponse, AppError> {
    let token = auth::request_token(&req);
    let stores = stores.get_ref().clone();

    let entries = web::block(move || -> Result<_, AppError> {
        let identity = identify(&stores, token.as_deref())?;
        require_account(&identity)?;
        Ok(stores.performance.ranking()?)
    })
    .await??;
    Ok(HttpResponse::Ok().json(entries))
}

async fn history(
    req: HttpRequest,
    stores: web::Data<Stores>,
    query: web::Query<HistoryQuery>,
) -> Result<HttpResponse, AppError> {
    let token = auth::request_token(&req);
    let stores = stores.get_ref().clone();
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY).clamp(1, MAX_HISTORY);

    let reply = web::block(move || -> Result<HistoryReply, AppError> {
        let identity = identify(&stores, token.as_deref())?;
        let account = require_account(&identity)?;
        Ok(HistoryReply {
            performances: stores.performance.history(account.id, limit)?,
            games: stores.performance.game_results(account.id)?,
        })
    })
    .await??;
    Ok(HttpResponse::Ok().json(reply))
}

async fn list_phrases(req: HttpRequest, stores: web::Data<Stores>) -> Result<HttpResponse, AppError> {
    let token = auth::request_token(&req);
    let stores = stores.get_ref().clone();

    let phrases = web::block(move || -> Result<_, AppError> {
        let identity = identify(&stores, token.as_deref())?;
        require_teacher(&identity)?;
        Ok(stores.phrases.list()?)
    })
    .await??;
    Ok(HttpResponse::Ok().json(phrases))
}

async fn create_phrase(
    req: HttpRequest,
    stores: web::Data<Stores>,
    form: web::Json<PhraseForm>,
) -> Result<HttpResponse, AppError> {
    let token = auth::request_token(&req);
    let stores = stores.get_ref().clone();
    let form = form.into_inner();

    let phrase = web::block(move || -> Result<_, AppError> {
        let identity = identify(&stores, token.as_deref())?;
        let teacher = require_teacher(&identity)?;
        let phrase = NewPhrase::new(&form.texto, form.nivel, Some(teacher.id))?;
        Ok(stores.phrases.create(phrase)?)
    })
    .await??;

    info!("phrase #{} added at difficulty {}", phrase.id, phrase.difficulty);
    Ok(HttpResponse::Created().json(phrase))
}

async fn delete_phrase(
    req: HttpRequest,
    stores: web::Data<Stores>,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let token = auth::request_token(&req);
    let stores = stores.get_ref().clone();
    let id = path.into_inner();

    web::block(move || -> Result<(), AppError> {
        let identity = identify(&stores, token.as_deref())?;
        require_teacher(&identity)?;
        if stores.phrases.delete(id)? {
            Ok(())
        } else {
            Err(AppError::NotFound(id))
        }
    })
    .await??;

    info!("phrase #{} removed", id);
    Ok(HttpResponse::NoContent().finish())
}
