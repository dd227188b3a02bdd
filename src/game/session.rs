use log::{error, info, warn};
use rand::Rng;

use super::phrase::select_phrase;
use super::protocol::{ClientEvent, GameReport, PhraseRequest, ServerEvent, Submission};
use super::score::compute_score;
use crate::store::{Identity, NewGameResult, NewPerformance, Stores};

const NOT_AUTHENTICATED: &str = "not authenticated";
const SAVE_FAILED: &str = "could not save results";

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Idle,
    AwaitingSubmission { phrase: String },
}

/// One player's side of the game, owned by a single connection.
///
/// Every reply is returned to the caller, which writes it back to the
/// connection that sent the request and nowhere else.
pub struct GameSession {
    stores: Stores,
    identity: Identity,
    state: SessionState,
}

impl GameSession {
    pub fn new(stores: Stores, identity: Identity) -> Self {
        Self {
            stores,
            identity,
            state: SessionState::Idle,
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn handle(&mut self, event: ClientEvent) -> ServerEvent {
        self.handle_with_rng(event, &mut rand::thread_rng())
    }

    pub fn handle_with_rng<R: Rng + ?Sized>(&mut self, event: ClientEvent, rng: &mut R) -> ServerEvent {
        match event {
            ClientEvent::GetPhrase(request) => self.issue_phrase(request, rng),
            ClientEvent::SubmitText(submission) => self.score_submission(submission),
            ClientEvent::SaveGameResults(report) => self.save_report(report),
        }
    }

    fn issue_phrase<R: Rng + ?Sized>(&mut self, request: PhraseRequest, rng: &mut R) -> ServerEvent {
        match select_phrase(self.stores.phrases.as_ref(), request.difficulty, request.level, rng) {
            Ok(phrase) => {
                self.state = SessionState::AwaitingSubmission {
                    phrase: phrase.clone(),
                };
                ServerEvent::NewPhrase { phrase }
            }
            Err(e) => {
                error!("phrase lookup failed for {}: {}", self.identity, e);
                ServerEvent::error("could not load a phrase")
            }
        }
    }

    fn score_submission(&mut self, submission: Submission) -> ServerEvent {
        if let Err(e) = submission.validate() {
            warn!("rejected submission from {}: {}", self.identity, e);
            return ServerEvent::error(e.to_string());
        }
        // The echoed original is trusted; a mismatch is only reported.
        match std::mem::replace(&mut self.state, SessionState::Idle) {
            SessionState::AwaitingSubmission { ref phrase } if *phrase == submission.original => {}
            SessionState::AwaitingSubmission { .. } => {
                warn!("{} submitted text for a phrase that was not issued", self.identity)
            }
            SessionState::Idle => warn!("{} submitted text without requesting a phrase", self.identity),
        }

        let score = compute_score(&submission.original, &submission.text, submission.time);

        let account = match self.identity.account() {
            Some(account) => account,
            None => {
                return ServerEvent::GameResult {
                    wpm: score.wpm,
                    accuracy: score.accuracy,
                    saved: false,
                    error: Some(NOT_AUTHENTICATED.to_owned()),
                }
            }
        };

        let record = NewPerformance {
            player_id: account.id,
            wpm: score.wpm,
            accuracy: score.accuracy,
            difficulty: submission.difficulty,
            errors: None,
        };
        let (saved, error) = match self.stores.performance.append(record) {
            Ok(row) => {
                info!(
                    "saved performance #{} for {}: wpm={:.1} accuracy={:.1}",
                    row.id, self.identity, row.wpm, row.accuracy
                );
                (true, None)
            }
            Err(e) => {
                error!("could not save performance for {}: {}", self.identity, e);
                (false, Some("could not save result".to_owned()))
            }
        };

        ServerEvent::GameResult {
            wpm: score.wpm,
            accuracy: score.accuracy,
            saved,
            error,
        }
    }

    fn save_report(&mut self, report: GameReport) -> ServerEvent {
        let account = match self.identity.account() {
            Some(account) => account,
            None => {
                return ServerEvent::ResultsSaved {
                    success: false,
                    error: Some(NOT_AUTHENTICATED.to_owned()),
                }
            }
        };

        match self.stores.performance.save_game(NewGameResult::new(account.id, &report)) {
            Ok((game, _)) => {
                info!("saved game #{} for {}", game.id, self.identity);
                ServerEvent::ResultsSaved {
                    success: true,
                    error: None,
                }
            }
            Err(e) => {
                error!("could not save game results for {}: {}", self.identity, e);
                ServerEvent::ResultsSaved {
                    success: false,
                    error: Some(SAVE_FAILED.to_owned()),
                }
            }
        }
    }
}
