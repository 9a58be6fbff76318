//! Answer ledger: at most one accepted response per (game, round, question, player).
//!
//! Every call resolves its target first, then applies the round gate, then the identity check,
//! and only then touches the ledger, so callers always get the most specific failure.

use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    dao::{
        models::{GameEntity, PlayerEntity, QuestionEntity, ResponseEntity, ResponseKey, RoundEntity},
        trivia_store::TriviaStore,
    },
    dto::answer::{AnswerResponse, SubmitAnswerRequest},
    error::ServiceError,
    services::{
        authorization,
        game_service::{load_game, load_round},
    },
    state::{GatedOperation, SessionToken, SharedState, round_gate},
};

/// Ledger coordinates addressed by a submission or lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnswerTarget {
    pub game_id: Uuid,
    pub round_id: Uuid,
    pub question_id: Uuid,
    pub player_id: Uuid,
}

impl From<AnswerTarget> for ResponseKey {
    fn from(value: AnswerTarget) -> Self {
        Self {
            game_id: value.game_id,
            round_id: value.round_id,
            question_id: value.question_id,
            player_id: value.player_id,
        }
    }
}

struct Resolved {
    game: GameEntity,
    round: RoundEntity,
    question: QuestionEntity,
}

async fn resolve(store: &dyn TriviaStore, target: AnswerTarget) -> Result<Resolved, ServiceError> {
    let game = load_game(store, target.game_id).await?;
    let round = load_round(store, target.game_id, target.round_id).await?;

    let question = match store.find_question(target.question_id).await? {
        Some(question) if question.round_id == round.id => question,
        _ => {
            return Err(ServiceError::NotFound(format!(
                "question `{}` not found in round `{}`",
                target.question_id, target.round_id
            )));
        }
    };

    let player: Option<PlayerEntity> = store.find_player(target.player_id).await?;
    if !player.is_some_and(|player| player.room_id == game.room_id) {
        return Err(ServiceError::NotFound(format!(
            "player `{}` not found in room `{}`",
            target.player_id, game.room_id
        )));
    }

    Ok(Resolved {
        game,
        round,
        question,
    })
}

/// Record a player's answer once the round has closed.
pub async fn submit(
    state: &SharedState,
    target: AnswerTarget,
    request: SubmitAnswerRequest,
    token: Option<&SessionToken>,
) -> Result<AnswerResponse, ServiceError> {
    let store = state.require_store().await?;
    let Resolved {
        game,
        round,
        question,
    } = resolve(store.as_ref(), target).await?;

    if let Some(option_id) = request.option_id {
        let options = store.list_options(question.id).await?;
        if !options.iter().any(|option| option.id == option_id) {
            return Err(ServiceError::NotFound(format!(
                "option `{option_id}` not found for question `{}`",
                question.id
            )));
        }
    }

    let now = state.now();
    if let Err(violation) = round_gate::check(&round, now, GatedOperation::SubmitAnswer) {
        debug!(
            round_id = %round.id,
            player_id = %target.player_id,
            phase = ?violation.phase,
            "answer submission refused"
        );
        return Err(violation.into());
    }

    authorization::require_self(state, token, game.room_id, target.player_id)?;

    let response = ResponseEntity {
        id: Uuid::new_v4(),
        game_id: target.game_id,
        round_id: target.round_id,
        question_id: target.question_id,
        player_id: target.player_id,
        submitted_at: now,
        text_reply: request.answer,
        option_id: request.option_id,
        is_correct: None,
    };

    match store.insert_response(response.clone()).await {
        Ok(()) => {}
        Err(err) if err.is_duplicate() => {
            return Err(ServiceError::Conflict(format!(
                "player `{}` already answered question `{}`",
                target.player_id, target.question_id
            )));
        }
        Err(err) => return Err(err.into()),
    }

    info!(
        game_id = %target.game_id,
        question_id = %target.question_id,
        player_id = %target.player_id,
        "answer accepted"
    );
    Ok(response.into())
}

/// Read back a player's own answer.
pub async fn lookup(
    state: &SharedState,
    target: AnswerTarget,
    token: Option<&SessionToken>,
) -> Result<AnswerResponse, ServiceError> {
    let store = state.require_store().await?;
    let Resolved { game, .. } = resolve(store.as_ref(), target).await?;
    authorization::require_self(state, token, game.room_id, target.player_id)?;

    let Some(response) = store.find_response(target.into()).await? else {
        return Err(ServiceError::NotFound(format!(
            "no answer from player `{}` for question `{}`",
            target.player_id, target.question_id
        )));
    };
    Ok(response.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::{
        dao::models::QuestionOptionEntity,
        dto::{game::CreateGameRequest, room::JoinRoomRequest},
        services::{
            fixtures::{memory_state, seed_question, t0},
            game_service, room_service,
        },
        state::ManualClock,
    };
    use std::sync::Arc;

    struct Scene {
        state: SharedState,
        clock: Arc<ManualClock>,
        target: AnswerTarget,
        options: Vec<QuestionOptionEntity>,
        player_token: SessionToken,
        host_token: SessionToken,
    }

    async fn scene() -> Scene {
        let (state, clock) = memory_state().await;
        let room = room_service::create_room(&state).await.unwrap();
        let host = room_service::join_room(
            &state,
            room.id,
            JoinRoomRequest {
                username: "host".into(),
            },
            None,
        )
        .await
        .unwrap();
        let player = room_service::join_room(
            &state,
            room.id,
            JoinRoomRequest {
                username: "player".into(),
            },
            None,
        )
        .await
        .unwrap();
        let game = game_service::create_game(&state, CreateGameRequest { room_id: room.id })
            .await
            .unwrap();
        let round = game_service::list_rounds(&state, game.id).await.unwrap()[0].id;
        let (question, options) = seed_question(&state, round).await;

        Scene {
            state,
            clock,
            target: AnswerTarget {
                game_id: game.id,
                round_id: round,
                question_id: question.id,
                player_id: player.player.id,
            },
            options,
            player_token: SessionToken::from(player.session_token),
            host_token: SessionToken::from(host.session_token),
        }
    }

    fn text(answer: &str) -> SubmitAnswerRequest {
        SubmitAnswerRequest {
            answer: Some(answer.into()),
            option_id: None,
        }
    }

    /// Default rounds last 60 seconds and the first one opens at `t0`.
    fn first_round_end() -> std::time::SystemTime {
        t0() + Duration::from_secs(60)
    }

    #[tokio::test]
    async fn submission_is_locked_until_round_end() {
        let s = scene().await;

        s.clock.set(first_round_end() - Duration::from_secs(1));
        let err = submit(&s.state, s.target, text("Paris"), Some(&s.player_token))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidTiming(_)));

        s.clock.set(first_round_end());
        let accepted = submit(&s.state, s.target, text("Paris"), Some(&s.player_token))
            .await
            .unwrap();
        assert_eq!(accepted.player_id, s.target.player_id);
        assert_eq!(accepted.answer.as_deref(), Some("Paris"));
        assert_eq!(accepted.is_correct, None);
    }

    #[tokio::test]
    async fn second_submission_conflicts() {
        let s = scene().await;
        s.clock.set(first_round_end());

        submit(&s.state, s.target, text("Paris"), Some(&s.player_token))
            .await
            .unwrap();
        let err = submit(&s.state, s.target, text("Lyon"), Some(&s.player_token))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));

        let stored = lookup(&s.state, s.target, Some(&s.player_token))
            .await
            .unwrap();
        assert_eq!(stored.answer.as_deref(), Some("Paris"));
    }

    #[tokio::test]
    async fn acting_as_someone_else_is_forbidden() {
        let s = scene().await;
        s.clock.set(first_round_end());

        for token in [Some(&s.host_token), None] {
            let err = submit(&s.state, s.target, text("Paris"), token)
                .await
                .unwrap_err();
            assert!(matches!(err, ServiceError::Forbidden(_)));
            let err = lookup(&s.state, s.target, token).await.unwrap_err();
            assert!(matches!(err, ServiceError::Forbidden(_)));
        }
    }

    #[tokio::test]
    async fn existence_is_checked_before_timing_and_timing_before_identity() {
        let s = scene().await;

        let missing = AnswerTarget {
            question_id: Uuid::new_v4(),
            ..s.target
        };
        let err = submit(&s.state, missing, text("Paris"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));

        // Round still active and caller anonymous: timing wins.
        let err = submit(&s.state, s.target, text("Paris"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidTiming(_)));
    }

    #[tokio::test]
    async fn identity_is_checked_before_the_ledger() {
        let s = scene().await;
        s.clock.set(first_round_end());
        submit(&s.state, s.target, text("Paris"), Some(&s.player_token))
            .await
            .unwrap();

        let err = submit(&s.state, s.target, text("Paris"), Some(&s.host_token))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
    }

    #[tokio::test]
    async fn option_must_belong_to_the_question() {
        let s = scene().await;
        s.clock.set(first_round_end());

        let foreign = SubmitAnswerRequest {
            answer: None,
            option_id: Some(Uuid::new_v4()),
        };
        let err = submit(&s.state, s.target, foreign, Some(&s.player_token))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));

        let picked = SubmitAnswerRequest {
            answer: None,
            option_id: Some(s.options[0].id),
        };
        let accepted = submit(&s.state, s.target, picked, Some(&s.player_token))
            .await
            .unwrap();
        assert_eq!(accepted.option_id, Some(s.options[0].id));
    }

    #[tokio::test]
    async fn lookup_before_submitting_is_not_found() {
        let s = scene().await;
        let err = lookup(&s.state, s.target, Some(&s.player_token))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_submissions_accept_exactly_one() {
        let s = scene().await;
        s.clock.set(first_round_end());

        let mut handles = Vec::new();
        for i in 0..16 {
            let state = s.state.clone();
            let token = s.player_token.clone();
            let target = s.target;
            handles.push(tokio::spawn(async move {
                submit(&state, target, text(&format!("answer {i}")), Some(&token)).await
            }));
        }

        let mut accepted = Vec::new();
        let mut conflicts = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(response) => accepted.push(response),
                Err(ServiceError::Conflict(_)) => conflicts += 1,
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }
        assert_eq!(accepted.len(), 1);
        assert_eq!(conflicts, 15);

        let stored = lookup(&s.state, s.target, Some(&s.player_token))
            .await
            .unwrap();
        assert_eq!(stored.id, accepted[0].id);
        assert_eq!(stored.answer, accepted[0].answer);
    }
}
