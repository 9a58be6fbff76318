//! Shared setup for service tests: a memory-backed state driven by a manual clock.

use std::{
    sync::Arc,
    time::{Duration, SystemTime},
};

use uuid::Uuid;

use crate::{
    config::AppConfig,
    dao::{
        models::{QuestionEntity, QuestionOptionEntity},
        trivia_store::memory::MemoryTriviaStore,
    },
    state::{AppState, ManualClock, SharedState},
};

/// Instant every test clock starts at.
pub fn t0() -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000)
}

pub async fn memory_state() -> (SharedState, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(t0()));
    let state = AppState::with_clock(AppConfig::default(), clock.clone());
    state.set_store(Arc::new(MemoryTriviaStore::new())).await;
    (state, clock)
}

/// Seed one question with two options into `round_id`; returns the question and its options.
pub async fn seed_question(
    state: &SharedState,
    round_id: Uuid,
) -> (QuestionEntity, Vec<QuestionOptionEntity>) {
    let question = QuestionEntity {
        id: Uuid::new_v4(),
        round_id,
        kind: "multiple_choice".into(),
        text: "Capital of France?".into(),
        media_url: None,
    };
    let options = vec![
        QuestionOptionEntity {
            id: Uuid::new_v4(),
            question_id: question.id,
            text: "Paris".into(),
            is_correct: true,
        },
        QuestionOptionEntity {
            id: Uuid::new_v4(),
            question_id: question.id,
            text: "Lyon".into(),
            is_correct: false,
        },
    ];

    let store = state.require_store().await.unwrap();
    store
        .insert_questions(vec![question.clone()], options.clone())
        .await
        .unwrap();
    (question, options)
}
