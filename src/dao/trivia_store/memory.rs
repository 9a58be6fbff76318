//! Process-local [`TriviaStore`] backed by concurrent hash maps.
//!
//! Used when no database is configured and by the test-suite. Uniqueness guarantees rely on the
//! `DashMap` entry API, which holds the shard lock between the existence check and the insert.

use std::sync::Arc;

use dashmap::{DashMap, mapref::entry::Entry};
use futures::future::BoxFuture;
use uuid::Uuid;

use crate::dao::{
    models::{
        GameEntity, PlayerEntity, QuestionEntity, QuestionOptionEntity, ResponseEntity,
        ResponseKey, RoomEntity, RoundEntity, SettingsEntity,
    },
    storage::{StorageError, StorageResult},
    trivia_store::TriviaStore,
};

/// Cheaply cloneable handle over the shared in-memory tables.
#[derive(Clone, Default)]
pub struct MemoryTriviaStore {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    rooms: DashMap<Uuid, RoomEntity>,
    slugs: DashMap<String, Uuid>,
    settings: DashMap<Uuid, SettingsEntity>,
    players: DashMap<Uuid, PlayerEntity>,
    /// Player ids per room, in join order.
    room_players: DashMap<Uuid, Vec<Uuid>>,
    /// Host player id per room.
    hosts: DashMap<Uuid, Uuid>,
    games: DashMap<Uuid, GameEntity>,
    rounds: DashMap<Uuid, RoundEntity>,
    questions: DashMap<Uuid, QuestionEntity>,
    /// Question ids per round, in insertion order.
    round_questions: DashMap<Uuid, Vec<Uuid>>,
    /// Options keyed by question id.
    options: DashMap<Uuid, Vec<QuestionOptionEntity>>,
    responses: DashMap<ResponseKey, ResponseEntity>,
}

impl MemoryTriviaStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl MemoryInner {
    fn create_room(&self, room: RoomEntity, settings: SettingsEntity) -> StorageResult<()> {
        match self.slugs.entry(room.slug.clone()) {
            Entry::Occupied(_) => Err(StorageError::duplicate(format!(
                "room slug `{}` already in use",
                room.slug
            ))),
            Entry::Vacant(slot) => {
                self.settings.insert(settings.id, settings);
                slot.insert(room.id);
                self.rooms.insert(room.id, room);
                Ok(())
            }
        }
    }

    fn update_settings(&self, settings: SettingsEntity) -> bool {
        match self.settings.get_mut(&settings.id) {
            Some(mut existing) => {
                *existing = settings;
                true
            }
            None => false,
        }
    }

    fn insert_player(&self, player: PlayerEntity) -> StorageResult<()> {
        if player.is_host {
            match self.hosts.entry(player.room_id) {
                Entry::Occupied(_) => {
                    return Err(StorageError::duplicate(format!(
                        "room `{}` already has a host",
                        player.room_id
                    )));
                }
                Entry::Vacant(slot) => {
                    slot.insert(player.id);
                }
            }
        }

        self.room_players
            .entry(player.room_id)
            .or_default()
            .push(player.id);
        self.players.insert(player.id, player);
        Ok(())
    }

    fn list_players(&self, room_id: Uuid) -> Vec<PlayerEntity> {
        let ids = self
            .room_players
            .get(&room_id)
            .map(|ids| ids.clone())
            .unwrap_or_default();
        ids.iter()
            .filter_map(|id| self.players.get(id).map(|player| player.clone()))
            .collect()
    }

    fn create_game(&self, game: GameEntity, rounds: Vec<RoundEntity>) {
        // Rounds are staged before the game becomes visible, so readers that resolve the game
        // first always see the complete set.
        for round in rounds {
            self.rounds.insert(round.id, round);
        }
        self.games.insert(game.id, game);
    }

    fn delete_game(&self, id: Uuid) -> bool {
        if self.games.remove(&id).is_none() {
            return false;
        }

        let round_ids: Vec<Uuid> = self
            .rounds
            .iter()
            .filter(|round| round.game_id == id)
            .map(|round| round.id)
            .collect();
        self.rounds.retain(|_, round| round.game_id != id);

        for round_id in round_ids {
            if let Some((_, question_ids)) = self.round_questions.remove(&round_id) {
                for question_id in question_ids {
                    self.questions.remove(&question_id);
                    self.options.remove(&question_id);
                }
            }
        }

        self.responses.retain(|key, _| key.game_id != id);
        true
    }

    fn list_rounds(&self, game_id: Uuid) -> Vec<RoundEntity> {
        let mut rounds: Vec<RoundEntity> = self
            .rounds
            .iter()
            .filter(|round| round.game_id == game_id)
            .map(|round| round.clone())
            .collect();
        rounds.sort_by_key(|round| round.number);
        rounds
    }

    fn insert_questions(&self, questions: Vec<QuestionEntity>, options: Vec<QuestionOptionEntity>) {
        for question in questions {
            self.round_questions
                .entry(question.round_id)
                .or_default()
                .push(question.id);
            self.questions.insert(question.id, question);
        }
        for option in options {
            self.options
                .entry(option.question_id)
                .or_default()
                .push(option);
        }
    }

    fn list_questions(&self, round_id: Uuid) -> Vec<QuestionEntity> {
        let ids = self
            .round_questions
            .get(&round_id)
            .map(|ids| ids.clone())
            .unwrap_or_default();
        ids.iter()
            .filter_map(|id| self.questions.get(id).map(|question| question.clone()))
            .collect()
    }

    fn insert_response(&self, response: ResponseEntity) -> StorageResult<()> {
        match self.responses.entry(response.key()) {
            Entry::Occupied(_) => Err(StorageError::duplicate(format!(
                "player `{}` already answered question `{}`",
                response.player_id, response.question_id
            ))),
            // `delete_game` drops the game before sweeping the ledger, and that sweep needs this
            // shard, so a game still present here is swept after the insert, never before it.
            Entry::Vacant(_) if !self.games.contains_key(&response.game_id) => {
                Err(StorageError::missing_parent(format!(
                    "game `{}` not found",
                    response.game_id
                )))
            }
            Entry::Vacant(slot) => {
                slot.insert(response);
                Ok(())
            }
        }
    }
}

fn lookup<K, V>(map: &DashMap<K, V>, key: &K) -> Option<V>
where
    K: Eq + std::hash::Hash,
    V: Clone,
{
    map.get(key).map(|value| value.clone())
}

impl TriviaStore for MemoryTriviaStore {
    fn create_room(
        &self,
        room: RoomEntity,
        settings: SettingsEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move { inner.create_room(room, settings) })
    }

    fn find_room(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<RoomEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(lookup(&inner.rooms, &id)) })
    }

    fn find_settings(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<SettingsEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(lookup(&inner.settings, &id)) })
    }

    fn update_settings(&self, settings: SettingsEntity) -> BoxFuture<'static, StorageResult<bool>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.update_settings(settings)) })
    }

    fn insert_player(&self, player: PlayerEntity) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move { inner.insert_player(player) })
    }

    fn find_player(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<PlayerEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(lookup(&inner.players, &id)) })
    }

    fn list_players(&self, room_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<PlayerEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.list_players(room_id)) })
    }

    fn count_players(&self, room_id: Uuid) -> BoxFuture<'static, StorageResult<u64>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            Ok(inner
                .room_players
                .get(&room_id)
                .map(|ids| ids.len() as u64)
                .unwrap_or(0))
        })
    }

    fn create_game(
        &self,
        game: GameEntity,
        rounds: Vec<RoundEntity>,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            inner.create_game(game, rounds);
            Ok(())
        })
    }

    fn find_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(lookup(&inner.games, &id)) })
    }

    fn delete_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.delete_game(id)) })
    }

    fn list_rounds(&self, game_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<RoundEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.list_rounds(game_id)) })
    }

    fn find_round(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<RoundEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(lookup(&inner.rounds, &id)) })
    }

    fn insert_questions(
        &self,
        questions: Vec<QuestionEntity>,
        options: Vec<QuestionOptionEntity>,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            inner.insert_questions(questions, options);
            Ok(())
        })
    }

    fn list_questions(
        &self,
        round_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<QuestionEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.list_questions(round_id)) })
    }

    fn find_question(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<QuestionEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(lookup(&inner.questions, &id)) })
    }

    fn list_options(
        &self,
        question_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<QuestionOptionEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(lookup(&inner.options, &question_id).unwrap_or_default()) })
    }

    fn insert_response(&self, response: ResponseEntity) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move { inner.insert_response(response) })
    }

    fn find_response(
        &self,
        key: ResponseKey,
    ) -> BoxFuture<'static, StorageResult<Option<ResponseEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(lookup(&inner.responses, &key)) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, SystemTime};

    use super::*;
    use crate::dao::models::Difficulty;

    fn player(room_id: Uuid, username: &str, is_host: bool) -> PlayerEntity {
        PlayerEntity {
            id: Uuid::new_v4(),
            room_id,
            username: username.into(),
            is_host,
            team_id: None,
        }
    }

    fn response(key: ResponseKey) -> ResponseEntity {
        ResponseEntity {
            id: Uuid::new_v4(),
            game_id: key.game_id,
            round_id: key.round_id,
            question_id: key.question_id,
            player_id: key.player_id,
            submitted_at: SystemTime::UNIX_EPOCH,
            text_reply: Some("42".into()),
            option_id: None,
            is_correct: None,
        }
    }

    fn game() -> GameEntity {
        GameEntity {
            id: Uuid::new_v4(),
            room_id: Uuid::new_v4(),
            started_at: SystemTime::UNIX_EPOCH,
            ended_at: None,
        }
    }

    /// Ledger key inside a freshly stored game.
    async fn key_in_new_game(store: &MemoryTriviaStore) -> ResponseKey {
        let game = game();
        let game_id = game.id;
        store.create_game(game, Vec::new()).await.unwrap();
        ResponseKey {
            game_id,
            round_id: Uuid::new_v4(),
            question_id: Uuid::new_v4(),
            player_id: Uuid::new_v4(),
        }
    }

    fn room_with_settings(slug: &str) -> (RoomEntity, SettingsEntity) {
        let settings = SettingsEntity {
            id: Uuid::new_v4(),
            rounds: 3,
            time_per_round: 60,
            questions_per_round: 5,
            difficulty: Difficulty::Easy,
            max_players_per_team: 5,
        };
        let room = RoomEntity {
            id: Uuid::new_v4(),
            slug: slug.into(),
            created_at: SystemTime::UNIX_EPOCH,
            settings_id: settings.id,
        };
        (room, settings)
    }

    #[tokio::test]
    async fn duplicate_slug_is_rejected_without_side_effects() {
        let store = MemoryTriviaStore::new();
        let (room, settings) = room_with_settings("abcd1234");
        store.create_room(room, settings).await.unwrap();

        let (other_room, other_settings) = room_with_settings("abcd1234");
        let err = store
            .create_room(other_room.clone(), other_settings.clone())
            .await
            .unwrap_err();
        assert!(err.is_duplicate());
        assert!(store.find_room(other_room.id).await.unwrap().is_none());
        assert!(store.find_settings(other_settings.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn second_host_is_rejected() {
        let store = MemoryTriviaStore::new();
        let room_id = Uuid::new_v4();

        store.insert_player(player(room_id, "ana", true)).await.unwrap();
        let err = store
            .insert_player(player(room_id, "bob", true))
            .await
            .unwrap_err();
        assert!(err.is_duplicate());

        store.insert_player(player(room_id, "bob", false)).await.unwrap();
        let players = store.list_players(room_id).await.unwrap();
        assert_eq!(players.len(), 2);
        assert_eq!(players[0].username, "ana");
        assert_eq!(players.iter().filter(|p| p.is_host).count(), 1);
        assert_eq!(store.count_players(room_id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn response_key_is_unique() {
        let store = MemoryTriviaStore::new();
        let key = key_in_new_game(&store).await;

        store.insert_response(response(key)).await.unwrap();
        let err = store.insert_response(response(key)).await.unwrap_err();
        assert!(err.is_duplicate());
        assert!(store.find_response(key).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn response_for_a_deleted_game_is_refused() {
        let store = MemoryTriviaStore::new();
        let key = key_in_new_game(&store).await;
        assert!(store.delete_game(key.game_id).await.unwrap());

        let err = store.insert_response(response(key)).await.unwrap_err();
        assert!(matches!(err, StorageError::MissingParent { .. }));
        assert!(store.find_response(key).await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_response_inserts_admit_exactly_one() {
        let store = MemoryTriviaStore::new();
        let key = key_in_new_game(&store).await;

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.insert_response(response(key)).await })
            })
            .collect();

        let mut accepted = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                accepted += 1;
            }
        }
        assert_eq!(accepted, 1);
    }

    #[tokio::test]
    async fn delete_game_cascades_to_rounds_questions_and_responses() {
        let store = MemoryTriviaStore::new();
        let game = game();
        let round = RoundEntity {
            id: Uuid::new_v4(),
            game_id: game.id,
            number: 1,
            started_at: SystemTime::UNIX_EPOCH,
            ended_at: SystemTime::UNIX_EPOCH + Duration::from_secs(60),
        };
        let question = QuestionEntity {
            id: Uuid::new_v4(),
            round_id: round.id,
            kind: "open".into(),
            text: "Capital of France?".into(),
            media_url: None,
        };
        let key = ResponseKey {
            game_id: game.id,
            round_id: round.id,
            question_id: question.id,
            player_id: Uuid::new_v4(),
        };

        store.create_game(game.clone(), vec![round.clone()]).await.unwrap();
        store
            .insert_questions(vec![question.clone()], Vec::new())
            .await
            .unwrap();
        store.insert_response(response(key)).await.unwrap();

        assert!(store.delete_game(game.id).await.unwrap());
        assert!(store.find_game(game.id).await.unwrap().is_none());
        assert!(store.find_round(round.id).await.unwrap().is_none());
        assert!(store.find_question(question.id).await.unwrap().is_none());
        assert!(store.find_response(key).await.unwrap().is_none());
        assert!(!store.delete_game(game.id).await.unwrap());
    }

    #[tokio::test]
    async fn rounds_are_listed_by_number() {
        let store = MemoryTriviaStore::new();
        let game = game();
        let rounds: Vec<RoundEntity> = [3, 1, 2]
            .into_iter()
            .map(|number| RoundEntity {
                id: Uuid::new_v4(),
                game_id: game.id,
                number,
                started_at: SystemTime::UNIX_EPOCH,
                ended_at: SystemTime::UNIX_EPOCH + Duration::from_secs(1),
            })
            .collect();

        store.create_game(game.clone(), rounds).await.unwrap();
        let numbers: Vec<u32> = store
            .list_rounds(game.id)
            .await
            .unwrap()
            .into_iter()
            .map(|round| round.number)
            .collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }
}
