pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use crate::dao::models::{
    GameEntity, PlayerEntity, QuestionEntity, QuestionOptionEntity, ResponseEntity, ResponseKey,
    RoomEntity, RoundEntity, SettingsEntity,
};
use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;
use uuid::Uuid;

/// Abstraction over the persistence layer for rooms, games and the answer ledger.
///
/// Lookups are point queries by primary or foreign key. The multi-row writes
/// (`create_room`, `create_game`, `delete_game`) and the uniqueness-guarded inserts
/// (`insert_player` for hosts, `insert_response`) are atomic from the caller's point of view:
/// a uniqueness violation is reported as [`StorageError::Duplicate`] and leaves nothing behind.
///
/// [`StorageError::Duplicate`]: crate::dao::storage::StorageError::Duplicate
pub trait TriviaStore: Send + Sync {
    /// Persist a room and its settings together. `Duplicate` when the slug is taken.
    fn create_room(
        &self,
        room: RoomEntity,
        settings: SettingsEntity,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Room by id.
    fn find_room(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<RoomEntity>>>;
    /// Settings record by id.
    fn find_settings(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<SettingsEntity>>>;
    /// Replace every field of an existing settings record. Returns `false` when it does not exist.
    fn update_settings(&self, settings: SettingsEntity) -> BoxFuture<'static, StorageResult<bool>>;

    /// Insert a player. Fails with `Duplicate` when `is_host` is set and the room already has a host.
    fn insert_player(&self, player: PlayerEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Player by id, whatever room it belongs to.
    fn find_player(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<PlayerEntity>>>;
    /// Players of a room in join order.
    fn list_players(&self, room_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<PlayerEntity>>>;
    /// Number of players registered in a room.
    fn count_players(&self, room_id: Uuid) -> BoxFuture<'static, StorageResult<u64>>;

    /// Persist a game together with all of its rounds, or nothing at all.
    fn create_game(
        &self,
        game: GameEntity,
        rounds: Vec<RoundEntity>,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Game by id.
    fn find_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameEntity>>>;
    /// Delete a game and everything hanging off it. Returns `false` when it does not exist.
    fn delete_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>>;
    /// Rounds of a game ordered by number.
    fn list_rounds(&self, game_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<RoundEntity>>>;
    /// Round by id.
    fn find_round(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<RoundEntity>>>;

    /// Attach questions and their options to rounds.
    fn insert_questions(
        &self,
        questions: Vec<QuestionEntity>,
        options: Vec<QuestionOptionEntity>,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Questions of a round in insertion order.
    fn list_questions(
        &self,
        round_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<QuestionEntity>>>;
    /// Question by id.
    fn find_question(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<QuestionEntity>>>;
    /// Options offered for a question.
    fn list_options(
        &self,
        question_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<QuestionOptionEntity>>>;

    /// Conditional insert into the answer ledger; `Duplicate` when the key is already taken,
    /// `MissingParent` when the game was deleted in the meantime.
    fn insert_response(&self, response: ResponseEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Ledger entry for a key, if one was accepted.
    fn find_response(
        &self,
        key: ResponseKey,
    ) -> BoxFuture<'static, StorageResult<Option<ResponseEntity>>>;

    /// Cheap round trip proving the backend answers.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Rebuild the backend connection in place.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
