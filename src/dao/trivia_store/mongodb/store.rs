use std::sync::Arc;

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Client, Collection, Database, IndexModel,
    bson::{Bson, Document, doc},
    options::IndexOptions,
};
use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::RwLock;
use tracing::warn;
use uuid::Uuid;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult},
    models::{
        MongoGameDocument, MongoOptionDocument, MongoPlayerDocument, MongoQuestionDocument,
        MongoResponseDocument, MongoRoomDocument, MongoRoundDocument, MongoSettingsDocument,
        by_ref, doc_id, response_filter, uuid_as_binary,
    },
};
use crate::dao::{
    models::{
        GameEntity, PlayerEntity, QuestionEntity, QuestionOptionEntity, ResponseEntity,
        ResponseKey, RoomEntity, RoundEntity, SettingsEntity,
    },
    storage::StorageResult,
    trivia_store::TriviaStore,
};

const ROOM_COLLECTION: &str = "rooms";
const SETTINGS_COLLECTION: &str = "settings";
const PLAYER_COLLECTION: &str = "players";
const GAME_COLLECTION: &str = "games";
const ROUND_COLLECTION: &str = "rounds";
const QUESTION_COLLECTION: &str = "questions";
const OPTION_COLLECTION: &str = "question_options";
const RESPONSE_COLLECTION: &str = "responses";

/// MongoDB-backed [`TriviaStore`]; clones share one client.
#[derive(Clone)]
pub struct MongoTriviaStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    #[allow(dead_code)]
    client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        Ok(())
    }
}

impl MongoTriviaStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) =
            establish_connection(&config.options, &config.database_name).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { client, database }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    /// Create the indexes backing the store's uniqueness guarantees and foreign-key lookups.
    async fn ensure_indexes(&self) -> MongoResult<()> {
        let database = self.database().await;

        let indexes: [(&'static str, &'static str, Document, Option<IndexOptions>); 7] = [
            (
                ROOM_COLLECTION,
                "room_slug_idx",
                doc! {"slug": 1},
                Some(IndexOptions::builder().unique(Some(true)).build()),
            ),
            (
                PLAYER_COLLECTION,
                "player_room_idx",
                doc! {"room_id": 1},
                None,
            ),
            (
                PLAYER_COLLECTION,
                "room_host_idx",
                doc! {"room_id": 1, "is_host": 1},
                Some(
                    IndexOptions::builder()
                        .unique(Some(true))
                        .partial_filter_expression(Some(doc! {"is_host": true}))
                        .build(),
                ),
            ),
            (
                ROUND_COLLECTION,
                "round_game_idx",
                doc! {"game_id": 1, "number": 1},
                None,
            ),
            (
                QUESTION_COLLECTION,
                "question_round_idx",
                doc! {"round_id": 1},
                None,
            ),
            (
                OPTION_COLLECTION,
                "option_question_idx",
                doc! {"question_id": 1},
                None,
            ),
            (
                RESPONSE_COLLECTION,
                "response_ledger_idx",
                doc! {"game_id": 1, "round_id": 1, "question_id": 1, "player_id": 1},
                Some(IndexOptions::builder().unique(Some(true)).build()),
            ),
        ];

        for (collection, name, keys, options) in indexes {
            let mut options = options.unwrap_or_default();
            options.name = Some(name.to_owned());
            let model = IndexModel::builder().keys(keys).options(options).build();

            database
                .collection::<Document>(collection)
                .create_index(model)
                .await
                .map_err(|source| MongoDaoError::EnsureIndex {
                    collection,
                    index: name,
                    source,
                })?;
        }

        Ok(())
    }

    async fn database(&self) -> Database {
        let guard = self.inner.state.read().await;
        guard.database.clone()
    }

    async fn collection<T>(&self, name: &str) -> Collection<T>
    where
        T: Send + Sync,
    {
        let guard = self.inner.state.read().await;
        guard.database.collection::<T>(name)
    }

    async fn find_one<T, E>(
        &self,
        collection: &'static str,
        id: Uuid,
    ) -> MongoResult<Option<E>>
    where
        T: DeserializeOwned + Send + Sync + Into<E>,
    {
        let document = self
            .collection::<T>(collection)
            .await
            .find_one(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::Load {
                collection,
                id,
                source,
            })?;
        Ok(document.map(Into::into))
    }

    async fn find_many<T, E>(
        &self,
        collection: &'static str,
        field: &str,
        id: Uuid,
        sort: Option<Document>,
    ) -> MongoResult<Vec<E>>
    where
        T: DeserializeOwned + Send + Sync + Into<E>,
    {
        let load_err = |source| MongoDaoError::Load {
            collection,
            id,
            source,
        };

        let coll = self.collection::<T>(collection).await;
        let cursor = match sort {
            Some(sort) => coll.find(by_ref(field, id)).sort(sort).await,
            None => coll.find(by_ref(field, id)).await,
        }
        .map_err(load_err)?;

        let documents: Vec<T> = cursor.try_collect().await.map_err(load_err)?;
        Ok(documents.into_iter().map(Into::into).collect())
    }

    async fn insert_one<T>(&self, collection: &'static str, document: T) -> MongoResult<()>
    where
        T: Serialize + Send + Sync,
    {
        self.collection::<T>(collection)
            .await
            .insert_one(document)
            .await
            .map_err(|source| MongoDaoError::write(collection, source))?;
        Ok(())
    }

    async fn insert_many<T>(&self, collection: &'static str, documents: Vec<T>) -> MongoResult<()>
    where
        T: Serialize + Send + Sync,
    {
        if documents.is_empty() {
            return Ok(());
        }
        self.collection::<T>(collection)
            .await
            .insert_many(documents)
            .await
            .map_err(|source| MongoDaoError::write(collection, source))?;
        Ok(())
    }

    async fn delete_many(&self, collection: &'static str, filter: Document) -> MongoResult<()> {
        self.collection::<Document>(collection)
            .await
            .delete_many(filter)
            .await
            .map_err(|source| MongoDaoError::write(collection, source))?;
        Ok(())
    }

    async fn create_room(&self, room: RoomEntity, settings: SettingsEntity) -> MongoResult<()> {
        let settings_id = settings.id;
        self.insert_one::<MongoSettingsDocument>(SETTINGS_COLLECTION, settings.into())
            .await?;

        if let Err(err) = self
            .insert_one::<MongoRoomDocument>(ROOM_COLLECTION, room.into())
            .await
        {
            self.compensate(SETTINGS_COLLECTION, doc_id(settings_id))
                .await;
            return Err(err);
        }
        Ok(())
    }

    async fn update_settings(&self, settings: SettingsEntity) -> MongoResult<bool> {
        let id = settings.id;
        let document: MongoSettingsDocument = settings.into();
        let result = self
            .collection::<MongoSettingsDocument>(SETTINGS_COLLECTION)
            .await
            .replace_one(doc_id(id), &document)
            .await
            .map_err(|source| MongoDaoError::write(SETTINGS_COLLECTION, source))?;
        Ok(result.matched_count > 0)
    }

    async fn count_players(&self, room_id: Uuid) -> MongoResult<u64> {
        self.collection::<Document>(PLAYER_COLLECTION)
            .await
            .count_documents(by_ref("room_id", room_id))
            .await
            .map_err(|source| MongoDaoError::Load {
                collection: PLAYER_COLLECTION,
                id: room_id,
                source,
            })
    }

    /// Rounds are written before the game document, so a game is only ever observable together
    /// with its complete round set. A failed game insert removes the staged rounds.
    async fn create_game(&self, game: GameEntity, rounds: Vec<RoundEntity>) -> MongoResult<()> {
        let game_id = game.id;
        let documents: Vec<MongoRoundDocument> = rounds.into_iter().map(Into::into).collect();

        if let Err(err) = self.insert_many(ROUND_COLLECTION, documents).await {
            self.compensate(ROUND_COLLECTION, by_ref("game_id", game_id))
                .await;
            return Err(err);
        }

        if let Err(err) = self
            .insert_one::<MongoGameDocument>(GAME_COLLECTION, game.into())
            .await
        {
            self.compensate(ROUND_COLLECTION, by_ref("game_id", game_id))
                .await;
            return Err(err);
        }
        Ok(())
    }

    async fn delete_game(&self, id: Uuid) -> MongoResult<bool> {
        let result = self
            .collection::<Document>(GAME_COLLECTION)
            .await
            .delete_one(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::DeleteGame { id, source })?;
        if result.deleted_count == 0 {
            return Ok(false);
        }

        let rounds: Vec<RoundEntity> = self
            .find_many::<MongoRoundDocument, _>(ROUND_COLLECTION, "game_id", id, None)
            .await?;
        let round_ids: Vec<Bson> = rounds
            .iter()
            .map(|round| uuid_as_binary(round.id).into())
            .collect();

        let questions = self
            .collection::<MongoQuestionDocument>(QUESTION_COLLECTION)
            .await
            .find(doc! {"round_id": {"$in": round_ids.clone()}})
            .await
            .map_err(|source| MongoDaoError::DeleteGame { id, source })?
            .try_collect::<Vec<_>>()
            .await
            .map_err(|source| MongoDaoError::DeleteGame { id, source })?;
        let question_ids: Vec<Bson> = questions
            .into_iter()
            .map(|question| uuid_as_binary(QuestionEntity::from(question).id).into())
            .collect();

        self.delete_many(
            OPTION_COLLECTION,
            doc! {"question_id": {"$in": question_ids}},
        )
        .await?;
        self.delete_many(QUESTION_COLLECTION, doc! {"round_id": {"$in": round_ids}})
            .await?;
        self.delete_many(RESPONSE_COLLECTION, by_ref("game_id", id))
            .await?;
        self.delete_many(ROUND_COLLECTION, by_ref("game_id", id))
            .await?;

        Ok(true)
    }

    async fn insert_questions(
        &self,
        questions: Vec<QuestionEntity>,
        options: Vec<QuestionOptionEntity>,
    ) -> MongoResult<()> {
        let questions: Vec<MongoQuestionDocument> =
            questions.into_iter().map(Into::into).collect();
        let options: Vec<MongoOptionDocument> = options.into_iter().map(Into::into).collect();
        self.insert_many(QUESTION_COLLECTION, questions).await?;
        self.insert_many(OPTION_COLLECTION, options).await
    }

    /// Ledger insert that refuses to outlive its game.
    ///
    /// `delete_game` removes the game document before sweeping responses, so a response that
    /// lands after the sweep finds the game gone here and is withdrawn.
    async fn insert_response(&self, response: ResponseEntity) -> MongoResult<()> {
        let key = response.key();
        self.insert_one::<MongoResponseDocument>(RESPONSE_COLLECTION, response.into())
            .await?;

        let game = self
            .find_one::<MongoGameDocument, GameEntity>(GAME_COLLECTION, key.game_id)
            .await?;
        if game.is_none() {
            self.compensate(RESPONSE_COLLECTION, response_filter(key))
                .await;
            return Err(MongoDaoError::MissingParent {
                collection: RESPONSE_COLLECTION,
                id: key.game_id,
            });
        }
        Ok(())
    }

    async fn find_response(&self, key: ResponseKey) -> MongoResult<Option<ResponseEntity>> {
        let document = self
            .collection::<MongoResponseDocument>(RESPONSE_COLLECTION)
            .await
            .find_one(response_filter(key))
            .await
            .map_err(|source| MongoDaoError::Load {
                collection: RESPONSE_COLLECTION,
                id: key.question_id,
                source,
            })?;
        Ok(document.map(Into::into))
    }

    /// Best-effort cleanup of rows staged by a multi-document write that failed midway.
    async fn compensate(&self, collection: &'static str, filter: Document) {
        if let Err(err) = self.delete_many(collection, filter).await {
            warn!(collection, error = %err, "failed to roll back partially written rows");
        }
    }
}

impl TriviaStore for MongoTriviaStore {
    fn create_room(
        &self,
        room: RoomEntity,
        settings: SettingsEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.create_room(room, settings).await.map_err(Into::into) })
    }

    fn find_room(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<RoomEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_one::<MongoRoomDocument, _>(ROOM_COLLECTION, id)
                .await
                .map_err(Into::into)
        })
    }

    fn find_settings(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<SettingsEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_one::<MongoSettingsDocument, _>(SETTINGS_COLLECTION, id)
                .await
                .map_err(Into::into)
        })
    }

    fn update_settings(&self, settings: SettingsEntity) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.update_settings(settings).await.map_err(Into::into) })
    }

    fn insert_player(&self, player: PlayerEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .insert_one::<MongoPlayerDocument>(PLAYER_COLLECTION, player.into())
                .await
                .map_err(Into::into)
        })
    }

    fn find_player(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<PlayerEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_one::<MongoPlayerDocument, _>(PLAYER_COLLECTION, id)
                .await
                .map_err(Into::into)
        })
    }

    fn list_players(&self, room_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<PlayerEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_many::<MongoPlayerDocument, _>(PLAYER_COLLECTION, "room_id", room_id, None)
                .await
                .map_err(Into::into)
        })
    }

    fn count_players(&self, room_id: Uuid) -> BoxFuture<'static, StorageResult<u64>> {
        let store = self.clone();
        Box::pin(async move { store.count_players(room_id).await.map_err(Into::into) })
    }

    fn create_game(
        &self,
        game: GameEntity,
        rounds: Vec<RoundEntity>,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.create_game(game, rounds).await.map_err(Into::into) })
    }

    fn find_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_one::<MongoGameDocument, _>(GAME_COLLECTION, id)
                .await
                .map_err(Into::into)
        })
    }

    fn delete_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.delete_game(id).await.map_err(Into::into) })
    }

    fn list_rounds(&self, game_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<RoundEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_many::<MongoRoundDocument, _>(
                    ROUND_COLLECTION,
                    "game_id",
                    game_id,
                    Some(doc! {"number": 1}),
                )
                .await
                .map_err(Into::into)
        })
    }

    fn find_round(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<RoundEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_one::<MongoRoundDocument, _>(ROUND_COLLECTION, id)
                .await
                .map_err(Into::into)
        })
    }

    fn insert_questions(
        &self,
        questions: Vec<QuestionEntity>,
        options: Vec<QuestionOptionEntity>,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .insert_questions(questions, options)
                .await
                .map_err(Into::into)
        })
    }

    fn list_questions(
        &self,
        round_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<QuestionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_many::<MongoQuestionDocument, _>(
                    QUESTION_COLLECTION,
                    "round_id",
                    round_id,
                    None,
                )
                .await
                .map_err(Into::into)
        })
    }

    fn find_question(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<QuestionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_one::<MongoQuestionDocument, _>(QUESTION_COLLECTION, id)
                .await
                .map_err(Into::into)
        })
    }

    fn list_options(
        &self,
        question_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<QuestionOptionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_many::<MongoOptionDocument, _>(
                    OPTION_COLLECTION,
                    "question_id",
                    question_id,
                    None,
                )
                .await
                .map_err(Into::into)
        })
    }

    fn insert_response(&self, response: ResponseEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.insert_response(response).await.map_err(Into::into)
        })
    }

    fn find_response(
        &self,
        key: ResponseKey,
    ) -> BoxFuture<'static, StorageResult<Option<ResponseEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_response(key).await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
