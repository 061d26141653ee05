use std::{collections::HashMap, sync::Arc};

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Client, Collection, Database, IndexModel,
    bson::{Document, doc},
    options::{IndexOptions, ReturnDocument},
};
use tokio::sync::RwLock;

use super::{
    connection::MongoConfig,
    error::{MongoDaoError, MongoResult, is_duplicate_key},
    models::{
        CARD_COLLECTION, COUNTER_COLLECTION, GAME_COLLECTION, MEMBERSHIP_COLLECTION,
        MongoCardDocument, MongoCounterDocument, MongoGameDocument, MongoMembershipDocument,
        MongoPlayerDocument, PLAYER_COLLECTION,
    },
};
use crate::dao::{
    game_store::GameStore,
    models::{CardEntity, GameEntity, GamePlayerEntity, GamePlayerRow, GameUpdate},
    storage::StorageResult,
};

const PLAYER_SEQUENCE: &str = "player_id";

/// [`GameStore`] backed by MongoDB; clones share one connection.
#[derive(Clone)]
pub struct MongoGameStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
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
        let (client, database) = self.config.open().await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        Ok(())
    }
}

impl MongoGameStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) = config.open().await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { client, database }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let database = self.database().await;

        let memberships = database.collection::<Document>(MEMBERSHIP_COLLECTION);
        let membership_index = IndexModel::builder()
            .keys(doc! {"game_id": 1, "player_id": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("membership_idx".to_owned()))
                    .unique(Some(true))
                    .build(),
            )
            .build();
        memberships
            .create_index(membership_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: MEMBERSHIP_COLLECTION,
                index: "game_id,player_id",
                source,
            })?;

        let cards = database.collection::<Document>(CARD_COLLECTION);
        let card_index = IndexModel::builder()
            .keys(doc! {"game_id": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("card_game_idx".to_owned()))
                    .build(),
            )
            .build();
        cards
            .create_index(card_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: CARD_COLLECTION,
                index: "game_id",
                source,
            })?;

        Ok(())
    }

    async fn database(&self) -> Database {
        let guard = self.inner.state.read().await;
        guard.database.clone()
    }

    async fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.database().await.collection::<T>(name)
    }

    async fn find_game(&self, id: String) -> MongoResult<Option<GameEntity>> {
        let games = self.collection::<MongoGameDocument>(GAME_COLLECTION).await;
        let document = games
            .find_one(doc! {"_id": &id})
            .await
            .map_err(|source| MongoDaoError::Query {
                operation: "load game",
                key: id,
                source,
            })?;
        Ok(document.map(Into::into))
    }

    async fn list_game_players(&self, game_id: String) -> MongoResult<Vec<GamePlayerRow>> {
        let query_error = |source| MongoDaoError::Query {
            operation: "list players",
            key: game_id.clone(),
            source,
        };

        let memberships: Vec<MongoMembershipDocument> = self
            .collection::<MongoMembershipDocument>(MEMBERSHIP_COLLECTION)
            .await
            .find(doc! {"game_id": &game_id})
            .sort(doc! {"initiative": 1})
            .await
            .map_err(query_error)?
            .try_collect()
            .await
            .map_err(query_error)?;

        let ids: Vec<i64> = memberships
            .iter()
            .map(|membership| membership.player_id)
            .collect();
        let players: HashMap<i64, String> = self
            .collection::<MongoPlayerDocument>(PLAYER_COLLECTION)
            .await
            .find(doc! {"_id": {"$in": ids}})
            .await
            .map_err(query_error)?
            .map_ok(|player| (player.id, player.name))
            .try_collect()
            .await
            .map_err(query_error)?;

        memberships
            .into_iter()
            .map(|membership| {
                let name = players.get(&membership.player_id).cloned().ok_or_else(|| {
                    MongoDaoError::Missing {
                        collection: PLAYER_COLLECTION,
                        key: membership.player_id.to_string(),
                    }
                })?;
                Ok(GamePlayerRow {
                    player_id: membership.player_id,
                    name,
                    points: membership.points,
                    initiative: membership.initiative,
                    session_key: membership.session_key,
                })
            })
            .collect()
    }

    async fn list_game_cards(&self, game_id: String) -> MongoResult<Vec<CardEntity>> {
        let query_error = |source| MongoDaoError::Query {
            operation: "list cards",
            key: game_id.clone(),
            source,
        };

        let documents: Vec<MongoCardDocument> = self
            .collection::<MongoCardDocument>(CARD_COLLECTION)
            .await
            .find(doc! {"game_id": &game_id})
            .await
            .map_err(query_error)?
            .try_collect()
            .await
            .map_err(query_error)?;

        documents.into_iter().map(CardEntity::try_from).collect()
    }

    async fn create_game(&self, game: GameEntity) -> MongoResult<()> {
        let id = game.id.clone();
        let document: MongoGameDocument = game.into();
        self.collection::<MongoGameDocument>(GAME_COLLECTION)
            .await
            .insert_one(&document)
            .await
            .map_err(|source| {
                if is_duplicate_key(&source) {
                    MongoDaoError::Duplicate {
                        collection: GAME_COLLECTION,
                        key: id.clone(),
                    }
                } else {
                    MongoDaoError::Query {
                        operation: "create game",
                        key: id.clone(),
                        source,
                    }
                }
            })?;
        Ok(())
    }

    async fn update_game_fields(&self, id: String, fields: Document) -> MongoResult<()> {
        let result = self
            .collection::<MongoGameDocument>(GAME_COLLECTION)
            .await
            .update_one(doc! {"_id": &id}, doc! {"$set": fields})
            .await
            .map_err(|source| MongoDaoError::Query {
                operation: "update game",
                key: id.clone(),
                source,
            })?;

        if result.matched_count == 0 {
            return Err(MongoDaoError::Missing {
                collection: GAME_COLLECTION,
                key: id,
            });
        }
        Ok(())
    }

    async fn insert_cards(&self, cards: Vec<CardEntity>) -> MongoResult<()> {
        let Some(game_id) = cards.first().map(|card| card.game_id.clone()) else {
            return Ok(());
        };
        let documents: Vec<MongoCardDocument> = cards.into_iter().map(Into::into).collect();
        self.collection::<MongoCardDocument>(CARD_COLLECTION)
            .await
            .insert_many(documents)
            .await
            .map_err(|source| MongoDaoError::Query {
                operation: "insert cards",
                key: game_id,
                source,
            })?;
        Ok(())
    }

    async fn create_player(&self, name: String) -> MongoResult<i64> {
        let counter = self
            .collection::<MongoCounterDocument>(COUNTER_COLLECTION)
            .await
            .find_one_and_update(doc! {"_id": PLAYER_SEQUENCE}, doc! {"$inc": {"seq": 1_i64}})
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await
            .map_err(|source| MongoDaoError::Query {
                operation: "allocate player id",
                key: name.clone(),
                source,
            })?
            .ok_or_else(|| MongoDaoError::Corrupt {
                collection: COUNTER_COLLECTION,
                message: "upserted sequence returned nothing".into(),
            })?;

        let player = MongoPlayerDocument {
            id: counter.seq,
            name,
        };
        self.collection::<MongoPlayerDocument>(PLAYER_COLLECTION)
            .await
            .insert_one(&player)
            .await
            .map_err(|source| MongoDaoError::Query {
                operation: "create player",
                key: player.name.clone(),
                source,
            })?;
        Ok(player.id)
    }

    async fn add_game_player(&self, membership: GamePlayerEntity) -> MongoResult<()> {
        if self.find_game(membership.game_id.clone()).await?.is_none() {
            return Err(MongoDaoError::Missing {
                collection: GAME_COLLECTION,
                key: membership.game_id,
            });
        }

        let key = format!("{}/{}", membership.game_id, membership.player_id);
        let document: MongoMembershipDocument = membership.into();
        self.collection::<MongoMembershipDocument>(MEMBERSHIP_COLLECTION)
            .await
            .insert_one(&document)
            .await
            .map_err(|source| {
                if is_duplicate_key(&source) {
                    MongoDaoError::Duplicate {
                        collection: MEMBERSHIP_COLLECTION,
                        key: key.clone(),
                    }
                } else {
                    MongoDaoError::Query {
                        operation: "add player to game",
                        key: key.clone(),
                        source,
                    }
                }
            })?;
        Ok(())
    }

    async fn adjust_player_points(
        &self,
        game_id: String,
        player_id: i64,
        delta: i32,
    ) -> MongoResult<i32> {
        let key = format!("{game_id}/{player_id}");
        let updated = self
            .collection::<MongoMembershipDocument>(MEMBERSHIP_COLLECTION)
            .await
            .find_one_and_update(
                doc! {"game_id": &game_id, "player_id": player_id},
                doc! {"$inc": {"points": delta}},
            )
            .return_document(ReturnDocument::After)
            .await
            .map_err(|source| MongoDaoError::Query {
                operation: "adjust points",
                key: key.clone(),
                source,
            })?;

        updated
            .map(|membership| membership.points)
            .ok_or(MongoDaoError::Missing {
                collection: MEMBERSHIP_COLLECTION,
                key,
            })
    }
}

impl GameStore for MongoGameStore {
    fn find_game(&self, id: String) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_game(id).await.map_err(Into::into) })
    }

    fn list_game_players(
        &self,
        game_id: String,
    ) -> BoxFuture<'static, StorageResult<Vec<GamePlayerRow>>> {
        let store = self.clone();
        Box::pin(async move { store.list_game_players(game_id).await.map_err(Into::into) })
    }

    fn list_game_cards(
        &self,
        game_id: String,
    ) -> BoxFuture<'static, StorageResult<Vec<CardEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_game_cards(game_id).await.map_err(Into::into) })
    }

    fn create_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.create_game(game).await.map_err(Into::into) })
    }

    fn update_game(&self, id: String, update: GameUpdate) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let fields = doc! {
                "phase": i32::from(update.phase.id()),
                "initiative_current": update.initiative_current,
            };
            store.update_game_fields(id, fields).await.map_err(Into::into)
        })
    }

    fn set_game_owner(&self, id: String, owner_id: i64) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .update_game_fields(id, doc! {"owner_id": owner_id})
                .await
                .map_err(Into::into)
        })
    }

    fn insert_cards(&self, cards: Vec<CardEntity>) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.insert_cards(cards).await.map_err(Into::into) })
    }

    fn create_player(&self, name: String) -> BoxFuture<'static, StorageResult<i64>> {
        let store = self.clone();
        Box::pin(async move { store.create_player(name).await.map_err(Into::into) })
    }

    fn add_game_player(
        &self,
        membership: GamePlayerEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.add_game_player(membership).await.map_err(Into::into) })
    }

    fn adjust_player_points(
        &self,
        game_id: String,
        player_id: i64,
        delta: i32,
    ) -> BoxFuture<'static, StorageResult<i32>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .adjust_player_points(game_id, player_id, delta)
                .await
                .map_err(Into::into)
        })
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
