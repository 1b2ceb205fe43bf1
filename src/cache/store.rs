use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder,
};

use crate::models::{TrackActiveModel, TrackColumn, TrackEntity, TrackModel, TrackStatus, TrackTags};

/// Outcome of `try_insert_caching`: whether this call's insert won the
/// race, or a row already existed (in which case it is returned unmodified).
#[derive(Debug)]
pub enum InsertOutcome {
    Inserted,
    Existed(TrackModel),
}

/// The Metadata Store: the durable table of track records. Abstracted
/// behind a trait so the Cache Coordinator's dispatch logic can be unit
/// tested against an in-memory fake instead of a live database.
#[async_trait]
pub trait TrackStore: Send + Sync {
    async fn get(&self, query: &str) -> Result<Option<TrackModel>, DbErr>;
    async fn try_insert_caching(&self, query: &str) -> Result<InsertOutcome, DbErr>;
    async fn mark_cached(
        &self,
        query: &str,
        file_name: &str,
        tags: &TrackTags,
    ) -> Result<(), DbErr>;
    async fn mark_error(&self, query: &str) -> Result<(), DbErr>;
    async fn reset_to_caching(&self, query: &str) -> Result<(), DbErr>;
    async fn touch(&self, file_name: &str) -> Result<(), DbErr>;
    async fn list_cached_lru_asc(&self) -> Result<Vec<TrackModel>, DbErr>;
    async fn list_cached_by_recency_desc(&self) -> Result<Vec<TrackModel>, DbErr>;
    async fn delete_by_file_name(&self, file_name: &str) -> Result<(), DbErr>;
}

pub struct SeaOrmTrackStore {
    db: DatabaseConnection,
}

impl SeaOrmTrackStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TrackStore for SeaOrmTrackStore {
    async fn get(&self, query: &str) -> Result<Option<TrackModel>, DbErr> {
        TrackEntity::find_by_id(query.to_string()).one(&self.db).await
    }

    async fn try_insert_caching(&self, query: &str) -> Result<InsertOutcome, DbErr> {
        let active = TrackActiveModel {
            search_query: Set(query.to_string()),
            status: Set(TrackStatus::Caching),
            file_name: Set(None),
            title: Set(None),
            artist: Set(None),
            album: Set(None),
            duration: Set(None),
            cached_at: Set(None),
            last_accessed_at: Set(None),
        };

        match TrackEntity::insert(active).exec(&self.db).await {
            Ok(_) => Ok(InsertOutcome::Inserted),
            Err(insert_err) => {
                // search_query is the primary key: a concurrent lookup winning
                // the race is observed here as an insert failure. Re-read the
                // row rather than trust the error's shape across backends.
                match self.get(query).await? {
                    Some(existing) => Ok(InsertOutcome::Existed(existing)),
                    None => Err(insert_err),
                }
            }
        }
    }

    async fn mark_cached(
        &self,
        query: &str,
        file_name: &str,
        tags: &TrackTags,
    ) -> Result<(), DbErr> {
        let now = Utc::now();
        let active = TrackActiveModel {
            search_query: Set(query.to_string()),
            status: Set(TrackStatus::Cached),
            file_name: Set(Some(file_name.to_string())),
            title: Set(Some(tags.title.clone())),
            artist: Set(Some(tags.artist.clone())),
            album: Set(tags.album.clone()),
            duration: Set(tags.duration),
            cached_at: Set(Some(now)),
            last_accessed_at: Set(Some(now)),
        };
        active.update(&self.db).await?;
        Ok(())
    }

    async fn mark_error(&self, query: &str) -> Result<(), DbErr> {
        let active = TrackActiveModel {
            search_query: Set(query.to_string()),
            status: Set(TrackStatus::Error),
            ..Default::default()
        };
        active.update(&self.db).await?;
        Ok(())
    }

    async fn reset_to_caching(&self, query: &str) -> Result<(), DbErr> {
        let active = TrackActiveModel {
            search_query: Set(query.to_string()),
            status: Set(TrackStatus::Caching),
            file_name: Set(None),
            ..Default::default()
        };
        active.update(&self.db).await?;
        Ok(())
    }

    async fn touch(&self, file_name: &str) -> Result<(), DbErr> {
        TrackEntity::update_many()
            .col_expr(
                TrackColumn::LastAccessedAt,
                sea_orm::sea_query::Expr::value(Utc::now()),
            )
            .filter(TrackColumn::FileName.eq(file_name))
            .exec(&self.db)
            .await?;
        Ok(())
    }

    async fn list_cached_lru_asc(&self) -> Result<Vec<TrackModel>, DbErr> {
        TrackEntity::find()
            .filter(TrackColumn::Status.eq(TrackStatus::Cached))
            .filter(TrackColumn::FileName.is_not_null())
            .order_by_asc(TrackColumn::LastAccessedAt)
            .all(&self.db)
            .await
    }

    async fn list_cached_by_recency_desc(&self) -> Result<Vec<TrackModel>, DbErr> {
        TrackEntity::find()
            .filter(TrackColumn::Status.eq(TrackStatus::Cached))
            .order_by_desc(TrackColumn::CachedAt)
            .all(&self.db)
            .await
    }

    async fn delete_by_file_name(&self, file_name: &str) -> Result<(), DbErr> {
        TrackEntity::delete_many()
            .filter(TrackColumn::FileName.eq(file_name))
            .exec(&self.db)
            .await?;
        Ok(())
    }
}
