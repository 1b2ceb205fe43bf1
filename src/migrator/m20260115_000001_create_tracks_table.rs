use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Tracks::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Tracks::SearchQuery)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Tracks::Status).string().not_null())
                    .col(ColumnDef::new(Tracks::FileName).string().unique_key())
                    .col(ColumnDef::new(Tracks::Title).string())
                    .col(ColumnDef::new(Tracks::Artist).string())
                    .col(ColumnDef::new(Tracks::Album).string())
                    .col(ColumnDef::new(Tracks::Duration).double())
                    .col(ColumnDef::new(Tracks::CachedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Tracks::LastAccessedAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared(
                "ALTER TABLE tracks ADD CONSTRAINT tracks_status_check CHECK (status IN ('caching', 'cached', 'error'))",
            )
            .await?;

        // Drives list_cached_lru_asc: the eviction engine's victim scan.
        manager
            .create_index(
                Index::create()
                    .name("idx_tracks_status_last_accessed")
                    .table(Tracks::Table)
                    .col(Tracks::Status)
                    .col(Tracks::LastAccessedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Tracks::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Tracks {
    Table,
    SearchQuery,
    Status,
    FileName,
    Title,
    Artist,
    Album,
    Duration,
    CachedAt,
    LastAccessedAt,
}
