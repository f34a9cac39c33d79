use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::{ConnectionTrait, DatabaseBackend, Statement};

#[derive(DeriveMigrationName)]
pub struct Migration;

/// `(table, tsvector expression)`; the API searches the generated `tsv` column.
const SEARCH_COLUMNS: &[(&str, &str)] = &[
    (
        "contact",
        "setweight(to_tsvector('simple', coalesce(email, '')), 'A') || \
         setweight(to_tsvector('simple', coalesce(first_name, '')), 'B') || \
         setweight(to_tsvector('simple', coalesce(last_name, '')), 'B')",
    ),
    (
        "company",
        "setweight(to_tsvector('simple', coalesce(name, '')), 'A') || \
         setweight(to_tsvector('simple', coalesce(domain, '')), 'C')",
    ),
    (
        "deal",
        "setweight(to_tsvector('simple', coalesce(title, '')), 'A')",
    ),
    (
        "task",
        "setweight(to_tsvector('simple', coalesce(title, '')), 'A') || \
         setweight(to_tsvector('simple', coalesce(description, '')), 'C')",
    ),
];

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Text indexes are Postgres only; other backends fall back to LIKE.
        if manager.get_database_backend() != DatabaseBackend::Postgres {
            return Ok(());
        }
        let conn = manager.get_connection();
        for (table, expr) in SEARCH_COLUMNS {
            conn.execute(Statement::from_string(
                DatabaseBackend::Postgres,
                format!(
                    "ALTER TABLE {table} ADD COLUMN IF NOT EXISTS tsv tsvector GENERATED ALWAYS AS ({expr}) STORED;"
                ),
            ))
            .await?;
            conn.execute(Statement::from_string(
                DatabaseBackend::Postgres,
                format!("CREATE INDEX IF NOT EXISTS idx_{table}_tsv ON {table} USING GIN (tsv);"),
            ))
            .await?;
        }
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        if manager.get_database_backend() != DatabaseBackend::Postgres {
            return Ok(());
        }
        let conn = manager.get_connection();
        for (table, _) in SEARCH_COLUMNS {
            conn.execute(Statement::from_string(
                DatabaseBackend::Postgres,
                format!("DROP INDEX IF EXISTS idx_{table}_tsv;"),
            ))
            .await?;
            conn.execute(Statement::from_string(
                DatabaseBackend::Postgres,
                format!("ALTER TABLE {table} DROP COLUMN IF EXISTS tsv;"),
            ))
            .await?;
        }
        Ok(())
    }
}
