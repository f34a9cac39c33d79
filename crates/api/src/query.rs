//! Pagination and free-text search shared by the list endpoints.

use sea_orm::sea_query::{Condition, Expr, Func, SimpleExpr};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DbBackend, DbErr, EntityTrait, FromQueryResult, PaginatorTrait,
    QuerySelect, Select,
};
use serde::Serialize;

use crate::error::{ApiError, ApiResult};

pub const DEFAULT_PAGE_SIZE: u64 = 10;
pub const MAX_PAGE_SIZE: u64 = 100;

/// A 1-indexed page request with a clamped size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Page {
    pub number: u64,
    pub size: u64,
}

impl Page {
    /// Rejects pages whose row offset does not fit a signed 64-bit bind.
    pub fn new(page: Option<u64>, limit: Option<u64>, default_size: u64) -> ApiResult<Self> {
        let page = Self {
            number: page.unwrap_or(1).max(1),
            size: limit.unwrap_or(default_size).clamp(1, MAX_PAGE_SIZE),
        };
        match (page.number - 1).checked_mul(page.size) {
            Some(offset) if offset <= i64::MAX as u64 => Ok(page),
            _ => Err(ApiError::validation("Page is out of range")),
        }
    }

    pub fn offset(&self) -> u64 {
        (self.number - 1) * self.size
    }

    pub fn total_pages(&self, total: u64) -> u64 {
        total.div_ceil(self.size)
    }

    pub fn info(&self, total: u64) -> PageInfo {
        PageInfo {
            total_pages: self.total_pages(total),
            current_page: self.number,
            total,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub total_pages: u64,
    pub current_page: u64,
    pub total: u64,
}

/// Counts the full match set, then loads one page of it.
pub async fn fetch_page<E, C>(
    select: Select<E>,
    page: Page,
    db: &C,
) -> Result<(Vec<E::Model>, PageInfo), DbErr>
where
    E: EntityTrait,
    E::Model: FromQueryResult + Send + Sync + 'static,
    C: ConnectionTrait,
{
    let total = select.clone().count(db).await?;
    let items = select
        .limit(page.size)
        .offset(page.offset())
        .all(db)
        .await?;
    Ok((items, page.info(total)))
}

/// Free-text match over an entity's indexed text.
///
/// Postgres uses the generated `tsv` column of `table`; other backends fall
/// back to a case-insensitive substring match across `columns`.
pub fn text_search<C>(backend: DbBackend, table: &str, columns: &[C], term: &str) -> Option<Condition>
where
    C: ColumnTrait,
{
    let term = term.trim();
    if term.is_empty() {
        return None;
    }
    let condition = match backend {
        DbBackend::Postgres => Condition::all().add(Expr::cust_with_values(
            format!("{table}.tsv @@ plainto_tsquery('simple', $1)"),
            [term.to_string()],
        )),
        _ => {
            let pattern = format!("%{}%", term.to_lowercase());
            columns.iter().fold(Condition::any(), |condition, column| {
                condition.add(lower(*column).like(pattern.clone()))
            })
        }
    };
    Some(condition)
}

fn lower<C: ColumnTrait>(column: C) -> Expr {
    Expr::expr(Func::lower(Expr::col(column)))
}

/// `CASE` rank for task priorities, larger is more urgent.
pub fn priority_rank_expr() -> SimpleExpr {
    Expr::cust(
        "CASE WHEN task.priority = 'urgent' THEN 3 WHEN task.priority = 'high' THEN 2 \
         WHEN task.priority = 'medium' THEN 1 ELSE 0 END",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use entity::contact;
    use sea_orm::{QueryFilter, QueryTrait};

    #[test]
    fn page_defaults_and_clamps() {
        assert_eq!(Page::new(None, None, 10).unwrap(), Page { number: 1, size: 10 });
        assert_eq!(Page::new(Some(0), Some(0), 10).unwrap(), Page { number: 1, size: 1 });
        assert_eq!(Page::new(Some(3), Some(500), 10).unwrap().size, MAX_PAGE_SIZE);
    }

    #[test]
    fn huge_pages_are_rejected() {
        assert!(matches!(
            Page::new(Some(u64::MAX), Some(10), 10),
            Err(ApiError::Validation(_))
        ));
        assert!(Page::new(Some(1_000_000_000_000_000_001), Some(10), 10).is_err());
        let last = i64::MAX as u64 / 10 + 1;
        assert_eq!(Page::new(Some(last), Some(10), 10).unwrap().offset(), (last - 1) * 10);
    }

    #[test]
    fn total_pages_rounds_up() {
        let page = Page::new(Some(2), Some(10), 10).unwrap();
        assert_eq!(page.offset(), 10);
        assert_eq!(page.total_pages(15), 2);
        assert_eq!(page.total_pages(20), 2);
        assert_eq!(page.total_pages(0), 0);
        assert_eq!(
            page.info(15),
            PageInfo { total_pages: 2, current_page: 2, total: 15 }
        );
    }

    #[test]
    fn blank_search_adds_nothing() {
        let columns = [contact::Column::FirstName];
        assert!(text_search(DbBackend::Sqlite, "contact", &columns, "  ").is_none());
    }

    #[test]
    fn sqlite_search_ors_lowercased_columns() {
        let columns = [contact::Column::FirstName, contact::Column::Email];
        let condition = text_search(DbBackend::Sqlite, "contact", &columns, "Ada").unwrap();
        let sql = contact::Entity::find()
            .filter(condition)
            .build(DbBackend::Sqlite)
            .to_string();
        assert!(sql.contains(r#"LOWER("first_name") LIKE '%ada%'"#), "{sql}");
        assert!(sql.contains(r#"LOWER("email") LIKE '%ada%'"#), "{sql}");
        assert!(sql.contains(" OR "), "{sql}");
    }

    #[test]
    fn postgres_search_uses_tsvector() {
        let columns = [contact::Column::FirstName];
        let condition = text_search(DbBackend::Postgres, "contact", &columns, "ada").unwrap();
        let sql = contact::Entity::find()
            .filter(condition)
            .build(DbBackend::Postgres)
            .to_string();
        assert!(sql.contains("contact.tsv @@ plainto_tsquery('simple', 'ada')"), "{sql}");
    }
}
