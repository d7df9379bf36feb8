//! Expense category repository.

use potluck_core::LedgerResult;
use potluck_shared::types::CategoryId;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use tracing::{debug, info};

use super::db_err;
use crate::entities::categories;

/// Normalizes a category name: trimmed, first letter upper-cased, the rest lower-cased.
///
/// `"  groceries "`, `"GROCERIES"` and `"Groceries"` all map to `"Groceries"`.
#[must_use]
pub fn canonical_category_name(name: &str) -> String {
    let lower = name.trim().to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Looks a category up by canonical name, creating it if missing.
pub(crate) async fn find_or_create<C: ConnectionTrait>(
    conn: &C,
    name: &str,
) -> LedgerResult<categories::Model> {
    let name = canonical_category_name(name);
    let existing = categories::Entity::find()
        .filter(categories::Column::Name.eq(name.as_str()))
        .one(conn)
        .await
        .map_err(db_err)?;
    if let Some(category) = existing {
        return Ok(category);
    }

    let category = categories::ActiveModel {
        id: Set(CategoryId::new().into_inner()),
        name: Set(name),
    }
    .insert(conn)
    .await
    .map_err(db_err)?;

    debug!(category_id = %category.id, name = %category.name, "Category created");
    Ok(category)
}

/// Category repository.
#[derive(Debug, Clone)]
pub struct CategoryRepository {
    db: DatabaseConnection,
}

impl CategoryRepository {
    /// Creates a new category repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Lists every category alphabetically.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(&self) -> LedgerResult<Vec<categories::Model>> {
        categories::Entity::find()
            .order_by_asc(categories::Column::Name)
            .all(&self.db)
            .await
            .map_err(db_err)
    }

    /// Ensures the configured default categories exist. Safe to run on every start.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn seed_defaults(&self, names: &[String]) -> LedgerResult<usize> {
        let mut created = 0;
        for name in names {
            if name.trim().is_empty() {
                continue;
            }
            let before = categories::Entity::find()
                .filter(categories::Column::Name.eq(canonical_category_name(name)))
                .one(&self.db)
                .await
                .map_err(db_err)?;
            if before.is_none() {
                find_or_create(&self.db, name).await?;
                created += 1;
            }
        }
        if created > 0 {
            info!(created, "Default categories seeded");
        }
        Ok(created)
    }
}
