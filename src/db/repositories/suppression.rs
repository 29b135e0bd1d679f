use crate::entities::{hidden_targets, prelude::*};
use anyhow::Result;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, Set};

pub struct SuppressionRepository {
    conn: DatabaseConnection,
}

impl SuppressionRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Exact match against the opt-out registry. Values are stored trimmed,
    /// case-sensitive.
    pub async fn contains(&self, value: &str) -> Result<bool> {
        let count = HiddenTargets::find()
            .filter(hidden_targets::Column::Value.eq(value))
            .count(&self.conn)
            .await?;

        Ok(count > 0)
    }

    /// Idempotent insert, unique on value. Re-submitting an already hidden
    /// identifier is a no-op.
    pub async fn add(&self, value: &str, kind: &str) -> Result<()> {
        let active_model = hidden_targets::ActiveModel {
            value: Set(value.trim().to_string()),
            kind: Set(kind.to_string()),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        };

        HiddenTargets::insert(active_model)
            .on_conflict(
                sea_orm::sea_query::OnConflict::column(hidden_targets::Column::Value)
                    .do_nothing()
                    .to_owned(),
            )
            .do_nothing()
            .exec(&self.conn)
            .await?;

        Ok(())
    }
}
