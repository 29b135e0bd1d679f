use crate::entities::{daily_usage, prelude::*};
use anyhow::Result;
use chrono::NaiveDate;
use sea_orm::{DatabaseConnection, EntityTrait, Set};

pub struct QuotaRepository {
    conn: DatabaseConnection,
}

impl QuotaRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Current lookup count for a client key on the given day (0 if no row yet).
    pub async fn get_count(&self, key: &str, day: NaiveDate) -> Result<i32> {
        let row = DailyUsage::find_by_id((key.to_string(), day.to_string()))
            .one(&self.conn)
            .await?;

        Ok(row.map_or(0, |r| r.count))
    }

    /// Upsert: create the day's row at 1, or bump an existing one by 1.
    pub async fn increment(&self, key: &str, day: NaiveDate) -> Result<()> {
        let active_model = daily_usage::ActiveModel {
            ip: Set(key.to_string()),
            date: Set(day.to_string()),
            count: Set(1),
        };

        DailyUsage::insert(active_model)
            .on_conflict(
                sea_orm::sea_query::OnConflict::columns([
                    daily_usage::Column::Ip,
                    daily_usage::Column::Date,
                ])
                .value(
                    daily_usage::Column::Count,
                    sea_orm::sea_query::Expr::col(daily_usage::Column::Count).add(1),
                )
                .to_owned(),
            )
            .exec(&self.conn)
            .await?;

        Ok(())
    }
}
