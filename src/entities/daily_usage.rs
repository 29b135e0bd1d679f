use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "daily_usage")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub ip: String,
    /// Calendar day as an ISO `YYYY-MM-DD` string. SQLite doesn't enforce
    /// column types, so dates are stored as strings like the rest of the schema.
    #[sea_orm(primary_key, auto_increment = false)]
    pub date: String,
    pub count: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
