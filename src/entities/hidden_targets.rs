use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "hidden_targets")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Trimmed identifier (mobile number or email). Unique via index.
    pub value: String,
    #[sea_orm(column_name = "type")]
    pub kind: String,
    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
