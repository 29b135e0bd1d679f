use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(DailyUsage::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(DailyUsage::Ip).string().not_null())
                    .col(ColumnDef::new(DailyUsage::Date).string().not_null())
                    .col(
                        ColumnDef::new(DailyUsage::Count)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .primary_key(
                        Index::create()
                            .col(DailyUsage::Ip)
                            .col(DailyUsage::Date),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(HiddenTargets::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(HiddenTargets::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(HiddenTargets::Value).string().not_null())
                    .col(ColumnDef::new(HiddenTargets::Type).string().not_null())
                    .col(
                        ColumnDef::new(HiddenTargets::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique: required for the conflict-ignore insert on opt-out.
        manager
            .create_index(
                Index::create()
                    .name("idx_hidden_targets_value")
                    .table(HiddenTargets::Table)
                    .col(HiddenTargets::Value)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(HiddenTargets::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(DailyUsage::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum DailyUsage {
    Table,
    Ip,
    Date,
    Count,
}

#[derive(DeriveIden)]
enum HiddenTargets {
    Table,
    Id,
    Value,
    Type,
    CreatedAt,
}
