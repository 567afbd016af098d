use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Apartment::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Apartment::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Apartment::Code)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Apartment::Name).string().not_null())
                    .col(
                        ColumnDef::new(Apartment::Address)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Apartment::ApartmentType)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(Apartment::AgentId).uuid().not_null())
                    .col(
                        ColumnDef::new(Apartment::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Apartment::UpdatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_apartment_agent")
                            .from(Apartment::Table, Apartment::AgentId)
                            .to(Agent::Table, Agent::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_apartment_agent")
                    .table(Apartment::Table)
                    .col(Apartment::AgentId)
                    .col(Apartment::CreatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Apartment::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Apartment {
    Table,
    Id,
    Code,
    Name,
    Address,
    ApartmentType,
    AgentId,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Agent {
    Table,
    Id,
}
