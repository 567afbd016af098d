use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Agent::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Agent::Id).uuid().not_null().primary_key())
                    .col(
                        ColumnDef::new(Agent::UserId)
                            .uuid()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Agent::Email)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    // Codes are globally unique and start with the prefix.
                    .col(
                        ColumnDef::new(Agent::Prefix)
                            .string_len(2)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Agent::LastIssuedCode).string().null())
                    .col(
                        ColumnDef::new(Agent::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Agent::UpdatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_agent_user")
                            .from(Agent::Table, Agent::UserId)
                            .to(AppUser::Table, AppUser::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Agent::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Agent {
    Table,
    Id,
    UserId,
    Email,
    Prefix,
    LastIssuedCode,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum AppUser {
    Table,
    Id,
}
