use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AppUser::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AppUser::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AppUser::Name).string().not_null())
                    .col(
                        ColumnDef::new(AppUser::Username)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    // NULLs never collide, so agents and supervisors may omit an email.
                    .col(ColumnDef::new(AppUser::Email).string().null().unique_key())
                    .col(ColumnDef::new(AppUser::PasswordHash).string().not_null())
                    .col(ColumnDef::new(AppUser::Role).string().not_null())
                    .col(
                        ColumnDef::new(AppUser::Status)
                            .string()
                            .not_null()
                            .default("ACTIVE"),
                    )
                    // No FK: apartment rows reference agents, which reference users.
                    .col(ColumnDef::new(AppUser::ApartmentId).uuid().null())
                    .col(ColumnDef::new(AppUser::LastLoginAt).timestamp().null())
                    .col(
                        ColumnDef::new(AppUser::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(AppUser::UpdatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_app_user_apartment")
                    .table(AppUser::Table)
                    .col(AppUser::ApartmentId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AppUser::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum AppUser {
    Table,
    Id,
    Name,
    Username,
    Email,
    PasswordHash,
    Role,
    Status,
    ApartmentId,
    LastLoginAt,
    CreatedAt,
    UpdatedAt,
}
