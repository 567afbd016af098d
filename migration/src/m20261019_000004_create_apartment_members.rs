use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // apartment_owner
        manager
            .create_table(
                Table::create()
                    .table(ApartmentOwner::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ApartmentOwner::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ApartmentOwner::ApartmentId).uuid().not_null())
                    .col(ColumnDef::new(ApartmentOwner::UserId).uuid().not_null())
                    .col(
                        ColumnDef::new(ApartmentOwner::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_owner_apartment")
                            .from(ApartmentOwner::Table, ApartmentOwner::ApartmentId)
                            .to(Apartment::Table, Apartment::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_owner_user")
                            .from(ApartmentOwner::Table, ApartmentOwner::UserId)
                            .to(AppUser::Table, AppUser::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uq_apartment_owner")
                    .table(ApartmentOwner::Table)
                    .col(ApartmentOwner::ApartmentId)
                    .col(ApartmentOwner::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // apartment_resident
        manager
            .create_table(
                Table::create()
                    .table(ApartmentResident::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ApartmentResident::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ApartmentResident::ApartmentId)
                            .uuid()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ApartmentResident::UserId).uuid().not_null())
                    .col(
                        ColumnDef::new(ApartmentResident::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_resident_apartment")
                            .from(ApartmentResident::Table, ApartmentResident::ApartmentId)
                            .to(Apartment::Table, Apartment::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_resident_user")
                            .from(ApartmentResident::Table, ApartmentResident::UserId)
                            .to(AppUser::Table, AppUser::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uq_apartment_resident")
                    .table(ApartmentResident::Table)
                    .col(ApartmentResident::ApartmentId)
                    .col(ApartmentResident::UserId)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ApartmentResident::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ApartmentOwner::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum ApartmentOwner {
    Table,
    Id,
    ApartmentId,
    UserId,
    CreatedAt,
}

#[derive(Iden)]
enum ApartmentResident {
    Table,
    Id,
    ApartmentId,
    UserId,
    CreatedAt,
}

#[derive(Iden)]
enum Apartment {
    Table,
    Id,
}

#[derive(Iden)]
enum AppUser {
    Table,
    Id,
}
