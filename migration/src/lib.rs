pub use sea_orm_migration::prelude::*;

mod m20261019_000001_create_app_users;
mod m20261019_000002_create_agents;
mod m20261019_000003_create_apartments;
mod m20261019_000004_create_apartment_members;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20261019_000001_create_app_users::Migration),
            Box::new(m20261019_000002_create_agents::Migration),
            Box::new(m20261019_000003_create_apartments::Migration),
            Box::new(m20261019_000004_create_apartment_members::Migration),
        ]
    }
}
