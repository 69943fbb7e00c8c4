use crate::entities::prelude::*;
use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::Schema;

#[derive(DeriveMigrationName)]
pub struct Migration;

/// Default admin password, rotate after first login.
const DEFAULT_ADMIN_PASSWORD: &[u8] = b"changeme123";

/// Hash the default admin password using Argon2id
fn hash_default_password() -> String {
    use argon2::{
        Argon2,
        password_hash::{PasswordHasher, SaltString, rand_core::OsRng},
    };

    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(DEFAULT_ADMIN_PASSWORD, &salt)
        .expect("Failed to hash default password")
        .to_string()
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let backend = manager.get_database_backend();
        let schema = Schema::new(backend);

        manager
            .create_table(
                schema
                    .create_table_from_entity(Users)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(ApiKeys)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(Apps)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(Deployments)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(Functions)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(ActivityLogs)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        // App and function names are unique per owner, not globally.
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_apps_user_name")
                    .table(Apps)
                    .col(crate::entities::apps::Column::UserId)
                    .col(crate::entities::apps::Column::Name)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_functions_user_name")
                    .table(Functions)
                    .col(crate::entities::functions::Column::UserId)
                    .col(crate::entities::functions::Column::Name)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_deployments_app")
                    .table(Deployments)
                    .col(crate::entities::deployments::Column::AppId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_activity_logs_app")
                    .table(ActivityLogs)
                    .col(crate::entities::activity_logs::Column::AppId)
                    .to_owned(),
            )
            .await?;

        // Seed the bootstrap admin account
        let now = chrono::Utc::now().to_rfc3339();
        let password_hash = hash_default_password();

        let insert = sea_orm_migration::sea_query::Query::insert()
            .into_table(Users)
            .columns([
                crate::entities::users::Column::Id,
                crate::entities::users::Column::Username,
                crate::entities::users::Column::Email,
                crate::entities::users::Column::PasswordHash,
                crate::entities::users::Column::Role,
                crate::entities::users::Column::IsActive,
                crate::entities::users::Column::CreatedAt,
                crate::entities::users::Column::UpdatedAt,
            ])
            .values_panic([
                uuid::Uuid::new_v4().to_string().into(),
                "admin".into(),
                "admin@skydock.app".into(),
                password_hash.into(),
                "admin".into(),
                true.into(),
                now.clone().into(),
                now.into(),
            ])
            .to_owned();

        manager.exec_stmt(insert).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ActivityLogs).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Functions).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Deployments).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Apps).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ApiKeys).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users).to_owned())
            .await?;

        Ok(())
    }
}
