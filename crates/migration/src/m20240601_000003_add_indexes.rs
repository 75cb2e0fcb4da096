//! Secondary indexes for address lookups by owner and customer listing order.
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_index(
                Index::create()
                    .name("idx_address_customer_id")
                    .table(Address::Table)
                    .col(Address::CustomerId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_customer_created_at")
                    .table(Customer::Table)
                    .col(Customer::CreatedAt)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_customer_created_at").table(Customer::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_address_customer_id").table(Address::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Address { Table, CustomerId }

#[derive(DeriveIden)]
enum Customer { Table, CreatedAt }
