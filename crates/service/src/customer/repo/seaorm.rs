use std::collections::BTreeMap;

use chrono::Utc;
use models::{address, customer};
use sea_orm::sea_query::{Expr, SimpleExpr};
use sea_orm::{
    AccessMode, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseBackend, DatabaseConnection,
    DatabaseTransaction, DbErr, EntityName, EntityTrait, IdenStatic, IsolationLevel, Order, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, SqlErr, TransactionTrait,
};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::customer::domain::{
    Address, AddressChanges, AddressFilter, Customer, CustomerChanges, CustomerDetails, CustomerQuery, NewAddress,
    NewCustomer, SortField, SortOrder,
};
use crate::customer::repository::CustomerRepository;
use crate::errors::ServiceError;
use crate::pagination::{Page, PageMeta};

/// SeaORM-backed repository implementation.
///
/// Multi-row operations run inside one database transaction; the owning
/// customer row is locked first (`SELECT ... FOR UPDATE` on PostgreSQL) so
/// primary-flag changes on the same customer never interleave. SQLite admits
/// a single writer and fails a deferred transaction that read before writing
/// with `SQLITE_BUSY`, so on SQLite write units queue on `write_gate` instead.
pub struct SeaOrmCustomerRepository {
    pub db: DatabaseConnection,
    write_gate: Mutex<()>,
}

impl SeaOrmCustomerRepository {
    pub fn new(db: DatabaseConnection) -> Self { Self { db, write_gate: Mutex::new(()) } }

    /// Open a write unit. The returned guard must outlive the transaction.
    async fn begin_write(&self) -> Result<(Option<MutexGuard<'_, ()>>, DatabaseTransaction), ServiceError> {
        let gate = match self.db.get_database_backend() {
            DatabaseBackend::Sqlite => Some(self.write_gate.lock().await),
            _ => None,
        };
        let txn = self.db.begin().await?;
        Ok((gate, txn))
    }

    /// Open a read unit that sees one snapshot across all of its statements.
    /// SQLite keeps its shared lock until the transaction ends.
    async fn begin_read(&self) -> Result<DatabaseTransaction, ServiceError> {
        let txn = match self.db.get_database_backend() {
            DatabaseBackend::Postgres => {
                self.db
                    .begin_with_config(Some(IsolationLevel::RepeatableRead), Some(AccessMode::ReadOnly))
                    .await?
            }
            _ => self.db.begin().await?,
        };
        Ok(txn)
    }
}

/// Commit on success, roll back on failure.
async fn finish<T>(txn: DatabaseTransaction, res: Result<T, ServiceError>) -> Result<T, ServiceError> {
    match res {
        Ok(v) => {
            txn.commit().await?;
            Ok(v)
        }
        Err(e) => {
            if let Err(rb) = txn.rollback().await {
                warn!(error = %rb, "transaction rollback failed");
            }
            Err(e)
        }
    }
}

/// Map a unique-constraint violation on the phone column to `Conflict`.
fn phone_conflict(e: DbErr, phone: &str) -> ServiceError {
    match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => ServiceError::duplicate_phone(phone),
        _ => ServiceError::from(e),
    }
}

async fn lock_customer(txn: &DatabaseTransaction, id: i32) -> Result<Option<customer::Model>, ServiceError> {
    let mut q = customer::Entity::find_by_id(id);
    if txn.get_database_backend() == DatabaseBackend::Postgres {
        q = q.lock_exclusive();
    }
    Ok(q.one(txn).await?)
}

async fn phone_owner<C: ConnectionTrait>(conn: &C, phone: &str) -> Result<Option<i32>, ServiceError> {
    let found = customer::Entity::find()
        .filter(customer::Column::PhoneNumber.eq(phone))
        .one(conn)
        .await?;
    Ok(found.map(|c| c.id))
}

async fn addresses_of<C: ConnectionTrait>(conn: &C, customer_id: i32) -> Result<Vec<Address>, ServiceError> {
    let rows = address::Entity::find()
        .filter(address::Column::CustomerId.eq(customer_id))
        .order_by_asc(address::Column::Id)
        .all(conn)
        .await?;
    Ok(rows.into_iter().map(Address::from).collect())
}

async fn clear_primary(txn: &DatabaseTransaction, customer_id: i32, except: Option<i32>) -> Result<(), ServiceError> {
    let mut q = address::Entity::update_many()
        .col_expr(address::Column::IsPrimary, Expr::value(false))
        .filter(address::Column::CustomerId.eq(customer_id));
    if let Some(id) = except {
        q = q.filter(address::Column::Id.ne(id));
    }
    q.exec(txn).await?;
    Ok(())
}

fn new_address_row(customer_id: i32, a: &NewAddress, is_primary: bool) -> address::ActiveModel {
    address::ActiveModel {
        customer_id: Set(customer_id),
        address_line: Set(a.address_line.clone()),
        city: Set(a.city.clone()),
        state: Set(a.state.clone()),
        pin_code: Set(a.pin_code.clone()),
        is_primary: Set(is_primary),
        ..Default::default()
    }
}

async fn insert_customer_rows(txn: &DatabaseTransaction, input: NewCustomer) -> Result<i32, ServiceError> {
    if phone_owner(txn, &input.phone_number).await?.is_some() {
        return Err(ServiceError::duplicate_phone(&input.phone_number));
    }
    let primary = input.primary_index();
    let created = customer::ActiveModel {
        first_name: Set(input.first_name.clone()),
        last_name: Set(input.last_name.clone()),
        phone_number: Set(input.phone_number.clone()),
        created_at: Set(Utc::now().into()),
        ..Default::default()
    }
    .insert(txn)
    .await
    .map_err(|e| phone_conflict(e, &input.phone_number))?;

    for (i, a) in input.addresses.iter().enumerate() {
        a.validate()?;
        new_address_row(created.id, a, Some(i) == primary).insert(txn).await?;
    }
    if primary.is_none() {
        return Err(ServiceError::invalid("addresses", "at least one address is required"));
    }
    Ok(created.id)
}

/// Ids of customers owning at least one address that matches `filter`.
/// Matching runs in Rust so every backend folds case the same way.
async fn matching_owner_ids<C: ConnectionTrait>(conn: &C, filter: &AddressFilter) -> Result<Vec<i32>, ServiceError> {
    let rows: Vec<(i32, String, String, String)> = address::Entity::find()
        .select_only()
        .columns([address::Column::CustomerId, address::Column::City, address::Column::State, address::Column::PinCode])
        .into_tuple()
        .all(conn)
        .await?;
    let mut ids: Vec<i32> = rows
        .into_iter()
        .filter(|(_, city, state, pin_code)| filter.matches_fields(city, state, pin_code))
        .map(|(customer_id, ..)| customer_id)
        .collect();
    ids.sort_unstable();
    ids.dedup();
    Ok(ids)
}

/// Sort key for `field`. Text columns compare bytewise (`COLLATE "C"`) on
/// PostgreSQL, matching SQLite's default BINARY collation and `str` ordering.
fn sort_expr(field: SortField, backend: DatabaseBackend) -> SimpleExpr {
    let col = sort_column(field);
    let text = matches!(field, SortField::FirstName | SortField::LastName | SortField::PhoneNumber);
    if text && backend == DatabaseBackend::Postgres {
        Expr::cust(format!(r#""{}"."{}" COLLATE "C""#, customer::Entity.table_name(), col.as_str()))
    } else {
        Expr::col((customer::Entity, col)).into()
    }
}

fn sort_column(field: SortField) -> customer::Column {
    match field {
        SortField::Id => customer::Column::Id,
        SortField::FirstName => customer::Column::FirstName,
        SortField::LastName => customer::Column::LastName,
        SortField::PhoneNumber => customer::Column::PhoneNumber,
        SortField::CreatedAt => customer::Column::CreatedAt,
    }
}

#[async_trait::async_trait]
impl CustomerRepository for SeaOrmCustomerRepository {
    fn backend(&self) -> &'static str { "database" }

    async fn ping(&self) -> Result<(), ServiceError> {
        self.db.ping().await?;
        Ok(())
    }

    async fn create_customer(&self, input: NewCustomer) -> Result<i32, ServiceError> {
        let (_gate, txn) = self.begin_write().await?;
        let res = insert_customer_rows(&txn, input).await;
        finish(txn, res).await
    }

    async fn get_customer(&self, id: i32) -> Result<Option<CustomerDetails>, ServiceError> {
        let txn = self.begin_read().await?;
        let res = async {
            let Some(c) = customer::Entity::find_by_id(id).one(&txn).await? else {
                return Ok(None);
            };
            let addresses = addresses_of(&txn, c.id).await?;
            Ok::<_, ServiceError>(Some(CustomerDetails { customer: Customer::from(c), addresses }))
        }
        .await;
        finish(txn, res).await
    }

    async fn list_customers(&self, query: &CustomerQuery) -> Result<Page<CustomerDetails>, ServiceError> {
        let order = match query.sort_order {
            SortOrder::Asc => Order::Asc,
            SortOrder::Desc => Order::Desc,
        };
        let backend = self.db.get_database_backend();
        let txn = self.begin_read().await?;
        let res = async {
            let mut select = customer::Entity::find();
            if !query.filter.is_empty() {
                let owners = matching_owner_ids(&txn, &query.filter).await?;
                select = select.filter(customer::Column::Id.is_in(owners));
            }
            if query.sort_by != SortField::Id {
                select = select.order_by(sort_expr(query.sort_by, backend), order.clone());
            }
            select = select.order_by(customer::Column::Id, order);

            let (page_idx, per_page) = query.pagination.normalize();
            let paginator = select.paginate(&txn, per_page);
            let total = paginator.num_items().await?;
            let rows = paginator.fetch_page(page_idx).await?;

            let ids: Vec<i32> = rows.iter().map(|c| c.id).collect();
            let mut grouped: BTreeMap<i32, Vec<Address>> = BTreeMap::new();
            if !ids.is_empty() {
                let addrs = address::Entity::find()
                    .filter(address::Column::CustomerId.is_in(ids))
                    .order_by_asc(address::Column::Id)
                    .all(&txn)
                    .await?;
                for a in addrs {
                    grouped.entry(a.customer_id).or_default().push(Address::from(a));
                }
            }
            let items = rows
                .into_iter()
                .map(|c| {
                    let addresses = grouped.remove(&c.id).unwrap_or_default();
                    CustomerDetails { customer: Customer::from(c), addresses }
                })
                .collect();
            Ok::<_, ServiceError>(Page { items, meta: PageMeta::new(query.pagination, total) })
        }
        .await;
        finish(txn, res).await
    }

    async fn update_customer(&self, id: i32, changes: CustomerChanges) -> Result<Customer, ServiceError> {
        let (_gate, txn) = self.begin_write().await?;
        let res = async {
            let found = lock_customer(&txn, id).await?.ok_or_else(|| ServiceError::not_found("customer"))?;
            if let Some(phone) = &changes.phone_number {
                if matches!(phone_owner(&txn, phone).await?, Some(owner) if owner != id) {
                    return Err(ServiceError::duplicate_phone(phone));
                }
            }
            let mut am: customer::ActiveModel = found.into();
            if let Some(v) = changes.first_name.clone() { am.first_name = Set(v); }
            if let Some(v) = changes.last_name.clone() { am.last_name = Set(v); }
            if let Some(v) = changes.phone_number.clone() { am.phone_number = Set(v); }
            let phone = changes.phone_number.as_deref().unwrap_or_default();
            let updated = am.update(&txn).await.map_err(|e| phone_conflict(e, phone))?;
            Ok::<_, ServiceError>(Customer::from(updated))
        }
        .await;
        finish(txn, res).await
    }

    async fn delete_customer(&self, id: i32) -> Result<(), ServiceError> {
        let (_gate, txn) = self.begin_write().await?;
        let res = async {
            // The FK cascades as well; deleting explicitly keeps the unit
            // independent of per-connection foreign key settings.
            let removed = address::Entity::delete_many()
                .filter(address::Column::CustomerId.eq(id))
                .exec(&txn)
                .await?;
            let deleted = customer::Entity::delete_by_id(id).exec(&txn).await?;
            if deleted.rows_affected == 0 {
                return Err(ServiceError::not_found("customer"));
            }
            debug!(customer_id = id, removed = removed.rows_affected, "cascaded address removal");
            Ok::<_, ServiceError>(())
        }
        .await;
        finish(txn, res).await
    }

    async fn list_addresses(&self, customer_id: i32) -> Result<Vec<Address>, ServiceError> {
        addresses_of(&self.db, customer_id).await
    }

    async fn count_addresses(&self, customer_id: i32) -> Result<u64, ServiceError> {
        let n = address::Entity::find()
            .filter(address::Column::CustomerId.eq(customer_id))
            .count(&self.db)
            .await?;
        Ok(n)
    }

    async fn add_address(&self, customer_id: i32, input: NewAddress) -> Result<Address, ServiceError> {
        let (_gate, txn) = self.begin_write().await?;
        let res = async {
            lock_customer(&txn, customer_id).await?.ok_or_else(|| ServiceError::not_found("customer"))?;
            let siblings = address::Entity::find()
                .filter(address::Column::CustomerId.eq(customer_id))
                .count(&txn)
                .await?;
            let make_primary = input.is_primary || siblings == 0;
            if make_primary {
                clear_primary(&txn, customer_id, None).await?;
            }
            let created = new_address_row(customer_id, &input, make_primary).insert(&txn).await?;
            Ok::<_, ServiceError>(Address::from(created))
        }
        .await;
        finish(txn, res).await
    }

    async fn update_address(&self, id: i32, changes: AddressChanges) -> Result<Address, ServiceError> {
        let (_gate, txn) = self.begin_write().await?;
        let res = async {
            let found = address::Entity::find_by_id(id).one(&txn).await?.ok_or_else(|| ServiceError::not_found("address"))?;
            lock_customer(&txn, found.customer_id).await?;
            if changes.is_primary == Some(true) {
                clear_primary(&txn, found.customer_id, Some(id)).await?;
            }
            let mut am: address::ActiveModel = found.into();
            if let Some(v) = changes.address_line.clone() { am.address_line = Set(v); }
            if let Some(v) = changes.city.clone() { am.city = Set(v); }
            if let Some(v) = changes.state.clone() { am.state = Set(v); }
            if let Some(v) = changes.pin_code.clone() { am.pin_code = Set(v); }
            if let Some(v) = changes.is_primary { am.is_primary = Set(v); }
            let updated = am.update(&txn).await?;
            Ok::<_, ServiceError>(Address::from(updated))
        }
        .await;
        finish(txn, res).await
    }

    async fn delete_address(&self, id: i32) -> Result<(), ServiceError> {
        let (_gate, txn) = self.begin_write().await?;
        let res = async {
            let found = address::Entity::find_by_id(id).one(&txn).await?.ok_or_else(|| ServiceError::not_found("address"))?;
            lock_customer(&txn, found.customer_id).await?;
            let siblings = address::Entity::find()
                .filter(address::Column::CustomerId.eq(found.customer_id))
                .count(&txn)
                .await?;
            if siblings <= 1 {
                return Err(ServiceError::LastAddress(found.customer_id));
            }
            address::Entity::delete_by_id(id).exec(&txn).await?;
            if found.is_primary {
                let next = address::Entity::find()
                    .filter(address::Column::CustomerId.eq(found.customer_id))
                    .order_by_asc(address::Column::Id)
                    .one(&txn)
                    .await?;
                if let Some(next) = next {
                    let next_id = next.id;
                    let mut am: address::ActiveModel = next.into();
                    am.is_primary = Set(true);
                    am.update(&txn).await?;
                    debug!(address_id = next_id, customer_id = found.customer_id, "promoted address to primary");
                }
            }
            Ok::<_, ServiceError>(())
        }
        .await;
        finish(txn, res).await
    }
}
