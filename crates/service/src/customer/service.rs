use std::sync::Arc;

use tracing::{info, instrument};

use super::domain::{
    Address, AddressChanges, Customer, CustomerChanges, CustomerDetails, CustomerQuery, NewAddress, NewCustomer,
};
use super::repository::CustomerRepository;
use crate::errors::ServiceError;
use crate::pagination::Page;

/// Application service encapsulating customer/address business rules.
/// Normalizes and validates input before it reaches the repository, so the
/// repository only ever sees well-formed rows.
#[derive(Clone)]
pub struct CustomerService {
    repo: Arc<dyn CustomerRepository>,
}

impl CustomerService {
    pub fn new(repo: Arc<dyn CustomerRepository>) -> Self { Self { repo } }

    pub fn backend(&self) -> &'static str { self.repo.backend() }

    pub async fn ping(&self) -> Result<(), ServiceError> { self.repo.ping().await }

    /// Create a customer with its addresses in one unit.
    ///
    /// # Examples
    /// ```
    /// use service::customer::{CustomerService, domain::{NewAddress, NewCustomer}, repo::InMemoryCustomerRepository};
    /// use std::sync::Arc;
    /// let svc = CustomerService::new(Arc::new(InMemoryCustomerRepository::new()));
    /// let input = NewCustomer {
    ///     first_name: "A".into(),
    ///     last_name: "B".into(),
    ///     phone_number: "1111111111".into(),
    ///     addresses: vec![NewAddress { address_line: "X".into(), city: "Y".into(), state: "Z".into(), pin_code: "123456".into(), is_primary: false }],
    /// };
    /// let id = tokio_test::block_on(svc.create_customer(input)).unwrap();
    /// let found = tokio_test::block_on(svc.get_customer(id)).unwrap();
    /// assert!(found.addresses[0].is_primary);
    /// ```
    #[instrument(skip(self, input), fields(addresses = input.addresses.len()))]
    pub async fn create_customer(&self, input: NewCustomer) -> Result<i32, ServiceError> {
        let input = input.normalized();
        input.validate()?;
        let id = self.repo.create_customer(input).await?;
        info!(customer_id = id, "customer_created");
        Ok(id)
    }

    #[instrument(skip(self))]
    pub async fn get_customer(&self, id: i32) -> Result<CustomerDetails, ServiceError> {
        self.repo.get_customer(id).await?.ok_or_else(|| ServiceError::not_found("customer"))
    }

    #[instrument(skip(self, query), fields(page = query.pagination.page, limit = query.pagination.limit))]
    pub async fn list_customers(&self, query: &CustomerQuery) -> Result<Page<CustomerDetails>, ServiceError> {
        self.repo.list_customers(query).await
    }

    #[instrument(skip(self, changes))]
    pub async fn update_customer(&self, id: i32, changes: CustomerChanges) -> Result<Customer, ServiceError> {
        let changes = changes.normalized();
        changes.validate()?;
        let updated = self.repo.update_customer(id, changes).await?;
        info!(customer_id = id, "customer_updated");
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn delete_customer(&self, id: i32) -> Result<(), ServiceError> {
        self.repo.delete_customer(id).await?;
        info!(customer_id = id, "customer_deleted");
        Ok(())
    }

    pub async fn list_addresses(&self, customer_id: i32) -> Result<Vec<Address>, ServiceError> {
        self.repo.list_addresses(customer_id).await
    }

    /// True iff the customer owns exactly one address.
    pub async fn is_single_address(&self, customer_id: i32) -> Result<bool, ServiceError> {
        Ok(self.repo.count_addresses(customer_id).await? == 1)
    }

    #[instrument(skip(self, input))]
    pub async fn add_address(&self, customer_id: i32, input: NewAddress) -> Result<Address, ServiceError> {
        let input = input.normalized();
        input.validate()?;
        let created = self.repo.add_address(customer_id, input).await?;
        info!(customer_id, address_id = created.id, is_primary = created.is_primary, "address_added");
        Ok(created)
    }

    #[instrument(skip(self, changes))]
    pub async fn update_address(&self, id: i32, changes: AddressChanges) -> Result<Address, ServiceError> {
        let changes = changes.normalized();
        changes.validate()?;
        let updated = self.repo.update_address(id, changes).await?;
        info!(address_id = id, customer_id = updated.customer_id, "address_updated");
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn delete_address(&self, id: i32) -> Result<(), ServiceError> {
        self.repo.delete_address(id).await?;
        info!(address_id = id, "address_deleted");
        Ok(())
    }
}
