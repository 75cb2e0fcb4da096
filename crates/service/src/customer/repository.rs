use async_trait::async_trait;

use super::domain::{
    Address, AddressChanges, Customer, CustomerChanges, CustomerDetails, CustomerQuery, NewAddress, NewCustomer,
};
use crate::errors::ServiceError;
use crate::pagination::Page;

/// Record Store abstraction over customers and their addresses.
///
/// Every mutating method is one unit: either all of its writes become visible
/// or none do. Implementations own the invariants:
/// - at most one primary address per customer;
/// - a customer always keeps at least one address;
/// - phone numbers are unique.
///
/// Inputs are expected to be normalized and validated by the caller.
#[async_trait]
pub trait CustomerRepository: Send + Sync {
    /// Short backend name reported by the health probe.
    fn backend(&self) -> &'static str;

    async fn ping(&self) -> Result<(), ServiceError>;

    /// Insert the customer and all of its addresses atomically; returns the new id.
    async fn create_customer(&self, input: NewCustomer) -> Result<i32, ServiceError>;

    async fn get_customer(&self, id: i32) -> Result<Option<CustomerDetails>, ServiceError>;

    async fn list_customers(&self, query: &CustomerQuery) -> Result<Page<CustomerDetails>, ServiceError>;

    async fn update_customer(&self, id: i32, changes: CustomerChanges) -> Result<Customer, ServiceError>;

    /// Delete the customer together with every address it owns.
    async fn delete_customer(&self, id: i32) -> Result<(), ServiceError>;

    async fn list_addresses(&self, customer_id: i32) -> Result<Vec<Address>, ServiceError>;

    async fn count_addresses(&self, customer_id: i32) -> Result<u64, ServiceError>;

    /// Attach an address; it becomes primary when flagged or when the customer
    /// has no address yet, clearing the flag on its siblings.
    async fn add_address(&self, customer_id: i32, input: NewAddress) -> Result<Address, ServiceError>;

    async fn update_address(&self, id: i32, changes: AddressChanges) -> Result<Address, ServiceError>;

    /// Rejects with `LastAddress` when the address is its customer's only one.
    /// Deleting the primary promotes the remaining address with the lowest id.
    async fn delete_address(&self, id: i32) -> Result<(), ServiceError>;
}
