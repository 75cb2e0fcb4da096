use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::customer::domain::{
    Address, AddressChanges, Customer, CustomerChanges, CustomerDetails, CustomerQuery, NewAddress, NewCustomer,
};
use crate::customer::repository::CustomerRepository;
use crate::errors::ServiceError;
use crate::pagination::{Page, PageMeta};

#[derive(Default)]
struct Tables {
    customers: BTreeMap<i32, Customer>,
    addresses: BTreeMap<i32, Address>,
    last_customer_id: i32,
    last_address_id: i32,
}

impl Tables {
    fn phone_taken(&self, phone: &str, except: Option<i32>) -> bool {
        self.customers.values().any(|c| c.phone_number == phone && Some(c.id) != except)
    }

    fn addresses_of(&self, customer_id: i32) -> impl Iterator<Item = &Address> + '_ {
        self.addresses.values().filter(move |a| a.customer_id == customer_id)
    }

    fn details(&self, c: &Customer) -> CustomerDetails {
        CustomerDetails { customer: c.clone(), addresses: self.addresses_of(c.id).cloned().collect() }
    }

    fn clear_primary(&mut self, customer_id: i32, except: Option<i32>) {
        for a in self.addresses.values_mut() {
            if a.customer_id == customer_id && Some(a.id) != except {
                a.is_primary = false;
            }
        }
    }
}

/// In-memory Record Store.
///
/// Each operation holds a single lock guard from its first read to its last
/// write, so readers never observe a half-applied operation. Ids are assigned
/// from monotonically increasing counters and never reused.
#[derive(Default)]
pub struct InMemoryCustomerRepository {
    tables: RwLock<Tables>,
}

impl InMemoryCustomerRepository {
    pub fn new() -> Self { Self::default() }
}

#[async_trait]
impl CustomerRepository for InMemoryCustomerRepository {
    fn backend(&self) -> &'static str { "memory" }

    async fn ping(&self) -> Result<(), ServiceError> { Ok(()) }

    async fn create_customer(&self, input: NewCustomer) -> Result<i32, ServiceError> {
        let mut t = self.tables.write().await;
        if t.phone_taken(&input.phone_number, None) {
            return Err(ServiceError::duplicate_phone(&input.phone_number));
        }

        // Stage every row first; nothing is published unless all rows are valid.
        let customer_id = t.last_customer_id + 1;
        let primary = input.primary_index();
        let mut staged = Vec::with_capacity(input.addresses.len());
        for (i, a) in input.addresses.iter().enumerate() {
            a.validate()?;
            staged.push(Address {
                id: t.last_address_id + 1 + i as i32,
                customer_id,
                address_line: a.address_line.clone(),
                city: a.city.clone(),
                state: a.state.clone(),
                pin_code: a.pin_code.clone(),
                is_primary: Some(i) == primary,
            });
        }
        if staged.is_empty() {
            return Err(ServiceError::invalid("addresses", "at least one address is required"));
        }

        t.last_customer_id = customer_id;
        t.last_address_id += staged.len() as i32;
        t.customers.insert(
            customer_id,
            Customer {
                id: customer_id,
                first_name: input.first_name,
                last_name: input.last_name,
                phone_number: input.phone_number,
                created_at: Utc::now(),
            },
        );
        for a in staged {
            t.addresses.insert(a.id, a);
        }
        Ok(customer_id)
    }

    async fn get_customer(&self, id: i32) -> Result<Option<CustomerDetails>, ServiceError> {
        let t = self.tables.read().await;
        Ok(t.customers.get(&id).map(|c| t.details(c)))
    }

    async fn list_customers(&self, query: &CustomerQuery) -> Result<Page<CustomerDetails>, ServiceError> {
        let t = self.tables.read().await;
        let mut matched: Vec<&Customer> = t
            .customers
            .values()
            .filter(|c| query.filter.is_empty() || t.addresses_of(c.id).any(|a| query.filter.matches(a)))
            .collect();
        matched.sort_by(|a, b| query.compare(a, b));

        let meta = PageMeta::new(query.pagination, matched.len() as u64);
        let offset = usize::try_from(query.pagination.offset()).unwrap_or(usize::MAX);
        let items = matched
            .into_iter()
            .skip(offset)
            .take(meta.limit as usize)
            .map(|c| t.details(c))
            .collect();
        Ok(Page { items, meta })
    }

    async fn update_customer(&self, id: i32, changes: CustomerChanges) -> Result<Customer, ServiceError> {
        let mut t = self.tables.write().await;
        if !t.customers.contains_key(&id) {
            return Err(ServiceError::not_found("customer"));
        }
        if let Some(phone) = &changes.phone_number {
            if t.phone_taken(phone, Some(id)) {
                return Err(ServiceError::duplicate_phone(phone));
            }
        }
        let c = t.customers.get_mut(&id).ok_or_else(|| ServiceError::not_found("customer"))?;
        if let Some(v) = changes.first_name { c.first_name = v; }
        if let Some(v) = changes.last_name { c.last_name = v; }
        if let Some(v) = changes.phone_number { c.phone_number = v; }
        Ok(c.clone())
    }

    async fn delete_customer(&self, id: i32) -> Result<(), ServiceError> {
        let mut t = self.tables.write().await;
        if t.customers.remove(&id).is_none() {
            return Err(ServiceError::not_found("customer"));
        }
        let before = t.addresses.len();
        t.addresses.retain(|_, a| a.customer_id != id);
        debug!(customer_id = id, removed = before - t.addresses.len(), "cascaded address removal");
        Ok(())
    }

    async fn list_addresses(&self, customer_id: i32) -> Result<Vec<Address>, ServiceError> {
        let t = self.tables.read().await;
        Ok(t.addresses_of(customer_id).cloned().collect())
    }

    async fn count_addresses(&self, customer_id: i32) -> Result<u64, ServiceError> {
        let t = self.tables.read().await;
        Ok(t.addresses_of(customer_id).count() as u64)
    }

    async fn add_address(&self, customer_id: i32, input: NewAddress) -> Result<Address, ServiceError> {
        let mut t = self.tables.write().await;
        if !t.customers.contains_key(&customer_id) {
            return Err(ServiceError::not_found("customer"));
        }
        let make_primary = input.is_primary || t.addresses_of(customer_id).next().is_none();
        if make_primary {
            t.clear_primary(customer_id, None);
        }
        t.last_address_id += 1;
        let address = Address {
            id: t.last_address_id,
            customer_id,
            address_line: input.address_line,
            city: input.city,
            state: input.state,
            pin_code: input.pin_code,
            is_primary: make_primary,
        };
        t.addresses.insert(address.id, address.clone());
        Ok(address)
    }

    async fn update_address(&self, id: i32, changes: AddressChanges) -> Result<Address, ServiceError> {
        let mut t = self.tables.write().await;
        let customer_id = t.addresses.get(&id).map(|a| a.customer_id).ok_or_else(|| ServiceError::not_found("address"))?;
        if changes.is_primary == Some(true) {
            t.clear_primary(customer_id, Some(id));
        }
        let a = t.addresses.get_mut(&id).ok_or_else(|| ServiceError::not_found("address"))?;
        changes.apply_to(a);
        Ok(a.clone())
    }

    async fn delete_address(&self, id: i32) -> Result<(), ServiceError> {
        let mut t = self.tables.write().await;
        let target = t.addresses.get(&id).cloned().ok_or_else(|| ServiceError::not_found("address"))?;
        if t.addresses_of(target.customer_id).count() <= 1 {
            return Err(ServiceError::LastAddress(target.customer_id));
        }
        t.addresses.remove(&id);
        if target.is_primary {
            // BTreeMap iterates in id order, so this is the lowest remaining id.
            let next = t.addresses.values_mut().find(|a| a.customer_id == target.customer_id);
            if let Some(next) = next {
                next.is_primary = true;
                debug!(address_id = next.id, customer_id = target.customer_id, "promoted address to primary");
            }
        }
        Ok(())
    }
}
