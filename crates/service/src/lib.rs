//! Service layer providing the customer/address Record Store on top of models.
//! - Separates business rules (primary address, last address, atomic create)
//!   from data access.
//! - Two interchangeable repositories: SeaORM (transactions) and in-memory
//!   (single lock per operation).
//! - Reuses validation and entity definitions in the `models` crate.

pub mod errors;
pub mod pagination;
pub mod customer;
#[cfg(test)]
pub mod test_support;
