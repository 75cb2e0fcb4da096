//! Customer module: three-layer architecture (domain, repository, service).
//!
//! Owns the customer/address invariants shared by every storage backend.

pub mod domain;
pub mod repository;
pub mod service;
pub mod repo;


pub use repository::CustomerRepository;
pub use service::CustomerService;
