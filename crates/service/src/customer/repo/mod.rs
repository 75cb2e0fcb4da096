pub mod memory;
pub mod seaorm;

pub use memory::InMemoryCustomerRepository;
pub use seaorm::SeaOrmCustomerRepository;
