//! Shared building blocks for the customer directory crates:
//! logging setup, the health payload and small runtime helpers.

pub mod types;
pub mod utils;
pub mod env;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_type_ok() {
        let h = types::Health::ok("memory", env!("CARGO_PKG_VERSION"));
        assert_eq!(h.status, "ok");
        assert_eq!(h.storage, "memory");
        assert_eq!(h.storage_status, "up");
    }

    #[test]
    fn health_serializes_camel_case() {
        let h = types::Health::degraded("database", "0.1.0");
        let v = serde_json::to_value(&h).unwrap();
        assert_eq!(v["status"], "degraded");
        assert_eq!(v["storageStatus"], "down");
        assert_eq!(v["version"], "0.1.0");
    }
}
