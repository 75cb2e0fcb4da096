use serde::Serialize;

/// Payload returned by the `/health` probe.
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Health {
    pub status: &'static str,
    pub storage: &'static str,
    pub storage_status: &'static str,
    pub version: &'static str,
}

impl Health {
    pub fn ok(storage: &'static str, version: &'static str) -> Self {
        Self { status: "ok", storage, storage_status: "up", version }
    }

    /// Storage ping failed; the process itself is still alive.
    pub fn degraded(storage: &'static str, version: &'static str) -> Self {
        Self { status: "degraded", storage, storage_status: "down", version }
    }
}
