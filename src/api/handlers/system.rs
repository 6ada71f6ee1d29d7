use rocket::get;
use rocket::serde::json::Json;
use serde::Serialize;

use crate::common::{SERVICE_NAME, SERVICE_VERSION};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct HealthStatus {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

impl HealthStatus {
    pub fn healthy() -> Self {
        Self {
            status: "healthy",
            service: SERVICE_NAME,
            version: SERVICE_VERSION,
        }
    }
}

#[get("/")]
pub fn index() -> Json<HealthStatus> {
    Json(HealthStatus::healthy())
}

#[get("/health")]
pub fn health() -> Json<HealthStatus> {
    Json(HealthStatus::healthy())
}
