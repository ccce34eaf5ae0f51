use serde::{Deserialize, Serialize};

/// A catalog entry. The catalog itself is an external system; bookings
/// snapshot the name and price at creation time and never look them up again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub id: String,
    pub name: String,
    pub price: f64,
}
