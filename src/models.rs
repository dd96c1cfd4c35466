use serde::{Deserialize, Serialize};

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_NONE: &str = "none";

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ServiceRow {
    pub id: String,
    pub name: String,
    pub price: f64,
    pub slots: String,
}

impl ServiceRow {
    /// The full slot catalog, decoded from its stored JSON form. A corrupt
    /// column yields an empty catalog rather than a fault.
    pub fn slot_labels(&self) -> Vec<String> {
        serde_json::from_str(&self.slots).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct BookingRow {
    pub id: String,
    pub treatment_name: String,
    pub date: String,
    pub slot: String,
    pub patient: String,
    pub patient_name: Option<String>,
    pub phone: Option<String>,
    pub paid: i64,
    pub transaction_id: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct UserRow {
    pub email: String,
    pub name: Option<String>,
    pub role: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct DoctorRow {
    pub id: String,
    pub name: String,
    pub email: String,
    pub specialty: String,
    pub image: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    pub treatment_name: String,
    pub date: String,
    pub slot: String,
    pub patient: String,
    pub patient_name: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInput {
    pub transaction_id: String,
    pub amount: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserProfile {
    pub name: Option<String>,
}

/// One entry of the availability projection: the service catalog with its
/// slot list narrowed to the labels still open on the requested date.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceAvailability {
    pub name: String,
    pub price: f64,
    pub slots: Vec<String>,
}
