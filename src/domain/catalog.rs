//! Thin catalog records the booking flow looks up; the catalog itself is
//! managed elsewhere.

use serde::Serialize;
use uuid::Uuid;
use crate::domain::value_objects::Money;

#[derive(Clone, Debug, Serialize)]
pub struct ServiceOffering {
    pub id: Uuid,
    pub name: String,
    pub category_id: Uuid,
    pub base_price: Money,
    pub is_active: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct CustomerAddress {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub label: String,
    pub region: String,
}
