use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::catalog::CatalogEntry;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct City {
    pub id: i32,
    pub name: String,     // canonical, lowercase
    pub raw_name: String, // display form
    pub created_at: DateTime<Utc>,
}

impl CatalogEntry for City {
    const TABLE: &'static str = "cities";
    const LABEL: &'static str = "City";
}
