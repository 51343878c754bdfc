//! Academic year domain model.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcademicYear {
    pub id: Uuid,
    /// Calendar year the academic year starts in, e.g. 2024.
    pub year: i64,
    pub space: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAcademicYear {
    pub year: i64,
    pub space: Uuid,
}
