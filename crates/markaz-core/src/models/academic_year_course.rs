//! Academic year course domain model.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcademicYearCourse {
    pub id: Uuid,
    /// Grade level the course is taught at, e.g. "third-secondary".
    pub grade: String,
    pub subjects: Vec<String>,
    pub academic_year: Uuid,
    pub space: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAcademicYearCourse {
    pub grade: String,
    pub subjects: Vec<String>,
    pub academic_year: Uuid,
    pub space: Uuid,
}
