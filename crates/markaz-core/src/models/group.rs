//! Group domain model.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Day {
    Saturday,
    Sunday,
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassSchedule {
    /// Order of the class within the group: first, second, third class.
    /// Links classes of different groups together.
    pub class_order: u32,
    pub day: Day,
    /// Minutes from the start of the day.
    pub start: u32,
    /// Minutes from the start of the day.
    pub end: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub id: Uuid,
    pub schedule: Vec<ClassSchedule>,
    pub academic_year: Uuid,
    pub course: Uuid,
    pub space: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateGroup {
    pub schedule: Vec<ClassSchedule>,
    pub academic_year: Uuid,
    pub course: Uuid,
    pub space: Uuid,
}
