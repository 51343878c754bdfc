//! Capability-scope authorization.
//!
//! The database schema historically carried these rules as embedded
//! permission predicates; here they are an ordered, typed rule list per
//! table and action, evaluated over the actor's grants. This keeps the
//! precedence rules independent of the storage engine and unit-testable
//! without a database.
//!
//! Evaluation is first-match-wins over the rule list; when no rule is
//! satisfied the result is [`MarkazError::AuthorizationDenied`]. Grants
//! must be loaded fresh for every check — revoking a grant takes effect
//! on the very next operation.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{MarkazError, MarkazResult};

// -----------------------------------------------------------------------
// Vocabulary
// -----------------------------------------------------------------------

/// The four actions a table permission predicate distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Select,
    Create,
    Update,
    Delete,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Select => "select",
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }
}

/// Every resource table subject to authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    User,
    Scope,
    Space,
    AcademicYear,
    AcademicYearCourse,
    Group,
    Student,
    Enrollment,
}

impl Table {
    pub const ALL: [Table; 8] = [
        Table::User,
        Table::Scope,
        Table::Space,
        Table::AcademicYear,
        Table::AcademicYearCourse,
        Table::Group,
        Table::Student,
        Table::Enrollment,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Table::User => "user",
            Table::Scope => "scope",
            Table::Space => "space",
            Table::AcademicYear => "academic_year",
            Table::AcademicYearCourse => "academic_year_course",
            Table::Group => "group",
            Table::Student => "student",
            Table::Enrollment => "enrollment",
        }
    }

    /// The feature-specific scope that unlocks CRUD on this table within
    /// a space. Enrollments are managed under the students capability.
    pub fn feature_scope(&self) -> Option<ScopeName> {
        match self {
            Table::AcademicYear => Some(ScopeName::ManageAcademicYears),
            Table::AcademicYearCourse => Some(ScopeName::ManageAcademicYearCourses),
            Table::Group => Some(ScopeName::ManageGroups),
            Table::Student | Table::Enrollment => Some(ScopeName::ManageStudents),
            Table::User | Table::Scope | Table::Space => None,
        }
    }
}

/// Named capabilities as stored in `scope.scope_name`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeName {
    ManageCenter,
    ManageSpace,
    ManageStudents,
    ManageGroups,
    ManageAcademicYears,
    ManageAcademicYearCourses,
}

impl ScopeName {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScopeName::ManageCenter => "manage_center",
            ScopeName::ManageSpace => "manage_space",
            ScopeName::ManageStudents => "manage_students",
            ScopeName::ManageGroups => "manage_groups",
            ScopeName::ManageAcademicYears => "manage_academic_years",
            ScopeName::ManageAcademicYearCourses => "manage_academic_year_courses",
        }
    }

    pub fn parse(value: &str) -> Option<ScopeName> {
        match value {
            "manage_center" => Some(ScopeName::ManageCenter),
            "manage_space" => Some(ScopeName::ManageSpace),
            "manage_students" => Some(ScopeName::ManageStudents),
            "manage_groups" => Some(ScopeName::ManageGroups),
            "manage_academic_years" => Some(ScopeName::ManageAcademicYears),
            "manage_academic_year_courses" => Some(ScopeName::ManageAcademicYearCourses),
            _ => None,
        }
    }
}

/// The authenticated identity an operation runs as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Uuid,
}

impl Actor {
    pub fn new(user_id: Uuid) -> Self {
        Self { user_id }
    }
}

/// One capability grant held by a user, as resolved from the `scope`
/// table at check time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grant {
    pub scope_name: ScopeName,
    pub space: Option<Uuid>,
}

/// What an action is aimed at. `space` is the tenancy boundary of the
/// affected resource (for the `space` table itself, the space's own id);
/// `record` identifies the affected row where a rule needs it.
#[derive(Debug, Clone, Copy, Default)]
pub struct Target {
    pub space: Option<Uuid>,
    pub record: Option<Uuid>,
}

impl Target {
    /// A global resource without a tenancy boundary.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn space(space: Uuid) -> Self {
        Self {
            space: Some(space),
            record: None,
        }
    }

    pub fn record(record: Uuid) -> Self {
        Self {
            space: None,
            record: Some(record),
        }
    }

    pub fn record_in_space(space: Uuid, record: Uuid) -> Self {
        Self {
            space: Some(space),
            record: Some(record),
        }
    }
}

// -----------------------------------------------------------------------
// Rules
// -----------------------------------------------------------------------

/// A single authorization rule. Rules are satisfied or not; an action is
/// allowed as soon as one rule in its list is satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// A `manage_center` grant without a space restriction.
    CenterManager,
    /// A `manage_space` grant for the target's space.
    SpaceManagerOfTarget,
    /// A `manage_space` grant for any space. Space owners may create and
    /// delete users center-wide.
    AnySpaceManager,
    /// A feature grant for the target's space.
    FeatureScope(ScopeName),
    /// Any grant whose space matches the target's space.
    SpaceMember,
    /// No restriction. Center-wide readable tables.
    Everyone,
    /// The target record is the actor's own row.
    SelfRecord,
}

impl Rule {
    fn is_satisfied(&self, actor: Actor, grants: &[Grant], target: Target) -> bool {
        match self {
            Rule::Everyone => true,
            Rule::CenterManager => grants
                .iter()
                .any(|g| g.scope_name == ScopeName::ManageCenter && g.space.is_none()),
            Rule::AnySpaceManager => {
                grants.iter().any(|g| g.scope_name == ScopeName::ManageSpace)
            }
            Rule::SpaceManagerOfTarget => target.space.is_some_and(|space| {
                grants
                    .iter()
                    .any(|g| g.scope_name == ScopeName::ManageSpace && g.space == Some(space))
            }),
            Rule::FeatureScope(name) => target.space.is_some_and(|space| {
                grants
                    .iter()
                    .any(|g| g.scope_name == *name && g.space == Some(space))
            }),
            Rule::SpaceMember => target
                .space
                .is_some_and(|space| grants.iter().any(|g| g.space == Some(space))),
            Rule::SelfRecord => target.record == Some(actor.user_id),
        }
    }
}

/// The compiled rule lists for one table.
#[derive(Debug, Clone, Copy)]
pub struct TablePolicy {
    pub select: &'static [Rule],
    pub create: &'static [Rule],
    pub update: &'static [Rule],
    pub delete: &'static [Rule],
}

impl TablePolicy {
    fn rules_for(&self, action: Action) -> &'static [Rule] {
        match action {
            Action::Select => self.select,
            Action::Create => self.create,
            Action::Update => self.update,
            Action::Delete => self.delete,
        }
    }
}

const CENTER_ONLY: &[Rule] = &[Rule::CenterManager];
const CENTER_OR_ANY_SPACE_MANAGER: &[Rule] = &[Rule::CenterManager, Rule::AnySpaceManager];
const CENTER_OR_TARGET_SPACE_MANAGER: &[Rule] = &[Rule::CenterManager, Rule::SpaceManagerOfTarget];
const SPACE_READ: &[Rule] = &[Rule::CenterManager, Rule::SpaceMember];
const EVERYONE: &[Rule] = &[Rule::Everyone];

const MANAGE_ACADEMIC_YEARS: &[Rule] = &[
    Rule::CenterManager,
    Rule::SpaceManagerOfTarget,
    Rule::FeatureScope(ScopeName::ManageAcademicYears),
];
const MANAGE_ACADEMIC_YEAR_COURSES: &[Rule] = &[
    Rule::CenterManager,
    Rule::SpaceManagerOfTarget,
    Rule::FeatureScope(ScopeName::ManageAcademicYearCourses),
];
const MANAGE_GROUPS: &[Rule] = &[
    Rule::CenterManager,
    Rule::SpaceManagerOfTarget,
    Rule::FeatureScope(ScopeName::ManageGroups),
];
const MANAGE_STUDENTS: &[Rule] = &[
    Rule::CenterManager,
    Rule::SpaceManagerOfTarget,
    Rule::FeatureScope(ScopeName::ManageStudents),
];

/// CRUD rules for a space-scoped feature table.
const fn feature_policy(rules: &'static [Rule]) -> TablePolicy {
    TablePolicy {
        select: SPACE_READ,
        create: rules,
        update: rules,
        delete: rules,
    }
}

// -----------------------------------------------------------------------
// Policy
// -----------------------------------------------------------------------

/// The full access policy: one [`TablePolicy`] per resource table.
///
/// Assembled by the schema compiler at initialization and evaluated for
/// every operation.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessPolicy {
    _private: (),
}

impl AccessPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table_policy(&self, table: Table) -> TablePolicy {
        match table {
            // Users are visible center-wide; a user may always update
            // their own row.
            Table::User => TablePolicy {
                select: EVERYONE,
                create: CENTER_OR_ANY_SPACE_MANAGER,
                update: &[Rule::SelfRecord, Rule::CenterManager],
                delete: CENTER_OR_ANY_SPACE_MANAGER,
            },
            // Grants are visible center-wide; managed by the center
            // manager, or by a space manager within their own space.
            Table::Scope => TablePolicy {
                select: EVERYONE,
                create: CENTER_OR_TARGET_SPACE_MANAGER,
                update: CENTER_OR_TARGET_SPACE_MANAGER,
                delete: CENTER_OR_TARGET_SPACE_MANAGER,
            },
            Table::Space => TablePolicy {
                select: EVERYONE,
                create: CENTER_ONLY,
                update: CENTER_OR_TARGET_SPACE_MANAGER,
                delete: CENTER_ONLY,
            },
            Table::AcademicYear => feature_policy(MANAGE_ACADEMIC_YEARS),
            Table::AcademicYearCourse => feature_policy(MANAGE_ACADEMIC_YEAR_COURSES),
            Table::Group => feature_policy(MANAGE_GROUPS),
            Table::Student | Table::Enrollment => feature_policy(MANAGE_STUDENTS),
        }
    }

    /// Evaluate one access request. Returns
    /// [`MarkazError::AuthorizationDenied`] when no rule allows it.
    pub fn authorize(
        &self,
        actor: Actor,
        grants: &[Grant],
        action: Action,
        table: Table,
        target: Target,
    ) -> MarkazResult<()> {
        let rules = self.table_policy(table).rules_for(action);

        if rules
            .iter()
            .any(|rule| rule.is_satisfied(actor, grants, target))
        {
            return Ok(());
        }

        Err(MarkazError::AuthorizationDenied {
            action: action.as_str().into(),
            table: table.name().into(),
        })
    }
}
