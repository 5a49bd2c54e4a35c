//! Service tickets and their enum columns.

use std::str::FromStr;

use sea_orm::entity::prelude::*;
use sea_orm::Iterable;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Urgency of a ticket. Stored and serialized in uppercase.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    #[default]
    #[sea_orm(string_value = "LOW")]
    Low,
    #[sea_orm(string_value = "MEDIUM")]
    Medium,
    #[sea_orm(string_value = "HIGH")]
    High,
}

impl Priority {
    pub const NAMES: &'static [&'static str] = &["LOW", "MEDIUM", "HIGH"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "LOW",
            Priority::Medium => "MEDIUM",
            Priority::High => "HIGH",
        }
    }
}

/// Kind of field work requested.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "UPPERCASE")]
pub enum WorkType {
    #[sea_orm(string_value = "INSTALL")]
    Install,
    #[sea_orm(string_value = "REMOVAL")]
    Removal,
}

impl WorkType {
    pub const NAMES: &'static [&'static str] = &["INSTALL", "REMOVAL"];

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkType::Install => "INSTALL",
            WorkType::Removal => "REMOVAL",
        }
    }
}

/// Returned when a string names no enum member.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown variant `{0}`")]
pub struct UnknownVariant(pub String);

impl FromStr for Priority {
    type Err = UnknownVariant;

    /// Case-insensitive, surrounding whitespace ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        Self::iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| UnknownVariant(s.to_string()))
    }
}

impl FromStr for WorkType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        Self::iter()
            .find(|w| w.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| UnknownVariant(s.to_string()))
    }
}

/// Sea-ORM entity model for a service ticket.
///
/// Pictures live in [`super::ticket_image`] and are removed together with
/// the ticket.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "tickets")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub account_name: String,

    pub city: String,

    pub contact_person: Option<String>,

    pub contact_info: Option<String>,

    pub priority: Priority,

    pub work_type: Option<WorkType>,

    pub lease: bool,

    pub under_warranty: bool,

    pub machine_model_or_type: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub issue_description: Option<String>,

    pub requesting_tech_name: Option<String>,

    pub created_at: ChronoDateTimeUtc,

    /// Refreshed on every mutation.
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::ticket_image::Entity")]
    Images,
}

impl Related<super::ticket_image::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Images.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
