use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub name: String,

    #[sea_orm(unique)]
    pub email: String,

    pub role: Role,

    /// Direct manager in the reporting tree; null for top-level users.
    pub reports_to: Option<i32>,

    /// Soft-delete flag. Users that own leads are never hard-removed.
    pub active: bool,

    pub created_at: String,

    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::leads::Entity")]
    Leads,
}

impl Related<super::leads::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Leads.def()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveActiveEnum, Eq, PartialEq, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "user_role")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[sea_orm(string_value = "admin")]
    Admin,
    #[sea_orm(string_value = "manager")]
    Manager,
    #[sea_orm(string_value = "vendedor")]
    Vendedor,
}

impl Role {
    /// Roles that may hold leads.
    #[must_use]
    pub const fn can_own_leads(self) -> bool {
        matches!(self, Self::Manager | Self::Vendedor)
    }

    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }

    const fn rank(self) -> u8 {
        match self {
            Self::Admin => 2,
            Self::Manager => 1,
            Self::Vendedor => 0,
        }
    }

    /// Capability ordering: admin covers manager covers vendedor.
    #[must_use]
    pub const fn covers(self, other: Self) -> bool {
        self.rank() >= other.rank()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Admin => "admin",
            Self::Manager => "manager",
            Self::Vendedor => "vendedor",
        };
        write!(f, "{s}")
    }
}

impl ActiveModelBehavior for ActiveModel {}
