use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "leads")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Contact name of the prospective buyer.
    pub nombre: String,

    pub telefono: String,

    /// Vehicle of interest.
    pub modelo: String,

    pub forma_pago: Option<String>,

    /// Trade-in details, free text.
    pub info_usado: Option<String>,

    pub entrega: Option<bool>,

    /// Scheduled follow-up date, ISO `YYYY-MM-DD`.
    pub fecha: Option<String>,

    pub estado: Estado,

    /// Assigned salesperson; must reference an active manager/vendedor.
    #[sea_orm(indexed)]
    pub vendedor: Option<i32>,

    pub notas: String,

    pub fuente: Option<String>,

    /// Pipeline cycle counter, bumped each time a lost lead is re-opened.
    pub ciclo: i32,

    pub created_at: String,

    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::Vendedor",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Users,
    #[sea_orm(has_many = "super::presupuestos::Entity")]
    Presupuestos,
    #[sea_orm(has_many = "super::assignment_log::Entity")]
    AssignmentLog,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl Related<super::presupuestos::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Presupuestos.def()
    }
}

impl Related<super::assignment_log::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AssignmentLog.def()
    }
}

/// Pipeline status of a lead. `Ganado` and `Perdido` are terminal.
#[derive(Copy, Clone, Debug, EnumIter, DeriveActiveEnum, Eq, PartialEq, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "lead_estado")]
#[serde(rename_all = "lowercase")]
pub enum Estado {
    #[sea_orm(string_value = "nuevo")]
    Nuevo,
    #[sea_orm(string_value = "contactado")]
    Contactado,
    #[sea_orm(string_value = "calificado")]
    Calificado,
    #[sea_orm(string_value = "presupuestado")]
    Presupuestado,
    #[sea_orm(string_value = "negociacion")]
    Negociacion,
    #[sea_orm(string_value = "ganado")]
    Ganado,
    #[sea_orm(string_value = "perdido")]
    Perdido,
}

impl Estado {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Ganado | Self::Perdido)
    }
}

impl fmt::Display for Estado {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Nuevo => "nuevo",
            Self::Contactado => "contactado",
            Self::Calificado => "calificado",
            Self::Presupuestado => "presupuestado",
            Self::Negociacion => "negociacion",
            Self::Ganado => "ganado",
            Self::Perdido => "perdido",
        };
        write!(f, "{s}")
    }
}

impl ActiveModelBehavior for ActiveModel {}
