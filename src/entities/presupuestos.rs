use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "presupuestos")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Lead this quote is linked to, if any.
    #[sea_orm(indexed)]
    pub lead_id: Option<i32>,

    /// Quote body, opaque JSON produced by the quoting front-end.
    pub contenido: String,

    /// At most one active quote per lead; superseded quotes stay inactive.
    pub activo: bool,

    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::leads::Entity",
        from = "Column::LeadId",
        to = "super::leads::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Leads,
}

impl Related<super::leads::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Leads.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
