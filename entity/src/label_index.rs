use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One row per `(vuln_id, label)` pair (`spec.md` §3 "LabelIndex entry").
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "label_index")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub vuln_id: Uuid,
    #[sea_orm(primary_key, auto_increment = false)]
    pub label: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::vulnerability::Entity",
        from = "Column::VulnId",
        to = "super::vulnerability::Column::VulnId"
    )]
    Vulnerability,
}

impl Related<super::vulnerability::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Vulnerability.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
