use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "activity_logs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub app_id: Option<String>,

    pub deployment_id: Option<String>,

    pub function_id: Option<String>,

    /// "deployment", "runtime" or "function_execution"
    pub log_type: String,

    pub level: String,

    pub message: String,

    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
