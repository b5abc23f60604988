use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Rating every account starts from.
pub const DEFAULT_RATING: i32 = 1200;

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub username: String,
    /// Practice score; credited once per solved problem.
    pub points: i32,
    /// Battle rating; only changed when a battle completes.
    pub rating: i32,

    #[sea_orm(has_many)]
    pub submissions: HasMany<super::submission::Entity>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
