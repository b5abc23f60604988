use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Problem difficulty category.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    utoipa::ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
pub enum Difficulty {
    #[sea_orm(string_value = "Easy")]
    Easy,
    #[sea_orm(string_value = "Medium")]
    Medium,
    #[sea_orm(string_value = "Hard")]
    Hard,
}

impl Difficulty {
    /// Points credited for a first solve when the problem has none configured.
    pub fn default_points(&self) -> i32 {
        match self {
            Self::Easy => 1,
            Self::Medium => 2,
            Self::Hard => 3,
        }
    }
}

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "problem")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub statement: String,
    pub difficulty: Difficulty,
    /// Overrides the difficulty-based score when set.
    pub points: Option<i32>,

    #[sea_orm(has_many)]
    pub test_cases: HasMany<super::test_case::Entity>,

    #[sea_orm(has_many)]
    pub submissions: HasMany<super::submission::Entity>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
