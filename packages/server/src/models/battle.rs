use serde::Deserialize;

use crate::error::AppError;

/// Request body for a battle submission.
#[derive(Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BattleSubmitRequest {
    #[schema(example = 1)]
    #[serde(alias = "user_id")]
    pub user_id: i32,
    pub code: String,
    #[schema(example = "cpp")]
    pub language: String,
}

pub fn validate_battle_submit(req: &BattleSubmitRequest) -> Result<(), AppError> {
    if req.code.trim().is_empty() {
        return Err(AppError::Validation("Code is required".into()));
    }
    if req.language.trim().is_empty() {
        return Err(AppError::Validation("Language is required".into()));
    }
    Ok(())
}
