use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use lotto_rd::{
    Claims, Draw, DrawId, DrawQuery, GameType, GenerateOptions, LottoError, RecordManager,
    RequestContext, catalog, reports,
};

/// Resolves the `caller` argument into a request context. A missing caller
/// is anonymous.
pub fn caller(arguments: &HashMap<String, Value>) -> Result<RequestContext> {
    let claims: Claims = match arguments.get("caller") {
        Some(value) => serde_json::from_value(value.clone()).context("Invalid caller parameter")?,
        None => Claims::default(),
    };
    Ok(RequestContext::from_claims(claims))
}

fn game_type(arguments: &HashMap<String, Value>) -> Result<GameType> {
    let name = arguments
        .get("game_type")
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow::anyhow!("Missing game_type parameter"))?;
    Ok(name.parse::<GameType>()?)
}

fn optional<T: DeserializeOwned>(arguments: &HashMap<String, Value>, key: &str) -> Result<Option<T>> {
    arguments
        .get(key)
        .filter(|v| !v.is_null())
        .map(|v| {
            serde_json::from_value(v.clone()).with_context(|| format!("Invalid {} parameter", key))
        })
        .transpose()
}

fn options(arguments: &HashMap<String, Value>) -> Result<GenerateOptions> {
    Ok(optional(arguments, "options")?.unwrap_or_default())
}

fn quantity(arguments: &HashMap<String, Value>) -> Result<u32> {
    Ok(optional(arguments, "quantity")?.unwrap_or(1))
}

fn draw_id(arguments: &HashMap<String, Value>) -> Result<DrawId> {
    optional(arguments, "id")?.ok_or_else(|| anyhow::anyhow!("Missing id parameter"))
}

pub struct LotteryUseCase {
    manager: Arc<RecordManager>,
}

impl LotteryUseCase {
    pub fn new(manager: Arc<RecordManager>) -> Self {
        Self { manager }
    }

    pub async fn get_games(&self, _arguments: &HashMap<String, Value>) -> Result<String> {
        Ok(json!({
            "success": true,
            "games": catalog::all()
        })
        .to_string())
    }

    pub async fn generate_numbers(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let ctx = caller(arguments)?;
        let game = game_type(arguments)?;
        let created = self
            .manager
            .generate_and_save(&ctx, game, options(arguments)?, quantity(arguments)?)
            .await?;

        let warnings: Vec<&str> = created
            .iter()
            .filter_map(|c| c.statistics_error.as_ref().map(LottoError::user_message))
            .collect();
        let records: Vec<_> = created.into_iter().map(|c| c.record).collect();

        Ok(json!({
            "success": true,
            "records": records,
            "warnings": warnings
        })
        .to_string())
    }

    pub async fn generate_demo_numbers(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let game = game_type(arguments)?;
        let draws = self
            .manager
            .generate_demo(game, options(arguments)?, quantity(arguments)?)?;

        Ok(json!({
            "success": true,
            "game_type": game,
            "draws": draws
        })
        .to_string())
    }

    pub async fn save_demo_numbers(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let ctx = caller(arguments)?;
        let game = game_type(arguments)?;
        let draw: Draw =
            optional(arguments, "draw")?.ok_or_else(|| anyhow::anyhow!("Missing draw parameter"))?;

        self.manager.record_demo_statistics(&ctx, game, &draw).await?;

        Ok(json!({
            "success": true,
            "message": "Números registrados en las estadísticas"
        })
        .to_string())
    }

    pub async fn list_my_numbers(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let ctx = caller(arguments)?;
        let query = DrawQuery {
            owner_id: ctx.owner_id().map(str::to_string),
            game_type: optional(arguments, "game_type")?,
            include_deleted: false,
            limit: optional(arguments, "limit")?,
            offset: optional(arguments, "offset")?,
        };
        let page = self.manager.list_draws(&ctx, query).await?;

        Ok(json!({
            "success": true,
            "page": page.current_page(),
            "pages": page.page_count(),
            "results": page
        })
        .to_string())
    }

    pub async fn delete_number(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let ctx = caller(arguments)?;
        let id = draw_id(arguments)?;
        self.manager.soft_delete(&ctx, id).await?;

        Ok(json!({
            "success": true,
            "id": id
        })
        .to_string())
    }

    pub async fn delete_all_numbers(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let ctx = caller(arguments)?;
        let deleted = self.manager.soft_delete_all(&ctx).await?;

        Ok(json!({
            "success": true,
            "deleted": deleted
        })
        .to_string())
    }

    pub async fn get_user_stats(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let ctx = caller(arguments)?;
        let owner_id = match optional::<String>(arguments, "owner_id")? {
            Some(owner) => owner,
            None => ctx.require_owner()?.to_string(),
        };
        let stats = self.manager.compute_user_stats(&ctx, &owner_id).await?;

        Ok(json!({
            "success": true,
            "owner_id": owner_id,
            "stats": stats,
            "last_activity": stats.most_recent_activity.label_es()
        })
        .to_string())
    }

    pub async fn get_hot_cold_numbers(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let game = game_type(arguments)?;
        let limit: usize = optional(arguments, "limit")?.unwrap_or(10);
        let secondary: bool = optional(arguments, "secondary")?.unwrap_or(false);

        let result = if secondary {
            self.manager.get_hot_cold_secondary(game, limit).await?
        } else {
            self.manager.get_hot_cold_numbers(game, limit).await?
        };

        Ok(json!({
            "success": true,
            "game_type": game,
            "secondary": secondary,
            "hot": result.hot,
            "cold": result.cold
        })
        .to_string())
    }

    pub async fn get_probability_analysis(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let game = game_type(arguments)?;
        let analysis = self.manager.probability_analysis(game).await?;

        Ok(json!({
            "success": true,
            "analysis": analysis
        })
        .to_string())
    }
}

pub struct AdminUseCase {
    manager: Arc<RecordManager>,
}

impl AdminUseCase {
    pub fn new(manager: Arc<RecordManager>) -> Self {
        Self { manager }
    }

    pub async fn admin_list_numbers(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let ctx = caller(arguments)?;
        ctx.require_admin()?;
        let query = DrawQuery {
            owner_id: optional(arguments, "owner_id")?,
            game_type: optional(arguments, "game_type")?,
            include_deleted: optional(arguments, "include_deleted")?.unwrap_or(true),
            limit: optional(arguments, "limit")?,
            offset: optional(arguments, "offset")?,
        };
        let page = self.manager.list_draws(&ctx, query).await?;

        Ok(json!({
            "success": true,
            "page": page.current_page(),
            "pages": page.page_count(),
            "results": page
        })
        .to_string())
    }

    pub async fn restore_number(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let ctx = caller(arguments)?;
        let id = draw_id(arguments)?;
        self.manager.restore(&ctx, id).await?;

        Ok(json!({
            "success": true,
            "id": id
        })
        .to_string())
    }

    pub async fn admin_overview(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let ctx = caller(arguments)?;
        let overview = self.manager.admin_overview(&ctx).await?;

        Ok(json!({
            "success": true,
            "overview": overview
        })
        .to_string())
    }

    pub async fn recompute_statistics(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let ctx = caller(arguments)?;
        let game = game_type(arguments)?;
        let report = self.manager.recompute_statistics(&ctx, game).await?;

        Ok(json!({
            "success": true,
            "consistent": report.is_consistent(),
            "report": report
        })
        .to_string())
    }
}

pub struct ReportUseCase {
    manager: Arc<RecordManager>,
    report_dir: PathBuf,
}

impl ReportUseCase {
    pub fn new(manager: Arc<RecordManager>, report_dir: PathBuf) -> Self {
        Self {
            manager,
            report_dir,
        }
    }

    pub async fn generate_report(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let game = game_type(arguments)?;
        let path = reports::generate_and_save_report(&self.manager, game, &self.report_dir).await?;

        Ok(json!({
            "success": true,
            "path": path.display().to_string(),
            "message": format!("Report generated successfully for {}", game)
        })
        .to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(value: Value) -> HashMap<String, Value> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn caller_defaults_to_anonymous() {
        assert_eq!(caller(&args(json!({}))).unwrap(), RequestContext::anonymous());
        assert_eq!(
            caller(&args(json!({"caller": {"owner_id": "u1", "is_admin": true}}))).unwrap(),
            RequestContext::admin("u1")
        );
    }

    #[test]
    fn unknown_game_is_a_lotto_error() {
        let err = game_type(&args(json!({"game_type": "powerball"}))).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LottoError>(),
            Some(LottoError::InvalidGameType(_))
        ));
    }

    #[test]
    fn options_accept_legacy_flag_names() {
        let parsed = options(&args(json!({"options": {"include_mas": true}}))).unwrap();
        assert_eq!(parsed, GenerateOptions::with_secondary());
        assert_eq!(options(&args(json!({}))).unwrap(), GenerateOptions::default());
    }
}
