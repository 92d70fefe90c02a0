// ==========================================
// ForgeDB 核心 - 报价 API
// ==========================================
// 职责: 原始报价请求 → 明细小计 / 总计 / 业务规则校验结果
// 不负责持久化；prepare_quote 在校验失败时返回错误，供保存前调用
// ==========================================

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::error::{ApiError, ApiResult};
use crate::domain::quote::{
    valid_until_from_json, BusinessRuleReport, ItemTotals, QuoteDraft, QuoteError, QuoteItem,
    QuoteModifiers, QuoteResult, QuoteTotals,
};
use crate::engine::quote_calculation::QuoteCalculationEngine;

// ==========================================
// QuotePreview - 报价预览
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotePreview {
    pub items: Vec<QuoteItem>,
    pub lines: Vec<ItemTotals>,
    pub totals: QuoteTotals,
    pub valid_until: Option<String>,
    pub validation: BusinessRuleReport,
}

// ==========================================
// QuoteApi - 报价 API
// ==========================================
pub struct QuoteApi {
    engine: QuoteCalculationEngine,
}

impl QuoteApi {
    pub fn new(engine: QuoteCalculationEngine) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &QuoteCalculationEngine {
        &self.engine
    }

    /// 报价预览（以当天 UTC 日期校验有效期）
    ///
    /// # 参数
    /// - request: { items: [...] | "<json>", discount_percent, discount_amount,
    ///   tax_percent, additional_costs, valid_until }
    ///
    /// # 返回
    /// - Ok(QuotePreview): 计算结果；业务规则未通过时 validation.valid = false
    /// - Err(ApiError::InvalidInput): 数值字段无法转换、请求结构无效或金额溢出
    pub fn preview_quote(&self, request: &Value) -> ApiResult<QuotePreview> {
        self.preview_quote_at(request, Utc::now().date_naive())
    }

    pub fn preview_quote_at(&self, request: &Value, today: NaiveDate) -> ApiResult<QuotePreview> {
        if !request.is_object() {
            return Err(QuoteError::InvalidShape("报价请求必须是对象".to_string()).into());
        }

        let items = parse_items(request.get("items"))?;
        let modifiers = QuoteModifiers::from_json(request)?;
        let valid_until = valid_until_from_json(request.get("valid_until"));

        let lines = items
            .iter()
            .map(|item| self.engine.calculate_quote_item_total(item))
            .collect::<QuoteResult<Vec<ItemTotals>>>()?;
        let totals = self.engine.calculate_quote_totals(&items, &modifiers)?;

        let draft = QuoteDraft::from_totals(items.clone(), &totals, valid_until.clone());
        let validation = self.engine.validate_business_rules_at(&draft, today);

        tracing::debug!(
            items = items.len(),
            total = %totals.total,
            valid = validation.valid,
            "报价预览完成"
        );

        Ok(QuotePreview {
            items,
            lines,
            totals,
            valid_until,
            validation,
        })
    }

    /// 保存前的报价准备：业务规则未通过时返回 ValidationError
    pub fn prepare_quote(&self, request: &Value) -> ApiResult<QuotePreview> {
        self.prepare_quote_at(request, Utc::now().date_naive())
    }

    pub fn prepare_quote_at(&self, request: &Value, today: NaiveDate) -> ApiResult<QuotePreview> {
        let preview = self.preview_quote_at(request, today)?;
        if !preview.validation.valid {
            tracing::info!(errors = preview.validation.errors.len(), "报价未通过业务规则校验");
            return Err(ApiError::ValidationError {
                errors: preview.validation.errors.clone(),
                warnings: preview.validation.warnings.clone(),
            });
        }
        Ok(preview)
    }
}

impl Default for QuoteApi {
    fn default() -> Self {
        Self::new(QuoteCalculationEngine::default())
    }
}

/// 解析 items：数组，或表单提交的 JSON 字符串
fn parse_items(raw: Option<&Value>) -> Result<Vec<QuoteItem>, QuoteError> {
    match raw {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(values)) => values.iter().map(QuoteItem::from_json).collect(),
        Some(Value::String(text)) if text.trim().is_empty() => Ok(Vec::new()),
        Some(Value::String(text)) => {
            let parsed: Value = serde_json::from_str(text)
                .map_err(|e| QuoteError::InvalidShape(format!("items JSON 无效: {}", e)))?;
            parse_items(Some(&parsed))
        }
        Some(_) => Err(QuoteError::InvalidShape("items 必须是数组".to_string())),
    }
}
