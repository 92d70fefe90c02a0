// ==========================================
// ForgeDB 核心 - 报价领域模型
// ==========================================
// 职责: 报价明细、修正项、计算结果、业务规则校验结果
// 约束: 金额一律使用定点小数 (rust_decimal)，禁止浮点
// ==========================================

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;
use thiserror::Error;

// ==========================================
// 金额精度
// ==========================================

/// 金额小数位
pub const MONEY_SCALE: u32 = 2;

/// 金额舍入: 保留 2 位小数，四舍五入 (half-up，远离零)
///
/// 结果统一补齐到 2 位小数，保证相同输入得到逐位一致的输出。
pub fn round_money(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(MONEY_SCALE);
    rounded
}

/// 0.00
pub fn zero_money() -> Decimal {
    Decimal::new(0, MONEY_SCALE)
}

// ==========================================
// QuoteError - 报价输入转换错误
// ==========================================
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QuoteError {
    #[error("数值字段无效 (field={field}): {value}")]
    InvalidNumber { field: String, value: String },

    /// 金额运算超出定点小数表示范围
    #[error("金额计算溢出 (field={field})")]
    Overflow { field: String },

    #[error("报价结构无效: {0}")]
    InvalidShape(String),
}

pub type QuoteResult<T> = Result<T, QuoteError>;

/// 读取 valid_until 原文
///
/// 空串 / null 视为未填写；非字符串值原样保留，交给业务规则判定为无效日期
pub fn valid_until_from_json(value: Option<&Value>) -> Option<String> {
    match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.trim().is_empty() => None,
        Some(Value::String(s)) => Some(s.trim().to_string()),
        Some(other) => Some(other.to_string()),
    }
}

/// 从 JSON 值解析定点小数
///
/// 接受 JSON 数字或数字字符串；null/缺省返回 None；其他类型立即报错。
pub fn decimal_from_json(field: &str, value: Option<&Value>) -> QuoteResult<Option<Decimal>> {
    let invalid = |raw: String| QuoteError::InvalidNumber {
        field: field.to_string(),
        value: raw,
    };

    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => {
            let raw = n.to_string();
            Decimal::from_str(&raw)
                .or_else(|_| Decimal::from_scientific(&raw))
                .map(Some)
                .map_err(|_| invalid(raw))
        }
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            Decimal::from_str(trimmed)
                .or_else(|_| Decimal::from_scientific(trimmed))
                .map(Some)
                .map_err(|_| invalid(s.clone()))
        }
        Some(other) => Err(invalid(other.to_string())),
    }
}

fn object<'a>(value: &'a Value, what: &str) -> QuoteResult<&'a serde_json::Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| QuoteError::InvalidShape(format!("{} 必须是对象", what)))
}

// ==========================================
// QuoteItem - 报价明细 (服务项)
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteItem {
    pub description: Option<String>,
    pub hours: Decimal,                   // 工时 (>=0)
    pub hourly_rate: Option<Decimal>,     // 小时费率 (None = 引擎默认费率)
    pub quantity: Decimal,                // 数量 (默认 1)
    pub material_cost: Option<Decimal>,   // 材料费 (可选)
}

impl QuoteItem {
    pub fn new(hours: Decimal) -> Self {
        Self {
            description: None,
            hours,
            hourly_rate: None,
            quantity: Decimal::ONE,
            material_cost: None,
        }
    }

    pub fn with_rate(mut self, hourly_rate: Decimal) -> Self {
        self.hourly_rate = Some(hourly_rate);
        self
    }

    pub fn with_quantity(mut self, quantity: Decimal) -> Self {
        self.quantity = quantity;
        self
    }

    pub fn with_material_cost(mut self, material_cost: Decimal) -> Self {
        self.material_cost = Some(material_cost);
        self
    }

    /// 从原始字典解析
    ///
    /// 字段: hours / hourly_rate / quantity / material_cost / description
    pub fn from_json(value: &Value) -> QuoteResult<Self> {
        let map = object(value, "item")?;
        Ok(Self {
            description: map
                .get("description")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string()),
            hours: decimal_from_json("hours", map.get("hours"))?.unwrap_or(Decimal::ZERO),
            hourly_rate: decimal_from_json("hourly_rate", map.get("hourly_rate"))?,
            quantity: decimal_from_json("quantity", map.get("quantity"))?.unwrap_or(Decimal::ONE),
            material_cost: decimal_from_json("material_cost", map.get("material_cost"))?,
        })
    }
}

// ==========================================
// MaterialLine - 材料/备件行
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialLine {
    pub quantity: Decimal,
    pub unit_price: Decimal,
}

impl MaterialLine {
    pub fn new(quantity: Decimal, unit_price: Decimal) -> Self {
        Self { quantity, unit_price }
    }

    pub fn from_json(value: &Value) -> QuoteResult<Self> {
        let map = object(value, "material line")?;
        Ok(Self {
            quantity: decimal_from_json("quantity", map.get("quantity"))?.unwrap_or(Decimal::ZERO),
            unit_price: decimal_from_json("unit_price", map.get("unit_price"))?.unwrap_or(Decimal::ZERO),
        })
    }
}

// ==========================================
// 计算结果
// ==========================================

/// 单行明细计算结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemTotals {
    pub hours: Decimal,
    pub hourly_rate: Decimal,
    pub quantity: Decimal,
    pub labor_cost: Decimal,
    pub material_cost: Decimal,
    pub line_subtotal: Decimal,
}

/// 折扣计算结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscountResult {
    pub discount_amount: Decimal,
    pub after_discount: Decimal,
}

/// 附加费计算结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurchargeResult {
    pub surcharge_amount: Decimal,
    pub after_surcharge: Decimal,
}

/// 税额计算结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxResult {
    pub tax_amount: Decimal,
    pub tax_percent: Decimal,
    pub after_tax: Decimal,
}

/// 报价修正项 (折扣 / 税率 / 附加成本)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuoteModifiers {
    pub discount_percent: Option<Decimal>,
    pub discount_amount: Option<Decimal>,
    pub tax_percent: Option<Decimal>,
    pub additional_costs: Option<Decimal>,
}

impl QuoteModifiers {
    pub fn from_json(value: &Value) -> QuoteResult<Self> {
        let map = object(value, "quote")?;
        Ok(Self {
            discount_percent: decimal_from_json("discount_percent", map.get("discount_percent"))?,
            discount_amount: decimal_from_json("discount_amount", map.get("discount_amount"))?,
            tax_percent: decimal_from_json("tax_percent", map.get("tax_percent"))?,
            additional_costs: decimal_from_json("additional_costs", map.get("additional_costs"))?,
        })
    }
}

/// 报价总计
///
/// 不变量:
/// - subtotal = labor_total + materials_total + additional_costs
/// - total = after_discount + tax_amount
/// - discount_amount <= subtotal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteTotals {
    pub labor_total: Decimal,
    pub materials_total: Decimal,
    pub additional_costs: Decimal,
    pub subtotal: Decimal,
    pub discount_percent: Decimal,
    pub discount_amount: Decimal,
    pub after_discount: Decimal,
    pub tax_percent: Decimal,
    pub tax_amount: Decimal,
    pub total: Decimal,
    pub total_hours: Decimal,
}

// ==========================================
// QuoteDraft - 待校验的报价
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuoteDraft {
    pub items: Vec<QuoteItem>,
    pub total: Decimal,
    pub subtotal: Decimal,
    pub discount_amount: Decimal,
    pub total_hours: Decimal,
    /// 有效期 (ISO 日期字符串，原样保留，由校验负责解析)
    pub valid_until: Option<String>,
}

impl QuoteDraft {
    /// 由计算结果组装待校验报价
    pub fn from_totals(items: Vec<QuoteItem>, totals: &QuoteTotals, valid_until: Option<String>) -> Self {
        Self {
            items,
            total: totals.total,
            subtotal: totals.subtotal,
            discount_amount: totals.discount_amount,
            total_hours: totals.total_hours,
            valid_until,
        }
    }

    /// 从原始字典解析 (items / total / subtotal / discount_amount / total_hours / valid_until)
    pub fn from_json(value: &Value) -> QuoteResult<Self> {
        let map = object(value, "quote")?;
        let items = match map.get("items") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(raw)) => raw.iter().map(QuoteItem::from_json).collect::<QuoteResult<Vec<_>>>()?,
            Some(_) => return Err(QuoteError::InvalidShape("items 必须是数组".to_string())),
        };

        let valid_until = valid_until_from_json(map.get("valid_until"));

        Ok(Self {
            items,
            total: decimal_from_json("total", map.get("total"))?.unwrap_or(Decimal::ZERO),
            subtotal: decimal_from_json("subtotal", map.get("subtotal"))?.unwrap_or(Decimal::ZERO),
            discount_amount: decimal_from_json("discount_amount", map.get("discount_amount"))?
                .unwrap_or(Decimal::ZERO),
            total_hours: decimal_from_json("total_hours", map.get("total_hours"))?.unwrap_or(Decimal::ZERO),
            valid_until,
        })
    }
}

/// 业务规则校验结果
///
/// errors 阻断保存；warnings 仅提示
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BusinessRuleReport {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_round_money_half_up() {
        assert_eq!(round_money(Decimal::new(1005, 3)).to_string(), "1.01");
        assert_eq!(round_money(Decimal::new(1004, 3)).to_string(), "1.00");
        assert_eq!(round_money(Decimal::new(1000, 0)).to_string(), "1000.00");
        assert_eq!(round_money(Decimal::new(-1005, 3)).to_string(), "-1.01");
    }

    #[test]
    fn test_decimal_from_json_accepts_numbers_and_strings() {
        let v = json!(2.5);
        assert_eq!(decimal_from_json("hours", Some(&v)).unwrap(), Some(Decimal::new(25, 1)));

        let v = json!("500.00");
        assert_eq!(decimal_from_json("rate", Some(&v)).unwrap(), Some(Decimal::new(50000, 2)));

        assert_eq!(decimal_from_json("rate", None).unwrap(), None);
        assert_eq!(decimal_from_json("rate", Some(&Value::Null)).unwrap(), None);
    }

    #[test]
    fn test_decimal_from_json_rejects_garbage() {
        let v = json!("abc");
        let err = decimal_from_json("hours", Some(&v)).unwrap_err();
        assert!(matches!(err, QuoteError::InvalidNumber { ref field, .. } if field == "hours"));

        let v = json!([1, 2]);
        assert!(decimal_from_json("hours", Some(&v)).is_err());
    }

    #[test]
    fn test_quote_item_defaults() {
        let item = QuoteItem::from_json(&json!({"hours": 2})).unwrap();
        assert_eq!(item.hours, Decimal::new(2, 0));
        assert_eq!(item.quantity, Decimal::ONE);
        assert_eq!(item.hourly_rate, None);
        assert_eq!(item.material_cost, None);
    }

    #[test]
    fn test_quote_draft_from_json() {
        let draft = QuoteDraft::from_json(&json!({
            "items": [],
            "total": 50,
            "valid_until": "2026-01-31"
        }))
        .unwrap();
        assert!(draft.items.is_empty());
        assert_eq!(draft.total, Decimal::new(50, 0));
        assert_eq!(draft.valid_until.as_deref(), Some("2026-01-31"));
    }
}
