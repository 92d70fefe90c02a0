// ==========================================
// ForgeDB 核心 - 报价计算引擎
// ==========================================
// 职责: 工时费 / 材料费 / 折扣 / 附加费 / 税额 / 报价总计 / 业务规则校验
// 输入: 报价明细 + 修正项 (定点小数)
// 输出: 计算结果值对象
// ==========================================
// 红线:
// - 金额一律 rust_decimal，每次乘除后立即按 2 位小数 half-up 舍入
// - 乘加一律 checked_*，溢出返回 QuoteError::Overflow
// - 无副作用，无全局状态
// - 税额永远基于折扣后金额
// ==========================================

use crate::config::PricingDefaults;
use crate::domain::quote::{
    round_money, zero_money, BusinessRuleReport, DiscountResult, ItemTotals, MaterialLine,
    QuoteDraft, QuoteError, QuoteItem, QuoteModifiers, QuoteResult, QuoteTotals, SurchargeResult,
    TaxResult, MONEY_SCALE,
};
use crate::i18n::t;
use chrono::{Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde_json::Value;

/// 有效期上限（天）
pub const MAX_VALIDITY_DAYS: i64 = 90;

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

// ==========================================
// QuoteCalculationEngine - 报价计算引擎
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuoteCalculationEngine {
    default_tax_percent: Decimal,
    default_hourly_rate: Decimal,
}

impl Default for QuoteCalculationEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl QuoteCalculationEngine {
    /// 使用默认税率 16.00% 与默认工时单价 500.00
    pub fn new() -> Self {
        Self::with_pricing(PricingDefaults::default())
    }

    /// 使用配置中的默认值
    pub fn with_pricing(pricing: PricingDefaults) -> Self {
        Self {
            default_tax_percent: pricing.tax_percent,
            default_hourly_rate: pricing.hourly_rate,
        }
    }

    pub fn default_tax_percent(&self) -> Decimal {
        self.default_tax_percent
    }

    pub fn default_hourly_rate(&self) -> Decimal {
        self.default_hourly_rate
    }

    // ==========================================
    // 基础计算
    // ==========================================

    /// 工时费
    ///
    /// # 参数
    /// - hours: 工时
    /// - hourly_rate: 小时费率（None 使用默认费率）
    ///
    /// # 返回
    /// - Ok: 任一输入 <= 0 时为 0.00，否则 hours × rate（舍入）
    /// - Err(QuoteError::Overflow): 乘积超出定点小数范围
    pub fn calculate_labor_cost(&self, hours: Decimal, hourly_rate: Option<Decimal>) -> QuoteResult<Decimal> {
        let rate = hourly_rate.unwrap_or(self.default_hourly_rate);
        if hours <= Decimal::ZERO || rate <= Decimal::ZERO {
            return Ok(zero_money());
        }
        money("labor_cost", checked_mul("labor_cost", hours, rate)?)
    }

    /// 材料费: 各行 quantity × unit_price 先舍入再累加，跳过非正数行
    pub fn calculate_material_cost(&self, lines: &[MaterialLine]) -> QuoteResult<Decimal> {
        let mut total = zero_money();
        for line in lines
            .iter()
            .filter(|line| line.quantity > Decimal::ZERO && line.unit_price > Decimal::ZERO)
        {
            let line_total = money("material_cost", checked_mul("material_cost", line.quantity, line.unit_price)?)?;
            total = checked_add("material_cost", total, line_total)?;
        }
        money("material_cost", total)
    }

    /// 折扣
    ///
    /// 固定金额 > 0 时覆盖百分比折扣；折扣不超过小计
    pub fn calculate_discount(
        &self,
        subtotal: Decimal,
        discount_percent: Option<Decimal>,
        discount_amount: Option<Decimal>,
    ) -> QuoteResult<DiscountResult> {
        let discount = percent_or_fixed("discount_amount", subtotal, discount_percent, discount_amount)?;
        let discount = discount.min(subtotal);
        let after_discount = subtotal
            .checked_sub(discount)
            .ok_or_else(|| overflow("after_discount"))?;

        Ok(DiscountResult {
            discount_amount: money("discount_amount", discount)?,
            after_discount: money("after_discount", after_discount)?,
        })
    }

    /// 附加费: 与折扣相同的覆盖规则，但为加项且不截断
    pub fn calculate_surcharge(
        &self,
        base_amount: Decimal,
        surcharge_percent: Option<Decimal>,
        surcharge_amount: Option<Decimal>,
    ) -> QuoteResult<SurchargeResult> {
        let surcharge = percent_or_fixed("surcharge_amount", base_amount, surcharge_percent, surcharge_amount)?;

        Ok(SurchargeResult {
            surcharge_amount: surcharge,
            after_surcharge: money("after_surcharge", checked_add("after_surcharge", base_amount, surcharge)?)?,
        })
    }

    /// 税额 = base × tax_percent / 100（舍入）
    pub fn calculate_tax(&self, base_amount: Decimal, tax_percent: Option<Decimal>) -> QuoteResult<TaxResult> {
        let tax_percent = tax_percent.unwrap_or(self.default_tax_percent);
        let tax_amount = money("tax_amount", percent_of("tax_amount", base_amount, tax_percent)?)?;

        Ok(TaxResult {
            tax_amount,
            tax_percent,
            after_tax: money("total", checked_add("total", base_amount, tax_amount)?)?,
        })
    }

    // ==========================================
    // 明细与总计
    // ==========================================

    /// 单行明细
    ///
    /// labor_cost = 工时费 × quantity；line_subtotal = labor_cost + material_cost
    pub fn calculate_quote_item_total(&self, item: &QuoteItem) -> QuoteResult<ItemTotals> {
        let hourly_rate = item.hourly_rate.unwrap_or(self.default_hourly_rate);
        let unit_labor = self.calculate_labor_cost(item.hours, Some(hourly_rate))?;
        let labor_cost = money("labor_cost", checked_mul("labor_cost", unit_labor, item.quantity)?)?;
        let material_cost = money("material_cost", item.material_cost.unwrap_or(Decimal::ZERO))?;

        Ok(ItemTotals {
            hours: item.hours,
            hourly_rate,
            quantity: item.quantity,
            labor_cost,
            material_cost,
            line_subtotal: money("line_subtotal", checked_add("line_subtotal", labor_cost, material_cost)?)?,
        })
    }

    /// 报价总计
    ///
    /// # 步骤
    /// 1. 累加各行工时费 / 材料费 / 工时
    /// 2. subtotal = labor_total + materials_total + additional_costs
    /// 3. 对 subtotal 计算折扣
    /// 4. 对折扣后金额计算税额
    ///
    /// 任一中间结果超出定点小数范围时返回 QuoteError::Overflow
    pub fn calculate_quote_totals(&self, items: &[QuoteItem], modifiers: &QuoteModifiers) -> QuoteResult<QuoteTotals> {
        let mut labor_total = zero_money();
        let mut materials_total = zero_money();
        let mut total_hours = Decimal::ZERO;

        for item in items {
            let line = self.calculate_quote_item_total(item)?;
            labor_total = checked_add("labor_total", labor_total, line.labor_cost)?;
            materials_total = checked_add("materials_total", materials_total, line.material_cost)?;
            total_hours = checked_add(
                "total_hours",
                total_hours,
                checked_mul("total_hours", line.hours, line.quantity)?,
            )?;
        }

        let additional_costs = money("additional_costs", modifiers.additional_costs.unwrap_or(Decimal::ZERO))?;
        let subtotal = checked_add(
            "subtotal",
            checked_add("subtotal", labor_total, materials_total)?,
            additional_costs,
        )?;
        let subtotal = money("subtotal", subtotal)?;

        let discount = self.calculate_discount(subtotal, modifiers.discount_percent, modifiers.discount_amount)?;
        let tax = self.calculate_tax(discount.after_discount, modifiers.tax_percent)?;

        Ok(QuoteTotals {
            labor_total: money("labor_total", labor_total)?,
            materials_total: money("materials_total", materials_total)?,
            additional_costs,
            subtotal,
            discount_percent: money("discount_percent", modifiers.discount_percent.unwrap_or(Decimal::ZERO))?,
            discount_amount: discount.discount_amount,
            after_discount: discount.after_discount,
            tax_percent: tax.tax_percent,
            tax_amount: tax.tax_amount,
            total: tax.after_tax,
            total_hours,
        })
    }

    // ==========================================
    // 业务规则校验
    // ==========================================

    /// 业务规则校验（以当天 UTC 日期为基准）
    pub fn validate_business_rules(&self, draft: &QuoteDraft) -> BusinessRuleReport {
        self.validate_business_rules_at(draft, Utc::now().date_naive())
    }

    /// 业务规则校验
    ///
    /// # 错误（阻断保存）
    /// - 无明细 / 总计为负 / 折扣超过小计 / 有效期无法解析
    ///
    /// # 警告
    /// - 总工时为 0 / 有效期已过 / 有效期超过 90 天
    pub fn validate_business_rules_at(&self, draft: &QuoteDraft, today: NaiveDate) -> BusinessRuleReport {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        if draft.items.is_empty() {
            errors.push(t("quote.validation.no_items"));
        }
        if draft.total < Decimal::ZERO {
            errors.push(t("quote.validation.negative_total"));
        }
        if draft.discount_amount > draft.subtotal {
            errors.push(t("quote.validation.discount_exceeds_subtotal"));
        }
        if draft.total_hours <= Decimal::ZERO {
            warnings.push(t("quote.validation.zero_hours"));
        }

        if let Some(raw) = draft.valid_until.as_deref() {
            match NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d") {
                Ok(valid_date) if valid_date < today => {
                    warnings.push(t("quote.validation.valid_until_past"));
                }
                Ok(valid_date) if valid_date > today + Duration::days(MAX_VALIDITY_DAYS) => {
                    warnings.push(t("quote.validation.valid_until_too_far"));
                }
                Ok(_) => {}
                Err(_) => errors.push(t("quote.validation.valid_until_invalid")),
            }
        }

        BusinessRuleReport {
            valid: errors.is_empty(),
            errors,
            warnings,
        }
    }

    /// 对原始字典做业务规则校验（不返回错误：数值转换失败也记为校验错误）
    pub fn validate_business_rules_value(&self, quote_data: &Value, today: NaiveDate) -> BusinessRuleReport {
        match QuoteDraft::from_json(quote_data) {
            Ok(draft) => self.validate_business_rules_at(&draft, today),
            Err(e) => {
                tracing::debug!(error = %e, "报价数据无法解析");
                BusinessRuleReport {
                    valid: false,
                    errors: vec![e.to_string()],
                    warnings: Vec::new(),
                }
            }
        }
    }
}

// ==========================================
// 溢出检查的金额运算
// ==========================================

fn overflow(field: &str) -> QuoteError {
    QuoteError::Overflow {
        field: field.to_string(),
    }
}

fn checked_mul(field: &str, a: Decimal, b: Decimal) -> QuoteResult<Decimal> {
    a.checked_mul(b).ok_or_else(|| overflow(field))
}

fn checked_add(field: &str, a: Decimal, b: Decimal) -> QuoteResult<Decimal> {
    a.checked_add(b).ok_or_else(|| overflow(field))
}

/// base × pct / 100
fn percent_of(field: &str, base: Decimal, pct: Decimal) -> QuoteResult<Decimal> {
    checked_mul(field, base, pct)?
        .checked_div(HUNDRED)
        .ok_or_else(|| overflow(field))
}

/// 舍入到 2 位小数；放不下 2 位小数的量级视为溢出
fn money(field: &str, value: Decimal) -> QuoteResult<Decimal> {
    let rounded = round_money(value);
    if rounded.scale() == MONEY_SCALE {
        Ok(rounded)
    } else {
        Err(overflow(field))
    }
}

/// 固定金额 > 0 时覆盖百分比
fn percent_or_fixed(field: &str, base: Decimal, percent: Option<Decimal>, fixed: Option<Decimal>) -> QuoteResult<Decimal> {
    match (percent, fixed) {
        (_, Some(amount)) if amount > Decimal::ZERO => money(field, amount),
        (Some(pct), _) if pct > Decimal::ZERO => money(field, percent_of(field, base, pct)?),
        _ => Ok(zero_money()),
    }
}
