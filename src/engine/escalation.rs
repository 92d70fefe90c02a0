// ==========================================
// ForgeDB 核心 - 告警升级状态机
// ==========================================
// 状态: low → medium → high → critical（单向）
// 门控: 开放时长达到阈值 且 该告警尚未升级过 (escalation_level == 0)
// 纯函数，不访问存储
// ==========================================

use crate::config::ThresholdConfig;
use crate::domain::types::Severity;

/// 一次升级
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EscalationStep {
    pub from: Severity,
    pub to: Severity,
}

impl EscalationStep {
    /// critical 保持 critical，仅标记需主管关注
    pub fn is_supervisor_flag(&self) -> bool {
        self.from == Severity::Critical && self.to == Severity::Critical
    }
}

/// 该严重度触发升级所需的开放时长（小时）
pub fn escalation_after_hours(current: Severity, thresholds: &ThresholdConfig) -> f64 {
    match current {
        Severity::Critical => thresholds.escalation_time_critical_hours,
        Severity::High => thresholds.escalation_time_hours,
        Severity::Medium => thresholds.escalation_time_hours * 2.0,
        Severity::Low => thresholds.escalation_time_hours * 3.0,
    }
}

/// 计算下一严重度
///
/// # 参数
/// - current: 本次检测得到的严重度
/// - hours_elapsed: 已存在开放告警的开放时长
/// - escalation_level: 该告警已有的升级次数
///
/// # 返回
/// - Some(step): 需要升级（critical → critical 表示仅标记）
/// - None: 不升级
pub fn next_severity(
    current: Severity,
    hours_elapsed: f64,
    escalation_level: i32,
    thresholds: &ThresholdConfig,
) -> Option<EscalationStep> {
    if escalation_level != 0 || hours_elapsed < escalation_after_hours(current, thresholds) {
        return None;
    }

    let to = match current {
        Severity::Critical | Severity::High => Severity::Critical,
        Severity::Medium => Severity::High,
        Severity::Low => Severity::Medium,
    };
    Some(EscalationStep { from: current, to })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> ThresholdConfig {
        ThresholdConfig::default()
    }

    #[test]
    fn test_ladder() {
        let c = cfg();
        assert_eq!(
            next_severity(Severity::High, 25.0, 0, &c),
            Some(EscalationStep { from: Severity::High, to: Severity::Critical })
        );
        assert_eq!(next_severity(Severity::Medium, 47.9, 0, &c), None);
        assert_eq!(next_severity(Severity::Medium, 48.0, 0, &c).map(|s| s.to), Some(Severity::High));
        assert_eq!(next_severity(Severity::Low, 71.0, 0, &c), None);
        assert_eq!(next_severity(Severity::Low, 72.0, 0, &c).map(|s| s.to), Some(Severity::Medium));
    }

    #[test]
    fn test_critical_only_flags() {
        let c = cfg();
        assert_eq!(next_severity(Severity::Critical, 3.9, 0, &c), None);
        let step = next_severity(Severity::Critical, 4.0, 0, &c).unwrap();
        assert!(step.is_supervisor_flag());
    }

    #[test]
    fn test_escalates_once() {
        let c = cfg();
        assert_eq!(next_severity(Severity::High, 500.0, 1, &c), None);
        assert_eq!(next_severity(Severity::Low, 500.0, 2, &c), None);
    }

    #[test]
    fn test_uses_configured_hours() {
        let c = ThresholdConfig {
            escalation_time_hours: 1.0,
            ..ThresholdConfig::default()
        };
        assert!(next_severity(Severity::High, 1.0, 0, &c).is_some());
        assert!(next_severity(Severity::Low, 2.5, 0, &c).is_none());
    }
}
