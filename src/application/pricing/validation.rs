//! Admin-side tariff-rule validation
//!
//! Invoked by the CRUD surface before persisting a rule, never by the
//! resolver. Within one plan, two active rules that apply to the same
//! (connector type, days, time window) slice must not share a priority.

use crate::domain::tariff::TariffRule;
use crate::domain::{DomainError, DomainResult};
use chrono::NaiveTime;
use rust_decimal::Decimal;

/// Validate a new or edited rule against its plan's existing rules.
pub fn validate_tariff_rule(rule: &TariffRule, existing: &[TariffRule]) -> DomainResult<()> {
    if rule.name.trim().is_empty() {
        return Err(DomainError::Validation("Rule name is required".to_string()));
    }

    if rule.price < Decimal::ZERO {
        return Err(DomainError::Validation(
            "Price must be non-negative".to_string(),
        ));
    }

    if let (Some(min), Some(max)) = (rule.power_range_min, rule.power_range_max) {
        if min > max {
            return Err(DomainError::Validation(
                "power_range_min must not exceed power_range_max".to_string(),
            ));
        }
    }

    if let (Some(start), Some(end)) = (rule.time_start, rule.time_end) {
        if start == end {
            return Err(DomainError::Validation(
                "time_start and time_end must differ".to_string(),
            ));
        }
    }

    for other in existing {
        if other.id == rule.id || !other.is_active {
            continue;
        }
        if other.priority == rule.priority && rules_overlap(rule, other) {
            return Err(DomainError::Conflict(format!(
                "Rule conflicts with '{}' at priority {}",
                other.name, other.priority
            )));
        }
    }

    Ok(())
}

/// Whether two rules can apply to the same request slice.
fn rules_overlap(a: &TariffRule, b: &TariffRule) -> bool {
    // Connector types: disjoint named types never overlap; ALL overlaps all.
    let a_type = a.connector_type.as_deref().unwrap_or("ALL");
    let b_type = b.connector_type.as_deref().unwrap_or("ALL");
    if a_type != "ALL" && b_type != "ALL" && a_type != b_type {
        return false;
    }

    // Explicit weekday sets: disjoint sets never overlap.
    if !a.days_of_week.is_empty() && !b.days_of_week.is_empty() {
        let intersects = a.days_of_week.iter().any(|d| b.days_of_week.contains(d));
        if !intersects {
            return false;
        }
    }

    // Time windows.
    match (a.time_start, a.time_end, b.time_start, b.time_end) {
        (Some(a_start), Some(a_end), Some(b_start), Some(b_end)) => {
            time_ranges_overlap(a_start, a_end, b_start, b_end)
        }
        // A rule without a window covers the whole day.
        _ => true,
    }
}

fn time_ranges_overlap(
    start1: NaiveTime,
    end1: NaiveTime,
    start2: NaiveTime,
    end2: NaiveTime,
) -> bool {
    if start1 < end1 && start2 < end2 {
        return !(end1 <= start2 || end2 <= start1);
    }
    // One or both ranges cross midnight; treat as overlapping.
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TariffType;
    use chrono::Utc;
    use uuid::Uuid;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn rule(name: &str, priority: i32) -> TariffRule {
        TariffRule {
            id: Uuid::new_v4(),
            tariff_plan_id: Uuid::new_v4(),
            name: name.to_string(),
            tariff_type: TariffType::PerKwh,
            connector_type: Some("ALL".to_string()),
            power_range_min: None,
            power_range_max: None,
            price: Decimal::from(15),
            currency: "KGS".to_string(),
            time_start: None,
            time_end: None,
            days_of_week: Vec::new(),
            is_weekend: None,
            valid_from: None,
            valid_until: None,
            priority,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn rejects_negative_price() {
        let mut r = rule("bad", 1);
        r.price = Decimal::from(-1);
        assert!(validate_tariff_rule(&r, &[]).is_err());
    }

    #[test]
    fn rejects_inverted_power_range() {
        let mut r = rule("bad", 1);
        r.power_range_min = Some(150.0);
        r.power_range_max = Some(50.0);
        assert!(validate_tariff_rule(&r, &[]).is_err());
    }

    #[test]
    fn rejects_degenerate_time_window() {
        let mut r = rule("bad", 1);
        r.time_start = Some(t(9, 0));
        r.time_end = Some(t(9, 0));
        assert!(validate_tariff_rule(&r, &[]).is_err());
    }

    #[test]
    fn same_priority_overlapping_windows_conflict() {
        let mut existing = rule("day", 5);
        existing.time_start = Some(t(8, 0));
        existing.time_end = Some(t(20, 0));

        let mut new = rule("midday", 5);
        new.time_start = Some(t(12, 0));
        new.time_end = Some(t(14, 0));

        assert!(validate_tariff_rule(&new, &[existing]).is_err());
    }

    #[test]
    fn same_priority_disjoint_windows_pass() {
        let mut existing = rule("morning", 5);
        existing.time_start = Some(t(6, 0));
        existing.time_end = Some(t(12, 0));

        let mut new = rule("evening", 5);
        new.time_start = Some(t(12, 0));
        new.time_end = Some(t(20, 0));

        assert!(validate_tariff_rule(&new, &[existing]).is_ok());
    }

    #[test]
    fn different_connector_types_pass() {
        let mut existing = rule("ccs", 5);
        existing.connector_type = Some("CCS2".to_string());
        let mut new = rule("type2", 5);
        new.connector_type = Some("Type2".to_string());
        assert!(validate_tariff_rule(&new, &[existing]).is_ok());
    }

    #[test]
    fn disjoint_weekday_sets_pass() {
        let mut existing = rule("weekdays", 5);
        existing.days_of_week = vec![1, 2, 3, 4, 5];
        let mut new = rule("weekend", 5);
        new.days_of_week = vec![6, 7];
        assert!(validate_tariff_rule(&new, &[existing]).is_ok());
    }

    #[test]
    fn different_priorities_never_conflict() {
        let existing = rule("base", 1);
        let new = rule("peak", 10);
        assert!(validate_tariff_rule(&new, &[existing]).is_ok());
    }
}
