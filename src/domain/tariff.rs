//! Tariff domain entities
//!
//! A `TariffPlan` groups `TariffRule`s; a rule applies to a slice of
//! (connector type, power range, calendar validity, day of week, time
//! window). `TariffSnapshot` is the immutable result of pricing
//! resolution, persisted per session for audit.

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Timelike, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::money::{decimal_from_kwh, round_money, CURRENCY};

/// What the rule's price applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TariffType {
    PerKwh,
    PerMinute,
    SessionFee,
    ParkingFee,
}

impl TariffType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PerKwh => "per_kwh",
            Self::PerMinute => "per_minute",
            Self::SessionFee => "session_fee",
            Self::ParkingFee => "parking_fee",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "per_minute" => Self::PerMinute,
            "session_fee" => Self::SessionFee,
            "parking_fee" => Self::ParkingFee,
            _ => Self::PerKwh,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TariffPlan {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
}

/// One pricing rule inside a plan. Higher `priority` wins.
#[derive(Debug, Clone)]
pub struct TariffRule {
    pub id: Uuid,
    pub tariff_plan_id: Uuid,
    pub name: String,
    pub tariff_type: TariffType,
    /// `None` means ALL connector types.
    pub connector_type: Option<String>,
    pub power_range_min: Option<f64>,
    pub power_range_max: Option<f64>,
    pub price: Decimal,
    pub currency: String,
    /// Time window; may cross midnight; inclusive on both ends.
    pub time_start: Option<NaiveTime>,
    pub time_end: Option<NaiveTime>,
    /// ISO weekdays 1 (Mon) .. 7 (Sun). Empty set = unfiltered.
    pub days_of_week: Vec<u8>,
    pub is_weekend: Option<bool>,
    pub valid_from: Option<NaiveDate>,
    pub valid_until: Option<NaiveDate>,
    pub priority: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl TariffRule {
    /// Whether this rule applies to the given request slice at `at`.
    pub fn matches(&self, connector_type: Option<&str>, power_kw: Option<f64>, at: DateTime<Utc>) -> bool {
        if !self.is_active {
            return false;
        }

        let date = at.date_naive();
        if let Some(from) = self.valid_from {
            if date < from {
                return false;
            }
        }
        if let Some(until) = self.valid_until {
            if date > until {
                return false;
            }
        }

        if let (Some(rule_type), Some(req_type)) = (self.connector_type.as_deref(), connector_type)
        {
            if rule_type != "ALL" && !rule_type.eq_ignore_ascii_case(req_type) {
                return false;
            }
        }

        if let Some(power) = power_kw {
            if let Some(min) = self.power_range_min {
                if power < min {
                    return false;
                }
            }
            if let Some(max) = self.power_range_max {
                if power > max {
                    return false;
                }
            }
        }

        if !self.applies_on_day(at.weekday().number_from_monday()) {
            return false;
        }

        time_in_window(at.time(), self.time_start, self.time_end)
    }

    /// Day filter: explicit weekday set wins, then the weekend flag.
    pub fn applies_on_day(&self, iso_weekday: u32) -> bool {
        if !self.days_of_week.is_empty() {
            return self.days_of_week.iter().any(|d| u32::from(*d) == iso_weekday);
        }
        if let Some(weekend) = self.is_weekend {
            return (iso_weekday >= 6) == weekend;
        }
        true
    }

    pub fn is_time_based(&self) -> bool {
        self.time_start.is_some() && self.time_end.is_some()
    }

    /// Human-readable description, e.g. "Ночной тариф - 22:00-06:00 (Пн,Вт)".
    pub fn description(&self) -> String {
        const DAYS: [&str; 7] = ["Пн", "Вт", "Ср", "Чт", "Пт", "Сб", "Вс"];

        let mut parts = Vec::new();
        if !self.name.is_empty() {
            parts.push(self.name.clone());
        }
        if let (Some(start), Some(end)) = (self.time_start, self.time_end) {
            parts.push(format!(
                "{:02}:{:02}-{:02}:{:02}",
                start.hour(),
                start.minute(),
                end.hour(),
                end.minute()
            ));
        }
        if !self.days_of_week.is_empty() {
            let mut days = self.days_of_week.clone();
            days.sort_unstable();
            let names: Vec<&str> = days
                .iter()
                .filter_map(|d| DAYS.get(usize::from(*d).saturating_sub(1)).copied())
                .collect();
            parts.push(format!("({})", names.join(",")));
        } else if self.is_weekend == Some(true) {
            parts.push("Выходные".to_string());
        }

        if parts.is_empty() {
            let fallback = match self.tariff_type {
                TariffType::PerKwh => "Тариф за энергию",
                TariffType::PerMinute => "Поминутный тариф",
                TariffType::SessionFee => "Фиксированная плата",
                TariffType::ParkingFee => "Плата за парковку",
            };
            parts.push(fallback.to_string());
        }

        parts.join(" - ")
    }
}

/// Time-window test; windows may cross midnight and are inclusive on
/// both ends. A missing bound means "always".
pub fn time_in_window(current: NaiveTime, start: Option<NaiveTime>, end: Option<NaiveTime>) -> bool {
    let (Some(start), Some(end)) = (start, end) else {
        return true;
    };

    if start < end {
        // Plain range (09:00 - 18:00)
        start <= current && current <= end
    } else {
        // Range across midnight (22:00 - 06:00)
        current >= start || current <= end
    }
}

/// Per-client pricing override, valid within [valid_from, valid_until).
#[derive(Debug, Clone)]
pub struct ClientTariff {
    pub id: Uuid,
    pub client_id: Uuid,
    /// Fixed price short-circuits plan resolution entirely.
    pub fixed_rate_per_kwh: Option<Decimal>,
    pub tariff_plan_id: Option<Uuid>,
    pub discount_percent: Option<Decimal>,
    pub valid_from: DateTime<Utc>,
    pub valid_until: Option<DateTime<Utc>>,
    pub is_active: bool,
}

/// Immutable result of pricing resolution; stored as `pricing_history`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TariffSnapshot {
    pub rate_per_kwh: Decimal,
    pub rate_per_minute: Decimal,
    pub session_fee: Decimal,
    pub parking_fee_per_minute: Decimal,
    pub currency: String,
    /// Description of the rule that produced this snapshot.
    pub active_rule: String,
    pub rule_details: serde_json::Value,
    pub time_based: bool,
    /// When the currently applied rule would cease to apply, if known.
    pub next_rate_change: Option<DateTime<Utc>>,
    pub tariff_plan_id: Option<Uuid>,
    pub rule_id: Option<Uuid>,
}

impl TariffSnapshot {
    /// Network-wide fallback when nothing else resolves.
    pub fn default_tariff() -> Self {
        Self {
            rate_per_kwh: Decimal::new(135, 1), // 13.5
            rate_per_minute: Decimal::ZERO,
            session_fee: Decimal::ZERO,
            parking_fee_per_minute: Decimal::ZERO,
            currency: CURRENCY.to_string(),
            active_rule: "Базовый тариф".to_string(),
            rule_details: serde_json::json!({"type": "default"}),
            time_based: false,
            next_rate_change: None,
            tariff_plan_id: None,
            rule_id: None,
        }
    }

    /// Estimated cost of delivering `energy_kwh` over `duration_minutes`.
    pub fn estimated_cost(&self, energy_kwh: f64, duration_minutes: i64) -> Decimal {
        let mut cost = decimal_from_kwh(energy_kwh) * self.rate_per_kwh + self.session_fee;
        if self.rate_per_minute > Decimal::ZERO {
            cost += Decimal::from(duration_minutes) * self.rate_per_minute;
        }
        round_money(cost)
    }

    /// Cost of an actual delivery over `duration_minutes`.
    pub fn actual_cost(&self, energy_kwh: f64, duration_minutes: i64) -> Decimal {
        let mut cost = decimal_from_kwh(energy_kwh) * self.rate_per_kwh + self.session_fee;
        if self.rate_per_minute > Decimal::ZERO {
            cost += Decimal::from(duration_minutes) * self.rate_per_minute;
        }
        round_money(cost)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::str::FromStr;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn rule() -> TariffRule {
        TariffRule {
            id: Uuid::new_v4(),
            tariff_plan_id: Uuid::new_v4(),
            name: "Дневной".to_string(),
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
            priority: 10,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn plain_window_is_inclusive() {
        assert!(time_in_window(t(9, 0), Some(t(9, 0)), Some(t(18, 0))));
        assert!(time_in_window(t(18, 0), Some(t(9, 0)), Some(t(18, 0))));
        assert!(!time_in_window(t(18, 1), Some(t(9, 0)), Some(t(18, 0))));
    }

    #[test]
    fn midnight_crossing_window() {
        let start = Some(t(22, 0));
        let end = Some(t(6, 0));
        assert!(time_in_window(t(23, 30), start, end));
        assert!(time_in_window(t(3, 0), start, end));
        assert!(time_in_window(t(22, 0), start, end));
        assert!(time_in_window(t(6, 0), start, end));
        assert!(!time_in_window(t(12, 0), start, end));
    }

    #[test]
    fn missing_bounds_always_match() {
        assert!(time_in_window(t(12, 0), None, None));
        assert!(time_in_window(t(12, 0), Some(t(9, 0)), None));
    }

    #[test]
    fn connector_type_filter() {
        let mut r = rule();
        let at = Utc.with_ymd_and_hms(2025, 6, 2, 12, 0, 0).unwrap(); // Monday
        assert!(r.matches(Some("CCS2"), None, at));

        r.connector_type = Some("Type2".to_string());
        assert!(!r.matches(Some("CCS2"), None, at));
        assert!(r.matches(Some("Type2"), None, at));
        // A request without a connector type passes the filter
        assert!(r.matches(None, None, at));
    }

    #[test]
    fn power_range_filter() {
        let mut r = rule();
        r.power_range_min = Some(50.0);
        r.power_range_max = Some(150.0);
        let at = Utc.with_ymd_and_hms(2025, 6, 2, 12, 0, 0).unwrap();
        assert!(r.matches(None, Some(60.0), at));
        assert!(!r.matches(None, Some(22.0), at));
        assert!(!r.matches(None, Some(350.0), at));
        assert!(r.matches(None, None, at));
    }

    #[test]
    fn weekday_and_weekend_filters() {
        let monday = Utc.with_ymd_and_hms(2025, 6, 2, 12, 0, 0).unwrap();
        let saturday = Utc.with_ymd_and_hms(2025, 6, 7, 12, 0, 0).unwrap();

        let mut r = rule();
        r.days_of_week = vec![1, 2, 3, 4, 5];
        assert!(r.matches(None, None, monday));
        assert!(!r.matches(None, None, saturday));

        let mut r = rule();
        r.is_weekend = Some(true);
        assert!(!r.matches(None, None, monday));
        assert!(r.matches(None, None, saturday));
    }

    #[test]
    fn validity_dates() {
        let mut r = rule();
        r.valid_from = Some(NaiveDate::from_ymd_opt(2025, 7, 1).unwrap());
        let june = Utc.with_ymd_and_hms(2025, 6, 2, 12, 0, 0).unwrap();
        let july = Utc.with_ymd_and_hms(2025, 7, 2, 12, 0, 0).unwrap();
        assert!(!r.matches(None, None, june));
        assert!(r.matches(None, None, july));
    }

    #[test]
    fn default_tariff_values() {
        let snapshot = TariffSnapshot::default_tariff();
        assert_eq!(snapshot.rate_per_kwh, Decimal::from_str("13.5").unwrap());
        assert_eq!(snapshot.currency, "KGS");
        assert_eq!(snapshot.active_rule, "Базовый тариф");
    }

    #[test]
    fn estimated_cost_with_all_components() {
        let mut snapshot = TariffSnapshot::default_tariff();
        snapshot.rate_per_kwh = Decimal::from(10);
        snapshot.session_fee = Decimal::from(25);
        snapshot.rate_per_minute = Decimal::from_str("0.5").unwrap();
        // 10 kWh * 10 + 25 + 60 min * 0.5 = 155
        assert_eq!(snapshot.estimated_cost(10.0, 60), Decimal::from(155));
    }

    #[test]
    fn rule_description_includes_window() {
        let mut r = rule();
        r.time_start = Some(t(22, 0));
        r.time_end = Some(t(6, 0));
        assert_eq!(r.description(), "Дневной - 22:00-06:00");
    }
}
