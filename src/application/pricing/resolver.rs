//! Dynamic pricing resolver
//!
//! Produces the immutable `TariffSnapshot` a session is billed against.
//! Resolution order, first match wins:
//!
//! 1. client-specific override (fixed rate, or plan + discount)
//! 2. station-specific `price_per_kwh`
//! 3. the station's tariff plan (rule filtering by connector type, power,
//!    validity dates, day of week, time window)
//! 4. network fallback (13.5 KGS, "Базовый тариф")

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Datelike, Timelike, Utc};
use rust_decimal::Decimal;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::money::round_money;
use crate::domain::{DomainError, DomainResult, RepositoryProvider, TariffRule, TariffSnapshot, TariffType};

use super::cache::{CacheKey, PricingCache};

pub struct PricingResolver {
    repos: Arc<dyn RepositoryProvider>,
    cache: PricingCache,
}

impl PricingResolver {
    pub fn new(repos: Arc<dyn RepositoryProvider>) -> Self {
        Self {
            repos,
            cache: PricingCache::new(),
        }
    }

    pub fn with_cache_ttl(repos: Arc<dyn RepositoryProvider>, ttl: Duration) -> Self {
        Self {
            repos,
            cache: PricingCache::with_settings(ttl, 4096),
        }
    }

    /// Resolve the tariff for a (station, connector type, power, time,
    /// client) tuple. Memoised for 300 s on the minute-truncated time.
    pub async fn resolve(
        &self,
        station_id: &str,
        connector_type: Option<&str>,
        power_kw: Option<f64>,
        at: DateTime<Utc>,
        client_id: Option<Uuid>,
    ) -> DomainResult<TariffSnapshot> {
        let key = CacheKey::new(station_id, connector_type, power_kw, at, client_id);
        if let Some(snapshot) = self.cache.get(&key) {
            return Ok(snapshot);
        }

        let snapshot = self
            .resolve_uncached(station_id, connector_type, power_kw, at, client_id)
            .await?;
        self.cache.put(key, snapshot.clone());
        Ok(snapshot)
    }

    /// Invalidation hooks for admin CRUD.
    pub fn invalidate_station(&self, station_id: &str) {
        self.cache.invalidate_station(station_id);
    }

    pub fn invalidate_plan(&self, plan_id: Uuid) {
        self.cache.invalidate_plan(plan_id);
    }

    pub fn invalidate_rule(&self, rule_id: Uuid) {
        self.cache.invalidate_rule(rule_id);
    }

    async fn resolve_uncached(
        &self,
        station_id: &str,
        connector_type: Option<&str>,
        power_kw: Option<f64>,
        at: DateTime<Utc>,
        client_id: Option<Uuid>,
    ) -> DomainResult<TariffSnapshot> {
        let station = self
            .repos
            .stations()
            .find_by_id(station_id)
            .await?
            .ok_or_else(|| DomainError::StationNotFound(station_id.to_string()))?;

        // 1. Client-specific override
        if let Some(client_id) = client_id {
            if let Some(client_tariff) =
                self.repos.tariffs().find_client_tariff(client_id, at).await?
            {
                if let Some(fixed_rate) = client_tariff.fixed_rate_per_kwh {
                    info!(%client_id, %fixed_rate, "Applying fixed client tariff");
                    return Ok(TariffSnapshot {
                        rate_per_kwh: fixed_rate,
                        rate_per_minute: Decimal::ZERO,
                        session_fee: Decimal::ZERO,
                        parking_fee_per_minute: Decimal::ZERO,
                        currency: station.currency.clone(),
                        active_rule: "Специальный тариф клиента".to_string(),
                        rule_details: serde_json::json!({
                            "type": "client_fixed",
                            "client_id": client_id,
                        }),
                        time_based: false,
                        next_rate_change: None,
                        tariff_plan_id: client_tariff.tariff_plan_id,
                        rule_id: None,
                    });
                }

                if let Some(plan_id) = client_tariff.tariff_plan_id {
                    if let Some(mut snapshot) = self
                        .resolve_plan(plan_id, connector_type, power_kw, at)
                        .await?
                    {
                        if let Some(discount) = client_tariff.discount_percent {
                            apply_discount(&mut snapshot, discount);
                        }
                        info!(%client_id, plan_id = %plan_id, "Applying client plan tariff");
                        return Ok(snapshot);
                    }
                }
            }
        }

        // 2. Station-specific price
        if let Some(price) = station.price_per_kwh {
            if price > Decimal::ZERO {
                info!(station_id, %price, "Using station-specific price");
                return Ok(TariffSnapshot {
                    rate_per_kwh: price,
                    rate_per_minute: Decimal::ZERO,
                    session_fee: station.session_fee.unwrap_or(Decimal::ZERO),
                    parking_fee_per_minute: Decimal::ZERO,
                    currency: station.currency.clone(),
                    active_rule: "Индивидуальный тариф станции".to_string(),
                    rule_details: serde_json::json!({
                        "type": "station_specific",
                        "station_id": station_id,
                    }),
                    time_based: false,
                    next_rate_change: None,
                    tariff_plan_id: None,
                    rule_id: None,
                });
            }
        }

        // 3. Station's tariff plan
        if let Some(plan_id) = station.tariff_plan_id {
            if let Some(snapshot) = self
                .resolve_plan(plan_id, connector_type, power_kw, at)
                .await?
            {
                return Ok(snapshot);
            }
        }

        // 4. Fallback
        warn!(station_id, "No tariff resolved, using base tariff");
        Ok(TariffSnapshot::default_tariff())
    }

    async fn resolve_plan(
        &self,
        plan_id: Uuid,
        connector_type: Option<&str>,
        power_kw: Option<f64>,
        at: DateTime<Utc>,
    ) -> DomainResult<Option<TariffSnapshot>> {
        let mut rules = self.repos.tariffs().list_active_rules(plan_id).await?;
        sort_rules(&mut rules);
        Ok(select_rule(&rules, connector_type, power_kw, at)
            .map(|rule| build_snapshot(rule, &rules, at)))
    }
}

/// Highest priority first, then most recently created.
fn sort_rules(rules: &mut [TariffRule]) {
    rules.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then(b.created_at.cmp(&a.created_at))
    });
}

/// Pick the first rule (in priority order) whose filters all pass.
fn select_rule<'a>(
    rules: &'a [TariffRule],
    connector_type: Option<&str>,
    power_kw: Option<f64>,
    at: DateTime<Utc>,
) -> Option<&'a TariffRule> {
    rules
        .iter()
        .find(|rule| rule.matches(connector_type, power_kw, at))
}

/// Build the snapshot for a selected rule.
fn build_snapshot(rule: &TariffRule, all_rules: &[TariffRule], at: DateTime<Utc>) -> TariffSnapshot {
    let mut snapshot = TariffSnapshot {
        rate_per_kwh: Decimal::ZERO,
        rate_per_minute: Decimal::ZERO,
        session_fee: Decimal::ZERO,
        parking_fee_per_minute: Decimal::ZERO,
        currency: rule.currency.clone(),
        active_rule: rule.description(),
        rule_details: serde_json::json!({
            "rule_id": rule.id,
            "name": rule.name,
            "tariff_type": rule.tariff_type.as_str(),
            "priority": rule.priority,
        }),
        time_based: rule.is_time_based(),
        next_rate_change: next_rate_change(rule, all_rules, at),
        tariff_plan_id: Some(rule.tariff_plan_id),
        rule_id: Some(rule.id),
    };

    match rule.tariff_type {
        TariffType::PerKwh => snapshot.rate_per_kwh = rule.price,
        TariffType::PerMinute => snapshot.rate_per_minute = rule.price,
        TariffType::SessionFee => snapshot.session_fee = rule.price,
        TariffType::ParkingFee => snapshot.parking_fee_per_minute = rule.price,
    }

    snapshot
}

/// When would the current rule cease to apply?
///
/// The infimum of the current rule's window end and the starts of other
/// rules later today that apply on this weekday.
fn next_rate_change(
    current: &TariffRule,
    all_rules: &[TariffRule],
    at: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    let end = current.time_end?;
    let now_time = at.time();
    let weekday = at.weekday().number_from_monday();

    let at_minute = |date: chrono::NaiveDate, time: chrono::NaiveTime| {
        date.and_time(time)
            .and_utc()
            .with_second(0)
            .and_then(|t| t.with_nanosecond(0))
    };

    let mut candidates: Vec<DateTime<Utc>> = Vec::new();

    // End of the current rule: today if still ahead, otherwise tomorrow.
    let end_date = if end > now_time {
        at.date_naive()
    } else {
        at.date_naive().succ_opt()?
    };
    candidates.extend(at_minute(end_date, end));

    // Starts of other rules later today.
    for rule in all_rules {
        if rule.id == current.id {
            continue;
        }
        let Some(start) = rule.time_start else {
            continue;
        };
        if start > now_time && rule.applies_on_day(weekday) {
            candidates.extend(at_minute(at.date_naive(), start));
        }
    }

    candidates.into_iter().min()
}

fn apply_discount(snapshot: &mut TariffSnapshot, percent: Decimal) {
    let multiplier = Decimal::ONE - percent / Decimal::from(100);
    snapshot.rate_per_kwh = round_money(snapshot.rate_per_kwh * multiplier);
    snapshot.rate_per_minute = round_money(snapshot.rate_per_minute * multiplier);
    snapshot.active_rule = format!("{} (скидка {}%)", snapshot.active_rule, percent.normalize());
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveTime, TimeZone};
    use std::str::FromStr;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn rule(name: &str, priority: i32, price: i64, tariff_type: TariffType) -> TariffRule {
        TariffRule {
            id: Uuid::new_v4(),
            tariff_plan_id: Uuid::new_v4(),
            name: name.to_string(),
            tariff_type,
            connector_type: Some("ALL".to_string()),
            power_range_min: None,
            power_range_max: None,
            price: Decimal::from(price),
            currency: "KGS".to_string(),
            time_start: None,
            time_end: None,
            days_of_week: Vec::new(),
            is_weekend: None,
            valid_from: None,
            valid_until: None,
            priority,
            is_active: true,
            created_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn highest_priority_wins() {
        let mut rules = vec![
            rule("base", 1, 12, TariffType::PerKwh),
            rule("peak", 10, 20, TariffType::PerKwh),
        ];
        sort_rules(&mut rules);
        let at = Utc.with_ymd_and_hms(2025, 6, 2, 12, 0, 0).unwrap();
        let selected = select_rule(&rules, None, None, at).unwrap();
        assert_eq!(selected.name, "peak");
    }

    #[test]
    fn ties_break_by_recency() {
        let mut older = rule("older", 5, 12, TariffType::PerKwh);
        older.created_at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let newer = rule("newer", 5, 14, TariffType::PerKwh);
        let mut rules = vec![older, newer];
        sort_rules(&mut rules);
        assert_eq!(rules[0].name, "newer");
    }

    #[test]
    fn window_filter_selects_night_rule() {
        let mut day = rule("day", 5, 18, TariffType::PerKwh);
        day.time_start = Some(t(6, 0));
        day.time_end = Some(t(22, 0));
        let mut night = rule("night", 5, 9, TariffType::PerKwh);
        night.time_start = Some(t(22, 0));
        night.time_end = Some(t(6, 0));

        let rules = vec![day, night];
        let midnight = Utc.with_ymd_and_hms(2025, 6, 3, 0, 30, 0).unwrap();
        let selected = select_rule(&rules, None, None, midnight).unwrap();
        assert_eq!(selected.name, "night");
    }

    #[test]
    fn snapshot_places_price_by_type() {
        let r = rule("fee", 5, 50, TariffType::SessionFee);
        let at = Utc.with_ymd_and_hms(2025, 6, 2, 12, 0, 0).unwrap();
        let snapshot = build_snapshot(&r, std::slice::from_ref(&r), at);
        assert_eq!(snapshot.session_fee, Decimal::from(50));
        assert_eq!(snapshot.rate_per_kwh, Decimal::ZERO);
        assert_eq!(snapshot.rule_id, Some(r.id));
    }

    #[test]
    fn next_change_is_current_window_end() {
        let mut day = rule("day", 5, 18, TariffType::PerKwh);
        day.time_start = Some(t(6, 0));
        day.time_end = Some(t(22, 0));

        let at = Utc.with_ymd_and_hms(2025, 6, 2, 12, 0, 0).unwrap();
        let next = next_rate_change(&day, std::slice::from_ref(&day), at).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2025, 6, 2, 22, 0, 0).unwrap());
    }

    #[test]
    fn next_change_prefers_earlier_rule_start() {
        let mut day = rule("day", 5, 18, TariffType::PerKwh);
        day.time_start = Some(t(6, 0));
        day.time_end = Some(t(22, 0));
        let mut evening = rule("evening", 7, 25, TariffType::PerKwh);
        evening.time_start = Some(t(18, 0));
        evening.time_end = Some(t(22, 0));

        let rules = vec![day.clone(), evening];
        let at = Utc.with_ymd_and_hms(2025, 6, 2, 12, 0, 0).unwrap();
        let next = next_rate_change(&day, &rules, at).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2025, 6, 2, 18, 0, 0).unwrap());
    }

    #[test]
    fn crossed_midnight_end_lands_tomorrow() {
        let mut night = rule("night", 5, 9, TariffType::PerKwh);
        night.time_start = Some(t(22, 0));
        night.time_end = Some(t(6, 0));

        let at = Utc.with_ymd_and_hms(2025, 6, 2, 23, 0, 0).unwrap();
        let next = next_rate_change(&night, std::slice::from_ref(&night), at).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2025, 6, 3, 6, 0, 0).unwrap());
    }

    #[test]
    fn discount_applies_to_rates_and_description() {
        let mut snapshot = TariffSnapshot::default_tariff();
        snapshot.rate_per_kwh = Decimal::from(20);
        snapshot.rate_per_minute = Decimal::from(2);
        apply_discount(&mut snapshot, Decimal::from(10));

        assert_eq!(snapshot.rate_per_kwh, Decimal::from_str("18.00").unwrap());
        assert_eq!(snapshot.rate_per_minute, Decimal::from_str("1.80").unwrap());
        assert!(snapshot.active_rule.ends_with("(скидка 10%)"));
    }
}
