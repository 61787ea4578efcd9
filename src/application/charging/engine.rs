//! Charging-session engine
//!
//! Owns every wallet-affecting state transition of a session: the
//! reservation debit at start, limit enforcement while charging, and
//! settlement (refund or overdraft) at stop. Balance mutations and
//! session-row updates always share one database transaction; the repo
//! layer serialises them per client with a row lock.

use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::application::bus::{topics, SharedMessageBus, SUBSCRIPTION_TIMEOUT};
use crate::application::commands::StationCommand;
use crate::application::pricing::PricingResolver;
use crate::domain::money::round_money;
use crate::domain::{
    ChargingLimit, ChargingSession, DomainError, DomainResult, LimitKind, NewChargingSession,
    OcppTransaction, RepositoryProvider, SessionSettlement, SessionStatus, TariffSnapshot,
};
use crate::support::phone::normalize_phone;

use super::reservation::calculate_reservation;

/// Stop thresholds, as fractions of the limit / reservation.
const ENERGY_STOP_FACTOR: f64 = 0.95;
const AMOUNT_STOP_FACTOR: &str = "0.95";
/// Unlimited sessions stop earlier: MeterValues arrive every 30-60 s and
/// the meter itself is imprecise, so 0.90 leaves margin before the
/// reservation is breached. Do not tighten without re-sizing the meter
/// cadence.
const NO_LIMIT_STOP_FACTOR: &str = "0.90";
const WARN_FACTOR: &str = "0.80";

pub struct ChargingEngine {
    repos: Arc<dyn RepositoryProvider>,
    pricing: Arc<PricingResolver>,
    bus: SharedMessageBus,
}

#[derive(Debug, Clone, Serialize)]
pub struct StartOutcome {
    pub session_id: Uuid,
    pub station_id: String,
    pub connector_id: u32,
    pub reserved_amount: Decimal,
    pub new_balance: Decimal,
    pub station_online: bool,
    pub pricing: TariffSnapshot,
}

#[derive(Debug, Clone, Serialize)]
pub struct StopOutcome {
    pub session_id: Uuid,
    pub station_id: String,
    pub energy_consumed: f64,
    pub reserved_amount: Decimal,
    pub actual_cost: Decimal,
    pub refund_amount: Decimal,
    pub additional_charge: Decimal,
    pub new_balance: Decimal,
    pub station_online: bool,
}

/// Live view for `GET /charging/status/{id}`.
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatusView {
    pub session_id: Uuid,
    pub status: &'static str,
    pub station_id: String,
    pub connector_id: u32,
    pub limit_type: &'static str,
    pub limit_value: Decimal,
    pub reserved_amount: Decimal,
    pub energy_kwh: f64,
    pub current_cost: Decimal,
    pub progress_percent: Option<f64>,
    pub meter_start: Option<i32>,
    pub ocpp_transaction_id: Option<i32>,
    pub start_time: chrono::DateTime<Utc>,
    pub stop_time: Option<chrono::DateTime<Utc>>,
    pub final_amount: Option<Decimal>,
    pub station_online: bool,
}

/// What a fresh meter sample means for the session.
#[derive(Debug, Clone, PartialEq)]
pub enum LimitDecision {
    Continue,
    /// 80% of the budget burnt; log, keep charging.
    Warn { spent: Decimal, budget: Decimal },
    /// Threshold hit; a RemoteStop must go out exactly once.
    Stop { reason: &'static str },
}

impl ChargingEngine {
    pub fn new(
        repos: Arc<dyn RepositoryProvider>,
        pricing: Arc<PricingResolver>,
        bus: SharedMessageBus,
    ) -> Self {
        Self { repos, pricing, bus }
    }

    // ── StartCharging ──────────────────────────────────────

    pub async fn start_charging(
        &self,
        client_id: Uuid,
        station_id: &str,
        connector_number: u32,
        limit: ChargingLimit,
    ) -> DomainResult<StartOutcome> {
        // 1. Client exists and is allowed to charge
        let client = self
            .repos
            .clients()
            .find_by_id(client_id)
            .await?
            .ok_or(DomainError::ClientNotFound(client_id))?;

        match client.status {
            crate::domain::ClientStatus::Active => {}
            crate::domain::ClientStatus::PendingDeletion => {
                return Err(DomainError::AccountDeletionPending)
            }
            crate::domain::ClientStatus::Blocked => return Err(DomainError::AccountBlocked),
            crate::domain::ClientStatus::Inactive => {
                return Err(DomainError::Unauthorized("Client is inactive".to_string()))
            }
        }

        // 2. Station exists, administratively active, currently available
        let station = self
            .repos
            .stations()
            .find_by_id(station_id)
            .await?
            .filter(|s| s.is_active())
            .ok_or_else(|| DomainError::StationNotFound(station_id.to_string()))?;

        if !station.is_available {
            return Err(match station.last_heartbeat_at {
                Some(last) => DomainError::StationOffline {
                    station_id: station_id.to_string(),
                    minutes_ago: (Utc::now() - last).num_minutes(),
                },
                None => DomainError::StationNeverConnected(station_id.to_string()),
            });
        }

        // 3. Connector exists and is free
        let connector = self
            .repos
            .stations()
            .find_connector(station_id, connector_number)
            .await?
            .ok_or(DomainError::ConnectorNotFound(connector_number))?;

        if connector.status != crate::domain::ConnectorStatus::Available {
            return Err(DomainError::ConnectorOccupied(connector_number));
        }

        // 4. One non-terminal session per client
        if self
            .repos
            .sessions()
            .find_active_for_client(client_id)
            .await?
            .is_some()
        {
            return Err(DomainError::SessionAlreadyActive);
        }

        // 5. Tariff snapshot
        let snapshot = self
            .pricing
            .resolve(
                station_id,
                Some(connector.connector_type.as_str()),
                connector.power_kw,
                Utc::now(),
                Some(client_id),
            )
            .await?;

        // 6. Reservation policy
        let reservation = calculate_reservation(client.balance, &snapshot, &limit)?;

        // 7. One transaction: debit + snapshot + session + audit + connector
        let (session, new_balance) = self
            .repos
            .sessions()
            .create_with_reservation(NewChargingSession {
                client_id,
                station_id: station_id.to_string(),
                connector_number,
                limit_kind: reservation.limit_kind,
                limit_value: reservation.limit_value,
                reserved_amount: reservation.amount,
                base_amount: reservation.base_amount,
                snapshot: snapshot.clone(),
            })
            .await?;

        metrics::counter!("charging_sessions_total", "status" => "created").increment(1);

        // 8. Local authorisation entry: idTag is the client's phone
        let id_tag = id_tag_for(&client.phone, client_id);
        self.repos
            .ocpp_transactions()
            .upsert_authorization(&id_tag, Some(client_id))
            .await?;

        // 9. Pending index so StartTransaction can bind without guessing
        self.bus
            .set_pending_session(station_id, connector_number, &session.id.to_string());

        // 10. RemoteStart — skipped when the station is offline; the
        // session stays pending and the station drives it on reconnect.
        let station_online = self.bus.is_station_online(station_id);
        if station_online {
            self.bus
                .wait_for_subscription(station_id, SUBSCRIPTION_TIMEOUT)
                .await;
            let (limit_kind, limit_value) = limit.persisted();
            self.bus.publish(
                &topics::cmd(station_id),
                serde_json::to_value(StationCommand::RemoteStartTransaction {
                    connector_id: connector_number,
                    id_tag,
                    session_id: Some(session.id),
                    limit_type: Some(limit_kind.as_str().to_string()),
                    limit_value: limit_value.to_f64(),
                })
                .unwrap_or_default(),
            );
            info!(station_id, session_id = %session.id, "RemoteStartTransaction published");
        } else {
            info!(
                station_id,
                session_id = %session.id,
                "Station offline, session stays pending until it connects"
            );
        }

        self.bus.publish(
            &topics::client_sessions(client_id),
            serde_json::json!({
                "type": "session_created",
                "session_id": session.id,
                "station_id": station_id,
                "station_online": station_online,
            }),
        );

        Ok(StartOutcome {
            session_id: session.id,
            station_id: station_id.to_string(),
            connector_id: connector_number,
            reserved_amount: reservation.amount,
            new_balance,
            station_online,
            pricing: snapshot,
        })
    }

    // ── StopCharging ───────────────────────────────────────

    /// Mobile / sweeper stop. `requester` enforces ownership when set.
    pub async fn stop_charging(
        &self,
        session_id: Uuid,
        requester: Option<Uuid>,
    ) -> DomainResult<StopOutcome> {
        let session = self
            .repos
            .sessions()
            .find_by_id(session_id)
            .await?
            .ok_or(DomainError::SessionNotFound(session_id))?;

        if let Some(client_id) = requester {
            if session.client_id != client_id {
                return Err(DomainError::SessionNotFound(session_id));
            }
        }

        if !matches!(
            session.status,
            SessionStatus::Started | SessionStatus::Stopping
        ) {
            return Err(DomainError::Validation(
                "Session is not active".to_string(),
            ));
        }

        let settlement = self.settle_session(&session).await?;

        // RemoteStop only when the station can hear us and a transaction
        // is bound; settlement stands either way.
        let station_online = self.bus.is_station_online(&session.station_id);
        if station_online {
            if let Ok(Some(tx)) = self
                .repos
                .ocpp_transactions()
                .find_for_session(session.id)
                .await
            {
                self.bus.publish(
                    &topics::cmd(&session.station_id),
                    serde_json::to_value(StationCommand::RemoteStopTransaction {
                        transaction_id: tx.transaction_id,
                        reason: None,
                    })
                    .unwrap_or_default(),
                );
            }
        }

        Ok(StopOutcome {
            session_id,
            station_id: session.station_id.clone(),
            energy_consumed: settlement.actual_energy_kwh,
            reserved_amount: session.reserved_amount,
            actual_cost: settlement.actual_cost,
            refund_amount: settlement.refund,
            additional_charge: settlement.additional_charge,
            new_balance: settlement.new_balance,
            station_online,
        })
    }

    /// Settlement driven by the station's StopTransaction. The reply to
    /// the station is Accepted regardless; failures are logged.
    pub async fn settle_from_station(&self, session_id: Uuid) -> DomainResult<SessionSettlement> {
        let session = self
            .repos
            .sessions()
            .find_by_id(session_id)
            .await?
            .ok_or(DomainError::SessionNotFound(session_id))?;

        if session.is_terminal() {
            // StopTransaction replay after we already settled.
            return Err(DomainError::Conflict("Session already settled".to_string()));
        }

        self.settle_session(&session).await
    }

    /// Compute actual energy and cost, then run the settlement
    /// transaction. Shared by the mobile stop, the station stop and the
    /// hanging-session sweep.
    async fn settle_session(&self, session: &ChargingSession) -> DomainResult<SessionSettlement> {
        let transaction = self
            .repos
            .ocpp_transactions()
            .find_for_session(session.id)
            .await?;

        let actual_energy = self.actual_energy(session, transaction.as_ref()).await?;
        let snapshot = self.snapshot_for(session).await;
        let duration_minutes = session.duration_minutes(Utc::now());
        let actual_cost = actual_cost(&snapshot, actual_energy, duration_minutes);

        let settlement = self
            .repos
            .sessions()
            .settle(session.id, actual_energy, actual_cost)
            .await?;

        if settlement.overdraft_uncovered {
            warn!(
                session_id = %session.id,
                actual_cost = %settlement.actual_cost,
                reserved = %session.reserved_amount,
                "Balance could not cover the full overdraft; session closed anyway"
            );
        }

        metrics::counter!("charging_sessions_total", "status" => "stopped").increment(1);

        self.bus.publish(
            &topics::client_sessions(session.client_id),
            serde_json::json!({
                "type": "session_stopped",
                "session_id": session.id,
                "energy_kwh": settlement.actual_energy_kwh,
                "amount": settlement.actual_cost,
            }),
        );
        self.bus.publish(
            &topics::station_sessions(&session.station_id),
            serde_json::json!({
                "type": "session_stopped",
                "session_id": session.id,
            }),
        );

        info!(
            session_id = %session.id,
            energy_kwh = settlement.actual_energy_kwh,
            cost = %settlement.actual_cost,
            refund = %settlement.refund,
            additional = %settlement.additional_charge,
            "Session settled"
        );

        Ok(settlement)
    }

    /// Preference chain for the billed energy figure.
    async fn actual_energy(
        &self,
        session: &ChargingSession,
        transaction: Option<&OcppTransaction>,
    ) -> DomainResult<f64> {
        if let Some(energy) = session.energy_kwh {
            if energy > 0.0 {
                return Ok(energy);
            }
        }

        if let Some(tx) = transaction {
            if let Some(energy) = tx.energy_kwh() {
                return Ok(energy);
            }
            // Meter stop missing: fall back to the last MeterValues sample
            if let Some(register) = self
                .repos
                .ocpp_transactions()
                .last_energy_register(&tx.station_id, tx.transaction_id)
                .await?
            {
                let delta_kwh = (register - f64::from(tx.meter_start)) / 1000.0;
                return Ok(delta_kwh.max(0.0));
            }
        }

        Ok(0.0)
    }

    /// The session's persisted snapshot; falls back to the base tariff.
    async fn snapshot_for(&self, session: &ChargingSession) -> TariffSnapshot {
        match self.repos.tariffs().find_snapshot_for_session(session.id).await {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => TariffSnapshot::default_tariff(),
            Err(e) => {
                error!(session_id = %session.id, error = %e, "Snapshot lookup failed, using base tariff");
                TariffSnapshot::default_tariff()
            }
        }
    }

    // ── Limit enforcement (MeterValues path) ───────────────

    /// Called for every Energy.Active.Import.Register sample.
    pub async fn on_energy_sample(
        &self,
        session: &ChargingSession,
        transaction_id: i32,
        energy_delivered_kwh: f64,
    ) -> DomainResult<()> {
        self.repos
            .sessions()
            .update_energy(session.id, energy_delivered_kwh)
            .await?;

        let snapshot = self.snapshot_for(session).await;
        let decision = evaluate_limit(
            session.limit_kind,
            session.limit_value,
            session.reserved_amount,
            snapshot.rate_per_kwh,
            energy_delivered_kwh,
        );

        match decision {
            LimitDecision::Continue => {}
            LimitDecision::Warn { spent, budget } => {
                warn!(
                    session_id = %session.id,
                    %spent,
                    %budget,
                    "Session approaching its limit (80%)"
                );
            }
            LimitDecision::Stop { reason } => {
                // Compare-and-set so one threshold fires one RemoteStop,
                // not one per meter sample.
                let transitioned = self
                    .repos
                    .sessions()
                    .transition_status(session.id, SessionStatus::Started, SessionStatus::Stopping)
                    .await?;
                if transitioned {
                    warn!(
                        session_id = %session.id,
                        energy_delivered_kwh,
                        reason,
                        "Charging limit reached, sending RemoteStop"
                    );
                    self.bus.publish(
                        &topics::cmd(&session.station_id),
                        serde_json::to_value(StationCommand::RemoteStopTransaction {
                            transaction_id,
                            reason: Some(reason.to_string()),
                        })
                        .unwrap_or_default(),
                    );
                }
            }
        }

        Ok(())
    }

    // ── Reconciliation (BootNotification) ──────────────────

    /// The station forgets state on reboot: every pending/started session
    /// without a bound transaction is forever unbindable — fail it and
    /// refund the full reservation. Sessions that did bind are settled
    /// with the energy on record.
    pub async fn reconcile_station(&self, station_id: &str) -> DomainResult<(usize, usize)> {
        let unbound = self
            .repos
            .sessions()
            .find_unbound_on_station(station_id)
            .await?;
        let mut failed = 0;
        for session in &unbound {
            match self
                .repos
                .sessions()
                .fail_with_refund(session.id, "station reboot")
                .await
            {
                Ok(()) => {
                    failed += 1;
                    metrics::counter!("charging_sessions_total", "status" => "error").increment(1);
                    self.bus.publish(
                        &topics::client_sessions(session.client_id),
                        serde_json::json!({
                            "type": "session_failed",
                            "session_id": session.id,
                            "reason": "station_reboot",
                            "refund": session.reserved_amount,
                        }),
                    );
                }
                Err(e) => {
                    error!(session_id = %session.id, error = %e, "Reconciliation refund failed");
                }
            }
        }

        let bound = self
            .repos
            .sessions()
            .find_bound_active_on_station(station_id)
            .await?;
        let mut settled = 0;
        for session in bound {
            match self.settle_session(&session).await {
                Ok(_) => settled += 1,
                Err(e) => {
                    error!(session_id = %session.id, error = %e, "Reconciliation settlement failed")
                }
            }
        }

        if failed > 0 || settled > 0 {
            self.repos
                .stations()
                .release_occupied_connectors(station_id)
                .await?;
            warn!(
                station_id,
                failed, settled, "Reconciled sessions after station boot"
            );
        }

        Ok((failed, settled))
    }

    // ── Hanging-session sweep ──────────────────────────────

    /// Stop sessions `started` more than `max_hours` ago. Settlement uses
    /// whatever energy is on record; RemoteStop goes out best-effort.
    pub async fn sweep_hanging_sessions(&self, max_hours: i64) -> DomainResult<usize> {
        let cutoff = Utc::now() - ChronoDuration::hours(max_hours);
        let hanging = self.repos.sessions().find_hanging(cutoff).await?;

        let mut swept = 0;
        for session in hanging {
            warn!(
                session_id = %session.id,
                station_id = session.station_id.as_str(),
                started = %session.start_time,
                "⚠️ hanging session, forcing stop"
            );
            match self.stop_charging(session.id, None).await {
                Ok(_) => swept += 1,
                Err(e) => {
                    error!(session_id = %session.id, error = %e, "Hanging-session stop failed")
                }
            }
        }

        Ok(swept)
    }

    // ── Status view ────────────────────────────────────────

    pub async fn charging_status(
        &self,
        session_id: Uuid,
        requester: Option<Uuid>,
    ) -> DomainResult<SessionStatusView> {
        let session = self
            .repos
            .sessions()
            .find_by_id(session_id)
            .await?
            .ok_or(DomainError::SessionNotFound(session_id))?;

        if let Some(client_id) = requester {
            if session.client_id != client_id {
                return Err(DomainError::SessionNotFound(session_id));
            }
        }

        let transaction = self
            .repos
            .ocpp_transactions()
            .find_for_session(session_id)
            .await?;

        let energy = session.energy_kwh.unwrap_or(0.0);
        let snapshot = self.snapshot_for(&session).await;
        let current_cost = actual_cost(&snapshot, energy, session.duration_minutes(Utc::now()));

        let progress_percent = match session.limit_kind {
            LimitKind::Energy if session.limit_value > Decimal::ZERO => {
                let limit = session.limit_value.to_f64().unwrap_or(0.0);
                (limit > 0.0).then(|| ((energy / limit) * 100.0).min(100.0))
            }
            LimitKind::Amount if session.limit_value > Decimal::ZERO => {
                let ratio = (current_cost / session.limit_value).to_f64().unwrap_or(0.0);
                Some((ratio * 100.0).min(100.0))
            }
            _ => None,
        };

        Ok(SessionStatusView {
            session_id,
            status: session.status.as_str(),
            station_id: session.station_id.clone(),
            connector_id: session.connector_number,
            limit_type: session.limit_kind.as_str(),
            limit_value: session.limit_value,
            reserved_amount: session.reserved_amount,
            energy_kwh: energy,
            current_cost,
            progress_percent,
            meter_start: transaction.as_ref().map(|t| t.meter_start),
            ocpp_transaction_id: session.ocpp_transaction_id,
            start_time: session.start_time,
            stop_time: session.stop_time,
            final_amount: session.final_amount,
            station_online: self.bus.is_station_online(&session.station_id),
        })
    }
}

/// Actual cost of a session: energy at the snapshot rate, plus the
/// session fee, plus the per-minute component when the tariff has one.
pub fn actual_cost(snapshot: &TariffSnapshot, energy_kwh: f64, duration_minutes: i64) -> Decimal {
    snapshot.actual_cost(energy_kwh, duration_minutes)
}

/// Threshold logic for one energy sample.
pub fn evaluate_limit(
    limit_kind: LimitKind,
    limit_value: Decimal,
    reserved_amount: Decimal,
    rate_per_kwh: Decimal,
    energy_delivered_kwh: f64,
) -> LimitDecision {
    use std::str::FromStr;

    let amount_stop = Decimal::from_str(AMOUNT_STOP_FACTOR).unwrap_or_default();
    let no_limit_stop = Decimal::from_str(NO_LIMIT_STOP_FACTOR).unwrap_or_default();
    let warn = Decimal::from_str(WARN_FACTOR).unwrap_or_default();

    match limit_kind {
        LimitKind::Energy => {
            let limit = limit_value.to_f64().unwrap_or(0.0);
            if limit > 0.0 && energy_delivered_kwh >= limit * ENERGY_STOP_FACTOR {
                LimitDecision::Stop {
                    reason: "EnergyLimitReached",
                }
            } else {
                LimitDecision::Continue
            }
        }
        LimitKind::Amount => {
            if limit_value <= Decimal::ZERO {
                return LimitDecision::Continue;
            }
            let cost = crate::domain::money::decimal_from_kwh(energy_delivered_kwh) * rate_per_kwh;
            if cost >= limit_value * amount_stop {
                LimitDecision::Stop {
                    reason: "AmountLimitReached",
                }
            } else if cost >= limit_value * warn {
                LimitDecision::Warn {
                    spent: round_money(cost),
                    budget: limit_value,
                }
            } else {
                LimitDecision::Continue
            }
        }
        LimitKind::None => {
            if reserved_amount <= Decimal::ZERO {
                return LimitDecision::Continue;
            }
            let cost = crate::domain::money::decimal_from_kwh(energy_delivered_kwh) * rate_per_kwh;
            if cost >= reserved_amount * no_limit_stop {
                LimitDecision::Stop {
                    reason: "AmountLimitReached",
                }
            } else if cost >= reserved_amount * warn {
                LimitDecision::Warn {
                    spent: round_money(cost),
                    budget: reserved_amount,
                }
            } else {
                LimitDecision::Continue
            }
        }
    }
}

fn id_tag_for(phone: &str, client_id: Uuid) -> String {
    let digits = normalize_phone(phone);
    if digits.is_empty() {
        format!("CLIENT{}", client_id.simple())
    } else {
        digits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn energy_limit_stops_at_95_percent() {
        // 10 kWh limit → threshold at 9.5
        let decision = evaluate_limit(LimitKind::Energy, d("10"), d("135"), d("13.5"), 9.4);
        assert_eq!(decision, LimitDecision::Continue);

        let decision = evaluate_limit(LimitKind::Energy, d("10"), d("135"), d("13.5"), 9.5);
        assert_eq!(
            decision,
            LimitDecision::Stop {
                reason: "EnergyLimitReached"
            }
        );
    }

    #[test]
    fn amount_limit_stops_at_95_percent_of_budget() {
        // 200 KGS limit at 10 KGS/kWh: stop at 19 kWh (190 KGS)
        let decision = evaluate_limit(LimitKind::Amount, d("200"), d("200"), d("10"), 18.0);
        assert!(matches!(decision, LimitDecision::Warn { .. }));

        let decision = evaluate_limit(LimitKind::Amount, d("200"), d("200"), d("10"), 19.0);
        assert_eq!(
            decision,
            LimitDecision::Stop {
                reason: "AmountLimitReached"
            }
        );
    }

    #[test]
    fn amount_limit_warns_at_80_percent() {
        let decision = evaluate_limit(LimitKind::Amount, d("200"), d("200"), d("10"), 16.0);
        match decision {
            LimitDecision::Warn { spent, budget } => {
                assert_eq!(spent, d("160.00"));
                assert_eq!(budget, d("200"));
            }
            other => panic!("Unexpected: {other:?}"),
        }
    }

    #[test]
    fn unlimited_stops_at_90_percent_of_reservation() {
        // 200 KGS reserved at 13.5 KGS/kWh: stop at 180 / 13.5 = 13.33 kWh
        let decision = evaluate_limit(LimitKind::None, Decimal::ZERO, d("200"), d("13.5"), 13.0);
        assert!(matches!(decision, LimitDecision::Warn { .. }));

        let decision = evaluate_limit(LimitKind::None, Decimal::ZERO, d("200"), d("13.5"), 13.34);
        assert_eq!(
            decision,
            LimitDecision::Stop {
                reason: "AmountLimitReached"
            }
        );
    }

    #[test]
    fn below_all_thresholds_continues() {
        let decision = evaluate_limit(LimitKind::None, Decimal::ZERO, d("200"), d("13.5"), 1.0);
        assert_eq!(decision, LimitDecision::Continue);
    }

    #[test]
    fn actual_cost_matches_seed_scenario() {
        // 10.5 kWh at 13.5 → 141.75
        let mut snapshot = TariffSnapshot::default_tariff();
        snapshot.rate_per_kwh = d("13.5");
        assert_eq!(actual_cost(&snapshot, 10.5, 47), d("141.75"));
    }

    #[test]
    fn id_tag_prefers_phone_digits() {
        let id = Uuid::new_v4();
        assert_eq!(id_tag_for("+996 555 123-456", id), "996555123456");
        assert!(id_tag_for("", id).starts_with("CLIENT"));
    }
}
