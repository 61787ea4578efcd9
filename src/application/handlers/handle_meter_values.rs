//! MeterValues handler
//!
//! Appends the raw sample set, extracts the
//! Energy.Active.Import.Register reading and drives the session's limit
//! checks with the delivered-energy figure.

use rust_ocpp::v1_6::messages::meter_values::{MeterValuesRequest, MeterValuesResponse};
use rust_ocpp::v1_6::types::{Measurand, UnitOfMeasure};
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::domain::{MeterValueRow, OcppTransaction};

use super::OcppHandler;

pub async fn handle(handler: &OcppHandler, payload: &Value) -> Value {
    let req: MeterValuesRequest = match serde_json::from_value(payload.clone()) {
        Ok(r) => r,
        Err(e) => {
            error!(
                station_id = handler.station_id.as_str(),
                error = %e,
                "Failed to parse MeterValues"
            );
            return empty_response();
        }
    };

    debug!(
        station_id = handler.station_id.as_str(),
        connector_id = req.connector_id,
        transaction_id = ?req.transaction_id,
        samples = req.meter_value.len(),
        "MeterValues"
    );

    let timestamp = req
        .meter_value
        .first()
        .map(|mv| mv.timestamp)
        .unwrap_or_else(chrono::Utc::now);

    let row = MeterValueRow {
        station_id: handler.station_id.clone(),
        transaction_id: req.transaction_id,
        connector_number: req.connector_id,
        timestamp,
        sampled_values: serde_json::to_value(&req.meter_value).unwrap_or_default(),
    };
    if let Err(e) = handler.repos.ocpp_transactions().append_meter_values(row).await {
        error!(
            station_id = handler.station_id.as_str(),
            error = %e,
            "Failed to append meter values"
        );
    }

    let Some(energy_wh) = extract_energy_wh(&req) else {
        return empty_response();
    };

    let Some(transaction) = find_transaction(handler, &req).await else {
        warn!(
            station_id = handler.station_id.as_str(),
            connector_id = req.connector_id,
            "MeterValues without an active transaction"
        );
        return empty_response();
    };

    let energy_delivered_kwh =
        ((energy_wh - f64::from(transaction.meter_start)) / 1000.0).max(0.0);

    if let Some(session_id) = transaction.charging_session_id {
        match handler.repos.sessions().find_by_id(session_id).await {
            Ok(Some(session)) if !session.is_terminal() => {
                if let Err(e) = handler
                    .engine
                    .on_energy_sample(&session, transaction.transaction_id, energy_delivered_kwh)
                    .await
                {
                    error!(
                        station_id = handler.station_id.as_str(),
                        %session_id,
                        error = %e,
                        "Limit check failed"
                    );
                }
            }
            Ok(_) => {}
            Err(e) => error!(
                station_id = handler.station_id.as_str(),
                %session_id,
                error = %e,
                "Session lookup failed"
            ),
        }
    }

    empty_response()
}

/// The last Energy.Active.Import.Register sample, in Wh. A missing
/// measurand defaults to the energy register per OCPP 1.6.
fn extract_energy_wh(req: &MeterValuesRequest) -> Option<f64> {
    let mut energy_wh = None;

    for meter_value in &req.meter_value {
        for sampled in &meter_value.sampled_value {
            let Ok(value) = sampled.value.parse::<f64>() else {
                continue;
            };

            let measurand = sampled
                .measurand
                .clone()
                .unwrap_or(Measurand::EnergyActiveImportRegister);

            if measurand == Measurand::EnergyActiveImportRegister {
                let wh = match sampled.unit {
                    Some(UnitOfMeasure::KWh) => value * 1000.0,
                    _ => value,
                };
                energy_wh = Some(wh);
            }
        }
    }

    energy_wh
}

/// Locate the transaction this sample belongs to: by transactionId when
/// present, else through the connector's active session (some chargers
/// omit the id).
async fn find_transaction(
    handler: &OcppHandler,
    req: &MeterValuesRequest,
) -> Option<OcppTransaction> {
    if let Some(transaction_id) = req.transaction_id {
        if let Ok(found) = handler
            .repos
            .ocpp_transactions()
            .find(&handler.station_id, transaction_id)
            .await
        {
            return found;
        }
    }

    let session = handler
        .repos
        .sessions()
        .find_active_for_connector(&handler.station_id, req.connector_id)
        .await
        .ok()??;

    handler
        .repos
        .ocpp_transactions()
        .find_for_session(session.id)
        .await
        .ok()?
}

fn empty_response() -> Value {
    serde_json::to_value(MeterValuesResponse {}).unwrap_or_default()
}
