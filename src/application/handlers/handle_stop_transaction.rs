//! StopTransaction handler
//!
//! Updates the station-side transaction, hands the bound session to the
//! settlement path and frees the connector. The reply is Accepted no
//! matter what: money is settled asynchronously but atomically, and a
//! non-Accepted idTagInfo would only confuse the station.

use rust_ocpp::v1_6::messages::stop_transaction::{
    StopTransactionRequest, StopTransactionResponse,
};
use rust_ocpp::v1_6::types::{AuthorizationStatus, IdTagInfo};
use serde_json::Value;
use tracing::{error, info, warn};

use crate::domain::ConnectorStatus;

use super::OcppHandler;

pub async fn handle(handler: &OcppHandler, payload: &Value) -> Value {
    let req: StopTransactionRequest = match serde_json::from_value(payload.clone()) {
        Ok(r) => r,
        Err(e) => {
            error!(
                station_id = handler.station_id.as_str(),
                error = %e,
                "Failed to parse StopTransaction"
            );
            return accepted_response();
        }
    };

    let reason = req.reason.as_ref().map(|r| format!("{:?}", r));

    info!(
        station_id = handler.station_id.as_str(),
        transaction_id = req.transaction_id,
        meter_stop = req.meter_stop,
        reason = ?reason,
        "StopTransaction"
    );

    let transaction = match handler
        .repos
        .ocpp_transactions()
        .mark_stopped(
            &handler.station_id,
            req.transaction_id,
            req.meter_stop,
            req.timestamp,
            reason.as_deref(),
        )
        .await
    {
        Ok(Some(tx)) => Some(tx),
        Ok(None) => {
            warn!(
                station_id = handler.station_id.as_str(),
                transaction_id = req.transaction_id,
                "StopTransaction for unknown transaction"
            );
            None
        }
        Err(e) => {
            error!(
                station_id = handler.station_id.as_str(),
                transaction_id = req.transaction_id,
                error = %e,
                "Failed to update OCPP transaction"
            );
            None
        }
    };

    if let Some(tx) = transaction {
        if let Err(e) = handler
            .repos
            .stations()
            .update_connector_status(
                &handler.station_id,
                tx.connector_number,
                ConnectorStatus::Available,
                Some("NoError"),
            )
            .await
        {
            error!(
                station_id = handler.station_id.as_str(),
                connector_id = tx.connector_number,
                error = %e,
                "Failed to release connector"
            );
        }

        if let Some(session_id) = tx.charging_session_id {
            // Keep the settlement inside the drain window on shutdown.
            let _token = handler.in_flight.enter();
            match handler.engine.settle_from_station(session_id).await {
                Ok(settlement) => info!(
                    station_id = handler.station_id.as_str(),
                    %session_id,
                    energy_kwh = settlement.actual_energy_kwh,
                    cost = %settlement.actual_cost,
                    "Session settled from StopTransaction"
                ),
                Err(e) => error!(
                    station_id = handler.station_id.as_str(),
                    %session_id,
                    error = %e,
                    "Settlement from StopTransaction failed"
                ),
            }
        }
    }

    accepted_response()
}

fn accepted_response() -> Value {
    let response = StopTransactionResponse {
        id_tag_info: Some(IdTagInfo {
            status: AuthorizationStatus::Accepted,
            expiry_date: None,
            parent_id_tag: None,
        }),
    };
    serde_json::to_value(&response).unwrap_or_default()
}
