//! StartTransaction handler
//!
//! Binds the station's transaction to a mobile charging session. Lookup
//! order, first hit wins:
//!
//! 1. the pending-session index (`pending:<station>:<connector>`)
//! 2. a client whose phone matches the idTag, with a bindable session
//!    on this station
//! 3. the local authorisation table's client, same session lookup
//!
//! When nothing matches the transaction is accepted anyway — the car is
//! physically charging and refusing would only desynchronise us — and
//! recorded unbound for the operator to inspect.

use chrono::Utc;
use rust_ocpp::v1_6::messages::start_transaction::{
    StartTransactionRequest, StartTransactionResponse,
};
use rust_ocpp::v1_6::types::{AuthorizationStatus, IdTagInfo};
use serde_json::Value;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::domain::{ChargingSession, ConnectorStatus, OcppTransaction, OcppTransactionStatus};
use crate::support::phone::normalize_phone;

use super::OcppHandler;

pub async fn handle(handler: &OcppHandler, payload: &Value) -> Value {
    let req: StartTransactionRequest = match serde_json::from_value(payload.clone()) {
        Ok(r) => r,
        Err(e) => {
            error!(
                station_id = handler.station_id.as_str(),
                error = %e,
                "Failed to parse StartTransaction"
            );
            return response(0, AuthorizationStatus::Invalid);
        }
    };

    info!(
        station_id = handler.station_id.as_str(),
        connector_id = req.connector_id,
        id_tag = req.id_tag.as_str(),
        meter_start = req.meter_start,
        "StartTransaction"
    );

    let transaction_id = Utc::now().timestamp() as i32;

    // Same Unix second → same id; a replay must not double-bind.
    match handler
        .repos
        .ocpp_transactions()
        .find(&handler.station_id, transaction_id)
        .await
    {
        Ok(Some(existing)) => {
            warn!(
                station_id = handler.station_id.as_str(),
                transaction_id,
                "Duplicate StartTransaction, returning existing transaction"
            );
            return response(existing.transaction_id, AuthorizationStatus::Accepted);
        }
        Ok(None) => {}
        Err(e) => {
            error!(
                station_id = handler.station_id.as_str(),
                error = %e,
                "Duplicate check failed"
            );
        }
    }

    let session = bind_session(handler, req.connector_id, &req.id_tag).await;
    let session_id = session.as_ref().map(|s| s.id);

    if session.is_none() {
        warn!(
            station_id = handler.station_id.as_str(),
            connector_id = req.connector_id,
            id_tag = req.id_tag.as_str(),
            "No session bound to StartTransaction; accepting unbound"
        );
    }

    let transaction = OcppTransaction {
        id: 0,
        station_id: handler.station_id.clone(),
        transaction_id,
        connector_number: req.connector_id,
        id_tag: req.id_tag.clone(),
        meter_start: req.meter_start,
        meter_stop: None,
        started_at: req.timestamp,
        stopped_at: None,
        stop_reason: None,
        status: OcppTransactionStatus::Started,
        charging_session_id: session_id,
    };

    if let Err(e) = handler.repos.ocpp_transactions().insert(transaction).await {
        error!(
            station_id = handler.station_id.as_str(),
            transaction_id,
            error = %e,
            "Failed to persist OCPP transaction"
        );
        // Accept anyway; the station is already delivering energy.
    }

    if let Some(session) = &session {
        if let Err(e) = handler
            .repos
            .sessions()
            .bind_transaction(session.id, transaction_id)
            .await
        {
            error!(
                session_id = %session.id,
                transaction_id,
                error = %e,
                "Failed to bind session to transaction"
            );
        } else {
            info!(
                session_id = %session.id,
                transaction_id,
                "Session bound and started"
            );
        }
    }

    if let Err(e) = handler
        .repos
        .stations()
        .update_connector_status(
            &handler.station_id,
            req.connector_id,
            ConnectorStatus::Occupied,
            None,
        )
        .await
    {
        error!(
            station_id = handler.station_id.as_str(),
            connector_id = req.connector_id,
            error = %e,
            "Failed to mark connector occupied"
        );
    }

    response(transaction_id, AuthorizationStatus::Accepted)
}

async fn bind_session(
    handler: &OcppHandler,
    connector_id: u32,
    id_tag: &str,
) -> Option<ChargingSession> {
    // 1. Pending-session index
    if let Some(raw_id) = handler
        .bus
        .pop_pending_session(&handler.station_id, connector_id)
    {
        match Uuid::parse_str(&raw_id) {
            Ok(session_id) => match handler.repos.sessions().find_by_id(session_id).await {
                Ok(Some(session)) if !session.is_terminal() => {
                    info!(
                        station_id = handler.station_id.as_str(),
                        session_id = %session.id,
                        "Session bound via pending index"
                    );
                    return Some(session);
                }
                Ok(_) => warn!(
                    station_id = handler.station_id.as_str(),
                    raw_id = raw_id.as_str(),
                    "Pending index pointed at a missing or finished session"
                ),
                Err(e) => error!(
                    station_id = handler.station_id.as_str(),
                    error = %e,
                    "Pending-index session lookup failed"
                ),
            },
            Err(_) => warn!(
                station_id = handler.station_id.as_str(),
                raw_id = raw_id.as_str(),
                "Pending index held a non-UUID value"
            ),
        }
    }

    // 2. Phone match
    let digits = normalize_phone(id_tag);
    if !digits.is_empty() {
        if let Ok(Some(client)) = handler.repos.clients().find_by_phone_digits(&digits).await {
            if let Ok(Some(session)) = handler
                .repos
                .sessions()
                .find_bindable_for_client_on_station(client.id, &handler.station_id)
                .await
            {
                info!(
                    station_id = handler.station_id.as_str(),
                    session_id = %session.id,
                    "Session bound via phone match"
                );
                return Some(session);
            }
        }
    }

    // 3. Authorisation fallback
    if let Ok(Some(auth)) = handler
        .repos
        .ocpp_transactions()
        .find_authorization(id_tag)
        .await
    {
        if let Some(client_id) = auth.client_id {
            if let Ok(Some(session)) = handler
                .repos
                .sessions()
                .find_bindable_for_client_on_station(client_id, &handler.station_id)
                .await
            {
                info!(
                    station_id = handler.station_id.as_str(),
                    session_id = %session.id,
                    "Session bound via authorisation fallback"
                );
                return Some(session);
            }
        }
    }

    None
}

fn response(transaction_id: i32, status: AuthorizationStatus) -> Value {
    let response = StartTransactionResponse {
        transaction_id,
        id_tag_info: IdTagInfo {
            status,
            expiry_date: None,
            parent_id_tag: None,
        },
    };
    serde_json::to_value(&response).unwrap_or_default()
}
