//! DataTransfer handler

use rust_ocpp::v1_6::messages::data_transfer::{DataTransferRequest, DataTransferResponse};
use rust_ocpp::v1_6::types::DataTransferStatus;
use serde_json::Value;
use tracing::{error, info};

use super::OcppHandler;

pub async fn handle(handler: &OcppHandler, payload: &Value) -> Value {
    let req: DataTransferRequest = match serde_json::from_value(payload.clone()) {
        Ok(r) => r,
        Err(e) => {
            error!(
                station_id = handler.station_id.as_str(),
                error = %e,
                "Failed to parse DataTransfer"
            );
            return accepted_response();
        }
    };

    info!(
        station_id = handler.station_id.as_str(),
        vendor_id = req.vendor_string.as_str(),
        message_id = ?req.message_id,
        "DataTransfer"
    );

    accepted_response()
}

fn accepted_response() -> Value {
    let response = DataTransferResponse {
        status: DataTransferStatus::Accepted,
        data: Some(String::new()),
    };
    serde_json::to_value(&response).unwrap_or_default()
}
