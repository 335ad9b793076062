//! JSON request and response bodies exchanged with CCIP-Read clients.

use crate::error::RequestError;

use alloy_primitives::{
    Address,
    hex,
};
use serde::{
    Deserialize,
    Serialize,
};

/// Body of a gateway POST request.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CcipRequestBody {
    pub data: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,
}

/// Body of a successful gateway response.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CcipResponseBody {
    pub data: String,
}

/// Body of a failed gateway response.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CcipErrorBody {
    pub message: String,
}

/// A decoded request envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub calldata: Vec<u8>,
    pub sender: Option<Address>,
}

impl Envelope {
    /// Parses the JSON body and the hex call data it carries.
    ///
    /// An empty `sender` string is treated as absent.
    pub fn decode(body: &[u8]) -> Result<Self, RequestError> {
        let raw: CcipRequestBody = serde_json::from_slice(body)
            .map_err(|e| RequestError::MalformedEnvelope(e.to_string()))?;

        let sender = match raw.sender.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(sender) => {
                Some(sender.parse::<Address>().map_err(|e| {
                    RequestError::MalformedEnvelope(format!("invalid sender address: {e}"))
                })?)
            }
        };

        let calldata =
            hex::decode(raw.data.trim()).map_err(|e| RequestError::MalformedData(e.to_string()))?;
        if calldata.len() < 4 {
            return Err(RequestError::MalformedData(format!(
                "call data is {} bytes, expected at least 4",
                calldata.len()
            )));
        }

        Ok(Self { calldata, sender })
    }
}
