//! Transport-agnostic request pipeline.
//!
//! `body -> envelope -> sender check -> selector lookup -> input decode -> bind
//! -> handler -> output encode -> response body`. Every failure short-circuits
//! the remaining steps and the handler runs at most once per request.

use crate::{
    binder::{
        CcipReadRequest,
        bind,
    },
    config::GatewayConfig,
    descriptor::{
        MethodDescriptor,
        Parameter,
    },
    envelope::{
        CcipErrorBody,
        CcipResponseBody,
        Envelope,
    },
    error::{
        RegistrationError,
        RequestError,
    },
    registry::{
        Handler,
        SelectorTable,
    },
    signature::parse_signature,
};

use alloy_dyn_abi::DynSolValue;
use alloy_primitives::{
    Bytes,
    Selector,
    hex,
};
use serde_json::json;
use std::sync::Arc;
use tracing::{
    debug,
    warn,
};

/// Status and JSON body to send back to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayResponse {
    pub status: u16,
    pub body: String,
}

impl GatewayResponse {
    fn ok(data: &[u8]) -> Self {
        let body = CcipResponseBody {
            data: hex::encode_prefixed(data),
        };
        Self {
            status: 200,
            body: json!(body).to_string(),
        }
    }

    fn error(status: u16, message: &str) -> Self {
        let body = CcipErrorBody {
            message: message.to_string(),
        };
        Self {
            status,
            body: json!(body).to_string(),
        }
    }
}

/// Server side of a CCIP-Read gateway.
///
/// Handlers are registered through `&mut self` during setup; serving only needs
/// `&self`, so a fully registered gateway is shared behind an `Arc`.
#[derive(Debug, Default)]
pub struct Gateway {
    table: SelectorTable,
    config: GatewayConfig,
}

impl Gateway {
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            table: SelectorTable::new(),
            config,
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Parses `signature` and registers `handler` for its selector.
    pub fn handle<F>(&mut self, signature: &str, handler: F) -> Result<Selector, RegistrationError>
    where
        F: Fn(&CcipReadRequest) -> anyhow::Result<Vec<DynSolValue>> + Send + Sync + 'static,
    {
        let method = parse_signature(signature)?;
        self.register(method, Arc::new(handler))
    }

    pub fn register(
        &mut self,
        method: MethodDescriptor,
        handler: Arc<dyn Handler>,
    ) -> Result<Selector, RegistrationError> {
        self.table.register(method, handler)
    }

    pub fn methods(&self) -> impl Iterator<Item = &MethodDescriptor> {
        self.table.methods()
    }

    /// Runs a request body through the pipeline and returns the ABI encoded
    /// result.
    #[tracing::instrument(
        level = "debug",
        skip_all,
        target = "gateway::resolve",
        fields(selector, method)
    )]
    pub fn resolve(&self, body: &[u8]) -> Result<Bytes, RequestError> {
        let envelope = Envelope::decode(body)?;

        if let (Some(validator), Some(sender)) = (&self.config.sender_validator, envelope.sender) {
            validator
                .validate(sender)
                .map_err(RequestError::Unauthorized)?;
        }

        let selector = Selector::from_slice(&envelope.calldata[..4]);
        tracing::Span::current().record("selector", tracing::field::display(selector));

        let registered = self
            .table
            .lookup(&selector)
            .ok_or(RequestError::UnknownFunction(selector))?;
        tracing::Span::current().record("method", registered.method.name());

        let decoded = registered
            .method
            .input_tuple()
            .abi_decode_params(&envelope.calldata[4..])
            .map_err(RequestError::InputDecode)?;
        let values = match decoded {
            DynSolValue::Tuple(values) => values,
            other => vec![other],
        };

        let request = CcipReadRequest {
            method: registered.method.clone(),
            inputs: bind(registered.method.inputs(), values)?,
            sender: envelope.sender,
        };
        debug!(inputs = request.inputs.len(), sender = ?request.sender, "Invoking handler");

        let outputs = registered
            .handler
            .call(&request)
            .map_err(RequestError::Handler)?;

        let encoded = match &self.config.output_encoder {
            Some(encoder) => {
                encoder
                    .encode(&outputs)
                    .map_err(|e| RequestError::OutputEncode(e.to_string()))?
            }
            None => encode_outputs(registered.method.outputs(), outputs)?,
        };

        Ok(Bytes::from(encoded))
    }

    /// Runs a request body through the pipeline and renders the outcome as a
    /// status code and JSON body.
    pub fn respond(&self, body: &[u8]) -> GatewayResponse {
        match self.resolve(body) {
            Ok(data) => {
                metrics::counter!("ccip_requests_total", "outcome" => "ok").increment(1);
                GatewayResponse::ok(&data)
            }
            Err(err) => {
                metrics::counter!("ccip_requests_total", "outcome" => err.kind()).increment(1);
                let status = err.status_code();
                if status >= 500 {
                    warn!(target: "gateway::respond", error = %err, status, "Request failed");
                } else {
                    debug!(target: "gateway::respond", error = %err, status, "Request rejected");
                }

                let message = match &err {
                    RequestError::Handler(_) if !self.config.expose_handler_errors => {
                        "handler error".to_string()
                    }
                    _ => err.to_string(),
                };
                GatewayResponse::error(status, &message)
            }
        }
    }
}

/// ABI encodes handler outputs against the declared output parameters.
///
/// Arity and the shape of every value are checked first so a misbehaving
/// handler yields an error instead of bytes the caller cannot decode.
pub fn encode_outputs(params: &[Parameter], values: Vec<DynSolValue>) -> Result<Vec<u8>, RequestError> {
    if params.len() != values.len() {
        return Err(RequestError::OutputEncode(format!(
            "handler returned {} values, function declares {}",
            values.len(),
            params.len()
        )));
    }

    if let Some(param) = params
        .iter()
        .zip(&values)
        .find_map(|(param, value)| (!param.ty.matches(value)).then_some(param))
    {
        return Err(RequestError::OutputEncode(format!(
            "output `{}` does not match `{}`",
            param.name,
            param.ty.sol_type_name()
        )));
    }

    Ok(DynSolValue::Tuple(values).abi_encode_params())
}
