use alloy_primitives::Selector;
use thiserror::Error;

/// Errors raised while parsing a human-readable function signature.
#[derive(Debug, Error)]
pub enum SignatureError {
    #[error("invalid function signature at byte {offset}: {reason}")]
    InvalidSignature { offset: usize, reason: &'static str },
    #[error("invalid parameter type `{ty}`: {source}")]
    InvalidParameterType {
        ty: String,
        #[source]
        source: alloy_dyn_abi::Error,
    },
}

/// Setup-time errors returned when adding a handler to a gateway.
#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error(transparent)]
    Signature(#[from] SignatureError),
    #[error("selector {selector} is already registered for `{existing}`")]
    DuplicateSelector { selector: Selector, existing: String },
}

/// Request-time failures. Each one is terminal for the request that raised it.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("malformed request body: {0}")]
    MalformedEnvelope(String),
    #[error("malformed call data: {0}")]
    MalformedData(String),
    #[error("unauthorized sender")]
    Unauthorized(#[source] anyhow::Error),
    #[error("function {0} not found")]
    UnknownFunction(Selector),
    #[error("failed to decode input parameters: {0}")]
    InputDecode(#[source] alloy_dyn_abi::Error),
    #[error("decoded {decoded} values for {expected} declared inputs")]
    DecodeMismatch { expected: usize, decoded: usize },
    #[error("handler error: {0}")]
    Handler(#[source] anyhow::Error),
    #[error("failed to encode output parameters: {0}")]
    OutputEncode(String),
}

impl RequestError {
    /// HTTP status code the transport should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::MalformedEnvelope(_) | Self::MalformedData(_) | Self::InputDecode(_) => 400,
            Self::Unauthorized(_) => 401,
            Self::UnknownFunction(_) => 404,
            Self::DecodeMismatch { .. } | Self::Handler(_) | Self::OutputEncode(_) => 500,
        }
    }

    /// Stable name of the failure, used as a metrics label.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MalformedEnvelope(_) => "malformed_envelope",
            Self::MalformedData(_) => "malformed_data",
            Self::Unauthorized(_) => "unauthorized",
            Self::UnknownFunction(_) => "unknown_function",
            Self::InputDecode(_) => "input_decode",
            Self::DecodeMismatch { .. } => "decode_mismatch",
            Self::Handler(_) => "handler",
            Self::OutputEncode(_) => "output_encode",
        }
    }
}
