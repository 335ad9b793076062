use crate::validator::{
    AllowedSenders,
    OutputEncoder,
    SenderValidator,
};

use alloy_primitives::Address;
use std::sync::Arc;

/// Construction-time options of a [`crate::Gateway`].
#[derive(Clone)]
pub struct GatewayConfig {
    /// Consulted only for requests that carry a `sender`.
    pub sender_validator: Option<Arc<dyn SenderValidator>>,
    /// Replaces the default ABI encoding of handler outputs.
    pub output_encoder: Option<Arc<dyn OutputEncoder>>,
    /// Whether handler error messages are returned to callers. When disabled,
    /// callers only see a generic message and the detail is logged.
    pub expose_handler_errors: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            sender_validator: None,
            output_encoder: None,
            expose_handler_errors: true,
        }
    }
}

impl GatewayConfig {
    /// Config that only serves requests from the given gateway callers.
    pub fn with_allowed_senders(senders: impl IntoIterator<Item = Address>) -> Self {
        Self::default().sender_validator(AllowedSenders::new(senders))
    }

    pub fn sender_validator(mut self, validator: impl SenderValidator + 'static) -> Self {
        self.sender_validator = Some(Arc::new(validator));
        self
    }

    pub fn output_encoder(mut self, encoder: impl OutputEncoder + 'static) -> Self {
        self.output_encoder = Some(Arc::new(encoder));
        self
    }

    pub fn expose_handler_errors(mut self, expose: bool) -> Self {
        self.expose_handler_errors = expose;
        self
    }
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("sender_validator", &self.sender_validator.is_some())
            .field("output_encoder", &self.output_encoder.is_some())
            .field("expose_handler_errors", &self.expose_handler_errors)
            .finish()
    }
}
