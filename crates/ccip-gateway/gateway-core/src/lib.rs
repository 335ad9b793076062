//! Server side of EIP-3668 (CCIP-Read).
//!
//! A contract reverts with `OffchainLookup`, the client POSTs the ABI encoded
//! call to a gateway, and the gateway answers with ABI encoded return data.
//! This crate turns human-readable function signatures into selector-keyed
//! handlers and runs incoming request bodies through decode, dispatch and
//! encode:
//!
//! ```ignore
//! use alloy_dyn_abi::DynSolValue;
//! use alloy_primitives::Address;
//! use ccip_gateway_core::{Gateway, GatewayConfig};
//!
//! let mut gateway = Gateway::new(GatewayConfig::default());
//! gateway.handle(
//!     "function addr(bytes32 namehash) view returns (address)",
//!     |req| {
//!         let _namehash = req.require("namehash")?.as_bytes32()?;
//!         Ok(vec![DynSolValue::Address(Address::ZERO)])
//!     },
//! )?;
//!
//! let response = gateway.respond(br#"{"data":"0x3b3b57de..."}"#);
//! ```
//!
//! The HTTP binding lives in `ccip-gateway-server`.

#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]

pub mod binder;
mod config;
pub mod descriptor;
pub mod envelope;
mod error;
mod gateway;
pub mod registry;
pub mod signature;
pub mod validator;

pub use binder::{
    BoundValue,
    CcipReadRequest,
    ValueTypeError,
};
pub use config::GatewayConfig;
pub use descriptor::{
    MethodDescriptor,
    Parameter,
    StateMutability,
};
pub use error::{
    RegistrationError,
    RequestError,
    SignatureError,
};
pub use gateway::{
    Gateway,
    GatewayResponse,
    encode_outputs,
};
pub use registry::Handler;
pub use signature::parse_signature;
pub use validator::{
    AllowedSenders,
    OutputEncoder,
    SenderValidator,
};
