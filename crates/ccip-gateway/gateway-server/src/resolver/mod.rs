//! Offchain name resolver serving the ENS `addr` and `text` profiles from a
//! local [`RecordStore`].

mod store;

pub use store::{
    RecordDb,
    RecordStore,
    StoreError,
};

use alloy_dyn_abi::DynSolValue;
use ccip_gateway_core::{
    Gateway,
    RegistrationError,
};
use tracing::debug;

pub const ADDR_SIGNATURE: &str = "function addr(bytes32 namehash) view returns (address)";
pub const TEXT_SIGNATURE: &str =
    "function text(bytes32 namehash, string key) view returns (string)";

/// Registers the resolver profiles on `gateway`. Missing records resolve to the
/// zero address and the empty string.
///
/// Handlers block on `store`, so the gateway must be driven from blocking
/// threads.
pub fn register_resolver(gateway: &mut Gateway, store: RecordStore) -> Result<(), RegistrationError> {
    let addr_store = store.clone();
    gateway.handle(ADDR_SIGNATURE, move |req| {
        let namehash = req.require("namehash")?.as_bytes32()?;
        let addr = addr_store.addr(namehash)?;
        debug!(%namehash, found = addr.is_some(), "addr lookup");
        Ok(vec![DynSolValue::Address(addr.unwrap_or_default())])
    })?;

    gateway.handle(TEXT_SIGNATURE, move |req| {
        let namehash = req.require("namehash")?.as_bytes32()?;
        let key = req.require("key")?.as_str()?;
        let text = store.text(namehash, key)?;
        debug!(%namehash, key, found = text.is_some(), "text lookup");
        Ok(vec![DynSolValue::String(text.unwrap_or_default())])
    })?;

    Ok(())
}
