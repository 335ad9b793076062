//! Pluggable policies consulted by the request pipeline.

use alloy_dyn_abi::DynSolValue;
use alloy_primitives::Address;
use std::collections::HashSet;

/// Decides whether a request carrying `sender` may be served.
pub trait SenderValidator: Send + Sync {
    fn validate(&self, sender: Address) -> anyhow::Result<()>;
}

impl<F> SenderValidator for F
where
    F: Fn(Address) -> anyhow::Result<()> + Send + Sync,
{
    fn validate(&self, sender: Address) -> anyhow::Result<()> {
        self(sender)
    }
}

/// Accepts only senders from a fixed set of addresses.
#[derive(Debug, Clone, Default)]
pub struct AllowedSenders {
    allowed: HashSet<Address>,
}

impl AllowedSenders {
    pub fn new(allowed: impl IntoIterator<Item = Address>) -> Self {
        Self {
            allowed: allowed.into_iter().collect(),
        }
    }

    pub fn contains(&self, sender: &Address) -> bool {
        self.allowed.contains(sender)
    }
}

impl SenderValidator for AllowedSenders {
    fn validate(&self, sender: Address) -> anyhow::Result<()> {
        if self.contains(&sender) {
            Ok(())
        } else {
            anyhow::bail!("sender {sender} is not an allowed gateway caller")
        }
    }
}

/// Replaces the default ABI encoding of handler outputs.
///
/// Implementations must produce bytes the calling contract can decode with its
/// own expectation of the return type.
pub trait OutputEncoder: Send + Sync {
    fn encode(&self, outputs: &[DynSolValue]) -> anyhow::Result<Vec<u8>>;
}

impl<F> OutputEncoder for F
where
    F: Fn(&[DynSolValue]) -> anyhow::Result<Vec<u8>> + Send + Sync,
{
    fn encode(&self, outputs: &[DynSolValue]) -> anyhow::Result<Vec<u8>> {
        self(outputs)
    }
}
