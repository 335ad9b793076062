//! Pairs decoded call arguments with the parameter names of the function they
//! were decoded for.

use crate::{
    descriptor::{
        MethodDescriptor,
        Parameter,
    },
    error::RequestError,
};

use alloy_dyn_abi::{
    DynSolType,
    DynSolValue,
};
use alloy_primitives::{
    Address,
    B256,
    U256,
};
use std::sync::Arc;

/// Raised by the typed accessors of [`BoundValue`] when the decoded value has a
/// different shape than the one requested.
#[derive(Debug, thiserror::Error)]
#[error("parameter `{name}` is `{actual}`, not `{expected}`")]
pub struct ValueTypeError {
    pub name: String,
    pub expected: &'static str,
    pub actual: String,
}

/// A decoded argument together with the parameter it was decoded for.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundValue {
    pub name: String,
    pub ty: DynSolType,
    pub value: DynSolValue,
}

impl BoundValue {
    fn mismatch(&self, expected: &'static str) -> ValueTypeError {
        ValueTypeError {
            name: self.name.clone(),
            expected,
            actual: self.ty.sol_type_name().into_owned(),
        }
    }

    pub fn as_bytes32(&self) -> Result<B256, ValueTypeError> {
        match self.value.as_fixed_bytes() {
            Some((bytes, 32)) => Ok(B256::from_slice(bytes)),
            _ => Err(self.mismatch("bytes32")),
        }
    }

    pub fn as_address(&self) -> Result<Address, ValueTypeError> {
        self.value.as_address().ok_or_else(|| self.mismatch("address"))
    }

    /// Unsigned integer of any width.
    pub fn as_uint(&self) -> Result<U256, ValueTypeError> {
        self.value
            .as_uint()
            .map(|(value, _)| value)
            .ok_or_else(|| self.mismatch("uint"))
    }

    pub fn as_bool(&self) -> Result<bool, ValueTypeError> {
        self.value.as_bool().ok_or_else(|| self.mismatch("bool"))
    }

    pub fn as_str(&self) -> Result<&str, ValueTypeError> {
        self.value.as_str().ok_or_else(|| self.mismatch("string"))
    }

    /// Dynamic `bytes`.
    pub fn as_bytes(&self) -> Result<&[u8], ValueTypeError> {
        self.value.as_bytes().ok_or_else(|| self.mismatch("bytes"))
    }
}

/// Pairs `values` positionally with `params`.
///
/// The values must come from decoding against the same parameter list, so a
/// length mismatch is reported as [`RequestError::DecodeMismatch`].
pub fn bind(params: &[Parameter], values: Vec<DynSolValue>) -> Result<Vec<BoundValue>, RequestError> {
    if params.len() != values.len() {
        return Err(RequestError::DecodeMismatch {
            expected: params.len(),
            decoded: values.len(),
        });
    }

    Ok(params
        .iter()
        .zip(values)
        .map(|(param, value)| {
            BoundValue {
                name: param.name.clone(),
                ty: param.ty.clone(),
                value,
            }
        })
        .collect())
}

/// A decoded call handed to a registered handler.
#[derive(Debug, Clone)]
pub struct CcipReadRequest {
    pub method: Arc<MethodDescriptor>,
    pub inputs: Vec<BoundValue>,
    /// Sender supplied in the request envelope, if any.
    pub sender: Option<Address>,
}

impl CcipReadRequest {
    /// Looks up an input by name. Duplicate names resolve to the first match.
    pub fn var(&self, name: &str) -> Option<&BoundValue> {
        self.inputs.iter().find(|v| v.name == name)
    }

    /// Like [`Self::var`] but turns absence into an error a handler can return.
    pub fn require(&self, name: &str) -> anyhow::Result<&BoundValue> {
        self.var(name)
            .ok_or_else(|| anyhow::anyhow!("{name} parameter not found"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        descriptor::StateMutability,
        signature::parse_signature,
    };

    fn request(signature: &str, values: Vec<DynSolValue>) -> CcipReadRequest {
        let method = Arc::new(parse_signature(signature).unwrap());
        let inputs = bind(method.inputs(), values).unwrap();
        CcipReadRequest {
            method,
            inputs,
            sender: None,
        }
    }

    #[test]
    fn test_bind_then_lookup_returns_values_in_order() {
        let values = vec![
            DynSolValue::FixedBytes(B256::with_last_byte(1), 32),
            DynSolValue::String("email".into()),
            DynSolValue::Uint(U256::from(7), 256),
        ];
        let req = request(
            "function f(bytes32 node, string key, uint256 index) view returns (string)",
            values.clone(),
        );

        let looked_up: Vec<DynSolValue> = ["node", "key", "index"]
            .iter()
            .map(|name| req.var(name).unwrap().value.clone())
            .collect();
        assert_eq!(looked_up, values);
    }

    #[test]
    fn test_lookup_missing_is_none() {
        let req = request(
            "function addr(bytes32 namehash) view returns (address)",
            vec![DynSolValue::FixedBytes(B256::ZERO, 32)],
        );
        assert!(req.var("node").is_none());
        assert_eq!(
            req.require("node").unwrap_err().to_string(),
            "node parameter not found"
        );
    }

    #[test]
    fn test_duplicate_names_resolve_to_first() {
        let req = request(
            "function f(uint256 x, uint256 x) view returns ()",
            vec![
                DynSolValue::Uint(U256::from(1), 256),
                DynSolValue::Uint(U256::from(2), 256),
            ],
        );
        assert_eq!(req.var("x").unwrap().as_uint().unwrap(), U256::from(1));
    }

    #[test]
    fn test_bind_length_mismatch() {
        let method = MethodDescriptor::new(
            "f",
            StateMutability::View,
            vec![Parameter::new("a", DynSolType::Bool)],
            vec![],
        );
        let err = bind(method.inputs(), vec![]).unwrap_err();
        assert!(matches!(
            err,
            RequestError::DecodeMismatch {
                expected: 1,
                decoded: 0
            }
        ));
    }

    #[test]
    fn test_typed_accessors() {
        let node = B256::repeat_byte(0xab);
        let owner = Address::repeat_byte(0x11);
        let req = request(
            "function f(bytes32 node, address owner, bool flag, bytes blob, string key) view returns ()",
            vec![
                DynSolValue::FixedBytes(node, 32),
                DynSolValue::Address(owner),
                DynSolValue::Bool(true),
                DynSolValue::Bytes(vec![1, 2, 3]),
                DynSolValue::String("url".into()),
            ],
        );

        assert_eq!(req.var("node").unwrap().as_bytes32().unwrap(), node);
        assert_eq!(req.var("owner").unwrap().as_address().unwrap(), owner);
        assert!(req.var("flag").unwrap().as_bool().unwrap());
        assert_eq!(req.var("blob").unwrap().as_bytes().unwrap(), &[1, 2, 3]);
        assert_eq!(req.var("key").unwrap().as_str().unwrap(), "url");
    }

    #[test]
    fn test_typed_accessor_mismatch() {
        let req = request(
            "function f(string key) view returns ()",
            vec![DynSolValue::String("url".into())],
        );
        let err = req.var("key").unwrap().as_bytes32().unwrap_err();
        assert_eq!(err.to_string(), "parameter `key` is `string`, not `bytes32`");
    }
}
