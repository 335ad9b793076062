use alloy_dyn_abi::DynSolType;
use alloy_primitives::{
    Selector,
    keccak256,
};
use std::fmt;

/// Mutability of a function callable through CCIP-Read.
///
/// Only read-only functions can be served off-chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateMutability {
    Pure,
    View,
}

impl StateMutability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pure => "pure",
            Self::View => "view",
        }
    }
}

impl fmt::Display for StateMutability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named, typed function parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub name: String,
    pub ty: DynSolType,
}

impl Parameter {
    pub fn new(name: impl Into<String>, ty: DynSolType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// Structured form of a function signature, together with its selector.
///
/// The selector is computed once at construction from the name and the ordered
/// input types, so two descriptors that only differ in parameter names or
/// outputs share a selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDescriptor {
    name: String,
    mutability: StateMutability,
    inputs: Vec<Parameter>,
    outputs: Vec<Parameter>,
    selector: Selector,
}

impl MethodDescriptor {
    pub fn new(
        name: impl Into<String>,
        mutability: StateMutability,
        inputs: Vec<Parameter>,
        outputs: Vec<Parameter>,
    ) -> Self {
        let name = name.into();
        let selector = compute_selector(&canonical_signature(&name, &inputs));
        Self {
            name,
            mutability,
            inputs,
            outputs,
            selector,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mutability(&self) -> StateMutability {
        self.mutability
    }

    pub fn inputs(&self) -> &[Parameter] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[Parameter] {
        &self.outputs
    }

    pub fn selector(&self) -> Selector {
        self.selector
    }

    /// The `name(type,type,...)` string hashed into the selector.
    pub fn canonical_signature(&self) -> String {
        canonical_signature(&self.name, &self.inputs)
    }

    /// Input types as a single tuple, the shape the ABI codec decodes against.
    pub fn input_tuple(&self) -> DynSolType {
        DynSolType::Tuple(self.inputs.iter().map(|p| p.ty.clone()).collect())
    }
}

impl fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "function {}({}) {} returns ({})",
            self.name,
            render_params(&self.inputs),
            self.mutability,
            render_params(&self.outputs)
        )
    }
}

fn render_params(params: &[Parameter]) -> String {
    params
        .iter()
        .map(|p| format!("{} {}", p.ty.sol_type_name(), p.name))
        .collect::<Vec<_>>()
        .join(", ")
}

fn canonical_signature(name: &str, inputs: &[Parameter]) -> String {
    let types = inputs
        .iter()
        .map(|p| p.ty.sol_type_name())
        .collect::<Vec<_>>()
        .join(",");
    format!("{name}({types})")
}

/// First four bytes of the keccak256 hash of a canonical signature.
pub fn compute_selector(canonical: &str) -> Selector {
    Selector::from_slice(&keccak256(canonical.as_bytes())[..4])
}
