//! Parameter descriptors for entry-point binding
//!
//! The engine inspects the resolved entry point once per compiled
//! submission and reduces its signature to this explicit, data-driven
//! form. The binder consumes only these descriptors; no call path
//! re-inspects the live function object.

use serde::Deserialize;

/// Declared type of a parameter, reduced to the coercion table's tags
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeTag {
    /// Untyped or text-annotated: passed through as text
    Text,
    Int,
    Float,
    Bool,
    /// Sequence of the inner tag
    List(Box<TypeTag>),
    /// Tuple of the inner tag; preserves the container kind at the call
    Tuple(Box<TypeTag>),
}

impl TypeTag {
    /// Parse the descriptor spelling ("int", "list:float", "tuple:text", ...).
    /// Unknown spellings fall back to text, matching untyped parameters.
    pub fn parse(tag: &str) -> TypeTag {
        match tag {
            "int" => TypeTag::Int,
            "float" => TypeTag::Float,
            "bool" => TypeTag::Bool,
            _ => {
                if let Some(inner) = tag.strip_prefix("list:") {
                    TypeTag::List(Box::new(TypeTag::parse(inner)))
                } else if let Some(inner) = tag.strip_prefix("tuple:") {
                    TypeTag::Tuple(Box::new(TypeTag::parse(inner)))
                } else {
                    TypeTag::Text
                }
            }
        }
    }
}

/// How a parameter is passed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Positional or positional-or-keyword
    Positional,
    /// Keyword-only
    Keyword,
}

/// One entry-point parameter
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: String,
    pub kind: ParamKind,
    pub type_tag: TypeTag,
    pub has_default: bool,
}

/// Signature of the resolved entry point
#[derive(Debug, Clone)]
pub struct FunctionSpec {
    /// The callable's own name, used in binding error messages
    pub name: String,
    pub params: Vec<ParamSpec>,
}

impl FunctionSpec {
    /// Parse the JSON descriptor produced inside the sandbox
    pub fn from_descriptor_json(descriptor: &str) -> Result<FunctionSpec, serde_json::Error> {
        let raw: RawSignature = serde_json::from_str(descriptor)?;
        let params = raw
            .params
            .into_iter()
            .map(|param| ParamSpec {
                name: param.name,
                kind: if param.kind == "keyword" {
                    ParamKind::Keyword
                } else {
                    ParamKind::Positional
                },
                type_tag: TypeTag::parse(&param.r#type),
                has_default: param.has_default,
            })
            .collect();
        Ok(FunctionSpec {
            name: raw.name,
            params,
        })
    }

    /// Positional parameters, in declaration order
    pub fn positional(&self) -> impl Iterator<Item = &ParamSpec> {
        self.params
            .iter()
            .filter(|param| param.kind == ParamKind::Positional)
    }

    /// Keyword-only parameters, in declaration order
    pub fn keyword_only(&self) -> impl Iterator<Item = &ParamSpec> {
        self.params
            .iter()
            .filter(|param| param.kind == ParamKind::Keyword)
    }
}

#[derive(Deserialize)]
struct RawSignature {
    name: String,
    params: Vec<RawParam>,
}

#[derive(Deserialize)]
struct RawParam {
    name: String,
    kind: String,
    r#type: String,
    has_default: bool,
}
