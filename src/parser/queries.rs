//! Go grammar node kinds and field names used by the extractors.

/// `func Name(...)` at the top level.
pub const FUNCTION_DECLARATION: &str = "function_declaration";
/// `func (r Recv) Name(...)` at the top level.
pub const METHOD_DECLARATION: &str = "method_declaration";
pub const CALL_EXPRESSION: &str = "call_expression";
pub const SELECTOR_EXPRESSION: &str = "selector_expression";
pub const IDENTIFIER: &str = "identifier";
pub const PARAMETER_DECLARATION: &str = "parameter_declaration";

/// Wrappers unwrapped when resolving a receiver to its base type name.
pub const POINTER_TYPE: &str = "pointer_type";
pub const GENERIC_TYPE: &str = "generic_type";
pub const PARENTHESIZED_TYPE: &str = "parenthesized_type";
pub const TYPE_IDENTIFIER: &str = "type_identifier";

pub const FIELD_NAME: &str = "name";
pub const FIELD_BODY: &str = "body";
pub const FIELD_RECEIVER: &str = "receiver";
pub const FIELD_TYPE: &str = "type";
pub const FIELD_FUNCTION: &str = "function";
pub const FIELD_OPERAND: &str = "operand";
pub const FIELD_FIELD: &str = "field";
/// Index or explicit type arguments of a call: `f[i]()`, `F[int, string]()`.
pub const FIELD_TYPE_ARGUMENTS: &str = "type_arguments";

/// Whether a node kind declares a function or method.
pub fn is_function_declaration(kind: &str) -> bool {
    matches!(kind, FUNCTION_DECLARATION | METHOD_DECLARATION)
}
