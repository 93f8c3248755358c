//! Call-site resolution.
//!
//! Maps the callee expression of a Go call to a target key using syntax
//! alone:
//!
//! | call shape        | key          |
//! |-------------------|--------------|
//! | `foo()`           | `foo`        |
//! | `svc.Start()`     | `svc_Start`  |
//! | `a.b.Start()`     | `Start`      |
//! | `func(){}()`      | none         |
//! | `handlers[i]()`   | none         |
//!
//! The key for a selector call uses the identifier written at the call-site,
//! not its type, so `svc.Start()` never becomes `Service_Start`.

use tree_sitter::Node;

use crate::parser::queries::{
    CALL_EXPRESSION, FIELD_FIELD, FIELD_FUNCTION, FIELD_OPERAND, FIELD_TYPE_ARGUMENTS, IDENTIFIER,
    SELECTOR_EXPRESSION,
};

/// Separator between receiver and method in a qualified key.
pub const KEY_SEPARATOR: char = '_';

/// Resolve a `call_expression` node to its target key.
pub fn target_key(call: &Node<'_>, source: &[u8]) -> Option<String> {
    if call.kind() != CALL_EXPRESSION {
        return None;
    }
    // The grammar cannot tell `handlers[i]()` from `F[int]()`; both call
    // through an indexed value rather than a named function.
    if call.child_by_field_name(FIELD_TYPE_ARGUMENTS).is_some() {
        return None;
    }
    let callee = call.child_by_field_name(FIELD_FUNCTION)?;
    callee_key(&callee, source)
}

/// Resolve a callee expression to its target key.
pub fn callee_key(callee: &Node<'_>, source: &[u8]) -> Option<String> {
    match callee.kind() {
        IDENTIFIER => text(callee, source).map(str::to_string),
        SELECTOR_EXPRESSION => {
            let field = callee.child_by_field_name(FIELD_FIELD)?;
            let method = text(&field, source)?;
            let operand = callee.child_by_field_name(FIELD_OPERAND)?;
            if operand.kind() == IDENTIFIER {
                let receiver = text(&operand, source)?;
                Some(qualified_key(receiver, method))
            } else {
                // Chained access: only the final method survives.
                Some(method.to_string())
            }
        }
        _ => None,
    }
}

/// Build a `Receiver_Method` key.
pub fn qualified_key(receiver: &str, method: &str) -> String {
    format!("{receiver}{KEY_SEPARATOR}{method}")
}

/// Method part of a qualified key (`svc_Start` → `Start`).
pub fn method_part(key: &str) -> Option<&str> {
    key.split_once(KEY_SEPARATOR)
        .map(|(_, method)| method)
        .filter(|method| !method.is_empty())
}

fn text<'s>(node: &Node<'_>, source: &'s [u8]) -> Option<&'s str> {
    node.utf8_text(source).ok().filter(|s| !s.is_empty())
}
