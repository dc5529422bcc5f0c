//! Target-language spelling of literals, types and boilerplate.
//!
//! The emitter walks the graph once and asks a [`Stringifier`] for every piece of
//! syntax that differs between languages. Adding a target means implementing this
//! trait; the walk itself does not change.

use vizij_composition_core::math::{Color, Matrix3x2, Matrix4x4, Vector2, Vector3, Vector4};

use crate::config::CodegenConfig;

mod cppcx;
mod csharp;

pub use cppcx::CppCxStringifier;
pub use csharp::CSharpStringifier;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ClassKind {
    /// Public type exposing `TryCreate`.
    Entry,
    /// Builder holding the compositor, cached fields and one method per node.
    Instantiator,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Access {
    Public,
    Internal,
    Private,
}

pub trait Stringifier {
    /// Display name of the target language.
    fn language(&self) -> &'static str;

    fn file_extension(&self) -> &'static str;

    fn null(&self) -> &'static str;

    fn bool(&self, value: bool) -> &'static str {
        if value {
            "true"
        } else {
            "false"
        }
    }

    fn float(&self, value: f32) -> String;

    fn int(&self, value: i64) -> String {
        value.to_string()
    }

    fn string(&self, value: &str) -> String;

    fn vector2(&self, v: Vector2) -> String;

    fn vector3(&self, v: Vector3) -> String;

    fn vector4(&self, v: Vector4) -> String;

    fn color(&self, c: Color) -> String;

    fn matrix3x2(&self, m: &Matrix3x2) -> String;

    fn matrix4x4(&self, m: &Matrix4x4) -> String;

    /// Duration from 100ns ticks.
    fn time_span(&self, ticks: i64) -> String;

    fn enum_value(&self, type_name: &str, member: &str) -> String {
        format!("{type_name}{}{member}", self.static_access())
    }

    /// Keyword for an inferred local.
    fn var(&self) -> &'static str;

    /// How a variable of reference type `type_name` is declared.
    fn reference_type(&self, type_name: &str) -> String;

    fn new_object(&self, type_name: &str, args: &[String]) -> String;

    /// Member access on a reference.
    fn deref(&self) -> &'static str;

    /// Access to a static member or enum value.
    fn static_access(&self) -> &'static str;

    fn array(&self, element_type: &str, items: &[String]) -> String;

    fn scope_open(&self) -> &'static str {
        "{"
    }

    fn scope_close(&self) -> &'static str {
        "}"
    }

    fn comment(&self, text: &str) -> String {
        format!("// {text}")
    }

    /// Verb that appends to a composition collection.
    fn add_verb(&self) -> &'static str;

    /// Lines before the namespace: imports, includes and aliases.
    fn preamble(&self, config: &CodegenConfig) -> Vec<String>;

    fn namespace(&self, name: &str) -> String {
        format!("namespace {name}")
    }

    fn class_declaration(&self, name: &str, kind: ClassKind) -> String;

    fn class_end(&self) -> &'static str;

    /// Section label such as `public:`; `None` when access is per member.
    fn access_section(&self, access: Access) -> Option<&'static str>;

    /// Modifier written before a member declaration.
    fn member_modifier(&self, access: Access) -> &'static str;

    fn parameter(&self, type_name: &str, name: &str) -> String {
        format!("{} {name}", self.reference_type(type_name))
    }

    fn field(&self, type_name: &str, name: &str, readonly: bool) -> String;

    fn method_signature(&self, return_type: &str, name: &str) -> String {
        format!("{} {name}()", self.reference_type(return_type))
    }

    fn constructor_signature(&self, class_name: &str, parameter: &str) -> String;

    fn dispose_signature(&self, class_name: &str) -> String;

    /// Body of `TryCreate`, given the compositor parameter name.
    fn try_create_body(&self, compositor: &str) -> Vec<String>;

    /// Whether the instantiator is declared inside the entry type.
    fn nests_instantiator(&self) -> bool;

    /// Converts a `CanvasGeometry` expression into a composition path source.
    fn geometry_source(&self, expression: &str) -> String {
        expression.to_string()
    }

    /// Inline interop helper emitted before the generated classes.
    fn adapter_block(&self) -> Option<&'static str> {
        None
    }
}

/// Shortest round-trip text of `value` without a type suffix; `-0` prints as `0`.
pub(crate) fn float_digits(value: f32) -> String {
    if value == 0.0 {
        "0".to_string()
    } else {
        format!("{value}")
    }
}

/// Escape `"` and `\` and control characters for a C-family string literal.
pub(crate) fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out
}

pub(crate) fn join(items: &[String]) -> String {
    items.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_digits_are_shortest_and_unsigned_zero() {
        assert_eq!(float_digits(0.5), "0.5");
        assert_eq!(float_digits(-0.0), "0");
        assert_eq!(float_digits(100.0), "100");
    }

    #[test]
    fn escape_quotes_and_backslashes() {
        assert_eq!(escape(r#"a "b" \c"#), r#"a \"b\" \\c"#);
    }
}
