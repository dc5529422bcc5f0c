//! C# spelling for `Windows.UI.Composition` instantiators.

use vizij_composition_core::math::{Color, Matrix3x2, Matrix4x4, Vector2, Vector3, Vector4};

use super::{escape, float_digits, join, Access, ClassKind, Stringifier};
use crate::config::CodegenConfig;

#[derive(Copy, Clone, Debug, Default)]
pub struct CSharpStringifier;

impl CSharpStringifier {
    fn floats(&self, values: &[f32]) -> String {
        let parts: Vec<String> = values.iter().map(|v| self.float(*v)).collect();
        join(&parts)
    }
}

impl Stringifier for CSharpStringifier {
    fn language(&self) -> &'static str {
        "C#"
    }

    fn file_extension(&self) -> &'static str {
        "cs"
    }

    fn null(&self) -> &'static str {
        "null"
    }

    fn float(&self, value: f32) -> String {
        if value.is_nan() {
            "float.NaN".into()
        } else if value.is_infinite() {
            if value > 0.0 {
                "float.PositiveInfinity".into()
            } else {
                "float.NegativeInfinity".into()
            }
        } else {
            format!("{}F", float_digits(value))
        }
    }

    fn string(&self, value: &str) -> String {
        format!("\"{}\"", escape(value))
    }

    fn vector2(&self, v: Vector2) -> String {
        format!("new Vector2({})", self.floats(&v))
    }

    fn vector3(&self, v: Vector3) -> String {
        format!("new Vector3({})", self.floats(&v))
    }

    fn vector4(&self, v: Vector4) -> String {
        format!("new Vector4({})", self.floats(&v))
    }

    fn color(&self, c: Color) -> String {
        format!(
            "Color.FromArgb(0x{:02X}, 0x{:02X}, 0x{:02X}, 0x{:02X})",
            c.a, c.r, c.g, c.b
        )
    }

    fn matrix3x2(&self, m: &Matrix3x2) -> String {
        format!("new Matrix3x2({})", self.floats(&m.0))
    }

    fn matrix4x4(&self, m: &Matrix4x4) -> String {
        format!("new Matrix4x4({})", self.floats(&m.0))
    }

    fn time_span(&self, ticks: i64) -> String {
        format!("TimeSpan.FromTicks({ticks})")
    }

    fn var(&self) -> &'static str {
        "var"
    }

    fn reference_type(&self, type_name: &str) -> String {
        type_name.to_string()
    }

    fn new_object(&self, type_name: &str, args: &[String]) -> String {
        format!("new {type_name}({})", join(args))
    }

    fn deref(&self) -> &'static str {
        "."
    }

    fn static_access(&self) -> &'static str {
        "."
    }

    fn array(&self, element_type: &str, items: &[String]) -> String {
        format!("new {element_type}[] {{ {} }}", join(items))
    }

    fn add_verb(&self) -> &'static str {
        "Add"
    }

    fn preamble(&self, _config: &CodegenConfig) -> Vec<String> {
        [
            "using Microsoft.Graphics.Canvas.Geometry;",
            "using System;",
            "using System.Numerics;",
            "using Windows.UI;",
            "using Windows.UI.Composition;",
        ]
        .iter()
        .map(|line| line.to_string())
        .collect()
    }

    fn class_declaration(&self, name: &str, kind: ClassKind) -> String {
        match kind {
            ClassKind::Entry => format!("public sealed class {name}"),
            ClassKind::Instantiator => format!("sealed class {name} : IDisposable"),
        }
    }

    fn class_end(&self) -> &'static str {
        "}"
    }

    fn access_section(&self, _access: Access) -> Option<&'static str> {
        None
    }

    fn member_modifier(&self, access: Access) -> &'static str {
        match access {
            Access::Public => "public ",
            Access::Internal => "internal ",
            Access::Private => "",
        }
    }

    fn field(&self, type_name: &str, name: &str, readonly: bool) -> String {
        if readonly {
            format!("readonly {type_name} {name};")
        } else {
            format!("{type_name} {name};")
        }
    }

    fn constructor_signature(&self, class_name: &str, parameter: &str) -> String {
        format!("internal {class_name}({parameter})")
    }

    fn dispose_signature(&self, _class_name: &str) -> String {
        "public void Dispose()".into()
    }

    fn try_create_body(&self, compositor: &str) -> Vec<String> {
        vec![
            format!("using (var instantiator = new Instantiator({compositor}))"),
            "{".into(),
            "    return instantiator.CreateRoot();".into(),
            "}".into(),
        ]
    }

    fn nests_instantiator(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_should_spell_literals() {
        let s = CSharpStringifier;
        assert_eq!(s.float(0.5), "0.5F");
        assert_eq!(s.float(2.0), "2F");
        assert_eq!(s.vector2([1.0, -0.0]), "new Vector2(1F, 0F)");
        assert_eq!(
            s.color(Color::rgb(255, 0, 0)),
            "Color.FromArgb(0xFF, 0xFF, 0x00, 0x00)"
        );
        assert_eq!(s.time_span(20_000_000), "TimeSpan.FromTicks(20000000)");
        assert_eq!(s.string("a\"b"), "\"a\\\"b\"");
        assert_eq!(
            s.enum_value("CompositionStrokeCap", "Round"),
            "CompositionStrokeCap.Round"
        );
    }
}
