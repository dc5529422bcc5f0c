//! C++/CX spelling for `Windows::UI::Composition` instantiators.
//!
//! Win2D path geometries reach composition through `IGeometrySource2D`, which C++/CX
//! cannot obtain from a `CanvasGeometry` directly. Generated files therefore carry a
//! small adapter class that forwards the underlying Direct2D geometry.

use vizij_composition_core::math::{Color, Matrix3x2, Matrix4x4, Vector2, Vector3, Vector4};

use super::{escape, float_digits, join, Access, ClassKind, Stringifier};
use crate::config::CodegenConfig;

const GEOMETRY_ADAPTER: &str = r#"class GeoSource final :
    public ABI::Windows::Graphics::IGeometrySource2D,
    public ABI::Windows::Graphics::IGeometrySource2DInterop
{
    ULONG _cRef;
    Microsoft::WRL::ComPtr<ID2D1Geometry> _cpGeometry;

public:
    GeoSource(ID2D1Geometry* pGeometry)
        : _cRef(1)
        , _cpGeometry(pGeometry)
    { }

    IFACEMETHODIMP QueryInterface(REFIID iid, void** ppvObject) override
    {
        if (iid == __uuidof(ABI::Windows::Graphics::IGeometrySource2DInterop))
        {
            AddRef();
            *ppvObject = (ABI::Windows::Graphics::IGeometrySource2DInterop*) this;
            return S_OK;
        }
        return E_NOINTERFACE;
    }

    IFACEMETHODIMP_(ULONG) AddRef() override
    {
        return (ULONG)InterlockedIncrement(&_cRef);
    }

    IFACEMETHODIMP_(ULONG) Release() override
    {
        ULONG cRef = (ULONG)InterlockedDecrement(&_cRef);
        if (0 == cRef)
        {
            delete this;
        }
        return cRef;
    }

    IFACEMETHODIMP GetIids(ULONG*, IID**) override
    {
        return E_NOTIMPL;
    }

    IFACEMETHODIMP GetRuntimeClassName(HSTRING*) override
    {
        return E_NOTIMPL;
    }

    IFACEMETHODIMP GetTrustLevel(TrustLevel*) override
    {
        return E_NOTIMPL;
    }

    IFACEMETHODIMP GetGeometry(ID2D1Geometry** value) override
    {
        *value = _cpGeometry.Get();
        (*value)->AddRef();
        return S_OK;
    }

    IFACEMETHODIMP TryGetGeometryUsingFactory(ID2D1Factory*, ID2D1Geometry**) override
    {
        return E_NOTIMPL;
    }
};

static Windows::Graphics::IGeometrySource2D^ CanvasGeometryToIGeometrySource2D(CanvasGeometry^ geometry)
{
    Microsoft::WRL::ComPtr<ID2D1Geometry> d2dGeometry;
    Microsoft::WRL::ComPtr<ABI::Microsoft::Graphics::Canvas::ICanvasResourceWrapperNative> native;
    reinterpret_cast<IInspectable*>(geometry)->QueryInterface(IID_PPV_ARGS(&native));
    native->GetNativeResource(nullptr, 0.0F, IID_PPV_ARGS(&d2dGeometry));
    return reinterpret_cast<Windows::Graphics::IGeometrySource2D^>(new GeoSource(d2dGeometry.Get()));
}"#;

#[derive(Copy, Clone, Debug, Default)]
pub struct CppCxStringifier;

impl CppCxStringifier {
    fn floats(&self, values: &[f32]) -> String {
        let parts: Vec<String> = values.iter().map(|v| self.float(*v)).collect();
        join(&parts)
    }
}

impl Stringifier for CppCxStringifier {
    fn language(&self) -> &'static str {
        "C++/CX"
    }

    fn file_extension(&self) -> &'static str {
        "cpp"
    }

    fn null(&self) -> &'static str {
        "nullptr"
    }

    fn float(&self, value: f32) -> String {
        if value.is_nan() {
            "NAN".into()
        } else if value.is_infinite() {
            if value > 0.0 {
                "INFINITY".into()
            } else {
                "-INFINITY".into()
            }
        } else {
            let mut digits = float_digits(value);
            if !digits.contains(['.', 'e']) {
                digits.push_str(".0");
            }
            digits.push('F');
            digits
        }
    }

    fn int(&self, value: i64) -> String {
        if i32::try_from(value).is_ok() {
            value.to_string()
        } else {
            format!("{value}LL")
        }
    }

    fn string(&self, value: &str) -> String {
        format!("L\"{}\"", escape(value))
    }

    fn vector2(&self, v: Vector2) -> String {
        format!("float2({})", self.floats(&v))
    }

    fn vector3(&self, v: Vector3) -> String {
        format!("float3({})", self.floats(&v))
    }

    fn vector4(&self, v: Vector4) -> String {
        format!("float4({})", self.floats(&v))
    }

    fn color(&self, c: Color) -> String {
        format!(
            "ColorHelper::FromArgb(0x{:02X}, 0x{:02X}, 0x{:02X}, 0x{:02X})",
            c.a, c.r, c.g, c.b
        )
    }

    fn matrix3x2(&self, m: &Matrix3x2) -> String {
        format!("float3x2({})", self.floats(&m.0))
    }

    fn matrix4x4(&self, m: &Matrix4x4) -> String {
        format!("float4x4({})", self.floats(&m.0))
    }

    fn time_span(&self, ticks: i64) -> String {
        format!("TimeSpan{{ {ticks}LL }}")
    }

    fn var(&self) -> &'static str {
        "auto"
    }

    fn reference_type(&self, type_name: &str) -> String {
        format!("{type_name}^")
    }

    fn new_object(&self, type_name: &str, args: &[String]) -> String {
        format!("ref new {type_name}({})", join(args))
    }

    fn deref(&self) -> &'static str {
        "->"
    }

    fn static_access(&self) -> &'static str {
        "::"
    }

    fn array(&self, element_type: &str, items: &[String]) -> String {
        format!(
            "ref new Platform::Array<{}>({{ {} }})",
            self.reference_type(element_type),
            join(items)
        )
    }

    fn add_verb(&self) -> &'static str {
        "Append"
    }

    fn preamble(&self, _config: &CodegenConfig) -> Vec<String> {
        [
            "#include \"pch.h\"",
            "#include <WindowsNumerics.h>",
            "#include <d2d1.h>",
            "#include <d2d1_1.h>",
            "#include <wrl.h>",
            "#include <Windows.Graphics.Interop.h>",
            "#include <Microsoft.Graphics.Canvas.native.h>",
            "",
            "using namespace Microsoft::Graphics::Canvas::Geometry;",
            "using namespace Windows::Foundation;",
            "using namespace Windows::Foundation::Numerics;",
            "using namespace Windows::UI;",
            "using namespace Windows::UI::Composition;",
            "using TimeSpan = ::Windows::Foundation::TimeSpan;",
        ]
        .iter()
        .map(|line| line.to_string())
        .collect()
    }

    fn class_declaration(&self, name: &str, kind: ClassKind) -> String {
        match kind {
            ClassKind::Entry => format!("public ref class {name} sealed"),
            ClassKind::Instantiator => format!("class {name} final"),
        }
    }

    fn class_end(&self) -> &'static str {
        "};"
    }

    fn access_section(&self, access: Access) -> Option<&'static str> {
        Some(match access {
            Access::Public | Access::Internal => "public:",
            Access::Private => "private:",
        })
    }

    fn member_modifier(&self, _access: Access) -> &'static str {
        ""
    }

    fn field(&self, type_name: &str, name: &str, _readonly: bool) -> String {
        format!("{type_name}^ {name}{{ nullptr }};")
    }

    fn constructor_signature(&self, class_name: &str, parameter: &str) -> String {
        format!("{class_name}({parameter})")
    }

    fn dispose_signature(&self, class_name: &str) -> String {
        format!("~{class_name}()")
    }

    fn try_create_body(&self, compositor: &str) -> Vec<String> {
        vec![
            format!("Instantiator instantiator({compositor});"),
            "return instantiator.CreateRoot();".into(),
        ]
    }

    fn nests_instantiator(&self) -> bool {
        false
    }

    fn geometry_source(&self, expression: &str) -> String {
        format!("CanvasGeometryToIGeometrySource2D({expression})")
    }

    fn adapter_block(&self) -> Option<&'static str> {
        Some(GEOMETRY_ADAPTER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_should_spell_literals() {
        let s = CppCxStringifier;
        assert_eq!(s.float(0.5), "0.5F");
        assert_eq!(s.float(2.0), "2.0F");
        assert_eq!(s.vector2([1.0, 2.5]), "float2(1.0F, 2.5F)");
        assert_eq!(s.time_span(20_000_000), "TimeSpan{ 20000000LL }");
        assert_eq!(s.string("x"), "L\"x\"");
        assert_eq!(s.reference_type("ShapeVisual"), "ShapeVisual^");
        assert_eq!(
            s.new_object("CompositionPath", &["g".into()]),
            "ref new CompositionPath(g)"
        );
        assert_eq!(
            s.enum_value("CanvasFigureLoop", "Closed"),
            "CanvasFigureLoop::Closed"
        );
    }

    #[test]
    fn it_should_wrap_geometry_sources() {
        let s = CppCxStringifier;
        assert_eq!(
            s.geometry_source("Geometry()"),
            "CanvasGeometryToIGeometrySource2D(Geometry())"
        );
        assert!(s.adapter_block().is_some_and(|b| b.contains("class GeoSource")));
    }
}
