//! Typed composition object model.
//!
//! Every scene object is one [`Object`] variant. Properties are `Option`s where `None`
//! means "use the category default" (see [`defaults`]). References to other objects are
//! [`ObjectId`]s into the owning [`SceneGraph`](crate::scene::SceneGraph).

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ids::ObjectId;
use crate::math::{Color, Matrix3x2, Matrix4x4, Vector2, Vector3, Vector4};

/// Documented category defaults. A property equal to its default is elided on copy.
pub mod defaults {
    use crate::math::{Matrix3x2, Matrix4x4, Vector2, Vector3};

    pub const VECTOR2_ZERO: Vector2 = [0.0, 0.0];
    pub const VECTOR2_ONE: Vector2 = [1.0, 1.0];
    pub const VECTOR3_ZERO: Vector3 = [0.0, 0.0, 0.0];
    pub const VECTOR3_ONE: Vector3 = [1.0, 1.0, 1.0];
    pub const ROTATION: f32 = 0.0;
    pub const OPACITY: f32 = 1.0;
    pub const IS_VISIBLE: bool = true;
    pub const MATRIX3X2: Matrix3x2 = Matrix3x2::IDENTITY;
    pub const MATRIX4X4: Matrix4x4 = Matrix4x4::IDENTITY;
    pub const TRIM_START: f32 = 0.0;
    pub const TRIM_END: f32 = 1.0;
    pub const TRIM_OFFSET: f32 = 0.0;
    pub const STROKE_THICKNESS: f32 = 1.0;
    pub const STROKE_MITER_LIMIT: f32 = 1.0;
    pub const STROKE_DASH_OFFSET: f32 = 0.0;
    pub const INSET: f32 = 0.0;
    pub const STEP_COUNT: i32 = 1;
}

/// Property names that make up an object's transform.
pub mod transform_targets {
    pub const CENTER_POINT: &str = "CenterPoint";
    pub const OFFSET: &str = "Offset";
    pub const SCALE: &str = "Scale";
    pub const ROTATION_ANGLE: &str = "RotationAngle";
    pub const ROTATION_ANGLE_IN_DEGREES: &str = "RotationAngleInDegrees";
    pub const TRANSFORM_MATRIX: &str = "TransformMatrix";

    pub const ALL: [&str; 6] = [
        CENTER_POINT,
        OFFSET,
        SCALE,
        ROTATION_ANGLE,
        ROTATION_ANGLE_IN_DEGREES,
        TRANSFORM_MATRIX,
    ];
}

/// Free-form value stored in an object's property bag.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PropertyValue {
    Scalar(f32),
    Vector2(Vector2),
    Vector3(Vector3),
    Vector4(Vector4),
    Color(Color),
    Boolean(bool),
}

pub type PropertyBag = IndexMap<String, PropertyValue>;

/// Binds an animation to a named property of the owning object.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Animator {
    pub target: String,
    pub animation: ObjectId,
    /// Controller the animation is started under (replayed paused when `paused`).
    #[serde(default)]
    pub controller: Option<ObjectId>,
}

/// State shared by every composition object.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectMeta {
    pub comment: Option<String>,
    pub short_description: Option<String>,
    pub long_description: Option<String>,
    pub properties: PropertyBag,
    pub animators: Vec<Animator>,
}

impl ObjectMeta {
    /// Comment or description text attached for diagnostics.
    pub fn has_diagnostics(&self) -> bool {
        self.comment.is_some()
            || self.short_description.is_some()
            || self.long_description.is_some()
    }

    /// True when any animator targets one of `targets` or a sub-channel of one
    /// (`Offset.X`, `TransformMatrix._31`).
    pub fn animates_any(&self, targets: &[&str]) -> bool {
        self.animators
            .iter()
            .any(|a| targets.iter().any(|t| targets_channel(&a.target, t)))
    }
}

fn targets_channel(target: &str, property: &str) -> bool {
    target
        .strip_prefix(property)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('.'))
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StrokeCap {
    #[default]
    Flat,
    Square,
    Round,
    Triangle,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StrokeLineJoin {
    #[default]
    Miter,
    Bevel,
    Round,
    MiterOrBevel,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FillMode {
    #[default]
    Alternate,
    Winding,
}

/// Transform-related properties of a visual.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualProperties {
    pub center_point: Option<Vector3>,
    pub offset: Option<Vector3>,
    pub scale: Option<Vector3>,
    pub rotation_angle_degrees: Option<f32>,
    pub transform_matrix: Option<Matrix4x4>,
    pub size: Option<Vector2>,
    pub opacity: Option<f32>,
    pub is_visible: Option<bool>,
    pub clip: Option<ObjectId>,
}

impl VisualProperties {
    pub fn has_separate_transform(&self) -> bool {
        self.center_point.is_some()
            || self.offset.is_some()
            || self.scale.is_some()
            || self.rotation_angle_degrees.is_some()
    }

    /// Anything other than the transform matrix is set.
    pub fn has_non_matrix_properties(&self) -> bool {
        self.has_separate_transform()
            || self.size.is_some()
            || self.opacity.is_some()
            || self.is_visible.is_some()
            || self.clip.is_some()
    }
}

/// Transform-related properties of a shape.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShapeProperties {
    pub center_point: Option<Vector2>,
    pub offset: Option<Vector2>,
    pub scale: Option<Vector2>,
    pub rotation_angle_degrees: Option<f32>,
    pub transform_matrix: Option<Matrix3x2>,
}

impl ShapeProperties {
    pub fn has_separate_transform(&self) -> bool {
        self.center_point.is_some()
            || self.offset.is_some()
            || self.scale.is_some()
            || self.rotation_angle_degrees.is_some()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerVisual {
    pub meta: ObjectMeta,
    pub visual: VisualProperties,
    pub children: Vec<ObjectId>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShapeVisual {
    pub meta: ObjectMeta,
    pub visual: VisualProperties,
    pub shapes: Vec<ObjectId>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerShape {
    pub meta: ObjectMeta,
    pub shape: ShapeProperties,
    pub shapes: Vec<ObjectId>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrokeProperties {
    pub thickness: Option<f32>,
    pub miter_limit: Option<f32>,
    pub start_cap: Option<StrokeCap>,
    pub end_cap: Option<StrokeCap>,
    pub dash_cap: Option<StrokeCap>,
    pub line_join: Option<StrokeLineJoin>,
    pub dash_offset: Option<f32>,
    pub dash_array: Vec<f32>,
    pub is_non_scaling: Option<bool>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpriteShape {
    pub meta: ObjectMeta,
    pub shape: ShapeProperties,
    pub geometry: Option<ObjectId>,
    pub fill_brush: Option<ObjectId>,
    pub stroke_brush: Option<ObjectId>,
    pub stroke: StrokeProperties,
}

/// Trim properties shared by every composition geometry.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometryTrim {
    pub trim_start: Option<f32>,
    pub trim_end: Option<f32>,
    pub trim_offset: Option<f32>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EllipseGeometry {
    pub meta: ObjectMeta,
    pub trim: GeometryTrim,
    pub center: Option<Vector2>,
    pub radius: Option<Vector2>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RectangleGeometry {
    pub meta: ObjectMeta,
    pub trim: GeometryTrim,
    pub offset: Option<Vector2>,
    pub size: Option<Vector2>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoundedRectangleGeometry {
    pub meta: ObjectMeta,
    pub trim: GeometryTrim,
    pub offset: Option<Vector2>,
    pub size: Option<Vector2>,
    pub corner_radius: Option<Vector2>,
}

/// Composition geometry drawn from a [`CompositionPath`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathGeometry {
    pub meta: ObjectMeta,
    pub trim: GeometryTrim,
    pub path: Option<ObjectId>,
}

/// Wraps a [`Geometry2d`] source so composition geometries and path animations can use it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositionPath {
    pub meta: ObjectMeta,
    pub source: Option<ObjectId>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PathSegment {
    Line { to: Vector2 },
    Cubic { control1: Vector2, control2: Vector2, to: Vector2 },
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathFigure {
    pub start: Vector2,
    pub segments: Vec<PathSegment>,
    pub closed: bool,
}

/// Path-composed 2D geometry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry2dContent {
    Path {
        #[serde(default)]
        fill_mode: Option<FillMode>,
        #[serde(default)]
        figures: Vec<PathFigure>,
    },
    Group {
        #[serde(default)]
        fill_mode: Option<FillMode>,
        geometries: Vec<ObjectId>,
    },
    Transformed {
        source: ObjectId,
        matrix: Matrix3x2,
    },
}

impl Default for Geometry2dContent {
    fn default() -> Self {
        Geometry2dContent::Path {
            fill_mode: None,
            figures: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Geometry2d {
    pub meta: ObjectMeta,
    pub content: Geometry2dContent,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorBrush {
    pub meta: ObjectMeta,
    pub color: Option<Color>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InsetClip {
    pub meta: ObjectMeta,
    pub left_inset: Option<f32>,
    pub top_inset: Option<f32>,
    pub right_inset: Option<f32>,
    pub bottom_inset: Option<f32>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometricClip {
    pub meta: ObjectMeta,
    pub geometry: Option<ObjectId>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinearEasing {
    pub meta: ObjectMeta,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CubicBezierEasing {
    pub meta: ObjectMeta,
    pub control_point1: Vector2,
    pub control_point2: Vector2,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepEasing {
    pub meta: ObjectMeta,
    pub step_count: Option<i32>,
    pub is_initial_step_single_frame: Option<bool>,
    pub is_final_step_single_frame: Option<bool>,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnimationValueKind {
    #[default]
    Scalar,
    Vector2,
    Vector3,
    Vector4,
    Color,
    Path,
    Boolean,
}

impl AnimationValueKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AnimationValueKind::Scalar => "Scalar",
            AnimationValueKind::Vector2 => "Vector2",
            AnimationValueKind::Vector3 => "Vector3",
            AnimationValueKind::Vector4 => "Vector4",
            AnimationValueKind::Color => "Color",
            AnimationValueKind::Path => "Path",
            AnimationValueKind::Boolean => "Boolean",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum KeyFrameValue {
    Scalar(f32),
    Vector2(Vector2),
    Vector3(Vector3),
    Vector4(Vector4),
    Color(Color),
    Boolean(bool),
    Path(ObjectId),
    Expression(String),
}

impl KeyFrameValue {
    /// Whether this value may appear in an animation of `kind`.
    pub fn matches(&self, kind: AnimationValueKind) -> bool {
        matches!(
            (self, kind),
            (KeyFrameValue::Expression(_), _)
                | (KeyFrameValue::Scalar(_), AnimationValueKind::Scalar)
                | (KeyFrameValue::Vector2(_), AnimationValueKind::Vector2)
                | (KeyFrameValue::Vector3(_), AnimationValueKind::Vector3)
                | (KeyFrameValue::Vector4(_), AnimationValueKind::Vector4)
                | (KeyFrameValue::Color(_), AnimationValueKind::Color)
                | (KeyFrameValue::Boolean(_), AnimationValueKind::Boolean)
                | (KeyFrameValue::Path(_), AnimationValueKind::Path)
        )
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KeyFrame {
    pub progress: f32,
    pub value: KeyFrameValue,
    #[serde(default)]
    pub easing: Option<ObjectId>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyFrameAnimation {
    pub meta: ObjectMeta,
    pub kind: AnimationValueKind,
    /// Duration in 100ns ticks.
    pub duration_ticks: i64,
    pub target: Option<String>,
    pub key_frames: Vec<KeyFrame>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReferenceParameter {
    pub name: String,
    pub object: ObjectId,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpressionAnimation {
    pub meta: ObjectMeta,
    pub expression: String,
    pub target: Option<String>,
    pub reference_parameters: Vec<ReferenceParameter>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationController {
    pub meta: ObjectMeta,
    pub paused: bool,
}

/// Standalone property bag; its entries live in `meta.properties`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropertySet {
    pub meta: ObjectMeta,
}

/// Host object this crate does not model.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExternalObject {
    pub meta: ObjectMeta,
    pub type_name: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Object {
    ContainerVisual(ContainerVisual),
    ShapeVisual(ShapeVisual),
    ContainerShape(ContainerShape),
    SpriteShape(SpriteShape),
    EllipseGeometry(EllipseGeometry),
    RectangleGeometry(RectangleGeometry),
    RoundedRectangleGeometry(RoundedRectangleGeometry),
    PathGeometry(PathGeometry),
    Path(CompositionPath),
    Geometry2d(Geometry2d),
    ColorBrush(ColorBrush),
    InsetClip(InsetClip),
    GeometricClip(GeometricClip),
    LinearEasing(LinearEasing),
    CubicBezierEasing(CubicBezierEasing),
    StepEasing(StepEasing),
    KeyFrameAnimation(KeyFrameAnimation),
    ExpressionAnimation(ExpressionAnimation),
    AnimationController(AnimationController),
    PropertySet(PropertySet),
    External(ExternalObject),
}

/// Category tag of an [`Object`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ObjectKind {
    ContainerVisual,
    ShapeVisual,
    ContainerShape,
    SpriteShape,
    EllipseGeometry,
    RectangleGeometry,
    RoundedRectangleGeometry,
    PathGeometry,
    Path,
    Geometry2d,
    ColorBrush,
    InsetClip,
    GeometricClip,
    LinearEasing,
    CubicBezierEasing,
    StepEasing,
    KeyFrameAnimation,
    ExpressionAnimation,
    AnimationController,
    PropertySet,
    External,
}

impl ObjectKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ObjectKind::ContainerVisual => "ContainerVisual",
            ObjectKind::ShapeVisual => "ShapeVisual",
            ObjectKind::ContainerShape => "ContainerShape",
            ObjectKind::SpriteShape => "SpriteShape",
            ObjectKind::EllipseGeometry => "EllipseGeometry",
            ObjectKind::RectangleGeometry => "RectangleGeometry",
            ObjectKind::RoundedRectangleGeometry => "RoundedRectangleGeometry",
            ObjectKind::PathGeometry => "PathGeometry",
            ObjectKind::Path => "Path",
            ObjectKind::Geometry2d => "Geometry",
            ObjectKind::ColorBrush => "ColorBrush",
            ObjectKind::InsetClip => "InsetClip",
            ObjectKind::GeometricClip => "GeometricClip",
            ObjectKind::LinearEasing => "LinearEasingFunction",
            ObjectKind::CubicBezierEasing => "CubicBezierEasingFunction",
            ObjectKind::StepEasing => "StepEasingFunction",
            ObjectKind::KeyFrameAnimation => "KeyFrameAnimation",
            ObjectKind::ExpressionAnimation => "ExpressionAnimation",
            ObjectKind::AnimationController => "AnimationController",
            ObjectKind::PropertySet => "PropertySet",
            ObjectKind::External => "External",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a reference sits inside the object that holds it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Slot {
    Child(usize),
    Clip,
    Geometry,
    FillBrush,
    StrokeBrush,
    Path,
    Source(usize),
    KeyFrameEasing(usize),
    KeyFramePath(usize),
    Parameter(usize),
    Animation(usize),
    Controller(usize),
}

macro_rules! each_variant {
    ($obj:expr, $inner:ident => $body:expr) => {
        match $obj {
            Object::ContainerVisual($inner) => $body,
            Object::ShapeVisual($inner) => $body,
            Object::ContainerShape($inner) => $body,
            Object::SpriteShape($inner) => $body,
            Object::EllipseGeometry($inner) => $body,
            Object::RectangleGeometry($inner) => $body,
            Object::RoundedRectangleGeometry($inner) => $body,
            Object::PathGeometry($inner) => $body,
            Object::Path($inner) => $body,
            Object::Geometry2d($inner) => $body,
            Object::ColorBrush($inner) => $body,
            Object::InsetClip($inner) => $body,
            Object::GeometricClip($inner) => $body,
            Object::LinearEasing($inner) => $body,
            Object::CubicBezierEasing($inner) => $body,
            Object::StepEasing($inner) => $body,
            Object::KeyFrameAnimation($inner) => $body,
            Object::ExpressionAnimation($inner) => $body,
            Object::AnimationController($inner) => $body,
            Object::PropertySet($inner) => $body,
            Object::External($inner) => $body,
        }
    };
}

impl Object {
    pub fn kind(&self) -> ObjectKind {
        match self {
            Object::ContainerVisual(_) => ObjectKind::ContainerVisual,
            Object::ShapeVisual(_) => ObjectKind::ShapeVisual,
            Object::ContainerShape(_) => ObjectKind::ContainerShape,
            Object::SpriteShape(_) => ObjectKind::SpriteShape,
            Object::EllipseGeometry(_) => ObjectKind::EllipseGeometry,
            Object::RectangleGeometry(_) => ObjectKind::RectangleGeometry,
            Object::RoundedRectangleGeometry(_) => ObjectKind::RoundedRectangleGeometry,
            Object::PathGeometry(_) => ObjectKind::PathGeometry,
            Object::Path(_) => ObjectKind::Path,
            Object::Geometry2d(_) => ObjectKind::Geometry2d,
            Object::ColorBrush(_) => ObjectKind::ColorBrush,
            Object::InsetClip(_) => ObjectKind::InsetClip,
            Object::GeometricClip(_) => ObjectKind::GeometricClip,
            Object::LinearEasing(_) => ObjectKind::LinearEasing,
            Object::CubicBezierEasing(_) => ObjectKind::CubicBezierEasing,
            Object::StepEasing(_) => ObjectKind::StepEasing,
            Object::KeyFrameAnimation(_) => ObjectKind::KeyFrameAnimation,
            Object::ExpressionAnimation(_) => ObjectKind::ExpressionAnimation,
            Object::AnimationController(_) => ObjectKind::AnimationController,
            Object::PropertySet(_) => ObjectKind::PropertySet,
            Object::External(_) => ObjectKind::External,
        }
    }

    pub fn meta(&self) -> &ObjectMeta {
        each_variant!(self, inner => &inner.meta)
    }

    pub fn meta_mut(&mut self) -> &mut ObjectMeta {
        each_variant!(self, inner => &mut inner.meta)
    }

    /// Every outgoing reference in a fixed slot order: structural references first,
    /// then animator animations and controllers.
    pub fn references(&self) -> Vec<(Slot, ObjectId)> {
        fn children(out: &mut Vec<(Slot, ObjectId)>, ids: &[ObjectId]) {
            out.extend(ids.iter().enumerate().map(|(i, id)| (Slot::Child(i), *id)));
        }

        let mut out = Vec::new();
        match self {
            Object::ContainerVisual(v) => {
                out.extend(v.visual.clip.map(|c| (Slot::Clip, c)));
                children(&mut out, &v.children);
            }
            Object::ShapeVisual(v) => {
                out.extend(v.visual.clip.map(|c| (Slot::Clip, c)));
                children(&mut out, &v.shapes);
            }
            Object::ContainerShape(s) => children(&mut out, &s.shapes),
            Object::SpriteShape(s) => {
                out.extend(s.geometry.map(|g| (Slot::Geometry, g)));
                out.extend(s.fill_brush.map(|b| (Slot::FillBrush, b)));
                out.extend(s.stroke_brush.map(|b| (Slot::StrokeBrush, b)));
            }
            Object::PathGeometry(g) => out.extend(g.path.map(|p| (Slot::Path, p))),
            Object::Path(p) => out.extend(p.source.map(|s| (Slot::Source(0), s))),
            Object::Geometry2d(g) => match &g.content {
                Geometry2dContent::Path { .. } => {}
                Geometry2dContent::Group { geometries, .. } => out.extend(
                    geometries
                        .iter()
                        .enumerate()
                        .map(|(i, id)| (Slot::Source(i), *id)),
                ),
                Geometry2dContent::Transformed { source, .. } => {
                    out.push((Slot::Source(0), *source))
                }
            },
            Object::GeometricClip(c) => out.extend(c.geometry.map(|g| (Slot::Geometry, g))),
            Object::KeyFrameAnimation(a) => {
                for (i, kf) in a.key_frames.iter().enumerate() {
                    if let KeyFrameValue::Path(p) = kf.value {
                        out.push((Slot::KeyFramePath(i), p));
                    }
                    out.extend(kf.easing.map(|e| (Slot::KeyFrameEasing(i), e)));
                }
            }
            Object::ExpressionAnimation(e) => out.extend(
                e.reference_parameters
                    .iter()
                    .enumerate()
                    .map(|(i, p)| (Slot::Parameter(i), p.object)),
            ),
            Object::EllipseGeometry(_)
            | Object::RectangleGeometry(_)
            | Object::RoundedRectangleGeometry(_)
            | Object::ColorBrush(_)
            | Object::InsetClip(_)
            | Object::LinearEasing(_)
            | Object::CubicBezierEasing(_)
            | Object::StepEasing(_)
            | Object::AnimationController(_)
            | Object::PropertySet(_)
            | Object::External(_) => {}
        }
        for (i, animator) in self.meta().animators.iter().enumerate() {
            out.push((Slot::Animation(i), animator.animation));
            out.extend(animator.controller.map(|c| (Slot::Controller(i), c)));
        }
        out
    }

    /// Ordered child list of shape containers (`ShapeVisual`, `ContainerShape`).
    pub fn shape_children(&self) -> Option<&Vec<ObjectId>> {
        match self {
            Object::ShapeVisual(v) => Some(&v.shapes),
            Object::ContainerShape(s) => Some(&s.shapes),
            _ => None,
        }
    }

    pub fn shape_children_mut(&mut self) -> Option<&mut Vec<ObjectId>> {
        match self {
            Object::ShapeVisual(v) => Some(&mut v.shapes),
            Object::ContainerShape(s) => Some(&mut s.shapes),
            _ => None,
        }
    }

    pub fn is_animation(&self) -> bool {
        matches!(
            self,
            Object::KeyFrameAnimation(_) | Object::ExpressionAnimation(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn references_list_structure_before_animators() {
        let shape = Object::SpriteShape(SpriteShape {
            meta: ObjectMeta {
                animators: vec![Animator {
                    target: "Offset".into(),
                    animation: ObjectId(9),
                    controller: Some(ObjectId(10)),
                }],
                ..Default::default()
            },
            geometry: Some(ObjectId(1)),
            fill_brush: Some(ObjectId(2)),
            stroke_brush: Some(ObjectId(2)),
            ..Default::default()
        });
        assert_eq!(
            shape.references(),
            vec![
                (Slot::Geometry, ObjectId(1)),
                (Slot::FillBrush, ObjectId(2)),
                (Slot::StrokeBrush, ObjectId(2)),
                (Slot::Animation(0), ObjectId(9)),
                (Slot::Controller(0), ObjectId(10)),
            ]
        );
    }

    #[test]
    fn animators_on_sub_channels_count_as_animating() {
        let meta = |target: &str| ObjectMeta {
            animators: vec![Animator {
                target: target.into(),
                animation: ObjectId(0),
                controller: None,
            }],
            ..Default::default()
        };
        let targets = [transform_targets::OFFSET, transform_targets::ROTATION_ANGLE];
        assert!(meta("Offset").animates_any(&targets));
        assert!(meta("Offset.X").animates_any(&targets));
        assert!(!meta("OffsetX").animates_any(&targets));
        assert!(!meta("RotationAngleInDegrees").animates_any(&targets));
        assert!(meta("TransformMatrix._31").animates_any(&transform_targets::ALL));
    }

    #[test]
    fn keyframe_values_match_kind() {
        assert!(KeyFrameValue::Scalar(1.0).matches(AnimationValueKind::Scalar));
        assert!(KeyFrameValue::Expression("x".into()).matches(AnimationValueKind::Color));
        assert!(!KeyFrameValue::Scalar(1.0).matches(AnimationValueKind::Vector2));
    }

    #[test]
    fn object_json_uses_type_tag() {
        let json = r#"{"type":"ColorBrush","color":{"a":255,"r":255,"g":0,"b":0}}"#;
        let obj: Object = serde_json::from_str(json).expect("brush should parse");
        match obj {
            Object::ColorBrush(b) => assert_eq!(b.color, Some(Color::rgb(255, 0, 0))),
            other => panic!("unexpected object {other:?}"),
        }
    }
}
