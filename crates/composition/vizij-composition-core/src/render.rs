//! Flat render evaluator.
//!
//! Walks a graph from its root at one animation time and reports every visible sprite
//! as a [`LeafSample`] holding its world transform, accumulated opacity, geometry and
//! brush colors. Two graphs that produce equal samples at every time render the same,
//! which is how optimizer rewrites are checked.
//!
//! Keyframe animations are sampled with their easing; expression animations cannot be
//! evaluated here and are reported per leaf as `target=expression` bindings instead.

use serde::Serialize;

use crate::error::{CompositionError, Result};
use crate::ids::ObjectId;
use crate::math::{Color, Matrix3x2, Vector2};
use crate::object::{
    defaults, transform_targets, Animator, FillMode, Geometry2dContent, GeometryTrim,
    KeyFrame, KeyFrameAnimation, KeyFrameValue, Object, ObjectMeta, PathFigure, PathSegment,
    ShapeProperties, VisualProperties,
};
use crate::reduce::{shape_transform, visual_transform};
use crate::scene::SceneGraph;

const STAGE: &str = "render evaluation";

#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum GeometrySample {
    None,
    Ellipse {
        center: Vector2,
        radius: Vector2,
    },
    Rectangle {
        offset: Vector2,
        size: Vector2,
    },
    RoundedRectangle {
        offset: Vector2,
        size: Vector2,
        corner_radius: Vector2,
    },
    /// Figures with every point already in geometry space.
    Path {
        fill_mode: FillMode,
        figures: Vec<PathFigure>,
    },
}

/// One visible sprite at one time.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LeafSample {
    pub transform: Matrix3x2,
    pub opacity: f32,
    pub geometry: GeometrySample,
    /// `[start, end, offset]`.
    pub trim: [f32; 3],
    pub fill: Option<Color>,
    pub stroke: Option<Color>,
    pub stroke_thickness: f32,
    pub expressions: Vec<String>,
}

impl LeafSample {
    /// Equal up to `eps` on transform and opacity, exactly equal elsewhere.
    pub fn approx_eq(&self, other: &LeafSample, eps: f32) -> bool {
        self.transform.approx_eq(&other.transform, eps)
            && (self.opacity - other.opacity).abs() <= eps
            && self.geometry == other.geometry
            && self.trim == other.trim
            && self.fill == other.fill
            && self.stroke == other.stroke
            && self.stroke_thickness == other.stroke_thickness
            && self.expressions == other.expressions
    }
}

/// Evaluate the visible sprites of `graph` at `time_ticks` (100ns units).
pub fn evaluate(graph: &SceneGraph, time_ticks: i64) -> Result<Vec<LeafSample>> {
    let evaluator = Evaluator { graph, time_ticks };
    let mut out = Vec::new();
    evaluator.visit(
        graph.root,
        graph.root,
        &Context {
            world: Matrix3x2::IDENTITY,
            opacity: 1.0,
            expressions: Vec::new(),
        },
        &mut out,
    )?;
    Ok(out)
}

#[derive(Clone)]
struct Context {
    world: Matrix3x2,
    opacity: f32,
    expressions: Vec<String>,
}

struct Evaluator<'g> {
    graph: &'g SceneGraph,
    time_ticks: i64,
}

fn find_segment(key_frames: &[KeyFrame], u: f32) -> (usize, usize, f32) {
    let n = key_frames.len();
    if n <= 1 || u <= key_frames[0].progress {
        return (0, 0, 0.0);
    }
    if u >= key_frames[n - 1].progress {
        return (n - 1, n - 1, 0.0);
    }
    for i in 0..(n - 1) {
        let t0 = key_frames[i].progress;
        let t1 = key_frames[i + 1].progress;
        if u >= t0 && u <= t1 {
            let denom = (t1 - t0).max(f32::EPSILON);
            return (i, i + 1, ((u - t0) / denom).clamp(0.0, 1.0));
        }
    }
    (n - 1, n - 1, 0.0)
}

#[inline]
fn cubic_bezier(p1: f32, p2: f32, t: f32) -> f32 {
    let u = 1.0 - t;
    3.0 * u * u * t * p1 + 3.0 * u * t * t * p2 + t * t * t
}

/// Eased y for input x by bisecting the bezier's x curve.
fn bezier_ease(t: f32, c1: Vector2, c2: Vector2) -> f32 {
    let t = t.clamp(0.0, 1.0);
    let (mut lo, mut hi, mut mid) = (0.0f32, 1.0f32, t);
    for _ in 0..24 {
        let x = cubic_bezier(c1[0], c2[0], mid);
        if (x - t).abs() < 1e-6 {
            break;
        }
        if x < t {
            lo = mid;
        } else {
            hi = mid;
        }
        mid = 0.5 * (lo + hi);
    }
    cubic_bezier(c1[1], c2[1], mid)
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

fn lerp_n<const N: usize>(a: &[f32; N], b: &[f32; N], t: f32) -> [f32; N] {
    let mut out = [0.0; N];
    for i in 0..N {
        out[i] = lerp(a[i], b[i], t);
    }
    out
}

fn interpolate(a: &KeyFrameValue, b: &KeyFrameValue, t: f32) -> Option<KeyFrameValue> {
    let value = match (a, b) {
        (KeyFrameValue::Scalar(a), KeyFrameValue::Scalar(b)) => {
            KeyFrameValue::Scalar(lerp(*a, *b, t))
        }
        (KeyFrameValue::Vector2(a), KeyFrameValue::Vector2(b)) => {
            KeyFrameValue::Vector2(lerp_n(a, b, t))
        }
        (KeyFrameValue::Vector3(a), KeyFrameValue::Vector3(b)) => {
            KeyFrameValue::Vector3(lerp_n(a, b, t))
        }
        (KeyFrameValue::Vector4(a), KeyFrameValue::Vector4(b)) => {
            KeyFrameValue::Vector4(lerp_n(a, b, t))
        }
        (KeyFrameValue::Color(a), KeyFrameValue::Color(b)) => {
            KeyFrameValue::Color(a.lerp(*b, t))
        }
        (KeyFrameValue::Expression(_), _) | (_, KeyFrameValue::Expression(_)) => return None,
        // Booleans and paths hold until the next keyframe.
        (held, _) if t < 1.0 => held.clone(),
        (_, next) => next.clone(),
    };
    Some(value)
}

impl<'g> Evaluator<'g> {
    fn object(&self, from: ObjectId, id: ObjectId) -> Result<&'g Object> {
        self.graph.resolve(from, id)
    }

    fn ease(&self, owner: ObjectId, easing: Option<ObjectId>, t: f32) -> Result<f32> {
        let Some(easing) = easing else {
            return Ok(t);
        };
        Ok(match self.object(owner, easing)? {
            Object::CubicBezierEasing(e) => bezier_ease(t, e.control_point1, e.control_point2),
            Object::StepEasing(e) => {
                let steps = e.step_count.unwrap_or(defaults::STEP_COUNT).max(1) as f32;
                (t * steps).floor() / steps
            }
            _ => t,
        })
    }

    fn sample(
        &self,
        id: ObjectId,
        animation: &KeyFrameAnimation,
    ) -> Result<Option<KeyFrameValue>> {
        let progress = if animation.duration_ticks > 0 {
            self.time_ticks.rem_euclid(animation.duration_ticks) as f32
                / animation.duration_ticks as f32
        } else {
            0.0
        };
        let key_frames = &animation.key_frames;
        if key_frames.is_empty() {
            return Ok(None);
        }
        let (i0, i1, t) = find_segment(key_frames, progress);
        if i0 == i1 {
            return Ok(match &key_frames[i0].value {
                KeyFrameValue::Expression(_) => None,
                value => Some(value.clone()),
            });
        }
        let eased = self.ease(id, key_frames[i1].easing, t)?;
        Ok(interpolate(&key_frames[i0].value, &key_frames[i1].value, eased))
    }

    /// Value of the last animator on `target`, or `None` if unanimated or not evaluable.
    fn animated(
        &self,
        owner: ObjectId,
        meta: &ObjectMeta,
        target: &str,
    ) -> Result<Option<KeyFrameValue>> {
        let Some(animator) = meta.animators.iter().rev().find(|a| a.target == target) else {
            return Ok(None);
        };
        match self.object(owner, animator.animation)? {
            Object::KeyFrameAnimation(a) => self.sample(animator.animation, a),
            _ => Ok(None),
        }
    }

    fn scalar(
        &self,
        owner: ObjectId,
        meta: &ObjectMeta,
        target: &str,
        base: Option<f32>,
    ) -> Result<Option<f32>> {
        Ok(match self.animated(owner, meta, target)? {
            Some(KeyFrameValue::Scalar(v)) => Some(v),
            _ => base,
        })
    }

    fn vector2(
        &self,
        owner: ObjectId,
        meta: &ObjectMeta,
        target: &str,
        base: Option<Vector2>,
    ) -> Result<Option<Vector2>> {
        Ok(match self.animated(owner, meta, target)? {
            Some(KeyFrameValue::Vector2(v)) => Some(v),
            _ => base,
        })
    }

    fn expressions(
        &self,
        owner: ObjectId,
        meta: &ObjectMeta,
        into: &mut Vec<String>,
    ) -> Result<()> {
        for Animator { target, animation, .. } in &meta.animators {
            if let Object::ExpressionAnimation(e) = self.object(owner, *animation)? {
                into.push(format!("{target}={}", e.expression));
            }
        }
        Ok(())
    }

    fn shape_local(
        &self,
        id: ObjectId,
        meta: &ObjectMeta,
        shape: &ShapeProperties,
    ) -> Result<Matrix3x2> {
        let mut props = shape.clone();
        props.center_point =
            self.vector2(id, meta, transform_targets::CENTER_POINT, props.center_point)?;
        props.offset = self.vector2(id, meta, transform_targets::OFFSET, props.offset)?;
        props.scale = self.vector2(id, meta, transform_targets::SCALE, props.scale)?;
        props.rotation_angle_degrees = self.scalar(
            id,
            meta,
            transform_targets::ROTATION_ANGLE_IN_DEGREES,
            props.rotation_angle_degrees,
        )?;
        if let Some(radians) = self.scalar(id, meta, transform_targets::ROTATION_ANGLE, None)? {
            props.rotation_angle_degrees = Some(radians.to_degrees());
        }
        Ok(shape_transform(&props))
    }

    /// Local 2D transform, opacity and visibility of a visual.
    fn visual_local(
        &self,
        id: ObjectId,
        meta: &ObjectMeta,
        visual: &VisualProperties,
    ) -> Result<(Matrix3x2, f32, bool)> {
        let mut props = visual.clone();
        let vector3 = |target: &str, base| -> Result<_> {
            Ok(match self.animated(id, meta, target)? {
                Some(KeyFrameValue::Vector3(v)) => Some(v),
                _ => base,
            })
        };
        props.center_point = vector3(transform_targets::CENTER_POINT, props.center_point)?;
        props.offset = vector3(transform_targets::OFFSET, props.offset)?;
        props.scale = vector3(transform_targets::SCALE, props.scale)?;
        props.rotation_angle_degrees = self.scalar(
            id,
            meta,
            transform_targets::ROTATION_ANGLE_IN_DEGREES,
            props.rotation_angle_degrees,
        )?;
        if let Some(radians) = self.scalar(id, meta, transform_targets::ROTATION_ANGLE, None)? {
            props.rotation_angle_degrees = Some(radians.to_degrees());
        }
        let opacity = self
            .scalar(id, meta, "Opacity", props.opacity)?
            .unwrap_or(defaults::OPACITY);
        let visible = match self.animated(id, meta, "IsVisible")? {
            Some(KeyFrameValue::Boolean(b)) => b,
            _ => props.is_visible.unwrap_or(defaults::IS_VISIBLE),
        };
        Ok((visual_transform(&props).to_matrix3x2(), opacity, visible))
    }

    fn visit(
        &self,
        from: ObjectId,
        id: ObjectId,
        ctx: &Context,
        out: &mut Vec<LeafSample>,
    ) -> Result<()> {
        let object = self.object(from, id)?;
        let mut next = ctx.clone();
        self.expressions(id, object.meta(), &mut next.expressions)?;
        match object {
            Object::ContainerVisual(v) => {
                let (local, opacity, visible) = self.visual_local(id, &v.meta, &v.visual)?;
                if !visible {
                    return Ok(());
                }
                next.world = local.then(&ctx.world);
                next.opacity *= opacity;
                for child in &v.children {
                    self.visit(id, *child, &next, out)?;
                }
            }
            Object::ShapeVisual(v) => {
                let (local, opacity, visible) = self.visual_local(id, &v.meta, &v.visual)?;
                if !visible {
                    return Ok(());
                }
                next.world = local.then(&ctx.world);
                next.opacity *= opacity;
                for shape in &v.shapes {
                    self.visit(id, *shape, &next, out)?;
                }
            }
            Object::ContainerShape(c) => {
                next.world = self.shape_local(id, &c.meta, &c.shape)?.then(&ctx.world);
                for shape in &c.shapes {
                    self.visit(id, *shape, &next, out)?;
                }
            }
            Object::SpriteShape(s) => {
                next.world = self.shape_local(id, &s.meta, &s.shape)?.then(&ctx.world);
                let (geometry, trim) = match s.geometry {
                    Some(g) => self.geometry(id, g, &mut next.expressions)?,
                    None => (
                        GeometrySample::None,
                        [defaults::TRIM_START, defaults::TRIM_END, defaults::TRIM_OFFSET],
                    ),
                };
                let fill = self.brush(id, s.fill_brush, &mut next.expressions)?;
                let stroke = self.brush(id, s.stroke_brush, &mut next.expressions)?;
                let stroke_thickness = self
                    .scalar(id, &s.meta, "StrokeThickness", s.stroke.thickness)?
                    .unwrap_or(defaults::STROKE_THICKNESS);
                out.push(LeafSample {
                    transform: next.world,
                    opacity: next.opacity,
                    geometry,
                    trim,
                    fill,
                    stroke,
                    stroke_thickness,
                    expressions: next.expressions,
                });
            }
            other => {
                return Err(CompositionError::Unsupported {
                    id,
                    type_name: other.kind().to_string(),
                    stage: STAGE,
                })
            }
        }
        Ok(())
    }

    fn brush(
        &self,
        owner: ObjectId,
        brush: Option<ObjectId>,
        expressions: &mut Vec<String>,
    ) -> Result<Option<Color>> {
        let Some(brush) = brush else {
            return Ok(None);
        };
        let object = self.object(owner, brush)?;
        self.expressions(brush, object.meta(), expressions)?;
        Ok(match object {
            Object::ColorBrush(b) => match self.animated(brush, &b.meta, "Color")? {
                Some(KeyFrameValue::Color(c)) => Some(c),
                _ => b.color,
            },
            _ => None,
        })
    }

    fn trim(&self, id: ObjectId, meta: &ObjectMeta, trim: &GeometryTrim) -> Result<[f32; 3]> {
        Ok([
            self.scalar(id, meta, "TrimStart", trim.trim_start)?
                .unwrap_or(defaults::TRIM_START),
            self.scalar(id, meta, "TrimEnd", trim.trim_end)?
                .unwrap_or(defaults::TRIM_END),
            self.scalar(id, meta, "TrimOffset", trim.trim_offset)?
                .unwrap_or(defaults::TRIM_OFFSET),
        ])
    }

    fn geometry(
        &self,
        owner: ObjectId,
        id: ObjectId,
        expressions: &mut Vec<String>,
    ) -> Result<(GeometrySample, [f32; 3])> {
        let object = self.object(owner, id)?;
        self.expressions(id, object.meta(), expressions)?;
        let v2 = |target: &str, base: Option<Vector2>, meta: &ObjectMeta| -> Result<Vector2> {
            Ok(self
                .vector2(id, meta, target, base)?
                .unwrap_or(defaults::VECTOR2_ZERO))
        };
        Ok(match object {
            Object::EllipseGeometry(g) => (
                GeometrySample::Ellipse {
                    center: v2("Center", g.center, &g.meta)?,
                    radius: v2("Radius", g.radius, &g.meta)?,
                },
                self.trim(id, &g.meta, &g.trim)?,
            ),
            Object::RectangleGeometry(g) => (
                GeometrySample::Rectangle {
                    offset: v2("Offset", g.offset, &g.meta)?,
                    size: v2("Size", g.size, &g.meta)?,
                },
                self.trim(id, &g.meta, &g.trim)?,
            ),
            Object::RoundedRectangleGeometry(g) => (
                GeometrySample::RoundedRectangle {
                    offset: v2("Offset", g.offset, &g.meta)?,
                    size: v2("Size", g.size, &g.meta)?,
                    corner_radius: v2("CornerRadius", g.corner_radius, &g.meta)?,
                },
                self.trim(id, &g.meta, &g.trim)?,
            ),
            Object::PathGeometry(g) => {
                let path = match self.animated(id, &g.meta, "Path")? {
                    Some(KeyFrameValue::Path(p)) => Some(p),
                    _ => g.path,
                };
                let sample = match path {
                    Some(p) => self.path(id, p)?,
                    None => GeometrySample::None,
                };
                (sample, self.trim(id, &g.meta, &g.trim)?)
            }
            other => {
                return Err(CompositionError::Unsupported {
                    id,
                    type_name: other.kind().to_string(),
                    stage: STAGE,
                })
            }
        })
    }

    fn path(&self, owner: ObjectId, id: ObjectId) -> Result<GeometrySample> {
        let source = match self.object(owner, id)? {
            Object::Path(p) => p.source,
            Object::Geometry2d(_) => Some(id),
            _ => None,
        };
        let Some(source) = source else {
            return Ok(GeometrySample::None);
        };
        let mut figures = Vec::new();
        let fill_mode = self.flatten(id, source, &Matrix3x2::IDENTITY, &mut figures)?;
        Ok(GeometrySample::Path { fill_mode, figures })
    }

    /// Append the figures of `id` transformed by `matrix`; returns the fill mode.
    fn flatten(
        &self,
        owner: ObjectId,
        id: ObjectId,
        matrix: &Matrix3x2,
        out: &mut Vec<PathFigure>,
    ) -> Result<FillMode> {
        let Object::Geometry2d(g) = self.object(owner, id)? else {
            return Ok(FillMode::default());
        };
        Ok(match &g.content {
            Geometry2dContent::Path { fill_mode, figures } => {
                let p = |v: &Vector2| matrix.transform_point(*v);
                out.extend(figures.iter().map(|f| PathFigure {
                    start: p(&f.start),
                    closed: f.closed,
                    segments: f
                        .segments
                        .iter()
                        .map(|s| match s {
                            PathSegment::Line { to } => PathSegment::Line { to: p(to) },
                            PathSegment::Cubic { control1, control2, to } => PathSegment::Cubic {
                                control1: p(control1),
                                control2: p(control2),
                                to: p(to),
                            },
                        })
                        .collect(),
                }));
                fill_mode.unwrap_or_default()
            }
            Geometry2dContent::Group { fill_mode, geometries } => {
                for child in geometries {
                    self.flatten(id, *child, matrix, out)?;
                }
                fill_mode.unwrap_or_default()
            }
            Geometry2dContent::Transformed { source, matrix: local } => {
                self.flatten(id, *source, &local.then(matrix), out)?
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{
        AnimationValueKind, ColorBrush, ContainerShape, EllipseGeometry, ShapeVisual, SpriteShape,
    };

    fn animated_scene() -> SceneGraph {
        let mut g = SceneGraph::new();
        let anim = g.add(Object::KeyFrameAnimation(KeyFrameAnimation {
            kind: AnimationValueKind::Scalar,
            duration_ticks: 100,
            key_frames: vec![
                KeyFrame {
                    progress: 0.0,
                    value: KeyFrameValue::Scalar(0.0),
                    easing: None,
                },
                KeyFrame {
                    progress: 1.0,
                    value: KeyFrameValue::Scalar(90.0),
                    easing: None,
                },
            ],
            ..Default::default()
        }));
        let ellipse = g.add(Object::EllipseGeometry(EllipseGeometry {
            radius: Some([2.0, 2.0]),
            ..Default::default()
        }));
        let brush = g.add(Object::ColorBrush(ColorBrush {
            color: Some(Color::rgb(255, 0, 0)),
            ..Default::default()
        }));
        let sprite = g.add(Object::SpriteShape(SpriteShape {
            geometry: Some(ellipse),
            fill_brush: Some(brush),
            ..Default::default()
        }));
        let container = g.add(Object::ContainerShape(ContainerShape {
            meta: ObjectMeta {
                animators: vec![Animator {
                    target: transform_targets::ROTATION_ANGLE_IN_DEGREES.into(),
                    animation: anim,
                    controller: None,
                }],
                ..Default::default()
            },
            shape: ShapeProperties {
                offset: Some([10.0, 0.0]),
                ..Default::default()
            },
            shapes: vec![sprite],
        }));
        let root = g.add(Object::ShapeVisual(ShapeVisual {
            shapes: vec![container],
            ..Default::default()
        }));
        g.set_root(root);
        g
    }

    #[test]
    fn it_should_sample_keyframes_at_time() {
        let g = animated_scene();
        let start = evaluate(&g, 0).expect("evaluate");
        assert_eq!(start.len(), 1);
        assert_eq!(start[0].fill, Some(Color::rgb(255, 0, 0)));
        assert_eq!(
            start[0].geometry,
            GeometrySample::Ellipse {
                center: [0.0, 0.0],
                radius: [2.0, 2.0]
            }
        );
        assert!(start[0]
            .transform
            .approx_eq(&Matrix3x2::translation([10.0, 0.0]), 1e-5));

        let half = evaluate(&g, 50).expect("evaluate");
        let expected = Matrix3x2::rotation_degrees(45.0).then(&Matrix3x2::translation([10.0, 0.0]));
        assert!(half[0].transform.approx_eq(&expected, 1e-5));
    }

    #[test]
    fn it_should_ease_with_linear_bezier_identity() {
        assert!((bezier_ease(0.25, [0.0, 0.0], [1.0, 1.0]) - 0.25).abs() < 1e-4);
        assert!(bezier_ease(0.5, [0.42, 0.0], [0.58, 1.0]) > 0.45);
    }
}
