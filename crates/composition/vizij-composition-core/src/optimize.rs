//! Graph Copier: materializes the canonical quotient of a graph into a fresh arena.
//!
//! Each canonical group becomes exactly one output object; every reference to any member
//! of a group resolves to that object. Properties equal to their category default are
//! dropped unless [`OptimizerConfig::disable_default_elision`] is set. Animations attached
//! through animators are frozen in the output so they can be shared between targets.
//! With [`OptimizerConfig::ignore_comments`], groups that merged several objects lose
//! their comments and descriptions, since no single member's text describes the group.

use std::collections::BTreeMap;

use hashbrown::HashMap;

use crate::canonicalize::CanonicalGraph;
use crate::config::OptimizerConfig;
use crate::error::{CompositionError, Result};
use crate::ids::ObjectId;
use crate::object::{
    defaults, Animator, AnimationController, ColorBrush, CompositionPath, ContainerShape,
    ContainerVisual, CubicBezierEasing, EllipseGeometry, ExpressionAnimation, FillMode,
    GeometricClip, Geometry2d, Geometry2dContent, GeometryTrim, InsetClip, KeyFrame,
    KeyFrameAnimation, KeyFrameValue, LinearEasing, Object, ObjectMeta, PathGeometry,
    PropertySet, RectangleGeometry, ReferenceParameter, RoundedRectangleGeometry,
    ShapeProperties, ShapeVisual, SpriteShape, StepEasing, StrokeCap, StrokeLineJoin,
    StrokeProperties, VisualProperties,
};
use crate::scene::SceneGraph;

const STAGE: &str = "graph copy";

/// Copies the canonical representatives of a [`CanonicalGraph`] into a new [`SceneGraph`].
pub struct GraphCopier<'c, 'a> {
    canon: &'c CanonicalGraph<'a>,
    config: &'c OptimizerConfig,
    out: SceneGraph,
    /// Representative position -> output id.
    cache: HashMap<usize, ObjectId>,
    /// Representative position -> number of inputs merged into it.
    group_sizes: BTreeMap<usize, usize>,
}

impl<'c, 'a> GraphCopier<'c, 'a> {
    pub fn new(canon: &'c CanonicalGraph<'a>, config: &'c OptimizerConfig) -> Self {
        GraphCopier {
            canon,
            config,
            out: SceneGraph::new(),
            cache: HashMap::new(),
            group_sizes: canon.group_sizes(),
        }
    }

    /// Copy everything reachable from the input root and return the new graph.
    pub fn copy_root(mut self) -> Result<SceneGraph> {
        let input = self.canon.graph().scene();
        let root = self.copy(input.root)?;
        self.out.set_root(root);

        check_disjoint(input, &self.out)?;
        log::debug!(
            "copied {} canonical objects from {} reachable inputs",
            self.out.len(),
            self.canon.graph().len()
        );
        Ok(self.out)
    }

    /// Output id of the canonical representative of `id`, copying it on first use.
    pub fn copy(&mut self, id: ObjectId) -> Result<ObjectId> {
        let position = self.canon.graph().position_of(id).ok_or_else(|| {
            CompositionError::InvariantViolation(format!("object {id} was not indexed"))
        })?;
        let rep = self.canon.representative(position);
        if let Some(copied) = self.cache.get(&rep) {
            return Ok(*copied);
        }

        let rep_id = self.canon.graph().node(rep).object;
        let source = self.canon.graph().object(rep);
        let mut object = self.copy_object(rep_id, source)?;
        let merged = self.group_sizes.get(&rep).is_some_and(|n| *n > 1);
        if merged && self.config.ignore_comments {
            let meta = object.meta_mut();
            meta.comment = None;
            meta.short_description = None;
            meta.long_description = None;
        }
        let new_id = self.out.add(object);
        self.cache.insert(rep, new_id);
        log::trace!("copied {} {} -> {}", source.kind(), rep_id, new_id);
        Ok(new_id)
    }

    fn copy_opt(&mut self, id: Option<ObjectId>) -> Result<Option<ObjectId>> {
        id.map(|id| self.copy(id)).transpose()
    }

    fn copy_all(&mut self, ids: &[ObjectId]) -> Result<Vec<ObjectId>> {
        ids.iter().map(|id| self.copy(*id)).collect()
    }

    /// `None` when `value` equals `default` and elision is enabled.
    fn elide<T: PartialEq>(&self, value: Option<T>, default: T) -> Option<T> {
        match value {
            Some(v) if !self.config.disable_default_elision && v == default => None,
            other => other,
        }
    }

    fn copy_meta(&mut self, meta: &ObjectMeta) -> Result<ObjectMeta> {
        let mut animators = Vec::with_capacity(meta.animators.len());
        for animator in &meta.animators {
            let animation = self.copy(animator.animation)?;
            self.out.freeze(animation);
            let controller = self.copy_opt(animator.controller)?;
            animators.push(Animator {
                target: animator.target.clone(),
                animation,
                controller,
            });
        }
        Ok(ObjectMeta {
            comment: meta.comment.clone(),
            short_description: meta.short_description.clone(),
            long_description: meta.long_description.clone(),
            properties: meta.properties.clone(),
            animators,
        })
    }

    fn copy_visual(&mut self, v: &VisualProperties) -> Result<VisualProperties> {
        Ok(VisualProperties {
            center_point: self.elide(v.center_point, defaults::VECTOR3_ZERO),
            offset: self.elide(v.offset, defaults::VECTOR3_ZERO),
            scale: self.elide(v.scale, defaults::VECTOR3_ONE),
            rotation_angle_degrees: self.elide(v.rotation_angle_degrees, defaults::ROTATION),
            transform_matrix: self.elide(v.transform_matrix, defaults::MATRIX4X4),
            size: self.elide(v.size, defaults::VECTOR2_ZERO),
            opacity: self.elide(v.opacity, defaults::OPACITY),
            is_visible: self.elide(v.is_visible, defaults::IS_VISIBLE),
            clip: self.copy_opt(v.clip)?,
        })
    }

    fn copy_shape(&self, s: &ShapeProperties) -> ShapeProperties {
        ShapeProperties {
            center_point: self.elide(s.center_point, defaults::VECTOR2_ZERO),
            offset: self.elide(s.offset, defaults::VECTOR2_ZERO),
            scale: self.elide(s.scale, defaults::VECTOR2_ONE),
            rotation_angle_degrees: self.elide(s.rotation_angle_degrees, defaults::ROTATION),
            transform_matrix: self.elide(s.transform_matrix, defaults::MATRIX3X2),
        }
    }

    fn copy_stroke(&self, s: &StrokeProperties) -> StrokeProperties {
        StrokeProperties {
            thickness: self.elide(s.thickness, defaults::STROKE_THICKNESS),
            miter_limit: self.elide(s.miter_limit, defaults::STROKE_MITER_LIMIT),
            start_cap: self.elide(s.start_cap, StrokeCap::Flat),
            end_cap: self.elide(s.end_cap, StrokeCap::Flat),
            dash_cap: self.elide(s.dash_cap, StrokeCap::Flat),
            line_join: self.elide(s.line_join, StrokeLineJoin::Miter),
            dash_offset: self.elide(s.dash_offset, defaults::STROKE_DASH_OFFSET),
            dash_array: s.dash_array.clone(),
            is_non_scaling: self.elide(s.is_non_scaling, false),
        }
    }

    fn copy_trim(&self, t: &GeometryTrim) -> GeometryTrim {
        GeometryTrim {
            trim_start: self.elide(t.trim_start, defaults::TRIM_START),
            trim_end: self.elide(t.trim_end, defaults::TRIM_END),
            trim_offset: self.elide(t.trim_offset, defaults::TRIM_OFFSET),
        }
    }

    fn copy_object(&mut self, id: ObjectId, source: &Object) -> Result<Object> {
        let object = match source {
            Object::ContainerVisual(v) => Object::ContainerVisual(ContainerVisual {
                meta: self.copy_meta(&v.meta)?,
                visual: self.copy_visual(&v.visual)?,
                children: self.copy_all(&v.children)?,
            }),
            Object::ShapeVisual(v) => Object::ShapeVisual(ShapeVisual {
                meta: self.copy_meta(&v.meta)?,
                visual: self.copy_visual(&v.visual)?,
                shapes: self.copy_all(&v.shapes)?,
            }),
            Object::ContainerShape(s) => Object::ContainerShape(ContainerShape {
                meta: self.copy_meta(&s.meta)?,
                shape: self.copy_shape(&s.shape),
                shapes: self.copy_all(&s.shapes)?,
            }),
            Object::SpriteShape(s) => Object::SpriteShape(SpriteShape {
                meta: self.copy_meta(&s.meta)?,
                shape: self.copy_shape(&s.shape),
                geometry: self.copy_opt(s.geometry)?,
                fill_brush: self.copy_opt(s.fill_brush)?,
                stroke_brush: self.copy_opt(s.stroke_brush)?,
                stroke: self.copy_stroke(&s.stroke),
            }),
            Object::EllipseGeometry(g) => Object::EllipseGeometry(EllipseGeometry {
                meta: self.copy_meta(&g.meta)?,
                trim: self.copy_trim(&g.trim),
                center: self.elide(g.center, defaults::VECTOR2_ZERO),
                radius: self.elide(g.radius, defaults::VECTOR2_ZERO),
            }),
            Object::RectangleGeometry(g) => Object::RectangleGeometry(RectangleGeometry {
                meta: self.copy_meta(&g.meta)?,
                trim: self.copy_trim(&g.trim),
                offset: self.elide(g.offset, defaults::VECTOR2_ZERO),
                size: self.elide(g.size, defaults::VECTOR2_ZERO),
            }),
            Object::RoundedRectangleGeometry(g) => {
                Object::RoundedRectangleGeometry(RoundedRectangleGeometry {
                    meta: self.copy_meta(&g.meta)?,
                    trim: self.copy_trim(&g.trim),
                    offset: self.elide(g.offset, defaults::VECTOR2_ZERO),
                    size: self.elide(g.size, defaults::VECTOR2_ZERO),
                    corner_radius: self.elide(g.corner_radius, defaults::VECTOR2_ZERO),
                })
            }
            Object::PathGeometry(g) => Object::PathGeometry(PathGeometry {
                meta: self.copy_meta(&g.meta)?,
                trim: self.copy_trim(&g.trim),
                path: self.copy_opt(g.path)?,
            }),
            Object::Path(p) => Object::Path(CompositionPath {
                meta: self.copy_meta(&p.meta)?,
                source: self.copy_opt(p.source)?,
            }),
            Object::Geometry2d(g) => {
                let content = match &g.content {
                    Geometry2dContent::Path { fill_mode, figures } => Geometry2dContent::Path {
                        fill_mode: self.elide(*fill_mode, FillMode::Alternate),
                        figures: figures.clone(),
                    },
                    Geometry2dContent::Group {
                        fill_mode,
                        geometries,
                    } => Geometry2dContent::Group {
                        fill_mode: self.elide(*fill_mode, FillMode::Alternate),
                        geometries: self.copy_all(geometries)?,
                    },
                    Geometry2dContent::Transformed { source, matrix } => {
                        Geometry2dContent::Transformed {
                            source: self.copy(*source)?,
                            matrix: *matrix,
                        }
                    }
                };
                Object::Geometry2d(Geometry2d {
                    meta: self.copy_meta(&g.meta)?,
                    content,
                })
            }
            // Brush color has no elidable default: an unset color is already `None`.
            Object::ColorBrush(b) => Object::ColorBrush(ColorBrush {
                meta: self.copy_meta(&b.meta)?,
                color: b.color,
            }),
            Object::InsetClip(c) => Object::InsetClip(InsetClip {
                meta: self.copy_meta(&c.meta)?,
                left_inset: self.elide(c.left_inset, defaults::INSET),
                top_inset: self.elide(c.top_inset, defaults::INSET),
                right_inset: self.elide(c.right_inset, defaults::INSET),
                bottom_inset: self.elide(c.bottom_inset, defaults::INSET),
            }),
            Object::GeometricClip(c) => Object::GeometricClip(GeometricClip {
                meta: self.copy_meta(&c.meta)?,
                geometry: self.copy_opt(c.geometry)?,
            }),
            Object::LinearEasing(e) => Object::LinearEasing(LinearEasing {
                meta: self.copy_meta(&e.meta)?,
            }),
            Object::CubicBezierEasing(e) => Object::CubicBezierEasing(CubicBezierEasing {
                meta: self.copy_meta(&e.meta)?,
                control_point1: e.control_point1,
                control_point2: e.control_point2,
            }),
            Object::StepEasing(e) => Object::StepEasing(StepEasing {
                meta: self.copy_meta(&e.meta)?,
                step_count: self.elide(e.step_count, defaults::STEP_COUNT),
                is_initial_step_single_frame: self.elide(e.is_initial_step_single_frame, false),
                is_final_step_single_frame: self.elide(e.is_final_step_single_frame, false),
            }),
            Object::KeyFrameAnimation(a) => {
                let mut key_frames = Vec::with_capacity(a.key_frames.len());
                for kf in &a.key_frames {
                    let value = match &kf.value {
                        KeyFrameValue::Path(p) => KeyFrameValue::Path(self.copy(*p)?),
                        other => other.clone(),
                    };
                    key_frames.push(KeyFrame {
                        progress: kf.progress,
                        value,
                        easing: self.copy_opt(kf.easing)?,
                    });
                }
                Object::KeyFrameAnimation(KeyFrameAnimation {
                    meta: self.copy_meta(&a.meta)?,
                    kind: a.kind,
                    duration_ticks: a.duration_ticks,
                    target: a.target.clone(),
                    key_frames,
                })
            }
            Object::ExpressionAnimation(e) => {
                let mut reference_parameters = Vec::with_capacity(e.reference_parameters.len());
                for parameter in &e.reference_parameters {
                    reference_parameters.push(ReferenceParameter {
                        name: parameter.name.clone(),
                        object: self.copy(parameter.object)?,
                    });
                }
                Object::ExpressionAnimation(ExpressionAnimation {
                    meta: self.copy_meta(&e.meta)?,
                    expression: e.expression.clone(),
                    target: e.target.clone(),
                    reference_parameters,
                })
            }
            Object::AnimationController(c) => Object::AnimationController(AnimationController {
                meta: self.copy_meta(&c.meta)?,
                paused: c.paused,
            }),
            Object::PropertySet(p) => Object::PropertySet(PropertySet {
                meta: self.copy_meta(&p.meta)?,
            }),
            Object::External(e) => {
                return Err(CompositionError::Unsupported {
                    id,
                    type_name: e.type_name.clone(),
                    stage: STAGE,
                })
            }
        };
        Ok(object)
    }
}

/// The copy must not share storage with its input and must be self-contained.
fn check_disjoint(input: &SceneGraph, output: &SceneGraph) -> Result<()> {
    debug_assert_ne!(input.id(), output.id(), "copied graph aliases its input");
    if input.id() == output.id() {
        return Err(CompositionError::InvariantViolation(
            "copied graph shares storage with its input".into(),
        ));
    }
    output.validate().map_err(|err| {
        CompositionError::InvariantViolation(format!("copied graph is not self-contained: {err}"))
    })
}

/// Copy the canonical quotient of `canon` into a new graph.
pub fn copy_canonical(canon: &CanonicalGraph<'_>, config: &OptimizerConfig) -> Result<SceneGraph> {
    GraphCopier::new(canon, config).copy_root()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonicalize::canonicalize;
    use crate::graph::ObjectGraph;
    use crate::math::Color;
    use crate::object::{AnimationValueKind, ExternalObject};

    fn run(g: &SceneGraph, config: &OptimizerConfig) -> Result<SceneGraph> {
        let canon = canonicalize(ObjectGraph::build(g)?, config);
        copy_canonical(&canon, config)
    }

    #[test]
    fn it_should_elide_default_properties() {
        let mut g = SceneGraph::new();
        let clip = g.add(Object::InsetClip(InsetClip {
            left_inset: Some(0.0),
            top_inset: Some(0.0),
            right_inset: Some(-0.0),
            bottom_inset: Some(0.0),
            ..Default::default()
        }));
        let root = g.add(Object::ContainerVisual(ContainerVisual {
            visual: VisualProperties {
                scale: Some([1.0, 1.0, 1.0]),
                opacity: Some(0.5),
                clip: Some(clip),
                ..Default::default()
            },
            ..Default::default()
        }));
        g.set_root(root);

        let out = run(&g, &OptimizerConfig::default()).expect("copy");
        let Some(Object::ContainerVisual(v)) = out.get(out.root) else {
            panic!("root should be a container visual");
        };
        assert_eq!(v.visual.scale, None);
        assert_eq!(v.visual.opacity, Some(0.5));
        let clip = v.visual.clip.expect("clip is kept");
        assert_eq!(
            out.get(clip),
            Some(&Object::InsetClip(InsetClip::default()))
        );

        let kept = run(
            &g,
            &OptimizerConfig {
                disable_default_elision: true,
                ..Default::default()
            },
        )
        .expect("copy");
        let Some(Object::ContainerVisual(v)) = kept.get(kept.root) else {
            panic!("root should be a container visual");
        };
        assert_eq!(v.visual.scale, Some([1.0, 1.0, 1.0]));
    }

    #[test]
    fn it_should_drop_comments_of_merged_groups_when_ignoring_comments() {
        let mut g = SceneGraph::new();
        let brush = |g: &mut SceneGraph, rgb: (u8, u8, u8), comment: &str| {
            g.add(Object::ColorBrush(ColorBrush {
                meta: ObjectMeta {
                    comment: Some(comment.into()),
                    ..Default::default()
                },
                color: Some(Color::rgb(rgb.0, rgb.1, rgb.2)),
            }))
        };
        let red_a = brush(&mut g, (255, 0, 0), "accent");
        let red_b = brush(&mut g, (255, 0, 0), "warning");
        let blue = brush(&mut g, (0, 0, 255), "sky");
        let sprites: Vec<ObjectId> = [red_a, red_b, blue]
            .into_iter()
            .map(|b| {
                g.add(Object::SpriteShape(SpriteShape {
                    fill_brush: Some(b),
                    ..Default::default()
                }))
            })
            .collect();
        let root = g.add(Object::ShapeVisual(ShapeVisual {
            shapes: sprites,
            ..Default::default()
        }));
        g.set_root(root);

        let config = OptimizerConfig {
            ignore_comments: true,
            ..Default::default()
        };
        let out = run(&g, &config).expect("copy");
        let mut comments: Vec<Option<String>> = out
            .iter()
            .filter_map(|(_, o)| match o {
                Object::ColorBrush(b) => Some(b.meta.comment.clone()),
                _ => None,
            })
            .collect();
        comments.sort();
        assert_eq!(comments, vec![None, Some("sky".to_string())]);

        let strict = run(&g, &OptimizerConfig::default()).expect("copy");
        let brushes = strict
            .iter()
            .filter(|(_, o)| matches!(o, Object::ColorBrush(b) if b.meta.comment.is_some()))
            .count();
        assert_eq!(brushes, 3);
    }

    #[test]
    fn it_should_share_one_copy_per_group_and_freeze_animations() {
        let mut g = SceneGraph::new();
        let anim = |g: &mut SceneGraph| {
            g.add(Object::KeyFrameAnimation(KeyFrameAnimation {
                kind: AnimationValueKind::Color,
                duration_ticks: 10_000_000,
                key_frames: vec![KeyFrame {
                    progress: 0.0,
                    value: KeyFrameValue::Color(Color::rgb(0, 0, 255)),
                    easing: None,
                }],
                ..Default::default()
            }))
        };
        let a1 = anim(&mut g);
        let a2 = anim(&mut g);
        let controller = g.add(Object::AnimationController(AnimationController {
            paused: true,
            ..Default::default()
        }));
        let brush = |g: &mut SceneGraph, a: ObjectId, c: Option<ObjectId>| {
            g.add(Object::ColorBrush(ColorBrush {
                meta: ObjectMeta {
                    animators: vec![Animator {
                        target: "Color".into(),
                        animation: a,
                        controller: c,
                    }],
                    ..Default::default()
                },
                color: Some(Color::rgb(255, 0, 0)),
            }))
        };
        let b1 = brush(&mut g, a1, None);
        let b2 = brush(&mut g, a2, None);
        let b3 = brush(&mut g, a2, Some(controller));
        let sprites: Vec<ObjectId> = [b1, b2, b3]
            .into_iter()
            .map(|b| {
                g.add(Object::SpriteShape(SpriteShape {
                    fill_brush: Some(b),
                    ..Default::default()
                }))
            })
            .collect();
        let root = g.add(Object::ShapeVisual(ShapeVisual {
            shapes: sprites,
            ..Default::default()
        }));
        g.set_root(root);

        let out = run(&g, &OptimizerConfig::default()).expect("copy");
        let count = |kind| out.iter().filter(|(_, o)| o.kind() == kind).count();
        assert_eq!(count(crate::object::ObjectKind::KeyFrameAnimation), 1);
        // b3 has a controller and stays distinct.
        assert_eq!(count(crate::object::ObjectKind::ColorBrush), 2);
        let (anim_id, _) = out
            .iter()
            .find(|(_, o)| o.is_animation())
            .expect("animation copied");
        assert!(out.is_frozen(anim_id));
        let (_, ctrl) = out
            .iter()
            .find(|(_, o)| matches!(o, Object::AnimationController(_)))
            .expect("controller copied");
        assert_eq!(
            ctrl,
            &Object::AnimationController(AnimationController {
                paused: true,
                ..Default::default()
            })
        );
        assert_ne!(out.id(), g.id());
    }

    #[test]
    fn it_should_reject_unsupported_objects() {
        let mut g = SceneGraph::new();
        let ext = g.add(Object::External(ExternalObject {
            type_name: "RadialGradientBrush".into(),
            ..Default::default()
        }));
        let root = g.add(Object::SpriteShape(SpriteShape {
            fill_brush: Some(ext),
            ..Default::default()
        }));
        g.set_root(root);
        let err = run(&g, &OptimizerConfig::default()).expect_err("unsupported");
        assert_eq!(
            err,
            CompositionError::Unsupported {
                id: ext,
                type_name: "RadialGradientBrush".into(),
                stage: STAGE,
            }
        );
    }
}
