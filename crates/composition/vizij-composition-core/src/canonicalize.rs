//! Canonicalizer: common-subexpression elimination over the object DAG.
//!
//! For each value-comparable category a structural key is computed from the object's
//! properties and the canonical identity of every object it references. Objects with
//! equal keys join one group whose representative is the member with the smallest
//! traversal position.
//!
//! Categories are processed in dependency order so the identity of referenced objects
//! is already resolved when a dependent category is keyed:
//!
//! 1. geometry primitives (ellipse, rectangle, rounded rectangle)
//! 2. path-composed geometries (children before parents)
//! 3. path wrappers
//! 4. path geometries
//! 5. easing functions
//! 6. keyframe animations
//! 7. expression animations
//! 8. color brushes
//!
//! The sequence repeats until a round merges nothing, which makes the partition a
//! fixed point: canonicalizing an already canonical graph merges nothing.

use std::collections::BTreeMap;

use hashbrown::hash_map::Entry;
use hashbrown::HashMap;

use crate::config::OptimizerConfig;
use crate::disjoint_set::DisjointSet;
use crate::graph::ObjectGraph;
use crate::ids::ObjectId;
use crate::math::Color;
use crate::object::{
    Animator, Geometry2dContent, GeometryTrim, KeyFrameValue, Object, ObjectKind, ObjectMeta,
    PathSegment,
};

/// Property the single color animation of a mergeable brush must target.
const BRUSH_COLOR_TARGET: &str = "Color";

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum Atom {
    Tag(&'static str),
    Bits(u32),
    Int(i64),
    Text(String),
    Node(usize),
    Flag(bool),
    Unset,
}

type Key = Vec<Atom>;

#[inline]
fn float_bits(v: f32) -> u32 {
    // -0.0 and 0.0 are the same value for rendering purposes.
    if v == 0.0 {
        0
    } else {
        v.to_bits()
    }
}

struct KeyBuilder<'k, 'a> {
    atoms: Key,
    graph: &'k ObjectGraph<'a>,
    sets: &'k mut DisjointSet,
}

impl<'k, 'a> KeyBuilder<'k, 'a> {
    fn new(tag: &'static str, graph: &'k ObjectGraph<'a>, sets: &'k mut DisjointSet) -> Self {
        KeyBuilder {
            atoms: vec![Atom::Tag(tag)],
            graph,
            sets,
        }
    }

    fn tag(&mut self, tag: &'static str) -> &mut Self {
        self.atoms.push(Atom::Tag(tag));
        self
    }

    fn float(&mut self, v: f32) -> &mut Self {
        self.atoms.push(Atom::Bits(float_bits(v)));
        self
    }

    fn floats(&mut self, vs: &[f32]) -> &mut Self {
        self.atoms.push(Atom::Int(vs.len() as i64));
        for v in vs {
            self.float(*v);
        }
        self
    }

    fn opt_float(&mut self, v: Option<f32>) -> &mut Self {
        match v {
            Some(v) => self.float(v),
            None => self.unset(),
        }
    }

    fn opt_floats<const N: usize>(&mut self, v: Option<[f32; N]>) -> &mut Self {
        match v {
            Some(v) => self.floats(&v),
            None => self.unset(),
        }
    }

    fn int(&mut self, v: i64) -> &mut Self {
        self.atoms.push(Atom::Int(v));
        self
    }

    fn opt_int(&mut self, v: Option<i64>) -> &mut Self {
        match v {
            Some(v) => self.int(v),
            None => self.unset(),
        }
    }

    fn flag(&mut self, v: bool) -> &mut Self {
        self.atoms.push(Atom::Flag(v));
        self
    }

    fn opt_flag(&mut self, v: Option<bool>) -> &mut Self {
        match v {
            Some(v) => self.flag(v),
            None => self.unset(),
        }
    }

    fn text(&mut self, v: &str) -> &mut Self {
        self.atoms.push(Atom::Text(v.to_string()));
        self
    }

    fn opt_text(&mut self, v: Option<&str>) -> &mut Self {
        match v {
            Some(v) => self.text(v),
            None => self.unset(),
        }
    }

    fn color(&mut self, c: Color) -> &mut Self {
        self.int(i64::from(c.to_argb_u32()))
    }

    fn unset(&mut self) -> &mut Self {
        self.atoms.push(Atom::Unset);
        self
    }

    /// Canonical identity of a referenced object.
    fn node(&mut self, id: ObjectId) -> &mut Self {
        let atom = match self.graph.position_of(id) {
            Some(pos) => Atom::Node(self.sets.find(pos)),
            None => Atom::Unset,
        };
        self.atoms.push(atom);
        self
    }

    fn opt_node(&mut self, id: Option<ObjectId>) -> &mut Self {
        match id {
            Some(id) => self.node(id),
            None => self.unset(),
        }
    }

    fn trim(&mut self, trim: &GeometryTrim) -> &mut Self {
        self.opt_float(trim.trim_start)
            .opt_float(trim.trim_end)
            .opt_float(trim.trim_offset)
    }

    fn animators(&mut self, animators: &[Animator]) -> &mut Self {
        self.int(animators.len() as i64);
        for animator in animators {
            self.text(&animator.target)
                .node(animator.animation)
                .opt_node(animator.controller);
        }
        self
    }

    fn finish(&mut self) -> Key {
        std::mem::take(&mut self.atoms)
    }
}

/// Groups of categories keyed together, in processing order.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Pass {
    GeometryPrimitives,
    ComposedGeometries,
    Paths,
    PathGeometries,
    Easings,
    KeyFrameAnimations,
    ExpressionAnimations,
    ColorBrushes,
}

const PASSES: [Pass; 8] = [
    Pass::GeometryPrimitives,
    Pass::ComposedGeometries,
    Pass::Paths,
    Pass::PathGeometries,
    Pass::Easings,
    Pass::KeyFrameAnimations,
    Pass::ExpressionAnimations,
    Pass::ColorBrushes,
];

impl Pass {
    fn includes(self, kind: ObjectKind) -> bool {
        match self {
            Pass::GeometryPrimitives => matches!(
                kind,
                ObjectKind::EllipseGeometry
                    | ObjectKind::RectangleGeometry
                    | ObjectKind::RoundedRectangleGeometry
            ),
            Pass::ComposedGeometries => kind == ObjectKind::Geometry2d,
            Pass::Paths => kind == ObjectKind::Path,
            Pass::PathGeometries => kind == ObjectKind::PathGeometry,
            Pass::Easings => matches!(
                kind,
                ObjectKind::LinearEasing | ObjectKind::CubicBezierEasing | ObjectKind::StepEasing
            ),
            Pass::KeyFrameAnimations => kind == ObjectKind::KeyFrameAnimation,
            Pass::ExpressionAnimations => kind == ObjectKind::ExpressionAnimation,
            Pass::ColorBrushes => kind == ObjectKind::ColorBrush,
        }
    }

    /// Composed geometries reference each other, so children must be keyed first.
    fn children_first(self) -> bool {
        self == Pass::ComposedGeometries
    }
}

struct Canonicalizer<'g, 'a> {
    graph: &'g ObjectGraph<'a>,
    config: &'g OptimizerConfig,
    sets: DisjointSet,
    merged: BTreeMap<ObjectKind, usize>,
}

impl<'g, 'a> Canonicalizer<'g, 'a> {
    fn eligible(&self, meta: &ObjectMeta) -> bool {
        meta.properties.is_empty() && (self.config.ignore_comments || !meta.has_diagnostics())
    }

    fn run(&mut self) -> usize {
        let mut rounds = 0;
        loop {
            rounds += 1;
            let merges: usize = PASSES.iter().map(|pass| self.run_pass(*pass)).sum();
            log::trace!("canonicalization round {rounds}: {merges} merges");
            if merges == 0 {
                return rounds;
            }
        }
    }

    fn run_pass(&mut self, pass: Pass) -> usize {
        let order: Vec<usize> = if pass.children_first() {
            self.graph.post_order().to_vec()
        } else {
            (0..self.graph.len()).collect()
        };

        let mut groups: HashMap<Key, usize> = HashMap::new();
        let mut merges = 0;
        for position in order {
            let object = self.graph.object(position);
            if !pass.includes(object.kind()) || !self.eligible(object.meta()) {
                continue;
            }
            let Some(key) = self.key(object) else {
                continue;
            };
            match groups.entry(key) {
                Entry::Occupied(first) => {
                    if self.sets.union(*first.get(), position) {
                        merges += 1;
                        *self.merged.entry(object.kind()).or_insert(0) += 1;
                    }
                }
                Entry::Vacant(slot) => {
                    slot.insert(position);
                }
            }
        }
        merges
    }

    /// Structural key, or `None` when the object must stay distinct.
    fn key(&mut self, object: &Object) -> Option<Key> {
        let kind = object.kind();
        let mut k = KeyBuilder::new(kind.as_str(), self.graph, &mut self.sets);
        match object {
            Object::EllipseGeometry(g) => {
                k.trim(&g.trim).opt_floats(g.center).opt_floats(g.radius);
            }
            Object::RectangleGeometry(g) => {
                k.trim(&g.trim).opt_floats(g.offset).opt_floats(g.size);
            }
            Object::RoundedRectangleGeometry(g) => {
                k.trim(&g.trim)
                    .opt_floats(g.offset)
                    .opt_floats(g.size)
                    .opt_floats(g.corner_radius);
            }
            Object::Geometry2d(g) => match &g.content {
                Geometry2dContent::Path { fill_mode, figures } => {
                    k.tag("path")
                        .opt_int(fill_mode.map(|m| m as i64))
                        .int(figures.len() as i64);
                    for figure in figures {
                        k.floats(&figure.start)
                            .flag(figure.closed)
                            .int(figure.segments.len() as i64);
                        for segment in &figure.segments {
                            match segment {
                                PathSegment::Line { to } => {
                                    k.tag("line").floats(to);
                                }
                                PathSegment::Cubic {
                                    control1,
                                    control2,
                                    to,
                                } => {
                                    k.tag("cubic").floats(control1).floats(control2).floats(to);
                                }
                            }
                        }
                    }
                }
                Geometry2dContent::Group {
                    fill_mode,
                    geometries,
                } => {
                    k.tag("group")
                        .opt_int(fill_mode.map(|m| m as i64))
                        .int(geometries.len() as i64);
                    for id in geometries {
                        k.node(*id);
                    }
                }
                Geometry2dContent::Transformed { source, matrix } => {
                    k.tag("transformed").node(*source).floats(&matrix.0);
                }
            },
            Object::Path(p) => {
                k.opt_node(p.source);
            }
            Object::PathGeometry(g) => {
                k.trim(&g.trim).opt_node(g.path);
            }
            Object::LinearEasing(_) => {}
            Object::CubicBezierEasing(e) => {
                k.floats(&e.control_point1).floats(&e.control_point2);
            }
            Object::StepEasing(e) => {
                k.opt_int(e.step_count.map(i64::from))
                    .opt_flag(e.is_initial_step_single_frame)
                    .opt_flag(e.is_final_step_single_frame);
            }
            Object::KeyFrameAnimation(a) => {
                k.tag(a.kind.as_str())
                    .int(a.duration_ticks)
                    .opt_text(a.target.as_deref())
                    .int(a.key_frames.len() as i64);
                for kf in &a.key_frames {
                    k.float(kf.progress);
                    match &kf.value {
                        KeyFrameValue::Scalar(v) => k.tag("scalar").float(*v),
                        KeyFrameValue::Vector2(v) => k.tag("vector2").floats(v),
                        KeyFrameValue::Vector3(v) => k.tag("vector3").floats(v),
                        KeyFrameValue::Vector4(v) => k.tag("vector4").floats(v),
                        KeyFrameValue::Color(c) => k.tag("color").color(*c),
                        KeyFrameValue::Boolean(b) => k.tag("boolean").flag(*b),
                        KeyFrameValue::Path(p) => k.tag("path").node(*p),
                        KeyFrameValue::Expression(e) => k.tag("expression").text(e),
                    };
                    k.opt_node(kf.easing);
                }
            }
            Object::ExpressionAnimation(e) => {
                k.text(&e.expression)
                    .opt_text(e.target.as_deref())
                    .int(e.reference_parameters.len() as i64);
                for parameter in &e.reference_parameters {
                    k.text(&parameter.name).node(parameter.object);
                }
            }
            Object::ColorBrush(b) => {
                let animators = &b.meta.animators;
                match animators.as_slice() {
                    [] => {}
                    [only] if only.target == BRUSH_COLOR_TARGET => {}
                    _ => return None,
                }
                match b.color {
                    Some(c) => k.color(c),
                    None => k.unset(),
                };
            }
            _ => return None,
        }
        k.animators(&object.meta().animators);
        Some(k.finish())
    }
}

/// Canonical partition of an [`ObjectGraph`].
#[derive(Debug)]
pub struct CanonicalGraph<'a> {
    graph: ObjectGraph<'a>,
    representatives: Vec<usize>,
    merged: BTreeMap<ObjectKind, usize>,
    rounds: usize,
}

/// Partition `graph` into canonical groups.
pub fn canonicalize<'a>(graph: ObjectGraph<'a>, config: &OptimizerConfig) -> CanonicalGraph<'a> {
    let (representatives, merged, rounds) = {
        let mut canon = Canonicalizer {
            graph: &graph,
            config,
            sets: DisjointSet::new(graph.len()),
            merged: BTreeMap::new(),
        };
        let rounds = canon.run();
        (canon.sets.flatten(), canon.merged, rounds)
    };
    for (kind, count) in &merged {
        log::debug!("canonicalized {count} {kind} object(s)");
    }
    CanonicalGraph {
        graph,
        representatives,
        merged,
        rounds,
    }
}

impl<'a> CanonicalGraph<'a> {
    pub fn graph(&self) -> &ObjectGraph<'a> {
        &self.graph
    }

    /// Representative position of the group containing `position`.
    pub fn representative(&self, position: usize) -> usize {
        self.representatives[position]
    }

    /// Representative object of `id`, if `id` is reachable.
    pub fn representative_of(&self, id: ObjectId) -> Option<ObjectId> {
        let position = self.graph.position_of(id)?;
        Some(self.graph.node(self.representative(position)).object)
    }

    pub fn is_representative(&self, position: usize) -> bool {
        self.representatives[position] == position
    }

    /// Number of canonical groups (one per surviving node).
    pub fn canonical_count(&self) -> usize {
        (0..self.representatives.len())
            .filter(|p| self.is_representative(*p))
            .count()
    }

    /// Member count per representative position.
    pub fn group_sizes(&self) -> BTreeMap<usize, usize> {
        let mut sizes = BTreeMap::new();
        for rep in &self.representatives {
            *sizes.entry(*rep).or_insert(0) += 1;
        }
        sizes
    }

    /// Objects absorbed into another group, per category.
    pub fn merged(&self) -> &BTreeMap<ObjectKind, usize> {
        &self.merged
    }

    /// Rounds needed to reach the fixed point (the last round merges nothing).
    pub fn rounds(&self) -> usize {
        self.rounds
    }
}
