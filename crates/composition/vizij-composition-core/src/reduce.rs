//! Tree Reducer: structural rewrites on a copied graph.
//!
//! Passes run in a fixed order, each one possibly exposing work for the next:
//!
//! 1. dead shape containers (no children) are dropped from their parents, to a fixed point;
//! 2. separate transform properties are folded into a single matrix where nothing animates
//!    the transform;
//! 3. containers are coalesced: a transform-only container pushes its matrix into its
//!    children, and a container with nothing set is spliced into its parent.
//!
//! Every rewrite keeps the rendered output unchanged. Objects read by an expression
//! animation through a reference parameter are never rewritten, since the expression
//! observes their properties directly. Objects detached by a rewrite stay in the arena
//! but are no longer reachable from the root.

use hashbrown::{HashMap, HashSet};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::ids::ObjectId;
use crate::math::{Matrix3x2, Matrix4x4};
use crate::object::{
    defaults, transform_targets, ContainerShape, ContainerVisual, Object, ObjectMeta,
    ShapeProperties, VisualProperties,
};
use crate::scene::SceneGraph;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReductionStats {
    pub dead_containers_removed: usize,
    pub shape_transforms_folded: usize,
    pub visual_transforms_folded: usize,
    pub transforms_pushed_down: usize,
    pub containers_spliced: usize,
}

impl ReductionStats {
    pub fn total(&self) -> usize {
        self.dead_containers_removed
            + self.shape_transforms_folded
            + self.visual_transforms_folded
            + self.transforms_pushed_down
            + self.containers_spliced
    }
}

/// Run every reduction pass over `graph`.
pub fn reduce(graph: &mut SceneGraph) -> Result<ReductionStats> {
    let mut stats = ReductionStats {
        dead_containers_removed: remove_dead_containers(graph)?,
        ..Default::default()
    };
    let (shapes, visuals) = fold_transforms(graph)?;
    stats.shape_transforms_folded = shapes;
    stats.visual_transforms_folded = visuals;

    loop {
        let pushed = push_down_transforms(graph)?;
        let spliced = splice_empty_containers(graph)?;
        stats.transforms_pushed_down += pushed;
        stats.containers_spliced += spliced;
        if pushed + spliced == 0 {
            break;
        }
    }

    log::debug!("tree reduction: {stats:?}");
    Ok(stats)
}

/// Objects an expression animation reads through a reference parameter.
fn expression_parameters(graph: &SceneGraph) -> HashSet<ObjectId> {
    graph
        .reachable()
        .into_iter()
        .filter_map(|id| match graph.get(id) {
            Some(Object::ExpressionAnimation(e)) => Some(e),
            _ => None,
        })
        .flat_map(|e| e.reference_parameters.iter().map(|p| p.object))
        .collect()
}

/// Metadata that would be lost if the object disappeared.
fn meta_is_bare(meta: &ObjectMeta) -> bool {
    meta.animators.is_empty() && meta.properties.is_empty() && !meta.has_diagnostics()
}

fn is_dead_container(object: &Object) -> bool {
    matches!(object, Object::ContainerShape(c) if c.shapes.is_empty())
}

/// Drop childless shape containers from every shape list. Returns the number of
/// list entries removed.
pub fn remove_dead_containers(graph: &mut SceneGraph) -> Result<usize> {
    let mut removed = 0;
    loop {
        let reachable = graph.reachable();
        let dead: HashSet<ObjectId> = reachable
            .iter()
            .copied()
            .filter(|id| id != &graph.root && graph.get(*id).is_some_and(is_dead_container))
            .collect();
        if dead.is_empty() {
            return Ok(removed);
        }

        let mut round = 0;
        for id in reachable {
            let holds_dead = graph
                .get(id)
                .and_then(Object::shape_children)
                .is_some_and(|children| children.iter().any(|c| dead.contains(c)));
            if !holds_dead {
                continue;
            }
            if let Some(children) = graph.get_mut(id)?.shape_children_mut() {
                let before = children.len();
                children.retain(|c| !dead.contains(c));
                round += before - children.len();
            }
        }
        log::trace!("removed {round} dead container reference(s)");
        if round == 0 {
            return Ok(removed);
        }
        removed += round;
    }
}

/// `T(-c) · S · R · T(c) · T(offset) · M` for a shape.
pub fn shape_transform(s: &ShapeProperties) -> Matrix3x2 {
    let center = s.center_point.unwrap_or(defaults::VECTOR2_ZERO);
    let scale = s.scale.unwrap_or(defaults::VECTOR2_ONE);
    let rotation = s.rotation_angle_degrees.unwrap_or(defaults::ROTATION);
    let offset = s.offset.unwrap_or(defaults::VECTOR2_ZERO);
    let matrix = s.transform_matrix.unwrap_or(defaults::MATRIX3X2);
    Matrix3x2::translation([-center[0], -center[1]])
        .then(&Matrix3x2::scale(scale))
        .then(&Matrix3x2::rotation_degrees(rotation))
        .then(&Matrix3x2::translation(center))
        .then(&Matrix3x2::translation(offset))
        .then(&matrix)
}

/// Same composition as [`shape_transform`] in 3D, rotating about Z.
pub fn visual_transform(v: &VisualProperties) -> Matrix4x4 {
    let center = v.center_point.unwrap_or(defaults::VECTOR3_ZERO);
    let scale = v.scale.unwrap_or(defaults::VECTOR3_ONE);
    let rotation = v.rotation_angle_degrees.unwrap_or(defaults::ROTATION);
    let offset = v.offset.unwrap_or(defaults::VECTOR3_ZERO);
    let matrix = v.transform_matrix.unwrap_or(defaults::MATRIX4X4);
    Matrix4x4::translation([-center[0], -center[1], -center[2]])
        .then(&Matrix4x4::scale(scale))
        .then(&Matrix4x4::rotation_z_degrees(rotation))
        .then(&Matrix4x4::translation(center))
        .then(&Matrix4x4::translation(offset))
        .then(&matrix)
}

fn fold_shape(shape: &mut ShapeProperties) {
    let combined = shape_transform(shape);
    *shape = ShapeProperties {
        transform_matrix: (!combined.is_identity()).then_some(combined),
        ..Default::default()
    };
}

fn fold_visual(visual: &mut VisualProperties) {
    let combined = visual_transform(visual);
    visual.center_point = None;
    visual.offset = None;
    visual.scale = None;
    visual.rotation_angle_degrees = None;
    visual.transform_matrix = (!combined.is_identity()).then_some(combined);
}

/// Fold separate transform properties into the matrix on every shape and visual whose
/// transform is not animated. Returns `(shapes, visuals)` folded.
pub fn fold_transforms(graph: &mut SceneGraph) -> Result<(usize, usize)> {
    let parameters = expression_parameters(graph);
    let mut shapes = 0;
    let mut visuals = 0;
    for id in graph.reachable() {
        if parameters.contains(&id) {
            continue;
        }
        let foldable = graph.get(id).is_some_and(|object| {
            !object.meta().animates_any(&transform_targets::ALL)
                && match object {
                    Object::ContainerShape(s) => s.shape.has_separate_transform(),
                    Object::SpriteShape(s) => s.shape.has_separate_transform(),
                    Object::ContainerVisual(v) => v.visual.has_separate_transform(),
                    Object::ShapeVisual(v) => v.visual.has_separate_transform(),
                    _ => false,
                }
        });
        if !foldable {
            continue;
        }
        match graph.get_mut(id)? {
            Object::ContainerShape(s) => {
                fold_shape(&mut s.shape);
                shapes += 1;
            }
            Object::SpriteShape(s) => {
                fold_shape(&mut s.shape);
                shapes += 1;
            }
            Object::ContainerVisual(v) => {
                fold_visual(&mut v.visual);
                visuals += 1;
            }
            Object::ShapeVisual(v) => {
                fold_visual(&mut v.visual);
                visuals += 1;
            }
            _ => {}
        }
        log::trace!("folded transform of {id}");
    }
    Ok((shapes, visuals))
}

/// Container whose only setting is a transform matrix.
fn transform_only_container(object: &Object) -> Option<(&ContainerShape, Matrix3x2)> {
    match object {
        Object::ContainerShape(c)
            if meta_is_bare(&c.meta) && !c.shape.has_separate_transform() =>
        {
            c.shape.transform_matrix.map(|m| (c, m))
        }
        _ => None,
    }
}

/// Shape that can absorb a parent matrix into its own.
fn accepts_matrix(object: &Object) -> bool {
    match object {
        Object::ContainerShape(c) => {
            !c.meta.animates_any(&transform_targets::ALL) && !c.shape.has_separate_transform()
        }
        Object::SpriteShape(s) => {
            !s.meta.animates_any(&transform_targets::ALL) && !s.shape.has_separate_transform()
        }
        _ => false,
    }
}

fn shape_props_mut(object: &mut Object) -> Option<&mut ShapeProperties> {
    match object {
        Object::ContainerShape(c) => Some(&mut c.shape),
        Object::SpriteShape(s) => Some(&mut s.shape),
        _ => None,
    }
}

/// Push the matrix of transform-only containers into their children. Returns the
/// number of containers emptied of their transform.
pub fn push_down_transforms(graph: &mut SceneGraph) -> Result<usize> {
    let counts = graph.reference_counts();
    let parameters = expression_parameters(graph);
    let single =
        |id: &ObjectId| counts.get(id).copied() == Some(1) && !parameters.contains(id);

    let mut pushed = 0;
    for id in graph.reachable() {
        if id == graph.root || !single(&id) {
            continue;
        }
        let plan = graph.get(id).and_then(transform_only_container).and_then(|(c, m)| {
            let children_ok = c.shapes.iter().all(|child| {
                single(child) && graph.get(*child).is_some_and(accepts_matrix)
            });
            children_ok.then(|| (c.shapes.clone(), m))
        });
        let Some((children, matrix)) = plan else {
            continue;
        };

        for child in children {
            if let Some(shape) = shape_props_mut(graph.get_mut(child)?) {
                let combined = shape
                    .transform_matrix
                    .unwrap_or(defaults::MATRIX3X2)
                    .then(&matrix);
                shape.transform_matrix = (!combined.is_identity()).then_some(combined);
            }
        }
        if let Object::ContainerShape(c) = graph.get_mut(id)? {
            c.shape.transform_matrix = None;
        }
        log::trace!("pushed transform of {id} into its children");
        pushed += 1;
    }
    Ok(pushed)
}

fn is_empty_container_shape(c: &ContainerShape) -> bool {
    meta_is_bare(&c.meta) && c.shape == ShapeProperties::default()
}

fn is_empty_container_visual(v: &ContainerVisual) -> bool {
    meta_is_bare(&v.meta) && v.visual == VisualProperties::default()
}

/// Replace containers with nothing set by their children, in place. Returns the number
/// of containers spliced out.
pub fn splice_empty_containers(graph: &mut SceneGraph) -> Result<usize> {
    let parameters = expression_parameters(graph);
    let mut spliced = 0;
    for parent in graph.reachable() {
        let Some(object) = graph.get(parent) else {
            continue;
        };
        let (children, is_shape_list) = match object {
            Object::ShapeVisual(v) => (&v.shapes, true),
            Object::ContainerShape(c) => (&c.shapes, true),
            Object::ContainerVisual(v) => (&v.children, false),
            _ => continue,
        };

        let mut replacements: HashMap<ObjectId, Vec<ObjectId>> = HashMap::new();
        for child in children.iter().filter(|c| !parameters.contains(*c)) {
            match graph.get(*child) {
                Some(Object::ContainerShape(c))
                    if is_shape_list && is_empty_container_shape(c) =>
                {
                    replacements.insert(*child, c.shapes.clone());
                }
                Some(Object::ContainerVisual(v))
                    if !is_shape_list && is_empty_container_visual(v) =>
                {
                    replacements.insert(*child, v.children.clone());
                }
                _ => {}
            }
        }
        if replacements.is_empty() {
            continue;
        }

        let list = match graph.get_mut(parent)? {
            Object::ShapeVisual(v) => &mut v.shapes,
            Object::ContainerShape(c) => &mut c.shapes,
            Object::ContainerVisual(v) => &mut v.children,
            _ => continue,
        };
        let mut next = Vec::with_capacity(list.len());
        for child in list.drain(..) {
            match replacements.get(&child) {
                Some(grandchildren) => {
                    next.extend_from_slice(grandchildren);
                    spliced += 1;
                }
                None => next.push(child),
            }
        }
        *list = next;
        log::trace!("spliced {} container(s) into {parent}", replacements.len());
    }
    Ok(spliced)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{
        Animator, ExpressionAnimation, ReferenceParameter, ShapeVisual, SpriteShape,
    };

    fn sprite(g: &mut SceneGraph, shape: ShapeProperties) -> ObjectId {
        g.add(Object::SpriteShape(SpriteShape {
            shape,
            ..Default::default()
        }))
    }

    fn container(g: &mut SceneGraph, shapes: Vec<ObjectId>) -> ObjectId {
        g.add(Object::ContainerShape(ContainerShape {
            shapes,
            ..Default::default()
        }))
    }

    fn shape_list(g: &SceneGraph, id: ObjectId) -> Vec<ObjectId> {
        g.get(id)
            .and_then(Object::shape_children)
            .cloned()
            .unwrap_or_default()
    }

    #[test]
    fn it_should_remove_nested_dead_containers() {
        let mut g = SceneGraph::new();
        let inner = container(&mut g, vec![]);
        let middle = container(&mut g, vec![inner]);
        let keep = sprite(&mut g, ShapeProperties::default());
        let root = g.add(Object::ShapeVisual(ShapeVisual {
            shapes: vec![middle, keep],
            ..Default::default()
        }));
        g.set_root(root);

        assert_eq!(remove_dead_containers(&mut g).expect("reduce"), 2);
        assert_eq!(shape_list(&g, root), vec![keep]);
        assert_eq!(remove_dead_containers(&mut g).expect("reduce"), 0);
    }

    #[test]
    fn it_should_fold_static_transforms() {
        let mut g = SceneGraph::new();
        let props = ShapeProperties {
            center_point: Some([5.0, 5.0]),
            scale: Some([2.0, 2.0]),
            offset: Some([1.0, 0.0]),
            ..Default::default()
        };
        let expected = shape_transform(&props);
        let s = sprite(&mut g, props);
        let root = g.add(Object::ShapeVisual(ShapeVisual {
            shapes: vec![s],
            ..Default::default()
        }));
        g.set_root(root);

        assert_eq!(fold_transforms(&mut g).expect("fold"), (1, 0));
        let Some(Object::SpriteShape(folded)) = g.get(s) else {
            panic!("sprite expected");
        };
        assert_eq!(folded.shape.center_point, None);
        assert_eq!(folded.shape.transform_matrix, Some(expected));
        assert_eq!(
            expected.transform_point([5.0, 5.0]),
            [6.0, 5.0],
            "the center is a fixed point of the scale"
        );
    }

    #[test]
    fn it_should_not_fold_animated_transforms() {
        let mut g = SceneGraph::new();
        let anim = g.add(Object::ExpressionAnimation(Default::default()));
        let props = ShapeProperties {
            offset: Some([3.0, 4.0]),
            scale: Some([2.0, 2.0]),
            ..Default::default()
        };
        let s = g.add(Object::SpriteShape(SpriteShape {
            meta: ObjectMeta {
                animators: vec![Animator {
                    target: transform_targets::ROTATION_ANGLE_IN_DEGREES.into(),
                    animation: anim,
                    controller: None,
                }],
                ..Default::default()
            },
            shape: props.clone(),
            ..Default::default()
        }));
        let root = g.add(Object::ShapeVisual(ShapeVisual {
            shapes: vec![s],
            ..Default::default()
        }));
        g.set_root(root);

        assert_eq!(fold_transforms(&mut g).expect("fold"), (0, 0));
        let Some(Object::SpriteShape(kept)) = g.get(s) else {
            panic!("sprite expected");
        };
        assert_eq!(kept.shape, props);
    }

    #[test]
    fn it_should_not_fold_transforms_animated_through_a_sub_channel() {
        let mut g = SceneGraph::new();
        let anim = g.add(Object::ExpressionAnimation(Default::default()));
        let props = ShapeProperties {
            offset: Some([3.0, 4.0]),
            scale: Some([2.0, 2.0]),
            ..Default::default()
        };
        let s = g.add(Object::SpriteShape(SpriteShape {
            meta: ObjectMeta {
                animators: vec![Animator {
                    target: "Offset.X".into(),
                    animation: anim,
                    controller: None,
                }],
                ..Default::default()
            },
            shape: props.clone(),
            ..Default::default()
        }));
        let root = g.add(Object::ShapeVisual(ShapeVisual {
            shapes: vec![s],
            ..Default::default()
        }));
        g.set_root(root);

        let stats = reduce(&mut g).expect("reduce");
        assert_eq!(stats.shape_transforms_folded, 0);
        let Some(Object::SpriteShape(kept)) = g.get(s) else {
            panic!("sprite expected");
        };
        assert_eq!(kept.shape, props);
    }

    /// Sprite `leader` plus a second sprite animated by `leader.Offset`.
    fn leader_scene(g: &mut SceneGraph, leader: ObjectId) -> (ObjectId, ObjectId) {
        let expression = g.add(Object::ExpressionAnimation(ExpressionAnimation {
            expression: "leader.Offset".into(),
            target: Some("Offset".into()),
            reference_parameters: vec![ReferenceParameter {
                name: "leader".into(),
                object: leader,
            }],
            ..Default::default()
        }));
        let follower = g.add(Object::SpriteShape(SpriteShape {
            meta: ObjectMeta {
                animators: vec![Animator {
                    target: "Offset".into(),
                    animation: expression,
                    controller: None,
                }],
                ..Default::default()
            },
            ..Default::default()
        }));
        (expression, follower)
    }

    #[test]
    fn it_should_not_fold_objects_read_by_expressions() {
        let mut g = SceneGraph::new();
        let props = ShapeProperties {
            offset: Some([5.0, 7.0]),
            ..Default::default()
        };
        let leader = sprite(&mut g, props.clone());
        let (_, follower) = leader_scene(&mut g, leader);
        let root = g.add(Object::ShapeVisual(ShapeVisual {
            shapes: vec![leader, follower],
            ..Default::default()
        }));
        g.set_root(root);

        assert_eq!(fold_transforms(&mut g).expect("fold"), (0, 0));
        let Some(Object::SpriteShape(kept)) = g.get(leader) else {
            panic!("sprite expected");
        };
        assert_eq!(kept.shape, props);
    }

    #[test]
    fn it_should_keep_containers_read_by_expressions() {
        let mut g = SceneGraph::new();
        let a = sprite(&mut g, ShapeProperties::default());
        let moved = g.add(Object::ContainerShape(ContainerShape {
            shape: ShapeProperties {
                transform_matrix: Some(Matrix3x2::translation([10.0, 0.0])),
                ..Default::default()
            },
            shapes: vec![a],
            ..Default::default()
        }));
        let b = sprite(&mut g, ShapeProperties::default());
        let empty = container(&mut g, vec![b]);
        let (_, follower) = leader_scene(&mut g, moved);
        let (_, other) = leader_scene(&mut g, empty);
        let root = g.add(Object::ShapeVisual(ShapeVisual {
            shapes: vec![moved, empty, follower, other],
            ..Default::default()
        }));
        g.set_root(root);

        let stats = reduce(&mut g).expect("reduce");
        assert_eq!(stats.transforms_pushed_down, 0);
        assert_eq!(stats.containers_spliced, 0);
        assert_eq!(shape_list(&g, root), vec![moved, empty, follower, other]);
        let Some(Object::SpriteShape(sa)) = g.get(a) else {
            panic!("sprite expected");
        };
        assert_eq!(sa.shape.transform_matrix, None);
    }

    #[test]
    fn it_should_push_matrix_into_children_and_splice() {
        let mut g = SceneGraph::new();
        let a = sprite(
            &mut g,
            ShapeProperties {
                transform_matrix: Some(Matrix3x2::scale([2.0, 2.0])),
                ..Default::default()
            },
        );
        let b = sprite(&mut g, ShapeProperties::default());
        let c = g.add(Object::ContainerShape(ContainerShape {
            shape: ShapeProperties {
                transform_matrix: Some(Matrix3x2::translation([10.0, 0.0])),
                ..Default::default()
            },
            shapes: vec![a, b],
            ..Default::default()
        }));
        let tail = sprite(&mut g, ShapeProperties::default());
        let root = g.add(Object::ShapeVisual(ShapeVisual {
            shapes: vec![c, tail],
            ..Default::default()
        }));
        g.set_root(root);

        let stats = reduce(&mut g).expect("reduce");
        assert_eq!(stats.transforms_pushed_down, 1);
        assert_eq!(stats.containers_spliced, 1);
        assert_eq!(shape_list(&g, root), vec![a, b, tail]);
        let Some(Object::SpriteShape(sa)) = g.get(a) else {
            panic!("sprite expected");
        };
        assert_eq!(
            sa.shape.transform_matrix,
            Some(Matrix3x2::scale([2.0, 2.0]).then(&Matrix3x2::translation([10.0, 0.0])))
        );
        let Some(Object::SpriteShape(sb)) = g.get(b) else {
            panic!("sprite expected");
        };
        assert_eq!(
            sb.shape.transform_matrix,
            Some(Matrix3x2::translation([10.0, 0.0]))
        );
    }

    #[test]
    fn it_should_keep_containers_over_shared_children() {
        let mut g = SceneGraph::new();
        let shared = sprite(&mut g, ShapeProperties::default());
        let c = g.add(Object::ContainerShape(ContainerShape {
            shape: ShapeProperties {
                transform_matrix: Some(Matrix3x2::translation([1.0, 1.0])),
                ..Default::default()
            },
            shapes: vec![shared],
            ..Default::default()
        }));
        let root = g.add(Object::ShapeVisual(ShapeVisual {
            shapes: vec![c, shared],
            ..Default::default()
        }));
        g.set_root(root);

        assert_eq!(push_down_transforms(&mut g).expect("push"), 0);
        assert_eq!(shape_list(&g, root), vec![c, shared]);
    }

    #[test]
    fn it_should_splice_empty_container_visuals() {
        let mut g = SceneGraph::new();
        let leaf = g.add(Object::ShapeVisual(ShapeVisual::default()));
        let inner = g.add(Object::ContainerVisual(ContainerVisual {
            children: vec![leaf],
            ..Default::default()
        }));
        let root = g.add(Object::ContainerVisual(ContainerVisual {
            children: vec![inner],
            ..Default::default()
        }));
        g.set_root(root);

        assert_eq!(splice_empty_containers(&mut g).expect("splice"), 1);
        let Some(Object::ContainerVisual(r)) = g.get(root) else {
            panic!("container expected");
        };
        assert_eq!(r.children, vec![leaf]);
    }
}
