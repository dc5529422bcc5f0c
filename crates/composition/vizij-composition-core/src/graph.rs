//! Graph Builder: indexes an input [`SceneGraph`] once before canonicalization.
//!
//! Every object reachable from the root gets one [`GraphNode`] whose `position` is its
//! first-visit pre-order index. Positions are stable for a given input and are used for
//! deterministic tie-breaking downstream. Incoming references are recorded per node
//! together with the [`Slot`] they occupy in the referencing object.

use hashbrown::HashMap;

use crate::error::{CompositionError, Result};
use crate::ids::ObjectId;
use crate::object::{Object, Slot};
use crate::scene::SceneGraph;

/// One incoming reference: `from` (a traversal position) holds this node in `slot`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct InRef {
    pub from: usize,
    pub slot: Slot,
}

#[derive(Clone, Debug)]
pub struct GraphNode {
    pub object: ObjectId,
    pub position: usize,
    pub in_refs: Vec<InRef>,
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum VisitState {
    InProgress,
    Done,
}

struct Frame {
    id: ObjectId,
    position: usize,
    refs: Vec<(Slot, ObjectId)>,
    next: usize,
}

/// Read-only index over the objects reachable from a graph's root.
#[derive(Debug)]
pub struct ObjectGraph<'a> {
    scene: &'a SceneGraph,
    nodes: Vec<GraphNode>,
    objects: Vec<&'a Object>,
    positions: HashMap<ObjectId, usize>,
    post_order: Vec<usize>,
}

impl<'a> ObjectGraph<'a> {
    /// Traverse `scene` from its root. Fails on a missing root, dangling reference,
    /// keyframe kind mismatch, or cycle.
    pub fn build(scene: &'a SceneGraph) -> Result<Self> {
        let root = scene.root;
        let root_object = scene
            .get(root)
            .ok_or(CompositionError::MissingRoot { root })?;

        let mut graph = ObjectGraph {
            scene,
            nodes: Vec::new(),
            objects: Vec::new(),
            positions: HashMap::new(),
            post_order: Vec::new(),
        };
        let mut state: HashMap<ObjectId, VisitState> = HashMap::new();
        let mut stack = vec![graph.enter(root, root_object, &mut state)?];

        while let Some(frame) = stack.last_mut() {
            if frame.next < frame.refs.len() {
                let (slot, target) = frame.refs[frame.next];
                frame.next += 1;
                let from_id = frame.id;
                let from_pos = frame.position;

                match state.get(&target) {
                    Some(VisitState::InProgress) => {
                        return Err(CompositionError::Cycle {
                            from: from_id,
                            to: target,
                        });
                    }
                    Some(VisitState::Done) => {}
                    None => {
                        let object = scene.resolve(from_id, target)?;
                        let child = graph.enter(target, object, &mut state)?;
                        stack.push(child);
                    }
                }
                let target_pos = graph.positions[&target];
                graph.nodes[target_pos].in_refs.push(InRef {
                    from: from_pos,
                    slot,
                });
            } else if let Some(done) = stack.pop() {
                state.insert(done.id, VisitState::Done);
                graph.post_order.push(done.position);
            }
        }

        log::debug!(
            "built object graph: {} reachable of {} objects",
            graph.nodes.len(),
            scene.len()
        );
        Ok(graph)
    }

    fn enter(
        &mut self,
        id: ObjectId,
        object: &'a Object,
        state: &mut HashMap<ObjectId, VisitState>,
    ) -> Result<Frame> {
        if let Object::KeyFrameAnimation(anim) = object {
            let mismatch = anim
                .key_frames
                .iter()
                .position(|kf| !kf.value.matches(anim.kind));
            if let Some(index) = mismatch {
                return Err(CompositionError::KeyFrameKindMismatch {
                    animation: id,
                    index,
                    expected: anim.kind,
                });
            }
        }
        let position = self.nodes.len();
        self.nodes.push(GraphNode {
            object: id,
            position,
            in_refs: Vec::new(),
        });
        self.objects.push(object);
        self.positions.insert(id, position);
        state.insert(id, VisitState::InProgress);
        Ok(Frame {
            id,
            position,
            refs: object.references(),
            next: 0,
        })
    }

    pub fn scene(&self) -> &'a SceneGraph {
        self.scene
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn node(&self, position: usize) -> &GraphNode {
        &self.nodes[position]
    }

    pub fn position_of(&self, id: ObjectId) -> Option<usize> {
        self.positions.get(&id).copied()
    }

    /// The object at traversal `position`.
    pub fn object(&self, position: usize) -> &'a Object {
        self.objects[position]
    }

    /// Positions ordered children-before-parents.
    pub fn post_order(&self) -> &[usize] {
        &self.post_order
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{
        AnimationValueKind, Animator, ColorBrush, ContainerShape, KeyFrame, KeyFrameAnimation,
        KeyFrameValue, ObjectMeta, ShapeVisual, SpriteShape,
    };

    #[test]
    fn it_should_assign_preorder_positions_and_reverse_edges() {
        let mut g = SceneGraph::new();
        let brush = g.add(Object::ColorBrush(ColorBrush::default()));
        let a = g.add(Object::SpriteShape(SpriteShape {
            fill_brush: Some(brush),
            ..Default::default()
        }));
        let b = g.add(Object::SpriteShape(SpriteShape {
            stroke_brush: Some(brush),
            ..Default::default()
        }));
        let root = g.add(Object::ShapeVisual(ShapeVisual {
            shapes: vec![a, b],
            ..Default::default()
        }));
        g.set_root(root);

        let graph = ObjectGraph::build(&g).expect("graph builds");
        assert_eq!(graph.len(), 4);
        assert_eq!(graph.position_of(root), Some(0));
        assert_eq!(graph.position_of(a), Some(1));
        assert_eq!(graph.position_of(brush), Some(2));
        assert_eq!(graph.position_of(b), Some(3));

        let brush_node = graph.node(2);
        assert_eq!(
            brush_node.in_refs,
            vec![
                InRef { from: 1, slot: Slot::FillBrush },
                InRef { from: 3, slot: Slot::StrokeBrush },
            ]
        );
        // Children finish before their parents.
        assert_eq!(graph.post_order(), &[2, 1, 3, 0]);
    }

    #[test]
    fn it_should_reject_cycles() {
        let mut g = SceneGraph::new();
        let inner = g.add(Object::ContainerShape(ContainerShape {
            shapes: vec![ObjectId(1)],
            ..Default::default()
        }));
        let outer = g.add(Object::ContainerShape(ContainerShape {
            shapes: vec![inner],
            ..Default::default()
        }));
        g.set_root(outer);
        let err = ObjectGraph::build(&g).expect_err("cycle");
        assert_eq!(err, CompositionError::Cycle { from: inner, to: outer });
    }

    #[test]
    fn it_should_reject_mismatched_keyframes() {
        let mut g = SceneGraph::new();
        let anim = g.add(Object::KeyFrameAnimation(KeyFrameAnimation {
            kind: AnimationValueKind::Vector2,
            duration_ticks: 10_000_000,
            key_frames: vec![KeyFrame {
                progress: 0.0,
                value: KeyFrameValue::Scalar(1.0),
                easing: None,
            }],
            ..Default::default()
        }));
        let root = g.add(Object::ContainerShape(ContainerShape {
            meta: ObjectMeta {
                animators: vec![Animator {
                    target: "Offset".into(),
                    animation: anim,
                    controller: None,
                }],
                ..Default::default()
            },
            ..Default::default()
        }));
        g.set_root(root);
        assert!(matches!(
            ObjectGraph::build(&g),
            Err(CompositionError::KeyFrameKindMismatch { index: 0, .. })
        ));
    }

    #[test]
    fn it_should_report_missing_root() {
        let g = SceneGraph::new();
        assert!(matches!(
            ObjectGraph::build(&g),
            Err(CompositionError::MissingRoot { .. })
        ));
    }
}
