//! Arena holding one composition graph.

use hashbrown::{HashMap, HashSet};
use serde::{Deserialize, Serialize};

use crate::error::{CompositionError, Result};
use crate::ids::{GraphId, ObjectId};
use crate::object::Object;

/// A rooted graph of composition objects.
///
/// Objects refer to each other by [`ObjectId`]; an id referenced from several places is a
/// shared sub-object. Each graph carries a process-unique [`GraphId`] so two graphs can be
/// told apart even when their contents are equal. Cloning allocates a new identity.
#[derive(Debug, Serialize, Deserialize)]
pub struct SceneGraph {
    #[serde(skip)]
    id: GraphId,
    pub root: ObjectId,
    objects: Vec<Object>,
    #[serde(skip)]
    frozen: HashSet<ObjectId>,
}

impl Clone for SceneGraph {
    fn clone(&self) -> Self {
        SceneGraph {
            id: GraphId::next(),
            root: self.root,
            objects: self.objects.clone(),
            frozen: self.frozen.clone(),
        }
    }
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneGraph {
    /// Empty graph. The root must be set once the root object is added.
    pub fn new() -> Self {
        SceneGraph {
            id: GraphId::next(),
            root: ObjectId(0),
            objects: Vec::new(),
            frozen: HashSet::new(),
        }
    }

    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    #[inline]
    pub fn id(&self) -> GraphId {
        self.id
    }

    pub fn add(&mut self, object: Object) -> ObjectId {
        let id = ObjectId(self.objects.len() as u32);
        self.objects.push(object);
        id
    }

    pub fn set_root(&mut self, root: ObjectId) {
        self.root = root;
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn get(&self, id: ObjectId) -> Option<&Object> {
        self.objects.get(id.index())
    }

    /// Like [`get`](Self::get) but reports a dangling reference from `from`.
    pub fn resolve(&self, from: ObjectId, id: ObjectId) -> Result<&Object> {
        self.get(id).ok_or(CompositionError::DanglingReference { from, missing: id })
    }

    /// Mutable access; frozen objects are rejected.
    pub fn get_mut(&mut self, id: ObjectId) -> Result<&mut Object> {
        let frozen = self.frozen.contains(&id);
        match self.objects.get_mut(id.index()) {
            Some(object) if frozen => Err(CompositionError::Frozen {
                id,
                kind: object.kind(),
            }),
            Some(object) => Ok(object),
            None => Err(CompositionError::DanglingReference {
                from: id,
                missing: id,
            }),
        }
    }

    /// Mark `id` immutable so it can be shared by several targets.
    pub fn freeze(&mut self, id: ObjectId) {
        self.frozen.insert(id);
    }

    pub fn is_frozen(&self, id: ObjectId) -> bool {
        self.frozen.contains(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ObjectId, &Object)> {
        self.objects
            .iter()
            .enumerate()
            .map(|(i, o)| (ObjectId(i as u32), o))
    }

    /// Objects reachable from the root, in first-visit pre-order.
    ///
    /// Objects left behind by rewrites are not reachable and are ignored by every
    /// downstream stage.
    pub fn reachable(&self) -> Vec<ObjectId> {
        let mut seen = HashSet::new();
        let mut order = Vec::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            let Some(object) = self.get(id) else {
                continue;
            };
            order.push(id);
            let refs = object.references();
            stack.extend(refs.iter().rev().map(|(_, r)| *r));
        }
        order
    }

    /// Number of incoming references per reachable object, counting every slot.
    pub fn reference_counts(&self) -> HashMap<ObjectId, usize> {
        let mut counts = HashMap::new();
        for id in self.reachable() {
            counts.entry(id).or_insert(0);
            if let Some(object) = self.get(id) {
                for (_, target) in object.references() {
                    *counts.entry(target).or_insert(0) += 1;
                }
            }
        }
        counts
    }

    /// Check that the root and every reference resolve inside this arena.
    pub fn validate(&self) -> Result<()> {
        if self.get(self.root).is_none() {
            return Err(CompositionError::MissingRoot { root: self.root });
        }
        for (id, object) in self.iter() {
            for (_, target) in object.references() {
                self.resolve(id, target)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{ColorBrush, ContainerShape, ObjectKind, ShapeVisual, SpriteShape};

    fn small_graph() -> (SceneGraph, ObjectId) {
        let mut g = SceneGraph::new();
        let brush = g.add(Object::ColorBrush(ColorBrush::default()));
        let a = g.add(Object::SpriteShape(SpriteShape {
            fill_brush: Some(brush),
            ..Default::default()
        }));
        let b = g.add(Object::SpriteShape(SpriteShape {
            fill_brush: Some(brush),
            ..Default::default()
        }));
        let container = g.add(Object::ContainerShape(ContainerShape {
            shapes: vec![a, b],
            ..Default::default()
        }));
        let root = g.add(Object::ShapeVisual(ShapeVisual {
            shapes: vec![container],
            ..Default::default()
        }));
        g.set_root(root);
        (g, brush)
    }

    #[test]
    fn reachable_is_preorder_and_visits_shared_once() {
        let (g, brush) = small_graph();
        let order = g.reachable();
        assert_eq!(order.first(), Some(&g.root));
        assert_eq!(order.len(), 5);
        assert_eq!(order.iter().filter(|id| **id == brush).count(), 1);
        assert_eq!(g.reference_counts()[&brush], 2);
    }

    #[test]
    fn frozen_objects_reject_mutation() {
        let (mut g, brush) = small_graph();
        g.freeze(brush);
        let err = g.get_mut(brush).expect_err("frozen");
        assert_eq!(
            err,
            CompositionError::Frozen {
                id: brush,
                kind: ObjectKind::ColorBrush
            }
        );
    }

    #[test]
    fn clone_gets_new_identity() {
        let (g, _) = small_graph();
        let copy = g.clone();
        assert_ne!(g.id(), copy.id());
        assert_eq!(g.len(), copy.len());
    }

    #[test]
    fn validate_reports_dangling_reference() {
        let mut g = SceneGraph::new();
        let root = g.add(Object::ContainerShape(ContainerShape {
            shapes: vec![ObjectId(42)],
            ..Default::default()
        }));
        g.set_root(root);
        assert!(matches!(
            g.validate(),
            Err(CompositionError::DanglingReference { missing: ObjectId(42), .. })
        ));
    }
}
