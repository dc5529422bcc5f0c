//! Node Namer: deterministic, readable, unique names for the reachable objects of a graph.
//!
//! A base name is derived from each object's category. Solid color brushes are named
//! after their color and short scalar/color animations after their first and last
//! values. Objects sharing a base name get a zero-padded index sized to the group,
//! assigned in traversal order from 0.

use hashbrown::{HashMap, HashSet};

use crate::ids::ObjectId;
use crate::math::Color;
use crate::object::{AnimationValueKind, KeyFrameAnimation, KeyFrameValue, Object};
use crate::scene::SceneGraph;

const NAMED_COLORS: &[(u32, &str)] = &[
    (0xFF00_0000, "Black"),
    (0xFFFF_FFFF, "White"),
    (0xFFFF_0000, "Red"),
    (0xFF00_8000, "Green"),
    (0xFF00_FF00, "Lime"),
    (0xFF00_00FF, "Blue"),
    (0xFFFF_FF00, "Yellow"),
    (0xFF00_FFFF, "Cyan"),
    (0xFFFF_00FF, "Magenta"),
    (0xFF80_8080, "Gray"),
    (0xFFFF_A500, "Orange"),
    (0x00FF_FFFF, "Transparent"),
];

/// Names keyed by object id, plus the order they were assigned in.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NodeNames {
    names: HashMap<ObjectId, String>,
    order: Vec<ObjectId>,
}

impl NodeNames {
    pub fn get(&self, id: ObjectId) -> Option<&str> {
        self.names.get(&id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// `(id, name)` in traversal order.
    pub fn iter(&self) -> impl Iterator<Item = (ObjectId, &str)> + '_ {
        self.order
            .iter()
            .filter_map(|id| self.names.get(id).map(|n| (*id, n.as_str())))
    }
}

/// Readable name for a color: a well-known name or `AARRGGBB`.
pub fn color_name(color: Color) -> String {
    let argb = color.to_argb_u32();
    NAMED_COLORS
        .iter()
        .find(|(value, _)| *value == argb)
        .map(|(_, name)| (*name).to_string())
        .unwrap_or_else(|| format!("{argb:08X}"))
}

/// Identifier-safe float: at most three decimals, `-` as `m`, `.` as `p`.
pub fn float_fragment(value: f32) -> String {
    let mut text = format!("{value:.3}");
    if text.contains('.') {
        let trimmed = text.trim_end_matches('0').trim_end_matches('.').len();
        text.truncate(trimmed);
    }
    if text == "-0" {
        text = "0".into();
    }
    text.replace('-', "m").replace('.', "p")
}

fn literal_fragment(value: &KeyFrameValue) -> Option<String> {
    match value {
        KeyFrameValue::Scalar(v) => Some(float_fragment(*v)),
        KeyFrameValue::Color(c) => Some(color_name(*c)),
        _ => None,
    }
}

fn animation_base_name(animation: &KeyFrameAnimation) -> String {
    let short = matches!(
        animation.kind,
        AnimationValueKind::Scalar | AnimationValueKind::Color
    ) && (1..=2).contains(&animation.key_frames.len());
    if short {
        let first = animation.key_frames.first().and_then(|kf| literal_fragment(&kf.value));
        let last = animation.key_frames.last().and_then(|kf| literal_fragment(&kf.value));
        if let (Some(first), Some(last)) = (first, last) {
            return format!("{}Animation_{first}_to_{last}", animation.kind.as_str());
        }
    }
    format!("{}KeyFrameAnimation", animation.kind.as_str())
}

/// Category-derived name before disambiguation.
pub fn base_name(object: &Object) -> String {
    match object {
        Object::ColorBrush(brush) => match brush.color {
            Some(color) => format!("ColorBrush_{}", color_name(color)),
            None => "ColorBrush".to_string(),
        },
        Object::KeyFrameAnimation(animation) => animation_base_name(animation),
        other => other.kind().as_str().to_string(),
    }
}

fn digits(mut n: usize) -> usize {
    let mut count = 1;
    while n >= 10 {
        n /= 10;
        count += 1;
    }
    count
}

/// Name every object reachable from the root of `graph`.
pub fn name_nodes(graph: &SceneGraph) -> NodeNames {
    let order = graph.reachable();
    let bases: Vec<String> = order
        .iter()
        .map(|id| graph.get(*id).map(base_name).unwrap_or_default())
        .collect();

    let mut group_sizes: HashMap<&str, usize> = HashMap::new();
    for base in &bases {
        *group_sizes.entry(base.as_str()).or_insert(0) += 1;
    }

    let mut next_index: HashMap<&str, usize> = HashMap::new();
    let mut used: HashSet<String> = HashSet::new();
    let mut names = HashMap::with_capacity(order.len());
    for (id, base) in order.iter().zip(&bases) {
        let size = group_sizes[base.as_str()];
        let mut name = if size > 1 {
            let index = next_index.entry(base.as_str()).or_insert(0);
            let width = digits(size - 1);
            let composed = format!("{base}_{:0width$}", *index);
            *index += 1;
            composed
        } else {
            base.clone()
        };
        while used.contains(&name) {
            name.push_str("_x");
        }
        used.insert(name.clone());
        names.insert(*id, name);
    }

    log::debug!("named {} objects", names.len());
    NodeNames { names, order }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{ColorBrush, KeyFrame, ShapeVisual, SpriteShape};

    #[test]
    fn it_should_format_float_fragments() {
        assert_eq!(float_fragment(0.0), "0");
        assert_eq!(float_fragment(0.5), "0p5");
        assert_eq!(float_fragment(-1.25), "m1p25");
        assert_eq!(float_fragment(100.0), "100");
        assert_eq!(float_fragment(0.12345), "0p123");
        assert_eq!(float_fragment(-0.0), "0");
    }

    #[test]
    fn it_should_name_colors() {
        assert_eq!(color_name(Color::rgb(255, 0, 0)), "Red");
        assert_eq!(color_name(Color::argb(0x80, 0x12, 0x34, 0x56)), "80123456");
    }

    #[test]
    fn it_should_name_short_animations_by_values() {
        let animation = Object::KeyFrameAnimation(KeyFrameAnimation {
            kind: AnimationValueKind::Scalar,
            duration_ticks: 1,
            key_frames: vec![
                KeyFrame {
                    progress: 0.0,
                    value: KeyFrameValue::Scalar(0.0),
                    easing: None,
                },
                KeyFrame {
                    progress: 1.0,
                    value: KeyFrameValue::Scalar(0.5),
                    easing: None,
                },
            ],
            ..Default::default()
        });
        assert_eq!(base_name(&animation), "ScalarAnimation_0_to_0p5");

        let expression = Object::KeyFrameAnimation(KeyFrameAnimation {
            kind: AnimationValueKind::Scalar,
            key_frames: vec![KeyFrame {
                progress: 0.0,
                value: KeyFrameValue::Expression("x".into()),
                easing: None,
            }],
            ..Default::default()
        });
        assert_eq!(base_name(&expression), "ScalarKeyFrameAnimation");
    }

    #[test]
    fn it_should_pad_group_indices() {
        let mut g = SceneGraph::new();
        let brush = g.add(Object::ColorBrush(ColorBrush {
            color: Some(Color::rgb(0, 0, 255)),
            ..Default::default()
        }));
        let sprites: Vec<ObjectId> = (0..11)
            .map(|_| {
                g.add(Object::SpriteShape(SpriteShape {
                    fill_brush: Some(brush),
                    ..Default::default()
                }))
            })
            .collect();
        let root = g.add(Object::ShapeVisual(ShapeVisual {
            shapes: sprites.clone(),
            ..Default::default()
        }));
        g.set_root(root);

        let names = name_nodes(&g);
        assert_eq!(names.get(root), Some("ShapeVisual"));
        assert_eq!(names.get(brush), Some("ColorBrush_Blue"));
        assert_eq!(names.get(sprites[0]), Some("SpriteShape_00"));
        assert_eq!(names.get(sprites[10]), Some("SpriteShape_10"));
        assert_eq!(names.len(), 13);
        let unique: HashSet<&str> = names.iter().map(|(_, n)| n).collect();
        assert_eq!(unique.len(), 13);
    }
}
