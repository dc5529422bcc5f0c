//! Instantiator emission.
//!
//! Every reachable object becomes one factory method, written in post-order so a
//! method only calls methods defined above it. Objects referenced more than once are
//! cached in a field and returned early on later calls; everything else is created
//! inline on each call. Animation controllers have no method of their own: they are
//! replayed in a scope block right after the animation they control is started.

use hashbrown::HashMap;
use serde::Serialize;
use vizij_composition_core::object::{
    AnimationValueKind, FillMode, Geometry2dContent, GeometryTrim, KeyFrameValue, ObjectMeta,
    PathSegment, PropertyValue, ShapeProperties, StrokeCap, StrokeLineJoin, StrokeProperties,
    VisualProperties,
};
use vizij_composition_core::{
    CompositionError, NodeNames, Object, ObjectGraph, ObjectId, SceneGraph,
};

use crate::config::CodegenConfig;
use crate::error::{CodegenError, Result};
use crate::stringify::{Access, ClassKind, Stringifier};
use crate::writer::CodeBuilder;

const STAGE: &str = "code emission";
const COMPOSITOR: &str = "_c";
const RESULT: &str = "result";
const INSTANTIATOR: &str = "Instantiator";

/// One generated factory method.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EmittedNode {
    pub id: ObjectId,
    pub name: String,
    pub type_name: &'static str,
    /// Stored in a field and returned on repeat calls.
    pub cached: bool,
    /// Method body between the cache check and `return`.
    pub statements: Vec<String>,
    pub description: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GeneratedCode {
    pub language: &'static str,
    pub file_extension: &'static str,
    pub text: String,
    /// Methods in emission order; the root comes last.
    pub nodes: Vec<EmittedNode>,
}

impl GeneratedCode {
    pub fn node(&self, name: &str) -> Option<&EmittedNode> {
        self.nodes.iter().find(|n| n.name == name)
    }
}

struct Body {
    type_name: &'static str,
    pre: Vec<String>,
    create: String,
    post: Vec<String>,
}

fn field_name(method: &str) -> String {
    let mut chars = method.chars();
    match chars.next() {
        Some(first) => format!("_{}{}", first.to_ascii_lowercase(), chars.as_str()),
        None => "_".to_string(),
    }
}

fn cap_name(cap: StrokeCap) -> &'static str {
    match cap {
        StrokeCap::Flat => "Flat",
        StrokeCap::Square => "Square",
        StrokeCap::Round => "Round",
        StrokeCap::Triangle => "Triangle",
    }
}

fn line_join_name(join: StrokeLineJoin) -> &'static str {
    match join {
        StrokeLineJoin::Miter => "Miter",
        StrokeLineJoin::Bevel => "Bevel",
        StrokeLineJoin::Round => "Round",
        StrokeLineJoin::MiterOrBevel => "MiterOrBevel",
    }
}

fn fill_mode_name(mode: FillMode) -> &'static str {
    match mode {
        FillMode::Alternate => "Alternate",
        FillMode::Winding => "Winding",
    }
}

fn key_frame_animation_type(kind: AnimationValueKind) -> &'static str {
    match kind {
        AnimationValueKind::Scalar => "ScalarKeyFrameAnimation",
        AnimationValueKind::Vector2 => "Vector2KeyFrameAnimation",
        AnimationValueKind::Vector3 => "Vector3KeyFrameAnimation",
        AnimationValueKind::Vector4 => "Vector4KeyFrameAnimation",
        AnimationValueKind::Color => "ColorKeyFrameAnimation",
        AnimationValueKind::Path => "PathKeyFrameAnimation",
        AnimationValueKind::Boolean => "BooleanKeyFrameAnimation",
    }
}

struct NodeEmitter<'e> {
    graph: &'e SceneGraph,
    names: &'e NodeNames,
    s: &'e dyn Stringifier,
}

impl<'e> NodeEmitter<'e> {
    fn call(&self, id: ObjectId) -> Result<String> {
        let name = self.names.get(id).ok_or(CodegenError::Unnamed(id))?;
        Ok(format!("{name}()"))
    }

    fn member(&self, target: &str, member: &str) -> String {
        format!("{target}{}{member}", self.s.deref())
    }

    fn create(&self, factory: &str, args: &[String]) -> String {
        format!("{}({})", self.member(COMPOSITOR, factory), args.join(", "))
    }

    fn set(&self, out: &mut Vec<String>, member: &str, value: String) {
        out.push(format!("{} = {value};", self.member(RESULT, member)));
    }

    fn set_opt<T: Copy>(
        &self,
        out: &mut Vec<String>,
        member: &str,
        value: Option<T>,
        spell: impl Fn(T) -> String,
    ) {
        if let Some(value) = value {
            self.set(out, member, spell(value));
        }
    }

    fn set_ref(&self, out: &mut Vec<String>, member: &str, id: Option<ObjectId>) -> Result<()> {
        if let Some(id) = id {
            let call = self.call(id)?;
            self.set(out, member, call);
        }
        Ok(())
    }

    fn add(&self, out: &mut Vec<String>, collection: &str, value: String) {
        let target = self.member(RESULT, collection);
        out.push(format!("{}({value});", self.member(&target, self.s.add_verb())));
    }

    fn visual(&self, out: &mut Vec<String>, v: &VisualProperties) -> Result<()> {
        let s = self.s;
        self.set_opt(out, "CenterPoint", v.center_point, |x| s.vector3(x));
        self.set_opt(out, "Offset", v.offset, |x| s.vector3(x));
        self.set_opt(out, "Scale", v.scale, |x| s.vector3(x));
        self.set_opt(out, "RotationAngleInDegrees", v.rotation_angle_degrees, |x| s.float(x));
        self.set_opt(out, "TransformMatrix", v.transform_matrix, |m| s.matrix4x4(&m));
        self.set_opt(out, "Size", v.size, |x| s.vector2(x));
        self.set_opt(out, "Opacity", v.opacity, |x| s.float(x));
        self.set_opt(out, "IsVisible", v.is_visible, |x| s.bool(x).to_string());
        self.set_ref(out, "Clip", v.clip)
    }

    fn shape(&self, out: &mut Vec<String>, p: &ShapeProperties) {
        let s = self.s;
        self.set_opt(out, "CenterPoint", p.center_point, |x| s.vector2(x));
        self.set_opt(out, "Offset", p.offset, |x| s.vector2(x));
        self.set_opt(out, "Scale", p.scale, |x| s.vector2(x));
        self.set_opt(out, "RotationAngleInDegrees", p.rotation_angle_degrees, |x| s.float(x));
        self.set_opt(out, "TransformMatrix", p.transform_matrix, |m| s.matrix3x2(&m));
    }

    fn stroke(&self, out: &mut Vec<String>, p: &StrokeProperties) {
        let s = self.s;
        let cap = |c: StrokeCap| s.enum_value("CompositionStrokeCap", cap_name(c));
        self.set_opt(out, "StrokeThickness", p.thickness, |x| s.float(x));
        self.set_opt(out, "StrokeMiterLimit", p.miter_limit, |x| s.float(x));
        self.set_opt(out, "StrokeStartCap", p.start_cap, cap);
        self.set_opt(out, "StrokeEndCap", p.end_cap, cap);
        self.set_opt(out, "StrokeDashCap", p.dash_cap, cap);
        self.set_opt(out, "StrokeLineJoin", p.line_join, |j| {
            s.enum_value("CompositionStrokeLineJoin", line_join_name(j))
        });
        self.set_opt(out, "StrokeDashOffset", p.dash_offset, |x| s.float(x));
        for dash in &p.dash_array {
            self.add(out, "StrokeDashArray", s.float(*dash));
        }
        self.set_opt(out, "IsStrokeNonScaling", p.is_non_scaling, |x| s.bool(x).to_string());
    }

    fn trim(&self, out: &mut Vec<String>, t: &GeometryTrim) {
        let s = self.s;
        self.set_opt(out, "TrimStart", t.trim_start, |x| s.float(x));
        self.set_opt(out, "TrimEnd", t.trim_end, |x| s.float(x));
        self.set_opt(out, "TrimOffset", t.trim_offset, |x| s.float(x));
    }

    fn property_value(&self, value: &PropertyValue) -> (&'static str, String) {
        let s = self.s;
        match value {
            PropertyValue::Scalar(v) => ("InsertScalar", s.float(*v)),
            PropertyValue::Vector2(v) => ("InsertVector2", s.vector2(*v)),
            PropertyValue::Vector3(v) => ("InsertVector3", s.vector3(*v)),
            PropertyValue::Vector4(v) => ("InsertVector4", s.vector4(*v)),
            PropertyValue::Color(c) => ("InsertColor", s.color(*c)),
            PropertyValue::Boolean(b) => ("InsertBoolean", s.bool(*b).to_string()),
        }
    }

    /// Comment, property bag and animators shared by every composition object.
    fn meta(&self, out: &mut Vec<String>, meta: &ObjectMeta, own_bag: bool) -> Result<()> {
        let s = self.s;
        if let Some(comment) = &meta.comment {
            self.set(out, "Comment", s.string(comment));
        }
        let bag = if own_bag {
            RESULT.to_string()
        } else {
            self.member(RESULT, "Properties")
        };
        for (name, value) in &meta.properties {
            let (insert, literal) = self.property_value(value);
            out.push(format!(
                "{}({}, {literal});",
                self.member(&bag, insert),
                s.string(name)
            ));
        }
        for animator in &meta.animators {
            let target = s.string(&animator.target);
            out.push(format!(
                "{}({target}, {});",
                self.member(RESULT, "StartAnimation"),
                self.call(animator.animation)?
            ));
            let Some(controller) = animator.controller else {
                continue;
            };
            match self.graph.get(controller) {
                Some(Object::AnimationController(c)) if c.paused => {
                    out.push(s.scope_open().to_string());
                    out.push(format!(
                        "    {} controller = {}({target});",
                        s.var(),
                        self.member(RESULT, "TryGetAnimationController")
                    ));
                    out.push(format!("    {}();", self.member("controller", "Pause")));
                    out.push(s.scope_close().to_string());
                }
                Some(Object::AnimationController(_)) => {}
                Some(other) => {
                    return Err(CompositionError::Unsupported {
                        id: controller,
                        type_name: other.kind().to_string(),
                        stage: STAGE,
                    }
                    .into())
                }
                None => {
                    return Err(CompositionError::DanglingReference {
                        from: controller,
                        missing: controller,
                    }
                    .into())
                }
            }
        }
        Ok(())
    }

    fn geometry2d(&self, content: &Geometry2dContent, pre: &mut Vec<String>) -> Result<String> {
        let s = self.s;
        let geometry = |member: &str| format!("CanvasGeometry{}{member}", s.static_access());
        let fill = |mode: Option<FillMode>| {
            s.enum_value(
                "CanvasFilledRegionDetermination",
                fill_mode_name(mode.unwrap_or_default()),
            )
        };
        Ok(match content {
            Geometry2dContent::Path { fill_mode, figures } => {
                pre.push(format!(
                    "{} builder = {};",
                    s.var(),
                    s.new_object("CanvasPathBuilder", &[s.null().to_string()])
                ));
                if let Some(mode) = fill_mode {
                    pre.push(format!(
                        "{}({});",
                        self.member("builder", "SetFilledRegionDetermination"),
                        fill(Some(*mode))
                    ));
                }
                for figure in figures {
                    pre.push(format!(
                        "{}({});",
                        self.member("builder", "BeginFigure"),
                        s.vector2(figure.start)
                    ));
                    for segment in &figure.segments {
                        pre.push(match segment {
                            PathSegment::Line { to } => format!(
                                "{}({});",
                                self.member("builder", "AddLine"),
                                s.vector2(*to)
                            ),
                            PathSegment::Cubic {
                                control1,
                                control2,
                                to,
                            } => format!(
                                "{}({}, {}, {});",
                                self.member("builder", "AddCubicBezier"),
                                s.vector2(*control1),
                                s.vector2(*control2),
                                s.vector2(*to)
                            ),
                        });
                    }
                    let loop_kind = if figure.closed { "Closed" } else { "Open" };
                    pre.push(format!(
                        "{}({});",
                        self.member("builder", "EndFigure"),
                        s.enum_value("CanvasFigureLoop", loop_kind)
                    ));
                }
                format!("{}(builder)", geometry("CreatePath"))
            }
            Geometry2dContent::Group {
                fill_mode,
                geometries,
            } => {
                let items = geometries
                    .iter()
                    .map(|g| self.call(*g))
                    .collect::<Result<Vec<_>>>()?;
                format!(
                    "{}({}, {}, {})",
                    geometry("CreateGroup"),
                    s.null(),
                    s.array("CanvasGeometry", &items),
                    fill(*fill_mode)
                )
            }
            Geometry2dContent::Transformed { source, matrix } => format!(
                "{}({})",
                self.member(&self.call(*source)?, "Transform"),
                s.matrix3x2(matrix)
            ),
        })
    }

    fn body(&self, id: ObjectId, object: &Object) -> Result<Body> {
        let s = self.s;
        let mut pre = Vec::new();
        let mut post = Vec::new();
        let mut own_bag = false;
        let mut composition_object = true;

        let (type_name, create) = match object {
            Object::ContainerVisual(v) => {
                self.visual(&mut post, &v.visual)?;
                for child in &v.children {
                    let children = self.member(RESULT, "Children");
                    post.push(format!(
                        "{}({});",
                        self.member(&children, "InsertAtTop"),
                        self.call(*child)?
                    ));
                }
                ("ContainerVisual", self.create("CreateContainerVisual", &[]))
            }
            Object::ShapeVisual(v) => {
                self.visual(&mut post, &v.visual)?;
                for shape in &v.shapes {
                    self.add(&mut post, "Shapes", self.call(*shape)?);
                }
                ("ShapeVisual", self.create("CreateShapeVisual", &[]))
            }
            Object::ContainerShape(c) => {
                self.shape(&mut post, &c.shape);
                for shape in &c.shapes {
                    self.add(&mut post, "Shapes", self.call(*shape)?);
                }
                (
                    "CompositionContainerShape",
                    self.create("CreateContainerShape", &[]),
                )
            }
            Object::SpriteShape(sprite) => {
                self.shape(&mut post, &sprite.shape);
                self.set_ref(&mut post, "Geometry", sprite.geometry)?;
                self.set_ref(&mut post, "FillBrush", sprite.fill_brush)?;
                self.set_ref(&mut post, "StrokeBrush", sprite.stroke_brush)?;
                self.stroke(&mut post, &sprite.stroke);
                ("CompositionSpriteShape", self.create("CreateSpriteShape", &[]))
            }
            Object::EllipseGeometry(g) => {
                self.set_opt(&mut post, "Center", g.center, |x| s.vector2(x));
                self.set_opt(&mut post, "Radius", g.radius, |x| s.vector2(x));
                self.trim(&mut post, &g.trim);
                (
                    "CompositionEllipseGeometry",
                    self.create("CreateEllipseGeometry", &[]),
                )
            }
            Object::RectangleGeometry(g) => {
                self.set_opt(&mut post, "Offset", g.offset, |x| s.vector2(x));
                self.set_opt(&mut post, "Size", g.size, |x| s.vector2(x));
                self.trim(&mut post, &g.trim);
                (
                    "CompositionRectangleGeometry",
                    self.create("CreateRectangleGeometry", &[]),
                )
            }
            Object::RoundedRectangleGeometry(g) => {
                self.set_opt(&mut post, "Offset", g.offset, |x| s.vector2(x));
                self.set_opt(&mut post, "Size", g.size, |x| s.vector2(x));
                self.set_opt(&mut post, "CornerRadius", g.corner_radius, |x| s.vector2(x));
                self.trim(&mut post, &g.trim);
                (
                    "CompositionRoundedRectangleGeometry",
                    self.create("CreateRoundedRectangleGeometry", &[]),
                )
            }
            Object::PathGeometry(g) => {
                self.trim(&mut post, &g.trim);
                let args = match g.path {
                    Some(path) => vec![self.call(path)?],
                    None => Vec::new(),
                };
                (
                    "CompositionPathGeometry",
                    self.create("CreatePathGeometry", &args),
                )
            }
            Object::Path(p) => {
                composition_object = false;
                let source = match p.source {
                    Some(source) => s.geometry_source(&self.call(source)?),
                    None => s.null().to_string(),
                };
                ("CompositionPath", s.new_object("CompositionPath", &[source]))
            }
            Object::Geometry2d(g) => {
                composition_object = false;
                ("CanvasGeometry", self.geometry2d(&g.content, &mut pre)?)
            }
            Object::ColorBrush(b) => {
                let args: Vec<String> = b.color.map(|c| s.color(c)).into_iter().collect();
                ("CompositionColorBrush", self.create("CreateColorBrush", &args))
            }
            Object::InsetClip(c) => {
                self.set_opt(&mut post, "LeftInset", c.left_inset, |x| s.float(x));
                self.set_opt(&mut post, "TopInset", c.top_inset, |x| s.float(x));
                self.set_opt(&mut post, "RightInset", c.right_inset, |x| s.float(x));
                self.set_opt(&mut post, "BottomInset", c.bottom_inset, |x| s.float(x));
                ("InsetClip", self.create("CreateInsetClip", &[]))
            }
            Object::GeometricClip(c) => {
                let args = match c.geometry {
                    Some(geometry) => vec![self.call(geometry)?],
                    None => Vec::new(),
                };
                (
                    "CompositionGeometricClip",
                    self.create("CreateGeometricClip", &args),
                )
            }
            Object::LinearEasing(_) => (
                "LinearEasingFunction",
                self.create("CreateLinearEasingFunction", &[]),
            ),
            Object::CubicBezierEasing(e) => (
                "CubicBezierEasingFunction",
                self.create(
                    "CreateCubicBezierEasingFunction",
                    &[s.vector2(e.control_point1), s.vector2(e.control_point2)],
                ),
            ),
            Object::StepEasing(e) => {
                self.set_opt(&mut post, "StepCount", e.step_count, |x| s.int(i64::from(x)));
                self.set_opt(
                    &mut post,
                    "IsInitialStepSingleFrame",
                    e.is_initial_step_single_frame,
                    |x| s.bool(x).to_string(),
                );
                self.set_opt(
                    &mut post,
                    "IsFinalStepSingleFrame",
                    e.is_final_step_single_frame,
                    |x| s.bool(x).to_string(),
                );
                ("StepEasingFunction", self.create("CreateStepEasingFunction", &[]))
            }
            Object::KeyFrameAnimation(a) => {
                let type_name = key_frame_animation_type(a.kind);
                self.set(&mut post, "Duration", s.time_span(a.duration_ticks));
                if let Some(target) = &a.target {
                    self.set(&mut post, "Target", s.string(target));
                }
                for kf in &a.key_frames {
                    let (insert, value) = match &kf.value {
                        KeyFrameValue::Expression(e) => ("InsertExpressionKeyFrame", s.string(e)),
                        KeyFrameValue::Scalar(v) => ("InsertKeyFrame", s.float(*v)),
                        KeyFrameValue::Vector2(v) => ("InsertKeyFrame", s.vector2(*v)),
                        KeyFrameValue::Vector3(v) => ("InsertKeyFrame", s.vector3(*v)),
                        KeyFrameValue::Vector4(v) => ("InsertKeyFrame", s.vector4(*v)),
                        KeyFrameValue::Color(c) => ("InsertKeyFrame", s.color(*c)),
                        KeyFrameValue::Boolean(b) => ("InsertKeyFrame", s.bool(*b).to_string()),
                        KeyFrameValue::Path(p) => ("InsertKeyFrame", self.call(*p)?),
                    };
                    let mut args = vec![s.float(kf.progress), value];
                    if let Some(easing) = kf.easing {
                        args.push(self.call(easing)?);
                    }
                    post.push(format!(
                        "{}({});",
                        self.member(RESULT, insert),
                        args.join(", ")
                    ));
                }
                (type_name, self.create(&format!("Create{type_name}"), &[]))
            }
            Object::ExpressionAnimation(e) => {
                if let Some(target) = &e.target {
                    self.set(&mut post, "Target", s.string(target));
                }
                for parameter in &e.reference_parameters {
                    post.push(format!(
                        "{}({}, {});",
                        self.member(RESULT, "SetReferenceParameter"),
                        s.string(&parameter.name),
                        self.call(parameter.object)?
                    ));
                }
                (
                    "ExpressionAnimation",
                    self.create("CreateExpressionAnimation", &[s.string(&e.expression)]),
                )
            }
            Object::PropertySet(_) => {
                own_bag = true;
                ("CompositionPropertySet", self.create("CreatePropertySet", &[]))
            }
            Object::AnimationController(_) | Object::External(_) => {
                let type_name = match object {
                    Object::External(e) => e.type_name.clone(),
                    other => other.kind().to_string(),
                };
                return Err(CompositionError::Unsupported {
                    id,
                    type_name,
                    stage: STAGE,
                }
                .into());
            }
        };

        if composition_object {
            self.meta(&mut post, object.meta(), own_bag)?;
        } else if *object.meta() != ObjectMeta::default() {
            return Err(CompositionError::Unsupported {
                id,
                type_name: format!("{} with metadata", object.kind()),
                stage: STAGE,
            }
            .into());
        }

        Ok(Body {
            type_name,
            pre,
            create,
            post,
        })
    }
}

/// Write the instantiator source for `graph` using precomputed `names`.
pub fn emit(
    graph: &SceneGraph,
    names: &NodeNames,
    config: &CodegenConfig,
    stringifier: &dyn Stringifier,
) -> Result<GeneratedCode> {
    let index = ObjectGraph::build(graph)?;
    let counts: HashMap<ObjectId, usize> = graph.reference_counts();
    let emitter = NodeEmitter {
        graph,
        names,
        s: stringifier,
    };

    let mut nodes = Vec::with_capacity(index.len());
    for &position in index.post_order() {
        let id = index.node(position).object;
        let object = index.object(position);
        if matches!(object, Object::AnimationController(_)) && id != graph.root {
            continue;
        }
        let name = names.get(id).ok_or(CodegenError::Unnamed(id))?.to_string();
        let cached = counts.get(&id).copied().unwrap_or(0) > 1;
        let body = emitter.body(id, object)?;

        let assign = if cached {
            format!("{} = ", field_name(&name))
        } else {
            String::new()
        };
        let mut statements = body.pre;
        statements.push(format!(
            "{} {RESULT} = {assign}{};",
            stringifier.var(),
            body.create
        ));
        statements.extend(body.post);

        let meta = object.meta();
        nodes.push(EmittedNode {
            id,
            name,
            type_name: body.type_name,
            cached,
            statements,
            description: meta
                .long_description
                .clone()
                .or_else(|| meta.short_description.clone()),
        });
    }

    let root_name = names
        .get(graph.root)
        .ok_or(CodegenError::Unnamed(graph.root))?;
    let text = write_source(config, stringifier, &nodes, root_name)?;
    log::debug!(
        "emitted {} {} methods ({} cached)",
        nodes.len(),
        stringifier.language(),
        nodes.iter().filter(|n| n.cached).count()
    );

    Ok(GeneratedCode {
        language: stringifier.language(),
        file_extension: stringifier.file_extension(),
        text,
        nodes,
    })
}

fn write_source(
    config: &CodegenConfig,
    s: &dyn Stringifier,
    nodes: &[EmittedNode],
    root_name: &str,
) -> Result<String> {
    let mut b = CodeBuilder::new();
    if let Some(header) = &config.header_comment {
        for line in header.lines() {
            b.line(s.comment(line))?;
        }
        b.blank()?;
    }
    b.lines(s.preamble(config))?;
    b.blank()?;
    b.line(s.namespace(&config.namespace))?;
    b.open(s.scope_open())?;

    if let Some(adapter) = s.adapter_block() {
        b.lines(adapter.lines())?;
        b.blank()?;
    }
    if !s.nests_instantiator() {
        write_instantiator(&mut b, s, nodes, root_name)?;
        b.blank()?;
    }

    b.line(s.class_declaration(&config.class_name, ClassKind::Entry))?;
    b.open(s.scope_open())?;
    if let Some(label) = s.access_section(Access::Public) {
        b.label(label)?;
    }
    b.line(format!(
        "{}static {} TryCreate({})",
        s.member_modifier(Access::Public),
        s.reference_type("Visual"),
        s.parameter("Compositor", "compositor")
    ))?;
    b.open(s.scope_open())?;
    b.lines(s.try_create_body("compositor"))?;
    b.close(s.scope_close())?;
    if s.nests_instantiator() {
        b.blank()?;
        write_instantiator(&mut b, s, nodes, root_name)?;
    }
    b.close(s.class_end())?;
    b.close(s.scope_close())?;
    Ok(b.finish())
}

fn write_instantiator(
    b: &mut CodeBuilder,
    s: &dyn Stringifier,
    nodes: &[EmittedNode],
    root_name: &str,
) -> Result<()> {
    let cached: Vec<&EmittedNode> = nodes.iter().filter(|n| n.cached).collect();

    b.line(s.class_declaration(INSTANTIATOR, ClassKind::Instantiator))?;
    b.open(s.scope_open())?;
    b.line(s.field("Compositor", COMPOSITOR, true))?;
    for node in &cached {
        b.line(s.field(node.type_name, &field_name(&node.name), false))?;
    }
    b.blank()?;

    if let Some(label) = s.access_section(Access::Public) {
        b.label(label)?;
    }
    b.line(s.constructor_signature(
        INSTANTIATOR,
        &s.parameter("Compositor", "compositor"),
    ))?;
    b.open(s.scope_open())?;
    b.line(format!("{COMPOSITOR} = compositor;"))?;
    b.close(s.scope_close())?;
    b.blank()?;

    b.line(s.dispose_signature(INSTANTIATOR))?;
    b.open(s.scope_open())?;
    for node in &cached {
        b.line(format!("{} = {};", field_name(&node.name), s.null()))?;
    }
    b.close(s.scope_close())?;
    b.blank()?;

    b.line(format!(
        "{}{} CreateRoot()",
        s.member_modifier(Access::Internal),
        s.reference_type("Visual")
    ))?;
    b.open(s.scope_open())?;
    b.line(format!("return {root_name}();"))?;
    b.close(s.scope_close())?;

    if let Some(label) = s.access_section(Access::Private) {
        b.blank()?;
        b.label(label)?;
    }
    for node in nodes {
        b.blank()?;
        if let Some(description) = &node.description {
            for line in description.lines() {
                b.line(s.comment(line))?;
            }
        }
        b.line(s.method_signature(node.type_name, &node.name))?;
        b.open(s.scope_open())?;
        if node.cached {
            let field = field_name(&node.name);
            b.line(format!("if ({field} != {})", s.null()))?;
            b.open(s.scope_open())?;
            b.line(format!("return {field};"))?;
            b.close(s.scope_close())?;
        }
        b.lines(&node.statements)?;
        b.line(format!("return {RESULT};"))?;
        b.close(s.scope_close())?;
    }
    b.close(s.class_end())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stringify::{CSharpStringifier, CppCxStringifier};
    use vizij_composition_core::name_nodes;
    use vizij_composition_core::object::{
        AnimationController, Animator, ColorBrush, CompositionPath, EllipseGeometry, KeyFrame,
        KeyFrameAnimation, PathGeometry, ShapeVisual, SpriteShape,
    };
    use vizij_composition_core::Color;

    fn animated_sprite() -> SceneGraph {
        let mut g = SceneGraph::new();
        let brush = g.add(Object::ColorBrush(ColorBrush {
            color: Some(Color::rgb(255, 0, 0)),
            ..Default::default()
        }));
        let ellipse = g.add(Object::EllipseGeometry(EllipseGeometry {
            radius: Some([10.0, 10.0]),
            ..Default::default()
        }));
        let animation = g.add(Object::KeyFrameAnimation(KeyFrameAnimation {
            kind: AnimationValueKind::Scalar,
            duration_ticks: 10_000_000,
            key_frames: vec![
                KeyFrame {
                    progress: 0.0,
                    value: KeyFrameValue::Scalar(0.0),
                    easing: None,
                },
                KeyFrame {
                    progress: 1.0,
                    value: KeyFrameValue::Scalar(1.0),
                    easing: None,
                },
            ],
            ..Default::default()
        }));
        let controller = g.add(Object::AnimationController(AnimationController {
            paused: true,
            ..Default::default()
        }));
        let sprite = g.add(Object::SpriteShape(SpriteShape {
            meta: ObjectMeta {
                animators: vec![Animator {
                    target: "TrimEnd".into(),
                    animation,
                    controller: Some(controller),
                }],
                ..Default::default()
            },
            geometry: Some(ellipse),
            fill_brush: Some(brush),
            stroke_brush: Some(brush),
            ..Default::default()
        }));
        let root = g.add(Object::ShapeVisual(ShapeVisual {
            shapes: vec![sprite],
            ..Default::default()
        }));
        g.set_root(root);
        g
    }

    #[test]
    fn it_should_emit_dependencies_before_dependents() {
        let g = animated_sprite();
        let names = name_nodes(&g);
        let code = emit(&g, &names, &CodegenConfig::default(), &CSharpStringifier)
            .expect("emit should succeed");
        let order: Vec<&str> = code.nodes.iter().map(|n| n.name.as_str()).collect();
        let position = |name: &str| order.iter().position(|n| *n == name).unwrap();
        assert!(position("ColorBrush_Red") < position("SpriteShape"));
        assert!(position("EllipseGeometry") < position("SpriteShape"));
        assert_eq!(order.last(), Some(&"ShapeVisual"));
        assert!(!order.contains(&"AnimationController"));
    }

    #[test]
    fn it_should_cache_shared_objects_only() {
        let g = animated_sprite();
        let names = name_nodes(&g);
        let code = emit(&g, &names, &CodegenConfig::default(), &CSharpStringifier).unwrap();
        let brush = code.node("ColorBrush_Red").unwrap();
        assert!(brush.cached);
        let expected = "var result = _colorBrush_Red = \
            _c.CreateColorBrush(Color.FromArgb(0xFF, 0xFF, 0x00, 0x00));";
        assert_eq!(brush.statements, vec![expected]);
        assert!(!code.node("EllipseGeometry").unwrap().cached);
        assert!(code.text.contains("if (_colorBrush_Red != null)"));
        assert!(code.text.contains("_colorBrush_Red = null;"));
    }

    #[test]
    fn it_should_replay_paused_controllers_inline() {
        let g = animated_sprite();
        let names = name_nodes(&g);
        let code = emit(&g, &names, &CodegenConfig::default(), &CppCxStringifier).unwrap();
        let sprite = code.node("SpriteShape").unwrap();
        let start = sprite
            .statements
            .iter()
            .position(|l| l == "result->StartAnimation(L\"TrimEnd\", ScalarAnimation_0_to_1());")
            .expect("animation should be started");
        assert_eq!(
            &sprite.statements[start + 1..],
            &[
                "{".to_string(),
                "    auto controller = result->TryGetAnimationController(L\"TrimEnd\");".to_string(),
                "    controller->Pause();".to_string(),
                "}".to_string(),
            ]
        );
    }

    #[test]
    fn it_should_reject_missing_names() {
        let g = animated_sprite();
        let err = emit(&g, &NodeNames::default(), &CodegenConfig::default(), &CSharpStringifier)
            .unwrap_err();
        assert!(matches!(err, CodegenError::Unnamed(_)));
    }

    #[test]
    fn it_should_reject_metadata_on_path_objects() {
        let mut g = SceneGraph::new();
        let path = g.add(Object::Path(CompositionPath {
            meta: ObjectMeta {
                comment: Some("outline".into()),
                ..Default::default()
            },
            source: None,
        }));
        let geometry = g.add(Object::PathGeometry(PathGeometry {
            path: Some(path),
            ..Default::default()
        }));
        let sprite = g.add(Object::SpriteShape(SpriteShape {
            geometry: Some(geometry),
            ..Default::default()
        }));
        let root = g.add(Object::ShapeVisual(ShapeVisual {
            shapes: vec![sprite],
            ..Default::default()
        }));
        g.set_root(root);

        let names = name_nodes(&g);
        match emit(&g, &names, &CodegenConfig::default(), &CppCxStringifier) {
            Err(CodegenError::Composition(CompositionError::Unsupported { id, type_name, .. })) => {
                assert_eq!(id, path);
                assert_eq!(type_name, "Path with metadata");
            }
            other => panic!("expected unsupported error, got {other:?}"),
        }
    }

    #[test]
    fn field_names_lowercase_the_first_letter() {
        assert_eq!(field_name("ColorBrush_Red"), "_colorBrush_Red");
        assert_eq!(field_name("X"), "_x");
    }
}
