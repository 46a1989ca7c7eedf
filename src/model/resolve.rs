//! Expression and setter resolution.
//!
//! Walks a parsed binding expression bottom-up, assigning every node a Java
//! type against the class-model backend. Identifier lookup order is lambda
//! parameter, declared variable, import alias, then implicit `java.lang`.
//! Resolution failures go into the shared [`Diagnostics`] and the failing
//! subtree stops producing further errors.

use fnv::FnvHashMap;

use crate::errors::{BindError, BindErrorKind, Diagnostics};
use crate::expr::{Expr, ExprKind, InfixOp, Literal};
use crate::messages;
use crate::span::Source;
use crate::store::{BindingAttribute, LayoutFileBundle};
use crate::strutils;

use super::{
    capitalize, erasure, is_assignable, BindingAdapterRecord, ClassModelProvider, LibTypes,
    ModelClass,
};

/// Per-layout resolution output consumed by the analysis passes.
#[derive(Debug, Default)]
pub struct ResolvedLayout {
    /// Expression node id to resolved Java type.
    pub types: FnvHashMap<usize, String>,
    pub observable_edges: Vec<ObservableEdge>,
    pub observable_getters: Vec<ObservableGetter>,
}

/// One observable-typed member reached from an expression; these form the
/// graph the recursive-observable check runs over.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObservableEdge {
    pub owner: String,
    pub property: String,
    pub target: String,
    pub src: Source,
}

/// A `get()`/`getValue()` call on an observable wrapper. Flagged here,
/// judged in analysis where the two-way exemption is known.
#[derive(Clone, Debug)]
pub struct ObservableGetter {
    pub expr_id: usize,
    pub text: String,
    pub src: Source,
}

/// How an attribute value reaches the view.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SetterCall {
    Method { name: String, param_type: String },
    Adapter(BindingAdapterRecord),
    Field { name: String, field_type: String },
}

/// A resolved two-way inverse: the getter pulling the value back out of the
/// view and the event attribute that triggers the pull.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InverseResolution {
    pub getter: String,
    pub event_attribute: String,
}

const LAMBDA_TYPE: &str = "<lambda>";
const NULL_TYPE: &str = "<null>";

enum Ty {
    Value(String),
    StaticClass(String),
}

impl Ty {
    fn name(&self) -> &str {
        match self {
            Ty::Value(t) | Ty::StaticClass(t) => t,
        }
    }
}

pub struct Resolver<'a> {
    provider: &'a dyn ClassModelProvider,
    lib: &'a LibTypes,
    bundle: &'a LayoutFileBundle,
    lambda_params: Vec<(String, String)>,
}

impl<'a> Resolver<'a> {
    pub fn new(
        provider: &'a dyn ClassModelProvider,
        lib: &'a LibTypes,
        bundle: &'a LayoutFileBundle,
    ) -> Resolver<'a> {
        Resolver {
            provider,
            lib,
            bundle,
            lambda_params: vec![],
        }
    }

    /// Resolve one attribute expression tree. The returned type is the
    /// outermost node's; `None` when anything inside failed.
    pub fn resolve(
        &mut self,
        expr: &Expr,
        out: &mut ResolvedLayout,
        diag: &mut Diagnostics,
    ) -> Option<String> {
        let ty = self.resolve_node(expr, out, diag)?;
        match ty {
            Ty::Value(t) => Some(t),
            Ty::StaticClass(name) => {
                diag.error(self.error(
                    messages::format(messages::UNDEFINED_VARIABLE, &[&name]),
                    expr,
                    BindErrorKind::Resolve,
                ));
                None
            }
        }
    }

    /// Resolve a declared type string against imports and `java.lang`,
    /// rebuilding generic arguments with their own resolutions.
    pub fn resolve_type_name(&self, type_str: &str) -> Option<String> {
        let type_str = type_str.trim();
        if super::is_primitive(type_str) {
            return Some(type_str.to_owned());
        }
        let erased = erasure(type_str);
        let qualified = self.qualify(erased)?;
        match super::type_argument(type_str) {
            None => Some(qualified),
            Some(_) => {
                let open = type_str.find('<').unwrap();
                let close = type_str.rfind('>').unwrap();
                let args = split_generic_args(&type_str[open + 1..close])
                    .into_iter()
                    .map(|arg| self.resolve_type_name(arg))
                    .collect::<Option<Vec<_>>>()?;
                Some(format!("{}<{}>", qualified, args.join(", ")))
            }
        }
    }

    fn qualify(&self, erased: &str) -> Option<String> {
        let mut segments = erased.splitn(2, '.');
        let head = segments.next().unwrap_or(erased);
        let rest = segments.next();
        if let Some(import) = self.bundle.find_import(head) {
            let base = &import.type_str;
            return match rest {
                None => Some(base.clone()),
                Some(rest) => Some(format!("{}.{}", base, rest)),
            };
        }
        if self.provider.class_record(erased).is_some() {
            return Some(erased.to_owned());
        }
        if rest.is_none() {
            let implicit = format!("java.lang.{}", head);
            if self.provider.class_record(&implicit).is_some() {
                return Some(implicit);
            }
        }
        None
    }

    /// Setter lookup for `attr` on `view_type` with a value of `value_type`:
    /// exact `set<Name>` method, then a registered binding adapter, then a
    /// public field of the same name.
    pub fn resolve_setter(
        &self,
        view_type: &str,
        attr: &BindingAttribute,
        value_type: &str,
    ) -> Option<SetterCall> {
        if let Some(class) = ModelClass::find(self.provider, view_type) {
            let setter = strutils::setter_name(&attr.name);
            for m in class.methods_named(&setter) {
                if m.param_types.len() == 1 && self.accepts(&m.param_types[0], value_type) {
                    return Some(SetterCall::Method {
                        name: m.name.clone(),
                        param_type: m.param_types[0].clone(),
                    });
                }
            }
        }
        for adapter in self.provider.adapters() {
            if adapter.attribute == attr.full_name()
                && is_assignable(self.provider, &adapter.view_type, view_type)
                && self.accepts(&adapter.value_type, value_type)
            {
                return Some(SetterCall::Adapter(adapter.clone()));
            }
        }
        if let Some(class) = ModelClass::find(self.provider, view_type) {
            if let Some(f) = class.find_field(&attr.name) {
                if self.accepts(&f.type_str, value_type) {
                    return Some(SetterCall::Field {
                        name: f.name.clone(),
                        field_type: f.type_str.clone(),
                    });
                }
            }
        }
        None
    }

    /// Inverse lookup for a two-way attribute: an explicit registration
    /// wins; otherwise a getter matching the resolved setter implies the
    /// `<attr>AttrChanged` event.
    pub fn resolve_inverse(
        &self,
        view_type: &str,
        attr: &BindingAttribute,
    ) -> Option<InverseResolution> {
        for record in self.provider.inverse_methods() {
            if record.attribute == attr.full_name()
                && is_assignable(self.provider, &record.view_type, view_type)
            {
                return Some(InverseResolution {
                    getter: record.method.clone(),
                    event_attribute: record
                        .event_attribute
                        .clone()
                        .unwrap_or_else(|| implicit_event_attribute(attr)),
                });
            }
        }
        let class = ModelClass::find(self.provider, view_type)?;
        let getter = class.getter_for(&attr.name)?;
        Some(InverseResolution {
            getter: getter.name.clone(),
            event_attribute: implicit_event_attribute(attr),
        })
    }

    /// Arity of the single abstract method behind an event or listener
    /// attribute, used to validate lambda parameter counts.
    pub fn listener_arity(&self, view_type: &str, attr: &BindingAttribute) -> Option<usize> {
        let listener_type = match self.resolve_setter(view_type, attr, LAMBDA_TYPE)? {
            SetterCall::Method { param_type, .. } => param_type,
            SetterCall::Adapter(record) => record.value_type,
            SetterCall::Field { field_type, .. } => field_type,
        };
        let class = ModelClass::find(self.provider, &listener_type)?;
        class.single_abstract_method().map(|m| m.param_types.len())
    }

    pub fn listener_method_name(&self, view_type: &str, attr: &BindingAttribute) -> Option<String> {
        let listener_type = match self.resolve_setter(view_type, attr, LAMBDA_TYPE)? {
            SetterCall::Method { param_type, .. } => param_type,
            SetterCall::Adapter(record) => record.value_type,
            SetterCall::Field { field_type, .. } => field_type,
        };
        let class = ModelClass::find(self.provider, &listener_type)?;
        class.single_abstract_method().map(|m| m.name.clone())
    }

    fn accepts(&self, param: &str, value: &str) -> bool {
        if value == LAMBDA_TYPE {
            return ModelClass::find(self.provider, param)
                .and_then(|c| c.single_abstract_method())
                .is_some();
        }
        if value == NULL_TYPE {
            return !super::is_primitive(param);
        }
        is_assignable(self.provider, param, value)
    }

    fn resolve_node(
        &mut self,
        expr: &Expr,
        out: &mut ResolvedLayout,
        diag: &mut Diagnostics,
    ) -> Option<Ty> {
        let ty = self.resolve_kind(expr, out, diag)?;
        out.types.insert(expr.id, ty.name().to_owned());
        Some(ty)
    }

    fn resolve_kind(
        &mut self,
        expr: &Expr,
        out: &mut ResolvedLayout,
        diag: &mut Diagnostics,
    ) -> Option<Ty> {
        match &expr.kind {
            ExprKind::Identifier(name) => self.resolve_identifier(name, expr, diag),
            ExprKind::Literal(lit) => Some(Ty::Value(literal_type(lit))),
            ExprKind::FieldAccess { target, name, .. } => {
                self.resolve_field_access(expr, target, name, out, diag)
            }
            ExprKind::MethodCall {
                target, name, args, ..
            } => self.resolve_method_call(expr, target, name, args, out, diag),
            ExprKind::MethodRef { target, name } => {
                let target_ty = self.resolve_node(target, out, diag)?;
                let class = self.class_or_error(target_ty.name(), expr, diag)?;
                if class.methods_named(name).is_empty() {
                    diag.error(self.error(
                        messages::format(messages::CANNOT_FIND_METHOD, &[name, class.name()]),
                        expr,
                        BindErrorKind::Resolve,
                    ));
                    return None;
                }
                Some(Ty::Value(LAMBDA_TYPE.to_owned()))
            }
            ExprKind::BinOp { lhs, rhs, op } => {
                let l = self.value_of(lhs, out, diag);
                let r = self.value_of(rhs, out, diag);
                let (l, r) = (l?, r?);
                Some(Ty::Value(binop_type(*op, &l, &r)))
            }
            ExprKind::UnaryOp { expr: operand, op } => {
                let t = self.value_of(operand, out, diag)?;
                Some(Ty::Value(match op {
                    crate::expr::PrefixOp::Not => "boolean".to_owned(),
                    _ => t,
                }))
            }
            ExprKind::Ternary {
                cond,
                then,
                otherwise,
            } => {
                self.value_of(cond, out, diag);
                let a = self.value_of(then, out, diag);
                let b = self.value_of(otherwise, out, diag);
                let (a, b) = (a?, b?);
                Some(Ty::Value(self.merge_types(&a, &b)))
            }
            ExprKind::NullCoalesce { lhs, rhs } => {
                let a = self.value_of(lhs, out, diag);
                let b = self.value_of(rhs, out, diag);
                let (a, b) = (a?, b?);
                Some(Ty::Value(self.merge_types(&a, &b)))
            }
            ExprKind::InstanceOf {
                expr: operand,
                type_str,
            } => {
                self.value_of(operand, out, diag);
                if self.resolve_type_name(type_str).is_none() {
                    diag.error(self.error(
                        messages::format(messages::CANNOT_RESOLVE_TYPE, &[type_str]),
                        expr,
                        BindErrorKind::Resolve,
                    ));
                }
                Some(Ty::Value("boolean".to_owned()))
            }
            ExprKind::Cast {
                type_str,
                expr: operand,
            } => {
                self.value_of(operand, out, diag);
                match self.resolve_type_name(type_str) {
                    Some(t) => Some(Ty::Value(t)),
                    None => {
                        diag.error(self.error(
                            messages::format(messages::CANNOT_RESOLVE_TYPE, &[type_str]),
                            expr,
                            BindErrorKind::Resolve,
                        ));
                        None
                    }
                }
            }
            ExprKind::Bracket { target, index } => {
                let t = self.value_of(target, out, diag);
                self.value_of(index, out, diag);
                let t = t?;
                Some(Ty::Value(element_type(&t)))
            }
            ExprKind::Lambda { params, body } => {
                let depth = self.lambda_params.len();
                for p in params {
                    self.lambda_params
                        .push((p.name.clone(), "java.lang.Object".to_owned()));
                }
                self.value_of(body, out, diag);
                self.lambda_params.truncate(depth);
                Some(Ty::Value(LAMBDA_TYPE.to_owned()))
            }
            ExprKind::Grouping(inner) => {
                let t = self.resolve_node(inner, out, diag)?;
                Some(t)
            }
        }
    }

    fn resolve_identifier(&self, name: &str, expr: &Expr, diag: &mut Diagnostics) -> Option<Ty> {
        if let Some((_, ty)) = self.lambda_params.iter().rev().find(|(n, _)| n == name) {
            return Some(Ty::Value(ty.clone()));
        }
        if let Some(variable) = self.bundle.find_variable(name) {
            return match self.resolve_type_name(&variable.type_str) {
                Some(t) => Some(Ty::Value(t)),
                None => {
                    diag.error(self.error(
                        messages::format(messages::CANNOT_RESOLVE_TYPE, &[&variable.type_str]),
                        expr,
                        BindErrorKind::Resolve,
                    ));
                    None
                }
            };
        }
        if let Some(import) = self.bundle.find_import(name) {
            return match self.provider.class_record(erasure(&import.type_str)) {
                Some(_) => Some(Ty::StaticClass(import.type_str.clone())),
                None => {
                    diag.error(self.error(
                        messages::format(messages::CANNOT_RESOLVE_TYPE, &[&import.type_str]),
                        expr,
                        BindErrorKind::Resolve,
                    ));
                    None
                }
            };
        }
        let implicit = format!("java.lang.{}", name);
        if self.provider.class_record(&implicit).is_some() {
            return Some(Ty::StaticClass(implicit));
        }
        diag.error(self.error(
            messages::format(messages::UNDEFINED_VARIABLE, &[name]),
            expr,
            BindErrorKind::Resolve,
        ));
        None
    }

    fn resolve_field_access(
        &mut self,
        expr: &Expr,
        target: &Expr,
        name: &str,
        out: &mut ResolvedLayout,
        diag: &mut Diagnostics,
    ) -> Option<Ty> {
        // A dotted chain that spells a known class is a static reference,
        // not a member walk; try that before reporting lookup failures.
        let mut quiet = Diagnostics::new();
        let target_ty = match self.resolve_node(target, out, &mut quiet) {
            Some(t) => {
                diag.extend(quiet);
                t
            }
            None => {
                if let Some(dotted) = expr.as_dotted_name() {
                    if let Some(qualified) = self.qualify(&dotted) {
                        return Some(Ty::StaticClass(qualified));
                    }
                }
                diag.extend(quiet);
                return None;
            }
        };
        match target_ty {
            Ty::StaticClass(class_name) => {
                let class = self.class_or_error(&class_name, expr, diag)?;
                if let Some(f) = class.all_fields().into_iter().find(|f| {
                    f.name == name && f.is_public && f.is_static
                }) {
                    return Some(Ty::Value(f.type_str.clone()));
                }
                // Could still be a package prefix: `com.example.User`.
                if let Some(dotted) = expr.as_dotted_name() {
                    if let Some(qualified) = self.qualify(&dotted) {
                        return Some(Ty::StaticClass(qualified));
                    }
                }
                diag.error(self.error(
                    messages::format(messages::CANNOT_FIND_FIELD, &[name, &class_name]),
                    expr,
                    BindErrorKind::Resolve,
                ));
                None
            }
            Ty::Value(value_type) => self.member_type(expr, &value_type, name, out, diag),
        }
    }

    /// Field or getter lookup on a value, unwrapping one observable layer
    /// when the member is not on the wrapper itself.
    fn member_type(
        &mut self,
        expr: &Expr,
        value_type: &str,
        name: &str,
        out: &mut ResolvedLayout,
        diag: &mut Diagnostics,
    ) -> Option<Ty> {
        if let Some(found) = self.direct_member(value_type, name, expr, out) {
            return Some(Ty::Value(found));
        }
        if let Some((_, unwrapped)) = self.lib.wrapper_getter(value_type) {
            if let Some(found) = self.direct_member(&unwrapped, name, expr, out) {
                return Some(Ty::Value(found));
            }
        }
        let class = self.class_or_error(value_type, expr, diag)?;
        diag.error(self.error(
            messages::format(messages::CANNOT_FIND_FIELD, &[name, class.name()]),
            expr,
            BindErrorKind::Resolve,
        ));
        None
    }

    fn direct_member(
        &self,
        value_type: &str,
        name: &str,
        expr: &Expr,
        out: &mut ResolvedLayout,
    ) -> Option<String> {
        let class = ModelClass::find(self.provider, value_type)?;
        let member_type = if let Some(f) = class.find_field(name) {
            Some(f.type_str.clone())
        } else {
            class.getter_for(name).map(|g| g.return_type.clone())
        }?;
        let resolved = self
            .resolve_type_name(&member_type)
            .unwrap_or_else(|| member_type.clone());
        if let Some((_, unwrapped)) = self.lib.wrapper_getter(&resolved) {
            out.observable_edges.push(ObservableEdge {
                owner: erasure(value_type).to_owned(),
                property: name.to_owned(),
                target: erasure(&unwrapped).to_owned(),
                src: self.src(expr),
            });
        }
        Some(resolved)
    }

    fn resolve_method_call(
        &mut self,
        expr: &Expr,
        target: &Expr,
        name: &str,
        args: &[Expr],
        out: &mut ResolvedLayout,
        diag: &mut Diagnostics,
    ) -> Option<Ty> {
        let target_ty = self.resolve_node(target, out, diag);
        let arg_types: Vec<Option<String>> = args
            .iter()
            .map(|a| self.value_of(a, out, diag))
            .collect();
        let target_ty = target_ty?;
        let arg_types = arg_types.into_iter().collect::<Option<Vec<_>>>()?;

        if let Ty::Value(value_type) = &target_ty {
            if args.is_empty() {
                if let Some((getter, unwrapped)) = self.lib.wrapper_getter(value_type) {
                    if name == getter {
                        out.observable_getters.push(ObservableGetter {
                            expr_id: expr.id,
                            text: expr.to_string(),
                            src: self.src(expr),
                        });
                        return Some(Ty::Value(unwrapped));
                    }
                }
            }
        }

        let class = self.class_or_error(target_ty.name(), expr, diag)?;
        let want_static = matches!(target_ty, Ty::StaticClass(_));
        for m in class.methods_named(name) {
            if m.param_types.len() != arg_types.len() {
                continue;
            }
            if want_static && !m.is_static {
                continue;
            }
            let ok = m
                .param_types
                .iter()
                .zip(arg_types.iter())
                .all(|(p, a)| self.accepts(p, a));
            if ok {
                return Some(Ty::Value(m.return_type.clone()));
            }
        }
        diag.error(self.error(
            messages::format(messages::CANNOT_FIND_METHOD, &[name, class.name()]),
            expr,
            BindErrorKind::Resolve,
        ));
        None
    }

    fn value_of(
        &mut self,
        expr: &Expr,
        out: &mut ResolvedLayout,
        diag: &mut Diagnostics,
    ) -> Option<String> {
        match self.resolve_node(expr, out, diag)? {
            Ty::Value(t) => Some(t),
            Ty::StaticClass(name) => {
                diag.error(self.error(
                    messages::format(messages::UNDEFINED_VARIABLE, &[&name]),
                    expr,
                    BindErrorKind::Resolve,
                ));
                None
            }
        }
    }

    fn merge_types(&self, a: &str, b: &str) -> String {
        if a == NULL_TYPE {
            return b.to_owned();
        }
        if b == NULL_TYPE || a == b {
            return a.to_owned();
        }
        if is_assignable(self.provider, a, b) {
            return a.to_owned();
        }
        if is_assignable(self.provider, b, a) {
            return b.to_owned();
        }
        "java.lang.Object".to_owned()
    }

    fn class_or_error<'b>(
        &'b self,
        type_str: &str,
        expr: &Expr,
        diag: &mut Diagnostics,
    ) -> Option<ModelClass<'b>> {
        match ModelClass::find(self.provider, type_str) {
            Some(class) => Some(class),
            None => {
                diag.error(self.error(
                    messages::format(messages::CANNOT_RESOLVE_TYPE, &[erasure(type_str)]),
                    expr,
                    BindErrorKind::Resolve,
                ));
                None
            }
        }
    }

    fn src(&self, expr: &Expr) -> Source {
        Source::new(self.bundle.filepath.clone(), expr.span)
    }

    fn error(&self, msg: String, expr: &Expr, kind: BindErrorKind) -> BindError {
        BindError::new(msg, self.src(expr), kind)
    }
}

fn implicit_event_attribute(attr: &BindingAttribute) -> String {
    match &attr.namespace {
        Some(ns) => format!("{}:{}AttrChanged", ns, attr.name),
        None => format!("{}AttrChanged", attr.name),
    }
}

fn literal_type(lit: &Literal) -> String {
    match lit {
        Literal::Int(..) => "int",
        Literal::Long(..) => "long",
        Literal::Float(..) => "float",
        Literal::Double(..) => "double",
        Literal::Bool(..) => "boolean",
        Literal::Str(..) => "java.lang.String",
        Literal::Char(..) => "char",
        Literal::Null => NULL_TYPE,
    }
    .to_owned()
}

fn binop_type(op: InfixOp, lhs: &str, rhs: &str) -> String {
    use InfixOp::*;
    match op {
        Lt | LtEq | Gt | GtEq | Eq | NotEq | And | Or => "boolean".to_owned(),
        Add if lhs == "java.lang.String" || rhs == "java.lang.String" => {
            "java.lang.String".to_owned()
        }
        _ => promote_numeric(lhs, rhs),
    }
}

fn promote_numeric(lhs: &str, rhs: &str) -> String {
    let l = super::unbox(lhs).unwrap_or(lhs);
    let r = super::unbox(rhs).unwrap_or(rhs);
    for wide in &["double", "float", "long"] {
        if l == *wide || r == *wide {
            return (*wide).to_owned();
        }
    }
    "int".to_owned()
}

/// `Map<K, V>[k]` and `List<T>[i]` yield the relevant generic argument;
/// arrays drop one `[]`; anything else degrades to `Object`.
fn element_type(container: &str) -> String {
    if let Some(stripped) = container.strip_suffix("[]") {
        return stripped.to_owned();
    }
    let erased = erasure(container);
    if erased.ends_with("Map") {
        if let Some(open) = container.find('<') {
            let close = container.rfind('>').unwrap_or(container.len());
            let args = split_generic_args(&container[open + 1..close]);
            if args.len() == 2 {
                return args[1].to_owned();
            }
        }
    }
    super::type_argument(container)
        .map(str::to_owned)
        .unwrap_or_else(|| "java.lang.Object".to_owned())
}

fn split_generic_args(inner: &str) -> Vec<&str> {
    let mut out = vec![];
    let mut depth = 0;
    let mut start = 0;
    for (i, c) in inner.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => depth -= 1,
            ',' if depth == 0 => {
                out.push(inner[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    if start < inner.len() {
        out.push(inner[start..].trim());
    }
    out
}

/// `user.friend` where `friend` is settable: resolve whether a member name
/// can be written back for a two-way binding.
pub fn has_setter_for_member(
    provider: &dyn ClassModelProvider,
    owner: &str,
    member: &str,
) -> bool {
    match ModelClass::find(provider, owner) {
        Some(class) => {
            class
                .find_method(&format!("set{}", capitalize(member)), 1)
                .is_some()
                || class.find_field(member).is_some()
        }
        None => false,
    }
}
