//! Cross-file validation passes.
//!
//! Each check is an independent function over already parsed and resolved
//! data, pushing findings into the shared [`Diagnostics`]. Nothing here
//! fails fast; the driver gates on the accumulated errors once at the end
//! of the invocation.

use fnv::{FnvHashMap, FnvHashSet};
use petgraph::algo::has_path_connecting;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::errors::{BindError, BindErrorKind, Diagnostics};
use crate::expr::{Expr, ExprKind};
use crate::messages;
use crate::model::resolve::{ResolvedLayout, Resolver};
use crate::model::{ClassModelProvider, ModelClass};
use crate::span::Source;
use crate::store::{LayoutFileBundle, ResourceBundle};

/// One successfully parsed expression attribute, tied back to its target.
#[derive(Debug)]
pub struct ParsedAttribute {
    pub target_index: usize,
    pub attr_index: usize,
    pub two_way: bool,
    pub expr: Expr,
}

/// Per-file checks that need only the bundle itself.
pub fn validate_bundle(bundle: &LayoutFileBundle, diag: &mut Diagnostics) {
    check_duplicate_ids(bundle, diag);
    check_include_inside_merge(bundle, diag);
}

/// Per-file checks over parsed expressions and their resolution output.
pub fn validate_expressions(
    bundle: &LayoutFileBundle,
    parsed: &[ParsedAttribute],
    resolver: &Resolver,
    resolved: &ResolvedLayout,
    diag: &mut Diagnostics,
) {
    check_getter_on_observable(parsed, resolved, diag);
    check_recursive_observables(resolved, diag);
    check_two_way_event_conflicts(bundle, resolver, diag);
    check_callbacks(bundle, parsed, resolver, diag);
    check_unused_variables(bundle, parsed, diag);
}

/// A declared variable no expression mentions is dead weight in the
/// generated class; worth a warning, never an error.
pub fn check_unused_variables(
    bundle: &LayoutFileBundle,
    parsed: &[ParsedAttribute],
    diag: &mut Diagnostics,
) {
    let mut used: FnvHashSet<String> = FnvHashSet::default();
    for p in parsed {
        p.expr.walk(&mut |e| {
            if let ExprKind::Identifier(name) = &e.kind {
                used.insert(name.clone());
            }
        });
    }
    for variable in &bundle.variables {
        if !used.contains(&variable.name) {
            diag.warn(BindError::new(
                messages::format(messages::UNUSED_VARIABLE, &[&variable.name]),
                variable.declared_at.clone(),
                BindErrorKind::Semantic,
            ));
        }
    }
}

/// Duplicate ids within one configuration: one error per occurrence, so two
/// clashing tags produce two errors.
pub fn check_duplicate_ids(bundle: &LayoutFileBundle, diag: &mut Diagnostics) {
    let mut by_id: FnvHashMap<&str, Vec<usize>> = FnvHashMap::default();
    for (i, target) in bundle.targets.iter().enumerate() {
        if let Some(id) = &target.id {
            by_id.entry(id).or_insert_with(Vec::new).push(i);
        }
    }
    let mut indices: Vec<usize> = by_id
        .values()
        .filter(|occurrences| occurrences.len() > 1)
        .flatten()
        .copied()
        .collect();
    indices.sort_unstable();
    for i in indices {
        let target = &bundle.targets[i];
        let id = target.id.as_deref().unwrap_or_default();
        diag.error(BindError::new(
            messages::format(messages::DUPLICATE_VIEW_OR_INCLUDE_ID, &[&target.tag, id]),
            target.src.clone(),
            BindErrorKind::Semantic,
        ));
    }
}

pub fn check_include_inside_merge(bundle: &LayoutFileBundle, diag: &mut Diagnostics) {
    if !bundle.is_merge {
        return;
    }
    for target in &bundle.targets {
        if target.is_binder() && target.direct_child_of_root {
            diag.error(BindError::new(
                messages::INCLUDE_INSIDE_MERGE.to_owned(),
                target.src.clone(),
                BindErrorKind::Semantic,
            ));
        }
    }
}

/// All configurations of one layout must agree on a `<merge>` root. The
/// message lists the configuration directories split by which side they
/// took, in declaration order.
pub fn check_merge_agreement(
    name: &str,
    bundles: &[LayoutFileBundle],
    diag: &mut Diagnostics,
) {
    if bundles.is_empty() || bundles.iter().all(|b| b.is_merge == bundles[0].is_merge) {
        return;
    }
    let present: Vec<&str> = bundles
        .iter()
        .filter(|b| b.is_merge)
        .map(|b| b.directory.as_str())
        .collect();
    let absent: Vec<&str> = bundles
        .iter()
        .filter(|b| !b.is_merge)
        .map(|b| b.directory.as_str())
        .collect();
    let mut msg = messages::format(messages::ROOT_MERGE_MISMATCH, &[name]);
    msg.push_str("\n\nPresent:\n");
    msg.push_str(
        &present
            .iter()
            .map(|d| format!(" - {}", d))
            .collect::<Vec<_>>()
            .join("\n"),
    );
    msg.push_str("\n\nAbsent:\n");
    msg.push_str(
        &absent
            .iter()
            .map(|d| format!(" - {}", d))
            .collect::<Vec<_>>()
            .join("\n"),
    );
    diag.error(BindError::new(
        msg,
        Source::unspanned(bundles[0].filepath.clone()),
        BindErrorKind::Semantic,
    ));
}

/// Variables, imports, explicit class names and view-vs-include id usage
/// must line up across the configurations of one layout.
pub fn check_multi_config_consistency(
    name: &str,
    bundles: &[LayoutFileBundle],
    diag: &mut Diagnostics,
) {
    let reference = match bundles.first() {
        Some(b) => b,
        None => return,
    };
    let reference_class = reference.binding_class_qualified();
    for bundle in &bundles[1..] {
        let class = bundle.binding_class_qualified();
        if class != reference_class {
            let location = format!("{}/{}.xml", bundle.directory, bundle.file_name);
            let src = match &bundle.class_override {
                Some((_, src)) => src.clone(),
                None => Source::unspanned(bundle.filepath.clone()),
            };
            diag.error(BindError::new(
                messages::format(
                    messages::MULTI_CONFIG_LAYOUT_CLASS_NAME_MISMATCH,
                    &[&class, &location],
                ),
                src,
                BindErrorKind::Semantic,
            ));
        }
        for variable in &bundle.variables {
            if let Some(other) = reference.find_variable(&variable.name) {
                if other.type_str != variable.type_str {
                    let location = format!("{}/{}.xml", bundle.directory, bundle.file_name);
                    diag.error(BindError::new(
                        messages::format(
                            messages::MULTI_CONFIG_VARIABLE_TYPE_MISMATCH,
                            &[&variable.name, &variable.type_str, &location],
                        ),
                        variable.declared_at.clone(),
                        BindErrorKind::Semantic,
                    ));
                }
            }
        }
        for import in &bundle.imports {
            if let Some(other) = reference.find_import(&import.alias) {
                if other.type_str != import.type_str {
                    let location = format!("{}/{}.xml", bundle.directory, bundle.file_name);
                    diag.error(BindError::new(
                        messages::format(
                            messages::MULTI_CONFIG_IMPORT_TYPE_MISMATCH,
                            &[&import.alias, &import.type_str, &location],
                        ),
                        import.declared_at.clone(),
                        BindErrorKind::Semantic,
                    ));
                }
            }
        }
    }
    // The same id flipping between a view and an <include> across
    // configurations cannot be represented as one field.
    let mut id_is_binder: FnvHashMap<&str, bool> = FnvHashMap::default();
    for bundle in bundles {
        for target in &bundle.targets {
            if let Some(id) = &target.id {
                match id_is_binder.get(id.as_str()).copied() {
                    None => {
                        id_is_binder.insert(id, target.is_binder());
                    }
                    Some(was_binder) if was_binder != target.is_binder() => {
                        diag.error(BindError::new(
                            messages::format(messages::MULTI_CONFIG_ID_USED_AS_IMPORT, &[id]),
                            target.src.clone(),
                            BindErrorKind::Semantic,
                        ));
                    }
                    Some(_) => {}
                }
            }
        }
    }
    log::debug!("multi-config checks done for {}", name);
}

/// `get()` on an observable defeats automatic observation, except as the
/// outermost expression of a two-way binding where codegen requires the
/// unwrap.
pub fn check_getter_on_observable(
    parsed: &[ParsedAttribute],
    resolved: &ResolvedLayout,
    diag: &mut Diagnostics,
) {
    let exempt: FnvHashSet<usize> = parsed
        .iter()
        .filter(|p| p.two_way)
        .map(|p| p.expr.id)
        .collect();
    for getter in &resolved.observable_getters {
        if exempt.contains(&getter.expr_id) {
            continue;
        }
        diag.error(BindError::new(
            messages::format(messages::GETTER_ON_OBSERVABLE, &[&getter.text]),
            getter.src.clone(),
            BindErrorKind::Semantic,
        ));
    }
}

/// A cycle through observable-typed properties would re-trigger itself on
/// every change notification.
pub fn check_recursive_observables(resolved: &ResolvedLayout, diag: &mut Diagnostics) {
    let mut graph: DiGraph<&str, ()> = DiGraph::new();
    let mut nodes: FnvHashMap<&str, NodeIndex> = FnvHashMap::default();
    for edge in &resolved.observable_edges {
        let owner = *nodes
            .entry(edge.owner.as_str())
            .or_insert_with(|| graph.add_node(edge.owner.as_str()));
        let target = *nodes
            .entry(edge.target.as_str())
            .or_insert_with(|| graph.add_node(edge.target.as_str()));
        graph.add_edge(owner, target, ());
    }
    let mut reported: FnvHashSet<(&str, &str)> = FnvHashSet::default();
    for edge in &resolved.observable_edges {
        let owner = nodes[edge.owner.as_str()];
        let target = nodes[edge.target.as_str()];
        let cyclic = owner == target || has_path_connecting(&graph, target, owner, None);
        if cyclic && reported.insert((edge.owner.as_str(), edge.property.as_str())) {
            diag.error(BindError::new(
                messages::format(
                    messages::RECURSIVE_OBSERVABLE,
                    &[&format!("{}.{}", edge.owner, edge.property)],
                ),
                edge.src.clone(),
                BindErrorKind::Semantic,
            ));
        }
    }
}

/// A two-way binding installs its own change listener on the event
/// attribute; an explicit listener on the same attribute would clobber it.
pub fn check_two_way_event_conflicts(
    bundle: &LayoutFileBundle,
    resolver: &Resolver,
    diag: &mut Diagnostics,
) {
    for target in &bundle.targets {
        for attr in &target.attributes {
            if !attr.two_way {
                continue;
            }
            let event = match resolver.resolve_inverse(&target.view_type, attr) {
                Some(inverse) => inverse.event_attribute,
                None => continue,
            };
            for other in &target.attributes {
                if other.full_name() == event {
                    diag.error(BindError::new(
                        messages::format(messages::TWO_WAY_EVENT_ATTRIBUTE, &[&event]),
                        other.src.clone(),
                        BindErrorKind::Semantic,
                    ));
                }
            }
        }
    }
}

/// Lambda sanity: parameter names unique, count matching the listener
/// method arity (a parameterless lambda is always accepted).
pub fn check_callbacks(
    bundle: &LayoutFileBundle,
    parsed: &[ParsedAttribute],
    resolver: &Resolver,
    diag: &mut Diagnostics,
) {
    for p in parsed {
        let (params, span) = match &p.expr.kind {
            ExprKind::Lambda { params, .. } => (params, p.expr.span),
            _ => continue,
        };
        let mut seen: FnvHashSet<&str> = FnvHashSet::default();
        for param in params {
            if !seen.insert(param.name.as_str()) {
                diag.error(BindError::new(
                    messages::format(messages::DUPLICATE_CALLBACK_ARGUMENT, &[&param.name]),
                    Source::new(bundle.filepath.clone(), param.span),
                    BindErrorKind::Semantic,
                ));
            }
        }
        if params.is_empty() {
            continue;
        }
        let target = &bundle.targets[p.target_index];
        let attr = &target.attributes[p.attr_index];
        if let Some(arity) = resolver.listener_arity(&target.view_type, attr) {
            if params.len() != arity {
                let method = resolver
                    .listener_method_name(&target.view_type, attr)
                    .unwrap_or_default();
                diag.error(BindError::new(
                    messages::format(
                        messages::CALLBACK_ARGUMENT_COUNT_MISMATCH,
                        &[&method, &arity.to_string(), &params.len().to_string()],
                    ),
                    Source::new(bundle.filepath.clone(), span),
                    BindErrorKind::Semantic,
                ));
            }
        }
    }
}

/// `@Bindable` dependents must be getters and themselves `@Bindable`.
pub fn check_bindable_dependencies(
    provider: &dyn ClassModelProvider,
    bundle: &LayoutFileBundle,
    resolver: &Resolver,
    diag: &mut Diagnostics,
) {
    for variable in &bundle.variables {
        let resolved = match resolver.resolve_type_name(&variable.type_str) {
            Some(t) => t,
            None => continue,
        };
        let class = match ModelClass::find(provider, &resolved) {
            Some(c) => c,
            None => continue,
        };
        for m in class.all_methods() {
            for dep in &m.bindable_dependencies {
                if let Some(getter) = class.getter_for(dep) {
                    if !getter.bindable {
                        diag.error(BindError::new(
                            messages::format(messages::BINDABLE_DEPENDENT_NOT_BINDABLE, &[dep]),
                            variable.declared_at.clone(),
                            BindErrorKind::Semantic,
                        ));
                    }
                } else if class.find_field(dep).is_some() {
                    diag.error(BindError::new(
                        messages::format(messages::BINDABLE_DEPENDENT_NOT_GETTER, &[dep]),
                        variable.declared_at.clone(),
                        BindErrorKind::Semantic,
                    ));
                }
            }
        }
    }
}

/// Every `<include>` must point at a layout known to this module or exported
/// by a dependency.
pub fn check_includes(resources: &ResourceBundle, diag: &mut Diagnostics) {
    for (_, bundles) in resources.layout_bundles() {
        for bundle in bundles {
            for target in &bundle.targets {
                if let Some(layout) = &target.included_layout {
                    if resources.binding_class_for_layout(layout).is_none() {
                        let id = target.id.as_deref().unwrap_or("<no id>");
                        diag.error(BindError::new(
                            messages::format(messages::INCLUDE_LAYOUT_NOT_FOUND, &[layout, id]),
                            target.src.clone(),
                            BindErrorKind::Resolve,
                        ));
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::parse_expression;
    use crate::model::fixture::{method, Fixture};
    use crate::model::LibTypes;
    use crate::span::Pos;
    use crate::store::{BindingAttribute, BindingTargetBundle, VariableDecl};
    use std::path::PathBuf;

    fn bundle(directory: &str, is_merge: bool) -> LayoutFileBundle {
        LayoutFileBundle {
            file_name: "example".into(),
            directory: directory.into(),
            filepath: PathBuf::from(format!("res/{}/example.xml", directory)),
            module_package: "com.example".into(),
            class_override: None,
            is_merge,
            root_view_type: if is_merge {
                "android.view.View".into()
            } else {
                "android.widget.FrameLayout".into()
            },
            variables: vec![],
            imports: vec![],
            targets: vec![],
            has_data: false,
        }
    }

    fn target(tag: &str, id: Option<&str>) -> BindingTargetBundle {
        BindingTargetBundle {
            id: id.map(str::to_owned),
            tag: tag.into(),
            view_type: format!("android.widget.{}", tag),
            included_layout: None,
            direct_child_of_root: true,
            attributes: vec![],
            src: Source::unspanned(PathBuf::from("res/layout/example.xml")),
        }
    }

    fn attribute(namespace: Option<&str>, name: &str, expr: &str, two_way: bool) -> BindingAttribute {
        BindingAttribute {
            namespace: namespace.map(str::to_owned),
            name: name.into(),
            expr_text: expr.into(),
            two_way,
            src: Source::unspanned(PathBuf::from("res/layout/example.xml")),
        }
    }

    #[test]
    fn duplicate_id_reports_every_occurrence() {
        let mut b = bundle("layout", false);
        b.targets.push(target("TextView", Some("@+id/shared_id")));
        b.targets.push(target("TextView", Some("@+id/shared_id")));
        b.targets.push(target("Button", Some("@+id/ok")));
        let mut diag = Diagnostics::new();
        check_duplicate_ids(&b, &mut diag);
        let errs = diag.errors();
        assert_eq!(errs.len(), 2);
        assert_eq!(
            errs[0].msg,
            "<TextView> tag defines a duplicate ID @+id/shared_id"
        );
        assert_eq!(errs[0].msg, errs[1].msg);
    }

    #[test]
    fn include_must_not_sit_under_merge_root() {
        let mut b = bundle("layout", true);
        let mut include = target("include", Some("@+id/inner"));
        include.included_layout = Some("other".into());
        b.targets.push(include);
        let mut diag = Diagnostics::new();
        check_include_inside_merge(&b, &mut diag);
        assert_eq!(diag.errors().len(), 1);
        assert_eq!(
            diag.errors()[0].msg,
            "<include> elements are not supported as direct children of a <merge> root"
        );
    }

    #[test]
    fn merge_agreement_lists_both_sides() {
        let bundles = vec![
            bundle("layout", true),
            bundle("layout-sw600dp", false),
            bundle("layout-land", false),
        ];
        let mut diag = Diagnostics::new();
        check_merge_agreement("example", &bundles, &mut diag);
        assert_eq!(diag.errors().len(), 1);
        assert_eq!(
            diag.errors()[0].msg,
            "Configurations for example.xml must agree on the use of a root <merge> tag.\n\n\
             Present:\n - layout\n\n\
             Absent:\n - layout-sw600dp\n - layout-land"
        );
    }

    #[test]
    fn merge_agreement_quiet_when_consistent() {
        let bundles = vec![bundle("layout", true), bundle("layout-land", true)];
        let mut diag = Diagnostics::new();
        check_merge_agreement("example", &bundles, &mut diag);
        assert!(!diag.has_errors());
    }

    #[test]
    fn variable_type_must_match_across_configurations() {
        let mut first = bundle("layout", false);
        first.variables.push(VariableDecl {
            name: "user".into(),
            type_str: "com.example.User".into(),
            declared_at: Source::unspanned(first.filepath.clone()),
        });
        let mut second = bundle("layout-land", false);
        second.variables.push(VariableDecl {
            name: "user".into(),
            type_str: "java.lang.String".into(),
            declared_at: Source::unspanned(second.filepath.clone()),
        });
        let mut diag = Diagnostics::new();
        check_multi_config_consistency("example", &[first, second], &mut diag);
        assert_eq!(diag.errors().len(), 1);
        assert_eq!(
            diag.errors()[0].msg,
            "Variable declarations must match between layout configurations. Variable 'user' \
             has type 'java.lang.String' in layout-land/example.xml which does not match the \
             other configurations"
        );
    }

    #[test]
    fn id_flipping_between_view_and_include() {
        let mut first = bundle("layout", false);
        first.targets.push(target("TextView", Some("@+id/slot")));
        let mut second = bundle("layout-land", false);
        let mut include = target("include", Some("@+id/slot"));
        include.included_layout = Some("other".into());
        second.targets.push(include);
        let mut diag = Diagnostics::new();
        check_multi_config_consistency("example", &[first, second], &mut diag);
        assert_eq!(diag.errors().len(), 1);
    }

    #[test]
    fn observable_getter_flagged_unless_two_way_root() {
        use crate::model::resolve::ObservableGetter;
        let src = Source::unspanned(PathBuf::from("res/layout/example.xml"));
        let mut resolved = ResolvedLayout::default();
        resolved.observable_getters.push(ObservableGetter {
            expr_id: 7,
            text: "item.label.get()".into(),
            src: src.clone(),
        });
        resolved.observable_getters.push(ObservableGetter {
            expr_id: 12,
            text: "item.count.get()".into(),
            src,
        });
        let exempt_expr =
            parse_expression("x", &PathBuf::from("example.xml"), Pos::new()).unwrap();
        let mut exempt = ParsedAttribute {
            target_index: 0,
            attr_index: 0,
            two_way: true,
            expr: exempt_expr,
        };
        exempt.expr.id = 7;
        let mut diag = Diagnostics::new();
        check_getter_on_observable(&[exempt], &resolved, &mut diag);
        assert_eq!(diag.errors().len(), 1);
        assert_eq!(
            diag.errors()[0].msg,
            "Do not call get() on an observable in a binding expression; use the observable \
             directly: item.count.get()"
        );
    }

    #[test]
    fn recursive_observable_cycle_detected() {
        use crate::model::resolve::ObservableEdge;
        let src = Source::unspanned(PathBuf::from("res/layout/example.xml"));
        let mut resolved = ResolvedLayout::default();
        resolved.observable_edges.push(ObservableEdge {
            owner: "com.example.A".into(),
            property: "b".into(),
            target: "com.example.B".into(),
            src: src.clone(),
        });
        resolved.observable_edges.push(ObservableEdge {
            owner: "com.example.B".into(),
            property: "a".into(),
            target: "com.example.A".into(),
            src: src.clone(),
        });
        // Unrelated acyclic edge.
        resolved.observable_edges.push(ObservableEdge {
            owner: "com.example.A".into(),
            property: "leaf".into(),
            target: "java.lang.String".into(),
            src,
        });
        let mut diag = Diagnostics::new();
        check_recursive_observables(&resolved, &mut diag);
        assert_eq!(diag.errors().len(), 2);
        assert_eq!(
            diag.errors()[0].msg,
            "Detected a recursive observable dependency: com.example.A.b"
        );
    }

    #[test]
    fn two_way_conflicts_with_explicit_event_listener() {
        let lib = LibTypes::new(true);
        let fixture = Fixture::with_android(&lib);
        let mut b = bundle("layout", false);
        let mut check_box = target("CheckBox", Some("@+id/agree"));
        check_box.attributes.push(attribute(
            Some("android"),
            "checked",
            "user.likesCats",
            true,
        ));
        check_box.attributes.push(attribute(
            Some("android"),
            "checkedAttrChanged",
            "handler.onChanged",
            false,
        ));
        b.targets.push(check_box);
        let resolver = Resolver::new(&fixture, &lib, &b);
        let mut diag = Diagnostics::new();
        check_two_way_event_conflicts(&b, &resolver, &mut diag);
        assert_eq!(diag.errors().len(), 1);
        assert_eq!(
            diag.errors()[0].msg,
            "The attribute 'android:checkedAttrChanged' is reserved for two-way binding and \
             cannot be assigned an explicit listener"
        );
    }

    #[test]
    fn lambda_parameter_count_checked_against_listener() {
        let lib = LibTypes::new(true);
        let fixture = Fixture::with_android(&lib);
        let mut b = bundle("layout", false);
        let mut view = target("TextView", Some("@+id/name"));
        view.attributes.push(attribute(
            Some("android"),
            "onClickListener",
            "(v, extra) -> v",
            false,
        ));
        b.targets.push(view);
        let expr = parse_expression("(v, extra) -> v", &b.filepath, Pos::new()).unwrap();
        let parsed = vec![ParsedAttribute {
            target_index: 0,
            attr_index: 0,
            two_way: false,
            expr,
        }];
        let resolver = Resolver::new(&fixture, &lib, &b);
        let mut diag = Diagnostics::new();
        check_callbacks(&b, &parsed, &resolver, &mut diag);
        assert_eq!(diag.errors().len(), 1);
        assert_eq!(
            diag.errors()[0].msg,
            "Listener method onClick expects 1 parameters but the lambda declares 2"
        );
    }

    #[test]
    fn duplicate_lambda_parameters() {
        let lib = LibTypes::new(true);
        let fixture = Fixture::with_android(&lib);
        let mut b = bundle("layout", false);
        let mut view = target("TextView", Some("@+id/name"));
        view.attributes
            .push(attribute(Some("android"), "onClickListener", "(v, v) -> v", false));
        b.targets.push(view);
        let expr = parse_expression("(v, v) -> v", &b.filepath, Pos::new()).unwrap();
        let parsed = vec![ParsedAttribute {
            target_index: 0,
            attr_index: 0,
            two_way: false,
            expr,
        }];
        let resolver = Resolver::new(&fixture, &lib, &b);
        let mut diag = Diagnostics::new();
        check_callbacks(&b, &parsed, &resolver, &mut diag);
        assert!(diag
            .errors()
            .iter()
            .any(|e| e.msg == "Lambda parameter 'v' is declared more than once"));
    }

    #[test]
    fn bindable_dependent_must_be_bindable_getter() {
        let lib = LibTypes::new(true);
        let mut fixture = Fixture::with_android(&lib);
        let item = fixture.class("com.example.Item", Some("java.lang.Object"));
        let mut label = method("getLabel", &[], "java.lang.String");
        label.bindable = true;
        label.bindable_dependencies = vec!["title".into()];
        let title = method("getTitle", &[], "java.lang.String");
        item.methods.extend(vec![label, title]);
        let mut b = bundle("layout", false);
        b.variables.push(VariableDecl {
            name: "item".into(),
            type_str: "com.example.Item".into(),
            declared_at: Source::unspanned(b.filepath.clone()),
        });
        let resolver = Resolver::new(&fixture, &lib, &b);
        let mut diag = Diagnostics::new();
        check_bindable_dependencies(&fixture, &b, &resolver, &mut diag);
        assert_eq!(diag.errors().len(), 1);
        assert_eq!(
            diag.errors()[0].msg,
            "The dependent property 'title' referenced by @Bindable must itself be annotated \
             with @Bindable"
        );
    }

    #[test]
    fn unused_variable_warns_without_failing() {
        let mut b = bundle("layout", false);
        b.variables.push(VariableDecl {
            name: "user".into(),
            type_str: "com.example.User".into(),
            declared_at: Source::unspanned(b.filepath.clone()),
        });
        b.variables.push(VariableDecl {
            name: "handler".into(),
            type_str: "com.example.Handler".into(),
            declared_at: Source::unspanned(b.filepath.clone()),
        });
        let expr = parse_expression("user.name", &b.filepath, Pos::new()).unwrap();
        let parsed = vec![ParsedAttribute {
            target_index: 0,
            attr_index: 0,
            two_way: false,
            expr,
        }];
        let mut diag = Diagnostics::new();
        check_unused_variables(&b, &parsed, &mut diag);
        assert!(!diag.has_errors());
        assert_eq!(diag.warnings().len(), 1);
        assert_eq!(
            diag.warnings()[0].msg,
            "The variable 'handler' is declared but is never used in a binding expression"
        );
    }

    #[test]
    fn missing_include_target_reported() {
        let mut resources = ResourceBundle::new("com.example".into(), true);
        let mut b = bundle("layout", false);
        let mut include = target("include", Some("@+id/inner"));
        include.included_layout = Some("missing_layout".into());
        b.targets.push(include);
        resources.add_layout_bundle(b);
        let mut diag = Diagnostics::new();
        check_includes(&resources, &mut diag);
        assert_eq!(diag.errors().len(), 1);
        assert_eq!(
            diag.errors()[0].msg,
            "Cannot find the target layout missing_layout for the <include> with id '@+id/inner'"
        );
    }
}
