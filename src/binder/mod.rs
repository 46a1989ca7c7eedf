//! Merged, configuration-independent model for one layout name.
//!
//! N per-configuration bundles become one [`ViewBinder`]: one field per
//! bound id, presence and absence tracked per configuration directory, a
//! root node that is either a `<merge>` or a concrete view type.

use fnv::FnvHashSet;

use crate::errors::Diagnostics;
use crate::store::{LayoutFileBundle, ResourceBundle, VariableDecl, XmlResourceReference};
use crate::strutils;

pub const ANDROID_VIEW: &str = "android.view.View";

/// Hands out names, deterministically suffixing a trailing underscore until
/// the name is free. Allocation order decides who keeps the bare name.
#[derive(Debug, Default)]
pub struct NameAllocator {
    taken: FnvHashSet<String>,
}

impl NameAllocator {
    pub fn new() -> NameAllocator {
        NameAllocator::default()
    }

    pub fn new_name(&mut self, base: &str) -> String {
        let mut name = base.to_owned();
        while !self.taken.insert(name.clone()) {
            name.push('_');
        }
        name
    }
}

/// All configurations of one base layout, in declaration order.
#[derive(Debug)]
pub struct BaseLayoutModel {
    base_name: String,
    variations: Vec<LayoutFileBundle>,
}

impl BaseLayoutModel {
    pub fn new(base_name: String, variations: Vec<LayoutFileBundle>) -> BaseLayoutModel {
        BaseLayoutModel {
            base_name,
            variations,
        }
    }

    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    pub fn variations(&self) -> &[LayoutFileBundle] {
        &self.variations
    }

    pub fn module_package(&self) -> &str {
        &self.variations[0].module_package
    }

    pub fn has_data(&self) -> bool {
        self.variations.iter().any(|v| v.has_data)
    }

    /// Union of the `<variable>` declarations across all configurations, in
    /// declaration order, paired with the configuration that declares them.
    /// The first declaration of a name wins; analysis reports type conflicts.
    pub fn variables(&self) -> Vec<(&LayoutFileBundle, &VariableDecl)> {
        let mut seen = FnvHashSet::default();
        let mut variables = vec![];
        for variation in &self.variations {
            for variable in &variation.variables {
                if seen.insert(variable.name.as_str()) {
                    variables.push((variation, variable));
                }
            }
        }
        variables
    }

    /// Configuration directories an id is present in and absent from, both
    /// in declaration order.
    pub fn configuration_membership(&self, id: &str) -> (Vec<String>, Vec<String>) {
        let mut present = vec![];
        let mut absent = vec![];
        for variation in &self.variations {
            let has = variation
                .targets
                .iter()
                .any(|t| t.id.as_deref() == Some(id));
            if has {
                present.push(variation.directory.clone());
            } else {
                absent.push(variation.directory.clone());
            }
        }
        (present, absent)
    }
}

/// Codegen-ready model of one generated binding class.
#[derive(Debug)]
pub struct ViewBinder {
    pub package: String,
    pub class_name: String,
    pub module_package: String,
    pub layout_name: String,
    pub bindings: Vec<ViewBinding>,
    pub root: RootNode,
}

#[derive(Debug, PartialEq, Eq)]
pub enum RootNode {
    Merge,
    View(String),
}

impl ViewBinder {
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.package, self.class_name)
    }

    pub fn root_type(&self) -> &str {
        match &self.root {
            RootNode::Merge => ANDROID_VIEW,
            RootNode::View(t) => t,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum Form {
    View,
    Binder,
}

/// One field of the generated class.
#[derive(Debug)]
pub struct ViewBinding {
    pub name: String,
    /// View class, or the included layout's binding class for binders.
    pub type_name: String,
    pub form: Form,
    pub id: ResourceReference,
    pub present: Vec<String>,
    pub absent: Vec<String>,
}

impl ViewBinding {
    pub fn is_required(&self) -> bool {
        self.absent.is_empty()
    }
}

/// An `R.id.name` style reference as it appears in generated code.
#[derive(Debug, PartialEq, Eq)]
pub struct ResourceReference {
    /// `None` for the module's own `R`, `Some("android")` for framework ids.
    pub namespace: Option<String>,
    pub name: String,
}

/// Build the binder for one layout name. Errors (unparseable ids, unknown
/// includes) are collected; the affected binding is skipped so the rest of
/// the class still generates.
pub fn to_view_binder(
    model: &BaseLayoutModel,
    resources: &ResourceBundle,
    diag: &mut Diagnostics,
) -> ViewBinder {
    let first = &model.variations()[0];
    let (package, class_name) = first.binding_class();

    // Unique ids in first-appearance order; sorted by field name below.
    let mut ids: Vec<&str> = vec![];
    for variation in model.variations() {
        for target in &variation.targets {
            if let Some(id) = target.id.as_deref() {
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
        }
    }

    let mut bindings = vec![];
    for id in ids {
        if let Some(binding) = build_binding(model, resources, id, diag) {
            bindings.push(binding);
        }
    }
    bindings.sort_by(|a, b| a.name.cmp(&b.name));

    let root = if model.variations().iter().any(|v| v.is_merge) {
        // Mixed merge usage is reported by analysis; any merge keeps the
        // generic root here.
        RootNode::Merge
    } else {
        let mut types: Vec<&str> = model
            .variations()
            .iter()
            .map(|v| v.root_view_type.as_str())
            .collect();
        types.dedup();
        match types.as_slice() {
            [single] => RootNode::View((*single).to_owned()),
            _ => RootNode::View(ANDROID_VIEW.to_owned()),
        }
    };

    ViewBinder {
        package,
        class_name,
        module_package: first.module_package.clone(),
        layout_name: model.base_name().to_owned(),
        bindings,
        root,
    }
}

fn build_binding(
    model: &BaseLayoutModel,
    resources: &ResourceBundle,
    id: &str,
    diag: &mut Diagnostics,
) -> Option<ViewBinding> {
    let occurrences: Vec<_> = model
        .variations()
        .iter()
        .flat_map(|v| {
            v.targets
                .iter()
                .filter(|t| t.id.as_deref() == Some(id))
                .map(move |t| (v, t))
        })
        .collect();
    let (_, first_target) = occurrences.first()?;

    let reference = match XmlResourceReference::parse(id) {
        Ok(reference) => reference,
        Err(mut err) => {
            err.src = vec![first_target.src.clone()];
            diag.error(err);
            return None;
        }
    };

    let (form, type_name) = if first_target.is_binder() {
        let layout = first_target.included_layout.as_deref()?;
        // Unknown include targets are reported by analysis; skip the field.
        let class = resources.binding_class_for_layout(layout)?;
        (Form::Binder, class)
    } else {
        let mut types: Vec<&str> = occurrences
            .iter()
            .map(|(_, t)| t.view_type.as_str())
            .collect();
        types.dedup();
        let type_name = match types.as_slice() {
            [single] => (*single).to_owned(),
            _ => ANDROID_VIEW.to_owned(),
        };
        (Form::View, type_name)
    };

    let (present, absent) = model.configuration_membership(id);
    Some(ViewBinding {
        name: strutils::to_field_name(&reference.name),
        type_name,
        form,
        id: ResourceReference {
            namespace: reference.namespace.clone(),
            name: reference.name.clone(),
        },
        present,
        absent,
    })
}

/// Class-info entry for the incremental log.
pub fn generated_class_info(
    binder: &ViewBinder,
    model: &BaseLayoutModel,
) -> crate::store::GenClass {
    crate::store::GenClass {
        qualified_name: binder.qualified_name(),
        module_package: binder.module_package.clone(),
        variables: model
            .variables()
            .into_iter()
            .map(|(_, v)| (v.name.clone(), v.type_str.clone()))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::Source;
    use crate::store::BindingTargetBundle;
    use std::path::PathBuf;

    fn bundle(directory: &str, root: &str) -> LayoutFileBundle {
        LayoutFileBundle {
            file_name: "example".into(),
            directory: directory.into(),
            filepath: PathBuf::from(format!("res/{}/example.xml", directory)),
            module_package: "com.example".into(),
            class_override: None,
            is_merge: root == "merge",
            root_view_type: if root == "merge" {
                ANDROID_VIEW.into()
            } else {
                root.to_owned()
            },
            variables: vec![],
            imports: vec![],
            targets: vec![],
            has_data: false,
        }
    }

    fn view(id: &str, view_type: &str) -> BindingTargetBundle {
        BindingTargetBundle {
            id: Some(id.to_owned()),
            tag: view_type.rsplit('.').next().unwrap().to_owned(),
            view_type: view_type.to_owned(),
            included_layout: None,
            direct_child_of_root: true,
            attributes: vec![],
            src: Source::unspanned(PathBuf::from("res/layout/example.xml")),
        }
    }

    fn include(id: &str, layout: &str) -> BindingTargetBundle {
        BindingTargetBundle {
            included_layout: Some(layout.to_owned()),
            tag: "include".into(),
            ..view(id, ANDROID_VIEW)
        }
    }

    fn binder_for(variations: Vec<LayoutFileBundle>) -> ViewBinder {
        let mut resources = ResourceBundle::new("com.example".into(), true);
        resources.add_layout_bundle(bundle("layout", "android.widget.FrameLayout"));
        let model = BaseLayoutModel::new("example".into(), variations);
        let mut diag = Diagnostics::new();
        let binder = to_view_binder(&model, &resources, &mut diag);
        assert!(!diag.has_errors(), "{:?}", diag.errors());
        binder
    }

    #[test]
    fn bindings_sorted_by_field_name() {
        let mut b = bundle("layout", "android.widget.LinearLayout");
        b.targets.push(view("@+id/zebra", "android.widget.TextView"));
        b.targets.push(view("@+id/apple_pie", "android.widget.TextView"));
        let binder = binder_for(vec![b]);
        let names: Vec<&str> = binder.bindings.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["applePie", "zebra"]);
    }

    #[test]
    fn membership_follows_declaration_order() {
        let mut first = bundle("layout", "android.widget.LinearLayout");
        first.targets.push(view("@+id/name", "android.widget.TextView"));
        let mut second = bundle("layout-sw600dp", "android.widget.LinearLayout");
        second.targets.push(view("@+id/name", "android.widget.TextView"));
        let third = bundle("layout-land", "android.widget.LinearLayout");

        let binder = binder_for(vec![first, second, third]);
        let binding = &binder.bindings[0];
        assert_eq!(binding.present, vec!["layout", "layout-sw600dp"]);
        assert_eq!(binding.absent, vec!["layout-land"]);
        assert!(!binding.is_required());
    }

    #[test]
    fn covariant_root_when_configurations_agree() {
        let binder = binder_for(vec![
            bundle("layout", "android.widget.LinearLayout"),
            bundle("layout-land", "android.widget.LinearLayout"),
        ]);
        assert_eq!(
            binder.root,
            RootNode::View("android.widget.LinearLayout".into())
        );
    }

    #[test]
    fn conflicting_roots_fall_back_to_view() {
        let binder = binder_for(vec![
            bundle("layout", "android.widget.LinearLayout"),
            bundle("layout-land", "android.widget.FrameLayout"),
        ]);
        assert_eq!(binder.root, RootNode::View(ANDROID_VIEW.into()));
    }

    #[test]
    fn merge_root_stays_generic() {
        let mut b = bundle("layout", "merge");
        b.targets.push(view("@+id/name", "android.widget.TextView"));
        let binder = binder_for(vec![b]);
        assert_eq!(binder.root, RootNode::Merge);
        assert_eq!(binder.root_type(), ANDROID_VIEW);
    }

    #[test]
    fn view_type_disagreement_degrades_to_view() {
        let mut first = bundle("layout", "android.widget.LinearLayout");
        first.targets.push(view("@+id/slot", "android.widget.TextView"));
        let mut second = bundle("layout-land", "android.widget.LinearLayout");
        second.targets.push(view("@+id/slot", "android.widget.Button"));
        let binder = binder_for(vec![first, second]);
        assert_eq!(binder.bindings[0].type_name, ANDROID_VIEW);
    }

    #[test]
    fn include_binds_to_other_binding_class() {
        let mut b = bundle("layout", "android.widget.FrameLayout");
        b.targets.push(include("@+id/other", "other"));
        let mut resources = ResourceBundle::new("com.example".into(), true);
        resources.add_layout_bundle(bundle("layout", "android.widget.FrameLayout"));
        let mut other = bundle("layout", "android.widget.FrameLayout");
        other.file_name = "other".into();
        resources.add_layout_bundle(other);
        let model = BaseLayoutModel::new("example".into(), vec![b]);
        let mut diag = Diagnostics::new();
        let binder = to_view_binder(&model, &resources, &mut diag);
        let binding = &binder.bindings[0];
        assert_eq!(binding.form, Form::Binder);
        assert_eq!(binding.type_name, "com.example.databinding.OtherBinding");
    }

    #[test]
    fn android_namespace_id() {
        let mut b = bundle("layout", "android.widget.FrameLayout");
        b.targets.push(view("@android:id/text1", "android.widget.TextView"));
        let binder = binder_for(vec![b]);
        assert_eq!(
            binder.bindings[0].id,
            ResourceReference {
                namespace: Some("android".into()),
                name: "text1".into(),
            }
        );
    }

    fn variable(name: &str, type_str: &str) -> VariableDecl {
        VariableDecl {
            name: name.to_owned(),
            type_str: type_str.to_owned(),
            declared_at: Source::unspanned(PathBuf::from("res/layout/example.xml")),
        }
    }

    #[test]
    fn variables_union_across_configurations() {
        let mut first = bundle("layout", "android.widget.LinearLayout");
        first.has_data = true;
        first.variables.push(variable("title", "java.lang.String"));
        let mut second = bundle("layout-land", "android.widget.LinearLayout");
        second.has_data = true;
        second.variables.push(variable("title", "java.lang.String"));
        second.variables.push(variable("subtitle", "java.lang.String"));

        let model = BaseLayoutModel::new("example".into(), vec![first, second]);
        let variables = model.variables();
        let names: Vec<&str> = variables.iter().map(|(_, v)| v.name.as_str()).collect();
        assert_eq!(names, vec!["title", "subtitle"]);
        // title resolves through the configuration that declared it first
        assert_eq!(variables[0].0.directory, "layout");
        assert_eq!(variables[1].0.directory, "layout-land");
    }

    #[test]
    fn class_info_carries_module_package_and_variables() {
        let mut b = bundle("layout", "android.widget.LinearLayout");
        b.has_data = true;
        b.variables.push(variable("user", "com.example.User"));
        let model = BaseLayoutModel::new("example".into(), vec![b]);
        let mut resources = ResourceBundle::new("com.example".into(), true);
        resources.add_layout_bundle(bundle("layout", "android.widget.FrameLayout"));
        let mut diag = Diagnostics::new();
        let binder = to_view_binder(&model, &resources, &mut diag);

        let info = generated_class_info(&binder, &model);
        assert_eq!(info.qualified_name, "com.example.databinding.ExampleBinding");
        assert_eq!(info.module_package, "com.example");
        assert_eq!(
            info.variables.get("user").map(String::as_str),
            Some("com.example.User")
        );
    }

    #[test]
    fn name_allocator_suffixes_deterministically() {
        let mut allocator = NameAllocator::new();
        assert_eq!(allocator.new_name("rootView"), "rootView");
        assert_eq!(allocator.new_name("rootView"), "rootView_");
        assert_eq!(allocator.new_name("rootView"), "rootView__");
    }
}
