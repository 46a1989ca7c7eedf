pub mod class_info;
pub mod res_ref;

use std::collections::BTreeMap;
use std::path::PathBuf;

use fnv::FnvHashMap;

use crate::span::Source;
use crate::strutils;

pub use class_info::{GenClass, GenClassInfoLog};
pub use res_ref::XmlResourceReference;

/// A `<variable name= type=>` declaration from a layout's `<data>` section.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VariableDecl {
    pub name: String,
    pub type_str: String,
    pub declared_at: Source,
}

/// An `<import type= alias=>` declaration from a layout's `<data>` section.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportDecl {
    pub alias: String,
    pub type_str: String,
    pub declared_at: Source,
}

/// One expression-bearing attribute on a binding target. `expr_text` has the
/// `@{`/`@={` wrapper stripped; `value_span` still covers the raw attribute
/// value so diagnostics can slice the original file text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BindingAttribute {
    pub namespace: Option<String>,
    pub name: String,
    pub expr_text: String,
    pub two_way: bool,
    pub src: Source,
}

impl BindingAttribute {
    pub fn full_name(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{}:{}", ns, self.name),
            None => self.name.clone(),
        }
    }
}

/// One bound view or `<include>` inside a layout file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BindingTargetBundle {
    /// Raw id reference as written, e.g. `@+id/name`.
    pub id: Option<String>,
    /// The XML tag, e.g. `TextView` or `include`.
    pub tag: String,
    /// Fully-qualified view type; for includes, resolved later from the
    /// included layout's binding class.
    pub view_type: String,
    /// Base name of the included layout for `<include>` targets.
    pub included_layout: Option<String>,
    /// Whether this target sits directly under the root element; needed for
    /// the include-inside-merge check.
    pub direct_child_of_root: bool,
    pub attributes: Vec<BindingAttribute>,
    pub src: Source,
}

impl BindingTargetBundle {
    pub fn is_binder(&self) -> bool {
        self.included_layout.is_some()
    }
}

/// One parsed layout file for one configuration. Immutable once the layout
/// parser has produced it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LayoutFileBundle {
    /// Base file name without extension, e.g. `main_activity`.
    pub file_name: String,
    /// Configuration directory, e.g. `layout` or `layout-land`.
    pub directory: String,
    pub filepath: PathBuf,
    pub module_package: String,
    /// Optional explicit class from `<data class=...>`.
    pub class_override: Option<(String, Source)>,
    pub is_merge: bool,
    /// Fully-qualified root view type (`android.view.View` for `<merge>`).
    pub root_view_type: String,
    pub variables: Vec<VariableDecl>,
    pub imports: Vec<ImportDecl>,
    pub targets: Vec<BindingTargetBundle>,
    /// Whether the file had a `<layout>`/`<data>` wrapper (a data binding
    /// layout rather than a plain view binding one).
    pub has_data: bool,
}

impl LayoutFileBundle {
    /// Package and simple name of the generated binding class, honoring the
    /// `<data class=...>` override forms: `Name`, `.Name` and `com.all.Name`.
    pub fn binding_class(&self) -> (String, String) {
        let default_package = format!("{}.databinding", self.module_package);
        match &self.class_override {
            None => (
                default_package,
                format!("{}Binding", strutils::to_class_part(&self.file_name)),
            ),
            Some((custom, _)) => {
                if let Some(stripped) = custom.strip_prefix('.') {
                    (self.module_package.clone(), stripped.to_owned())
                } else if custom.contains('.') {
                    let (pkg, name) = strutils::split_qualified(custom);
                    (pkg.to_owned(), name.to_owned())
                } else {
                    (default_package, custom.clone())
                }
            }
        }
    }

    pub fn binding_class_qualified(&self) -> String {
        let (pkg, name) = self.binding_class();
        format!("{}.{}", pkg, name)
    }

    pub fn find_variable(&self, name: &str) -> Option<&VariableDecl> {
        self.variables.iter().find(|v| v.name == name)
    }

    pub fn find_import(&self, alias: &str) -> Option<&ImportDecl> {
        self.imports.iter().find(|i| i.alias == alias)
    }
}

/// All layout bundles for one module, grouped by base file name.
#[derive(Debug)]
pub struct ResourceBundle {
    pub app_package: String,
    pub use_androidx: bool,
    layout_bundles: BTreeMap<String, Vec<LayoutFileBundle>>,
    /// layout name -> binding class generated by an upstream module, used to
    /// resolve cross-module `<include>`s.
    dependency_binding_classes: FnvHashMap<String, String>,
}

impl ResourceBundle {
    pub fn new(app_package: String, use_androidx: bool) -> ResourceBundle {
        ResourceBundle {
            app_package,
            use_androidx,
            layout_bundles: BTreeMap::new(),
            dependency_binding_classes: FnvHashMap::default(),
        }
    }

    pub fn add_layout_bundle(&mut self, bundle: LayoutFileBundle) {
        log::debug!(
            "adding layout bundle {}/{}",
            bundle.directory,
            bundle.file_name
        );
        self.layout_bundles
            .entry(bundle.file_name.clone())
            .or_insert_with(Vec::new)
            .push(bundle);
    }

    pub fn add_dependency_binding_class(&mut self, layout_name: &str, qualified_class: &str) {
        self.dependency_binding_classes
            .insert(layout_name.to_owned(), qualified_class.to_owned());
    }

    pub fn layout_bundles(&self) -> impl Iterator<Item = (&String, &Vec<LayoutFileBundle>)> {
        self.layout_bundles.iter()
    }

    pub fn bundles_for(&self, layout_name: &str) -> Option<&Vec<LayoutFileBundle>> {
        self.layout_bundles.get(layout_name)
    }

    /// Binding class for an included layout: in-module layouts win over
    /// classes exported by dependencies.
    pub fn binding_class_for_layout(&self, layout_name: &str) -> Option<String> {
        if let Some(bundles) = self.layout_bundles.get(layout_name) {
            return bundles.first().map(|b| b.binding_class_qualified());
        }
        self.dependency_binding_classes.get(layout_name).cloned()
    }
}
