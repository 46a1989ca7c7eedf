//! Batch compilation: walk a module's `res/` tree, parse and check every
//! layout, then emit one binding class per layout name.
//!
//! Generation is best-effort: a broken expression fails its own attribute
//! but the surrounding class still generates, so one bad layout does not
//! hide errors in the others. The run as a whole fails if any error was
//! collected.

use std::fs;
use std::path::{Path, PathBuf};

use structopt::StructOpt;

use crate::analysis::{self, ParsedAttribute};
use crate::binder::{self, BaseLayoutModel};
use crate::errors::{BindError, BindErrorKind, BindResult, Diagnostics};
use crate::expr::{self, ExprKind};
use crate::layout::LayoutParser;
use crate::messages;
use crate::model::resolve::has_setter_for_member;
use crate::model::{ClasspathIndex, LibTypes, ResolvedLayout, Resolver};
use crate::span::Pos;
use crate::store::{GenClassInfoLog, LayoutFileBundle, ResourceBundle};
use crate::writer;

#[derive(Debug, StructOpt)]
pub struct Options {
    #[structopt(
        name = "res-dir",
        parse(from_os_str),
        help = "Resource directory holding the layout folders"
    )]
    pub res_dir: PathBuf,

    #[structopt(
        long = "out",
        parse(from_os_str),
        help = "Directory generated sources are written to"
    )]
    pub out_dir: PathBuf,

    #[structopt(long = "package", help = "Module package the R class belongs to")]
    pub module_package: String,

    #[structopt(long = "use-androidx", help = "Generate androidx classes and annotations")]
    pub use_androidx: bool,

    /// Serialized [`ClasspathIndex`]. Without one, binding expressions are
    /// not resolved and variables keep their declared types.
    #[structopt(
        long = "classpath-index",
        parse(from_os_str),
        help = "Serialized classpath index used to resolve binding expressions"
    )]
    pub classpath_index: Option<PathBuf>,

    /// Where to write this run's class-info log.
    #[structopt(
        long = "class-info-log",
        parse(from_os_str),
        help = "Where to write the class-info log for this run"
    )]
    pub class_info_log: Option<PathBuf>,

    /// Last run's log; layouts present there but not in this run have their
    /// generated files removed.
    #[structopt(
        long = "previous-log",
        parse(from_os_str),
        help = "Class-info log of the previous run, used to remove stale classes"
    )]
    pub previous_log: Option<PathBuf>,

    /// Logs exported by upstream modules, for cross-module `<include>`s.
    #[structopt(
        long = "dependency-log",
        parse(from_os_str),
        help = "Class-info log exported by a dependency module"
    )]
    pub dependency_logs: Vec<PathBuf>,
}

#[derive(Debug, Default)]
pub struct Summary {
    pub written: Vec<PathBuf>,
    pub removed: Vec<PathBuf>,
    pub warnings: Vec<BindError>,
}

pub fn run(options: &Options) -> Result<Summary, Vec<BindError>> {
    let mut diag = Diagnostics::new();
    let mut summary = Summary::default();

    let classpath = match &options.classpath_index {
        Some(path) => match ClasspathIndex::load(path) {
            Ok(index) => Some(index),
            Err(err) => return Err(vec![err]),
        },
        None => None,
    };
    let lib = LibTypes::new(options.use_androidx);

    let mut resources =
        ResourceBundle::new(options.module_package.clone(), options.use_androidx);
    for path in discover_layout_files(&options.res_dir).map_err(|e| vec![e])? {
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) => {
                diag.error(BindError::from(err));
                continue;
            }
        };
        let parser = LayoutParser::new(&text, &path, &options.module_package);
        match parser.parse(&mut diag) {
            Ok(Some(bundle)) => resources.add_layout_bundle(bundle),
            Ok(None) => log::debug!("skipping {}, no binding data", path.display()),
            Err(err) => diag.error(err),
        }
    }

    let mut dep_log = GenClassInfoLog::new();
    for dep in &options.dependency_logs {
        match GenClassInfoLog::load(dep) {
            Ok(log) => dep_log.add_all(log),
            Err(err) => diag.error(err),
        }
    }
    for (layout_name, info) in dep_log.mappings() {
        resources.add_dependency_binding_class(layout_name, &info.qualified_name);
    }

    for (name, bundles) in resources.layout_bundles() {
        analysis::check_merge_agreement(name, bundles, &mut diag);
        analysis::check_multi_config_consistency(name, bundles, &mut diag);
        for bundle in bundles {
            analysis::validate_bundle(bundle, &mut diag);
            if let Some(classpath) = &classpath {
                compile_bundle(classpath, &lib, bundle, &mut diag);
            }
        }
    }
    analysis::check_includes(&resources, &mut diag);

    let mut log = GenClassInfoLog::new();
    for (name, bundles) in resources.layout_bundles() {
        let model = BaseLayoutModel::new(name.clone(), bundles.clone());
        let view_binder = binder::to_view_binder(&model, &resources, &mut diag);
        log.add_mapping(name, binder::generated_class_info(&view_binder, &model));

        let generated = if model.has_data() {
            let variables = resolved_variables(classpath.as_ref(), &lib, &model);
            writer::generate_data_binding(&view_binder, &lib, &variables)
        } else {
            writer::generate_view_binder(&view_binder, &lib)
        };
        match write_class(&options.out_dir, &view_binder.qualified_name(), &generated) {
            Ok(path) => summary.written.push(path),
            Err(err) => diag.error(err),
        }
    }

    if let Some(previous_path) = &options.previous_log {
        match GenClassInfoLog::load(previous_path) {
            Ok(previous) => {
                for qualified in log.deletions_since(&previous) {
                    let path = class_path(&options.out_dir, &qualified);
                    if path.exists() {
                        log::info!("removing stale binding class {}", path.display());
                        if let Err(err) = fs::remove_file(&path) {
                            diag.error(BindError::from(err));
                        } else {
                            summary.removed.push(path);
                        }
                    }
                }
            }
            Err(err) => diag.error(err),
        }
    }
    if let Some(log_path) = &options.class_info_log {
        if let Err(err) = log.save(log_path) {
            diag.error(err);
        }
    }

    match diag.assert_no_errors() {
        Ok(warnings) => {
            summary.warnings = warnings;
            Ok(summary)
        }
        Err(errors) => Err(errors),
    }
}

/// XML files under `layout/` and every `layout-<qualifier>/` directory,
/// sorted so runs are deterministic.
pub fn discover_layout_files(res_dir: &Path) -> BindResult<Vec<PathBuf>> {
    let mut files = vec![];
    for entry in fs::read_dir(res_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let dir_name = entry.file_name();
        let dir_name = dir_name.to_string_lossy();
        if dir_name != "layout" && !dir_name.starts_with("layout-") {
            continue;
        }
        for file in fs::read_dir(entry.path())? {
            let path = file?.path();
            if path.extension().map_or(false, |ext| ext == "xml") {
                files.push(path);
            }
        }
    }
    files.sort();
    Ok(files)
}

/// Parse and resolve every binding expression of one layout file, then run
/// the expression-level checks over the result.
fn compile_bundle(
    classpath: &ClasspathIndex,
    lib: &LibTypes,
    bundle: &LayoutFileBundle,
    diag: &mut Diagnostics,
) {
    let parsed = parse_attributes(bundle, diag);
    let mut resolver = Resolver::new(classpath, lib, bundle);
    let mut resolved = ResolvedLayout::default();

    for p in &parsed {
        let target = &bundle.targets[p.target_index];
        let attr = &target.attributes[p.attr_index];
        let value_type = match resolver.resolve(&p.expr, &mut resolved, diag) {
            Some(value_type) => value_type,
            None => continue,
        };
        // Observable wrappers unwrap at the binding boundary; the setter
        // sees the wrapped value type.
        let setter_value = lib
            .wrapper_getter(&value_type)
            .map(|(_, inner)| inner)
            .unwrap_or_else(|| value_type.clone());
        if resolver
            .resolve_setter(&target.view_type, attr, &setter_value)
            .is_none()
        {
            diag.error(BindError::new(
                messages::format(
                    messages::CANNOT_FIND_SETTER_CALL,
                    &[&attr.full_name(), &setter_value, &target.view_type],
                ),
                attr.src.clone(),
                BindErrorKind::Resolve,
            ));
        }
        if attr.two_way {
            if resolver.resolve_inverse(&target.view_type, attr).is_none() {
                diag.error(BindError::new(
                    messages::format(
                        messages::CANNOT_FIND_INVERSE_METHOD,
                        &[&attr.full_name(), &target.view_type],
                    ),
                    attr.src.clone(),
                    BindErrorKind::Resolve,
                ));
            }
            // The value side must be writable: an observable wrapper, its
            // getter call, or a member its owner exposes a setter or public
            // field for.
            let invertible = match &p.expr.kind {
                ExprKind::FieldAccess { target, name, .. } => {
                    lib.is_observable_wrapper(&value_type)
                        || resolved
                            .types
                            .get(&target.id)
                            .map_or(true, |owner| has_setter_for_member(classpath, owner, name))
                }
                ExprKind::MethodCall { target, name, args, .. } if args.is_empty() => resolved
                    .types
                    .get(&target.id)
                    .and_then(|owner| lib.wrapper_getter(owner))
                    .map_or(false, |(getter, _)| getter == name.as_str()),
                _ => false,
            };
            if !invertible {
                diag.error(BindError::new(
                    messages::format(messages::TWO_WAY_NOT_INVERTIBLE, &[&attr.expr_text]),
                    attr.src.clone(),
                    BindErrorKind::Semantic,
                ));
            }
        }
    }

    analysis::validate_expressions(bundle, &parsed, &resolver, &resolved, diag);
    analysis::check_bindable_dependencies(classpath, bundle, &resolver, diag);
}

/// All binding expressions of a file, numbered from a shared id counter so
/// the per-layout resolution table keys stay distinct.
fn parse_attributes(bundle: &LayoutFileBundle, diag: &mut Diagnostics) -> Vec<ParsedAttribute> {
    let mut parsed = vec![];
    let mut next_id = 0;
    for (target_index, target) in bundle.targets.iter().enumerate() {
        for (attr_index, attr) in target.attributes.iter().enumerate() {
            let start = attr.src.span.map_or_else(Pos::new, |s| s.start);
            match expr::parse_expression_from(&attr.expr_text, &bundle.filepath, start, next_id) {
                Ok(expr) => {
                    expr.walk(&mut |e| next_id = next_id.max(e.id + 1));
                    parsed.push(ParsedAttribute {
                        target_index,
                        attr_index,
                        two_way: attr.two_way,
                        expr,
                    });
                }
                Err(err) => diag.error(err),
            }
        }
    }
    parsed
}

/// Variable (name, type) pairs for a data layout, the union across every
/// configuration; types resolve through the declaring variation's imports
/// when a classpath is available.
fn resolved_variables(
    classpath: Option<&ClasspathIndex>,
    lib: &LibTypes,
    model: &BaseLayoutModel,
) -> Vec<(String, String)> {
    model
        .variables()
        .into_iter()
        .map(|(variation, v)| {
            let resolved = classpath
                .map(|c| Resolver::new(c, lib, variation))
                .and_then(|r| r.resolve_type_name(&v.type_str))
                .unwrap_or_else(|| v.type_str.clone());
            (v.name.clone(), resolved)
        })
        .collect()
}

fn class_path(out_dir: &Path, qualified_name: &str) -> PathBuf {
    let mut path = out_dir.to_path_buf();
    for part in qualified_name.split('.') {
        path.push(part);
    }
    path.set_extension("java");
    path
}

fn write_class(out_dir: &Path, qualified_name: &str, contents: &str) -> BindResult<PathBuf> {
    let path = class_path(out_dir, qualified_name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    log::debug!("writing {}", path.display());
    fs::write(&path, contents)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workspace(name: &str) -> PathBuf {
        let root = std::env::temp_dir().join(format!("databind-driver-{}", name));
        fs::remove_dir_all(&root).ok();
        fs::create_dir_all(&root).unwrap();
        root
    }

    fn write_file(path: &Path, text: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, text).unwrap();
    }

    fn options(root: &Path) -> Options {
        Options {
            res_dir: root.join("res"),
            out_dir: root.join("out"),
            module_package: "com.example".to_owned(),
            use_androidx: true,
            classpath_index: None,
            class_info_log: None,
            previous_log: None,
            dependency_logs: vec![],
        }
    }

    #[test]
    fn generates_binding_class_across_configurations() {
        let root = workspace("multi-config");
        write_file(
            &root.join("res/layout/main.xml"),
            r#"<LinearLayout xmlns:android="http://schemas.android.com/apk/res/android">
                <TextView android:id="@+id/name"/>
            </LinearLayout>"#,
        );
        write_file(
            &root.join("res/layout-land/main.xml"),
            r#"<LinearLayout xmlns:android="http://schemas.android.com/apk/res/android"/>"#,
        );

        let summary = run(&options(&root)).unwrap();
        assert_eq!(summary.written.len(), 1);
        let generated = fs::read_to_string(&summary.written[0]).unwrap();
        assert!(generated.contains("public final class MainBinding implements ViewBinding {"));
        // name exists only in layout/, so the field is nullable and documented
        assert!(generated.contains("@Nullable\n  public final TextView name;"));
        assert!(generated.contains("<li>layout-land/</li>"));
        assert!(generated.contains("public LinearLayout getRoot() {"));
        fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn merge_disagreement_fails_the_run() {
        let root = workspace("merge-mismatch");
        write_file(
            &root.join("res/layout/main.xml"),
            r#"<merge xmlns:android="http://schemas.android.com/apk/res/android">
                <TextView android:id="@+id/name"/>
            </merge>"#,
        );
        write_file(
            &root.join("res/layout-land/main.xml"),
            r#"<LinearLayout xmlns:android="http://schemas.android.com/apk/res/android"/>"#,
        );

        let errors = run(&options(&root)).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.msg.contains("must agree on the use of a root <merge> tag")));
        fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn stale_classes_are_removed_using_the_previous_log() {
        let root = workspace("stale-classes");
        write_file(
            &root.join("res/layout/first.xml"),
            r#"<LinearLayout xmlns:android="http://schemas.android.com/apk/res/android"/>"#,
        );
        write_file(
            &root.join("res/layout/second.xml"),
            r#"<LinearLayout xmlns:android="http://schemas.android.com/apk/res/android"/>"#,
        );
        let log_path = root.join("class-info.bin");
        let mut opts = options(&root);
        opts.class_info_log = Some(log_path.clone());
        run(&opts).unwrap();

        fs::remove_file(root.join("res/layout/second.xml")).unwrap();
        opts.previous_log = Some(log_path);
        let summary = run(&opts).unwrap();
        assert_eq!(summary.written.len(), 1);
        assert_eq!(summary.removed.len(), 1);
        assert!(summary.removed[0].ends_with("com/example/databinding/SecondBinding.java"));
        assert!(!summary.removed[0].exists());
        fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn discovery_is_limited_to_layout_directories() {
        let root = workspace("discovery");
        write_file(
            &root.join("res/layout/a.xml"),
            r#"<LinearLayout xmlns:android="http://schemas.android.com/apk/res/android"/>"#,
        );
        write_file(&root.join("res/values/strings.xml"), "<resources/>");
        write_file(&root.join("res/layout/notes.txt"), "not a layout");

        let files = discover_layout_files(&root.join("res")).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("res/layout/a.xml"));
        fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn included_layouts_resolve_through_dependency_logs() {
        let root = workspace("dependency-logs");
        write_file(
            &root.join("res/layout/main.xml"),
            r#"<FrameLayout xmlns:android="http://schemas.android.com/apk/res/android">
                <include android:id="@+id/header" layout="@layout/header"/>
            </FrameLayout>"#,
        );
        let dep_log_path = root.join("dep.bin");
        let mut dep_log = GenClassInfoLog::new();
        dep_log.add_mapping(
            "header",
            crate::store::GenClass {
                qualified_name: "com.dep.databinding.HeaderBinding".to_owned(),
                module_package: "com.dep.databinding".to_owned(),
                variables: Default::default(),
            },
        );
        dep_log.save(&dep_log_path).unwrap();

        let mut opts = options(&root);
        opts.dependency_logs = vec![dep_log_path];
        let summary = run(&opts).unwrap();
        let generated = fs::read_to_string(&summary.written[0]).unwrap();
        assert!(generated.contains("import com.dep.databinding.HeaderBinding;"));
        assert!(generated.contains("HeaderBinding.bind(header)"));
        fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn unknown_include_is_an_error() {
        let root = workspace("unknown-include");
        write_file(
            &root.join("res/layout/main.xml"),
            r#"<FrameLayout xmlns:android="http://schemas.android.com/apk/res/android">
                <include android:id="@+id/header" layout="@layout/missing"/>
            </FrameLayout>"#,
        );
        let errors = run(&options(&root)).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.msg.contains("Cannot find the target layout missing")));
        fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn expressions_resolve_against_a_classpath_index() {
        use crate::model::fixture::{field, method};
        use crate::model::ClassRecord;

        let root = workspace("classpath");
        write_file(
            &root.join("res/layout/profile.xml"),
            r#"<layout xmlns:android="http://schemas.android.com/apk/res/android">
                <data>
                    <variable name="user" type="com.example.User"/>
                </data>
                <LinearLayout>
                    <TextView android:id="@+id/name" android:text="@{user.name}"/>
                </LinearLayout>
            </layout>"#,
        );

        let mut index = ClasspathIndex::new();
        let class = |name: &str, superclass: Option<&str>| ClassRecord {
            name: name.to_owned(),
            superclass: superclass.map(str::to_owned),
            interfaces: vec![],
            is_interface: false,
            methods: vec![],
            fields: vec![],
        };
        index.add_class(class("java.lang.Object", None));
        index.add_class(ClassRecord {
            is_interface: true,
            ..class("java.lang.CharSequence", None)
        });
        index.add_class(ClassRecord {
            interfaces: vec!["java.lang.CharSequence".to_owned()],
            ..class("java.lang.String", Some("java.lang.Object"))
        });
        index.add_class(class("android.view.View", Some("java.lang.Object")));
        index.add_class(class("android.view.ViewGroup", Some("android.view.View")));
        index.add_class(class(
            "android.widget.LinearLayout",
            Some("android.view.ViewGroup"),
        ));
        index.add_class(ClassRecord {
            methods: vec![method("setText", &["java.lang.CharSequence"], "void")],
            ..class("android.widget.TextView", Some("android.view.View"))
        });
        index.add_class(ClassRecord {
            fields: vec![field("name", "java.lang.String")],
            ..class("com.example.User", Some("java.lang.Object"))
        });
        let index_path = root.join("classpath.bin");
        index.save(&index_path).unwrap();

        let mut opts = options(&root);
        opts.classpath_index = Some(index_path);
        let summary = run(&opts).unwrap();
        let generated = fs::read_to_string(&summary.written[0]).unwrap();
        assert!(generated.contains("public final class ProfileBinding implements ViewBinding {"));
        assert!(generated.contains("import com.example.User;"));
        assert!(generated.contains("public void setUser(@Nullable User user) {"));
        fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn observable_getter_is_accepted_in_two_way_bindings() {
        use crate::model::fixture::{field, method};
        use crate::model::ClassRecord;

        let root = workspace("two-way-wrapper");
        write_file(
            &root.join("res/layout/player.xml"),
            r#"<layout xmlns:android="http://schemas.android.com/apk/res/android">
                <data>
                    <variable name="item" type="com.example.Item"/>
                </data>
                <SeekBar android:id="@+id/level" android:progress="@={item.progress.get()}"/>
            </layout>"#,
        );

        let mut index = ClasspathIndex::new();
        let class = |name: &str, superclass: Option<&str>| ClassRecord {
            name: name.to_owned(),
            superclass: superclass.map(str::to_owned),
            interfaces: vec![],
            is_interface: false,
            methods: vec![],
            fields: vec![],
        };
        index.add_class(class("java.lang.Object", None));
        index.add_class(class("android.view.View", Some("java.lang.Object")));
        index.add_class(ClassRecord {
            methods: vec![
                method("setProgress", &["int"], "void"),
                method("getProgress", &[], "int"),
            ],
            ..class("android.widget.SeekBar", Some("android.view.View"))
        });
        index.add_class(ClassRecord {
            fields: vec![field("progress", "androidx.databinding.ObservableInt")],
            ..class("com.example.Item", Some("java.lang.Object"))
        });
        let index_path = root.join("classpath.bin");
        index.save(&index_path).unwrap();

        let mut opts = options(&root);
        opts.classpath_index = Some(index_path);
        let summary = run(&opts).unwrap();
        let generated = fs::read_to_string(&summary.written[0]).unwrap();
        assert!(generated.contains("public void setItem(@Nullable Item item) {"));
        fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn variables_merge_across_configurations() {
        let root = workspace("variable-union");
        write_file(
            &root.join("res/layout/main.xml"),
            r#"<layout xmlns:android="http://schemas.android.com/apk/res/android">
                <data>
                    <variable name="title" type="java.lang.String"/>
                </data>
                <TextView android:id="@+id/label"/>
            </layout>"#,
        );
        write_file(
            &root.join("res/layout-land/main.xml"),
            r#"<layout xmlns:android="http://schemas.android.com/apk/res/android">
                <data>
                    <variable name="title" type="java.lang.String"/>
                    <variable name="subtitle" type="java.lang.String"/>
                </data>
                <TextView android:id="@+id/label"/>
            </layout>"#,
        );

        let log_path = root.join("class-info.bin");
        let mut opts = options(&root);
        opts.class_info_log = Some(log_path.clone());
        let summary = run(&opts).unwrap();
        let generated = fs::read_to_string(&summary.written[0]).unwrap();
        assert!(generated.contains("public void setTitle("));
        assert!(generated.contains("public void setSubtitle("));

        let log = GenClassInfoLog::load(&log_path).unwrap();
        let info = log.get("main").unwrap();
        assert_eq!(info.module_package, "com.example");
        assert!(info.variables.contains_key("title"));
        assert!(info.variables.contains_key("subtitle"));
        fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn unresolvable_member_fails_the_run() {
        let root = workspace("bad-member");
        write_file(
            &root.join("res/layout/profile.xml"),
            r#"<layout xmlns:android="http://schemas.android.com/apk/res/android">
                <data>
                    <variable name="user" type="com.example.User"/>
                </data>
                <TextView android:id="@+id/name" android:text="@{user.missing}"/>
            </layout>"#,
        );
        let mut index = ClasspathIndex::new();
        index.add_class(crate::model::ClassRecord {
            name: "com.example.User".to_owned(),
            superclass: None,
            interfaces: vec![],
            is_interface: false,
            methods: vec![],
            fields: vec![],
        });
        let index_path = root.join("classpath.bin");
        index.save(&index_path).unwrap();

        let mut opts = options(&root);
        opts.classpath_index = Some(index_path);
        let errors = run(&opts).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.msg.contains("Cannot find field or getter for 'missing'")));
        fs::remove_dir_all(&root).ok();
    }
}
