//! Deterministic Java source emission.
//!
//! Given the same [`ViewBinder`] the output is byte-identical every run;
//! incremental builds diff generated files, so emission order, name
//! allocation and even blank lines are part of the contract. The body of
//! `bind` uses a labeled block so the common all-views-present path stays
//! branch-free and the missing-id throw is emitted once.

use std::collections::BTreeMap;

use crate::binder::{Form, NameAllocator, ResourceReference, RootNode, ViewBinder, ANDROID_VIEW};
use crate::model::{is_primitive, LibTypes};
use crate::strutils;

const ANDROID_LAYOUT_INFLATER: &str = "android.view.LayoutInflater";
const ANDROID_VIEW_GROUP: &str = "android.view.ViewGroup";
const JAVA_OVERRIDE: &str = "java.lang.Override";
const JAVA_STRING: &str = "java.lang.String";
const JAVA_NPE: &str = "java.lang.NullPointerException";

/// Line-oriented builder with 2-space indentation.
#[derive(Debug, Default)]
pub struct CodeBuilder {
    out: String,
    indent: usize,
}

impl CodeBuilder {
    pub fn new() -> CodeBuilder {
        CodeBuilder::default()
    }

    pub fn line(&mut self, text: &str) {
        for _ in 0..self.indent {
            self.out.push_str("  ");
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    pub fn blank(&mut self) {
        self.out.push('\n');
    }

    /// Emit a line and indent the following ones.
    pub fn open(&mut self, text: &str) {
        self.line(text);
        self.indent += 1;
    }

    pub fn close(&mut self, text: &str) {
        self.indent -= 1;
        self.line(text);
    }

    pub fn finish(self) -> String {
        self.out
    }
}

/// Tracks which classes are imported and renders type names accordingly:
/// simple when imported or same-package, fully qualified on a simple-name
/// clash.
struct TypeNames {
    package: String,
    by_simple: BTreeMap<String, String>,
}

impl TypeNames {
    fn new(package: &str) -> TypeNames {
        TypeNames {
            package: package.to_owned(),
            by_simple: BTreeMap::new(),
        }
    }

    fn register(&mut self, fqcn: &str) {
        let (_, simple) = strutils::split_qualified(fqcn);
        match self.by_simple.get(simple) {
            Some(existing) if existing != fqcn => {}
            _ => {
                self.by_simple.insert(simple.to_owned(), fqcn.to_owned());
            }
        }
    }

    fn name(&self, fqcn: &str) -> String {
        let (_, simple) = strutils::split_qualified(fqcn);
        match self.by_simple.get(simple) {
            Some(known) if known == fqcn => simple.to_owned(),
            _ => fqcn.to_owned(),
        }
    }

    /// Sorted import list; same-package classes are visible without one.
    fn imports(&self) -> Vec<&str> {
        let mut list: Vec<&str> = self
            .by_simple
            .values()
            .filter(|fqcn| {
                let (package, _) = strutils::split_qualified(fqcn);
                package != self.package
            })
            .map(String::as_str)
            .collect();
        list.sort_unstable();
        list
    }
}

pub fn generate_view_binder(binder: &ViewBinder, lib: &LibTypes) -> String {
    JavaFileGenerator::new(binder, lib, &[]).generate()
}

/// Data binding layouts additionally carry a field, setter and getter per
/// declared variable. `variables` is (name, resolved type) pairs in
/// declaration order.
pub fn generate_data_binding(
    binder: &ViewBinder,
    lib: &LibTypes,
    variables: &[(String, String)],
) -> String {
    JavaFileGenerator::new(binder, lib, variables).generate()
}

struct JavaFileGenerator<'a> {
    binder: &'a ViewBinder,
    lib: &'a LibTypes,
    variables: &'a [(String, String)],
    field_names: Vec<String>,
    variable_fields: Vec<String>,
    root_field: String,
    types: TypeNames,
}

impl<'a> JavaFileGenerator<'a> {
    fn new(
        binder: &'a ViewBinder,
        lib: &'a LibTypes,
        variables: &'a [(String, String)],
    ) -> JavaFileGenerator<'a> {
        // Binding names become public fields; they get first pick and the
        // root field yields on collision.
        let mut allocator = NameAllocator::new();
        let field_names: Vec<String> = binder
            .bindings
            .iter()
            .map(|b| allocator.new_name(&b.name))
            .collect();
        let variable_fields: Vec<String> = variables
            .iter()
            .map(|(name, _)| allocator.new_name(name))
            .collect();
        let root_field = allocator.new_name("rootView");

        let mut generator = JavaFileGenerator {
            binder,
            lib,
            variables,
            field_names,
            variable_fields,
            root_field,
            types: TypeNames::new(&binder.package),
        };
        generator.register_types();
        generator
    }

    fn has_required(&self) -> bool {
        self.binder.bindings.iter().any(|b| b.is_required())
    }

    fn has_optional(&self) -> bool {
        self.binder.bindings.iter().any(|b| !b.is_required())
    }

    fn is_merge(&self) -> bool {
        self.binder.root == RootNode::Merge
    }

    fn register_types(&mut self) {
        let nullable_needed = self.has_optional()
            || !self.is_merge()
            || self.variables.iter().any(|(_, t)| !is_primitive(t));
        let npe_needed =
            self.binder.bindings.is_empty() || self.has_required() || self.is_merge();

        self.types.register(ANDROID_LAYOUT_INFLATER);
        self.types.register(ANDROID_VIEW);
        self.types.register(ANDROID_VIEW_GROUP);
        self.types.register(&self.lib.non_null());
        if nullable_needed {
            self.types.register(&self.lib.nullable());
        }
        self.types.register(self.lib.view_binding());
        self.types
            .register(&format!("{}.R", self.binder.module_package));
        if npe_needed {
            self.types.register(JAVA_NPE);
        }
        self.types.register(JAVA_OVERRIDE);
        if self.has_required() {
            self.types.register(JAVA_STRING);
        }
        self.types.register(self.binder.root_type());
        for binding in &self.binder.bindings {
            self.types.register(&binding.type_name);
        }
        for (_, type_str) in self.variables {
            if !is_primitive(type_str) {
                self.types.register(type_str);
            }
        }
    }

    fn generate(&self) -> String {
        let mut code = CodeBuilder::new();
        code.line("// Generated by view binder compiler. Do not edit!");
        code.line(&format!("package {};", self.binder.package));
        code.blank();
        for import in self.types.imports() {
            code.line(&format!("import {};", import));
        }
        code.blank();

        code.open(&format!(
            "public final class {} implements {} {{",
            self.binder.class_name,
            self.types.name(self.lib.view_binding())
        ));
        self.fields(&mut code);
        self.constructor(&mut code);
        self.root_getter(&mut code);
        self.variable_accessors(&mut code);
        if self.is_merge() {
            self.merge_inflate(&mut code);
        } else {
            self.one_param_inflate(&mut code);
            self.three_param_inflate(&mut code);
        }
        self.bind(&mut code);
        code.close("}");
        code.finish()
    }

    fn annotation(&self, nullable: bool) -> String {
        if nullable {
            format!("@{}", self.types.name(&self.lib.nullable()))
        } else {
            format!("@{}", self.types.name(&self.lib.non_null()))
        }
    }

    fn fields(&self, code: &mut CodeBuilder) {
        code.line(&self.annotation(false));
        code.line(&format!(
            "private final {} {};",
            self.types.name(self.binder.root_type()),
            self.root_field
        ));
        for (binding, field) in self.binder.bindings.iter().zip(&self.field_names) {
            code.blank();
            if !binding.is_required() {
                self.configuration_javadoc(code, &binding.present, &binding.absent);
            }
            code.line(&self.annotation(!binding.is_required()));
            code.line(&format!(
                "public final {} {};",
                self.types.name(&binding.type_name),
                field
            ));
        }
        for ((_, type_str), field) in self.variables.iter().zip(&self.variable_fields) {
            code.blank();
            if !is_primitive(type_str) {
                code.line(&self.annotation(true));
            }
            code.line(&format!("private {} {};", self.types.name(type_str), field));
        }
    }

    fn configuration_javadoc(&self, code: &mut CodeBuilder, present: &[String], absent: &[String]) {
        code.line("/**");
        code.line(" * This binding is not available in all configurations.");
        code.line(" * <p>");
        code.line(" * Present:");
        code.line(" * <ul>");
        for directory in present {
            code.line(&format!(" *   <li>{}/</li>", directory));
        }
        code.line(" * </ul>");
        code.line(" *");
        code.line(" * Absent:");
        code.line(" * <ul>");
        for directory in absent {
            code.line(&format!(" *   <li>{}/</li>", directory));
        }
        code.line(" * </ul>");
        code.line(" */");
    }

    fn constructor(&self, code: &mut CodeBuilder) {
        let mut params = vec![format!(
            "{} {} {}",
            self.annotation(false),
            self.types.name(self.binder.root_type()),
            self.root_field
        )];
        for (binding, field) in self.binder.bindings.iter().zip(&self.field_names) {
            params.push(format!(
                "{} {} {}",
                self.annotation(!binding.is_required()),
                self.types.name(&binding.type_name),
                field
            ));
        }
        code.blank();
        code.open(&format!(
            "private {}({}) {{",
            self.binder.class_name,
            params.join(", ")
        ));
        code.line(&format!("this.{0} = {0};", self.root_field));
        for field in &self.field_names {
            code.line(&format!("this.{0} = {0};", field));
        }
        code.close("}");
    }

    fn root_getter(&self, code: &mut CodeBuilder) {
        code.blank();
        code.line(&format!("@{}", self.types.name(JAVA_OVERRIDE)));
        code.line(&self.annotation(false));
        code.open(&format!(
            "public {} getRoot() {{",
            self.types.name(self.binder.root_type())
        ));
        code.line(&format!("return {};", self.root_field));
        code.close("}");
    }

    fn variable_accessors(&self, code: &mut CodeBuilder) {
        for ((name, type_str), field) in self.variables.iter().zip(&self.variable_fields) {
            let rendered = self.types.name(type_str);
            let annotation = if is_primitive(type_str) {
                String::new()
            } else {
                format!("{} ", self.annotation(true))
            };
            code.blank();
            code.open(&format!(
                "public void set{}({}{} {}) {{",
                strutils::to_class_part(name),
                annotation,
                rendered,
                field
            ));
            code.line(&format!("this.{0} = {0};", field));
            code.close("}");
            code.blank();
            if !is_primitive(type_str) {
                code.line(&self.annotation(true));
            }
            code.open(&format!(
                "public {} get{}() {{",
                rendered,
                strutils::to_class_part(name)
            ));
            code.line(&format!("return {};", field));
            code.close("}");
        }
    }

    fn one_param_inflate(&self, code: &mut CodeBuilder) {
        code.blank();
        code.line(&self.annotation(false));
        code.open(&format!(
            "public static {} inflate({} {} inflater) {{",
            self.binder.class_name,
            self.annotation(false),
            self.types.name(ANDROID_LAYOUT_INFLATER)
        ));
        code.line("return inflate(inflater, null, false);");
        code.close("}");
    }

    fn three_param_inflate(&self, code: &mut CodeBuilder) {
        code.blank();
        code.line(&self.annotation(false));
        code.open(&format!(
            "public static {} inflate({} {} inflater, {} {} parent, boolean attachToParent) {{",
            self.binder.class_name,
            self.annotation(false),
            self.types.name(ANDROID_LAYOUT_INFLATER),
            self.annotation(true),
            self.types.name(ANDROID_VIEW_GROUP)
        ));
        code.line(&format!(
            "{} root = inflater.inflate(R.layout.{}, parent, false);",
            self.types.name(ANDROID_VIEW),
            self.binder.layout_name
        ));
        code.open("if (attachToParent) {");
        code.line("parent.addView(root);");
        code.close("}");
        code.line("return bind(root);");
        code.close("}");
    }

    fn merge_inflate(&self, code: &mut CodeBuilder) {
        code.blank();
        code.line(&self.annotation(false));
        code.open(&format!(
            "public static {} inflate({} {} inflater, {} {} parent) {{",
            self.binder.class_name,
            self.annotation(false),
            self.types.name(ANDROID_LAYOUT_INFLATER),
            self.annotation(false),
            self.types.name(ANDROID_VIEW_GROUP)
        ));
        code.open("if (parent == null) {");
        code.line(&format!(
            "throw new {}(\"parent\");",
            self.types.name(JAVA_NPE)
        ));
        code.close("}");
        code.line(&format!(
            "inflater.inflate(R.layout.{}, parent);",
            self.binder.layout_name
        ));
        code.line("return bind(parent);");
        code.close("}");
    }

    fn id_reference(&self, id: &ResourceReference) -> String {
        match &id.namespace {
            Some(namespace) => format!("{}.R.id.{}", namespace, id.name),
            None => format!("R.id.{}", id.name),
        }
    }

    fn root_constructor_arg(&self, root_param: &str) -> String {
        if self.binder.root_type() == ANDROID_VIEW {
            root_param.to_owned()
        } else {
            format!(
                "({}) {}",
                self.types.name(self.binder.root_type()),
                root_param
            )
        }
    }

    fn bind(&self, code: &mut CodeBuilder) {
        // The public parameter keeps its name; same-named views become
        // suffixed locals.
        let mut locals = NameAllocator::new();
        let root_param = locals.new_name("rootView");

        code.blank();
        code.line(&self.annotation(false));
        code.open(&format!(
            "public static {} bind({} {} {}) {{",
            self.binder.class_name,
            self.annotation(false),
            self.types.name(ANDROID_VIEW),
            root_param
        ));

        if self.binder.bindings.is_empty() {
            code.open(&format!("if ({} == null) {{", root_param));
            code.line(&format!(
                "throw new {}(\"rootView\");",
                self.types.name(JAVA_NPE)
            ));
            code.close("}");
            code.line(&format!(
                "return new {}({});",
                self.binder.class_name,
                self.root_constructor_arg(&root_param)
            ));
            code.close("}");
            return;
        }

        let has_required = self.has_required();
        let missing_id = if has_required {
            let name = locals.new_name("missingId");
            code.line(&format!("{} {};", self.types.name(JAVA_STRING), name));
            code.open(&format!("{}: {{", name));
            Some(name)
        } else {
            None
        };

        let mut constructor_args = vec![self.root_constructor_arg(&root_param)];
        for (binding, field) in self.binder.bindings.iter().zip(&self.field_names) {
            let local = locals.new_name(field);
            let lookup_type = match binding.form {
                Form::View => self.types.name(&binding.type_name),
                Form::Binder => self.types.name(ANDROID_VIEW),
            };
            code.line(&format!(
                "{} {} = {}.findViewById({});",
                lookup_type,
                local,
                root_param,
                self.id_reference(&binding.id)
            ));
            if binding.is_required() {
                let missing_id = missing_id.as_ref().unwrap();
                code.open(&format!("if ({} == null) {{", local));
                code.line(&format!("{} = \"{}\";", missing_id, field));
                code.line(&format!("break {};", missing_id));
                code.close("}");
            }
            match binding.form {
                Form::View => constructor_args.push(local),
                Form::Binder => {
                    let bound = locals.new_name(&format!("{}Binding", field));
                    let class = self.types.name(&binding.type_name);
                    if binding.is_required() {
                        code.line(&format!("{} {} = {}.bind({});", class, bound, class, local));
                    } else {
                        code.line(&format!(
                            "{} {} = {} != null ? {}.bind({}) : null;",
                            class, bound, local, class, local
                        ));
                    }
                    constructor_args.push(bound);
                }
            }
        }
        code.line(&format!(
            "return new {}({});",
            self.binder.class_name,
            constructor_args.join(", ")
        ));

        if let Some(missing_id) = missing_id {
            code.close("}");
            code.line(&format!(
                "throw new {}(\"Missing required view with ID: \".concat({}));",
                self.types.name(JAVA_NPE),
                missing_id
            ));
        }
        code.close("}");
    }
}
