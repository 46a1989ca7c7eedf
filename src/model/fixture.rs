//! In-memory class-model backend for unit tests.
//!
//! Assembled by hand instead of scanned from a classpath; preloads the
//! `java.lang` core plus the android view and observable classes the tests
//! resolve against.

use fnv::FnvHashMap;

use super::{
    BindingAdapterRecord, ClassModelProvider, ClassRecord, FieldRecord, InverseMethodRecord,
    LibTypes, MethodRecord,
};

#[derive(Debug, Default)]
pub struct Fixture {
    classes: FnvHashMap<String, ClassRecord>,
    adapters: Vec<BindingAdapterRecord>,
    inverse_methods: Vec<InverseMethodRecord>,
}

pub fn method(name: &str, params: &[&str], return_type: &str) -> MethodRecord {
    MethodRecord {
        name: name.to_owned(),
        param_types: params.iter().map(|p| (*p).to_owned()).collect(),
        return_type: return_type.to_owned(),
        is_static: false,
        is_public: true,
        is_abstract: false,
        bindable: false,
        bindable_dependencies: vec![],
    }
}

pub fn abstract_method(name: &str, params: &[&str], return_type: &str) -> MethodRecord {
    MethodRecord {
        is_abstract: true,
        ..method(name, params, return_type)
    }
}

pub fn field(name: &str, type_str: &str) -> FieldRecord {
    FieldRecord {
        name: name.to_owned(),
        type_str: type_str.to_owned(),
        is_public: true,
        is_static: false,
        bindable: false,
    }
}

impl Fixture {
    pub fn new() -> Fixture {
        let mut fixture = Fixture::default();
        fixture.preload_java_lang();
        fixture
    }

    /// A fixture preloaded with the android view hierarchy and the
    /// observable wrappers for the given support-library flavor.
    pub fn with_android(lib: &LibTypes) -> Fixture {
        let mut fixture = Fixture::new();
        fixture.preload_views();
        fixture.preload_observables(lib);
        fixture
    }

    pub fn class(&mut self, name: &str, superclass: Option<&str>) -> &mut ClassRecord {
        self.classes
            .entry(name.to_owned())
            .or_insert_with(|| ClassRecord {
                name: name.to_owned(),
                superclass: superclass.map(str::to_owned),
                interfaces: vec![],
                is_interface: false,
                methods: vec![],
                fields: vec![],
            })
    }

    pub fn interface(&mut self, name: &str) -> &mut ClassRecord {
        let record = self.class(name, None);
        record.is_interface = true;
        record
    }

    pub fn add_adapter(&mut self, record: BindingAdapterRecord) {
        self.adapters.push(record);
    }

    pub fn add_inverse_method(&mut self, record: InverseMethodRecord) {
        self.inverse_methods.push(record);
    }

    fn preload_java_lang(&mut self) {
        self.class("java.lang.Object", None)
            .methods
            .extend(vec![method("toString", &[], "java.lang.String")]);

        let iface = self.interface("java.lang.CharSequence");
        iface.methods.push(abstract_method("length", &[], "int"));

        let string = self.class("java.lang.String", Some("java.lang.Object"));
        string.interfaces.push("java.lang.CharSequence".into());
        string.methods.extend(vec![
            method("length", &[], "int"),
            method("isEmpty", &[], "boolean"),
            method("concat", &["java.lang.String"], "java.lang.String"),
            method("substring", &["int", "int"], "java.lang.String"),
            method("charAt", &["int"], "char"),
        ]);

        for boxed in &[
            "java.lang.Boolean",
            "java.lang.Byte",
            "java.lang.Short",
            "java.lang.Integer",
            "java.lang.Long",
            "java.lang.Character",
            "java.lang.Float",
            "java.lang.Double",
        ] {
            self.class(boxed, Some("java.lang.Object"));
        }

        let math = self.class("java.lang.Math", Some("java.lang.Object"));
        let mut max = method("max", &["int", "int"], "int");
        max.is_static = true;
        let mut min = method("min", &["int", "int"], "int");
        min.is_static = true;
        math.methods.extend(vec![max, min]);
    }

    fn preload_views(&mut self) {
        let click_listener = self.interface("android.view.View.OnClickListener");
        click_listener
            .methods
            .push(abstract_method("onClick", &["android.view.View"], "void"));

        let view = self.class("android.view.View", Some("java.lang.Object"));
        view.methods.extend(vec![
            method("getVisibility", &[], "int"),
            method("setVisibility", &["int"], "void"),
            method("setEnabled", &["boolean"], "void"),
            method("isEnabled", &[], "boolean"),
            method(
                "setOnClickListener",
                &["android.view.View.OnClickListener"],
                "void",
            ),
            method("findViewById", &["int"], "android.view.View"),
        ]);

        self.class("android.view.ViewGroup", Some("android.view.View"));
        self.class("android.widget.FrameLayout", Some("android.view.ViewGroup"));
        self.class("android.widget.LinearLayout", Some("android.view.ViewGroup"));
        self.class("android.widget.RelativeLayout", Some("android.view.ViewGroup"));

        let text_view = self.class("android.widget.TextView", Some("android.view.View"));
        text_view.methods.extend(vec![
            method("setText", &["java.lang.CharSequence"], "void"),
            method("getText", &[], "java.lang.CharSequence"),
            method("setTextColor", &["int"], "void"),
        ]);

        self.class("android.widget.Button", Some("android.widget.TextView"));
        self.class("android.widget.EditText", Some("android.widget.TextView"));

        let compound = self.class(
            "android.widget.CompoundButton",
            Some("android.widget.Button"),
        );
        compound.methods.extend(vec![
            method("setChecked", &["boolean"], "void"),
            method("isChecked", &[], "boolean"),
        ]);
        self.class("android.widget.CheckBox", Some("android.widget.CompoundButton"));

        let image = self.class("android.widget.ImageView", Some("android.view.View"));
        image
            .methods
            .push(method("setImageResource", &["int"], "void"));
    }

    fn preload_observables(&mut self, lib: &LibTypes) {
        let pkg = lib.databinding_package();
        let observable = lib.observable();
        self.interface(&observable);

        let base = self.class(&format!("{}.BaseObservable", pkg), Some("java.lang.Object"));
        base.interfaces.push(observable.clone());

        for (simple, primitive) in &[
            ("ObservableBoolean", "boolean"),
            ("ObservableByte", "byte"),
            ("ObservableChar", "char"),
            ("ObservableShort", "short"),
            ("ObservableInt", "int"),
            ("ObservableLong", "long"),
            ("ObservableFloat", "float"),
            ("ObservableDouble", "double"),
        ] {
            let wrapper = self.class(
                &format!("{}.{}", pkg, simple),
                Some(&format!("{}.BaseObservable", pkg)),
            );
            wrapper.methods.extend(vec![
                method("get", &[], primitive),
                method("set", &[primitive], "void"),
            ]);
        }

        let generic = self.class(
            &format!("{}.ObservableField", pkg),
            Some(&format!("{}.BaseObservable", pkg)),
        );
        generic.methods.extend(vec![
            method("get", &[], "java.lang.Object"),
            method("set", &["java.lang.Object"], "void"),
        ]);

        let live_data = self.class(lib.live_data(), Some("java.lang.Object"));
        live_data
            .methods
            .push(method("getValue", &[], "java.lang.Object"));
    }
}

impl ClassModelProvider for Fixture {
    fn class_record(&self, fqcn: &str) -> Option<&ClassRecord> {
        self.classes.get(fqcn)
    }

    fn adapters(&self) -> &[BindingAdapterRecord] {
        &self.adapters
    }

    fn inverse_methods(&self) -> &[InverseMethodRecord] {
        &self.inverse_methods
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{is_assignable, ModelClass};

    #[test]
    fn preloaded_view_hierarchy() {
        let lib = LibTypes::new(true);
        let fixture = Fixture::with_android(&lib);
        let check_box = ModelClass::find(&fixture, "android.widget.CheckBox").unwrap();
        // setChecked comes from CompoundButton, setText from TextView.
        assert!(check_box.find_method("setChecked", 1).is_some());
        assert!(check_box.find_method("setText", 1).is_some());
        assert!(is_assignable(
            &fixture,
            "android.view.View",
            "android.widget.CheckBox"
        ));
        assert!(!is_assignable(
            &fixture,
            "android.widget.CheckBox",
            "android.view.View"
        ));
    }

    #[test]
    fn string_is_assignable_to_char_sequence() {
        let fixture = Fixture::new();
        assert!(is_assignable(
            &fixture,
            "java.lang.CharSequence",
            "java.lang.String"
        ));
    }

    #[test]
    fn observables_are_observable() {
        let lib = LibTypes::new(true);
        let fixture = Fixture::with_android(&lib);
        let wrapper = ModelClass::find(&fixture, "androidx.databinding.ObservableInt").unwrap();
        assert!(wrapper.is_observable(&lib));
        let view = ModelClass::find(&fixture, "android.view.View").unwrap();
        assert!(!view.is_observable(&lib));
    }

    #[test]
    fn click_listener_has_single_abstract_method() {
        let lib = LibTypes::new(true);
        let fixture = Fixture::with_android(&lib);
        let listener = ModelClass::find(&fixture, "android.view.View.OnClickListener").unwrap();
        let sam = listener.single_abstract_method().unwrap();
        assert_eq!(sam.name, "onClick");
        assert_eq!(sam.param_types.len(), 1);
    }
}
