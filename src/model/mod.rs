//! Class-model abstraction the resolver works against.
//!
//! A [`ClassModelProvider`] supplies raw [`ClassRecord`]s plus the adapter
//! and inverse-method registrations scanned from the classpath. Everything
//! that needs inheritance-aware views of a class goes through [`ModelClass`],
//! which walks the superclass chain on demand.

pub mod classpath;
pub mod fixture;
pub mod resolve;

use fnv::FnvHashMap;
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

pub use classpath::ClasspathIndex;
pub use fixture::Fixture;
pub use resolve::{ResolvedLayout, Resolver, SetterCall};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassRecord {
    pub name: String,
    pub superclass: Option<String>,
    pub interfaces: Vec<String>,
    pub is_interface: bool,
    pub methods: Vec<MethodRecord>,
    pub fields: Vec<FieldRecord>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodRecord {
    pub name: String,
    pub param_types: Vec<String>,
    pub return_type: String,
    pub is_static: bool,
    pub is_public: bool,
    pub is_abstract: bool,
    pub bindable: bool,
    /// Property names listed on a `@Bindable` annotation.
    pub bindable_dependencies: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRecord {
    pub name: String,
    pub type_str: String,
    pub is_public: bool,
    pub is_static: bool,
    pub bindable: bool,
}

/// A `@BindingAdapter`-style registration: a static method that becomes the
/// setter for `attribute` on views assignable to `view_type`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingAdapterRecord {
    pub attribute: String,
    pub view_type: String,
    pub value_type: String,
    pub declaring_class: String,
    pub method: String,
}

/// An `@InverseMethod`-style registration used by two-way bindings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InverseMethodRecord {
    pub view_type: String,
    pub attribute: String,
    pub method: String,
    /// Event attribute whose firing triggers the view-to-model push. When
    /// absent the implicit `<attribute>AttrChanged` event is used.
    pub event_attribute: Option<String>,
}

/// Backend supplying class metadata. Two implementations: the classpath
/// index produced by the surrounding build, and the in-memory fixture the
/// unit tests assemble by hand.
pub trait ClassModelProvider {
    fn class_record(&self, fqcn: &str) -> Option<&ClassRecord>;
    fn adapters(&self) -> &[BindingAdapterRecord];
    fn inverse_methods(&self) -> &[InverseMethodRecord];
}

/// Inheritance-aware view of one class. Cheap to construct; member walks
/// chase the superclass chain through the provider each time.
#[derive(Clone, Copy)]
pub struct ModelClass<'a> {
    record: &'a ClassRecord,
    provider: &'a dyn ClassModelProvider,
}

impl<'a> ModelClass<'a> {
    pub fn find(provider: &'a dyn ClassModelProvider, fqcn: &str) -> Option<ModelClass<'a>> {
        provider
            .class_record(erasure(fqcn))
            .map(|record| ModelClass { record, provider })
    }

    pub fn name(&self) -> &'a str {
        &self.record.name
    }

    pub fn superclass(&self) -> Option<ModelClass<'a>> {
        let parent = self.record.superclass.as_ref()?;
        ModelClass::find(self.provider, parent)
    }

    /// All methods, subclass declarations first.
    pub fn all_methods(&self) -> Vec<&'a MethodRecord> {
        let mut out = vec![];
        let mut cur = Some(*self);
        while let Some(class) = cur {
            out.extend(class.record.methods.iter());
            cur = class.superclass();
        }
        out
    }

    /// All fields, subclass declarations first.
    pub fn all_fields(&self) -> Vec<&'a FieldRecord> {
        let mut out = vec![];
        let mut cur = Some(*self);
        while let Some(class) = cur {
            out.extend(class.record.fields.iter());
            cur = class.superclass();
        }
        out
    }

    pub fn find_field(&self, name: &str) -> Option<&'a FieldRecord> {
        self.all_fields()
            .into_iter()
            .find(|f| f.name == name && f.is_public)
    }

    /// `getName()` or `isName()`, zero-arg and public.
    pub fn getter_for(&self, name: &str) -> Option<&'a MethodRecord> {
        let suffix = capitalize(name);
        self.all_methods().into_iter().find(|m| {
            m.is_public
                && m.param_types.is_empty()
                && (m.name == format!("get{}", suffix) || m.name == format!("is{}", suffix))
        })
    }

    pub fn find_method(&self, name: &str, argc: usize) -> Option<&'a MethodRecord> {
        self.all_methods()
            .into_iter()
            .find(|m| m.is_public && m.name == name && m.param_types.len() == argc)
    }

    pub fn methods_named(&self, name: &str) -> Vec<&'a MethodRecord> {
        self.all_methods()
            .into_iter()
            .filter(|m| m.is_public && m.name == name)
            .collect()
    }

    /// Transitive closure of superclass and interface names, self included.
    pub fn ancestry(&self) -> Vec<&'a str> {
        let mut out = vec![];
        let mut stack = vec![self.record.name.as_str()];
        while let Some(name) = stack.pop() {
            if out.contains(&name) {
                continue;
            }
            out.push(name);
            if let Some(record) = self.provider.class_record(name) {
                if let Some(parent) = &record.superclass {
                    stack.push(parent);
                }
                for iface in &record.interfaces {
                    stack.push(iface);
                }
            }
        }
        out
    }

    pub fn is_observable(&self, lib: &LibTypes) -> bool {
        let observable = lib.observable();
        self.ancestry().iter().any(|name| *name == observable)
    }

    /// The single abstract method of a listener interface, if there is
    /// exactly one.
    pub fn single_abstract_method(&self) -> Option<&'a MethodRecord> {
        let mut found = None;
        for m in self.all_methods() {
            if m.is_abstract {
                if found.is_some() {
                    return None;
                }
                found = Some(m);
            }
        }
        found
    }
}

/// Whether a value of type `from` can be passed where `to` is expected.
/// Handles identity, erasure, boxing, numeric widening and the superclass
/// plus interface closure; `java.lang.Object` accepts everything.
pub fn is_assignable(provider: &dyn ClassModelProvider, to: &str, from: &str) -> bool {
    let to = erasure(to);
    let from = erasure(from);
    if to == from || to == "java.lang.Object" {
        return true;
    }
    let to_prim = unbox(to).unwrap_or(to);
    let from_prim = unbox(from).unwrap_or(from);
    if to_prim == from_prim {
        return true;
    }
    if let (Some(t), Some(f)) = (numeric_rank(to_prim), numeric_rank(from_prim)) {
        return f <= t;
    }
    match ModelClass::find(provider, from) {
        Some(class) => class.ancestry().iter().any(|name| *name == to),
        None => false,
    }
}

/// Strip generic arguments: `Map<K, V>` becomes `Map`.
pub fn erasure(type_str: &str) -> &str {
    match type_str.find('<') {
        Some(i) => type_str[..i].trim(),
        None => type_str.trim(),
    }
}

/// First generic argument: `ObservableField<com.example.User>` yields
/// `com.example.User`. Nested generics keep their own arguments.
pub fn type_argument(type_str: &str) -> Option<&str> {
    let open = type_str.find('<')?;
    let close = type_str.rfind('>')?;
    let inner = &type_str[open + 1..close];
    let mut depth = 0;
    for (i, c) in inner.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => depth -= 1,
            ',' if depth == 0 => return Some(inner[..i].trim()),
            _ => {}
        }
    }
    Some(inner.trim())
}

pub fn is_primitive(type_str: &str) -> bool {
    matches!(
        type_str,
        "boolean" | "byte" | "short" | "int" | "long" | "char" | "float" | "double" | "void"
    )
}

pub fn box_of(primitive: &str) -> Option<&'static str> {
    Some(match primitive {
        "boolean" => "java.lang.Boolean",
        "byte" => "java.lang.Byte",
        "short" => "java.lang.Short",
        "int" => "java.lang.Integer",
        "long" => "java.lang.Long",
        "char" => "java.lang.Character",
        "float" => "java.lang.Float",
        "double" => "java.lang.Double",
        _ => return None,
    })
}

pub fn unbox(type_str: &str) -> Option<&'static str> {
    Some(match type_str {
        "java.lang.Boolean" => "boolean",
        "java.lang.Byte" => "byte",
        "java.lang.Short" => "short",
        "java.lang.Integer" => "int",
        "java.lang.Long" => "long",
        "java.lang.Character" => "char",
        "java.lang.Float" => "float",
        "java.lang.Double" => "double",
        _ => return None,
    })
}

fn numeric_rank(primitive: &str) -> Option<usize> {
    Some(match primitive {
        "byte" => 0,
        "short" | "char" => 1,
        "int" => 2,
        "long" => 3,
        "float" => 4,
        "double" => 5,
        _ => return None,
    })
}

pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

lazy_static! {
    /// Observable wrapper simple names and the getter each exposes.
    static ref OBSERVABLE_WRAPPERS: FnvHashMap<&'static str, (&'static str, &'static str)> = {
        let mut m = FnvHashMap::default();
        m.insert("ObservableBoolean", ("get", "boolean"));
        m.insert("ObservableByte", ("get", "byte"));
        m.insert("ObservableChar", ("get", "char"));
        m.insert("ObservableShort", ("get", "short"));
        m.insert("ObservableInt", ("get", "int"));
        m.insert("ObservableLong", ("get", "long"));
        m.insert("ObservableFloat", ("get", "float"));
        m.insert("ObservableDouble", ("get", "double"));
        m.insert("ObservableField", ("get", ""));
        m.insert("ObservableParcelable", ("get", ""));
        m
    };
}

/// Which support-library flavor the module compiles against; picks the
/// package every generated annotation and runtime reference lives in.
#[derive(Clone, Copy, Debug)]
pub struct LibTypes {
    pub use_androidx: bool,
}

impl LibTypes {
    pub fn new(use_androidx: bool) -> LibTypes {
        LibTypes { use_androidx }
    }

    pub fn databinding_package(&self) -> &'static str {
        if self.use_androidx {
            "androidx.databinding"
        } else {
            "android.databinding"
        }
    }

    pub fn annotation_package(&self) -> &'static str {
        if self.use_androidx {
            "androidx.annotation"
        } else {
            "android.support.annotation"
        }
    }

    pub fn non_null(&self) -> String {
        format!("{}.NonNull", self.annotation_package())
    }

    pub fn nullable(&self) -> String {
        format!("{}.Nullable", self.annotation_package())
    }

    pub fn view_binding(&self) -> &'static str {
        if self.use_androidx {
            "androidx.viewbinding.ViewBinding"
        } else {
            "android.viewbinding.ViewBinding"
        }
    }

    pub fn observable(&self) -> String {
        format!("{}.Observable", self.databinding_package())
    }

    pub fn live_data(&self) -> &'static str {
        if self.use_androidx {
            "androidx.lifecycle.LiveData"
        } else {
            "android.arch.lifecycle.LiveData"
        }
    }

    /// Getter name plus unwrapped type for an observable wrapper class, or
    /// `None` when the type is not a wrapper. An empty unwrapped type means
    /// "take the generic argument".
    pub fn wrapper_getter(&self, type_str: &str) -> Option<(&'static str, String)> {
        let erased = erasure(type_str);
        if erased == self.live_data() {
            let inner = type_argument(type_str).unwrap_or("java.lang.Object");
            return Some(("getValue", inner.to_owned()));
        }
        let simple = erased.rsplit('.').next().unwrap_or(erased);
        let qualified = format!("{}.{}", self.databinding_package(), simple);
        if erased != qualified && erased != simple {
            return None;
        }
        let (getter, primitive) = OBSERVABLE_WRAPPERS.get(simple)?;
        let unwrapped = if primitive.is_empty() {
            type_argument(type_str).unwrap_or("java.lang.Object").to_owned()
        } else {
            (*primitive).to_owned()
        };
        Some((getter, unwrapped))
    }

    pub fn is_observable_wrapper(&self, type_str: &str) -> bool {
        self.wrapper_getter(type_str).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn erasure_and_type_argument() {
        assert_eq!(erasure("java.util.Map<String, Integer>"), "java.util.Map");
        assert_eq!(erasure("int"), "int");
        assert_eq!(
            type_argument("ObservableField<com.example.User>"),
            Some("com.example.User")
        );
        assert_eq!(
            type_argument("java.util.Map<java.util.List<String>, Integer>"),
            Some("java.util.List<String>")
        );
        assert_eq!(type_argument("int"), None);
    }

    #[test]
    fn boxing_round_trip() {
        assert_eq!(box_of("int"), Some("java.lang.Integer"));
        assert_eq!(unbox("java.lang.Integer"), Some("int"));
        assert_eq!(box_of("java.lang.String"), None);
    }

    #[test]
    fn wrapper_getters() {
        let lib = LibTypes::new(true);
        assert_eq!(
            lib.wrapper_getter("androidx.databinding.ObservableInt"),
            Some(("get", "int".to_owned()))
        );
        assert_eq!(
            lib.wrapper_getter("androidx.databinding.ObservableField<java.lang.String>"),
            Some(("get", "java.lang.String".to_owned()))
        );
        assert_eq!(
            lib.wrapper_getter("androidx.lifecycle.LiveData<java.lang.Integer>"),
            Some(("getValue", "java.lang.Integer".to_owned()))
        );
        assert_eq!(lib.wrapper_getter("java.lang.String"), None);
    }

    #[test]
    fn androidx_flag_selects_packages() {
        assert_eq!(LibTypes::new(true).non_null(), "androidx.annotation.NonNull");
        assert_eq!(
            LibTypes::new(false).non_null(),
            "android.support.annotation.NonNull"
        );
    }
}
