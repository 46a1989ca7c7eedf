//! Diagnostic message catalog.
//!
//! Every user-facing problem message is built from one of these templates
//! with positional `%s` substitution. Test suites assert exact text, so the
//! wording and the parameter order here are part of the compiler's contract.

pub const UNEXPECTED_TOKEN: &str = "unexpected token '%s', expected one of: %s";

pub const UNDEFINED_VARIABLE: &str =
    "Identifiers must have user defined types from the XML file. %s is missing it";

pub const CANNOT_RESOLVE_TYPE: &str = "Cannot resolve type '%s'";

pub const CANNOT_FIND_SETTER_CALL: &str =
    "Cannot find the setter for attribute '%s' with parameter type %s on %s";

pub const CANNOT_FIND_INVERSE_METHOD: &str =
    "Cannot find the inverse method for two-way binding attribute '%s' on %s";

pub const TWO_WAY_NOT_INVERTIBLE: &str =
    "The expression %s cannot be inverted, so it cannot be used in a two-way binding";

pub const CANNOT_FIND_METHOD: &str = "Cannot find method '%s' on type %s";

pub const CANNOT_FIND_FIELD: &str = "Cannot find field or getter for '%s' on type %s";

pub const GETTER_ON_OBSERVABLE: &str =
    "Do not call get() on an observable in a binding expression; use the observable directly: %s";

pub const RECURSIVE_OBSERVABLE: &str = "Detected a recursive observable dependency: %s";

pub const DUPLICATE_VIEW_OR_INCLUDE_ID: &str = "<%s> tag defines a duplicate ID %s";

pub const MULTI_CONFIG_LAYOUT_CLASS_NAME_MISMATCH: &str =
    "All layout configurations must agree on the generated binding class. \
     %s declared in %s does not match the other configurations";

pub const MULTI_CONFIG_VARIABLE_TYPE_MISMATCH: &str =
    "Variable declarations must match between layout configurations. Variable '%s' has type \
     '%s' in %s which does not match the other configurations";

pub const MULTI_CONFIG_IMPORT_TYPE_MISMATCH: &str =
    "Import declarations must match between layout configurations. Import '%s' has type '%s' \
     in %s which does not match the other configurations";

pub const MULTI_CONFIG_ID_USED_AS_IMPORT: &str =
    "The same id %s is used for both a view and an <include> across configurations";

pub const INCLUDE_INSIDE_MERGE: &str =
    "<include> elements are not supported as direct children of a <merge> root";

pub const INCLUDE_LAYOUT_NOT_FOUND: &str =
    "Cannot find the target layout %s for the <include> with id '%s'";

pub const VARIABLE_REDEFINED: &str = "Variable '%s' is defined more than once";

pub const IMPORT_REDEFINED: &str = "Import alias '%s' is defined more than once";

pub const UNUSED_VARIABLE: &str =
    "The variable '%s' is declared but is never used in a binding expression";

pub const TWO_WAY_EVENT_ATTRIBUTE: &str =
    "The attribute '%s' is reserved for two-way binding and cannot be assigned an explicit \
     listener";

pub const CALLBACK_ARGUMENT_COUNT_MISMATCH: &str =
    "Listener method %s expects %s parameters but the lambda declares %s";

pub const DUPLICATE_CALLBACK_ARGUMENT: &str = "Lambda parameter '%s' is declared more than once";

pub const BINDABLE_DEPENDENT_NOT_GETTER: &str =
    "@Bindable dependencies must reference getters, but '%s' is a field";

pub const BINDABLE_DEPENDENT_NOT_BINDABLE: &str =
    "The dependent property '%s' referenced by @Bindable must itself be annotated with @Bindable";

pub const REFERENCE_MUST_START_WITH_AT: &str = "Reference must start with '@': %s";

pub const INVALID_RESOURCE_FORMAT: &str = "Invalid resource format: %s";

pub const NAMESPACE_CANNOT_BE_EMPTY: &str = "Namespace cannot be empty: %s";

pub const TYPE_CANNOT_BE_EMPTY: &str = "Type cannot be empty: %s";

pub const NAME_CANNOT_BE_EMPTY: &str = "Name cannot be empty: %s";

pub const ROOT_MERGE_MISMATCH: &str =
    "Configurations for %s.xml must agree on the use of a root <merge> tag.";

/// Substitute each `%s` in `template` with the next argument, in order.
pub fn format(template: &str, args: &[&str]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    let mut args = args.iter();
    while let Some(i) = rest.find("%s") {
        out.push_str(&rest[..i]);
        match args.next() {
            Some(arg) => out.push_str(arg),
            None => out.push_str("%s"),
        }
        rest = &rest[i + 2..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positional_substitution() {
        assert_eq!(
            format(CANNOT_RESOLVE_TYPE, &["com.example.User"]),
            "Cannot resolve type 'com.example.User'"
        );
        assert_eq!(
            format(MULTI_CONFIG_VARIABLE_TYPE_MISMATCH, &["myVariable", "String", "layout/foo"]),
            "Variable declarations must match between layout configurations. Variable \
             'myVariable' has type 'String' in layout/foo which does not match the other \
             configurations"
        );
    }

    #[test]
    fn missing_args_leave_placeholder() {
        assert_eq!(format("%s and %s", &["a"]), "a and %s");
    }
}
