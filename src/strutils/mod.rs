/// `my_layout_file` -> `MyLayoutFile`. Characters that cannot appear in a
/// Java identifier are treated as word breaks.
pub fn to_class_part(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut upper_next = true;
    for c in s.chars() {
        if c == '_' || c == '-' || c == '.' {
            upper_next = true;
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// `root_view` -> `rootView`
pub fn to_field_name(s: &str) -> String {
    let class_part = to_class_part(s);
    let mut chars = class_part.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().collect::<String>() + chars.as_str(),
        None => class_part,
    }
}

/// `set` prefix for an attribute name: `text` -> `setText`
pub fn setter_name(attr: &str) -> String {
    format!("set{}", to_class_part(attr))
}

/// Splits a fully-qualified class name into (package, simple name).
pub fn split_qualified(fqcn: &str) -> (&str, &str) {
    match fqcn.rfind('.') {
        Some(i) => (&fqcn[..i], &fqcn[i + 1..]),
        None => ("", fqcn),
    }
}
