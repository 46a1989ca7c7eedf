use crate::errors::{BindError, BindErrorKind, BindResult};
use crate::messages;

/// A parsed `@[+][namespace:]type/name` resource reference as written in a
/// layout attribute, e.g. `@+id/name` or `@android:id/home`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct XmlResourceReference {
    pub namespace: Option<String>,
    pub kind: String,
    pub name: String,
    pub is_new: bool,
}

impl XmlResourceReference {
    pub fn new(
        namespace: Option<&str>,
        kind: &str,
        name: &str,
        is_new: bool,
    ) -> XmlResourceReference {
        XmlResourceReference {
            namespace: namespace.map(str::to_owned),
            kind: kind.to_owned(),
            name: name.to_owned(),
            is_new,
        }
    }

    pub fn parse(raw: &str) -> BindResult<XmlResourceReference> {
        fn fail(template: &str, raw: &str) -> BindError {
            BindError {
                msg: messages::format(template, &[raw]),
                src: vec![],
                kind: BindErrorKind::Syntax,
            }
        }

        if !raw.starts_with('@') {
            return Err(fail(messages::REFERENCE_MUST_START_WITH_AT, raw));
        }
        let rest = &raw[1..];
        let (is_new, rest) = match rest.strip_prefix('+') {
            Some(r) => (true, r),
            None => (false, rest),
        };

        let slash = rest
            .find('/')
            .ok_or_else(|| fail(messages::INVALID_RESOURCE_FORMAT, raw))?;
        let prefix = &rest[..slash];
        let suffix = &rest[slash + 1..];

        let (mut namespace, kind) = match prefix.find(':') {
            Some(i) => {
                let ns = &prefix[..i];
                if ns.is_empty() {
                    return Err(fail(messages::NAMESPACE_CANNOT_BE_EMPTY, raw));
                }
                (Some(ns), &prefix[i + 1..])
            }
            None => (None, prefix),
        };
        if kind.is_empty() {
            return Err(fail(messages::TYPE_CANNOT_BE_EMPTY, raw));
        }

        // Legacy form puts the namespace on the name: `@id/android:home`.
        let name = match suffix.find(':') {
            Some(i) => {
                let ns = &suffix[..i];
                if ns.is_empty() {
                    return Err(fail(messages::NAMESPACE_CANNOT_BE_EMPTY, raw));
                }
                if namespace.is_none() {
                    namespace = Some(ns);
                }
                &suffix[i + 1..]
            }
            None => suffix,
        };
        if name.is_empty() {
            return Err(fail(messages::NAME_CANNOT_BE_EMPTY, raw));
        }

        Ok(XmlResourceReference::new(namespace, kind, name, is_new))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_err(raw: &str) -> String {
        XmlResourceReference::parse(raw).unwrap_err().msg
    }

    #[test]
    fn reference_parsing() {
        assert_eq!(
            XmlResourceReference::parse("@id/foo").unwrap(),
            XmlResourceReference::new(None, "id", "foo", false)
        );
        assert_eq!(
            XmlResourceReference::parse("@+id/foo").unwrap(),
            XmlResourceReference::new(None, "id", "foo", true)
        );
        assert_eq!(
            XmlResourceReference::parse("@android:id/foo").unwrap(),
            XmlResourceReference::new(Some("android"), "id", "foo", false)
        );
        assert_eq!(
            XmlResourceReference::parse("@+android:id/foo").unwrap(),
            XmlResourceReference::new(Some("android"), "id", "foo", true)
        );
        assert_eq!(
            XmlResourceReference::parse("@id/android:foo").unwrap(),
            XmlResourceReference::new(Some("android"), "id", "foo", false)
        );
        assert_eq!(
            XmlResourceReference::parse("@+id/android:foo").unwrap(),
            XmlResourceReference::new(Some("android"), "id", "foo", true)
        );
    }

    #[test]
    fn must_start_with_at() {
        assert_eq!(parse_err("id/foo"), "Reference must start with '@': id/foo");
    }

    #[test]
    fn must_contain_type_segment() {
        assert_eq!(
            parse_err("@android:foo"),
            "Invalid resource format: @android:foo"
        );
        assert_eq!(parse_err("@foo"), "Invalid resource format: @foo");
    }

    #[test]
    fn namespace_must_not_be_empty() {
        assert_eq!(parse_err("@:id/foo"), "Namespace cannot be empty: @:id/foo");
    }

    #[test]
    fn name_must_not_be_empty() {
        assert_eq!(
            parse_err("@android:id/"),
            "Name cannot be empty: @android:id/"
        );
        assert_eq!(
            parse_err("@id/android:"),
            "Name cannot be empty: @id/android:"
        );
    }

    #[test]
    fn type_must_not_be_empty() {
        assert_eq!(parse_err("@/foo"), "Type cannot be empty: @/foo");
        assert_eq!(
            parse_err("@android:/foo"),
            "Type cannot be empty: @android:/foo"
        );
    }
}
