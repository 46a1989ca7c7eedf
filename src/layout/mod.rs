use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::errors::{BindError, BindErrorKind, BindResult, Diagnostics};
use crate::messages;
use crate::span::{LineMap, Source, Span};
use crate::store::{
    BindingAttribute, BindingTargetBundle, ImportDecl, LayoutFileBundle, VariableDecl,
};

const IGNORE_ATTRIBUTE: &str = "tools:viewBindingIgnore";

/// Tags that live in `android.view` rather than `android.widget`.
const ANDROID_VIEW_TAGS: &[&str] = &[
    "View",
    "ViewGroup",
    "ViewStub",
    "TextureView",
    "SurfaceView",
];

fn is_truthy(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("true")
}

/// Maps an XML tag to a fully-qualified view class.
fn view_type_for_tag(tag: &str, class_attr: Option<&str>) -> String {
    if tag == "view" {
        // <view class="com.example.CustomView"/>
        return class_attr.unwrap_or("android.view.View").to_owned();
    }
    if tag.contains('.') {
        return tag.to_owned();
    }
    if ANDROID_VIEW_TAGS.contains(&tag) {
        format!("android.view.{}", tag)
    } else if tag == "WebView" {
        "android.webkit.WebView".to_owned()
    } else {
        format!("android.widget.{}", tag)
    }
}

/// Parses one layout XML file into a [LayoutFileBundle]. Returns `Ok(None)`
/// when the file opts out via the ignore attribute. Recoverable problems
/// (duplicate declarations) go into `diag`; malformed XML fails the parse.
pub struct LayoutParser<'a> {
    text: &'a str,
    filepath: &'a Path,
    module_package: &'a str,
    line_map: LineMap,
}

struct RawAttr {
    key: String,
    value: String,
    /// Span of the attribute value inside the file, wrapper excluded for
    /// binding expressions.
    value_span: Option<Span>,
}

impl<'a> LayoutParser<'a> {
    pub fn new(text: &'a str, filepath: &'a Path, module_package: &'a str) -> LayoutParser<'a> {
        LayoutParser {
            text,
            filepath,
            module_package,
            line_map: LineMap::new(text),
        }
    }

    pub fn parse(&self, diag: &mut Diagnostics) -> BindResult<Option<LayoutFileBundle>> {
        let file_name = self
            .filepath
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_owned();
        let directory = self
            .filepath
            .parent()
            .and_then(|p| p.file_name())
            .and_then(|s| s.to_str())
            .unwrap_or("layout")
            .to_owned();

        let mut reader = Reader::from_str(self.text);
        reader.trim_text(true);
        let mut buf = Vec::new();

        let mut has_layout_wrapper = false;
        let mut has_data = false;
        let mut class_override: Option<(String, Source)> = None;
        let mut variables: Vec<VariableDecl> = vec![];
        let mut imports: Vec<ImportDecl> = vec![];
        let mut targets: Vec<BindingTargetBundle> = vec![];
        let mut root_view_type: Option<String> = None;
        let mut is_merge = false;

        // Element nesting, tag names only. The `<layout>` wrapper and
        // `<data>` section are tracked separately from the view tree.
        let mut stack: Vec<String> = vec![];
        let mut in_data = false;

        loop {
            let event = reader
                .read_event(&mut buf)
                .map_err(|e| self.xml_error(e, reader.buffer_position()))?;
            match event {
                Event::Start(ref e) | Event::Empty(ref e) => {
                    let empty = matches!(event, Event::Empty(_));
                    let tag = String::from_utf8_lossy(e.name()).into_owned();
                    let end_offset = reader.buffer_position();
                    let tag_span = self.tag_span(end_offset);
                    let attrs = self.read_attrs(&reader, e, tag_span)?;

                    let is_root = stack.is_empty() || (stack == ["layout"] && tag != "data");
                    if stack.is_empty() && tag == "layout" {
                        has_layout_wrapper = true;
                        if !empty {
                            stack.push(tag);
                        }
                        buf.clear();
                        continue;
                    }

                    if is_root && root_view_type.is_none() && tag != "data" {
                        if let Some(attr) = attrs.iter().find(|a| a.key == IGNORE_ATTRIBUTE) {
                            if is_truthy(&attr.value) {
                                log::debug!(
                                    "skipping {} ({}=true)",
                                    self.filepath.display(),
                                    IGNORE_ATTRIBUTE
                                );
                                return Ok(None);
                            }
                        }
                        is_merge = tag == "merge";
                        let class_attr = attrs
                            .iter()
                            .find(|a| a.key == "class")
                            .map(|a| a.value.as_str());
                        root_view_type = Some(if is_merge {
                            "android.view.View".to_owned()
                        } else {
                            view_type_for_tag(&tag, class_attr)
                        });
                    }

                    if tag == "data" && has_layout_wrapper && stack == ["layout"] {
                        has_data = true;
                        if let Some(attr) = attrs.iter().find(|a| a.key == "class") {
                            class_override =
                                Some((attr.value.clone(), self.source(tag_span)));
                        }
                        if !empty {
                            in_data = true;
                            stack.push(tag);
                        }
                        buf.clear();
                        continue;
                    }

                    if in_data {
                        match tag.as_str() {
                            "variable" => {
                                self.add_variable(&attrs, tag_span, &mut variables, diag)
                            }
                            "import" => self.add_import(&attrs, tag_span, &mut imports, diag),
                            _ => {}
                        }
                        if !empty {
                            stack.push(tag);
                        }
                        buf.clear();
                        continue;
                    }

                    // View tree.
                    let view_depth = if has_layout_wrapper {
                        stack.len().saturating_sub(1)
                    } else {
                        stack.len()
                    };
                    let direct_child_of_root = view_depth == 1;
                    self.add_target(
                        &tag,
                        &attrs,
                        tag_span,
                        direct_child_of_root,
                        &mut targets,
                    );

                    if !empty {
                        stack.push(tag);
                    }
                }
                Event::End(_) => {
                    if in_data && stack.last().map(String::as_str) == Some("data") {
                        in_data = false;
                    }
                    stack.pop();
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        let root_view_type = match root_view_type {
            Some(t) => t,
            // no view element at all; nothing to bind
            None => return Ok(None),
        };

        Ok(Some(LayoutFileBundle {
            file_name,
            directory,
            filepath: self.filepath.to_path_buf(),
            module_package: self.module_package.to_owned(),
            class_override,
            is_merge,
            root_view_type,
            variables,
            imports,
            targets,
            has_data,
        }))
    }

    fn add_variable(
        &self,
        attrs: &[RawAttr],
        tag_span: Span,
        variables: &mut Vec<VariableDecl>,
        diag: &mut Diagnostics,
    ) {
        let name = attrs.iter().find(|a| a.key == "name");
        let type_str = attrs.iter().find(|a| a.key == "type");
        let (name, type_str) = match (name, type_str) {
            (Some(n), Some(t)) => (n.value.clone(), t.value.clone()),
            _ => {
                diag.error(BindError::new(
                    "<variable> requires both name and type".to_owned(),
                    self.source(tag_span),
                    BindErrorKind::Syntax,
                ));
                return;
            }
        };
        if variables.iter().any(|v| v.name == name) {
            diag.error(BindError::new(
                messages::format(messages::VARIABLE_REDEFINED, &[&name]),
                self.source(tag_span),
                BindErrorKind::Semantic,
            ));
            return;
        }
        variables.push(VariableDecl {
            name,
            type_str,
            declared_at: self.source(tag_span),
        });
    }

    fn add_import(
        &self,
        attrs: &[RawAttr],
        tag_span: Span,
        imports: &mut Vec<ImportDecl>,
        diag: &mut Diagnostics,
    ) {
        let type_str = match attrs.iter().find(|a| a.key == "type") {
            Some(t) => t.value.clone(),
            None => {
                diag.error(BindError::new(
                    "<import> requires a type".to_owned(),
                    self.source(tag_span),
                    BindErrorKind::Syntax,
                ));
                return;
            }
        };
        let alias = attrs
            .iter()
            .find(|a| a.key == "alias")
            .map(|a| a.value.clone())
            .unwrap_or_else(|| {
                type_str
                    .rsplit('.')
                    .next()
                    .unwrap_or(&type_str)
                    .to_owned()
            });
        if imports.iter().any(|i| i.alias == alias) {
            diag.error(BindError::new(
                messages::format(messages::IMPORT_REDEFINED, &[&alias]),
                self.source(tag_span),
                BindErrorKind::Semantic,
            ));
            return;
        }
        imports.push(ImportDecl {
            alias,
            type_str,
            declared_at: self.source(tag_span),
        });
    }

    fn add_target(
        &self,
        tag: &str,
        attrs: &[RawAttr],
        tag_span: Span,
        direct_child_of_root: bool,
        targets: &mut Vec<BindingTargetBundle>,
    ) {
        let id = attrs
            .iter()
            .find(|a| a.key == "android:id")
            .map(|a| a.value.clone());
        let included_layout = if tag == "include" {
            attrs
                .iter()
                .find(|a| a.key == "layout")
                .and_then(|a| a.value.strip_prefix("@layout/").map(str::to_owned))
        } else {
            None
        };

        let mut attributes = vec![];
        for attr in attrs {
            let value = attr.value.as_str();
            let (two_way, inner) = if value.starts_with("@={") && value.ends_with('}') {
                (true, &value[3..value.len() - 1])
            } else if value.starts_with("@{") && value.ends_with('}') {
                (false, &value[2..value.len() - 1])
            } else {
                continue;
            };
            let (namespace, name) = match attr.key.find(':') {
                Some(i) => (Some(attr.key[..i].to_owned()), attr.key[i + 1..].to_owned()),
                None => (None, attr.key.clone()),
            };
            let src = match attr.value_span {
                Some(span) => self.source(span),
                None => self.source(tag_span),
            };
            attributes.push(BindingAttribute {
                namespace,
                name,
                expr_text: inner.to_owned(),
                two_way,
                src,
            });
        }

        // Only elements with an id, an included layout, or at least one
        // expression participate in binding.
        if id.is_none() && included_layout.is_none() && attributes.is_empty() {
            return;
        }
        if tag == "include" && included_layout.is_none() {
            return;
        }

        let class_attr = attrs
            .iter()
            .find(|a| a.key == "class")
            .map(|a| a.value.as_str());
        let view_type = if tag == "include" {
            // patched to the included layout's binding class by the binder
            "android.view.View".to_owned()
        } else {
            view_type_for_tag(tag, class_attr)
        };

        targets.push(BindingTargetBundle {
            id,
            tag: tag.to_owned(),
            view_type,
            included_layout,
            direct_child_of_root,
            attributes,
            src: self.source(tag_span),
        });
    }

    fn read_attrs(
        &self,
        reader: &Reader<&[u8]>,
        e: &BytesStart,
        tag_span: Span,
    ) -> BindResult<Vec<RawAttr>> {
        let elem_text = &self.text[tag_span.start.offset..tag_span.end.offset];
        let mut attrs = vec![];
        for attr in e.attributes() {
            let attr = attr.map_err(|e| self.xml_error(e.into(), tag_span.start.offset))?;
            let key = String::from_utf8_lossy(attr.key).into_owned();
            let value = attr
                .unescape_and_decode_value(reader)
                .map_err(|e| self.xml_error(e, tag_span.start.offset))?;
            let value_span = self.attr_value_span(elem_text, tag_span.start.offset, &key);
            attrs.push(RawAttr {
                key,
                value,
                value_span,
            });
        }
        Ok(attrs)
    }

    /// Locates the raw attribute value inside the element's source text so
    /// diagnostics can point at (and extract) the exact substring. For
    /// binding expressions the span excludes the `@{`/`@={` wrapper.
    fn attr_value_span(&self, elem_text: &str, elem_offset: usize, key: &str) -> Option<Span> {
        // Anchor on a whitespace boundary so a longer attribute name ending
        // with `key` cannot match.
        let needle = format!("{}=", key);
        let mut search = 0;
        let key_pos = loop {
            let pos = search + elem_text[search..].find(&needle)?;
            if elem_text[..pos]
                .chars()
                .next_back()
                .map_or(false, char::is_whitespace)
            {
                break pos;
            }
            search = pos + needle.len();
        };
        let after_eq = key_pos + key.len() + 1;
        let quote = elem_text[after_eq..].chars().next()?;
        if quote != '"' && quote != '\'' {
            return None;
        }
        let value_start = after_eq + 1;
        let value_len = elem_text[value_start..].find(quote)?;
        let raw = &elem_text[value_start..value_start + value_len];

        let (skip, trim_end) = if raw.starts_with("@={") && raw.ends_with('}') {
            (3, 1)
        } else if raw.starts_with("@{") && raw.ends_with('}') {
            (2, 1)
        } else {
            (0, 0)
        };
        let start = elem_offset + value_start + skip;
        let end = elem_offset + value_start + value_len - trim_end;
        Some(self.line_map.span(start, end))
    }

    /// Span of the element whose closing `>` sits at `end_offset`: from the
    /// last `<` before it through the `>` itself.
    fn tag_span(&self, end_offset: usize) -> Span {
        let start = self.text[..end_offset].rfind('<').unwrap_or(0);
        self.line_map.span(start, end_offset)
    }

    fn source(&self, span: Span) -> Source {
        Source::new(self.filepath.to_path_buf(), span)
    }

    fn xml_error(&self, err: quick_xml::Error, offset: usize) -> BindError {
        let span = self.line_map.span(offset.saturating_sub(1), offset);
        BindError::new(
            format!("malformed XML: {}", err),
            self.source(span),
            BindErrorKind::Syntax,
        )
    }
}
