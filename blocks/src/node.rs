use std::fmt;

use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::config::DEFAULT_ERROR_CLASS;

/// Elements that never have children or a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Pipeline stage a failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Transform,
    Bind,
    Render,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Transform => "transform",
            Stage::Bind => "bind",
            Stage::Render => "render",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inert placeholder shown in place of a block that failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorNode {
    pub stage: Stage,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementNode {
    pub tag: String,
    /// Attribute name and value. `None` is a bare boolean attribute.
    pub attributes: Vec<(String, Option<String>)>,
    pub children: Vec<RenderNode>,
}

impl ElementNode {
    pub fn attribute(&self, name: &str) -> Option<Option<&str>> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_deref())
    }
}

/// Resolved output of a mount, ready to be written as HTML.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderNode {
    Empty,
    Text(String),
    Element(ElementNode),
    Fragment(Vec<RenderNode>),
    Error(ErrorNode),
}

impl RenderNode {
    pub fn error(stage: Stage, message: impl Into<String>) -> Self {
        RenderNode::Error(ErrorNode {
            stage,
            message: message.into(),
        })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, RenderNode::Error(_))
    }

    pub fn as_error(&self) -> Option<&ErrorNode> {
        match self {
            RenderNode::Error(error) => Some(error),
            _ => None,
        }
    }

    /// Concatenated text of every text node, in document order.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            RenderNode::Text(text) => out.push_str(text),
            RenderNode::Element(element) => {
                element.children.iter().for_each(|c| c.collect_text(out))
            }
            RenderNode::Fragment(children) => children.iter().for_each(|c| c.collect_text(out)),
            RenderNode::Empty | RenderNode::Error(_) => {}
        }
    }

    /// First element with the given tag, depth first.
    pub fn find_element(&self, tag: &str) -> Option<&ElementNode> {
        match self {
            RenderNode::Element(element) if element.tag == tag => Some(element),
            RenderNode::Element(element) => {
                element.children.iter().find_map(|c| c.find_element(tag))
            }
            RenderNode::Fragment(children) => children.iter().find_map(|c| c.find_element(tag)),
            _ => None,
        }
    }

    pub fn to_html(&self) -> String {
        self.to_html_with(DEFAULT_ERROR_CLASS)
    }

    /// HTML with error placeholders marked by `error_class`.
    pub fn to_html_with(&self, error_class: &str) -> String {
        let mut out = String::new();
        self.write_html(&mut out, error_class);
        out
    }

    fn write_html(&self, out: &mut String, error_class: &str) {
        match self {
            RenderNode::Empty => {}
            RenderNode::Text(text) => out.push_str(&encode_text(text)),
            RenderNode::Fragment(children) => {
                for child in children {
                    child.write_html(out, error_class);
                }
            }
            RenderNode::Element(element) => {
                out.push('<');
                out.push_str(&element.tag);
                for (name, value) in &element.attributes {
                    out.push(' ');
                    out.push_str(name);
                    if let Some(value) = value {
                        out.push_str("=\"");
                        out.push_str(&encode_double_quoted_attribute(value));
                        out.push('"');
                    }
                }
                out.push('>');
                if VOID_ELEMENTS.contains(&element.tag.as_str()) {
                    return;
                }
                for child in &element.children {
                    child.write_html(out, error_class);
                }
                out.push_str("</");
                out.push_str(&element.tag);
                out.push('>');
            }
            RenderNode::Error(error) => {
                out.push_str("<div class=\"");
                out.push_str(&encode_double_quoted_attribute(error_class));
                out.push_str("\" role=\"alert\" inert data-stage=\"");
                out.push_str(error.stage.as_str());
                out.push_str("\">");
                out.push_str(&encode_text(&error.message));
                out.push_str("</div>");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn element(tag: &str, attributes: &[(&str, Option<&str>)], children: Vec<RenderNode>) -> RenderNode {
        RenderNode::Element(ElementNode {
            tag: tag.to_string(),
            attributes: attributes
                .iter()
                .map(|(n, v)| (n.to_string(), v.map(str::to_string)))
                .collect(),
            children,
        })
    }

    #[test]
    fn text_and_attributes_are_escaped() {
        let node = element(
            "a",
            &[("href", Some("/q?a=1&b=\"2\"")), ("hidden", None)],
            vec![RenderNode::Text("<b> & co".to_string())],
        );
        assert_eq!(
            node.to_html(),
            "<a href=\"/q?a=1&amp;b=&quot;2&quot;\" hidden>&lt;b&gt; &amp; co</a>"
        );
    }

    #[test]
    fn void_elements_have_no_closing_tag() {
        let node = RenderNode::Fragment(vec![
            element("img", &[("src", Some("a.png"))], Vec::new()),
            element("br", &[], Vec::new()),
        ]);
        assert_eq!(node.to_html(), "<img src=\"a.png\"><br>");
    }

    #[test]
    fn error_nodes_are_inert_alerts() {
        let node = RenderNode::error(Stage::Bind, "ReferenceError: <x> is not defined");
        assert_eq!(
            node.to_html(),
            "<div class=\"custom-block-error\" role=\"alert\" inert data-stage=\"bind\">ReferenceError: &lt;x&gt; is not defined</div>"
        );
        assert!(node.to_html_with("oops").starts_with("<div class=\"oops\""));
    }

    #[test]
    fn text_content_skips_errors() {
        let node = element(
            "div",
            &[],
            vec![
                RenderNode::Text("a".to_string()),
                RenderNode::error(Stage::Render, "x"),
                RenderNode::Fragment(vec![RenderNode::Text("b".to_string())]),
            ],
        );
        assert_eq!(node.text_content(), "ab");
        assert_eq!(node.find_element("div").map(|e| e.children.len()), Some(3));
    }
}
