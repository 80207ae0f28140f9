//! Resolve the value a component factory returned into a [`RenderNode`]
//! tree, calling function components along the way.

use std::rc::Rc;

use interpreter::runtime_value::{Element, FRAGMENT, Object};
use interpreter::{ComponentValue, RuntimeValue};
use thiserror::Error;

use crate::node::{ElementNode, RenderNode};

/// Nesting allowed between the factory's result and the deepest node.
pub const MAX_RENDER_DEPTH: usize = 256;

/// CSS properties whose numeric values take no `px` suffix.
const UNITLESS_PROPERTIES: &[&str] = &[
    "animationIterationCount",
    "columnCount",
    "flex",
    "flexGrow",
    "flexShrink",
    "fontWeight",
    "gridColumn",
    "gridRow",
    "lineHeight",
    "opacity",
    "order",
    "orphans",
    "widows",
    "zIndex",
    "zoom",
];

#[derive(Debug, Error)]
#[error("{0}")]
pub(crate) struct RenderError(String);

impl From<interpreter::RuntimeError> for RenderError {
    fn from(error: interpreter::RuntimeError) -> Self {
        RenderError(error.to_string())
    }
}

pub(crate) fn render(component: &mut ComponentValue, value: &RuntimeValue) -> Result<RenderNode, RenderError> {
    Renderer { component }.value(value, 0)
}

struct Renderer<'a> {
    component: &'a mut ComponentValue,
}

impl Renderer<'_> {
    fn value(&mut self, value: &RuntimeValue, depth: usize) -> Result<RenderNode, RenderError> {
        if depth > MAX_RENDER_DEPTH {
            return Err(RenderError(format!(
                "render tree is nested deeper than {} levels",
                MAX_RENDER_DEPTH
            )));
        }
        match value {
            RuntimeValue::Undefined | RuntimeValue::Null | RuntimeValue::Bool(_) => {
                Ok(RenderNode::Empty)
            }
            RuntimeValue::Number(_) | RuntimeValue::String(_) => {
                Ok(RenderNode::Text(value.to_js_string()))
            }
            RuntimeValue::Array(items) => {
                let items = items.borrow().clone();
                let mut children = Vec::with_capacity(items.len());
                for item in &items {
                    children.push(self.value(item, depth + 1)?);
                }
                Ok(RenderNode::Fragment(children))
            }
            RuntimeValue::Element(element) => self.element(element, depth),
            RuntimeValue::Object(object) => {
                let keys: Vec<String> = object.borrow().keys().map(str::to_string).collect();
                Err(RenderError(format!(
                    "Objects are not valid as a React child (found: object with keys {{{}}})",
                    keys.join(", ")
                )))
            }
            RuntimeValue::Function(_) => Err(RenderError(
                "Functions are not valid as a React child".to_string(),
            )),
            RuntimeValue::Symbol(_) => Err(RenderError(
                "Symbols are not valid as a React child".to_string(),
            )),
        }
    }

    fn element(&mut self, element: &Element, depth: usize) -> Result<RenderNode, RenderError> {
        match &element.element_type {
            RuntimeValue::String(tag) => {
                let props = element.props.borrow();
                let attributes = attributes(&props);
                let children = props.get("children").cloned();
                drop(props);
                let children = match children {
                    Some(children) => flatten(self.value(&children, depth + 1)?),
                    None => Vec::new(),
                };
                Ok(RenderNode::Element(ElementNode {
                    tag: tag.to_string(),
                    attributes,
                    children,
                }))
            }
            RuntimeValue::Symbol(symbol) if *symbol == FRAGMENT => {
                let children = element.props.borrow().get("children").cloned();
                match children {
                    Some(children) => Ok(RenderNode::Fragment(flatten(
                        self.value(&children, depth + 1)?,
                    ))),
                    None => Ok(RenderNode::Fragment(Vec::new())),
                }
            }
            function @ RuntimeValue::Function(_) => {
                let props = RuntimeValue::Object(Rc::clone(&element.props));
                let output = self.component.call(function, vec![props])?;
                self.value(&output, depth + 1)
            }
            other => Err(RenderError(format!(
                "Element type is invalid: expected a string (for built-in components) or a function (for composite components) but got: {}",
                other.type_of()
            ))),
        }
    }
}

fn flatten(node: RenderNode) -> Vec<RenderNode> {
    match node {
        RenderNode::Empty => Vec::new(),
        RenderNode::Fragment(children) => children
            .into_iter()
            .filter(|child| *child != RenderNode::Empty)
            .collect(),
        node => vec![node],
    }
}

fn attributes(props: &Object) -> Vec<(String, Option<String>)> {
    let mut out = Vec::new();
    for (name, value) in props.entries() {
        if name == "children" || name == "dangerouslySetInnerHTML" {
            continue;
        }
        let name = match name.as_str() {
            "className" => "class",
            "htmlFor" => "for",
            other => other,
        };
        let value = match value {
            RuntimeValue::Undefined
            | RuntimeValue::Null
            | RuntimeValue::Bool(false)
            | RuntimeValue::Function(_)
            | RuntimeValue::Symbol(_) => continue,
            RuntimeValue::Bool(true) => None,
            RuntimeValue::Object(style) if name == "style" => {
                let css = style_text(&style.borrow());
                if css.is_empty() {
                    continue;
                }
                Some(css)
            }
            other => Some(other.to_js_string()),
        };
        out.push((name.to_string(), value));
    }
    out
}

/// `{ fontSize: 12, color: 'red' }` becomes `font-size:12px;color:red`.
fn style_text(style: &Object) -> String {
    let mut declarations = Vec::new();
    for (property, value) in style.entries() {
        let value = match value {
            RuntimeValue::Number(n) if *n != 0.0 && takes_px(property) => {
                format!("{}px", value.to_js_string())
            }
            RuntimeValue::Number(_) | RuntimeValue::String(_) => value.to_js_string(),
            _ => continue,
        };
        if value.is_empty() {
            continue;
        }
        declarations.push(format!("{}:{}", css_property_name(property), value));
    }
    declarations.join(";")
}

fn takes_px(property: &str) -> bool {
    !property.starts_with("--") && !UNITLESS_PROPERTIES.contains(&property)
}

fn css_property_name(property: &str) -> String {
    if property.starts_with("--") {
        return property.to_string();
    }
    let mut out = String::with_capacity(property.len() + 4);
    for c in property.chars() {
        if c.is_ascii_uppercase() {
            out.push('-');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    if out.starts_with("ms-") {
        out.insert(0, '-');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn style_objects_become_css() {
        let style: Object = [
            ("fontSize".to_string(), RuntimeValue::Number(12.0)),
            ("lineHeight".to_string(), RuntimeValue::Number(1.5)),
            ("margin".to_string(), RuntimeValue::Number(0.0)),
            ("backgroundColor".to_string(), RuntimeValue::from("red")),
            ("display".to_string(), RuntimeValue::Null),
            ("--accent".to_string(), RuntimeValue::from("blue")),
        ]
        .into_iter()
        .collect();
        assert_eq!(
            style_text(&style),
            "font-size:12px;line-height:1.5;margin:0;background-color:red;--accent:blue"
        );
    }

    #[test]
    fn attribute_names_and_values() {
        let props: Object = [
            ("className".to_string(), RuntimeValue::from("a")),
            ("htmlFor".to_string(), RuntimeValue::from("b")),
            ("disabled".to_string(), RuntimeValue::Bool(true)),
            ("hidden".to_string(), RuntimeValue::Bool(false)),
            ("tabIndex".to_string(), RuntimeValue::Number(2.0)),
            ("title".to_string(), RuntimeValue::Undefined),
            ("children".to_string(), RuntimeValue::from("x")),
        ]
        .into_iter()
        .collect();
        assert_eq!(
            attributes(&props),
            vec![
                ("class".to_string(), Some("a".to_string())),
                ("for".to_string(), Some("b".to_string())),
                ("disabled".to_string(), None),
                ("tabIndex".to_string(), Some("2".to_string())),
            ]
        );
    }

    #[test]
    fn vendor_prefixes() {
        assert_eq!(css_property_name("msTransition"), "-ms-transition");
        assert_eq!(css_property_name("WebkitTransform"), "-webkit-transform");
    }
}
