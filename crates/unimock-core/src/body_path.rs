//! Body-path expressions for extracting identifiers from structured bodies
//!
//! A deliberately small, XPath-flavored language over request bodies:
//!
//! | Form | Semantics |
//! |---|---|
//! | `/a/b/c` | traverse named fields/elements from the root |
//! | `//id` | every descendant named `id`, at any depth |
//! | `/a/*/id` | wildcard for one field/element name |
//! | `/a/@attr` | XML attribute `attr` on `a` (JSON: field named `@attr`) |
//! | `//id[text()='x']` | keep only nodes whose text equals the literal |
//!
//! Expressions are compiled once per section. Evaluation is a recursive walk
//! over a generic node trait with a JSON and an XML implementation, so the
//! evaluator itself is content-type-agnostic.

use crate::{Error, Result};
use serde_json::Value;

/// What a single step selects
#[derive(Debug, Clone, PartialEq, Eq)]
enum StepName {
    /// A named field or element
    Named(String),
    /// `*` — any single field or element name
    Any,
    /// `@attr` — an attribute value; terminal
    Attribute(String),
}

/// One compiled step, with an optional `[text()='…']` predicate
#[derive(Debug, Clone, PartialEq, Eq)]
struct Step {
    name: StepName,
    predicate: Option<String>,
}

/// A compiled body-path expression
#[derive(Debug, Clone)]
pub struct BodyPath {
    raw: String,
    descendant: bool,
    steps: Vec<Step>,
}

impl BodyPath {
    /// Compile an expression. Fails on anything outside the closed language.
    pub fn compile(expr: &str) -> Result<Self> {
        let (descendant, rest) = if let Some(rest) = expr.strip_prefix("//") {
            (true, rest)
        } else if let Some(rest) = expr.strip_prefix('/') {
            (false, rest)
        } else {
            return Err(Error::config(format!(
                "body path '{expr}' must start with '/' or '//'"
            )));
        };
        if rest.is_empty() {
            return Err(Error::config(format!("body path '{expr}' has no steps")));
        }

        let mut steps = Vec::new();
        for part in rest.split('/') {
            if part.is_empty() {
                return Err(Error::config(format!(
                    "'//' is only allowed at the start of body path '{expr}'"
                )));
            }
            steps.push(Self::parse_step(expr, part)?);
        }

        if descendant && !matches!(steps[0].name, StepName::Named(_)) {
            return Err(Error::config(format!(
                "descendant axis needs a name in body path '{expr}'"
            )));
        }
        // An attribute has no children; it can only close the expression.
        for (i, step) in steps.iter().enumerate() {
            if matches!(step.name, StepName::Attribute(_)) {
                if i + 1 != steps.len() {
                    return Err(Error::config(format!(
                        "attribute step must be last in body path '{expr}'"
                    )));
                }
                if step.predicate.is_some() {
                    return Err(Error::config(format!(
                        "attribute step cannot carry a predicate in body path '{expr}'"
                    )));
                }
            }
        }

        Ok(Self {
            raw: expr.to_string(),
            descendant,
            steps,
        })
    }

    fn parse_step(expr: &str, part: &str) -> Result<Step> {
        let (name_text, predicate) = match part.find('[') {
            Some(open) => {
                let inner = part[open..]
                    .strip_prefix("[text()='")
                    .and_then(|rest| rest.strip_suffix("']"))
                    .ok_or_else(|| {
                        Error::config(format!(
                            "unsupported predicate in body path '{expr}': only [text()='…'] is allowed"
                        ))
                    })?;
                (&part[..open], Some(inner.to_string()))
            }
            None => (part, None),
        };
        if name_text.is_empty() {
            return Err(Error::config(format!("empty step in body path '{expr}'")));
        }
        let name = if name_text == "*" {
            StepName::Any
        } else if let Some(attr) = name_text.strip_prefix('@') {
            StepName::Attribute(attr.to_string())
        } else {
            StepName::Named(name_text.to_string())
        };
        Ok(Step { name, predicate })
    }

    /// The expression source text.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Evaluate against a parsed JSON document, collecting every scalar match.
    pub fn eval_json(&self, root: &Value) -> Vec<String> {
        self.eval(JsonNode(root))
    }

    /// Evaluate against a parsed XML document, collecting every match.
    pub fn eval_xml(&self, doc: &roxmltree::Document<'_>) -> Vec<String> {
        self.eval(XmlNode(doc.root()))
    }

    fn eval<N: BodyNode>(&self, root: N) -> Vec<String> {
        let mut nodes = vec![root];
        for (i, step) in self.steps.iter().enumerate() {
            match &step.name {
                StepName::Attribute(attr) => {
                    return nodes.iter().filter_map(|n| n.attribute(attr)).collect();
                }
                StepName::Named(name) => {
                    nodes = if i == 0 && self.descendant {
                        nodes.iter().flat_map(|n| n.descendants_named(name)).collect()
                    } else {
                        nodes.iter().flat_map(|n| n.children_named(name)).collect()
                    };
                }
                StepName::Any => {
                    nodes = nodes.iter().flat_map(BodyNode::children).collect();
                }
            }
            if let Some(literal) = &step.predicate {
                nodes.retain(|n| n.text().as_deref() == Some(literal.as_str()));
            }
        }
        nodes.iter().filter_map(BodyNode::text).collect()
    }
}

/// Uniform view over JSON values and XML elements
trait BodyNode: Clone {
    fn children_named(&self, name: &str) -> Vec<Self>;
    fn children(&self) -> Vec<Self>;
    fn descendants_named(&self, name: &str) -> Vec<Self>;
    fn attribute(&self, name: &str) -> Option<String>;
    fn text(&self) -> Option<String>;
}

#[derive(Clone)]
struct JsonNode<'a>(&'a Value);

impl<'a> BodyNode for JsonNode<'a> {
    fn children_named(&self, name: &str) -> Vec<Self> {
        match self.0 {
            // Arrays are transparent: a named child of a list is the named
            // child of each of its elements.
            Value::Array(items) => {
                items.iter().flat_map(|v| JsonNode(v).children_named(name)).collect()
            }
            Value::Object(map) => map.get(name).map(JsonNode).into_iter().collect(),
            _ => Vec::new(),
        }
    }

    fn children(&self) -> Vec<Self> {
        match self.0 {
            Value::Object(map) => map.values().map(JsonNode).collect(),
            Value::Array(items) => items.iter().map(JsonNode).collect(),
            _ => Vec::new(),
        }
    }

    fn descendants_named(&self, name: &str) -> Vec<Self> {
        let mut found = Vec::new();
        collect_json_descendants(self.0, name, &mut found);
        found
    }

    fn attribute(&self, name: &str) -> Option<String> {
        match self.0 {
            Value::Object(map) => map.get(&format!("@{name}")).and_then(|v| JsonNode(v).text()),
            _ => None,
        }
    }

    fn text(&self) -> Option<String> {
        match self.0 {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

fn collect_json_descendants<'a>(value: &'a Value, name: &str, found: &mut Vec<JsonNode<'a>>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                if key == name {
                    found.push(JsonNode(child));
                }
                collect_json_descendants(child, name, found);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_json_descendants(item, name, found);
            }
        }
        _ => {}
    }
}

#[derive(Clone)]
struct XmlNode<'a, 'd>(roxmltree::Node<'a, 'd>);

impl<'a, 'd> BodyNode for XmlNode<'a, 'd> {
    fn children_named(&self, name: &str) -> Vec<Self> {
        self.0
            .children()
            .filter(|c| c.is_element() && c.tag_name().name() == name)
            .map(XmlNode)
            .collect()
    }

    fn children(&self) -> Vec<Self> {
        self.0.children().filter(roxmltree::Node::is_element).map(XmlNode).collect()
    }

    fn descendants_named(&self, name: &str) -> Vec<Self> {
        self.0
            .descendants()
            .filter(|c| c.is_element() && c.tag_name().name() == name)
            .map(XmlNode)
            .collect()
    }

    fn attribute(&self, name: &str) -> Option<String> {
        self.0.attribute(name).map(str::to_string)
    }

    fn text(&self) -> Option<String> {
        self.0.text().map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn eval_json(expr: &str, value: &Value) -> Vec<String> {
        BodyPath::compile(expr).unwrap().eval_json(value)
    }

    fn eval_xml(expr: &str, xml: &str) -> Vec<String> {
        let doc = roxmltree::Document::parse(xml).unwrap();
        BodyPath::compile(expr).unwrap().eval_xml(&doc)
    }

    // =========================================================================
    // Compilation
    // =========================================================================

    #[test]
    fn test_compile_rejects_relative_paths() {
        assert!(BodyPath::compile("a/b").is_err());
        assert!(BodyPath::compile("").is_err());
        assert!(BodyPath::compile("/").is_err());
    }

    #[test]
    fn test_compile_rejects_inner_descendant_axis() {
        assert!(BodyPath::compile("/a//b").is_err());
    }

    #[test]
    fn test_compile_rejects_non_terminal_attribute() {
        assert!(BodyPath::compile("/a/@attr/b").is_err());
        assert!(BodyPath::compile("/a/@attr").is_ok());
    }

    #[test]
    fn test_compile_rejects_unknown_predicate() {
        assert!(BodyPath::compile("/a[position()=1]").is_err());
        assert!(BodyPath::compile("//id[text()='x']").is_ok());
    }

    // =========================================================================
    // JSON evaluation
    // =========================================================================

    #[test]
    fn test_json_root_traversal() {
        let v = json!({"product": {"sku": "sku-A"}, "name": "P"});
        assert_eq!(eval_json("/product/sku", &v), vec!["sku-A"]);
    }

    #[test]
    fn test_json_deep_traversal() {
        let v = json!({"meta": {"uuid": "docU"}, "alt_id": "docA"});
        assert_eq!(eval_json("/meta/uuid", &v), vec!["docU"]);
        assert_eq!(eval_json("/alt_id", &v), vec!["docA"]);
    }

    #[test]
    fn test_json_descendants() {
        let v = json!({"a": {"id": "one", "b": {"id": "two"}}, "id": "zero"});
        let mut ids = eval_json("//id", &v);
        ids.sort();
        assert_eq!(ids, vec!["one", "two", "zero"]);
    }

    #[test]
    fn test_json_wildcard_step() {
        let v = json!({"a": {"x": {"id": "1"}, "y": {"id": "2"}}});
        let mut ids = eval_json("/a/*/id", &v);
        ids.sort();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[test]
    fn test_json_attribute_field() {
        let v = json!({"a": {"@attr": "attr-value"}});
        assert_eq!(eval_json("/a/@attr", &v), vec!["attr-value"]);
    }

    #[test]
    fn test_json_predicate() {
        let v = json!({"items": [{"id": "x"}, {"id": "y"}]});
        assert_eq!(eval_json("//id[text()='x']", &v), vec!["x"]);
    }

    #[test]
    fn test_json_arrays_are_transparent() {
        let v = json!({"orders": [{"ref": "r1"}, {"ref": "r2"}]});
        assert_eq!(eval_json("/orders/ref", &v), vec!["r1", "r2"]);
    }

    #[test]
    fn test_json_numbers_stringified() {
        let v = json!({"id": 42});
        assert_eq!(eval_json("/id", &v), vec!["42"]);
    }

    #[test]
    fn test_json_non_scalar_match_yields_nothing() {
        let v = json!({"a": {"nested": true}});
        assert!(eval_json("/a", &v).is_empty());
    }

    // =========================================================================
    // XML evaluation
    // =========================================================================

    #[test]
    fn test_xml_root_traversal() {
        let ids = eval_xml("/product/sku", "<product><sku>sku-A</sku></product>");
        assert_eq!(ids, vec!["sku-A"]);
    }

    #[test]
    fn test_xml_descendants() {
        let xml = "<doc><a><id>one</id></a><id>two</id></doc>";
        let mut ids = eval_xml("//id", xml);
        ids.sort();
        assert_eq!(ids, vec!["one", "two"]);
    }

    #[test]
    fn test_xml_attribute() {
        let ids = eval_xml("/product/@sku", r#"<product sku="sku-B"/>"#);
        assert_eq!(ids, vec!["sku-B"]);
    }

    #[test]
    fn test_xml_wildcard_step() {
        let xml = "<r><a><id>1</id></a><b><id>2</id></b></r>";
        let mut ids = eval_xml("/r/*/id", xml);
        ids.sort();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[test]
    fn test_xml_predicate() {
        let xml = "<r><id>x</id><id>y</id></r>";
        assert_eq!(eval_xml("//id[text()='y']", xml), vec!["y"]);
    }

    #[test]
    fn test_xml_no_match() {
        assert!(eval_xml("/missing", "<a>1</a>").is_empty());
    }
}
