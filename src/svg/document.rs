//! Vector document tree
//!
//! A drawing is stored as nested elements (`svg`, `g`, `path`, `rect`,
//! `circle`) with string attributes, serialized as JSON.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Result, SimError};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VectorElement {
    /// Element name, e.g. `g` or `path`
    pub kind: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    /// Free-text description; carries physical metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
    #[serde(default)]
    pub children: Vec<VectorElement>,
}

impl VectorElement {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ..Self::default()
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_desc(mut self, desc: impl Into<String>) -> Self {
        self.desc = Some(desc.into());
        self
    }

    pub fn with_child(mut self, child: VectorElement) -> Self {
        self.children.push(child);
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let document = Self::from_json_str(&std::fs::read_to_string(path)?)?;
        log::info!("Loaded vector document {}", path.display());
        Ok(document)
    }

    /// Attribute value, treating empty strings as absent
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str).filter(|v| !v.is_empty())
    }

    pub fn require(&self, name: &str) -> Result<&str> {
        self.attr(name).ok_or_else(|| SimError::MissingAttribute {
            element: self.kind.clone(),
            attribute: name.to_string(),
        })
    }

    pub fn require_f32(&self, name: &str) -> Result<f32> {
        let value = self.require(name)?;
        value.trim().parse().map_err(|_| SimError::InvalidAttribute {
            attribute: name.to_string(),
            value: value.to_string(),
        })
    }

    pub fn children_of<'s>(&'s self, kind: &str) -> impl Iterator<Item = &'s VectorElement> {
        self.children.iter().filter(move |c| c.kind == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_shape() {
        let json = r#"{
            "kind": "g",
            "attributes": { "inkscape:label": "terrain" },
            "children": [
                { "kind": "rect", "attributes": { "x": "1", "width": "2.5" }, "desc": "fp:1,2,3" }
            ]
        }"#;
        let group = VectorElement::from_json_str(json).unwrap();
        assert_eq!(group.attr("inkscape:label"), Some("terrain"));
        let rect = group.children_of("rect").next().unwrap();
        assert_eq!(rect.require_f32("width").unwrap(), 2.5);
        assert_eq!(rect.desc.as_deref(), Some("fp:1,2,3"));
    }

    #[test]
    fn test_attribute_errors() {
        let rect = VectorElement::new("rect").with_attr("x", "abc").with_attr("y", "");
        assert!(matches!(
            rect.require_f32("x"),
            Err(SimError::InvalidAttribute { attribute, value }) if attribute == "x" && value == "abc"
        ));
        assert!(matches!(
            rect.require("y"),
            Err(SimError::MissingAttribute { element, attribute }) if element == "rect" && attribute == "y"
        ));
    }
}
