//! XML element property: qualified name plus attribute bag.

use std::fmt;

/// Qualified XML name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct QualName {
    pub local: String,
    /// Namespace URI, empty when the name is not namespaced.
    pub namespace: String,
}

impl QualName {
    pub fn new(local: impl Into<String>) -> Self {
        Self {
            local: local.into(),
            namespace: String::new(),
        }
    }

    pub fn with_namespace(local: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            local: local.into(),
            namespace: namespace.into(),
        }
    }

    /// Whether this name matches `local` in the empty namespace.
    pub fn is(&self, local: &str) -> bool {
        self.namespace.is_empty() && self.local == local
    }
}

impl From<&str> for QualName {
    fn from(local: &str) -> Self {
        QualName::new(local)
    }
}

impl From<String> for QualName {
    fn from(local: String) -> Self {
        QualName::new(local)
    }
}

impl fmt::Display for QualName {
    // Clark notation: {namespace}local
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            f.write_str(&self.local)
        } else {
            write!(f, "{{{}}}{}", self.namespace, self.local)
        }
    }
}

/// A single XML attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlAttribute {
    pub name: QualName,
    pub value: String,
}

/// Element name and ordered attributes of a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlProperty {
    pub name: QualName,
    pub attributes: Vec<XmlAttribute>,
}

impl XmlProperty {
    pub fn new(name: impl Into<QualName>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
        }
    }

    /// Get a non-namespaced attribute value.
    pub fn attribute(&self, local: &str) -> Option<&str> {
        self.attribute_ns(local, "")
    }

    pub fn attribute_ns(&self, local: &str, namespace: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name.local == local && a.name.namespace == namespace)
            .map(|a| a.value.as_str())
    }

    /// Set a non-namespaced attribute, replacing any existing value in place.
    pub fn set_attribute(&mut self, local: &str, value: impl Into<String>) {
        self.set_attribute_ns(QualName::new(local), value);
    }

    pub fn set_attribute_ns(&mut self, name: QualName, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|a| a.name == name) {
            Some(existing) => existing.value = value,
            None => self.attributes.push(XmlAttribute { name, value }),
        }
    }

    /// Remove a non-namespaced attribute, returning its value.
    pub fn remove_attribute(&mut self, local: &str) -> Option<String> {
        let pos = self
            .attributes
            .iter()
            .position(|a| a.name.is(local))?;
        Some(self.attributes.remove(pos).value)
    }
}
