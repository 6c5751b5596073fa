//! Namespace scopes for the reader

use crate::tree::Attributes;

const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// Split `prefix:local`; names without a colon have no prefix
pub fn split_qname(qname: &str) -> (Option<&str>, &str) {
    match qname.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, qname),
    }
}

/// Stack of prefix bindings, one scope per open element
#[derive(Clone, Debug, Default)]
pub struct NamespaceStack {
    scopes: Vec<Vec<(String, String)>>,
}

impl NamespaceStack {
    /// Remove `xmlns` / `xmlns:p` declarations from `attributes` and open a
    /// scope with them. Returns the declared `(prefix, uri)` pairs in
    /// document order; the default namespace uses an empty prefix.
    pub fn push_scope(&mut self, attributes: &mut Attributes) -> Vec<(String, String)> {
        let mut bindings = Vec::new();
        attributes.retain(|name, value| {
            let prefix = match name.as_str() {
                "xmlns" => String::new(),
                other => match other.strip_prefix("xmlns:") {
                    Some(prefix) => prefix.to_string(),
                    None => return true,
                },
            };
            bindings.push((prefix, value.clone()));
            false
        });
        self.scopes.push(bindings.clone());
        bindings
    }

    /// Close the innermost scope, returning the prefixes it declared
    pub fn pop_scope(&mut self) -> Vec<String> {
        self.scopes
            .pop()
            .unwrap_or_default()
            .into_iter()
            .map(|(prefix, _)| prefix)
            .collect()
    }

    /// Innermost binding for `prefix`
    pub fn resolve(&self, prefix: &str) -> Option<&str> {
        if prefix == "xml" {
            return Some(XML_NAMESPACE);
        }
        self.scopes
            .iter()
            .rev()
            .flat_map(|scope| scope.iter().rev())
            .find(|(bound, _)| bound == prefix)
            .map(|(_, uri)| uri.as_str())
    }
}
