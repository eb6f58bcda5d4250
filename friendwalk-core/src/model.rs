use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a crawlable node (a user profile on the target site).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Fill a `{id}` URL template for a node.
pub fn node_url(template: &str, id: &NodeId) -> String {
    template.replace("{id}", id.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_url() {
        let id = NodeId::from("14820421");
        assert_eq!(
            node_url("http://mixi.jp/list_friend.pl?id={id}", &id),
            "http://mixi.jp/list_friend.pl?id=14820421"
        );
    }

    #[test]
    fn test_node_id_serializes_as_plain_string() {
        let id = NodeId::from("42");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"42\"");
    }
}
