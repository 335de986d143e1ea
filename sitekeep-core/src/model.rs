use serde::{Deserialize, Serialize};

/// Kind of a node in the bookmark tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeType {
    /// A container; site captures create one folder per captured site.
    Folder,
    /// An archived page with stored content attached.
    Archive,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Folder => "folder",
            NodeType::Archive => "archive",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "folder" => Some(NodeType::Folder),
            "archive" => Some(NodeType::Archive),
            _ => None,
        }
    }
}

/// One node of the bookmark tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookmarkNode {
    pub id: i64,
    pub parent_id: Option<i64>,
    pub name: String,
    pub uri: Option<String>,
    pub icon: Option<String>,
    pub node_type: NodeType,
    pub added_at: i64,
}

/// Summary row for one archived page, as read back out of storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchivedPage {
    pub node_id: i64,
    pub name: String,
    pub uri: String,
    pub content_type: String,
    pub byte_size: i64,
}
