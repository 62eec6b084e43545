use serde::{Serialize, Deserialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocId(pub String);

impl DocId {
    pub fn new(id: impl Into<String>) -> Self {
        DocId(id.into())
    }

    /// Random v4 UUID identifier
    pub fn generate() -> Self {
        DocId(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DocId {
    fn from(id: &str) -> Self {
        DocId(id.to_string())
    }
}

impl From<String> for DocId {
    fn from(id: String) -> Self {
        DocId(id)
    }
}

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Directed edge between two documents, consumed by link-based ranking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentLink {
    pub source: DocId,
    pub target: DocId,
    pub link_type: String,
    pub weight: f32,
    pub url: Option<String>,
}

impl DocumentLink {
    pub fn new(source: impl Into<DocId>, target: impl Into<DocId>, link_type: &str) -> Self {
        DocumentLink {
            source: source.into(),
            target: target.into(),
            link_type: link_type.to_string(),
            weight: 1.0,
            url: None,
        }
    }

    pub fn with_weight(mut self, weight: f32) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_url(mut self, url: &str) -> Self {
        self.url = Some(url.to_string());
        self
    }
}

/// Frozen copy of a document's indexable content before an update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentVersion {
    pub version: u32,
    pub fields: BTreeMap<String, String>,
    pub content: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

/// Which optional parts a document carries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub versions: bool,
    pub relations: bool,
    pub content: bool,
}

fn default_document_weight() -> f32 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocId,
    pub fields: BTreeMap<String, String>,   // Named text fields, indexed per config
    pub metadata: BTreeMap<String, String>, // Never indexed
    pub versions: Vec<DocumentVersion>,     // Append-only history
    pub relations: Vec<DocumentLink>,
    pub content: Option<String>,
    #[serde(default)]
    pub tags: BTreeSet<String>,             // Cluster labels, never indexed
    #[serde(default = "default_document_weight")]
    pub weight: f32,                        // Multiplies every relevance score
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    pub fn new(id: impl Into<DocId>) -> Self {
        let now = Utc::now();
        Document {
            id: id.into(),
            fields: BTreeMap::new(),
            metadata: BTreeMap::new(),
            versions: Vec::new(),
            relations: Vec::new(),
            content: None,
            tags: BTreeSet::new(),
            weight: 1.0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_field(mut self, name: &str, value: &str) -> Self {
        self.add_field(name.to_string(), value.to_string());
        self
    }

    pub fn with_metadata(mut self, key: &str, value: &str) -> Self {
        self.metadata.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_content(mut self, content: &str) -> Self {
        self.content = Some(content.to_string());
        self
    }

    pub fn with_tag(mut self, tag: &str) -> Self {
        self.tags.insert(tag.to_string());
        self
    }

    pub fn with_weight(mut self, weight: f32) -> Self {
        self.weight = weight;
        self
    }

    /// Add an outgoing link from this document
    pub fn link_to(mut self, target: impl Into<DocId>, link_type: &str, weight: f32) -> Self {
        let link = DocumentLink::new(self.id.clone(), target, link_type).with_weight(weight);
        self.relations.push(link);
        self
    }

    pub fn add_field(&mut self, name: String, value: String) {
        self.fields.insert(name, value);
    }

    pub fn get_field(&self, name: &str) -> Option<&String> {
        self.fields.get(name)
    }

    /// Text for a field, falling back to the content payload for the `content` field
    pub fn indexable_text(&self, field: &str) -> Option<&str> {
        match self.fields.get(field) {
            Some(text) => Some(text.as_str()),
            None if field == "content" => self.content.as_deref(),
            None => None,
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            versions: !self.versions.is_empty(),
            relations: !self.relations.is_empty(),
            content: self.content.is_some(),
        }
    }

    /// Snapshot of the current indexable state as the next history entry
    pub fn to_version(&self) -> DocumentVersion {
        DocumentVersion {
            version: self.versions.len() as u32 + 1,
            fields: self.fields.clone(),
            content: self.content.clone(),
            recorded_at: self.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capabilities_reflect_optional_parts() {
        let plain = Document::new("a").with_field("title", "x");
        assert_eq!(plain.capabilities(), Capabilities::default());

        let rich = Document::new("b").with_content("body").link_to("a", "cites", 1.0);
        let caps = rich.capabilities();
        assert!(caps.content);
        assert!(caps.relations);
        assert!(!caps.versions);
    }

    #[test]
    fn content_field_falls_back_to_payload() {
        let doc = Document::new("a").with_content("payload text");
        assert_eq!(doc.indexable_text("content"), Some("payload text"));
        assert_eq!(doc.indexable_text("title"), None);

        let doc = doc.with_field("content", "field text");
        assert_eq!(doc.indexable_text("content"), Some("field text"));
    }

    #[test]
    fn weight_and_tags_default() {
        let doc = Document::new("a");
        assert_eq!(doc.weight, 1.0);
        assert!(doc.tags.is_empty());

        let doc = doc.with_tag("guide").with_tag("rust").with_tag("guide").with_weight(2.5);
        assert_eq!(doc.tags.len(), 2);
        assert_eq!(doc.weight, 2.5);
    }

    #[test]
    fn generated_ids_are_unique() {
        assert_ne!(DocId::generate(), DocId::generate());
    }
}
