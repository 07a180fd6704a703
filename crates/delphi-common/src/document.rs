use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier of a document within the corpus.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for DocumentId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A reviewable document as it appears in the corpus table.
///
/// Field names follow the corpus column headers (`ID`, `Title`, `Evidence`,
/// `AI_Report`, `Author_Conclusion`). The three long-text fields are display
/// only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(rename = "ID")]
    pub id: DocumentId,
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Evidence", default)]
    pub evidence: String,
    #[serde(rename = "AI_Report", default)]
    pub ai_report: String,
    #[serde(rename = "Author_Conclusion", default)]
    pub author_conclusion: String,
}

impl Document {
    pub fn new(id: &str, title: &str) -> Self {
        Self {
            id: DocumentId::new(id),
            title: title.to_string(),
            evidence: String::new(),
            ai_report: String::new(),
            author_conclusion: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_reads_corpus_column_names() {
        let json = r#"{
            "ID": "P1",
            "Title": "Statins and dementia",
            "Evidence": "RCT, n=1200",
            "AI_Report": "Moderate certainty",
            "Author_Conclusion": "No effect"
        }"#;
        let doc: Document = serde_json::from_str(json).unwrap();
        assert_eq!(doc.id, DocumentId::new("P1"));
        assert_eq!(doc.title, "Statins and dementia");
        assert_eq!(doc.ai_report, "Moderate certainty");
        assert_eq!(doc.author_conclusion, "No effect");
    }

    #[test]
    fn display_fields_default_to_empty() {
        let doc: Document = serde_json::from_str(r#"{"ID": "P2", "Title": "t"}"#).unwrap();
        assert!(doc.evidence.is_empty());
        assert!(doc.ai_report.is_empty());
    }

    #[test]
    fn missing_id_is_rejected() {
        let result: Result<Document, _> = serde_json::from_str(r#"{"Title": "t"}"#);
        assert!(result.is_err());
    }
}
