use serde_json::Value;

/// Represents a document snapshot read from a collection.
#[derive(Debug, Clone)]
pub struct Document {
    /// The unique identifier of the document.
    pub id: String,
    /// The JSON data of the document.
    pub data: Value,
}

impl Document {
    /// Creates a new document snapshot.
    pub fn new(id: impl Into<String>, data: Value) -> Self {
        Self {
            id: id.into(),
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_document_creation() {
        let data = json!({"name": "Test", "value": 42});
        let doc = Document::new("test-id", data.clone());

        assert_eq!(doc.id, "test-id");
        assert_eq!(doc.data, data);
    }

    #[test]
    fn test_document_with_empty_data() {
        let doc = Document::new("empty", json!({}));

        assert_eq!(doc.id, "empty");
        assert!(doc.data.as_object().unwrap().is_empty());
    }

    #[test]
    fn test_document_with_nested_data() {
        let data = json!({
            "status": "pending",
            "participants": {"u1": true},
            "assignedTo": null
        });
        let doc = Document::new("query-1", data);

        assert_eq!(doc.data["status"], "pending");
        assert_eq!(doc.data["participants"]["u1"], true);
        assert!(doc.data["assignedTo"].is_null());
    }
}
