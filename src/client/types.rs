//! Payload shapes exchanged with the Man-O-Man backend

use serde::{Deserialize, Serialize};

/// Summary of a classified service
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceSummary {
    /// Service identifier
    pub service_name: String,
    /// Number of endpoints grouped under the service
    pub endpoint_count: u32,
    /// Generated description
    #[serde(default)]
    pub suggested_description: String,
    /// Basic CRUD operation count
    #[serde(default)]
    pub tier1_operations: u32,
    /// Specialized operation count
    #[serde(default)]
    pub tier2_operations: u32,
    /// Classifier confidence, 0.0 to 1.0
    #[serde(default)]
    pub confidence_score: f64,
    /// Flagged for manual review
    #[serde(default)]
    pub needs_review: bool,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub synonyms: Vec<String>,
}

/// Response of the service list endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceCatalog {
    /// Classified services
    pub services: Vec<ServiceSummary>,
    #[serde(default)]
    pub total_services: usize,
    /// Upload the catalog was built from
    #[serde(default)]
    pub upload_id: Option<String>,
    #[serde(default)]
    pub upload_filename: Option<String>,
    #[serde(default)]
    pub last_updated: Option<String>,
}

/// Response of the upload endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UploadResponse {
    /// Identifier used to poll processing status
    pub upload_id: String,
}

/// Processing status of an upload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UploadStatus {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_catalog_deserialization() {
        let json = r#"{
            "services": [{
                "service_name": "announcement",
                "endpoint_count": 7,
                "suggested_description": "Announcement management",
                "tier1_operations": 5,
                "tier2_operations": 2,
                "confidence_score": 0.9,
                "needs_review": false,
                "keywords": ["announcement"],
                "synonyms": ["notice"]
            }],
            "total_services": 1,
            "upload_id": null,
            "upload_filename": null,
            "last_updated": null
        }"#;

        let catalog: ServiceCatalog = serde_json::from_str(json).unwrap();
        assert_eq!(catalog.services.len(), 1);
        assert_eq!(catalog.services[0].service_name, "announcement");
        assert_eq!(catalog.services[0].tier2_operations, 2);
        assert!(catalog.upload_id.is_none());
    }

    #[test]
    fn test_service_summary_tolerates_sparse_payload() {
        let summary: ServiceSummary =
            serde_json::from_str(r#"{"service_name":"cmdb","endpoint_count":45}"#).unwrap();
        assert_eq!(summary.service_name, "cmdb");
        assert!(summary.keywords.is_empty());
        assert!(!summary.needs_review);
    }

    #[test]
    fn test_upload_status_optional_fields() {
        let status: UploadStatus = serde_json::from_str(r#"{"status":"processing"}"#).unwrap();
        assert_eq!(status.status, "processing");
        assert!(status.progress.is_none());

        let status: UploadStatus =
            serde_json::from_str(r#"{"status":"failed","progress":40.5,"error":"bad spec"}"#)
                .unwrap();
        assert_eq!(status.progress, Some(40.5));
        assert_eq!(status.error.as_deref(), Some("bad spec"));
    }
}
