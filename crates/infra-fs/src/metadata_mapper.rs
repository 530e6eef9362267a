// Reference MetadataMapper
// Reads the bag's descriptive metadata document and the payload manifest
// into a native-API dataset version

use crate::bag::METADATA_DIR;
use ingestflow_core::domain::{Deposit, DepositFile};
use ingestflow_core::port::{DatasetPayload, MappingContext, MappingError, MetadataMapper};
use serde::Deserialize;
use serde_json::{json, Value};
use std::fs;
use tracing::debug;

/// Descriptive metadata document, relative to `metadata/`
pub const DATASET_DOCUMENT: &str = "dataset.json";

const PAYLOAD_DIR: &str = "data";
const FORBIDDEN_LABEL_CHARS: &[char] = &['/', ':', '*', '?', '"', '<', '>', '|', ';', '#'];

#[derive(Debug, Deserialize)]
struct DatasetDocument {
    title: Option<String>,
    description: Option<String>,
    #[serde(default)]
    authors: Vec<String>,
    license: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct BagMetadataMapper;

impl BagMetadataMapper {
    pub fn new() -> Self {
        Self
    }

    fn read_document(deposit: &Deposit) -> Result<DatasetDocument, MappingError> {
        let path = deposit.bag_dir.join(METADATA_DIR).join(DATASET_DOCUMENT);
        let content = fs::read_to_string(&path)
            .map_err(|e| MappingError::Unreadable(format!("{}: {}", path.display(), e)))?;
        serde_json::from_str(&content)
            .map_err(|e| MappingError::Unreadable(format!("{}: {}", path.display(), e)))
    }
}

impl MetadataMapper for BagMetadataMapper {
    fn to_dataset_payload(
        &self,
        deposit: &Deposit,
        ctx: &MappingContext,
    ) -> Result<DatasetPayload, MappingError> {
        let document = Self::read_document(deposit)?;

        let title = document
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| MappingError::MissingRequiredField("title".to_string()))?;

        let license = document.license.as_deref().map(str::trim).unwrap_or("");
        if !ctx.allowed_licenses.is_empty()
            && !ctx.allowed_licenses.iter().any(|l| l == license)
        {
            return Err(MappingError::LicenseNotAllowed(license.to_string()));
        }

        let files = deposit
            .files
            .iter()
            .map(file_metadata)
            .collect::<Result<Vec<_>, _>>()?;

        let mut fields = vec![primitive("title", title)];
        if let Some(description) = document.description.as_deref().filter(|d| !d.trim().is_empty())
        {
            fields.push(json!({
                "typeName": "dsDescription",
                "multiple": true,
                "typeClass": "compound",
                "value": [{ "dsDescriptionValue": primitive("dsDescriptionValue", description) }],
            }));
        }
        if !document.authors.is_empty() {
            let authors: Vec<Value> = document
                .authors
                .iter()
                .map(|name| json!({ "authorName": primitive("authorName", name) }))
                .collect();
            fields.push(json!({
                "typeName": "author",
                "multiple": true,
                "typeClass": "compound",
                "value": authors,
            }));
        }

        debug!(
            deposit_id = %deposit.id,
            files = files.len(),
            migration = ctx.is_migration,
            "Dataset payload mapped"
        );

        Ok(DatasetPayload::new(json!({
            "datasetVersion": {
                "license": { "name": license },
                "metadataBlocks": {
                    "citation": { "fields": fields }
                },
                "files": files,
            }
        })))
    }
}

fn primitive(type_name: &str, value: &str) -> Value {
    json!({
        "typeName": type_name,
        "multiple": false,
        "typeClass": "primitive",
        "value": value,
    })
}

/// Directory label and file name for a payload file under `data/`
fn file_metadata(file: &DepositFile) -> Result<Value, MappingError> {
    let relative = file
        .path
        .strip_prefix(PAYLOAD_DIR)
        .and_then(|p| p.strip_prefix('/'))
        .ok_or_else(|| MappingError::InvalidFilePath(file.path.clone()))?;

    let parts: Vec<&str> = relative.split('/').collect();
    if parts.iter().any(|p| p.is_empty() || *p == "." || *p == "..") {
        return Err(MappingError::InvalidFilePath(file.path.clone()));
    }

    let (label, dirs) = match parts.split_last() {
        Some((label, dirs)) => (*label, dirs),
        None => return Err(MappingError::InvalidFilePath(file.path.clone())),
    };
    let directory_label = dirs
        .iter()
        .map(|d| sanitize_directory(d))
        .collect::<Vec<_>>()
        .join("/");

    let mut entry = json!({
        "label": sanitize_label(label),
        "checksum": file.checksum,
    });
    if !directory_label.is_empty() {
        entry["directoryLabel"] = Value::String(directory_label);
    }
    Ok(entry)
}

fn sanitize_label(name: &str) -> String {
    name.chars()
        .map(|c| if FORBIDDEN_LABEL_CHARS.contains(&c) { '_' } else { c })
        .collect()
}

fn sanitize_directory(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | ' ') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
