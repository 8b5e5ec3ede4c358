//! CTA top-level metadata records.
//!
//! [`TopLevelMetadata`] mirrors the CTA top-level data model as typed sections with
//! nullable fields. [`UserMetadata`] is the fragment a user supplies per run; all of its
//! fields are optional at parse time and the assembler checks for the required ones.

use crate::error::SimtoolsResult;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Version of the top-level data model written by [`TopLevelMetadata::reference`].
pub const REFERENCE_VERSION: &str = "1.0.0";

/// Root of a CTA metadata document (`CTA: {...}`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopLevelMetadata {
    /// `CTA` root section.
    #[serde(rename = "CTA", default)]
    pub cta: CtaMetadata,
}

/// Sections of the CTA top-level data model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default)]
pub struct CtaMetadata {
    /// Data model version.
    pub reference: Reference,
    /// Data product description.
    pub product: Product,
    /// Instrument the data was taken or simulated with.
    pub instrument: Instrument,
    /// Process the product belongs to.
    pub process: Process,
    /// Person responsible for the product.
    pub contact: Contact,
    /// Software run that produced the product.
    pub activity: Activity,
    /// Context documents and associations.
    pub context: Context,
}

/// `CTA.REFERENCE`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default)]
pub struct Reference {
    /// Version of the top-level data model.
    pub version: Option<String>,
}

/// `CTA.PRODUCT`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default)]
pub struct Product {
    /// Free-text description.
    pub description: Option<String>,
    /// Creation time supplied by the user.
    pub creation_time: Option<String>,
    /// Product UUID.
    pub id: Option<String>,
    /// Data category, level and model.
    pub data: ProductData,
    /// File format of the data product.
    pub format: Option<String>,
    /// File name of the data product.
    pub filename: Option<String>,
    /// Validity range.
    pub valid: Validity,
    /// Free-form context copied from the user metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
    /// Instrument the product is associated with.
    pub association: Association,
}

/// `CTA.PRODUCT.DATA`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default)]
pub struct ProductData {
    /// Data category, e.g. `SIM`.
    pub category: Option<String>,
    /// Data level, e.g. `R0`.
    pub level: Option<String>,
    /// Data type, e.g. `service`.
    pub r#type: Option<String>,
    /// Data model the product follows.
    pub model: DataModelRef,
}

/// `CTA.PRODUCT.DATA.MODEL`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default)]
pub struct DataModelRef {
    /// Data model name.
    pub name: Option<String>,
    /// Data model version.
    pub version: Option<String>,
    /// Data model location.
    pub url: Option<String>,
}

/// Validity range of a data product.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default)]
pub struct Validity {
    /// Start of validity.
    pub start: Option<String>,
    /// End of validity.
    pub end: Option<String>,
}

/// Instrument a data product is associated with. `ID` holds the derived
/// `SITE-CLASS-TYPE-SUBTYPE` name once the product metadata is filled.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default)]
pub struct Association {
    /// Observatory site, `North` or `South`.
    #[serde(deserialize_with = "scalar_string")]
    pub site: Option<String>,
    /// Telescope class, e.g. `MST`.
    #[serde(deserialize_with = "scalar_string")]
    pub class: Option<String>,
    /// Camera or structure type, e.g. `NectarCam`.
    #[serde(deserialize_with = "scalar_string")]
    pub r#type: Option<String>,
    /// Type subdivision, e.g. `D`.
    #[serde(deserialize_with = "scalar_string")]
    pub subtype: Option<String>,
    /// Derived instrument name.
    #[serde(deserialize_with = "scalar_string")]
    pub id: Option<String>,
}

/// `CTA.INSTRUMENT`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default)]
pub struct Instrument {
    /// Observatory site.
    #[serde(deserialize_with = "scalar_string")]
    pub site: Option<String>,
    /// Instrument class.
    #[serde(deserialize_with = "scalar_string")]
    pub class: Option<String>,
    /// Instrument type.
    #[serde(deserialize_with = "scalar_string")]
    pub r#type: Option<String>,
    /// Instrument subtype.
    #[serde(deserialize_with = "scalar_string")]
    pub subtype: Option<String>,
    /// Instrument identifier.
    #[serde(deserialize_with = "scalar_string")]
    pub id: Option<String>,
}

/// `CTA.PROCESS`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default)]
pub struct Process {
    /// Process type, e.g. `simulation`.
    pub r#type: Option<String>,
    /// Process subtype.
    pub subtype: Option<String>,
    /// Process identifier.
    #[serde(deserialize_with = "scalar_string")]
    pub id: Option<String>,
}

/// `CTA.CONTACT`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default)]
pub struct Contact {
    /// Organization name.
    pub organization: Option<String>,
    /// Contact name.
    pub name: Option<String>,
    /// Contact email.
    pub email: Option<String>,
}

/// `CTA.ACTIVITY`: the software run that produced the data product.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default)]
pub struct Activity {
    /// Activity name from the workflow.
    pub name: Option<String>,
    /// Activity type, `software`.
    pub r#type: Option<String>,
    /// Activity identifier.
    pub id: Option<String>,
    /// Start time (UTC).
    pub start: Option<String>,
    /// End time (UTC).
    pub end: Option<String>,
    /// Software that ran the activity.
    pub software: Software,
}

/// `CTA.ACTIVITY.SOFTWARE`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default)]
pub struct Software {
    /// Software name.
    pub name: Option<String>,
    /// Software version.
    pub version: Option<String>,
}

/// `CTA.CONTEXT`: documents and instruments the product was derived in context of.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default)]
pub struct Context {
    /// `CTA.CONTEXT.SIM`
    pub sim: SimContext,
}

/// `CTA.CONTEXT.SIM`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default)]
pub struct SimContext {
    /// Instruments the simulation relates to.
    pub association: Vec<Association>,
    /// Reference documents (reports, publications).
    pub document: Vec<Document>,
}

/// Reference to an external document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default)]
pub struct Document {
    /// Document kind, e.g. `report`.
    pub r#type: Option<String>,
    /// Document identifier.
    #[serde(deserialize_with = "scalar_string")]
    pub id: Option<String>,
    /// Location of the document.
    pub link: Option<String>,
}

impl TopLevelMetadata {
    /// Built-in reference template following the CTA top-level data model.
    pub fn reference() -> Self {
        Self {
            cta: CtaMetadata {
                reference: Reference {
                    version: Some(REFERENCE_VERSION.to_string()),
                },
                product: Product {
                    data: ProductData {
                        category: Some("SIM".to_string()),
                        level: Some("R0".to_string()),
                        r#type: Some("service".to_string()),
                        model: DataModelRef {
                            name: Some("simpipe-table".to_string()),
                            version: Some("0.1.0".to_string()),
                            url: None,
                        },
                    },
                    ..Default::default()
                },
                activity: Activity {
                    r#type: Some("software".to_string()),
                    software: Software {
                        name: Some("gammasim-tools".to_string()),
                        version: None,
                    },
                    ..Default::default()
                },
                ..Default::default()
            },
        }
    }

    /// Read a metadata template from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> SimtoolsResult<Self> {
        let path = path.as_ref();
        tracing::debug!("Reading top-level metadata template from {}", path.display());
        let file = std::fs::File::open(path)?;
        Ok(serde_yaml::from_reader(file)?)
    }

    /// Serialize to a YAML document.
    pub fn to_yaml(&self) -> SimtoolsResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Flatten into dotted `CTA.SECTION.FIELD` annotations, skipping null fields.
    pub fn to_annotations(&self) -> SimtoolsResult<HashMap<String, String>> {
        let value = serde_json::to_value(self)?;
        let mut annotations = HashMap::new();
        flatten_into(&value, String::new(), &mut annotations);
        Ok(annotations)
    }
}

fn flatten_into(value: &serde_json::Value, prefix: String, out: &mut HashMap<String, String>) {
    match value {
        serde_json::Value::Null => {}
        serde_json::Value::Array(items) if items.is_empty() => {}
        serde_json::Value::Object(map) => {
            for (key, child) in map {
                let key = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", prefix, key)
                };
                flatten_into(child, key, out);
            }
        }
        serde_json::Value::String(s) => {
            out.insert(prefix, s.clone());
        }
        other => {
            out.insert(prefix, other.to_string());
        }
    }
}

/// User-supplied metadata fragment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default)]
pub struct UserMetadata {
    /// Data model version the user metadata follows.
    pub reference: Option<Reference>,
    /// Required contact details.
    pub contact: Option<Contact>,
    /// Required instrument section.
    pub instrument: Option<Instrument>,
    /// Required product section.
    pub product: Option<UserProduct>,
    /// Required process section.
    pub process: Option<Process>,
    /// Optional context documents.
    pub context: Option<UserContext>,
}

/// `CONTEXT` section of the user metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default)]
pub struct UserContext {
    /// Reference documents, copied to `CTA.CONTEXT.SIM.DOCUMENT`.
    pub document: Option<Vec<Document>>,
}

/// `PRODUCT` section of the user metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default)]
pub struct UserProduct {
    /// Required product description.
    pub description: Option<String>,
    /// Required creation time.
    pub creation_time: Option<String>,
    /// Optional free-form context.
    pub context: Option<serde_json::Value>,
    /// Optional validity range.
    pub valid: Option<Validity>,
    /// Required instrument association.
    pub association: Option<Association>,
    /// File name of the data product; its stem names the output files.
    pub data: Option<String>,
    /// Requested file format.
    pub format: Option<String>,
}

impl UserMetadata {
    /// Parse user metadata from YAML (JSON is valid YAML).
    pub fn from_yaml_str(s: &str) -> SimtoolsResult<Self> {
        Ok(serde_yaml::from_str(s)?)
    }

    /// Read user metadata from a YAML or JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> SimtoolsResult<Self> {
        let path = path.as_ref();
        tracing::debug!("Reading user metadata from {}", path.display());
        let file = std::fs::File::open(path)?;
        Ok(serde_yaml::from_reader(file)?)
    }
}

/// Scalars in identifier fields may be written unquoted (`SUBTYPE: 7`).
#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

fn scalar_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Scalar>::deserialize(deserializer)?;
    Ok(value.map(|v| match v {
        Scalar::Str(s) => s,
        Scalar::Int(i) => i.to_string(),
        Scalar::Float(f) => f.to_string(),
        Scalar::Bool(b) => b.to_string(),
    }))
}
