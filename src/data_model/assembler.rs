//! Metadata assembly for data products.
//!
//! The assembler owns one [`TopLevelMetadata`] template and fills it in place from the
//! user metadata, the product context and the workflow configuration:
//!
//! ```text
//! UserMetadata ──fill_user_meta──┐
//!                                ├──> TopLevelMetadata ──read_instrument_name──> "South-MST-NectarCam-D"
//! WorkflowConfig ─fill_activity──┘
//! ```
//!
//! A failed fill leaves the template partially filled. Callers must discard the
//! assembler in that case.

use super::metadata::{Association, TopLevelMetadata, UserMetadata};
use crate::config::WorkflowConfig;
use crate::error::{SimtoolsError, SimtoolsResult};
use crate::names;
use std::sync::Arc;

/// Fills a CTA top-level metadata template for one data product.
#[derive(Debug, Clone)]
pub struct MetadataAssembler {
    workflow: Arc<WorkflowConfig>,
    metadata: TopLevelMetadata,
}

impl MetadataAssembler {
    /// Create an assembler filling `template`.
    pub fn new(workflow: Arc<WorkflowConfig>, template: TopLevelMetadata) -> Self {
        Self {
            workflow,
            metadata: template,
        }
    }

    /// Create an assembler whose template is read from
    /// `DATAMODEL.SCHEMADIRECTORY/DATAMODEL.TOPLEVELMODEL`.
    pub fn from_workflow(workflow: Arc<WorkflowConfig>) -> SimtoolsResult<Self> {
        let template_file = workflow.toplevel_metadata_file()?;
        let template = TopLevelMetadata::from_file(template_file)?;
        Ok(Self::new(workflow, template))
    }

    /// Workflow configuration driving the activity and product fields.
    pub fn workflow(&self) -> &WorkflowConfig {
        &self.workflow
    }

    /// Current state of the metadata document.
    pub fn metadata(&self) -> &TopLevelMetadata {
        &self.metadata
    }

    /// Consume the assembler, returning the metadata document.
    pub fn into_metadata(self) -> TopLevelMetadata {
        self.metadata
    }

    /// Fill user, product and activity metadata, in that order.
    pub fn prepare(&mut self, user_meta: &UserMetadata) -> SimtoolsResult<&TopLevelMetadata> {
        self.fill_user_meta(user_meta)?;
        self.fill_product_meta()?;
        self.fill_activity_meta()?;
        Ok(&self.metadata)
    }

    /// Copy user-supplied fields into the template.
    ///
    /// Required: `CONTACT`, `INSTRUMENT`, `PRODUCT.DESCRIPTION`, `PRODUCT.CREATION_TIME`,
    /// `PRODUCT.ASSOCIATION.{SITE,CLASS,TYPE,SUBTYPE}` and `PROCESS`. `PRODUCT.CONTEXT`,
    /// `PRODUCT.VALID.{START,END}` and `CONTEXT.DOCUMENT` are copied when present.
    pub fn fill_user_meta(&mut self, user_meta: &UserMetadata) -> SimtoolsResult<()> {
        let cta = &mut self.metadata.cta;

        cta.contact = require(user_meta.contact.as_ref(), "CONTACT")?.clone();
        cta.instrument = require(user_meta.instrument.as_ref(), "INSTRUMENT")?.clone();

        let product = require(user_meta.product.as_ref(), "PRODUCT")?;
        cta.product.description = Some(
            require(product.description.as_ref(), "PRODUCT.DESCRIPTION")?.clone(),
        );
        cta.product.creation_time = Some(
            require(product.creation_time.as_ref(), "PRODUCT.CREATION_TIME")?.clone(),
        );
        if let Some(context) = &product.context {
            cta.product.context = Some(context.clone());
        }
        if let Some(valid) = &product.valid {
            if valid.start.is_some() {
                cta.product.valid.start = valid.start.clone();
            }
            if valid.end.is_some() {
                cta.product.valid.end = valid.end.clone();
            }
        }

        let association = require(product.association.as_ref(), "PRODUCT.ASSOCIATION")?;
        let target = &mut cta.product.association;
        target.site = Some(require(association.site.as_ref(), "PRODUCT.ASSOCIATION.SITE")?.clone());
        target.class =
            Some(require(association.class.as_ref(), "PRODUCT.ASSOCIATION.CLASS")?.clone());
        target.r#type =
            Some(require(association.r#type.as_ref(), "PRODUCT.ASSOCIATION.TYPE")?.clone());
        target.subtype =
            Some(require(association.subtype.as_ref(), "PRODUCT.ASSOCIATION.SUBTYPE")?.clone());

        cta.process = require(user_meta.process.as_ref(), "PROCESS")?.clone();

        if let Some(documents) = user_meta.context.as_ref().and_then(|c| c.document.as_ref()) {
            cta.context.sim.document = documents.clone();
        }

        tracing::debug!("Filled user metadata for {:?}", cta.product.description);
        Ok(())
    }

    /// Fill `PRODUCT.ASSOCIATION` from a site and a telescope name `CLASS-TYPE-SUBTYPE`
    /// (e.g. `MST-NectarCam-D`), as given on a command line.
    ///
    /// Replaces the whole association, so a previously derived `ID` is cleared.
    ///
    /// # Errors
    ///
    /// `MissingKey` naming the first absent part, `InvalidValue` for a name with more
    /// than three parts.
    pub fn fill_association_from_telescope(
        &mut self,
        site: &str,
        telescope: &str,
    ) -> SimtoolsResult<()> {
        let mut parts = telescope.split('-').filter(|part| !part.is_empty());
        let mut next_part = |key: &str| {
            parts.next().map(str::to_string).ok_or_else(|| {
                tracing::error!("Error reading telescope name {}: missing {}", telescope, key);
                SimtoolsError::missing(key)
            })
        };
        if site.is_empty() {
            return Err(SimtoolsError::missing("PRODUCT.ASSOCIATION.SITE"));
        }
        let association = Association {
            site: Some(site.to_string()),
            class: Some(next_part("PRODUCT.ASSOCIATION.CLASS")?),
            r#type: Some(next_part("PRODUCT.ASSOCIATION.TYPE")?),
            subtype: Some(next_part("PRODUCT.ASSOCIATION.SUBTYPE")?),
            id: None,
        };
        if parts.next().is_some() {
            tracing::error!("Telescope name {} has more than three parts", telescope);
            return Err(SimtoolsError::invalid("telescope", telescope));
        }
        self.metadata.cta.product.association = association;
        Ok(())
    }

    /// Issue a product ID, set the product format and the association instrument name.
    pub fn fill_product_meta(&mut self) -> SimtoolsResult<()> {
        let id = uuid::Uuid::new_v4().to_string();
        tracing::debug!("Issued UUID {}", id);
        self.metadata.cta.product.id = Some(id);
        self.metadata.cta.product.format = Some(self.workflow.product_format().to_string());

        let instrument = self.read_instrument_name()?;
        self.metadata.cta.product.association.id = Some(instrument);
        Ok(())
    }

    /// Fill activity (software run) metadata from the workflow configuration.
    ///
    /// Sets `ACTIVITY.NAME` from `CTASIMPIPE.ACTIVITY.NAME`, `START`/`END` to the current
    /// UTC time and `SOFTWARE.VERSION` to this crate's version.
    pub fn fill_activity_meta(&mut self) -> SimtoolsResult<()> {
        let name = self.workflow.activity_name()?.to_string();
        let activity = &mut self.metadata.cta.activity;

        activity.name = Some(name);
        if let Some(id) = &self.workflow.ctasimpipe.activity.id {
            activity.id = Some(id.clone());
        }
        let now = chrono::Utc::now()
            .format("%Y-%m-%dT%H:%M:%S")
            .to_string();
        activity.start = Some(now.clone());
        activity.end = Some(now);
        activity.software.version = Some(env!("CARGO_PKG_VERSION").to_string());
        Ok(())
    }

    /// Instrument name `SITE-CLASS-TYPE-SUBTYPE` from `PRODUCT.ASSOCIATION`.
    ///
    /// # Errors
    ///
    /// `MissingKey` if an association field is unset, `InvalidValue` if the site is not
    /// `North` or `South` (or one of their aliases).
    pub fn read_instrument_name(&self) -> SimtoolsResult<String> {
        let association = &self.metadata.cta.product.association;
        let site = require(association.site.as_ref(), "PRODUCT.ASSOCIATION.SITE")?;
        let class = require(association.class.as_ref(), "PRODUCT.ASSOCIATION.CLASS")?;
        let instrument_type = require(association.r#type.as_ref(), "PRODUCT.ASSOCIATION.TYPE")?;
        let subtype = require(association.subtype.as_ref(), "PRODUCT.ASSOCIATION.SUBTYPE")?;

        names::instrument_name(site, class, instrument_type, subtype).map_err(|err| match err {
            SimtoolsError::InvalidValue { value, .. } => {
                tracing::error!("Error reading naming in PRODUCT.ASSOCIATION");
                SimtoolsError::invalid("PRODUCT.ASSOCIATION.SITE", value)
            }
            other => other,
        })
    }

    /// Product file format, or its file suffix (`ascii.ecsv` becomes `ecsv`).
    pub fn product_data_file_format(&self, suffix: bool) -> String {
        let format = self.workflow.product_format();
        if suffix && format == "ascii.ecsv" {
            "ecsv".to_string()
        } else {
            format.to_string()
        }
    }
}

fn require<'a, T>(value: Option<&'a T>, key: &str) -> SimtoolsResult<&'a T> {
    value.ok_or_else(|| {
        tracing::error!("Error reading user input meta data: missing {}", key);
        SimtoolsError::missing(key)
    })
}
