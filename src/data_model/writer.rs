//! Model data writer: metadata file plus data table for one data product.
use super::assembler::MetadataAssembler;
use super::metadata::UserMetadata;
use crate::error::SimtoolsError;
use crate::histogram::{self, HistogramTable, TABLE_EXTENSION};
use crate::io_handler::{DirType, IoHandler};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Files written by [`ModelDataWriter::write_model_file`].
#[derive(Debug, Clone, PartialEq)]
pub struct WrittenProduct {
    /// Assembled metadata document (`.yml`).
    pub metadata_file: PathBuf,
    /// Annotated data table (`.arrow`).
    pub data_file: PathBuf,
}

/// Writes one data product: the assembled metadata and its data table.
pub struct ModelDataWriter {
    assembler: MetadataAssembler,
    io_handler: IoHandler,
}

impl ModelDataWriter {
    /// Create a writer from an assembler holding the metadata template.
    pub fn new(assembler: MetadataAssembler, io_handler: IoHandler) -> Self {
        Self {
            assembler,
            io_handler,
        }
    }

    /// The assembler, holding the metadata after a write.
    pub fn assembler(&self) -> &MetadataAssembler {
        &self.assembler
    }

    /// Output directory for data products, created if necessary.
    ///
    /// Uses `CTASIMPIPE.PRODUCT.DIRECTORY` when set, otherwise the labeled output
    /// directory named after the workflow activity.
    ///
    /// # Errors
    ///
    /// `MissingKey` if neither the product directory nor `CTASIMPIPE.ACTIVITY.NAME`
    /// is configured.
    pub fn product_data_directory(&self) -> Result<PathBuf> {
        let workflow = self.assembler.workflow();
        let directory = match workflow.ctasimpipe.product.directory.as_deref() {
            Some(dir) => {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("Failed to create product directory {:?}", dir))?;
                std::path::absolute(dir)?
            }
            None => {
                let label = workflow.activity_name()?;
                self.io_handler
                    .ensure_output_directory(label, None, &DirType::default(), false)?
            }
        };
        tracing::info!("Output directory {}", directory.display());
        Ok(directory)
    }

    /// Full path of a product file: `{directory}/{name}{suffix}`.
    ///
    /// The name is `CTASIMPIPE.PRODUCT.NAME`, or else the stem of the user
    /// `PRODUCT.DATA` file name.
    pub fn data_file_name(&self, user_meta: &UserMetadata, suffix: &str) -> Result<PathBuf> {
        let directory = self.product_data_directory()?;
        let name = self.product_name(user_meta)?;
        Ok(directory.join(format!("{}{}", name, suffix)))
    }

    fn product_name(&self, user_meta: &UserMetadata) -> Result<String> {
        if let Some(name) = &self.assembler.workflow().ctasimpipe.product.name {
            return Ok(name.clone());
        }
        user_meta
            .product
            .as_ref()
            .and_then(|p| p.data.as_deref())
            .and_then(|data| Path::new(data).file_stem())
            .map(|stem| stem.to_string_lossy().into_owned())
            .ok_or_else(|| {
                tracing::error!("Missing description in user meta of PRODUCT.DATA");
                SimtoolsError::missing("PRODUCT.NAME").into()
            })
    }

    /// Assemble metadata and write it (`.yml`) next to the data table (`.arrow`).
    ///
    /// The table is written with the flattened metadata document merged into its
    /// annotations.
    pub fn write_model_file(
        &mut self,
        user_meta: &UserMetadata,
        table: &HistogramTable,
    ) -> Result<WrittenProduct> {
        self.assembler
            .prepare(user_meta)
            .context("Failed to prepare product metadata")?;

        let metadata_file = self.data_file_name(user_meta, ".yml")?;
        let yaml = self.assembler.metadata().to_yaml()?;
        tracing::debug!("Writing metadata to {}", metadata_file.display());
        std::fs::write(&metadata_file, yaml)
            .with_context(|| format!("Failed to write metadata file {:?}", metadata_file))?;

        let data_file = self.data_file_name(user_meta, &format!(".{}", TABLE_EXTENSION))?;
        let annotations = self.assembler.metadata().to_annotations()?;
        let annotated = table.with_metadata(annotations)?;
        histogram::write_table(&annotated, &data_file)
            .with_context(|| format!("Failed to write data file {:?}", data_file))?;

        Ok(WrittenProduct {
            metadata_file,
            data_file,
        })
    }
}
