//! Core library for CTA simulation-model data products.
//!
//! This library assembles CTA top-level metadata documents, converts simulation
//! histograms into annotated Arrow tables and resolves the input/output directory
//! layout used by the simulation tools.

pub mod config;
pub mod data_model;
pub mod error;
pub mod histogram;
pub mod io_handler;
pub mod names;

pub use config::{PathSettings, WorkflowConfig};
pub use data_model::{MetadataAssembler, ModelDataWriter, TopLevelMetadata, UserMetadata};
pub use error::{SimtoolsError, SimtoolsResult};
pub use histogram::{fill_table, read_table, read_tables, write_table, Histogram, HistogramTable};
pub use io_handler::{DirType, IoHandler};
pub use names::Site;
