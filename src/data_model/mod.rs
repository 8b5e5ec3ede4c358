//! CTA data model: metadata records, metadata assembly and product writing.
//!
//! - [`metadata`]: typed top-level and user metadata documents.
//! - [`assembler`]: fills a template from user metadata and the workflow.
//! - [`writer`]: writes the assembled metadata and the data table to disk.

pub mod assembler;
pub mod metadata;
pub mod writer;

pub use assembler::MetadataAssembler;
pub use metadata::{
    Activity, Association, Contact, Context, CtaMetadata, Document, Instrument, Process, Product,
    SimContext, TopLevelMetadata, UserContext, UserMetadata, UserProduct, Validity,
};
pub use writer::{ModelDataWriter, WrittenProduct};
