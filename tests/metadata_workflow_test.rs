use simtools_meta::config::{PathSettings, WorkflowConfig};
use simtools_meta::data_model::{MetadataAssembler, ModelDataWriter, TopLevelMetadata, UserMetadata};
use simtools_meta::histogram::{self, Histogram};
use simtools_meta::io_handler::IoHandler;
use simtools_meta::SimtoolsError;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing_test::traced_test;

const RESOURCES: &str = "tests/resources";

fn workflow_in(product_dir: &Path) -> Arc<WorkflowConfig> {
    let mut config = WorkflowConfig::load_from(Path::new(RESOURCES).join("workflow.yml")).unwrap();
    config.ctasimpipe.product.directory = Some(product_dir.to_path_buf());
    Arc::new(config)
}

fn user_meta() -> UserMetadata {
    UserMetadata::from_file(Path::new(RESOURCES).join("user_meta.yml")).unwrap()
}

#[test]
fn test_assembler_from_workflow_template() {
    let temp_dir = tempfile::tempdir().unwrap();
    let assembler = MetadataAssembler::from_workflow(workflow_in(temp_dir.path())).unwrap();
    assert_eq!(assembler.metadata(), &TopLevelMetadata::reference());
}

#[test]
fn test_prepare_full_document() {
    let temp_dir = tempfile::tempdir().unwrap();
    let mut assembler = MetadataAssembler::from_workflow(workflow_in(temp_dir.path())).unwrap();
    let meta = assembler.prepare(&user_meta()).unwrap().clone();

    assert_eq!(meta.cta.contact.name.as_deref(), Some("Jane Doe"));
    assert_eq!(meta.cta.instrument.r#type.as_deref(), Some("NectarCam"));
    assert_eq!(
        meta.cta.product.description.as_deref(),
        Some("Photon density at ground level")
    );
    assert_eq!(meta.cta.product.valid.start.as_deref(), Some("2050-01-01"));
    assert_eq!(meta.cta.product.format.as_deref(), Some("arrow"));
    assert_eq!(
        meta.cta.product.association.id.as_deref(),
        Some("South-MST-NectarCam-D")
    );
    assert_eq!(
        meta.cta.activity.name.as_deref(),
        Some("submit_data_from_external")
    );
    assert_eq!(meta.cta.process.r#type.as_deref(), Some("simulation"));
}

#[test]
fn test_fill_user_meta_missing_instrument_from_yaml() {
    let yaml = r#"
CONTACT:
  NAME: Jane Doe
PRODUCT:
  DESCRIPTION: something
  CREATION_TIME: "2050-01-01"
  ASSOCIATION:
    SITE: South
    CLASS: MST
    TYPE: NectarCam
    SUBTYPE: D
PROCESS:
  TYPE: simulation
"#;
    let user = UserMetadata::from_yaml_str(yaml).unwrap();
    let mut assembler = MetadataAssembler::new(
        Arc::new(WorkflowConfig::default()),
        TopLevelMetadata::reference(),
    );
    let err = assembler.fill_user_meta(&user).unwrap_err();
    assert!(matches!(err, SimtoolsError::MissingKey(ref key) if key == "INSTRUMENT"));
}

#[test]
#[traced_test]
fn test_unknown_site_is_logged() {
    let mut user = user_meta();
    if let Some(association) = user.product.as_mut().and_then(|p| p.association.as_mut()) {
        association.site = Some("Neptun".to_string());
    }
    let mut assembler = MetadataAssembler::new(
        Arc::new(WorkflowConfig::default()),
        TopLevelMetadata::reference(),
    );
    assembler.fill_user_meta(&user).unwrap();
    assert!(matches!(
        assembler.read_instrument_name(),
        Err(SimtoolsError::InvalidValue { .. })
    ));
    assert!(logs_contain("Invalid site name Neptun"));
}

#[test]
fn test_write_model_file() {
    let temp_dir = tempfile::tempdir().unwrap();
    let workflow = workflow_in(&temp_dir.path().join("products"));
    let assembler = MetadataAssembler::from_workflow(workflow).unwrap();
    let io = IoHandler::new(&PathSettings::default());
    let mut writer = ModelDataWriter::new(assembler, io);

    let table = histogram::fill_table(
        &Histogram::OneD(vec![1.0, 2.0, 3.0]),
        &[1.0, 2.0, 3.0, 4.0],
        None,
        "distance",
        None,
        &HashMap::from([("Title".to_string(), "photons".to_string())]),
    )
    .unwrap();

    let written = writer.write_model_file(&user_meta(), &table).unwrap();
    assert!(written.metadata_file.ends_with("products/photons_per_event.yml"));
    assert!(written.data_file.ends_with("products/photons_per_event.arrow"));

    let yaml = std::fs::read_to_string(&written.metadata_file).unwrap();
    let stored: TopLevelMetadata = serde_yaml::from_str(&yaml).unwrap();
    assert_eq!(stored, *writer.assembler().metadata());

    let read = histogram::read_table(&written.data_file).unwrap();
    assert_eq!(read.column("values").unwrap(), vec![1.0, 2.0, 3.0]);
    assert_eq!(read.metadata().get("Title").map(String::as_str), Some("photons"));
    assert_eq!(
        read.metadata()
            .get("CTA.PRODUCT.ASSOCIATION.ID")
            .map(String::as_str),
        Some("South-MST-NectarCam-D")
    );
}

#[test]
fn test_write_model_file_without_product_name() {
    let temp_dir = tempfile::tempdir().unwrap();
    let assembler = MetadataAssembler::from_workflow(workflow_in(temp_dir.path())).unwrap();
    let mut writer = ModelDataWriter::new(assembler, IoHandler::default());

    let mut user = user_meta();
    if let Some(product) = user.product.as_mut() {
        product.data = None;
    }
    let table = histogram::fill_table(
        &Histogram::OneD(vec![1.0]),
        &[0.0, 1.0],
        None,
        "x",
        None,
        &HashMap::new(),
    )
    .unwrap();

    let err = writer.write_model_file(&user, &table).unwrap_err();
    let err = err.downcast_ref::<SimtoolsError>().unwrap();
    assert!(matches!(err, SimtoolsError::MissingKey(ref key) if key == "PRODUCT.NAME"));
}
