//! Entity models loaded from YAML files

use std::io::Write;

use exprsql::model::{ModelError, ModelMetadata};
use exprsql::query_expr::ExprType;
use exprsql::type_mapping::{RelationalTypeMappingSource, ScalarKind};
use exprsql::{QueryExpr, StaticModel, TranslationEnv, TranslatorBuilder};

use crate::common::IDENTITY_MODEL;

#[test]
fn test_model_file_drives_translation() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(IDENTITY_MODEL.as_bytes()).unwrap();

    let visitor = TranslatorBuilder::default().build();
    let model =
        StaticModel::from_yaml_file(file.path(), visitor.factory().type_mappings()).unwrap();
    assert_eq!(model.table_name("User"), Some("AspNetUsers"));
    assert_eq!(model.primary_key("Profile"), vec!["UserId".to_string()]);

    let email = QueryExpr::root("User", "u")
        .property("Email", ExprType::scalar(ScalarKind::String));
    let mut env = TranslationEnv::new(&model);
    let sql = visitor.translate(&email, &mut env).unwrap();
    assert_eq!(visitor.renderer().render(&sql).sql, "u.email");
    assert_eq!(sql.type_mapping().store_type, "nvarchar(256)");
    assert!(sql.is_nullable());
}

#[test]
fn test_unknown_store_type_is_rejected() {
    let yaml = r#"
entities:
  - name: Shape
    table: Shapes
    primary_key: Id
    properties:
      Id: { store_type: int }
      Outline: { store_type: geometry }
"#;
    let err = StaticModel::from_yaml_str(yaml, &RelationalTypeMappingSource::new()).unwrap_err();
    assert!(
        matches!(err, ModelError::InvalidStoreType { ref property, .. } if property == "Outline"),
        "unexpected error: {:?}",
        err
    );
}

#[test]
fn test_missing_model_file() {
    let err = StaticModel::from_yaml_file(
        "does/not/exist.yaml",
        &RelationalTypeMappingSource::new(),
    )
    .unwrap_err();
    assert!(matches!(err, ModelError::ConfigReadError { .. }));
}
