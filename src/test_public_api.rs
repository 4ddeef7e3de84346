use serde_json::json;

fn assert_send_sync<T: Send + Sync>() {}

#[test]
fn form_facade_exports_shareable_types() {
    assert_send_sync::<crate::form::FormModel>();
    assert_send_sync::<crate::form::Field>();
    assert_send_sync::<crate::form::FormOptions>();
    assert_send_sync::<crate::form::ValidatorRegistry>();
    assert_send_sync::<crate::form::FieldDescriptor>();
    assert_send_sync::<crate::form::FormError>();
}

#[test]
fn prelude_smoke_builds_a_model() {
    use crate::prelude::*;

    let initial = json!({ "name": "", "email": "" });
    let model = create_model(
        initial.as_object().cloned().unwrap_or_default(),
        [
            ("name", FieldDescriptor::new().required(Required::Always(true))),
            (
                "email",
                FieldDescriptor::new().validation_type(ValidationEntry::new(ValidationType::Email)),
            ),
        ],
    )
    .expect("model");

    let field: &Field = model.field("name").expect("name");
    let snapshot: FieldSnapshot = field.snapshot().expect("snapshot");
    assert_eq!(snapshot.name, "name");
    let _: FormSnapshot = model.snapshot().expect("form snapshot");
    let _: Siblings = Siblings::new();
    let _: Verdict = Verdict::from(true);
    let _: FormResult<()> = Err(FormError::FieldNotFound("x".to_string()));
    let _ = FormModel::with_options(
        serde_json::Map::new(),
        Vec::<(String, FieldDescriptor)>::new(),
        FormOptions::default().registry(ValidatorRegistry::standard()),
    )
    .expect("empty model");
}

#[test]
fn default_options_use_standard_rules_and_shared_spawner() {
    let options = crate::form::FormOptions::default();
    assert_eq!(options.debounce, crate::form::DEFAULT_DEBOUNCE);
    assert!(options.spawner.is_some());
    assert!(options.clone().without_spawner().spawner.is_none());
    for validation_type in crate::form::ValidationType::ALL {
        assert!(options.registry.contains(validation_type));
    }
}
