/// Integration tests for upload validators and content sniffing
use async_trait::async_trait;
use pretty_assertions::assert_eq;
use rusty_forms::validators::FileValidators;
use rusty_forms::{
    define_model, Config, ContentSniffer, FileFieldMappings, FormError, FormRequest, SetOptions,
    Value,
};
use serde_json::json;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

fn descriptor(json: serde_json::Value) -> Value {
    Value::from(json)
}

#[test]
fn test_max_size_reports_humanized_limit() {
    let files = FileValidators::default();
    let schema = define_model("profileForm")
        .field("avatar")
        .validator("avatar", files.max_size("50kb").unwrap())
        .build()
        .unwrap();

    let mut form = schema.create_with(
        [("avatar", descriptor(json!({"name": "me.png", "type": "image/png", "size": 51201})))],
        SetOptions::default(),
    );
    assert!(!form.validate_sync().unwrap());
    assert!(form.get_first_error("avatar").unwrap().contains("50kB"));

    form.set("avatar", descriptor(json!({"name": "me.png", "type": "image/png", "size": 51200})));
    assert!(form.validate_sync().unwrap());
}

#[test]
fn test_bad_size_string_fails_at_declaration() {
    let err = FileValidators::default().max_size("not-a-size").unwrap_err();
    assert!(matches!(err, FormError::InvalidSize(_)));
    assert!(err.is_configuration());
    assert!(err.to_string().contains("not-a-size"));
}

#[test]
fn test_required_file_and_has_file() {
    let files = FileValidators::default();
    let schema = define_model("profileForm")
        .fields(["avatar", "name"])
        .validator("avatar", files.required())
        .build()
        .unwrap();

    let mut form = schema.create();
    assert!(form.is_required("avatar").unwrap());
    assert!(!form.has_file("avatar").unwrap());
    assert!(!form.validate_sync().unwrap());
    assert_eq!(form.get_first_error("avatar").unwrap(), "Avatar is a required field.");

    // An empty file input arrives as a zero-sized descriptor
    form.set("avatar", descriptor(json!({"name": "", "size": 0})));
    assert!(!form.has_file("avatar").unwrap());

    form.parse_request_sync(FormRequest::from_json(json!({
        "files": {"profileForm_avatar": {"name": "me.jpg", "type": "image/jpeg", "size": 2048}}
    })).unwrap());
    assert!(form.has_file("avatar").unwrap());
    assert!(form.validate_sync().unwrap());
}

#[test]
fn test_mime_types_with_config_mappings() {
    let config: Config = toml::from_str("[files]\npreset = \"multer\"").unwrap();
    let files = FileValidators::from_config(&config);
    let schema = define_model("upload")
        .field("scan")
        .file_mappings(config.file_mappings())
        .validator("scan", files.mime_types(["image/*", "application/pdf"]))
        .build()
        .unwrap();

    let mut form = schema.create_with(
        [("scan", descriptor(json!({"originalname": "scan.txt", "mimetype": "text/plain", "size": 10})))],
        SetOptions::default(),
    );
    assert!(form.has_file("scan").unwrap());
    assert!(!form.validate_sync().unwrap());
    assert_eq!(
        form.get_first_error("scan").unwrap(),
        "Scan must be one of the following file types: image/*, application/pdf."
    );

    form.set("scan", descriptor(json!({"originalname": "scan.jpg", "mimetype": "image/jpeg", "size": 10})));
    assert!(form.validate_sync().unwrap());
}

#[tokio::test]
async fn test_enforce_mime_match_reads_contents() {
    let mut pdf = tempfile::NamedTempFile::new().unwrap();
    pdf.write_all(b"%PDF-1.5\n1 0 obj\n").unwrap();
    let path = pdf.path().to_string_lossy().to_string();

    let files = FileValidators::default();
    let schema = define_model("docs")
        .field("contract")
        .validator("contract", files.enforce_mime_match())
        .build()
        .unwrap();

    let mut honest = schema.create_with(
        [("contract", descriptor(json!({"name": "c.pdf", "type": "application/pdf", "size": 17, "path": &path})))],
        SetOptions::default(),
    );
    assert!(honest.validate().await.unwrap());

    let mut lying = schema.create_with(
        [("contract", descriptor(json!({"name": "c.png", "type": "image/png", "size": 17, "path": &path})))],
        SetOptions::default(),
    );
    assert!(!lying.validate().await.unwrap());
    assert_eq!(
        lying.get_first_error("contract").unwrap(),
        "The MIME Type of Contract does not match its contents."
    );

    // Deferred, so the synchronous pipeline refuses to run it
    assert!(matches!(lying.validate_sync(), Err(FormError::NotInvocable { .. })));
}

#[tokio::test]
async fn test_enforce_mime_match_without_upload_passes() {
    let schema = define_model("docs")
        .field("contract")
        .validator("contract", FileValidators::default().enforce_mime_match())
        .build()
        .unwrap();
    assert!(schema.create().validate().await.unwrap());
}

#[tokio::test]
async fn test_enforce_mime_match_missing_file_aborts() {
    let schema = define_model("docs")
        .field("contract")
        .validator("contract", FileValidators::default().enforce_mime_match())
        .build()
        .unwrap();

    let mut form = schema.create_with(
        [("contract", descriptor(json!({"name": "c.pdf", "type": "application/pdf", "size": 5, "path": "/no/such/file"})))],
        SetOptions::default(),
    );
    let err = form.validate().await.unwrap_err();
    assert!(matches!(err, FormError::Environment(_)));
    assert!(!form.has_errors());
}

struct StallingSniffer;

#[async_trait]
impl ContentSniffer for StallingSniffer {
    async fn sniff(&self, _path: &Path) -> anyhow::Result<String> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok("application/pdf".to_string())
    }

    fn name(&self) -> &'static str {
        "stalling"
    }
}

#[tokio::test]
async fn test_sniff_timeout_aborts_validation() {
    let files = FileValidators::new(FileFieldMappings::default())
        .with_sniffer(StallingSniffer)
        .with_sniff_timeout(Duration::from_millis(20));
    let schema = define_model("docs")
        .field("contract")
        .validator("contract", files.enforce_mime_match())
        .build()
        .unwrap();

    let mut form = schema.create_with(
        [("contract", descriptor(json!({"name": "c.pdf", "type": "application/pdf", "size": 5, "path": "/tmp/c.pdf"})))],
        SetOptions::default(),
    );
    let err = form.validate().await.unwrap_err();
    assert!(err.to_string().contains("timed out"));
}
