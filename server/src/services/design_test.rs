use super::*;
use crate::state::test_helpers;
use canvas::element::{ColorFilter, ElementStyle, ImageStyle, ObjectFit, WOOD_TONE};

fn small_limits() -> ServerConfig {
    ServerConfig { max_file_bytes: 8, max_field_bytes: 16, max_files: 2, ..ServerConfig::with_defaults("") }
}

fn design_json(material: &str, template: &str, front: &str) -> String {
    format!(
        r#"{{"material":"{material}","template":"{template}",
            "elements":{{"front":{front},"back":[]}},
            "customer":{{"name":"Ada","email":"ada@example.com"}},
            "submittedAtMs":1700000000000}}"#
    )
}

const TEXT_ELEMENT: &str = r##"[{"id":"6f1d5a56-7c1b-4c1e-9f0a-2f2b8c1d0e11",
    "geometry":{"x":10,"y":20,"width":150,"height":40,"rotation":0},
    "zIndex":1,
    "style":{"type":"text","content":"Hello","fontFamily":"Arial","fontSizePx":24,"color":"#FF0000",
             "weight":"normal","italic":false,"underline":false,"align":"left"}}]"##;

// =============================================================================
// Error codes
// =============================================================================

#[test]
fn error_codes_and_statuses() {
    let cases: Vec<(DesignError, &str, StatusCode)> = vec![
        (DesignError::FileTooLarge { field: "f".into(), limit: 1 }, "FILE_TOO_LARGE", StatusCode::PAYLOAD_TOO_LARGE),
        (DesignError::FieldTooLarge { field: "f".into(), limit: 1 }, "FIELD_TOO_LARGE", StatusCode::PAYLOAD_TOO_LARGE),
        (DesignError::TooManyFiles { limit: 2 }, "TOO_MANY_FILES", StatusCode::BAD_REQUEST),
        (DesignError::UnexpectedFile("x".into()), "UNEXPECTED_FILE", StatusCode::BAD_REQUEST),
        (DesignError::MissingDesignData, "MISSING_DESIGN_DATA", StatusCode::BAD_REQUEST),
        (DesignError::InvalidDesign("x".into()), "INVALID_DESIGN", StatusCode::BAD_REQUEST),
        (DesignError::NotFound(Uuid::nil()), "NOT_FOUND", StatusCode::NOT_FOUND),
        (DesignError::Multipart("x".into()), "MULTIPART_ERROR", StatusCode::BAD_REQUEST),
        (DesignError::Storage(std::io::Error::other("disk")), "STORAGE_ERROR", StatusCode::INTERNAL_SERVER_ERROR),
    ];
    for (err, code, status) in cases {
        assert_eq!(err.error_code(), code);
        assert_eq!(err.status(), status, "{code}");
    }
}

#[test]
fn only_infrastructure_errors_are_retryable() {
    assert!(DesignError::Storage(std::io::Error::other("disk")).retryable());
    assert!(!DesignError::MissingDesignData.retryable());
}

// =============================================================================
// Multipart intake
// =============================================================================

#[test]
fn classify_known_fields() {
    assert_eq!(classify_part("designData", false).unwrap(), PartKind::DesignData);
    assert_eq!(classify_part("frontDesignImage", true).unwrap(), PartKind::Preview(Side::Front));
    assert_eq!(classify_part("backDesignImage", true).unwrap(), PartKind::Preview(Side::Back));
    assert_eq!(classify_part("comment", false).unwrap(), PartKind::Ignored);
}

#[test]
fn classify_rejects_stray_files() {
    assert!(matches!(classify_part("avatar", true), Err(DesignError::UnexpectedFile(n)) if n == "avatar"));
    assert!(matches!(classify_part("designData", true), Err(DesignError::UnexpectedFile(_))));
}

#[test]
fn builder_counts_files() {
    let config = ServerConfig { max_files: 1, ..small_limits() };
    let mut b = SubmissionBuilder::new(&config);
    b.begin_part("frontDesignImage", true).unwrap();
    assert!(matches!(b.begin_part("backDesignImage", true), Err(DesignError::TooManyFiles { limit: 1 })));
}

#[test]
fn builder_text_fields_do_not_count_as_files() {
    let config = ServerConfig { max_files: 0, ..small_limits() };
    let mut b = SubmissionBuilder::new(&config);
    assert_eq!(b.begin_part("designData", false).unwrap(), PartKind::DesignData);
    assert_eq!(b.begin_part("note", false).unwrap(), PartKind::Ignored);
}

#[test]
fn builder_enforces_size_limits_per_kind() {
    let b = SubmissionBuilder::new(&small_limits());
    let front = PartKind::Preview(Side::Front);
    assert!(b.check_size(front, "frontDesignImage", 8).is_ok());
    assert!(matches!(b.check_size(front, "frontDesignImage", 9), Err(DesignError::FileTooLarge { limit: 8, .. })));
    assert!(b.check_size(PartKind::DesignData, "designData", 16).is_ok());
    assert!(matches!(
        b.check_size(PartKind::DesignData, "designData", 17),
        Err(DesignError::FieldTooLarge { limit: 16, .. })
    ));
    assert!(b.check_size(PartKind::Ignored, "note", 17).is_err());
}

#[test]
fn builder_requires_design_data() {
    let mut b = SubmissionBuilder::new(&small_limits());
    b.finish_part(PartKind::Preview(Side::Front), vec![1, 2]).unwrap();
    assert!(matches!(b.finish(), Err(DesignError::MissingDesignData)));
}

#[test]
fn builder_collects_parts() {
    let mut b = SubmissionBuilder::new(&small_limits());
    b.finish_part(PartKind::DesignData, b"{}".to_vec()).unwrap();
    b.finish_part(PartKind::Preview(Side::Back), vec![9]).unwrap();
    b.finish_part(PartKind::Ignored, vec![0xFF]).unwrap();
    let s = b.finish().unwrap();
    assert_eq!(s.design_json, "{}");
    assert_eq!(s.front_preview, None);
    assert_eq!(s.back_preview, Some(vec![9]));
}

#[test]
fn builder_rejects_non_utf8_design_data() {
    let mut b = SubmissionBuilder::new(&small_limits());
    assert!(matches!(b.finish_part(PartKind::DesignData, vec![0xFF, 0xFE]), Err(DesignError::InvalidDesign(_))));
}

// =============================================================================
// Validation
// =============================================================================

#[test]
fn parse_design_accepts_minimal_payload() {
    let (design, data) = parse_design(&design_json("pvc", "blank", "[]")).unwrap();
    assert_eq!(data.material, Material::Pvc);
    assert!(design.side(Side::Front).is_empty());
    assert_eq!(data.customer.name, "Ada");
}

#[test]
fn parse_design_rejects_malformed_json() {
    assert!(matches!(parse_design("{not json"), Err(DesignError::InvalidDesign(_))));
}

#[test]
fn parse_design_requires_customer_fields() {
    let json = r#"{"material":"pvc","template":"blank","customer":{"name":"Ada","email":"  "}}"#;
    let err = parse_design(json).unwrap_err();
    assert!(matches!(&err, DesignError::InvalidDesign(m) if m.contains("email")), "{err}");
}

#[test]
fn parse_design_rejects_degenerate_elements() {
    let bad = r#"[{"id":"6f1d5a56-7c1b-4c1e-9f0a-2f2b8c1d0e11",
        "geometry":{"x":0,"y":0,"width":0,"height":10},
        "style":{"type":"shape","kind":"rectangle"}}]"#;
    assert!(matches!(parse_design(&design_json("pvc", "blank", bad)), Err(DesignError::InvalidDesign(_))));
}

#[test]
fn parse_design_keeps_one_qr_and_grows_tiny_elements() {
    let front = r#"[
        {"id":"00000000-0000-4000-8000-000000000001",
         "geometry":{"x":10,"y":10,"width":80,"height":80},"zIndex":9999,
         "style":{"type":"qrcode","sourceRef":"first.png"}},
        {"id":"00000000-0000-4000-8000-000000000002",
         "geometry":{"x":200,"y":10,"width":80,"height":80},"zIndex":9999,
         "style":{"type":"qrcode","sourceRef":"second.png"}},
        {"id":"00000000-0000-4000-8000-000000000003",
         "geometry":{"x":50,"y":50,"width":5,"height":5},"zIndex":1,
         "style":{"type":"shape","kind":"rectangle"}}]"#;
    let (design, data) = parse_design(&design_json("pvc", "blank", front)).unwrap();

    assert_eq!(design.side(Side::Front).qr_count(), 1);
    assert_eq!(data.elements.front.len(), 2);
    let qr = data.elements.front.iter().find(|e| matches!(e.style, ElementStyle::QrCode(_))).unwrap();
    assert_eq!(qr.id, Uuid::parse_str("00000000-0000-4000-8000-000000000001").unwrap());
    let tiny = data.elements.front.iter().find(|e| matches!(e.style, ElementStyle::Shape(_))).unwrap();
    assert!(tiny.geometry.width >= 20.0 && tiny.geometry.height >= 20.0);
    assert!((tiny.geometry.x - 50.0).abs() < f64::EPSILON);
}

#[test]
fn parse_design_applies_wood_tone_to_text() {
    let (_, data) = parse_design(&design_json("wood", "blank", TEXT_ELEMENT)).unwrap();
    match &data.elements.front[0].style {
        ElementStyle::Text(t) => assert_eq!(t.color, WOOD_TONE),
        other => panic!("unexpected style {other:?}"),
    }
}

#[test]
fn parse_design_forces_blank_template_on_metal() {
    let (design, data) = parse_design(&design_json("metal", "pink", "[]")).unwrap();
    assert_eq!(data.template, Template::Blank);
    assert!(!design.mode.is_semi_custom());
}

// =============================================================================
// Submission
// =============================================================================

fn preview_png() -> Vec<u8> {
    crate::render::test_support::png_bytes(2, 2, [1, 2, 3, 255])
}

#[tokio::test]
async fn submit_writes_print_artifacts_and_registers() {
    let state = test_helpers::test_app_state();
    let submission = Submission { design_json: design_json("pvc", "blank", TEXT_ELEMENT), ..Submission::default() };
    let record = submit(&state, submission).await.unwrap();

    let dir = state.config.output_dir.join(record.id.to_string());
    let front = image::open(dir.join("front_300dpi.png")).unwrap();
    assert_eq!((front.width(), front.height()), state.compositor.spec().pixel_size());
    assert!(dir.join("back_300dpi.png").is_file());
    assert!(!dir.join("front_preview.png").exists());

    assert_eq!(record.high_res_images.front, format!("/output/{}/front_300dpi.png", record.id));
    assert_eq!(record.complete_design_images, CompleteDesignImages::default());
    let designs = state.designs.read().await;
    assert!(designs.dirty.contains(&record.id));
    drop(designs);
    std::fs::remove_dir_all(&state.config.output_dir).unwrap();
}

#[tokio::test]
async fn submit_stores_previews_verbatim() {
    let state = test_helpers::test_app_state();
    let png = preview_png();
    let submission = Submission {
        design_json: design_json("pvc", "blank", "[]"),
        front_preview: Some(png.clone()),
        back_preview: None,
    };
    let record = submit(&state, submission).await.unwrap();
    let dir = state.config.output_dir.join(record.id.to_string());
    assert_eq!(std::fs::read(dir.join("front_preview.png")).unwrap(), png);
    assert_eq!(record.complete_design_images.front, Some(format!("/output/{}/front_preview.png", record.id)));
    assert_eq!(record.complete_design_images.back, None);
    std::fs::remove_dir_all(&state.config.output_dir).unwrap();
}

#[tokio::test]
async fn invalid_submission_registers_nothing() {
    let state = test_helpers::test_app_state();
    let submission = Submission { design_json: "{}".into(), ..Submission::default() };
    assert!(submit(&state, submission).await.is_err());
    assert!(state.designs.read().await.records.is_empty());
    assert_eq!(std::fs::read_dir(&state.config.output_dir).unwrap().count(), 0);
}

#[tokio::test]
async fn failed_artifact_write_removes_output_dir() {
    let root = crate::render::test_support::temp_dir("partial");
    let id = Uuid::new_v4();
    let dir = root.join(id.to_string());
    // A directory where the preview file should go makes the last write fail.
    std::fs::create_dir_all(dir.join("back_preview.png")).unwrap();

    let png = preview_png();
    let previews = [(Side::Front, Some(png.clone())), (Side::Back, Some(png.clone()))];
    let err = store_artifacts(&dir, id, [&png, &png], previews).await.unwrap_err();
    assert_eq!(err.error_code(), "STORAGE_ERROR");
    assert!(!dir.exists());
    std::fs::remove_dir_all(&root).unwrap();
}

#[tokio::test]
async fn unwritable_output_registers_nothing() {
    let blocker = crate::render::test_support::temp_dir("blocked").join("not-a-dir");
    std::fs::write(&blocker, b"x").unwrap();
    let state = test_helpers::test_app_state_with(ServerConfig {
        output_dir: blocker.clone(),
        ..test_helpers::test_config()
    });
    let submission = Submission { design_json: design_json("pvc", "blank", "[]"), ..Submission::default() };
    assert!(matches!(submit(&state, submission).await, Err(DesignError::Storage(_))));
    assert!(state.designs.read().await.records.is_empty());
    assert!(blocker.is_file());
}

#[tokio::test]
async fn submit_normalizes_restricted_material_images() {
    let state = test_helpers::test_app_state();
    let image = canvas::element::SerializedElement {
        id: Uuid::new_v4(),
        geometry: canvas::geometry::Geometry::new(10.0, 10.0, 100.0, 60.0),
        z_index: Some(1),
        style: ElementStyle::Image(ImageStyle {
            source_ref: crate::render::test_support::png_data_uri(2, 2, [0, 0, 255, 255]),
            object_fit: ObjectFit::Cover,
            color_filter: None,
        }),
    };
    let front = serde_json::to_string(&vec![image]).unwrap();
    let submission = Submission { design_json: design_json("metal", "blank", &front), ..Submission::default() };
    let record = submit(&state, submission).await.unwrap();
    match &record.design.elements.front[0].style {
        ElementStyle::Image(s) => assert_eq!(s.color_filter, Some(ColorFilter::MetalMono)),
        other => panic!("unexpected style {other:?}"),
    }
    std::fs::remove_dir_all(&state.config.output_dir).unwrap();
}

// =============================================================================
// Queries
// =============================================================================

#[tokio::test]
async fn list_is_newest_first() {
    let state = test_helpers::test_app_state();
    let mut older = test_helpers::dummy_record();
    older.created_at_ms = 1;
    let mut newer = test_helpers::dummy_record();
    newer.created_at_ms = 2;
    {
        let mut designs = state.designs.write().await;
        designs.insert(older.clone());
        designs.insert(newer.clone());
    }
    let list = list_designs(&state).await;
    assert_eq!(list.iter().map(|s| s.id).collect::<Vec<_>>(), vec![newer.id, older.id]);
    assert_eq!(list[0].customer_email, "ada@example.com");
}

#[tokio::test]
async fn summary_serializes_camel_case() {
    let record = test_helpers::dummy_record();
    let json = serde_json::to_value(DesignSummary::from(&record)).unwrap();
    assert_eq!(json["material"], "pvc");
    assert_eq!(json["customerName"], "Ada");
    assert!(json.get("highResImages").is_some());
}

#[tokio::test]
async fn get_unknown_design_is_not_found() {
    let state = test_helpers::test_app_state();
    let id = Uuid::new_v4();
    assert!(matches!(get_design(&state, id).await, Err(DesignError::NotFound(x)) if x == id));
}

#[tokio::test]
async fn get_returns_seeded_record() {
    let state = test_helpers::test_app_state();
    let id = test_helpers::seed_design(&state).await;
    assert_eq!(get_design(&state, id).await.unwrap().id, id);
}

#[test]
fn undecodable_rows_are_skipped() {
    let row: DesignRow = (Uuid::nil(), 0, serde_json::json!("nope"), serde_json::json!({}), serde_json::json!({}));
    assert!(decode_row(row).is_none());
}

#[test]
fn stored_rows_decode() {
    let record = test_helpers::dummy_record();
    let row: DesignRow = (
        record.id,
        record.created_at_ms,
        serde_json::to_value(&record.design).unwrap(),
        serde_json::to_value(&record.high_res_images).unwrap(),
        serde_json::json!({}),
    );
    assert_eq!(decode_row(row), Some(record));
}
