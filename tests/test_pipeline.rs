mod common;

use std::path::Path;
use std::sync::Arc;

use common::*;
use labelcheck::build_standard_pipeline;
use labelcheck::detection::ocr::OcrMode;

fn processor_with(ocr: FakeOcr, barcode: FakeBarcode) -> LabelProcessor {
    let services = fake_services(Arc::new(ocr), Arc::new(barcode));
    LabelProcessor::new(&LabelConfig::default(), &services)
}

#[test]
fn test_end_to_end_report() -> anyhow::Result<()> {
    let file = save_temp_png(&upright_label_image());
    let (processor, ocr) = passing_processor();

    let report = processor.process_label(file.path())?;
    assert_eq!(report.barcode, GOOD_BARCODE);
    assert_eq!(report.barcode.len(), 13);
    assert_eq!(report.price, GOOD_PRICE);
    assert_eq!(report.currency, "EUR");
    assert_eq!(report.to_string(), "Code:\t2301703X5045Y\nPrice:\t50.45 EUR");

    // Name zone first, then price zone, each a crop of the aligned label
    let calls = ocr.calls();
    assert_eq!(calls.len(), 2);
    assert!(matches!(&calls[0].0, OcrMode::Text { language } if language == "spa"));
    assert!(matches!(&calls[1].0, OcrMode::Price { currency } if currency == "EUR"));
    let (_, name_w, name_h) = calls[0];
    assert!((180..=200).contains(&name_w) && (30..=40).contains(&name_h));
    let (_, price_w, price_h) = calls[1];
    assert!((80..=90).contains(&price_w) && (22..=30).contains(&price_h));
    Ok(())
}

#[test]
fn test_report_pads_short_price() {
    let report = LabelReport {
        barcode: "2301703012504".to_string(),
        price: "1.25".to_string(),
        currency: "EUR".to_string(),
    };
    assert_eq!(report.to_string(), "Code:\t2301703012504\nPrice:\t 1.25 EUR");
}

#[test]
fn test_standard_stage_order() {
    let (processor, _) = passing_processor();
    assert_eq!(
        processor.pipeline().stages(),
        vec![
            Stage::Localize,
            Stage::ExtractGreenChannel,
            Stage::Align,
            Stage::ValidateName,
            Stage::ReadBarcode,
            Stage::ReadPrice,
            Stage::ValidateProduct,
            Stage::ValidatePrice,
        ]
    );
}

#[test]
fn test_name_mismatch() {
    let file = save_temp_png(&upright_label_image());
    let processor = processor_with(FakeOcr::new("Ternera", GOOD_PRICE), FakeBarcode::new(GOOD_BARCODE));

    let err = processor.process_label(file.path()).unwrap_err();
    assert_eq!(err.stage, Stage::ValidateName);
    assert_eq!(err.to_string(), "validate_name failed");
    assert_eq!(err.source.to_string(), "\"Cerdo\" not found");
    assert_eq!(err.source.category(), ErrorCategory::Stage);
}

#[test]
fn test_error_chain_names_each_cause_once() {
    let file = save_temp_png(&upright_label_image());
    let processor = processor_with(FakeOcr::new("Cerdo", "12.00"), FakeBarcode::new(GOOD_BARCODE));

    let err = processor.process_label(file.path()).unwrap_err();
    let chain: Vec<String> = anyhow::Error::from(err).chain().map(|e| e.to_string()).collect();
    assert_eq!(chain.len(), 2);
    assert_eq!(chain[0], "validate_price failed");
    assert!(chain[1].starts_with("price doesn't match"), "{}", chain[1]);

    let io = LabelError::from(std::io::Error::other("disk full"));
    assert_eq!(io.to_string(), "i/o error");
    assert_eq!(
        std::error::Error::source(&io).map(|e| e.to_string()).as_deref(),
        Some("disk full")
    );
}

#[test]
fn test_barcode_not_found() {
    let file = save_temp_png(&upright_label_image());
    let processor = processor_with(FakeOcr::new("Cerdo", GOOD_PRICE), FakeBarcode::unreadable());

    let err = processor.process_label(file.path()).unwrap_err();
    assert_eq!(err.stage, Stage::ReadBarcode);
    assert!(matches!(
        err.source,
        LabelError::BarcodeNotFound(ServiceError::NoSymbol(_))
    ));
}

#[test]
fn test_price_not_found() {
    let file = save_temp_png(&upright_label_image());
    let processor = processor_with(FakeOcr::failing_price("Cerdo"), FakeBarcode::new(GOOD_BARCODE));

    let err = processor.process_label(file.path()).unwrap_err();
    assert_eq!(err.stage, Stage::ReadPrice);
    assert!(matches!(err.source, LabelError::PriceNotFound(_)));
}

#[test]
fn test_product_mismatch() {
    let file = save_temp_png(&upright_label_image());
    let processor = processor_with(FakeOcr::new("Cerdo", GOOD_PRICE), FakeBarcode::new("2401703X5045Y"));

    let err = processor.process_label(file.path()).unwrap_err();
    assert_eq!(err.stage, Stage::ValidateProduct);
    assert_eq!(err.source.category(), ErrorCategory::Validation);
}

#[test]
fn test_price_mismatch() {
    let file = save_temp_png(&upright_label_image());
    let processor = processor_with(FakeOcr::new("Cerdo", "12.00"), FakeBarcode::new(GOOD_BARCODE));

    let err = processor.process_label(file.path()).unwrap_err();
    assert_eq!(err.stage, Stage::ValidatePrice);
    match err.source {
        LabelError::PriceMismatch { read, expected } => {
            assert_eq!(read, "12.00");
            assert_eq!(expected.as_deref(), Some("50.45"));
        }
        other => panic!("expected price mismatch, got {:?}", other),
    }
}

#[test]
fn test_missing_file_fails_at_load() {
    let (processor, _) = passing_processor();
    let err = processor
        .process_label(Path::new("/nonexistent/label.png"))
        .unwrap_err();
    assert_eq!(err.stage, Stage::Load);
    assert!(matches!(err.source, LabelError::Io(_)));
}

#[test]
fn test_undecodable_file_fails_at_load() -> anyhow::Result<()> {
    let file = tempfile::Builder::new().suffix(".png").tempfile()?;
    std::fs::write(file.path(), b"not an image")?;

    let (processor, _) = passing_processor();
    let err = processor.process_label(file.path()).unwrap_err();
    assert_eq!(err.stage, Stage::Load);
    Ok(())
}

#[test]
fn test_no_label_stops_before_services() {
    let file = save_temp_png(&empty_image());
    let (processor, ocr) = passing_processor();

    let err = processor.process_label(file.path()).unwrap_err();
    assert_eq!(err.stage, Stage::Localize);
    assert!(ocr.calls().is_empty());
}

#[test]
fn test_custom_config_flows_through() -> anyhow::Result<()> {
    let file = save_temp_png(&upright_label_image());
    let config = LabelConfig::from_json(
        r#"{ "expected_name": "Pollo", "product_code": "2401703", "currency": "USD" }"#,
    )?;
    let ocr = Arc::new(FakeOcr::new("Pollo entero", GOOD_PRICE));
    let services = fake_services(ocr, Arc::new(FakeBarcode::new("2401703X5045Y")));

    let report = build_standard_pipeline(&config, &services).run(file.path())?;
    assert_eq!(report.to_string(), "Code:\t2401703X5045Y\nPrice:\t50.45 USD");
    Ok(())
}

#[test]
fn test_run_partial_stops_early() -> anyhow::Result<()> {
    let file = save_temp_png(&upright_label_image());
    let (processor, ocr) = passing_processor();

    let data = processor.pipeline().run_partial(file.path(), 3)?;
    assert!(data.pose.is_set());
    assert!(data.barcode.is_none());
    assert!(matches!(data.report(), Err(LabelError::MissingArtifact(_))));
    assert!(ocr.calls().is_empty());
    assert!(format!("{:?}", data).starts_with("LabelData"));
    Ok(())
}

#[test]
fn test_debug_output() -> anyhow::Result<()> {
    let file = save_temp_png(&upright_label_image());
    let dir = tempfile::TempDir::new()?;
    let debug_dir = dir.path().join("debug");

    let (processor, _) = passing_processor();
    let processor = processor.with_debug(debug_dir.clone())?;
    processor.process_label(file.path())?;

    assert!(debug_dir.join("00_load/source.png").is_file());
    assert!(debug_dir.join("01_localize/source.png").is_file());
    assert!(!debug_dir.join("02_extract_green_channel/aligned.png").exists());
    assert!(debug_dir.join("03_align/aligned.png").is_file());
    assert!(debug_dir.join("08_validate_price/aligned.png").is_file());
    Ok(())
}

#[test]
fn test_debug_dir_must_be_empty() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    std::fs::write(dir.path().join("leftover.txt"), "x")?;

    assert!(Pipeline::new().with_debug(dir.path().to_path_buf()).is_err());
    Ok(())
}
