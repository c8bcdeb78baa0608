use odyssey_toolkit::services::qr::{QrCodeConfig, QrCodeGenerator, TokenSigner};
use common::model::payload::SignedPayload;
use std::path::Path;
use tempfile::tempdir;

/// Reads the first QR symbol found in a PNG file.
fn decode_qr(path: &Path) -> String {
    let luma = image::open(path).unwrap().to_luma8();
    let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
        luma.width() as usize,
        luma.height() as usize,
        |x, y| luma.get_pixel(x as u32, y as u32).0[0],
    );
    let grids = prepared.detect_grids();
    assert_eq!(grids.len(), 1, "expected one symbol in {}", path.display());
    let (_, content) = grids[0].decode().unwrap();
    content
}

#[test]
fn generates_verifiable_attendance_qr_without_logo() {
    let dir = tempdir().unwrap();
    let config = QrCodeConfig::builder("https://example.org", "test-secret")
        .logo_path(dir.path().join("static/Odyssey_Logo.png"))
        .output_dir(dir.path())
        .build()
        .unwrap();
    let generator = QrCodeGenerator::new(config);

    let generated = generator.generate().unwrap();

    // QR_<YYYYMMDD-HHmm>.png in the output directory
    let file_name = generated.path.file_name().unwrap().to_str().unwrap();
    assert_eq!(file_name, format!("QR_{}.png", generated.event_id));
    let id = &generated.event_id;
    assert_eq!(id.len(), 13);
    assert_eq!(&id[8..9], "-");
    assert!(id.chars().filter(|c| *c != '-').all(|c| c.is_ascii_digit()));

    // square at the configured size
    let written = image::open(&generated.path).unwrap().to_rgba8();
    assert_eq!(written.dimensions(), (800, 800));

    // the symbol decodes to exactly the reported URL
    assert_eq!(decode_qr(&generated.path), generated.url);

    let prefix = format!("https://example.org/?event={id}&sig=");
    assert!(generated.url.starts_with(&prefix), "unexpected url {}", generated.url);
    let token = urlencoding::decode(&generated.url[prefix.len()..]).unwrap();

    // an independent signer with the same secret and salt accepts the token
    let payload: SignedPayload = TokenSigner::new("test-secret", "attendance-token")
        .verify(&token)
        .unwrap();
    assert_eq!(payload, generated.payload);
    assert_eq!(&payload.event_id, id);
}

#[test]
fn logo_overlay_keeps_the_code_readable() {
    let dir = tempdir().unwrap();
    let logo_path = dir.path().join("logo.png");
    image::RgbaImage::from_pixel(120, 80, image::Rgba([200, 30, 60, 255]))
        .save(&logo_path)
        .unwrap();
    let config = QrCodeConfig::builder("https://example.org/attend", "test-secret")
        .logo_path(&logo_path)
        .output_dir(dir.path())
        .build()
        .unwrap();
    let generator = QrCodeGenerator::new(config);

    let generated = generator.generate().unwrap();

    let written = image::open(&generated.path).unwrap().to_rgba8();
    assert_eq!(written.dimensions(), (800, 800));
    // the logo sits in the middle of the code
    let center = written.get_pixel(400, 400);
    assert!(center[0] > center[1] && center[0] > center[2], "no logo at center: {:?}", center);
    assert_eq!(decode_qr(&generated.path), generated.url);
}

#[test]
fn construction_fails_before_generation_with_missing_settings() {
    assert!(QrCodeConfig::new("", "test-secret").is_err());
    assert!(QrCodeConfig::new("https://example.org", "").is_err());
}
