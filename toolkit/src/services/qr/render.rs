use super::QrError;
use image::imageops::{self, FilterType};
use image::{DynamicImage, Luma, Rgba, RgbaImage};
use png::{BitDepth as PngBitDepth, ColorType as PngColorType, Encoder as PngEncoder};
use qrcode::{EcLevel, QrCode};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Side of one QR module before the final resize.
const MODULE_PX: u32 = 10;
const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Encodes `data` with error-correction level H and renders it black on
/// white (4-module quiet zone), scaled to `size` x `size`.
pub(crate) fn render_qr(data: &str, size: u32) -> Result<RgbaImage, QrError> {
    let code = QrCode::with_error_correction_level(data.as_bytes(), EcLevel::H)?;
    let modules = code
        .render::<Luma<u8>>()
        .module_dimensions(MODULE_PX, MODULE_PX)
        .quiet_zone(true)
        .build();
    let rgba = DynamicImage::ImageLuma8(modules).to_rgba8();
    Ok(imageops::resize(&rgba, size, size, FilterType::Lanczos3))
}

/// Layout of the logo overlay, derived from the QR side length.
#[derive(Debug, Clone, Copy)]
pub(crate) struct LogoStyle {
    pub max_side: u32,
    pub border_frac: f32,
    pub corner_radius: u32,
}

/// Centers a white rounded plate on `qr` and draws the rounded logo on top.
pub(crate) fn overlay_logo(qr: &mut RgbaImage, logo: &RgbaImage, style: LogoStyle) {
    let max_side = style.max_side.max(1);
    let (width, height) = fit_within(logo.width(), logo.height(), max_side, max_side);
    let mut logo = if (width, height) == logo.dimensions() {
        logo.clone()
    } else {
        imageops::resize(logo, width, height, FilterType::Lanczos3)
    };

    let border = ((width as f32 * style.border_frac) as u32).max(2);
    let plate = rounded_plate(width + 2 * border, height + 2 * border, style.corner_radius, WHITE);
    round_corners(&mut logo, style.corner_radius);

    let bx = (qr.width() as i64 - plate.width() as i64).div_euclid(2);
    let by = (qr.height() as i64 - plate.height() as i64).div_euclid(2);
    imageops::overlay(qr, &plate, bx, by);
    imageops::overlay(qr, &logo, bx + border as i64, by + border as i64);
}

/// Largest size with the same aspect ratio that fits in `max_w` x `max_h`.
/// Images that already fit are left alone; nothing is ever enlarged.
pub(crate) fn fit_within(width: u32, height: u32, max_w: u32, max_h: u32) -> (u32, u32) {
    if width <= max_w && height <= max_h {
        return (width, height);
    }
    let scale = (max_w as f64 / width as f64).min(max_h as f64 / height as f64);
    let new_w = (width as f64 * scale).round().max(1.0) as u32;
    let new_h = (height as f64 * scale).round().max(1.0) as u32;
    (new_w.min(max_w), new_h.min(max_h))
}

/// Clears every pixel outside a rounded rectangle covering the whole image.
/// Pixels inside keep their own alpha.
pub(crate) fn round_corners(img: &mut RgbaImage, radius: u32) {
    let (width, height) = img.dimensions();
    for (x, y, pixel) in img.enumerate_pixels_mut() {
        if !inside_rounded_rect(x, y, width, height, radius) {
            *pixel = TRANSPARENT;
        }
    }
}

/// Transparent image of the given size holding a filled rounded rectangle.
pub(crate) fn rounded_plate(width: u32, height: u32, radius: u32, color: Rgba<u8>) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        if inside_rounded_rect(x, y, width, height, radius) {
            color
        } else {
            TRANSPARENT
        }
    })
}

fn inside_rounded_rect(x: u32, y: u32, width: u32, height: u32, radius: u32) -> bool {
    let r = radius.min(width / 2).min(height / 2) as f32;
    if r <= 0.0 {
        return true;
    }
    // sample at the pixel center
    let (px, py) = (x as f32 + 0.5, y as f32 + 0.5);
    let (w, h) = (width as f32, height as f32);

    let cx = if px < r {
        r
    } else if px > w - r {
        w - r
    } else {
        return true;
    };
    let cy = if py < r {
        r
    } else if py > h - r {
        h - r
    } else {
        return true;
    };

    let (dx, dy) = (px - cx, py - cy);
    dx * dx + dy * dy <= r * r
}

/// Writes `image` as an 8-bit RGBA PNG, replacing any existing file.
pub(crate) fn write_png(image: &RgbaImage, path: &Path) -> Result<(), QrError> {
    let file = File::create(path)?;
    let mut encoder = PngEncoder::new(BufWriter::new(file), image.width(), image.height());
    encoder.set_color(PngColorType::Rgba);
    encoder.set_depth(PngBitDepth::Eight);
    let mut writer = encoder.write_header()?;
    writer.write_image_data(image.as_raw())?;
    writer.finish()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_qr_has_requested_size() {
        let data = "https://example.org/?event=20250106-1915&sig=abc";
        let img = render_qr(data, 800).unwrap();
        assert_eq!(img.dimensions(), (800, 800));

        // quiet zone corner stays white
        assert_eq!(img.get_pixel(2, 2), &WHITE);

        // center of the top-left finder pattern: 4 quiet modules + 3.5 modules in
        let modules = QrCode::with_error_correction_level(data.as_bytes(), EcLevel::H)
            .unwrap()
            .width() as f32
            + 8.0;
        let center = (7.5 / modules * 800.0) as u32;
        let finder = img.get_pixel(center, center);
        assert!(finder.0[0] < 128, "expected a dark finder module, got {:?}", finder);
    }

    #[test]
    fn fit_within_preserves_aspect_ratio_and_never_enlarges() {
        assert_eq!(fit_within(400, 200, 200, 200), (200, 100));
        assert_eq!(fit_within(100, 300, 200, 200), (67, 200));
        assert_eq!(fit_within(50, 40, 200, 200), (50, 40));
    }

    #[test]
    fn plate_corners_are_transparent_and_center_is_filled() {
        let plate = rounded_plate(60, 40, 18, WHITE);

        assert_eq!(plate.get_pixel(0, 0), &TRANSPARENT);
        assert_eq!(plate.get_pixel(59, 39), &TRANSPARENT);
        assert_eq!(plate.get_pixel(30, 20), &WHITE);
        // straight edge between the corner arcs
        assert_eq!(plate.get_pixel(30, 0), &WHITE);
    }

    #[test]
    fn zero_radius_keeps_square_corners() {
        let mut img = RgbaImage::from_pixel(10, 10, Rgba([10, 20, 30, 255]));
        round_corners(&mut img, 0);
        assert_eq!(img.get_pixel(0, 0), &Rgba([10, 20, 30, 255]));
    }

    #[test]
    fn overlay_logo_centers_plate_and_logo() {
        let mut qr = RgbaImage::from_pixel(200, 200, Rgba([0, 0, 0, 255]));
        let logo = RgbaImage::from_pixel(100, 100, Rgba([200, 0, 0, 255]));
        let style = LogoStyle {
            max_side: 50,
            border_frac: 0.03,
            corner_radius: 4,
        };

        overlay_logo(&mut qr, &logo, style);

        // logo shrunk to 50x50, border max(2, 1) = 2, plate 54x54 at (73, 73)
        assert_eq!(qr.get_pixel(100, 100), &Rgba([200, 0, 0, 255]));
        assert_eq!(qr.get_pixel(74, 100), &WHITE);
        assert_eq!(qr.get_pixel(72, 100), &Rgba([0, 0, 0, 255]));
        assert_eq!(qr.dimensions(), (200, 200));
    }
}
