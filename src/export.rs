use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use std::io::Cursor;

use crate::error::CardError;
use crate::paint::Surface;

pub const PNG_MIME: &str = "image/png";
pub const OCTET_STREAM_MIME: &str = "image/octet-stream";

/// `Png` for display, `OctetStream` for a forced download. Both carry PNG bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Png,
    OctetStream,
}

impl ExportFormat {
    pub fn mime(&self) -> &'static str {
        match self {
            ExportFormat::Png => PNG_MIME,
            ExportFormat::OctetStream => OCTET_STREAM_MIME,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExportedImage {
    pub mime: &'static str,
    pub bytes: Vec<u8>,
}

impl ExportedImage {
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime, BASE64.encode(&self.bytes))
    }
}

/// Encodes whatever the surface currently holds.
pub fn export_surface(surface: &Surface, format: ExportFormat) -> Result<ExportedImage, CardError> {
    let pixmap = surface.pixmap().ok_or(CardError::SurfaceUnavailable)?;
    let mut rgba = Vec::with_capacity(pixmap.data().len());
    for pixel in pixmap.pixels() {
        let color = pixel.demultiply();
        rgba.extend_from_slice(&[color.red(), color.green(), color.blue(), color.alpha()]);
    }
    let image = image::RgbaImage::from_raw(pixmap.width(), pixmap.height(), rgba)
        .ok_or_else(|| CardError::Encode("pixel buffer does not match surface size".to_string()))?;
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgba8(image)
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .map_err(|err| CardError::Encode(err.to_string()))?;
    Ok(ExportedImage {
        mime: format.mime(),
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_surface_exports_transparent_png() {
        let surface = Surface::new(12);
        let exported = export_surface(&surface, ExportFormat::Png).expect("export");
        assert_eq!(exported.mime, "image/png");
        let decoded = image::load_from_memory(&exported.bytes)
            .expect("decode")
            .to_rgba8();
        assert_eq!(decoded.dimensions(), (12, 12));
        assert!(decoded.pixels().all(|pixel| pixel.0[3] == 0));
    }

    #[test]
    fn octet_stream_only_changes_mime() {
        let surface = Surface::new(3);
        let png = export_surface(&surface, ExportFormat::Png).expect("png");
        let download = export_surface(&surface, ExportFormat::OctetStream).expect("download");
        assert_eq!(download.mime, "image/octet-stream");
        assert_eq!(png.bytes, download.bytes);
        assert!(download.to_data_url().starts_with("data:image/octet-stream;base64,iVBORw0KGgo"));
    }

    #[test]
    fn unallocated_surface_cannot_export() {
        let err = export_surface(&Surface::new(0), ExportFormat::Png)
            .err()
            .expect("no surface");
        assert_eq!(err, CardError::SurfaceUnavailable);
    }
}
