use tiny_skia::{Color, Pixmap};

/// Square pixel buffer the card is painted on.
///
/// A zero size (or one too large to allocate) leaves the surface without a
/// pixmap; paint calls against it do nothing.
pub struct Surface {
    size: u32,
    pixmap: Option<Pixmap>,
}

impl Surface {
    pub fn new(size: u32) -> Self {
        Self {
            size,
            pixmap: Pixmap::new(size, size),
        }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn is_allocated(&self) -> bool {
        self.pixmap.is_some()
    }

    /// Reallocates for a new size. The contents are cleared either way.
    pub fn resize(&mut self, size: u32) {
        if size == self.size {
            self.clear();
        } else {
            *self = Self::new(size);
        }
    }

    pub fn clear(&mut self) {
        if let Some(pixmap) = self.pixmap.as_mut() {
            pixmap.fill(Color::TRANSPARENT);
        }
    }

    pub fn pixmap(&self) -> Option<&Pixmap> {
        self.pixmap.as_ref()
    }

    pub(crate) fn pixmap_mut(&mut self) -> Option<&mut Pixmap> {
        self.pixmap.as_mut()
    }

    /// Straight (non-premultiplied) RGBA at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        let color = self.pixmap.as_ref()?.pixel(x, y)?.demultiply();
        Some([color.red(), color.green(), color.blue(), color.alpha()])
    }
}
