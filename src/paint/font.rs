use anyhow::{anyhow, Context, Result};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};
use ttf_parser::Face;
use ttf_parser::name_id;
use usvg::fontdb;

use crate::card::FontWeight;
use crate::normalize::is_combining_mark;

#[derive(Clone)]
pub struct FontMetrics {
    data: Arc<Vec<u8>>,
    face_index: u32,
    units_per_em: u16,
    space_advance: u16,
    family: Option<String>,
}

impl FontMetrics {
    pub fn from_data(data: Vec<u8>, face_index: u32) -> Result<Self> {
        let face = Face::parse(&data, face_index)
            .map_err(|err| anyhow!("failed to parse font face {}: {}", face_index, err))?;
        let units_per_em = face.units_per_em().max(1);
        let space_advance = face
            .glyph_index(' ')
            .and_then(|id| face.glyph_hor_advance(id))
            .unwrap_or(units_per_em / 2);
        let family = extract_family_name(&face);
        Ok(Self {
            data: Arc::new(data),
            face_index,
            units_per_em,
            space_advance,
            family,
        })
    }

    pub fn family(&self) -> Option<&str> {
        self.family.as_deref()
    }
}

#[cfg(target_os = "macos")]
fn fallback_families() -> &'static [&'static str] {
    &["Mitr", "Thonburi", "Ayuthaya", "sans-serif"]
}

#[cfg(target_os = "windows")]
fn fallback_families() -> &'static [&'static str] {
    &["Mitr", "Leelawadee UI", "Tahoma", "sans-serif"]
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn fallback_families() -> &'static [&'static str] {
    &["Mitr", "Noto Sans Thai", "Loma", "sans-serif"]
}

/// A face picked from the database, with the family name the database knows it by.
#[derive(Clone)]
pub struct ResolvedFace {
    family: String,
    metrics: FontMetrics,
}

impl ResolvedFace {
    pub fn family(&self) -> &str {
        &self.family
    }

    pub fn metrics(&self) -> &FontMetrics {
        &self.metrics
    }
}

/// Font database shared by text rasterisation and width measurement.
pub struct FontBook {
    db: Arc<fontdb::Database>,
    faces: HashMap<(String, FontWeight), Option<ResolvedFace>>,
}

impl FontBook {
    /// No faces at all. Text is measured by estimate and not rasterised.
    pub fn empty() -> Self {
        Self::with_database(fontdb::Database::new())
    }

    pub fn system() -> Self {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();
        debug!("loaded {} system font faces", db.len());
        Self::with_database(db)
    }

    fn with_database(mut db: fontdb::Database) -> Self {
        ensure_sans_serif(&mut db);
        Self {
            db: Arc::new(db),
            faces: HashMap::new(),
        }
    }

    /// Adds a font file and returns its family name.
    pub fn load_font_file(&mut self, path: &Path) -> Result<String> {
        let data = std::fs::read(path)
            .with_context(|| format!("failed to read font: {}", path.display()))?;
        let metrics = FontMetrics::from_data(data.clone(), 0)
            .with_context(|| format!("failed to parse font: {}", path.display()))?;
        let family = metrics
            .family()
            .map(|name| name.to_string())
            .ok_or_else(|| anyhow!("font has no family name: {}", path.display()))?;
        let db = Arc::make_mut(&mut self.db);
        db.load_font_data(data);
        ensure_sans_serif(db);
        self.faces.clear();
        Ok(family)
    }

    pub fn face_count(&self) -> usize {
        self.db.len()
    }

    pub(crate) fn database(&self) -> Arc<fontdb::Database> {
        Arc::clone(&self.db)
    }

    /// Face used for `family` at `weight`, after walking the platform fallbacks.
    pub fn resolve(&mut self, family: &str, weight: FontWeight) -> Option<&ResolvedFace> {
        let key = (family.to_string(), weight);
        if !self.faces.contains_key(&key) {
            let resolved = resolve_face(&self.db, family, weight);
            match &resolved {
                Some(face) if !face.family.eq_ignore_ascii_case(family) => {
                    debug!("font '{}' resolved to '{}'", family, face.family)
                }
                None if !self.db.is_empty() => {
                    warn!("no font face found for '{}'; estimating widths", family)
                }
                _ => {}
            }
            self.faces.insert(key.clone(), resolved);
        }
        self.faces.get(&key).and_then(|face| face.as_ref())
    }

    pub fn metrics(&mut self, family: &str, weight: FontWeight) -> Option<&FontMetrics> {
        self.resolve(family, weight).map(ResolvedFace::metrics)
    }

    /// CSS `font-family` value naming the resolved face first, so the rasteriser
    /// draws with the same face the widths were measured with.
    pub fn family_list(&mut self, family: &str, weight: FontWeight) -> String {
        let resolved = self.resolve(family, weight).map(|face| face.family.clone());
        let mut names: Vec<&str> = Vec::new();
        if let Some(resolved) = resolved.as_deref() {
            names.push(resolved);
        }
        names.push(family);
        names.extend(fallback_families().iter().copied());
        css_family_list(&names)
    }

    pub fn measure(&mut self, text: &str, font_size: f32, family: &str, weight: FontWeight) -> f32 {
        measure_text_width_px(text, font_size, self.metrics(family, weight))
    }
}

/// Points the generic `sans-serif` family at a face that is actually loaded.
fn ensure_sans_serif(db: &mut fontdb::Database) {
    if db.is_empty() {
        return;
    }
    let generic = fontdb::Query {
        families: &[fontdb::Family::SansSerif],
        ..Default::default()
    };
    if db.query(&generic).is_some() {
        return;
    }
    let present = fallback_families()
        .iter()
        .copied()
        .filter(|name| !name.eq_ignore_ascii_case("sans-serif"))
        .find(|name| {
            let query = fontdb::Query {
                families: &[fontdb::Family::Name(*name)],
                ..Default::default()
            };
            db.query(&query).is_some()
        })
        .map(|name| name.to_string());
    let family = present.or_else(|| {
        db.faces()
            .find_map(|face| face.families.first().map(|(name, _)| name.clone()))
    });
    if let Some(family) = family {
        debug!("using '{}' as sans-serif", family);
        db.set_sans_serif_family(family);
    }
}

fn css_family_list(names: &[&str]) -> String {
    let mut seen: Vec<String> = Vec::new();
    let mut out: Vec<String> = Vec::new();
    for name in names {
        let name = name.trim();
        if name.is_empty() || name.eq_ignore_ascii_case("sans-serif") {
            continue;
        }
        let lowered = name.to_lowercase();
        if seen.contains(&lowered) {
            continue;
        }
        seen.push(lowered);
        out.push(format!("'{}'", name.replace('\'', "")));
    }
    out.push("sans-serif".to_string());
    out.join(", ")
}

fn resolve_face(db: &fontdb::Database, family: &str, weight: FontWeight) -> Option<ResolvedFace> {
    let mut candidates = vec![family];
    candidates.extend(
        fallback_families()
            .iter()
            .copied()
            .filter(|name| !name.eq_ignore_ascii_case(family)),
    );
    for candidate in candidates {
        let families = if candidate.eq_ignore_ascii_case("sans-serif") {
            vec![fontdb::Family::SansSerif]
        } else {
            vec![fontdb::Family::Name(candidate)]
        };
        let query = fontdb::Query {
            families: &families,
            weight: if weight.is_bold() {
                fontdb::Weight::BOLD
            } else {
                fontdb::Weight::NORMAL
            },
            style: if weight.is_italic() {
                fontdb::Style::Italic
            } else {
                fontdb::Style::Normal
            },
            ..Default::default()
        };
        let Some(id) = db.query(&query) else {
            continue;
        };
        let Some(face_family) = db
            .face(id)
            .and_then(|info| info.families.first())
            .map(|(name, _)| name.clone())
        else {
            continue;
        };
        let loaded = db.with_face_data(id, |data, index| (data.to_vec(), index));
        if let Some((data, index)) = loaded {
            match FontMetrics::from_data(data, index) {
                Ok(metrics) => {
                    return Some(ResolvedFace {
                        family: face_family,
                        metrics,
                    });
                }
                Err(err) => warn!("skipping font '{}': {:#}", candidate, err),
            }
        }
    }
    None
}

/// Horizontal advance of `text` in pixels. Linear in `font_size`.
pub fn measure_text_width_px(text: &str, font_size: f32, font: Option<&FontMetrics>) -> f32 {
    let font_size = font_size.max(0.0);
    if let Some(font) = font {
        if let Ok(face) = Face::parse(&font.data, font.face_index) {
            let mut advance = 0u32;
            for ch in text.chars() {
                if ch == '\n' {
                    continue;
                }
                if ch == ' ' {
                    advance = advance.saturating_add(font.space_advance as u32);
                    continue;
                }
                if let Some(glyph) = face.glyph_index(ch) {
                    let glyph_advance = face.glyph_hor_advance(glyph).unwrap_or(0);
                    advance = advance.saturating_add(glyph_advance as u32);
                } else if !is_combining_mark(ch) {
                    advance = advance.saturating_add(font.space_advance as u32);
                }
            }
            let units = font.units_per_em.max(1) as f32;
            return advance as f32 * (font_size / units);
        }
    }
    estimate_text_width_units(text) * font_size
}

fn estimate_char_units_for_width(ch: char) -> f32 {
    if ch == '\n' || is_combining_mark(ch) {
        0.0
    } else if ch.is_whitespace() {
        0.25
    } else if ch.is_ascii_alphanumeric() {
        0.55
    } else if ch.is_ascii() {
        0.35
    } else if matches!(ch as u32, 0x0E00..=0x0E7F) {
        0.6
    } else if matches!(
        ch as u32,
        0x4E00..=0x9FFF | 0x3040..=0x30FF | 0x31F0..=0x31FF
    ) {
        1.0
    } else {
        0.9
    }
}

fn estimate_text_width_units(text: &str) -> f32 {
    text.chars().map(estimate_char_units_for_width).sum()
}

fn extract_family_name(face: &Face<'_>) -> Option<String> {
    let mut fallback = None;
    for name in face.names() {
        if name.name_id == name_id::TYPOGRAPHIC_FAMILY {
            if let Some(value) = name.to_string() {
                return Some(value);
            }
        } else if name.name_id == name_id::FAMILY && fallback.is_none() {
            fallback = name.to_string();
        }
    }
    fallback
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimate_ignores_combining_marks() {
        let base = measure_text_width_px("ดี", 20.0, None);
        let with_mark = measure_text_width_px("ด", 20.0, None);
        assert!(base > 0.0);
        assert_eq!(base, with_mark);
    }

    #[test]
    fn estimate_is_linear_in_font_size() {
        let small = measure_text_width_px("(type)", 10.0, None);
        let large = measure_text_width_px("(type)", 30.0, None);
        assert!((large - small * 3.0).abs() < 1e-3);
    }

    #[test]
    fn negative_size_measures_zero() {
        assert_eq!(measure_text_width_px("abc", -4.0, None), 0.0);
    }

    #[test]
    fn empty_book_has_no_metrics() {
        let mut book = FontBook::empty();
        assert_eq!(book.face_count(), 0);
        assert!(book.metrics("Mitr", FontWeight::Bold).is_none());
        assert_eq!(
            book.measure("Word", 10.0, "Mitr", FontWeight::Bold),
            measure_text_width_px("Word", 10.0, None)
        );
    }

    fn fixture_book() -> FontBook {
        let mut book = FontBook::empty();
        let family = book
            .load_font_file(Path::new(concat!(
                env!("CARGO_MANIFEST_DIR"),
                "/tests/fonts/DejaVuSans.ttf"
            )))
            .expect("fixture font");
        assert_eq!(family, "DejaVu Sans");
        book
    }

    #[test]
    fn missing_family_resolves_to_a_loaded_face() {
        let mut book = fixture_book();
        let face = book.resolve("Mitr", FontWeight::Bold).expect("fallback face");
        assert_eq!(face.family(), "DejaVu Sans");
    }

    #[test]
    fn generic_sans_serif_points_at_loaded_face() {
        let book = fixture_book();
        let query = fontdb::Query {
            families: &[fontdb::Family::SansSerif],
            ..Default::default()
        };
        assert!(book.database().query(&query).is_some());
    }

    #[test]
    fn family_list_leads_with_resolved_face() {
        let mut book = fixture_book();
        let list = book.family_list("Mitr", FontWeight::Normal);
        assert!(list.starts_with("'DejaVu Sans', 'Mitr'"), "{list}");
        assert!(list.ends_with("sans-serif"));
        assert_eq!(list.matches("'Mitr'").count(), 1);
    }

    #[test]
    fn family_list_without_faces_keeps_requested_family() {
        let mut book = FontBook::empty();
        let list = book.family_list("Mitr", FontWeight::Normal);
        assert!(list.starts_with("'Mitr'"), "{list}");
        assert!(list.ends_with(", sans-serif"));
    }

    #[test]
    fn measuring_uses_the_resolved_face() {
        let mut book = fixture_book();
        let measured = book.measure("Word", 40.0, "Mitr", FontWeight::Normal);
        let estimated = measure_text_width_px("Word", 40.0, None);
        let resolved = book.metrics("Mitr", FontWeight::Normal).cloned();
        assert_eq!(measured, measure_text_width_px("Word", 40.0, resolved.as_ref()));
        assert!(measured > 0.0);
        assert_ne!(measured, estimated);
    }

    #[test]
    fn missing_font_file_is_an_error() {
        let mut book = FontBook::empty();
        let err = book
            .load_font_file(Path::new("/nonexistent/font.ttf"))
            .err()
            .expect("missing file");
        assert!(err.to_string().contains("failed to read font"));
    }
}
