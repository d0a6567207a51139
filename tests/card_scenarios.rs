use std::io::Cursor;

use word_card::{
    CardRenderer, CardSpec, ExportFormat, FontBook, LoadOutcome, MemoryTemplates, RenderState,
    RgbColor, RunRole, TemplateLoader, Theme, Update, resolve_color,
};

const LIGHT_BG: [u8; 4] = [248, 240, 222, 255];
const DARK_BG: [u8; 4] = [28, 26, 24, 255];

fn solid_png(color: [u8; 4]) -> Vec<u8> {
    let image = image::RgbaImage::from_pixel(8, 8, image::Rgba(color));
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgba8(image)
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .expect("encode png");
    bytes
}

fn renderer() -> CardRenderer {
    let templates = MemoryTemplates::new()
        .with(Theme::Light, solid_png(LIGHT_BG))
        .with(Theme::Dark, solid_png(DARK_BG));
    CardRenderer::new(500, TemplateLoader::new(templates), FontBook::empty())
}

fn fixture_renderer() -> CardRenderer {
    let templates = MemoryTemplates::new()
        .with(Theme::Light, solid_png(LIGHT_BG))
        .with(Theme::Dark, solid_png(DARK_BG));
    let mut fonts = FontBook::empty();
    fonts
        .load_font_file(std::path::Path::new(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/tests/fonts/DejaVuSans.ttf"
        )))
        .expect("fixture font");
    CardRenderer::new(500, TemplateLoader::new(templates), fonts)
}

/// True when some pixel in the box is within `tolerance` of `color` on every channel.
fn has_ink(
    renderer: &CardRenderer,
    xs: std::ops::Range<u32>,
    ys: std::ops::Range<u32>,
    color: RgbColor,
    tolerance: u8,
) -> bool {
    xs.flat_map(|x| ys.clone().map(move |y| (x, y)))
        .filter_map(|(x, y)| renderer.surface().pixel(x, y))
        .any(|[r, g, b, _]| {
            r.abs_diff(color.r) <= tolerance
                && g.abs_diff(color.g) <= tolerance
                && b.abs_diff(color.b) <= tolerance
        })
}

fn scenario_a() -> CardSpec {
    CardSpec {
        size: 500,
        word: "แมว".to_string(),
        word_type: "น.".to_string(),
        meaning: "สัตว์เลี้ยงลูกด้วยนม".to_string(),
        theme: Theme::Light,
        font_family: "Mitr".to_string(),
        author: None,
    }
}

fn close(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-3
}

fn assert_background(renderer: &CardRenderer, expected: [u8; 4]) {
    let pixel = renderer.surface().pixel(2, 2).expect("pixel");
    let matches = pixel
        .iter()
        .zip(expected.iter())
        .all(|(a, e)| a.abs_diff(*e) <= 2);
    assert!(matches, "expected {:?}, got {:?}", expected, pixel);
}

#[tokio::test]
async fn word_type_and_meaning_share_a_baseline() {
    let mut renderer = renderer();
    let state = renderer.render(scenario_a()).await;
    assert_eq!(state, &RenderState::Ready { theme: Theme::Light });
    assert_background(&renderer, LIGHT_BG);

    let frame = renderer.last_frame().expect("frame");
    assert_eq!(frame.color, RgbColor::new(122, 87, 29));

    let word = frame.run(RunRole::Word).expect("word");
    assert_eq!(word.style.text, "แมว");
    assert_eq!(word.style.color, resolve_color(Theme::Light));
    assert!(close(word.painted.lines[0].x, 45.0));
    assert!(close(word.painted.lines[0].y, 250.0));

    let word_type = frame.run(RunRole::Type).expect("type");
    assert_eq!(word_type.style.text, "(น.)");
    let type_width = word_type.painted.width.expect("type measured");
    assert!(type_width > 0.0);

    let meaning = frame.run(RunRole::Meaning).expect("meaning");
    assert_eq!(meaning.painted.lines.len(), 1);
    assert!(close(meaning.painted.lines[0].x, 50.0 + type_width));
    assert!(close(meaning.painted.lines[0].y, word_type.painted.lines[0].y));
    assert!(close(meaning.painted.lines[0].y, 268.0));

    assert!(frame.run(RunRole::Author).is_none());
}

#[tokio::test]
async fn empty_fields_render_placeholders() {
    let mut renderer = renderer();
    let mut spec = scenario_a();
    spec.word.clear();
    spec.word_type.clear();
    spec.meaning.clear();
    renderer.render(spec).await;

    let frame = renderer.last_frame().expect("frame");
    let texts: Vec<&str> = frame.runs.iter().map(|run| run.style.text.as_str()).collect();
    assert_eq!(texts, vec!["Word", "(type)", "put your meaning here"]);
}

#[tokio::test]
async fn author_credit_is_painted_small_at_the_footer() {
    let mut renderer = renderer();
    let mut spec = scenario_a();
    spec.author = Some("สมชาย".to_string());
    renderer.render(spec).await;

    let frame = renderer.last_frame().expect("frame");
    let meaning = frame.run(RunRole::Meaning).expect("meaning");
    let author = frame.run(RunRole::Author).expect("author");
    assert_eq!(author.style.text, "by สมชาย");
    assert!(close(author.style.font_size, meaning.style.font_size * 0.7));
    assert!(close(author.painted.lines[0].x, 302.5));
    assert!(close(author.painted.lines[0].y, 452.5));
}

#[tokio::test]
async fn wrapped_meaning_returns_to_the_margin() {
    let mut renderer = renderer();
    let mut spec = scenario_a();
    spec.meaning = "บรรทัดแรก\nบรรทัดสอง".to_string();
    renderer.render(spec).await;

    let frame = renderer.last_frame().expect("frame");
    let type_width = frame
        .run(RunRole::Type)
        .and_then(|run| run.painted.width)
        .expect("type width");
    let lines = &frame.run(RunRole::Meaning).expect("meaning").painted.lines;
    assert_eq!(lines.len(), 2);
    assert!(close(lines[0].x, 50.0 + type_width));
    assert!(close(lines[1].x, 50.0));
    assert!(close(lines[1].y - lines[0].y, 20.0 + 15.0));
}

#[tokio::test]
async fn theme_switch_mid_load_ignores_the_late_light_template() {
    let mut renderer = renderer();
    let Update::Load(light) = renderer.update(scenario_a()) else {
        panic!("first update must load a template");
    };
    let mut dark_spec = scenario_a();
    dark_spec.theme = Theme::Dark;
    let Update::Load(dark) = renderer.update(dark_spec) else {
        panic!("theme switch must load a template");
    };

    let dark_done = dark.resolve().await;
    assert_eq!(renderer.complete(dark_done), LoadOutcome::Applied);
    assert_background(&renderer, DARK_BG);

    let light_done = light.resolve().await;
    assert_eq!(renderer.complete(light_done), LoadOutcome::Stale);
    assert_background(&renderer, DARK_BG);
    assert_eq!(renderer.state(), &RenderState::Ready { theme: Theme::Dark });
    let frame = renderer.last_frame().expect("frame");
    assert_eq!(frame.theme, Theme::Dark);
    assert_eq!(frame.color, RgbColor::new(255, 189, 89));
}

#[tokio::test]
async fn exported_png_carries_the_painted_background() {
    let mut renderer = renderer();
    renderer.render(scenario_a()).await;
    let exported = renderer.export(ExportFormat::Png).expect("export");
    let decoded = image::load_from_memory(&exported.bytes)
        .expect("decode")
        .to_rgba8();
    assert_eq!(decoded.dimensions(), (500, 500));
    let pixel = decoded.get_pixel(2, 2).0;
    assert!(pixel.iter().zip(LIGHT_BG.iter()).all(|(a, e)| a.abs_diff(*e) <= 2));
}

#[tokio::test]
async fn shipped_templates_render_both_themes() {
    let mut renderer = CardRenderer::new(200, TemplateLoader::embedded(), FontBook::empty());
    let mut spec = scenario_a();
    spec.size = 200;
    assert_eq!(
        renderer.render(spec.clone()).await,
        &RenderState::Ready { theme: Theme::Light }
    );
    spec.theme = Theme::Dark;
    assert_eq!(
        renderer.render(spec).await,
        &RenderState::Ready { theme: Theme::Dark }
    );
    assert!(renderer.is_cached(Theme::Light) && renderer.is_cached(Theme::Dark));
}

#[tokio::test]
async fn default_family_draws_glyphs_in_the_theme_color() {
    let mut renderer = fixture_renderer();
    for theme in [Theme::Light, Theme::Dark] {
        let spec = CardSpec {
            size: 500,
            word: "Cat".to_string(),
            word_type: "n.".to_string(),
            meaning: "a small pet".to_string(),
            theme,
            font_family: "Mitr".to_string(),
            author: None,
        };
        let state = renderer.render(spec).await;
        assert_eq!(state, &RenderState::Ready { theme });
        let color = resolve_color(theme);

        // word: bottom-anchored at (45, 250), 50px
        assert!(has_ink(&renderer, 40..200, 195..252, color, 3), "no word ink for {theme}");

        let frame = renderer.last_frame().expect("frame");
        let type_width = frame
            .run(RunRole::Type)
            .and_then(|run| run.painted.width)
            .expect("type measured");
        let meaning_x = (50.0 + type_width).ceil() as u32;
        // meaning: continues the type baseline at 268, 20px
        assert!(
            has_ink(&renderer, meaning_x..meaning_x + 120, 248..270, color, 40),
            "no meaning ink for {theme}"
        );
        assert!(!has_ink(&renderer, 300..500, 0..190, color, 40));
    }
}
