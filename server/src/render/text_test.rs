use super::*;
use crate::render::test_support::temp_dir;

fn blank() -> Pixmap {
    let mut pixmap = Pixmap::new(40, 20).unwrap();
    pixmap.fill(Color::WHITE);
    pixmap
}

#[test]
fn missing_font_directory_yields_no_face() {
    let fonts = FontBook::new(PathBuf::from("/nonexistent/fonts"));
    assert!(fonts.face("Arial", false, false).is_none());
}

#[test]
fn invalid_font_file_is_cached_as_missing() {
    let dir = temp_dir("fonts");
    std::fs::write(dir.join("Arial-Bold.ttf"), b"not a font").unwrap();
    let fonts = FontBook::new(dir.clone());
    assert!(fonts.face("Arial", true, false).is_none());
    assert!(fonts.cache.lock().unwrap().contains_key("Arial-Bold.ttf"));
    assert!(fonts.cache.lock().unwrap().contains_key(DEFAULT_FONT_FILE));
    std::fs::remove_dir_all(dir).unwrap();
}

#[test]
fn family_spaces_are_dropped_from_file_names() {
    let fonts = FontBook::new(PathBuf::from("/nonexistent/fonts"));
    assert!(fonts.face("Times New Roman", false, true).is_none());
    let cache = fonts.cache.lock().unwrap();
    assert!(cache.contains_key("TimesNewRoman-Italic.ttf"));
    assert!(cache.contains_key("TimesNewRoman-Regular.ttf"));
}

#[test]
fn text_without_font_draws_nothing() {
    let fonts = FontBook::new(PathBuf::from("/nonexistent/fonts"));
    let mut pixmap = blank();
    let style = TextStyle { underline: true, ..TextStyle::default() };
    let p = Placement { x: 0.0, y: 0.0, width: 40.0, height: 20.0, rotation_deg: 0.0 };
    draw(&mut pixmap, &fonts, &style, &p, &ScaleTransform::IDENTITY, Transform::identity());
    assert!(pixmap.pixels().iter().all(|c| c.demultiply() == ColorU8::from_rgba(255, 255, 255, 255)));
}

#[test]
fn label_reports_missing_font() {
    let fonts = FontBook::new(PathBuf::from("/nonexistent/fonts"));
    let mut pixmap = blank();
    assert!(!draw_label(&mut pixmap, &fonts, "QR", 8.0, (20.0, 10.0), Transform::identity()));
}
