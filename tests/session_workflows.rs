//! End-to-end edit session workflows
//!
//! These tests drive an `EditSession` the way a frontend would: open a file,
//! click through a viewport, preview, delete, and save.

use bgtouch::{
    error::{Result, TouchupError},
    DisplayPoint, EditOutcome, EditSession, EditorConfig, Frame, ImageIOService, ImagePoint,
    InputEvent, Presenter, SessionState, Viewport,
};
use image::{ImageFormat, Rgb, RgbImage};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

const WHITE: [u8; 3] = [255, 255, 255];
const RACK: [u8; 3] = [90, 60, 40];
const SUBJECT: [u8; 3] = [20, 120, 200];

/// Records, per presented frame, whether it was a preview
#[derive(Clone, Default)]
struct FrameLog {
    frames: Arc<Mutex<Vec<bool>>>,
}

impl Presenter for FrameLog {
    fn present(&mut self, frame: Frame<'_>) {
        self.frames.lock().unwrap().push(frame.is_preview());
    }
}

/// A white background with a "rack" bar along the bottom and a subject in the middle
fn cutout_image() -> RgbImage {
    RgbImage::from_fn(20, 10, |x, y| {
        if y >= 8 {
            Rgb(RACK)
        } else if (6..14).contains(&x) && (2..6).contains(&y) {
            Rgb(SUBJECT)
        } else {
            Rgb(WHITE)
        }
    })
}

fn write_fixture(dir: &TempDir, name: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    cutout_image().save(&path).unwrap();
    path
}

#[test]
fn test_open_erase_and_save_in_place() -> Result<()> {
    let dir = TempDir::new()?;
    let path = write_fixture(&dir, "product.png");

    let mut session = EditSession::new(EditorConfig::default())?;
    session.open(&path)?;
    assert_eq!(session.source_path(), Some(path.as_path()));
    assert_eq!(session.source_format(), Some(ImageFormat::Png));

    let outcome = session.select_at(ImagePoint::new(0, 9))?;
    assert_eq!(
        outcome,
        EditOutcome::Selected {
            seed: ImagePoint::new(0, 9),
            pixel_count: 40
        }
    );
    assert_eq!(session.delete_selection()?, EditOutcome::Deleted { pixel_count: 40 });
    session.save(&path)?;

    let saved = image::open(&path)?.to_rgb8();
    for x in 0..20 {
        assert_eq!(saved.get_pixel(x, 9).0, WHITE);
    }
    assert_eq!(saved.get_pixel(10, 3).0, SUBJECT);
    Ok(())
}

#[test]
fn test_open_missing_file_keeps_previous_image() -> Result<()> {
    let dir = TempDir::new()?;
    let path = write_fixture(&dir, "first.png");

    let mut session = EditSession::new(EditorConfig::default())?;
    session.open(&path)?;
    session.select_at(ImagePoint::new(10, 3))?;

    let missing = dir.path().join("missing.png");
    assert!(matches!(session.open(&missing), Err(TouchupError::Io(_))));
    assert_eq!(session.source_path(), Some(path.as_path()));
    assert_eq!(session.state(), SessionState::Selected);
    Ok(())
}

#[test]
fn test_open_undecodable_file_fails() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("garbage.jpg");
    std::fs::write(&path, b"not an image at all")?;

    let mut session = EditSession::new(EditorConfig::default())?;
    assert!(session.open(&path).is_err());
    assert!(!session.has_image());
    Ok(())
}

#[test]
fn test_viewport_clicks_drive_the_state_machine() -> Result<()> {
    let log = FrameLog::default();
    let frames = Arc::clone(&log.frames);

    let mut session = EditSession::with_presenter(EditorConfig::default(), Box::new(log))?;
    session.load_image(cutout_image());

    // A 10x7 widget shows the 20x10 image at half size
    let display = Viewport::new(10, 7).fitted((20, 10));
    assert_eq!(display, Viewport::new(10, 5));

    let outcome = session.handle_event(InputEvent::PointerPress(DisplayPoint::new(5.2, 1.6)), &display)?;
    assert!(matches!(outcome, EditOutcome::Selected { pixel_count: 32, .. }));

    let outcome = session.handle_event(InputEvent::PointerPress(DisplayPoint::new(10.0, 1.0)), &display)?;
    assert!(outcome.is_soft_failure());
    assert_eq!(session.state(), SessionState::Selected);

    assert_eq!(
        session.handle_event(InputEvent::DeleteSelection, &display)?,
        EditOutcome::Deleted { pixel_count: 32 }
    );

    let image = session.image().unwrap();
    assert_eq!(image.get_pixel(10, 3).0, WHITE);
    assert_eq!(image.get_pixel(10, 9).0, RACK);

    // load, select, delete; the out-of-bounds click draws nothing
    assert_eq!(*frames.lock().unwrap(), vec![false, true, false]);
    Ok(())
}

#[test]
fn test_deselect_then_reselect_is_stable() -> Result<()> {
    let mut session = EditSession::new(EditorConfig::default())?;
    session.load_image(cutout_image());
    let before = session.image().cloned();

    let first = session.select_at(ImagePoint::new(10, 3))?;
    let first_mask = session.selection().cloned();
    session.deselect()?;
    assert_eq!(session.image().cloned(), before);

    let second = session.select_at(ImagePoint::new(10, 3))?;
    assert_eq!(first, second);
    assert_eq!(session.selection().cloned(), first_mask);

    // Selections never touch pixels
    assert_eq!(session.into_image(), before);
    Ok(())
}

#[test]
fn test_white_background_selection_stops_at_subject() -> Result<()> {
    let mut session = EditSession::new(EditorConfig::default())?;
    session.load_image(cutout_image());

    // 200 pixels minus the rack bar (40) and the subject (32)
    let outcome = session.select_at(ImagePoint::new(0, 0))?;
    assert_eq!(
        outcome,
        EditOutcome::Selected {
            seed: ImagePoint::new(0, 0),
            pixel_count: 128
        }
    );

    let mask = session.selection().unwrap();
    assert!(!mask.contains(10, 3));
    assert!(!mask.contains(0, 9));
    Ok(())
}

#[test]
fn test_save_without_extension_keeps_source_format() -> Result<()> {
    let dir = TempDir::new()?;
    let path = write_fixture(&dir, "source.png");

    let mut session = EditSession::new(EditorConfig::default())?;
    session.open(&path)?;

    let target = dir.path().join("edited");
    assert_eq!(session.save(&target)?, ImageFormat::Png);
    assert_eq!(ImageIOService::load_image(&target)?.to_rgb8(), cutout_image());
    Ok(())
}

#[tokio::test]
async fn test_async_selection_matches_sync() -> Result<()> {
    let mut session = EditSession::new(EditorConfig::default())?;
    session.load_image(cutout_image());

    let outcome = session.select_at_async(ImagePoint::new(3, 9)).await?;
    assert_eq!(
        outcome,
        EditOutcome::Selected {
            seed: ImagePoint::new(3, 9),
            pixel_count: 40
        }
    );
    assert_eq!(session.state(), SessionState::Selected);
    Ok(())
}

#[tokio::test]
async fn test_background_jobs_apply_last_request_only() -> Result<()> {
    let mut session = EditSession::new(EditorConfig::default())?;
    session.load_image(cutout_image());

    let older = session.begin_selection(ImagePoint::new(0, 9))?;
    let newer = session.begin_selection(ImagePoint::new(10, 3))?;

    let older = tokio::task::spawn_blocking(move || older.run());
    let newer = tokio::task::spawn_blocking(move || newer.run());
    let (older, newer) = (older.await.unwrap(), newer.await.unwrap());

    // Arrival order does not matter
    assert!(matches!(session.finish_selection(older)?, EditOutcome::Superseded { .. }));
    assert!(matches!(
        session.finish_selection(newer)?,
        EditOutcome::Selected { pixel_count: 32, .. }
    ));
    Ok(())
}
