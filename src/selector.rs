//! Region selection: turns a drag gesture into a validated crop rectangle.
//!
//! The gesture itself comes from whatever front-end is hosting the run;
//! this module only normalizes it and clamps it to the reference
//! screenshot the user was dragging over.

use crate::capture::CropRect;
use image::GenericImageView;
use std::path::{Path, PathBuf};

/// A drag in screen pixel coordinates, from the press point to the
/// current (or release) point. Coordinates may be negative when the
/// pointer leaves the reference image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Drag {
    anchor: (i32, i32),
    cursor: (i32, i32),
}

impl Drag {
    pub fn press(x: i32, y: i32) -> Self {
        Self {
            anchor: (x, y),
            cursor: (x, y),
        }
    }

    pub fn move_to(&mut self, x: i32, y: i32) {
        self.cursor = (x, y);
    }

    /// Replays a rectangle as a drag from its top-left to bottom-right.
    /// Coordinates past `i32::MAX` saturate.
    pub fn from_rect(rect: CropRect) -> Self {
        let coord = |v: u32| i32::try_from(v).unwrap_or(i32::MAX);
        let mut drag = Self::press(coord(rect.x), coord(rect.y));
        drag.move_to(
            coord(rect.x.saturating_add(rect.width)),
            coord(rect.y.saturating_add(rect.height)),
        );
        drag
    }

    /// Finishes the drag over an image of `bounds` pixels.
    ///
    /// The rectangle is normalized so dragging in any direction works,
    /// then clamped to the image. Zero area after clamping means no
    /// selection.
    pub fn release(self, bounds: (u32, u32)) -> Option<CropRect> {
        let (max_x, max_y) = (bounds.0 as i64, bounds.1 as i64);
        let clamp = |v: i32, max: i64| (v as i64).clamp(0, max);

        let left = clamp(self.anchor.0.min(self.cursor.0), max_x);
        let right = clamp(self.anchor.0.max(self.cursor.0), max_x);
        let top = clamp(self.anchor.1.min(self.cursor.1), max_y);
        let bottom = clamp(self.anchor.1.max(self.cursor.1), max_y);

        let rect = CropRect::new(
            left as u32,
            top as u32,
            (right - left) as u32,
            (bottom - top) as u32,
        );
        (!rect.is_empty()).then_some(rect)
    }
}

/// Front-end hook that asks the operator for a region.
///
/// `Ok(None)` covers both an explicit cancel and a zero-area release.
pub trait RegionSelector {
    fn select(&mut self) -> Result<Option<CropRect>, SelectionError>;
}

/// Runs a selection over a saved reference screenshot.
///
/// `gesture` receives the reference dimensions and returns the operator's
/// drag, or `None` when they cancelled.
pub fn select_on_reference<F>(reference: &Path, gesture: F) -> Result<Option<CropRect>, SelectionError>
where
    F: FnOnce(u32, u32) -> Option<Drag>,
{
    let image = image::open(reference).map_err(|e| SelectionError::Unreadable {
        path: reference.to_path_buf(),
        reason: e.to_string(),
    })?;

    let bounds = image.dimensions();
    log::debug!(
        "Selecting over reference {} ({}x{})",
        reference.display(),
        bounds.0,
        bounds.1
    );

    Ok(gesture(bounds.0, bounds.1).and_then(|drag| drag.release(bounds)))
}

#[derive(Debug, thiserror::Error)]
pub enum SelectionError {
    #[error("Selection failed: reference image {} is unreadable: {reason}", path.display())]
    Unreadable { path: PathBuf, reason: String },

    #[error("Selection failed: could not prepare reference screenshot: {0}")]
    Reference(String),

    #[error("Selection failed: {0}")]
    Input(String),
}
