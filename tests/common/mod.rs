//! In-memory viewer shared by the integration tests.
//!
//! `Viewer` stands in for a document window: every key press turns the
//! page, and every screenshot is a solid frame whose red channel encodes
//! the page on screen.

#![allow(dead_code)]

use image::{DynamicImage, Rgba, RgbaImage};
use lopdf::{Document, Object};
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use super_capt_lib::capture::{CaptureError, ScreenSource};
use super_capt_lib::keyboard::{KeyError, KeyInjector, PageKey};
use super_capt_lib::pipeline::PipelineOptions;

pub const SCREEN: (u32, u32) = (400, 300);

/// Red channel of the frame showing `page`.
pub fn marker(page: u32) -> u8 {
    (page * 20) as u8
}

#[derive(Clone)]
pub struct Viewer {
    page: Arc<AtomicU32>,
    presses: Arc<AtomicU32>,
}

impl Viewer {
    pub fn new() -> Self {
        Self {
            page: Arc::new(AtomicU32::new(1)),
            presses: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn presses(&self) -> u32 {
        self.presses.load(Ordering::SeqCst)
    }

    pub fn screen(&self) -> ViewerScreen {
        ViewerScreen {
            viewer: self.clone(),
            after_capture: None,
        }
    }

    pub fn keyboard(&self) -> ViewerKeys {
        ViewerKeys {
            viewer: self.clone(),
        }
    }
}

type Hook = Box<dyn FnMut(u32) + Send>;

pub struct ViewerScreen {
    viewer: Viewer,
    after_capture: Option<Hook>,
}

impl ViewerScreen {
    /// Runs `hook` with the page number after each screenshot.
    pub fn after_capture(mut self, hook: impl FnMut(u32) + Send + 'static) -> Self {
        self.after_capture = Some(Box::new(hook));
        self
    }
}

impl ScreenSource for ViewerScreen {
    fn capture(&mut self) -> Result<DynamicImage, CaptureError> {
        let page = self.viewer.page.load(Ordering::SeqCst);
        let frame = RgbaImage::from_pixel(SCREEN.0, SCREEN.1, Rgba([marker(page), 10, 200, 255]));
        if let Some(hook) = self.after_capture.as_mut() {
            hook(page);
        }
        Ok(DynamicImage::ImageRgba8(frame))
    }
}

pub struct ViewerKeys {
    viewer: Viewer,
}

impl KeyInjector for ViewerKeys {
    fn press(&mut self, _key: PageKey) -> Result<(), KeyError> {
        self.viewer.presses.fetch_add(1, Ordering::SeqCst);
        self.viewer.page.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub fn quick_options() -> PipelineOptions {
    PipelineOptions {
        countdown: Duration::ZERO,
        settle_delay: Duration::from_millis(10),
        pause_poll: Duration::from_millis(5),
        dpi: 72.0,
    }
}

/// File names in `dir`, sorted.
pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// Red channel of the first pixel of every PDF page, in page order.
pub fn pdf_page_markers(doc: &Document) -> Vec<u8> {
    doc.get_pages()
        .values()
        .map(|&page_id| {
            let page = doc.get_dictionary(page_id).unwrap();
            let resources = page.get(b"Resources").unwrap().as_dict().unwrap();
            let xobjects = resources.get(b"XObject").unwrap().as_dict().unwrap();
            let image_id = xobjects.get(b"Im0").unwrap().as_reference().unwrap();
            let stream = doc.get_object(image_id).unwrap().as_stream().unwrap();
            let bytes = if stream.dict.has(b"Filter") {
                stream.decompressed_content().unwrap()
            } else {
                stream.content.clone()
            };
            bytes[0]
        })
        .collect()
}

/// `[width, height]` of a page's MediaBox in points.
pub fn pdf_page_size(doc: &Document, page_number: u32) -> (f32, f32) {
    let page_id = doc.get_pages()[&page_number];
    let media_box: Vec<f32> = doc
        .get_dictionary(page_id)
        .unwrap()
        .get(b"MediaBox")
        .unwrap()
        .as_array()
        .unwrap()
        .iter()
        .map(|o| match o {
            Object::Integer(i) => *i as f32,
            Object::Real(r) => *r as f32,
            other => panic!("unexpected MediaBox entry {:?}", other),
        })
        .collect();
    (media_box[2], media_box[3])
}
