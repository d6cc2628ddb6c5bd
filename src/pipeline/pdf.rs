//! Multi-page PDF writer: one full-bleed image per page.
//!
//! Pages are emitted in the order the images are given. Page size comes
//! from each image's pixel size at the requested DPI; the first image also
//! sets the document-wide MediaBox on the page tree.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use std::path::{Path, PathBuf};

const POINTS_PER_INCH: f32 = 72.0;
const IMAGE_NAME: &str = "Im0";

/// Converts a pixel size into PDF points at `dpi`.
pub fn page_size_points(width: u32, height: u32, dpi: f32) -> (f32, f32) {
    let scale = POINTS_PER_INCH / dpi;
    (width as f32 * scale, height as f32 * scale)
}

/// Writes `images` as a PDF at `output`. Returns the page count.
pub fn write_pdf(images: &[PathBuf], output: &Path, dpi: f32) -> Result<usize, PdfError> {
    if images.is_empty() {
        return Err(PdfError::Empty);
    }

    let start = std::time::Instant::now();
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut kids: Vec<Object> = Vec::with_capacity(images.len());
    let mut baseline: Option<(f32, f32)> = None;

    for path in images {
        let page_id = add_image_page(&mut doc, pages_id, path, dpi, &mut baseline)?;
        kids.push(page_id.into());
    }

    let (base_w, base_h) = baseline.unwrap_or((0.0, 0.0));
    let page_count = kids.len();
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => page_count as i64,
        "MediaBox" => media_box(base_w, base_h),
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    doc.save(output).map_err(|e| PdfError::Save {
        path: output.to_path_buf(),
        reason: e.to_string(),
    })?;

    log::info!(
        "Wrote {} ({} pages) in {}ms",
        output.display(),
        page_count,
        start.elapsed().as_millis()
    );
    Ok(page_count)
}

fn add_image_page(
    doc: &mut Document,
    pages_id: ObjectId,
    path: &Path,
    dpi: f32,
    baseline: &mut Option<(f32, f32)>,
) -> Result<ObjectId, PdfError> {
    let rgb = image::open(path)
        .map_err(|source| PdfError::Image {
            path: path.to_path_buf(),
            source,
        })?
        .to_rgb8();
    let (px_w, px_h) = rgb.dimensions();
    let (width, height) = page_size_points(px_w, px_h, dpi);
    baseline.get_or_insert((width, height));

    let image_dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => px_w as i64,
        "Height" => px_h as i64,
        "ColorSpace" => "DeviceRGB",
        "BitsPerComponent" => 8_i64,
    };
    let image_id = doc.add_object(Stream::new(image_dict, rgb.into_raw()));

    // Scale the unit image square to the full page.
    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    width.into(),
                    0.into(),
                    0.into(),
                    height.into(),
                    0.into(),
                    0.into(),
                ],
            ),
            Operation::new("Do", vec![Object::Name(IMAGE_NAME.as_bytes().to_vec())]),
            Operation::new("Q", vec![]),
        ],
    };
    let encoded = content.encode().map_err(|e| PdfError::Encode(e.to_string()))?;
    let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => media_box(width, height),
        "Contents" => content_id,
        "Resources" => dictionary! {
            "XObject" => dictionary! {
                IMAGE_NAME => image_id,
            },
        },
    });

    Ok(page_id)
}

fn media_box(width: f32, height: f32) -> Vec<Object> {
    vec![0.into(), 0.into(), width.into(), height.into()]
}

#[derive(Debug, thiserror::Error)]
pub enum PdfError {
    #[error("No images to assemble")]
    Empty,

    #[error("Failed to read page image {}: {source}", path.display())]
    Image {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("Failed to encode page content: {0}")]
    Encode(String),

    #[error("Failed to write PDF {}: {reason}", path.display())]
    Save { path: PathBuf, reason: String },
}
