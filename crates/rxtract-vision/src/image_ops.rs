//! Local image operations around the inference calls: decode, crop, annotate.

use std::io::Cursor;

use bytes::Bytes;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use rxtract_core::{BoundingBox, Crop, Region};

use crate::{Error, Result};

/// Outline color for annotated boxes.
const BOX_COLOR: Rgb<u8> = Rgb([220, 38, 38]);

/// Outline thickness in pixels.
const BOX_THICKNESS: u32 = 2;

/// Decodes an uploaded payload into an image.
///
/// Failures here are the 415 case: the payload is not an image the pipeline
/// can work with.
pub fn decode_image(data: &[u8]) -> Result<DynamicImage> {
    image::load_from_memory(data).map_err(|e| Error::invalid_image(e.to_string()))
}

/// Encodes an image as PNG.
pub fn encode_png(image: &DynamicImage) -> Result<Bytes> {
    let mut buf = Vec::new();
    image.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
    Ok(Bytes::from(buf))
}

/// Cuts one crop per box, preserving box order.
///
/// Boxes are clamped to the image bounds first; a box that is degenerate
/// after clamping breaks the index alignment the pipeline depends on, so the
/// whole operation fails rather than returning a shorter list.
pub fn crop_regions(image: &DynamicImage, boxes: &[BoundingBox]) -> Result<Vec<Crop>> {
    let (width, height) = (image.width(), image.height());
    let mut crops = Vec::with_capacity(boxes.len());

    for bbox in boxes {
        let clamped = bbox.clamped(width, height);
        if !clamped.is_valid() {
            return Err(Error::invalid_response(format!(
                "degenerate box {:?} for {}x{} image",
                bbox.to_array(),
                width,
                height
            )));
        }

        let x = clamped.x1.floor() as u32;
        let y = clamped.y1.floor() as u32;
        let w = (clamped.x2.ceil() as u32).min(width) - x;
        let h = (clamped.y2.ceil() as u32).min(height) - y;

        let crop = image.crop_imm(x, y, w.max(1), h.max(1));
        crops.push(Crop::new(encode_png(&crop)?, *bbox));
    }

    Ok(crops)
}

/// Renders the detection visualization: the source image with an outline
/// drawn around every region.
pub fn annotate(image: &DynamicImage, regions: &[Region]) -> Result<Bytes> {
    let mut canvas = image.to_rgb8();
    for region in regions {
        draw_outline(&mut canvas, &region.bbox);
    }
    encode_png(&DynamicImage::ImageRgb8(canvas))
}

fn draw_outline(canvas: &mut RgbImage, bbox: &BoundingBox) {
    let (width, height) = canvas.dimensions();
    let clamped = bbox.clamped(width.saturating_sub(1), height.saturating_sub(1));
    if !clamped.is_valid() {
        return;
    }

    let (x1, y1) = (clamped.x1 as u32, clamped.y1 as u32);
    let (x2, y2) = (clamped.x2 as u32, clamped.y2 as u32);

    for t in 0..BOX_THICKNESS {
        for x in x1..=x2 {
            canvas.put_pixel(x, (y1 + t).min(height - 1), BOX_COLOR);
            canvas.put_pixel(x, y2.saturating_sub(t), BOX_COLOR);
        }
        for y in y1..=y2 {
            canvas.put_pixel((x1 + t).min(width - 1), y, BOX_COLOR);
            canvas.put_pixel(x2.saturating_sub(t), y, BOX_COLOR);
        }
    }
}
