use crate::db::core::DesignDB;
use anyhow::Context;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect as ImageRect;
use std::path::Path;

const MAX_IMAGE_SIDE: u32 = 4000;

/// Colour for a cell's spare capacity: overflow is red, a nearly full cell is
/// amber, free space fades towards dark green.
fn resource_color(resource: f64, max_resource: f64) -> Rgb<u8> {
    if resource < 0.0 {
        return Rgb([230, 30, 40]);
    }
    if !resource.is_finite() || max_resource <= 0.0 {
        return Rgb([20, 40, 20]);
    }
    let t = (resource / max_resource).clamp(0.0, 1.0);
    let r = (240.0 * (1.0 - t)) as u8;
    let g = (180.0 * (1.0 - t) + 60.0 * t) as u8;
    Rgb([r, g, 20])
}

/// Draws the per-cell minimum resource (`resource[y * x_size + x]`) as a
/// heatmap and overlays the exported route segments of every net.
pub fn draw_congestion(db: &DesignDB, resource: &[f64], filename: &str) -> anyhow::Result<()> {
    let x_size = db.dimension.x_size as u32;
    let y_size = db.dimension.y_size as u32;
    if x_size == 0 || y_size == 0 {
        return Ok(());
    }

    let cell_px = (MAX_IMAGE_SIDE / x_size.max(y_size)).clamp(1, 16);
    let width = x_size * cell_px;
    let height = y_size * cell_px;
    let mut img = RgbImage::from_pixel(width, height, Rgb([20, 20, 20]));

    let max_resource = resource
        .iter()
        .copied()
        .filter(|r| r.is_finite())
        .fold(0.0_f64, f64::max);

    // Image rows grow downwards, grid rows grow upwards.
    let top = |y: i32| (height as i32) - (y + 1) * cell_px as i32;

    for y in 0..y_size as i32 {
        for x in 0..x_size as i32 {
            let r = resource[(y as usize) * (x_size as usize) + x as usize];
            let rect = ImageRect::at(x * cell_px as i32, top(y)).of_size(cell_px, cell_px);
            draw_filled_rect_mut(&mut img, rect, resource_color(r, max_resource));
        }
    }

    let center = |x: i32, y: i32| {
        (
            (x as f32 + 0.5) * cell_px as f32,
            top(y) as f32 + 0.5 * cell_px as f32,
        )
    };
    let wire = Rgb([90, 160, 255]);
    let via = Rgb([255, 255, 255]);
    for seg in db.nets.iter().flat_map(|n| n.route_segments.iter()) {
        let (x1, y1) = center(seg.p1.x, seg.p1.y);
        if seg.is_via() {
            if cell_px >= 3 {
                let rect = ImageRect::at(x1 as i32 - 1, y1 as i32 - 1).of_size(3, 3);
                draw_filled_rect_mut(&mut img, rect, via);
            }
        } else {
            let (x2, y2) = center(seg.p2.x, seg.p2.y);
            draw_line_segment_mut(&mut img, (x1, y1), (x2, y2), wire);
        }
    }

    img.save(Path::new(filename))
        .with_context(|| format!("Failed to write congestion image '{}'", filename))?;
    Ok(())
}
