//! Border-seeded flood fill for near-black background removal.
//!
//! Icons exported on a black matte keep their dark interior detail (pupils,
//! ink outlines) only if removal is limited to background that touches the
//! image border. A global threshold would erase that detail, so this module
//! seeds a 4-connected flood fill from the border pixels and clears the
//! alpha of every near-black pixel the fill reaches.

use std::collections::VecDeque;

use image::RgbaImage;

/// Whether a pixel counts as near-black background.
///
/// True iff the pixel is not fully transparent and every color channel is at
/// or below `threshold`. Alpha-zero pixels are excluded so already-cleared
/// pixels can never re-enter the fill.
#[must_use]
pub fn is_near_black(r: u8, g: u8, b: u8, a: u8, threshold: u8) -> bool {
    a != 0 && r <= threshold && g <= threshold && b <= threshold
}

/// Test a coordinate against the background predicate; mark and enqueue it
/// if it qualifies. Every queued coordinate is marked visited first, so each
/// coordinate is enqueued at most once.
fn push_if_background(
    image: &RgbaImage,
    visited: &mut [bool],
    frontier: &mut VecDeque<(u32, u32)>,
    x: u32,
    y: u32,
    threshold: u8,
) {
    let idx = y as usize * image.width() as usize + x as usize;
    if visited[idx] {
        return;
    }
    let [r, g, b, a] = image.get_pixel(x, y).0;
    if is_near_black(r, g, b, a, threshold) {
        visited[idx] = true;
        frontier.push_back((x, y));
    }
}

/// Clear the alpha of every near-black pixel connected to the image border.
///
/// Flood-fills from the four border edges through 4-adjacent pixels whose
/// R, G and B channels are all `<= threshold` and whose alpha is non-zero.
/// Reached pixels get their alpha set to 0; their color channels are left
/// untouched, so the operation is reversible by restoring alpha. Near-black
/// regions fully enclosed by other colors never touch the border and
/// survive intact.
///
/// Returns the number of pixels whose alpha was cleared. A second pass over
/// the output clears nothing: cleared pixels fail the predicate because
/// their alpha is already 0.
#[must_use]
pub fn remove_border_background(image: &mut RgbaImage, threshold: u8) -> u64 {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 {
        return 0;
    }

    let mut visited = vec![false; w as usize * h as usize];
    let mut frontier: VecDeque<(u32, u32)> = VecDeque::new();

    // Seed with border pixels.
    for x in 0..w {
        push_if_background(image, &mut visited, &mut frontier, x, 0, threshold);
        push_if_background(image, &mut visited, &mut frontier, x, h - 1, threshold);
    }
    for y in 0..h {
        push_if_background(image, &mut visited, &mut frontier, 0, y, threshold);
        push_if_background(image, &mut visited, &mut frontier, w - 1, y, threshold);
    }

    let mut cleared = 0u64;
    while let Some((x, y)) = frontier.pop_front() {
        let px = image.get_pixel_mut(x, y);
        if px[3] != 0 {
            px[3] = 0;
            cleared += 1;
        }

        // Neighbors are classified before they can themselves be cleared,
        // so the alpha mutation above never affects which pixels qualify.
        if x > 0 {
            push_if_background(image, &mut visited, &mut frontier, x - 1, y, threshold);
        }
        if x + 1 < w {
            push_if_background(image, &mut visited, &mut frontier, x + 1, y, threshold);
        }
        if y > 0 {
            push_if_background(image, &mut visited, &mut frontier, x, y - 1, threshold);
        }
        if y + 1 < h {
            push_if_background(image, &mut visited, &mut frontier, x, y + 1, threshold);
        }
    }

    cleared
}
