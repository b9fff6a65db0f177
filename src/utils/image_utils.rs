//! Raster primitives shared by the detectors and the OCR crop pipeline.
//!
//! Binary images follow the convention "non-zero is foreground". All
//! morphological operators use rectangular kernels anchored at their centre
//! and ignore pixels outside the image.

use std::collections::VecDeque;

use image::{imageops, GrayImage, ImageBuffer, Luma, Pixel, RgbImage};
use imageproc::filter::gaussian_blur_f32;
use imageproc::geometric_transformations::{warp_into, Interpolation, Projection};

use crate::utils::error::ImageError;

/// Rectangular structuring element, `width` columns by `height` rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Kernel {
    pub width: u32,
    pub height: u32,
}

impl Kernel {
    #[inline]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// A single-column kernel, used to keep or thicken vertical strokes.
    #[inline]
    pub const fn vertical(length: u32) -> Self {
        Self::new(1, length)
    }

    /// A single-row kernel, used to keep or thicken horizontal strokes.
    #[inline]
    pub const fn horizontal(length: u32) -> Self {
        Self::new(length, 1)
    }

    #[inline]
    pub const fn square(size: u32) -> Self {
        Self::new(size, size)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MorphOp {
    Erode,
    Dilate,
}

pub fn to_grayscale(image: &RgbImage) -> GrayImage {
    imageops::grayscale(image)
}

/// Binary threshold: pixels strictly above `level` become 255, all others 0.
pub fn threshold(image: &GrayImage, level: u8) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        if image.get_pixel(x, y)[0] > level {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

pub fn invert(image: &GrayImage) -> GrayImage {
    let mut inverted = image.clone();
    imageops::invert(&mut inverted);
    inverted
}

/// Per-pixel maximum of two equally sized masks.
pub fn union(a: &GrayImage, b: &GrayImage) -> Result<GrayImage, ImageError> {
    if a.dimensions() != b.dimensions() {
        return Err(ImageError::InvalidInput {
            message: format!(
                "cannot merge masks of size {:?} and {:?}",
                a.dimensions(),
                b.dimensions()
            ),
        });
    }

    Ok(GrayImage::from_fn(a.width(), a.height(), |x, y| {
        Luma([a.get_pixel(x, y)[0].max(b.get_pixel(x, y)[0])])
    }))
}

pub fn erode(image: &GrayImage, kernel: Kernel, iterations: u32) -> GrayImage {
    morph(image, kernel, iterations, MorphOp::Erode)
}

pub fn dilate(image: &GrayImage, kernel: Kernel, iterations: u32) -> GrayImage {
    morph(image, kernel, iterations, MorphOp::Dilate)
}

fn morph(image: &GrayImage, kernel: Kernel, iterations: u32, op: MorphOp) -> GrayImage {
    let mut current = image.clone();
    if kernel.width == 0 || kernel.height == 0 {
        return current;
    }

    for _ in 0..iterations {
        if kernel.width > 1 {
            current = morph_rows(&current, kernel.width, op);
        }
        if kernel.height > 1 {
            current = morph_columns(&current, kernel.height, op);
        }
    }

    current
}

fn morph_rows(image: &GrayImage, size: u32, op: MorphOp) -> GrayImage {
    let (width, height) = image.dimensions();
    let mut out = GrayImage::new(width, height);
    let mut line = Vec::with_capacity(width as usize);

    for y in 0..height {
        line.clear();
        line.extend((0..width).map(|x| image.get_pixel(x, y)[0]));
        for (x, value) in sliding_extreme(&line, size as usize, op).into_iter().enumerate() {
            out.put_pixel(x as u32, y, Luma([value]));
        }
    }

    out
}

fn morph_columns(image: &GrayImage, size: u32, op: MorphOp) -> GrayImage {
    let (width, height) = image.dimensions();
    let mut out = GrayImage::new(width, height);
    let mut line = Vec::with_capacity(height as usize);

    for x in 0..width {
        line.clear();
        line.extend((0..height).map(|y| image.get_pixel(x, y)[0]));
        for (y, value) in sliding_extreme(&line, size as usize, op).into_iter().enumerate() {
            out.put_pixel(x, y as u32, Luma([value]));
        }
    }

    out
}

/// Minimum (erode) or maximum (dilate) over the window
/// `[i - size / 2, i - size / 2 + size - 1]`, clipped to the line.
fn sliding_extreme(line: &[u8], size: usize, op: MorphOp) -> Vec<u8> {
    let len = line.len();
    let anchor = size / 2;
    let mut out = Vec::with_capacity(len);
    // Indices whose values are monotonic: increasing for erode, decreasing for dilate.
    let mut window: VecDeque<usize> = VecDeque::new();
    let dominates = |a: u8, b: u8| match op {
        MorphOp::Erode => a <= b,
        MorphOp::Dilate => a >= b,
    };

    let mut next = 0usize;
    for i in 0..len {
        let end = (i + size - anchor).min(len);
        while next < end {
            while let Some(&back) = window.back() {
                if dominates(line[next], line[back]) {
                    window.pop_back();
                } else {
                    break;
                }
            }
            window.push_back(next);
            next += 1;
        }

        let start = i.saturating_sub(anchor);
        while let Some(&front) = window.front() {
            if front < start {
                window.pop_front();
            } else {
                break;
            }
        }

        out.push(window.front().map_or(0, |&idx| line[idx]));
    }

    out
}

/// Zhang-Suen thinning. Returns a one-pixel wide 0/255 skeleton.
pub fn skeletonize(image: &GrayImage) -> GrayImage {
    let (width, height) = image.dimensions();
    let (w, h) = (width as usize, height as usize);
    let mut grid: Vec<bool> = image.pixels().map(|p| p[0] > 0).collect();

    if w < 3 || h < 3 {
        return to_mask(&grid, width, height);
    }

    let at = |grid: &[bool], x: usize, y: usize| grid[y * w + x];
    let mut to_clear = Vec::new();

    loop {
        let mut changed = false;

        for step in 0..2 {
            to_clear.clear();
            for y in 1..h - 1 {
                for x in 1..w - 1 {
                    if !at(&grid, x, y) {
                        continue;
                    }

                    // p2..p9 clockwise starting north
                    let n = [
                        at(&grid, x, y - 1),
                        at(&grid, x + 1, y - 1),
                        at(&grid, x + 1, y),
                        at(&grid, x + 1, y + 1),
                        at(&grid, x, y + 1),
                        at(&grid, x - 1, y + 1),
                        at(&grid, x - 1, y),
                        at(&grid, x - 1, y - 1),
                    ];
                    let neighbours = n.iter().filter(|&&v| v).count();
                    if !(2..=6).contains(&neighbours) {
                        continue;
                    }

                    let transitions = (0..8).filter(|&i| !n[i] && n[(i + 1) % 8]).count();
                    if transitions != 1 {
                        continue;
                    }

                    let (p2, p4, p6, p8) = (n[0], n[2], n[4], n[6]);
                    let keep = if step == 0 {
                        (p2 && p4 && p6) || (p4 && p6 && p8)
                    } else {
                        (p2 && p4 && p8) || (p2 && p6 && p8)
                    };
                    if !keep {
                        to_clear.push(y * w + x);
                    }
                }
            }

            if !to_clear.is_empty() {
                changed = true;
                for &idx in &to_clear {
                    grid[idx] = false;
                }
            }
        }

        if !changed {
            break;
        }
    }

    to_mask(&grid, width, height)
}

fn to_mask(grid: &[bool], width: u32, height: u32) -> GrayImage {
    GrayImage::from_fn(width, height, |x, y| {
        if grid[(y * width + x) as usize] {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

/// Sigma that OpenCV derives for a Gaussian kernel of `ksize` when none is given.
#[inline]
pub fn sigma_for_kernel(ksize: u32) -> f32 {
    0.3 * ((ksize as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

pub fn gaussian_blur(image: &GrayImage, ksize: u32) -> GrayImage {
    gaussian_blur_f32(image, sigma_for_kernel(ksize))
}

pub fn gaussian_blur_sigma(image: &GrayImage, sigma: f32) -> GrayImage {
    if sigma <= 0.0 {
        return image.clone();
    }
    gaussian_blur_f32(image, sigma)
}

/// Two passes of a 3x3 sharpening kernel.
pub fn sharpen(image: &GrayImage) -> GrayImage {
    const KERNEL: [f32; 9] = [-1.0, -1.0, -1.0, -1.0, 9.0, -1.0, -1.0, -1.0, -1.0];
    let once: GrayImage = imageops::filter3x3(image, &KERNEL);
    imageops::filter3x3(&once, &KERNEL)
}

pub fn upscale(image: &GrayImage, factor: u32) -> GrayImage {
    imageops::resize(
        image,
        image.width() * factor,
        image.height() * factor,
        imageops::FilterType::Triangle,
    )
}

/// Crops `(x, y, width, height)` after clamping it to the image.
///
/// Fails only when nothing of the region remains inside the image.
pub fn crop<P>(
    image: &ImageBuffer<P, Vec<P::Subpixel>>,
    x: i64,
    y: i64,
    width: i64,
    height: i64,
) -> Result<ImageBuffer<P, Vec<P::Subpixel>>, ImageError>
where
    P: Pixel + 'static,
{
    let (img_w, img_h) = (image.width() as i64, image.height() as i64);
    let left = x.clamp(0, img_w);
    let top = y.clamp(0, img_h);
    let right = (x + width).clamp(0, img_w);
    let bottom = (y + height).clamp(0, img_h);

    if right <= left || bottom <= top {
        return Err(ImageError::CropOutOfBounds {
            x,
            y,
            width,
            height,
            image_width: image.width(),
            image_height: image.height(),
        });
    }

    Ok(imageops::crop_imm(
        image,
        left as u32,
        top as u32,
        (right - left) as u32,
        (bottom - top) as u32,
    )
    .to_image())
}

/// Size of the canvas that holds `width` x `height` rotated by `angle` degrees.
pub fn rotated_dimensions(width: u32, height: u32, angle: f32) -> (u32, u32) {
    let theta = angle.to_radians();
    let (sin, cos) = (theta.sin().abs(), theta.cos().abs());
    let new_width = (width as f32 * cos + height as f32 * sin).ceil() as u32;
    let new_height = (width as f32 * sin + height as f32 * cos).ceil() as u32;
    (new_width.max(1), new_height.max(1))
}

/// Maps a point of the source image to the rotated canvas.
///
/// Positive angles turn the content counter-clockwise as displayed.
pub fn rotate_point(
    point: (f32, f32),
    source: (u32, u32),
    target: (u32, u32),
    angle: f32,
) -> (f32, f32) {
    let theta = angle.to_radians();
    let (sin, cos) = theta.sin_cos();
    let dx = point.0 - source.0 as f32 / 2.0;
    let dy = point.1 - source.1 as f32 / 2.0;
    (
        dx * cos + dy * sin + target.0 as f32 / 2.0,
        -dx * sin + dy * cos + target.1 as f32 / 2.0,
    )
}

/// Rotates a page about its centre onto an enlarged white canvas so no
/// content is clipped.
pub fn rotate_by_angle(image: &RgbImage, angle: f32) -> Result<RgbImage, ImageError> {
    if angle == 0.0 {
        return Ok(image.clone());
    }

    let source = image.dimensions();
    let target = rotated_dimensions(source.0, source.1, angle);
    let (w, h) = (source.0 as f32, source.1 as f32);
    let corners = [(0.0, 0.0), (w, 0.0), (w, h), (0.0, h)];
    let mapped = corners.map(|corner| rotate_point(corner, source, target, angle));

    let projection = Projection::from_control_points(corners, mapped)
        .ok_or(ImageError::ProjectionFailed { angle })?;

    let mut rotated = RgbImage::from_pixel(target.0, target.1, image::Rgb([255, 255, 255]));
    warp_into(
        image,
        &projection,
        Interpolation::Bilinear,
        image::Rgb([255, 255, 255]),
        &mut rotated,
    );

    Ok(rotated)
}
