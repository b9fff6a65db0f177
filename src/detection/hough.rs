//! Progressive probabilistic Hough transform over a binary mask.
//!
//! Points are visited in a seeded random order. Each point votes in the
//! (theta, rho) accumulator; as soon as one bin reaches the vote threshold
//! the corresponding line is traced through the mask in both directions,
//! bridging gaps up to `max_line_gap`. Traced pixels are removed from the
//! mask, and for accepted segments their votes are withdrawn.

use geo::{Coord, Line};
use image::GrayImage;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HoughParams {
    /// Distance resolution in pixels
    pub rho: f64,
    /// Angle resolution in degrees
    pub theta: f64,
    /// Votes a bin needs before a line is traced
    pub threshold: u32,
    pub min_line_length: u32,
    pub max_line_gap: u32,
    pub seed: u64,
}

impl Default for HoughParams {
    fn default() -> Self {
        Self {
            rho: 1.0,
            theta: 0.25,
            threshold: 100,
            min_line_length: 270,
            max_line_gap: 20,
            seed: 0x5eed,
        }
    }
}

struct Accumulator {
    cos: Vec<f64>,
    sin: Vec<f64>,
    num_rho: usize,
    rho_offset: f64,
    inv_rho: f64,
    votes: Vec<u32>,
}

impl Accumulator {
    fn new(width: u32, height: u32, params: &HoughParams) -> Self {
        let num_theta = ((180.0 / params.theta).round() as usize).max(1);
        let diagonal = f64::from(width).hypot(f64::from(height));
        let num_rho = ((diagonal * 2.0 + 1.0) / params.rho).round() as usize + 1;
        let (cos, sin): (Vec<f64>, Vec<f64>) = (0..num_theta)
            .map(|n| {
                let angle = (n as f64 * params.theta).to_radians();
                (angle.cos(), angle.sin())
            })
            .unzip();

        Self {
            cos,
            sin,
            num_rho,
            rho_offset: (num_rho - 1) as f64 / 2.0,
            inv_rho: 1.0 / params.rho,
            votes: vec![0; num_theta * num_rho],
        }
    }

    #[inline]
    fn rho_bin(&self, n: usize, x: u32, y: u32) -> usize {
        let r = (f64::from(x) * self.cos[n] + f64::from(y) * self.sin[n]) * self.inv_rho;
        (r.round() + self.rho_offset) as usize
    }

    /// Adds the votes of one point and returns the strongest bin it touched.
    fn vote(&mut self, x: u32, y: u32) -> (u32, usize) {
        let mut best = (0, 0);
        for n in 0..self.cos.len() {
            let idx = n * self.num_rho + self.rho_bin(n, x, y);
            self.votes[idx] += 1;
            if self.votes[idx] > best.0 {
                best = (self.votes[idx], n);
            }
        }
        best
    }

    fn unvote(&mut self, x: u32, y: u32) {
        for n in 0..self.cos.len() {
            let idx = n * self.num_rho + self.rho_bin(n, x, y);
            self.votes[idx] = self.votes[idx].saturating_sub(1);
        }
    }
}

struct Mask {
    width: i64,
    height: i64,
    pixels: Vec<bool>,
}

impl Mask {
    fn is_set(&self, x: i64, y: i64) -> bool {
        x >= 0
            && y >= 0
            && x < self.width
            && y < self.height
            && self.pixels[(y * self.width + x) as usize]
    }

    fn clear(&mut self, x: i64, y: i64) {
        self.pixels[(y * self.width + x) as usize] = false;
    }
}

/// Direction of travel along a detected line: one pixel on the major axis
/// per step, a fraction on the minor axis.
#[derive(Clone, Copy)]
struct Walk {
    step_x: f64,
    step_y: f64,
    x_major: bool,
}

impl Walk {
    fn new(theta_index: usize, acc: &Accumulator) -> Self {
        // The normal is (cos, sin), so the line runs along (-sin, cos).
        let a = -acc.sin[theta_index];
        let b = acc.cos[theta_index];
        if a.abs() > b.abs() {
            Self {
                step_x: a.signum(),
                step_y: b / a.abs(),
                x_major: true,
            }
        } else {
            Self {
                step_x: a / b.abs(),
                step_y: b.signum(),
                x_major: false,
            }
        }
    }

    fn reversed(self) -> Self {
        Self {
            step_x: -self.step_x,
            step_y: -self.step_y,
            ..self
        }
    }

    /// The set pixel at `(x, y)` or, failing that, its nearest set
    /// neighbour across the line.
    fn hit(&self, mask: &Mask, x: i64, y: i64) -> Option<(i64, i64)> {
        if mask.is_set(x, y) {
            return Some((x, y));
        }
        let candidates = if self.x_major {
            [(x, y - 1), (x, y + 1)]
        } else {
            [(x - 1, y), (x + 1, y)]
        };
        candidates.into_iter().find(|&(cx, cy)| mask.is_set(cx, cy))
    }

    /// Follows the line from `origin` until the gap limit is exceeded or the
    /// walk leaves the image. Returns the last pixel that was on the line.
    fn trace(&self, mask: &Mask, origin: (i64, i64), max_gap: u32) -> (i64, i64) {
        let mut end = origin;
        let mut gap = 0;
        let (mut fx, mut fy) = (origin.0 as f64, origin.1 as f64);

        loop {
            let (x, y) = (fx.round() as i64, fy.round() as i64);
            if x < 0 || y < 0 || x >= mask.width || y >= mask.height {
                break;
            }
            match self.hit(mask, x, y) {
                Some(pixel) => {
                    gap = 0;
                    end = pixel;
                }
                None => {
                    gap += 1;
                    if gap > max_gap {
                        break;
                    }
                }
            }
            fx += self.step_x;
            fy += self.step_y;
        }

        end
    }

    /// Removes the traced pixels between `origin` and `end`, inclusive.
    fn erase(
        &self,
        mask: &mut Mask,
        origin: (i64, i64),
        end: (i64, i64),
        mut on_clear: impl FnMut(i64, i64),
    ) {
        let (mut fx, mut fy) = (origin.0 as f64, origin.1 as f64);
        let major_distance = if self.x_major {
            (end.0 - origin.0).abs()
        } else {
            (end.1 - origin.1).abs()
        };

        for _ in 0..=major_distance {
            let (x, y) = (fx.round() as i64, fy.round() as i64);
            if let Some((hx, hy)) = self.hit(mask, x, y) {
                mask.clear(hx, hy);
                on_clear(hx, hy);
            }
            fx += self.step_x;
            fy += self.step_y;
        }
    }
}

/// Finds straight segments in a binary mask (non-zero pixels are points).
pub fn probabilistic_hough(image: &GrayImage, params: &HoughParams) -> Vec<Line<i32>> {
    let (width, height) = image.dimensions();
    let mut mask = Mask {
        width: i64::from(width),
        height: i64::from(height),
        pixels: image.pixels().map(|p| p[0] > 0).collect(),
    };

    let mut points: Vec<(u32, u32)> = image
        .enumerate_pixels()
        .filter(|(_, _, p)| p[0] > 0)
        .map(|(x, y, _)| (x, y))
        .collect();
    let mut rng = StdRng::seed_from_u64(params.seed);
    points.shuffle(&mut rng);

    let mut acc = Accumulator::new(width, height, params);
    let mut lines = Vec::new();

    for (x, y) in points {
        let origin = (i64::from(x), i64::from(y));
        if !mask.is_set(origin.0, origin.1) {
            continue;
        }

        let (max_votes, theta_index) = acc.vote(x, y);
        if max_votes < params.threshold {
            continue;
        }

        let forward = Walk::new(theta_index, &acc);
        let backward = forward.reversed();
        let ends = [
            forward.trace(&mask, origin, params.max_line_gap),
            backward.trace(&mask, origin, params.max_line_gap),
        ];

        let min_length = i64::from(params.min_line_length);
        let accepted = (ends[1].0 - ends[0].0).abs() >= min_length
            || (ends[1].1 - ends[0].1).abs() >= min_length;

        for (walk, end) in [(forward, ends[0]), (backward, ends[1])] {
            walk.erase(&mut mask, origin, end, |px, py| {
                if accepted {
                    acc.unvote(px as u32, py as u32);
                }
            });
        }

        if accepted {
            lines.push(Line::new(
                Coord {
                    x: ends[0].0 as i32,
                    y: ends[0].1 as i32,
                },
                Coord {
                    x: ends[1].0 as i32,
                    y: ends[1].1 as i32,
                },
            ));
        }
    }

    lines
}
