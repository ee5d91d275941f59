//! Raster to SVG conversion
//!
//! The vector export step calls a [`Vectorizer`] in-process. The built-in
//! [`ContourVectorizer`] quantizes visible pixels into a small palette,
//! traces each color layer along its pixel edges and writes one filled path
//! per layer.

use crate::error::{FogStripperError, Result};
use crate::services::ImageIOService;
use image::{GrayImage, Luma, RgbaImage};
use std::collections::HashMap;
use std::path::Path;
use svg::node::element::path::Data;
use svg::node::element::Path as SvgPath;
use svg::Document;
use tracing::{debug, warn};

/// Converts a raster file into an SVG file
pub trait Vectorizer: Send + Sync {
    /// Write an SVG rendering of `input` to `output`, reporting success
    fn vectorize(&self, input: &Path, output: &Path) -> bool;
}

/// Palette-and-contour vectorizer
#[derive(Debug, Clone)]
pub struct ContourVectorizer {
    /// Pixels with alpha at or below this are left out
    pub alpha_threshold: u8,
    /// Bits kept per color channel when bucketing
    pub color_bits: u8,
    /// Maximum number of color layers
    pub max_layers: usize,
}

impl Default for ContourVectorizer {
    fn default() -> Self {
        Self {
            alpha_threshold: 15,
            color_bits: 3,
            max_layers: 16,
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Bucket {
    count: u64,
    sum: [u64; 4],
}

impl Bucket {
    fn add(&mut self, pixel: &image::Rgba<u8>) {
        self.count += 1;
        for (acc, channel) in self.sum.iter_mut().zip(pixel.0) {
            *acc += u64::from(channel);
        }
    }

    fn mean(&self) -> [u8; 4] {
        let n = self.count.max(1);
        self.sum.map(|s| (s / n) as u8)
    }
}

type Key = (u8, u8, u8);

impl ContourVectorizer {
    fn key(&self, pixel: &image::Rgba<u8>) -> Key {
        let shift = 8 - self.color_bits.clamp(1, 8);
        (pixel[0] >> shift, pixel[1] >> shift, pixel[2] >> shift)
    }

    /// Build the SVG document for an RGBA raster
    ///
    /// # Errors
    /// - The raster has no visible pixels
    pub fn trace(&self, image: &RgbaImage) -> Result<Document> {
        let (width, height) = image.dimensions();

        let mut buckets: HashMap<Key, Bucket> = HashMap::new();
        for pixel in image.pixels().filter(|p| p[3] > self.alpha_threshold) {
            buckets.entry(self.key(pixel)).or_default().add(pixel);
        }
        if buckets.is_empty() {
            return Err(FogStripperError::processing("nothing visible to vectorize"));
        }

        let mut palette: Vec<(Key, Bucket)> = buckets.into_iter().collect();
        palette.sort_by(|a, b| b.1.count.cmp(&a.1.count).then(a.0.cmp(&b.0)));
        palette.truncate(self.max_layers.max(1));

        // Every visible pixel joins the nearest kept layer
        let nearest = |key: Key| -> usize {
            palette
                .iter()
                .enumerate()
                .min_by_key(|(_, (k, _))| {
                    let d = |a: u8, b: u8| (i32::from(a) - i32::from(b)).pow(2);
                    d(k.0, key.0) + d(k.1, key.1) + d(k.2, key.2)
                })
                .map_or(0, |(i, _)| i)
        };
        let mut layers = vec![GrayImage::new(width, height); palette.len()];
        for (x, y, pixel) in image.enumerate_pixels() {
            if pixel[3] > self.alpha_threshold {
                if let Some(layer) = layers.get_mut(nearest(self.key(pixel))) {
                    layer.put_pixel(x, y, Luma([255]));
                }
            }
        }

        let mut document = Document::new()
            .set("width", width)
            .set("height", height)
            .set("viewBox", (0, 0, width, height));

        let mut emitted = 0usize;
        for ((_, bucket), layer) in palette.iter().zip(&layers) {
            let Some(data) = layer_path_data(layer) else {
                continue;
            };
            let [r, g, b, a] = bucket.mean();
            let mut path = SvgPath::new()
                .set("d", data)
                .set("fill", format!("#{:02x}{:02x}{:02x}", r, g, b))
                .set("fill-rule", "evenodd");
            if a < 255 {
                path = path.set("fill-opacity", format!("{:.3}", f64::from(a) / 255.0));
            }
            document = document.add(path);
            emitted += 1;
        }

        if emitted == 0 {
            return Err(FogStripperError::processing("no outlines traced"));
        }
        debug!(layers = emitted, "Traced raster into SVG layers");
        Ok(document)
    }

    fn try_vectorize(&self, input: &Path, output: &Path) -> Result<()> {
        let image = ImageIOService::load_rgba(input)?;
        let document = self.trace(&image)?;
        svg::save(output, &document)
            .map_err(|e| FogStripperError::file_io_error("write SVG", output, &e))
    }
}

/// Pixel-grid vertex
type Vertex = (u32, u32);

/// Closed outlines running along pixel edges
///
/// Each filled pixel contributes the sides it shares with an empty pixel or
/// the image border, oriented clockwise. Chaining those edges yields one loop
/// per outer border and one per hole, so the even-odd rule recovers the layer
/// exactly, including layers that cover the whole image.
fn trace_outlines(layer: &GrayImage) -> Vec<Vec<Vertex>> {
    let (width, height) = layer.dimensions();
    let filled = |x: i64, y: i64| {
        x >= 0
            && y >= 0
            && x < i64::from(width)
            && y < i64::from(height)
            && layer.get_pixel(x as u32, y as u32)[0] > 0
    };

    let mut edges: HashMap<Vertex, Vec<Vertex>> = HashMap::new();
    let mut push = |from: Vertex, to: Vertex| edges.entry(from).or_default().push(to);
    for (x, y, pixel) in layer.enumerate_pixels() {
        if pixel[0] == 0 {
            continue;
        }
        let (xi, yi) = (i64::from(x), i64::from(y));
        if !filled(xi, yi - 1) {
            push((x, y), (x + 1, y));
        }
        if !filled(xi + 1, yi) {
            push((x + 1, y), (x + 1, y + 1));
        }
        if !filled(xi, yi + 1) {
            push((x + 1, y + 1), (x, y + 1));
        }
        if !filled(xi - 1, yi) {
            push((x, y + 1), (x, y));
        }
    }

    let mut starts: Vec<Vertex> = edges.keys().copied().collect();
    starts.sort_unstable_by_key(|&(x, y)| (y, x));

    let mut outlines = Vec::new();
    for start in starts {
        while let Some(mut current) = take_edge(&mut edges, start) {
            let mut points = vec![start];
            let mut last = start;
            while current != start {
                // Every vertex has as many outgoing edges as incoming ones
                let Some(next) = take_edge(&mut edges, current) else {
                    break;
                };
                if !collinear(last, current, next) {
                    points.push(current);
                    last = current;
                }
                current = next;
            }
            outlines.push(points);
        }
    }
    outlines
}

fn take_edge(edges: &mut HashMap<Vertex, Vec<Vertex>>, from: Vertex) -> Option<Vertex> {
    edges.get_mut(&from).and_then(Vec::pop)
}

fn collinear(a: Vertex, b: Vertex, c: Vertex) -> bool {
    let (ax, ay) = (i64::from(a.0), i64::from(a.1));
    let (bx, by) = (i64::from(b.0), i64::from(b.1));
    let (cx, cy) = (i64::from(c.0), i64::from(c.1));
    (bx - ax) * (cy - by) == (by - ay) * (cx - bx)
}

/// One closed subpath per outline; holes cancel via the even-odd rule
fn layer_path_data(layer: &GrayImage) -> Option<Data> {
    let outlines = trace_outlines(layer);
    if outlines.is_empty() {
        return None;
    }

    let mut data = Data::new();
    for outline in outlines {
        let mut points = outline.into_iter();
        let Some((x, y)) = points.next() else {
            continue;
        };
        data = data.move_to((x, y));
        for (x, y) in points {
            data = data.line_to((x, y));
        }
        data = data.close();
    }
    Some(data)
}

impl Vectorizer for ContourVectorizer {
    fn vectorize(&self, input: &Path, output: &Path) -> bool {
        match self.try_vectorize(input, output) {
            Ok(()) => true,
            Err(e) => {
                warn!(input = %input.display(), "Vectorization failed: {}", e);
                false
            },
        }
    }
}
