//! Scanned-PDF rasterization using lopdf.
//!
//! Page content streams are interpreted just far enough to learn where each
//! raster image is painted. Rendering composites every placed image onto a
//! white canvas covering the MediaBox at the requested resolution.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, ImageBuffer, Pixel, Rgb, RgbImage};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Object, ObjectId, Stream};
use tracing::{debug, trace, warn};

use super::{points_to_pixels, Document, Result};
use crate::error::PdfError;

/// US Letter, used when a page tree carries no MediaBox at all.
const DEFAULT_MEDIA_BOX: [f32; 4] = [0.0, 0.0, 612.0, 792.0];

/// Largest bitmap side we are willing to allocate.
const MAX_BITMAP_SIDE: u32 = 20_000;

/// Page tree nesting / XObject recursion guard.
const MAX_DEPTH: usize = 32;

/// Degenerate matrix threshold.
const EPSILON: f32 = 1e-6;

/// An opened PDF document.
///
/// Page geometry and image placements are resolved when the document is
/// opened, so rendering only touches per-page data and pages can be rendered
/// from several threads at once.
pub struct PdfDocument {
    pages: Vec<PageLayout>,
}

/// Everything needed to render one page.
struct PageLayout {
    /// MediaBox lower-left corner and size in points, before `/Rotate`.
    origin: (f32, f32),
    width_pt: f32,
    height_pt: f32,
    rotate: i64,
    placements: Vec<Placement>,
}

/// An image painted by the page content.
struct Placement {
    image: Arc<ScanImage>,
    /// Maps the image unit square into default user space.
    ctm: Matrix,
    /// Nonstroking color at the time of painting, used by stencil masks.
    fill: [u8; 3],
}

/// A raster image XObject, still encoded.
struct ScanImage {
    stream: Stream,
    width: u32,
    height: u32,
    /// Color components, or why the color space cannot be handled.
    components: std::result::Result<usize, String>,
    bits: i64,
    inverted: bool,
    /// `/ImageMask true`: samples select where the fill color is painted.
    stencil: bool,
}

/// Affine transform `[a b c d e f]` in PDF row-vector form.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Matrix([f32; 6]);

impl Matrix {
    const IDENTITY: Matrix = Matrix([1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);

    fn from_operands(operands: &[Object]) -> Option<Self> {
        let values: Vec<f32> = operands.iter().map(number).collect::<Option<_>>()?;
        <[f32; 6]>::try_from(values).ok().map(Matrix)
    }

    /// The transform applying `self` first and `next` second.
    fn then(self, next: Matrix) -> Matrix {
        let [a1, b1, c1, d1, e1, f1] = self.0;
        let [a2, b2, c2, d2, e2, f2] = next.0;
        Matrix([
            a1 * a2 + b1 * c2,
            a1 * b2 + b1 * d2,
            c1 * a2 + d1 * c2,
            c1 * b2 + d1 * d2,
            e1 * a2 + f1 * c2 + e2,
            e1 * b2 + f1 * d2 + f2,
        ])
    }

    fn apply(self, x: f32, y: f32) -> (f32, f32) {
        let [a, b, c, d, e, f] = self.0;
        (a * x + c * y + e, b * x + d * y + f)
    }
}

/// The slice of the graphics state that affects image painting.
#[derive(Clone, Copy)]
struct GraphicsState {
    ctm: Matrix,
    fill: [u8; 3],
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            ctm: Matrix::IDENTITY,
            fill: [0, 0, 0],
        }
    }
}

impl PdfDocument {
    /// Parse a document from bytes.
    pub fn open(data: &[u8]) -> Result<Self> {
        let mut document =
            lopdf::Document::load_mem(data).map_err(|e| PdfError::Open(e.to_string()))?;

        // Handle PDFs with empty password encryption
        if document.is_encrypted() {
            if let Err(e) = document.decrypt("") {
                debug!("Empty password rejected: {}", e);
                return Err(PdfError::Encrypted);
            }
            debug!("Decrypted PDF with empty password");
        }

        let page_ids: BTreeMap<u32, ObjectId> = document.get_pages();
        let reader = PageReader::new(&document);
        let pages: Vec<PageLayout> = page_ids
            .into_values()
            .map(|page_id| reader.layout(page_id))
            .collect();

        debug!(
            "Opened PDF with {} pages ({} with images)",
            pages.len(),
            pages.iter().filter(|p| !p.placements.is_empty()).count()
        );
        Ok(Self { pages })
    }

    /// Read and parse a document from disk.
    pub fn open_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let data = std::fs::read(path)?;
        Ok(Self::open(&data)?)
    }

    fn page(&self, index: usize) -> Result<&PageLayout> {
        self.pages.get(index).ok_or(PdfError::InvalidPage(index))
    }
}

/// Read-only walker over the lopdf object graph.
struct PageReader<'a> {
    document: &'a lopdf::Document,
    /// Image XObjects already seen, shared between placements.
    images: RefCell<HashMap<ObjectId, Arc<ScanImage>>>,
}

impl<'a> PageReader<'a> {
    fn new(document: &'a lopdf::Document) -> Self {
        Self {
            document,
            images: RefCell::new(HashMap::new()),
        }
    }

    fn layout(&self, page_id: ObjectId) -> PageLayout {
        let (media_box, rotate) = self.page_box(page_id);
        let resources = match self.inherited(page_id, b"Resources") {
            Some(Object::Dictionary(dict)) => Some(dict),
            _ => None,
        };

        let mut placements = Vec::new();
        if let Some(resources) = resources {
            match self
                .document
                .get_page_content(page_id)
                .and_then(|data| Content::decode(&data))
            {
                Ok(content) => self.interpret(
                    &content.operations,
                    resources,
                    GraphicsState::default(),
                    0,
                    &mut placements,
                ),
                Err(e) => {
                    warn!(
                        "Page {:?}: unreadable content stream ({}), stretching largest image",
                        page_id, e
                    );
                    placements.extend(self.stretched_image(resources, media_box));
                }
            }
        }

        PageLayout {
            origin: (media_box[0], media_box[1]),
            width_pt: media_box[2] - media_box[0],
            height_pt: media_box[3] - media_box[1],
            rotate,
            placements,
        }
    }

    /// Look up a page attribute, following `/Parent` for inheritable keys.
    fn inherited(&self, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
        let mut node_id = page_id;
        for _ in 0..MAX_DEPTH {
            let dict = self.document.get_object(node_id).ok()?.as_dict().ok()?;
            if let Ok(value) = dict.get(key) {
                return self.document.dereference(value).ok().map(|(_, obj)| obj);
            }
            match dict.get(b"Parent") {
                Ok(Object::Reference(parent_id)) => node_id = *parent_id,
                _ => return None,
            }
        }
        None
    }

    /// Normalized MediaBox `[x0 y0 x1 y1]` and `/Rotate` in degrees.
    fn page_box(&self, page_id: ObjectId) -> ([f32; 4], i64) {
        let media_box = self
            .inherited(page_id, b"MediaBox")
            .and_then(|obj| obj.as_array().ok())
            .and_then(|arr| {
                let values: Vec<f32> = arr.iter().filter_map(number).collect();
                (values.len() == 4).then(|| {
                    [
                        values[0].min(values[2]),
                        values[1].min(values[3]),
                        values[0].max(values[2]),
                        values[1].max(values[3]),
                    ]
                })
            })
            .unwrap_or_else(|| {
                debug!("Page {:?} has no MediaBox, assuming US Letter", page_id);
                DEFAULT_MEDIA_BOX
            });

        let rotate = self
            .inherited(page_id, b"Rotate")
            .and_then(|obj| obj.as_i64().ok())
            .unwrap_or(0)
            .rem_euclid(360);

        (media_box, rotate)
    }

    /// Walk content operations, recording every image painted.
    fn interpret(
        &self,
        operations: &[Operation],
        resources: &'a Dictionary,
        initial: GraphicsState,
        depth: usize,
        out: &mut Vec<Placement>,
    ) {
        if depth > MAX_DEPTH {
            warn!("Form XObjects nested deeper than {}, ignoring", MAX_DEPTH);
            return;
        }

        let mut state = initial;
        let mut saved = Vec::new();
        for op in operations {
            match op.operator.as_str() {
                "q" => saved.push(state),
                "Q" => {
                    if let Some(previous) = saved.pop() {
                        state = previous;
                    }
                }
                "cm" => {
                    if let Some(matrix) = Matrix::from_operands(&op.operands) {
                        state.ctm = matrix.then(state.ctm);
                    }
                }
                "g" | "rg" | "k" | "sc" | "scn" => {
                    if let Some(fill) = fill_color(&op.operands) {
                        state.fill = fill;
                    }
                }
                "Do" => {
                    if let Some(Ok(name)) = op.operands.first().map(Object::as_name) {
                        self.paint_xobject(name, resources, state, depth, out);
                    }
                }
                "BI" => trace!("Skipping inline image"),
                _ => {}
            }
        }
    }

    fn paint_xobject(
        &self,
        name: &[u8],
        resources: &'a Dictionary,
        state: GraphicsState,
        depth: usize,
        out: &mut Vec<Placement>,
    ) {
        let Some((id, stream)) = self.xobject(resources, name) else {
            trace!("Unknown XObject {}", String::from_utf8_lossy(name));
            return;
        };

        match stream.dict.get(b"Subtype").and_then(Object::as_name) {
            Ok(b"Image") => {
                if let Some(image) = self.scan_image(id, stream) {
                    trace!(
                        "Image {} painted at {:?}",
                        String::from_utf8_lossy(name),
                        state.ctm
                    );
                    out.push(Placement {
                        image,
                        ctm: state.ctm,
                        fill: state.fill,
                    });
                }
            }
            // Scanners sometimes wrap the page image in a form
            Ok(b"Form") => {
                let matrix = stream
                    .dict
                    .get(b"Matrix")
                    .and_then(Object::as_array)
                    .ok()
                    .and_then(|arr| Matrix::from_operands(arr))
                    .unwrap_or(Matrix::IDENTITY);
                let form_resources = stream
                    .dict
                    .get(b"Resources")
                    .ok()
                    .and_then(|obj| self.document.dereference(obj).ok())
                    .and_then(|(_, obj)| obj.as_dict().ok())
                    .unwrap_or(resources);
                let data = stream
                    .decompressed_content()
                    .unwrap_or_else(|_| stream.content.clone());

                match Content::decode(&data) {
                    Ok(content) => {
                        let inner = GraphicsState {
                            ctm: matrix.then(state.ctm),
                            ..state
                        };
                        self.interpret(&content.operations, form_resources, inner, depth + 1, out);
                    }
                    Err(e) => warn!(
                        "Form {} has unreadable content: {}",
                        String::from_utf8_lossy(name),
                        e
                    ),
                }
            }
            _ => {}
        }
    }

    /// Resolve a named XObject stream from a resources dictionary.
    fn xobject(
        &self,
        resources: &'a Dictionary,
        name: &[u8],
    ) -> Option<(Option<ObjectId>, &'a Stream)> {
        let (_, xobjects) = self.document.dereference(resources.get(b"XObject").ok()?).ok()?;
        match xobjects.as_dict().ok()?.get(name).ok()? {
            Object::Reference(id) => self
                .document
                .get_object(*id)
                .ok()?
                .as_stream()
                .ok()
                .map(|stream| (Some(*id), stream)),
            Object::Stream(stream) => Some((None, stream)),
            _ => None,
        }
    }

    /// Collect image XObjects reachable from a resources dictionary.
    fn collect_images(
        &self,
        resources: &'a Dictionary,
        depth: usize,
        out: &mut Vec<(Option<ObjectId>, &'a Stream)>,
    ) {
        if depth > MAX_DEPTH {
            return;
        }

        let xobjects = match resources
            .get(b"XObject")
            .ok()
            .and_then(|obj| self.document.dereference(obj).ok())
        {
            Some((_, Object::Dictionary(dict))) => dict,
            _ => return,
        };

        for (_, obj_ref) in xobjects.iter() {
            let (id, stream) = match self.document.dereference(obj_ref) {
                Ok((id, Object::Stream(stream))) => (id, stream),
                _ => continue,
            };

            match stream.dict.get(b"Subtype").and_then(Object::as_name) {
                Ok(b"Image") => out.push((id, stream)),
                Ok(b"Form") => {
                    if let Some((_, Object::Dictionary(inner))) = stream
                        .dict
                        .get(b"Resources")
                        .ok()
                        .and_then(|obj| self.document.dereference(obj).ok())
                    {
                        self.collect_images(inner, depth + 1, out);
                    }
                }
                _ => {}
            }
        }
    }

    /// The largest image of the page, stretched over the MediaBox.
    ///
    /// Only used when the content stream cannot be parsed.
    fn stretched_image(&self, resources: &'a Dictionary, media_box: [f32; 4]) -> Option<Placement> {
        let mut found = Vec::new();
        self.collect_images(resources, 0, &mut found);

        let image = found
            .into_iter()
            .filter_map(|(id, stream)| self.scan_image(id, stream))
            .max_by_key(|img| u64::from(img.width) * u64::from(img.height))?;
        let [x0, y0, x1, y1] = media_box;
        Some(Placement {
            image,
            ctm: Matrix([x1 - x0, 0.0, 0.0, y1 - y0, x0, y0]),
            fill: [0, 0, 0],
        })
    }

    fn scan_image(&self, id: Option<ObjectId>, stream: &Stream) -> Option<Arc<ScanImage>> {
        if let Some(cached) = id.and_then(|id| self.images.borrow().get(&id).cloned()) {
            return Some(cached);
        }

        let dict = &stream.dict;
        let width = dict.get(b"Width").and_then(Object::as_i64).unwrap_or(0);
        let height = dict.get(b"Height").and_then(Object::as_i64).unwrap_or(0);
        if width <= 0 || height <= 0 {
            trace!("Ignoring image with size {}x{}", width, height);
            return None;
        }

        let stencil = dict
            .get(b"ImageMask")
            .and_then(Object::as_bool)
            .unwrap_or(false);
        let bits = if stencil {
            1
        } else {
            dict.get(b"BitsPerComponent")
                .and_then(Object::as_i64)
                .unwrap_or(8)
        };
        let components = if stencil {
            Ok(1)
        } else {
            self.components(dict.get(b"ColorSpace").ok())
        };
        // For stencils a 0 sample paints, so `[1 0]` flips which samples do
        let inverted = dict
            .get(b"Decode")
            .and_then(Object::as_array)
            .ok()
            .and_then(|arr| arr.first().and_then(number))
            .is_some_and(|first| first > 0.5);

        let image = Arc::new(ScanImage {
            stream: stream.clone(),
            width: width as u32,
            height: height as u32,
            components,
            bits,
            inverted,
            stencil,
        });
        if let Some(id) = id {
            self.images.borrow_mut().insert(id, Arc::clone(&image));
        }
        Some(image)
    }

    /// Number of color components of an image color space.
    fn components(&self, color_space: Option<&Object>) -> std::result::Result<usize, String> {
        let obj = match color_space {
            Some(obj) => self
                .document
                .dereference(obj)
                .map(|(_, o)| o)
                .map_err(|e| e.to_string())?,
            None => return Ok(1),
        };

        match obj {
            Object::Name(name) => match name.as_slice() {
                b"DeviceGray" | b"G" | b"CalGray" => Ok(1),
                b"DeviceRGB" | b"RGB" | b"CalRGB" => Ok(3),
                b"DeviceCMYK" | b"CMYK" => Ok(4),
                other => Err(format!(
                    "unsupported color space {}",
                    String::from_utf8_lossy(other)
                )),
            },
            Object::Array(arr) => match arr.first().and_then(|o| o.as_name().ok()) {
                Some(b"ICCBased") => {
                    let n = arr
                        .get(1)
                        .and_then(|o| self.document.dereference(o).ok())
                        .and_then(|(_, o)| o.as_stream().ok())
                        .and_then(|s| s.dict.get(b"N").and_then(|n| n.as_i64()).ok())
                        .unwrap_or(3);
                    Ok(n as usize)
                }
                Some(b"CalGray") => Ok(1),
                Some(b"CalRGB") => Ok(3),
                Some(other) => Err(format!(
                    "unsupported color space {}",
                    String::from_utf8_lossy(other)
                )),
                None => Err("empty color space".to_string()),
            },
            _ => Err("malformed color space".to_string()),
        }
    }
}

impl ScanImage {
    /// Decode the raster image into pixels.
    fn decode(&self) -> std::result::Result<DynamicImage, String> {
        let filter = self.stream.dict.get(b"Filter").ok().and_then(|filter| match filter {
            Object::Name(name) => Some(name.as_slice()),
            Object::Array(arr) => arr.last().and_then(|o| o.as_name().ok()),
            _ => None,
        });

        match filter {
            Some(b"DCTDecode") => {
                trace!("Decoding JPEG image");
                return image::load_from_memory_with_format(
                    &self.stream.content,
                    image::ImageFormat::Jpeg,
                )
                .map_err(|e| format!("invalid JPEG data: {}", e));
            }
            Some(b"JPXDecode") => return Err("JPEG 2000 images are not supported".to_string()),
            Some(b"CCITTFaxDecode") | Some(b"JBIG2Decode") => {
                return Err("fax/JBIG2 images are not supported".to_string());
            }
            _ => {}
        }

        let components = self.components.clone()?;
        let data = match self.stream.decompressed_content() {
            Ok(d) => d,
            Err(_) => self.stream.content.clone(),
        };

        raw_to_image(&data, self.width, self.height, components, self.bits, self.inverted)
    }
}

/// A decoded image ready to be composited.
enum Layer {
    Color(RgbImage),
    /// Ink coverage: black paints the fill color, white leaves the page alone.
    Stencil { coverage: GrayImage, fill: [u8; 3] },
}

impl Layer {
    fn new(decoded: DynamicImage, stencil: Option<[u8; 3]>) -> Self {
        match stencil {
            Some(fill) => Layer::Stencil {
                coverage: decoded.to_luma8(),
                fill,
            },
            None => Layer::Color(decoded.to_rgb8()),
        }
    }

    fn dimensions(&self) -> (u32, u32) {
        match self {
            Layer::Color(img) => img.dimensions(),
            Layer::Stencil { coverage, .. } => coverage.dimensions(),
        }
    }

    /// Resampled to `width`x`height`, mirrored as requested.
    fn fitted(&self, width: u32, height: u32, flip_h: bool, flip_v: bool) -> Layer {
        match self {
            Layer::Color(img) => Layer::Color(fit(img, width, height, flip_h, flip_v)),
            Layer::Stencil { coverage, fill } => Layer::Stencil {
                coverage: fit(coverage, width, height, flip_h, flip_v),
                fill: *fill,
            },
        }
    }

    fn paint(&self, u: u32, v: u32, dst: &mut Rgb<u8>) {
        match self {
            Layer::Color(img) => *dst = *img.get_pixel(u, v),
            Layer::Stencil { coverage, fill } => {
                let alpha = 255 - u16::from(coverage.get_pixel(u, v).0[0]);
                for (channel, &ink) in dst.0.iter_mut().zip(fill) {
                    *channel = ((u16::from(*channel) * (255 - alpha) + u16::from(ink) * alpha) / 255) as u8;
                }
            }
        }
    }
}

fn fit<P>(img: &ImageBuffer<P, Vec<u8>>, width: u32, height: u32, flip_h: bool, flip_v: bool) -> ImageBuffer<P, Vec<u8>>
where
    P: Pixel<Subpixel = u8> + 'static,
{
    let mut out = if img.dimensions() == (width, height) {
        img.clone()
    } else {
        imageops::resize(img, width, height, FilterType::Triangle)
    };
    if flip_h {
        imageops::flip_horizontal_in_place(&mut out);
    }
    if flip_v {
        imageops::flip_vertical_in_place(&mut out);
    }
    out
}

/// Paint `layer` onto `canvas`, `to_device` mapping the unit square to pixels.
fn composite(canvas: &mut RgbImage, layer: &Layer, to_device: Matrix) {
    let [a, b, c, d, e, f] = to_device.0;

    if b.abs() < EPSILON && c.abs() < EPSILON {
        let (x0, x1) = (e, a + e);
        // Image row 0 sits at the top edge of the unit square
        let (y_top, y_bottom) = (d + f, f);
        let left = x0.min(x1).round();
        let top = y_top.min(y_bottom).round();
        let width = x0.max(x1).round() - left;
        let height = y_top.max(y_bottom).round() - top;
        if width < 1.0 || height < 1.0 {
            return;
        }
        if width <= MAX_BITMAP_SIDE as f32 && height <= MAX_BITMAP_SIDE as f32 {
            let fitted = layer.fitted(width as u32, height as u32, a < 0.0, d > 0.0);
            blit(canvas, &fitted, left as i64, top as i64);
            return;
        }
    }

    sample(canvas, layer, to_device);
}

fn blit(canvas: &mut RgbImage, layer: &Layer, left: i64, top: i64) {
    let (canvas_w, canvas_h) = canvas.dimensions();
    let (width, height) = layer.dimensions();
    for v in 0..height {
        let y = top + i64::from(v);
        if y < 0 || y >= i64::from(canvas_h) {
            continue;
        }
        for u in 0..width {
            let x = left + i64::from(u);
            if x < 0 || x >= i64::from(canvas_w) {
                continue;
            }
            layer.paint(u, v, canvas.get_pixel_mut(x as u32, y as u32));
        }
    }
}

/// Nearest-neighbour inverse mapping for rotated or skewed placements.
fn sample(canvas: &mut RgbImage, layer: &Layer, to_device: Matrix) {
    let [a, b, c, d, e, f] = to_device.0;
    let det = a * d - b * c;
    if det.abs() < EPSILON {
        return;
    }

    let corners = [
        to_device.apply(0.0, 0.0),
        to_device.apply(1.0, 0.0),
        to_device.apply(0.0, 1.0),
        to_device.apply(1.0, 1.0),
    ];
    let (canvas_w, canvas_h) = canvas.dimensions();
    let min_x = corners.iter().map(|p| p.0).fold(f32::INFINITY, f32::min).floor().max(0.0) as u32;
    let max_x = corners.iter().map(|p| p.0).fold(f32::NEG_INFINITY, f32::max).ceil().min(canvas_w as f32) as u32;
    let min_y = corners.iter().map(|p| p.1).fold(f32::INFINITY, f32::min).floor().max(0.0) as u32;
    let max_y = corners.iter().map(|p| p.1).fold(f32::NEG_INFINITY, f32::max).ceil().min(canvas_h as f32) as u32;

    let (width, height) = layer.dimensions();
    for y in min_y..max_y {
        for x in min_x..max_x {
            let dx = x as f32 + 0.5 - e;
            let dy = y as f32 + 0.5 - f;
            let p = (d * dx - c * dy) / det;
            let q = (a * dy - b * dx) / det;
            if !(0.0..1.0).contains(&p) || !(0.0..1.0).contains(&q) {
                continue;
            }
            let u = ((p * width as f32) as u32).min(width - 1);
            let v = (((1.0 - q) * height as f32) as u32).min(height - 1);
            layer.paint(u, v, canvas.get_pixel_mut(x, y));
        }
    }
}

impl Drop for PdfDocument {
    fn drop(&mut self) {
        debug!("Closing PDF with {} pages", self.pages.len());
    }
}

impl Document for PdfDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn render_page(&self, index: usize, dpi: u32) -> Result<DynamicImage> {
        let page = self.page(index)?;
        let render_err = |reason: String| PdfError::Render {
            page: index + 1,
            reason,
        };

        let canvas_w = points_to_pixels(page.width_pt, dpi);
        let canvas_h = points_to_pixels(page.height_pt, dpi);
        if canvas_w > MAX_BITMAP_SIDE || canvas_h > MAX_BITMAP_SIDE {
            return Err(render_err(format!(
                "bitmap {}x{} exceeds limit at {} dpi",
                canvas_w, canvas_h, dpi
            )));
        }
        if page.placements.is_empty() {
            return Err(render_err("no raster image on page".to_string()));
        }

        // Default user space to pixels, y pointing down
        let scale = dpi as f32 / 72.0;
        let (x0, y0) = page.origin;
        let device = Matrix([
            scale,
            0.0,
            0.0,
            -scale,
            -x0 * scale,
            (y0 + page.height_pt) * scale,
        ]);

        let mut canvas = RgbImage::from_pixel(canvas_w, canvas_h, Rgb([255, 255, 255]));
        let mut painted = 0;
        let mut first_failure = None;
        for placement in &page.placements {
            match placement.image.decode() {
                Ok(decoded) => {
                    let layer = Layer::new(decoded, placement.image.stencil.then_some(placement.fill));
                    composite(&mut canvas, &layer, placement.ctm.then(device));
                    painted += 1;
                }
                Err(reason) => {
                    warn!("Page {}: skipping image: {}", index + 1, reason);
                    first_failure.get_or_insert(reason);
                }
            }
        }
        if painted == 0 {
            return Err(render_err(
                first_failure.unwrap_or_else(|| "no raster image on page".to_string()),
            ));
        }

        debug!(
            "Page {}: composited {} of {} images onto {}x{} at {} dpi",
            index + 1,
            painted,
            page.placements.len(),
            canvas_w,
            canvas_h,
            dpi
        );

        let oriented = match page.rotate {
            90 => imageops::rotate90(&canvas),
            180 => imageops::rotate180(&canvas),
            270 => imageops::rotate270(&canvas),
            _ => canvas,
        };
        Ok(DynamicImage::ImageRgb8(oriented))
    }
}

fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}

/// Nonstroking color from gray, RGB or CMYK operands.
fn fill_color(operands: &[Object]) -> Option<[u8; 3]> {
    let values: Vec<f32> = operands.iter().map(number).collect::<Option<_>>()?;
    let channel = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    match values.as_slice() {
        [gray] => Some([channel(*gray); 3]),
        [r, g, b] => Some([channel(*r), channel(*g), channel(*b)]),
        [c, m, y, k] => {
            let white = 1.0 - k.clamp(0.0, 1.0);
            Some([
                channel((1.0 - c) * white),
                channel((1.0 - m) * white),
                channel((1.0 - y) * white),
            ])
        }
        _ => None,
    }
}

/// Build an image from uncompressed sample data.
fn raw_to_image(
    data: &[u8],
    width: u32,
    height: u32,
    components: usize,
    bits: i64,
    inverted: bool,
) -> std::result::Result<DynamicImage, String> {
    let pixels = width as usize * height as usize;

    match (components, bits) {
        (1, 1) => {
            let row_bytes = (width as usize).div_ceil(8);
            if data.len() < row_bytes * height as usize {
                return Err(format!(
                    "truncated 1-bit image data: {} bytes for {}x{}",
                    data.len(),
                    width,
                    height
                ));
            }
            let gray = GrayImage::from_fn(width, height, |x, y| {
                let byte = data[y as usize * row_bytes + x as usize / 8];
                let bit = (byte >> (7 - (x % 8))) & 1;
                let white = (bit == 1) != inverted;
                image::Luma([if white { 255 } else { 0 }])
            });
            Ok(DynamicImage::ImageLuma8(gray))
        }
        (1, 8) => {
            if data.len() < pixels {
                return Err(format!("truncated gray image data: {} bytes", data.len()));
            }
            let samples: Vec<u8> = data[..pixels]
                .iter()
                .map(|&v| if inverted { 255 - v } else { v })
                .collect();
            GrayImage::from_raw(width, height, samples)
                .map(DynamicImage::ImageLuma8)
                .ok_or_else(|| "gray buffer size mismatch".to_string())
        }
        (3, 8) => {
            if data.len() < pixels * 3 {
                return Err(format!("truncated RGB image data: {} bytes", data.len()));
            }
            RgbImage::from_raw(width, height, data[..pixels * 3].to_vec())
                .map(DynamicImage::ImageRgb8)
                .ok_or_else(|| "RGB buffer size mismatch".to_string())
        }
        (4, 8) => {
            if data.len() < pixels * 4 {
                return Err(format!("truncated CMYK image data: {} bytes", data.len()));
            }
            let mut rgb = Vec::with_capacity(pixels * 3);
            for chunk in data[..pixels * 4].chunks_exact(4) {
                let k = 255 - u16::from(chunk[3]);
                for &c in &chunk[..3] {
                    rgb.push(((255 - u16::from(c)) * k / 255) as u8);
                }
            }
            RgbImage::from_raw(width, height, rgb)
                .map(DynamicImage::ImageRgb8)
                .ok_or_else(|| "CMYK buffer size mismatch".to_string())
        }
        (c, b) => Err(format!(
            "unsupported sample layout: {} components at {} bits",
            c, b
        )),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::ColorType;
    use lopdf::StringFormat;

    const WHITE: [u8; 3] = [255, 255, 255];
    const BLACK: [u8; 3] = [0, 0, 0];

    fn name(s: &str) -> Object {
        Object::Name(s.as_bytes().to_vec())
    }

    /// An image XObject to place on a test page.
    pub(crate) struct TestImage {
        dict: Dictionary,
        data: Vec<u8>,
    }

    impl TestImage {
        /// 8-bit DeviceGray image from explicit samples.
        pub(crate) fn gray(width: u32, height: u32, samples: Vec<u8>) -> Self {
            let mut dict = Self::base(width, height);
            dict.set("ColorSpace", name("DeviceGray"));
            dict.set("BitsPerComponent", Object::Integer(8));
            Self { dict, data: samples }
        }

        /// Uniform 8-bit gray image.
        pub(crate) fn flat(width: u32, height: u32, value: u8) -> Self {
            Self::gray(width, height, vec![value; (width * height) as usize])
        }

        /// 1-bit `/ImageMask` stencil.
        pub(crate) fn stencil(width: u32, height: u32, data: Vec<u8>) -> Self {
            let mut dict = Self::base(width, height);
            dict.set("ImageMask", Object::Boolean(true));
            Self { dict, data }
        }

        pub(crate) fn with(mut self, key: &str, value: Object) -> Self {
            self.dict.set(key, value);
            self
        }

        fn base(width: u32, height: u32) -> Dictionary {
            let mut dict = Dictionary::new();
            dict.set("Type", name("XObject"));
            dict.set("Subtype", name("Image"));
            dict.set("Width", Object::Integer(i64::from(width)));
            dict.set("Height", Object::Integer(i64::from(height)));
            dict
        }
    }

    /// A page: MediaBox in points, images and the content painting them.
    pub(crate) struct TestPage {
        pub width_pt: i64,
        pub height_pt: i64,
        pub rotate: i64,
        images: Vec<TestImage>,
        content: String,
    }

    impl TestPage {
        pub(crate) fn blank(width_pt: i64, height_pt: i64) -> Self {
            Self {
                width_pt,
                height_pt,
                rotate: 0,
                images: Vec::new(),
                content: String::new(),
            }
        }

        /// One mid-gray scan covering the whole page.
        pub(crate) fn scanned(width_pt: i64, height_pt: i64, px_w: u32, px_h: u32) -> Self {
            let matrix = [width_pt as f32, 0.0, 0.0, height_pt as f32, 0.0, 0.0];
            Self::blank(width_pt, height_pt).draw(TestImage::flat(px_w, px_h, 128), matrix)
        }

        /// Paint `image` with `matrix` as its CTM.
        pub(crate) fn draw(mut self, image: TestImage, matrix: [f32; 6]) -> Self {
            let [a, b, c, d, e, f] = matrix;
            self.content.push_str(&format!(
                "q {} {} {} {} {} {} cm /Im{} Do Q\n",
                a,
                b,
                c,
                d,
                e,
                f,
                self.images.len()
            ));
            self.images.push(image);
            self
        }

        /// Append raw content operators.
        pub(crate) fn ops(mut self, ops: &str) -> Self {
            self.content.push_str(ops);
            self.content.push('\n');
            self
        }
    }

    pub(crate) fn build_document(pages: Vec<TestPage>) -> lopdf::Document {
        let mut doc = lopdf::Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let mut kids = Vec::new();

        for page in pages {
            let mut xobjects = Dictionary::new();
            for (i, image) in page.images.into_iter().enumerate() {
                let image_id = doc.add_object(Stream::new(image.dict, image.data));
                xobjects.set(format!("Im{}", i), Object::Reference(image_id));
            }
            let mut resources = Dictionary::new();
            resources.set("XObject", Object::Dictionary(xobjects));

            let content_id =
                doc.add_object(Stream::new(Dictionary::new(), page.content.into_bytes()));

            let mut page_dict = Dictionary::new();
            page_dict.set("Type", name("Page"));
            page_dict.set("Parent", Object::Reference(pages_id));
            page_dict.set("Contents", Object::Reference(content_id));
            page_dict.set(
                "MediaBox",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(page.width_pt),
                    Object::Integer(page.height_pt),
                ]),
            );
            if page.rotate != 0 {
                page_dict.set("Rotate", Object::Integer(page.rotate));
            }
            page_dict.set("Resources", Object::Dictionary(resources));
            kids.push(Object::Reference(doc.add_object(page_dict)));
        }

        let mut pages_dict = Dictionary::new();
        pages_dict.set("Type", name("Pages"));
        pages_dict.set("Count", Object::Integer(kids.len() as i64));
        pages_dict.set("Kids", Object::Array(kids));
        doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

        let mut catalog = Dictionary::new();
        catalog.set("Type", name("Catalog"));
        catalog.set("Pages", Object::Reference(pages_id));
        let catalog_id = doc.add_object(catalog);
        doc.trailer.set("Root", Object::Reference(catalog_id));
        doc
    }

    fn save(mut doc: lopdf::Document) -> Vec<u8> {
        let mut data = Vec::new();
        doc.save_to(&mut data).unwrap();
        data
    }

    pub(crate) fn build_pdf(pages: Vec<TestPage>) -> Vec<u8> {
        save(build_document(pages))
    }

    fn render(page: TestPage, dpi: u32) -> RgbImage {
        let doc = PdfDocument::open(&build_pdf(vec![page])).unwrap();
        doc.render_page(0, dpi).unwrap().to_rgb8()
    }

    const PASSWORD_PADDING: [u8; 32] = [
        0x28, 0xBF, 0x4E, 0x5E, 0x4E, 0x75, 0x8A, 0x41, 0x64, 0x00, 0x4E, 0x56, 0xFF, 0xFA,
        0x01, 0x08, 0x2E, 0x2E, 0x00, 0xB6, 0xD0, 0x68, 0x3E, 0x80, 0x2F, 0x0C, 0xA9, 0xFE,
        0x64, 0x53, 0x69, 0x7A,
    ];

    fn rc4(key: &[u8], data: &[u8]) -> Vec<u8> {
        let mut s: Vec<u8> = (0..=255).collect();
        let mut j = 0u8;
        for i in 0..256 {
            j = j.wrapping_add(s[i]).wrapping_add(key[i % key.len()]);
            s.swap(i, j as usize);
        }
        let (mut i, mut j) = (0u8, 0u8);
        data.iter()
            .map(|byte| {
                i = i.wrapping_add(1);
                j = j.wrapping_add(s[i as usize]);
                s.swap(i as usize, j as usize);
                byte ^ s[s[i as usize].wrapping_add(s[j as usize]) as usize]
            })
            .collect()
    }

    /// Encrypt with the standard RC4 handler and an empty user password.
    ///
    /// With `valid_user_entry` false the `/U` check fails for every password.
    fn encrypt(doc: &mut lopdf::Document, valid_user_entry: bool) {
        let hex = |bytes: Vec<u8>| Object::String(bytes, StringFormat::Hexadecimal);

        let mut std_cf = Dictionary::new();
        std_cf.set("CFM", name("V2"));
        let mut filters = Dictionary::new();
        filters.set("StdCF", Object::Dictionary(std_cf));

        let mut dict = Dictionary::new();
        dict.set("Filter", name("Standard"));
        dict.set("V", Object::Integer(1));
        dict.set("R", Object::Integer(2));
        dict.set("Length", Object::Integer(40));
        dict.set("P", Object::Integer(-4));
        dict.set("O", hex(vec![0x11; 32]));
        dict.set("U", hex(vec![0; 32]));
        dict.set("CF", Object::Dictionary(filters));
        let encrypt_id = doc.add_object(dict);
        doc.trailer.set("Encrypt", Object::Reference(encrypt_id));
        doc.trailer.set("ID", Object::Array(vec![hex(vec![0xAB; 16]), hex(vec![0xAB; 16])]));

        let key = lopdf::encryption::get_encryption_key(doc, "", false).unwrap();
        if valid_user_entry {
            let user_entry = rc4(&key, &PASSWORD_PADDING);
            doc.get_object_mut(encrypt_id)
                .and_then(Object::as_dict_mut)
                .unwrap()
                .set("U", hex(user_entry));
        }

        // RC4 is symmetric, so the per-object decryption also encrypts
        let ids: Vec<ObjectId> = doc.objects.keys().copied().filter(|id| *id != encrypt_id).collect();
        for id in ids {
            let Ok(sealed) = lopdf::encryption::decrypt_object(&key, id, &doc.objects[&id], false) else {
                continue;
            };
            if let Some(Object::Stream(stream)) = doc.objects.get_mut(&id) {
                stream.set_content(sealed);
            }
        }
    }

    #[test]
    fn test_open_rejects_garbage() {
        let result = PdfDocument::open(b"definitely not a pdf");
        assert!(matches!(result, Err(PdfError::Open(_))));
    }

    #[test]
    fn test_open_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.pdf");
        assert!(matches!(
            PdfDocument::open_file(&missing),
            Err(crate::PagescanError::Io(_))
        ));

        let garbage = dir.path().join("garbage.pdf");
        std::fs::write(&garbage, b"%PDF-1.5 truncated").unwrap();
        assert!(matches!(
            PdfDocument::open_file(&garbage),
            Err(crate::PagescanError::Pdf(PdfError::Open(_)))
        ));

        let scan = dir.path().join("scan.pdf");
        std::fs::write(&scan, build_pdf(vec![TestPage::scanned(72, 72, 4, 4)])).unwrap();
        assert_eq!(PdfDocument::open_file(&scan).unwrap().page_count(), 1);
    }

    #[test]
    fn test_page_count() {
        let data = build_pdf(vec![
            TestPage::scanned(72, 72, 10, 10),
            TestPage::scanned(72, 72, 10, 10),
            TestPage::scanned(72, 72, 10, 10),
        ]);
        let doc = PdfDocument::open(&data).unwrap();
        assert_eq!(doc.page_count(), 3);
    }

    #[test]
    fn test_open_document_without_pages() {
        let doc = PdfDocument::open(&build_pdf(Vec::new())).unwrap();
        assert_eq!(doc.page_count(), 0);
        assert!(matches!(doc.render_page(0, 72), Err(PdfError::InvalidPage(0))));
    }

    #[test]
    fn test_open_decrypts_empty_user_password() {
        let mut doc = build_document(vec![TestPage::scanned(72, 72, 8, 8)]);
        encrypt(&mut doc, true);
        let data = save(doc);

        let opened = PdfDocument::open(&data).unwrap();
        assert_eq!(opened.page_count(), 1);
        let bitmap = opened.render_page(0, 72).unwrap().to_rgb8();
        assert_eq!(bitmap.get_pixel(36, 36).0, [128, 128, 128]);
    }

    #[test]
    fn test_open_rejects_password_protected() {
        let mut doc = build_document(vec![TestPage::scanned(72, 72, 8, 8)]);
        encrypt(&mut doc, false);
        let data = save(doc);

        assert!(matches!(PdfDocument::open(&data), Err(PdfError::Encrypted)));
    }

    #[test]
    fn test_render_dimensions_follow_dpi() {
        let data = build_pdf(vec![TestPage::scanned(144, 72, 40, 20)]);
        let doc = PdfDocument::open(&data).unwrap();

        let low = doc.render_page(0, 72).unwrap();
        assert_eq!((low.width(), low.height()), (144, 72));

        let high = doc.render_page(0, 144).unwrap();
        assert_eq!((high.width(), high.height()), (288, 144));
        assert_eq!(high.color(), ColorType::Rgb8);
    }

    #[test]
    fn test_render_is_deterministic() {
        let data = build_pdf(vec![TestPage::scanned(100, 50, 33, 17)]);
        let doc = PdfDocument::open(&data).unwrap();
        let a = doc.render_page(0, 150).unwrap();
        let b = doc.render_page(0, 150).unwrap();
        assert_eq!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn test_render_rotated_page_swaps_dimensions() {
        let mut page = TestPage::scanned(144, 72, 40, 20);
        page.rotate = 90;
        let data = build_pdf(vec![page]);
        let doc = PdfDocument::open(&data).unwrap();

        let bitmap = doc.render_page(0, 72).unwrap();
        assert_eq!((bitmap.width(), bitmap.height()), (72, 144));
    }

    #[test]
    fn test_render_page_without_scan_fails() {
        let data = build_pdf(vec![TestPage::blank(72, 72)]);
        let doc = PdfDocument::open(&data).unwrap();
        let err = doc.render_page(0, 72).unwrap_err();
        assert!(matches!(err, PdfError::Render { page: 1, .. }));
    }

    #[test]
    fn test_render_invalid_index() {
        let data = build_pdf(vec![TestPage::scanned(72, 72, 4, 4)]);
        let doc = PdfDocument::open(&data).unwrap();
        assert!(matches!(doc.render_page(5, 72), Err(PdfError::InvalidPage(5))));
    }

    #[test]
    fn test_strips_compose_one_page() {
        let page = TestPage::blank(72, 144)
            .draw(TestImage::flat(4, 4, 0), [72.0, 0.0, 0.0, 72.0, 0.0, 72.0])
            .draw(TestImage::flat(4, 4, 200), [72.0, 0.0, 0.0, 72.0, 0.0, 0.0]);
        let bitmap = render(page, 72);

        assert_eq!(bitmap.dimensions(), (72, 144));
        assert_eq!(bitmap.get_pixel(36, 20).0, BLACK);
        assert_eq!(bitmap.get_pixel(36, 120).0, [200, 200, 200]);
    }

    #[test]
    fn test_placement_follows_cm() {
        // Lower-right quadrant only
        let page = TestPage::blank(100, 100)
            .draw(TestImage::flat(5, 5, 0), [50.0, 0.0, 0.0, 50.0, 50.0, 0.0]);
        let bitmap = render(page, 72);

        assert_eq!(bitmap.get_pixel(75, 75).0, BLACK);
        assert_eq!(bitmap.get_pixel(25, 25).0, WHITE);
        assert_eq!(bitmap.get_pixel(75, 25).0, WHITE);
        assert_eq!(bitmap.get_pixel(25, 75).0, WHITE);
    }

    #[test]
    fn test_mirrored_placement_flips_image() {
        // Negative height: image row 0 lands at the bottom
        let page = TestPage::blank(10, 10)
            .draw(TestImage::gray(1, 2, vec![0, 255]), [10.0, 0.0, 0.0, -10.0, 0.0, 10.0]);
        let bitmap = render(page, 72);

        assert_eq!(bitmap.get_pixel(5, 8).0, BLACK);
        assert_eq!(bitmap.get_pixel(5, 1).0, WHITE);
    }

    #[test]
    fn test_rotated_placement() {
        // Quarter turn: the image's left column runs along the page bottom
        let page = TestPage::blank(72, 72)
            .draw(TestImage::gray(2, 1, vec![0, 255]), [0.0, 72.0, -72.0, 0.0, 72.0, 0.0]);
        let bitmap = render(page, 72);

        assert_eq!(bitmap.get_pixel(36, 60).0, BLACK);
        assert_eq!(bitmap.get_pixel(36, 10).0, WHITE);
    }

    #[test]
    fn test_stencil_mask_paints_fill_color() {
        let full = [8.0, 0.0, 0.0, 8.0, 0.0, 0.0];

        let black = render(TestPage::blank(8, 8).draw(TestImage::stencil(8, 8, vec![0; 8]), full), 72);
        assert!(black.pixels().all(|p| p.0 == BLACK));

        let red = render(
            TestPage::blank(8, 8)
                .ops("1 0 0 rg")
                .draw(TestImage::stencil(8, 8, vec![0; 8]), full),
            72,
        );
        assert!(red.pixels().all(|p| p.0 == [255, 0, 0]));
    }

    #[test]
    fn test_stencil_mask_decode_array() {
        let mask = TestImage::stencil(8, 8, vec![0; 8]).with(
            "Decode",
            Object::Array(vec![Object::Integer(1), Object::Integer(0)]),
        );
        let bitmap = render(TestPage::blank(8, 8).draw(mask, [8.0, 0.0, 0.0, 8.0, 0.0, 0.0]), 72);
        assert!(bitmap.pixels().all(|p| p.0 == WHITE));
    }

    #[test]
    fn test_form_xobject_matrix_applies() {
        let mut doc = build_document(vec![TestPage::blank(100, 100)]);
        let page_id = doc.get_pages()[&1];

        let image_id = doc.add_object(Stream::new(
            TestImage::flat(2, 2, 0).dict,
            vec![0; 4],
        ));
        let mut form_xobjects = Dictionary::new();
        form_xobjects.set("Scan", Object::Reference(image_id));
        let mut form_resources = Dictionary::new();
        form_resources.set("XObject", Object::Dictionary(form_xobjects));
        let mut form_dict = Dictionary::new();
        form_dict.set("Type", name("XObject"));
        form_dict.set("Subtype", name("Form"));
        form_dict.set(
            "Matrix",
            Object::Array(vec![
                Object::Real(0.5),
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(0.5),
                Object::Integer(0),
                Object::Integer(0),
            ]),
        );
        form_dict.set("Resources", Object::Dictionary(form_resources));
        let form_id = doc.add_object(Stream::new(
            form_dict,
            b"q 100 0 0 100 0 0 cm /Scan Do Q".to_vec(),
        ));

        let mut xobjects = Dictionary::new();
        xobjects.set("Fm0", Object::Reference(form_id));
        let mut resources = Dictionary::new();
        resources.set("XObject", Object::Dictionary(xobjects));
        let content_id = doc.add_object(Stream::new(Dictionary::new(), b"/Fm0 Do".to_vec()));
        let page = doc.get_object_mut(page_id).and_then(Object::as_dict_mut).unwrap();
        page.set("Resources", Object::Dictionary(resources));
        page.set("Contents", Object::Reference(content_id));

        let opened = PdfDocument::open(&save(doc)).unwrap();
        let bitmap = opened.render_page(0, 72).unwrap().to_rgb8();
        // Form scaled to the lower-left quadrant
        assert_eq!(bitmap.get_pixel(25, 75).0, BLACK);
        assert_eq!(bitmap.get_pixel(75, 25).0, WHITE);
        assert_eq!(bitmap.get_pixel(75, 75).0, WHITE);
    }

    #[test]
    fn test_undecodable_image_is_skipped() {
        let jpx = TestImage::flat(4, 4, 0).with("Filter", name("JPXDecode"));
        let full = [72.0, 0.0, 0.0, 72.0, 0.0, 0.0];

        let data = build_pdf(vec![TestPage::blank(72, 72).draw(jpx, full)]);
        let doc = PdfDocument::open(&data).unwrap();
        match doc.render_page(0, 72) {
            Err(PdfError::Render { page: 1, reason }) => assert!(reason.contains("JPEG 2000")),
            other => panic!("unexpected result: {:?}", other.map(|img| (img.width(), img.height()))),
        }

        let jpx = TestImage::flat(4, 4, 0).with("Filter", name("JPXDecode"));
        let page = TestPage::blank(72, 72)
            .draw(TestImage::flat(4, 4, 90), full)
            .draw(jpx, full);
        assert_eq!(render(page, 72).get_pixel(10, 10).0, [90, 90, 90]);
    }

    #[test]
    fn test_matrix_then_applies_left_first() {
        let scale = Matrix([2.0, 0.0, 0.0, 2.0, 0.0, 0.0]);
        let shift = Matrix([1.0, 0.0, 0.0, 1.0, 10.0, 5.0]);
        assert_eq!(scale.then(shift).apply(1.0, 1.0), (12.0, 7.0));
        assert_eq!(shift.then(scale).apply(1.0, 1.0), (22.0, 12.0));
    }

    #[test]
    fn test_raw_one_bit_unpacking() {
        // 0b1010_0000 -> white, black, white, black
        let img = raw_to_image(&[0b1010_0000], 4, 1, 1, 1, false).unwrap();
        let gray = img.to_luma8();
        let values: Vec<u8> = gray.pixels().map(|p| p.0[0]).collect();
        assert_eq!(values, vec![255, 0, 255, 0]);
    }

    #[test]
    fn test_raw_cmyk_conversion() {
        let img = raw_to_image(&[0, 0, 0, 0, 0, 0, 0, 255], 2, 1, 4, 8, false).unwrap();
        let rgb = img.to_rgb8();
        assert_eq!(rgb.get_pixel(0, 0).0, [255, 255, 255]);
        assert_eq!(rgb.get_pixel(1, 0).0, [0, 0, 0]);
    }

    #[test]
    fn test_raw_truncated_data() {
        assert!(raw_to_image(&[1, 2, 3], 4, 4, 1, 8, false).is_err());
    }
}
