//! Image-to-PDF conversion
//!
//! Each image becomes one page sized to the image at its resolution. Pixel
//! data is embedded without re-encoding wherever PDF can decode the source
//! directly:
//!
//! - JPEG goes in untouched as a `DCTDecode` stream.
//! - Non-interlaced, opaque PNG (gray, RGB or palette) keeps its zlib IDAT
//!   data as a `FlateDecode` stream with the PNG predictor parameters.
//!
//! Anything else PNG can express (alpha channels, interlacing, `tRNS`
//! transparency) is decoded and stored as Flate-compressed 8-bit RGB, with
//! alpha flattened onto white.
//!
//! Resolution comes from the PNG `pHYs` chunk or the JFIF density, falling
//! back to [`DEFAULT_DPI`].

use crate::error::AssemblyError;
use image::codecs::jpeg::JpegDecoder;
use image::{ColorType, ImageDecoder};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use std::io::Cursor;
use std::path::{Path, PathBuf};

// =============================================================================
// Constants
// =============================================================================

const PNG_SIGNATURE: &[u8; 8] = b"\x89PNG\r\n\x1a\n";
const JPEG_MAGIC: &[u8; 3] = &[0xFF, 0xD8, 0xFF];

/// Resolution assumed when the image does not carry one
pub const DEFAULT_DPI: f32 = 96.0;

/// PNG "optimum" predictor: per-row filter bytes as written by PNG encoders
const PNG_PREDICTOR: i64 = 15;

// =============================================================================
// Document builder
// =============================================================================

/// A PDF under construction, one image per page
pub struct ImagePdf {
    doc: Document,
    pages_id: ObjectId,
    kids: Vec<Object>,
}

impl Default for ImagePdf {
    fn default() -> Self {
        Self::new()
    }
}

impl ImagePdf {
    /// Start an empty document
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            kids: Vec::new(),
        }
    }

    /// Number of pages added so far
    pub fn page_count(&self) -> usize {
        self.kids.len()
    }

    /// Read an image file and append it as the next page
    pub fn add_image_file(&mut self, path: &Path) -> Result<(), AssemblyError> {
        let bytes = std::fs::read(path).map_err(|e| unsupported(path, format!("unreadable: {e}")))?;
        self.add_image(&bytes, path)
    }

    /// Append encoded image bytes as the next page. `origin` is only used in errors.
    pub fn add_image(&mut self, bytes: &[u8], origin: &Path) -> Result<(), AssemblyError> {
        let image = EmbeddedImage::from_bytes(bytes, origin)?;
        let (width_pt, height_pt) = image.page_size_pt();

        let image_id = self.doc.add_object(image.stream);

        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        width_pt.into(),
                        0.into(),
                        0.into(),
                        height_pt.into(),
                        0.into(),
                        0.into(),
                    ],
                ),
                Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
                Operation::new("Q", vec![]),
            ],
        };
        let content_bytes = content
            .encode()
            .map_err(|e| AssemblyError::Conversion(format!("content stream: {e}")))?;
        let content_id = self
            .doc
            .add_object(Stream::new(Dictionary::new(), content_bytes));

        let resources = Dictionary::from_iter([(
            "XObject",
            Object::Dictionary(Dictionary::from_iter([("Im0", Object::Reference(image_id))])),
        )]);

        let page_id = self.doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(self.pages_id)),
            ("Contents", Object::Reference(content_id)),
            ("Resources", Object::Dictionary(resources)),
            (
                "MediaBox",
                Object::Array(vec![0.into(), 0.into(), width_pt.into(), height_pt.into()]),
            ),
        ]));

        self.kids.push(Object::Reference(page_id));
        Ok(())
    }

    /// Serialise the document
    pub fn finish(mut self) -> Result<Vec<u8>, AssemblyError> {
        let count = self.kids.len() as i64;
        let pages = Dictionary::from_iter([
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Kids", Object::Array(self.kids)),
            ("Count", Object::Integer(count)),
        ]);
        self.doc
            .objects
            .insert(self.pages_id, Object::Dictionary(pages));

        let catalog_id = self.doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(self.pages_id)),
        ]));
        self.doc.trailer.set("Root", Object::Reference(catalog_id));

        let mut output = Vec::new();
        self.doc
            .save_to(&mut output)
            .map_err(|e| AssemblyError::Conversion(format!("failed to serialise PDF: {e}")))?;

        Ok(output)
    }
}

fn unsupported(path: &Path, reason: impl Into<String>) -> AssemblyError {
    AssemblyError::UnsupportedImage {
        path: PathBuf::from(path),
        reason: reason.into(),
    }
}

// =============================================================================
// Image XObjects
// =============================================================================

#[derive(Debug)]
struct EmbeddedImage {
    width: u32,
    height: u32,
    dpi: (f32, f32),
    stream: Stream,
}

impl EmbeddedImage {
    fn from_bytes(bytes: &[u8], origin: &Path) -> Result<Self, AssemblyError> {
        if bytes.starts_with(PNG_SIGNATURE) {
            let png = PngInfo::parse(bytes).map_err(|reason| unsupported(origin, reason))?;
            if png.is_passthrough() {
                Ok(Self::png_passthrough(png))
            } else {
                Self::decoded(bytes, png.dpi, origin)
            }
        } else if bytes.starts_with(JPEG_MAGIC) {
            Self::jpeg(bytes, origin)
        } else {
            Err(unsupported(origin, "not a PNG or JPEG image"))
        }
    }

    fn page_size_pt(&self) -> (f32, f32) {
        (
            self.width as f32 * 72.0 / self.dpi.0,
            self.height as f32 * 72.0 / self.dpi.1,
        )
    }

    fn png_passthrough(png: PngInfo) -> Self {
        let (colors, color_space) = match png.color_type {
            PNG_GRAY => (1, Object::Name(b"DeviceGray".to_vec())),
            PNG_RGB => (3, Object::Name(b"DeviceRGB".to_vec())),
            _ => {
                let palette = png.palette.unwrap_or_default();
                let hival = (palette.len() / 3).saturating_sub(1) as i64;
                (
                    1,
                    Object::Array(vec![
                        Object::Name(b"Indexed".to_vec()),
                        Object::Name(b"DeviceRGB".to_vec()),
                        Object::Integer(hival),
                        Object::String(palette, StringFormat::Hexadecimal),
                    ]),
                )
            }
        };

        let decode_parms = Dictionary::from_iter([
            ("Predictor", Object::Integer(PNG_PREDICTOR)),
            ("Colors", Object::Integer(colors)),
            ("BitsPerComponent", Object::Integer(i64::from(png.bit_depth))),
            ("Columns", Object::Integer(i64::from(png.width))),
        ]);

        let mut dict = image_dict(png.width, png.height, color_space, png.bit_depth);
        dict.set("Filter", Object::Name(b"FlateDecode".to_vec()));
        dict.set("DecodeParms", Object::Dictionary(decode_parms));

        Self {
            width: png.width,
            height: png.height,
            dpi: png.dpi.unwrap_or((DEFAULT_DPI, DEFAULT_DPI)),
            stream: Stream::new(dict, png.idat),
        }
    }

    fn jpeg(bytes: &[u8], origin: &Path) -> Result<Self, AssemblyError> {
        let decoder = JpegDecoder::new(Cursor::new(bytes))
            .map_err(|e| unsupported(origin, format!("invalid JPEG: {e}")))?;
        let (width, height) = decoder.dimensions();

        let color_space = match decoder.color_type() {
            ColorType::L8 => "DeviceGray",
            ColorType::Rgb8 => "DeviceRGB",
            _ => return Self::decoded(bytes, jfif_dpi(bytes), origin),
        };

        let color_space = Object::Name(color_space.as_bytes().to_vec());
        let mut dict = image_dict(width, height, color_space, 8);
        dict.set("Filter", Object::Name(b"DCTDecode".to_vec()));

        Ok(Self {
            width,
            height,
            dpi: jfif_dpi(bytes).unwrap_or((DEFAULT_DPI, DEFAULT_DPI)),
            stream: Stream::new(dict, bytes.to_vec()),
        })
    }

    fn decoded(
        bytes: &[u8],
        dpi: Option<(f32, f32)>,
        origin: &Path,
    ) -> Result<Self, AssemblyError> {
        let img = image::load_from_memory(bytes)
            .map_err(|e| unsupported(origin, format!("cannot decode: {e}")))?;
        let (width, height) = (img.width(), img.height());

        let rgb = if img.color().has_alpha() {
            flatten_onto_white(&img.to_rgba8().into_raw())
        } else {
            img.to_rgb8().into_raw()
        };

        let dict = image_dict(width, height, Object::Name(b"DeviceRGB".to_vec()), 8);
        let mut stream = Stream::new(dict, rgb);
        // Leaving the stream uncompressed still yields a valid document.
        let _ = stream.compress();

        Ok(Self {
            width,
            height,
            dpi: dpi.unwrap_or((DEFAULT_DPI, DEFAULT_DPI)),
            stream,
        })
    }
}

fn image_dict(width: u32, height: u32, color_space: Object, bits: u8) -> Dictionary {
    Dictionary::from_iter([
        ("Type", Object::Name(b"XObject".to_vec())),
        ("Subtype", Object::Name(b"Image".to_vec())),
        ("Width", Object::Integer(i64::from(width))),
        ("Height", Object::Integer(i64::from(height))),
        ("ColorSpace", color_space),
        ("BitsPerComponent", Object::Integer(i64::from(bits))),
    ])
}

fn flatten_onto_white(rgba: &[u8]) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(rgba.len() / 4 * 3);
    for px in rgba.chunks_exact(4) {
        let alpha = u16::from(px[3]);
        for &c in &px[..3] {
            let blended = (u16::from(c) * alpha + 255 * (255 - alpha) + 127) / 255;
            rgb.push(blended as u8);
        }
    }
    rgb
}

// =============================================================================
// PNG chunk reader
// =============================================================================

const PNG_GRAY: u8 = 0;
const PNG_RGB: u8 = 2;
const PNG_PALETTE: u8 = 3;

#[derive(Debug)]
struct PngInfo {
    width: u32,
    height: u32,
    bit_depth: u8,
    color_type: u8,
    interlaced: bool,
    palette: Option<Vec<u8>>,
    has_transparency: bool,
    idat: Vec<u8>,
    dpi: Option<(f32, f32)>,
}

impl PngInfo {
    fn parse(bytes: &[u8]) -> Result<Self, String> {
        let mut pos = PNG_SIGNATURE.len();
        let mut header: Option<(u32, u32, u8, u8, bool)> = None;
        let mut palette = None;
        let mut has_transparency = false;
        let mut idat = Vec::new();
        let mut dpi = None;

        while pos + 8 <= bytes.len() {
            let len = read_u32(&bytes[pos..]) as usize;
            let kind = &bytes[pos + 4..pos + 8];
            let data_start = pos + 8;
            let data_end = data_start
                .checked_add(len)
                .filter(|end| end + 4 <= bytes.len())
                .ok_or_else(|| format!("truncated {} chunk", String::from_utf8_lossy(kind)))?;
            let data = &bytes[data_start..data_end];

            match kind {
                b"IHDR" => {
                    if data.len() < 13 {
                        return Err("short IHDR chunk".to_string());
                    }
                    header = Some((
                        read_u32(data),
                        read_u32(&data[4..]),
                        data[8],
                        data[9],
                        data[12] != 0,
                    ));
                }
                b"PLTE" => palette = Some(data.to_vec()),
                b"tRNS" => has_transparency = true,
                b"IDAT" => idat.extend_from_slice(data),
                b"pHYs" if data.len() >= 9 && data[8] == 1 => {
                    let (x, y) = (read_u32(data), read_u32(&data[4..]));
                    if x > 0 && y > 0 {
                        dpi = Some((x as f32 * 0.0254, y as f32 * 0.0254));
                    }
                }
                b"IEND" => break,
                _ => {}
            }

            pos = data_end + 4;
        }

        let (width, height, bit_depth, color_type, interlaced) =
            header.ok_or_else(|| "missing IHDR chunk".to_string())?;
        if width == 0 || height == 0 {
            return Err(format!("degenerate {width}x{height} image"));
        }
        if idat.is_empty() {
            return Err("no image data".to_string());
        }

        Ok(Self {
            width,
            height,
            bit_depth,
            color_type,
            interlaced,
            palette,
            has_transparency,
            idat,
            dpi,
        })
    }

    /// Whether PDF can decode the IDAT stream as-is
    fn is_passthrough(&self) -> bool {
        if self.interlaced || self.has_transparency {
            return false;
        }
        match self.color_type {
            PNG_GRAY => matches!(self.bit_depth, 1 | 2 | 4 | 8 | 16),
            PNG_RGB => matches!(self.bit_depth, 8 | 16),
            PNG_PALETTE => self.palette.is_some() && matches!(self.bit_depth, 1 | 2 | 4 | 8),
            _ => false,
        }
    }
}

// =============================================================================
// JFIF density
// =============================================================================

const JPEG_SOS: u8 = 0xDA;
const JPEG_APP0: u8 = 0xE0;

/// Resolution from the JFIF APP0 segment, if it states one in absolute units.
///
/// Density unit 1 is dots per inch, 2 is dots per centimetre. Unit 0 only
/// gives a pixel aspect ratio and is treated as absent.
fn jfif_dpi(bytes: &[u8]) -> Option<(f32, f32)> {
    let mut pos = 2;
    while pos + 4 <= bytes.len() && bytes[pos] == 0xFF {
        let marker = bytes[pos + 1];
        if marker == JPEG_SOS {
            return None;
        }
        let len = usize::from(u16::from_be_bytes([bytes[pos + 2], bytes[pos + 3]]));
        let data = bytes.get(pos + 4..pos + 2 + len)?;

        if marker == JPEG_APP0 && data.len() >= 12 && data.starts_with(b"JFIF\0") {
            let x = f32::from(u16::from_be_bytes([data[8], data[9]]));
            let y = f32::from(u16::from_be_bytes([data[10], data[11]]));
            if x == 0.0 || y == 0.0 {
                return None;
            }
            return match data[7] {
                1 => Some((x, y)),
                2 => Some((x * 2.54, y * 2.54)),
                _ => None,
            };
        }

        pos += 2 + len;
    }
    None
}

fn read_u32(bytes: &[u8]) -> u32 {
    u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

// =============================================================================
// Tests
// =============================================================================
