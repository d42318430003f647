//! Minimal PDF 1.4 writer.
//!
//! Supports what the acuse needs: the three standard Helvetica faces with WinAnsi encoding,
//! filled and stroked rectangles, text runs and RGB images. Content and image streams are
//! Flate compressed.

use std::io::{self, Write};

use flate2::write::ZlibEncoder;
use flate2::Compression;

/// US Letter, in points.
pub const LETTER: (f32, f32) = (612.0, 792.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::from_hex(0x000000);
    pub const WHITE: Color = Color::from_hex(0xFFFFFF);
    pub const GRAY: Color = Color::from_hex(0x808080);

    pub const fn from_hex(hex: u32) -> Self {
        Self {
            r: ((hex >> 16) & 0xFF) as u8,
            g: ((hex >> 8) & 0xFF) as u8,
            b: (hex & 0xFF) as u8,
        }
    }

    fn operands(&self) -> String {
        format!(
            "{} {} {}",
            number(f32::from(self.r) / 255.0),
            number(f32::from(self.g) / 255.0),
            number(f32::from(self.b) / 255.0)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    Regular,
    Bold,
    Italic,
}

const FONTS: [Font; 3] = [Font::Regular, Font::Bold, Font::Italic];

impl Font {
    fn resource_name(&self) -> &'static str {
        match self {
            Font::Regular => "F1",
            Font::Bold => "F2",
            Font::Italic => "F3",
        }
    }

    fn base_font(&self) -> &'static str {
        match self {
            Font::Regular => "Helvetica",
            Font::Bold => "Helvetica-Bold",
            Font::Italic => "Helvetica-Oblique",
        }
    }
}

/// Raw 8-bit RGB raster, rows top to bottom.
#[derive(Debug, Clone)]
pub struct RgbImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// Handle of an image registered with [`PdfDocument::add_image`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageId(usize);

/// Content stream of one page. Coordinates are in points from the bottom-left corner.
#[derive(Debug, Default, Clone)]
pub struct Page {
    content: String,
}

impl Page {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Color) {
        self.content.push_str(&format!(
            "{} rg {} {} {} {} re f\n",
            color.operands(),
            number(x),
            number(y),
            number(width),
            number(height)
        ));
    }

    pub fn stroke_rect(
        &mut self,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        color: Color,
        line_width: f32,
    ) {
        self.content.push_str(&format!(
            "{} RG {} w {} {} {} {} re S\n",
            color.operands(),
            number(line_width),
            number(x),
            number(y),
            number(width),
            number(height)
        ));
    }

    /// Draws `text` with its baseline starting at (`x`, `y`).
    pub fn text(&mut self, x: f32, y: f32, font: Font, size: f32, color: Color, text: &str) {
        self.content.push_str(&format!(
            "BT /{} {} Tf {} rg {} {} Td ({}) Tj ET\n",
            font.resource_name(),
            number(size),
            color.operands(),
            number(x),
            number(y),
            encode_text(text)
        ));
    }

    /// Places an image with its lower-left corner at (`x`, `y`), scaled to the given size.
    pub fn image(&mut self, image: ImageId, x: f32, y: f32, width: f32, height: f32) {
        self.content.push_str(&format!(
            "q {} 0 0 {} {} {} cm /Im{} Do Q\n",
            number(width),
            number(height),
            number(x),
            number(y),
            image.0
        ));
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

/// A document of equally sized pages.
#[derive(Debug)]
pub struct PdfDocument {
    width: f32,
    height: f32,
    images: Vec<RgbImage>,
    pages: Vec<Page>,
}

impl PdfDocument {
    pub fn new((width, height): (f32, f32)) -> Self {
        Self {
            width,
            height,
            images: Vec::new(),
            pages: Vec::new(),
        }
    }

    pub fn add_image(&mut self, image: RgbImage) -> ImageId {
        self.images.push(image);
        ImageId(self.images.len() - 1)
    }

    pub fn add_page(&mut self, page: Page) {
        self.pages.push(page);
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Serializes the document.
    ///
    /// Objects are numbered catalog, page tree, fonts, images, then one page and one
    /// content stream per page.
    pub fn to_bytes(&self) -> io::Result<Vec<u8>> {
        let font_base = 3;
        let image_base = font_base + FONTS.len();
        let page_base = image_base + self.images.len();
        let page_ids: Vec<usize> = (0..self.pages.len()).map(|i| page_base + 2 * i).collect();

        let mut objects: Vec<Vec<u8>> = Vec::new();
        objects.push(b"<< /Type /Catalog /Pages 2 0 R >>".to_vec());

        let kids = page_ids
            .iter()
            .map(|id| format!("{} 0 R", id))
            .collect::<Vec<_>>()
            .join(" ");
        objects.push(
            format!(
                "<< /Type /Pages /Kids [{}] /Count {} >>",
                kids,
                page_ids.len()
            )
            .into_bytes(),
        );

        for font in FONTS {
            objects.push(
                format!(
                    "<< /Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >>",
                    font.base_font()
                )
                .into_bytes(),
            );
        }

        for image in &self.images {
            let dict = format!(
                "/Type /XObject /Subtype /Image /Width {} /Height {} /ColorSpace /DeviceRGB /BitsPerComponent 8",
                image.width, image.height
            );
            objects.push(stream_object(&dict, &image.pixels)?);
        }

        let font_resources = FONTS
            .iter()
            .enumerate()
            .map(|(i, font)| format!("/{} {} 0 R", font.resource_name(), font_base + i))
            .collect::<Vec<_>>()
            .join(" ");
        let image_resources = (0..self.images.len())
            .map(|i| format!("/Im{} {} 0 R", i, image_base + i))
            .collect::<Vec<_>>()
            .join(" ");
        let resources = format!(
            "<< /Font << {} >> /XObject << {} >> >>",
            font_resources, image_resources
        );

        for (page, id) in self.pages.iter().zip(&page_ids) {
            objects.push(
                format!(
                    "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {} {}] /Resources {} /Contents {} 0 R >>",
                    number(self.width),
                    number(self.height),
                    resources,
                    id + 1
                )
                .into_bytes(),
            );
            objects.push(stream_object("", page.content.as_bytes())?);
        }

        let mut out = Vec::new();
        out.extend_from_slice(b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n");
        let mut offsets = Vec::with_capacity(objects.len());
        for (i, body) in objects.iter().enumerate() {
            offsets.push(out.len());
            write!(out, "{} 0 obj\n", i + 1)?;
            out.extend_from_slice(body);
            out.extend_from_slice(b"\nendobj\n");
        }

        let xref_offset = out.len();
        write!(out, "xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1)?;
        for offset in offsets {
            write!(out, "{:010} 00000 n \n", offset)?;
        }
        write!(
            out,
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref_offset
        )?;
        Ok(out)
    }
}

fn stream_object(dict: &str, data: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    let compressed = encoder.finish()?;

    let separator = if dict.is_empty() { "" } else { " " };
    let mut object = format!(
        "<< {}{}/Filter /FlateDecode /Length {} >>\nstream\n",
        dict,
        separator,
        compressed.len()
    )
    .into_bytes();
    object.extend_from_slice(&compressed);
    object.extend_from_slice(b"\nendstream");
    Ok(object)
}

/// Operand text: at most two decimals, no trailing zeros.
fn number(value: f32) -> String {
    let text = format!("{:.2}", value);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    match text {
        "" | "-" | "-0" => "0".to_string(),
        other => other.to_string(),
    }
}

/// WinAnsi code of `c`, `?` when the encoding has no glyph for it.
pub fn win_ansi_byte(c: char) -> u8 {
    match c {
        ' '..='~' => c as u8,
        '\u{A0}'..='\u{FF}' => c as u32 as u8,
        '\t' | '\n' | '\r' => b' ',
        '€' => 0x80,
        '‚' => 0x82,
        'ƒ' => 0x83,
        '„' => 0x84,
        '…' => 0x85,
        '†' => 0x86,
        '‡' => 0x87,
        'ˆ' => 0x88,
        '‰' => 0x89,
        'Š' => 0x8A,
        '‹' => 0x8B,
        'Œ' => 0x8C,
        'Ž' => 0x8E,
        '‘' => 0x91,
        '’' => 0x92,
        '“' => 0x93,
        '”' => 0x94,
        '•' => 0x95,
        '–' => 0x96,
        '—' => 0x97,
        '˜' => 0x98,
        '™' => 0x99,
        'š' => 0x9A,
        '›' => 0x9B,
        'œ' => 0x9C,
        'ž' => 0x9E,
        'Ÿ' => 0x9F,
        _ => b'?',
    }
}

/// Body of a PDF literal string holding `text` in WinAnsi. Bytes outside ASCII are written
/// as octal escapes so content streams stay 7-bit.
pub fn encode_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for byte in text.chars().map(win_ansi_byte) {
        match byte {
            b'(' | b')' | b'\\' => {
                out.push('\\');
                out.push(byte as char);
            }
            0x20..=0x7E => out.push(byte as char),
            _ => out.push_str(&format!("\\{:03o}", byte)),
        }
    }
    out
}
