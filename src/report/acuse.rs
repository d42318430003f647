//! The "acuse de errores": a letter-size PDF listing the grouped errors of a validation.

use std::path::Path;

use chrono::NaiveDateTime;
use log::debug;

use crate::error_handling::types::ReportError;

use super::fonts::{text_width, wrap_text};
use super::pdf::{Color, Font, ImageId, Page, PdfDocument, RgbImage, LETTER};

pub const ACUSE_FILE_NAME: &str = "ACUSE_DE_ERRORES.pdf";

const BRAND: Color = Color::from_hex(0xA51C30);

const MARGIN: f32 = 72.0;
const CONTENT_WIDTH: f32 = LETTER.0 - 2.0 * MARGIN;
const TOP: f32 = LETTER.1 - MARGIN;
const BOTTOM: f32 = MARGIN;

const LOGO_WIDTH: f32 = 200.0;
const HEADER_LINES: [&str; 2] = ["Sistema de Validación", "de Formatos SIPOT"];
const HEADER_SIZE: f32 = 12.0;
const HEADER_LEADING: f32 = 14.0;
const RULE_HEIGHT: f32 = 3.0;

const TITLE: &str = "ACUSE DE ERRORES";
const TITLE_SIZE: f32 = 18.0;
const BODY_SIZE: f32 = 10.0;
const BODY_LEADING: f32 = 12.0;
const INTRO: &str =
    "A continuación se despliegan los errores detectados durante la validación del formato:";
const FOOTER: &str = "Documento generado automáticamente por el validador SIPOT.";

const NUMBER_COLUMN: f32 = 35.0;
const DESCRIPTION_COLUMN: f32 = CONTENT_WIDTH - NUMBER_COLUMN;
const TABLE_HEADER: [&str; 2] = ["#", "Descripción del error"];
const CELL_PADDING_X: f32 = 6.0;
const CELL_PADDING_Y: f32 = 3.0;
const ERROR_SIZE: f32 = 9.0;
const ERROR_LEADING: f32 = 12.0;
const GRID_WIDTH: f32 = 0.5;

/// Renders the acuse for `errors`.
///
/// The logo is drawn when `logo` points at an existing image; a missing file leaves the
/// space blank, an undecodable one is an error.
pub fn build_acuse(
    errors: &[String],
    nombre_corto: &str,
    logo: Option<&Path>,
    generated_at: NaiveDateTime,
) -> Result<Vec<u8>, ReportError> {
    let document = layout_acuse(errors, nombre_corto, logo, generated_at)?;
    debug!(
        "Acuse rendered: {} error(s) on {} page(s)",
        errors.len(),
        document.page_count()
    );
    Ok(document.to_bytes()?)
}

fn layout_acuse(
    errors: &[String],
    nombre_corto: &str,
    logo: Option<&Path>,
    generated_at: NaiveDateTime,
) -> Result<PdfDocument, ReportError> {
    let mut layout = Layout::new();

    let logo = match logo.filter(|p| p.is_file()) {
        Some(path) => {
            let image = load_logo(path)?;
            let height = LOGO_WIDTH * image.height as f32 / image.width.max(1) as f32;
            Some((layout.document.add_image(image), height))
        }
        None => None,
    };

    layout.header(logo);
    layout.title();
    layout.labeled_line("Nombre del Formato:", nombre_corto);
    layout.labeled_line(
        "Fecha de validación:",
        &generated_at.format("%d/%m/%Y %H:%M:%S").to_string(),
    );
    layout.y -= 12.0;
    layout.paragraph(INTRO, Font::Regular);
    layout.y -= 10.0;

    layout.table_header();
    for (idx, error) in errors.iter().enumerate() {
        layout.table_row(idx + 1, error);
    }

    layout.y -= 15.0;
    layout.paragraph(FOOTER, Font::Italic);

    Ok(layout.finish())
}

/// Decodes the logo and flattens its alpha channel over white.
pub fn load_logo(path: &Path) -> Result<RgbImage, ReportError> {
    let decoded = image::open(path)?.to_rgba8();
    let (width, height) = decoded.dimensions();

    let mut pixels = Vec::with_capacity(width as usize * height as usize * 3);
    for pixel in decoded.pixels() {
        let [r, g, b, a] = pixel.0;
        let alpha = u16::from(a);
        let over_white =
            |c: u8| ((u16::from(c) * alpha + 255 * (255 - alpha)) / 255) as u8;
        pixels.extend_from_slice(&[over_white(r), over_white(g), over_white(b)]);
    }

    Ok(RgbImage {
        width,
        height,
        pixels,
    })
}

/// Top-down cursor over the pages being filled.
struct Layout {
    document: PdfDocument,
    page: Page,
    y: f32,
}

impl Layout {
    fn new() -> Self {
        Self {
            document: PdfDocument::new(LETTER),
            page: Page::new(),
            y: TOP,
        }
    }

    fn new_page(&mut self) {
        let page = std::mem::take(&mut self.page);
        self.document.add_page(page);
        self.y = TOP;
    }

    /// Starts a new page unless `height` still fits. A fresh page always accepts.
    fn reserve(&mut self, height: f32) -> bool {
        if self.y - height < BOTTOM && !self.page.is_empty() {
            self.new_page();
            return true;
        }
        false
    }

    fn finish(mut self) -> PdfDocument {
        self.document.add_page(self.page);
        self.document
    }

    fn header(&mut self, logo: Option<(ImageId, f32)>) {
        let text_height = HEADER_LINES.len() as f32 * HEADER_LEADING;
        let height = logo.map_or(text_height, |(_, h)| h.max(text_height));
        let top = self.y;

        if let Some((image, logo_height)) = logo {
            let bottom = top - (height + logo_height) / 2.0;
            self.page
                .image(image, MARGIN, bottom, LOGO_WIDTH, logo_height);
        }

        let mut baseline = top - (height - text_height) / 2.0 - HEADER_SIZE;
        for line in HEADER_LINES {
            let x = MARGIN + CONTENT_WIDTH - text_width(line, Font::Bold, HEADER_SIZE);
            self.page
                .text(x, baseline, Font::Bold, HEADER_SIZE, Color::BLACK, line);
            baseline -= HEADER_LEADING;
        }

        self.y = top - height - 5.0 - RULE_HEIGHT;
        self.page
            .fill_rect(MARGIN, self.y, CONTENT_WIDTH, RULE_HEIGHT, BRAND);
        self.y -= 10.0;
    }

    fn title(&mut self) {
        let x = MARGIN + (CONTENT_WIDTH - text_width(TITLE, Font::Bold, TITLE_SIZE)) / 2.0;
        let baseline = self.y - TITLE_SIZE;
        self.page
            .text(x, baseline, Font::Bold, TITLE_SIZE, Color::BLACK, TITLE);
        self.y = baseline - 10.0;
    }

    fn labeled_line(&mut self, label: &str, value: &str) {
        self.reserve(BODY_LEADING);
        let baseline = self.y - BODY_SIZE;
        self.page
            .text(MARGIN, baseline, Font::Bold, BODY_SIZE, Color::BLACK, label);
        let x = MARGIN + text_width(&format!("{} ", label), Font::Bold, BODY_SIZE);
        self.page
            .text(x, baseline, Font::Regular, BODY_SIZE, Color::BLACK, value);
        self.y -= BODY_LEADING;
    }

    fn paragraph(&mut self, text: &str, font: Font) {
        for line in wrap_text(text, font, BODY_SIZE, CONTENT_WIDTH) {
            self.reserve(BODY_LEADING);
            let baseline = self.y - BODY_SIZE;
            self.page
                .text(MARGIN, baseline, font, BODY_SIZE, Color::BLACK, &line);
            self.y -= BODY_LEADING;
        }
    }

    fn table_header(&mut self) {
        let height = table_header_height();
        self.reserve(height);
        let bottom = self.y - height;
        self.page
            .fill_rect(MARGIN, bottom, CONTENT_WIDTH, height, BRAND);
        self.grid(bottom, height);

        let baseline = self.y - CELL_PADDING_Y - BODY_SIZE;
        let [number, description] = TABLE_HEADER;
        let number_x =
            MARGIN + (NUMBER_COLUMN - text_width(number, Font::Bold, BODY_SIZE)) / 2.0;
        self.page
            .text(number_x, baseline, Font::Bold, BODY_SIZE, Color::WHITE, number);
        self.page.text(
            MARGIN + NUMBER_COLUMN + CELL_PADDING_X,
            baseline,
            Font::Bold,
            BODY_SIZE,
            Color::WHITE,
            description,
        );
        self.y = bottom;
    }

    fn table_row(&mut self, index: usize, error: &str) {
        let lines = wrap_text(
            error,
            Font::Regular,
            ERROR_SIZE,
            DESCRIPTION_COLUMN - 2.0 * CELL_PADDING_X,
        );
        let height = row_height(lines.len());
        if height <= TOP - BOTTOM - table_header_height() {
            if self.reserve(height) {
                self.table_header();
            }
        } else if self.lines_fitting() == 0 {
            self.new_page();
            self.table_header();
        }

        // Rows taller than the room left continue on the next page
        let mut number = Some(index.to_string());
        let mut rest = lines.as_slice();
        loop {
            let fit = self.lines_fitting().clamp(1, rest.len());
            let (chunk, tail) = rest.split_at(fit);
            self.row_segment(number.take().as_deref(), chunk);
            rest = tail;
            if rest.is_empty() {
                break;
            }
            self.new_page();
            self.table_header();
        }
    }

    /// Wrapped error lines that still fit above the bottom margin.
    fn lines_fitting(&self) -> usize {
        let room = self.y - BOTTOM - 2.0 * CELL_PADDING_Y;
        if room < ERROR_LEADING {
            0
        } else {
            (room / ERROR_LEADING) as usize
        }
    }

    fn row_segment(&mut self, number: Option<&str>, lines: &[String]) {
        let height = row_height(lines.len());
        let bottom = self.y - height;
        self.grid(bottom, height);

        if let Some(number) = number {
            let number_x =
                MARGIN + (NUMBER_COLUMN - text_width(number, Font::Regular, BODY_SIZE)) / 2.0;
            self.page.text(
                number_x,
                self.y - CELL_PADDING_Y - BODY_SIZE,
                Font::Regular,
                BODY_SIZE,
                Color::BLACK,
                number,
            );
        }

        let mut baseline = self.y - CELL_PADDING_Y - ERROR_SIZE - 1.0;
        for line in lines {
            self.page.text(
                MARGIN + NUMBER_COLUMN + CELL_PADDING_X,
                baseline,
                Font::Regular,
                ERROR_SIZE,
                Color::BLACK,
                line,
            );
            baseline -= ERROR_LEADING;
        }
        self.y = bottom;
    }

    fn grid(&mut self, bottom: f32, height: f32) {
        self.page
            .stroke_rect(MARGIN, bottom, NUMBER_COLUMN, height, Color::GRAY, GRID_WIDTH);
        self.page.stroke_rect(
            MARGIN + NUMBER_COLUMN,
            bottom,
            DESCRIPTION_COLUMN,
            height,
            Color::GRAY,
            GRID_WIDTH,
        );
    }
}

fn table_header_height() -> f32 {
    BODY_LEADING + 2.0 * CELL_PADDING_Y
}

fn row_height(lines: usize) -> f32 {
    lines as f32 * ERROR_LEADING + 2.0 * CELL_PADDING_Y
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn timestamp() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 14)
            .unwrap()
            .and_hms_opt(9, 26, 53)
            .unwrap()
    }

    fn errors(count: usize) -> Vec<String> {
        (0..count)
            .map(|i| format!("Celda A{} bajo 'Monto' vacía.", i + 8))
            .collect()
    }

    #[test]
    fn test_acuse_without_logo() {
        let bytes = build_acuse(&errors(3), "LGT_ART70_FI", None, timestamp()).unwrap();
        assert!(bytes.starts_with(b"%PDF-"));
        assert!(bytes.ends_with(b"%%EOF\n"));
    }

    #[test]
    fn test_missing_logo_is_left_blank() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("no_existe.png");
        let document = layout_acuse(&errors(1), "NC", Some(missing.as_path()), timestamp()).unwrap();
        assert_eq!(document.page_count(), 1);
    }

    #[test]
    fn test_long_error_lists_span_pages() {
        let document = layout_acuse(&errors(150), "NC", None, timestamp()).unwrap();
        assert!(document.page_count() >= 3);

        let short = layout_acuse(&errors(5), "NC", None, timestamp()).unwrap();
        assert_eq!(short.page_count(), 1);
    }

    #[test]
    fn test_long_error_text_wraps() {
        let long = vec![format!(
            "Celda A8 ('{}') inválida. Se esperaba: Número.",
            "x ".repeat(400)
        )];
        let bytes = build_acuse(&long, "NC", None, timestamp()).unwrap();
        assert!(bytes.starts_with(b"%PDF-"));
    }

    #[test]
    fn test_row_taller_than_a_page_continues_on_next_pages() {
        let error = format!(
            "Celda A8 ('{}') inválida. Se esperaba: Número.",
            "palabra ".repeat(1500)
        );
        let wrapped = wrap_text(
            &error,
            Font::Regular,
            ERROR_SIZE,
            DESCRIPTION_COLUMN - 2.0 * CELL_PADDING_X,
        )
        .len();
        let per_page = ((TOP - BOTTOM - table_header_height() - 2.0 * CELL_PADDING_Y)
            / ERROR_LEADING) as usize;

        let mut layout = Layout::new();
        layout.table_header();
        layout.table_row(1, &error);
        assert!(layout.y >= BOTTOM);
        assert!(layout.document.page_count() + 1 >= wrapped.div_ceil(per_page));
        assert!(layout.document.page_count() >= 1);
    }

    #[test]
    fn test_logo_is_embedded_and_flattened() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logo.png");
        let mut logo = image::RgbaImage::new(2, 1);
        logo.put_pixel(0, 0, image::Rgba([255, 0, 0, 255]));
        logo.put_pixel(1, 0, image::Rgba([0, 0, 0, 0]));
        logo.save(&path).unwrap();

        let flattened = load_logo(&path).unwrap();
        assert_eq!((flattened.width, flattened.height), (2, 1));
        assert_eq!(flattened.pixels, vec![255, 0, 0, 255, 255, 255]);

        let bytes = build_acuse(&errors(2), "NC", Some(path.as_path()), timestamp()).unwrap();
        let marker: &[u8] = b"/Subtype /Image /Width 2 /Height 1";
        assert!(bytes.windows(marker.len()).any(|w| w == marker));
    }

    #[test]
    fn test_undecodable_logo_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logo.png");
        std::fs::write(&path, b"no es png").unwrap();
        assert!(matches!(
            build_acuse(&errors(1), "NC", Some(path.as_path()), timestamp()),
            Err(ReportError::ImageError(_))
        ));
    }
}
