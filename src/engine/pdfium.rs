//! PDFium-backed rendering engine

use crate::document::validate_pdf_header;
use crate::engine::{DocumentInfo, RenderEngine, RenderedPage};
use crate::error::{Error, Result};
use crate::viewer::geometry::Size;
use crate::viewer::render_window::RenderKey;
use pdfium_render::prelude::*;
use std::path::PathBuf;

/// Directories searched for the PDFium shared library before the system paths
const DEFAULT_LIBRARY_DIRS: [&str; 2] = ["./", "/opt/pdfium/lib"];

/// Binds PDFium afresh for every call (PDFium is not thread-safe)
#[derive(Debug, Clone)]
pub struct PdfiumEngine {
    library_dirs: Vec<PathBuf>,
}

impl Default for PdfiumEngine {
    fn default() -> Self {
        Self::with_library_dirs(DEFAULT_LIBRARY_DIRS.iter().map(PathBuf::from))
    }
}

impl PdfiumEngine {
    pub fn with_library_dirs<I: IntoIterator<Item = PathBuf>>(dirs: I) -> Self {
        Self {
            library_dirs: dirs.into_iter().collect(),
        }
    }

    fn bind(&self) -> Result<Pdfium> {
        for dir in &self.library_dirs {
            let path = Pdfium::pdfium_platform_library_name_at_path(dir);
            if let Ok(bindings) = Pdfium::bind_to_library(&path) {
                return Ok(Pdfium::new(bindings));
            }
        }

        let bindings = Pdfium::bind_to_system_library().map_err(|e| Error::Pdfium {
            reason: format!("Failed to initialize PDFium: {}", e),
        })?;
        Ok(Pdfium::new(bindings))
    }
}

fn map_pdfium_error(err: PdfiumError) -> Error {
    match err {
        PdfiumError::PdfiumLibraryInternalError(PdfiumInternalError::PasswordError) => {
            Error::PasswordRequired
        }
        _ => Error::Pdfium {
            reason: format!("{}", err),
        },
    }
}

impl RenderEngine for PdfiumEngine {
    fn inspect(&self, data: &[u8]) -> Result<DocumentInfo> {
        validate_pdf_header(data)?;

        let pdfium = self.bind()?;
        let document = pdfium
            .load_pdf_from_byte_slice(data, None)
            .map_err(map_pdfium_error)?;

        let pages = document.pages();
        let mut page_sizes = Vec::with_capacity(pages.len() as usize);
        for index in 0..pages.len() {
            let page = pages.get(index).map_err(|e| Error::Pdfium {
                reason: format!("Failed to get page {}: {}", index + 1, e),
            })?;
            page_sizes.push(Size::new(
                f64::from(page.width().value),
                f64::from(page.height().value),
            ));
        }

        Ok(DocumentInfo {
            page_count: page_sizes.len() as u32,
            page_sizes,
        })
    }

    fn render_page(
        &self,
        data: &[u8],
        key: RenderKey,
        target_width: u32,
    ) -> Result<RenderedPage> {
        validate_pdf_header(data)?;

        let pdfium = self.bind()?;
        let document = pdfium
            .load_pdf_from_byte_slice(data, None)
            .map_err(map_pdfium_error)?;

        let pages = document.pages();
        let total = pages.len() as u32;
        if key.page < 1 || key.page > total {
            return Err(Error::PageOutOfBounds {
                page: key.page,
                total,
            });
        }

        let page = pages.get((key.page - 1) as u16).map_err(|e| Error::Pdfium {
            reason: format!("Failed to get page {}: {}", key.page, e),
        })?;

        let config = PdfRenderConfig::new()
            .set_target_width(target_width.max(1) as i32)
            .render_form_data(true)
            .render_annotations(true);

        let bitmap = page.render_with_config(&config).map_err(|e| Error::Pdfium {
            reason: format!("Failed to render page {}: {}", key.page, e),
        })?;

        let dynamic_image = bitmap.as_image();
        let (width, height) = (dynamic_image.width(), dynamic_image.height());

        let mut png = Vec::new();
        dynamic_image.write_to(
            &mut std::io::Cursor::new(&mut png),
            image::ImageFormat::Png,
        )?;

        Ok(RenderedPage {
            key,
            width,
            height,
            png,
        })
    }
}
