//! PDF invoice rendering.
//!
//! Renders an [`Order`] snapshot into a byte buffer. The layout is plain
//! text on an A4 page: a header with the order id, one line per item, and a
//! total recomputed from the snapshotted lines. Purely presentational; the
//! order is never mutated.

use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfLayerReference};
use thiserror::Error;

use crate::models::{Order, OrderItem};

/// A4 page dimensions in millimeters.
const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;

/// Left margin for all text.
const MARGIN_LEFT: f32 = 20.0;

/// Vertical start position and per-line advance.
const TOP_Y: f32 = 270.0;
const LINE_HEIGHT: f32 = 9.0;

/// Start a new page once text would go below this.
const BOTTOM_Y: f32 = 25.0;

const SEPARATOR: &str = "-------------------------------";

/// Errors that can occur when rendering an invoice.
#[derive(Debug, Error)]
pub enum InvoiceError {
    /// PDF generation failed.
    #[error("PDF error: {0}")]
    Pdf(String),
}

/// Render an order as a PDF invoice and return the document bytes.
///
/// # Errors
///
/// Returns `InvoiceError::Pdf` if document assembly fails.
pub fn render(order: &Order) -> Result<Vec<u8>, InvoiceError> {
    let (doc, page, layer) = PdfDocument::new(
        format!("invoice-{}", order.id),
        Mm(PAGE_WIDTH),
        Mm(PAGE_HEIGHT),
        "invoice",
    );
    let regular = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| InvoiceError::Pdf(e.to_string()))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| InvoiceError::Pdf(e.to_string()))?;

    let mut writer = LineWriter {
        doc: &doc,
        layer: doc.get_page(page).get_layer(layer),
        y: TOP_Y,
    };

    writer.line(&format!("INVOICE - Order {}", order.id), 16.0, &bold);
    writer.line(SEPARATOR, 14.0, &regular);

    for item in &order.items {
        writer.line(&item_line(item), 14.0, &regular);
    }

    writer.line(SEPARATOR, 14.0, &regular);
    writer.line(&format!("Total: ${:.2}", order.total()), 16.0, &bold);

    doc.save_to_bytes()
        .map_err(|e| InvoiceError::Pdf(e.to_string()))
}

/// Format one item line: `title - $price (Quantity: n)`.
fn item_line(item: &OrderItem) -> String {
    format!(
        "{} - ${:.2} (Quantity: {})",
        item.title, item.unit_price, item.quantity
    )
}

/// Cursor that writes text lines top-down, breaking onto new pages.
struct LineWriter<'a> {
    doc: &'a printpdf::PdfDocumentReference,
    layer: PdfLayerReference,
    y: f32,
}

impl LineWriter<'_> {
    fn line(&mut self, text: &str, size: f32, font: &IndirectFontRef) {
        if self.y < BOTTOM_Y {
            let (page, layer) = self
                .doc
                .add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "invoice");
            self.layer = self.doc.get_page(page).get_layer(layer);
            self.y = TOP_Y;
        }

        self.layer
            .use_text(text, size, Mm(MARGIN_LEFT), Mm(self.y), font);
        self.y -= LINE_HEIGHT;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use pomelo_core::{OrderId, ProductId, UserId};
    use rust_decimal::Decimal;

    use super::*;

    fn sample_order(item_count: u32) -> Order {
        Order {
            id: OrderId::new(7),
            user_id: UserId::new(1),
            user_name: "Ada".to_string(),
            items: (0..item_count)
                .map(|i| OrderItem {
                    product_id: ProductId::new(i32::try_from(i).unwrap() + 1),
                    title: format!("item {i}"),
                    unit_price: Decimal::new(12_50, 2),
                    quantity: 2,
                })
                .collect(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_render_produces_pdf_bytes() {
        let bytes = render(&sample_order(2)).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        assert!(bytes.len() > 500);
    }

    #[test]
    fn test_render_handles_long_orders() {
        // Enough items to force a page break
        let bytes = render(&sample_order(60)).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_item_line_format() {
        let item = OrderItem {
            product_id: ProductId::new(1),
            title: "apples".to_string(),
            unit_price: Decimal::new(4_50, 2),
            quantity: 3,
        };
        assert_eq!(item_line(&item), "apples - $4.50 (Quantity: 3)");
    }
}
