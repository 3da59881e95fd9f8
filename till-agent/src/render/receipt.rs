//! Receipt renderer
//!
//! Pure assembly of an order, a template and a printer config into printer
//! bytes. No I/O and no clock reads, so identical inputs always produce
//! byte-identical output. Sections walk in a fixed order; the template's
//! visibility flags are authoritative (a kitchen template omits money even
//! when the order carries prices), and missing order fields render blank
//! instead of aborting the receipt.

use till_printer::EscPosBuilder;

use crate::models::{FontSize, Order, PrinterConfig, TemplateConfig};
use crate::utils::time::format_millis;

/// Lines fed before the cut so the text clears the tear bar
const TAIL_FEED: u8 = 4;

/// Store fields stamped onto receipts, snapshotted from settings
#[derive(Debug, Clone, Default)]
pub struct StoreSnapshot {
    pub name: String,
    pub address: String,
    pub phone: String,
    pub currency_symbol: String,
}

/// Renders orders into printer byte streams
pub struct ReceiptRenderer {
    store: StoreSnapshot,
}

impl ReceiptRenderer {
    pub fn new(store: StoreSnapshot) -> Self {
        Self { store }
    }

    /// Render one receipt. Deterministic and side-effect free.
    pub fn render(
        &self,
        order: &Order,
        template: &TemplateConfig,
        printer: &PrinterConfig,
    ) -> Vec<u8> {
        let mut b = EscPosBuilder::new(printer.columns(), printer.brand);

        self.render_store_info(&mut b, template, printer);
        self.render_order_info(&mut b, order, template);
        self.render_customer_info(&mut b, order, template, printer);
        self.render_items(&mut b, order, template, printer);
        self.render_totals(&mut b, order, template);
        self.render_payment(&mut b, order, template);
        self.render_footer(&mut b, order, template, printer);

        if printer.auto_cut {
            b.cut_feed(TAIL_FEED);
        } else {
            b.feed(TAIL_FEED);
        }
        b.build()
    }

    fn render_store_info(
        &self,
        b: &mut EscPosBuilder,
        template: &TemplateConfig,
        printer: &PrinterConfig,
    ) {
        if !template.show_store_info || !printer.print_store_info {
            return;
        }
        b.center();
        if template.show_store_name && !self.store.name.is_empty() {
            b.double_size();
            b.bold();
            b.line(&self.store.name);
            b.bold_off();
            b.reset_size();
        }
        if template.show_store_address && !self.store.address.is_empty() {
            b.wrapped(&self.store.address);
        }
        if template.show_store_phone && !self.store.phone.is_empty() {
            b.line(&format!("Tel: {}", self.store.phone));
        }
        b.left();
        b.sep_double();
    }

    fn render_order_info(&self, b: &mut EscPosBuilder, order: &Order, template: &TemplateConfig) {
        if !template.show_order_info {
            return;
        }
        if template.show_order_number {
            b.bold();
            b.line_lr("Order #:", &order.number);
            b.bold_off();
        }
        if template.show_order_date {
            b.line_lr("Date:", &format_millis(order.date_created));
        }
        b.sep_single();
    }

    fn render_customer_info(
        &self,
        b: &mut EscPosBuilder,
        order: &Order,
        template: &TemplateConfig,
        printer: &PrinterConfig,
    ) {
        if !template.show_customer_info || !printer.print_customer_info {
            return;
        }
        let delivery = template
            .show_delivery_info
            .then_some(order.fulfillment.as_ref())
            .flatten();
        let has_content = (template.show_customer_name && !order.customer_name.is_empty())
            || (template.show_customer_phone && !order.contact_info.is_empty())
            || !order.billing_info.is_empty()
            || delivery.is_some();
        if !has_content {
            return;
        }

        b.bold();
        b.line("CUSTOMER");
        b.bold_off();
        if template.show_customer_name && !order.customer_name.is_empty() {
            b.line_lr("Name:", &order.customer_name);
        }
        if template.show_customer_phone && !order.contact_info.is_empty() {
            b.line_lr("Contact:", &order.contact_info);
        }
        if !order.billing_info.is_empty() {
            b.wrapped(&order.billing_info);
        }
        if let Some(info) = delivery {
            if !info.method.is_empty() {
                b.line_lr("Method:", &info.method);
            }
            if !info.delivery_address.is_empty() {
                b.wrapped(&info.delivery_address);
            }
            if !info.delivery_time.is_empty() {
                b.line_lr("Deliver at:", &info.delivery_time);
            }
            if !info.delivery_fee.is_empty() {
                b.line_lr("Delivery fee:", &self.price(&info.delivery_fee));
            }
            if !info.tip.is_empty() {
                b.line_lr("Tip:", &self.price(&info.tip));
            }
        }
        b.sep_single();
    }

    fn render_items(
        &self,
        b: &mut EscPosBuilder,
        order: &Order,
        template: &TemplateConfig,
        printer: &PrinterConfig,
    ) {
        if !template.show_order_content {
            return;
        }
        b.bold();
        b.line("ITEMS");
        b.bold_off();

        let large = printer.font_size == FontSize::Large;
        for item in &order.items {
            let label = if item.quantity > 1 {
                format!("{} x{}", item.name, item.quantity)
            } else {
                item.name.clone()
            };

            if large {
                b.double_height();
            }
            if template.show_item_prices {
                b.line_lr(&label, &self.price(&item.price));
            } else {
                b.wrapped(&label);
            }
            if large {
                b.reset_size();
            }

            if template.show_item_details && printer.print_item_details {
                for option in &item.options {
                    b.line(&format!("  - {}: {}", option.name, option.value));
                }
            }
        }

        if template.show_order_notes && printer.print_order_notes && !order.notes.is_empty() {
            b.sep_single();
            b.bold();
            b.line("Notes:");
            b.bold_off();
            b.wrapped(&order.notes);
        }
        b.sep_single();
    }

    fn render_totals(&self, b: &mut EscPosBuilder, order: &Order, template: &TemplateConfig) {
        if !template.show_totals {
            return;
        }
        b.bold();
        b.line_lr("Total:", &self.price(&order.total));
        b.bold_off();
    }

    fn render_payment(&self, b: &mut EscPosBuilder, order: &Order, template: &TemplateConfig) {
        if !template.show_payment_info {
            return;
        }
        b.line_lr("Payment:", &order.payment_method);
    }

    fn render_footer(
        &self,
        b: &mut EscPosBuilder,
        order: &Order,
        template: &TemplateConfig,
        printer: &PrinterConfig,
    ) {
        if !template.show_footer || !printer.print_footer {
            return;
        }
        b.sep_double();
        b.center();
        if !template.footer_text.is_empty() {
            b.wrapped(&template.footer_text);
        }
        if template.show_order_number && !order.number.is_empty() {
            b.newline();
            b.barcode(&order.number, 80);
        }
        b.left();
    }

    /// Currency-prefixed amount; blank stays blank.
    fn price(&self, amount: &str) -> String {
        if amount.is_empty() {
            String::new()
        } else {
            format!("{}{}", self.store.currency_symbol, amount)
        }
    }
}

/// Test page for manual printer verification
///
/// Store name, printer metadata and font/alignment samples; dispatched
/// through a plain `print` with no retry since an operator is watching.
pub fn test_page(printer: &PrinterConfig, store_name: &str) -> Vec<u8> {
    let mut b = EscPosBuilder::new(printer.columns(), printer.brand);

    b.center();
    b.bold();
    if !store_name.is_empty() {
        b.line(store_name);
    }
    b.line("PRINTER TEST PAGE");
    b.bold_off();
    b.left();
    b.sep_single();

    b.line_lr("Printer:", printer.display_name());
    b.line_lr("Address:", &printer.address);
    b.line_lr("Columns:", &printer.columns().to_string());

    b.sep_single();
    b.line("normal text");
    b.bold();
    b.line("bold text");
    b.bold_off();
    b.left();
    b.line("left");
    b.center();
    b.line("center");
    b.right();
    b.line("right");
    b.left();
    b.line("0123456789");

    b.sep_single();
    b.center();
    b.line("test complete");
    b.left();
    b.cut_feed(TAIL_FEED);
    b.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        FulfillmentInfo, ItemOption, OrderItem, PaperWidth, TemplateType, TransportKind,
    };

    fn store() -> StoreSnapshot {
        StoreSnapshot {
            name: "Golden Wok".to_string(),
            address: "12 High Street".to_string(),
            phone: "555-0199".to_string(),
            currency_symbol: "$".to_string(),
        }
    }

    fn order() -> Order {
        Order {
            id: 1042,
            number: "1042".to_string(),
            status: "processing".to_string(),
            date_created: 1705912335000,
            total: "24.90".to_string(),
            customer_name: "Alex Doe".to_string(),
            contact_info: "555-0123".to_string(),
            billing_info: "7 Rose Lane".to_string(),
            payment_method: "card".to_string(),
            notes: "extra spicy".to_string(),
            items: vec![
                OrderItem {
                    name: "Pad Thai".to_string(),
                    quantity: 2,
                    price: "9.50".to_string(),
                    options: vec![ItemOption {
                        name: "Size".to_string(),
                        value: "Large".to_string(),
                    }],
                },
                OrderItem {
                    name: "Spring Rolls".to_string(),
                    quantity: 1,
                    price: "5.90".to_string(),
                    options: vec![],
                },
            ],
            fulfillment: Some(FulfillmentInfo {
                method: "delivery".to_string(),
                delivery_address: "7 Rose Lane".to_string(),
                delivery_time: "18:30".to_string(),
                delivery_fee: "2.50".to_string(),
                tip: "1.00".to_string(),
            }),
        }
    }

    fn printer() -> PrinterConfig {
        let mut config = PrinterConfig::new("BT-58mm", TransportKind::Bluetooth, "00:11:62:AA:BB:CC");
        config.paper_width = PaperWidth::Mm58;
        config
    }

    fn rendered_text(data: &[u8]) -> String {
        String::from_utf8_lossy(data).to_string()
    }

    #[test]
    fn test_render_is_deterministic() {
        let renderer = ReceiptRenderer::new(store());
        let template = TemplateConfig::default_for(TemplateType::FullDetails);
        let first = renderer.render(&order(), &template, &printer());
        let second = renderer.render(&order(), &template, &printer());
        assert_eq!(first, second);
    }

    #[test]
    fn test_full_details_has_money_sections() {
        let renderer = ReceiptRenderer::new(store());
        let template = TemplateConfig::default_for(TemplateType::FullDetails);
        let text = rendered_text(&renderer.render(&order(), &template, &printer()));

        assert!(text.contains("Golden Wok"));
        assert!(text.contains("1042"));
        assert!(text.contains("$9.50"));
        assert!(text.contains("Total:"));
        assert!(text.contains("$24.90"));
        assert!(text.contains("card"));
        assert!(text.contains("Thank you for your order!"));
    }

    #[test]
    fn test_kitchen_excludes_prices_and_payment() {
        let renderer = ReceiptRenderer::new(store());
        let template = TemplateConfig::default_for(TemplateType::Kitchen);
        let data = renderer.render(&order(), &template, &printer());
        let text = rendered_text(&data);

        // Items, quantities and notes survive
        assert!(text.contains("Pad Thai x2"));
        assert!(text.contains("Spring Rolls"));
        assert!(text.contains("extra spicy"));
        // Money never reaches the kitchen, even though the order has it
        assert!(!text.contains("9.50"));
        assert!(!text.contains("24.90"));
        assert!(!text.contains("card"));
        assert!(!text.contains("Total:"));
    }

    #[test]
    fn test_kitchen_ticket_ends_with_cut() {
        let renderer = ReceiptRenderer::new(store());
        let template = TemplateConfig::default_for(TemplateType::Kitchen);
        let data = renderer.render(&order(), &template, &printer());

        // GS V 66 n cut, then the CJK-mode release appended by the encoder
        let tail = [0x1D, 0x56, 0x42, TAIL_FEED, 0x1C, 0x2E];
        assert!(data.ends_with(&tail));
    }

    #[test]
    fn test_missing_fields_render_blank() {
        let renderer = ReceiptRenderer::new(StoreSnapshot::default());
        let template = TemplateConfig::default_for(TemplateType::FullDetails);
        let empty = Order {
            id: 7,
            ..Order::default()
        };
        let text = rendered_text(&renderer.render(&empty, &template, &printer()));

        assert!(!text.contains("null"));
        // The order-info section still renders, with a blank number
        assert!(text.contains("Order #:"));
    }

    #[test]
    fn test_delivery_template_shows_fulfillment() {
        let renderer = ReceiptRenderer::new(store());
        let template = TemplateConfig::default_for(TemplateType::Delivery);
        let text = rendered_text(&renderer.render(&order(), &template, &printer()));

        assert!(text.contains("delivery"));
        assert!(text.contains("7 Rose Lane"));
        assert!(text.contains("18:30"));
        assert!(text.contains("$2.50"));
    }

    #[test]
    fn test_paper_width_changes_separator() {
        let renderer = ReceiptRenderer::new(store());
        let template = TemplateConfig::default_for(TemplateType::FullDetails);

        let narrow = rendered_text(&renderer.render(&order(), &template, &printer()));
        let mut wide_printer = printer();
        wide_printer.paper_width = PaperWidth::Mm80;
        let wide = rendered_text(&renderer.render(&order(), &template, &wide_printer));

        assert!(narrow.contains(&"=".repeat(32)));
        assert!(!narrow.contains(&"=".repeat(48)));
        assert!(wide.contains(&"=".repeat(48)));
    }

    #[test]
    fn test_test_page_mentions_printer() {
        let data = test_page(&printer(), "Golden Wok");
        let text = rendered_text(&data);
        assert!(text.contains("PRINTER TEST PAGE"));
        assert!(text.contains("00:11:62:AA:BB:CC"));
    }
}
