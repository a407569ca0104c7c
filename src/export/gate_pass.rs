use serde::Serialize;
use tera::{Context, Tera};

use crate::{
    entities::{device, outward_record},
    errors::ServiceError,
};

const TEMPLATE: &str = include_str!("../../templates/gate_pass.html");

#[derive(Serialize)]
struct GatePassLine<'a> {
    index: usize,
    barcode: &'a str,
    brand: &'a str,
    model: &'a str,
    serial_number: &'a str,
    grade: String,
}

/// Renders the delivery note that travels with a dispatch. Printing to PDF
/// is left to the browser.
#[derive(Debug, Clone, Default)]
pub struct GatePassRenderer;

impl GatePassRenderer {
    pub fn new() -> Self {
        Self
    }

    pub fn render(
        &self,
        record: &outward_record::Model,
        devices: &[device::Model],
    ) -> Result<String, ServiceError> {
        let lines: Vec<GatePassLine<'_>> = devices
            .iter()
            .enumerate()
            .map(|(i, d)| GatePassLine {
                index: i + 1,
                barcode: &d.barcode,
                brand: &d.brand,
                model: &d.model,
                serial_number: d.serial_number.as_deref().unwrap_or("-"),
                grade: d
                    .grade
                    .map(|g| format!("{:?}", g))
                    .unwrap_or_else(|| "-".to_string()),
            })
            .collect();

        let mut context = Context::new();
        context.insert("outward_number", &record.outward_number);
        context.insert("outward_type", &record.outward_type.to_string());
        context.insert("customer_name", &record.customer_name);
        context.insert("reference_number", &record.reference_number);
        context.insert("shipping_details", &record.shipping_details);
        context.insert("notes", &record.notes);
        context.insert(
            "dispatched_at",
            &record.dispatched_at.format("%d %b %Y %H:%M UTC").to_string(),
        );
        context.insert("lines", &lines);
        context.insert("device_count", &lines.len());

        Ok(Tera::one_off(TEMPLATE, &context, true)?)
    }
}
