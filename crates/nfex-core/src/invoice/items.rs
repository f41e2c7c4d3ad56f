//! Line item (`det`) extraction.

use crate::error::ExtractionError;
use crate::models::config::ExtractionConfig;
use crate::models::record::{ItemFields, Product};
use crate::models::tax::ContributionKind;

use super::scope::Scope;
use super::taxes::{read_contribution, read_icms, read_icms_uf_dest, read_ipi};

/// Read one `det` element into item fields.
pub(crate) fn read_item(det: &Scope<'_, '_>, config: &ExtractionConfig) -> Result<ItemFields, ExtractionError> {
    let prod = det.require("prod")?;
    let imposto = det.require("imposto")?;
    let digits = config.digits;
    let item_digits = config.round_item_values.then_some(digits);
    let as_text = |code: Option<String>| force_text(code, config.force_text_codes);

    let product = Product {
        code: prod.text("cProd"),
        description: prod.text("xProd"),
        ncm: prod.text("NCM"),
        ean: as_text(prod.text("cEAN")),
        ean_taxable: as_text(prod.text("cEANTrib")),
        cest: prod.text("CEST"),
        benefit_code: prod.text("cBenef"),
        anvisa_code: as_text(prod.text("med/cProdANVISA")),
        cfop: prod.text("CFOP"),
        unit: prod.text("uCom"),
        quantity: prod.amount("qCom", item_digits)?,
        unit_price: prod.amount("vUnCom", item_digits)?,
        amount: prod.amount("vProd", item_digits)?,
        discount: prod.text("vDesc"),
        taxable_unit: prod.text("uTrib"),
        taxable_quantity: prod.text("qTrib"),
    };

    Ok(ItemFields {
        position: det.node().attribute("nItem").map(str::to_string),
        product,
        total_tax_burden: imposto.text("vTotTrib"),
        icms: read_icms(&imposto, digits)?,
        pis: read_contribution(&imposto, ContributionKind::Pis, digits)?,
        cofins: read_contribution(&imposto, ContributionKind::Cofins, digits)?,
        icms_uf_dest: read_icms_uf_dest(&imposto, digits)?,
        ipi: read_ipi(&imposto, digits)?,
    })
}

/// Prefix a code with `'` so spreadsheet software keeps it as text.
fn force_text(code: Option<String>, enabled: bool) -> Option<String> {
    match code {
        Some(code) if enabled && !code.is_empty() => Some(format!("'{}", code)),
        other => other,
    }
}
