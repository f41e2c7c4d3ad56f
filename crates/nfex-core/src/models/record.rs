//! Flat output records.
//!
//! The column set and order defined here is the public contract of the
//! tabular output. Each group of fields owns a `*_COLUMNS` array and a
//! `push_*` projection that emits values in the same order; `columns()`
//! concatenates the groups.

use std::sync::Arc;

use serde::ser::{Serialize, SerializeMap, Serializer};

use super::tax::{Contribution, Icms, IcmsUfDest, Ipi, IpiShape};

/// Column header of the output file, in order.
pub fn columns() -> Vec<&'static str> {
    let mut columns = Vec::with_capacity(COLUMN_COUNT);
    columns.extend_from_slice(HEADER_COLUMNS);
    columns.extend_from_slice(PRODUCT_COLUMNS);
    columns.extend_from_slice(ICMS_COLUMNS);
    columns.extend_from_slice(PIS_COLUMNS);
    columns.extend_from_slice(COFINS_COLUMNS);
    columns.extend_from_slice(ICMS_UF_DEST_COLUMNS);
    columns.extend_from_slice(IPI_COLUMNS);
    columns.extend_from_slice(TOTALS_COLUMNS);
    columns.extend_from_slice(SOURCE_COLUMNS);
    columns
}

/// Number of output columns.
pub const COLUMN_COUNT: usize = HEADER_COLUMNS.len()
    + PRODUCT_COLUMNS.len()
    + ICMS_COLUMNS.len()
    + PIS_COLUMNS.len()
    + COFINS_COLUMNS.len()
    + ICMS_UF_DEST_COLUMNS.len()
    + IPI_COLUMNS.len()
    + TOTALS_COLUMNS.len()
    + SOURCE_COLUMNS.len();

pub const HEADER_COLUMNS: &[&str] = &[
    "xNome", "emit_CNPJ", "emit_UF", "dest_xNome", "dest_CNPJ", "dest_UF", "nNF", "refNFe",
    "chNFe", "nProt", "dEmi", "hEmi", "dSaiEnt", "hSaiEnt",
];

pub const PRODUCT_COLUMNS: &[&str] = &[
    "nItem", "cProd", "xProd", "NCM", "cEAN", "cEANTrib", "CEST", "cBenef", "cProdANVISA",
    "CFOP", "uCom", "qCom", "vUnCom", "vProd", "vDesc", "uTrib", "qTrib", "vTotTrib",
];

pub const ICMS_COLUMNS: &[&str] = &[
    "ICMS_grupo", "ICMS_orig", "ICMS_CST", "ICMS_CSOSN",
    "ICMS_vBCSTRet", "ICMS_pST", "ICMS_vICMSSTRet",
    "ICMS_modBC", "ICMS_pRedBC", "ICMS_vBC", "ICMS_pICMS", "ICMS_vICMS",
    "ICMS_vBCFCP", "ICMS_pFCP", "ICMS_vFCP",
    "ICMS_modBCST", "ICMS_pMVAST", "ICMS_vBCST", "ICMS_pICMSST", "ICMS_vICMSST",
    "ICMS_vBCFCPST", "ICMS_pFCPST", "ICMS_vFCPST",
];

pub const PIS_COLUMNS: &[&str] = &[
    "PIS_grupo", "PIS_CST", "PIS_vBC", "PIS_pPIS", "PIS_vPIS", "PIS_qBCProd", "PIS_vAliqProd",
];

pub const COFINS_COLUMNS: &[&str] = &[
    "COFINS_grupo", "COFINS_CST", "COFINS_vBC", "COFINS_pCOFINS", "COFINS_vCOFINS",
    "COFINS_qBCProd", "COFINS_vAliqProd",
];

pub const ICMS_UF_DEST_COLUMNS: &[&str] = &[
    "ICMSUFDest_vBCUFDest", "ICMSUFDest_pFCPUFDest", "ICMSUFDest_pICMSUFDest",
    "ICMSUFDest_pICMSInter", "ICMSUFDest_pICMSInterPart", "ICMSUFDest_vFCPUFDest",
    "ICMSUFDest_vICMSUFDest", "ICMSUFDest_vICMSUFRemet",
];

pub const IPI_COLUMNS: &[&str] = &[
    "IPI_cEnq", "IPI_grupo", "IPI_CST", "IPI_vBC", "IPI_pIPI", "IPI_qUnid", "IPI_vUnid",
    "IPI_vIPI",
];

pub const TOTALS_COLUMNS: &[&str] = &[
    "TOTAL_ICMS_vBC", "TOTAL_vICMS", "TOTAL_vICMSDeson", "TOTAL_vFCPUFDest",
    "TOTAL_vICMSUFDest", "TOTAL_vICMSUFRemet", "TOTAL_vFCP", "TOTAL_vBCST", "TOTAL_vST",
    "TOTAL_vFCPST", "TOTAL_vFCPSTRet", "TOTAL_vProd", "TOTAL_vFrete", "TOTAL_vSeg",
    "TOTAL_vDesc", "TOTAL_vII", "TOTAL_vIPI", "TOTAL_vIPIDevol", "TOTAL_vPIS",
    "TOTAL_vCOFINS", "TOTAL_vOutro", "TOTAL_vNF", "TOTAL_vTotTrib",
];

pub const SOURCE_COLUMNS: &[&str] = &["caminho"];

/// `ICMSTot` element names, in `TOTALS_COLUMNS` order.
pub const TOTALS_TAGS: [&str; 23] = [
    "vBC", "vICMS", "vICMSDeson", "vFCPUFDest", "vICMSUFDest", "vICMSUFRemet", "vFCP",
    "vBCST", "vST", "vFCPST", "vFCPSTRet", "vProd", "vFrete", "vSeg", "vDesc", "vII", "vIPI",
    "vIPIDevol", "vPIS", "vCOFINS", "vOutro", "vNF", "vTotTrib",
];

type Values<'a> = Vec<Option<&'a str>>;

fn push_absent(out: &mut Values<'_>, count: usize) {
    out.extend(std::iter::repeat_n(None, count));
}

/// Issuer or recipient of the invoice.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Party {
    pub name: Option<String>,
    /// CNPJ, CPF or foreign id, whichever the document carries.
    pub tax_id: Option<String>,
    pub state: Option<String>,
}

/// Document-level fields, repeated on every record of the document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentFields {
    pub issuer: Party,
    pub recipient: Party,
    pub number: Option<String>,
    pub referenced: Option<String>,
    pub access_key: Option<String>,
    pub protocol: Option<String>,
    pub issue_date: Option<String>,
    pub issue_time: Option<String>,
    pub exit_date: Option<String>,
    pub exit_time: Option<String>,
    /// `ICMSTot` values in `TOTALS_TAGS` order.
    pub totals: [Option<String>; 23],
    pub source_path: Option<String>,
}

impl DocumentFields {
    fn push_header<'a>(&'a self, out: &mut Values<'a>) {
        out.extend([
            self.issuer.name.as_deref(),
            self.issuer.tax_id.as_deref(),
            self.issuer.state.as_deref(),
            self.recipient.name.as_deref(),
            self.recipient.tax_id.as_deref(),
            self.recipient.state.as_deref(),
            self.number.as_deref(),
            self.referenced.as_deref(),
            self.access_key.as_deref(),
            self.protocol.as_deref(),
            self.issue_date.as_deref(),
            self.issue_time.as_deref(),
            self.exit_date.as_deref(),
            self.exit_time.as_deref(),
        ]);
    }

    fn push_totals<'a>(&'a self, out: &mut Values<'a>) {
        out.extend(self.totals.iter().map(|v| v.as_deref()));
    }

    /// Look up a total by its `ICMSTot` element name.
    pub fn total(&self, tag: &str) -> Option<&str> {
        TOTALS_TAGS
            .iter()
            .position(|t| *t == tag)
            .and_then(|i| self.totals[i].as_deref())
    }
}

/// Product block of a line item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Product {
    pub code: Option<String>,
    pub description: Option<String>,
    pub ncm: Option<String>,
    pub ean: Option<String>,
    pub ean_taxable: Option<String>,
    pub cest: Option<String>,
    pub benefit_code: Option<String>,
    pub anvisa_code: Option<String>,
    pub cfop: Option<String>,
    pub unit: Option<String>,
    pub quantity: Option<String>,
    pub unit_price: Option<String>,
    pub amount: Option<String>,
    pub discount: Option<String>,
    pub taxable_unit: Option<String>,
    pub taxable_quantity: Option<String>,
}

/// Item-specific fields of a record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemFields {
    /// Position declared by `nItem`, kept as text.
    pub position: Option<String>,
    pub product: Product,
    pub total_tax_burden: Option<String>,
    pub icms: Option<Icms>,
    pub pis: Option<Contribution>,
    pub cofins: Option<Contribution>,
    pub icms_uf_dest: Option<IcmsUfDest>,
    pub ipi: Option<Ipi>,
}

impl ItemFields {
    fn push_product<'a>(&'a self, out: &mut Values<'a>) {
        let p = &self.product;
        out.extend([
            self.position.as_deref(),
            p.code.as_deref(),
            p.description.as_deref(),
            p.ncm.as_deref(),
            p.ean.as_deref(),
            p.ean_taxable.as_deref(),
            p.cest.as_deref(),
            p.benefit_code.as_deref(),
            p.anvisa_code.as_deref(),
            p.cfop.as_deref(),
            p.unit.as_deref(),
            p.quantity.as_deref(),
            p.unit_price.as_deref(),
            p.amount.as_deref(),
            p.discount.as_deref(),
            p.taxable_unit.as_deref(),
            p.taxable_quantity.as_deref(),
            self.total_tax_burden.as_deref(),
        ]);
    }

    fn push_icms<'a>(&'a self, group: &'a Option<String>, out: &mut Values<'a>) {
        let Some(icms) = &self.icms else {
            push_absent(out, ICMS_COLUMNS.len());
            return;
        };
        out.extend([group.as_deref(), icms.orig.as_deref(), icms.cst(), icms.csosn()]);

        match icms.groups.retained() {
            Some(r) => out.extend([
                r.v_bc_st_ret.as_deref(),
                r.p_st.as_deref(),
                r.v_icms_st_ret.as_deref(),
            ]),
            None => push_absent(out, 3),
        }
        match icms.groups.own() {
            Some(o) => out.extend([
                o.mod_bc.as_deref(),
                o.p_red_bc.as_deref(),
                o.v_bc.as_deref(),
                o.p_icms.as_deref(),
                o.v_icms.as_deref(),
                o.v_bc_fcp.as_deref(),
                o.p_fcp.as_deref(),
                o.v_fcp.as_deref(),
            ]),
            None => push_absent(out, 8),
        }
        match icms.groups.forward() {
            Some(f) => out.extend([
                f.mod_bc_st.as_deref(),
                f.p_mva_st.as_deref(),
                f.v_bc_st.as_deref(),
                f.p_icms_st.as_deref(),
                f.v_icms_st.as_deref(),
                f.v_bc_fcp_st.as_deref(),
                f.p_fcp_st.as_deref(),
                f.v_fcp_st.as_deref(),
            ]),
            None => push_absent(out, 8),
        }
    }

    fn push_contribution<'a>(
        contribution: Option<&'a Contribution>,
        group: &'a Option<String>,
        out: &mut Values<'a>,
    ) {
        let Some(c) = contribution else {
            push_absent(out, PIS_COLUMNS.len());
            return;
        };
        out.extend([
            group.as_deref(),
            c.cst.as_deref(),
            c.v_bc.as_deref(),
            c.rate.as_deref(),
            c.amount.as_deref(),
            c.q_bc_prod.as_deref(),
            c.v_aliq_prod.as_deref(),
        ]);
    }

    fn push_icms_uf_dest<'a>(&'a self, out: &mut Values<'a>) {
        let Some(d) = &self.icms_uf_dest else {
            push_absent(out, ICMS_UF_DEST_COLUMNS.len());
            return;
        };
        out.extend([
            d.v_bc_uf_dest.as_deref(),
            d.p_fcp_uf_dest.as_deref(),
            d.p_icms_uf_dest.as_deref(),
            d.p_icms_inter.as_deref(),
            d.p_icms_inter_part.as_deref(),
            d.v_fcp_uf_dest.as_deref(),
            d.v_icms_uf_dest.as_deref(),
            d.v_icms_uf_remet.as_deref(),
        ]);
    }

    fn push_ipi<'a>(&'a self, out: &mut Values<'a>) {
        let Some(ipi) = &self.ipi else {
            push_absent(out, IPI_COLUMNS.len());
            return;
        };
        out.push(ipi.c_enq.as_deref());
        let Some(shape) = &ipi.shape else {
            push_absent(out, IPI_COLUMNS.len() - 1);
            return;
        };
        out.push(Some(shape.tag()));
        match shape {
            IpiShape::NotTaxed { cst } => {
                out.push(cst.as_deref());
                push_absent(out, 5);
            }
            IpiShape::Taxed {
                cst,
                v_bc,
                p_ipi,
                q_unid,
                v_unid,
                v_ipi,
            } => out.extend([
                cst.as_deref(),
                v_bc.as_deref(),
                p_ipi.as_deref(),
                q_unid.as_deref(),
                v_unid.as_deref(),
                v_ipi.as_deref(),
            ]),
        }
    }
}

/// One output row per line item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Shared by every record of the same document.
    pub document: Arc<DocumentFields>,
    pub item: ItemFields,
    // Regime tags, rendered once at construction.
    icms_group: Option<String>,
    pis_group: Option<String>,
    cofins_group: Option<String>,
}

impl Record {
    pub fn new(document: Arc<DocumentFields>, item: ItemFields) -> Self {
        let icms_group = item.icms.as_ref().map(|i| i.regime.tag());
        let pis_group = item.pis.as_ref().map(Contribution::tag);
        let cofins_group = item.cofins.as_ref().map(Contribution::tag);
        Self {
            document,
            item,
            icms_group,
            pis_group,
            cofins_group,
        }
    }

    /// Cell values in `columns()` order; `None` renders as an empty cell.
    pub fn values(&self) -> Vec<Option<&str>> {
        let mut out = Vec::with_capacity(COLUMN_COUNT);
        self.document.push_header(&mut out);
        self.item.push_product(&mut out);
        self.item.push_icms(&self.icms_group, &mut out);
        ItemFields::push_contribution(self.item.pis.as_ref(), &self.pis_group, &mut out);
        ItemFields::push_contribution(self.item.cofins.as_ref(), &self.cofins_group, &mut out);
        self.item.push_icms_uf_dest(&mut out);
        self.item.push_ipi(&mut out);
        self.document.push_totals(&mut out);
        out.push(self.document.source_path.as_deref());
        out
    }

    /// Value of a single column by header name.
    pub fn get(&self, column: &str) -> Option<&str> {
        let index = columns().iter().position(|c| *c == column)?;
        self.values()[index]
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(COLUMN_COUNT))?;
        for (column, value) in columns().into_iter().zip(self.values()) {
            map.serialize_entry(column, &value)?;
        }
        map.end()
    }
}

/// A row of the output stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Row {
    Record(Record),
    /// Blank row grouping records by source document.
    Separator,
}

impl Row {
    pub fn values(&self) -> Vec<Option<&str>> {
        match self {
            Row::Record(record) => record.values(),
            Row::Separator => vec![None; COLUMN_COUNT],
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Row::Record(record) => Some(record),
            Row::Separator => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tax::{
        ContributionKind, ContributionRegime, IcmsGroups, IcmsRegime, OwnOperation,
        RetainedSubstitution,
    };
    use pretty_assertions::assert_eq;

    fn full_item() -> ItemFields {
        ItemFields {
            position: Some("1".into()),
            icms: Some(Icms {
                regime: IcmsRegime::Normal("00".into()),
                orig: Some("0".into()),
                code: Some("00".into()),
                groups: IcmsGroups::Own {
                    own: OwnOperation {
                        v_icms: Some("18.00".into()),
                        ..Default::default()
                    },
                },
            }),
            pis: Some(Contribution {
                kind: ContributionKind::Pis,
                regime: ContributionRegime::Rate,
                cst: Some("01".into()),
                v_bc: None,
                rate: Some("1.65".into()),
                amount: None,
                q_bc_prod: None,
                v_aliq_prod: None,
            }),
            cofins: None,
            icms_uf_dest: Some(IcmsUfDest::default()),
            ipi: Some(Ipi {
                c_enq: Some("999".into()),
                shape: Some(IpiShape::NotTaxed {
                    cst: Some("53".into()),
                }),
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_column_names_are_unique() {
        let columns = columns();
        let mut sorted = columns.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), columns.len());
        assert_eq!(columns.len(), COLUMN_COUNT);
    }

    #[test]
    fn test_values_align_with_columns() {
        let document = Arc::new(DocumentFields::default());
        let empty = Record::new(document.clone(), ItemFields::default());
        assert_eq!(empty.values().len(), COLUMN_COUNT);

        let full = Record::new(document, full_item());
        assert_eq!(full.values().len(), COLUMN_COUNT);
        assert_eq!(Row::Separator.values().len(), COLUMN_COUNT);
    }

    #[test]
    fn test_get_by_column() {
        let mut document = DocumentFields {
            number: Some("123".into()),
            source_path: Some("a/b.xml".into()),
            ..Default::default()
        };
        document.totals[21] = Some("100.00".into());
        let record = Record::new(Arc::new(document), full_item());

        assert_eq!(record.get("nNF"), Some("123"));
        assert_eq!(record.get("TOTAL_vNF"), Some("100.00"));
        assert_eq!(record.get("ICMS_grupo"), Some("ICMS00"));
        assert_eq!(record.get("ICMS_orig"), Some("0"));
        assert_eq!(record.get("PIS_grupo"), Some("PISAliq"));
        assert_eq!(record.get("PIS_pPIS"), Some("1.65"));
        assert_eq!(record.get("COFINS_CST"), None);
        assert_eq!(record.get("IPI_cEnq"), Some("999"));
        assert_eq!(record.get("IPI_grupo"), Some("IPINT"));
        assert_eq!(record.get("IPI_CST"), Some("53"));
        assert_eq!(record.get("IPI_vIPI"), None);
        assert_eq!(record.get("caminho"), Some("a/b.xml"));
        assert_eq!(record.get("no-such-column"), None);
    }

    #[test]
    fn test_icms_columns_follow_regime_groups() {
        let document = Arc::new(DocumentFields::default());
        let record = Record::new(document.clone(), full_item());
        assert_eq!(record.get("ICMS_CST"), Some("00"));
        assert_eq!(record.get("ICMS_CSOSN"), None);
        assert_eq!(record.get("ICMS_vICMS"), Some("18.00"));
        assert_eq!(record.get("ICMS_vBCSTRet"), None);
        assert_eq!(record.get("ICMS_vICMSST"), None);

        let simplified = ItemFields {
            icms: Some(Icms {
                regime: IcmsRegime::Simplified("500".into()),
                orig: Some("0".into()),
                code: Some("500".into()),
                groups: IcmsGroups::Retained {
                    retained: RetainedSubstitution {
                        v_icms_st_ret: Some("1.8222".into()),
                        ..Default::default()
                    },
                },
            }),
            ..Default::default()
        };
        let record = Record::new(document, simplified);
        assert_eq!(record.values().len(), COLUMN_COUNT);
        assert_eq!(record.get("ICMS_grupo"), Some("ICMSSN500"));
        assert_eq!(record.get("ICMS_CST"), None);
        assert_eq!(record.get("ICMS_CSOSN"), Some("500"));
        assert_eq!(record.get("ICMS_vICMSSTRet"), Some("1.8222"));
        assert_eq!(record.get("ICMS_vICMS"), None);
    }

    #[test]
    fn test_total_lookup() {
        let mut document = DocumentFields::default();
        document.totals[0] = Some("10.00".into());
        assert_eq!(document.total("vBC"), Some("10.00"));
        assert_eq!(document.total("vNF"), None);
        assert_eq!(document.total("bogus"), None);
        assert_eq!(TOTALS_TAGS.len(), TOTALS_COLUMNS.len());
    }

    #[test]
    fn test_record_serializes_as_column_map() {
        let document = Arc::new(DocumentFields {
            number: Some("7".into()),
            ..Default::default()
        });
        let record = Record::new(document, ItemFields::default());
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["nNF"], serde_json::json!("7"));
        assert_eq!(json["xNome"], serde_json::Value::Null);
        assert_eq!(json.as_object().unwrap().len(), COLUMN_COUNT);
    }
}
