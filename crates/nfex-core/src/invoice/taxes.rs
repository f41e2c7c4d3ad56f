//! Decoding of the `imposto` sub-blocks into tagged tax groups.

use tracing::trace;

use crate::error::ExtractionError;
use crate::models::tax::{
    Contribution, ContributionKind, ContributionRegime, ForwardSubstitution, Icms, IcmsGroups,
    IcmsLayout, IcmsRegime, IcmsUfDest, Ipi, IpiShape, OwnOperation, RetainedSubstitution,
};
use crate::xml::{NFE_NAMESPACE, local_name};

use super::scope::Scope;

type Result<T> = std::result::Result<T, ExtractionError>;

/// Decode `<ICMS>`.
///
/// An absent container, or one without element children, is legitimate for
/// service lines and yields `None`.
pub(crate) fn read_icms(imposto: &Scope<'_, '_>, digits: u32) -> Result<Option<Icms>> {
    let Some(container) = imposto.at("ICMS") else {
        return Ok(None);
    };
    let Some(group) = container.single_child()? else {
        return Ok(None);
    };
    let regime = IcmsRegime::from_tag(group.tag()).ok_or_else(|| unknown_variant(&container, &group))?;
    trace!("{} decoded as {:?}", group.path(), regime);

    let code = if regime.is_simplified() {
        group.text("CSOSN")
    } else {
        group.text("CST")
    };

    let groups = match regime.layout() {
        IcmsLayout::CodesOnly => IcmsGroups::CodesOnly,
        IcmsLayout::Own => IcmsGroups::Own {
            own: read_own_operation(&group, digits)?,
        },
        IcmsLayout::OwnAndForward => IcmsGroups::OwnAndForward {
            own: read_own_operation(&group, digits)?,
            forward: read_forward_substitution(&group, digits)?,
        },
        IcmsLayout::Forward => IcmsGroups::Forward {
            forward: read_forward_substitution(&group, digits)?,
        },
        IcmsLayout::Retained => IcmsGroups::Retained {
            retained: read_retained_substitution(&group),
        },
        IcmsLayout::Unclassified => IcmsGroups::Unclassified {
            own: read_own_operation(&group, digits)?,
            forward: read_forward_substitution(&group, digits)?,
            retained: read_retained_substitution(&group),
        },
    };

    Ok(Some(Icms {
        regime,
        orig: group.text("orig"),
        code,
        groups,
    }))
}

fn read_own_operation(group: &Scope<'_, '_>, digits: u32) -> Result<OwnOperation> {
    Ok(OwnOperation {
        mod_bc: group.text("modBC"),
        p_red_bc: group.rounded("pRedBC", digits)?,
        v_bc: group.rounded("vBC", digits)?,
        p_icms: group.rounded("pICMS", digits)?,
        v_icms: group.rounded("vICMS", digits)?,
        v_bc_fcp: group.rounded("vBCFCP", digits)?,
        p_fcp: group.rounded("pFCP", digits)?,
        v_fcp: group.rounded("vFCP", digits)?,
    })
}

fn read_forward_substitution(group: &Scope<'_, '_>, digits: u32) -> Result<ForwardSubstitution> {
    Ok(ForwardSubstitution {
        mod_bc_st: group.text("modBCST"),
        p_mva_st: group.rounded("pMVAST", digits)?,
        v_bc_st: group.rounded("vBCST", digits)?,
        p_icms_st: group.rounded("pICMSST", digits)?,
        v_icms_st: group.rounded("vICMSST", digits)?,
        v_bc_fcp_st: group.rounded("vBCFCPST", digits)?,
        p_fcp_st: group.rounded("pFCPST", digits)?,
        v_fcp_st: group.rounded("vFCPST", digits)?,
    })
}

/// Retained values are reported as the issuer wrote them.
fn read_retained_substitution(group: &Scope<'_, '_>) -> RetainedSubstitution {
    RetainedSubstitution {
        v_bc_st_ret: group.text("vBCSTRet"),
        p_st: group.text("pST"),
        v_icms_st_ret: group.text("vICMSSTRet"),
    }
}

/// Decode `<PIS>` or `<COFINS>`.
///
/// The regime node may only contain the whitelisted tags of its
/// contribution; anything else fails the document instead of being dropped.
pub(crate) fn read_contribution(
    imposto: &Scope<'_, '_>,
    kind: ContributionKind,
    digits: u32,
) -> Result<Option<Contribution>> {
    let Some(container) = imposto.at(kind.name()) else {
        return Ok(None);
    };
    let Some(group) = container.single_child()? else {
        return Ok(None);
    };
    let regime = ContributionRegime::from_tag(kind, group.tag())
        .ok_or_else(|| unknown_variant(&container, &group))?;

    let allowed = kind.allowed_tags();
    if let Some(unknown) = group.elements().find(|child| {
        child.tag_name().namespace() != Some(NFE_NAMESPACE)
            || !allowed.iter().any(|tag| *tag == local_name(*child))
    }) {
        return Err(ExtractionError::UnknownElement {
            container: group.tag().to_string(),
            path: group.path().to_string(),
            tag: local_name(unknown).to_string(),
        });
    }

    Ok(Some(Contribution {
        kind,
        regime,
        cst: group.text("CST"),
        v_bc: group.rounded("vBC", digits)?,
        rate: group.rounded(kind.rate_tag(), digits)?,
        amount: group.rounded(kind.amount_tag(), digits)?,
        q_bc_prod: group.rounded("qBCProd", digits)?,
        v_aliq_prod: group.rounded("vAliqProd", digits)?,
    }))
}

/// Decode `<ICMSUFDest>`, present only on interstate sales to final consumers.
pub(crate) fn read_icms_uf_dest(imposto: &Scope<'_, '_>, digits: u32) -> Result<Option<IcmsUfDest>> {
    let Some(group) = imposto.at("ICMSUFDest") else {
        return Ok(None);
    };

    Ok(Some(IcmsUfDest {
        v_bc_uf_dest: group.rounded("vBCUFDest", digits)?,
        p_fcp_uf_dest: group.rounded("pFCPUFDest", digits)?,
        p_icms_uf_dest: group.rounded("pICMSUFDest", digits)?,
        p_icms_inter: group.rounded("pICMSInter", digits)?,
        p_icms_inter_part: group.rounded("pICMSInterPart", digits)?,
        v_fcp_uf_dest: group.rounded("vFCPUFDest", digits)?,
        v_icms_uf_dest: group.rounded("vICMSUFDest", digits)?,
        v_icms_uf_remet: group.rounded("vICMSUFRemet", digits)?,
    }))
}

/// Decode `<IPI>`: the enquadramento code plus one of `IPINT` or `IPITrib`.
pub(crate) fn read_ipi(imposto: &Scope<'_, '_>, digits: u32) -> Result<Option<Ipi>> {
    let Some(group) = imposto.at("IPI") else {
        return Ok(None);
    };
    let c_enq = group.text("cEnq");

    let shape = match (group.at("IPINT"), group.at("IPITrib")) {
        (Some(_), Some(_)) => {
            return Err(ExtractionError::MultipleChildren {
                container: "IPI".to_string(),
                path: group.path().to_string(),
                tags: vec!["IPINT".to_string(), "IPITrib".to_string()],
            });
        }
        (Some(not_taxed), None) => Some(IpiShape::NotTaxed {
            cst: not_taxed.text("CST"),
        }),
        // Value-based and unit-based fields are both read; a document
        // populates one pair or the other.
        (None, Some(taxed)) => Some(IpiShape::Taxed {
            cst: taxed.text("CST"),
            v_bc: taxed.rounded("vBC", digits)?,
            p_ipi: taxed.rounded("pIPI", digits)?,
            q_unid: taxed.rounded("qUnid", digits)?,
            v_unid: taxed.rounded("vUnid", digits)?,
            v_ipi: taxed.rounded("vIPI", digits)?,
        }),
        (None, None) => None,
    };

    Ok(Some(Ipi { c_enq, shape }))
}

fn unknown_variant(container: &Scope<'_, '_>, group: &Scope<'_, '_>) -> ExtractionError {
    ExtractionError::UnknownVariant {
        container: container.tag().to_string(),
        path: container.path().to_string(),
        tag: group.tag().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use roxmltree::Document;

    fn imposto(body: &str) -> String {
        format!(r#"<imposto xmlns="http://www.portalfiscal.inf.br/nfe">{}</imposto>"#, body)
    }

    fn with_scope<T>(body: &str, f: impl FnOnce(&Scope<'_, '_>) -> T) -> T {
        let xml = imposto(body);
        let doc = Document::parse(&xml).unwrap();
        f(&Scope::new(doc.root_element(), "det[1]/imposto"))
    }

    #[test]
    fn test_icms_normal_regime() {
        let icms = with_scope(
            "<ICMS><ICMS20><orig>0</orig><CST>20</CST><modBC>3</modBC>\
             <pRedBC>33.333</pRedBC><vBC>66.67</vBC><pICMS>18.0000</pICMS>\
             <vICMS>12.0006</vICMS></ICMS20></ICMS>",
            |s| read_icms(s, 2),
        )
        .unwrap()
        .unwrap();

        assert_eq!(icms.regime, IcmsRegime::Normal("20".to_string()));
        assert_eq!(icms.orig.as_deref(), Some("0"));
        assert_eq!(icms.cst(), Some("20"));
        assert_eq!(
            icms.groups,
            IcmsGroups::Own {
                own: OwnOperation {
                    mod_bc: Some("3".into()),
                    p_red_bc: Some("33.33".into()),
                    v_bc: Some("66.67".into()),
                    p_icms: Some("18.00".into()),
                    v_icms: Some("12.00".into()),
                    ..Default::default()
                }
            }
        );
    }

    #[test]
    fn test_icms_simplified_with_forward_substitution() {
        let icms = with_scope(
            "<ICMS><ICMSSN201><orig>0</orig><CSOSN>201</CSOSN><modBCST>4</modBCST>\
             <pMVAST>40</pMVAST><vBCST>140</vBCST><pICMSST>18</pICMSST>\
             <vICMSST>7.2</vICMSST></ICMSSN201></ICMS>",
            |s| read_icms(s, 2),
        )
        .unwrap()
        .unwrap();

        assert_eq!(icms.regime, IcmsRegime::Simplified("201".to_string()));
        assert_eq!(icms.csosn(), Some("201"));
        assert_eq!(icms.cst(), None);
        assert!(icms.groups.own().is_none());
        let forward = icms.groups.forward().unwrap();
        assert_eq!(forward.mod_bc_st.as_deref(), Some("4"));
        assert_eq!(forward.v_icms_st.as_deref(), Some("7.20"));
    }

    #[test]
    fn test_icms_retained_values_pass_verbatim() {
        let icms = with_scope(
            "<ICMS><ICMS60><orig>2</orig><CST>60</CST><vBCSTRet>10.1234</vBCSTRet>\
             <pST>18.0000</pST><vICMSSTRet>1.8222</vICMSSTRet></ICMS60></ICMS>",
            |s| read_icms(s, 2),
        )
        .unwrap()
        .unwrap();

        assert_eq!(
            icms.groups,
            IcmsGroups::Retained {
                retained: RetainedSubstitution {
                    v_bc_st_ret: Some("10.1234".into()),
                    p_st: Some("18.0000".into()),
                    v_icms_st_ret: Some("1.8222".into()),
                }
            }
        );
    }

    #[test]
    fn test_icms_regime_keeps_only_its_groups() {
        let exempt = with_scope(
            "<ICMS><ICMS40><orig>0</orig><CST>40</CST><vBC>dez</vBC>\
             <vICMS>1.00</vICMS></ICMS40></ICMS>",
            |s| read_icms(s, 2),
        )
        .unwrap()
        .unwrap();
        assert_eq!(exempt.groups, IcmsGroups::CodesOnly);
        assert_eq!(exempt.cst(), Some("40"));

        let charged = with_scope(
            "<ICMS><ICMS10><orig>0</orig><CST>10</CST><vBC>100</vBC><pICMS>18</pICMS>\
             <vICMS>18</vICMS><vFCP>2</vFCP><modBCST>4</modBCST><vBCST>140</vBCST>\
             <vICMSST>7.2</vICMSST><vBCSTRet>1</vBCSTRet></ICMS10></ICMS>",
            |s| read_icms(s, 2),
        )
        .unwrap()
        .unwrap();
        let own = charged.groups.own().unwrap();
        assert_eq!(own.v_icms.as_deref(), Some("18.00"));
        assert_eq!(own.v_fcp.as_deref(), Some("2.00"));
        assert_eq!(charged.groups.forward().unwrap().v_icms_st.as_deref(), Some("7.20"));
        assert!(charged.groups.retained().is_none());
    }

    #[test]
    fn test_icms_unclassified_code_reads_every_group() {
        let icms = with_scope(
            "<ICMS><ICMS99><CST>99</CST><vBC>1</vBC><vBCST>2</vBCST>\
             <pST>3</pST></ICMS99></ICMS>",
            |s| read_icms(s, 2),
        )
        .unwrap()
        .unwrap();
        assert_eq!(icms.groups.own().unwrap().v_bc.as_deref(), Some("1.00"));
        assert_eq!(icms.groups.forward().unwrap().v_bc_st.as_deref(), Some("2.00"));
        assert_eq!(icms.groups.retained().unwrap().p_st.as_deref(), Some("3"));
    }

    #[test]
    fn test_icms_absent_or_empty() {
        assert_eq!(with_scope("", |s| read_icms(s, 2)), Ok(None));
        assert_eq!(with_scope("<ICMS/>", |s| read_icms(s, 2)), Ok(None));
    }

    #[test]
    fn test_icms_multiple_children_fail() {
        let err = with_scope(
            "<ICMS><ICMS00><orig>0</orig></ICMS00><ICMS40><orig>0</orig></ICMS40></ICMS>",
            |s| read_icms(s, 2),
        )
        .unwrap_err();

        assert_eq!(
            err,
            ExtractionError::MultipleChildren {
                container: "ICMS".to_string(),
                path: "det[1]/imposto/ICMS".to_string(),
                tags: vec!["ICMS00".to_string(), "ICMS40".to_string()],
            }
        );
    }

    #[test]
    fn test_icms_unknown_variant_fails() {
        let err = with_scope("<ICMS><ICMSNovo><orig>0</orig></ICMSNovo></ICMS>", |s| read_icms(s, 2))
            .unwrap_err();
        assert!(matches!(err, ExtractionError::UnknownVariant { ref tag, .. } if tag == "ICMSNovo"));
    }

    #[test]
    fn test_icms_malformed_number_fails() {
        let err = with_scope(
            "<ICMS><ICMS00><orig>0</orig><vBC>dez</vBC></ICMS00></ICMS>",
            |s| read_icms(s, 2),
        )
        .unwrap_err();
        assert_eq!(
            err,
            ExtractionError::InvalidNumber {
                path: "det[1]/imposto/ICMS/ICMS00/vBC".to_string(),
                value: "dez".to_string(),
            }
        );
    }

    #[test]
    fn test_contribution_rate_regime_any_order() {
        let pis = with_scope(
            "<PIS><PISAliq><vPIS>1.65</vPIS><pPIS>1.6500</pPIS><vBC>100</vBC>\
             <CST>01</CST></PISAliq></PIS>",
            |s| read_contribution(s, ContributionKind::Pis, 2),
        )
        .unwrap()
        .unwrap();

        assert_eq!(pis.regime, ContributionRegime::Rate);
        assert_eq!(pis.tag(), "PISAliq");
        assert_eq!(pis.cst.as_deref(), Some("01"));
        assert_eq!(pis.v_bc.as_deref(), Some("100.00"));
        assert_eq!(pis.rate.as_deref(), Some("1.65"));
        assert_eq!(pis.amount.as_deref(), Some("1.65"));
        assert_eq!(pis.q_bc_prod, None);
    }

    #[test]
    fn test_contribution_volume_regime() {
        let cofins = with_scope(
            "<COFINS><COFINSQtde><CST>03</CST><qBCProd>10.0000</qBCProd>\
             <vAliqProd>0.5000</vAliqProd><vCOFINS>5.00</vCOFINS></COFINSQtde></COFINS>",
            |s| read_contribution(s, ContributionKind::Cofins, 2),
        )
        .unwrap()
        .unwrap();

        assert_eq!(cofins.regime, ContributionRegime::Volume);
        assert_eq!(cofins.q_bc_prod.as_deref(), Some("10.00"));
        assert_eq!(cofins.v_aliq_prod.as_deref(), Some("0.50"));
        assert_eq!(cofins.amount.as_deref(), Some("5.00"));
        assert_eq!(cofins.v_bc, None);
    }

    #[test]
    fn test_contribution_not_taxed() {
        let pis = with_scope("<PIS><PISNT><CST>07</CST></PISNT></PIS>", |s| {
            read_contribution(s, ContributionKind::Pis, 2)
        })
        .unwrap()
        .unwrap();
        assert_eq!(pis.regime, ContributionRegime::NotTaxed);
        assert_eq!(pis.cst.as_deref(), Some("07"));
        assert_eq!(pis.rate, None);
    }

    #[test]
    fn test_contribution_whitelist_violation_fails() {
        let err = with_scope(
            "<COFINS><COFINSOutr><CST>99</CST><vBC>1</vBC><vNovo>2</vNovo></COFINSOutr></COFINS>",
            |s| read_contribution(s, ContributionKind::Cofins, 2),
        )
        .unwrap_err();

        assert_eq!(
            err,
            ExtractionError::UnknownElement {
                container: "COFINSOutr".to_string(),
                path: "det[1]/imposto/COFINS/COFINSOutr".to_string(),
                tag: "vNovo".to_string(),
            }
        );
    }

    #[test]
    fn test_contribution_rejects_other_contribution_tags() {
        // pPIS is allowed in PIS groups only.
        let err = with_scope(
            "<COFINS><COFINSAliq><CST>01</CST><pPIS>1</pPIS></COFINSAliq></COFINS>",
            |s| read_contribution(s, ContributionKind::Cofins, 2),
        )
        .unwrap_err();
        assert!(matches!(err, ExtractionError::UnknownElement { ref tag, .. } if tag == "pPIS"));
    }

    #[test]
    fn test_contribution_multiple_children_fail() {
        let err = with_scope(
            "<PIS><PISAliq><CST>01</CST></PISAliq><PISNT><CST>07</CST></PISNT></PIS>",
            |s| read_contribution(s, ContributionKind::Pis, 2),
        )
        .unwrap_err();
        assert!(matches!(err, ExtractionError::MultipleChildren { .. }));
    }

    #[test]
    fn test_contribution_absent() {
        assert_eq!(
            with_scope("", |s| read_contribution(s, ContributionKind::Cofins, 2)),
            Ok(None)
        );
    }

    #[test]
    fn test_icms_uf_dest() {
        let dest = with_scope(
            "<ICMSUFDest><vBCUFDest>100</vBCUFDest><pFCPUFDest>2</pFCPUFDest>\
             <pICMSUFDest>18</pICMSUFDest><pICMSInter>12</pICMSInter>\
             <pICMSInterPart>100</pICMSInterPart><vFCPUFDest>2</vFCPUFDest>\
             <vICMSUFDest>6</vICMSUFDest><vICMSUFRemet>0</vICMSUFRemet></ICMSUFDest>",
            |s| read_icms_uf_dest(s, 2),
        )
        .unwrap()
        .unwrap();

        assert_eq!(dest.v_bc_uf_dest.as_deref(), Some("100.00"));
        assert_eq!(dest.p_icms_inter_part.as_deref(), Some("100.00"));
        assert_eq!(dest.v_icms_uf_remet.as_deref(), Some("0.00"));
        assert_eq!(with_scope("", |s| read_icms_uf_dest(s, 2)), Ok(None));
    }

    #[test]
    fn test_ipi_not_taxed() {
        let ipi = with_scope("<IPI><cEnq>999</cEnq><IPINT><CST>53</CST></IPINT></IPI>", |s| {
            read_ipi(s, 2)
        })
        .unwrap()
        .unwrap();

        assert_eq!(
            ipi,
            Ipi {
                c_enq: Some("999".into()),
                shape: Some(IpiShape::NotTaxed {
                    cst: Some("53".into())
                }),
            }
        );
    }

    #[test]
    fn test_ipi_taxed_by_value_or_unit() {
        let by_value = with_scope(
            "<IPI><cEnq>999</cEnq><IPITrib><CST>50</CST><vBC>200</vBC><pIPI>5</pIPI>\
             <vIPI>10</vIPI></IPITrib></IPI>",
            |s| read_ipi(s, 2),
        )
        .unwrap()
        .unwrap();
        assert_eq!(
            by_value.shape,
            Some(IpiShape::Taxed {
                cst: Some("50".into()),
                v_bc: Some("200.00".into()),
                p_ipi: Some("5.00".into()),
                q_unid: None,
                v_unid: None,
                v_ipi: Some("10.00".into()),
            })
        );

        let by_unit = with_scope(
            "<IPI><cEnq>999</cEnq><IPITrib><CST>50</CST><qUnid>3</qUnid><vUnid>1.5</vUnid>\
             <vIPI>4.5</vIPI></IPITrib></IPI>",
            |s| read_ipi(s, 2),
        )
        .unwrap()
        .unwrap();
        assert_eq!(
            by_unit.shape,
            Some(IpiShape::Taxed {
                cst: Some("50".into()),
                v_bc: None,
                p_ipi: None,
                q_unid: Some("3.00".into()),
                v_unid: Some("1.50".into()),
                v_ipi: Some("4.50".into()),
            })
        );
    }

    #[test]
    fn test_ipi_both_shapes_fail() {
        let err = with_scope(
            "<IPI><cEnq>999</cEnq><IPINT><CST>53</CST></IPINT><IPITrib><CST>50</CST></IPITrib></IPI>",
            |s| read_ipi(s, 2),
        )
        .unwrap_err();
        assert!(matches!(err, ExtractionError::MultipleChildren { ref container, .. } if container == "IPI"));
    }

    #[test]
    fn test_ipi_without_shape() {
        let ipi = with_scope("<IPI><cEnq>999</cEnq></IPI>", |s| read_ipi(s, 2))
            .unwrap()
            .unwrap();
        assert_eq!(ipi.c_enq.as_deref(), Some("999"));
        assert_eq!(ipi.shape, None);
    }
}
