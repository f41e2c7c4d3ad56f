//! Decoded tax sub-blocks of an NF-e line item.
//!
//! Each `imposto` child in the source is a container whose single element
//! child names the regime. The types here are the decoded form of those
//! containers: the regime is a closed enum, and each regime carries only the
//! value groups its layout defines.

/// Regime family of the state VAT (ICMS) group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IcmsRegime {
    /// `ICMS00` .. `ICMS90`, keyed by the two-digit CST in the tag.
    Normal(String),
    /// `ICMSPart`: operation shared between origin and destination states.
    Shared,
    /// `ICMSST`: substitution tax retained upstream and forwarded.
    Forwarded,
    /// `ICMSSN101` .. `ICMSSN900`, keyed by the CSOSN in the tag.
    Simplified(String),
}

impl IcmsRegime {
    /// Decode a child tag of `<ICMS>`.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "ICMSPart" => Some(Self::Shared),
            "ICMSST" => Some(Self::Forwarded),
            _ => {
                if let Some(code) = tag.strip_prefix("ICMSSN") {
                    is_code(code, 3).then(|| Self::Simplified(code.to_string()))
                } else if let Some(code) = tag.strip_prefix("ICMS") {
                    is_code(code, 2).then(|| Self::Normal(code.to_string()))
                } else {
                    None
                }
            }
        }
    }

    /// Source tag this regime was decoded from.
    pub fn tag(&self) -> String {
        match self {
            Self::Normal(cst) => format!("ICMS{}", cst),
            Self::Shared => "ICMSPart".to_string(),
            Self::Forwarded => "ICMSST".to_string(),
            Self::Simplified(csosn) => format!("ICMSSN{}", csosn),
        }
    }
}

fn is_code(code: &str, len: usize) -> bool {
    code.len() == len && code.chars().all(|c| c.is_ascii_digit())
}

/// Which value groups an ICMS regime carries, per the published layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IcmsLayout {
    CodesOnly,
    Own,
    OwnAndForward,
    Forward,
    Retained,
    /// A code outside the published layout; every group is read.
    Unclassified,
}

impl IcmsRegime {
    pub fn layout(&self) -> IcmsLayout {
        use IcmsLayout::*;
        match self {
            Self::Normal(cst) => match cst.as_str() {
                "00" | "20" | "51" => Own,
                "10" | "70" | "90" => OwnAndForward,
                "30" => Forward,
                "60" => Retained,
                "02" | "15" | "40" | "41" | "50" | "53" | "61" => CodesOnly,
                _ => Unclassified,
            },
            Self::Shared => OwnAndForward,
            Self::Forwarded => Retained,
            Self::Simplified(csosn) => match csosn.as_str() {
                "101" | "102" | "103" | "300" | "400" => CodesOnly,
                "201" | "202" | "203" => Forward,
                "500" => Retained,
                "900" => OwnAndForward,
                _ => Unclassified,
            },
        }
    }

    /// Whether the situation code is a CSOSN rather than a CST.
    pub fn is_simplified(&self) -> bool {
        matches!(self, Self::Simplified(_))
    }
}

/// Tax on the issuer's own operation, with its poverty fund share.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OwnOperation {
    pub mod_bc: Option<String>,
    pub p_red_bc: Option<String>,
    pub v_bc: Option<String>,
    pub p_icms: Option<String>,
    pub v_icms: Option<String>,
    pub v_bc_fcp: Option<String>,
    pub p_fcp: Option<String>,
    pub v_fcp: Option<String>,
}

/// Substitution tax charged forward on the next operations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForwardSubstitution {
    pub mod_bc_st: Option<String>,
    pub p_mva_st: Option<String>,
    pub v_bc_st: Option<String>,
    pub p_icms_st: Option<String>,
    pub v_icms_st: Option<String>,
    pub v_bc_fcp_st: Option<String>,
    pub p_fcp_st: Option<String>,
    pub v_fcp_st: Option<String>,
}

/// Substitution tax already retained upstream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetainedSubstitution {
    pub v_bc_st_ret: Option<String>,
    pub p_st: Option<String>,
    pub v_icms_st_ret: Option<String>,
}

/// Value groups of a decoded ICMS regime; see [`IcmsLayout`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IcmsGroups {
    /// `ICMS40`, single-phase fuel regimes, `ICMSSN101`/`102`.
    CodesOnly,
    /// `ICMS00`, `ICMS20`, `ICMS51`.
    Own { own: OwnOperation },
    /// `ICMS10`, `ICMS70`, `ICMS90`, `ICMSPart`, `ICMSSN900`.
    OwnAndForward {
        own: OwnOperation,
        forward: ForwardSubstitution,
    },
    /// `ICMS30`, `ICMSSN201`, `ICMSSN202`.
    Forward { forward: ForwardSubstitution },
    /// `ICMS60`, `ICMSST`, `ICMSSN500`.
    Retained { retained: RetainedSubstitution },
    Unclassified {
        own: OwnOperation,
        forward: ForwardSubstitution,
        retained: RetainedSubstitution,
    },
}

impl IcmsGroups {
    pub fn own(&self) -> Option<&OwnOperation> {
        match self {
            Self::Own { own } | Self::OwnAndForward { own, .. } | Self::Unclassified { own, .. } => {
                Some(own)
            }
            _ => None,
        }
    }

    pub fn forward(&self) -> Option<&ForwardSubstitution> {
        match self {
            Self::OwnAndForward { forward, .. }
            | Self::Forward { forward }
            | Self::Unclassified { forward, .. } => Some(forward),
            _ => None,
        }
    }

    pub fn retained(&self) -> Option<&RetainedSubstitution> {
        match self {
            Self::Retained { retained } | Self::Unclassified { retained, .. } => Some(retained),
            _ => None,
        }
    }
}

/// Decoded `<ICMS>` container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Icms {
    pub regime: IcmsRegime,
    pub orig: Option<String>,
    /// `CSOSN` for the simplified regime, `CST` otherwise.
    pub code: Option<String>,
    pub groups: IcmsGroups,
}

impl Icms {
    pub fn cst(&self) -> Option<&str> {
        (!self.regime.is_simplified()).then_some(self.code.as_deref()).flatten()
    }

    pub fn csosn(&self) -> Option<&str> {
        self.regime.is_simplified().then_some(self.code.as_deref()).flatten()
    }
}

/// Federal contribution carried by a line item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContributionKind {
    Pis,
    Cofins,
}

impl ContributionKind {
    /// Container tag, also the column prefix.
    pub fn name(self) -> &'static str {
        match self {
            Self::Pis => "PIS",
            Self::Cofins => "COFINS",
        }
    }

    /// Tag of the percentage rate element (`pPIS`, `pCOFINS`).
    pub fn rate_tag(self) -> &'static str {
        match self {
            Self::Pis => "pPIS",
            Self::Cofins => "pCOFINS",
        }
    }

    /// Tag of the amount element (`vPIS`, `vCOFINS`).
    pub fn amount_tag(self) -> &'static str {
        match self {
            Self::Pis => "vPIS",
            Self::Cofins => "vCOFINS",
        }
    }

    /// The only tags a regime node of this contribution may contain.
    pub fn allowed_tags(self) -> [&'static str; 6] {
        ["CST", "vBC", self.rate_tag(), self.amount_tag(), "qBCProd", "vAliqProd"]
    }
}

/// Regime of a PIS or COFINS container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContributionRegime {
    /// Percentage of the base (`PISAliq`).
    Rate,
    /// Fixed value per unit of volume (`PISQtde`).
    Volume,
    /// Not taxed (`PISNT`).
    NotTaxed,
    /// Other operations (`PISOutr`), base or volume driven.
    Other,
}

impl ContributionRegime {
    /// Decode a child tag of `<PIS>` or `<COFINS>`.
    pub fn from_tag(kind: ContributionKind, tag: &str) -> Option<Self> {
        match tag.strip_prefix(kind.name())? {
            "Aliq" => Some(Self::Rate),
            "Qtde" => Some(Self::Volume),
            "NT" => Some(Self::NotTaxed),
            "Outr" => Some(Self::Other),
            _ => None,
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            Self::Rate => "Aliq",
            Self::Volume => "Qtde",
            Self::NotTaxed => "NT",
            Self::Other => "Outr",
        }
    }
}

/// Decoded `<PIS>` or `<COFINS>` container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contribution {
    pub kind: ContributionKind,
    pub regime: ContributionRegime,
    pub cst: Option<String>,
    pub v_bc: Option<String>,
    pub rate: Option<String>,
    pub amount: Option<String>,
    pub q_bc_prod: Option<String>,
    pub v_aliq_prod: Option<String>,
}

impl Contribution {
    /// Source tag of the regime node, e.g. `COFINSAliq`.
    pub fn tag(&self) -> String {
        format!("{}{}", self.kind.name(), self.regime.suffix())
    }
}

/// Interstate sale to a final consumer: ICMS split between states.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IcmsUfDest {
    pub v_bc_uf_dest: Option<String>,
    pub p_fcp_uf_dest: Option<String>,
    pub p_icms_uf_dest: Option<String>,
    pub p_icms_inter: Option<String>,
    pub p_icms_inter_part: Option<String>,
    pub v_fcp_uf_dest: Option<String>,
    pub v_icms_uf_dest: Option<String>,
    pub v_icms_uf_remet: Option<String>,
}

/// Inner shape of the excise (IPI) group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IpiShape {
    /// `IPINT`: outside the excise scope, only a situation code.
    NotTaxed { cst: Option<String> },
    /// `IPITrib`: taxed by value (`vBC`, `pIPI`) or by unit (`qUnid`, `vUnid`).
    Taxed {
        cst: Option<String>,
        v_bc: Option<String>,
        p_ipi: Option<String>,
        q_unid: Option<String>,
        v_unid: Option<String>,
        v_ipi: Option<String>,
    },
}

impl IpiShape {
    pub fn tag(&self) -> &'static str {
        match self {
            Self::NotTaxed { .. } => "IPINT",
            Self::Taxed { .. } => "IPITrib",
        }
    }
}

/// Decoded `<IPI>` group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ipi {
    pub c_enq: Option<String>,
    pub shape: Option<IpiShape>,
}
