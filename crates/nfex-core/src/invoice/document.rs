//! Document-level fields: identity, timestamps, parties and totals.

use crate::error::ExtractionError;
use crate::models::config::ExtractionConfig;
use crate::models::record::{DocumentFields, Party, TOTALS_TAGS};

use super::dates::{format_date, format_time, split_timestamp};
use super::scope::Scope;

type Result<T> = std::result::Result<T, ExtractionError>;

/// Read the fields shared by every record of one document.
///
/// `protocol` is the `protNFe/infProt` block of an authorized document
/// (`nfeProc` root), absent for bare `NFe` files.
pub(crate) fn read_document(
    inf: &Scope<'_, '_>,
    protocol: Option<&Scope<'_, '_>>,
    config: &ExtractionConfig,
    source_path: &str,
) -> Result<DocumentFields> {
    let ide = inf.require("ide")?;

    let referenced: Vec<String> = ide
        .children("NFref")
        .filter_map(|nf_ref| nf_ref.text("refNFe"))
        .collect();

    let access_key = protocol.and_then(|p| p.text("chNFe")).or_else(|| {
        inf.node()
            .attribute("Id")
            .map(|id| id.strip_prefix("NFe").unwrap_or(id).to_string())
    });

    let (issue_date, issue_time) = read_issue(&ide, config)?;
    let (exit_date, exit_time) = read_exit(&ide, config)?;

    let totals = inf.require("total/ICMSTot")?;

    Ok(DocumentFields {
        issuer: read_issuer(inf)?,
        recipient: read_recipient(inf),
        number: Some(ide.required_text("nNF")?),
        referenced: (!referenced.is_empty()).then(|| referenced.join(" ")),
        access_key,
        protocol: protocol.and_then(|p| p.text("nProt")),
        issue_date,
        issue_time,
        exit_date,
        exit_time,
        totals: TOTALS_TAGS.map(|tag| totals.text(tag)),
        source_path: Some(source_path.to_string()),
    })
}

fn read_issuer(inf: &Scope<'_, '_>) -> Result<Party> {
    let emit = inf.require("emit")?;
    Ok(Party {
        name: Some(emit.required_text("xNome")?),
        tax_id: emit.text("CNPJ").or_else(|| emit.text("CPF")),
        state: emit.text("enderEmit/UF"),
    })
}

/// The recipient block is absent on some document subtypes; that is three
/// empty fields, not an error.
fn read_recipient(inf: &Scope<'_, '_>) -> Party {
    let Some(dest) = inf.at("dest") else {
        return Party::default();
    };
    Party {
        name: dest.text("xNome"),
        tax_id: dest
            .text("CNPJ")
            .or_else(|| dest.text("CPF"))
            .or_else(|| dest.text("idEstrangeiro")),
        state: dest.text("enderDest/UF"),
    }
}

type DateTimePair = (Option<String>, Option<String>);

fn read_issue(ide: &Scope<'_, '_>, config: &ExtractionConfig) -> Result<DateTimePair> {
    if let Some(text) = ide.text("dhEmi") {
        return timestamp(ide, "dhEmi", &text, config);
    }
    if let Some(text) = ide.text("dEmi") {
        return Ok((Some(date(ide, "dEmi", &text, config)?), None));
    }
    Err(ExtractionError::MissingElement {
        element: "dhEmi".to_string(),
        context: ide.path().to_string(),
    })
}

fn read_exit(ide: &Scope<'_, '_>, config: &ExtractionConfig) -> Result<DateTimePair> {
    if let Some(text) = ide.text("dhSaiEnt") {
        return timestamp(ide, "dhSaiEnt", &text, config);
    }
    let exit_date = match ide.text("dSaiEnt") {
        Some(text) => Some(date(ide, "dSaiEnt", &text, config)?),
        None => None,
    };
    let exit_time = match ide.text("hSaiEnt") {
        Some(text) => Some(
            format_time(&text, &config.time_format)
                .ok_or_else(|| invalid_timestamp(ide, "hSaiEnt", &text))?,
        ),
        None => None,
    };
    Ok((exit_date, exit_time))
}

fn timestamp(ide: &Scope<'_, '_>, tag: &str, text: &str, config: &ExtractionConfig) -> Result<DateTimePair> {
    let (date, time) = split_timestamp(text, &config.date_format, &config.time_format)
        .ok_or_else(|| invalid_timestamp(ide, tag, text))?;
    Ok((Some(date), Some(time)))
}

fn date(ide: &Scope<'_, '_>, tag: &str, text: &str, config: &ExtractionConfig) -> Result<String> {
    format_date(text, &config.date_format).ok_or_else(|| invalid_timestamp(ide, tag, text))
}

fn invalid_timestamp(ide: &Scope<'_, '_>, tag: &str, text: &str) -> ExtractionError {
    ExtractionError::InvalidTimestamp {
        path: format!("{}/{}", ide.path(), tag),
        value: text.to_string(),
    }
}
