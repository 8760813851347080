//! Symbology types and the symbology-identifier table.
use serde::{Deserialize, Serialize};

/// Barcode symbologies understood by the engine.
#[derive(Deserialize, Serialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Symbology {
    #[default]
    #[serde(rename = "none")]
    None,
    #[serde(rename = "gs1_databar_omnidirectional")]
    DataBarOmni,
    #[serde(rename = "gs1_databar_truncated")]
    DataBarTruncated,
    #[serde(rename = "gs1_databar_stacked")]
    DataBarStacked,
    #[serde(rename = "gs1_databar_stacked_omnidirectional")]
    DataBarStackedOmni,
    #[serde(rename = "gs1_databar_limited")]
    DataBarLimited,
    #[serde(rename = "gs1_databar_expanded")]
    DataBarExpanded,
    #[serde(rename = "upc_a")]
    UpcA,
    #[serde(rename = "upc_e")]
    UpcE,
    #[serde(rename = "ean13")]
    Ean13,
    #[serde(rename = "ean8")]
    Ean8,
    #[serde(rename = "gs1_128_cca")]
    Gs1_128Cca,
    #[serde(rename = "gs1_128_ccc")]
    Gs1_128Ccc,
    #[serde(rename = "qrcode")]
    Qr,
    #[serde(rename = "datamatrix")]
    Dm,
    #[serde(rename = "dotcode")]
    DotCode,
}

/// Whether the data carried by a symbol is a GS1 AI element string or
/// opaque plain data.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiMode {
    #[serde(rename = "ai")]
    Ai,
    #[serde(rename = "non_ai")]
    NonAi,
}

/// One row of the symbology-identifier table.
pub(crate) struct SymIdEntry {
    pub id: &'static str,
    pub mode: AiMode,
    pub sym: Symbology,
}

const fn row(id: &'static str, mode: AiMode, sym: Symbology) -> SymIdEntry {
    SymIdEntry { id, mode, sym }
}

/// Ordered symbology-identifier table.
///
/// The first matching row wins for both directions of lookup, so row order
/// sets the defaults: `]C1` decodes as GS1-128 CC-A and `]e0` decodes as
/// DataBar Expanded, even though several encoders produce those identifiers.
pub(crate) const SYM_ID_TABLE: &[SymIdEntry] = &[
    row("C1", AiMode::Ai, Symbology::Gs1_128Cca),
    row("C1", AiMode::Ai, Symbology::Gs1_128Ccc),
    row("E0", AiMode::NonAi, Symbology::Ean13),
    row("E0", AiMode::Ai, Symbology::Ean13),
    row("E0", AiMode::NonAi, Symbology::UpcA),
    row("E0", AiMode::Ai, Symbology::UpcA),
    row("E0", AiMode::NonAi, Symbology::UpcE),
    row("E0", AiMode::Ai, Symbology::UpcE),
    row("E4", AiMode::NonAi, Symbology::Ean8),
    row("E4", AiMode::Ai, Symbology::Ean8),
    row("e0", AiMode::Ai, Symbology::DataBarExpanded),
    row("e0", AiMode::Ai, Symbology::DataBarOmni),
    row("e0", AiMode::NonAi, Symbology::DataBarOmni),
    row("e0", AiMode::Ai, Symbology::DataBarTruncated),
    row("e0", AiMode::NonAi, Symbology::DataBarTruncated),
    row("e0", AiMode::Ai, Symbology::DataBarStacked),
    row("e0", AiMode::NonAi, Symbology::DataBarStacked),
    row("e0", AiMode::Ai, Symbology::DataBarStackedOmni),
    row("e0", AiMode::NonAi, Symbology::DataBarStackedOmni),
    row("e0", AiMode::Ai, Symbology::DataBarLimited),
    row("e0", AiMode::NonAi, Symbology::DataBarLimited),
    row("d1", AiMode::NonAi, Symbology::Dm),
    row("d2", AiMode::Ai, Symbology::Dm),
    row("Q1", AiMode::NonAi, Symbology::Qr),
    row("Q3", AiMode::Ai, Symbology::Qr),
    row("J0", AiMode::NonAi, Symbology::DotCode),
    row("J1", AiMode::Ai, Symbology::DotCode),
];

/// Symbology identifier that introduces a 2D composite component in
/// spliced scan data.
pub(crate) const CC_SYM_ID: &str = "]e0";

/// First identifier produced for a given symbology and data mode.
pub(crate) fn lookup_sym_id(sym: Symbology, mode: AiMode) -> Option<&'static str> {
    SYM_ID_TABLE
        .iter()
        .find(|entry| entry.sym == sym && entry.mode == mode)
        .map(|entry| entry.id)
}

/// First symbology and data mode registered for a two-character identifier.
pub(crate) fn lookup_sym_and_mode(id: &str) -> (Symbology, AiMode) {
    SYM_ID_TABLE
        .iter()
        .find(|entry| entry.id == id)
        .map(|entry| (entry.sym, entry.mode))
        .unwrap_or((Symbology::None, AiMode::NonAi))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_match_defaults() {
        assert_eq!(
            lookup_sym_and_mode("C1"),
            (Symbology::Gs1_128Cca, AiMode::Ai)
        );
        assert_eq!(
            lookup_sym_and_mode("e0"),
            (Symbology::DataBarExpanded, AiMode::Ai)
        );
        assert_eq!(lookup_sym_and_mode("E0"), (Symbology::Ean13, AiMode::NonAi));
        assert_eq!(lookup_sym_and_mode("Q3"), (Symbology::Qr, AiMode::Ai));
        assert_eq!(lookup_sym_and_mode("d1"), (Symbology::Dm, AiMode::NonAi));
        assert_eq!(
            lookup_sym_and_mode("ZZ"),
            (Symbology::None, AiMode::NonAi)
        );
    }

    #[test]
    fn test_id_for_sym_and_mode() {
        assert_eq!(lookup_sym_id(Symbology::Qr, AiMode::Ai), Some("Q3"));
        assert_eq!(lookup_sym_id(Symbology::Qr, AiMode::NonAi), Some("Q1"));
        assert_eq!(lookup_sym_id(Symbology::Dm, AiMode::Ai), Some("d2"));
        assert_eq!(lookup_sym_id(Symbology::DotCode, AiMode::NonAi), Some("J0"));
        assert_eq!(lookup_sym_id(Symbology::Gs1_128Ccc, AiMode::Ai), Some("C1"));
        assert_eq!(
            lookup_sym_id(Symbology::DataBarLimited, AiMode::Ai),
            Some("e0")
        );
        assert_eq!(lookup_sym_id(Symbology::UpcA, AiMode::NonAi), Some("E0"));
        assert_eq!(lookup_sym_id(Symbology::Gs1_128Cca, AiMode::NonAi), None);
    }

    #[test]
    fn test_serde_names() {
        let out = serde_json::to_string(&Symbology::DataBarStackedOmni).unwrap();
        assert_eq!(out, r#""gs1_databar_stacked_omnidirectional""#);
        let back: Symbology = serde_json::from_str(r#""upc_a""#).unwrap();
        assert_eq!(back, Symbology::UpcA);
        assert_eq!(
            serde_json::to_string(&AiMode::NonAi).unwrap(),
            r#""non_ai""#
        );
    }
}
