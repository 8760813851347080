//! gs1-syntax-rs converts between the textual representations of data
//! carried by GS1-standard barcodes: the canonical AI element string, the
//! human-readable bracketed syntax, GS1 Digital Link URIs and raw scanner
//! output with its `]Xn` symbology identifier.
//!
//! All state lives on a [`Gs1Encoder`] context; the conversions themselves
//! are pure and synchronous.
//!
//! ```rust
//! use gs1_syntax_rs::{Gs1Encoder, Symbology};
//!
//! let mut encoder = Gs1Encoder::new();
//! encoder.set_ai_data_str("(01)12312312312333(10)ABC123").unwrap();
//! assert_eq!(encoder.data_str(), "^011231231231233310ABC123");
//!
//! encoder.set_sym(Symbology::DataBarExpanded);
//! assert_eq!(encoder.scan_data().unwrap(), "]e0011231231231233310ABC123");
//! ```

use crate::error::Failure;

mod dluri;
mod primary;
mod scandata;

pub mod aidata;
pub mod error;
pub mod symbology;

pub use crate::aidata::{AiValue, Validation};
pub use crate::error::Gs1Error;
pub use crate::scandata::MAX_DATA;
pub use crate::symbology::{AiMode, Symbology};

use crate::aidata::Validations;
use crate::dluri::DlExtract;

/// Option flags honoured by the conversions.
#[derive(Debug, Clone, Default)]
pub(crate) struct Options {
    pub add_check_digit: bool,
    pub permit_unknown_ais: bool,
    pub permit_zero_suppressed_gtin_in_dl_uris: bool,
    pub include_data_titles_in_hri: bool,
    pub validations: Validations,
}

/// An encoder context: the selected symbology, the canonical data string
/// and the option flags, plus whatever the last operation extracted or
/// reported.
///
/// A context is reused across calls but must not be shared between threads;
/// every mutating call takes it by exclusive reference.
pub struct Gs1Encoder {
    sym: Symbology,
    data_str: String,
    ai_data: Vec<AiValue>,
    dl_ai_str: Option<String>,
    dl_ignored_params: Vec<String>,
    opts: Options,
    err: Option<Gs1Error>,
    err_markup: String,
}

impl Gs1Encoder {
    /// Create a new encoder context with default options.
    pub fn new() -> Self {
        Gs1Encoder {
            sym: Symbology::None,
            data_str: String::new(),
            ai_data: Vec::new(),
            dl_ai_str: None,
            dl_ignored_params: Vec::new(),
            opts: Options::default(),
            err: None,
            err_markup: String::new(),
        }
    }

    /// The currently selected symbology.
    pub fn sym(&self) -> Symbology {
        self.sym
    }

    /// Select the symbology used by [`Gs1Encoder::scan_data`].
    pub fn set_sym(&mut self, sym: Symbology) {
        self.sym = sym;
    }

    /// The canonical data string.
    pub fn data_str(&self) -> &str {
        &self.data_str
    }

    /// Set the canonical data string directly: an AI element string when it
    /// leads with `^`, captured as a DL URI for `http(s)` values, opaque
    /// plain data otherwise.
    pub fn set_data_str(&mut self, value: &str) -> Result<(), Gs1Error> {
        self.clear_data();
        if value.len() >= MAX_DATA {
            return Err(self.fail(Gs1Error::DataTooLong(MAX_DATA - 1)));
        }
        if value.starts_with('^') {
            match aidata::process_and_validate(
                value,
                self.opts.permit_unknown_ais,
                &self.opts.validations,
            ) {
                Ok(ais) => {
                    self.data_str = value.to_string();
                    self.ai_data = ais;
                    Ok(())
                }
                Err(failure) => Err(self.fail_with(failure)),
            }
        } else if dluri::has_dl_scheme(value) {
            let outcome = dluri::parse_dl_uri(
                value,
                self.opts.permit_zero_suppressed_gtin_in_dl_uris,
            )
            .map_err(Failure::from)
            .and_then(|dl| {
                let ais = aidata::process_and_validate(
                    &dl.element_string,
                    self.opts.permit_unknown_ais,
                    &self.opts.validations,
                )?;
                Ok((dl, ais))
            });
            match outcome {
                Ok((dl, ais)) => {
                    let DlExtract {
                        element_string,
                        ignored_query_params,
                    } = dl;
                    self.data_str = value.to_string();
                    self.ai_data = ais;
                    self.dl_ai_str = Some(element_string);
                    self.dl_ignored_params = ignored_query_params;
                    Ok(())
                }
                Err(failure) => Err(self.fail_with(failure)),
            }
        } else {
            self.data_str = value.to_string();
            Ok(())
        }
    }

    /// The bracketed rendering of the data, when it is AI data (directly or
    /// through a DL URI).
    pub fn ai_data_str(&self) -> Option<String> {
        let source = if self.data_str.starts_with('^') {
            self.data_str.as_str()
        } else {
            self.dl_ai_str.as_deref()?
        };
        let parts: Option<Vec<String>> = source
            .split('|')
            .map(|component| {
                aidata::process_ai_data(component, true)
                    .ok()
                    .map(|ais| aidata::element_to_bracketed(&ais))
            })
            .collect();
        Some(parts?.join("|"))
    }

    /// Set the data from bracketed AI syntax, `(nn)value(mm)value…`.
    pub fn set_ai_data_str(&mut self, value: &str) -> Result<(), Gs1Error> {
        let element: Result<Vec<String>, Gs1Error> = value
            .split('|')
            .map(aidata::bracketed_to_element_string)
            .collect();
        match element {
            Ok(parts) => self.set_data_str(&parts.join("|")),
            Err(err) => {
                self.clear_data();
                Err(self.fail(err))
            }
        }
    }

    /// Process scan data into the context.
    ///
    /// On success the symbology and canonical data string reflect the scan;
    /// on failure the symbology is [`Symbology::None`] and the data string
    /// is empty.
    pub fn set_scan_data(&mut self, scan_data: &str) -> Result<(), Gs1Error> {
        self.clear_data();
        self.sym = Symbology::None;
        match scandata::process_scan_data(scan_data, &self.opts) {
            Ok(outcome) => {
                self.sym = outcome.sym;
                self.data_str = outcome.data_str;
                self.ai_data = outcome.ai_data;
                if let Some(DlExtract {
                    element_string,
                    ignored_query_params,
                }) = outcome.dl
                {
                    self.dl_ai_str = Some(element_string);
                    self.dl_ignored_params = ignored_query_params;
                }
                Ok(())
            }
            Err(failure) => Err(self.fail_with(failure)),
        }
    }

    /// Format the context's data as scan data for the selected symbology.
    /// The data string itself is left untouched, success or fail.
    pub fn scan_data(&mut self) -> Result<String, Gs1Error> {
        self.err = None;
        scandata::generate_scan_data(self.sym, &self.data_str, &self.opts)
            .map_err(|err| self.fail(err))
    }

    /// Render the extracted AIs as a GS1 Digital Link URI under `stem`
    /// (default `https://id.gs1.org`).
    pub fn dl_uri(&mut self, stem: Option<&str>) -> Result<String, Gs1Error> {
        self.err = None;
        dluri::generate_dl_uri(&self.ai_data, stem, &self.opts.validations)
            .map_err(|err| self.fail(err))
    }

    /// The AIs extracted by the last successful data operation.
    pub fn ai_data(&self) -> &[AiValue] {
        &self.ai_data
    }

    /// The AI element string recovered from a DL URI, when the data was one.
    pub fn dl_ai_element_string(&self) -> Option<&str> {
        self.dl_ai_str.as_deref()
    }

    /// DL URI query entries that carried no AI data.
    pub fn dl_ignored_query_params(&self) -> &[String] {
        &self.dl_ignored_params
    }

    /// HRI text for the extracted AIs, one line per AI.
    pub fn hri(&self) -> Vec<String> {
        aidata::hri_lines(&self.ai_data, self.opts.include_data_titles_in_hri)
    }

    /// Rendering of the last error, or an empty string.
    pub fn err_msg(&self) -> String {
        self.err.as_ref().map(ToString::to_string).unwrap_or_default()
    }

    /// The offending data with the failing AI value delimited by `|`, when
    /// the last error was a lint failure.
    pub fn err_markup(&self) -> &str {
        &self.err_markup
    }

    pub fn add_check_digit(&self) -> bool {
        self.opts.add_check_digit
    }

    /// When set, primary data is supplied without its check digit and the
    /// engine computes it.
    pub fn set_add_check_digit(&mut self, value: bool) {
        self.opts.add_check_digit = value;
    }

    pub fn permit_unknown_ais(&self) -> bool {
        self.opts.permit_unknown_ais
    }

    pub fn set_permit_unknown_ais(&mut self, value: bool) {
        self.opts.permit_unknown_ais = value;
    }

    pub fn permit_zero_suppressed_gtin_in_dl_uris(&self) -> bool {
        self.opts.permit_zero_suppressed_gtin_in_dl_uris
    }

    pub fn set_permit_zero_suppressed_gtin_in_dl_uris(&mut self, value: bool) {
        self.opts.permit_zero_suppressed_gtin_in_dl_uris = value;
    }

    pub fn include_data_titles_in_hri(&self) -> bool {
        self.opts.include_data_titles_in_hri
    }

    pub fn set_include_data_titles_in_hri(&mut self, value: bool) {
        self.opts.include_data_titles_in_hri = value;
    }

    pub fn validation_enabled(&self, validation: Validation) -> bool {
        self.opts.validations.enabled(validation)
    }

    pub fn set_validation_enabled(
        &mut self,
        validation: Validation,
        enabled: bool,
    ) -> Result<(), Gs1Error> {
        self.opts
            .validations
            .set(validation, enabled)
            .map_err(|err| self.fail(err))
    }

    fn clear_data(&mut self) {
        self.data_str.clear();
        self.ai_data.clear();
        self.dl_ai_str = None;
        self.dl_ignored_params.clear();
        self.err = None;
        self.err_markup.clear();
    }

    fn fail(&mut self, err: Gs1Error) -> Gs1Error {
        self.err = Some(err.clone());
        err
    }

    fn fail_with(&mut self, failure: Failure) -> Gs1Error {
        if let Some(markup) = failure.markup {
            self.err_markup = markup;
        }
        self.fail(failure.err)
    }
}

impl Default for Gs1Encoder {
    fn default() -> Self {
        Gs1Encoder::new()
    }
}
