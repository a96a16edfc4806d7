//! Custom program error decoding
//!
//! Failed instructions surface as `... custom program error: 0x<hex>`. The
//! code is looked up in the error table shipped with the program's interface
//! description; unknown codes keep the raw message.

use crate::tx_builder::errors::TransactionBuilderError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;

const LAUNCHPAD_IDL: &str = include_str!("../../idl/launchpad.json");

static CUSTOM_ERROR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"custom program error: 0x([0-9a-fA-F]+)").expect("static regex is valid")
});

static ERROR_TABLE: Lazy<ProgramErrorTable> = Lazy::new(|| {
    ProgramErrorTable::from_idl(LAUNCHPAD_IDL).unwrap_or_else(|e| {
        tracing::error!(error = %e, "Bundled program interface is unreadable");
        ProgramErrorTable::default()
    })
});

/// One entry of the program's error table
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProgramErrorEntry {
    pub code: u32,
    pub name: String,
    #[serde(rename = "msg")]
    pub message: String,
}

#[derive(Debug, Deserialize)]
struct IdlErrors {
    #[serde(default)]
    errors: Vec<ProgramErrorEntry>,
}

/// Code -> entry lookup built from an interface description
#[derive(Debug, Default, Clone)]
pub struct ProgramErrorTable {
    entries: HashMap<u32, ProgramErrorEntry>,
}

impl ProgramErrorTable {
    pub fn from_idl(idl_json: &str) -> Result<Self, serde_json::Error> {
        let idl: IdlErrors = serde_json::from_str(idl_json)?;
        Ok(Self {
            entries: idl.errors.into_iter().map(|e| (e.code, e)).collect(),
        })
    }

    /// The table for the launchpad program
    pub fn launchpad() -> &'static ProgramErrorTable {
        &ERROR_TABLE
    }

    pub fn get(&self, code: u32) -> Option<&ProgramErrorEntry> {
        self.entries.get(&code)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Human message for `raw`, or `raw` itself when no mapped code is present
    pub fn describe(&self, raw: &str) -> String {
        extract_custom_code(raw)
            .and_then(|code| self.get(code))
            .map(|entry| entry.message.clone())
            .unwrap_or_else(|| raw.to_string())
    }

    /// Map a raw failure message onto `Program` when it carries a custom code
    pub fn classify(&self, raw: &str) -> Option<TransactionBuilderError> {
        let code = extract_custom_code(raw)?;
        Some(match self.get(code) {
            Some(entry) => TransactionBuilderError::Program {
                code,
                name: entry.name.clone(),
                message: entry.message.clone(),
            },
            None => TransactionBuilderError::Program {
                code,
                name: "Unknown".to_string(),
                message: raw.to_string(),
            },
        })
    }
}

/// Extract the decimal value of a `custom program error: 0x..` code
pub fn extract_custom_code(raw: &str) -> Option<u32> {
    let caps = CUSTOM_ERROR_RE.captures(raw)?;
    u32::from_str_radix(caps.get(1)?.as_str(), 16).ok()
}

/// Describe `raw` using the launchpad program's table
pub fn describe_program_error(raw: &str) -> String {
    ProgramErrorTable::launchpad().describe(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_table_loads() {
        let table = ProgramErrorTable::launchpad();
        assert!(!table.is_empty());
        assert_eq!(table.get(6000).map(|e| e.name.as_str()), Some("PresaleEnded"));
    }

    #[test]
    fn test_extract_custom_code() {
        let raw = "Error processing Instruction 2: custom program error: 0x1770";
        assert_eq!(extract_custom_code(raw), Some(6000));
        assert_eq!(extract_custom_code("custom program error: 0x1"), Some(1));
        assert_eq!(extract_custom_code("blockhash not found"), None);
    }

    #[test]
    fn test_describe_mapped_code() {
        let raw = "Transaction simulation failed: custom program error: 0x1770";
        assert_eq!(describe_program_error(raw), "Presale has already ended");
    }

    #[test]
    fn test_describe_unknown_code_keeps_raw() {
        let raw = "Error processing Instruction 0: custom program error: 0xdead";
        assert_eq!(describe_program_error(raw), raw);
        assert_eq!(describe_program_error("node is behind"), "node is behind");
    }

    #[test]
    fn test_classify() {
        let table = ProgramErrorTable::launchpad();
        match table.classify("custom program error: 0x1771") {
            Some(TransactionBuilderError::Program { code, name, .. }) => {
                assert_eq!(code, 6001);
                assert_eq!(name, "PresaleTargetNotMet");
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert!(table.classify("connection reset").is_none());
    }
}
