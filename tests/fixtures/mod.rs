//! Test fixtures for the relay tests
#![allow(dead_code)]

/// Smallest document most PDF sniffers accept.
pub const SAMPLE_PDF: &[u8] = b"%PDF-1.4\n1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n\
2 0 obj\n<< /Type /Pages /Kids [] /Count 0 >>\nendobj\ntrailer\n<< /Root 1 0 R >>\n%%EOF\n";

pub const SAMPLE_FILE_NAME: &str = "rahmenvertrag.pdf";

/// Criteria exactly as the browser page sends them.
pub const SINGLE_CRITERION: &str = r#"[{"type":"MUSS","value":"Laufzeit"}]"#;

pub const MIXED_CRITERIA: &str = r#"[
    {"type":"MUSS","value":"Laufzeit mindestens 24 Monate"},
    {"type":"soll","value":"  Kündigungsfrist  "},
    {"type":"ANALYSE","value":"Haftungsbegrenzung"}
]"#;

/// Criteria payloads the server must refuse, with a label for assertion
/// messages.
pub const INVALID_CRITERIA: &[(&str, &str)] = &[
    ("not json", "Laufzeit"),
    ("empty list", "[]"),
    ("unknown type", r#"[{"type":"VIELLEICHT","value":"Laufzeit"}]"#),
    ("blank value", r#"[{"type":"MUSS","value":"   "}]"#),
    ("object instead of list", r#"{"type":"MUSS","value":"Laufzeit"}"#),
];
