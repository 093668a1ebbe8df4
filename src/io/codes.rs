//! Upstream parameter-code vocabulary.
//!
//! Raw site files label columns with agency parameter codes; the rest of the
//! crate works with the short column names on the right.

/// `(parameter code, column name)` pairs.
pub const PARAMETER_CODES: &[(&str, &str)] = &[
    ("site_no", "Site"),
    ("datetime", "DateTime"),
    ("00065", "Gage Height"),
    ("00095", "Spec Cond"),
    ("63680_ysi", "Turb_YSI"),
    ("63680_hach", "Turb_HACH"),
    ("99133", "NitrateSurr"),
    ("51289", "OrthoP"),
    ("00060", "Discharge"),
    ("p80154", "SSC"),
    ("p00665", "TP"),
    ("p00631", "Nitrate"),
    ("p70331", "<62"),
];

/// Column name for a header, translating parameter codes and passing other
/// names through unchanged.
pub fn column_name(header: &str) -> &str {
    PARAMETER_CODES
        .iter()
        .find(|(code, _)| *code == header)
        .map_or(header, |(_, name)| *name)
}
