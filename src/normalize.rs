//! Text canonicalization for header cells and path-derived table names.

/// Strip diacritics by decomposing to NFD and dropping combining marks.
pub fn strip_diacritics(input: &str) -> String {
    use unicode_normalization::UnicodeNormalization;
    input
        .nfd()
        .filter(|c| !unicode_normalization::char::is_combining_mark(*c))
        .collect()
}

/// Canonical lowercase token: diacritics stripped, every run of
/// non-alphanumeric characters collapsed to a single `_`, surrounding
/// underscores trimmed, truncated to MySQL's 64-character identifier limit.
/// Returns an empty string for input with no alphanumeric content.
pub fn canonical_token(input: &str) -> String {
    let ascii = strip_diacritics(input);
    let mut out = String::with_capacity(ascii.len());
    let mut pending_sep = false;
    for c in ascii.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.push(c.to_ascii_lowercase());
        } else {
            pending_sep = true;
        }
    }
    out.chars().take(64).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_diacritics() {
        assert_eq!(strip_diacritics("Álvaro"), "Alvaro");
        assert_eq!(strip_diacritics("José"), "Jose");
    }

    #[test]
    fn canonical_token_collapses_separators() {
        assert_eq!(canonical_token("Team ID"), "team_id");
        assert_eq!(canonical_token("  WAR/Pos  "), "war_pos");
        assert_eq!(canonical_token("G (games)"), "g_games");
        assert_eq!(canonical_token("---"), "");
    }

    #[test]
    fn canonical_token_truncates_to_identifier_limit() {
        let long = "x".repeat(100);
        assert_eq!(canonical_token(&long).len(), 64);
    }

    #[test]
    fn canonical_token_handles_paths() {
        assert_eq!(
            canonical_token("retrosheet/csv/gameinfo.csv"),
            "retrosheet_csv_gameinfo_csv"
        );
    }
}
