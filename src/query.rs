/// Canonical fingerprint for a (song, artist) pair: `lower(trim(artist)) + " - " + lower(trim(title))`.
/// Used identically by the now-playing trigger and the play lookup so that
/// both paths collapse to the same `tracks` row.
pub fn canonical_query(artist: &str, title: &str) -> String {
    format!("{} - {}", artist.trim().to_lowercase(), title.trim().to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_and_trims_both_fields() {
        assert_eq!(
            canonical_query("  Pink Floyd ", " Comfortably Numb  "),
            "pink floyd - comfortably numb"
        );
    }

    #[test]
    fn is_order_sensitive() {
        let a = canonical_query("Pink Floyd", "Comfortably Numb");
        let b = canonical_query("Comfortably Numb", "Pink Floyd");
        assert_ne!(a, b);
    }

    #[test]
    fn identical_inputs_produce_identical_keys() {
        let a = canonical_query("pink floyd", "comfortably numb");
        let b = canonical_query("PINK FLOYD", "Comfortably Numb");
        assert_eq!(a, b);
    }
}
