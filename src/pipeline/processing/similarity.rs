/// Edit-distance text similarity used to spot re-posted listings
pub struct TextSimilarity;

impl TextSimilarity {
    /// Normalized Levenshtein similarity in `[0, 1]`, after case folding and trimming
    pub fn similarity(a: &str, b: &str) -> f64 {
        let a = a.trim().to_lowercase();
        let b = b.trim().to_lowercase();

        if a == b {
            return 1.0;
        }

        let len_a = a.chars().count();
        let len_b = b.chars().count();

        if len_a == 0 || len_b == 0 {
            return 0.0;
        }

        let max_len = len_a.max(len_b);
        let distance = strsim::levenshtein(&a, &b);

        1.0 - (distance as f64 / max_len as f64)
    }

    /// Lowercase, trim and strip Spanish/Portuguese diacritics from a listing title
    pub fn normalize_title(title: &str) -> String {
        Self::fold_diacritics(&title.trim().to_lowercase())
    }

    pub fn fold_diacritics(text: &str) -> String {
        text.chars().map(fold_char).collect()
    }
}

fn fold_char(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ä' | 'ã' => 'a',
        'Á' | 'À' | 'Â' | 'Ä' | 'Ã' => 'A',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'É' | 'È' | 'Ê' | 'Ë' => 'E',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'Í' | 'Ì' | 'Î' | 'Ï' => 'I',
        'ó' | 'ò' | 'ô' | 'ö' | 'õ' => 'o',
        'Ó' | 'Ò' | 'Ô' | 'Ö' | 'Õ' => 'O',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'Ú' | 'Ù' | 'Û' | 'Ü' => 'U',
        'ñ' => 'n',
        'Ñ' => 'N',
        'ç' => 'c',
        'Ç' => 'C',
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_and_case_folded() {
        assert_eq!(TextSimilarity::similarity("Casa", "Casa"), 1.0);
        assert_eq!(
            TextSimilarity::similarity("Apartamento en Condina", "  apartamento en condina "),
            1.0
        );
    }

    #[test]
    fn test_empty_strings() {
        assert_eq!(TextSimilarity::similarity("", "casa"), 0.0);
        assert_eq!(TextSimilarity::similarity("casa", "   "), 0.0);
        assert_eq!(TextSimilarity::similarity("", ""), 1.0);
    }

    #[test]
    fn test_partial_similarity() {
        // one substitution over four characters
        let score = TextSimilarity::similarity("casa", "cama");
        assert!((score - 0.75).abs() < 1e-9);

        let score = TextSimilarity::similarity("lote", "apartamento duplex");
        assert!(score < 0.5);
    }

    #[test]
    fn test_symmetric() {
        let pairs = [
            ("Apartamento Laureles", "Apto Laureles"),
            ("Casa campestre", "casa Campestre en venta"),
        ];
        for (a, b) in pairs {
            assert_eq!(TextSimilarity::similarity(a, b), TextSimilarity::similarity(b, a));
        }
    }

    #[test]
    fn test_normalize_title_strips_diacritics() {
        assert_eq!(
            TextSimilarity::normalize_title("  Casa en Envigado, Año 2019 - Ñuñoa  "),
            "casa en envigado, ano 2019 - nunoa"
        );
        assert_eq!(TextSimilarity::fold_diacritics("Bogotá Güemes"), "Bogota Guemes");
    }
}
