//! Arabic name canonicalization.
//!
//! Display names are stored as entered; a derived `_name` column holds the
//! canonical form used by the search indexes. Canonicalization removes
//! tanween marks, folds hamza-bearing letter variants onto their bare
//! forms, and normalizes عبد name prefixes. Runs in O(n + m) where m is
//! the number of د letters in the name, without mutating the input.

/// The seven combining marks that contribute nothing to the search key.
/// They can look empty in source, but they are not.
const MARKS: [char; 7] = ['َ', 'ً', 'ِ', 'ٍ', 'ُ', 'ٌ', 'ّ'];

fn at(chars: &[char], index: usize) -> Option<char> {
    chars.get(index).copied()
}

/// Canonicalize a display name.
///
/// With `autocomplete` set, ي is always folded to ى so that partial input
/// matches either spelling; otherwise the fold only applies at the end of
/// a word. Names that match none of the عبد patterns pass through as
/// emitted by the first pass — best effort, never an error.
///
/// Canonicalization is idempotent: feeding the output back in returns it
/// unchanged.
pub fn normalize_name(name: &str, autocomplete: bool) -> String {
    let input: Vec<char> = name.chars().collect();
    let mut output: Vec<char> = Vec::with_capacity(input.len());
    let mut dal_indexes: Vec<usize> = Vec::new();

    let mut i = 0;
    while i < input.len() {
        match input[i] {
            'أ' | 'إ' | 'آ' => output.push('ا'),
            'ة' => output.push('ه'),
            'ئ' => output.push('ء'),
            'ي' => {
                if autocomplete {
                    output.push('ى');
                } else if i == input.len() - 1 {
                    output.push('ى');
                } else if input[i + 1] == ' ' {
                    output.push('ى');
                    output.push(' ');
                    i += 1;
                } else {
                    output.push('ي');
                }
            }
            'د' => {
                output.push('د');
                dal_indexes.push(output.len() - 1);
            }
            c if MARKS.contains(&c) => {}
            c => output.push(c),
        }
        i += 1;
    }

    // Second pass over every د join point, so the عبد rules see the
    // already-folded letters.
    for &i in &dal_indexes {
        if i < 2 || output[i - 2] != 'ع' || output[i - 1] != 'ب' {
            continue;
        }

        // عبد ربه -> عبدربه
        if at(&output, i + 1) == Some(' ')
            && at(&output, i + 2) == Some('ر')
            && at(&output, i + 3) == Some('ب')
            && at(&output, i + 4) == Some('ه')
        {
            output.remove(i + 1);
            continue;
        }

        // عبد الاه -> عبدالاه
        if at(&output, i + 1) == Some(' ')
            && at(&output, i + 2) == Some('ا')
            && at(&output, i + 3) == Some('ل')
            && at(&output, i + 4) == Some('ا')
            && at(&output, i + 5) == Some('ه')
        {
            output.remove(i + 1);
            continue;
        }

        // عبدالاه stays joined. The only name where ال directly after
        // عبد must not be split.
        if at(&output, i + 1) == Some('ا')
            && at(&output, i + 2) == Some('ل')
            && at(&output, i + 3) == Some('ا')
            && at(&output, i + 4) == Some('ه')
        {
            continue;
        }

        // عبدالرحمن -> عبد الرحمن. Added spaces are fine for
        // autocomplete, the search layer trims them.
        if at(&output, i + 1) == Some('ا') && at(&output, i + 2) == Some('ل') {
            output.insert(i + 1, ' ');
        }
    }

    output.into_iter().collect()
}

/// The canonical search key for a display name, as stored in `_name`.
pub fn search_key(name: &str) -> String {
    normalize_name(name, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folds_hamza_variants() {
        assert_eq!(normalize_name("أحمد", false), "احمد");
        assert_eq!(normalize_name("إيمان", false), "ايمان");
        assert_eq!(normalize_name("عزة", false), "عزه");
        assert_eq!(normalize_name("روميسائ", false), "روميساء");
        assert_eq!(normalize_name("آيات", false), "ايات");
        assert_eq!(normalize_name("علي", false), "على");
        assert_eq!(normalize_name("أحمد محمد علي", false), "احمد محمد على");
    }

    #[test]
    fn normalizes_abd_prefixes() {
        assert_eq!(normalize_name("عبدالرحمن", false), "عبد الرحمن");
        assert_eq!(normalize_name("عبدالله", false), "عبد الله");
        assert_eq!(normalize_name("عبد الملك", false), "عبد الملك");
        assert_eq!(normalize_name("عبد ربه", false), "عبدربه");
        assert_eq!(normalize_name("عبد الاه", false), "عبدالاه");
    }

    #[test]
    fn leaves_plain_abd_names_alone() {
        assert_eq!(normalize_name("عبدون", false), "عبدون");
        assert_eq!(normalize_name("عبده", false), "عبده");
        assert_eq!(normalize_name("عبدربه", false), "عبدربه");
        assert_eq!(normalize_name("عبدالاه", false), "عبدالاه");
    }

    #[test]
    fn removes_tanween() {
        assert_eq!(normalize_name("كٍتًاَبٍه", false), "كتابه");
    }

    #[test]
    fn keeps_single_letter() {
        assert_eq!(normalize_name("ز", false), "ز");
    }

    #[test]
    fn folds_yeh_for_autocomplete() {
        assert_eq!(normalize_name("ي", true), "ى");
        assert_eq!(normalize_name("زي", true), "زى");
        assert_eq!(normalize_name("زيا", true), "زىا");
        assert_eq!(normalize_name("علي", true), "على");
        assert_eq!(normalize_name("على", true), "على");
    }

    #[test]
    fn folds_yeh_before_space_without_autocomplete() {
        assert_eq!(normalize_name("علي محمد", false), "على محمد");
        assert_eq!(normalize_name("ريم", false), "ريم");
    }

    #[test]
    fn idempotent_on_representative_names() {
        let names = [
            "أحمد",
            "عبدالرحمن",
            "عبد ربه",
            "عبدالاه",
            "عبد الاه",
            "عبدالله",
            "كٍتًاَبٍه",
            "روميسائ",
            "علي محمد عبدالعزيز",
            "Latin Name",
        ];
        for name in names {
            for autocomplete in [false, true] {
                let once = normalize_name(name, autocomplete);
                let twice = normalize_name(&once, autocomplete);
                assert_eq!(once, twice, "not idempotent for {name}");
            }
        }
    }

    #[test]
    fn passes_non_arabic_through() {
        assert_eq!(normalize_name("John Smith", false), "John Smith");
        assert_eq!(normalize_name("", false), "");
    }
}
