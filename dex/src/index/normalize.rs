//! Query normalization shared by the index and the resolver
//!
//! Both sides of every comparison go through [`normalize`], so "Mr. Mime",
//! "mr_mime" and "MR MIME" all meet at `mr-mime`.

/// Regional prefixes that users write before the species name while the
/// upstream puts the region after it ("galarian ponyta" -> "ponyta-galar")
const REGIONAL_PREFIXES: [(&str, &str); 8] = [
    ("galarian", "galar"),
    ("galar", "galar"),
    ("hisuian", "hisui"),
    ("hisui", "hisui"),
    ("paldean", "paldea"),
    ("paldea", "paldea"),
    ("alolan", "alola"),
    ("alola", "alola"),
];

fn fold_char(c: char, out: &mut String) {
    match c {
        '♂' => out.push('m'),
        '♀' => out.push('f'),
        ' ' | '_' | '\t' => out.push('-'),
        '\'' | '’' | '.' | ':' | '(' | ')' => {}
        'à' | 'á' | 'â' | 'ä' | 'ã' => out.push('a'),
        'è' | 'é' | 'ê' | 'ë' => out.push('e'),
        'ì' | 'í' | 'î' | 'ï' => out.push('i'),
        'ò' | 'ó' | 'ô' | 'ö' | 'õ' => out.push('o'),
        'ù' | 'ú' | 'û' | 'ü' => out.push('u'),
        'ñ' => out.push('n'),
        'ç' => out.push('c'),
        other => out.extend(other.to_lowercase()),
    }
}

/// Normalize user input or an index name into comparable form
pub fn normalize(text: &str) -> String {
    let mut folded = String::with_capacity(text.len());
    for c in text.trim().chars().flat_map(char::to_lowercase) {
        fold_char(c, &mut folded);
    }

    // Collapse separator runs left behind by removed punctuation
    let mut collapsed = String::with_capacity(folded.len());
    for part in folded.split('-').filter(|p| !p.is_empty()) {
        if !collapsed.is_empty() {
            collapsed.push('-');
        }
        collapsed.push_str(part);
    }

    for (prefix, region) in REGIONAL_PREFIXES {
        if let Some(rest) = collapsed.strip_prefix(prefix)
            && let Some(species) = rest.strip_prefix('-')
            && !species.is_empty()
        {
            return format!("{species}-{region}");
        }
    }

    collapsed
}
