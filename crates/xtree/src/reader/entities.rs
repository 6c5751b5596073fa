//! Entity references: predefined, numeric and DOCTYPE-declared

use std::collections::HashMap;

/// A general entity declared in the DOCTYPE internal subset
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EntityDef {
    /// Replacement text given inline
    Internal(String),
    /// Replacement text lives in the resource named by the system id
    External { system_id: String },
}

/// Declared general entities. The first declaration of a name is binding.
#[derive(Clone, Debug, Default)]
pub struct EntityTable {
    entries: HashMap<String, EntityDef>,
}

impl EntityTable {
    pub fn declare(&mut self, name: String, def: EntityDef) {
        self.entries.entry(name).or_insert(def);
    }

    pub fn get(&self, name: &str) -> Option<&EntityDef> {
        self.entries.get(name)
    }
}

/// `&amp;`, `&lt;`, `&gt;`, `&quot;`, `&apos;`
pub fn predefined(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => None,
    }
}

/// `#NN` and `#xHH` character references. Signs are not digits, and the
/// code point must be a legal XML `Char`.
pub fn numeric(name: &str) -> Option<char> {
    let digits = name.strip_prefix('#')?;
    let (digits, radix) = match digits.strip_prefix('x') {
        Some(hex) => (hex, 16),
        None => (digits, 10),
    };
    if digits.is_empty() || !digits.chars().all(|ch| ch.is_digit(radix)) {
        return None;
    }
    u32::from_str_radix(digits, radix)
        .ok()
        .and_then(char::from_u32)
        .filter(|ch| is_xml_char(*ch))
}

/// The `Char` production of XML 1.0
pub const fn is_xml_char(ch: char) -> bool {
    matches!(
        ch,
        '\t' | '\n'
            | '\r'
            | '\u{20}'..='\u{D7FF}'
            | '\u{E000}'..='\u{FFFD}'
            | '\u{10000}'..='\u{10FFFF}'
    )
}

/// Expand character references inside an entity literal. General entity
/// references, predefined ones included, stay as written and are expanded
/// when the entity is used.
///
/// Returns the offending reference name when one is malformed or unterminated.
pub fn expand_literal(input: &str) -> Result<String, String> {
    let mut result = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(amp) = rest.find('&') {
        let (before, after) = rest.split_at(amp);
        result.push_str(before);
        let after = after.get(1..).unwrap_or_default();
        let Some(semi) = after.find(';') else {
            return Err(after.to_string());
        };
        let (name, tail) = after.split_at(semi);
        if name.starts_with('#') {
            match numeric(name) {
                Some(ch) => result.push(ch),
                None => return Err(name.to_string()),
            }
        } else if name.is_empty() {
            return Err(String::new());
        } else {
            result.push('&');
            result.push_str(name);
            result.push(';');
        }
        rest = tail.get(1..).unwrap_or_default();
    }
    result.push_str(rest);
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predefined() {
        assert_eq!(predefined("lt"), Some('<'));
        assert_eq!(predefined("nbsp"), None);
    }

    #[test]
    fn test_numeric() {
        assert_eq!(numeric("#65"), Some('A'));
        assert_eq!(numeric("#x263A"), Some('☺'));
        assert_eq!(numeric("#xD800"), None);
        assert_eq!(numeric("amp"), None);
    }

    #[test]
    fn test_numeric_rejects_signs_and_non_chars() {
        assert_eq!(numeric("#+65"), None);
        assert_eq!(numeric("#x+41"), None);
        assert_eq!(numeric("#-1"), None);
        assert_eq!(numeric("#"), None);
        assert_eq!(numeric("#x"), None);
        assert_eq!(numeric("#0"), None);
        assert_eq!(numeric("#x1F"), None);
        assert_eq!(numeric("#xFFFE"), None);
        assert_eq!(numeric("#9"), Some('\t'));
        assert_eq!(numeric("#x10000"), Some('\u{10000}'));
    }

    #[test]
    fn test_expand_literal() {
        assert_eq!(
            expand_literal("a &amp; b &#33;"),
            Ok("a &amp; b !".to_string())
        );
        assert_eq!(expand_literal("plain"), Ok("plain".to_string()));
        assert_eq!(expand_literal("&other; x"), Ok("&other; x".to_string()));
        assert_eq!(expand_literal("&#xZZ;"), Err("#xZZ".to_string()));
        assert_eq!(expand_literal("&amp"), Err("amp".to_string()));
    }

    #[test]
    fn test_first_declaration_wins() {
        let mut table = EntityTable::default();
        table.declare("e".to_string(), EntityDef::Internal("one".to_string()));
        table.declare("e".to_string(), EntityDef::Internal("two".to_string()));
        assert_eq!(table.get("e"), Some(&EntityDef::Internal("one".to_string())));
    }
}
