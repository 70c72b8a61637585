//! Distinguished name parsing.
//!
//! Providers render subject and issuer names as `KEY=VALUE` tokens separated
//! by `,` or `+`. Values may be quoted; inside quotes `""` is a literal `"`
//! and separators carry no meaning.

use serde::{Deserialize, Serialize};

/// Ordered attribute list of a parsed distinguished name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistinguishedName {
    attributes: Vec<(String, String)>,
}

impl DistinguishedName {
    /// Parse a provider-rendered name. Malformed fragments are skipped.
    pub fn parse(source: &str) -> Self {
        let mut attributes = Vec::new();
        let mut chars = source.chars().peekable();

        loop {
            // Key runs up to '='; a separator first means a fragment without a key.
            let mut key = String::new();
            let mut has_eq = false;
            while let Some(c) = chars.next() {
                match c {
                    '=' => {
                        has_eq = true;
                        break;
                    }
                    ',' | '+' => break,
                    _ => key.push(c),
                }
            }
            if !has_eq {
                if chars.peek().is_none() {
                    break;
                }
                continue;
            }

            while chars.next_if(|c| c.is_whitespace()).is_some() {}

            let mut value = String::new();
            if chars.next_if_eq(&'"').is_some() {
                while let Some(c) = chars.next() {
                    if c == '"' {
                        if chars.next_if_eq(&'"').is_some() {
                            value.push('"');
                        } else {
                            break;
                        }
                    } else {
                        value.push(c);
                    }
                }
                // Skip anything between the closing quote and the next separator.
                while chars.next_if(|c| *c != ',' && *c != '+').is_some() {}
            } else {
                while let Some(c) = chars.next_if(|c| *c != ',' && *c != '+') {
                    value.push(c);
                }
                value = value.trim_end().to_string();
            }
            chars.next();

            let key = key.trim();
            if !key.is_empty() {
                attributes.push((key.to_string(), value));
            }
        }

        Self { attributes }
    }

    /// First value recorded for `key` (case-insensitive).
    pub fn get(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// All values recorded for `key`, in order.
    pub fn get_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.attributes
            .iter()
            .filter(move |(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Common name, if present.
    pub fn common_name(&self) -> Option<&str> {
        self.get("CN")
    }

    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_pairs() {
        let dn = DistinguishedName::parse("CN=Ivanov Ivan, O=Roga i Kopyta, C=RU");
        assert_eq!(dn.common_name(), Some("Ivanov Ivan"));
        assert_eq!(dn.get("O"), Some("Roga i Kopyta"));
        assert_eq!(dn.get("c"), Some("RU"));
        assert_eq!(dn.attributes().len(), 3);
    }

    #[test]
    fn parses_without_spaces_after_separator() {
        let dn = DistinguishedName::parse("CN=Test,O=Org,L=Moscow");
        assert_eq!(dn.common_name(), Some("Test"));
        assert_eq!(dn.get("O"), Some("Org"));
        assert_eq!(dn.get("L"), Some("Moscow"));
    }

    #[test]
    fn quoted_values_keep_separators_and_escaped_quotes() {
        let dn = DistinguishedName::parse(
            r#"CN="OOO ""Romashka"", branch", O="A+B", STREET="ul. Lenina, 1""#,
        );
        assert_eq!(dn.common_name(), Some(r#"OOO "Romashka", branch"#));
        assert_eq!(dn.get("O"), Some("A+B"));
        assert_eq!(dn.get("STREET"), Some("ul. Lenina, 1"));
    }

    #[test]
    fn plus_separates_multi_valued_rdn() {
        let dn = DistinguishedName::parse("CN=Signer+SNILS=12345678901, C=RU");
        assert_eq!(dn.common_name(), Some("Signer"));
        assert_eq!(dn.get("SNILS"), Some("12345678901"));
        assert_eq!(dn.get("C"), Some("RU"));
    }

    #[test]
    fn repeated_keys_are_all_kept() {
        let dn = DistinguishedName::parse("OU=Dev, OU=Ops, CN=Svc");
        assert_eq!(dn.get("OU"), Some("Dev"));
        assert_eq!(dn.get_all("OU").collect::<Vec<_>>(), vec!["Dev", "Ops"]);
    }

    #[test]
    fn oid_keys_and_empty_values() {
        let dn = DistinguishedName::parse("1.2.643.100.1=1027700132195, E=, CN=X");
        assert_eq!(dn.get("1.2.643.100.1"), Some("1027700132195"));
        assert_eq!(dn.get("E"), Some(""));
        assert_eq!(dn.common_name(), Some("X"));
    }

    #[test]
    fn garbage_yields_no_attributes() {
        assert!(DistinguishedName::parse("").is_empty());
        assert!(DistinguishedName::parse("no pairs here").is_empty());
        let dn = DistinguishedName::parse("junk, CN=Kept");
        assert_eq!(dn.common_name(), Some("Kept"));
    }
}
