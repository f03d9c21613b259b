// Discrete palettes for group-keyed traces

use std::collections::HashMap;

/// Google "G10" qualitative palette
pub const G10: [&str; 10] = [
    "#3366CC", "#DC3912", "#FF9900", "#109618", "#990099", "#0099C6", "#DD4477", "#66AA00",
    "#B82E2E", "#316395",
];

/// Spring, Summer, Autumn, Winter
pub const SEASON: [&str; 4] = ["green", "red", "orange", "blue"];

pub const DASHES: [&str; 6] = ["solid", "dot", "dash", "longdash", "dashdot", "longdashdot"];

/// Cycles a list of values over an ordered set of category keys
#[derive(Debug, Clone)]
pub struct DiscretePalette {
    values: Vec<String>,
}

impl DiscretePalette {
    pub fn new(values: Vec<String>) -> Self {
        Self { values }
    }

    pub fn g10() -> Self {
        Self::from_static(&G10)
    }

    pub fn season() -> Self {
        Self::from_static(&SEASON)
    }

    pub fn dashes() -> Self {
        Self::from_static(&DASHES)
    }

    fn from_static(values: &[&str]) -> Self {
        Self::new(values.iter().map(|s| s.to_string()).collect())
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// Value at a domain position, wrapping around the palette
    pub fn get(&self, index: usize) -> Option<&str> {
        if self.values.is_empty() {
            None
        } else {
            Some(self.values[index % self.values.len()].as_str())
        }
    }

    /// Map each key to the palette entry at its position in `domain`
    pub fn assign(&self, domain: &[String]) -> HashMap<String, String> {
        domain
            .iter()
            .enumerate()
            .filter_map(|(i, key)| self.get(i).map(|v| (key.clone(), v.to_string())))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palette_wraps() {
        let p = DiscretePalette::season();
        assert_eq!(p.get(0), Some("green"));
        assert_eq!(p.get(7), Some("blue"));
    }

    #[test]
    fn test_assign_domain() {
        let domain = vec!["Spring".to_string(), "Summer".to_string()];
        let map = DiscretePalette::season().assign(&domain);
        assert_eq!(map["Summer"], "red");
    }

    #[test]
    fn test_empty_palette() {
        assert_eq!(DiscretePalette::new(vec![]).get(3), None);
    }
}
