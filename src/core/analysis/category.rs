use serde::ser::{Serialize, SerializeMap, Serializer};

/// The fixed set of surface defect classes. Numeric identity matches the
/// detector's class ids and must stay stable across model revisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DefectCategory {
    Pothole = 0,
    AlligatorCracking = 1,
    Crack = 2,
}

impl DefectCategory {
    pub const ALL: [DefectCategory; 3] = [
        DefectCategory::Pothole,
        DefectCategory::AlligatorCracking,
        DefectCategory::Crack,
    ];

    /// Maps a detector class id onto a category. Unknown ids yield `None`
    /// so newer models with extra classes do not break older builds.
    pub fn from_id(id: u32) -> Option<Self> {
        match id {
            0 => Some(DefectCategory::Pothole),
            1 => Some(DefectCategory::AlligatorCracking),
            2 => Some(DefectCategory::Crack),
            _ => None,
        }
    }

    pub fn id(self) -> u32 {
        self as u32
    }

    pub fn label(self) -> &'static str {
        match self {
            DefectCategory::Pothole => "pothole",
            DefectCategory::AlligatorCracking => "alligator_cracking",
            DefectCategory::Crack => "crack",
        }
    }

    pub fn labels() -> [&'static str; 3] {
        Self::ALL.map(Self::label)
    }
}

/// Per-category detection counts for one sample or one report row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CategoryCounts([u32; DefectCategory::ALL.len()]);

impl CategoryCounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&mut self, category: DefectCategory) {
        self.0[category as usize] += 1;
    }

    pub fn get(&self, category: DefectCategory) -> u32 {
        self.0[category as usize]
    }

    pub fn total(&self) -> u32 {
        self.0.iter().sum()
    }
}

impl Serialize for CategoryCounts {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(DefectCategory::ALL.len()))?;
        for category in DefectCategory::ALL {
            map.serialize_entry(category.label(), &self.get(category))?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_id_roundtrip() {
        for category in DefectCategory::ALL {
            assert_eq!(DefectCategory::from_id(category.id()), Some(category));
        }
        assert_eq!(DefectCategory::from_id(3), None);
        assert_eq!(DefectCategory::from_id(99), None);
    }

    #[test]
    fn test_counts_start_at_zero() {
        let counts = CategoryCounts::new();
        assert_eq!(counts.total(), 0);
        for category in DefectCategory::ALL {
            assert_eq!(counts.get(category), 0);
        }
    }

    #[test]
    fn test_counts_increment() {
        let mut counts = CategoryCounts::new();
        counts.increment(DefectCategory::Pothole);
        counts.increment(DefectCategory::Pothole);
        counts.increment(DefectCategory::Crack);
        assert_eq!(counts.get(DefectCategory::Pothole), 2);
        assert_eq!(counts.get(DefectCategory::AlligatorCracking), 0);
        assert_eq!(counts.get(DefectCategory::Crack), 1);
        assert_eq!(counts.total(), 3);
    }

    #[test]
    fn test_counts_serialize_by_label() {
        let mut counts = CategoryCounts::new();
        counts.increment(DefectCategory::AlligatorCracking);
        let value = serde_json::to_value(counts).unwrap();
        assert_eq!(value["pothole"], 0);
        assert_eq!(value["alligator_cracking"], 1);
        assert_eq!(value["crack"], 0);
    }
}
