use std::fmt;

use serde::{Serialize, Serializer};

/// Ordinal age range derived from a record's age.
///
/// Half-open intervals: `[0,25)`, `[25,35)`, `[35,45)`, `[45,55)`, `[55,∞)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AgeBucket {
    Under25,
    From25To34,
    From35To44,
    From45To54,
    From55,
}

impl AgeBucket {
    pub fn from_age(age: u32) -> Self {
        match age {
            0..=24 => AgeBucket::Under25,
            25..=34 => AgeBucket::From25To34,
            35..=44 => AgeBucket::From35To44,
            45..=54 => AgeBucket::From45To54,
            _ => AgeBucket::From55,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AgeBucket::Under25 => "<25",
            AgeBucket::From25To34 => "25-34",
            AgeBucket::From35To44 => "35-44",
            AgeBucket::From45To54 => "45-54",
            AgeBucket::From55 => "55+",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ordered().into_iter().find(|b| b.label() == label)
    }

    pub fn ordered() -> [AgeBucket; 5] {
        [
            AgeBucket::Under25,
            AgeBucket::From25To34,
            AgeBucket::From35To44,
            AgeBucket::From45To54,
            AgeBucket::From55,
        ]
    }

    /// Position on an ordinal axis (0-based), used for chart placement.
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for AgeBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for AgeBucket {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundaries_fall_into_the_upper_bucket() {
        assert_eq!(AgeBucket::from_age(24).label(), "<25");
        assert_eq!(AgeBucket::from_age(25).label(), "25-34");
        assert_eq!(AgeBucket::from_age(34).label(), "25-34");
        assert_eq!(AgeBucket::from_age(35).label(), "35-44");
        assert_eq!(AgeBucket::from_age(44).label(), "35-44");
        assert_eq!(AgeBucket::from_age(45).label(), "45-54");
        assert_eq!(AgeBucket::from_age(54).label(), "45-54");
        assert_eq!(AgeBucket::from_age(55).label(), "55+");
    }

    #[test]
    fn buckets_partition_ages_without_gaps() {
        let mut previous = AgeBucket::from_age(0);
        assert_eq!(previous, AgeBucket::Under25);
        for age in 1..=130 {
            let bucket = AgeBucket::from_age(age);
            // Monotone and never skips a bucket.
            assert!(bucket.index() == previous.index() || bucket.index() == previous.index() + 1);
            previous = bucket;
        }
        assert_eq!(previous, AgeBucket::From55);
        assert_eq!(AgeBucket::from_age(u32::MAX), AgeBucket::From55);
    }

    #[test]
    fn ordered_matches_index() {
        for (i, bucket) in AgeBucket::ordered().into_iter().enumerate() {
            assert_eq!(bucket.index(), i);
            assert_eq!(AgeBucket::from_label(bucket.label()), Some(bucket));
        }
        assert_eq!(AgeBucket::from_label("60+"), None);
    }
}
