use geo::Point;
use serde::Serialize;
use std::fmt::Debug;
use std::hash::Hash;

const BLUE_DOT: &str = "http://maps.google.com/mapfiles/ms/icons/blue-dot.png";
const PURPLE_DOT: &str = "http://maps.google.com/mapfiles/ms/icons/purple-dot.png";
const PINK_DOT: &str = "http://maps.google.com/mapfiles/ms/icons/pink-dot.png";
const RED_DOT: &str = "http://maps.google.com/mapfiles/ms/icons/red-dot.png";
const ORANGE_DOT: &str = "http://maps.google.com/mapfiles/ms/icons/orange-dot.png";
const GREEN_DOT: &str = "http://maps.google.com/mapfiles/ms/icons/green-dot.png";
const YELLOW_DOT: &str = "http://maps.google.com/mapfiles/ms/icons/yellow-dot.png";
const GRAY_DOT: &str = "http://maps.google.com/mapfiles/ms/icons/gray-dot.png";

/// A closed classification scheme for investor records.
///
/// Every scheme carries a reserved `Unclassified` variant so that unknown or
/// missing labels are a typed case instead of a lookup miss.
pub trait Category: Copy + Eq + Ord + Hash + Debug + Send + Sync + 'static {
    /// Every variant, in legend/toggle order. Includes the fallback bucket.
    const ALL: &'static [Self];
    /// JSON field the label is read from.
    const FIELD: &'static str;
    /// Scheme name used in URLs and logs.
    const SCHEME: &'static str;

    fn from_label(label: &str) -> Self;
    fn label(&self) -> &'static str;
    fn short_name(&self) -> &'static str;
    fn icon(&self) -> &'static str;
    fn is_unclassified(&self) -> bool;

    /// Resolves a toggle name, accepting either the full label or the caption.
    fn from_toggle_name(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.label() == name || c.short_name().eq_ignore_ascii_case(name))
    }
}

/// Holding-size tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Tier {
    Strategic,
    Large,
    Medium,
    Small,
    Micro,
    Unclassified,
}

impl Category for Tier {
    const ALL: &'static [Self] = &[
        Tier::Strategic,
        Tier::Large,
        Tier::Medium,
        Tier::Small,
        Tier::Micro,
        Tier::Unclassified,
    ];
    const FIELD: &'static str = "tier";
    const SCHEME: &'static str = "tier";

    fn from_label(label: &str) -> Self {
        Self::ALL
            .iter()
            .copied()
            .find(|t| !t.is_unclassified() && t.label() == label)
            .unwrap_or(Tier::Unclassified)
    }

    fn label(&self) -> &'static str {
        match self {
            Tier::Strategic => "Strategic – more than 1,000,000 shares",
            Tier::Large => "Large – up to 1,000,000 shares",
            Tier::Medium => "Medium – up to 100,000 shares",
            Tier::Small => "Small – up to 10,000 shares",
            Tier::Micro => "Micro – up to 1,000 shares",
            Tier::Unclassified => "Unclassified",
        }
    }

    fn short_name(&self) -> &'static str {
        match self {
            Tier::Strategic => "Strategic",
            Tier::Large => "Large",
            Tier::Medium => "Medium",
            Tier::Small => "Small",
            Tier::Micro => "Micro",
            Tier::Unclassified => "Unclassified",
        }
    }

    fn icon(&self) -> &'static str {
        match self {
            Tier::Strategic => BLUE_DOT,
            Tier::Large => PURPLE_DOT,
            Tier::Medium => PINK_DOT,
            Tier::Small => RED_DOT,
            Tier::Micro => ORANGE_DOT,
            // Unknown tiers fall back to the strategic icon on the map.
            Tier::Unclassified => BLUE_DOT,
        }
    }

    fn is_unclassified(&self) -> bool {
        matches!(self, Tier::Unclassified)
    }
}

/// Contact-priority clusters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Cluster {
    TopPriority,
    HighPotential,
    Potential,
    LowPotential,
    PendingContact,
    DoNotContact,
    Unclassified,
}

impl Category for Cluster {
    const ALL: &'static [Self] = &[
        Cluster::TopPriority,
        Cluster::HighPotential,
        Cluster::Potential,
        Cluster::LowPotential,
        Cluster::PendingContact,
        Cluster::DoNotContact,
        Cluster::Unclassified,
    ];
    const FIELD: &'static str = "cluster";
    const SCHEME: &'static str = "cluster";

    fn from_label(label: &str) -> Self {
        Self::ALL
            .iter()
            .copied()
            .find(|c| !c.is_unclassified() && c.label() == label)
            .unwrap_or(Cluster::Unclassified)
    }

    fn label(&self) -> &'static str {
        match self {
            Cluster::TopPriority => "Top Priority Contacts",
            Cluster::HighPotential => "High-Potential Contacts",
            Cluster::Potential => "Potential Contacts",
            Cluster::LowPotential => "Low-Potential Contacts",
            Cluster::PendingContact => "Pending Contact Method",
            Cluster::DoNotContact => "Do Not Contact",
            Cluster::Unclassified => "Unclassified",
        }
    }

    fn short_name(&self) -> &'static str {
        match self {
            Cluster::TopPriority => "Top Priority",
            Cluster::HighPotential => "High-Potential",
            Cluster::Potential => "Potential",
            Cluster::LowPotential => "Low-Potential",
            Cluster::PendingContact => "Pending Contact",
            Cluster::DoNotContact => "Do Not Contact",
            Cluster::Unclassified => "Unclassified",
        }
    }

    fn icon(&self) -> &'static str {
        match self {
            Cluster::TopPriority => BLUE_DOT,
            Cluster::HighPotential => PURPLE_DOT,
            Cluster::Potential => PINK_DOT,
            Cluster::LowPotential => ORANGE_DOT,
            Cluster::PendingContact => GREEN_DOT,
            Cluster::DoNotContact => YELLOW_DOT,
            Cluster::Unclassified => GRAY_DOT,
        }
    }

    fn is_unclassified(&self) -> bool {
        matches!(self, Cluster::Unclassified)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn to_point(self) -> Point<f64> {
        Point::new(self.lon, self.lat)
    }
}

/// One classified investor as loaded from the data source.
#[derive(Debug, Clone)]
pub struct Record<C> {
    pub name: String,
    pub coordinate: Option<Coordinate>,
    pub category: C,
    // Display-only fields (city, shares, income, age, province...)
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl<C> Record<C> {
    pub fn attribute_text(&self, key: &str) -> Option<String> {
        match self.attributes.get(key)? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Null => None,
            other => Some(other.to_string()),
        }
    }

    /// Marker hover title, `"{name} ({city})"`.
    pub fn title(&self) -> String {
        match self.attribute_text("city") {
            Some(city) => format!("{} ({})", self.name, city),
            None => self.name.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct MarkerId(pub usize);

/// A rendered marker: the record, its jittered position and its visibility.
#[derive(Debug, Clone)]
pub struct MarkerEntry<C> {
    pub id: MarkerId,
    pub record: Record<C>,
    pub position: Point<f64>,
    pub(crate) visible: bool,
}

impl<C> MarkerEntry<C> {
    pub fn is_visible(&self) -> bool {
        self.visible
    }
}
