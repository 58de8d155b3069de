// 🔎 View Projector - Search filter + display cards
//
// Pure functions only: records + query in, display-ready cards out.

use serde::Serialize;

use crate::config::DEFAULT_ARTWORK_BASE;
use crate::model::Record;

/// Bars are drawn as a percentage of this value
pub const BAR_MAX: i64 = 100;

// ============================================================================
// TYPE COLORS
// ============================================================================

/// Presentation color for a type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TagColor {
    /// Palette token, e.g. "red-500"
    pub token: &'static str,
    pub rgb: [u8; 3],
}

impl TagColor {
    const fn new(token: &'static str, rgb: [u8; 3]) -> Self {
        TagColor { token, rgb }
    }

    /// `#rrggbb`
    pub fn hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.rgb[0], self.rgb[1], self.rgb[2])
    }
}

pub const DEFAULT_TAG_COLOR: TagColor = TagColor::new("gray-400", [0x9c, 0xa3, 0xaf]);

static TYPE_COLORS: &[(&str, TagColor)] = &[
    ("fire", TagColor::new("red-500", [0xef, 0x44, 0x44])),
    ("water", TagColor::new("blue-500", [0x3b, 0x82, 0xf6])),
    ("grass", TagColor::new("green-500", [0x22, 0xc5, 0x5e])),
    ("electric", TagColor::new("yellow-400", [0xfa, 0xcc, 0x15])),
    ("ice", TagColor::new("blue-200", [0xbf, 0xdb, 0xfe])),
    ("fighting", TagColor::new("orange-600", [0xea, 0x58, 0x0c])),
    ("poison", TagColor::new("purple-500", [0xa8, 0x55, 0xf7])),
    ("ground", TagColor::new("yellow-600", [0xca, 0x8a, 0x04])),
    ("flying", TagColor::new("indigo-300", [0xa5, 0xb4, 0xfc])),
    ("psychic", TagColor::new("pink-500", [0xec, 0x48, 0x99])),
    ("bug", TagColor::new("lime-500", [0x84, 0xcc, 0x16])),
    ("rock", TagColor::new("gray-600", [0x4b, 0x55, 0x63])),
    ("ghost", TagColor::new("indigo-700", [0x43, 0x38, 0xca])),
    ("dragon", TagColor::new("purple-700", [0x7e, 0x22, 0xce])),
    ("dark", TagColor::new("gray-800", [0x1f, 0x29, 0x37])),
    ("steel", TagColor::new("gray-400", [0x9c, 0xa3, 0xaf])),
    ("fairy", TagColor::new("pink-300", [0xf9, 0xa8, 0xd4])),
    ("normal", TagColor::new("gray-300", [0xd1, 0xd5, 0xdb])),
];

/// Color for a type name; unknown names get `DEFAULT_TAG_COLOR`
pub fn type_color(type_name: &str) -> TagColor {
    TYPE_COLORS
        .iter()
        .find(|(name, _)| *name == type_name)
        .map(|(_, color)| *color)
        .unwrap_or(DEFAULT_TAG_COLOR)
}

// ============================================================================
// STATS
// ============================================================================

/// The four stats shown on a card, by position in `Record::stats`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatKind {
    Hp,
    Attack,
    Defense,
    SpecialAttack,
}

impl StatKind {
    pub const ALL: [StatKind; 4] = [
        StatKind::Hp,
        StatKind::Attack,
        StatKind::Defense,
        StatKind::SpecialAttack,
    ];

    pub fn index(&self) -> usize {
        match self {
            StatKind::Hp => 0,
            StatKind::Attack => 1,
            StatKind::Defense => 2,
            StatKind::SpecialAttack => 3,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            StatKind::Hp => "HP",
            StatKind::Attack => "ATK",
            StatKind::Defense => "DEF",
            StatKind::SpecialAttack => "SP.ATK",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatBar {
    pub kind: StatKind,
    /// Raw value, shown as the label
    pub value: i64,
    /// Bar width in percent, clamped to [0, BAR_MAX]
    pub width: u8,
}

impl StatBar {
    pub fn new(kind: StatKind, value: i64) -> Self {
        StatBar {
            kind,
            value,
            width: bar_width(value),
        }
    }
}

pub fn bar_width(value: i64) -> u8 {
    value.clamp(0, BAR_MAX) as u8
}

// ============================================================================
// DISPLAY CARD
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeTag {
    pub name: String,
    pub color: TagColor,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayCard {
    pub id: u32,
    pub name: String,
    pub types: Vec<TypeTag>,
    pub stats: [StatBar; 4],
    pub artwork_url: String,
}

impl DisplayCard {
    pub fn from_record(record: &Record, artwork_base: &str) -> Self {
        let mut types: Vec<TypeTag> = Vec::with_capacity(record.types.len());
        for name in record.type_names() {
            if types.iter().any(|tag| tag.name == name) {
                continue;
            }
            types.push(TypeTag {
                name: name.to_string(),
                color: type_color(name),
            });
        }

        DisplayCard {
            id: record.id,
            name: record.name.clone(),
            types,
            stats: StatKind::ALL.map(|kind| StatBar::new(kind, record.stat_at(kind.index()))),
            artwork_url: artwork_url(artwork_base, record.id),
        }
    }

    pub fn stat(&self, kind: StatKind) -> &StatBar {
        &self.stats[kind.index()]
    }
}

/// Official artwork image for a record id
pub fn artwork_url(artwork_base: &str, id: u32) -> String {
    format!("{}/{}.png", artwork_base.trim_end_matches('/'), id)
}

// ============================================================================
// FILTER + PROJECT
// ============================================================================

/// Case-insensitive substring match; the empty query matches everything
pub fn matches_query(name: &str, query: &str) -> bool {
    query.is_empty() || name.to_lowercase().contains(&query.to_lowercase())
}

/// Records whose name matches `query`, original order kept
pub fn filter<'a>(records: &'a [Record], query: &str) -> Vec<&'a Record> {
    records
        .iter()
        .filter(|record| matches_query(&record.name, query))
        .collect()
}

/// Filter by `query` and map every kept record to a card
pub fn project(records: &[Record], query: &str) -> Vec<DisplayCard> {
    project_with(records, query, DEFAULT_ARTWORK_BASE)
}

pub fn project_with(records: &[Record], query: &str, artwork_base: &str) -> Vec<DisplayCard> {
    filter(records, query)
        .into_iter()
        .map(|record| DisplayCard::from_record(record, artwork_base))
        .collect()
}

// ============================================================================
// VIEW STATUS
// ============================================================================

/// What the view should show besides the cards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewStatus {
    /// Nothing to show yet, a refresh is running
    Loading,
    /// Nothing matches (or nothing was loaded)
    NoResults,
    Ready,
}

impl ViewStatus {
    pub fn of(loading: bool, cards: &[DisplayCard]) -> Self {
        match (cards.is_empty(), loading) {
            (false, _) => ViewStatus::Ready,
            (true, true) => ViewStatus::Loading,
            (true, false) => ViewStatus::NoResults,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
