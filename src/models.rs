use once_cell::sync::Lazy;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::StatsError;

/// Comma-separated list of every category identifier, used in lookup errors
pub static AVAILABLE_CATEGORIES: Lazy<String> = Lazy::new(|| {
    Category::ALL
        .iter()
        .map(|c| c.name())
        .collect::<Vec<_>>()
        .join(", ")
});

/// Video category label.
///
/// `M` is the bulk category: it stands for `Mp` and `Mr` together and is never
/// stored on its own. Declaration order is the reporting order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    E8,
    Mp,
    Mr,
    M,
}

impl Category {
    /// Every category, bulk included, in declaration order
    pub const ALL: [Category; 4] = [Category::E8, Category::Mp, Category::Mr, Category::M];

    pub fn name(&self) -> &'static str {
        match self {
            Category::E8 => "e8",
            Category::Mp => "mp",
            Category::Mr => "mr",
            Category::M => "m",
        }
    }

    /// Stable numeric identifier, accepted in lookups alongside the name
    pub fn code(&self) -> u8 {
        match self {
            Category::E8 => 1,
            Category::Mp => 2,
            Category::Mr => 4,
            Category::M => 6,
        }
    }

    pub fn is_bulk(&self) -> bool {
        matches!(self, Category::M)
    }

    /// Atomic categories this category stands for
    pub fn constituents(&self) -> &'static [Category] {
        match self {
            Category::E8 => &[Category::E8],
            Category::Mp => &[Category::Mp],
            Category::Mr => &[Category::Mr],
            Category::M => &[Category::Mp, Category::Mr],
        }
    }

    /// Non-bulk categories in declaration order
    pub fn atomic() -> impl Iterator<Item = Category> {
        Self::ALL.into_iter().filter(|c| !c.is_bulk())
    }

    fn from_code(code: u8) -> Option<Category> {
        Self::ALL.into_iter().find(|c| c.code() == code)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Category {
    type Err = StatsError;

    /// Parse a category from its name (case-insensitive) or numeric code
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();

        let by_code = trimmed.parse::<u8>().ok().and_then(Category::from_code);
        let by_name = || {
            let lower = trimmed.to_lowercase();
            Category::ALL.into_iter().find(|c| c.name() == lower)
        };

        by_code.or_else(by_name).ok_or_else(|| StatsError::UnknownCategory {
            requested: s.to_string(),
        })
    }
}

/// Set of categories matched by one video.
///
/// Only atomic categories are stored; inserting the bulk category inserts its
/// constituents, and the bulk category is contained once all of them are.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct CategorySet {
    members: BTreeSet<Category>,
}

impl CategorySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, category: Category) {
        self.members.extend(category.constituents().iter().copied());
    }

    pub fn contains(&self, category: Category) -> bool {
        category
            .constituents()
            .iter()
            .all(|c| self.members.contains(c))
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Number of atomic categories in the set
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Atomic categories in declaration order
    pub fn iter(&self) -> impl Iterator<Item = Category> + '_ {
        self.members.iter().copied()
    }
}

impl FromIterator<Category> for CategorySet {
    fn from_iter<I: IntoIterator<Item = Category>>(iter: I) -> Self {
        let mut set = CategorySet::new();
        for category in iter {
            set.insert(category);
        }
        set
    }
}

impl fmt::Display for CategorySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = self.iter().map(|c| c.name()).collect();
        write!(f, "{{{}}}", names.join(", "))
    }
}

/// A classified playlist item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Video {
    pub id: String,
    pub categories: CategorySet,
}

/// One page of classified videos plus the token for the next page, if any
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub videos: Vec<Video>,
    pub next_page_token: Option<String>,
}
