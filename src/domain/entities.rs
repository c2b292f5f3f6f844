//! Domain entities: packages and the three-level MSC taxonomy

use std::fmt;

use serde::{Deserialize, Serialize};

/// A library package tagged with one MSC classification code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    pub name: String,
    pub url: String,
    pub description: String,
    pub authors: String,
    pub verified: bool,
    /// MSC code this package is filed under (matched case-insensitively)
    #[serde(rename = "msc")]
    pub classification_code: String,
}

impl Package {
    /// Case-folded classification code used as the join key.
    pub fn code_key(&self) -> String {
        normalize_code(&self.classification_code)
    }
}

/// Leaf taxonomy node, e.g. `03B35: Mechanization of proofs`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BottomClassification {
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub packages: Vec<Package>,
    #[serde(default)]
    pub package_count: usize,
}

/// Middle taxonomy node, e.g. `03Bxx: General logic`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MidClassification {
    pub name: String,
    pub code: String,
    /// Packages tagged directly with this code
    #[serde(default)]
    pub packages: Vec<Package>,
    #[serde(default)]
    pub classifications: Vec<BottomClassification>,
    #[serde(default)]
    pub package_count: usize,
}

/// Top taxonomy node, e.g. `03-XX: Mathematical logic and foundations`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopClassification {
    pub short_name: String,
    pub code: String,
    #[serde(default)]
    pub packages: Vec<Package>,
    #[serde(default)]
    pub classifications: Vec<BottomClassification>,
    #[serde(default)]
    pub subclassifications: Vec<MidClassification>,
    #[serde(default)]
    pub package_count: usize,
}

/// Ordered sequence of top classifications, fixed once loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Taxonomy {
    pub tops: Vec<TopClassification>,
}

impl Taxonomy {
    pub fn new(tops: Vec<TopClassification>) -> Self {
        Self { tops }
    }

    pub fn len(&self) -> usize {
        self.tops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tops.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TopClassification> {
        self.tops.iter()
    }

    /// Sum of all top-level counts.
    pub fn total_packages(&self) -> usize {
        self.tops.iter().map(|t| t.package_count).sum()
    }

    /// Locate the node carrying `code`, searching top, bottom and mid levels.
    pub fn locate(&self, code: &str) -> Option<ClassRef> {
        let key = normalize_code(code);
        for (top, t) in self.tops.iter().enumerate() {
            if normalize_code(&t.code) == key {
                return Some(ClassRef::Top { top });
            }
            for (bottom, b) in t.classifications.iter().enumerate() {
                if normalize_code(&b.code) == key {
                    return Some(ClassRef::Bottom {
                        top,
                        mid: None,
                        bottom,
                    });
                }
            }
            for (mid, m) in t.subclassifications.iter().enumerate() {
                if normalize_code(&m.code) == key {
                    return Some(ClassRef::Mid { top, mid });
                }
                for (bottom, b) in m.classifications.iter().enumerate() {
                    if normalize_code(&b.code) == key {
                        return Some(ClassRef::Bottom {
                            top,
                            mid: Some(mid),
                            bottom,
                        });
                    }
                }
            }
        }
        None
    }

    /// Resolve a reference to a borrowed view of the classification.
    pub fn resolve(&self, class: ClassRef) -> Option<Classification<'_>> {
        match class {
            ClassRef::Top { top } => self.tops.get(top).map(Classification::Top),
            ClassRef::Mid { top, mid } => self
                .tops
                .get(top)?
                .subclassifications
                .get(mid)
                .map(Classification::Mid),
            ClassRef::Bottom { top, mid, bottom } => {
                let t = self.tops.get(top)?;
                let bottoms = match mid {
                    Some(mid) => &t.subclassifications.get(mid)?.classifications,
                    None => &t.classifications,
                };
                bottoms.get(bottom).map(Classification::Bottom)
            }
        }
    }

    /// Copy without zero-count classifications at any level.
    ///
    /// Only nodes with `package_count == 0` are dropped, so every remaining
    /// count stays consistent with its children.
    pub fn retain_non_empty(&self) -> Taxonomy {
        let tops = self
            .tops
            .iter()
            .filter(|t| t.package_count > 0)
            .map(|t| TopClassification {
                classifications: non_empty_bottoms(&t.classifications),
                subclassifications: t
                    .subclassifications
                    .iter()
                    .filter(|m| m.package_count > 0)
                    .map(|m| MidClassification {
                        classifications: non_empty_bottoms(&m.classifications),
                        ..m.clone()
                    })
                    .collect(),
                ..t.clone()
            })
            .collect();
        Taxonomy::new(tops)
    }

    /// Every code in the taxonomy that occurs more than once (case-folded).
    pub fn duplicate_codes(&self) -> Vec<String> {
        use itertools::Itertools;

        let mut codes = Vec::new();
        for t in &self.tops {
            codes.push(normalize_code(&t.code));
            codes.extend(t.classifications.iter().map(|b| normalize_code(&b.code)));
            for m in &t.subclassifications {
                codes.push(normalize_code(&m.code));
                codes.extend(m.classifications.iter().map(|b| normalize_code(&b.code)));
            }
        }
        codes.into_iter().duplicates().collect()
    }
}

fn non_empty_bottoms(bottoms: &[BottomClassification]) -> Vec<BottomClassification> {
    bottoms
        .iter()
        .filter(|b| b.package_count > 0)
        .cloned()
        .collect()
}

impl From<Vec<TopClassification>> for Taxonomy {
    fn from(tops: Vec<TopClassification>) -> Self {
        Self::new(tops)
    }
}

/// Position of a classification inside a [`Taxonomy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassRef {
    Top {
        top: usize,
    },
    Mid {
        top: usize,
        mid: usize,
    },
    /// Bottom nodes hang either directly off a top (`mid: None`) or off a mid.
    Bottom {
        top: usize,
        mid: Option<usize>,
        bottom: usize,
    },
}

impl ClassRef {
    /// Reference to the enclosing classification, `None` for tops.
    pub fn parent(&self) -> Option<ClassRef> {
        match *self {
            ClassRef::Top { .. } => None,
            ClassRef::Mid { top, .. } => Some(ClassRef::Top { top }),
            ClassRef::Bottom { top, mid: None, .. } => Some(ClassRef::Top { top }),
            ClassRef::Bottom {
                top, mid: Some(mid), ..
            } => Some(ClassRef::Mid { top, mid }),
        }
    }

    /// Chain from the root down to (and including) this reference.
    pub fn lineage(&self) -> Vec<ClassRef> {
        let mut chain = vec![*self];
        let mut current = *self;
        while let Some(parent) = current.parent() {
            chain.push(parent);
            current = parent;
        }
        chain.reverse();
        chain
    }
}

/// Borrowed view over one classification node, tagged by level.
#[derive(Debug, Clone, Copy)]
pub enum Classification<'a> {
    Top(&'a TopClassification),
    Mid(&'a MidClassification),
    Bottom(&'a BottomClassification),
}

impl<'a> Classification<'a> {
    pub fn code(&self) -> &'a str {
        match self {
            Classification::Top(t) => &t.code,
            Classification::Mid(m) => &m.code,
            Classification::Bottom(b) => &b.code,
        }
    }

    /// Display name; tops carry a short name instead of a name.
    pub fn name(&self) -> &'a str {
        match self {
            Classification::Top(t) => &t.short_name,
            Classification::Mid(m) => &m.name,
            Classification::Bottom(b) => &b.name,
        }
    }

    pub fn package_count(&self) -> usize {
        match self {
            Classification::Top(t) => t.package_count,
            Classification::Mid(m) => m.package_count,
            Classification::Bottom(b) => b.package_count,
        }
    }

    /// Packages tagged directly at this level.
    pub fn packages(&self) -> &'a [Package] {
        match self {
            Classification::Top(t) => &t.packages,
            Classification::Mid(m) => &m.packages,
            Classification::Bottom(b) => &b.packages,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.package_count() == 0
    }

    /// `"<code>: <name> (<count> packages)"`
    pub fn label(&self) -> String {
        format!(
            "{}: {} ({} packages)",
            self.code(),
            self.name(),
            self.package_count()
        )
    }
}

impl fmt::Display for Classification<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// One row of the library index together with the packages read from its file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Library {
    /// Name of the prover the library belongs to
    pub itp: String,
    pub section: String,
    pub file: String,
    pub url: String,
    pub entries: Vec<Package>,
}

/// Case-fold a classification code for comparison. Whitespace is significant.
pub fn normalize_code(code: &str) -> String {
    code.to_lowercase()
}
