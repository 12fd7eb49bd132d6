//! Procurement identity of a part and the folding rules used to display
//! only the fields that are not already implied by a parent.

use serde::{Deserialize, Serialize};

/// Part number identity. Equality and hashing use the full field tuple.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PartNumberInfo {
    #[serde(default)]
    pub pn: String,
    #[serde(default)]
    pub manufacturer: String,
    #[serde(default)]
    pub mpn: String,
    #[serde(default)]
    pub supplier: String,
    #[serde(default)]
    pub spn: String,
}

/// BOM column headers for the identity fields, in column order.
pub const PART_NUMBER_COLUMNS: [&str; 5] = ["P/N", "Manufacturer", "MPN", "Supplier", "SPN"];

impl PartNumberInfo {
    pub fn new(
        pn: impl Into<String>,
        manufacturer: impl Into<String>,
        mpn: impl Into<String>,
        supplier: impl Into<String>,
        spn: impl Into<String>,
    ) -> Self {
        Self {
            pn: pn.into(),
            manufacturer: manufacturer.into(),
            mpn: mpn.into(),
            supplier: supplier.into(),
            spn: spn.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pn.is_empty()
            && self.manufacturer.is_empty()
            && self.mpn.is_empty()
            && self.supplier.is_empty()
            && self.spn.is_empty()
    }

    fn fields_mut(&mut self) -> [&mut String; 5] {
        [
            &mut self.pn,
            &mut self.manufacturer,
            &mut self.mpn,
            &mut self.supplier,
            &mut self.spn,
        ]
    }

    fn fields(&self) -> [&String; 5] {
        [&self.pn, &self.manufacturer, &self.mpn, &self.supplier, &self.spn]
    }

    /// Values in BOM column order.
    pub fn columns(&self) -> [String; 5] {
        self.fields().map(|f| f.clone())
    }

    fn clear_where(&self, other: &PartNumberInfo, clear_equal: bool) -> PartNumberInfo {
        let mut part = self.clone();
        let theirs = other.fields();
        for (mine, theirs) in part.fields_mut().into_iter().zip(theirs) {
            if (*mine == *theirs) == clear_equal {
                mine.clear();
            }
        }
        part
    }

    /// Keep only the fields equal to `other`.
    pub fn keep_only_eq(&self, other: &PartNumberInfo) -> PartNumberInfo {
        self.clear_where(other, false)
    }

    /// Clear the fields equal to `other`.
    pub fn remove_eq(&self, other: &PartNumberInfo) -> PartNumberInfo {
        self.clear_where(other, true)
    }

    /// Fields shared by every element of `parts`.
    pub fn list_keep_only_eq(parts: &[PartNumberInfo]) -> PartNumberInfo {
        let Some(first) = parts.first() else {
            return PartNumberInfo::default();
        };
        parts
            .iter()
            .fold(first.clone(), |acc, p| acc.keep_only_eq(p))
    }

    /// Display lines: `P/N: ..`, `<manufacturer>: <mpn>`, `<supplier>: <spn>`.
    pub fn str_list(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(3);
        if !self.pn.is_empty() {
            lines.push(format!("P/N: {}", self.pn));
        }
        lines.push(company_line(&self.manufacturer, &self.mpn, "MPN"));
        lines.push(company_line(&self.supplier, &self.spn, "SPN"));
        lines.retain(|l| !l.is_empty());
        lines
    }
}

fn company_line(company: &str, number: &str, fallback: &str) -> String {
    if number.is_empty() {
        return company.to_string();
    }
    let prefix = if company.is_empty() { fallback } else { company };
    format!("{}: {}", prefix, number)
}

/// Per-wire identities of a bundle, with the single-identity operations
/// applied element-wise.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartNumberList(pub Vec<PartNumberInfo>);

impl PartNumberList {
    pub fn keep_only_eq(&self, other: &PartNumberInfo) -> PartNumberList {
        PartNumberList(self.0.iter().map(|p| p.keep_only_eq(other)).collect())
    }

    pub fn remove_eq(&self, other: &PartNumberInfo) -> PartNumberList {
        PartNumberList(self.0.iter().map(|p| p.remove_eq(other)).collect())
    }

    /// The cable-level view: fields shared by every wire.
    pub fn folded(&self) -> PartNumberInfo {
        PartNumberInfo::list_keep_only_eq(&self.0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(PartNumberInfo::is_empty)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PartNumberInfo> {
        self.0.iter()
    }
}

/// Parent of a set of identities, either a single part or a bundle list.
#[derive(Debug, Clone, Copy)]
pub enum PartNumberParent<'a> {
    Single(&'a PartNumberInfo),
    List(&'a PartNumberList),
}

/// Compute display lines for `parts`.
///
/// Without a parent the list is folded to its shared fields and yields one
/// group. With a parent, every element has the parent's fields removed and
/// only non-empty elements produce a group.
pub fn fold_for_display(
    parts: &[PartNumberInfo],
    parent: Option<PartNumberParent<'_>>,
) -> Vec<Vec<String>> {
    let parent = match parent {
        None => return vec![PartNumberInfo::list_keep_only_eq(parts).str_list()],
        Some(PartNumberParent::Single(p)) => p.clone(),
        Some(PartNumberParent::List(list)) => list.folded(),
    };
    parts
        .iter()
        .map(|p| p.remove_eq(&parent))
        .filter(|p| !p.is_empty())
        .map(|p| p.str_list())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pn(mfr: &str, mpn: &str) -> PartNumberInfo {
        PartNumberInfo::new("", mfr, mpn, "", "")
    }

    #[test]
    fn test_str_list() {
        let p = PartNumberInfo::new("123", "Molex", "43025-0400", "", "DK-1");
        assert_eq!(
            p.str_list(),
            vec!["P/N: 123", "Molex: 43025-0400", "SPN: DK-1"]
        );
        assert!(PartNumberInfo::default().str_list().is_empty());
    }

    #[test]
    fn test_keep_and_remove_eq() {
        let a = pn("Belden", "83030");
        let b = pn("Belden", "83029");
        assert_eq!(a.keep_only_eq(&b), pn("Belden", ""));
        assert_eq!(a.remove_eq(&b), pn("", "83030"));
    }

    #[test]
    fn test_list_fold() {
        let list = PartNumberList(vec![pn("Belden", "1"), pn("Belden", "2")]);
        assert_eq!(list.folded(), pn("Belden", ""));
        assert_eq!(list.remove_eq(&list.folded()).0[1], pn("", "2"));
    }

    #[test]
    fn test_fold_for_display_with_parent() {
        let parts = vec![pn("Belden", "1"), pn("Belden", "")];
        let parent = pn("Belden", "");
        let groups = fold_for_display(&parts, Some(PartNumberParent::Single(&parent)));
        // second wire is fully implied by the parent
        assert_eq!(groups, vec![vec!["MPN: 1".to_string()]]);

        let groups = fold_for_display(&parts, None);
        assert_eq!(groups, vec![vec!["Belden".to_string()]]);
    }
}
