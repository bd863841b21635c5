use crate::types::{PriceRecord, RecordSet};
use std::collections::BTreeSet;
use tracing::debug;

/// Selection value meaning "no constraint".
pub const ALL: &str = "all";

/// Fields a user can filter on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    ItemCode,
    ItemDescription,
    Region,
}

impl Field {
    pub fn label(&self) -> &'static str {
        match self {
            Field::ItemCode => "Item code",
            Field::ItemDescription => "Item description",
            Field::Region => "Region",
        }
    }

    fn value<'a>(&self, r: &'a PriceRecord) -> Option<&'a str> {
        match self {
            Field::ItemCode => r.item_code.as_deref(),
            Field::ItemDescription => r.item_description.as_deref(),
            Field::Region => r.region.as_deref(),
        }
    }
}

/// One filter choice: no constraint, or an exact value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    All,
    Only(String),
}

impl Selection {
    pub fn only(value: impl Into<String>) -> Self {
        Selection::Only(value.into())
    }

    /// Interpret console input against the values on offer. An exact
    /// match with one of `options` is always taken literally, so values
    /// such as `All` or `Todos` stay selectable; otherwise blank input,
    /// `all` and `todos` (any case) mean no constraint.
    pub fn from_input(input: &str, options: &[String]) -> Self {
        let s = input.trim();
        if options.iter().any(|o| o == s) {
            return Selection::only(s);
        }
        if s.is_empty() || s.eq_ignore_ascii_case(ALL) || s.eq_ignore_ascii_case("todos") {
            Selection::All
        } else {
            Selection::only(s)
        }
    }

    fn into_constraint(self) -> Option<String> {
        match self {
            Selection::All => None,
            Selection::Only(v) => Some(v),
        }
    }
}

/// Optional equality constraints; `None` matches every value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    pub item_code: Option<String>,
    pub item_description: Option<String>,
    pub region: Option<String>,
}

impl FilterCriteria {
    /// Values are matched verbatim and case-sensitively.
    pub fn new(item_code: Selection, item_description: Selection, region: Selection) -> Self {
        Self {
            item_code: item_code.into_constraint(),
            item_description: item_description.into_constraint(),
            region: region.into_constraint(),
        }
    }

    pub fn set(&mut self, field: Field, selection: Selection) {
        let slot = match field {
            Field::ItemCode => &mut self.item_code,
            Field::ItemDescription => &mut self.item_description,
            Field::Region => &mut self.region,
        };
        *slot = selection.into_constraint();
    }

    pub fn is_unconstrained(&self) -> bool {
        self.item_code.is_none() && self.item_description.is_none() && self.region.is_none()
    }

    pub fn matches(&self, r: &PriceRecord) -> bool {
        [
            (Field::ItemCode, &self.item_code),
            (Field::ItemDescription, &self.item_description),
            (Field::Region, &self.region),
        ]
        .iter()
        .all(|(field, wanted)| match wanted {
            None => true,
            Some(w) => field.value(r) == Some(w.as_str()),
        })
    }

    pub fn describe(&self) -> String {
        let show = |v: &Option<String>| v.clone().unwrap_or_else(|| ALL.to_string());
        format!(
            "code={}, description={}, region={}",
            show(&self.item_code),
            show(&self.item_description),
            show(&self.region)
        )
    }
}

/// Keep the records matching every constraint, in their original order.
pub fn apply(records: &RecordSet, criteria: &FilterCriteria) -> RecordSet {
    if criteria.is_unconstrained() {
        return records.clone();
    }
    let kept: Vec<PriceRecord> = records
        .iter()
        .filter(|r| criteria.matches(r))
        .cloned()
        .collect();
    debug!(
        criteria = %criteria.describe(),
        kept = kept.len(),
        total = records.len(),
        "filter applied"
    );
    RecordSet::new(kept)
}

/// Sorted distinct non-empty values of a field, for building selection lists.
pub fn distinct_values(records: &RecordSet, field: Field) -> Vec<String> {
    records
        .iter()
        .filter_map(|r| field.value(r))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::normalize;
    use crate::types::RawRow;

    fn sample() -> RecordSet {
        let rows: Vec<RawRow> = [
            ("A1", "Cimento", "SP", "2024-01-01"),
            ("A1", "Cimento", "RJ", "2024-01-02"),
            ("B2", "Areia", "SP", "2024-01-03"),
            ("", "Brita", "", "2024-01-04"),
        ]
        .iter()
        .map(|(code, desc, region, date)| {
            RawRow::from_pairs([
                ("INSUMOCDG", *code),
                ("INSUMO", *desc),
                ("ESTADO", *region),
                ("DATACOMPRA", *date),
                ("VALORESPRATICADOS", "10"),
            ])
        })
        .collect();
        normalize(&rows).0
    }

    #[test]
    fn all_sentinel_is_identity() {
        let set = sample();
        let criteria = FilterCriteria::new(
            Selection::from_input("all", &[]),
            Selection::from_input("Todos", &[]),
            Selection::from_input(" ", &[]),
        );
        assert!(criteria.is_unconstrained());
        assert_eq!(apply(&set, &criteria), set);
    }

    #[test]
    fn combines_constraints_and_keeps_order() {
        let set = sample();
        let criteria = FilterCriteria::new(Selection::only("A1"), Selection::All, Selection::All);
        let out = apply(&set, &criteria);
        let regions: Vec<_> = out.iter().map(|r| r.region.as_deref()).collect();
        assert_eq!(regions, vec![Some("RJ"), Some("SP")]);

        let criteria = FilterCriteria::new(
            Selection::only("A1"),
            Selection::only("Cimento"),
            Selection::only("SP"),
        );
        assert_eq!(apply(&set, &criteria).len(), 1);
    }

    #[test]
    fn matching_is_case_sensitive() {
        let set = sample();
        let criteria = FilterCriteria::new(Selection::All, Selection::All, Selection::only("sp"));
        assert!(apply(&set, &criteria).is_empty());
    }

    #[test]
    fn null_fields_never_match_a_constraint() {
        let set = sample();
        let criteria = FilterCriteria::new(Selection::All, Selection::only("Brita"), Selection::only("SP"));
        assert!(apply(&set, &criteria).is_empty());
    }

    #[test]
    fn offered_value_named_like_the_sentinel_stays_selectable() {
        let options = vec!["All".to_string(), "Todos".to_string(), "SP".to_string()];
        assert_eq!(Selection::from_input("Todos", &options), Selection::only("Todos"));
        assert_eq!(Selection::from_input(" All ", &options), Selection::only("All"));
        assert_eq!(Selection::from_input("all", &options), Selection::All);
        assert_eq!(Selection::from_input("", &options), Selection::All);
        assert_eq!(Selection::from_input("RJ", &options), Selection::only("RJ"));

        let rows: Vec<RawRow> = ["Todos", "SP"]
            .iter()
            .map(|region| {
                RawRow::from_pairs([
                    ("INSUMOCDG", "A1"),
                    ("INSUMO", "Cimento"),
                    ("ESTADO", *region),
                    ("DATACOMPRA", "2024-01-01"),
                    ("VALORESPRATICADOS", "10"),
                ])
            })
            .collect();
        let set = normalize(&rows).0;
        let regions = distinct_values(&set, Field::Region);
        let mut criteria = FilterCriteria::default();
        criteria.set(Field::Region, Selection::from_input("Todos", &regions));
        let out = apply(&set, &criteria);
        assert_eq!(out.len(), 1);
        assert_eq!(out.records()[0].region.as_deref(), Some("Todos"));
    }

    #[test]
    fn distinct_values_are_sorted_and_skip_nulls() {
        let set = sample();
        assert_eq!(distinct_values(&set, Field::Region), vec!["RJ", "SP"]);
        assert_eq!(
            distinct_values(&set, Field::ItemDescription),
            vec!["Areia", "Brita", "Cimento"]
        );
    }
}
