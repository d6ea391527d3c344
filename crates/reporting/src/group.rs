use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Group ordering for the date-grouped view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl Default for SortDirection {
    fn default() -> Self {
        SortDirection::Desc
    }
}

/// One row of the joined order history: the report-local date the order was
/// placed, the display names of the stock row it hit, and the summed
/// quantity. This is the shape the store's grouped aggregate query produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRow {
    pub occurred_on: NaiveDate,
    pub product_name: String,
    pub variant_name: String,
    pub qty: i64,
}

/// All rows of one calendar date, in the insertion order of the source
/// query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayGroup {
    pub date: NaiveDate,
    pub rows: Vec<OrderRow>,
}

/// Bucket rows by calendar date and order the buckets.
///
/// Pure and restartable: applying it twice to the same input yields the same
/// output. Within a date, row order is the insertion order of `rows`; the
/// groups themselves are ordered by date per `sort`.
pub fn group_by_date(rows: Vec<OrderRow>, sort: SortDirection) -> Vec<DayGroup> {
    let mut buckets: BTreeMap<NaiveDate, Vec<OrderRow>> = BTreeMap::new();
    for row in rows {
        buckets.entry(row.occurred_on).or_default().push(row);
    }

    let grouped = buckets
        .into_iter()
        .map(|(date, rows)| DayGroup { date, rows });

    match sort {
        SortDirection::Asc => grouped.collect(),
        SortDirection::Desc => {
            let mut groups: Vec<DayGroup> = grouped.collect();
            groups.reverse();
            groups
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(date: (i32, u32, u32), product: &str, variant: &str, qty: i64) -> OrderRow {
        OrderRow {
            occurred_on: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            product_name: product.to_string(),
            variant_name: variant.to_string(),
            qty,
        }
    }

    #[test]
    fn desc_orders_groups_newest_first() {
        let rows = vec![
            row((2024, 1, 1), "Beans", "250g", 2),
            row((2024, 1, 2), "Beans", "250g", 1),
        ];

        let groups = group_by_date(rows, SortDirection::Desc);
        let dates: Vec<NaiveDate> = groups.iter().map(|g| g.date).collect();
        assert_eq!(
            dates,
            vec![
                NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            ]
        );
    }

    #[test]
    fn asc_orders_groups_oldest_first() {
        let rows = vec![
            row((2024, 3, 5), "Beans", "1kg", 1),
            row((2024, 2, 29), "Beans", "250g", 4),
        ];

        let groups = group_by_date(rows, SortDirection::Asc);
        assert_eq!(groups[0].date, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        assert_eq!(groups[1].date, NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
    }

    #[test]
    fn insertion_order_is_preserved_within_a_date() {
        let rows = vec![
            row((2024, 1, 1), "Beans", "250g", 2),
            row((2024, 1, 1), "Filters", "V60", 1),
            row((2024, 1, 1), "Beans", "1kg", 3),
        ];

        let groups = group_by_date(rows.clone(), SortDirection::Asc);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].rows, rows);
    }

    #[test]
    fn empty_input_yields_no_groups() {
        assert!(group_by_date(vec![], SortDirection::Desc).is_empty());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn arb_rows() -> impl Strategy<Value = Vec<OrderRow>> {
            proptest::collection::vec(
                (0u32..5, 1i64..100, "[a-z]{1,8}", "[a-z]{1,4}").prop_map(
                    |(day, qty, product, variant)| OrderRow {
                        occurred_on: NaiveDate::from_ymd_opt(2024, 1, 1 + day).unwrap(),
                        product_name: product,
                        variant_name: variant,
                        qty,
                    },
                ),
                0..20,
            )
        }

        proptest! {
            /// Applying the grouping twice to the same input and direction
            /// yields identical output.
            #[test]
            fn idempotent((rows, desc) in (arb_rows(), any::<bool>())) {
                let sort = if desc { SortDirection::Desc } else { SortDirection::Asc };
                prop_assert_eq!(
                    group_by_date(rows.clone(), sort),
                    group_by_date(rows, sort)
                );
            }

            /// No row is lost or invented, and each group holds one date.
            #[test]
            fn conserves_rows(rows in arb_rows()) {
                let groups = group_by_date(rows.clone(), SortDirection::Asc);
                let total: usize = groups.iter().map(|g| g.rows.len()).sum();
                prop_assert_eq!(total, rows.len());
                for g in &groups {
                    prop_assert!(g.rows.iter().all(|r| r.occurred_on == g.date));
                }
            }

            /// Asc and Desc are exact reversals of each other.
            #[test]
            fn desc_is_reversed_asc(rows in arb_rows()) {
                let mut asc = group_by_date(rows.clone(), SortDirection::Asc);
                let desc = group_by_date(rows, SortDirection::Desc);
                asc.reverse();
                prop_assert_eq!(asc, desc);
            }
        }
    }
}
