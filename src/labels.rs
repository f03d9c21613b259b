//! Chart title synthesis and canonical category orders.

use indexmap::IndexMap;
use std::collections::HashMap;

use crate::data::compare_cells;
use crate::options::FilterValue;

pub type CategoryOrders = HashMap<String, Vec<String>>;

/// Canonical orders for the categorical columns produced by time-feature
/// derivation. A fresh table is built on every call.
pub fn default_category_orders() -> CategoryOrders {
    let day_order = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
    let weekend_order = ["Weekday", "Weekend"];
    let season_order = ["Spring", "Summer", "Autumn", "Winter"];
    let month_order = [
        "January",
        "February",
        "March",
        "April",
        "May",
        "June",
        "July",
        "August",
        "September",
        "October",
        "November",
        "December",
    ];

    let to_vec = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();

    let mut orders = HashMap::new();
    orders.insert("dayofweek".to_string(), to_vec(&day_order));
    orders.insert("weekend".to_string(), to_vec(&weekend_order));
    orders.insert("season".to_string(), to_vec(&season_order));
    orders.insert("month".to_string(), to_vec(&month_order));
    orders
}

/// Defaults overlaid with the caller's orders; caller entries replace whole keys.
pub fn merged_category_orders(overrides: &CategoryOrders) -> CategoryOrders {
    let mut orders = default_category_orders();
    for (key, order) in overrides {
        orders.insert(key.clone(), order.clone());
    }
    orders
}

/// Display domain of a column: its category order (if any), followed by
/// values not named in the order, sorted.
pub fn category_domain<'a, I>(orders: &CategoryOrders, column: &str, values: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut domain = orders.get(column).cloned().unwrap_or_default();
    let mut unseen: Vec<String> = Vec::new();
    for value in values {
        if !domain.iter().any(|d| d == value) && !unseen.iter().any(|u| u == value) {
            unseen.push(value.to_string());
        }
    }
    unseen.sort_by(|a, b| compare_cells(a, b));
    domain.extend(unseen);
    domain
}

/// Render filter values inline for a title: scalars first, then the elements
/// of list-valued filters, all joined by " & ".
///
/// Best effort: returns `None` when a list holds another list, and the
/// caller leaves the filter summary out of the title.
pub fn summarize_filters(filters: &IndexMap<String, FilterValue>) -> Option<String> {
    let mut scalars = Vec::new();
    let mut expanded = Vec::new();

    for value in filters.values() {
        match value {
            FilterValue::List(items) => {
                for item in items {
                    if item.is_list() {
                        return None;
                    }
                    expanded.push(item.to_string());
                }
            }
            scalar => scalars.push(scalar.to_string()),
        }
    }

    let mut parts = scalars;
    parts.extend(expanded);
    Some(parts.join(" & "))
}

/// Build the chart title from the prefix, active filters and line grouping.
pub fn make_title(
    title_start: &str,
    filters: &IndexMap<String, FilterValue>,
    line_group: Option<&str>,
) -> String {
    let mut title = "by Hour of Day".to_string();
    if !title_start.is_empty() {
        title = format!("{} {}", title_start, title);
    }
    if !filters.is_empty() {
        if let Some(summary) = summarize_filters(filters) {
            title = format!("{} for {}", title, summary);
        }
    }
    if let Some(group) = line_group {
        title = format!("{}<br>(each line represents a single {})", title, group);
    }
    title
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filters(entries: Vec<(&str, FilterValue)>) -> IndexMap<String, FilterValue> {
        entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    #[test]
    fn test_default_orders() {
        let orders = default_category_orders();
        assert_eq!(orders["dayofweek"].first().unwrap(), "Mon");
        assert_eq!(orders["dayofweek"].last().unwrap(), "Sun");
        assert_eq!(orders["weekend"], vec!["Weekday", "Weekend"]);
        assert_eq!(orders["season"], vec!["Spring", "Summer", "Autumn", "Winter"]);
        assert_eq!(orders["month"].len(), 12);
        assert!(!orders.contains_key("year"));
    }

    #[test]
    fn test_default_orders_are_independent() {
        let mut first = default_category_orders();
        first.get_mut("season").unwrap().push("Monsoon".to_string());
        let second = default_category_orders();
        assert_eq!(second["season"].len(), 4);
    }

    #[test]
    fn test_merged_orders_override_per_key() {
        let mut overrides = CategoryOrders::new();
        overrides.insert("season".to_string(), vec!["Winter".to_string(), "Summer".to_string()]);
        overrides.insert("site".to_string(), vec!["B".to_string(), "A".to_string()]);
        let merged = merged_category_orders(&overrides);
        assert_eq!(merged["season"], vec!["Winter", "Summer"]);
        assert_eq!(merged["site"], vec!["B", "A"]);
        assert_eq!(merged["weekend"].len(), 2);
    }

    #[test]
    fn test_category_domain_order_then_sorted() {
        let orders = default_category_orders();
        let domain = category_domain(&orders, "season", ["Winter"]);
        assert_eq!(domain, vec!["Spring", "Summer", "Autumn", "Winter"]);

        let domain = category_domain(&orders, "site", ["b", "10", "a", "9", "b"]);
        assert_eq!(domain, vec!["9", "10", "a", "b"]);
    }

    #[test]
    fn test_title_plain() {
        assert_eq!(make_title("", &IndexMap::new(), None), "by Hour of Day");
        assert_eq!(
            make_title("Energy Usage", &IndexMap::new(), None),
            "Energy Usage by Hour of Day"
        );
    }

    #[test]
    fn test_title_scalars_before_lists() {
        let f = filters(vec![
            ("dayofweek", FilterValue::from(vec!["Sat", "Sun"])),
            ("year", FilterValue::Number(2022.0)),
            ("season", FilterValue::from("Winter")),
        ]);
        assert_eq!(
            make_title("Usage", &f, None),
            "Usage by Hour of Day for 2022 & Winter & Sat & Sun"
        );
    }

    #[test]
    fn test_title_boolean_filter() {
        let f = filters(vec![("holiday", FilterValue::Bool(false))]);
        assert_eq!(make_title("", &f, None), "by Hour of Day for False");
        // matching still accepts lowercase cells
        assert!(FilterValue::Bool(true).matches("true"));
    }

    #[test]
    fn test_title_with_line_group() {
        let title = make_title("", &IndexMap::new(), Some("date"));
        assert_eq!(title, "by Hour of Day<br>(each line represents a single date)");
    }

    #[test]
    fn test_title_nested_filter_degrades() {
        let f = filters(vec![(
            "month",
            FilterValue::List(vec![FilterValue::from(vec!["January", "February"])]),
        )]);
        assert_eq!(
            make_title("", &f, Some("date")),
            "by Hour of Day<br>(each line represents a single date)"
        );
    }
}
