//! Foreign-key dependency analysis and restore ordering.
//!
//! Tables are ordered with Kahn's algorithm so that every referenced (parent)
//! table comes before the tables referencing it. Whenever several tables are
//! ready at once, the one with the smallest case-insensitive name goes first,
//! which makes the order a pure function of the table and edge sets.
//!
//! Tables that never become ready sit on or behind a reference cycle. They are
//! appended after the ordered prefix, in the same lexical order, and reported
//! as circular so the script can defer their constraints.

use std::collections::{BTreeSet, HashMap, HashSet};

#[cfg(feature = "tracing")]
use tracing::{debug, info_span, warn};

use crate::catalog::CatalogReader;
use crate::error::DependencyQueryError;
use crate::types::{BackupPlan, ForeignKeyEdge};

/// Output of [`order_tables`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableOrdering {
    /// Every input table: the acyclic prefix, then the circular tables.
    pub order: Vec<String>,
    /// Tables whose in-degree never reached zero, in lexical order.
    pub circular: Vec<String>,
}

/// Sort key for the ready set: case-insensitive name, exact name as tie-break.
fn lexical_key(name: &str) -> (String, &str) {
    (name.to_lowercase(), name)
}

/// Keep edges whose endpoints are both in `tables`, dropping self-references
/// and exact duplicates. First-seen order is preserved.
pub fn restrict_edges(tables: &[String], edges: Vec<ForeignKeyEdge>) -> Vec<ForeignKeyEdge> {
    let members: HashSet<&str> = tables.iter().map(String::as_str).collect();
    let mut seen = HashSet::new();

    edges
        .into_iter()
        .filter(|edge| {
            !edge.is_self_reference()
                && members.contains(edge.child_table.as_str())
                && members.contains(edge.parent_table.as_str())
        })
        .filter(|edge| seen.insert(edge.clone()))
        .collect()
}

/// Compute the restore order of `tables` given the foreign keys among them.
///
/// Each edge row counts once: a composite key with two column pairs adds two
/// to the child's in-degree and removes two when the parent is emitted. Edges
/// touching unknown tables and self-references are ignored.
pub fn order_tables(tables: &[String], edges: &[ForeignKeyEdge]) -> TableOrdering {
    let mut in_degree: HashMap<&str, usize> =
        tables.iter().map(|t| (t.as_str(), 0usize)).collect();
    let mut successors: HashMap<&str, Vec<&str>> = HashMap::new();

    for edge in edges {
        let child = edge.child_table.as_str();
        let parent = edge.parent_table.as_str();
        if child == parent || !in_degree.contains_key(parent) {
            continue;
        }
        let Some(degree) = in_degree.get_mut(child) else {
            continue;
        };
        *degree += 1;
        successors.entry(parent).or_default().push(child);
    }

    let mut ready: BTreeSet<(String, &str)> = in_degree
        .iter()
        .filter(|(_, degree)| **degree == 0)
        .map(|(table, _)| lexical_key(*table))
        .collect();

    let mut order = Vec::with_capacity(tables.len());
    while let Some((_, table)) = ready.pop_first() {
        order.push(table.to_string());
        for child in successors.get(table).into_iter().flatten() {
            if let Some(degree) = in_degree.get_mut(child) {
                *degree -= 1;
                if *degree == 0 {
                    ready.insert(lexical_key(*child));
                }
            }
        }
    }

    let circular: Vec<String> = in_degree
        .iter()
        .filter(|(_, degree)| **degree > 0)
        .map(|(table, _)| lexical_key(*table))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(|(_, table)| table.to_string())
        .collect();

    order.extend(circular.iter().cloned());
    TableOrdering { order, circular }
}

fn unique_tables(tables: &[String]) -> Vec<String> {
    let mut seen = HashSet::with_capacity(tables.len());
    tables
        .iter()
        .filter(|t| seen.insert(t.as_str()))
        .cloned()
        .collect()
}

/// Discover the foreign keys among `tables` and build the backup plan.
///
/// Fails only when the catalog query fails; the caller is expected to fall
/// back to an unordered script in that case.
pub fn analyze<C: CatalogReader + ?Sized>(
    catalog: &mut C,
    tables: &[String],
    schema: &str,
) -> Result<BackupPlan, DependencyQueryError> {
    #[cfg(feature = "tracing")]
    let _span = info_span!("analyze_dependencies", schema, table_count = tables.len()).entered();

    let tables = unique_tables(tables);
    let raw_edges = catalog.list_foreign_keys(schema, &tables)?;

    #[cfg(feature = "tracing")]
    let raw_count = raw_edges.len();

    let edges = restrict_edges(&tables, raw_edges);
    let ordering = order_tables(&tables, &edges);

    #[cfg(feature = "tracing")]
    {
        debug!(raw = raw_count, kept = edges.len(), "foreign keys restricted to table set");
        if !ordering.circular.is_empty() {
            warn!(tables = ?ordering.circular, "circular foreign-key references");
        }
    }

    Ok(BackupPlan::from_parts(
        schema.to_string(),
        ordering.order,
        edges,
        ordering.circular,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn fk(child: &str, parent: &str) -> ForeignKeyEdge {
        ForeignKeyEdge::new(
            child,
            parent,
            format!("{child}_{parent}_fk"),
            format!("{parent}_id"),
            "id",
        )
    }

    #[test]
    fn test_orders_scenario() {
        let tables = names(&["users", "products", "orders", "order_items"]);
        let edges = vec![
            fk("orders", "users"),
            fk("order_items", "orders"),
            fk("order_items", "products"),
        ];

        let ordering = order_tables(&tables, &edges);
        assert_eq!(
            ordering.order,
            names(&["products", "users", "orders", "order_items"])
        );
        assert!(ordering.circular.is_empty());
    }

    #[test]
    fn test_cycle_is_appended_lexically() {
        let tables = names(&["table_c", "standalone", "table_a", "table_b"]);
        let edges = vec![
            fk("table_b", "table_a"),
            fk("table_c", "table_b"),
            fk("table_a", "table_c"),
        ];

        let ordering = order_tables(&tables, &edges);
        assert_eq!(ordering.circular, names(&["table_a", "table_b", "table_c"]));
        assert_eq!(
            ordering.order,
            names(&["standalone", "table_a", "table_b", "table_c"])
        );
    }

    #[test]
    fn test_tie_break_ignores_case() {
        let tables = names(&["beta", "Alpha", "alpha", "Gamma"]);
        let ordering = order_tables(&tables, &[]);
        assert_eq!(ordering.order, names(&["Alpha", "alpha", "beta", "Gamma"]));
    }

    #[test]
    fn test_composite_keys_count_each_row() {
        let tables = names(&["line", "header"]);
        let edges = vec![
            ForeignKeyEdge::new("line", "header", "line_fk", "doc_id", "id"),
            ForeignKeyEdge::new("line", "header", "line_fk", "doc_rev", "rev"),
        ];
        let ordering = order_tables(&tables, &edges);
        assert_eq!(ordering.order, names(&["header", "line"]));
        assert!(ordering.circular.is_empty());
    }

    #[test]
    fn test_restrict_edges_drops_outsiders_and_self_references() {
        let tables = names(&["employees", "departments"]);
        let edges = vec![
            fk("employees", "employees"),
            fk("employees", "departments"),
            fk("employees", "departments"),
            fk("employees", "companies"),
        ];

        let restricted = restrict_edges(&tables, edges);
        assert_eq!(restricted, vec![fk("employees", "departments")]);
    }
}
