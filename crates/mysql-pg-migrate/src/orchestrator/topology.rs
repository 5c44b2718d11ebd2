//! Foreign-key dependency ordering.
//!
//! Tables are sorted so every table loads after the tables it references.
//! Cycles cannot be ordered; their members are appended in name order and
//! reported so the caller can warn. All FK creation is deferred to the
//! post-step, so cycle members only lose ordering, not correctness.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::core::schema::Table;

/// Result of dependency ordering.
#[derive(Debug, Clone)]
pub struct PlanOrder {
    /// Table names, referenced tables first. Cycle members come last,
    /// in name order.
    pub order: Vec<String>,

    /// Names of tables that participate in a reference cycle.
    pub cyclic: Vec<String>,
}

/// Topologically sort tables by FK dependency (Kahn's algorithm).
///
/// Only references to tables inside the set count; references to
/// unselected tables are ignored. Ties break in name order so plans are
/// deterministic.
pub fn sort_tables(tables: &[Table]) -> PlanOrder {
    let selected: HashSet<&str> = tables.iter().map(|t| t.name.as_str()).collect();

    // deps[t] = tables t references; dependents[d] = tables referencing d
    let mut deps: HashMap<&str, HashSet<&str>> = HashMap::new();
    let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();

    for table in tables {
        let refs: HashSet<&str> = table
            .referenced_tables()
            .into_iter()
            .filter(|r| selected.contains(r))
            .collect();
        for &dep in &refs {
            dependents.entry(dep).or_default().push(&table.name);
        }
        deps.insert(&table.name, refs);
    }

    let mut ready: BTreeSet<&str> = deps
        .iter()
        .filter(|(_, d)| d.is_empty())
        .map(|(name, _)| *name)
        .collect();

    let mut order = Vec::with_capacity(tables.len());
    let mut placed: HashSet<&str> = HashSet::new();

    while let Some(&name) = ready.iter().next() {
        ready.remove(name);
        order.push(name.to_string());
        placed.insert(name);

        if let Some(dependent_list) = dependents.get(name) {
            for &dependent in dependent_list {
                if placed.contains(dependent) {
                    continue;
                }
                let remaining = &deps[dependent];
                if remaining.iter().all(|d| placed.contains(d)) {
                    ready.insert(dependent);
                }
            }
        }
    }

    // Whatever is left sits on a cycle.
    let mut cyclic: Vec<String> = tables
        .iter()
        .map(|t| t.name.clone())
        .filter(|name| !placed.contains(name.as_str()))
        .collect();
    cyclic.sort();
    order.extend(cyclic.iter().cloned());

    PlanOrder { order, cyclic }
}

/// Dependencies the scheduler must wait on, per table.
///
/// Only dependencies that are ordered *before* a table count; inside a
/// cycle the residual ordering drops the back-edges, which keeps the work
/// queue deadlock-free.
pub fn effective_deps(tables: &[Table], order: &[String]) -> HashMap<String, Vec<String>> {
    let position: HashMap<&str, usize> = order
        .iter()
        .enumerate()
        .map(|(i, name)| (name.as_str(), i))
        .collect();

    tables
        .iter()
        .map(|table| {
            let own_pos = position[table.name.as_str()];
            let deps = table
                .referenced_tables()
                .into_iter()
                .filter(|r| position.get(r).is_some_and(|&p| p < own_pos))
                .map(|r| r.to_string())
                .collect();
            (table.name.clone(), deps)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::{Column, ForeignKey};

    fn table(name: &str, refs: &[&str]) -> Table {
        Table {
            schema: "shop".to_string(),
            name: name.to_string(),
            columns: vec![Column {
                name: "id".to_string(),
                data_type: "int".to_string(),
                column_type: "int(11)".to_string(),
                max_length: 0,
                precision: 0,
                scale: 0,
                is_nullable: false,
                is_identity: true,
                ordinal: 0,
                default: None,
                comment: String::new(),
            }],
            primary_key: vec!["id".to_string()],
            indexes: vec![],
            foreign_keys: refs
                .iter()
                .map(|r| ForeignKey {
                    name: format!("fk_{}_{}", name, r),
                    columns: vec![format!("{}_id", r)],
                    ref_table: r.to_string(),
                    ref_columns: vec!["id".to_string()],
                    on_delete: "RESTRICT".to_string(),
                    on_update: "RESTRICT".to_string(),
                })
                .collect(),
            row_count: 0,
            data_length: 0,
        }
    }

    #[test]
    fn test_referenced_table_loads_first() {
        // orders references users, so users must come first
        let tables = vec![table("orders", &["users"]), table("users", &[])];
        let plan = sort_tables(&tables);
        assert_eq!(plan.order, vec!["users", "orders"]);
        assert!(plan.cyclic.is_empty());
    }

    #[test]
    fn test_chain_ordering() {
        let tables = vec![
            table("c", &["b"]),
            table("a", &[]),
            table("b", &["a"]),
        ];
        let plan = sort_tables(&tables);
        assert_eq!(plan.order, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_independent_tables_in_name_order() {
        let tables = vec![table("zebra", &[]), table("apple", &[])];
        let plan = sort_tables(&tables);
        assert_eq!(plan.order, vec!["apple", "zebra"]);
    }

    #[test]
    fn test_cycle_detected_and_appended() {
        let tables = vec![
            table("a", &["b"]),
            table("b", &["a"]),
            table("standalone", &[]),
        ];
        let plan = sort_tables(&tables);
        assert_eq!(plan.order[0], "standalone");
        assert_eq!(plan.cyclic, vec!["a", "b"]);
        assert_eq!(plan.order.len(), 3);
    }

    #[test]
    fn test_self_reference_is_not_a_cycle() {
        // e.g. employees.manager_id -> employees.id
        let tables = vec![table("employees", &["employees"])];
        let plan = sort_tables(&tables);
        assert_eq!(plan.order, vec!["employees"]);
        assert!(plan.cyclic.is_empty());
    }

    #[test]
    fn test_reference_to_unselected_table_ignored() {
        let tables = vec![table("orders", &["users"])];
        let plan = sort_tables(&tables);
        assert_eq!(plan.order, vec!["orders"]);
        assert!(plan.cyclic.is_empty());
    }

    #[test]
    fn test_effective_deps_follow_order() {
        let tables = vec![table("orders", &["users"]), table("users", &[])];
        let plan = sort_tables(&tables);
        let deps = effective_deps(&tables, &plan.order);
        assert!(deps["users"].is_empty());
        assert_eq!(deps["orders"], vec!["users"]);
    }

    #[test]
    fn test_effective_deps_drop_cycle_back_edges() {
        let tables = vec![table("a", &["b"]), table("b", &["a"])];
        let plan = sort_tables(&tables);
        let deps = effective_deps(&tables, &plan.order);

        // Residual order is [a, b]: a waits on nothing, b waits on a.
        // No mutual wait, so the queue cannot deadlock.
        assert!(deps["a"].is_empty());
        assert_eq!(deps["b"], vec!["a"]);
    }
}
