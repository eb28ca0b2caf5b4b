//! Handler for the `plan` command.

use serde::Serialize;
use serde_json::json;
use tabled::{Table, Tabled};

use crate::adapter::inbound::cli::command::PlanArgs;
use crate::adapter::inbound::cli::output;
use crate::domain::{DefinitionRegistry, DependencyForest, NodeId};
use crate::error::Result;
use crate::infrastructure::usecase::load_usecase;

/// One forest node in visiting order.
///
/// `prerequisites` lists the forest children, i.e. the definitions that
/// actually gate this one.
#[derive(Debug, Serialize, Tabled)]
pub struct PlanRow {
    #[tabled(rename = "Node")]
    pub node: String,
    #[tabled(rename = "Kind")]
    pub kind: String,
    #[tabled(rename = "Depth")]
    pub depth: usize,
    #[tabled(rename = "Parent")]
    pub parent: String,
    #[tabled(rename = "Prerequisites")]
    pub prerequisites: String,
}

/// Flatten `forest` into rows in the orchestrator's visiting order.
pub fn plan_rows(registry: &DefinitionRegistry, forest: &DependencyForest) -> Vec<PlanRow> {
    let name = |node: NodeId| {
        registry
            .get(forest.definition(node))
            .map(|def| def.name.clone())
            .unwrap_or_default()
    };

    forest
        .walk()
        .iter()
        .filter_map(|&node| {
            let id = forest.definition(node);
            let def = registry.get(id)?;
            let prerequisites = forest
                .children(node)
                .iter()
                .map(|&child| name(child))
                .collect::<Vec<_>>()
                .join(", ");
            let mut kind = id.kind().to_string();
            if def.entitle_only {
                kind.push_str(" (entitle only)");
            }
            Some(PlanRow {
                node: def.name.clone(),
                kind,
                depth: forest.depth(node),
                parent: forest.parent(node).map(name).unwrap_or_default(),
                prerequisites,
            })
        })
        .collect()
}

/// Definitions whose `requiredApplications` do not gate anything because a
/// non-empty `requiredServices` list takes precedence.
pub fn overridden_applications(registry: &DefinitionRegistry) -> Vec<String> {
    registry
        .iter()
        .filter(|(_, def)| {
            !def.required_applications.is_empty() && !def.required_services.is_empty()
        })
        .map(|(_, def)| {
            format!(
                "{}: requiredApplications [{}] ignored, requiredServices takes precedence",
                def.name,
                def.required_applications.join(", ")
            )
        })
        .collect()
}

/// Execute the plan command.
pub fn execute(args: &PlanArgs) -> Result<()> {
    let registry = load_usecase(&args.usecase)?;
    let forest = DependencyForest::build(&registry)?;
    let rows = plan_rows(&registry, &forest);

    if output::is_json() {
        output::json_output(&json!({
            "type": "plan",
            "payload": {
                "roots": forest.roots().len(),
                "nodes": rows,
            },
        }));
        return Ok(());
    }

    output::section("Dependency Forest");
    if rows.is_empty() {
        output::note("(empty use case)");
        return Ok(());
    }
    output::lines(&Table::new(rows).to_string());
    output::field("Roots", forest.roots().len());
    output::field("Nodes", forest.len());
    for message in overridden_applications(&registry) {
        output::warning(&message);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::domain::{app, registry, service};

    #[test]
    fn rows_follow_forest_walk() {
        let reg = registry(
            vec![app("workzone"), app("audit").requiring_applications(["workzone"])],
            vec![service("xsuaa").requiring_applications(["workzone"]).entitle_only()],
        );
        let forest = DependencyForest::build(&reg).unwrap();

        let rows = plan_rows(&reg, &forest);

        let nodes: Vec<_> = rows.iter().map(|row| row.node.as_str()).collect();
        assert_eq!(nodes, vec!["audit", "workzone", "xsuaa"]);
        assert_eq!(rows[0].depth, 0);
        assert_eq!(rows[0].prerequisites, "workzone");
        assert_eq!(rows[1].parent, "audit");
        assert_eq!(rows[1].depth, 1);
        assert_eq!(rows[2].parent, "");
        assert!(rows[2].kind.ends_with("(entitle only)"));
    }

    #[test]
    fn prerequisites_show_only_the_gating_children() {
        let reg = registry(
            vec![app("portal")],
            vec![
                service("xsuaa"),
                service("html5")
                    .requiring_applications(["portal"])
                    .requiring_services(["xsuaa"]),
            ],
        );
        let forest = DependencyForest::build(&reg).unwrap();

        let rows = plan_rows(&reg, &forest);

        let html5 = rows.iter().find(|row| row.node == "html5").unwrap();
        assert_eq!(html5.prerequisites, "xsuaa");
    }

    #[test]
    fn overridden_required_applications_are_reported() {
        let reg = registry(
            vec![app("portal"), app("audit").requiring_applications(["portal"])],
            vec![
                service("xsuaa"),
                service("html5")
                    .requiring_applications(["portal"])
                    .requiring_services(["xsuaa"]),
            ],
        );

        let messages = overridden_applications(&reg);

        assert_eq!(messages.len(), 1);
        assert!(messages[0].starts_with("html5: requiredApplications [portal]"));
    }
}
