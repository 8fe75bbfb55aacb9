use colored::Colorize;
use tgadapt_schema::SchemaSnapshot;

pub fn print_summary(snapshot: &SchemaSnapshot) {
    let graph = snapshot.graph_name.as_deref().unwrap_or("(unnamed graph)");
    println!("{} {}", "graph".green().bold(), graph.bold());

    println!("{} ({})", "vertex types".yellow().bold(), snapshot.vertex_types.len());
    for vt in &snapshot.vertex_types {
        println!("  {}", vt.name.bold());
        if let Some(statement) = &vt.statement {
            println!("    {}", statement.dimmed());
        }
    }

    println!("{} ({})", "edge types".yellow().bold(), snapshot.edge_types.len());
    for et in &snapshot.edge_types {
        let arrow = if et.is_directed { "->" } else { "--" };
        let mut line = format!(
            "  {}  {} {arrow} {}",
            et.name.bold(),
            et.source_types(),
            et.target_types()
        );
        if let Some(reverse) = et.reverse_edge() {
            line.push_str(&format!("  (reverse {reverse})"));
        }
        println!("{line}");
    }

    let counts = [
        ("indexes", snapshot.indexes.len()),
        ("loading jobs", snapshot.loading_jobs.len()),
        ("queries", snapshot.queries.len()),
        ("UDTs", snapshot.udts.len()),
        ("data sources", snapshot.data_sources.len()),
        ("users", snapshot.users.len()),
        ("groups", snapshot.groups.len()),
    ];
    for (what, n) in counts {
        if n > 0 {
            println!("{} ({n})", what.yellow().bold());
        }
    }
    for q in &snapshot.queries {
        let state = if q.deprecated {
            "deprecated".red()
        } else if q.is_installed() {
            "installed".green()
        } else {
            "not installed".normal()
        };
        println!("  {} [{state}]", q.name);
    }
}
