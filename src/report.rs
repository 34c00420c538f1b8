use waypoint_core::state::State;
use waypoint_engine::{GraphSummary, RunRecord};

pub fn print_review(run: &RunRecord) {
    let state = &run.state;

    println!("Code Review");
    println!("===========");
    println!("  Run:        {}", run.id);
    println!(
        "  Status:     {}",
        state.get_str("status").unwrap_or("unfinished")
    );
    println!("  Quality:    {:.2}", state.get_f64_or("quality_score", 0.0));
    println!("  Iterations: {}", state.get_i64_or("iterations", 0));
    println!("  Steps:      {}", run.steps());
    if let Some(ms) = run.elapsed_ms() {
        println!("  Elapsed:    {} ms", ms);
    }

    print_list("Functions", state, "functions");
    print_list("Issues", state, "issues");
    print_list("Suggestions", state, "suggestions");
}

fn print_list(label: &str, state: &State, key: &str) {
    let items: Vec<&str> = state
        .get(key)
        .and_then(|v| v.as_array())
        .map(|arr| arr.iter().filter_map(|v| v.as_str()).collect())
        .unwrap_or_default();

    println!();
    println!("  {}:", label);
    if items.is_empty() {
        println!("    (none)");
    }
    for item in items {
        println!("    - {}", item);
    }
}

pub fn print_graphs(graphs: &[GraphSummary]) {
    if graphs.is_empty() {
        println!("No graphs registered.");
        return;
    }
    for graph in graphs {
        println!("{}  {}", graph.id, graph.name);
        println!("    start: {}", graph.start_node);
        println!("    nodes: {}", graph.nodes.join(", "));
    }
}
