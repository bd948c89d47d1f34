/// Project Linter: validates links, teleports, variables and operators
/// in a compiled project.
///
/// Usage: project_linter <project.json>
use narrative_flow_runtime::core::lint::lint;
use narrative_flow_runtime::Project;
use std::path::Path;
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("error")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        println!("Usage: project_linter <project.json>");
        process::exit(0);
    }

    let path = Path::new(&args[1]);
    if !path.is_file() {
        eprintln!("ERROR: Path '{}' does not exist", path.display());
        process::exit(1);
    }

    let project = match Project::builder().build_from_path(path) {
        Ok(project) => project,
        Err(e) => {
            eprintln!("ERROR: Failed to load project: {}", e);
            process::exit(1);
        }
    };

    let node_count: usize = project.experiences().iter().map(|e| e.nodes().len()).sum();
    println!(
        "Loaded {} experiences, {} nodes, {} variables",
        project.experiences().len(),
        node_count,
        project.variables().len()
    );

    let report = lint(&project);

    println!("\n=== Project Lint Report ===\n");
    if report.is_clean() {
        println!("All checks passed!");
    }
    println!("{}", report);

    if report.errors.is_empty() {
        process::exit(0);
    } else {
        process::exit(1);
    }
}
