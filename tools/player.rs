/// Player: interactive shell for stepping through a compiled project.
///
/// Usage: player <project.json> [--seed <n>]
///
/// Commands:
///   experiences           list experiences and their start nodes
///   use <experience>      select the experience to start in
///   start <start node>    place the cursor on a start node
///   next                  advance from the current node
///   choose <i>            pick option i of the current choice node
///   vars                  list variables
///   get <name>            show one variable
///   set <name> <value>    overwrite a variable
///   table <name>          resolve a data table entry
///   reset                 restore loaded variable values
///   help                  list commands
///   quit                  exit
use narrative_flow_runtime::{Experience, Node, NodeKind, Project};
use std::io::{self, BufRead, Write};
use std::path::Path;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage();
        return;
    }

    let project_path = args[1].clone();
    let mut seed = None;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--seed" if i + 1 < args.len() => {
                i += 1;
                match args[i].parse::<u64>() {
                    Ok(s) => seed = Some(s),
                    Err(_) => {
                        eprintln!("Invalid seed: {}", args[i]);
                        std::process::exit(1);
                    }
                }
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let mut builder = Project::builder();
    if let Some(s) = seed {
        builder = builder.seed(s);
    }
    let mut project = match builder.build_from_path(Path::new(&project_path)) {
        Ok(project) => project,
        Err(e) => {
            eprintln!("ERROR: Failed to load project: {}", e);
            std::process::exit(1);
        }
    };

    let Some(first) = project.experience_names().next().map(str::to_string) else {
        eprintln!("ERROR: Project has no experiences");
        std::process::exit(1);
    };

    println!(
        "Loaded {} experiences, {} variables",
        project.experiences().len(),
        project.variables().len()
    );
    println!("Type 'help' for commands.\n");

    let mut selected = first.clone();
    let mut experience = match Experience::new(&mut project, &first) {
        Ok(experience) => experience,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    };

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("{}> ", experience.experience_name());
        stdout.flush().ok();

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).is_err() || line.is_empty() {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let (cmd, rest) = match line.split_once(char::is_whitespace) {
            Some((cmd, rest)) => (cmd.to_lowercase(), rest.trim()),
            None => (line.to_lowercase(), ""),
        };

        match cmd.as_str() {
            "quit" | "exit" | "q" => {
                println!("Goodbye.");
                break;
            }
            "help" | "h" | "?" => print_help(),
            "experiences" => {
                for graph in experience.project().experiences() {
                    let starts: Vec<&str> = graph.start_node_names().collect();
                    println!("  {}: {}", graph.name(), starts.join(", "));
                }
            }
            "use" => {
                if rest.is_empty() {
                    println!("Usage: use <experience>   (selected: {})", selected);
                    continue;
                }
                match experience.project().experience(rest) {
                    Ok(_) => {
                        selected = rest.to_string();
                        println!("Selected experience '{}'", selected);
                    }
                    Err(e) => println!("ERROR: {}", e),
                }
            }
            "start" => {
                if rest.is_empty() {
                    println!("Usage: start <start node>");
                    continue;
                }
                match experience.enter(&selected, rest) {
                    Ok(node) => print_node(&node),
                    Err(e) => println!("ERROR: {}", e),
                }
            }
            "next" | "n" => match experience.advance(None) {
                Ok(node) => print_node(&node),
                Err(e) => println!("ERROR: {}", e),
            },
            "choose" | "c" => {
                let index = match rest.parse::<usize>() {
                    Ok(index) => index,
                    Err(_) => {
                        println!("Usage: choose <index>");
                        continue;
                    }
                };
                match experience.advance(Some(index)) {
                    Ok(node) => print_node(&node),
                    Err(e) => println!("ERROR: {}", e),
                }
            }
            "vars" => {
                for variable in experience.project().variables() {
                    println!("  {} = {}", variable.name, variable.value);
                }
            }
            "get" => match experience.project().get_variable_value(rest) {
                Ok(value) => println!("  {} = {}", rest, value),
                Err(e) => println!("ERROR: {}", e),
            },
            "set" => {
                let Some((name, value)) = rest.split_once(char::is_whitespace) else {
                    println!("Usage: set <name> <value>");
                    continue;
                };
                match experience.project_mut().set_variable_value(name, value.trim()) {
                    Ok(()) => println!("  {} = {}", name, value.trim()),
                    Err(e) => println!("ERROR: {}", e),
                }
            }
            "table" => match experience.project().get_data_table_value(rest) {
                Ok(value) => println!("  {}", value),
                Err(e) => println!("ERROR: {}", e),
            },
            "reset" => {
                experience.project_mut().reset_variables();
                println!("Variables reset.");
            }
            _ => {
                println!("Unknown command: '{}'. Type 'help' for available commands.", cmd);
            }
        }
    }
}

fn print_node(node: &Node) {
    match &node.kind {
        NodeKind::Start { name, .. } => println!("[start] {}", name),
        NodeKind::Dialog {
            dialog_source,
            dialog_string,
            ..
        } => {
            if dialog_source.is_empty() {
                println!("{}", dialog_string);
            } else {
                println!("{}: {}", dialog_source, dialog_string);
            }
        }
        NodeKind::Choice { choices } => {
            for (i, choice) in choices.iter().enumerate() {
                println!("  {}) {}", i, choice.choice_string);
            }
        }
        NodeKind::Function { statement, .. } => println!("[function] {}", statement),
        NodeKind::End {} => println!("[end]"),
        other => println!("[{}]", other.type_name()),
    }
    for property in &node.properties {
        println!("    ({} = {})", property.name, property.value);
    }
}

fn print_usage() {
    println!("Player: interactive shell for stepping through a compiled project.");
    println!();
    println!("Usage: player <project.json> [--seed <n>]");
    println!();
    println!("  --seed <n>   Seed for probability nodes (default: random)");
}

fn print_help() {
    println!("Commands:");
    println!("  experiences          List experiences and their start nodes");
    println!("  use <experience>     Select the experience to start in");
    println!("  start <start node>   Place the cursor on a start node");
    println!("  next                 Advance from the current node");
    println!("  choose <i>           Pick option i of the current choice node");
    println!("  vars                 List variables");
    println!("  get <name>           Show one variable");
    println!("  set <name> <value>   Overwrite a variable");
    println!("  table <name>         Resolve a data table entry");
    println!("  reset                Restore loaded variable values");
    println!("  help                 Show this help");
    println!("  quit                 Exit");
}
