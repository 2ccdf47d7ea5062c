use clap::{Parser, Subcommand};
use honyaku::ast::{ExpressionTree, OutputSegment, ParsedExpression, Segment};
use honyaku::dialect::{render_expression, render_segments};
use honyaku::prelude::*;
use honyaku::translator::{ReferenceTable, TranslationContext, Translator};
use itertools::Itertools;
use serde_json::Value;
use std::fs;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// Converts automation workflows between the node-graph and flow-graph formats
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert a workflow document
    Convert {
        /// Path to the workflow JSON file
        input: String,
        /// Platform of the input (node-graph or flow-graph)
        #[arg(long)]
        from: Platform,
        /// Platform to convert to
        #[arg(long)]
        to: Platform,
        /// Path to the mapping database JSON file
        #[arg(short, long)]
        mappings: Option<String>,
        /// Path to a conversion options JSON file
        #[arg(long)]
        options: Option<String>,
        /// Evaluate expressions instead of translating them
        #[arg(long)]
        evaluate: bool,
        /// Path to a JSON object with the bindings used by --evaluate
        #[arg(long, requires = "evaluate")]
        context: Option<String>,
        /// Write the converted workflow here instead of stdout
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Show how a parameter string is parsed and translated
    Explain {
        /// The parameter string, e.g. '={{ $json.id }}'
        expression: String,
        /// Dialect the string is written in
        #[arg(long, default_value = "node-graph")]
        dialect: Platform,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Convert {
            input,
            from,
            to,
            mappings,
            options,
            evaluate,
            context,
            output,
        } => run_convert(input, from, to, mappings, options, evaluate, context, output),
        Command::Explain {
            expression,
            dialect,
        } => run_explain(&expression, dialect),
    }
}

#[allow(clippy::too_many_arguments)]
fn run_convert(
    input: String,
    from: Platform,
    to: Platform,
    mappings: Option<String>,
    options: Option<String>,
    evaluate: bool,
    context: Option<String>,
    output: Option<String>,
) {
    let start = Instant::now();

    let document: Value = read_json(&input, "workflow");
    let table = match mappings {
        Some(path) => {
            let json = read_file(&path, "mappings");
            MappingTable::from_json_str(&json).unwrap_or_else(|e| {
                exit_with_error(&format!("Failed to load mappings from '{}': {}", path, e))
            })
        }
        None => {
            eprintln!("No mapping database provided. Every node will become a stub.");
            MappingTable::empty()
        }
    };

    let mut conversion_options = match options {
        Some(path) => {
            let json = read_file(&path, "options");
            ConversionOptions::from_json_str(&json).unwrap_or_else(|e| {
                exit_with_error(&format!("Failed to load options from '{}': {}", path, e))
            })
        }
        None => ConversionOptions::default(),
    };
    if evaluate {
        let bindings = match context {
            Some(path) => match read_json::<Value>(&path, "context") {
                Value::Object(map) => map,
                _ => exit_with_error(&format!("Context file '{}' must hold a JSON object", path)),
            },
            None => Bindings::new(),
        };
        conversion_options = conversion_options.evaluate_with(bindings);
    }

    let result = Converter::builder(&table)
        .options(conversion_options)
        .build()
        .convert(&document, from, to);
    let duration = start.elapsed();

    let rendered = serde_json::to_string_pretty(&result.converted_workflow)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to serialize workflow: {}", e)));
    match &output {
        Some(path) => fs::write(path, rendered).unwrap_or_else(|e| {
            exit_with_error(&format!("Failed to write output file '{}': {}", path, e))
        }),
        None => println!("{}", rendered),
    }

    eprintln!("\n--- Conversion Summary ---");
    eprintln!("Direction:            {} -> {}", from, to);
    eprintln!("Nodes converted:      {}", result.debug.converted_node_count);
    eprintln!("Synthetic nodes:      {}", result.debug.synthetic_node_count);
    eprintln!("Expressions:          {}", result.debug.expression_count);
    eprintln!("Needing review:       {}", result.parameters_needing_review.len());
    eprintln!("Unmapped nodes:       {}", result.unmapped_nodes.len());
    eprintln!("Duration:             {:?}", duration);

    for review in &result.parameters_needing_review {
        eprintln!(
            "  review {} [{}]: {}",
            review.node_id,
            review.parameter_paths.iter().join(", "),
            review.reason
        );
    }
    for log in result.logs_at(LogLevel::Warning) {
        eprintln!("  warning: {}", log.message);
    }

    if result.has_errors() {
        for log in result.logs_at(LogLevel::Error) {
            eprintln!("  error: {}", log.message);
        }
        std::process::exit(1);
    }
}

fn run_explain(input: &str, dialect: Platform) {
    let template = parse_template(input, dialect);
    if !template.has_expressions() {
        println!("Plain text, no expressions.");
        return;
    }

    let other = match dialect {
        Platform::NodeGraph => Platform::FlowGraph,
        Platform::FlowGraph => Platform::NodeGraph,
    };
    let translator = Translator::new(dialect, other);
    let scope = ReferenceTable::new();
    let ctx = TranslationContext {
        node_key: "",
        scope: &scope,
    };

    let mut translated = Vec::new();
    for segment in &template.segments {
        match segment {
            Segment::Literal(text) => translated.push(OutputSegment::Literal(text.clone())),
            Segment::Expression(expr) => {
                println!("\nExpression: {}", expr.source());
                match expr.ast() {
                    ParsedExpression::Parsed(ast) => {
                        print!("{}", ExpressionTree { expr: ast });
                        println!("Canonical:  {}", render_expression(ast, dialect));
                        let translation = translator.to_target(ast, &ctx);
                        for issue in &translation.issues {
                            println!("Issue:      {}", issue);
                        }
                        translated.push(OutputSegment::Expression(translation.expression));
                    }
                    ParsedExpression::Unparsed { reason } => {
                        println!("Unparsed:   {}", reason);
                        translated.push(OutputSegment::Literal(expr.source().to_string()));
                    }
                }
            }
        }
    }

    println!("\n{}: {}", other, render_segments(&translated, other));
}

fn read_file(path: &str, what: &str) -> String {
    fs::read_to_string(path).unwrap_or_else(|e| {
        exit_with_error(&format!("Failed to read {} file '{}': {}", what, path, e))
    })
}

fn read_json<T: serde::de::DeserializeOwned>(path: &str, what: &str) -> T {
    let json = read_file(path, what);
    serde_json::from_str(&json)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to parse {} JSON: {}", what, e)))
}

fn exit_with_error(message: &str) -> ! {
    eprintln!("\nError: {}", message);
    std::process::exit(1);
}
