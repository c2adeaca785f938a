use colored::Colorize;
use serde_json::json;

use recstore_inject::ChangeRecord;

use crate::cli::*;
use crate::schema::Schema;
use crate::script::{self, Report};

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Check(args) => cmd_check(args, cli.format),
        Command::Apply(args) => cmd_apply(args, cli.format),
    }
}

fn cmd_check(args: CheckArgs, format: OutputFormat) -> anyhow::Result<()> {
    let schema = Schema::load(&args.schema)?;
    let store = schema.build_store()?;
    let dangling = schema.dangling_relations();

    if format == OutputFormat::Json {
        let resources: Vec<_> = schema
            .resources
            .iter()
            .map(|resource| {
                json!({
                    "name": resource.name,
                    "id_attribute": resource.id_attribute,
                    "relations": resource.relations,
                    "computed": resource.computed.iter().map(|c| &c.field).collect::<Vec<_>>(),
                })
            })
            .collect();
        let dangling: Vec<_> = dangling
            .iter()
            .map(|(resource, target)| json!({"resource": resource, "relation": target}))
            .collect();
        let out = json!({
            "store": store.config(),
            "resources": resources,
            "dangling_relations": dangling,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!(
        "{} Schema {} defines {} resource(s)",
        "✓".green().bold(),
        args.schema.display().to_string().bold(),
        schema.resources.len()
    );
    for resource in &schema.resources {
        println!("  {} (identity: {})", resource.name.yellow().bold(), resource.id_attribute);
        for relation in &resource.relations {
            let key = relation
                .local_key
                .as_deref()
                .or(relation.foreign_key.as_deref())
                .unwrap_or("-");
            println!(
                "    {} {} → {} via {}",
                relation.local_field,
                relation.kind.to_string().cyan(),
                relation.relation,
                key.dimmed()
            );
        }
        for computed in &resource.computed {
            println!(
                "    {} = {:?}({})",
                computed.field,
                computed.op,
                computed.deps.join(", ")
            );
        }
    }
    for (resource, target) in &dangling {
        println!(
            "{} {} relates to undefined resource {}",
            "warning:".yellow().bold(),
            resource,
            target.bold()
        );
    }
    Ok(())
}

fn cmd_apply(args: ApplyArgs, format: OutputFormat) -> anyhow::Result<()> {
    let schema = Schema::load(&args.schema)?;
    let mut store = schema.build_store()?;
    let steps = script::load(&args.script)?;

    let outcomes = script::run(&mut store, &steps)?;
    let report = script::report(&store, outcomes, !args.no_history);

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => print_report(&report),
    }
    Ok(())
}

fn print_report(report: &Report) {
    for step in &report.steps {
        let target = step.resource.as_deref().unwrap_or("*");
        println!(
            "{} [{}] {} {}: {}",
            "✓".green(),
            step.index,
            step.op.bold(),
            target,
            step.affected
        );
        for fault in &step.faults {
            println!("    {} {}", "fault:".red(), fault);
        }
    }

    for resource in &report.resources {
        let modified = resource
            .collection_modified
            .map(|at| at.to_string())
            .unwrap_or_else(|| "-".into());
        println!(
            "\n{} ({} record(s), modified {})",
            resource.name.yellow().bold(),
            resource.records.len(),
            modified.dimmed()
        );
        for record in &resource.records {
            println!("  {record}");
        }
        if !resource.history.is_empty() {
            println!("  {}", "history:".bold());
            for change in &resource.history {
                println!("    {}", describe_change(change));
            }
        }
    }
}

fn describe_change(change: &ChangeRecord) -> String {
    let mut parts = vec![format!("{} {}", change.timestamp.to_string().dimmed(), change.id)];
    for (label, fields) in [
        ("+", &change.added),
        ("-", &change.removed),
        ("~", &change.changed),
    ] {
        if !fields.is_empty() {
            let keys: Vec<&str> = fields.keys().map(String::as_str).collect();
            parts.push(format!("{label}{}", keys.join(",")));
        }
    }
    if parts.len() == 1 {
        parts.push("created".green().to_string());
    }
    parts.join(" ")
}
