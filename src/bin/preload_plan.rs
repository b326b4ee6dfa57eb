use clap::Parser;
use predictive_preload::dom::parse_html;
use predictive_preload::preload::report::{plan_document, PreloadPlan};
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Show which links in an HTML document would be prefetched, and why the others would not
#[derive(Parser, Debug)]
#[command(name = "preload_plan", version, about)]
struct Args {
  /// HTML file to analyze
  file: PathBuf,

  /// URL the document is treated as being served from
  #[arg(long, default_value = "http://localhost/")]
  url: String,

  /// Emit the plan as JSON
  #[arg(long)]
  json: bool,

  /// Only list links that would be prefetched
  #[arg(long)]
  eligible_only: bool,
}

fn print_table(plan: &PreloadPlan, eligible_only: bool) {
  let settings = &plan.settings;
  println!("location: {}", plan.location);
  println!(
    "predictive: {} (trigger {}, delay {}ms, cache {}ms)",
    if settings.predictive_enabled { "enabled" } else { "disabled" },
    settings.trigger_event.as_str(),
    settings.delay_ms,
    settings.cache_ttl_ms
  );
  println!();
  println!("{:<4} {:<5} {:>7} {:>8}  {}", "OK", "EAGER", "DELAY", "TTL", "TARGET");
  for link in &plan.links {
    if eligible_only && !link.eligible {
      continue;
    }
    let target = link
      .url
      .as_deref()
      .or(link.href.as_deref())
      .unwrap_or("(no href)");
    let verdict = match link.rejection {
      Some(rejection) => format!("  [{rejection}]"),
      None => String::new(),
    };
    println!(
      "{:<4} {:<5} {:>5}ms {:>6}ms  {}{}",
      if link.eligible { "yes" } else { "no" },
      if link.eager { "yes" } else { "" },
      link.delay_ms,
      link.cache_ttl_ms,
      target,
      verdict
    );
  }
  println!();
  println!(
    "{} of {} links eligible",
    plan.eligible().count(),
    plan.links.len()
  );
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
    .with_writer(std::io::stderr)
    .init();

  let args = Args::parse();
  let html = fs::read_to_string(&args.file)
    .map_err(|e| format!("failed to read {}: {e}", args.file.display()))?;
  let document = parse_html(&html, &args.url)?;
  let mut plan = plan_document(&document);
  tracing::debug!(links = plan.links.len(), "document analyzed");

  if args.json {
    if args.eligible_only {
      plan.links.retain(|link| link.eligible);
    }
    println!("{}", serde_json::to_string_pretty(&plan)?);
  } else {
    print_table(&plan, args.eligible_only);
  }
  Ok(())
}
