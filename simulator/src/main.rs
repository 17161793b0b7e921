use anyhow::Context;
use clap::Parser;
use log::info;
use report::plot::render_density_chart;
use report::summary::RunSummary;
use std::path::PathBuf;
use workflow::config::WorkflowConfig;
use workflow::runner::Runner;

mod report;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Drug-utilization sampling-bias study driver")]
struct Args {
    /// Load a workflow config from YAML
    #[arg(long)]
    workflow: Option<PathBuf>,
    /// Seed applied before the power-analysis draw and every Monte Carlo run
    #[arg(long)]
    seed: Option<u64>,
    /// Monte Carlo replications per scenario
    #[arg(long)]
    iterations: Option<usize>,
    /// Significance level of the proportion test
    #[arg(long)]
    alpha: Option<f64>,
    /// Density chart destination (.png or .svg)
    #[arg(long)]
    output: Option<PathBuf>,
    /// Skip rendering the density chart
    #[arg(long, default_value_t = false)]
    no_plot: bool,
    /// Print the run summary as JSON
    #[arg(long, default_value_t = false)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let base_config = if let Some(path) = args.workflow {
        WorkflowConfig::load(path)?
    } else {
        WorkflowConfig::default()
    };
    let workflow_config =
        base_config.with_overrides(args.seed, args.iterations, args.alpha, args.output);

    info!(
        "running {} scenarios x {} iterations (seed {})",
        workflow_config.scenarios.len(),
        workflow_config.iterations,
        workflow_config.seed
    );
    let runner = Runner::new(workflow_config.clone());
    let result = runner.execute().context("executing workflow")?;

    let chart_path = if args.no_plot {
        None
    } else {
        render_density_chart(&result.chart, &workflow_config.output)?;
        info!("density chart written to {}", workflow_config.output.display());
        Some(workflow_config.output.as_path())
    };

    let summary = RunSummary::new(&result, chart_path);
    if args.json {
        println!("{}", summary.to_json()?);
    } else {
        print!("{}", summary.render_text());
    }

    Ok(())
}
