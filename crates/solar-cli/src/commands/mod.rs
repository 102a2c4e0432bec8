use std::error::Error;
use std::path::PathBuf;

use clap::Args;
use solar_registry::Registry;
use solar_sweep::{load_plan, CommandEvaluator, CommandTrainer, StageReport, SweepPlan};

pub mod datasets;
pub mod eval;
pub mod paths;
pub mod run;
pub mod summarize;
pub mod train;

/// Plan selection shared by every subcommand.
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// YAML sweep plan.
    #[arg(long)]
    pub plan: PathBuf,
    /// Override the plan's data root.
    #[arg(long)]
    pub data_root: Option<PathBuf>,
    /// Replace earlier outputs instead of skipping them.
    #[arg(long)]
    pub overwrite: bool,
}

impl PlanArgs {
    /// Loads the plan, applies the command line overrides and builds the
    /// registry.
    pub fn load(&self) -> Result<(SweepPlan, Registry), Box<dyn Error>> {
        let mut plan = load_plan(&self.plan)?;
        if let Some(data_root) = &self.data_root {
            plan.data_root = data_root.clone();
            plan.base_dir = std::env::current_dir()?;
        }
        if self.overwrite {
            plan.overwrite = true;
        }
        let registry = plan.registry()?;
        Ok((plan, registry))
    }
}

pub fn trainer(plan: &SweepPlan) -> Result<CommandTrainer, Box<dyn Error>> {
    let spec = plan
        .trainer
        .clone()
        .ok_or("plan declares no trainer command")?;
    Ok(CommandTrainer::new(spec))
}

pub fn evaluator(plan: &SweepPlan) -> Result<CommandEvaluator, Box<dyn Error>> {
    let spec = plan
        .evaluator
        .clone()
        .ok_or("plan declares no evaluator command")?;
    Ok(CommandEvaluator::new(spec))
}

pub fn print_stage(report: &StageReport) {
    let counts = report.counts();
    println!(
        "{}: {} completed, {} skipped, {} reported, {} failed",
        report.stage, counts.completed, counts.skipped, counts.reported, counts.failed
    );
}
