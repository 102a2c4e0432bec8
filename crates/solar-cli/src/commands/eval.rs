use std::error::Error;

use clap::Args;
use solar_sweep::run_evaluation_stage;

use super::{evaluator, print_stage, PlanArgs};

#[derive(Args, Debug)]
pub struct EvalArgs {
    #[command(flatten)]
    pub plan: PlanArgs,
    /// Override the plan's weight selector (`best` or `final`).
    #[arg(long)]
    pub weights: Option<String>,
    /// Write comparison plots.
    #[arg(long)]
    pub plots: bool,
}

pub fn run(args: &EvalArgs) -> Result<(), Box<dyn Error>> {
    let (mut plan, registry) = args.plan.load()?;
    if let Some(weights) = &args.weights {
        plan.eval.weights = weights.clone();
    }
    if args.plots {
        plan.eval.plots = true;
    }
    let mut evaluator = evaluator(&plan)?;
    let report = run_evaluation_stage(&registry, &plan, &mut evaluator)?;
    print_stage(&report);
    Ok(())
}
