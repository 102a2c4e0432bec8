use std::error::Error;

use clap::Args;
use solar_sweep::codec::to_canonical_json_bytes;

use super::PlanArgs;

#[derive(Args, Debug)]
pub struct PathsArgs {
    #[command(flatten)]
    pub plan: PlanArgs,
    /// Emit the listing as JSON instead of tab separated lines.
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: &PathsArgs) -> Result<(), Box<dyn Error>> {
    let (_, registry) = args.plan.load()?;
    let listing = registry.listing();
    if args.json {
        let bytes = to_canonical_json_bytes(&listing)?;
        println!("{}", String::from_utf8(bytes)?);
        return Ok(());
    }
    for record in listing {
        println!("{}\t{}", record.label, record.path.display());
    }
    Ok(())
}
