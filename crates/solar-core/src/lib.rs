#![deny(missing_docs)]
#![doc = "Core error, seeding and dimension types shared by the solar segmentation sweep crates."]

pub mod dims;
pub mod errors;
pub mod rng;

pub use dims::{ModelRev, Seed};
pub use errors::{ErrorInfo, SweepError};
pub use rng::RngHandle;
