//! The training loop
//!
//! Ties the lifecycle machinery together: a [`Trainer`] owns a
//! [`Model`], a [`DataLoader`], the run [`State`](crate::core::State),
//! and a [`Logger`](crate::logging::Logger), and fires the full event
//! sequence through an [`Engine`](crate::core::Engine) per fit call.
//!
//! # Example
//!
//! ```no_run
//! use ensayar::core::Time;
//! use ensayar::callbacks::ProgressReporter;
//! use ensayar::train::{synthetic, DataLoader, LinearModel, Trainer, TrainerConfig};
//!
//! # fn main() -> Result<(), ensayar::train::TrainerError> {
//! let batches = synthetic::regression_batches(8, 4, 2, 0.1, 0);
//! let mut trainer = Trainer::new(
//!     Box::new(LinearModel::new(2)),
//!     DataLoader::from_batches(batches),
//!     TrainerConfig::new().with_max_duration(Time::epochs(5)),
//! );
//! trainer.add_callback(ProgressReporter::default());
//!
//! let summary = trainer.fit()?;
//! println!("trained {} epochs, final loss {:.4}", summary.epochs_completed, summary.final_loss);
//! # Ok(())
//! # }
//! ```

mod batch;
mod config;
mod dataloader;
mod model;
pub mod synthetic;
mod trainer;

pub use batch::Batch;
pub use config::TrainerConfig;
pub use dataloader::DataLoader;
pub use model::{LinearModel, Model};
pub use trainer::{FitSummary, Trainer, TrainerError};
