pub mod adapters;
pub mod assembler;
pub mod classifier;
pub mod error;
pub mod facade;
pub mod feedback;
pub mod finalizer;
pub mod ports;
pub mod prompts;
pub mod strategy;
pub mod testing;
pub mod types;
pub mod validator;

pub use error::{CompletionStage, TutorError, TutorErrorKind};
pub use facade::Tutor;
pub use types::{DetectedState, Message, RegenerationPath, StrategyConfig, TutorReply};
