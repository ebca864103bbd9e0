pub mod harness;
pub mod mock_executor;
pub mod probes;
pub mod strategies;
pub mod webhook_sink;

pub use harness::*;
pub use mock_executor::*;
pub use probes::*;
pub use strategies::*;
pub use webhook_sink::*;
