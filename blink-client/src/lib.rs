pub mod cli;
pub mod config;
pub mod executor;
pub mod rpc;
pub mod wallet;

pub use config::ExecutorConfig;
pub use executor::{ActionExecutor, ExecutionError, ExecutionOutcome, ExecutionState};
pub use rpc::{ActionClient, HttpActionClient, HttpActionClientOptions, RPCError};
pub use wallet::{WalletAdapter, WalletError};
