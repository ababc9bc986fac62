pub mod pool;
pub mod worker;

pub use pool::ProcessPool;
pub use worker::WorkerProcess;
