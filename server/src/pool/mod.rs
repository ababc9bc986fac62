pub mod thread_pool;

pub use thread_pool::{new_thread_pool, Job, ThreadPool};
