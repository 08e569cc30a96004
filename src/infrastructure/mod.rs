pub mod config;
pub mod in_memory_directory;
pub mod local_file_view;
pub mod loopback_registry;
pub mod tokio_launcher;
pub mod uname;

pub use config::ManagerConfig;
pub use in_memory_directory::InMemoryNameDirectory;
pub use local_file_view::LocalFileView;
pub use loopback_registry::LoopbackRegistry;
pub use tokio_launcher::TokioLauncher;
pub use uname::detect_host_facts;
