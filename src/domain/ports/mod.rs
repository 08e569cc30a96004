pub mod child_object;
pub mod event_sink;
pub mod file_view;
pub mod launcher;
pub mod name_directory;
pub mod remote_registry;

pub use child_object::{ChildCallError, ChildObject};
pub use event_sink::{EventSink, StateChange, StateEvent};
pub use file_view::FileView;
pub use launcher::{ChildHandle, Launcher, ReapEvent, SpawnRequest};
pub use name_directory::{DirectoryError, NameDirectory};
pub use remote_registry::{
    DeviceRegistration, ManagerRegistration, RegistryError, RemoteRegistry, ServiceRegistration,
};
