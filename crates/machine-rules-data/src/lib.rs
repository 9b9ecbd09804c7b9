pub mod config;
pub mod extra_fuel;
pub mod loader;
pub mod schema;

pub use config::PanelConfig;
pub use extra_fuel::FileFuelProvider;
pub use loader::{ContentPack, DataLoadError, load_content_pack};
