pub mod data_dir;
pub mod error;
pub mod settings;
pub mod snapshot;

pub use data_dir::{DataDir, default_base_dir};
pub use error::{Result, StoreError};
pub use settings::Settings;
pub use snapshot::{load_session, read_snapshot, save_session, write_snapshot};
