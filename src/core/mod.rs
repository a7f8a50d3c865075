pub mod comparator;
pub mod engine;
pub mod path;
pub mod progress;
pub mod scanner;

pub use comparator::{count_files, FileComparator, OperationGroup};
pub use engine::{SyncConfig, SyncEngine, SyncPlan, SyncReport};
pub use path::Namespaces;
pub use progress::ScanProgress;
pub use scanner::{FileScanner, FlatTree};
