//! CLI commands implementation

pub mod documents;
pub mod indexes;
pub mod init;
pub mod projects;
pub mod query;
pub mod status;
pub mod watch;

pub use documents::*;
pub use indexes::*;
pub use init::*;
pub use projects::*;
pub use query::*;
pub use status::*;
pub use watch::*;
