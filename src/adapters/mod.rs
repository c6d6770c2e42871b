// Adapters layer: concrete implementations of the domain ports.

pub mod bugzilla;
pub mod json_lines;
pub mod phabricator;

pub use bugzilla::BugzillaClient;
pub use json_lines::{JsonLinesBugDb, JsonLinesCommitDb};
pub use phabricator::PhabricatorClient;
