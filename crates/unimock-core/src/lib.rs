//! # Unimock Core
//!
//! Domain logic for Unimock, a universal HTTP mock server for end-to-end
//! testing. The HTTP surface lives in `unimock-http`; this crate owns
//! everything beneath it:
//!
//! - **Sections** — configured URL families with a compiled path pattern
//!   and ID-extraction policy ([`section`], [`pattern`])
//! - **ID extraction** — path tail, headers, and structured bodies via a
//!   small XPath-like expression language ([`extract`], [`body_path`])
//! - **Storage** — a concurrent multi-index store aliasing one stored body
//!   under any number of external IDs ([`store`])
//! - **Scenarios** — canned request-to-response rules that override mock
//!   handling ([`scenario`])
//! - **Transformation hooks** — request/response rewriting for embedders
//!   ([`transform`])

pub mod body_path;
pub mod config;
pub mod error;
pub mod extract;
pub mod pattern;
pub mod scenario;
pub mod section;
pub mod store;
pub mod transform;

pub use body_path::BodyPath;
pub use config::{load_config, load_scenarios_file, ScenarioConfig, SectionConfig, UnimockConfig};
pub use error::{Error, Result};
pub use extract::path_tail_id;
pub use pattern::{normalize_path, PathPattern};
pub use scenario::{Scenario, ScenarioRegistry};
pub use section::{Section, SectionRegistry};
pub use store::{MockStore, Resource, ResourceDraft};
pub use transform::{TransformFn, Transformations};
