//! Run-configuration documents: YAML with resolver tags and a
//! postprocessing pipeline.
//!
//! A document is standard YAML plus three local tags resolved at load time:
//! `!ENV ${NAME}` reads the process environment, `!SHELL $(cmd)` captures a
//! subprocess's stdout, and `!EXPAND` defers a fenced expression. After
//! construction, four passes rewrite the tree: `${path}` variable
//! substitution, `$(( expr ))` arithmetic, `choose_<path>` conditional
//! blocks, and finally fence expansion against the rewritten tree.
//!
//! ```no_run
//! let tree = simcfg_config::load("user: !SHELL $(whoami)\n")?;
//! # Ok::<(), simcfg_config::ConfigError>(())
//! ```

pub mod choose;
pub mod construct;
pub mod error;
pub mod fence;
pub mod math;
pub mod path;
pub mod pipeline;
pub mod registry;
pub mod resolve;
pub mod subst;
pub mod tag;
pub mod value;

pub use construct::{construct, LoadOptions};
pub use error::ConfigError;
pub use pipeline::{load, load_file, load_with_options, postprocess, Pass};
pub use registry::{DeferredExpansion, FenceId, FenceKind, PendingFences};
pub use resolve::ShellOptions;
pub use tag::ScalarTag;
pub use value::Value;
