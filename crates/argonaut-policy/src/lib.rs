//! Policy-compilation primitives shared by the argonaut controllers.
//!
//! # Purpose
//! Centralizes the mapping from declarative role rules and binding subjects
//! to the Casbin-style policy text consumed by the CD tool's RBAC engine.
//! Everything in this crate is pure: no I/O, no clocks, no globals.
//!
//! # How it fits
//! The controller service compiles desired policy text with these functions,
//! then diffs it against what the shared ConfigMap or a Project's role list
//! currently carries. Because updates are decided by byte-for-byte
//! comparison, compilation order is part of the contract: rules expand in
//! rule → verb → object order, subjects in binding order.
//!
//! # Key invariants
//! - Compiled output is a pure function of its inputs; re-compiling
//!   unchanged inputs yields identical bytes.
//! - Role subjects in policy text carry the `role:` prefix; user-supplied
//!   names must not (callers validate, see [`ROLE_PREFIX`]).
//!
//! # Examples
//! ```rust
//! use argonaut_policy::{Rule, ResourceKind, compile_rules};
//!
//! let rules = vec![Rule {
//!     resource: ResourceKind::Applications,
//!     verbs: vec!["get".into()],
//!     objects: vec!["*/*".into()],
//! }];
//! assert_eq!(
//!     compile_rules(&rules, "role:test-role"),
//!     "p, role:test-role, applications, get, */*, allow\n"
//! );
//! ```

mod builtin;
mod compile;
mod resource;
mod rule;
mod subject;

pub use builtin::BuiltinRole;
pub use compile::{
    DEFAULT_POLICY_CSV, POLICY_CSV_KEY, ROLE_PREFIX, compile_binding_subjects,
    compile_project_policies, compile_role_policy, compile_rules, overlay_key, role_subject,
};
pub use resource::{ProjectResourceKind, ResourceKind};
pub use rule::{ProjectRule, Rule};
pub use subject::{ProjectSubject, Subject};
