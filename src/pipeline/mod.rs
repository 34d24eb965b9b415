//! Pipeline stages for Markdown-to-PDF rendering.
//!
//! Each submodule implements one step of the pass. The stages are pure
//! except for [`document`], which owns the canvas, and [`remote`], the only
//! stage with network I/O.
//!
//! ## Data Flow
//!
//! ```text
//! line ──▶ classify ──▶ document ──┬──▶ canvas primitives
//!                                  └──▶ fence ──▶ diagram ──▶ remote
//! ```
//!
//! 1. [`classify`] — map a line to one [`classify::LineKind`]
//! 2. [`document`] — block state machine and dispatch
//! 3. [`fence`]    — decide what a closed fenced block becomes
//! 4. [`diagram`]  — kind sniffing and the fallback chain
//! 5. [`remote`]   — HTTP fetch, signature check, scratch files

pub mod classify;
pub mod diagram;
pub mod document;
pub mod fence;
pub mod remote;
