//! Per-kind synchronizers.
//!
//! Every module exposes the pull half (a [`ListedKind`](super::pull::ListedKind)
//! implementation or its own `fetch_and_store`) and the push half
//! (`load_and_push`).

pub(crate) mod asset;
pub(crate) mod container;
pub(crate) mod content;
pub(crate) mod gallery;
pub(crate) mod model;
pub(crate) mod page;
pub(crate) mod template;
