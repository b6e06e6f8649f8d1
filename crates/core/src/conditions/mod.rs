//! Condition trees, strategy resolution, key/filter splitting, and
//! expression rendering.

mod render;
mod split;
mod strategy;
mod tree;

pub(crate) use render::Binder;

pub use render::{render, render_condition, RenderedCondition, RenderedExpression};
pub use split::{exact_key, exact_key_with_condition, split, KeyConditionMode, SplitCondition};
pub use strategy::{normalize, Resolved, Strategy};
pub use tree::{Attr, Condition, Operator};
