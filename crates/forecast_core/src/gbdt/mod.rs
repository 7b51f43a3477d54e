//! Gradient-boosted regression trees: model format and inference
//!
//! # Model Format
//!
//! Models are written as canonical JSON (sorted keys, no whitespace):
//!
//! ```json
//! {
//!   "base_score": 13.21,
//!   "n_features": 35,
//!   "trees": [
//!     {
//!       "nodes": [
//!         {"feature_idx":3,"id":0,"leaf":null,"left":1,"right":2,"threshold":0.42},
//!         {"feature_idx":-1,"id":1,"leaf":-0.12,"left":-1,"right":-1,"threshold":0.0},
//!         {"feature_idx":-1,"id":2,"leaf":0.31,"left":-1,"right":-1,"threshold":0.0}
//!       ],
//!       "weight": 0.05
//!     }
//!   ],
//!   "version": 1
//! }
//! ```
//!
//! # Usage
//!
//! ```rust
//! use landcast_forecast_core::gbdt::{Model, Node, Tree};
//!
//! let tree = Tree::new(
//!     vec![
//!         Node::internal(0, 0, 0.5, 1, 2),
//!         Node::leaf(1, -1.0),
//!         Node::leaf(2, 1.0),
//!     ],
//!     0.1,
//! );
//! let model = Model::new(1, 10.0, vec![tree]);
//! assert!((model.predict(&[0.0]) - 9.9).abs() < 1e-12);
//! ```
//!
//! Traversal sends a sample left when `x <= threshold`. Inference performs no
//! allocation and no randomness, so repeated calls return identical values.

pub mod model;
pub mod params;
pub mod tree;

pub use model::{Model, MODEL_FORMAT_VERSION};
pub use params::{BoosterParams, MAX_BINS};
pub use tree::{Node, Tree};
