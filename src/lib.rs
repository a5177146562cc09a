//! Training objective and scoring head for relevance-aware RAG rerankers
//! built on causal language models.
//!
//! The crate supplies the two pieces that sit on top of a pretrained
//! backbone:
//!
//! - [`RankingLoss`] — a grouped pairwise + pointwise ranking objective over
//!   candidate-passage scores, with a pointwise-only warm-up mode.
//! - [`ScoringHead`] — locates a sentinel token per sequence, projects its
//!   hidden state to a scalar relevance score, and either fuses the ranking
//!   loss with the next-token generation loss ([`ObjectiveMode::Combined`])
//!   or deterministically gates decoding on the score
//!   ([`ObjectiveMode::ScoreGate`]).
//!
//! The backbone itself is consumed through the [`Backbone`] trait: any
//! candle causal LM that can expose final hidden states and its LM head fits
//! behind it. Tokenization, dataset loading, checkpointing and the training
//! loop remain external collaborators; [`Config`] carries the knobs they
//! need.
//!
//! ```no_run
//! use candle_core::{DType, Device};
//! use candle_nn::{VarBuilder, VarMap};
//! use rear::{Config, ScoringHead};
//!
//! # fn run(backbone: &dyn rear::Backbone) -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::from_env()?;
//! config.validate()?;
//!
//! let varmap = VarMap::new();
//! let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
//! let head = ScoringHead::new(vb, config.head_config(backbone.hidden_size()))?;
//! # Ok(())
//! # }
//! ```
//!
//! Mock implementations for tests are available behind
//! `#[cfg(any(test, feature = "mock"))]`.

pub mod backbone;
pub mod config;
pub mod constants;
pub mod head;
pub mod loss;
pub mod output;

pub use backbone::{Backbone, BackboneStates};
#[cfg(any(test, feature = "mock"))]
pub use backbone::MockBackbone;
pub use config::{Config, ConfigError};
pub use head::{HeadConfig, HeadError, ObjectiveMode, ScoringHead};
pub use loss::{LossError, RankingLoss, RankingMode};
pub use output::RearOutput;
