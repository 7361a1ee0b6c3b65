//! Graph neural network weather models on candle.
//!
//! Features on an arbitrary lat/lon location set are encoded onto an H3
//! hexagonal mesh, refined by message passing over the mesh, and decoded
//! back to locations. The forecaster adds a residual on the input state and
//! an optional conservation constraint; the assimilator maps irregular
//! observations onto a fixed analysis grid.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────┐   ┌───────────┐   ┌──────────┐   ┌────────────────┐
//! │  Encoder  │──►│ Processor │──►│ Decoder  │──►│ConstraintLayer │
//! │ loc→cell  │   │ N blocks  │   │ cell→loc │   │ add/mul/softmax│
//! └───────────┘   └───────────┘   └──────────┘   └────────────────┘
//!       ▲                                                  │
//!  [B, L, F+A]                                       [B, L, out]
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use candle_core::{DType, Device, Tensor};
//! use graph_weather_mesh::LatLon;
//! use graph_weather_nn::{ForecasterConfig, GraphWeatherForecaster};
//!
//! let mut locations = Vec::new();
//! for lat in (-90..90).step_by(5) {
//!     for lon in (0..360).step_by(5) {
//!         locations.push(LatLon::new(lat as f64, lon as f64));
//!     }
//! }
//! let model = GraphWeatherForecaster::new(&locations, ForecasterConfig::default(), &Device::Cpu)?;
//! let features = Tensor::zeros((1, locations.len(), 102), DType::F32, &Device::Cpu)?;
//! let next = model.forward(&features)?;
//! assert_eq!(next.dims(), &[1, 2592, 78]);
//! # Ok::<(), graph_weather_nn::ModelError>(())
//! ```

pub mod assimilator;
pub mod config;
pub mod constraint;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod forecaster;
pub mod graph;
pub mod loss;
pub mod mlp;
pub mod norm;
pub mod processor;

pub use assimilator::{
    AssimilatorDecoder, AssimilatorEncoder, DecoderOptions, GraphWeatherAssimilator,
};
pub use config::{
    Aggregation, AssimilatorConfig, CheckpointConfig, ConstraintConfig, ConstraintKind,
    DecoderConfig, ForecasterConfig, GraphWeatherConfig, NormType, ProcessorConfig,
};
pub use constraint::ConstraintLayer;
pub use decoder::Decoder;
pub use encoder::{EncodedGraph, Encoder, EncoderOptions};
pub use error::{ModelError, ModelResult};
pub use forecaster::GraphWeatherForecaster;
pub use loss::NormalizedMseLoss;
pub use mlp::Mlp;
pub use processor::{InteractionBlock, Processor};
