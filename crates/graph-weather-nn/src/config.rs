//! Model configuration.
//!
//! `ForecasterConfig` and `AssimilatorConfig` hold every hyperparameter
//! needed to build a model. Location sets are not configuration: they are
//! passed to the model constructors directly.
//!
//! # Loading Configuration
//!
//! ```rust,ignore
//! use graph_weather_nn::config::GraphWeatherConfig;
//!
//! // Plain TOML file
//! let config = GraphWeatherConfig::from_file("graph_weather.toml")?;
//!
//! // File plus GRAPH_WEATHER__* environment overrides
//! let config = GraphWeatherConfig::load(Some("graph_weather.toml".as_ref()))?;
//! ```
//!
//! # TOML Structure
//!
//! ```toml
//! [forecaster]
//! resolution = 2
//! feature_dim = 78
//! aux_dim = 24
//! node_dim = 256
//! edge_dim = 256
//! norm_type = "layer_norm"
//!
//! [forecaster.processor]
//! num_blocks = 9
//! aggregation = "sum"
//!
//! [forecaster.constraint]
//! enabled = true
//! kind = "softmax"
//!
//! [assimilator]
//! observation_dim = 2
//! analysis_dim = 78
//! ```
//!
//! Every section and field is optional; missing values take the defaults
//! below. `validate()` runs after loading and rejects inconsistent values.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

/// Highest H3 resolution accepted; finer global meshes are too large to build.
pub const MAX_RESOLUTION: u8 = graph_weather_mesh::MAX_MESH_RESOLUTION;

// ============================================================================
// ENUMS
// ============================================================================

/// Normalization applied at the end of every MLP that has one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormType {
    /// Mean/variance normalization over the feature axis with affine params.
    #[default]
    LayerNorm,
    /// Root-mean-square normalization over the feature axis.
    RmsNorm,
    /// No normalization.
    None,
}

/// How a node combines the messages arriving on its incoming edges.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    /// Sum of incoming messages.
    #[default]
    Sum,
    /// Sum divided by in-degree (nodes without edges receive zero).
    Mean,
}

/// Conservation strategy of the constraint layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintKind {
    /// Shift each region by the difference of means.
    #[default]
    Additive,
    /// Scale each region by the ratio of means.
    Multiplicative,
    /// Redistribute the reference total by softmax of the prediction.
    Softmax,
}

impl ConstraintKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConstraintKind::Additive => "additive",
            ConstraintKind::Multiplicative => "multiplicative",
            ConstraintKind::Softmax => "softmax",
        }
    }
}

// ============================================================================
// SUB-CONFIGS
// ============================================================================

/// Message-passing processor hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    /// Number of interaction blocks applied in sequence.
    pub num_blocks: usize,
    /// Hidden width of the node update MLPs.
    pub hidden_dim_node: usize,
    /// Hidden layers of the node update MLPs.
    pub hidden_layers_node: usize,
    /// Hidden width of the edge update MLPs.
    pub hidden_dim_edge: usize,
    /// Hidden layers of the edge update MLPs.
    pub hidden_layers_edge: usize,
    /// Message aggregation at receivers.
    pub aggregation: Aggregation,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            num_blocks: 9,
            hidden_dim_node: 256,
            hidden_layers_node: 2,
            hidden_dim_edge: 256,
            hidden_layers_edge: 2,
            aggregation: Aggregation::Sum,
        }
    }
}

impl ProcessorConfig {
    pub fn validate(&self) -> ModelResult<()> {
        if self.num_blocks == 0 {
            return Err(ModelError::config("num_blocks must be > 0"));
        }
        if self.hidden_dim_node == 0 || self.hidden_dim_edge == 0 {
            return Err(ModelError::config("processor hidden dims must be > 0"));
        }
        Ok(())
    }
}

/// Decoder head hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Hidden width of the per-location output MLP.
    pub hidden_dim: usize,
    /// Hidden layers of the per-location output MLP.
    pub hidden_layers: usize,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            hidden_dim: 128,
            hidden_layers: 2,
        }
    }
}

impl DecoderConfig {
    pub fn validate(&self) -> ModelResult<()> {
        if self.hidden_dim == 0 {
            return Err(ModelError::config("decoder hidden_dim must be > 0"));
        }
        Ok(())
    }
}

/// Memory/compute trade-off for the per-location MLPs.
///
/// When enabled, MLPs over the location and edge axes evaluate at most
/// `chunk_rows` rows per kernel. Results are bit-identical to the unchunked
/// path because every layer (including normalization) is row-local.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckpointConfig {
    pub enabled: bool,
    pub chunk_rows: usize,
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            chunk_rows: 4096,
        }
    }
}

impl CheckpointConfig {
    /// Enabled with the default chunk size.
    pub fn on() -> Self {
        Self {
            enabled: true,
            ..Default::default()
        }
    }

    /// Chunk size to use, or `None` when disabled.
    pub fn chunk(&self) -> Option<usize> {
        self.enabled.then_some(self.chunk_rows)
    }

    pub fn validate(&self) -> ModelResult<()> {
        if self.enabled && self.chunk_rows == 0 {
            return Err(ModelError::config("checkpoint chunk_rows must be > 0"));
        }
        Ok(())
    }
}

/// Physical constraint layer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConstraintConfig {
    /// Apply the constraint layer after decoding.
    pub enabled: bool,
    /// Conservation strategy.
    pub kind: ConstraintKind,
    /// Region block size `[rows, cols]`; `None` makes the whole grid one
    /// region. Grid dimensions must be divisible by the block size.
    pub region: Option<[usize; 2]>,
    /// Smallest magnitude allowed for the prediction mean in the
    /// multiplicative denominator.
    pub multiplicative_floor: f64,
}

impl Default for ConstraintConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            kind: ConstraintKind::Additive,
            region: None,
            multiplicative_floor: 1e-6,
        }
    }
}

impl ConstraintConfig {
    pub fn validate(&self) -> ModelResult<()> {
        if !(self.multiplicative_floor.is_finite() && self.multiplicative_floor > 0.0) {
            return Err(ModelError::config(format!(
                "multiplicative_floor must be finite and > 0, got {}",
                self.multiplicative_floor
            )));
        }
        if let Some([rows, cols]) = self.region {
            if rows == 0 || cols == 0 {
                return Err(ModelError::config(format!(
                    "constraint region must be non-empty, got [{}, {}]",
                    rows, cols
                )));
            }
        }
        Ok(())
    }
}

// ============================================================================
// FORECASTER CONFIG
// ============================================================================

/// Hyperparameters of [`crate::GraphWeatherForecaster`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecasterConfig {
    /// H3 resolution of the latent mesh. Even resolutions are preferred.
    pub resolution: u8,
    /// Physical input features per location.
    pub feature_dim: usize,
    /// Auxiliary (non-NWP) features appended after the physical ones.
    pub aux_dim: usize,
    /// Output features per location; defaults to `feature_dim`.
    pub output_dim: Option<usize>,
    /// Node embedding width.
    pub node_dim: usize,
    /// Edge embedding width.
    pub edge_dim: usize,
    /// Normalization at the end of encoder and processor MLPs.
    pub norm_type: NormType,
    pub processor: ProcessorConfig,
    pub decoder: DecoderConfig,
    pub checkpoint: CheckpointConfig,
    pub constraint: ConstraintConfig,
}

impl Default for ForecasterConfig {
    fn default() -> Self {
        Self {
            resolution: 2,
            feature_dim: 78,
            aux_dim: 24,
            output_dim: None,
            node_dim: 256,
            edge_dim: 256,
            processor: ProcessorConfig::default(),
            decoder: DecoderConfig::default(),
            norm_type: NormType::LayerNorm,
            checkpoint: CheckpointConfig::default(),
            constraint: ConstraintConfig::default(),
        }
    }
}

impl ForecasterConfig {
    /// Output feature count after resolving the default.
    pub fn output_dim(&self) -> usize {
        self.output_dim.unwrap_or(self.feature_dim)
    }

    /// Input feature count: physical plus auxiliary.
    pub fn input_dim(&self) -> usize {
        self.feature_dim + self.aux_dim
    }

    /// Validate all values, returning the first error found.
    pub fn validate(&self) -> ModelResult<()> {
        validate_resolution(self.resolution)?;
        if self.feature_dim == 0 {
            return Err(ModelError::config("feature_dim must be > 0"));
        }
        if self.output_dim() == 0 {
            return Err(ModelError::config("output_dim must be > 0"));
        }
        if self.output_dim() > self.feature_dim {
            return Err(ModelError::config(format!(
                "output_dim ({}) cannot exceed feature_dim ({}): the decoder residual adds the first output_dim input features",
                self.output_dim(),
                self.feature_dim
            )));
        }
        if self.node_dim == 0 || self.edge_dim == 0 {
            return Err(ModelError::config("node_dim and edge_dim must be > 0"));
        }

        self.processor.validate()?;
        self.decoder.validate()?;
        self.checkpoint.validate()?;
        self.constraint.validate()?;
        Ok(())
    }
}

// ============================================================================
// ASSIMILATOR CONFIG
// ============================================================================

/// Hyperparameters of [`crate::GraphWeatherAssimilator`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssimilatorConfig {
    pub resolution: u8,
    /// Features carried by each observation.
    pub observation_dim: usize,
    /// Features of the analysis state on the output grid.
    pub analysis_dim: usize,
    pub node_dim: usize,
    pub edge_dim: usize,
    pub norm_type: NormType,
    pub processor: ProcessorConfig,
    pub decoder: DecoderConfig,
    pub checkpoint: CheckpointConfig,
}

impl Default for AssimilatorConfig {
    fn default() -> Self {
        Self {
            resolution: 2,
            observation_dim: 2,
            analysis_dim: 78,
            node_dim: 256,
            edge_dim: 256,
            processor: ProcessorConfig::default(),
            decoder: DecoderConfig::default(),
            norm_type: NormType::LayerNorm,
            checkpoint: CheckpointConfig::default(),
        }
    }
}

impl AssimilatorConfig {
    pub fn validate(&self) -> ModelResult<()> {
        validate_resolution(self.resolution)?;
        if self.observation_dim == 0 || self.analysis_dim == 0 {
            return Err(ModelError::config(
                "observation_dim and analysis_dim must be > 0",
            ));
        }
        if self.node_dim == 0 || self.edge_dim == 0 {
            return Err(ModelError::config("node_dim and edge_dim must be > 0"));
        }
        self.processor.validate()?;
        self.decoder.validate()?;
        self.checkpoint.validate()?;
        Ok(())
    }
}

// ============================================================================
// ROOT CONFIG
// ============================================================================

/// Root configuration file with one section per model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphWeatherConfig {
    pub forecaster: ForecasterConfig,
    pub assimilator: AssimilatorConfig,
}

impl GraphWeatherConfig {
    /// Environment variable prefix for overrides, e.g.
    /// `GRAPH_WEATHER__FORECASTER__RESOLUTION=1`.
    pub const ENV_PREFIX: &'static str = "GRAPH_WEATHER";

    /// Parse a TOML file and validate it.
    pub fn from_file(path: impl AsRef<Path>) -> ModelResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ModelError::config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config: Self = toml::from_str(&contents).map_err(|e| {
            ModelError::config(format!("Failed to parse TOML in '{}': {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration in layers:
    /// 1. built-in defaults
    /// 2. the TOML file at `path`, if given
    /// 3. `GRAPH_WEATHER__*` environment variables
    pub fn load(path: Option<&Path>) -> ModelResult<Self> {
        let defaults = config::Config::try_from(&Self::default())?;
        let mut builder = config::Config::builder().add_source(defaults);
        if let Some(path) = path {
            builder = builder.add_source(
                config::File::from(path)
                    .format(config::FileFormat::Toml)
                    .required(true),
            );
        }
        builder = builder.add_source(
            config::Environment::with_prefix(Self::ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ModelResult<()> {
        self.forecaster
            .validate()
            .map_err(|e| ModelError::config(format!("[forecaster] {}", e)))?;
        self.assimilator
            .validate()
            .map_err(|e| ModelError::config(format!("[assimilator] {}", e)))?;
        Ok(())
    }
}

fn validate_resolution(resolution: u8) -> ModelResult<()> {
    if resolution > MAX_RESOLUTION {
        return Err(ModelError::config(format!(
            "resolution must be <= {}, got {}",
            MAX_RESOLUTION, resolution
        )));
    }
    if resolution > 4 {
        tracing::warn!(
            "H3 resolution {} produces {} mesh cells; global models rarely need more than 4",
            resolution,
            graph_weather_mesh::cell_count(resolution).unwrap_or(0)
        );
    }
    Ok(())
}
