// Copyright (c) 2022 MASSA LABS <info@massa.net>

//! This file exports useful types used to interact with the runner worker

use crate::error::ExecutionError;
use lens_models::{BlockSpec, ChainId, ModelSlug, ResolvedBlock, RunId, Version};
use lens_time::LensTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

/// Per-call memoization policy, carried through the execution context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CachePolicy {
    /// read and write the result cache (default)
    #[default]
    Use,
    /// ignore cached results but still record the fresh one
    BypassRead,
    /// compute without recording the result
    SkipWrite,
}

/// Expected JSON kind of a single schema field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// any JSON value
    Any,
    /// JSON boolean
    Bool,
    /// JSON number
    Number,
    /// JSON string
    String,
    /// JSON array
    Array,
    /// JSON object
    Object,
}

impl FieldKind {
    fn matches(&self, value: &Value) -> bool {
        match self {
            FieldKind::Any => true,
            FieldKind::Bool => value.is_boolean(),
            FieldKind::Number => value.is_number(),
            FieldKind::String => value.is_string(),
            FieldKind::Array => value.is_array(),
            FieldKind::Object => value.is_object(),
        }
    }
}

/// Declared shape of a model input or output.
///
/// This is deliberately minimal: a model declares the top-level fields it
/// consumes/produces and which of them are required. Anything finer grained
/// is the model body's own concern.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Schema {
    /// accepts any JSON value
    #[default]
    Any,
    /// accepts a JSON object with the given fields
    Object {
        /// known fields and their expected kinds
        fields: BTreeMap<String, FieldKind>,
        /// subset of `fields` that must be present
        required: BTreeSet<String>,
    },
}

impl Schema {
    /// Builds an object schema where every listed field is required
    pub fn object<I>(fields: I) -> Self
    where
        I: IntoIterator<Item = (&'static str, FieldKind)>,
    {
        let fields: BTreeMap<String, FieldKind> = fields
            .into_iter()
            .map(|(name, kind)| (name.to_string(), kind))
            .collect();
        let required = fields.keys().cloned().collect();
        Schema::Object { fields, required }
    }

    /// Checks a value against the schema.
    ///
    /// # Returns
    /// A human readable description of the first mismatch, if any.
    pub fn validate(&self, value: &Value) -> Result<(), String> {
        match self {
            Schema::Any => Ok(()),
            Schema::Object { fields, required } => {
                let obj = value
                    .as_object()
                    .ok_or_else(|| "expected a JSON object".to_string())?;
                for name in required {
                    if !obj.contains_key(name) {
                        return Err(format!("missing required field \"{}\"", name));
                    }
                }
                for (name, field_value) in obj {
                    if let Some(kind) = fields.get(name) {
                        if !kind.matches(field_value) {
                            return Err(format!(
                                "field \"{}\" does not match expected kind {:?}",
                                name, kind
                            ));
                        }
                    }
                    // unknown fields are tolerated: models may consume a subset
                }
                Ok(())
            }
        }
    }
}

/// Capabilities a model body may use while it executes.
///
/// This is the only way a body can interact with the outside world:
/// invoking other models (recursively, at the same pinned block by default)
/// and reading chain state at the pinned block height.
pub trait ModelApi: Send + Sync {
    /// Invoke another model. The nested invocation observes the same chain,
    /// block, and run id as the current one unless the call carries explicit
    /// overrides. Its depth is the current depth plus one.
    fn run_model(&self, call: ModelCall) -> Result<Value, ExecutionError>;

    /// Read chain state at the pinned block height
    /// (contract call, ledger query... the provider decides what `method` means).
    fn chain_read(&self, method: &str, params: &Value) -> Result<Value, ExecutionError>;

    /// Chain the current invocation is pinned to
    fn chain_id(&self) -> ChainId;

    /// Block the current invocation is pinned to
    fn block(&self) -> ResolvedBlock;

    /// Optional window start block carried by the request, for ledger-style queries
    fn from_block(&self) -> Option<ResolvedBlock>;

    /// Identity of the whole run this invocation belongs to
    fn run_id(&self) -> RunId;

    /// Nesting depth of the current invocation
    fn depth(&self) -> u32;
}

/// A model implementation: a pure computation over chain state at a pinned block.
///
/// Bodies must be deterministic with respect to their observable inputs
/// (slug, version, chain, block, input value): memoization relies on it.
pub trait ModelBody: Send + Sync {
    /// Run the model
    fn run(&self, api: &dyn ModelApi, input: &Value) -> Result<Value, ExecutionError>;
}

impl<F> ModelBody for F
where
    F: Fn(&dyn ModelApi, &Value) -> Result<Value, ExecutionError> + Send + Sync,
{
    fn run(&self, api: &dyn ModelApi, input: &Value) -> Result<Value, ExecutionError> {
        self(api, input)
    }
}

/// A loaded model: identity, contract, and callable body.
/// Loaded once per process by an external loader and read-only thereafter.
#[derive(Clone)]
pub struct ModelDescriptor {
    /// model name
    pub slug: ModelSlug,
    /// model version
    pub version: Version,
    /// declared input contract
    pub input_schema: Schema,
    /// declared output contract
    pub output_schema: Schema,
    /// the callable body
    pub body: Arc<dyn ModelBody>,
}

impl ModelDescriptor {
    /// Builds a descriptor with `Any` input/output schemas
    pub fn new(slug: ModelSlug, version: Version, body: Arc<dyn ModelBody>) -> Self {
        ModelDescriptor {
            slug,
            version,
            input_schema: Schema::Any,
            output_schema: Schema::Any,
            body,
        }
    }

    /// Sets the input schema
    pub fn with_input_schema(mut self, schema: Schema) -> Self {
        self.input_schema = schema;
        self
    }

    /// Sets the output schema
    pub fn with_output_schema(mut self, schema: Schema) -> Self {
        self.output_schema = schema;
        self
    }
}

impl std::fmt::Debug for ModelDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("ModelDescriptor")
            .field("slug", &self.slug)
            .field("version", &self.version)
            .finish()
    }
}

/// One entry of the startup-time registry manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelManifestEntry {
    /// model name
    pub slug: ModelSlug,
    /// model version
    pub version: Version,
}

/// A nested model invocation requested by a model body.
#[derive(Debug, Clone)]
pub struct ModelCall {
    /// target model name
    pub slug: ModelSlug,
    /// target version; `None` resolves to the highest known version
    pub version: Option<Version>,
    /// input value, validated against the target's input schema
    pub input: Value,
    /// chain override; `None` inherits the caller's chain
    pub chain_id: Option<ChainId>,
    /// block override; `None` inherits the caller's resolved block
    /// (the key invariant letting a whole dependency graph observe
    /// one consistent snapshot of chain state by default)
    pub block: Option<BlockSpec>,
}

impl ModelCall {
    /// Builds a call to the latest version of a model, inheriting chain and block
    pub fn new(slug: ModelSlug, input: Value) -> Self {
        ModelCall {
            slug,
            version: None,
            input,
            chain_id: None,
            block: None,
        }
    }

    /// Pins the call to a specific model version
    pub fn with_version(mut self, version: Version) -> Self {
        self.version = Some(version);
        self
    }

    /// Overrides the chain the call observes
    pub fn on_chain(mut self, chain_id: ChainId) -> Self {
        self.chain_id = Some(chain_id);
        self
    }

    /// Overrides the block the call observes (e.g. "price 100 blocks ago")
    /// without affecting sibling invocations
    pub fn at_block(mut self, block: BlockSpec) -> Self {
        self.block = Some(block);
        self
    }
}

/// A top-level run request, consumed at the engine boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRequest {
    /// chain to execute against
    pub chain_id: ChainId,
    /// block designation, resolved once at the root
    pub block: BlockSpec,
    /// target model name
    pub slug: ModelSlug,
    /// target version; `None` resolves to the highest known version
    #[serde(default)]
    pub version: Option<Version>,
    /// model input
    #[serde(default)]
    pub input: Value,
    /// optional window start block for ledger-style queries
    #[serde(default)]
    pub from_block: Option<BlockSpec>,
    /// run identity; generated at the root when absent
    #[serde(default)]
    pub run_id: Option<RunId>,
    /// external caller depth: initial depth for recursion-limit accounting
    /// when the request itself originates from a nested context across a
    /// process boundary
    #[serde(default)]
    pub depth: u32,
    /// per-run override of the process-wide provider routing
    #[serde(default)]
    pub provider_map: Option<HashMap<ChainId, String>>,
    /// per-run memoization policy
    #[serde(default)]
    pub cache_policy: CachePolicy,
    /// run deadline (duration); `None` falls back to the configured default
    #[serde(default)]
    pub deadline: Option<LensTime>,
}

/// The output of a completed top-level run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutcome {
    /// identity of the run
    pub run_id: RunId,
    /// chain the run executed against
    pub chain_id: ChainId,
    /// block the run was pinned to
    pub block: ResolvedBlock,
    /// the model's output value
    pub output: Value,
}

/// Defines the sequence of sample points of a series run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowSpec {
    /// walk backward from the anchor timestamp in `interval` steps
    /// for `window` total duration
    Time {
        /// total duration to cover
        window: LensTime,
        /// step between samples
        interval: LensTime,
        /// when true, the oldest edge point of the window is excluded
        #[serde(default)]
        exclusive_end: bool,
    },
    /// walk backward from the anchor height in fixed block steps
    Blocks {
        /// total number of blocks to cover
        window_blocks: u64,
        /// step between samples, in blocks
        interval_blocks: u64,
    },
    /// sample at explicitly listed block heights
    BlockList {
        /// heights to sample at
        heights: Vec<u64>,
    },
    /// sample at explicitly listed timestamps
    TimestampList {
        /// timestamps to sample at
        timestamps: Vec<LensTime>,
    },
}

/// A series request: a run request plus a window specification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesRequest {
    /// the model invocation to repeat, anchored at its resolved block
    pub run: RunRequest,
    /// the sample points
    pub window: WindowSpec,
}

/// Structured error payload crossing the engine boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// stable error kind code
    pub code: String,
    /// human readable message
    pub message: String,
}

impl From<&ExecutionError> for ErrorPayload {
    fn from(err: &ExecutionError) -> Self {
        ErrorPayload {
            code: err.code(),
            message: err.to_string(),
        }
    }
}

/// One sample of a series run. Exactly one of `output`/`error` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesSample {
    /// resolved block height of the sample
    pub height: u64,
    /// canonical timestamp of the resolved block
    pub block_timestamp: LensTime,
    /// timestamp at which the sample point was requested
    pub sample_timestamp: LensTime,
    /// model output at that block, if the invocation succeeded
    #[serde(default)]
    pub output: Option<Value>,
    /// structured failure of this sample only; other samples are unaffected
    #[serde(default)]
    pub error: Option<ErrorPayload>,
}

/// The output of a completed series run: one sample per resolved block height,
/// ordered by height ascending.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesOutcome {
    /// identity of the run
    pub run_id: RunId,
    /// chain the series executed against
    pub chain_id: ChainId,
    /// the anchor block the window was walked from
    pub anchor: ResolvedBlock,
    /// ordered samples
    pub samples: Vec<SeriesSample>,
}
