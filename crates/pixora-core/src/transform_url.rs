//! Image transformation URL builder and parser
//!
//! The transformation service is addressed purely through the asset
//! reference: operations are encoded as steps of the `tr` query parameter.
//! Steps are separated by `:` and the tokens of a step by `,`, e.g.
//! `img.png?tr=x-10,y-10,w-200,h-100:bg-genfill,w-1000,h-600,cm-pad_resize,fo-right`.
//!
//! New steps are always appended after any chain already present on the
//! reference, so every edit stays reproducible from the reference alone.

use crate::error::{PipelineError, TransformError};
use crate::reference::AssetReference;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Separator between chain steps
pub const CHAIN_SEPARATOR: char = ':';
/// Separator between the tokens of one step
pub const TOKEN_SEPARATOR: char = ',';

pub const OP_EXTEND: &str = "extend";
pub const OP_CROP: &str = "crop";
pub const OP_BACKGROUND_REMOVE: &str = "background-remove";
pub const OP_BACKGROUND_REPLACE: &str = "background-replace";
pub const OP_UPSCALE: &str = "upscale";
pub const OP_RETOUCH: &str = "retouch";
pub const OP_RESIZE: &str = "resize";

const TOKEN_GENFILL: &str = "bg-genfill";
const TOKEN_PAD_RESIZE: &str = "cm-pad_resize";
const TOKEN_BG_REMOVE: &str = "e-bgremove";
const TOKEN_BG_REMOVE_DOT_BG: &str = "e-removedotbg";
const TOKEN_CHANGE_BG_PREFIX: &str = "e-changebg";
const TOKEN_UPSCALE: &str = "e-upscale";
const TOKEN_RETOUCH: &str = "e-retouch";

bitflags! {
    /// Set of canvas edges an extension grows towards
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct EdgeSet: u8 {
        const TOP = 0b0001;
        const BOTTOM = 0b0010;
        const LEFT = 0b0100;
        const RIGHT = 0b1000;
    }
}

impl EdgeSet {
    /// Parse a comma separated list such as `left,top`
    pub fn parse_list(list: &str) -> Result<Self, String> {
        list.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .try_fold(EdgeSet::empty(), |acc, name| {
                let edge = match name.to_lowercase().as_str() {
                    "top" => EdgeSet::TOP,
                    "bottom" => EdgeSet::BOTTOM,
                    "left" => EdgeSet::LEFT,
                    "right" => EdgeSet::RIGHT,
                    _ => return Err(format!("Unknown direction: {}", name)),
                };
                Ok(acc | edge)
            })
    }

    /// LEFT or RIGHT selected
    pub fn grows_horizontally(self) -> bool {
        self.intersects(EdgeSet::LEFT | EdgeSet::RIGHT)
    }

    /// TOP or BOTTOM selected
    pub fn grows_vertically(self) -> bool {
        self.intersects(EdgeSet::TOP | EdgeSet::BOTTOM)
    }
}

/// Where the original content is pinned inside an extended canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FocusAnchor {
    Top,
    Bottom,
    Left,
    Right,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl FocusAnchor {
    pub fn as_str(self) -> &'static str {
        match self {
            FocusAnchor::Top => "top",
            FocusAnchor::Bottom => "bottom",
            FocusAnchor::Left => "left",
            FocusAnchor::Right => "right",
            FocusAnchor::TopLeft => "top_left",
            FocusAnchor::TopRight => "top_right",
            FocusAnchor::BottomLeft => "bottom_left",
            FocusAnchor::BottomRight => "bottom_right",
        }
    }

    pub fn token(self) -> String {
        format!("fo-{}", self.as_str())
    }
}

impl fmt::Display for FocusAnchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered direction -> anchor rules, first match wins.
///
/// The anchor names the side opposite the growth. Diagonal pairs come before
/// single edges.
pub const FOCUS_RULES: &[(EdgeSet, FocusAnchor)] = &[
    (EdgeSet::LEFT.union(EdgeSet::TOP), FocusAnchor::BottomRight),
    (EdgeSet::RIGHT.union(EdgeSet::TOP), FocusAnchor::BottomLeft),
    (EdgeSet::LEFT.union(EdgeSet::BOTTOM), FocusAnchor::TopRight),
    (EdgeSet::RIGHT.union(EdgeSet::BOTTOM), FocusAnchor::TopLeft),
    (EdgeSet::TOP, FocusAnchor::Bottom),
    (EdgeSet::BOTTOM, FocusAnchor::Top),
    (EdgeSet::LEFT, FocusAnchor::Right),
    (EdgeSet::RIGHT, FocusAnchor::Left),
];

/// Resolve the focus anchor for a direction selection.
///
/// Three or more edges yield no anchor; the service then centers content.
pub fn resolve_focus(directions: EdgeSet) -> Option<FocusAnchor> {
    if directions.bits().count_ones() >= 3 {
        return None;
    }
    FOCUS_RULES
        .iter()
        .find(|(edges, _)| directions.contains(*edges))
        .map(|(_, anchor)| *anchor)
}

/// Value of an operation parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Number(f64),
    Edges(EdgeSet),
    Text(String),
}

/// A named operation plus its parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformOperation {
    pub name: String,
    #[serde(default)]
    pub params: BTreeMap<String, ParamValue>,
}

impl TransformOperation {
    pub fn new(name: impl Into<String>) -> Self {
        TransformOperation {
            name: name.into(),
            params: BTreeMap::new(),
        }
    }

    pub fn with_param(mut self, name: &str, value: ParamValue) -> Self {
        self.params.insert(name.to_string(), value);
        self
    }

    /// Generative-fill extension to `width`x`height`, growing towards `directions`
    pub fn extend(width: f64, height: f64, directions: EdgeSet) -> Self {
        Self::new(OP_EXTEND)
            .with_param("width", ParamValue::Number(width))
            .with_param("height", ParamValue::Number(height))
            .with_param("directions", ParamValue::Edges(directions))
    }

    /// Extract the `width`x`height` window whose top-left corner is at (`x`, `y`)
    pub fn crop(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::new(OP_CROP)
            .with_param("x", ParamValue::Number(x))
            .with_param("y", ParamValue::Number(y))
            .with_param("width", ParamValue::Number(width))
            .with_param("height", ParamValue::Number(height))
    }

    pub fn background_remove() -> Self {
        Self::new(OP_BACKGROUND_REMOVE)
    }

    pub fn background_replace(prompt: &str) -> Self {
        Self::new(OP_BACKGROUND_REPLACE).with_param("prompt", ParamValue::Text(prompt.to_string()))
    }

    pub fn upscale() -> Self {
        Self::new(OP_UPSCALE)
    }

    pub fn retouch() -> Self {
        Self::new(OP_RETOUCH)
    }

    pub fn resize(width: f64, height: f64) -> Self {
        Self::new(OP_RESIZE)
            .with_param("width", ParamValue::Number(width))
            .with_param("height", ParamValue::Number(height))
    }

    fn invalid(&self, parameter: &str) -> TransformError {
        PipelineError::InvalidParameter {
            operation: self.name.clone(),
            parameter: parameter.to_string(),
        }
    }

    /// Numeric parameter rounded to whole pixels
    fn pixels(&self, parameter: &str) -> Result<i64, TransformError> {
        match self.params.get(parameter) {
            Some(ParamValue::Number(value)) if value.is_finite() => Ok(value.round() as i64),
            _ => Err(self.invalid(parameter)),
        }
    }

    fn edges(&self, parameter: &str) -> Result<EdgeSet, TransformError> {
        match self.params.get(parameter) {
            Some(ParamValue::Edges(edges)) => Ok(*edges),
            None => Ok(EdgeSet::empty()),
            _ => Err(self.invalid(parameter)),
        }
    }

    fn text(&self, parameter: &str) -> Result<&str, TransformError> {
        match self.params.get(parameter) {
            Some(ParamValue::Text(text)) if !text.trim().is_empty() => Ok(text.as_str()),
            _ => Err(self.invalid(parameter)),
        }
    }

    /// Encode this operation as the tokens of one chain step
    pub fn tokens(&self) -> Result<Vec<String>, TransformError> {
        let tokens = match self.name.as_str() {
            OP_EXTEND => {
                let mut tokens = vec![
                    TOKEN_GENFILL.to_string(),
                    format!("w-{}", self.pixels("width")?),
                    format!("h-{}", self.pixels("height")?),
                    TOKEN_PAD_RESIZE.to_string(),
                ];
                if let Some(anchor) = resolve_focus(self.edges("directions")?) {
                    tokens.push(anchor.token());
                }
                tokens
            }
            OP_CROP => vec![
                format!("x-{}", self.pixels("x")?),
                format!("y-{}", self.pixels("y")?),
                format!("w-{}", self.pixels("width")?),
                format!("h-{}", self.pixels("height")?),
            ],
            OP_BACKGROUND_REMOVE => vec![TOKEN_BG_REMOVE.to_string()],
            OP_BACKGROUND_REPLACE => vec![format!(
                "{}-prompt-{}",
                TOKEN_CHANGE_BG_PREFIX,
                urlencoding::encode(self.text("prompt")?.trim())
            )],
            OP_UPSCALE => vec![TOKEN_UPSCALE.to_string()],
            OP_RETOUCH => vec![TOKEN_RETOUCH.to_string()],
            OP_RESIZE => vec![
                format!("w-{}", self.pixels("width")?),
                format!("h-{}", self.pixels("height")?),
            ],
            other => return Err(PipelineError::InvalidOperation(other.to_string())),
        };
        Ok(tokens)
    }

    /// Encode this operation as a single chain step
    pub fn step(&self) -> Result<String, TransformError> {
        Ok(self.tokens()?.join(&TOKEN_SEPARATOR.to_string()))
    }
}

/// Fluent builder for transformation references
///
/// # Example
///
/// ```rust
/// use pixora_core::transform_url::{EdgeSet, TransformUrlBuilder};
/// use pixora_core::AssetReference;
///
/// let reference = TransformUrlBuilder::new()
///     .extend(1000.0, 600.0, EdgeSet::LEFT)
///     .build(&AssetReference::new("img.png"))
///     .unwrap();
/// assert_eq!(
///     reference.as_str(),
///     "img.png?tr=bg-genfill,w-1000,h-600,cm-pad_resize,fo-right"
/// );
/// ```
#[derive(Debug, Clone, Default)]
pub struct TransformUrlBuilder {
    operations: Vec<TransformOperation>,
}

impl TransformUrlBuilder {
    /// Create a new builder with no operations
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an already assembled operation list
    pub fn from_operations(operations: Vec<TransformOperation>) -> Self {
        TransformUrlBuilder { operations }
    }

    pub fn operation(mut self, operation: TransformOperation) -> Self {
        self.operations.push(operation);
        self
    }

    pub fn extend(self, width: f64, height: f64, directions: EdgeSet) -> Self {
        self.operation(TransformOperation::extend(width, height, directions))
    }

    pub fn crop(self, x: f64, y: f64, width: f64, height: f64) -> Self {
        self.operation(TransformOperation::crop(x, y, width, height))
    }

    pub fn background_remove(self) -> Self {
        self.operation(TransformOperation::background_remove())
    }

    pub fn background_replace(self, prompt: &str) -> Self {
        self.operation(TransformOperation::background_replace(prompt))
    }

    pub fn upscale(self) -> Self {
        self.operation(TransformOperation::upscale())
    }

    pub fn retouch(self) -> Self {
        self.operation(TransformOperation::retouch())
    }

    pub fn operations(&self) -> &[TransformOperation] {
        &self.operations
    }

    /// Build only the chain steps contributed by this builder
    ///
    /// Returns e.g. `"e-bgremove:e-upscale"`, without any prior chain.
    pub fn build_chain(&self) -> Result<String, TransformError> {
        if self.operations.is_empty() {
            return Err(PipelineError::NoOperations);
        }

        let steps = self
            .operations
            .iter()
            .map(TransformOperation::step)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(steps.join(&CHAIN_SEPARATOR.to_string()))
    }

    /// Build a new reference from `base`, appending to any chain it carries
    pub fn build(&self, base: &AssetReference) -> Result<AssetReference, TransformError> {
        let chain = self.build_chain()?;

        let combined = match base.chain() {
            Some(prior) => format!("{}{}{}", prior, CHAIN_SEPARATOR, chain),
            None => chain,
        };

        tracing::debug!(base = %base.base_path(), chain = %combined, "Built transformation reference");
        Ok(base.with_chain(&combined))
    }
}

/// Kind of a decoded chain step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepKind {
    Extend,
    Crop,
    BackgroundRemove,
    BackgroundReplace,
    Upscale,
    Retouch,
    Resize,
    Unknown,
}

impl StepKind {
    fn classify(tokens: &[String]) -> Self {
        let has = |token: &str| tokens.iter().any(|t| t == token);
        let has_prefix = |prefix: &str| tokens.iter().any(|t| t.starts_with(prefix));

        if has(TOKEN_GENFILL) {
            StepKind::Extend
        } else if has(TOKEN_BG_REMOVE) || has(TOKEN_BG_REMOVE_DOT_BG) {
            StepKind::BackgroundRemove
        } else if has_prefix(TOKEN_CHANGE_BG_PREFIX) {
            StepKind::BackgroundReplace
        } else if has(TOKEN_UPSCALE) {
            StepKind::Upscale
        } else if has(TOKEN_RETOUCH) {
            StepKind::Retouch
        } else if has_prefix("x-") || has_prefix("y-") {
            StepKind::Crop
        } else if has_prefix("w-") || has_prefix("h-") {
            StepKind::Resize
        } else {
            StepKind::Unknown
        }
    }
}

/// One decoded step of a transformation chain
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChainStep {
    pub kind: StepKind,
    pub tokens: Vec<String>,
}

/// Transformation chain decoded from a reference
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedChain {
    pub base_path: String,
    pub steps: Vec<ChainStep>,
}

impl ParsedChain {
    /// Whether any step removed or replaced the background
    pub fn has_background_removal(&self) -> bool {
        self.steps.iter().flat_map(|s| s.tokens.iter()).any(|token| {
            token == TOKEN_BG_REMOVE
                || token == TOKEN_BG_REMOVE_DOT_BG
                || token.starts_with(TOKEN_CHANGE_BG_PREFIX)
        })
    }

    /// Whether any token in any step starts with `prefix`
    pub fn has_token_prefix(&self, prefix: &str) -> bool {
        self.steps
            .iter()
            .flat_map(|s| s.tokens.iter())
            .any(|token| token.starts_with(prefix))
    }

    pub fn count(&self, kind: StepKind) -> usize {
        self.steps.iter().filter(|s| s.kind == kind).count()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Parser for transformation references
pub struct TransformUrlParser;

impl TransformUrlParser {
    /// Decode the chain carried by `reference`
    pub fn parse(reference: &AssetReference) -> ParsedChain {
        let steps = reference
            .chain()
            .map(Self::parse_chain)
            .unwrap_or_default();

        ParsedChain {
            base_path: reference.base_path().to_string(),
            steps,
        }
    }

    /// Decode a raw chain string such as `x-1,y-2,w-3,h-4:e-bgremove`
    pub fn parse_chain(chain: &str) -> Vec<ChainStep> {
        chain
            .split(CHAIN_SEPARATOR)
            .filter(|step| !step.trim().is_empty())
            .map(|step| {
                let tokens: Vec<String> = step
                    .split(TOKEN_SEPARATOR)
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(String::from)
                    .collect();
                ChainStep {
                    kind: StepKind::classify(&tokens),
                    tokens,
                }
            })
            .collect()
    }
}

impl FromStr for ParsedChain {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(TransformUrlParser::parse(&AssetReference::new(s)))
    }
}
