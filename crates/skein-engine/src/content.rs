//! Content templates and the state-dependent resolver.
//!
//! Scene content is a tree of typed nodes plus an ordered list of state
//! dependencies: expressions to insert and predicates gating conditional
//! branches. Resolution evaluates every dependency once, left to right, then
//! walks the tree replacing conditional and insert nodes with their results.
//! A dependency-free tree resolves to itself, so resolved content can be
//! stored in the save snapshot and redisplayed without re-evaluation.

use serde::{Deserialize, Serialize};

use crate::definition::GameDefinition;
use crate::error::{EngineError, EngineResult};
use crate::script::{Expression, Predicate, ScriptValue};
use crate::state::GameState;

/// A node in a content tree.
///
/// `Conditional` and `Insert` index into the owning template's dependency
/// list; they only occur pre-resolution. Every other variant survives
/// resolution unchanged apart from its children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ContentNode {
    /// A run of plain text.
    Text(String),
    /// A paragraph of inline content.
    Paragraph(Vec<ContentNode>),
    /// A heading.
    Heading(Vec<ContentNode>),
    /// A quoted passage.
    Quotation(Vec<ContentNode>),
    /// An attribution line following a quotation.
    Attribution(Vec<ContentNode>),
    /// Emphasized inline content; level 1 is mild, level 2 strong.
    Emphasis {
        /// Emphasis strength.
        level: u8,
        /// The emphasized content.
        content: Vec<ContentNode>,
    },
    /// A forced line break.
    LineBreak,
    /// Raw markup passed through to the presentation layer untouched.
    Magic(String),
    /// Content present in the tree but not rendered by default.
    Hidden(Vec<ContentNode>),
    /// Content kept only when the indexed predicate dependency holds.
    Conditional {
        /// Index into the template's dependency list.
        predicate: usize,
        /// The gated content.
        content: Vec<ContentNode>,
    },
    /// The result of the indexed insert dependency.
    Insert(usize),
}

/// A state dependency attached to a content template.
#[derive(Debug, Clone)]
pub enum StateDep {
    /// Evaluate an expression and splice the result in, optionally through
    /// a named display transform.
    Insert {
        /// The expression to evaluate.
        expression: Expression,
        /// Display transform name: `cardinal`, `ordinal`, `fudge`, or a
        /// user-defined table from the game definition.
        qdisplay: Option<String>,
    },
    /// Evaluate a boolean gate for a conditional node.
    Predicate(Predicate),
}

/// A content template: nodes plus the dependencies they index.
#[derive(Debug, Clone, Default)]
pub struct ContentBlock {
    /// The template tree.
    pub nodes: Vec<ContentNode>,
    /// Ordered state dependencies referenced by the tree.
    pub dependencies: Vec<StateDep>,
}

impl ContentBlock {
    /// A template holding a single run of text.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            nodes: vec![ContentNode::Text(text.into())],
            dependencies: Vec::new(),
        }
    }

    /// A template from pre-built nodes.
    pub fn nodes(nodes: Vec<ContentNode>) -> Self {
        Self {
            nodes,
            dependencies: Vec::new(),
        }
    }

    /// Append a dependency, returning its index for node references.
    pub fn push_dependency(&mut self, dep: StateDep) -> usize {
        self.dependencies.push(dep);
        self.dependencies.len() - 1
    }

    /// Builder-style dependency attachment.
    pub fn with_dependency(mut self, dep: StateDep) -> Self {
        self.dependencies.push(dep);
        self
    }
}

/// A user-defined display transform: ordered range cases, first match wins.
#[derive(Debug, Clone, Default)]
pub struct QualityDisplay {
    /// The range cases in priority order.
    pub cases: Vec<DisplayRange>,
}

/// One case of a user-defined display transform.
#[derive(Debug, Clone)]
pub struct DisplayRange {
    /// Inclusive lower bound; unbounded when absent.
    pub min: Option<f64>,
    /// Inclusive upper bound; unbounded when absent.
    pub max: Option<f64>,
    /// Text to display; falls back to the numeral when absent.
    pub output: Option<String>,
}

impl QualityDisplay {
    /// Render a value through the table.
    pub fn display(&self, value: f64) -> String {
        for case in &self.cases {
            let above = case.min.is_none_or(|min| min <= value);
            let below = case.max.is_none_or(|max| max >= value);
            if above && below {
                return match &case.output {
                    Some(output) => output.clone(),
                    None => format_number(value),
                };
            }
        }
        format_number(value)
    }
}

/// An evaluated dependency, positionally matching the dependency list.
enum DepValue {
    /// Text to splice in place of an insert node.
    Text(String),
    /// Already-resolved nodes from a nested content result.
    Nodes(Vec<ContentNode>),
    /// A predicate result for a conditional node.
    Truth(bool),
}

impl DepValue {
    fn truthy(&self) -> bool {
        match self {
            DepValue::Truth(b) => *b,
            DepValue::Text(s) => !s.is_empty(),
            DepValue::Nodes(n) => !n.is_empty(),
        }
    }
}

/// Resolves content templates against the current game state.
pub(crate) struct Resolver<'a> {
    pub game: &'a GameDefinition,
    pub state: &'a GameState,
}

impl Resolver<'_> {
    /// Resolve a template into displayable nodes.
    ///
    /// `wrap_paragraphs` is set for top-level scene content, where bare
    /// inline text is wrapped in a paragraph; inline title/subtitle text is
    /// resolved without wrapping.
    pub fn resolve(
        &self,
        block: &ContentBlock,
        wrap_paragraphs: bool,
    ) -> EngineResult<Vec<ContentNode>> {
        let resolved = if block.dependencies.is_empty() {
            block.nodes.clone()
        } else {
            let evals = self.evaluate_dependencies(&block.dependencies)?;
            merge_all(&block.nodes, &evals)
        };
        if wrap_paragraphs && !resolved.is_empty() && resolved.iter().all(is_inline) {
            Ok(vec![ContentNode::Paragraph(resolved)])
        } else {
            Ok(resolved)
        }
    }

    /// Evaluate every dependency once, left to right. Results that are
    /// themselves content templates resolve recursively before taking
    /// their position in the list.
    fn evaluate_dependencies(&self, deps: &[StateDep]) -> EngineResult<Vec<DepValue>> {
        let mut evals = Vec::with_capacity(deps.len());
        for dep in deps {
            let value = match dep {
                StateDep::Insert {
                    expression,
                    qdisplay,
                } => {
                    let value = expression.run(
                        self.state,
                        &self.state.qualities,
                        ScriptValue::Text(String::new()),
                    );
                    match value {
                        ScriptValue::Content(block) => {
                            DepValue::Nodes(self.resolve(&block, false)?)
                        }
                        other => DepValue::Text(self.display_value(&other, qdisplay.as_deref())?),
                    }
                }
                StateDep::Predicate(predicate) => DepValue::Truth(predicate.run(
                    self.state,
                    &self.state.qualities,
                    false,
                )),
            };
            evals.push(value);
        }
        Ok(evals)
    }

    /// Format an insert result, applying the named display transform to
    /// numeric values.
    fn display_value(&self, value: &ScriptValue, qdisplay: Option<&str>) -> EngineResult<String> {
        let Some(name) = qdisplay else {
            return Ok(value.to_text());
        };
        let Some(number) = value.as_number() else {
            return Ok(value.to_text());
        };
        Ok(match name {
            "cardinal" | "number" => cardinal(number),
            "ordinal" => ordinal(number),
            "fudge" => fudge(number),
            other => {
                let table = self
                    .game
                    .qdisplays
                    .get(other)
                    .ok_or_else(|| EngineError::UnknownQualityDisplay(other.to_string()))?;
                table.display(number)
            }
        })
    }
}

fn merge_all(nodes: &[ContentNode], evals: &[DepValue]) -> Vec<ContentNode> {
    let mut out = Vec::with_capacity(nodes.len());
    for node in nodes {
        out.extend(merge_node(node, evals));
    }
    out
}

fn merge_node(node: &ContentNode, evals: &[DepValue]) -> Vec<ContentNode> {
    match node {
        ContentNode::Conditional { predicate, content } => {
            if evals.get(*predicate).is_some_and(DepValue::truthy) {
                merge_all(content, evals)
            } else {
                Vec::new()
            }
        }
        ContentNode::Insert(index) => match evals.get(*index) {
            Some(DepValue::Text(text)) => vec![ContentNode::Text(text.clone())],
            Some(DepValue::Nodes(nodes)) => nodes.clone(),
            Some(DepValue::Truth(truth)) => vec![ContentNode::Text(truth.to_string())],
            None => Vec::new(),
        },
        ContentNode::Paragraph(content) => vec![ContentNode::Paragraph(merge_all(content, evals))],
        ContentNode::Heading(content) => vec![ContentNode::Heading(merge_all(content, evals))],
        ContentNode::Quotation(content) => vec![ContentNode::Quotation(merge_all(content, evals))],
        ContentNode::Attribution(content) => {
            vec![ContentNode::Attribution(merge_all(content, evals))]
        }
        ContentNode::Emphasis { level, content } => vec![ContentNode::Emphasis {
            level: *level,
            content: merge_all(content, evals),
        }],
        ContentNode::Hidden(content) => vec![ContentNode::Hidden(merge_all(content, evals))],
        leaf => vec![leaf.clone()],
    }
}

fn is_inline(node: &ContentNode) -> bool {
    matches!(
        node,
        ContentNode::Text(_)
            | ContentNode::LineBreak
            | ContentNode::Magic(_)
            | ContentNode::Emphasis { .. }
            | ContentNode::Insert(_)
    )
}

/// A single paragraph of plain text, for canned messages.
pub fn simple_content(text: impl Into<String>) -> Vec<ContentNode> {
    vec![ContentNode::Paragraph(vec![ContentNode::Text(text.into())])]
}

/// Flatten resolved nodes to plain text, one line per block node.
///
/// Hidden content is omitted; magic passthrough is kept verbatim.
pub fn to_plain_text(nodes: &[ContentNode]) -> String {
    let mut out = String::new();
    write_plain(nodes, &mut out);
    out.trim_end().to_string()
}

fn write_plain(nodes: &[ContentNode], out: &mut String) {
    for node in nodes {
        match node {
            ContentNode::Text(text) => out.push_str(text),
            ContentNode::LineBreak => out.push('\n'),
            ContentNode::Magic(raw) => out.push_str(raw),
            ContentNode::Emphasis { content, .. } => write_plain(content, out),
            ContentNode::Paragraph(content)
            | ContentNode::Heading(content)
            | ContentNode::Quotation(content)
            | ContentNode::Attribution(content) => {
                write_plain(content, out);
                out.push('\n');
            }
            ContentNode::Hidden(_) => {}
            ContentNode::Conditional { .. } | ContentNode::Insert(_) => {}
        }
    }
}

/// Render a number the way display text expects: integers without a
/// decimal point, everything else in its shortest float form.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 9.0e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

const CARDINAL_WORDS: [&str; 13] = [
    "zero", "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten",
    "eleven", "twelve",
];

const ORDINAL_WORDS: [&str; 13] = [
    "zeroth", "first", "second", "third", "fourth", "fifth", "sixth", "seventh", "eighth",
    "ninth", "tenth", "eleventh", "twelfth",
];

/// Cardinal display: words for integers 0–12, numerals otherwise.
pub fn cardinal(value: f64) -> String {
    if value.fract() == 0.0 && (0.0..=12.0).contains(&value) {
        CARDINAL_WORDS[value as usize].to_string()
    } else {
        format_number(value)
    }
}

/// Ordinal display: words for integers 0–12, suffixed numerals above, with
/// the teens always taking "th".
pub fn ordinal(value: f64) -> String {
    if value.fract() != 0.0 || value < 0.0 {
        return format_number(value);
    }
    if value <= 12.0 {
        return ORDINAL_WORDS[value as usize].to_string();
    }
    let n = value as u64;
    let suffix = if (10..=19).contains(&(n % 100)) {
        "th"
    } else {
        match n % 10 {
            1 => "st",
            2 => "nd",
            3 => "rd",
            _ => "th",
        }
    };
    format!("{n}{suffix}")
}

/// Fudge-scale display: a seven-point qualitative ladder with "+N"/"-N"
/// extensions past the ends.
pub fn fudge(value: f64) -> String {
    if value.fract() != 0.0 {
        return format_number(value);
    }
    let v = value as i64;
    match v {
        3 => "superb".to_string(),
        2 => "great".to_string(),
        1 => "good".to_string(),
        0 => "fair".to_string(),
        -1 => "mediocre".to_string(),
        -2 => "poor".to_string(),
        -3 => "terrible".to_string(),
        v if v > 3 => format!("superb+{}", v - 3),
        v => format!("terrible{}", v + 3),
    }
}
