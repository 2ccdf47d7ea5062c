//! Runs one conversion through its stages:
//! `Validate -> MapNodes -> ConvertConnections -> Assemble -> Finalize`.

mod result;

pub use result::{ConversionDebug, ConversionLog, ConversionResult, LogLevel, LogSink, Stage};

use crate::config::ConversionOptions;
use crate::dialect::Platform;
use crate::error::{ValidationError, WalkError};
use crate::evaluator::{Bindings, EvaluationBudget};
use crate::mapping::{Decision, MappingEntry, MappingResolver, MappingTable, remap_parameters};
use crate::review::{ReviewFlagger, ReviewReason, Verdict};
use crate::translator::{NodeRef, ReferenceTable, TranslationContext, Translator};
use crate::walker::ParameterWalker;
use crate::workflow::{Connection, Provenance, Workflow, WorkflowNode, format_for};
use ahash::{AHashMap, AHashSet};
use itertools::Itertools;
use rayon::prelude::*;
use serde_json::Value;
use tracing::instrument;
use uuid::Uuid;

const DEFAULT_WORKFLOW_NAME: &str = "Converted workflow";

/// One conversion request for `Converter::convert_batch`.
#[derive(Debug, Clone)]
pub struct ConversionJob {
    pub document: Value,
    pub source: Platform,
    pub target: Platform,
}

/// Converts workflow documents against a shared, immutable mapping table.
#[derive(Debug, Clone)]
pub struct Converter<'t> {
    table: &'t MappingTable,
    options: ConversionOptions,
}

pub struct ConverterBuilder<'t> {
    table: &'t MappingTable,
    options: ConversionOptions,
}

impl<'t> ConverterBuilder<'t> {
    pub fn new(table: &'t MappingTable) -> Self {
        Self {
            table,
            options: ConversionOptions::default(),
        }
    }

    pub fn options(mut self, options: ConversionOptions) -> Self {
        self.options = options;
        self
    }

    /// Evaluates expressions against `context` instead of translating them.
    pub fn evaluate_with(mut self, context: Bindings) -> Self {
        self.options = self.options.evaluate_with(context);
        self
    }

    pub fn with_workflow_name(mut self, name: &str) -> Self {
        self.options.workflow_name = Some(name.to_string());
        self
    }

    pub fn with_max_parameter_depth(mut self, depth: usize) -> Self {
        self.options.max_parameter_depth = depth;
        self
    }

    pub fn with_evaluation_budget(mut self, budget: EvaluationBudget) -> Self {
        self.options.evaluation_budget = budget;
        self
    }

    pub fn with_code_parameter_key(mut self, key: &str) -> Self {
        if !self.options.is_code_key(key) {
            self.options.code_parameter_keys.push(key.to_string());
        }
        self
    }

    pub fn build(self) -> Converter<'t> {
        Converter {
            table: self.table,
            options: self.options,
        }
    }
}

impl<'t> Converter<'t> {
    pub fn builder(table: &'t MappingTable) -> ConverterBuilder<'t> {
        ConverterBuilder::new(table)
    }

    pub fn options(&self) -> &ConversionOptions {
        &self.options
    }

    /// Converts one document. Problems with the document's content never
    /// surface as errors; they are reported in the result's logs.
    #[instrument(skip_all, fields(source = %source, target = %target))]
    pub fn convert(&self, document: &Value, source: Platform, target: Platform) -> ConversionResult {
        let mut run = ConversionRun::new(self, source, target);
        let mut stage = Some(Stage::Validate);
        while let Some(current) = stage {
            run.debug.stages.push(current);
            stage = match current {
                Stage::Validate => run.validate(document),
                Stage::MapNodes => run.map_nodes(),
                Stage::ConvertConnections => run.convert_connections(),
                Stage::Assemble => run.assemble(),
                Stage::Finalize => None,
            };
        }
        run.finish()
    }

    /// Runs many conversions in parallel against the same table.
    pub fn convert_batch(&self, jobs: &[ConversionJob]) -> Vec<ConversionResult> {
        jobs.par_iter()
            .map(|job| self.convert(&job.document, job.source, job.target))
            .collect()
    }
}

/// Converts `document` from `source` to `target` with the given options.
pub fn convert(
    document: &Value,
    source: Platform,
    target: Platform,
    options: &ConversionOptions,
    table: &MappingTable,
) -> ConversionResult {
    Converter::builder(table)
        .options(options.clone())
        .build()
        .convert(document, source, target)
}

/// The state of one conversion as it moves through the stages.
struct ConversionRun<'c, 't> {
    converter: &'c Converter<'t>,
    source: Platform,
    target: Platform,
    logs: LogSink,
    flagger: ReviewFlagger,
    unmapped: Vec<String>,
    debug: ConversionDebug,
    source_workflow: Workflow,
    target_workflow: Workflow,
    /// Source key to target key.
    keys: AHashMap<String, String>,
    document: Option<Value>,
    failed: bool,
}

impl<'c, 't> ConversionRun<'c, 't> {
    fn new(converter: &'c Converter<'t>, source: Platform, target: Platform) -> Self {
        Self {
            converter,
            source,
            target,
            logs: LogSink::default(),
            flagger: ReviewFlagger::new(),
            unmapped: Vec::new(),
            debug: ConversionDebug::new(source, target),
            source_workflow: Workflow::default(),
            target_workflow: Workflow::default(),
            keys: AHashMap::new(),
            document: None,
            failed: false,
        }
    }

    fn options(&self) -> &'c ConversionOptions {
        &self.converter.options
    }

    fn validate(&mut self, document: &Value) -> Option<Stage> {
        let parsed = if self.source == self.target {
            Err(ValidationError::SamePlatform(self.source))
        } else {
            format_for(self.source).parse(document)
        };

        match parsed {
            Ok(workflow) => {
                self.debug.source_node_count = workflow.nodes.len();
                self.debug.source_connection_count = workflow.connections.len();
                self.logs.info(format!(
                    "Read {} workflow '{}' with {} node(s) and {} connection(s)",
                    self.source,
                    workflow.name,
                    workflow.nodes.len(),
                    workflow.connections.len()
                ));
                self.source_workflow = workflow;
                Some(Stage::MapNodes)
            }
            Err(e) => {
                self.logs.error(format!("Input validation failed: {}", e));
                self.failed = true;
                let name = self.workflow_name(
                    document
                        .get("name")
                        .and_then(Value::as_str)
                        .unwrap_or_default(),
                );
                self.document = Some(format_for(self.target).empty_skeleton(&name, self.source));
                Some(Stage::Finalize)
            }
        }
    }

    fn map_nodes(&mut self) -> Option<Stage> {
        let references = self.build_references();
        let resolver = MappingResolver::new(self.converter.table, self.source, self.target);
        let translator = Translator::new(self.source, self.target);
        let source_nodes = std::mem::take(&mut self.source_workflow.nodes);

        for (node, reference) in source_nodes.iter().zip(references.nodes()) {
            let node_id = node.display_id().to_string();
            let mut converted = WorkflowNode {
                id: Some(reference.target_id.clone()),
                key: target_key(reference, self.target),
                name: match self.target {
                    Platform::NodeGraph => Some(reference.target_name.clone()),
                    Platform::FlowGraph => node.name.clone(),
                },
                node_type: String::new(),
                parameters: node.parameters.clone(),
                position: node.position,
                type_version: None,
                provenance: None,
            };

            match resolver.decide(node) {
                Decision::Restore { original_type } => {
                    self.logs.info(format!(
                        "Node '{}' restored to its original type '{}'",
                        node_id, original_type
                    ));
                    converted.node_type = original_type;
                    self.debug.restored_count += 1;
                }
                Decision::Mapped(entry) => {
                    self.apply_entry(node, &node_id, entry, &translator, &references, &mut converted);
                    self.debug.mapped_count += 1;
                }
                Decision::Fallback(template) => {
                    self.apply_entry(
                        node,
                        &node_id,
                        &template.mapping,
                        &translator,
                        &references,
                        &mut converted,
                    );
                    converted.provenance = Some(Provenance {
                        original_type: node.node_type.clone(),
                        original_platform: self.source,
                    });
                    self.flagger.flag_node(
                        &node_id,
                        ReviewReason::FallbackTemplate(template.category.clone()),
                    );
                    self.logs.warning(format!(
                        "Node '{}' of type '{}' has no mapping; converted with the '{}' fallback template",
                        node_id, node.node_type, template.category
                    ));
                    self.debug.fallback_count += 1;
                }
                Decision::Stub => {
                    converted.node_type = self.target.stub_type().to_string();
                    converted.provenance = Some(Provenance {
                        original_type: node.node_type.clone(),
                        original_platform: self.source,
                    });
                    if !self.unmapped.contains(&node_id) {
                        self.unmapped.push(node_id.clone());
                    }
                    self.logs.warning(format!(
                        "No mapping for node '{}' of type '{}'; emitted a '{}' stub with its parameters unchanged",
                        node_id,
                        node.node_type,
                        self.target.stub_type()
                    ));
                    self.debug.stub_count += 1;
                }
            }

            self.keys.insert(node.key.clone(), converted.key.clone());
            self.target_workflow.nodes.push(converted);
        }

        self.source_workflow.nodes = source_nodes;
        self.debug.converted_node_count = self.target_workflow.nodes.len();
        Some(Stage::ConvertConnections)
    }

    /// Remaps parameters through a mapping entry and converts the expressions
    /// inside them.
    fn apply_entry(
        &mut self,
        node: &WorkflowNode,
        node_id: &str,
        entry: &MappingEntry,
        translator: &Translator,
        references: &ReferenceTable,
        converted: &mut WorkflowNode,
    ) {
        converted.node_type = entry.target_type.clone();
        converted.type_version = entry.target_version;

        let remapped = remap_parameters(entry, &node.parameters);
        if !remapped.dropped.is_empty() {
            self.logs.warning(format!(
                "Node '{}': parameter(s) {} have no counterpart in '{}' and were not carried over",
                node_id,
                remapped.dropped.iter().map(|k| format!("'{}'", k)).join(", "),
                entry.target_type
            ));
        }

        let context = TranslationContext {
            node_key: &node.key,
            scope: references,
        };
        let walker = ParameterWalker::from_options(*translator, context, self.options());
        match walker.walk(&remapped.parameters) {
            Ok((parameters, report)) => {
                self.debug.expression_count += report.expressions.len();
                for record in &report.expressions {
                    let verdict = self.flagger.flag(node_id, &record.path, &record.issues);
                    if verdict == Verdict::NeedsReview {
                        self.debug.flagged_expression_count += 1;
                        self.logs.warning(format!(
                            "Node '{}' parameter '{}' needs review: {}",
                            node_id,
                            record.path,
                            record.issues.iter().join("; ")
                        ));
                    }
                }
                for warning in report.warnings {
                    self.logs.warning(format!("Node '{}': {}", node_id, warning));
                }
                converted.parameters = parameters;
            }
            Err(WalkError::DepthExceeded { path, limit }) => {
                self.flagger
                    .flag(node_id, &path, &[ReviewReason::DepthLimit(limit)]);
                self.logs.warning(format!(
                    "Node '{}': parameters at '{}' are nested deeper than {} levels; kept without converting expressions",
                    node_id, path, limit
                ));
                converted.parameters = remapped.parameters;
            }
        }
    }

    fn convert_connections(&mut self) -> Option<Stage> {
        for edge in &self.source_workflow.connections {
            let from = self.keys.get(&edge.from);
            let to = self.keys.get(&edge.to);
            if from.is_none() || to.is_none() {
                self.logs.warning(format!(
                    "Connection '{}' -> '{}' refers to a node that does not exist; kept with its original reference",
                    edge.from, edge.to
                ));
            }
            self.target_workflow.connections.push(Connection {
                from: from.cloned().unwrap_or_else(|| edge.from.clone()),
                from_port: edge.from_port,
                to: to.cloned().unwrap_or_else(|| edge.to.clone()),
                to_port: edge.to_port,
                kind: edge.kind.clone(),
            });
        }
        Some(Stage::Assemble)
    }

    fn assemble(&mut self) -> Option<Stage> {
        self.target_workflow.name = self.workflow_name(&self.source_workflow.name);
        let assembled = format_for(self.target).assemble(&self.target_workflow, self.source);
        for warning in assembled.warnings {
            self.logs.warning(warning);
        }
        self.debug.synthetic_node_count = assembled.synthetic_nodes;
        self.debug.converted_connection_count = assembled.connections;
        self.document = Some(assembled.document);
        Some(Stage::Finalize)
    }

    fn finish(mut self) -> ConversionResult {
        if !self.failed {
            self.logs.info(format!(
                "Converted {} node(s) to {}: {} mapped, {} via fallback, {} stubbed, {} restored",
                self.debug.converted_node_count,
                self.target,
                self.debug.mapped_count,
                self.debug.fallback_count,
                self.debug.stub_count,
                self.debug.restored_count
            ));
        }
        let document = match self.document.take() {
            Some(document) => document,
            None => format_for(self.target).empty_skeleton(DEFAULT_WORKFLOW_NAME, self.source),
        };
        ConversionResult {
            converted_workflow: document,
            logs: self.logs.into_logs(),
            parameters_needing_review: self.flagger.finish(),
            unmapped_nodes: self.unmapped,
            debug: self.debug,
        }
    }

    fn workflow_name(&self, source_name: &str) -> String {
        match &self.options().workflow_name {
            Some(name) => name.clone(),
            None if !source_name.trim().is_empty() => source_name.to_string(),
            None => DEFAULT_WORKFLOW_NAME.to_string(),
        }
    }

    /// Fixes every node's identity on the target side before any expression
    /// is translated, since expressions may refer to any node.
    fn build_references(&self) -> ReferenceTable {
        let mut table = ReferenceTable::new();
        let mut taken_names = AHashSet::new();
        let mut taken_ids = AHashSet::new();

        for (index, node) in self.source_workflow.nodes.iter().enumerate() {
            let source_position = match self.source {
                Platform::FlowGraph => node.key.parse::<u64>().ok(),
                Platform::NodeGraph => None,
            };
            let reference = match self.target {
                Platform::NodeGraph => NodeRef {
                    source_key: node.key.clone(),
                    source_name: node.name.clone(),
                    source_position,
                    target_id: kept_or_generated_id(node, &mut taken_ids),
                    target_name: unique_name(node, &mut taken_names),
                    target_position: None,
                },
                // Module ids double as the positions expressions refer to, so
                // they always follow document order.
                Platform::FlowGraph => {
                    let id = index as u64 + 1;
                    NodeRef {
                        source_key: node.key.clone(),
                        source_name: node.name.clone(),
                        source_position,
                        target_id: id.to_string(),
                        target_name: node.name.clone().unwrap_or_else(|| id.to_string()),
                        target_position: Some(id),
                    }
                }
            };
            table.add_node(reference);
        }
        for edge in &self.source_workflow.connections {
            table.add_edge(&edge.from, &edge.to);
        }
        table
    }
}

fn kept_or_generated_id(node: &WorkflowNode, taken: &mut AHashSet<String>) -> String {
    match &node.id {
        Some(id) if !id.is_empty() && taken.insert(id.clone()) => id.clone(),
        _ => Uuid::new_v4().to_string(),
    }
}

fn target_key(reference: &NodeRef, target: Platform) -> String {
    match target {
        Platform::NodeGraph => reference.target_name.clone(),
        Platform::FlowGraph => reference.target_id.clone(),
    }
}

/// Node-graph names double as edge keys, so they must be unique. Clashes get
/// a numeric suffix.
fn unique_name(node: &WorkflowNode, taken: &mut AHashSet<String>) -> String {
    let base = match &node.name {
        Some(name) if !name.trim().is_empty() => name.clone(),
        _ => node
            .node_type
            .rsplit([':', '.'])
            .next()
            .filter(|s| !s.is_empty())
            .unwrap_or("Node")
            .to_string(),
    };
    let mut candidate = base.clone();
    let mut suffix = 1;
    while taken.contains(&candidate) {
        candidate = format!("{}{}", base, suffix);
        suffix += 1;
    }
    taken.insert(candidate.clone());
    candidate
}
