// This module provides the compilation session that drives the backend passes for each method
// body of a TIR program. CompilationSession owns the pipeline options and accumulates
// statistics across bodies: how many functions went through, how many were empty, block and
// edge counts, dead blocks, liveness passes and traces. compile_function builds the CFG once
// and lets reachability, liveness, greedy reordering and jump fixing all observe that same
// graph instance; the result is a CompiledBody that also knows how to render the textual
// reports used by the tirflow binary and by the filetest checker.

//! Per-body pipeline driver and statistics.

use std::fmt;

use crate::analysis::{Liveness, Reachability};
use crate::cfg::Cfg;
use crate::layout::{linearize, GreedyReordering, Trace};
use crate::tir::{Function, Program, Stmt};

use super::error::{CompileError, CompileResult};

/// Which passes run after CFG construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions {
    pub liveness: bool,
    pub reorder: bool,
    /// Requires `reorder`.
    pub linearize: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            liveness: true,
            reorder: true,
            linearize: true,
        }
    }
}

/// Which reports [`CompiledBody::render`] prints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrintOptions {
    pub ir: bool,
    pub cfg: bool,
    pub liveness: bool,
    pub trace: bool,
    pub linear: bool,
    pub dead: bool,
}

impl PrintOptions {
    /// Passes needed to produce the requested reports.
    pub fn pipeline(&self) -> PipelineOptions {
        PipelineOptions {
            liveness: self.liveness || self.dead,
            reorder: self.trace || self.linear,
            linearize: self.linear,
        }
    }
}

/// Everything the backend computed for one method body.
#[derive(Debug, Clone)]
pub struct CompiledBody {
    pub function: Function,
    pub cfg: Cfg,
    pub reachability: Reachability,
    pub liveness: Option<Liveness>,
    pub trace: Option<Trace>,
    pub linear: Option<Vec<Stmt>>,
}

impl CompiledBody {
    pub fn name(&self) -> &str {
        &self.function.name
    }

    /// Render the requested reports in a stable textual form.
    pub fn render(&self, print: &PrintOptions) -> String {
        let name = self.name();
        let mut output = Vec::new();

        if print.ir {
            output.push(format!("IR for {}", name));
            for stmt in &self.function.body {
                output.push(format!("  {}", stmt));
            }
        }

        if print.cfg {
            output.push(format!("CFG for {}", name));
            output.push(self.cfg.to_string().trim_end().to_string());
            for label in self.cfg.unresolved_labels() {
                output.push(format!("Unresolved label: {}", label));
            }
        }

        if print.liveness {
            output.push(format!("Liveness for {}", name));
            if let Some(liveness) = &self.liveness {
                output.extend(liveness.to_string().lines().map(str::to_string));
            }
            output.push("End Liveness".to_string());
        }

        if print.dead {
            output.push(format!("Dead stores for {}", name));
            if let Some(liveness) = &self.liveness {
                for dead in liveness.dead_stores(&self.cfg) {
                    output.push(format!(
                        "Block {} stmt {}: {}",
                        dead.block, dead.stmt, dead.var
                    ));
                }
            }
            for block in self.reachability.unreachable() {
                output.push(format!("Unreachable block {}", block));
            }
            output.push("End Dead".to_string());
        }

        if print.trace {
            output.push(format!("Trace for {}", name));
            if let Some(trace) = &self.trace {
                output.extend(trace.to_string().lines().map(str::to_string));
            }
        }

        if print.linear {
            output.push(format!("Linear for {}", name));
            for stmt in self.linear.iter().flatten() {
                output.push(format!("  {}", stmt));
            }
        }

        output.join("\n")
    }
}

/// Statistics gathered over a session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub functions_compiled: usize,
    pub empty_bodies: usize,
    pub blocks: usize,
    pub edges: usize,
    pub dead_blocks: usize,
    pub liveness_passes: usize,
    pub traces: usize,
}

impl fmt::Display for SessionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Functions compiled: {}", self.functions_compiled)?;
        writeln!(f, "Empty bodies: {}", self.empty_bodies)?;
        writeln!(f, "Blocks: {}", self.blocks)?;
        writeln!(f, "Edges: {}", self.edges)?;
        writeln!(f, "Dead blocks: {}", self.dead_blocks)?;
        writeln!(f, "Liveness passes: {}", self.liveness_passes)?;
        write!(f, "Traces: {}", self.traces)
    }
}

/// Drives the backend passes over method bodies.
#[derive(Debug, Default)]
pub struct CompilationSession {
    options: PipelineOptions,
    stats: SessionStats,
}

impl CompilationSession {
    pub fn new(options: PipelineOptions) -> Self {
        Self {
            options,
            stats: SessionStats::default(),
        }
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// Run the pipeline on one method body.
    pub fn compile_function(&mut self, function: &Function) -> CompileResult<CompiledBody> {
        log::info!("compiling {}", function.name);

        let cfg = Cfg::build(function.body.iter().cloned())?;
        let reachability = Reachability::compute(&cfg);

        let liveness = self.options.liveness.then(|| Liveness::compute(&cfg));
        let trace = self.options.reorder.then(|| GreedyReordering::run(&cfg));
        let linear = match (&trace, self.options.linearize) {
            (Some(trace), true) => Some(linearize(&cfg, trace)),
            _ => None,
        };

        let stats = &mut self.stats;
        stats.functions_compiled += 1;
        if cfg.is_empty_body() {
            log::info!("{} has an empty body", function.name);
            stats.empty_bodies += 1;
        }
        stats.blocks += cfg.len();
        stats.edges += cfg.edge_count();
        stats.dead_blocks += reachability.unreachable().count();
        stats.liveness_passes += liveness.as_ref().map_or(0, Liveness::passes);
        stats.traces += trace.as_ref().map_or(0, |t| t.traces().len());

        Ok(CompiledBody {
            function: function.clone(),
            cfg,
            reachability,
            liveness,
            trace,
            linear,
        })
    }

    /// Run the pipeline on every body, or only on `only` when given.
    pub fn compile_program(
        &mut self,
        program: &Program,
        only: Option<&str>,
    ) -> CompileResult<Vec<CompiledBody>> {
        match only {
            Some(name) => {
                let function = program
                    .function(name)
                    .ok_or_else(|| CompileError::FunctionNotFound {
                        name: name.to_string(),
                    })?;
                Ok(vec![self.compile_function(function)?])
            }
            None => program
                .functions
                .iter()
                .map(|function| self.compile_function(function))
                .collect(),
        }
    }
}
