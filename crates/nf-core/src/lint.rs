//! Lint diagnostics for scene graphs.
//!
//! Reports structural issues without modifying the graph. Loading a
//! hand-edited file can produce any of these; none of them is fatal.

use crate::id::SceneId;
use crate::model::SceneGraph;
use std::collections::HashSet;

// ─── Diagnostic types ────────────────────────────────────────────────────

/// Severity of a lint finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LintSeverity {
    /// Structural inconsistency, likely from a corrupt or hand-edited file.
    Warning,
    /// Authoring hint.
    Info,
}

/// A single lint diagnostic for a scene.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintDiagnostic {
    pub scene_id: SceneId,
    /// Branch index, when the finding is about one branch.
    pub branch: Option<usize>,
    pub message: String,
    pub severity: LintSeverity,
    /// Short rule identifier (e.g. "dangling-target").
    pub rule: &'static str,
}

// ─── Public API ───────────────────────────────────────────────────────────

/// Run all lint rules over the graph.
#[must_use]
pub fn lint_graph(graph: &SceneGraph) -> Vec<LintDiagnostic> {
    let mut diags = Vec::new();
    lint_branches(graph, &mut diags);
    lint_unreachable(graph, &mut diags);
    diags
}

/// Log every diagnostic at a level matching its severity.
pub fn log_diagnostics(diags: &[LintDiagnostic]) {
    for d in diags {
        match d.severity {
            LintSeverity::Warning => log::warn!("[{}] {}", d.rule, d.message),
            LintSeverity::Info => log::debug!("[{}] {}", d.rule, d.message),
        }
    }
}

// ─── Rules ────────────────────────────────────────────────────────────────

fn lint_branches(graph: &SceneGraph, diags: &mut Vec<LintDiagnostic>) {
    for scene in graph.scenes() {
        for (i, branch) in scene.branches().iter().enumerate() {
            if !graph.contains(branch.target) {
                diags.push(LintDiagnostic {
                    scene_id: scene.id,
                    branch: Some(i),
                    message: format!(
                        "Branch \"{}\" of \"{}\" leads to missing scene `{}`.",
                        branch.text, scene.name, branch.target
                    ),
                    severity: LintSeverity::Warning,
                    rule: "dangling-target",
                });
            } else if branch.target == scene.id {
                diags.push(LintDiagnostic {
                    scene_id: scene.id,
                    branch: Some(i),
                    message: format!("Branch \"{}\" of \"{}\" leads back to itself.", branch.text, scene.name),
                    severity: LintSeverity::Warning,
                    rule: "self-target",
                });
            }
            if branch.text.trim().is_empty() {
                diags.push(LintDiagnostic {
                    scene_id: scene.id,
                    branch: Some(i),
                    message: format!("Branch {i} of \"{}\" has no choice text.", scene.name),
                    severity: LintSeverity::Warning,
                    rule: "empty-choice",
                });
            }
        }
    }
}

/// The first scene is the entry point; any other scene nobody branches to
/// can never be reached.
fn lint_unreachable(graph: &SceneGraph, diags: &mut Vec<LintDiagnostic>) {
    let targeted: HashSet<SceneId> = graph
        .scenes()
        .flat_map(|s| s.branches().iter().filter(move |b| b.target != s.id).map(|b| b.target))
        .collect();

    for scene in graph.scenes().skip(1) {
        if !targeted.contains(&scene.id) {
            diags.push(LintDiagnostic {
                scene_id: scene.id,
                branch: None,
                message: format!("Scene \"{}\" is not reachable from any branch.", scene.name),
                severity: LintSeverity::Info,
                rule: "unreachable-scene",
            });
        }
    }
}
