//! Conditional patch composition.
//!
//! Each rule pairs a predicate over the configuration with the substitutions
//! it contributes. The plan is the ordered list of rules whose predicate
//! holds; the unconditional trimming rule always comes last.

use crate::config::BuildConfiguration;
use crate::platform::HostPlatform;
use std::fmt;

/// Exact-token textual replacement applied to every occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Substitution {
    pub token: &'static str,
    pub replacement: &'static str,
}

const fn sub(token: &'static str, replacement: &'static str) -> Substitution {
    Substitution { token, replacement }
}

/// Outcome of one substitution against one source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubstitutionOutcome {
    pub step: &'static str,
    pub token: &'static str,
    pub replacement: &'static str,
    pub matches: usize,
}

/// A named group of substitutions enabled by one configuration predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchStep {
    pub id: &'static str,
    pub substitutions: Vec<Substitution>,
}

impl PatchStep {
    /// Apply every substitution in order. Missing tokens are zero-match no-ops.
    pub fn apply(&self, source: &str) -> (String, Vec<SubstitutionOutcome>) {
        let mut text = source.to_string();
        let mut outcomes = Vec::with_capacity(self.substitutions.len());

        for substitution in &self.substitutions {
            let matches = text.matches(substitution.token).count();
            if matches > 0 {
                text = text.replace(substitution.token, substitution.replacement);
            }
            outcomes.push(SubstitutionOutcome {
                step: self.id,
                token: substitution.token,
                replacement: substitution.replacement,
                matches,
            });
        }

        (text, outcomes)
    }
}

impl fmt::Display for PatchStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)?;
        for substitution in &self.substitutions {
            write!(f, "\n  {} -> {}", substitution.token, substitution.replacement)?;
        }
        Ok(())
    }
}

struct PatchRule {
    id: &'static str,
    enabled: fn(&BuildConfiguration) -> bool,
    substitutions: fn(HostPlatform) -> Vec<Substitution>,
}

fn pointer_compression(config: &BuildConfiguration) -> bool {
    config.enable_pointer_compression
}

fn v8_debug_opts(config: &BuildConfiguration) -> bool {
    config.enable_v8_debug_opts
}

fn jitless(config: &BuildConfiguration) -> bool {
    config.disable_jit
}

fn lto(config: &BuildConfiguration) -> bool {
    config.enable_lto
}

fn always(_: &BuildConfiguration) -> bool {
    true
}

fn pointer_compression_subs(_: HostPlatform) -> Vec<Substitution> {
    vec![sub("options.v8_enable_pointer_compression", "True")]
}

fn v8_debug_opts_subs(_: HostPlatform) -> Vec<Substitution> {
    vec![
        sub("options.v8_disable_object_print", "True"),
        sub("options.v8_enable_object_print", "False"),
        sub("options.without_inspector", "True"),
        sub("options.v8_enable_i18n_support", "False"),
    ]
}

fn jitless_subs(_: HostPlatform) -> Vec<Substitution> {
    vec![sub("options.v8_lite_mode", "True")]
}

fn lto_subs(host: HostPlatform) -> Vec<Substitution> {
    match host {
        HostPlatform::Windows => vec![sub("options.with_ltcg", "True")],
        HostPlatform::Unix => vec![sub("options.enable_lto", "True")],
    }
}

fn trim_subs(_: HostPlatform) -> Vec<Substitution> {
    vec![
        sub("options.without_npm", "True"),
        sub("options.without_corepack", "True"),
        sub("options.without_amaro", "True"),
        sub("options.without_sqlite", "True"),
        sub("options.without_inspector", "True"),
    ]
}

const RULES: &[PatchRule] = &[
    PatchRule {
        id: "pointer-compression",
        enabled: pointer_compression,
        substitutions: pointer_compression_subs,
    },
    PatchRule {
        id: "v8-debug-opts",
        enabled: v8_debug_opts,
        substitutions: v8_debug_opts_subs,
    },
    PatchRule {
        id: "jitless",
        enabled: jitless,
        substitutions: jitless_subs,
    },
    PatchRule {
        id: "lto",
        enabled: lto,
        substitutions: lto_subs,
    },
    PatchRule {
        id: "trim-bundled-features",
        enabled: always,
        substitutions: trim_subs,
    },
];

/// Ordered patch steps selected for one configuration and host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchPlan {
    steps: Vec<PatchStep>,
}

/// Result of running a plan over a source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchedSource {
    pub text: String,
    pub outcomes: Vec<SubstitutionOutcome>,
}

impl PatchedSource {
    /// Substitutions that matched nothing when they ran.
    pub fn zero_match(&self) -> impl Iterator<Item = &SubstitutionOutcome> {
        self.outcomes.iter().filter(|outcome| outcome.matches == 0)
    }

    /// Tokens that matched nowhere in the whole plan.
    ///
    /// A token shared by two steps is settled by whichever runs first, so the
    /// later zero-match does not count as drift.
    pub fn unmatched_tokens(&self) -> Vec<&SubstitutionOutcome> {
        let mut unmatched: Vec<&SubstitutionOutcome> = Vec::new();
        for outcome in self.zero_match() {
            let matched_elsewhere = self
                .outcomes
                .iter()
                .any(|other| other.token == outcome.token && other.matches > 0);
            let already_listed = unmatched.iter().any(|seen| seen.token == outcome.token);
            if !matched_elsewhere && !already_listed {
                unmatched.push(outcome);
            }
        }
        unmatched
    }

    pub fn total_matches(&self) -> usize {
        self.outcomes.iter().map(|outcome| outcome.matches).sum()
    }
}

impl PatchPlan {
    pub fn steps(&self) -> &[PatchStep] {
        &self.steps
    }

    pub fn step_ids(&self) -> Vec<&'static str> {
        self.steps.iter().map(|step| step.id).collect()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.steps.iter().any(|step| step.id == id)
    }

    /// Run every step in order over `source`.
    pub fn apply_to_str(&self, source: &str) -> PatchedSource {
        let mut text = source.to_string();
        let mut outcomes = Vec::new();
        for step in &self.steps {
            let (next, step_outcomes) = step.apply(&text);
            text = next;
            outcomes.extend(step_outcomes);
        }
        PatchedSource { text, outcomes }
    }
}

/// Select the patch steps enabled by `config` on `host`.
pub fn build_patch_plan(config: &BuildConfiguration, host: HostPlatform) -> PatchPlan {
    let steps = RULES
        .iter()
        .filter(|rule| (rule.enabled)(config))
        .map(|rule| PatchStep {
            id: rule.id,
            substitutions: (rule.substitutions)(host),
        })
        .collect();
    PatchPlan { steps }
}
