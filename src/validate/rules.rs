//! Structural rules for machine definitions, checked with Validation.

use crate::core::MachineDefinition;
use crate::validate::violations::DefinitionViolation;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

type Check = Validation<(), NonEmptyVec<DefinitionViolation>>;

fn rule(ok: bool, violation: impl FnOnce() -> DefinitionViolation) -> Check {
    if ok {
        Validation::success(())
    } else {
        Validation::fail(violation())
    }
}

/// Check every structural rule, accumulating ALL violations.
///
/// Returns `Validation::Success(())` when the definition is well formed.
pub fn validate_definition(definition: &MachineDefinition) -> Check {
    let mut checks: Vec<Check> = Vec::new();

    checks.push(rule(!definition.id.is_empty(), || {
        DefinitionViolation::EmptyId
    }));

    checks.push(rule(
        definition.states.contains_key(&definition.initial),
        || DefinitionViolation::UnknownInitialState {
            initial: definition.initial.clone(),
        },
    ));

    for (state, node) in &definition.states {
        checks.push(rule(!node.terminal || node.on.is_empty(), || {
            DefinitionViolation::TerminalHasTransitions {
                state: state.clone(),
            }
        }));

        checks.push(rule(node.terminal || node.output.is_none(), || {
            DefinitionViolation::OutputOnNonTerminal {
                state: state.clone(),
            }
        }));

        for (event, transition) in &node.on {
            if let Some(target) = &transition.target {
                checks.push(rule(definition.states.contains_key(target), || {
                    DefinitionViolation::UnknownTarget {
                        state: state.clone(),
                        event: event.clone(),
                        target: target.clone(),
                    }
                }));
            }
        }
    }

    Validation::all_vec(checks).map(|_| ())
}
