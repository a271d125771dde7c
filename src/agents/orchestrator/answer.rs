/// Build the user-visible answer from the pieces the loop produced.
///
/// Concatenates plan reasoning, execution summary and reflection summary,
/// with a validation-rounds note once the loop ran more than one iteration.
pub fn compose_answer(
    plan_reasoning: &str,
    execution_summary: Option<&str>,
    reflection_summary: Option<&str>,
    iterations: usize,
) -> String {
    let mut parts: Vec<String> = Vec::new();
    if !plan_reasoning.trim().is_empty() {
        parts.push(plan_reasoning.trim().to_string());
    }
    if let Some(summary) = execution_summary.map(str::trim).filter(|s| !s.is_empty()) {
        parts.push(summary.to_string());
    }
    if let Some(summary) = reflection_summary.map(str::trim).filter(|s| !s.is_empty()) {
        parts.push(summary.to_string());
    }
    if parts.is_empty() {
        parts.push("Nothing to do for this request.".to_string());
    }
    if iterations > 1 {
        parts.push(format!("(settled after {iterations} validation rounds)"));
    }
    parts.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concatenates_available_parts() {
        let answer = compose_answer(
            "Taking off to 1.5m.",
            Some("executed 1 step(s) successfully in 40 ms"),
            Some("The drone is hovering at the requested altitude."),
            1,
        );
        assert!(answer.contains("Taking off"));
        assert!(answer.contains("executed 1 step(s)"));
        assert!(answer.contains("hovering"));
        assert!(!answer.contains("validation rounds"));
    }

    #[test]
    fn notes_multiple_iterations() {
        let answer = compose_answer("plan", None, None, 3);
        assert!(answer.ends_with("(settled after 3 validation rounds)"));
    }

    #[test]
    fn empty_parts_fall_back_to_nothing_to_do() {
        let answer = compose_answer("", None, None, 1);
        assert_eq!(answer, "Nothing to do for this request.");
    }
}
