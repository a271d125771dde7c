/// Broadened search phrasings for one missing target.
///
/// The map chunks are written in mixed Chinese/English, so a bare numeric
/// id like `7` is tried as every id spelling the seeding script produces,
/// and landing-pad vocabulary expands to its fixed synonym family.
pub fn expand(target: &str) -> Vec<String> {
    let target = target.trim();
    let mut variations = vec![target.to_string()];

    if let Some(id) = numeric_id(target) {
        for form in [
            format!("{id}号"),
            format!("编号{id}"),
            format!("点{id}"),
            format!("目标{id}"),
            id.to_string(),
        ] {
            variations.push(form);
        }
    }

    if is_landing_related(target) {
        for form in [
            "着陆点",
            "黑白相间的着陆点",
            "黑白立方体",
            "landing pad",
            "停机坪",
        ] {
            variations.push(form.to_string());
        }
    }

    dedup_preserving_order(variations)
}

/// Extract the numeric id from `7`, `7号`, `编号7`, `点7`, `point 7`, ...
fn numeric_id(target: &str) -> Option<String> {
    let digits: String = target.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    // Measurements ("1.5m", "2米") are not point ids.
    let lower = target.to_lowercase();
    if target.contains('.') || lower.ends_with('m') || target.contains('米') {
        return None;
    }
    Some(digits)
}

fn is_landing_related(target: &str) -> bool {
    let lower = target.to_lowercase();
    target.contains("黑白") || target.contains("着陆") || lower.contains("landing") || target.contains("停机")
}

fn dedup_preserving_order(items: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    items.into_iter().filter(|v| seen.insert(v.clone())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_target_expands_to_id_spellings() {
        let variations = expand("7");
        assert_eq!(variations[0], "7");
        assert!(variations.contains(&"7号".to_string()));
        assert!(variations.contains(&"编号7".to_string()));
        assert!(variations.contains(&"点7".to_string()));
    }

    #[test]
    fn id_spelling_keeps_its_own_form_first() {
        let variations = expand("3号");
        assert_eq!(variations[0], "3号");
        assert!(variations.contains(&"编号3".to_string()));
        // No duplicate of the original form.
        assert_eq!(variations.iter().filter(|v| *v == "3号").count(), 1);
    }

    #[test]
    fn landing_vocabulary_expands_to_the_fixed_family() {
        for target in ["黑白", "着陆点", "landing pad"] {
            let variations = expand(target);
            assert!(variations.contains(&"着陆点".to_string()), "{target}");
            assert!(variations.contains(&"landing pad".to_string()), "{target}");
            assert!(variations.contains(&"停机坪".to_string()), "{target}");
        }
    }

    #[test]
    fn plain_landmark_stays_as_itself() {
        assert_eq!(expand("蓝色方块"), vec!["蓝色方块".to_string()]);
    }

    #[test]
    fn altitude_like_text_is_not_an_id() {
        assert_eq!(expand("1.5m"), vec!["1.5m".to_string()]);
    }
}
