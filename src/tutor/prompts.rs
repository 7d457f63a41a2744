//! System instructions and prompt assembly for the tutoring flows.

use super::AnalysisContext;
use crate::types::Part;

/// Instruction for diagnosing a student's attempt.
pub const ANALYSIS_SYSTEM_PROMPT: &str = r#"<role>
You are the "Feynman Engineering Tutor." Your goal is not to solve problems for students, but to identify the specific "gap" in their intuition that is causing them to fail. You are empathetic, clear, and use real-world analogies (the Feynman technique) to explain abstract math/physics concepts.
Do not show the student the solution right away, rather challenge the student to think deeply and recognize gaps in their thought process. Only when you find that they can't solve the problem would you reveal the solution.
</role>

<reasoning_process>
1.  **Transcribe/Read:** Read the Student Attempt (from text or image).
2.  **Golden Solution:** Solve the Target Problem independently.
3.  **The Diff:** Compare the Student Attempt to the Golden Solution step-by-step.
4.  **Gap Identification:** Locate the *exact* step where the student diverged.
5.  **Analogy Generation:** Create a physical, real-world analogy that explains the *correct* concept for that specific gap.
6.  **Tagging:** Identify 3-5 specific concepts (e.g. "Chain Rule", "Conservation of Energy") relevant to this problem.
7.  **Title Generation:** Create a short, catchy title.
</reasoning_process>

<formatting_rules>
*   **LaTeX:** You MUST use standard LaTeX delimiters for all math expressions ($...$ for inline math expression or $$...$$for block math expression).
</formatting_rules>
"#;

/// Instruction for grading a practice answer.
pub const GYM_SYSTEM_PROMPT: &str =
    "You are an expert math problem solver. Provide step-by-step solutions in LaTeX format and compare it to the attempt.";

/// Base instruction for conversational turns.
pub const CHAT_SYSTEM_PROMPT: &str = r#"<role>
You are the "Feynman Engineering Tutor." Your goal is to help students understand concepts deeply through the Socratic method.
Use real-world analogies and guide students to discover answers themselves rather than simply providing solutions.
You are empathetic, encouraging, and focused on building genuine understanding.
</role>

<conversation_style>
- Ask probing questions to reveal gaps in understanding
- Use the Feynman technique: explain complex concepts through simple analogies
- Be patient and adjust your teaching style based on student responses
- Celebrate progress and breakthroughs
- Use LaTeX for math expressions: $...$ for inline, $$...$$ for block equations
</conversation_style>

<guidelines>
- Never just give the answer - guide the student to discover it
- If a student is stuck, break the problem into smaller steps
- Connect new concepts to things the student already understands
- Encourage critical thinking with "why" and "what if" questions
</guidelines>
"#;

const NOT_AVAILABLE: &str = "N/A";

/// Prompt parts for an analysis request.
pub fn analysis_parts(problem: &str, attempt: &str) -> Vec<Part> {
    vec![
        Part::text("Here is the target problem context: "),
        Part::text(problem),
        Part::text("Here is the attempt context: "),
        Part::text(attempt),
    ]
}

/// Prompt parts for a gym evaluation.
pub fn gym_parts(problem: &str, attempt: &str) -> Vec<Part> {
    vec![
        Part::text("Solve the following math problem: "),
        Part::text(problem),
        Part::text(attempt),
    ]
}

/// `<previous_analysis>` block summarising an earlier analysis.
pub fn previous_analysis_block(context: &AnalysisContext) -> String {
    let or_na = |value: &Option<String>| value.clone().unwrap_or_else(|| NOT_AVAILABLE.to_string());

    format!(
        "\n<previous_analysis>\n\
         You previously analyzed this student's work with the following context:\n\
         Problem: {}\n\
         Student Attempt: {}\n\
         \n\
         Your previous analysis:\n\
         Title: {}\n\
         Tags: {}\n\
         Diagnosis: {}\n\
         Explanation: {}\n\
         \n\
         Use this context to provide more relevant and personalized guidance.\n\
         </previous_analysis>\n",
        or_na(&context.problem),
        or_na(&context.attempt),
        or_na(&context.title),
        context.tags.join(", "),
        or_na(&context.diagnosis),
        or_na(&context.explanation),
    )
}

/// System instruction for a chat turn.
///
/// A non-empty `override_prompt` replaces everything; otherwise the base
/// prompt is followed by the previous-analysis block when one is given.
pub fn chat_system_prompt(context: Option<&AnalysisContext>, override_prompt: Option<&str>) -> String {
    if let Some(custom) = override_prompt.filter(|p| !p.is_empty()) {
        return custom.to_string();
    }

    match context.filter(|c| !c.is_empty()) {
        Some(context) => format!("{}{}", CHAT_SYSTEM_PROMPT, previous_analysis_block(context)),
        None => CHAT_SYSTEM_PROMPT.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_analysis_parts_order() {
        let texts: Vec<_> = analysis_parts("P", "A")
            .iter()
            .filter_map(|p| p.as_text().map(str::to_string))
            .collect();
        assert_eq!(
            texts,
            vec!["Here is the target problem context: ", "P", "Here is the attempt context: ", "A"]
        );
    }

    #[test]
    fn test_previous_analysis_block_missing_values() {
        let context = AnalysisContext {
            problem: Some("d/dx x^2".into()),
            tags: vec!["Calculus".into(), "Power Rule".into()],
            ..AnalysisContext::default()
        };
        let block = previous_analysis_block(&context);

        assert!(block.contains("Problem: d/dx x^2\n"));
        assert!(block.contains("Student Attempt: N/A\n"));
        assert!(block.contains("Title: N/A\n"));
        assert!(block.contains("Tags: Calculus, Power Rule\n"));
        assert!(block.contains("Explanation: N/A\n"));
        assert!(block.trim_end().ends_with("</previous_analysis>"));
    }

    #[test]
    fn test_chat_prompt_variants() {
        let context = AnalysisContext {
            title: Some("Chain rule".into()),
            ..AnalysisContext::default()
        };

        assert_eq!(chat_system_prompt(None, None), CHAT_SYSTEM_PROMPT);
        assert_eq!(chat_system_prompt(Some(&AnalysisContext::default()), None), CHAT_SYSTEM_PROMPT);

        let with_context = chat_system_prompt(Some(&context), None);
        assert!(with_context.starts_with(CHAT_SYSTEM_PROMPT));
        assert!(with_context.contains("Title: Chain rule"));

        assert_eq!(chat_system_prompt(Some(&context), Some("Be brief.")), "Be brief.");
        assert_eq!(chat_system_prompt(None, Some("")), CHAT_SYSTEM_PROMPT);
    }
}
