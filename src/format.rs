//! 运行报告渲染：类别、工具、分数、重试次数、答案与逐次尝试的 trace

use std::fmt::Write as _;

use crate::core::RunState;

/// 把完成的 RunState 渲染为纯文本报告
pub fn render_report(state: &RunState) -> String {
    let mut out = String::new();
    let category = state.category.map_or("unknown", |c| c.as_str());
    let _ = writeln!(out, "Category:   {category}");
    let tools = state.tools_used();
    let _ = writeln!(
        out,
        "Tools used: {}",
        if tools.is_empty() { "(none)".to_string() } else { tools.join(", ") }
    );

    match &state.final_answer {
        Some(answer) => {
            let _ = write!(out, "Quality:    {:.1}/10", answer.quality_score);
            if answer.gave_up {
                out.push_str(" (below threshold, retry limit reached)");
            }
            out.push('\n');
            let _ = writeln!(out, "Retries:    {}", state.retry_count());
            let _ = writeln!(out, "\n{}", answer.text);
        }
        None => {
            let _ = writeln!(out, "Retries:    {}", state.retry_count());
            out.push_str("\n(no answer)\n");
        }
    }

    if !state.trace().is_empty() {
        out.push_str("\nTrace:\n");
        for attempt in 0..=state.retry_count() {
            let results = state.attempt_results(attempt);
            if results.is_empty() {
                continue;
            }
            let _ = writeln!(out, "  Attempt {}:", attempt + 1);
            for r in results {
                let status = match &r.error {
                    None => "ok".to_string(),
                    Some(err) => format!("failed: {}", err.message),
                };
                let _ = writeln!(
                    out,
                    "    - {} [{}] {}ms {}",
                    r.step.display_name(),
                    r.step.label,
                    r.duration.as_millis(),
                    status
                );
            }
        }
    }

    out.trim_end().to_string()
}
