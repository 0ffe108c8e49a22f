use crate::audio::features::EngineOutput;

/// One-line text meter of the published bands, e.g. for a terminal status line.
pub fn render_meter(output: &EngineOutput, width: usize) -> String {
    format!(
        "bass {} mid {} treble {} beat {}",
        bar(output.bass, width),
        bar(output.mid, width),
        bar(output.treble, width),
        bar(output.beat, width),
    )
}

fn bar(value: f32, width: usize) -> String {
    let filled = ((value.clamp(0.0, 1.0) * width as f32).round() as usize).min(width);
    format!("[{}{}]", "#".repeat(filled), " ".repeat(width - filled))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bars_scale_with_value() {
        let out = EngineOutput {
            bass: 1.0,
            mid: 0.5,
            treble: 0.0,
            beat: 2.0,
        };
        assert_eq!(
            render_meter(&out, 4),
            "bass [####] mid [##  ] treble [    ] beat [####]"
        );
    }
}
