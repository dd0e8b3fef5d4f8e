use anyhow::{Context, Result};
use std::fmt::Write as _;
use std::path::Path;
use tokio::fs;

#[derive(Debug, Clone, PartialEq)]
pub struct AssStyle {
    pub play_res_x: u32,
    pub play_res_y: u32,
    pub font: String,
    pub font_size: u32,
    pub wrap_width: usize,
}

impl Default for AssStyle {
    fn default() -> Self {
        Self {
            play_res_x: 1280,
            play_res_y: 720,
            font: "Arial".to_string(),
            font_size: 56,
            wrap_width: 70,
        }
    }
}

/// Greedy word wrap. Words longer than `width` get a line of their own.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > width && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// `h:mm:ss.cc`, the ASS timestamp form.
pub fn format_ass_time(seconds: f64) -> String {
    let total_cs = (seconds.max(0.0) * 100.0).round() as u64;
    let cs = total_cs % 100;
    let total_s = total_cs / 100;
    let s = total_s % 60;
    let m = (total_s / 60) % 60;
    let h = total_s / 3600;
    format!("{}:{:02}:{:02}.{:02}", h, m, s, cs)
}

fn sanitize_line(line: &str) -> String {
    line.chars()
        .map(|c| match c {
            '{' => '(',
            '}' => ')',
            // ASS reads \N, \h and \n as escapes
            '\\' => '\u{2216}',
            '\r' | '\n' => ' ',
            other => other,
        })
        .collect()
}

/// Builds an ASS document spreading the wrapped lines evenly over
/// `duration_seconds`.
pub fn build_ass(text: &str, duration_seconds: f64, style: &AssStyle) -> String {
    let mut out = String::new();
    let _ = write!(
        out,
        "[Script Info]\nScriptType: v4.00+\nPlayResX: {}\nPlayResY: {}\nWrapStyle: 0\n\n",
        style.play_res_x, style.play_res_y
    );
    out.push_str("[V4+ Styles]\n");
    out.push_str("Format: Name, Fontname, Fontsize, PrimaryColour, OutlineColour, BackColour, Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, BorderStyle, Outline, Shadow, Alignment, MarginL, MarginR, MarginV, Encoding\n");
    let _ = writeln!(
        out,
        "Style: Default,{},{},&H00FFFF00,&H00000000,&H00000000,1,0,0,0,100,100,0,0,1,2,0,2,10,10,40,1",
        style.font, style.font_size
    );
    out.push_str("\n[Events]\n");
    out.push_str("Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text\n");

    let lines = wrap_text(text, style.wrap_width.max(1));
    if lines.is_empty() || duration_seconds <= 0.0 {
        return out;
    }

    let per_line = duration_seconds / lines.len() as f64;
    for (i, line) in lines.iter().enumerate() {
        let start = i as f64 * per_line;
        let end = (i + 1) as f64 * per_line;
        let _ = writeln!(
            out,
            "Dialogue: 0,{},{},Default,,0,0,0,,{}",
            format_ass_time(start),
            format_ass_time(end),
            sanitize_line(line)
        );
    }
    out
}

pub async fn write_ass(
    text: &str,
    duration_seconds: f64,
    style: &AssStyle,
    out_path: &Path,
) -> Result<()> {
    let doc = build_ass(text, duration_seconds, style);
    fs::write(out_path, doc)
        .await
        .with_context(|| format!("write subtitles: {}", out_path.display()))
}
