use crate::compile::{CompiledBranch, Element};

/// Everything one `gst-launch-1.0` invocation needs.
#[derive(Debug, Clone)]
pub struct GraphDescriptor {
    pub gst_debug: String,
    pub gst_tracers: String,
    /// In build order: camera-major, signature-minor.
    pub branches: Vec<CompiledBranch>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Layout {
    /// One line per branch.
    #[default]
    Compact,
    /// One line per element.
    Multiline,
}

/// Render the descriptor as a single shell command. Lines are joined with
/// ` \` continuations; branches keep their build order.
pub fn render_launch_command(graph: &GraphDescriptor, layout: Layout) -> String {
    let mut lines = vec![format!(
        "GST_DEBUG={} GST_TRACERS=\"{}\" gst-launch-1.0 --verbose",
        graph.gst_debug, graph.gst_tracers
    )];

    for branch in &graph.branches {
        match layout {
            Layout::Compact => lines.push(format!("  {}", compact_branch(branch))),
            Layout::Multiline => lines.extend(multiline_branch(branch)),
        }
    }

    lines.join(" \\\n")
}

fn join_links(elements: &[Element]) -> String {
    elements
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(" ! ")
}

fn compact_branch(branch: &CompiledBranch) -> String {
    let mut out = join_links(&branch.chain);
    for leg in &branch.junction.legs {
        out.push_str(&format!(" {}. ! {}", branch.junction.name, join_links(leg)));
    }
    out
}

fn multiline_branch(branch: &CompiledBranch) -> Vec<String> {
    let mut lines = Vec::new();
    segment_lines(&mut lines, "", &branch.chain);
    let prefix = format!("{}. ! ", branch.junction.name);
    for leg in &branch.junction.legs {
        segment_lines(&mut lines, &prefix, leg);
    }
    lines
}

/// One line per element; the first carries `first_prefix`, links end lines.
fn segment_lines(lines: &mut Vec<String>, first_prefix: &str, elements: &[Element]) {
    let last = elements.len().saturating_sub(1);
    for (i, element) in elements.iter().enumerate() {
        let indent = if i == 0 { "  " } else { "    " };
        let prefix = if i == 0 { first_prefix } else { "" };
        let link = if i < last { " !" } else { "" };
        lines.push(format!("{}{}{}{}", indent, prefix, element, link));
    }
}
